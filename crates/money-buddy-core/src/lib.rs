// Shared building blocks: configuration, the agent tool contract, and the
// structured outcome type every outward-facing operation returns.

pub mod config;
pub mod outcome;
pub mod tool;
