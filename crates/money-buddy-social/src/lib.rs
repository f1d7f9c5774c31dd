// Social-media integration: client contract, X API backend, authenticated
// session acquisition with retry, per-action wrappers and agent tools.

pub mod actions;
pub mod client;
pub mod service;
pub mod session;
pub mod tools;
pub mod x_api;
