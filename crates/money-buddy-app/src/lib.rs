// Library root for the Money Buddy service so integration tests can build the
// router against mock collaborators.

pub mod autonomous;
pub mod runtime;
pub mod server;
