//! fleetd library - exposes modules for testing.

pub mod completion;
pub mod handlers;
pub mod routes;
pub mod server;
