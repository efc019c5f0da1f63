//! REST API over the action recorder.

pub mod routes;
pub mod server;

pub use server::ApiServer;
