mod client;
pub mod models;
mod remote_error;

pub use client::{QueryResult, RemoteDatabase};
pub use remote_error::RemoteError;
