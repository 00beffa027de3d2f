/*
[INPUT]:  HTTP client configuration and service endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod probe;
pub mod tasks;

pub use error::{ConnectionFailure, FailureKind, NextgenError, Result};

pub use client::{ClientConfig, NextgenClient};
