/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public nextgen client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod diagnostics;
pub mod endpoint;
pub mod http;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod types;

pub use diagnostics::{DiagnosticReport, Diagnostics};

pub use endpoint::{
    ADDRESS_KEY,
    DEFAULT_ADDRESS,
    EndpointConfig,
    FileSettingsStore,
    MemorySettingsStore,
    SettingsStore,
};

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    ConnectionFailure,
    FailureKind,
    NextgenClient,
    NextgenError,
    Result,
};

pub use scheduler::{HistorySource, SchedulerConfig, SyncScheduler};
pub use store::{PassTicket, TaskStore};
pub use sync::TaskSync;

// Re-export all types
pub use types::*;
