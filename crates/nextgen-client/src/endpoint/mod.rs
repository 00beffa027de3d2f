/*
[INPUT]:  Address input and the settings collaborator
[OUTPUT]: EndpointConfig and settings store implementations
[POS]:    Endpoint layer - service address resolution and persistence
[UPDATE]: When adding settings backends or endpoint options
*/

pub mod config;
pub mod settings;

pub use config::{ADDRESS_KEY, DEFAULT_ADDRESS, EndpointConfig, base_url_for, normalize_address};
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsStore};
