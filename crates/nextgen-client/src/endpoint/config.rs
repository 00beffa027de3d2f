/*
[INPUT]:  User-entered service address, persisted settings, client configuration
[OUTPUT]: Normalized host:port address, base URL, and the current HTTP client
[POS]:    Endpoint layer - single owner of "where is the service"
[UPDATE]: When address normalization, defaults, or client replacement rules change
*/

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use super::settings::SettingsStore;
use crate::http::{ClientConfig, NextgenClient, Result};

/// Address used until a persisted value has been loaded.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:58732";

/// Settings key holding the normalized `host:port` value.
pub const ADDRESS_KEY: &str = "server_address";

/// Trim and strip a leading `http://` or `https://` (case-sensitive).
/// Returns `None` for empty input.
pub fn normalize_address(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    Some(stripped.to_string())
}

/// The stored value unchanged if it already carries a scheme, otherwise
/// `http://` + value.
pub fn base_url_for(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

#[derive(Debug)]
struct EndpointState {
    address: String,
    client: Arc<NextgenClient>,
}

/// Owns the service address and the client built from it.
///
/// Changing the address swaps in a freshly built client and invalidates the
/// previous one; a client is never re-pointed in place.
#[derive(Debug)]
pub struct EndpointConfig {
    settings: Arc<dyn SettingsStore>,
    client_config: ClientConfig,
    state: RwLock<EndpointState>,
}

impl EndpointConfig {
    /// Start from [`DEFAULT_ADDRESS`] without reading settings.
    pub fn new(settings: Arc<dyn SettingsStore>, client_config: ClientConfig) -> Result<Self> {
        Self::with_address(settings, client_config, DEFAULT_ADDRESS)
    }

    /// Start from the persisted address, falling back to [`DEFAULT_ADDRESS`]
    /// when nothing usable is stored.
    pub fn load(settings: Arc<dyn SettingsStore>, client_config: ClientConfig) -> Result<Self> {
        let stored = match settings.get_string(ADDRESS_KEY) {
            Ok(value) => value.as_deref().and_then(normalize_address),
            Err(err) => {
                warn!(error = %err, "failed to read persisted server address; using default");
                None
            }
        };

        if let Some(address) = stored {
            match Self::with_address(settings.clone(), client_config.clone(), &address) {
                Ok(config) => return Ok(config),
                Err(err) => {
                    warn!(%address, error = %err, "persisted server address is unusable; using default");
                }
            }
        }
        Self::new(settings, client_config)
    }

    fn with_address(
        settings: Arc<dyn SettingsStore>,
        client_config: ClientConfig,
        address: &str,
    ) -> Result<Self> {
        let client = NextgenClient::with_config(client_config.clone(), &base_url_for(address))?;
        Ok(Self {
            settings,
            client_config,
            state: RwLock::new(EndpointState {
                address: address.to_string(),
                client: Arc::new(client),
            }),
        })
    }

    /// Normalized `host:port` currently in use
    pub fn address(&self) -> String {
        self.read_state().address.clone()
    }

    pub fn base_url(&self) -> String {
        base_url_for(&self.read_state().address)
    }

    /// The current client. Hold it only for the duration of one operation;
    /// after a reconfiguration it is invalidated.
    pub fn client(&self) -> Arc<NextgenClient> {
        self.read_state().client.clone()
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    /// Store a new service address.
    ///
    /// Empty input is ignored (`Ok(false)`). An address that cannot form a
    /// URL is rejected and the previous one stays. Persistence failures are
    /// logged; the in-memory value is kept either way.
    pub fn set_address(&self, input: &str) -> Result<bool> {
        let Some(address) = normalize_address(input) else {
            return Ok(false);
        };

        let previous = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.address == address {
                None
            } else {
                let client =
                    NextgenClient::with_config(self.client_config.clone(), &base_url_for(&address))?;
                let old_client = std::mem::replace(&mut state.client, Arc::new(client));
                let old_address = std::mem::replace(&mut state.address, address.clone());
                Some((old_address, old_client))
            }
        };

        if let Some((old_address, old_client)) = &previous {
            old_client.invalidate();
            info!(from = %old_address, to = %address, "server address changed");
        }

        if let Err(err) = self.settings.set_string(ADDRESS_KEY, &address) {
            warn!(%address, error = %err, "failed to persist server address");
        }

        Ok(previous.is_some())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, EndpointState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
