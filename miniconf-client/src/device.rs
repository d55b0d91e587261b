//! Device-side emulator for end-to-end testing.
//!
//! An emulated device announces its presence with a liveliness token at
//! `<prefix>/alive` and answers settings writes on `<prefix>/settings/**`
//! with a [`Response`], just like the firmware does.
//!
//! # Example
//!
//! ```ignore
//! use miniconf_client::DeviceEmulator;
//!
//! let device = DeviceEmulator::start(session.clone(), "dt/sinara/dual-pid/01").await?;
//!
//! // ... run discovery and configuration against it ...
//!
//! assert!(device.setting("pid_ch/0").await.is_some());
//! device.stop().await;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use zenoh::Session;
use zenoh::liveliness::LivelinessToken;
use zenoh::query::Query;

use miniconf_common::KeyExprBuilder;

use crate::error::{MiniconfError, Result};
use crate::interface::Response;

/// Decides whether a written value is accepted.
///
/// Returning `Err(msg)` makes the device answer with a non-zero code.
pub type Validator = Arc<dyn Fn(&str, &Value) -> std::result::Result<(), String> + Send + Sync>;

/// Code returned for values that could not be decoded.
pub const CODE_DESERIALIZATION: i32 = 1;

/// Code returned for values refused by the validator.
pub const CODE_REJECTED: i32 = 2;

#[derive(Debug, Default)]
struct DeviceState {
    settings: BTreeMap<String, Value>,
    writes: Vec<String>,
}

/// An emulated settings device.
///
/// Presence is withdrawn and the queryable undeclared when the emulator is
/// stopped or dropped.
pub struct DeviceEmulator {
    keys: KeyExprBuilder,
    state: Arc<RwLock<DeviceState>>,
    /// Kept alive for the lifetime of the emulator.
    #[allow(dead_code)]
    token: LivelinessToken,
    task: JoinHandle<()>,
}

impl DeviceEmulator {
    /// Start a device that accepts every well-formed value.
    pub async fn start(session: Arc<Session>, prefix: impl Into<String>) -> Result<Self> {
        let accept_all: Validator = Arc::new(|_: &str, _: &Value| Ok(()));
        Self::start_with_validator(session, prefix, accept_all).await
    }

    /// Start a device that consults `validator` before applying a value.
    pub async fn start_with_validator(
        session: Arc<Session>,
        prefix: impl Into<String>,
        validator: Validator,
    ) -> Result<Self> {
        let keys = KeyExprBuilder::new(prefix);
        let state = Arc::new(RwLock::new(DeviceState::default()));

        let queryable = session
            .declare_queryable(keys.settings_wildcard())
            .await
            .map_err(|e| {
                MiniconfError::connection(format!("Failed to declare settings queryable: {}", e))
            })?;

        let token = session
            .liveliness()
            .declare_token(keys.alive())
            .await
            .map_err(|e| {
                MiniconfError::connection(format!("Failed to declare device token: {}", e))
            })?;

        tracing::info!(device = %keys.prefix(), "Device emulator started");

        let task = {
            let keys = keys.clone();
            let state = state.clone();
            tokio::spawn(async move {
                while let Ok(query) = queryable.recv_async().await {
                    let response = handle_query(&keys, &state, &validator, &query).await;
                    let payload = match serde_json::to_vec(&response) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode response");
                            continue;
                        }
                    };
                    if let Err(e) = query.reply(query.key_expr().clone(), payload).await {
                        tracing::warn!(error = %e, "Failed to reply to settings query");
                    }
                }
            })
        };

        Ok(Self {
            keys,
            state,
            token,
            task,
        })
    }

    /// The device prefix.
    pub fn prefix(&self) -> &str {
        self.keys.prefix()
    }

    /// Current value of a settings path, if it was ever written.
    pub async fn setting(&self, path: &str) -> Option<Value> {
        let state = self.state.read().await;
        state.settings.get(path).cloned()
    }

    /// Paths of all writes received, accepted or not, in arrival order.
    pub async fn writes(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.writes.clone()
    }

    /// Withdraw presence and stop answering.
    pub async fn stop(self) {
        tracing::info!(device = %self.keys.prefix(), "Device emulator stopped");
        drop(self);
    }
}

impl Drop for DeviceEmulator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_query(
    keys: &KeyExprBuilder,
    state: &RwLock<DeviceState>,
    validator: &Validator,
    query: &Query,
) -> Response {
    let Some(path) = keys.parse_settings(query.key_expr().as_str()) else {
        return Response::error(CODE_DESERIALIZATION, "Invalid settings path");
    };

    state.write().await.writes.push(path.to_string());

    let value: Value = match query.payload().map(|p| p.to_bytes()) {
        Some(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => return Response::error(CODE_DESERIALIZATION, e.to_string()),
        },
        None => return Response::error(CODE_DESERIALIZATION, "Missing value"),
    };

    if let Err(msg) = validator(path, &value) {
        tracing::debug!(path = %path, reason = %msg, "Rejecting setting");
        return Response::error(CODE_REJECTED, msg);
    }

    tracing::debug!(path = %path, value = %value, "Applying setting");
    state.write().await.settings.insert(path.to_string(), value);

    Response::ok()
}
