//! Transport seam between the settings client and the network.
//!
//! [`Broker`] is the connection target: it runs discovery and opens device
//! sessions. Each operation uses its own network session, so discovery and
//! configuration never share connection state. [`ZenohBroker`] is the
//! production implementation.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use miniconf_common::{
    KeyExprBuilder, ProtocolConfig, ZenohConfig, connect, discovery_key, parse_alive_key,
};
use zenoh::Session;
use zenoh::query::{ConsolidationMode, QueryTarget};

use crate::discovery::{DevicePattern, ResolvedAddress};
use crate::error::{MiniconfError, Result};
use crate::interface::Response;

/// Network access used by discovery and configuration.
pub trait Broker: Send + Sync {
    /// Session type returned by [`Broker::open`].
    type Session: DeviceSession;

    /// Collect the addresses of all live devices matching `pattern`.
    fn discover(
        &self,
        pattern: &DevicePattern,
    ) -> impl Future<Output = Result<BTreeSet<String>>> + Send;

    /// Open a session to a single device.
    fn open(&self, device: &ResolvedAddress) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// An open session to one device.
pub trait DeviceSession: Send {
    /// Address of the device this session talks to.
    fn device(&self) -> &ResolvedAddress;

    /// Write `value` to `path` and wait for the device response.
    fn set(
        &mut self,
        path: &str,
        value: &serde_json::Value,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Release the session.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Broker reached over zenoh.
#[derive(Debug, Clone)]
pub struct ZenohBroker {
    zenoh: ZenohConfig,
    protocol: ProtocolConfig,
}

impl ZenohBroker {
    pub fn new(zenoh: ZenohConfig, protocol: ProtocolConfig) -> Self {
        Self { zenoh, protocol }
    }

    /// Broker at a bare address with default protocol timing.
    pub fn from_address(broker: &str) -> Self {
        Self::new(ZenohConfig::for_broker(broker), ProtocolConfig::default())
    }

    pub fn zenoh_config(&self) -> &ZenohConfig {
        &self.zenoh
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    async fn session(&self) -> Result<Session> {
        connect(&self.zenoh).await.map_err(|e| {
            MiniconfError::connection(format!(
                "failed to open session via {:?}: {}",
                self.zenoh.connect, e
            ))
        })
    }
}

impl Broker for ZenohBroker {
    type Session = ZenohDeviceSession;

    async fn discover(&self, pattern: &DevicePattern) -> Result<BTreeSet<String>> {
        let key = discovery_key(pattern.as_str())?;
        let session = self.session().await?;

        let result = collect_alive(&session, &key, self.protocol.discovery_timeout()).await;
        close_session(session).await;

        let devices = result?;
        tracing::debug!(key = %key, count = devices.len(), "Discovery finished");
        Ok(devices)
    }

    /// Open a session and check that the device still holds its presence
    /// token. A device that went away fails here with
    /// [`MiniconfError::ConnectionFailed`] before anything is written.
    async fn open(&self, device: &ResolvedAddress) -> Result<ZenohDeviceSession> {
        let session = self.session().await?;
        let keys = KeyExprBuilder::new(device.as_str());

        let timeout = self.protocol.discovery_timeout();
        let presence = match is_alive(&session, &keys.alive(), timeout).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MiniconfError::connection(format!(
                "device '{}' is not present",
                device
            ))),
            Err(e) => Err(e),
        };
        if let Err(e) = presence {
            close_session(session).await;
            return Err(e);
        }

        tracing::debug!(device = %device, "Device session opened");
        Ok(ZenohDeviceSession {
            session,
            keys,
            device: device.clone(),
            request_timeout: self.protocol.request_timeout(),
        })
    }
}

async fn collect_alive(session: &Session, key: &str, timeout: Duration) -> Result<BTreeSet<String>> {
    let replies = session
        .liveliness()
        .get(key)
        .timeout(timeout)
        .await
        .map_err(|e| MiniconfError::connection(format!("discovery query failed: {}", e)))?;

    let mut devices = BTreeSet::new();
    while let Ok(reply) = replies.recv_async().await {
        match reply.result() {
            Ok(sample) => match parse_alive_key(sample.key_expr().as_str()) {
                Some(prefix) => {
                    tracing::debug!(device = %prefix, "Discovered device");
                    devices.insert(prefix.to_string());
                }
                None => tracing::debug!(key = %sample.key_expr(), "Ignoring unexpected presence key"),
            },
            Err(err) => {
                tracing::warn!(error = ?err.payload().try_to_string(), "Discovery reply error")
            }
        }
    }

    Ok(devices)
}

async fn is_alive(session: &Session, key: &str, timeout: Duration) -> Result<bool> {
    let replies = session
        .liveliness()
        .get(key)
        .timeout(timeout)
        .await
        .map_err(|e| MiniconfError::connection(format!("presence query failed: {}", e)))?;

    while let Ok(reply) = replies.recv_async().await {
        if reply.result().is_ok() {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn close_session(session: Session) {
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Error closing Zenoh session");
    }
}

/// Zenoh session bound to one device.
///
/// Dropping the session also releases it.
#[derive(Debug)]
pub struct ZenohDeviceSession {
    session: Session,
    keys: KeyExprBuilder,
    device: ResolvedAddress,
    request_timeout: Duration,
}

impl DeviceSession for ZenohDeviceSession {
    fn device(&self) -> &ResolvedAddress {
        &self.device
    }

    async fn set(&mut self, path: &str, value: &serde_json::Value) -> Result<Response> {
        let key = self.keys.settings(path);
        let payload = serde_json::to_vec(value)?;

        let replies = self
            .session
            .get(key.as_str())
            .payload(payload)
            .target(QueryTarget::BestMatching)
            .consolidation(ConsolidationMode::None)
            .timeout(self.request_timeout)
            .await
            .map_err(|e| MiniconfError::connection(format!("failed to send '{}': {}", key, e)))?;

        // Presence was checked on open: no reply here means the deadline passed.
        let reply = replies.recv_async().await.map_err(|_| MiniconfError::Timeout {
            path: path.to_string(),
        })?;

        match reply.result() {
            Ok(sample) => {
                let bytes = sample.payload().to_bytes();
                serde_json::from_slice(&bytes).map_err(|e| {
                    MiniconfError::Serialization(format!(
                        "invalid response from '{}': {}",
                        self.device, e
                    ))
                })
            }
            Err(err) => Err(MiniconfError::WriteRejected {
                path: path.to_string(),
                value: value.to_string(),
                code: None,
                message: err
                    .payload()
                    .try_to_string()
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| "unreadable error reply".to_string()),
            }),
        }
    }

    async fn close(self) {
        close_session(self.session).await;
    }
}
