//! Settings interface: one device session, set-and-acknowledge writes.

use serde::{Deserialize, Serialize};

use miniconf_common::normalize_path;

use crate::broker::{Broker, DeviceSession};
use crate::discovery::ResolvedAddress;
use crate::error::{MiniconfError, Result};

/// Acknowledgment record returned by a device for every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Zero when the value was applied.
    pub code: i32,
    /// Human-readable detail.
    #[serde(default)]
    pub msg: String,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            code: 0,
            msg: "OK".to_string(),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// A successfully applied write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Device the value was written to.
    pub device: ResolvedAddress,
    /// Settings path, without leading `/`.
    pub path: String,
    /// Message returned by the device.
    pub message: String,
}

/// Session to one device.
///
/// Obtained with [`Miniconf::create`]; call [`Miniconf::close`] when done.
#[derive(Debug)]
pub struct Miniconf<S: DeviceSession> {
    session: S,
}

impl<S: DeviceSession> Miniconf<S> {
    /// Open a session to `device` through `broker`.
    pub async fn create<B>(broker: &B, device: &ResolvedAddress) -> Result<Self>
    where
        B: Broker<Session = S>,
    {
        tracing::info!(device = %device, "Connecting to broker");
        let session = broker.open(device).await?;
        Ok(Self { session })
    }

    pub fn device(&self) -> &ResolvedAddress {
        self.session.device()
    }

    /// Write `value` to `path` and return the device response as-is.
    ///
    /// Non-zero response codes are not treated as errors here.
    pub async fn set<T: Serialize + ?Sized>(&mut self, path: &str, value: &T) -> Result<Response> {
        let path = normalize_path(path);
        let value = serde_json::to_value(value)?;

        tracing::info!(path = %path, value = %value, device = %self.device(), "Sending setting");
        let response = self.session.set(path, &value).await?;
        tracing::debug!(path = %path, code = response.code, msg = %response.msg, "Device responded");

        Ok(response)
    }

    /// Write `value` to `path`, failing with [`MiniconfError::WriteRejected`]
    /// unless the device acknowledges it.
    pub async fn set_checked<T: Serialize + ?Sized>(&mut self, path: &str, value: &T) -> Result<Ack> {
        let response = self.set(path, value).await?;
        if response.is_ok() {
            Ok(Ack {
                device: self.device().clone(),
                path: normalize_path(path).to_string(),
                message: response.msg,
            })
        } else {
            Err(MiniconfError::WriteRejected {
                path: normalize_path(path).to_string(),
                value: serde_json::to_string(value)?,
                code: Some(response.code),
                message: response.msg,
            })
        }
    }

    /// Release the session.
    pub async fn close(self) {
        self.session.close().await;
    }
}

/// Perform one configuration transaction: open a session, write one value,
/// wait for the acknowledgment and release the session.
///
/// The session is closed whatever the outcome of the write. Nothing is
/// retried.
pub async fn transact<B, T>(
    broker: &B,
    device: &ResolvedAddress,
    path: &str,
    value: &T,
) -> Result<Ack>
where
    B: Broker,
    T: Serialize + ?Sized,
{
    let mut interface = Miniconf::create(broker, device).await?;
    let result = interface.set_checked(path, value).await;
    interface.close().await;

    match &result {
        Ok(ack) => tracing::info!(device = %ack.device, path = %ack.path, "Setting acknowledged"),
        Err(e) => tracing::warn!(device = %device, path = %path, error = %e, "Setting failed"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_decoding() {
        let ok: Response = serde_json::from_str(r#"{"code": 0, "msg": "OK"}"#).unwrap();
        assert!(ok.is_ok());
        assert_eq!(ok, Response::ok());

        let err: Response = serde_json::from_str(r#"{"code": 2}"#).unwrap();
        assert!(!err.is_ok());
        assert_eq!(err.msg, "");
    }

    #[test]
    fn test_response_encoding() {
        let json = serde_json::to_string(&Response::error(1, "Invalid value")).unwrap();
        assert_eq!(json, r#"{"code":1,"msg":"Invalid value"}"#);
    }
}
