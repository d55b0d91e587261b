//! Device discovery.
//!
//! Every device announces itself with a liveliness token at `<prefix>/alive`.
//! Resolving a [`DevicePattern`] collects the prefixes of all tokens matching
//! the pattern within the discovery window and insists on exactly one.

use std::collections::BTreeSet;
use std::fmt;

use miniconf_common::{is_wildcard, translate_pattern};

use crate::broker::Broker;
use crate::error::{MiniconfError, Result};

/// A device address that may contain wildcard segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DevicePattern(String);

impl DevicePattern {
    /// Parse a pattern, rejecting malformed wildcards and empty segments.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        translate_pattern(&pattern)?;
        Ok(Self(pattern))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the pattern names a single device without wildcards.
    pub fn is_exact(&self) -> bool {
        !is_wildcard(&self.0)
    }
}

impl fmt::Display for DevicePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DevicePattern {
    type Err = MiniconfError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// The concrete address of exactly one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedAddress(String);

impl ResolvedAddress {
    /// Use a caller-supplied address as-is, bypassing discovery.
    ///
    /// Fails with [`MiniconfError::InvalidAddress`] if the pattern has
    /// wildcards.
    pub fn exact(pattern: &DevicePattern) -> Result<Self> {
        if pattern.is_exact() {
            Ok(Self(pattern.as_str().to_string()))
        } else {
            Err(MiniconfError::InvalidAddress(pattern.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a discovery result to exactly one device.
pub fn select_unique(pattern: &DevicePattern, matches: BTreeSet<String>) -> Result<ResolvedAddress> {
    let mut iter = matches.iter();
    match (iter.next(), iter.next()) {
        (None, _) => Err(MiniconfError::NoDeviceFound {
            pattern: pattern.to_string(),
        }),
        (Some(device), None) => Ok(ResolvedAddress(device.clone())),
        (Some(_), Some(_)) => Err(MiniconfError::AmbiguousDeviceMatch {
            pattern: pattern.to_string(),
            matches,
        }),
    }
}

/// Resolve a pattern to the single live device it matches.
pub async fn resolve<B: Broker>(broker: &B, pattern: &DevicePattern) -> Result<ResolvedAddress> {
    tracing::debug!(pattern = %pattern, "Discovering devices");

    let matches = broker.discover(pattern).await?;
    let device = select_unique(pattern, matches)?;

    tracing::info!(device = %device, "Automatically using detected device prefix");
    Ok(device)
}

/// Resolve a pattern unless discovery is disabled.
///
/// With `discover == false` the pattern must already be exact and the broker
/// is never contacted.
pub async fn resolve_or_exact<B: Broker>(
    broker: &B,
    pattern: &DevicePattern,
    discover: bool,
) -> Result<ResolvedAddress> {
    if discover {
        resolve(broker, pattern).await
    } else {
        ResolvedAddress::exact(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pattern_validation() {
        assert!(DevicePattern::new("dt/sinara/dual-pid/+").is_ok());
        assert!(DevicePattern::new("dt//dual-pid").is_err());
        assert!(DevicePattern::new("dt/dual+pid").is_err());
        assert!("dt/sinara/#".parse::<DevicePattern>().is_ok());
    }

    #[test]
    fn test_exact_address() {
        let pattern = DevicePattern::new("dt/sinara/dual-pid/01").unwrap();
        assert!(pattern.is_exact());
        assert_eq!(
            ResolvedAddress::exact(&pattern).unwrap().as_str(),
            "dt/sinara/dual-pid/01"
        );

        let wildcard = DevicePattern::new("dt/sinara/dual-pid/+").unwrap();
        assert!(matches!(
            ResolvedAddress::exact(&wildcard),
            Err(MiniconfError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_select_none() {
        let pattern = DevicePattern::new("dt/+").unwrap();
        assert!(matches!(
            select_unique(&pattern, BTreeSet::new()),
            Err(MiniconfError::NoDeviceFound { .. })
        ));
    }

    #[test]
    fn test_select_one() {
        let pattern = DevicePattern::new("dt/+").unwrap();
        let device = select_unique(&pattern, set(&["dt/a"])).unwrap();
        assert_eq!(device.as_str(), "dt/a");
    }

    #[test]
    fn test_select_many() {
        let pattern = DevicePattern::new("dt/+").unwrap();
        match select_unique(&pattern, set(&["dt/b", "dt/a", "dt/c"])) {
            Err(MiniconfError::AmbiguousDeviceMatch { pattern, matches }) => {
                assert_eq!(pattern, "dt/+");
                assert_eq!(matches, set(&["dt/a", "dt/b", "dt/c"]));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
