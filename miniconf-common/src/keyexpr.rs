//! Key expressions of the settings protocol.
//!
//! A device lives under a hierarchical prefix such as
//! `dt/sinara/dual-pid/04-91-62-d9-7e-5f` and exposes:
//!
//! ```text
//! <prefix>/alive              liveliness token, present while the device is up
//! <prefix>/settings/<path>    settings queryable, one reply per write
//! ```
//!
//! Device patterns accept MQTT-style wildcards (`+` for one segment, `#` for
//! any number of segments) as well as the native zenoh `*` and `**`.

use crate::error::{Error, Result};

/// Last segment of a device presence key.
pub const ALIVE_SEGMENT: &str = "alive";

/// Segment separating a device prefix from a settings path.
pub const SETTINGS_SEGMENT: &str = "settings";

/// Builder for the key expressions of one device.
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    prefix: String,
}

impl KeyExprBuilder {
    /// Create a builder for a device prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The device prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Presence key of the device.
    ///
    /// # Example
    /// ```
    /// use miniconf_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::new("dt/sinara/dual-pid/01");
    /// assert_eq!(builder.alive(), "dt/sinara/dual-pid/01/alive");
    /// ```
    pub fn alive(&self) -> String {
        format!("{}/{}", self.prefix, ALIVE_SEGMENT)
    }

    /// Key of a settings path. Leading and trailing `/` are ignored.
    ///
    /// # Example
    /// ```
    /// use miniconf_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::new("dt/sinara/dual-pid/01");
    /// assert_eq!(builder.settings("/pid_ch/0"), "dt/sinara/dual-pid/01/settings/pid_ch/0");
    /// ```
    pub fn settings(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.prefix,
            SETTINGS_SEGMENT,
            normalize_path(path)
        )
    }

    /// Wildcard matching every settings path of the device.
    ///
    /// # Example
    /// ```
    /// use miniconf_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::new("dt/sinara/dual-pid/01");
    /// assert_eq!(builder.settings_wildcard(), "dt/sinara/dual-pid/01/settings/**");
    /// ```
    pub fn settings_wildcard(&self) -> String {
        format!("{}/{}/**", self.prefix, SETTINGS_SEGMENT)
    }

    /// Extract the settings path from a full settings key of this device.
    pub fn parse_settings<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())?
            .strip_prefix('/')?
            .strip_prefix(SETTINGS_SEGMENT)?
            .strip_prefix('/')
            .filter(|path| !path.is_empty())
    }
}

/// Strip leading and trailing `/` from a settings path.
pub fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Whether a single segment is a wildcard.
fn is_wildcard_segment(segment: &str) -> bool {
    matches!(segment, "+" | "#" | "*" | "**")
}

/// Whether a device pattern contains any wildcard segment.
///
/// # Example
/// ```
/// use miniconf_common::keyexpr::is_wildcard;
///
/// assert!(is_wildcard("dt/sinara/dual-pid/+"));
/// assert!(!is_wildcard("dt/sinara/dual-pid/01"));
/// ```
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.split('/').any(is_wildcard_segment)
}

/// Translate a device pattern into a zenoh key expression.
///
/// `+` becomes `*` and `#` becomes `**`. As in MQTT, `#` is only accepted as
/// the last segment; the native `**` may appear anywhere. Empty segments and
/// wildcard characters embedded in a segment are rejected.
pub fn translate_pattern(pattern: &str) -> Result<String> {
    if pattern.is_empty() {
        return Err(Error::KeyExpr("empty device pattern".to_string()));
    }

    let parts: Vec<&str> = pattern.split('/').collect();
    let last = parts.len() - 1;

    let mut segments = Vec::with_capacity(parts.len());
    for (index, segment) in parts.into_iter().enumerate() {
        let translated = match segment {
            "" => {
                return Err(Error::KeyExpr(format!(
                    "empty segment in device pattern '{}'",
                    pattern
                )));
            }
            "+" | "*" => "*",
            "#" if index != last => {
                return Err(Error::KeyExpr(format!(
                    "'#' must be the last segment in '{}'",
                    pattern
                )));
            }
            "#" | "**" => "**",
            other if other.contains(['+', '#', '*', '?', '$']) => {
                return Err(Error::KeyExpr(format!(
                    "wildcard must span a whole segment in '{}'",
                    pattern
                )));
            }
            other => other,
        };
        segments.push(translated);
    }

    Ok(segments.join("/"))
}

/// Key expression matching the presence tokens of every device under `pattern`.
///
/// # Example
/// ```
/// use miniconf_common::keyexpr::discovery_key;
///
/// assert_eq!(
///     discovery_key("dt/sinara/dual-pid/+").unwrap(),
///     "dt/sinara/dual-pid/*/alive"
/// );
/// ```
pub fn discovery_key(pattern: &str) -> Result<String> {
    Ok(format!("{}/{}", translate_pattern(pattern)?, ALIVE_SEGMENT))
}

/// Extract the device prefix from a presence key.
///
/// Returns `None` if the key is not a presence key.
pub fn parse_alive_key(key: &str) -> Option<&str> {
    key.strip_suffix(ALIVE_SEGMENT)?
        .strip_suffix('/')
        .filter(|prefix| !prefix.is_empty())
}
