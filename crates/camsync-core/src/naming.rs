//! Endpoint naming.
//!
//! The name is what the downstream sink matches sources on, so it must be
//! stable across cycles for the same (key, device, channel).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How endpoint names are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// The channel label only. Matches pre-configured sources on the sink.
    #[default]
    Simple,
    /// `"{key}/{device} - {label} (ch{channel})"`, unique across devices.
    Full,
}

impl NamingMode {
    /// Build the endpoint name for one (group, device, channel).
    pub fn endpoint_name(&self, key: &str, device: &str, channel: u32, label: &str) -> String {
        match self {
            NamingMode::Simple => safe_name(label),
            NamingMode::Full => safe_name(&format!("{key}/{device} - {label} (ch{channel})")),
        }
    }
}

impl FromStr for NamingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(NamingMode::Simple),
            "full" => Ok(NamingMode::Full),
            _ => Err(CoreError::UnknownNamingMode(s.to_string())),
        }
    }
}

impl fmt::Display for NamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingMode::Simple => f.write_str("simple"),
            NamingMode::Full => f.write_str("full"),
        }
    }
}

/// Collapse every whitespace run to one space and trim.
pub fn safe_name(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_uses_label() {
        let name = NamingMode::Simple.endpoint_name("K", "D1", 2, "Cam3");
        assert_eq!(name, "Cam3");
    }

    #[test]
    fn test_full_encodes_key_device_channel() {
        let name = NamingMode::Full.endpoint_name("K", "D1", 2, "Cam3");
        assert_eq!(name, "K/D1 - Cam3 (ch2)");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let name = NamingMode::Full.endpoint_name(" K ", "D1", 0, "Car   Camera\t1 ");
        assert_eq!(name, "K /D1 - Car Camera 1 (ch0)");

        let name = NamingMode::Simple.endpoint_name("K", "D1", 0, "  Depan\n Kiri ");
        assert_eq!(name, "Depan Kiri");
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("simple".parse::<NamingMode>().unwrap(), NamingMode::Simple);
        assert_eq!(" FULL ".parse::<NamingMode>().unwrap(), NamingMode::Full);
        assert!("fancy".parse::<NamingMode>().is_err());
    }

    #[test]
    fn test_default_is_simple() {
        assert_eq!(NamingMode::default(), NamingMode::Simple);
    }
}
