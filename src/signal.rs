//! # Recognised shutdown signals.
//!
//! [`ShutdownSignal`] names the termination signals that trigger a pool shutdown:
//!
//! | Variant  | Name       | Typical origin                                   |
//! |----------|------------|--------------------------------------------------|
//! | `Int`    | `SIGINT`   | Ctrl-C in a terminal                             |
//! | `Term`   | `SIGTERM`  | `kill`, systemd, Kubernetes                      |
//! | `Hup`    | `SIGHUP`   | controlling terminal closed                      |
//! | `Break`  | `SIGBREAK` | Ctrl-Break (windows only)                        |
//! | `Usr2`   | `SIGUSR2`  | file watchers asking for a restart               |
//!
//! Not every platform delivers every signal; unsupported ones are simply never observed.
//! The canonical name is also the wire representation inside a shutdown directive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A termination signal from the recognised set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShutdownSignal {
    #[serde(rename = "SIGINT")]
    Int,
    #[serde(rename = "SIGTERM")]
    Term,
    #[serde(rename = "SIGHUP")]
    Hup,
    #[serde(rename = "SIGBREAK")]
    Break,
    #[serde(rename = "SIGUSR2")]
    Usr2,
}

impl ShutdownSignal {
    /// Every recognised signal, in declaration order.
    pub const ALL: [ShutdownSignal; 5] = [
        ShutdownSignal::Int,
        ShutdownSignal::Term,
        ShutdownSignal::Hup,
        ShutdownSignal::Break,
        ShutdownSignal::Usr2,
    ];

    /// Returns the canonical `SIG*` name.
    pub fn name(self) -> &'static str {
        match self {
            ShutdownSignal::Int => "SIGINT",
            ShutdownSignal::Term => "SIGTERM",
            ShutdownSignal::Hup => "SIGHUP",
            ShutdownSignal::Break => "SIGBREAK",
            ShutdownSignal::Usr2 => "SIGUSR2",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no recognised signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised shutdown signal: {0:?}")]
pub struct UnknownSignal(pub String);

impl FromStr for ShutdownSignal {
    type Err = UnknownSignal;

    /// Accepts the canonical name, case-insensitively, with or without the `SIG` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "INT" => Ok(ShutdownSignal::Int),
            "TERM" => Ok(ShutdownSignal::Term),
            "HUP" => Ok(ShutdownSignal::Hup),
            "BREAK" => Ok(ShutdownSignal::Break),
            "USR2" => Ok(ShutdownSignal::Usr2),
            _ => Err(UnknownSignal(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matches_display() {
        for sig in ShutdownSignal::ALL {
            assert_eq!(sig.to_string(), sig.name());
        }
    }

    #[test]
    fn test_parse_accepts_short_and_long_forms() {
        assert_eq!("SIGTERM".parse::<ShutdownSignal>(), Ok(ShutdownSignal::Term));
        assert_eq!("term".parse::<ShutdownSignal>(), Ok(ShutdownSignal::Term));
        assert_eq!(" sigusr2 ".parse::<ShutdownSignal>(), Ok(ShutdownSignal::Usr2));
        assert!("SIGKILL".parse::<ShutdownSignal>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        let json = serde_json::to_string(&ShutdownSignal::Hup).unwrap();
        assert_eq!(json, "\"SIGHUP\"");
        let back: ShutdownSignal = serde_json::from_str("\"SIGBREAK\"").unwrap();
        assert_eq!(back, ShutdownSignal::Break);
    }
}
