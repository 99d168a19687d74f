//! Control protocol between the master and its workers.
//!
//! Messages are JSON objects tagged by `type`, one per line:
//!
//! ```text
//! master → worker   {"type":"shutdown","signal":"SIGTERM"}
//!                   {"type":"forceShutdown"}
//! worker → master   {"type":"online"}
//! ```
//!
//! Unrecognised tags decode to the `Unknown` variant so the receiver can ignore
//! them explicitly instead of failing the channel.

use serde::{Deserialize, Serialize};

use crate::signal::ShutdownSignal;

/// Message from master to worker selecting graceful or forced termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Directive {
    /// Run the shutdown hook (at most once), then exit.
    #[serde(rename = "shutdown")]
    Shutdown {
        /// Signal that triggered the pool shutdown.
        signal: ShutdownSignal,
    },

    /// Exit immediately with failure status.
    #[serde(rename = "forceShutdown")]
    ForceShutdown,

    /// Any other message kind; ignored by workers.
    #[serde(other)]
    Unknown,
}

/// Message from worker to master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Report {
    /// Worker runtime is up and about to invoke the run entry.
    #[serde(rename = "online")]
    Online,

    #[serde(other)]
    Unknown,
}

impl Directive {
    /// Create a shutdown directive.
    pub fn shutdown(signal: ShutdownSignal) -> Self {
        Self::Shutdown { signal }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Directive::Shutdown { .. } => "shutdown",
            Directive::ForceShutdown => "forceShutdown",
            Directive::Unknown => "unknown",
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

impl Report {
    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}
