//! Control commands.
//!
//! A closed command type with an exhaustive handler in the engine:
//! adding a command without handling it is a compile error, unlike the
//! string-keyed dispatch this replaces.

use serde::{Deserialize, Serialize};

use crate::profile::Profile;

/// Commands the UI collaborator can issue.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    /// Replace the active profile's contents, set the enabled flag, and
    /// run a full compile-and-apply pass. The only compile trigger among
    /// the commands.
    UpdateRules { enabled: bool, profile: Profile },

    /// Read the match counter.
    GetCount,

    /// Reset the match counter to zero.
    ResetCount,

    /// Arm the auto-disable timer; zero minutes clears it.
    SetTimer { minutes: u64 },

    /// Disarm the auto-disable timer.
    ClearTimer,

    /// Export the profile bundle.
    ExportProfiles,

    /// Merge a profile bundle into the store and re-apply rules.
    ImportProfiles { payload: String },

    /// Summarize current engine state.
    Status,
}

/// Successful command results.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandOutcome {
    Ack { success: bool },
    Count { count: u64 },
    Bundle { bundle: String },
    Status(StatusReport),
}

impl CommandOutcome {
    pub fn ack() -> Self {
        Self::Ack { success: true }
    }
}

/// Engine state summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub enabled: bool,
    pub active_profile: String,
    pub active_headers: usize,
    pub targets: usize,
    pub excludes: usize,
    pub installed_rules: usize,
    pub match_count: u64,
    pub timer_deadline_ms: Option<u64>,
}
