use std::fmt;

use crate::fingerprint::ShiftReason;

/// Monotonic session number. Everything the engine writes is stamped with
/// the session that was current when the work started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the current session was thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetReason {
    EngineStart,
    Manual,
    SettingsUpdated,
    /// Detected by comparing context snapshots; `trigger` names the check
    /// that noticed (`process`, `interval` or a navigation source).
    ContextShift { shift: ShiftReason, trigger: String },
    ForcedNavigation { source: String },
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetReason::EngineStart => f.write_str("engine-start"),
            ResetReason::Manual => f.write_str("manual"),
            ResetReason::SettingsUpdated => f.write_str("settings-updated"),
            ResetReason::ContextShift { shift, trigger } => write!(f, "{shift}:{trigger}"),
            ResetReason::ForcedNavigation { source } => write!(f, "forced-navigation:{source}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    Disabled,
    ExcludedUrl,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::Requested => "requested",
            StopReason::Disabled => "disabled",
            StopReason::ExcludedUrl => "excluded-url",
        })
    }
}
