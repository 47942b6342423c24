use std::fmt;

use crate::session::SessionId;
use crate::settings::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Enabled,
    Disabled,
    Excluded,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Enabled => "enabled",
            RunStatus::Disabled => "disabled",
            RunStatus::Excluded => "excluded",
        })
    }
}

/// Counters for the operator status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusView {
    pub status: RunStatus,
    pub running: bool,
    pub session: SessionId,
    pub pending: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub cache: usize,
    pub backend: Backend,
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status={} | session={} | queued={} | inFlight={} | cache={} | backend={}",
            self.status, self.session, self.queued, self.in_flight, self.cache, self.backend
        )
    }
}
