use std::time::Duration;

use crate::queue::RequestId;
use crate::session::SessionId;
use crate::settings::{BackendSettings, Settings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// (Re)arm the single scan timer; a pending one is replaced.
    ScheduleScan { delay: Duration },
    CancelScan,
    StartContextTimer { interval: Duration },
    StopContextTimer,
    Translate(TranslationRequest),
    PersistSettings(Settings),
    ConfigureBackend(BackendSettings),
    SetVerboseLogging(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub id: RequestId,
    pub session: SessionId,
    pub tokens: Vec<String>,
    pub source_lang: String,
    pub target_lang: String,
}
