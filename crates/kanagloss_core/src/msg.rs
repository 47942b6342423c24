use std::collections::HashMap;

use crate::dom::MutationRecord;
use crate::queue::RequestId;
use crate::session::{SessionId, StopReason};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Evaluate run state and start the engine if it is allowed to run.
    Start,
    /// Halt the engine and put the document back the way it was.
    Stop { reason: StopReason },
    /// New settings from the store or the operator.
    SettingsApplied { settings: Settings, persist: bool },
    /// Operator flipped the enable switch.
    ToggleEnabled,
    /// Operator asked for the built-in settings.
    ResetToDefaults,
    /// Operator asked to throw away all annotations and start over.
    RebuildRequested,
    /// Mutation records drained from the document.
    DocumentMutated(Vec<MutationRecord>),
    /// The debounce timer ran out.
    ScanTimerFired,
    /// Periodic context check.
    ContextTick,
    /// The host announced a navigation. `forced` signals come from
    /// frameworks known to swap the whole page without changing much else.
    NavigationSignal { source: String, forced: bool },
    /// A translator call settled.
    TranslationFinished {
        request_id: RequestId,
        session: SessionId,
        tokens: Vec<String>,
        outcome: TranslationOutcome,
    },
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// Token to translation; tokens missing from the map count as failed.
    Translated(HashMap<String, String>),
    /// The whole request was rejected.
    Failed { reason: String },
}
