//! kanagloss core: the document model and the pure annotation state machine.
//!
//! Nothing in here touches a clock, a socket or a file. Time comes in as an
//! `Instant` and everything that must wait goes out as an [`Effect`].
pub mod annotate;
pub mod cache;
pub mod dom;
mod effect;
pub mod fingerprint;
pub mod matcher;
mod msg;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod settings;
mod state;
mod update;
mod view_model;

pub use annotate::{Annotation, GLOSS_ATTR, RT_CLASS, RUBY_CLASS, SESSION_ATTR};
pub use cache::TranslationCache;
pub use dom::{Document, DocumentError, MutationRecord, NodeId, NodeKind};
pub use effect::{Effect, TranslationRequest};
pub use fingerprint::{ContextSnapshot, IdentityTable, ShiftReason};
pub use msg::{Msg, TranslationOutcome};
pub use queue::{RequestId, FAILURE_COOLDOWN};
pub use session::{ResetReason, SessionId, StopReason};
pub use settings::{Backend, BackendSettings, ExclusionList, Settings, SettingsError};
pub use state::EngineState;
pub use update::{
    update, CONTEXT_CHECK_INTERVAL, FORCED_NAVIGATION_SCAN_DELAY, FORCED_RESET_THROTTLE,
    SOURCE_LANG, TARGET_LANG,
};
pub use view_model::{RunStatus, StatusView};
