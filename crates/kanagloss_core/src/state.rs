use std::time::Instant;

use crate::cache::TranslationCache;
use crate::dom::Document;
use crate::fingerprint::{ContextSnapshot, IdentityTable};
use crate::queue::TranslationQueue;
use crate::scheduler::PendingSet;
use crate::session::SessionId;
use crate::settings::{ExclusionList, Settings};
use crate::view_model::{RunStatus, StatusView};

/// Everything one engine instance knows. Owned by whoever drives `update`.
#[derive(Debug, Clone)]
pub struct EngineState {
    settings: Settings,
    exclusions: ExclusionList,
    running: bool,
    session: SessionId,
    pub(crate) pending: PendingSet,
    pub(crate) queue: TranslationQueue,
    pub(crate) cache: TranslationCache,
    pub(crate) identities: IdentityTable,
    pub(crate) snapshot: Option<ContextSnapshot>,
    /// URL and time of the last forced-navigation reset.
    pub(crate) last_forced_reset: Option<(String, Instant)>,
    dirty: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl EngineState {
    pub fn new(settings: Settings) -> Self {
        let settings = settings.sanitized();
        Self {
            exclusions: ExclusionList::compile(&settings.exclusion_patterns),
            settings,
            running: false,
            session: SessionId::default(),
            pending: PendingSet::new(),
            queue: TranslationQueue::new(),
            cache: TranslationCache::new(),
            identities: IdentityTable::new(),
            snapshot: None,
            last_forced_reset: None,
            dirty: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclusions.matches(url)
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn queue(&self) -> &TranslationQueue {
        &self.queue
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// No scan pending, no request out, and every queued token is cooling down.
    pub fn is_settled(&self, now: Instant) -> bool {
        self.pending.is_empty()
            && self.queue.in_flight_len() == 0
            && !self.queue.has_requestable(now)
    }

    pub fn view(&self, doc: &Document) -> StatusView {
        let status = if self.is_excluded(doc.url()) {
            RunStatus::Excluded
        } else if self.settings.enabled {
            RunStatus::Enabled
        } else {
            RunStatus::Disabled
        };
        StatusView {
            status,
            running: self.running,
            session: self.session,
            pending: self.pending.len(),
            queued: self.queue.queued_len(),
            in_flight: self.queue.in_flight_len(),
            cache: self.cache.len(),
            backend: self.settings.backend,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn replace_settings(&mut self, settings: Settings) {
        self.exclusions = ExclusionList::compile(&settings.exclusion_patterns);
        self.settings = settings;
        self.mark_dirty();
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
        self.mark_dirty();
    }

    pub(crate) fn advance_session(&mut self) -> SessionId {
        self.session = self.session.next();
        self.mark_dirty();
        self.session
    }
}
