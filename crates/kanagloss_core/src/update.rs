use std::time::{Duration, Instant};

use kanagloss_logging::{gloss_debug, gloss_error, gloss_info, gloss_warn};

use crate::annotate::{revert_annotations, scan_root, write_gloss};
use crate::dom::Document;
use crate::effect::{Effect, TranslationRequest};
use crate::fingerprint::{compare, snapshot};
use crate::msg::{Msg, TranslationOutcome};
use crate::session::{ResetReason, StopReason};
use crate::settings::Settings;
use crate::state::EngineState;

pub const CONTEXT_CHECK_INTERVAL: Duration = Duration::from_millis(1_200);
pub const FORCED_NAVIGATION_SCAN_DELAY: Duration = Duration::from_millis(180);
/// A second forced signal for the same URL inside this window is not a new page.
pub const FORCED_RESET_THROTTLE: Duration = Duration::from_secs(1);
pub const SOURCE_LANG: &str = "ja";
pub const TARGET_LANG: &str = "en";

const IMMEDIATELY: Duration = Duration::ZERO;

/// Apply `msg` to the engine. All document edits happen here; everything
/// that has to wait (timers, network, storage) comes back as effects.
pub fn update(
    mut state: EngineState,
    doc: &mut Document,
    msg: Msg,
    now: Instant,
) -> (EngineState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => evaluate_run_state(&mut state, doc),
        Msg::Stop { reason } => stop(&mut state, doc, reason),
        Msg::SettingsApplied { settings, persist } => {
            apply_settings(&mut state, doc, settings, persist)
        }
        Msg::ToggleEnabled => {
            let mut settings = state.settings().clone();
            settings.enabled = !settings.enabled;
            apply_settings(&mut state, doc, settings, true)
        }
        Msg::ResetToDefaults => apply_settings(&mut state, doc, Settings::default(), true),
        Msg::RebuildRequested => {
            if !state.settings().enabled {
                return (state, Vec::new());
            }
            let mut effects = evaluate_run_state(&mut state, doc);
            if state.is_running() {
                reset_session(&mut state, doc, ResetReason::Manual);
                effects.push(Effect::ScheduleScan { delay: IMMEDIATELY });
            }
            effects
        }
        Msg::DocumentMutated(records) => {
            if !state.is_running() || records.is_empty() {
                return (state, Vec::new());
            }
            state.pending.absorb(&records);
            vec![Effect::ScheduleScan {
                delay: state.settings().debounce(),
            }]
        }
        Msg::ScanTimerFired => process_pending(&mut state, doc, now),
        Msg::ContextTick => {
            if !state.is_running() {
                return (state, Vec::new());
            }
            detect_context_shift(&mut state, doc, "interval");
            if !state.pending.is_empty() || state.queue.queued_len() > 0 {
                vec![Effect::ScheduleScan { delay: IMMEDIATELY }]
            } else {
                Vec::new()
            }
        }
        Msg::NavigationSignal { source, forced } => {
            on_navigation_signal(&mut state, doc, source, forced, now)
        }
        Msg::TranslationFinished {
            request_id,
            session,
            tokens,
            outcome,
        } => {
            state.queue.finish_request(request_id, &tokens);
            state.mark_dirty();
            let current = state.is_running() && session == state.session();
            match outcome {
                TranslationOutcome::Translated(map) => {
                    let ttl = state.settings().cache_ttl();
                    for token in &tokens {
                        let value = map
                            .get(token)
                            .map(|value| value.trim())
                            .filter(|value| !value.is_empty());
                        match value {
                            Some(value) => {
                                state.cache.set(token, value, ttl, now);
                                if current {
                                    let active = state.session();
                                    for holder in state.queue.take_targets(token) {
                                        write_gloss(doc, holder, value, active);
                                    }
                                    state.queue.clear_cooldown(token);
                                }
                            }
                            None if current => state.queue.cool_down(token, now),
                            None => {}
                        }
                    }
                    if !current {
                        gloss_debug!(
                            "Dropped stale translation response (request {}, session {}, current {})",
                            request_id,
                            session,
                            state.session()
                        );
                    }
                }
                TranslationOutcome::Failed { reason } => {
                    gloss_error!("Translation request {} failed: {}", request_id, reason);
                    if current {
                        for token in &tokens {
                            state.queue.cool_down(token, now);
                        }
                    }
                }
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn apply_settings(
    state: &mut EngineState,
    doc: &mut Document,
    settings: Settings,
    persist: bool,
) -> Vec<Effect> {
    let settings = settings.sanitized();
    state.replace_settings(settings.clone());

    let mut effects = vec![
        Effect::SetVerboseLogging(settings.debug),
        Effect::ConfigureBackend(settings.backend_settings()),
    ];
    if persist {
        effects.push(Effect::PersistSettings(settings));
    }
    effects.extend(evaluate_run_state(state, doc));
    if state.is_running() {
        reset_session(state, doc, ResetReason::SettingsUpdated);
        effects.push(Effect::ScheduleScan { delay: IMMEDIATELY });
    }
    effects
}

fn evaluate_run_state(state: &mut EngineState, doc: &mut Document) -> Vec<Effect> {
    if !state.settings().enabled {
        return stop(state, doc, StopReason::Disabled);
    }
    if state.is_excluded(doc.url()) {
        if state.is_running() {
            return stop(state, doc, StopReason::ExcludedUrl);
        }
        gloss_info!("Current URL is excluded; engine stays stopped");
        return Vec::new();
    }
    start(state, doc)
}

fn start(state: &mut EngineState, doc: &mut Document) -> Vec<Effect> {
    if state.is_running() {
        return Vec::new();
    }
    state.set_running(true);
    reset_session(state, doc, ResetReason::EngineStart);
    doc.take_mutations();
    doc.observe(true);
    gloss_info!("Engine started");
    vec![
        Effect::StartContextTimer {
            interval: CONTEXT_CHECK_INTERVAL,
        },
        Effect::ScheduleScan { delay: IMMEDIATELY },
    ]
}

fn stop(state: &mut EngineState, doc: &mut Document, reason: StopReason) -> Vec<Effect> {
    if !state.is_running() {
        return Vec::new();
    }
    state.set_running(false);
    doc.observe(false);
    doc.take_mutations();
    state.pending.clear();
    state.queue.clear();
    state.snapshot = None;
    revert_document(doc);
    gloss_info!("Engine stopped ({})", reason);
    vec![Effect::CancelScan, Effect::StopContextTimer]
}

/// Start a fresh session: drop queued work and annotations, queue the whole
/// body for a rescan and take a new baseline snapshot. The cache survives.
fn reset_session(state: &mut EngineState, doc: &mut Document, reason: ResetReason) {
    let session = state.advance_session();
    state.pending.clear();
    state.queue.clear();
    revert_document(doc);
    state.pending.add(doc.body());
    state.snapshot = Some(snapshot(doc, &mut state.identities));
    gloss_info!("Session reset #{} ({})", session, reason);
}

fn revert_document(doc: &mut Document) {
    let body = doc.body();
    if let Err(err) = revert_annotations(doc, body) {
        gloss_warn!("Failed to revert annotations: {}", err);
    }
}

/// Compare the page against the baseline; reset on a shift, otherwise
/// move the baseline forward. Returns whether a reset happened.
fn detect_context_shift(state: &mut EngineState, doc: &mut Document, trigger: &str) -> bool {
    if !state.is_running() {
        return false;
    }
    let current = snapshot(doc, &mut state.identities);
    let shift = match &state.snapshot {
        Some(previous) => compare(previous, &current),
        None => None,
    };
    match shift {
        Some(shift) => {
            reset_session(
                state,
                doc,
                ResetReason::ContextShift {
                    shift,
                    trigger: trigger.to_string(),
                },
            );
            true
        }
        None => {
            state.snapshot = Some(current);
            false
        }
    }
}

fn on_navigation_signal(
    state: &mut EngineState,
    doc: &mut Document,
    source: String,
    forced: bool,
    now: Instant,
) -> Vec<Effect> {
    if !state.is_running() {
        return Vec::new();
    }
    if forced {
        let url = doc.url().to_string();
        let throttled = matches!(
            &state.last_forced_reset,
            Some((last_url, at)) if *last_url == url && now.duration_since(*at) <= FORCED_RESET_THROTTLE
        );
        if !throttled {
            state.last_forced_reset = Some((url, now));
            reset_session(state, doc, ResetReason::ForcedNavigation { source });
            return vec![Effect::ScheduleScan {
                delay: FORCED_NAVIGATION_SCAN_DELAY,
            }];
        }
    }
    detect_context_shift(state, doc, &source);
    vec![Effect::ScheduleScan { delay: IMMEDIATELY }]
}

/// One scan batch: every pending root, then a queue flush.
fn process_pending(state: &mut EngineState, doc: &mut Document, now: Instant) -> Vec<Effect> {
    if !state.is_running() {
        return Vec::new();
    }
    if state.is_excluded(doc.url()) {
        return stop(state, doc, StopReason::ExcludedUrl);
    }
    detect_context_shift(state, doc, "process");

    let session = state.session();
    for root in state.pending.take() {
        let annotations = match scan_root(doc, root, session) {
            Ok(annotations) => annotations,
            Err(err) => {
                gloss_warn!("Skipped scan of {:?}: {}", root, err);
                continue;
            }
        };
        for annotation in annotations {
            match state.cache.get(&annotation.token, now) {
                Some(translation) => {
                    write_gloss(doc, annotation.holder, &translation, session);
                }
                None => state.queue.enqueue(&annotation.token, annotation.holder),
            }
        }
    }
    flush(state, doc, now)
}

fn flush(state: &mut EngineState, doc: &mut Document, now: Instant) -> Vec<Effect> {
    let chunk_size = state.settings().chunk_size;
    let plan = state.queue.plan_flush(&mut state.cache, now, chunk_size);
    let session = state.session();

    for resolved in &plan.resolved {
        for &holder in &resolved.targets {
            write_gloss(doc, holder, &resolved.translation, session);
        }
    }
    if !plan.dispatches.is_empty() {
        state.mark_dirty();
    }
    plan.dispatches
        .into_iter()
        .map(|dispatch| {
            Effect::Translate(TranslationRequest {
                id: dispatch.request_id,
                session,
                tokens: dispatch.tokens,
                source_lang: SOURCE_LANG.to_string(),
                target_lang: TARGET_LANG.to_string(),
            })
        })
        .collect()
}
