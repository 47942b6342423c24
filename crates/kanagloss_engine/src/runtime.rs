//! The single task that owns the document and the engine state.
//!
//! Everything reaches the core through one command channel, so document
//! edits, timer callbacks and translation results never interleave inside an
//! `update` call. Timers are plain deadlines polled by the same `select!`.

use std::sync::Arc;
use std::time::Duration;

use kanagloss_core::{
    update, Document, Effect, EngineState, Msg, Settings, StatusView, StopReason,
    TranslationOutcome, TranslationRequest,
};
use kanagloss_logging::{gloss_debug, gloss_info, gloss_warn};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use crate::persist::{save_settings, SettingsStore};
use crate::translator::{
    http_translator_factory, HttpSettings, TranslateError, Translator, TranslatorFactory,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine task has shut down")]
    Closed,
}

#[derive(Clone)]
pub struct EngineConfig {
    pub settings: Settings,
    pub translator_factory: TranslatorFactory,
    pub store: Option<Arc<dyn SettingsStore>>,
}

impl EngineConfig {
    /// HTTP adapters with default timeouts and no settings store.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            translator_factory: http_translator_factory(HttpSettings::default()),
            store: None,
        }
    }

    pub fn with_translator_factory(mut self, factory: TranslatorFactory) -> Self {
        self.translator_factory = factory;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }
}

type DocumentEdit = Box<dyn FnOnce(&mut Document) + Send>;

enum Command {
    Edit(DocumentEdit),
    Navigate {
        url: Option<String>,
        source: String,
        forced: bool,
    },
    Dispatch(Msg),
    Status(oneshot::Sender<StatusView>),
    WhenSettled(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<Document>),
}

/// Cheap to clone; every clone talks to the same engine task.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    /// Spawn the engine on the current tokio runtime and start it.
    pub fn spawn(doc: Document, config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let backend = config.settings.backend_settings();
        kanagloss_logging::set_verbose(config.settings.debug);
        let engine = EngineLoop {
            state: EngineState::new(config.settings),
            doc,
            translator: (config.translator_factory)(&backend),
            factory: config.translator_factory,
            store: config.store,
            scan_deadline: None,
            context_timer: None,
            result_tx,
            settle_waiters: Vec::new(),
        };
        tokio::spawn(engine.run(cmd_rx, result_rx));
        Self { cmd_tx }
    }

    /// Run a host-side edit against the document. Changes made while the
    /// engine is running are picked up like any other page mutation.
    pub fn edit<F>(&self, edit: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Document) + Send + 'static,
    {
        self.send(Command::Edit(Box::new(edit)))
    }

    /// Report a navigation. `url` moves the location first when given.
    pub fn navigate(
        &self,
        url: Option<String>,
        source: impl Into<String>,
        forced: bool,
    ) -> Result<(), EngineError> {
        self.send(Command::Navigate {
            url,
            source: source.into(),
            forced,
        })
    }

    pub fn apply_settings(&self, settings: Settings, persist: bool) -> Result<(), EngineError> {
        self.send(Command::Dispatch(Msg::SettingsApplied { settings, persist }))
    }

    pub fn toggle_enabled(&self) -> Result<(), EngineError> {
        self.send(Command::Dispatch(Msg::ToggleEnabled))
    }

    pub fn rebuild(&self) -> Result<(), EngineError> {
        self.send(Command::Dispatch(Msg::RebuildRequested))
    }

    pub fn reset_to_defaults(&self) -> Result<(), EngineError> {
        self.send(Command::Dispatch(Msg::ResetToDefaults))
    }

    pub fn stop(&self) -> Result<(), EngineError> {
        self.send(Command::Dispatch(Msg::Stop {
            reason: StopReason::Requested,
        }))
    }

    pub async fn status(&self) -> Result<StatusView, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx))?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Resolves once no scan is due, no request is out and every queued
    /// token is cooling down.
    pub async fn settled(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::WhenSettled(tx))?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Stop the task and hand the document back as it is now.
    pub async fn shutdown(self) -> Result<Document, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx))?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.cmd_tx.send(command).map_err(|_| EngineError::Closed)
    }
}

struct ContextTimer {
    next: Instant,
    interval: Duration,
}

struct EngineLoop {
    state: EngineState,
    doc: Document,
    translator: Result<Arc<dyn Translator>, TranslateError>,
    factory: TranslatorFactory,
    store: Option<Arc<dyn SettingsStore>>,
    scan_deadline: Option<Instant>,
    context_timer: Option<ContextTimer>,
    result_tx: mpsc::UnboundedSender<Msg>,
    settle_waiters: Vec<oneshot::Sender<()>>,
}

impl EngineLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut results: mpsc::UnboundedReceiver<Msg>,
    ) {
        self.dispatch(Msg::Start);

        loop {
            let scan_at = self.scan_deadline;
            let context_at = self.context_timer.as_ref().map(|timer| timer.next);

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        gloss_debug!("All engine handles dropped, stopping");
                        return;
                    };
                    if let Command::Shutdown(reply) = command {
                        let _ = reply.send(self.doc);
                        return;
                    }
                    self.handle_command(command);
                }
                Some(msg) = results.recv() => self.dispatch(msg),
                _ = sleep_until_opt(scan_at) => {
                    self.scan_deadline = None;
                    self.dispatch(Msg::ScanTimerFired);
                }
                _ = sleep_until_opt(context_at) => {
                    if let Some(timer) = self.context_timer.as_mut() {
                        timer.next = Instant::now() + timer.interval;
                    }
                    self.dispatch(Msg::ContextTick);
                }
            }

            self.release_settle_waiters();
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Edit(edit) => {
                edit(&mut self.doc);
                self.dispatch(Msg::NoOp);
            }
            Command::Navigate {
                url,
                source,
                forced,
            } => {
                if let Some(url) = url {
                    self.doc.set_url(url);
                }
                self.dispatch(Msg::NavigationSignal { source, forced });
            }
            Command::Dispatch(msg) => self.dispatch(msg),
            Command::Status(reply) => {
                let _ = reply.send(self.state.view(&self.doc));
            }
            Command::WhenSettled(reply) => self.settle_waiters.push(reply),
            // Handled by the loop, which has to give up the document.
            Command::Shutdown(_) => {}
        }
    }

    /// Run `msg` through the core, then feed back whatever the host changed
    /// in the document meanwhile.
    fn dispatch(&mut self, msg: Msg) {
        self.step(msg);
        let records = self.doc.take_mutations();
        if !records.is_empty() {
            self.step(Msg::DocumentMutated(records));
        }
        if self.state.consume_dirty() {
            gloss_debug!("{}", self.state.view(&self.doc));
        }
    }

    fn step(&mut self, msg: Msg) {
        let now = Instant::now().into_std();
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, &mut self.doc, msg, now);
        self.state = state;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleScan { delay } => {
                self.scan_deadline = Some(Instant::now() + delay);
            }
            Effect::CancelScan => self.scan_deadline = None,
            Effect::StartContextTimer { interval } => {
                self.context_timer = Some(ContextTimer {
                    next: Instant::now() + interval,
                    interval,
                });
            }
            Effect::StopContextTimer => self.context_timer = None,
            Effect::Translate(request) => self.spawn_translation(request),
            Effect::PersistSettings(settings) => {
                let Some(store) = self.store.clone() else {
                    gloss_debug!("No settings store configured, not persisting");
                    return;
                };
                tokio::spawn(async move {
                    save_settings(store.as_ref(), &settings).await;
                });
            }
            Effect::ConfigureBackend(backend) => {
                self.translator = (self.factory)(&backend);
                match &self.translator {
                    Ok(_) => gloss_info!("Translator backend set to {}", backend.backend),
                    Err(err) => gloss_warn!("Translator backend {} unavailable: {}", backend.backend, err),
                }
            }
            Effect::SetVerboseLogging(verbose) => kanagloss_logging::set_verbose(verbose),
        }
    }

    fn spawn_translation(&self, request: TranslationRequest) {
        let result_tx = self.result_tx.clone();
        let translator = self.translator.clone();
        tokio::spawn(async move {
            let TranslationRequest {
                id,
                session,
                tokens,
                source_lang,
                target_lang,
            } = request;
            gloss_debug!("Request {} carries {} tokens", id, tokens.len());
            let result = match translator {
                Ok(translator) => translator.translate(&tokens, &source_lang, &target_lang).await,
                Err(err) => Err(err),
            };
            let outcome = match result {
                Ok(map) => TranslationOutcome::Translated(map),
                Err(err) => TranslationOutcome::Failed {
                    reason: err.to_string(),
                },
            };
            let _ = result_tx.send(Msg::TranslationFinished {
                request_id: id,
                session,
                tokens,
                outcome,
            });
        });
    }

    fn release_settle_waiters(&mut self) {
        if self.settle_waiters.is_empty() {
            return;
        }
        let now = Instant::now().into_std();
        if self.scan_deadline.is_some() || !self.state.is_settled(now) {
            return;
        }
        for waiter in self.settle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
