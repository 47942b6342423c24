//! kanagloss engine: translator adapters, settings storage, HTML import and
//! export, and the event loop that drives the core state machine.
mod html;
mod persist;
mod runtime;
mod translator;

pub use html::{parse_html, render_html, GLOSS_STYLESHEET};
pub use persist::{
    ensure_output_dir, load_settings, save_settings, AtomicFileWriter, JsonFileStore,
    PersistError, SettingsStore,
};
pub use runtime::{EngineConfig, EngineError, EngineHandle};
pub use translator::{
    http_translator_factory, parse_custom_response, parse_deepl_response,
    parse_google_response, CustomTranslator, DeeplTranslator, GoogleTranslator, HttpSettings,
    TranslateError, TranslationMap, Translator, TranslatorFactory,
};
