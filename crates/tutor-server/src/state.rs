//! Shared application state.

use std::sync::Arc;

use parking_lot::RwLock;

use tutor_core::{Result, Settings, TutorConfig};
use tutor_relay::Dispatcher;
use tutor_session::TutorSession;
use tutor_store::{ActionStore, WordStore};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: TutorConfig,
    pub words: Arc<WordStore>,
    pub actions: Arc<ActionStore>,
    pub settings: RwLock<Settings>,
    pub session: TutorSession,
    pub dispatcher: Dispatcher,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: TutorConfig) -> Result<Self> {
        let words = Arc::new(WordStore::open(&config.data_paths.wordbank)?);
        let actions = Arc::new(ActionStore::open(&config.data_paths.wordbank)?);

        let settings = Settings::load(&config.data_paths.settings_file);
        let session = TutorSession::new(words.clone());
        let dispatcher = Dispatcher::new(words.clone(), actions.clone());

        Ok(Self {
            config,
            words,
            actions,
            settings: RwLock::new(settings),
            session,
            dispatcher,
            http: reqwest::Client::new(),
        })
    }
}
