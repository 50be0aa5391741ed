use crate::config::Config;
use crate::content::{load_content, CONTENT_FILE};
use crate::counter::CounterManager;
use crate::errors::AppError;
use crate::i18n::{load_with_fallback, Labels, Language, Translations};
use crate::storage::{load_state, persist_state};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Everything one page session reads: counters, settings and the loaded
/// translations, behind a single lock.
#[derive(Debug)]
pub struct Session {
    pub counter: CounterManager,
    pub translations: Option<Translations>,
}

impl Session {
    pub fn new(counter: CounterManager) -> Self {
        Self {
            counter,
            translations: None,
        }
    }

    pub fn labels(&self) -> Labels {
        Labels::from_translations(self.translations.as_ref())
    }

    /// Installs freshly loaded translations and remembers the language that
    /// actually loaded, which may be the fallback.
    pub fn apply_translations(&mut self, language: Language, translations: Translations) {
        self.counter.set_language(language);
        self.translations = Some(translations);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub state_path: PathBuf,
    pub content_dir: PathBuf,
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(config: &Config, session: Session) -> Self {
        Self {
            state_path: config.state_path.clone(),
            content_dir: config.content_dir.clone(),
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Restores the stored session and loads content and translations from
    /// `config.content_dir`. Load failures are logged and leave the session
    /// in a degraded but renderable state.
    pub async fn load(config: &Config) -> Self {
        let stored = load_state(&config.state_path).await;
        let mut session = Session::new(CounterManager::new(stored, config.reset_schedule.clone()));

        let content_path = config.content_dir.join(CONTENT_FILE);
        match load_content(&content_path).await {
            Ok(adhkar) => {
                info!(
                    "loaded {} morning and {} evening adhkar",
                    adhkar.subax.len(),
                    adhkar.galab.len()
                );
                session.counter.set_content(adhkar);
            }
            Err(err) => {
                error!("failed to load adhkar: {err}");
                session.counter.set_content_error(err.to_string());
            }
        }

        let language = session.counter.language();
        if let Some((loaded, translations)) = load_with_fallback(&config.content_dir, language).await {
            if session.counter.language_set() {
                session.apply_translations(loaded, translations);
            } else {
                // Until the visitor picks a language the choice stays open.
                session.translations = Some(translations);
            }
        }

        Self::new(config, session)
    }

    pub async fn persist(&self, session: &Session) -> Result<(), AppError> {
        persist_state(&self.state_path, session.counter.state()).await
    }
}
