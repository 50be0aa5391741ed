//! UI translations loaded from `<code>.json` files in the content directory.
//!
//! Every key the page renders is a required field, so a truncated or
//! misspelled translation file fails at load time instead of rendering blanks.

use crate::content::ContentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{error, warn};

pub const DEFAULT_RESET_TEXT: &str = "Dib u bilow";
pub const DEFAULT_COMPLETED_TEXT: &str = "Dhamaaday";
pub const DEFAULT_ERROR_TEXT: &str =
    "Khalad ka dhacay soo dejinta xuska. Fadlan isku day mar kale.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    So,
    En,
    Ar,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::So, Language::En, Language::Ar];

    pub fn code(self) -> &'static str {
        match self {
            Language::So => "so",
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Language::Ar)
    }

    /// Name shown in the language picker, in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::So => "Soomaali",
            Language::En => "English",
            Language::Ar => "العربية",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.code())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "so" => Ok(Language::So),
            "en" => Ok(Language::En),
            "ar" => Ok(Language::Ar),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translations {
    pub app: AppText,
    pub content: ContentText,
    pub settings: SettingsText,
    pub navigation: NavigationText,
    pub counter: CounterText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppText {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentText {
    pub intro: String,
    pub loading: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsText {
    pub title: String,
    pub font_size: String,
    pub font_small: String,
    pub font_medium: String,
    pub font_large: String,
    pub theme: String,
    pub theme_light: String,
    pub theme_dark: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationText {
    pub morning: String,
    pub evening: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterText {
    pub reset: String,
    pub completed: String,
}

pub async fn load_translations(dir: &Path, lang: Language) -> Result<Translations, ContentError> {
    let path = dir.join(lang.file_name());
    let bytes = fs::read(&path)
        .await
        .map_err(|source| ContentError::Io {
            path: path.clone(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| ContentError::Parse { path, source })
}

/// Loads `lang`, falling back to the default language once. `None` means
/// neither file was usable and the caller should keep what it has.
pub async fn load_with_fallback(dir: &Path, lang: Language) -> Option<(Language, Translations)> {
    match load_translations(dir, lang).await {
        Ok(translations) => return Some((lang, translations)),
        Err(err) => error!("failed to load translations for {lang}: {err}"),
    }

    let fallback = Language::default();
    if lang == fallback {
        return None;
    }

    warn!("falling back to {fallback} translations");
    match load_translations(dir, fallback).await {
        Ok(translations) => Some((fallback, translations)),
        Err(err) => {
            error!("failed to load fallback translations: {err}");
            None
        }
    }
}

/// Strings the list renderer needs, with Somali defaults when no
/// translation file could be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub reset: String,
    pub completed: String,
    pub error: String,
}

impl Labels {
    pub fn from_translations(translations: Option<&Translations>) -> Self {
        match translations {
            Some(t) => Self {
                reset: t.counter.reset.clone(),
                completed: t.counter.completed.clone(),
                error: t.content.error.clone(),
            },
            None => Self::default(),
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            reset: DEFAULT_RESET_TEXT.to_string(),
            completed: DEFAULT_COMPLETED_TEXT.to_string(),
            error: DEFAULT_ERROR_TEXT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn content_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("content")
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("xuska_i18n_{tag}_{}_{nanos}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn language_codes() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
        assert!(Language::Ar.is_rtl());
        assert!(!Language::So.is_rtl());
        assert_eq!(Language::default(), Language::So);
    }

    #[tokio::test]
    async fn bundled_translations_load() {
        for lang in Language::ALL {
            let translations = load_translations(&content_dir(), lang).await.unwrap();
            assert!(!translations.app.title.is_empty(), "{lang}");
        }
    }

    #[tokio::test]
    async fn missing_language_falls_back_to_default() {
        let dir = scratch_dir("fallback");
        std::fs::copy(content_dir().join("so.json"), dir.join("so.json")).unwrap();

        let (lang, translations) = load_with_fallback(&dir, Language::En).await.unwrap();
        assert_eq!(lang, Language::So);
        assert_eq!(translations.counter.reset, DEFAULT_RESET_TEXT);
    }

    #[tokio::test]
    async fn incomplete_file_is_rejected() {
        let dir = scratch_dir("incomplete");
        std::fs::write(dir.join("en.json"), r#"{"app":{"title":"Adhkar"}}"#).unwrap();

        assert!(load_translations(&dir, Language::En).await.is_err());
        assert!(load_with_fallback(&dir, Language::En).await.is_none());
    }

    #[test]
    fn labels_default_to_somali() {
        let labels = Labels::from_translations(None);
        assert_eq!(labels.reset, DEFAULT_RESET_TEXT);
        assert_eq!(labels.completed, DEFAULT_COMPLETED_TEXT);
        assert_eq!(labels.error, DEFAULT_ERROR_TEXT);
    }
}
