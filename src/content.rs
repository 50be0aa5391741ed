use crate::models::{DhikrId, TimeOfDay};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

pub const CONTENT_FILE: &str = "data.json";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid content in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One remembrance phrase with its repetition target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhikrItem {
    #[serde(rename = "bilow", default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<String>,
    #[serde(rename = "duco")]
    pub text: String,
    #[serde(rename = "tiro", deserialize_with = "target_count")]
    pub target: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adhkar {
    pub subax: Vec<DhikrItem>,
    pub galab: Vec<DhikrItem>,
}

impl Adhkar {
    pub fn items(&self, time: TimeOfDay) -> &[DhikrItem] {
        match time {
            TimeOfDay::Subax => &self.subax,
            TimeOfDay::Galab => &self.galab,
        }
    }

    pub fn get(&self, id: &DhikrId) -> Option<&DhikrItem> {
        self.items(id.time).get(id.index)
    }
}

#[derive(Deserialize)]
struct ContentFile {
    xuska: Adhkar,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Number(i64),
    Text(String),
}

// `tiro` shows up both as "33" and 33 in content files.
fn target_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match RawCount::deserialize(deserializer)? {
        RawCount::Number(value) => u32::try_from(value).ok(),
        RawCount::Text(text) => text.trim().parse::<u32>().ok(),
    };
    match parsed {
        Some(value) if value >= 1 => Ok(value),
        _ => Err(serde::de::Error::custom(
            "tiro must be a positive integer",
        )),
    }
}

pub fn parse_content(bytes: &[u8]) -> Result<Adhkar, serde_json::Error> {
    serde_json::from_slice::<ContentFile>(bytes).map(|file| file.xuska)
}

pub async fn load_content(path: &Path) -> Result<Adhkar, ContentError> {
    let bytes = fs::read(path).await.map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_content(&bytes).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
