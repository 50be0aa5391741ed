use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    #[default]
    Subax,
    Galab,
}

impl TimeOfDay {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Subax => "subax",
            TimeOfDay::Galab => "galab",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "subax" => Ok(TimeOfDay::Subax),
            "galab" => Ok(TimeOfDay::Galab),
            other => Err(format!("unknown time of day '{other}', expected 'subax' or 'galab'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    // Anything other than "dark" renders light, matching older stored values.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

/// Identifies one dhikr by its list and position, written as `"<time>-<index>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DhikrId {
    pub time: TimeOfDay,
    pub index: usize,
}

impl DhikrId {
    pub fn new(time: TimeOfDay, index: usize) -> Self {
        Self { time, index }
    }
}

impl fmt::Display for DhikrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.time, self.index)
    }
}

impl FromStr for DhikrId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (time, index) = value
            .split_once('-')
            .ok_or_else(|| format!("malformed dhikr id '{value}'"))?;
        let time = time.parse::<TimeOfDay>()?;
        let malformed = || format!("malformed dhikr index in '{value}'");
        let parsed = index.parse::<usize>().map_err(|_| malformed())?;
        // One spelling per item: no sign, no leading zeros.
        if parsed.to_string() != index {
            return Err(malformed());
        }
        Ok(Self { time, index: parsed })
    }
}

/// Everything the app keeps between visits, keyed the way the browser build
/// stored it in local storage.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StoredState {
    #[serde(rename = "completedDhikr", default)]
    pub completed: BTreeMap<String, u32>,
    #[serde(rename = "lastResetDate", default)]
    pub last_reset_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "languageSet", default)]
    pub language_set: bool,
    #[serde(rename = "fontSize", default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterView {
    pub id: String,
    pub current: u32,
    pub target: u32,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub time: TimeOfDay,
    pub last_reset_date: String,
    pub counts: BTreeMap<String, u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub time: Option<TimeOfDay>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SettingsRequest {
    pub font_size: Option<String>,
    pub theme: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub language: String,
    pub language_set: bool,
    pub font_size: Option<String>,
    pub theme: String,
}
