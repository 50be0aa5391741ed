//! Per-dhikr tap counters, the active time-of-day tab, and the daily reset.
//!
//! `CounterManager` is pure state: it never touches disk or the clock. Callers
//! persist [`CounterManager::state`] whenever a mutation reports `changed`, and
//! pass the current local time into [`CounterManager::check_for_reset`].

use crate::content::{Adhkar, DhikrItem};
use crate::i18n::Language;
use crate::models::{CounterView, DhikrId, StoredState, Theme, TimeOfDay};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CounterError {
    #[error("unknown dhikr '{0}'")]
    UnknownItem(DhikrId),
    #[error("adhkar content is not loaded")]
    ContentUnavailable,
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Wall-clock instants at which the counters start over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSchedule {
    instants: Vec<NaiveTime>,
}

impl ResetSchedule {
    pub fn new(instants: Vec<NaiveTime>) -> Self {
        Self { instants }
    }

    /// Parses a comma separated list such as `"04:00,15:00"`.
    pub fn parse(value: &str) -> Result<Self, String> {
        let mut instants = Vec::new();
        for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let instant = NaiveTime::parse_from_str(part, "%H:%M")
                .map_err(|err| format!("invalid reset time '{part}': {err}"))?;
            instants.push(instant);
        }
        if instants.is_empty() {
            return Err("at least one reset time is required".to_string());
        }
        Ok(Self { instants })
    }

    pub fn instants(&self) -> &[NaiveTime] {
        &self.instants
    }

    /// True when `now` falls inside one of the scheduled minutes.
    pub fn matches(&self, now: NaiveDateTime) -> bool {
        self.instants
            .iter()
            .any(|instant| instant.hour() == now.hour() && instant.minute() == now.minute())
    }
}

impl Default for ResetSchedule {
    fn default() -> Self {
        Self::new(
            NaiveTime::from_hms_opt(4, 0, 0)
                .into_iter()
                .chain(NaiveTime::from_hms_opt(15, 0, 0))
                .collect(),
        )
    }
}

/// A rendered row: one dhikr with its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: DhikrId,
    pub opening: Option<String>,
    pub text: String,
    pub current: u32,
    pub target: u32,
}

impl Card {
    pub fn completed(&self) -> bool {
        self.current >= self.target
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub view: CounterView,
    pub changed: bool,
}

#[derive(Debug)]
pub struct CounterManager {
    state: StoredState,
    active: TimeOfDay,
    content: Option<Adhkar>,
    content_error: Option<String>,
    schedule: ResetSchedule,
}

impl CounterManager {
    pub fn new(state: StoredState, schedule: ResetSchedule) -> Self {
        Self {
            state,
            active: TimeOfDay::default(),
            content: None,
            content_error: None,
            schedule,
        }
    }

    pub fn state(&self) -> &StoredState {
        &self.state
    }

    pub fn active_time(&self) -> TimeOfDay {
        self.active
    }

    pub fn set_content(&mut self, content: Adhkar) {
        self.content = Some(content);
        self.content_error = None;
    }

    pub fn set_content_error(&mut self, message: impl Into<String>) {
        self.content = None;
        self.content_error = Some(message.into());
    }

    pub fn content_error(&self) -> Option<&str> {
        self.content_error.as_deref()
    }

    pub fn count(&self, id: &DhikrId) -> u32 {
        self.state.completed.get(&id.to_string()).copied().unwrap_or(0)
    }

    fn lookup(&self, id: &DhikrId) -> Result<&DhikrItem, CounterError> {
        let content = self.content.as_ref().ok_or(CounterError::ContentUnavailable)?;
        content.get(id).ok_or(CounterError::UnknownItem(*id))
    }

    pub fn view(&self, id: &DhikrId) -> Result<CounterView, CounterError> {
        let target = self.lookup(id)?.target;
        let current = self.count(id);
        Ok(CounterView {
            id: id.to_string(),
            current,
            target,
            completed: current >= target,
        })
    }

    /// Adds one tap unless the target is already reached.
    pub fn increment(&mut self, id: &DhikrId) -> Result<Mutation, CounterError> {
        let target = self.lookup(id)?.target;
        let current = self.count(id);
        let changed = current < target;
        if changed {
            self.state.completed.insert(id.to_string(), current + 1);
        }
        Ok(Mutation {
            view: self.view(id)?,
            changed,
        })
    }

    pub fn reset(&mut self, id: &DhikrId) -> Result<Mutation, CounterError> {
        self.lookup(id)?;
        let changed = self.count(id) > 0;
        if changed {
            self.state.completed.insert(id.to_string(), 0);
        }
        Ok(Mutation {
            view: self.view(id)?,
            changed,
        })
    }

    pub fn switch_time(&mut self, time: TimeOfDay) {
        self.active = time;
    }

    pub fn cards(&self, time: TimeOfDay) -> Result<Vec<Card>, CounterError> {
        let content = self.content.as_ref().ok_or(CounterError::ContentUnavailable)?;
        Ok(content
            .items(time)
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let id = DhikrId::new(time, index);
                Card {
                    id,
                    opening: item.opening.clone(),
                    text: item.text.clone(),
                    current: self.count(&id),
                    target: item.target,
                }
            })
            .collect())
    }

    /// Clears every counter when `now` hits a scheduled instant and no reset
    /// has happened yet on that calendar day. Returns whether it fired.
    pub fn check_for_reset(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date().format("%Y-%m-%d").to_string();
        if !self.schedule.matches(now) || self.state.last_reset_date == today {
            return false;
        }
        self.state.completed.clear();
        self.state.last_reset_date = today;
        true
    }

    pub fn language(&self) -> Language {
        self.state
            .language
            .as_deref()
            .and_then(|code| code.parse().ok())
            .unwrap_or_default()
    }

    pub fn language_set(&self) -> bool {
        self.state.language_set
    }

    pub fn set_language(&mut self, language: Language) {
        self.state.language = Some(language.code().to_string());
        self.state.language_set = true;
    }

    pub fn font_size(&self) -> Option<&str> {
        self.state.font_size.as_deref()
    }

    pub fn set_font_size(&mut self, value: &str) -> Result<(), CounterError> {
        let value = value.trim();
        if !is_css_length(value) {
            return Err(CounterError::InvalidSetting(format!(
                "font size '{value}' is not a css length"
            )));
        }
        self.state.font_size = Some(value.to_string());
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        Theme::from_stored(self.state.theme.as_deref())
    }

    pub fn set_theme(&mut self, value: &str) -> Result<(), CounterError> {
        let theme = match value.trim() {
            "dark" => Theme::Dark,
            "light" => Theme::Light,
            other => {
                return Err(CounterError::InvalidSetting(format!(
                    "theme must be 'light' or 'dark', got '{other}'"
                )));
            }
        };
        self.state.theme = Some(theme.as_str().to_string());
        Ok(())
    }
}

fn is_css_length(value: &str) -> bool {
    let number_end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(number_end);
    !number.is_empty()
        && number.parse::<f32>().map(|n| n > 0.0).unwrap_or(false)
        && matches!(unit, "px" | "rem" | "em" | "%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parse_content;
    use chrono::NaiveDate;

    fn manager_with(json: &str) -> CounterManager {
        let mut manager = CounterManager::new(StoredState::default(), ResetSchedule::default());
        manager.set_content(parse_content(json.as_bytes()).unwrap());
        manager
    }

    fn sample() -> CounterManager {
        manager_with(
            r#"{"xuska":{
                "subax":[{"duco":"X","tiro":"3"},{"duco":"Y","tiro":"1"}],
                "galab":[{"duco":"Z","tiro":"2"}]
            }}"#,
        )
    }

    fn at(date: (i32, u32, u32), hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn id(value: &str) -> DhikrId {
        value.parse().unwrap()
    }

    #[test]
    fn increment_stops_at_target() {
        let mut manager = manager_with(r#"{"xuska":{"subax":[{"duco":"X","tiro":"3"}],"galab":[]}}"#);
        let subax0 = id("subax-0");

        let mut last = None;
        for _ in 0..4 {
            last = Some(manager.increment(&subax0).unwrap());
        }
        let last = last.unwrap();
        assert!(!last.changed);
        assert_eq!(last.view.current, 3);
        assert_eq!(last.view.target, 3);
        assert!(last.view.completed);
        assert_eq!(manager.state().completed["subax-0"], 3);
    }

    #[test]
    fn increment_reports_change_until_complete() {
        let mut manager = sample();
        let subax1 = id("subax-1");
        let first = manager.increment(&subax1).unwrap();
        assert!(first.changed);
        assert!(first.view.completed);
        assert!(!manager.increment(&subax1).unwrap().changed);
    }

    #[test]
    fn reset_zeroes_from_any_count() {
        let mut manager = sample();
        let subax0 = id("subax-0");
        for taps in 0..=3 {
            for _ in 0..taps {
                manager.increment(&subax0).unwrap();
            }
            let mutation = manager.reset(&subax0).unwrap();
            assert_eq!(mutation.view.current, 0);
            assert!(!mutation.view.completed);
            assert_eq!(mutation.changed, taps > 0);
        }
    }

    #[test]
    fn unknown_item_is_rejected_without_mutation() {
        let mut manager = sample();
        let missing = id("galab-9");
        assert_eq!(manager.increment(&missing), Err(CounterError::UnknownItem(missing)));
        assert_eq!(manager.reset(&missing), Err(CounterError::UnknownItem(missing)));
        assert!(manager.state().completed.is_empty());
    }

    #[test]
    fn operations_without_content_fail() {
        let mut manager = CounterManager::new(StoredState::default(), ResetSchedule::default());
        manager.set_content_error("boom");
        assert_eq!(manager.increment(&id("subax-0")), Err(CounterError::ContentUnavailable));
        assert_eq!(manager.cards(TimeOfDay::Subax), Err(CounterError::ContentUnavailable));
        assert_eq!(manager.content_error(), Some("boom"));
    }

    #[test]
    fn switching_time_leaves_counts_alone() {
        let mut manager = sample();
        manager.increment(&id("subax-0")).unwrap();
        manager.increment(&id("galab-0")).unwrap();
        let before = manager.state().completed.clone();

        manager.switch_time(TimeOfDay::Galab);
        assert_eq!(manager.active_time(), TimeOfDay::Galab);
        manager.switch_time(TimeOfDay::Subax);

        assert_eq!(manager.state().completed, before);
    }

    #[test]
    fn cards_carry_progress() {
        let mut manager = sample();
        manager.increment(&id("galab-0")).unwrap();
        manager.increment(&id("galab-0")).unwrap();

        let cards = manager.cards(TimeOfDay::Galab).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id.to_string(), "galab-0");
        assert_eq!(cards[0].text, "Z");
        assert!(cards[0].completed());

        let morning = manager.cards(TimeOfDay::Subax).unwrap();
        assert!(morning.iter().all(|card| card.current == 0));
    }

    #[test]
    fn reset_fires_once_per_day_across_the_boundary() {
        let mut manager = sample();
        manager.increment(&id("subax-0")).unwrap();

        let mut fired = 0;
        // Poll every minute from 03:58 to 04:03 and again around 15:00.
        for (hour, minute) in [(3, 58), (3, 59), (4, 0), (4, 0), (4, 1), (4, 2), (14, 59), (15, 0), (15, 1)] {
            if manager.check_for_reset(at((2026, 3, 1), hour, minute)) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert!(manager.state().completed.is_empty());
        assert_eq!(manager.state().last_reset_date, "2026-03-01");
    }

    #[test]
    fn reset_fires_again_the_next_day() {
        let mut manager = sample();
        assert!(manager.check_for_reset(at((2026, 3, 1), 15, 0)));
        manager.increment(&id("subax-0")).unwrap();
        assert!(!manager.check_for_reset(at((2026, 3, 2), 3, 59)));
        assert_eq!(manager.count(&id("subax-0")), 1);
        assert!(manager.check_for_reset(at((2026, 3, 2), 4, 0)));
        assert_eq!(manager.count(&id("subax-0")), 0);
    }

    #[test]
    fn missed_boundary_does_not_reset() {
        let mut manager = sample();
        manager.increment(&id("subax-0")).unwrap();
        assert!(!manager.check_for_reset(at((2026, 3, 1), 4, 1)));
        assert_eq!(manager.count(&id("subax-0")), 1);
    }

    #[test]
    fn schedule_parsing() {
        let schedule = ResetSchedule::parse("05:30, 18:45").unwrap();
        assert_eq!(schedule.instants().len(), 2);
        assert!(schedule.matches(at((2026, 1, 1), 18, 45)));
        assert!(!schedule.matches(at((2026, 1, 1), 4, 0)));
        assert!(ResetSchedule::parse("").is_err());
        assert!(ResetSchedule::parse("25:00").is_err());
    }

    #[test]
    fn settings_validation() {
        let mut manager = sample();
        assert_eq!(manager.theme(), Theme::Light);
        manager.set_theme("dark").unwrap();
        assert_eq!(manager.theme(), Theme::Dark);
        assert!(manager.set_theme("sepia").is_err());

        manager.set_font_size("1.5rem").unwrap();
        assert_eq!(manager.font_size(), Some("1.5rem"));
        for bad in ["", "big", "12", "0px", "1.5rem; color:red"] {
            assert!(manager.set_font_size(bad).is_err(), "accepted {bad}");
        }

        assert!(!manager.language_set());
        assert_eq!(manager.language(), Language::So);
        manager.set_language(Language::Ar);
        assert!(manager.language_set());
        assert_eq!(manager.language(), Language::Ar);
    }
}
