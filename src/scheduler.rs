use crate::errors::AppError;
use crate::state::AppState;
use chrono::{Local, NaiveDateTime};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

pub const RESET_CHECK_PERIOD: Duration = Duration::from_secs(60);

/// Runs the daily reset check against the local clock and persists the
/// cleared counters when it fires.
pub async fn check_for_reset(state: &AppState) -> Result<bool, AppError> {
    check_for_reset_at(state, Local::now().naive_local()).await
}

pub async fn check_for_reset_at(state: &AppState, now: NaiveDateTime) -> Result<bool, AppError> {
    let mut session = state.session.lock().await;
    if !session.counter.check_for_reset(now) {
        return Ok(false);
    }
    state.persist(&session).await?;
    info!("daily reset at {now}");
    Ok(true)
}

/// Checks once right away and then every minute for the life of the process.
pub fn spawn_reset_ticker(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(RESET_CHECK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = check_for_reset(&state).await {
                error!("failed to persist daily reset: {}", err.message);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::counter::{CounterManager, ResetSchedule};
    use crate::models::StoredState;
    use crate::state::Session;
    use crate::storage::load_state;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn app_state(stored: StoredState) -> AppState {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let config = Config {
            port: 0,
            state_path: std::env::temp_dir()
                .join(format!("xuska_reset_{}_{nanos}.json", std::process::id())),
            content_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/content")),
            reset_schedule: ResetSchedule::default(),
        };
        AppState::new(&config, Session::new(CounterManager::new(stored, config.reset_schedule.clone())))
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn fired_reset_is_written_to_disk() {
        let mut stored = StoredState::default();
        stored.completed.insert("subax-0".into(), 1);
        stored.completed.insert("galab-2".into(), 3);
        stored.last_reset_date = "2026-03-08".into();
        stored.language = Some("en".into());
        let state = app_state(stored);

        assert!(!check_for_reset_at(&state, at(3, 59)).await.unwrap());
        assert!(!state.state_path.exists());

        assert!(check_for_reset_at(&state, at(4, 0)).await.unwrap());
        let saved = load_state(&state.state_path).await;
        assert!(saved.completed.is_empty());
        assert_eq!(saved.last_reset_date, "2026-03-09");
        assert_eq!(saved.language.as_deref(), Some("en"));

        assert!(!check_for_reset_at(&state, at(15, 0)).await.unwrap());

        let _ = std::fs::remove_file(&state.state_path);
    }
}
