use crate::errors::AppError;
use crate::models::StoredState;
use std::path::Path;
use tokio::fs;
use tracing::error;

pub async fn load_state(path: &Path) -> StoredState {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(err) => {
                error!("failed to parse state file: {err}");
                StoredState::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredState::default(),
        Err(err) => {
            error!("failed to read state file: {err}");
            StoredState::default()
        }
    }
}

pub async fn persist_state(path: &Path, state: &StoredState) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(state).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn unique_state_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("xuska_state_{}_{nanos}.json", std::process::id()))
    }

    #[tokio::test]
    async fn persisted_state_reloads_identically() {
        let path = unique_state_path();
        let mut state = StoredState::default();
        state.completed.insert("subax-0".into(), 3);
        state.completed.insert("galab-11".into(), 0);
        state.completed.insert("galab-2".into(), u32::MAX);
        state.last_reset_date = "2026-10-18".into();
        state.language = Some("so".into());
        state.language_set = true;

        persist_state(&path, &state).await.unwrap();
        assert_eq!(load_state(&path).await, state);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_gives_default() {
        let path = unique_state_path();
        assert_eq!(load_state(&path).await, StoredState::default());

        std::fs::write(&path, b"{not json").unwrap();
        assert_eq!(load_state(&path).await, StoredState::default());

        let _ = std::fs::remove_file(path);
    }
}
