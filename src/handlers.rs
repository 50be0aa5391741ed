use crate::content::CONTENT_FILE;
use crate::counter::Mutation;
use crate::errors::AppError;
use crate::i18n::{load_with_fallback, Language};
use crate::models::{
    CounterView, DhikrId, PageQuery, SettingsRequest, SettingsResponse, StateResponse, TimeOfDay,
};
use crate::state::AppState;
use crate::ui::{render_list, render_page};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
    Form, Json,
};
use tokio::fs;
use tracing::{info, warn};

// Counter data changes on every tap; caches in front of us must not keep it.
const NO_STORE: [(header::HeaderName, &str); 1] = [(header::CACHE_CONTROL, "no-store")];

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let mut session = state.session.lock().await;
    if let Some(time) = query.time {
        session.counter.switch_time(time);
    }
    Html(render_page(&session))
}

pub async fn adhkar_list(
    State(state): State<AppState>,
    Path(time): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let time = time.parse::<TimeOfDay>().map_err(AppError::bad_request)?;
    let mut session = state.session.lock().await;
    session.counter.switch_time(time);
    Ok((NO_STORE, Html(render_list(&session, time))))
}

pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let stored = session.counter.state();
    (
        NO_STORE,
        Json(StateResponse {
            time: session.counter.active_time(),
            last_reset_date: stored.last_reset_date.clone(),
            counts: stored.completed.clone(),
        }),
    )
}

pub async fn increment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CounterView>, AppError> {
    let mutation = apply_tap(&state, &id, Tap::Increment).await?;
    Ok(Json(mutation.view))
}

pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CounterView>, AppError> {
    let mutation = apply_tap(&state, &id, Tap::Reset).await?;
    Ok(Json(mutation.view))
}

pub async fn increment_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    apply_tap(&state, &id, Tap::Increment).await?;
    Ok(back_to_list(&id))
}

pub async fn reset_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    apply_tap(&state, &id, Tap::Reset).await?;
    Ok(back_to_list(&id))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<SettingsRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    Ok(Json(apply_settings(&state, payload).await?))
}

pub async fn update_settings_form(
    State(state): State<AppState>,
    Form(payload): Form<SettingsRequest>,
) -> Result<Redirect, AppError> {
    apply_settings(&state, payload).await?;
    Ok(Redirect::to("/"))
}

/// Serves `data.json` and the per-language translation files.
pub async fn content_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let allowed = file == CONTENT_FILE || Language::ALL.iter().any(|lang| lang.file_name() == file);
    if !allowed {
        return Err(AppError::not_found(format!("no such file: {file}")));
    }

    let bytes = fs::read(state.content_dir.join(&file)).await.map_err(|err| {
        warn!("failed to read {file}: {err}");
        AppError::not_found(format!("no such file: {file}"))
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], bytes))
}

#[derive(Debug, Clone, Copy)]
enum Tap {
    Increment,
    Reset,
}

async fn apply_tap(state: &AppState, id: &str, tap: Tap) -> Result<Mutation, AppError> {
    let id = id.parse::<DhikrId>().map_err(AppError::bad_request)?;
    let mut session = state.session.lock().await;
    let mutation = match tap {
        Tap::Increment => session.counter.increment(&id)?,
        Tap::Reset => session.counter.reset(&id)?,
    };

    if mutation.changed {
        state.persist(&session).await?;
    }

    Ok(mutation)
}

async fn apply_settings(
    state: &AppState,
    payload: SettingsRequest,
) -> Result<SettingsResponse, AppError> {
    let language = payload
        .language
        .as_deref()
        .map(str::parse::<Language>)
        .transpose()
        .map_err(AppError::bad_request)?;

    // Translation files are read before taking the lock.
    let translations = match language {
        Some(lang) => load_with_fallback(&state.content_dir, lang).await,
        None => None,
    };

    let mut session = state.session.lock().await;
    if let Some(size) = payload.font_size.as_deref() {
        session.counter.set_font_size(size)?;
    }
    if let Some(theme) = payload.theme.as_deref() {
        session.counter.set_theme(theme)?;
    }
    if let Some((loaded, translations)) = translations {
        info!("switching language to {loaded}");
        session.apply_translations(loaded, translations);
    } else if let Some(lang) = language {
        warn!("no translations available for {lang}, keeping current text");
    }

    state.persist(&session).await?;

    let counter = &session.counter;
    Ok(SettingsResponse {
        language: counter.language().code().to_string(),
        language_set: counter.language_set(),
        font_size: counter.font_size().map(str::to_string),
        theme: counter.theme().as_str().to_string(),
    })
}

fn back_to_list(id: &str) -> Redirect {
    let time = id
        .parse::<DhikrId>()
        .map(|id| id.time)
        .unwrap_or_default();
    Redirect::to(&format!("/?time={time}"))
}
