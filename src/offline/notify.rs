use serde::{Deserialize, Serialize};
use tracing::info;

const ICON: &str = "logo.jpg";
const VIBRATE: [u32; 3] = [100, 50, 100];

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub url: String,
}

impl From<NotificationPayload> for Notification {
    fn from(payload: NotificationPayload) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon: ICON.to_string(),
            badge: ICON.to_string(),
            vibrate: VIBRATE.to_vec(),
            url: target_url(payload.url.as_deref()),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn show(&self, notification: &Notification);
}

/// Writes notifications to the log; the stand-in for a system tray.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, notification: &Notification) {
        info!(url = %notification.url, "notification: {}: {}", notification.title, notification.body);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "url", rename_all = "lowercase")]
pub enum ClickAction {
    Focus(String),
    Open(String),
}

/// Focus a window already showing `url`, otherwise open a new one.
pub fn click_action(url: Option<&str>, open_windows: &[String]) -> ClickAction {
    let url = target_url(url);
    if open_windows.iter().any(|window| *window == url) {
        ClickAction::Focus(url)
    } else {
        ClickAction::Open(url)
    }
}

fn target_url(url: Option<&str>) -> String {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_without_url_targets_root() {
        let payload: NotificationPayload =
            serde_json::from_str(r#"{"title":"Subax","body":"Waqtigii xuska"}"#).unwrap();
        let notification = Notification::from(payload);
        assert_eq!(notification.url, "/");
        assert_eq!(notification.icon, "logo.jpg");
        assert_eq!(notification.vibrate, vec![100, 50, 100]);
    }

    #[test]
    fn click_focuses_matching_window() {
        let open = vec!["/?time=galab".to_string()];
        assert_eq!(
            click_action(Some("/?time=galab"), &open),
            ClickAction::Focus("/?time=galab".into())
        );
        assert_eq!(click_action(Some("/?time=subax"), &open), ClickAction::Open("/?time=subax".into()));
        assert_eq!(click_action(None, &[]), ClickAction::Open("/".into()));
    }
}
