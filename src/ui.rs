use crate::counter::Card;
use crate::i18n::{Labels, Language, Translations};
use crate::models::{Theme, TimeOfDay};
use crate::state::Session;

const FONT_SIZES: [(&str, fn(&Translations) -> &str, &str); 3] = [
    ("1.25rem", |t| t.settings.font_small.as_str(), "Yar"),
    ("1.5rem", |t| t.settings.font_medium.as_str(), "Dhexdhexaad"),
    ("2rem", |t| t.settings.font_large.as_str(), "Weyn"),
];

const RESET_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><path d="M5 18c4.667 4.667 12 1.833 12-4.042h-3l5-6 5 6h-3c-1.125 7.98-11.594 11.104-16 4.042zm14-11.984c-4.667-4.667-12-1.834-12 4.041h3l-5 6-5-6h3c1.125-7.979 11.594-11.104 16-4.041z"/></svg>"#;
const PLUS_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><line x1="12" y1="5" x2="12" y2="19"></line><line x1="5" y1="12" x2="19" y2="12"></line></svg>"#;
const CHECK_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><polyline points="20 6 9 17 4 12"></polyline></svg>"#;

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn text<'a>(
    translations: Option<&'a Translations>,
    pick: impl Fn(&'a Translations) -> &'a str,
    default: &'a str,
) -> String {
    escape_html(translations.map(pick).unwrap_or(default))
}

fn font_style(font_size: Option<&str>) -> String {
    font_size
        .map(|size| format!(r#" style="font-size: {}""#, escape_html(size)))
        .unwrap_or_default()
}

pub fn render_card(card: &Card, labels: &Labels, font_size: Option<&str>) -> String {
    let id = card.id.to_string();
    let style = font_style(font_size);
    let opening = card
        .opening
        .as_deref()
        .map(|opening| format!(r#"<p class="dhikr-arabic"{style}>{}</p>"#, escape_html(opening)))
        .unwrap_or_default();
    let completed = if card.completed() {
        format!(
            r#"<span class="completed" title="{}">{CHECK_ICON}</span>"#,
            escape_html(&labels.completed)
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class="dhikr-card" data-id="{id}">
  {opening}
  <p class="dhikr-arabic"{style}>{text}</p>
  <div class="counter-controls">
    <form method="post" action="/dhikr/{id}/reset"><button class="counter-btn" type="submit" title="{reset}">{RESET_ICON}</button></form>
    <div class="counter-display">{current}/{target}</div>
    {completed}
    <form method="post" action="/dhikr/{id}/increment"><button class="counter-btn plus-btn" type="submit">{PLUS_ICON}</button></form>
  </div>
</div>
"#,
        text = escape_html(&card.text),
        reset = escape_html(&labels.reset),
        current = card.current,
        target = card.target,
    )
}

/// Cards for one time of day, or the inline error when content is missing.
pub fn render_list(session: &Session, time: TimeOfDay) -> String {
    let labels = session.labels();
    match session.counter.cards(time) {
        Ok(cards) => cards
            .iter()
            .map(|card| render_card(card, &labels, session.counter.font_size()))
            .collect(),
        Err(_) => {
            format!(r#"<div class="loading"><p>{}</p></div>"#, escape_html(&labels.error))
        }
    }
}

fn render_options(items: &[(String, String)], selected: &str) -> String {
    items
        .iter()
        .map(|(value, label)| {
            let marker = if value == selected { " selected" } else { "" };
            format!(r#"<option value="{value}"{marker}>{label}</option>"#)
        })
        .collect()
}

fn language_buttons() -> String {
    Language::ALL
        .iter()
        .map(|lang| {
            format!(
                r#"<form method="post" action="/settings"><input type="hidden" name="language" value="{code}" /><button class="language-option" type="submit" data-lang="{code}">{name}</button></form>"#,
                code = lang.code(),
                name = lang.native_name(),
            )
        })
        .collect()
}

pub fn render_page(session: &Session) -> String {
    let t = session.translations.as_ref();
    let counter = &session.counter;
    let language = counter.language();
    let time = counter.active_time();
    let labels = session.labels();

    let font_options: Vec<(String, String)> = FONT_SIZES
        .iter()
        .map(|(value, pick, default)| (value.to_string(), text(t, pick, default)))
        .collect();
    let theme_options = vec![
        (Theme::Light.as_str().to_string(), text(t, |t| t.settings.theme_light.as_str(), "Iftiin")),
        (Theme::Dark.as_str().to_string(), text(t, |t| t.settings.theme_dark.as_str(), "Mugdi")),
    ];
    let language_options: Vec<(String, String)> = Language::ALL
        .iter()
        .map(|lang| (lang.code().to_string(), lang.native_name().to_string()))
        .collect();

    let active = |tab: TimeOfDay| if tab == time { "tab active" } else { "tab" };

    INDEX_HTML
        .replace("{{LANG}}", language.code())
        .replace("{{DIR}}", if language.is_rtl() { "rtl" } else { "ltr" })
        .replace("{{THEME_CLASS}}", if counter.theme() == Theme::Dark { "dark" } else { "" })
        .replace("{{TITLE}}", &text(t, |t| t.app.title.as_str(), "Xuska Subaxdii iyo Galabtii"))
        .replace("{{INTRO}}", &text(t, |t| t.content.intro.as_str(), ""))
        .replace("{{CURRENT_LANG}}", &language.code().to_ascii_uppercase())
        .replace("{{MORNING}}", &text(t, |t| t.navigation.morning.as_str(), "Subax"))
        .replace("{{EVENING}}", &text(t, |t| t.navigation.evening.as_str(), "Galab"))
        .replace("{{SUBAX_CLASS}}", active(TimeOfDay::Subax))
        .replace("{{GALAB_CLASS}}", active(TimeOfDay::Galab))
        .replace("{{TIME}}", time.as_str())
        .replace("{{SETTINGS_TITLE}}", &text(t, |t| t.settings.title.as_str(), "Dejinta"))
        .replace("{{FONT_LABEL}}", &text(t, |t| t.settings.font_size.as_str(), "Cabbirka qoraalka"))
        .replace(
            "{{FONT_OPTIONS}}",
            &render_options(&font_options, counter.font_size().unwrap_or("1.5rem")),
        )
        .replace("{{THEME_LABEL}}", &text(t, |t| t.settings.theme.as_str(), "Muuqaalka"))
        .replace("{{THEME_OPTIONS}}", &render_options(&theme_options, counter.theme().as_str()))
        .replace(
            "{{LANGUAGE_LABEL}}",
            &text(t, |t| t.settings.language.as_deref().unwrap_or("Language"), "Luqadda"),
        )
        .replace("{{LANGUAGE_OPTIONS}}", &render_options(&language_options, language.code()))
        .replace("{{LANGUAGE_BUTTONS}}", &language_buttons())
        .replace("{{MODAL_DISPLAY}}", if counter.language_set() { "none" } else { "flex" })
        .replace("{{COMPLETED_TEXT}}", &escape_html(&labels.completed))
        .replace("{{LAST_RESET}}", &escape_html(&counter.state().last_reset_date))
        .replace("{{LIST}}", &render_list(session, time))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="{{LANG}}" dir="{{DIR}}" class="{{THEME_CLASS}}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg: #f6f1e7;
      --card: #fffdf8;
      --ink: #23302b;
      --muted: #5f6b66;
      --accent: #1f7a5a;
      --done: #c98c1d;
      --shadow: 0 12px 32px rgba(35, 48, 43, 0.12);
    }

    html.dark {
      --bg: #141a18;
      --card: #1e2623;
      --ink: #eef3f0;
      --muted: #9fb0a8;
      --accent: #46b98d;
      --shadow: 0 12px 32px rgba(0, 0, 0, 0.4);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Trebuchet MS", sans-serif;
    }

    header {
      display: flex;
      align-items: center;
      justify-content: space-between;
      padding: 18px 20px;
      gap: 12px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.3rem, 4vw, 1.9rem);
    }

    .intro {
      margin: 0 20px 12px;
      color: var(--muted);
    }

    .tabs {
      display: flex;
      gap: 8px;
      margin: 0 20px 16px;
    }

    .tab {
      flex: 1;
      text-align: center;
      padding: 10px 0;
      border-radius: 999px;
      color: var(--ink);
      text-decoration: none;
      background: var(--card);
      box-shadow: var(--shadow);
      font-weight: 600;
    }

    .tab.active {
      background: var(--accent);
      color: #fff;
    }

    main {
      display: grid;
      gap: 14px;
      padding: 0 20px 40px;
    }

    .dhikr-card {
      background: var(--card);
      border-radius: 18px;
      padding: 18px;
      box-shadow: var(--shadow);
    }

    .dhikr-arabic {
      font-family: "Traditional Arabic", "Uthmanic Hafs", serif;
      direction: rtl;
      font-size: 1.5rem;
      line-height: 2;
      margin: 0 0 10px;
    }

    .counter-controls {
      display: flex;
      align-items: center;
      justify-content: center;
      gap: 14px;
    }

    .counter-controls form {
      margin: 0;
    }

    .counter-btn {
      border: none;
      background: transparent;
      color: var(--ink);
      cursor: pointer;
      padding: 8px;
      border-radius: 50%;
    }

    .counter-btn svg {
      fill: currentColor;
    }

    .plus-btn {
      background: var(--accent);
      color: #fff;
    }

    .counter-display {
      font-variant-numeric: tabular-nums;
      font-weight: 600;
      min-width: 64px;
      text-align: center;
    }

    .completed {
      color: var(--done);
    }

    .loading {
      text-align: center;
      color: var(--muted);
    }

    .settings {
      background: var(--card);
      border-radius: 18px;
      margin: 0 20px 24px;
      padding: 12px 18px;
      box-shadow: var(--shadow);
    }

    .settings form {
      display: grid;
      gap: 10px;
    }

    .settings label {
      display: flex;
      justify-content: space-between;
      gap: 12px;
    }

    .modal {
      position: fixed;
      inset: 0;
      background: rgba(0, 0, 0, 0.55);
      align-items: center;
      justify-content: center;
    }

    .modal-body {
      background: var(--card);
      border-radius: 18px;
      padding: 24px;
      display: grid;
      gap: 10px;
      min-width: 240px;
    }

    .language-option {
      width: 100%;
      padding: 10px;
      border-radius: 12px;
      border: 1px solid var(--accent);
      background: transparent;
      color: var(--ink);
      font-size: 1rem;
      cursor: pointer;
    }
  </style>
</head>
<body>
  <header>
    <h1 id="appTitle">{{TITLE}}</h1>
    <span id="currentLang">{{CURRENT_LANG}}</span>
  </header>
  <p class="intro">{{INTRO}}</p>

  <nav class="tabs">
    <a id="subaxBtn" class="{{SUBAX_CLASS}}" href="/?time=subax" data-time="subax">{{MORNING}}</a>
    <a id="galabBtn" class="{{GALAB_CLASS}}" href="/?time=galab" data-time="galab">{{EVENING}}</a>
  </nav>

  <main id="adhkarContainer" data-time="{{TIME}}" data-completed-text="{{COMPLETED_TEXT}}" data-last-reset="{{LAST_RESET}}">
{{LIST}}
  </main>

  <details class="settings">
    <summary>{{SETTINGS_TITLE}}</summary>
    <form id="settingsForm" method="post" action="/settings">
      <label>{{FONT_LABEL}}
        <select id="fontSizeSelect" name="font_size">{{FONT_OPTIONS}}</select>
      </label>
      <label>{{THEME_LABEL}}
        <select id="themeSelect" name="theme">{{THEME_OPTIONS}}</select>
      </label>
      <label>{{LANGUAGE_LABEL}}
        <select id="languageSelect" name="language">{{LANGUAGE_OPTIONS}}</select>
      </label>
      <noscript><button type="submit">OK</button></noscript>
    </form>
  </details>

  <div id="languageModal" class="modal" style="display: {{MODAL_DISPLAY}}">
    <div class="modal-body">
      {{LANGUAGE_BUTTONS}}
    </div>
  </div>

  <script>
    const container = document.getElementById('adhkarContainer');
    const tabs = document.querySelectorAll('.tab');
    const checkIcon = '<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><polyline points="20 6 9 17 4 12"></polyline></svg>';

    const updateCard = (view) => {
      const card = container.querySelector(`.dhikr-card[data-id="${view.id}"]`);
      if (!card) return;

      const display = card.querySelector('.counter-display');
      const done = card.querySelector('.completed');
      display.textContent = `${view.current}/${view.target}`;

      if (view.completed && !done) {
        const span = document.createElement('span');
        span.className = 'completed';
        span.title = container.dataset.completedText;
        span.innerHTML = checkIcon;
        display.insertAdjacentElement('afterend', span);
        if ('vibrate' in navigator) {
          navigator.vibrate([100, 30, 100, 30, 100, 30, 200, 30, 200, 30, 200, 30, 100, 30, 100, 30, 100]);
        }
      } else if (!view.completed && done) {
        done.remove();
      }
    };

    container.addEventListener('submit', async (event) => {
      event.preventDefault();
      const action = event.target.getAttribute('action');
      const res = await fetch(`/api${action}`, { method: 'POST' });
      if (res.ok) {
        updateCard(await res.json());
      }
    });

    const loadList = async (time) => {
      const res = await fetch(`/api/adhkar/${time}`);
      container.innerHTML = await res.text();
      container.dataset.time = time;
      tabs.forEach((tab) => tab.classList.toggle('active', tab.dataset.time === time));
    };

    tabs.forEach((tab) => {
      tab.addEventListener('click', (event) => {
        event.preventDefault();
        loadList(tab.dataset.time);
        history.replaceState(null, '', `/?time=${tab.dataset.time}`);
      });
    });

    const saveSettings = async (payload) => {
      const res = await fetch('/api/settings', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(payload)
      });
      return res.ok ? res.json() : null;
    };

    document.getElementById('fontSizeSelect').addEventListener('change', async (event) => {
      const saved = await saveSettings({ font_size: event.target.value });
      if (saved) {
        document.querySelectorAll('.dhikr-arabic').forEach((el) => {
          el.style.fontSize = saved.font_size;
        });
      }
    });

    document.getElementById('themeSelect').addEventListener('change', async (event) => {
      const saved = await saveSettings({ theme: event.target.value });
      if (saved) {
        document.documentElement.classList.toggle('dark', saved.theme === 'dark');
      }
    });

    document.getElementById('languageSelect').addEventListener('change', async (event) => {
      if (await saveSettings({ language: event.target.value })) {
        window.location.reload();
      }
    });

    setInterval(async () => {
      const res = await fetch('/api/state');
      if (!res.ok) return;
      const state = await res.json();
      if (state.last_reset_date !== container.dataset.lastReset) {
        container.dataset.lastReset = state.last_reset_date;
        loadList(container.dataset.time);
      }
    }, 60000);
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parse_content;
    use crate::counter::{CounterManager, ResetSchedule};
    use crate::models::{DhikrId, StoredState};

    fn session(json: &str) -> Session {
        let mut counter = CounterManager::new(StoredState::default(), ResetSchedule::default());
        counter.set_content(parse_content(json.as_bytes()).unwrap());
        Session::new(counter)
    }

    #[test]
    fn completed_card_never_exceeds_target() {
        let mut session = session(r#"{"xuska":{"subax":[{"duco":"X","tiro":"3"}],"galab":[]}}"#);
        let id: DhikrId = "subax-0".parse().unwrap();
        for _ in 0..4 {
            session.counter.increment(&id).unwrap();
        }

        let html = render_list(&session, TimeOfDay::Subax);
        assert!(html.contains(r#"<div class="counter-display">3/3</div>"#), "{html}");
        assert!(!html.contains("4/3"));
        assert!(html.contains(r#"class="completed""#));
    }

    #[test]
    fn reset_removes_completion_indicator() {
        let mut session = session(r#"{"xuska":{"subax":[{"duco":"X","tiro":1}],"galab":[]}}"#);
        let id: DhikrId = "subax-0".parse().unwrap();
        session.counter.increment(&id).unwrap();
        session.counter.reset(&id).unwrap();

        let html = render_list(&session, TimeOfDay::Subax);
        assert!(html.contains("0/1"));
        assert!(!html.contains(r#"class="completed""#));
    }

    #[test]
    fn font_size_and_opening_text_are_rendered() {
        let mut session = session(r#"{"xuska":{"subax":[{"bilow":"A","duco":"B","tiro":2}],"galab":[]}}"#);
        session.counter.set_font_size("2rem").unwrap();

        let html = render_list(&session, TimeOfDay::Subax);
        assert_eq!(html.matches(r#"style="font-size: 2rem""#).count(), 2);
        assert!(html.contains(">A</p>"));
        assert!(html.contains(r#"action="/dhikr/subax-0/increment""#));
        assert!(html.contains(r#"action="/dhikr/subax-0/reset""#));
    }

    #[test]
    fn content_text_is_escaped() {
        let session = session(r#"{"xuska":{"subax":[{"duco":"<script>x</script>","tiro":1}],"galab":[]}}"#);
        let html = render_list(&session, TimeOfDay::Subax);
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn missing_content_shows_default_error() {
        let mut counter = CounterManager::new(StoredState::default(), ResetSchedule::default());
        counter.set_content_error("gone");
        let session = Session::new(counter);
        let html = render_list(&session, TimeOfDay::Galab);
        assert!(html.contains(crate::i18n::DEFAULT_ERROR_TEXT));
    }

    #[test]
    fn page_reflects_language_theme_and_tab() {
        let mut session = session(r#"{"xuska":{"subax":[],"galab":[{"duco":"E","tiro":1}]}}"#);
        session.counter.set_language(Language::Ar);
        session.counter.set_theme("dark").unwrap();
        session.counter.switch_time(TimeOfDay::Galab);

        let page = render_page(&session);
        assert!(page.contains(r#"<html lang="ar" dir="rtl" class="dark">"#));
        assert!(page.contains(r#"class="tab active" href="/?time=galab""#));
        assert!(page.contains(r#"data-id="galab-0""#));
        assert!(page.contains(r#"style="display: none""#));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn language_modal_shows_until_chosen() {
        let session = session(r#"{"xuska":{"subax":[],"galab":[]}}"#);
        let page = render_page(&session);
        assert!(page.contains(r#"id="languageModal" class="modal" style="display: flex""#));
    }
}
