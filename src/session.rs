//! Session state machine for the monitoring flow.
//!
//! The original dashboard kept a process-wide session dictionary; here the
//! session is an explicit value object mutated only through its transition
//! methods, held in a [`SessionStore`] keyed by session identifier. User
//! input problems come back as [`Advisory`] values and never change state.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use crate::catalog::DataOptions;
use crate::history::ProbabilityHistory;

/// Pages of the monitoring flow. `Welcome` is the initial page; the cycle is
/// re-enterable via reset, so there is no terminal page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Welcome,
    LoadData,
    SelectPersonDay,
    Forecast,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Welcome => "welcome",
            Page::LoadData => "load_data",
            Page::SelectPersonDay => "select_person_day",
            Page::Forecast => "forecast",
        }
    }
}

/// Where forecast data comes from for the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// User-supplied ECG stream URL.
    Remote(String),
    /// Demo dataset selected by person and day label.
    Demo { person: String, day: String },
}

/// Recoverable user-input problems. Surfaced inline; the session stays on
/// its current page and keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    EmptyName,
    EmptyDataUrl,
    InvalidDataUrl(String),
    UnsupportedSelection { person: String, day: String },
    WrongPage { action: &'static str, page: Page },
}

impl Advisory {
    pub fn message(&self) -> String {
        match self {
            Advisory::EmptyName => "Please enter your name to continue".to_string(),
            Advisory::EmptyDataUrl => "Please enter a data URL".to_string(),
            Advisory::InvalidDataUrl(raw) => format!("Not a valid data URL: {}", raw),
            Advisory::UnsupportedSelection { person, day } => format!(
                "Demo data is not available yet for {}, {}. Please select a supported combination.",
                person, day
            ),
            Advisory::WrongPage { action, page } => {
                format!("Action '{}' is not available on the {} page", action, page.as_str())
            }
        }
    }
}

/// One user's monitoring session.
#[derive(Debug, Clone)]
pub struct Session {
    pub page: Page,
    pub user_name: String,
    pub data_source: Option<DataSource>,
    pub monitoring_start: Option<DateTime<Utc>>,
    pub current_minute: u32,
    pub history: ProbabilityHistory,
}

impl Session {
    pub fn new() -> Self {
        Self {
            page: Page::Welcome,
            user_name: String::new(),
            data_source: None,
            monitoring_start: None,
            current_minute: 0,
            history: ProbabilityHistory::new(),
        }
    }

    /// welcome -> load_data on a non-empty name.
    pub fn submit_name(&mut self, name: &str) -> Result<(), Advisory> {
        if self.page != Page::Welcome {
            return Err(Advisory::WrongPage { action: "submit_name", page: self.page });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(Advisory::EmptyName);
        }
        self.user_name = name.to_string();
        self.page = Page::LoadData;
        Ok(())
    }

    /// load_data -> forecast with a user-supplied stream URL. Records the
    /// monitoring start and clears any stale history.
    pub fn connect_data_source(&mut self, raw_url: &str) -> Result<(), Advisory> {
        if self.page != Page::LoadData {
            return Err(Advisory::WrongPage { action: "connect_data_source", page: self.page });
        }
        let raw_url = raw_url.trim();
        if raw_url.is_empty() {
            return Err(Advisory::EmptyDataUrl);
        }
        if Url::parse(raw_url).is_err() {
            return Err(Advisory::InvalidDataUrl(raw_url.to_string()));
        }
        self.data_source = Some(DataSource::Remote(raw_url.to_string()));
        self.monitoring_start = Some(Utc::now());
        self.current_minute = 0;
        self.history.clear();
        self.page = Page::Forecast;
        Ok(())
    }

    /// load_data -> select_person_day.
    pub fn choose_demo_mode(&mut self) -> Result<(), Advisory> {
        if self.page != Page::LoadData {
            return Err(Advisory::WrongPage { action: "choose_demo_mode", page: self.page });
        }
        self.page = Page::SelectPersonDay;
        Ok(())
    }

    /// select_person_day -> forecast when the selection maps to a data
    /// source. An unmapped selection is an advisory: no state change, and
    /// callers must not issue any network call for it. Returns the mapped
    /// data URL on success.
    pub fn select_person_day(
        &mut self,
        person: &str,
        day: &str,
        options: &DataOptions,
    ) -> Result<String, Advisory> {
        if self.page != Page::SelectPersonDay {
            return Err(Advisory::WrongPage { action: "select_person_day", page: self.page });
        }
        let url = match options.url_for(person, day) {
            Some(url) => url.to_string(),
            None => {
                return Err(Advisory::UnsupportedSelection {
                    person: person.to_string(),
                    day: day.to_string(),
                })
            }
        };
        self.data_source = Some(DataSource::Demo { person: person.to_string(), day: day.to_string() });
        // The demo window simulates 6am-10pm, so monitoring starts at 06:00
        // of the current day rather than at the wall clock.
        self.monitoring_start = Some(demo_monitoring_start(Utc::now()));
        self.current_minute = 0;
        self.history.clear();
        self.page = Page::Forecast;
        Ok(url)
    }

    /// forecast -> load_data. Keeps the user name, drops forecast progress.
    pub fn back_to_load_data(&mut self) -> Result<(), Advisory> {
        if self.page != Page::Forecast {
            return Err(Advisory::WrongPage { action: "back_to_load_data", page: self.page });
        }
        self.history.clear();
        self.current_minute = 0;
        self.page = Page::LoadData;
        Ok(())
    }

    /// forecast -> welcome. Full reset of the session's forecast state and
    /// identity.
    pub fn reset(&mut self) -> Result<(), Advisory> {
        if self.page != Page::Forecast {
            return Err(Advisory::WrongPage { action: "reset", page: self.page });
        }
        self.history.clear();
        self.current_minute = 0;
        self.user_name.clear();
        self.data_source = None;
        self.monitoring_start = None;
        self.page = Page::Welcome;
        Ok(())
    }

    /// Wall-clock position inside the simulated monitoring window.
    pub fn monitoring_time(&self) -> Option<DateTime<Utc>> {
        self.monitoring_start
            .map(|start| start + chrono::Duration::minutes(self.current_minute as i64))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// 06:00 UTC of the day containing `now`.
fn demo_monitoring_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    // 06:00:00 is always a valid wall time.
    Utc.from_utc_datetime(&date.and_hms_opt(6, 0, 0).unwrap())
}

/// Explicit session registry. Sessions are created on first access and
/// destroyed only by an explicit reset/remove; there is no ambient global.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { sessions: HashMap::new() }
    }

    pub fn session(&mut self, id: &str) -> &mut Session {
        self.sessions.entry(id.to_string()).or_insert_with(Session::new)
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
