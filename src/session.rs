//! The editing session controller.
//!
//! [`Generator`] owns the current settings and is the only thing that mutates
//! them. Content edits are debounced: each one pushes the render and history
//! deadlines forward, and [`Generator::tick`] fires them once the window has
//! elapsed. Visual edits re-render immediately and are not recorded in
//! history. Failures never escape; they are queued as [`Notice`]s for the
//! front end to show.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::LiveConfig;
use crate::export::{ExportError, ExportFormat, export_bytes};
use crate::history::{HistoryItem, HistoryStore, Slot, parse_import};
use crate::payload::FALLBACK_URL;
use crate::render::{Logo, Rendered, render_settings};
use crate::settings::{ErrorCorrection, Settings, Shape};

/// One user edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Content(String),
    Shape(Shape),
    FgColor(String),
    BgColor(String),
    Gradient(bool),
    GradientStart(String),
    GradientEnd(String),
    Transparent(bool),
    LogoSize(u32),
    Size(u32),
    ErrorCorrection(ErrorCorrection),
    /// Attach a logo given as a `data:` URL.
    Logo(String),
    RemoveLogo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Render status shown next to the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Ready,
    Failed(String),
}

/// What a call to [`Generator::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub rendered: bool,
    pub saved: Option<i64>,
}

pub struct Generator<S: Slot> {
    settings: Settings,
    logo_data_url: Option<String>,
    rendered: Option<Rendered>,
    status: Status,
    history: HistoryStore<S>,
    live: LiveConfig,
    /// When content last changed with a render still pending.
    render_dirty_since: Option<Instant>,
    /// When content last changed with a history save still pending.
    history_dirty_since: Option<Instant>,
    notices: Vec<Notice>,
}

impl<S: Slot> Generator<S> {
    pub fn new(settings: Settings, history: HistoryStore<S>, live: LiveConfig) -> Self {
        Self {
            settings,
            logo_data_url: None,
            rendered: None,
            status: Status::Idle,
            history,
            live,
            render_dirty_since: None,
            history_dirty_since: None,
            notices: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn logo_data_url(&self) -> Option<&str> {
        self.logo_data_url.as_deref()
    }

    pub fn rendered(&self) -> Option<&Rendered> {
        self.rendered.as_ref()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// Whether a debounced render or save is waiting.
    pub fn has_pending(&self) -> bool {
        self.render_dirty_since.is_some() || self.history_dirty_since.is_some()
    }

    /// Earliest instant at which [`Generator::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let render = self
            .render_dirty_since
            .map(|t| t + self.live.render_debounce());
        let save = self
            .history_dirty_since
            .map(|t| t + self.live.history_debounce());
        match (render, save) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, notice: Notice) {
        if notice.is_error() {
            warn!("{}", notice.message);
        } else {
            info!("{}", notice.message);
        }
        self.notices.push(notice);
    }

    /// Apply one edit made at `now`.
    pub fn apply(&mut self, edit: Edit, now: Instant) {
        debug!(?edit, "session: edit");
        match edit {
            Edit::Content(content) => {
                self.settings.content = if content.is_empty() {
                    FALLBACK_URL.to_string()
                } else {
                    content
                };
                self.render_dirty_since = Some(now);
                self.history_dirty_since = Some(now);
                return;
            }
            Edit::Shape(shape) => self.settings.shape = shape,
            Edit::FgColor(c) => self.settings.fg_color = c,
            Edit::BgColor(c) => self.settings.bg_color = c,
            Edit::Gradient(on) => self.settings.gradient = on,
            Edit::GradientStart(c) => self.settings.gradient_start = c,
            Edit::GradientEnd(c) => self.settings.gradient_end = c,
            Edit::Transparent(on) => self.settings.transparent = on,
            Edit::LogoSize(pct) => self.settings.logo_size = pct,
            Edit::Size(px) => self.settings.size = px,
            Edit::ErrorCorrection(level) => self.settings.error_correction = level,
            Edit::Logo(data_url) => {
                if let Err(e) = Logo::from_data_url(&data_url, 0.0) {
                    self.notify(Notice::error(format!("Could not load logo: {e}")));
                    return;
                }
                self.logo_data_url = Some(data_url);
                self.settings.error_correction = ErrorCorrection::H;
            }
            Edit::RemoveLogo => self.logo_data_url = None,
        }
        self.render_now();
    }

    /// Fire any debounced work whose window has elapsed at `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if let Some(since) = self.render_dirty_since
            && now.saturating_duration_since(since) >= self.live.render_debounce()
        {
            self.render_dirty_since = None;
            self.render_now();
            outcome.rendered = true;
        }
        if let Some(since) = self.history_dirty_since
            && now.saturating_duration_since(since) >= self.live.history_debounce()
        {
            self.history_dirty_since = None;
            outcome.saved = self.save_to_history();
        }
        outcome
    }

    /// Run all pending work immediately.
    pub fn flush(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.render_dirty_since.take().is_some() {
            self.render_now();
            outcome.rendered = true;
        }
        if self.history_dirty_since.take().is_some() {
            outcome.saved = self.save_to_history();
        }
        outcome
    }

    /// Re-render from the current settings.
    pub fn render_now(&mut self) -> bool {
        match render_settings(&self.settings, self.logo_data_url.as_deref()) {
            Ok(rendered) => {
                self.rendered = Some(rendered);
                self.status = Status::Ready;
                true
            }
            Err(e) => {
                self.rendered = None;
                self.status = Status::Failed(e.to_string());
                self.notify(Notice::error(format!("Error generating QR code: {e}")));
                false
            }
        }
    }

    /// Record the current settings in history.
    pub fn save_to_history(&mut self) -> Option<i64> {
        let item = HistoryItem::capture(&self.settings, self.logo_data_url.clone());
        match self.history.append(item) {
            Ok(id) => Some(id),
            Err(e) => {
                self.notify(Notice::error(format!("Could not save history: {e}")));
                None
            }
        }
    }

    /// Restore settings and logo from a history entry and render them.
    pub fn load_from_history(&mut self, id: i64) -> bool {
        match self.history.get(id) {
            Ok(Some(item)) => {
                self.settings = item.settings;
                self.logo_data_url = item.logo_data_url;
                self.render_dirty_since = None;
                self.history_dirty_since = None;
                self.render_now();
                self.notify(Notice::success("Settings loaded from history"));
                true
            }
            Ok(None) => {
                self.notify(Notice::error(format!("No history entry with id {id}")));
                false
            }
            Err(e) => {
                self.notify(Notice::error(format!("Could not read history: {e}")));
                false
            }
        }
    }

    /// Saved entries, newest first. A storage failure yields an empty list
    /// and an error notice.
    pub fn history_items(&mut self) -> Vec<HistoryItem> {
        match self.history.list() {
            Ok(items) => items,
            Err(e) => {
                self.notify(Notice::error(format!("Could not read history: {e}")));
                Vec::new()
            }
        }
    }

    pub fn delete_history_item(&mut self, id: i64) -> bool {
        match self.history.delete(id) {
            Ok(removed) => removed,
            Err(e) => {
                self.notify(Notice::error(format!("Could not delete entry: {e}")));
                false
            }
        }
    }

    pub fn clear_history(&mut self) {
        match self.history.clear() {
            Ok(()) => self.notify(Notice::success("History cleared")),
            Err(e) => self.notify(Notice::error(format!("Could not clear history: {e}"))),
        }
    }

    /// Merge an import document into history. Returns the new entry count.
    pub fn import_history(&mut self, text: &str) -> Option<usize> {
        let merged = parse_import(text).and_then(|items| self.history.import_merge(items));
        match merged {
            Ok(len) => {
                self.notify(Notice::success(format!(
                    "History imported ({len} entries)"
                )));
                Some(len)
            }
            Err(e) => {
                self.notify(Notice::error(format!("Invalid history file: {e}")));
                None
            }
        }
    }

    /// Encode the current render in `format`.
    pub fn export(&mut self, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        let result = match &self.rendered {
            Some(rendered) => export_bytes(rendered, format),
            None => Err(ExportError::NothingRendered),
        };
        match &result {
            Ok(_) => self.notify(Notice::success(format!(
                "{} exported successfully",
                format.extension().to_uppercase()
            ))),
            Err(e) => self.notify(Notice::error(format!(
                "Error generating {}: {e}",
                format.extension().to_uppercase()
            ))),
        }
        result
    }

    /// Encode the current render and write it to `path`.
    pub fn export_to(&mut self, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
        let bytes = self.export(format)?;
        std::fs::write(path, bytes).map_err(|source| {
            let err = ExportError::Write {
                path: path.to_path_buf(),
                source,
            };
            self.notify(Notice::error(err.to_string()));
            err
        })
    }
}
