//! Value formatters attached to columns.
//!
//! A formatter turns one raw value into display text. Formatters are
//! infallible: bad input degrades to plain text, and `NULL` always renders
//! as the empty string (enforced by [`Formatter::format`], not by each
//! callback).

use std::fmt::{self, Write as _};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::context::RenderContext;
use super::value::Value;

type FormatFn = dyn Fn(&Value, &RenderContext) -> String + Send + Sync;

/// A named, shareable formatting callback.
#[derive(Clone)]
pub struct Formatter {
    name: &'static str,
    callback: Arc<FormatFn>,
}

impl Formatter {
    pub fn new(
        name: &'static str,
        callback: impl Fn(&Value, &RenderContext) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            callback: Arc::new(callback),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Format `value`. `NULL` never reaches the callback.
    pub fn format(&self, value: &Value, ctx: &RenderContext) -> String {
        if value.is_null() {
            return String::new();
        }
        (self.callback)(value, ctx)
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter").field("name", &self.name).finish()
    }
}

impl PartialEq for Formatter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.callback, &other.callback)
    }
}

/// Timestamp in the viewer's timezone using their date format.
/// Zero and negative timestamps mean "never" and render empty.
pub fn userdate() -> Formatter {
    Formatter::new("userdate", |value, ctx| {
        render_timestamp(value, ctx, &ctx.date_format)
    })
}

/// Timestamp with a fixed strftime pattern, still in the viewer's timezone.
pub fn userdate_with(format: &'static str) -> Formatter {
    Formatter::new("userdate_with", move |value, ctx| {
        render_timestamp(value, ctx, format)
    })
}

fn render_timestamp(value: &Value, ctx: &RenderContext, format: &str) -> String {
    let Some(ts) = value.as_i64() else {
        return value.display();
    };
    if ts <= 0 {
        return String::new();
    }
    let Some(utc) = Utc.timestamp_opt(ts, 0).single() else {
        return ts.to_string();
    };
    let local = utc.with_timezone(&ctx.timezone);
    let mut out = String::new();
    // chrono reports bad patterns through fmt::Error
    if write!(out, "{}", local.format(format)).is_err() {
        return ts.to_string();
    }
    out
}

/// Number with `decimals` places and a percent sign.
pub fn percent(decimals: usize) -> Formatter {
    Formatter::new("percent", move |value, _| match value.as_f64() {
        Some(v) if v.is_finite() => format!("{v:.decimals$}%"),
        _ => value.display(),
    })
}

/// `Yes` / `No`.
pub fn yes_no() -> Formatter {
    Formatter::new("yes_no", |value, _| match value.as_bool() {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => value.display(),
    })
}

/// Check mark icon for true, nothing for false.
pub fn check_icon() -> Formatter {
    Formatter::new("check_icon", |value, _| match value.as_bool() {
        Some(true) => icon("fa-check", "text-success", "Yes"),
        Some(false) => String::new(),
        None => value.display(),
    })
}

/// Completion states as stored by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Incomplete,
    Complete,
    CompletePass,
    CompleteFail,
}

impl CompletionState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Incomplete),
            1 => Some(Self::Complete),
            2 => Some(Self::CompletePass),
            3 => Some(Self::CompleteFail),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Incomplete => 0,
            Self::Complete => 1,
            Self::CompletePass => 2,
            Self::CompleteFail => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Incomplete => "Not completed",
            Self::Complete => "Completed",
            Self::CompletePass => "Completed (achieved pass grade)",
            Self::CompleteFail => "Completed (did not achieve pass grade)",
        }
    }

    pub fn all() -> [CompletionState; 4] {
        [
            Self::Incomplete,
            Self::Complete,
            Self::CompletePass,
            Self::CompleteFail,
        ]
    }

    fn icon(self) -> String {
        match self {
            Self::Incomplete => icon("fa-circle-o", "text-muted", self.label()),
            Self::Complete => icon("fa-check", "text-success", self.label()),
            Self::CompletePass => icon("fa-check-circle", "text-success", self.label()),
            Self::CompleteFail => icon("fa-times-circle", "text-danger", self.label()),
        }
    }
}

/// Completion state code rendered as text.
pub fn completion_state() -> Formatter {
    Formatter::new("completion_state", |value, _| {
        match value.as_i64().and_then(CompletionState::from_code) {
            Some(state) => state.label().to_string(),
            None => value.display(),
        }
    })
}

/// Completion state code rendered as an icon.
pub fn completion_state_icon() -> Formatter {
    Formatter::new("completion_state_icon", |value, _| {
        match value.as_i64().and_then(CompletionState::from_code) {
            Some(state) => state.icon(),
            None => value.display(),
        }
    })
}

/// Enrolment status: 0 active, 1 suspended.
pub fn enrolment_status() -> Formatter {
    Formatter::new("enrolment_status", |value, _| match value.as_i64() {
        Some(0) => "Active".to_string(),
        Some(1) => "Suspended".to_string(),
        _ => value.display(),
    })
}

/// Plain text with HTML special characters escaped.
pub fn escaped_text() -> Formatter {
    Formatter::new("escaped_text", |value, _| escape_html(&value.display()))
}

/// Seconds as the two largest non-zero units (`1 day 2 hours`).
pub fn duration() -> Formatter {
    Formatter::new("duration", |value, _| match value.as_i64() {
        Some(secs) if secs >= 0 => format_duration(secs),
        _ => value.display(),
    })
}

fn format_duration(secs: i64) -> String {
    const UNITS: [(i64, &str, &str); 4] = [
        (86_400, "day", "days"),
        (3_600, "hour", "hours"),
        (60, "min", "mins"),
        (1, "sec", "secs"),
    ];
    if secs == 0 {
        return "0 secs".to_string();
    }
    let mut rest = secs;
    let mut parts = Vec::new();
    for (size, one, many) in UNITS {
        let n = rest / size;
        rest %= size;
        if n > 0 {
            parts.push(format!("{n} {}", if n == 1 { one } else { many }));
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(" ")
}

fn icon(name: &str, class: &str, title: &str) -> String {
    let title = escape_html(title);
    format!(r#"<i class="icon fa {name} {class}" title="{title}" aria-label="{title}"></i>"#)
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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
