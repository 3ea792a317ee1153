//! Explicit inputs to composition and rendering.
//!
//! Nothing in the crate reads ambient state. The catalog snapshot, table
//! prefix and course travel in a [`ReportContext`]; the viewer's timezone
//! and date format travel in a [`RenderContext`].

use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;

use crate::metadata::CatalogSnapshot;

/// Date format used when none is configured (`5 March 2024, 2:07 PM`).
pub const DEFAULT_DATE_FORMAT: &str = "%-d %B %Y, %-I:%M %p";

/// Inputs needed to compose a datasource.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub catalog: CatalogSnapshot,
    pub table_prefix: String,
    pub course_id: Option<i64>,
}

impl ReportContext {
    pub fn new(catalog: CatalogSnapshot) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn with_table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = prefix.to_string();
        self
    }

    pub fn with_course(mut self, course_id: i64) -> Self {
        self.course_id = Some(course_id);
        self
    }

    /// Physical name of a logical table.
    pub fn table(&self, logical: &str) -> String {
        format!("{}{logical}", self.table_prefix)
    }
}

/// Viewer timezone and date format available to column formatters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub timezone: Tz,
    pub date_format: String,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl RenderContext {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Default::default()
        }
    }

    /// Use `format` for dates. Invalid strftime patterns are ignored.
    pub fn with_date_format(mut self, format: &str) -> Self {
        if is_valid_date_format(format) {
            self.date_format = format.to_string();
        }
        self
    }
}

/// Whether `format` is a strftime pattern chrono can render.
pub fn is_valid_date_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}
