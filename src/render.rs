//! Console rendering of normalized log records.
//!
//! Layout: `timestamp [level    ] event                          [logger] [stream] key=value ...`
//! followed by stack text and exceptions on their own lines. Lines that are
//! not structured data are shown dimmed behind a red `>` so malformed input
//! stays visible.

use std::io::{self, Write};

use owo_colors::{OwoColorize, Style};
use serde_json::Value;

use crate::normalize::normalize_line;
use crate::traceback::TracebackFormatter;
use crate::types::NormalizedEvent;

/// Level names with a dedicated color, also used for padding.
const KNOWN_LEVELS: [&str; 8] = [
    "critical", "exception", "error", "warn", "warning", "info", "debug", "notset",
];

const UNKNOWN_LEVEL: &str = "unknown";
const DEFAULT_PAD_EVENT: usize = 30;

#[derive(Debug, Clone)]
pub struct ConsoleRenderer {
    colors: bool,
    longest_level: usize,
    traceback: TracebackFormatter,
}

impl ConsoleRenderer {
    pub fn new(colors: bool) -> Self {
        let longest_level = KNOWN_LEVELS.iter().map(|l| l.len()).max().unwrap_or(0);
        Self {
            colors,
            longest_level,
            traceback: TracebackFormatter {
                colors,
                ..TracebackFormatter::default()
            },
        }
    }

    pub fn with_traceback(mut self, traceback: TracebackFormatter) -> Self {
        self.traceback = traceback;
        self
    }

    /// Render one record, without a trailing newline.
    pub fn render(&self, event: &NormalizedEvent) -> String {
        let mut fields = event.fields.clone();
        let logger = fields
            .remove("logger")
            .or_else(|| fields.remove("logger_name"))
            .map(value_repr);
        let stack = fields.remove("stack").map(value_repr);

        let mut parts: Vec<String> = Vec::new();
        if let Some(ts) = &event.timestamp {
            parts.push(self.paint(&ts.to_string(), Style::new().dimmed()));
        }

        let level = event.level.as_deref().unwrap_or(UNKNOWN_LEVEL);
        let padded_level = format!("{level:<width$}", width = self.longest_level);
        parts.push(format!("[{}]", self.paint(&padded_level, self.level_style(level))));

        let has_tail = logger.is_some() || event.log_stream.is_some() || !fields.is_empty();
        let text = if has_tail {
            format!("{:<width$}", event.event, width = DEFAULT_PAD_EVENT)
        } else {
            event.event.clone()
        };
        parts.push(self.paint(&text, Style::new().bold()));

        if let Some(logger) = logger {
            parts.push(format!("[{}]", self.paint(&logger, Style::new().blue().bold())));
        }
        if let Some(stream) = &event.log_stream {
            parts.push(format!("[{}]", self.paint(stream, Style::new().dimmed())));
        }

        let mut keys: Vec<&String> = fields.keys().collect();
        keys.sort();
        for key in keys {
            let value = fields.get(key).map(|v| value_repr(v.clone())).unwrap_or_default();
            parts.push(format!(
                "{}={}",
                self.paint(key, Style::new().cyan()),
                self.paint(&value, Style::new().magenta())
            ));
        }

        let mut out = parts.join(" ");
        if let Some(stack) = &stack {
            out.push('\n');
            out.push_str(stack.trim_end());
            if event.exception.is_some() {
                out.push_str("\n\n");
                out.push_str(&"=".repeat(79));
                out.push('\n');
            }
        }
        if let Some(exception) = &event.exception {
            out.push('\n');
            out.push_str(&self.traceback.format(exception));
        }
        out
    }

    /// Render a line that is not structured data.
    pub fn render_malformed(&self, line: &str) -> String {
        format!(
            "{} {}",
            self.paint(">", Style::new().red()),
            self.paint(line, Style::new().bright_black())
        )
    }

    /// Render one raw input line, structured or not. `None` for blank lines.
    pub fn render_line(&self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            return None;
        }
        Some(match normalize_line(line) {
            Some(event) => self.render(&event),
            None => self.render_malformed(line),
        })
    }

    pub fn write_event<W: Write>(&self, out: &mut W, event: &NormalizedEvent) -> io::Result<()> {
        writeln!(out, "{}", self.render(event))
    }

    fn level_style(&self, level: &str) -> Style {
        match level.to_ascii_lowercase().as_str() {
            "critical" => Style::new().red().bold().underline(),
            "exception" | "error" => Style::new().red().bold(),
            "warn" | "warning" => Style::new().yellow().bold(),
            "info" => Style::new().green().bold(),
            "debug" => Style::new().blue().bold(),
            "notset" => Style::new().dimmed(),
            _ => Style::new().bold(),
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.colors {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

fn value_repr(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
