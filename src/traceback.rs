//! Plain-text rendering of serialized exception chains.

use std::fmt::Write as _;

use owo_colors::{OwoColorize, Style};
use serde_json::Value;

use crate::types::{ExceptionInfo, Frame, Traceback};

const CAUSE_SEPARATOR: &str = "The above exception was the direct cause of the following exception:";
const CONTEXT_SEPARATOR: &str =
    "During handling of the above exception, another exception occurred:";

#[derive(Debug, Clone)]
pub struct TracebackFormatter {
    pub colors: bool,
    pub show_locals: bool,
    /// Frames kept per exception; the middle of longer stacks is elided.
    pub max_frames: usize,
    pub locals_max_string: usize,
    pub locals_hide_dunder: bool,
    pub locals_hide_sunder: bool,
}

impl Default for TracebackFormatter {
    fn default() -> Self {
        Self {
            colors: true,
            show_locals: true,
            max_frames: 100,
            locals_max_string: 80,
            locals_hide_dunder: true,
            locals_hide_sunder: false,
        }
    }
}

impl TracebackFormatter {
    pub fn plain() -> Self {
        Self {
            colors: false,
            ..Self::default()
        }
    }

    pub fn format(&self, traceback: &Traceback) -> String {
        match traceback {
            Traceback::Text(text) => text.trim_end().to_string(),
            Traceback::Structured(chain) => self.format_chain(chain),
        }
    }

    /// Causes are printed first, the handled exception last.
    fn format_chain(&self, chain: &[ExceptionInfo]) -> String {
        let mut out = String::new();
        let mut iter = chain.iter().rev().peekable();
        while let Some(exc) = iter.next() {
            self.format_exception(&mut out, exc);
            if iter.peek().is_some() {
                let sep = if exc.is_cause {
                    CAUSE_SEPARATOR
                } else {
                    CONTEXT_SEPARATOR
                };
                let _ = write!(out, "\n{}\n\n", self.paint(sep, Style::new().italic()));
            }
        }
        out.truncate(out.trim_end().len());
        out
    }

    fn format_exception(&self, out: &mut String, exc: &ExceptionInfo) {
        if !exc.frames.is_empty() {
            let _ = writeln!(
                out,
                "{}",
                self.paint("Traceback (most recent call last):", Style::new().red())
            );
            let frames = &exc.frames;
            if frames.len() > self.max_frames && self.max_frames > 0 {
                let head = self.max_frames / 2;
                let tail = self.max_frames - head;
                for frame in &frames[..head] {
                    self.format_frame(out, frame);
                }
                let hidden = frames.len() - head - tail;
                let _ = writeln!(
                    out,
                    "{}",
                    self.paint(&format!("\n... {hidden} frames hidden ...\n"), Style::new().dimmed())
                );
                for frame in &frames[frames.len() - tail..] {
                    self.format_frame(out, frame);
                }
            } else {
                for frame in frames {
                    self.format_frame(out, frame);
                }
            }
        }
        let exc_type = self.paint(&exc.exc_type, Style::new().red().bold());
        if exc.exc_value.is_empty() {
            let _ = writeln!(out, "{exc_type}");
        } else {
            let _ = writeln!(out, "{exc_type}: {}", exc.exc_value);
        }
    }

    fn format_frame(&self, out: &mut String, frame: &Frame) {
        let _ = writeln!(
            out,
            "  File \"{}\", line {}, in {}",
            self.paint(&frame.filename, Style::new().magenta()),
            self.paint(&frame.lineno.to_string(), Style::new().cyan()),
            self.paint(&frame.name, Style::new().green()),
        );
        if let Some(line) = frame.line.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "    {line}");
        }
        if !self.show_locals {
            return;
        }
        if let Some(locals) = &frame.locals {
            for (key, value) in locals {
                if self.hidden_local(key) {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "      {} = {}",
                    self.paint(key, Style::new().yellow()),
                    self.local_repr(value)
                );
            }
        }
    }

    fn hidden_local(&self, key: &str) -> bool {
        let dunder = key.starts_with("__") && key.ends_with("__");
        (self.locals_hide_dunder && dunder)
            || (self.locals_hide_sunder && !dunder && key.starts_with('_'))
    }

    fn local_repr(&self, value: &Value) -> String {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if text.chars().count() <= self.locals_max_string {
            return text;
        }
        let mut cut: String = text.chars().take(self.locals_max_string).collect();
        cut.push_str("...");
        cut
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.colors {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }
}
