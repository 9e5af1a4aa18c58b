//! `show` command: render structured log lines from a file or stdin.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::normalize::normalize_line;
use crate::render::ConsoleRenderer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowStats {
    pub lines: usize,
    pub structured: usize,
    pub malformed: usize,
    pub blank: usize,
}

/// Render every line of `reader` into `out`. Invalid UTF-8 and non-JSON lines
/// are rendered in degraded form; only I/O failures stop the run.
pub fn render_lines<R, W>(mut reader: R, out: &mut W, renderer: &ConsoleRenderer) -> Result<ShowStats>
where
    R: BufRead,
    W: Write,
{
    let mut stats = ShowStats::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).context("reading log input")?;
        if read == 0 {
            break;
        }
        stats.lines += 1;

        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            stats.blank += 1;
            continue;
        }
        let rendered = match normalize_line(line) {
            Some(event) => {
                stats.structured += 1;
                renderer.render(&event)
            }
            None => {
                stats.malformed += 1;
                renderer.render_malformed(line)
            }
        };
        writeln!(out, "{rendered}").context("writing rendered line")?;
    }
    out.flush().context("flushing output")?;
    debug!(
        lines = stats.lines,
        malformed = stats.malformed,
        "show finished"
    );
    Ok(stats)
}

/// Render a file, or stdin when `path` is `None`.
pub fn run_show<W: Write>(path: Option<&Path>, out: &mut W, renderer: &ConsoleRenderer) -> Result<ShowStats> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            render_lines(BufReader::new(file), out, renderer)
        }
        None => {
            let stdin = io::stdin();
            render_lines(stdin.lock(), out, renderer)
        }
    }
}
