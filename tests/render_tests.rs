//! Tests for console and traceback rendering.

use serde_json::{json, Map};

use lucid_log::render::ConsoleRenderer;
use lucid_log::traceback::TracebackFormatter;
use lucid_log::types::{EventTime, ExceptionInfo, Frame, NormalizedEvent, Traceback};

fn event(level: Option<&str>, text: &str) -> NormalizedEvent {
    NormalizedEvent {
        timestamp: None,
        level: level.map(str::to_string),
        event: text.to_string(),
        log_stream: None,
        fields: Map::new(),
        exception: None,
        structured: true,
    }
}

fn frame(file: &str, line: u64, name: &str) -> Frame {
    Frame {
        filename: file.into(),
        lineno: line,
        name: name.into(),
        line: Some("do_work()".into()),
        locals: None,
    }
}

#[test]
fn test_plain_line_layout() {
    let renderer = ConsoleRenderer::new(false);
    let rendered = renderer.render(&event(Some("info"), "hello"));
    assert_eq!(rendered, "[info     ] hello");
}

#[test]
fn test_missing_level_renders_unknown() {
    let renderer = ConsoleRenderer::new(false);
    let rendered = renderer.render(&event(None, "no level"));
    assert!(rendered.starts_with("[unknown  ]"), "{rendered}");
}

#[test]
fn test_timestamp_millis_rendered_as_utc() {
    let renderer = ConsoleRenderer::new(false);
    let mut e = event(Some("info"), "x");
    e.timestamp = Some(EventTime::Millis(1_700_000_000_000));
    let rendered = renderer.render(&e);
    assert!(rendered.starts_with("2023-11-14T22:13:20.000Z [info"), "{rendered}");
}

#[test]
fn test_fields_sorted_and_event_padded() {
    let renderer = ConsoleRenderer::new(false);
    let mut e = event(Some("warn"), "disk");
    e.fields.insert("zeta".into(), json!(1));
    e.fields.insert("alpha".into(), json!("text"));
    let rendered = renderer.render(&e);
    assert_eq!(
        rendered,
        format!("[warn     ] {:<30} alpha=text zeta=1", "disk")
    );
}

#[test]
fn test_logger_and_stream_in_brackets() {
    let renderer = ConsoleRenderer::new(false);
    let mut e = event(Some("debug"), "connected");
    e.fields.insert("logger".into(), json!("db.pool"));
    e.log_stream = Some("web-1".into());
    let rendered = renderer.render(&e);
    assert!(rendered.contains("[db.pool] [web-1]"), "{rendered}");
    assert!(!rendered.contains("logger="));
}

#[test]
fn test_stack_printed_after_line() {
    let renderer = ConsoleRenderer::new(false);
    let mut e = event(Some("info"), "here");
    e.fields.insert("stack".into(), json!("Stack (most recent call last):\n  File x"));
    let rendered = renderer.render(&e);
    let mut lines = rendered.lines();
    assert!(lines.next().unwrap().contains("here"));
    assert_eq!(lines.next(), Some("Stack (most recent call last):"));
}

#[test]
fn test_colors_applied_only_when_enabled() {
    let e = event(Some("error"), "boom");
    assert!(ConsoleRenderer::new(true).render(&e).contains("\x1b["));
    assert!(!ConsoleRenderer::new(false).render(&e).contains("\x1b["));
}

#[test]
fn test_malformed_line_is_marked() {
    let renderer = ConsoleRenderer::new(false);
    assert_eq!(renderer.render_malformed("oops {"), "> oops {");
    assert_eq!(renderer.render_line("oops {").as_deref(), Some("> oops {"));
}

#[test]
fn test_render_line_structured_and_blank() {
    let renderer = ConsoleRenderer::new(false);
    let rendered = renderer
        .render_line("{\"event\": \"ok\", \"level\": \"info\"}\n")
        .unwrap();
    assert_eq!(rendered, "[info     ] ok");
    assert!(renderer.render_line("   \n").is_none());
}

#[test]
fn test_text_exception_printed_verbatim() {
    let renderer = ConsoleRenderer::new(false);
    let mut e = event(Some("error"), "failed");
    e.exception = Some(Traceback::Text("Traceback (most recent call last):\nKeyError: 'x'\n".into()));
    let rendered = renderer.render(&e);
    assert!(rendered.ends_with("\nTraceback (most recent call last):\nKeyError: 'x'"));
}

#[test]
fn test_structured_exception_rendered() {
    let renderer = ConsoleRenderer::new(false);
    let mut e = event(Some("error"), "failed");
    e.exception = Some(Traceback::Structured(vec![ExceptionInfo {
        exc_type: "ValueError".into(),
        exc_value: "bad input".into(),
        is_cause: false,
        frames: vec![frame("app.py", 10, "main")],
    }]));
    let rendered = renderer.render(&e);
    assert!(rendered.contains("Traceback (most recent call last):"));
    assert!(rendered.contains("  File \"app.py\", line 10, in main"));
    assert!(rendered.contains("    do_work()"));
    assert!(rendered.ends_with("ValueError: bad input"));
}

#[test]
fn test_exception_chain_causes_first() {
    let formatter = TracebackFormatter::plain();
    let chain = vec![
        ExceptionInfo {
            exc_type: "RuntimeError".into(),
            exc_value: "outer".into(),
            is_cause: false,
            frames: vec![frame("a.py", 1, "outer")],
        },
        ExceptionInfo {
            exc_type: "KeyError".into(),
            exc_value: "'inner'".into(),
            is_cause: true,
            frames: vec![frame("b.py", 2, "inner")],
        },
    ];
    let text = formatter.format(&Traceback::Structured(chain));
    let inner = text.find("KeyError").unwrap();
    let sep = text.find("direct cause").unwrap();
    let outer = text.find("RuntimeError").unwrap();
    assert!(inner < sep && sep < outer, "{text}");
}

#[test]
fn test_frames_beyond_limit_are_hidden() {
    let formatter = TracebackFormatter {
        max_frames: 4,
        ..TracebackFormatter::plain()
    };
    let frames = (0..10).map(|i| frame("f.py", i, &format!("fn{i}"))).collect();
    let text = formatter.format(&Traceback::Structured(vec![ExceptionInfo {
        exc_type: "E".into(),
        exc_value: String::new(),
        is_cause: false,
        frames,
    }]));
    assert!(text.contains("... 6 frames hidden ..."));
    assert!(text.contains("in fn0"));
    assert!(text.contains("in fn9"));
    assert!(!text.contains("in fn5"));
}

#[test]
fn test_locals_filtered_and_truncated() {
    let formatter = TracebackFormatter {
        locals_max_string: 5,
        ..TracebackFormatter::plain()
    };
    let mut locals = Map::new();
    locals.insert("__name__".into(), json!("'__main__'"));
    locals.insert("value".into(), json!("'abcdefghij'"));
    let mut f = frame("app.py", 3, "main");
    f.locals = Some(locals);
    let text = formatter.format(&Traceback::Structured(vec![ExceptionInfo {
        exc_type: "E".into(),
        exc_value: "x".into(),
        is_cause: false,
        frames: vec![f],
    }]));
    assert!(!text.contains("__name__"));
    assert!(text.contains("value = 'abcd..."));
}

#[test]
fn test_locals_hidden_when_disabled() {
    let formatter = TracebackFormatter {
        show_locals: false,
        ..TracebackFormatter::plain()
    };
    let mut locals = Map::new();
    locals.insert("secret".into(), json!("1"));
    let mut f = frame("app.py", 3, "main");
    f.locals = Some(locals);
    let text = formatter.format(&Traceback::Structured(vec![ExceptionInfo {
        exc_type: "E".into(),
        exc_value: "x".into(),
        is_cause: false,
        frames: vec![f],
    }]));
    assert!(!text.contains("secret"));
}

#[test]
fn test_single_underscore_locals_hidden_on_request() {
    let formatter = TracebackFormatter {
        locals_hide_dunder: false,
        locals_hide_sunder: true,
        ..TracebackFormatter::plain()
    };
    let mut locals = Map::new();
    locals.insert("_cache".into(), json!("{}"));
    locals.insert("__name__".into(), json!("'__main__'"));
    locals.insert("user".into(), json!("'ada'"));
    let mut f = frame("app.py", 3, "main");
    f.locals = Some(locals);
    let text = formatter.format(&Traceback::Structured(vec![ExceptionInfo {
        exc_type: "E".into(),
        exc_value: "x".into(),
        is_cause: false,
        frames: vec![f],
    }]));
    assert!(!text.contains("_cache"));
    assert!(text.contains("__name__ = '__main__'"));
    assert!(text.contains("user = 'ada'"));
}
