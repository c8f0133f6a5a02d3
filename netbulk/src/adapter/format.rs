//! Re-encoding of retrieved command output.
//!
//! Structured output is pretty-printed when it parses. Anything else is
//! wrapped so the artifact is still valid in the requested format:
//! `{"raw_output": ...}` for JSON, an `<output>` root for XML.

use quick_xml::Writer;
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, Event};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::config::OutputFormat;

const INDENT: usize = 4;

/// Re-encode `raw` for `format`. Never fails.
pub fn format_output(raw: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty_json(raw).unwrap_or_else(|| wrap_json(raw)),
        OutputFormat::Xml => pretty_xml(raw).unwrap_or_else(|| wrap_xml(raw)),
        OutputFormat::Text => raw.to_string(),
    }
}

/// Pretty-print `raw` if it is a JSON document.
pub fn pretty_json(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    Some(to_pretty_json(&value))
}

/// Wrap arbitrary text as `{"raw_output": text}`.
pub fn wrap_json(raw: &str) -> String {
    to_pretty_json(&serde_json::json!({ "raw_output": raw }))
}

fn to_pretty_json(value: &Value) -> String {
    let indent = " ".repeat(INDENT);
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);

    // Serializing a Value into a Vec cannot fail.
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Pretty-print `raw` if it is a well-formed XML document.
///
/// Rejects text outside the root, more than one root, no root, unclosed
/// elements, malformed attributes and undefined entities.
pub fn pretty_xml(raw: &str) -> Option<String> {
    let mut reader = Reader::from_str(raw.trim());
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .ok()?;

    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        let event = reader.read_event().ok()?;
        match &event {
            Event::Decl(_) => continue,
            Event::Start(e) | Event::Empty(e) => {
                for attr in e.attributes() {
                    attr.ok()?;
                }
                if depth == 0 {
                    roots += 1;
                    if roots > 1 {
                        return None;
                    }
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.checked_sub(1)?;
            }
            Event::Text(t) => {
                if t.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                if depth == 0 {
                    return None;
                }
                t.unescape().ok()?;
            }
            Event::CData(_) if depth == 0 => return None,
            Event::Eof => break,
            _ => {}
        }
        writer.write_event(event).ok()?;
    }

    if depth != 0 || roots != 1 {
        return None;
    }

    let mut out = String::from_utf8(writer.into_inner()).ok()?;
    out.push('\n');
    Some(out)
}

/// Wrap arbitrary text in an `<output>` root. The element's text content
/// is exactly `raw`.
pub fn wrap_xml(raw: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<output>{}</output>\n",
        quick_xml::escape::escape(raw)
    )
}
