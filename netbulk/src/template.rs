//! Configuration template rendering.
//!
//! Templates are handlebars text files rendered in strict mode, so a
//! placeholder naming no inventory column fails the render instead of
//! silently producing an empty value. A blank cell in an existing column
//! renders as empty text. Output is not HTML-escaped:
//! configuration text and XML payloads are rendered as written.

use std::path::Path;

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Result, TemplateError};

/// Render the template at `path` with `context`.
pub fn render<T: Serialize>(path: impl AsRef<Path>, context: &T) -> Result<String> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    render_str(&source, context)
}

/// Render template text with `context`.
pub fn render_str<T: Serialize>(template: &str, context: &T) -> Result<String> {
    let registry = registry();
    Ok(registry
        .render_template(template, context)
        .map_err(TemplateError::Render)?)
}

fn registry() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::inventory::InventoryRow;

    fn row() -> InventoryRow {
        InventoryRow::from_pairs([
            ("ip", "10.0.0.1"),
            ("hostname", "pe1"),
            ("description", "uplink <core>"),
        ])
    }

    #[test]
    fn test_render_fields() {
        let text = render_str(
            "hostname {{hostname}}\ninterface Gi0/1\n description {{ description }}\n",
            &row(),
        )
        .unwrap();
        assert_eq!(
            text,
            "hostname pe1\ninterface Gi0/1\n description uplink <core>\n"
        );
    }

    #[test]
    fn test_missing_field_fails() {
        let err = render_str("snmp-server location {{site}}", &row()).unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::Render(_))));
    }

    #[test]
    fn test_blank_cell_renders_empty() {
        let row = InventoryRow::from_pairs([("ip", "10.0.0.6"), ("vlan_id", "20"), ("vlan_name", " ")]);
        let text = render_str("vlan {{vlan_id}}\n name {{vlan_name}}", &row).unwrap();
        assert_eq!(text, "vlan 20\n name ");
    }

    #[test]
    fn test_missing_file_fails() {
        let err = render("/nonexistent/netbulk/template.j2", &row()).unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::Read { .. })));
    }

    #[test]
    fn test_render_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("system.xml");
        std::fs::write(&path, "<system><host-name>{{hostname}}</host-name></system>").unwrap();

        let text = render(&path, &row()).unwrap();
        assert_eq!(text, "<system><host-name>pe1</host-name></system>");
    }
}
