//! The content handed to the caller when a session completes.

use std::fmt::Write;

use quill_core::ids::SessionId;
use serde::Serialize;

use crate::references::LoadedReference;
use crate::types::{AxisValue, Diagnostic};

/// Instructions plus every reference document a session loaded.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBundle {
    /// Session that produced the bundle.
    pub session: SessionId,
    /// Selected package.
    pub package: String,
    /// Resolved axis values in declared order.
    pub variant: Vec<AxisValue>,
    /// Package body.
    pub instructions: String,
    /// Documents in load order, dependencies first.
    pub references: Vec<LoadedReference>,
    /// Non-fatal conditions observed on the way.
    pub diagnostics: Vec<Diagnostic>,
    /// Clarification questions the session asked.
    pub questions_asked: u32,
}

impl ContentBundle {
    /// Render as a `<skills>` context block for the host assistant.
    pub fn render(&self) -> String {
        let mut xml = String::from("<skills>\n");

        let _ = writeln!(xml, "<skill name=\"{}\">", escape_xml(&self.package));
        for v in &self.variant {
            let _ = writeln!(
                xml,
                "<variant axis=\"{}\" value=\"{}\"/>",
                escape_xml(&v.axis),
                escape_xml(&v.value)
            );
        }
        xml.push_str(self.instructions.trim_end());
        xml.push('\n');

        for doc in &self.references {
            let _ = writeln!(xml, "<reference id=\"{}\">", escape_xml(doc.id.as_str()));
            xml.push_str(doc.content.trim_end());
            xml.push_str("\n</reference>\n");
        }

        xml.push_str("</skill>\n</skills>");
        xml
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::validate_reference_id;

    fn bundle() -> ContentBundle {
        ContentBundle {
            session: SessionId::from("sess-1"),
            package: "scaffold".into(),
            variant: vec![AxisValue {
                axis: "uiFramework".into(),
                value: "B".into(),
            }],
            instructions: "Do the thing.\n".into(),
            references: vec![LoadedReference {
                id: validate_reference_id("refs/b.md").unwrap(),
                content: "B guide".into(),
                required_by: None,
            }],
            diagnostics: Vec::new(),
            questions_asked: 1,
        }
    }

    #[test]
    fn render_wraps_instructions_and_references() {
        let xml = bundle().render();
        assert!(xml.starts_with(
            "<skills>\n<skill name=\"scaffold\">\n<variant axis=\"uiFramework\" value=\"B\"/>\nDo the thing.\n"
        ));
        assert!(xml.contains("<reference id=\"refs/b.md\">\nB guide\n</reference>"));
        assert!(xml.ends_with("</skill>\n</skills>"));
    }

    #[test]
    fn render_escapes_attributes() {
        let mut b = bundle();
        b.variant[0].value = "<\"x\">".into();
        assert!(b.render().contains("value=\"&lt;&quot;x&quot;&gt;\""));
    }

    #[test]
    fn axis_named_like_an_attribute_stays_well_formed() {
        let mut b = bundle();
        b.variant = vec![
            AxisValue {
                axis: "name".into(),
                value: "X".into(),
            },
            AxisValue {
                axis: "2d".into(),
                value: "y".into(),
            },
        ];
        let xml = b.render();
        assert!(xml.contains("<skill name=\"scaffold\">\n"));
        assert!(xml.contains("<variant axis=\"name\" value=\"X\"/>\n<variant axis=\"2d\" value=\"y\"/>\n"));
        assert_eq!(xml.matches("name=").count(), 1);
    }

    #[test]
    fn escape_all_special_chars() {
        assert_eq!(escape_xml("a&b<c>d\"e'f"), "a&amp;b&lt;c&gt;d&quot;e&apos;f");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(bundle()).unwrap();
        assert_eq!(json["package"], "scaffold");
        assert_eq!(json["questionsAsked"], 1);
        assert_eq!(json["variant"][0]["axis"], "uiFramework");
        assert_eq!(json["references"][0]["id"], "refs/b.md");
        assert_eq!(json["session"], "sess-1");
    }
}
