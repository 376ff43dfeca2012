//! Base text renderers
//!
//! `XmlTextRenderer` walks the segment tree and writes TEI-like markup:
//! every fragment span becomes a `<seg>` whose `xml:id` is the anchor layer
//! renderers point to, and every line starts with `<lb n="Y"/>`.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;

use crate::context::RenderingContext;
use crate::errors::RenderError;
use crate::flatten::{FragmentRef, Segment, SegmentNode};
use crate::model::{Part, TextPart};
use crate::registry::PartRenderer;
use crate::tree::{walk, SegmentVisitor};

/// Decode the part JSON back into a text part
pub(crate) fn text_part_of(part: &Value) -> Result<TextPart, RenderError> {
    match serde_json::from_value::<Part>(part.clone())? {
        Part::Text(text) => Ok(text),
        other => Err(RenderError::Json(format!("part {} is not a text part", other.id()))),
    }
}

/// Renders the base text as `<div>` with `<seg>` spans and line breaks
#[derive(Debug, Clone)]
pub struct XmlTextRenderer {
    /// Wrapping element name
    pub element: String,
}

impl Default for XmlTextRenderer {
    fn default() -> Self {
        Self { element: "div".to_string() }
    }
}

struct TeiVisitor {
    writer: Writer<Vec<u8>>,
    /// Line numbers in text order; a line break is written before each
    lines: Vec<u32>,
    next_line: usize,
}

impl TeiVisitor {
    fn line_break(&mut self) -> Result<(), RenderError> {
        if let Some(y) = self.lines.get(self.next_line) {
            let n = y.to_string();
            self.writer
                .write_event(Event::Empty(BytesStart::new("lb").with_attributes([("n", n.as_str())])))?;
        }
        self.next_line += 1;
        Ok(())
    }
}

impl SegmentVisitor for TeiVisitor {
    fn open_span(&mut self, fragment: &FragmentRef) -> Result<(), RenderError> {
        let anchor = fragment.anchor();
        self.writer
            .write_event(Event::Start(BytesStart::new("seg").with_attributes([("xml:id", anchor.as_str())])))?;
        Ok(())
    }

    fn close_span(&mut self, _fragment: &FragmentRef) -> Result<(), RenderError> {
        self.writer.write_event(Event::End(BytesEnd::new("seg")))?;
        Ok(())
    }

    fn segment(&mut self, segment: &Segment) -> Result<(), RenderError> {
        for (i, piece) in segment.text.split('\n').enumerate() {
            if i > 0 {
                self.line_break()?;
            }
            if !piece.is_empty() {
                self.writer.write_event(Event::Text(BytesText::new(piece)))?;
            }
        }
        Ok(())
    }
}

impl PartRenderer for XmlTextRenderer {
    fn render(
        &self,
        part: &Value,
        context: &RenderingContext,
        node: Option<&SegmentNode>,
    ) -> Result<String, RenderError> {
        let text = text_part_of(part)?;
        let node = node.ok_or_else(|| RenderError::Message("text renderer needs the segment tree".into()))?;

        let mut visitor = TeiVisitor {
            writer: Writer::new(Vec::new()),
            lines: text.lines.iter().map(|l| l.y).collect(),
            next_line: 0,
        };

        let item_id = context.item().map(|i| i.id.clone()).unwrap_or_default();
        let mut start = BytesStart::new(self.element.as_str());
        if !item_id.is_empty() {
            start.push_attribute(("n", item_id.as_str()));
        }
        visitor.writer.write_event(Event::Start(start))?;
        visitor.line_break()?;
        walk(node, &mut visitor)?;
        visitor
            .writer
            .write_event(Event::End(BytesEnd::new(self.element.as_str())))?;

        Ok(String::from_utf8(visitor.writer.into_inner())?)
    }
}

/// Renders the plain base text, ignoring spans
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl PartRenderer for PlainTextRenderer {
    fn render(
        &self,
        part: &Value,
        _context: &RenderingContext,
        node: Option<&SegmentNode>,
    ) -> Result<String, RenderError> {
        match node {
            Some(node) => Ok(node.text()),
            None => Ok(text_part_of(part)?.full_text()),
        }
    }
}
