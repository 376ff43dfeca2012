//! Layer renderers (standoff)
//!
//! Layer output never repeats the base text: each fragment is written as an
//! element pointing at the `<seg>` anchor the text renderer emitted for it.

use log::warn;
use quick_xml::events::BytesText;
use quick_xml::Writer;
use serde_json::Value;

use crate::context::RenderingContext;
use crate::errors::RenderError;
use crate::flatten::{fragment_anchor, SegmentNode};
use crate::model::{ApparatusEntry, ApparatusEntryType, FragmentKind, LayerPart, Part};
use crate::registry::PartRenderer;

/// Decode the part JSON back into a layer part
pub(crate) fn layer_part_of(part: &Value) -> Result<LayerPart, RenderError> {
    match serde_json::from_value::<Part>(part.clone())? {
        Part::Layer(layer) => Ok(layer),
        other => Err(RenderError::Json(format!("part {} is not a layer part", other.id()))),
    }
}

fn witness_list(entry: &ApparatusEntry) -> String {
    entry
        .witnesses
        .iter()
        .map(|w| format!("#{}", w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders apparatus fragments as `<app>` entries
///
/// Accepted entries become `<lem>`, note entries `<note>`, anything else a
/// typed `<rdg>`. Entry notes follow their reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApparatusRenderer;

impl ApparatusRenderer {
    fn write_entry(writer: &mut Writer<Vec<u8>>, entry: &ApparatusEntry) -> quick_xml::Result<()> {
        let witnesses = witness_list(entry);

        if entry.entry_type == ApparatusEntryType::Note {
            writer
                .create_element("note")
                .write_text_content(BytesText::new(&entry.value))?;
        } else {
            let name = if entry.is_accepted { "lem" } else { "rdg" };
            let mut element = writer.create_element(name);
            if !entry.is_accepted {
                element = element.with_attribute(("type", entry.entry_type.tei_name()));
            }
            if !witnesses.is_empty() {
                element = element.with_attribute(("wit", witnesses.as_str()));
            }
            if entry.value.is_empty() {
                element.write_empty()?;
            } else {
                element.write_text_content(BytesText::new(&entry.value))?;
            }
        }

        if let Some(note) = &entry.note {
            writer
                .create_element("note")
                .write_text_content(BytesText::new(note))?;
        }
        Ok(())
    }
}

impl PartRenderer for ApparatusRenderer {
    fn render(
        &self,
        part: &Value,
        _context: &RenderingContext,
        _node: Option<&SegmentNode>,
    ) -> Result<String, RenderError> {
        let layer = layer_part_of(part)?;
        let mut writer = Writer::new(Vec::new());

        for (index, fragment) in layer.fragments.iter().enumerate() {
            let FragmentKind::Apparatus(apparatus) = &fragment.kind else {
                warn!("layer {}: fragment {} is not an apparatus entry", layer.header.id, index);
                continue;
            };
            let from = format!("#{}", fragment_anchor(&layer.header.id, index));
            writer
                .create_element("app")
                .with_attribute(("from", from.as_str()))
                .write_inner_content(|w| {
                    apparatus
                        .entries
                        .iter()
                        .try_for_each(|entry| Self::write_entry(w, entry))
                })?;
        }

        Ok(String::from_utf8(writer.into_inner())?)
    }
}

/// Renders comment fragments as `<note target>`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentRenderer;

impl PartRenderer for CommentRenderer {
    fn render(
        &self,
        part: &Value,
        _context: &RenderingContext,
        _node: Option<&SegmentNode>,
    ) -> Result<String, RenderError> {
        let layer = layer_part_of(part)?;
        let mut writer = Writer::new(Vec::new());

        for (index, fragment) in layer.fragments.iter().enumerate() {
            let FragmentKind::Comment(comment) = &fragment.kind else {
                warn!("layer {}: fragment {} is not a comment", layer.header.id, index);
                continue;
            };
            let target = format!("#{}", fragment_anchor(&layer.header.id, index));
            let mut element = writer
                .create_element("note")
                .with_attribute(("target", target.as_str()));
            if let Some(tag) = &comment.tag {
                element = element.with_attribute(("type", tag.as_str()));
            }
            element.write_text_content(BytesText::new(&comment.text))?;
        }

        Ok(String::from_utf8(writer.into_inner())?)
    }
}
