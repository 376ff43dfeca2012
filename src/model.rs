//! Item and part records consumed by the composer
//!
//! Items are built by the record source and are read-only here. Parts are a
//! closed tagged enum: base text, annotation layers, and an open-ended
//! variant for kinds that only contribute template data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One exported record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Schema tag describing which parts the item may have
    pub facet_id: String,
    /// Items sharing this value go into one output document
    pub group_id: Option<String>,
    pub sort_key: String,
    pub flags: u32,
    pub creator_id: String,
    pub user_id: String,
    pub parts: Vec<Part>,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// First base text part, if any
    pub fn text_part(&self) -> Option<&TextPart> {
        self.parts.iter().find_map(|p| match p {
            Part::Text(text) => Some(text),
            _ => None,
        })
    }

    /// Layer parts in registration (document) order
    pub fn layer_parts(&self) -> impl Iterator<Item = &LayerPart> {
        self.parts.iter().filter_map(|p| match p {
            Part::Layer(layer) => Some(layer),
            _ => None,
        })
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }
}

/// Fields shared by every part kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartHeader {
    pub id: String,
    pub item_id: String,
    pub type_id: String,
    /// Disambiguates several parts of the same type
    pub role_id: Option<String>,
    pub creator_id: String,
    pub user_id: String,
}

impl PartHeader {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.role_id = Some(role_id.into());
        self
    }
}

/// Polymorphic part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Part {
    Text(TextPart),
    Layer(LayerPart),
    /// Any other part kind; rendered into template data only
    Other(GenericPart),
}

impl Part {
    pub fn header(&self) -> &PartHeader {
        match self {
            Part::Text(p) => &p.header,
            Part::Layer(p) => &p.header,
            Part::Other(p) => &p.header,
        }
    }

    pub fn id(&self) -> &str {
        &self.header().id
    }

    /// Structured form handed to renderers
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Text and layer parts take part in flattening and get their own flow
    pub fn is_flattened(&self) -> bool {
        matches!(self, Part::Text(_) | Part::Layer(_))
    }
}

/// One line of base text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLine {
    /// 1-based line ordinal
    pub y: u32,
    pub text: String,
}

/// Base text annotated by layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPart {
    #[serde(flatten)]
    pub header: PartHeader,
    pub lines: Vec<TextLine>,
}

impl TextPart {
    pub fn new(header: PartHeader) -> Self {
        Self { header, lines: Vec::new() }
    }

    /// Build from raw text, numbering lines from 1
    pub fn from_text(header: PartHeader, text: &str) -> Self {
        let lines = text
            .split('\n')
            .enumerate()
            .map(|(i, line)| TextLine { y: i as u32 + 1, text: line.to_string() })
            .collect();
        Self { header, lines }
    }

    /// Lines joined with newlines
    pub fn full_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Annotation layer over the base text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPart {
    #[serde(flatten)]
    pub header: PartHeader,
    pub fragments: Vec<Fragment>,
}

impl LayerPart {
    pub fn new(header: PartHeader) -> Self {
        Self { header, fragments: Vec::new() }
    }

    pub fn with_fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.push(fragment);
        self
    }
}

/// One annotation unit anchored at a location string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub location: String,
    #[serde(flatten)]
    pub kind: FragmentKind,
}

impl Fragment {
    pub fn comment(location: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind: FragmentKind::Comment(CommentFragment { text: text.into(), tag: None }),
        }
    }

    pub fn apparatus(location: impl Into<String>, entries: Vec<ApparatusEntry>) -> Self {
        Self {
            location: location.into(),
            kind: FragmentKind::Apparatus(ApparatusFragment { entries }),
        }
    }
}

/// Payload specific to a fragment kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fragmentType", rename_all = "camelCase")]
pub enum FragmentKind {
    Apparatus(ApparatusFragment),
    Comment(CommentFragment),
    Other { data: Value },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApparatusFragment {
    pub entries: Vec<ApparatusEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApparatusEntryType {
    /// Variant replacing the lemma
    Replacement,
    AdditionBefore,
    AdditionAfter,
    /// Empty value: the lemma is omitted by the witnesses
    Deletion,
    Note,
}

impl ApparatusEntryType {
    /// TEI `type` attribute value for a reading
    pub fn tei_name(&self) -> &'static str {
        match self {
            ApparatusEntryType::Replacement => "replacement",
            ApparatusEntryType::AdditionBefore => "addition-before",
            ApparatusEntryType::AdditionAfter => "addition-after",
            ApparatusEntryType::Deletion => "deletion",
            ApparatusEntryType::Note => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApparatusEntry {
    #[serde(rename = "type")]
    pub entry_type: ApparatusEntryType,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm_value: Option<String>,
    #[serde(default)]
    pub is_accepted: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub witnesses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ApparatusEntry {
    pub fn new(entry_type: ApparatusEntryType, value: impl Into<String>) -> Self {
        Self {
            entry_type,
            value: value.into(),
            norm_value: None,
            is_accepted: false,
            witnesses: Vec::new(),
            note: None,
        }
    }

    pub fn accepted(mut self) -> Self {
        self.is_accepted = true;
        self
    }

    pub fn with_witnesses(mut self, witnesses: &[&str]) -> Self {
        self.witnesses = witnesses.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentFragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Part of a kind the composer does not know structurally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericPart {
    #[serde(flatten)]
    pub header: PartHeader,
    #[serde(default)]
    pub data: Value,
}

impl GenericPart {
    pub fn new(header: PartHeader, data: Value) -> Self {
        Self { header, data }
    }
}
