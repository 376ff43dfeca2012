//! Segment flattener
//!
//! Merges a base text with the fragments of every layer into a sequence of
//! minimal segments, then folds those segments into a tree where each
//! fragment is a span node wrapping the segments it covers.
//!
//! ## Algorithm
//!
//! 1. Index the base text (lines joined with `\n`) into token byte ranges
//! 2. Resolve every fragment location to a byte span
//! 3. Validate nesting: sort spans by (start, -end, layer, fragment) and sweep
//!    with a stack; a span crossing the end of the enclosing one is rejected
//! 4. Cut the text at every line, token and fragment boundary
//! 5. Open and close span nodes following each segment's covering chain
//!
//! Equal spans nest in registration order: the first layer wraps outermost.

use std::collections::BTreeSet;
use std::ops::Range;

use serde::Serialize;

use crate::coords::{Coordinate, Location};
use crate::errors::{FlattenError, SpanError};
use crate::model::{LayerPart, TextPart};

/// Identifies one fragment of one layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FragmentRef {
    /// Layer index in registration order
    pub layer: usize,
    /// Fragment index inside the layer
    pub index: usize,
    pub part_id: String,
}

impl FragmentRef {
    /// Anchor shared by text and layer renderers
    pub fn anchor(&self) -> String {
        fragment_anchor(&self.part_id, self.index)
    }
}

/// XML id linking a text span to the layer fragment annotating it
pub fn fragment_anchor(part_id: &str, index: usize) -> String {
    format!("f{}-{}", index, part_id)
}

/// Minimal run of base text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// 0-based position in text order
    pub ordinal: usize,
    /// Byte range in the joined base text
    pub span: Range<usize>,
    pub text: String,
    /// 1-based line the segment starts on
    pub y: u32,
    /// Covering fragments, outermost first
    pub fragments: Vec<FragmentRef>,
}

/// Node of the segment tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum SegmentNode {
    Root { children: Vec<SegmentNode> },
    Span { fragment: FragmentRef, children: Vec<SegmentNode> },
    Leaf { segment: Segment },
}

impl SegmentNode {
    pub fn children(&self) -> &[SegmentNode] {
        match self {
            SegmentNode::Root { children } | SegmentNode::Span { children, .. } => children,
            SegmentNode::Leaf { .. } => &[],
        }
    }

    /// Concatenated text of every leaf below this node
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            SegmentNode::Leaf { segment } => out.push_str(&segment.text),
            _ => self.children().iter().for_each(|c| c.collect_text(out)),
        }
    }
}

/// Result of flattening one text with its layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentTree {
    pub segments: Vec<Segment>,
    pub root: SegmentNode,
}

impl SegmentTree {
    /// Segments covered by a fragment
    pub fn segments_of<'a>(&'a self, fragment: &'a FragmentRef) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments.iter().filter(move |s| s.fragments.contains(fragment))
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Token byte ranges of the joined base text
struct BaseText {
    text: String,
    /// (y, line byte range, token byte ranges)
    lines: Vec<(u32, Range<usize>, Vec<Range<usize>>)>,
}

impl BaseText {
    fn new(part: &TextPart) -> Self {
        let mut text = String::new();
        let mut lines = Vec::with_capacity(part.lines.len());

        for (i, line) in part.lines.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            let offset = text.len();
            text.push_str(&line.text);

            let mut tokens = Vec::new();
            let mut start: Option<usize> = None;
            for (pos, ch) in line.text.char_indices() {
                match (ch.is_whitespace(), start) {
                    (false, None) => start = Some(pos),
                    (true, Some(s)) => {
                        tokens.push(offset + s..offset + pos);
                        start = None;
                    }
                    _ => {}
                }
            }
            if let Some(s) = start {
                tokens.push(offset + s..offset + line.text.len());
            }
            lines.push((line.y, offset..offset + line.text.len(), tokens));
        }

        Self { text, lines }
    }

    fn line_of(&self, byte: usize) -> u32 {
        self.lines
            .iter()
            .rev()
            .find(|(_, range, _)| range.start <= byte)
            .map(|(y, _, _)| *y)
            .unwrap_or(1)
    }

    /// Byte range addressed by a coordinate
    fn resolve(&self, coord: &Coordinate, location: &str) -> Result<Range<usize>, SpanError> {
        let (_, _, tokens) = self
            .lines
            .iter()
            .find(|(y, _, _)| *y == coord.y)
            .ok_or_else(|| SpanError::unknown(location, format!("no line {}", coord.y)))?;

        let token = tokens.get(coord.x as usize - 1).ok_or_else(|| {
            SpanError::unknown(location, format!("line {} has no token {}", coord.y, coord.x))
        })?;

        let Some(at) = coord.at else {
            return Ok(token.clone());
        };

        // Char offsets inside the token, plus its end
        let token_text = &self.text[token.clone()];
        let mut bounds: Vec<usize> = token_text.char_indices().map(|(i, _)| token.start + i).collect();
        bounds.push(token.end);

        let first = at as usize - 1;
        let last = first
            .checked_add(coord.run_len() as usize)
            .filter(|&last| last < bounds.len())
            .ok_or_else(|| {
                SpanError::unknown(
                    location,
                    format!("token {}.{} has {} chars", coord.y, coord.x, bounds.len() - 1),
                )
            })?;
        Ok(bounds[first]..bounds[last])
    }

    fn resolve_location(&self, raw: &str) -> Result<Range<usize>, SpanError> {
        let location = Location::parse(raw)?;
        let start = self.resolve(&location.start, raw)?;
        let end = match &location.end {
            Some(end) => self.resolve(end, raw)?,
            None => start.clone(),
        };
        if end.end <= start.start {
            return Err(SpanError::malformed(raw, "range end precedes its start"));
        }
        Ok(start.start..end.end)
    }
}

/// A resolved fragment span
struct ResolvedSpan {
    fragment: FragmentRef,
    location: String,
    span: Range<usize>,
}

/// Flatten a base text and its layers into a segment tree
///
/// Layers are given in registration order. Fails with
/// `SpanError::UnknownCoordinate` for locations outside the text and with
/// `SpanError::Malformed` for unparseable locations and improper overlaps,
/// naming the layer the offending fragment belongs to.
pub fn flatten(text: &TextPart, layers: &[&LayerPart]) -> Result<SegmentTree, FlattenError> {
    let base = BaseText::new(text);

    let mut spans = Vec::new();
    for (layer_index, layer) in layers.iter().enumerate() {
        for (index, fragment) in layer.fragments.iter().enumerate() {
            spans.push(ResolvedSpan {
                fragment: FragmentRef {
                    layer: layer_index,
                    index,
                    part_id: layer.header.id.clone(),
                },
                location: fragment.location.clone(),
                span: base.resolve_location(&fragment.location).map_err(|source| FlattenError {
                    part_id: layer.header.id.clone(),
                    source,
                })?,
            });
        }
    }

    let nesting = nesting_order(&spans)?;

    let mut cuts: BTreeSet<usize> = BTreeSet::new();
    cuts.insert(0);
    cuts.insert(base.text.len());
    for (_, line, tokens) in &base.lines {
        cuts.insert(line.start);
        cuts.insert(line.end);
        for token in tokens {
            cuts.insert(token.start);
            cuts.insert(token.end);
        }
    }
    for span in &spans {
        cuts.insert(span.span.start);
        cuts.insert(span.span.end);
    }

    let cuts: Vec<usize> = cuts.into_iter().collect();
    let mut segments = Vec::new();
    for pair in cuts.windows(2) {
        let range = pair[0]..pair[1];
        if range.is_empty() {
            continue;
        }
        let fragments = nesting
            .iter()
            .map(|&i| &spans[i])
            .filter(|s| s.span.start <= range.start && range.end <= s.span.end)
            .map(|s| s.fragment.clone())
            .collect();
        segments.push(Segment {
            ordinal: segments.len(),
            y: base.line_of(range.start),
            text: base.text[range.clone()].to_string(),
            span: range,
            fragments,
        });
    }

    let root = build_tree(&segments);
    Ok(SegmentTree { segments, root })
}

/// Indices of `spans` sorted outermost first, after checking proper nesting
fn nesting_order(spans: &[ResolvedSpan]) -> Result<Vec<usize>, FlattenError> {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&spans[a], &spans[b]);
        a.span
            .start
            .cmp(&b.span.start)
            .then_with(|| b.span.end.cmp(&a.span.end))
            .then_with(|| a.fragment.layer.cmp(&b.fragment.layer))
            .then_with(|| a.fragment.index.cmp(&b.fragment.index))
    });

    let mut open: Vec<usize> = Vec::new();
    for &i in &order {
        let current = &spans[i];
        while let Some(&top) = open.last() {
            if spans[top].span.end <= current.span.start {
                open.pop();
            } else {
                break;
            }
        }
        if let Some(&top) = open.last() {
            let enclosing = &spans[top];
            if current.span.end > enclosing.span.end {
                return Err(FlattenError {
                    part_id: current.fragment.part_id.clone(),
                    source: SpanError::malformed(
                        current.location.clone(),
                        format!(
                            "partially overlaps `{}` (layer {}, fragment {})",
                            enclosing.location, enclosing.fragment.part_id, enclosing.fragment.index
                        ),
                    ),
                });
            }
        }
        open.push(i);
    }

    Ok(order)
}

/// Fold segments into span nodes following their covering chains
fn build_tree(segments: &[Segment]) -> SegmentNode {
    // Stack of open nodes: (fragment, children); the root has no fragment
    let mut stack: Vec<(Option<FragmentRef>, Vec<SegmentNode>)> = vec![(None, Vec::new())];

    for segment in segments {
        // Keep the longest prefix of open spans still covering this segment
        let mut keep = 0;
        while keep + 1 < stack.len()
            && segment.fragments.get(keep) == stack[keep + 1].0.as_ref()
        {
            keep += 1;
        }
        while stack.len() > keep + 1 {
            close_top(&mut stack);
        }
        for fragment in &segment.fragments[keep..] {
            stack.push((Some(fragment.clone()), Vec::new()));
        }
        if let Some((_, children)) = stack.last_mut() {
            children.push(SegmentNode::Leaf { segment: segment.clone() });
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    let children = stack.pop().map(|(_, children)| children).unwrap_or_default();
    SegmentNode::Root { children }
}

fn close_top(stack: &mut Vec<(Option<FragmentRef>, Vec<SegmentNode>)>) {
    if let Some((Some(fragment), children)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.push(SegmentNode::Span { fragment, children });
        }
    }
}
