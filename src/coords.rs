//! Text locations over a tokenized base text
//!
//! A location addresses one token (`2.3`), a char run inside a token
//! (`2.3@2x3`), or a range between two such points (`1.1-2.4`).
//! Line (`y`) and token (`x`) ordinals are 1-based, and so is the char
//! offset `at`. The run defaults to one char.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::SpanError;

lazy_static! {
    static ref POINT_RE: Regex =
        Regex::new(r"^(\d+)\.(\d+)(?:@(\d+)(?:x(\d+))?)?$").expect("valid point regex");
}

/// One end of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub y: u32,
    pub x: u32,
    /// 1-based char offset in the token; `None` addresses the whole token
    pub at: Option<u32>,
    /// Char count starting at `at`
    pub run: Option<u32>,
}

impl Coordinate {
    pub fn token(y: u32, x: u32) -> Self {
        Self { y, x, at: None, run: None }
    }

    pub fn chars(y: u32, x: u32, at: u32, run: u32) -> Self {
        Self { y, x, at: Some(at), run: Some(run) }
    }

    /// Effective run length; only meaningful when `at` is set
    pub fn run_len(&self) -> u32 {
        self.run.unwrap_or(1)
    }

    /// First addressed position as an ordered key
    fn lower_key(&self) -> (u32, u32, u32) {
        (self.y, self.x, self.at.unwrap_or(0))
    }

    /// Last addressed position as an ordered key (inclusive)
    fn upper_key(&self) -> (u32, u32, u32) {
        match self.at {
            Some(at) => (self.y, self.x, at.saturating_add(self.run_len().saturating_sub(1))),
            None => (self.y, self.x, u32::MAX),
        }
    }

    fn parse(text: &str, whole: &str) -> Result<Self, SpanError> {
        let caps = POINT_RE
            .captures(text.trim())
            .ok_or_else(|| SpanError::malformed(whole, format!("`{}` is not a Y.X[@AT[xRUN]] point", text)))?;

        let number = |i: usize| -> Result<Option<u32>, SpanError> {
            caps.get(i)
                .map(|m| {
                    m.as_str()
                        .parse::<u32>()
                        .map_err(|e| SpanError::malformed(whole, e.to_string()))
                })
                .transpose()
        };

        let y = number(1)?.unwrap_or_default();
        let x = number(2)?.unwrap_or_default();
        let at = number(3)?;
        let run = number(4)?;

        if y == 0 || x == 0 || at == Some(0) || run == Some(0) {
            return Err(SpanError::malformed(whole, "ordinals are 1-based"));
        }
        if let Some(at) = at {
            if at.checked_add(run.unwrap_or(1) - 1).is_none() {
                return Err(SpanError::malformed(whole, "char run is out of range"));
            }
        }

        Ok(Self { y, x, at, run })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.y, self.x)?;
        if let Some(at) = self.at {
            write!(f, "@{}", at)?;
            if let Some(run) = self.run {
                if run != 1 {
                    write!(f, "x{}", run)?;
                }
            }
        }
        Ok(())
    }
}

/// How two spans relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanRelation {
    Equal,
    /// The first span strictly contains the second
    Contains,
    /// The first span lies strictly inside the second
    Within,
    Disjoint,
    /// Spans share some positions but neither nests the other
    PartialOverlap,
}

impl SpanRelation {
    /// Classify two closed intervals `[a.0, a.1]` and `[b.0, b.1]`
    pub fn between<K: Ord>(a: (K, K), b: (K, K)) -> Self {
        if a.1 < b.0 || b.1 < a.0 {
            return SpanRelation::Disjoint;
        }
        match (a.0.cmp(&b.0), a.1.cmp(&b.1)) {
            (Ordering::Equal, Ordering::Equal) => SpanRelation::Equal,
            (Ordering::Less | Ordering::Equal, Ordering::Greater | Ordering::Equal) => {
                SpanRelation::Contains
            }
            (Ordering::Greater | Ordering::Equal, Ordering::Less | Ordering::Equal) => {
                SpanRelation::Within
            }
            _ => SpanRelation::PartialOverlap,
        }
    }

    /// True when the relation can be represented as a tree
    pub fn is_nested(&self) -> bool {
        !matches!(self, SpanRelation::PartialOverlap)
    }
}

/// A parsed layer location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub start: Coordinate,
    /// Range end; `None` for a single-point location
    pub end: Option<Coordinate>,
}

impl Location {
    pub fn point(start: Coordinate) -> Self {
        Self { start, end: None }
    }

    pub fn range(start: Coordinate, end: Coordinate) -> Self {
        Self { start, end: Some(end) }
    }

    /// Parse `Y.X[@AT[xRUN]]` optionally followed by `-Y.X[@AT[xRUN]]`
    pub fn parse(text: &str) -> Result<Self, SpanError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SpanError::malformed(text, "empty location"));
        }

        let location = match trimmed.split_once('-') {
            Some((a, b)) => Location::range(Coordinate::parse(a, text)?, Coordinate::parse(b, text)?),
            None => Location::point(Coordinate::parse(trimmed, text)?),
        };

        if location.upper_key() < location.lower_key() {
            return Err(SpanError::malformed(text, "range end precedes its start"));
        }
        Ok(location)
    }

    pub fn is_range(&self) -> bool {
        self.end.is_some()
    }

    /// Last coordinate of the location
    pub fn last(&self) -> &Coordinate {
        self.end.as_ref().unwrap_or(&self.start)
    }

    fn lower_key(&self) -> (u32, u32, u32) {
        self.start.lower_key()
    }

    fn upper_key(&self) -> (u32, u32, u32) {
        self.last().upper_key()
    }

    /// Relation of this location to another one, without resolving the text
    pub fn relation(&self, other: &Location) -> SpanRelation {
        SpanRelation::between(
            (self.lower_key(), self.upper_key()),
            (other.lower_key(), other.upper_key()),
        )
    }

    /// True when `other` lies inside (or equals) this location
    pub fn contains(&self, other: &Location) -> bool {
        matches!(self.relation(other), SpanRelation::Equal | SpanRelation::Contains)
    }

    pub fn overlaps(&self, other: &Location) -> bool {
        self.relation(other) != SpanRelation::Disjoint
    }
}

impl FromStr for Location {
    type Err = SpanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::parse(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        if let Some(end) = &self.end {
            write!(f, "-{}", end)?;
        }
        Ok(())
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    /// Document order: earlier start first, then the wider span first
    fn cmp(&self, other: &Self) -> Ordering {
        self.lower_key()
            .cmp(&other.lower_key())
            .then_with(|| other.upper_key().cmp(&self.upper_key()))
            .then_with(|| self.start.cmp(&other.start))
            .then_with(|| self.end.cmp(&other.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_point() {
        let loc = Location::parse("2.3").unwrap();
        assert_eq!(loc.start, Coordinate::token(2, 3));
        assert!(!loc.is_range());
        assert_eq!(loc.to_string(), "2.3");
    }

    #[test]
    fn test_parse_char_range() {
        let loc = Location::parse("1.2@3x2-1.4").unwrap();
        assert_eq!(loc.start, Coordinate::chars(1, 2, 3, 2));
        assert_eq!(loc.end, Some(Coordinate::token(1, 4)));
        assert_eq!(loc.to_string(), "1.2@3x2-1.4");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "1", "a.b", "1.2@", "0.1", "1.0", "1.1@0", "1.2-1.1", "1.1--1.2", "1.1@4294967295x2", "1.1@99999999999"] {
            assert!(
                matches!(Location::parse(bad), Err(SpanError::Malformed { .. })),
                "`{}` should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_relations() {
        let outer = Location::parse("1.1-1.5").unwrap();
        let inner = Location::parse("1.2-1.3").unwrap();
        let crossing = Location::parse("1.4-2.1").unwrap();
        let after = Location::parse("2.2").unwrap();

        assert_eq!(outer.relation(&inner), SpanRelation::Contains);
        assert_eq!(inner.relation(&outer), SpanRelation::Within);
        assert_eq!(outer.relation(&crossing), SpanRelation::PartialOverlap);
        assert_eq!(outer.relation(&after), SpanRelation::Disjoint);
        assert_eq!(outer.relation(&outer.clone()), SpanRelation::Equal);
    }

    #[test]
    fn test_char_run_nests_in_token() {
        let token = Location::parse("3.2").unwrap();
        let chars = Location::parse("3.2@2x2").unwrap();
        assert!(token.contains(&chars));
        assert!(!chars.contains(&token));
        assert_eq!(
            Location::parse("3.2@1x2").unwrap().relation(&Location::parse("3.2@2x2").unwrap()),
            SpanRelation::PartialOverlap
        );
    }

    #[test]
    fn test_document_order() {
        let mut locs: Vec<Location> = ["1.3", "1.1", "1.1-1.4", "1.2@2"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        locs.sort();
        let sorted: Vec<String> = locs.iter().map(|l| l.to_string()).collect();
        assert_eq!(sorted, vec!["1.1-1.4", "1.1", "1.2@2", "1.3"]);
    }
}
