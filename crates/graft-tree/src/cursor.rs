//! Cursors: immutable paths into a document tree
//!
//! A [`Cursor`] is an ordered list of [`Segment`]s, each naming either a
//! mapping key or a sequence index. Cursors are plain values: they compare,
//! hash and order structurally and never hold a reference to a tree.
//!
//! # Path Syntax
//!
//! - Dot-separated keys: `meta.database.host`
//! - Optional root marker: `$.meta.database.host`
//! - Numeric segments index sequences: `jobs.0.name`
//! - Bracket indexing: `jobs[0].name`
//!
//! # Examples
//!
//! ```
//! use graft_tree::{Cursor, Segment};
//!
//! let cursor = Cursor::parse("$.jobs[0].name").unwrap();
//! assert_eq!(cursor.segments(), &[
//!     Segment::Key("jobs".to_string()),
//!     Segment::Index(0),
//!     Segment::Key("name".to_string()),
//! ]);
//! assert_eq!(cursor.to_string(), "jobs.0.name");
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::value::Tree;

/// Field used to address sequence entries by name (`jobs.web` selects the
/// element of `jobs` whose `name` is `web`).
pub const NAME_FIELD: &str = "name";

/// A single step of a [`Cursor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A key in a mapping, or the `name` of an entry in a sequence
    Key(String),
    /// A position in a sequence, or a numeric key in a mapping
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// An immutable location inside a [`Tree`].
///
/// The root cursor has no segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cursor {
    segments: Vec<Segment>,
}

impl Cursor {
    /// The cursor addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a cursor from pre-split segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a dotted path into a cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for an unclosed or non-numeric bracket
    /// index.
    pub fn parse(text: &str) -> Result<Self> {
        let body = text
            .strip_prefix("$.")
            .or_else(|| text.strip_prefix('$'))
            .unwrap_or(text);

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = body.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !current.is_empty() {
                        segments.push(classify(std::mem::take(&mut current)));
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(classify(std::mem::take(&mut current)));
                    }
                    let mut index = String::new();
                    let mut closed = false;
                    for ch in chars.by_ref() {
                        if ch == ']' {
                            closed = true;
                            break;
                        }
                        index.push(ch);
                    }
                    if !closed {
                        return Err(Error::invalid_path(text, "unclosed '['"));
                    }
                    let idx = index.trim().parse::<usize>().map_err(|_| {
                        Error::invalid_path(text, format!("'{index}' is not a list index"))
                    })?;
                    segments.push(Segment::Index(idx));
                }
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            segments.push(classify(current));
        }

        Ok(Self { segments })
    }

    /// The segments making up this cursor.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, or `None` for the root.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The cursor one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Cursor> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// Extend this cursor with a mapping key.
    pub fn child_key(&self, key: impl Into<String>) -> Cursor {
        self.child(Segment::Key(key.into()))
    }

    /// Extend this cursor with a sequence index.
    pub fn child_index(&self, idx: usize) -> Cursor {
        self.child(Segment::Index(idx))
    }

    fn child(&self, segment: Segment) -> Cursor {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// `true` if `other` is a prefix of (or equal to) this cursor.
    ///
    /// ```
    /// use graft_tree::Cursor;
    ///
    /// let inner = Cursor::parse("meta.db.host").unwrap();
    /// assert!(inner.is_under(&Cursor::parse("meta").unwrap()));
    /// assert!(inner.is_under(&inner));
    /// assert!(!inner.is_under(&Cursor::parse("meta.web").unwrap()));
    /// ```
    pub fn is_under(&self, other: &Cursor) -> bool {
        other.segments.len() <= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// Descend `tree` along this cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] naming the prefix up to and including the
    /// first segment that could not be followed.
    pub fn resolve<'t>(&self, tree: &'t Tree) -> Result<&'t Tree> {
        let mut node = tree;
        for (i, segment) in self.segments.iter().enumerate() {
            node = step(node, segment).ok_or_else(|| self.not_found_at(i))?;
        }
        Ok(node)
    }

    /// Rewrite named sequence lookups into positional indices against `tree`.
    ///
    /// Call sites are discovered with positional cursors, while references
    /// written by users may address list entries by name; the canonical form
    /// lets the two be compared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cursor does not resolve.
    pub fn canonical(&self, tree: &Tree) -> Result<Cursor> {
        let (prefix, rest) = self.canonical_prefix(tree);
        if rest.is_empty() {
            Ok(prefix)
        } else {
            Err(self.not_found_at(prefix.len()))
        }
    }

    /// Canonical form of the longest prefix that resolves in `tree`, plus the
    /// segments that could not be followed.
    ///
    /// ```
    /// use graft_tree::{Cursor, Segment, Tree};
    ///
    /// let doc = Tree::from(serde_json::json!({"jobs": ["(( grab web ))"]}));
    /// let cursor = Cursor::parse("jobs.web.port").unwrap();
    /// let (prefix, rest) = cursor.canonical_prefix(&doc);
    /// assert_eq!(prefix.to_string(), "jobs");
    /// assert_eq!(rest, &[Segment::Key("web".into()), Segment::Key("port".into())]);
    /// ```
    pub fn canonical_prefix(&self, tree: &Tree) -> (Cursor, &[Segment]) {
        let mut node = tree;
        let mut segments = Vec::with_capacity(self.segments.len());
        for (i, segment) in self.segments.iter().enumerate() {
            let found = match (node, segment) {
                (Tree::Sequence(items), Segment::Key(name)) => {
                    named_position(items, name).map(|idx| (&items[idx], Segment::Index(idx)))
                }
                (Tree::Mapping(_), Segment::Index(idx)) => {
                    step(node, segment).map(|next| (next, Segment::Key(idx.to_string())))
                }
                _ => step(node, segment).map(|next| (next, segment.clone())),
            };
            match found {
                Some((next, canonical)) => {
                    node = next;
                    segments.push(canonical);
                }
                None => return (Self { segments }, &self.segments[i..]),
            }
        }
        (Self { segments }, &[])
    }

    fn not_found_at(&self, i: usize) -> Error {
        Error::NotFound {
            path: Self {
                segments: self.segments[..=i].to_vec(),
            },
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn classify(text: String) -> Segment {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(idx) = text.parse::<usize>() {
            return Segment::Index(idx);
        }
    }
    Segment::Key(text)
}

/// Follow one segment down from `node`.
pub(crate) fn step<'t>(node: &'t Tree, segment: &Segment) -> Option<&'t Tree> {
    match (node, segment) {
        (Tree::Mapping(map), Segment::Key(key)) => map.get(key),
        (Tree::Mapping(map), Segment::Index(idx)) => map.get(&idx.to_string()),
        (Tree::Sequence(items), Segment::Index(idx)) => items.get(*idx),
        (Tree::Sequence(items), Segment::Key(name)) => {
            named_position(items, name).and_then(|idx| items.get(idx))
        }
        _ => None,
    }
}

/// Mutable counterpart of [`step`].
pub(crate) fn step_mut<'t>(node: &'t mut Tree, segment: &Segment) -> Option<&'t mut Tree> {
    match (node, segment) {
        (Tree::Mapping(map), Segment::Key(key)) => map.get_mut(key),
        (Tree::Mapping(map), Segment::Index(idx)) => map.get_mut(&idx.to_string()),
        (Tree::Sequence(items), Segment::Index(idx)) => items.get_mut(*idx),
        (Tree::Sequence(items), Segment::Key(name)) => {
            let idx = named_position(items, name)?;
            items.get_mut(idx)
        }
        _ => None,
    }
}

pub(crate) fn named_position(items: &[Tree], name: &str) -> Option<usize> {
    items.iter().position(|item| {
        item.as_mapping()
            .and_then(|m| m.get(NAME_FIELD))
            .and_then(Tree::as_str)
            == Some(name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> Tree {
        Tree::from(value)
    }

    #[test]
    fn test_parse_simple() {
        let cursor = Cursor::parse("name").unwrap();
        assert_eq!(cursor.segments(), &[Segment::Key("name".to_string())]);
    }

    #[test]
    fn test_parse_rooted_and_dotted() {
        let rooted = Cursor::parse("$.meta.key").unwrap();
        let bare = Cursor::parse("meta.key").unwrap();
        assert_eq!(rooted, bare);
        assert_eq!(rooted.len(), 2);
    }

    #[test]
    fn test_parse_numeric_segments() {
        let dotted = Cursor::parse("jobs.1.name").unwrap();
        let bracket = Cursor::parse("jobs[1].name").unwrap();
        assert_eq!(dotted, bracket);
        assert_eq!(dotted.segments()[1], Segment::Index(1));
    }

    #[test]
    fn test_parse_root() {
        assert!(Cursor::parse("$").unwrap().is_root());
        assert!(Cursor::parse("$.").unwrap().is_root());
        assert!(Cursor::parse("").unwrap().is_root());
    }

    #[test]
    fn test_parse_bad_bracket() {
        assert!(Cursor::parse("jobs[0").is_err());
        assert!(Cursor::parse("jobs[x]").is_err());
    }

    #[test]
    fn test_resolve_nested() {
        let doc = tree(json!({"meta": {"db": {"host": "localhost"}}}));
        let cursor = Cursor::parse("meta.db.host").unwrap();
        assert_eq!(cursor.resolve(&doc).unwrap().as_str(), Some("localhost"));
    }

    #[test]
    fn test_resolve_missing_names_prefix() {
        let doc = tree(json!({"meta": {}}));
        let err = Cursor::parse("meta.key.deeper")
            .unwrap()
            .resolve(&doc)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "`$.meta.key` could not be found in the YAML datastructure"
        );
    }

    #[test]
    fn test_resolve_through_scalar_fails() {
        let doc = tree(json!({"meta": "flat"}));
        let err = Cursor::parse("meta.key").unwrap().resolve(&doc).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref path } if path.to_string() == "meta.key"));
    }

    #[test]
    fn test_resolve_named_entry() {
        let doc = tree(json!({"jobs": [{"name": "api", "port": 1}, {"name": "web", "port": 2}]}));
        let cursor = Cursor::parse("jobs.web.port").unwrap();
        assert_eq!(cursor.resolve(&doc).unwrap(), &Tree::from(json!(2)));
        assert_eq!(cursor.canonical(&doc).unwrap().to_string(), "jobs.1.port");
    }

    #[test]
    fn test_canonical_prefix_stops_at_missing_entry() {
        let doc = tree(json!({"jobs": [{"name": "api"}, "(( grab web ))"]}));
        let cursor = Cursor::parse("jobs.web.port").unwrap();

        let (prefix, rest) = cursor.canonical_prefix(&doc);
        assert_eq!(prefix.to_string(), "jobs");
        assert_eq!(rest.len(), 2);

        let err = cursor.canonical(&doc).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref path } if path.to_string() == "jobs.web"));
    }

    #[test]
    fn test_resolve_numeric_mapping_key() {
        let doc = tree(json!({"ports": {"80": "http"}}));
        let cursor = Cursor::parse("ports.80").unwrap();
        assert_eq!(cursor.resolve(&doc).unwrap().as_str(), Some("http"));
    }

    #[test]
    fn test_is_under() {
        let a = Cursor::parse("a.b.c").unwrap();
        assert!(a.is_under(&Cursor::parse("a").unwrap()));
        assert!(a.is_under(&Cursor::parse("a.b.c").unwrap()));
        assert!(a.is_under(&Cursor::root()));
        assert!(!a.is_under(&Cursor::parse("a.b.c.d").unwrap()));
        assert!(!a.is_under(&Cursor::parse("a.x").unwrap()));
    }

    #[test]
    fn test_parent_and_children() {
        let cursor = Cursor::parse("a.b").unwrap();
        assert_eq!(cursor.parent().unwrap(), Cursor::parse("a").unwrap());
        assert_eq!(Cursor::root().child_key("a").child_index(3).to_string(), "a.3");
        assert!(Cursor::root().parent().is_none());
    }
}
