//! The document tree
//!
//! [`Tree`] is the strictly-typed form every document takes once it has been
//! ingested. Mapping keys are always strings: non-string keys found in YAML
//! input are rendered to text once, at conversion time.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Number;

use crate::cursor::{named_position, step_mut, Cursor, Segment};
use crate::error::{Error, Result};

/// An ordered mapping with unique string keys.
pub type Mapping = IndexMap<String, Tree>;

/// A document value: a scalar, an ordered sequence, or a string-keyed mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Tree {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Tree>),
    Mapping(Mapping),
}

impl Tree {
    /// An empty mapping.
    pub fn mapping() -> Self {
        Tree::Mapping(Mapping::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Tree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Tree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Tree]> {
        match self {
            Tree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Tree::Sequence(_) | Tree::Mapping(_))
    }

    /// The text form of a scalar, or `None` for collections.
    ///
    /// ```
    /// use graft_tree::Tree;
    ///
    /// assert_eq!(Tree::from(42).scalar_text().as_deref(), Some("42"));
    /// assert_eq!(Tree::Null.scalar_text().as_deref(), Some("null"));
    /// assert_eq!(Tree::Sequence(vec![]).scalar_text(), None);
    /// ```
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Tree::Null => Some("null".to_string()),
            Tree::Bool(b) => Some(b.to_string()),
            Tree::Number(n) => Some(n.to_string()),
            Tree::String(s) => Some(s.clone()),
            Tree::Sequence(_) | Tree::Mapping(_) => None,
        }
    }

    /// A short description of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "boolean",
            Tree::Number(_) => "number",
            Tree::String(_) => "string",
            Tree::Sequence(_) => "list",
            Tree::Mapping(_) => "map",
        }
    }

    /// Look up the value at `cursor`.
    pub fn get(&self, cursor: &Cursor) -> Option<&Tree> {
        cursor.resolve(self).ok()
    }

    /// Look up the value at `cursor` for in-place modification.
    pub fn get_mut(&mut self, cursor: &Cursor) -> Option<&mut Tree> {
        let mut node = self;
        for segment in cursor.segments() {
            node = step_mut(node, segment)?;
        }
        Some(node)
    }

    /// Overwrite the value at `cursor`.
    ///
    /// Missing mapping keys in the final position are created; every
    /// intermediate location must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the parent location does not exist or
    /// cannot hold the final segment.
    pub fn set(&mut self, cursor: &Cursor, value: Tree) -> Result<()> {
        let Some((last, _)) = cursor.segments().split_last() else {
            *self = value;
            return Ok(());
        };
        let parent = cursor.parent().unwrap_or_default();
        let missing = || Error::NotFound {
            path: cursor.clone(),
        };
        let node = self.get_mut(&parent).ok_or_else(missing)?;

        match (node, last) {
            (Tree::Mapping(map), Segment::Key(key)) => {
                map.insert(key.clone(), value);
            }
            (Tree::Mapping(map), Segment::Index(idx)) => {
                map.insert(idx.to_string(), value);
            }
            (Tree::Sequence(items), Segment::Index(idx)) => {
                let slot = items.get_mut(*idx).ok_or_else(missing)?;
                *slot = value;
            }
            (Tree::Sequence(items), Segment::Key(name)) => {
                let idx = named_position(items, name).ok_or_else(missing)?;
                items[idx] = value;
            }
            _ => return Err(missing()),
        }
        Ok(())
    }

    /// Remove and return the value at `cursor`.
    ///
    /// Mapping entries are removed preserving the order of the remaining keys.
    pub fn remove(&mut self, cursor: &Cursor) -> Option<Tree> {
        let (last, _) = cursor.segments().split_last()?;
        let parent = cursor.parent()?;
        match self.get_mut(&parent)? {
            Tree::Mapping(map) => match last {
                Segment::Key(key) => map.shift_remove(key),
                Segment::Index(idx) => map.shift_remove(&idx.to_string()),
            },
            Tree::Sequence(items) => {
                let idx = match last {
                    Segment::Index(idx) => *idx,
                    Segment::Key(name) => named_position(items, name)?,
                };
                (idx < items.len()).then(|| items.remove(idx))
            }
            _ => None,
        }
    }

    /// Convert into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Tree::Null => serde_json::Value::Null,
            Tree::Bool(b) => serde_json::Value::Bool(*b),
            Tree::Number(n) => serde_json::Value::Number(n.clone()),
            Tree::String(s) => serde_json::Value::String(s.clone()),
            Tree::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Tree::to_json).collect())
            }
            Tree::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Number(n) => n.serialize(serializer),
            Tree::String(s) => serializer.serialize_str(s),
            Tree::Sequence(items) => serializer.collect_seq(items),
            Tree::Mapping(map) => serializer.collect_map(map),
        }
    }
}

impl From<serde_json::Value> for Tree {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Tree::Null,
            serde_json::Value::Bool(b) => Tree::Bool(b),
            serde_json::Value::Number(n) => Tree::Number(n),
            serde_json::Value::String(s) => Tree::String(s),
            serde_json::Value::Array(items) => {
                Tree::Sequence(items.into_iter().map(Tree::from).collect())
            }
            serde_json::Value::Object(map) => {
                Tree::Mapping(map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect())
            }
        }
    }
}

impl From<serde_yaml::Value> for Tree {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Tree::Null,
            serde_yaml::Value::Bool(b) => Tree::Bool(b),
            serde_yaml::Value::Number(n) => match yaml_number(&n) {
                Some(number) => Tree::Number(number),
                // .inf, -.inf and .nan have no JSON number form
                None => Tree::String(n.to_string()),
            },
            serde_yaml::Value::String(s) => Tree::String(s),
            serde_yaml::Value::Sequence(items) => {
                Tree::Sequence(items.into_iter().map(Tree::from).collect())
            }
            serde_yaml::Value::Mapping(map) => Tree::Mapping(
                map.into_iter()
                    .map(|(k, v)| (key_text(k), Tree::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Tree::from(tagged.value),
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Option<Number> {
    if let Some(i) = n.as_i64() {
        Some(Number::from(i))
    } else if let Some(u) = n.as_u64() {
        Some(Number::from(u))
    } else {
        n.as_f64().and_then(Number::from_f64)
    }
}

/// Render a YAML mapping key as a string.
fn key_text(key: serde_yaml::Value) -> String {
    match Tree::from(key) {
        Tree::String(s) => s,
        scalar @ (Tree::Null | Tree::Bool(_) | Tree::Number(_)) => {
            scalar.scalar_text().unwrap_or_default()
        }
        collection => collection.to_json().to_string(),
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::String(s.to_string())
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::String(s)
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Bool(b)
    }
}

impl From<i64> for Tree {
    fn from(i: i64) -> Self {
        Tree::Number(Number::from(i))
    }
}

impl From<i32> for Tree {
    fn from(i: i32) -> Self {
        Tree::Number(Number::from(i))
    }
}

impl From<Mapping> for Tree {
    fn from(map: Mapping) -> Self {
        Tree::Mapping(map)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::Sequence(items)
    }
}
