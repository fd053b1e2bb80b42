//! Deep merge of source documents
//!
//! Sources are folded left to right into a fresh accumulator:
//!
//! - Mappings merge recursively; later keys override earlier ones and keys
//!   keep the order in which they first appeared.
//! - Scalars replace whatever was there before.
//! - Sequences replace the earlier value wholesale, unless their first
//!   element is a list directive such as `(( append ))`.
//!
//! # List directives
//!
//! | Directive | Effect |
//! |---|---|
//! | `(( append ))` | existing elements, then the new ones |
//! | `(( prepend ))` | new elements, then the existing ones |
//! | `(( replace ))` | only the new elements |
//! | `(( inline ))` | merge element-wise by index; extra elements are appended |
//! | `(( merge ))` | same as `(( merge on name ))` |
//! | `(( merge on <key> ))` | merge mappings sharing the same `<key>` value; others are appended |
//!
//! The directive element itself never reaches the output.
//!
//! # Examples
//!
//! ```
//! use graft_tree::{merge, Tree};
//! use serde_json::json;
//!
//! let base = Tree::from(json!({"name": "api", "tags": ["a"]}));
//! let overlay = Tree::from(json!({"port": 80, "tags": ["(( append ))", "b"]}));
//!
//! let merged = merge(&[base, overlay]).unwrap();
//! assert_eq!(merged, Tree::from(json!({"name": "api", "port": 80, "tags": ["a", "b"]})));
//! ```

use std::fmt;

use crate::cursor::Cursor;
use crate::error::{Error, MultiError, PathError, Result};
use crate::placeholder::placeholder_body;
use crate::value::{Mapping, Tree};

/// Key used by a bare `(( merge ))` directive.
pub const DEFAULT_MERGE_KEY: &str = "name";

/// How a sequence combines with the sequence it lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListDirective {
    Append,
    Prepend,
    Replace,
    Inline,
    MergeOn(String),
}

impl ListDirective {
    /// Recognise a directive in a sequence element.
    ///
    /// ```
    /// use graft_tree::{ListDirective, Tree};
    ///
    /// let item = Tree::from("(( merge on id ))");
    /// assert_eq!(ListDirective::parse(&item), Some(ListDirective::MergeOn("id".into())));
    /// assert_eq!(ListDirective::parse(&Tree::from("append")), None);
    /// ```
    pub fn parse(item: &Tree) -> Option<Self> {
        let body = placeholder_body(item.as_str()?)?;
        let words: Vec<&str> = body.split_whitespace().collect();
        match words.as_slice() {
            ["append"] => Some(Self::Append),
            ["prepend"] => Some(Self::Prepend),
            ["replace"] => Some(Self::Replace),
            ["inline"] => Some(Self::Inline),
            ["merge"] => Some(Self::MergeOn(DEFAULT_MERGE_KEY.to_string())),
            ["merge", "on", key] => Some(Self::MergeOn((*key).to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ListDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => f.write_str("append"),
            Self::Prepend => f.write_str("prepend"),
            Self::Replace => f.write_str("replace"),
            Self::Inline => f.write_str("inline"),
            Self::MergeOn(key) => write!(f, "merge on {key}"),
        }
    }
}

/// Merge `sources` left to right into a new document.
///
/// An empty source list yields an empty mapping.
///
/// # Errors
///
/// Returns [`Error::Merge`] listing every location where a directive could
/// not be applied.
pub fn merge(sources: &[Tree]) -> Result<Tree> {
    tracing::debug!(sources = sources.len(), "merging documents");
    let mut merger = Merger::default();
    let mut acc = None;
    for source in sources {
        acc = Some(merger.merge_value(acc, source, &Cursor::root()));
    }
    merger.finish(acc.unwrap_or_else(Tree::mapping))
}

/// Merge `src` over `dest`, returning the combined value.
///
/// # Errors
///
/// Returns [`Error::Merge`] if a list directive in `src` cannot be applied.
pub fn merge_pair(dest: &Tree, src: &Tree) -> Result<Tree> {
    let mut merger = Merger::default();
    let merged = merger.merge_value(Some(dest.clone()), src, &Cursor::root());
    merger.finish(merged)
}

/// Merge mappings left to right; later keys override earlier ones.
///
/// # Errors
///
/// Returns [`Error::Merge`] if a list directive inside the maps cannot be
/// applied.
pub fn merge_maps<'a>(maps: impl IntoIterator<Item = &'a Mapping>) -> Result<Mapping> {
    let mut merger = Merger::default();
    let mut acc = Mapping::new();
    for map in maps {
        acc = merger.merge_mapping(acc, map, &Cursor::root());
    }
    merger.errors.into_result().map_err(Error::Merge)?;
    Ok(acc)
}

#[derive(Default)]
struct Merger {
    errors: MultiError,
}

impl Merger {
    fn finish(self, tree: Tree) -> Result<Tree> {
        self.errors.into_result().map_err(Error::Merge)?;
        Ok(tree)
    }

    fn fail(&mut self, path: &Cursor, message: impl Into<String>) {
        self.errors.push(PathError::new(path.clone(), message));
    }

    fn merge_value(&mut self, dest: Option<Tree>, src: &Tree, path: &Cursor) -> Tree {
        match src {
            Tree::Mapping(map) => {
                let base = match dest {
                    Some(Tree::Mapping(existing)) => existing,
                    _ => Mapping::new(),
                };
                Tree::Mapping(self.merge_mapping(base, map, path))
            }
            Tree::Sequence(items) => self.merge_sequence(dest, items, path),
            scalar => scalar.clone(),
        }
    }

    fn merge_mapping(&mut self, mut acc: Mapping, src: &Mapping, path: &Cursor) -> Mapping {
        for (key, value) in src {
            let child = path.child_key(key.as_str());
            match acc.get_mut(key) {
                Some(slot) => {
                    let existing = std::mem::take(slot);
                    let merged = self.merge_value(Some(existing), value, &child);
                    if let Some(slot) = acc.get_mut(key) {
                        *slot = merged;
                    }
                }
                None => {
                    let merged = self.merge_value(None, value, &child);
                    acc.insert(key.clone(), merged);
                }
            }
        }
        acc
    }

    fn fresh(&mut self, items: &[Tree], path: &Cursor, offset: usize) -> Vec<Tree> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.merge_value(None, item, &path.child_index(i + offset)))
            .collect()
    }

    fn merge_sequence(&mut self, dest: Option<Tree>, items: &[Tree], path: &Cursor) -> Tree {
        let (directive, rest) = match items.split_first() {
            Some((first, rest)) => match ListDirective::parse(first) {
                Some(directive) => (directive, rest),
                None => return Tree::Sequence(self.fresh(items, path, 0)),
            },
            None => return Tree::Sequence(Vec::new()),
        };
        tracing::trace!(path = %path, %directive, "applying list directive");

        let mut existing = match dest {
            // replace discards whatever was there, lists or not
            _ if directive == ListDirective::Replace => Vec::new(),
            None | Some(Tree::Null) => Vec::new(),
            Some(Tree::Sequence(existing)) => existing,
            Some(other) => {
                self.fail(path, format!("cannot {directive} into a {}", other.kind()));
                return other;
            }
        };

        match directive {
            ListDirective::Append => {
                let offset = existing.len();
                existing.extend(self.fresh(rest, path, offset));
                Tree::Sequence(existing)
            }
            ListDirective::Prepend => {
                let mut merged = self.fresh(rest, path, 0);
                merged.extend(existing);
                Tree::Sequence(merged)
            }
            ListDirective::Inline => {
                for (i, item) in rest.iter().enumerate() {
                    let child = path.child_index(i);
                    match existing.get_mut(i) {
                        Some(slot) => {
                            let old = std::mem::take(slot);
                            existing[i] = self.merge_value(Some(old), item, &child);
                        }
                        None => {
                            let merged = self.merge_value(None, item, &child);
                            existing.push(merged);
                        }
                    }
                }
                Tree::Sequence(existing)
            }
            ListDirective::MergeOn(key) => self.merge_on_key(existing, rest, &key, path),
            ListDirective::Replace => Tree::Sequence(self.fresh(rest, path, 0)),
        }
    }

    fn merge_on_key(
        &mut self,
        mut existing: Vec<Tree>,
        items: &[Tree],
        key: &str,
        path: &Cursor,
    ) -> Tree {
        if let Some(i) = existing.iter().position(|e| entry_key(e, key).is_none()) {
            self.fail(
                path,
                format!("existing object in list at index {i} lacks key '{key}'"),
            );
            return Tree::Sequence(existing);
        }

        for (i, item) in items.iter().enumerate() {
            let Some(id) = entry_key(item, key) else {
                self.fail(
                    path,
                    format!("new object in list at index {} lacks key '{key}'", i + 1),
                );
                continue;
            };
            match existing.iter().position(|e| entry_key(e, key) == Some(id)) {
                Some(pos) => {
                    let old = std::mem::take(&mut existing[pos]);
                    existing[pos] = self.merge_value(Some(old), item, &path.child_index(pos));
                }
                None => {
                    let child = path.child_index(existing.len());
                    let merged = self.merge_value(None, item, &child);
                    existing.push(merged);
                }
            }
        }
        Tree::Sequence(existing)
    }
}

fn entry_key<'t>(entry: &'t Tree, key: &str) -> Option<&'t Tree> {
    entry.as_mapping()?.get(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn t(value: serde_json::Value) -> Tree {
        Tree::from(value)
    }

    #[test]
    fn test_maps_union_recursively() {
        let merged = merge(&[
            t(json!({"a": {"x": 1, "y": 2}, "b": 1})),
            t(json!({"a": {"y": 3, "z": 4}, "c": 2})),
        ])
        .unwrap();
        assert_eq!(merged, t(json!({"a": {"x": 1, "y": 3, "z": 4}, "b": 1, "c": 2})));
    }

    #[test]
    fn test_first_appearance_order_kept() {
        let merged = merge(&[t(json!({"first": 1})), t(json!({"second": 2, "first": 3}))]).unwrap();
        let keys: Vec<_> = merged.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["first", "second"]);
    }

    #[test]
    fn test_scalar_overrides_map_and_back() {
        let merged = merge(&[t(json!({"a": {"x": 1}})), t(json!({"a": "flat"}))]).unwrap();
        assert_eq!(merged, t(json!({"a": "flat"})));
        let merged = merge(&[t(json!({"a": "flat"})), t(json!({"a": {"x": 1}}))]).unwrap();
        assert_eq!(merged, t(json!({"a": {"x": 1}})));
    }

    #[test]
    fn test_sequences_replace_by_default() {
        let merged = merge(&[t(json!({"l": [1, 2, 3]})), t(json!({"l": [4]}))]).unwrap();
        assert_eq!(merged, t(json!({"l": [4]})));
    }

    #[test]
    fn test_replace_directive_over_scalar() {
        let merged = merge(&[
            t(json!({"l": "flat"})),
            t(json!({"l": ["(( replace ))", 3]})),
        ])
        .unwrap();
        assert_eq!(merged, t(json!({"l": [3]})));
    }

    #[rstest]
    #[case("(( append ))", json!([1, 2, 3, 4]))]
    #[case("(( prepend ))", json!([3, 4, 1, 2]))]
    #[case("(( replace ))", json!([3, 4]))]
    #[case("((inline))", json!([3, 4]))]
    fn test_list_directives(#[case] directive: &str, #[case] expected: serde_json::Value) {
        let merged = merge(&[
            t(json!({"l": [1, 2]})),
            t(json!({"l": [directive, 3, 4]})),
        ])
        .unwrap();
        assert_eq!(merged, t(json!({ "l": expected })));
    }

    #[test]
    fn test_inline_merges_maps_by_index() {
        let merged = merge(&[
            t(json!({"l": [{"a": 1}, {"b": 2}]})),
            t(json!({"l": ["(( inline ))", {"a": 9, "c": 3}, {}, {"d": 4}]})),
        ])
        .unwrap();
        assert_eq!(
            merged,
            t(json!({"l": [{"a": 9, "c": 3}, {"b": 2}, {"d": 4}]}))
        );
    }

    #[test]
    fn test_merge_on_name() {
        let merged = merge(&[
            t(json!({"jobs": [{"name": "api", "port": 1}, {"name": "web", "port": 2}]})),
            t(json!({"jobs": ["(( merge ))", {"name": "web", "port": 8}, {"name": "db"}]})),
        ])
        .unwrap();
        assert_eq!(
            merged,
            t(json!({"jobs": [
                {"name": "api", "port": 1},
                {"name": "web", "port": 8},
                {"name": "db"}
            ]}))
        );
    }

    #[test]
    fn test_merge_on_custom_key() {
        let merged = merge(&[
            t(json!({"l": [{"id": 1, "v": "a"}]})),
            t(json!({"l": ["(( merge on id ))", {"id": 1, "v": "b"}]})),
        ])
        .unwrap();
        assert_eq!(merged, t(json!({"l": [{"id": 1, "v": "b"}]})));
    }

    #[test]
    fn test_merge_on_missing_key_reports_path() {
        let err = merge(&[
            t(json!({"meta": {"jobs": [{"name": "api"}]}})),
            t(json!({"meta": {"jobs": ["(( merge ))", {"port": 1}]}})),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 error(s) detected:\n - $.meta.jobs: new object in list at index 1 lacks key 'name'\n"
        );
    }

    #[test]
    fn test_directive_into_scalar_fails() {
        let err = merge(&[t(json!({"l": "scalar"})), t(json!({"l": ["(( append ))", 1]}))])
            .unwrap_err();
        assert!(err.to_string().contains("$.l: cannot append into a string"));
    }

    #[test]
    fn test_directive_without_existing_value() {
        let merged = merge(&[t(json!({"l": ["(( append ))", 1]}))]).unwrap();
        assert_eq!(merged, t(json!({"l": [1]})));
    }

    #[test]
    fn test_nested_directives_are_stripped() {
        let merged = merge(&[t(json!({"a": [{"l": ["(( prepend ))", 1]}]}))]).unwrap();
        assert_eq!(merged, t(json!({"a": [{"l": [1]}]})));
    }

    #[test]
    fn test_errors_aggregate_across_locations() {
        let err = merge(&[
            t(json!({"a": 1, "b": 2})),
            t(json!({"a": ["(( inline ))"], "b": ["(( merge ))"]})),
        ])
        .unwrap_err();
        match err {
            Error::Merge(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected merge error, got {other:?}"),
        }
    }

    #[test]
    fn test_sources_untouched() {
        let sources = vec![t(json!({"a": [1]})), t(json!({"a": ["(( append ))", 2]}))];
        let before = sources.clone();
        merge(&sources).unwrap();
        assert_eq!(sources, before);
    }

    #[test]
    fn test_merge_maps_later_wins() {
        let a = t(json!({"x": 1, "y": {"k": 1}}));
        let b = t(json!({"y": {"k": 2}, "z": 3}));
        let merged = merge_maps([a.as_mapping().unwrap(), b.as_mapping().unwrap()]).unwrap();
        assert_eq!(Tree::Mapping(merged), t(json!({"x": 1, "y": {"k": 2}, "z": 3})));
    }

    #[test]
    fn test_empty_sources() {
        assert_eq!(merge(&[]).unwrap(), Tree::mapping());
    }
}
