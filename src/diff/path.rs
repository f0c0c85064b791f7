//! Path-based addressing into JSON trees.
//!
//! Paths use `.` between object members and `[i]` for list elements, e.g.
//! `shipper_section[0].ship_from_company`. [`get_all_fields`] enumerates the
//! paths present in a tree and [`get_field_value`] replays one against another
//! tree.

use indexmap::IndexSet;
use serde_json::Value;
use std::fmt;

/// Represents a path to a field in a JSON tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The raw path string
    pub raw: String,
    /// Parsed path segments
    pub segments: Vec<PathSegment>,
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named member (e.g., "shipper_section")
    Field(String),
    /// A list index (e.g., [0], [5])
    Index(usize),
}

impl FieldPath {
    /// Parse a dotted path with optional `[i]` index suffixes.
    ///
    /// # Example
    ///
    /// ```
    /// use tmsmap::diff::{FieldPath, PathSegment};
    ///
    /// let path = FieldPath::parse("shipper_section[1].pickup_number");
    /// assert_eq!(path.segments.len(), 3);
    /// assert_eq!(path.segments[1], PathSegment::Index(1));
    /// ```
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();

        for part in path.split('.').filter(|s| !s.is_empty()) {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };

            if !name.is_empty() {
                segments.push(PathSegment::Field(name.to_string()));
            }

            // Chained indices: `name[0][1]`
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(end) = stripped.find(']') else {
                    segments.push(PathSegment::Field(rest.to_string()));
                    break;
                };
                match stripped[..end].parse::<usize>() {
                    Ok(index) => segments.push(PathSegment::Index(index)),
                    Err(_) => segments.push(PathSegment::Field(stripped[..end].to_string())),
                }
                rest = &stripped[end + 1..];
            }
        }

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// True when the path names a top-level member only (no `.` or `[`).
    pub fn is_top_level(&self) -> bool {
        !self.raw.contains('.') && !self.raw.contains('[')
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Trait for trees that can be addressed by [`FieldPath`]
pub trait Extractor {
    /// Value at the given path, or `None` when the path does not resolve
    fn extract(&self, path: &FieldPath) -> Option<&Value>;
}

impl Extractor for Value {
    fn extract(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = self;

        for segment in &path.segments {
            current = match (segment, current) {
                (PathSegment::Field(name), Value::Object(map)) => map.get(name)?,
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }

        Some(current)
    }
}

/// Every path reachable in `tree`, in document order.
///
/// Object members are always recorded and then descended into when they hold
/// a container. List elements are never recorded themselves; only their
/// members are, so a list of scalars contributes just the list's own path.
pub fn get_all_fields(tree: &Value) -> IndexSet<String> {
    let mut paths = IndexSet::new();
    collect_fields(tree, "", &mut paths);
    paths
}

fn collect_fields(value: &Value, prefix: &str, paths: &mut IndexSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                paths.insert(name.clone());

                if child.is_object() || child.is_array() {
                    collect_fields(child, &name, paths);
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_fields(item, &format!("{}[{}]", prefix, i), paths);
            }
        }
        _ => {}
    }
}

/// Look a path up in `tree`. JSON `null` counts as absent.
pub fn get_field_value<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    tree.extract(&FieldPath::parse(path)).filter(|v| !v.is_null())
}
