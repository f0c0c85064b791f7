//! Field-tree differ: path enumeration, lookup and fuzzy comparison of JSON
//! trees.

pub mod compare;
pub mod path;

pub use compare::{compare_nested_structures, compare_values, render, Differ, FieldMatch, MatchPolicy};
pub use path::{get_all_fields, get_field_value, Extractor, FieldPath, PathSegment};
