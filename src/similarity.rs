//! String similarity used by customer lookup and both evaluators.

/// Similarity ratio between two strings on a 0..=1 scale.
///
/// Comparison is case-insensitive and based on normalized Levenshtein
/// distance. Two empty strings are identical (1.0); exactly one empty string
/// never matches (0.0).
pub fn similar(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}
