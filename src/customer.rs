//! Customer code resolution.
//!
//! The mapper never looks customer codes up by itself: a [`CustomerResolver`]
//! is passed in explicitly. [`CustomerTable`] is the table-backed resolver
//! used by the CLI; any `Fn(&str) -> String` closure also works, which keeps
//! tests free of fixture files.

use indexmap::IndexMap;
use std::path::Path;

use crate::error::ConversionError;
use crate::similarity::similar;

/// Sentinel code for records without a usable customer name
pub const UNKNOWN_CUSTOMER: &str = "UNKNOWN";

/// Minimum similarity (exclusive) for a fuzzy table hit
pub const FUZZY_THRESHOLD: f64 = 0.8;

/// Resolves a customer name to a TMS customer code.
///
/// Implementations must be total: every input, including the empty string,
/// maps to some code.
pub trait CustomerResolver: Send + Sync {
    fn resolve(&self, name: &str) -> String;
}

impl<F> CustomerResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve(&self, name: &str) -> String {
        self(name)
    }
}

/// Uppercased initials of the first two words, or `UNKNOWN` when there are none.
pub fn initials_code(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .collect::<String>()
        .to_uppercase();

    if initials.is_empty() {
        UNKNOWN_CUSTOMER.to_string()
    } else {
        initials
    }
}

/// Resolver used when no lookup table is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialsResolver;

impl CustomerResolver for InitialsResolver {
    fn resolve(&self, name: &str) -> String {
        initials_code(name)
    }
}

/// Immutable name-to-code lookup table with fuzzy fallback.
///
/// Resolution order: exact name, best fuzzy match scoring above
/// [`FUZZY_THRESHOLD`] (first entry wins ties), initials of the first two
/// words, then [`UNKNOWN_CUSTOMER`].
#[derive(Debug, Clone, Default)]
pub struct CustomerTable {
    entries: IndexMap<String, String>,
}

impl CustomerTable {
    /// Create a table from name/code pairs, preserving their order.
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Load a `{"customer name": "CODE", ...}` JSON object.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConversionError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConversionError::from(e).in_file(path))?;
        let entries: IndexMap<String, String> =
            serde_json::from_str(&contents).map_err(|e| ConversionError::from(e).in_file(path))?;

        tracing::info!("Loaded {} customer ID mappings from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best fuzzy hit above the threshold, if any.
    fn fuzzy_lookup(&self, name: &str) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;

        for (known, code) in &self.entries {
            let score = similar(name, known);
            if score > FUZZY_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                best = Some((code.as_str(), score));
            }
        }

        best.map(|(code, _)| code)
    }
}

impl CustomerResolver for CustomerTable {
    fn resolve(&self, name: &str) -> String {
        if name.is_empty() {
            return UNKNOWN_CUSTOMER.to_string();
        }

        if let Some(code) = self.entries.get(name) {
            return code.clone();
        }

        if let Some(code) = self.fuzzy_lookup(name) {
            tracing::debug!("Fuzzy customer match for '{}' -> {}", name, code);
            return code.to_string();
        }

        initials_code(name)
    }
}
