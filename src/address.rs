//! Heuristic US address splitting.
//!
//! Addresses are expected in the `street, city STATE ZIP` convention. The
//! parser never fails: components it cannot locate come back empty. Suite
//! numbers with their own commas, multi-part street lines and non-US formats
//! are not guaranteed to split correctly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{5}(?:-\d{4})?)").expect("valid zip pattern"));

static STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{2})\s+\d{5}").expect("valid state pattern"));

static CITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",\s*([^,]+?)\s+[A-Z]{2}\s+\d{5}").expect("valid city pattern")
});

/// Components of a parsed address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParts {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Split a free-text address into street, city, state and ZIP.
///
/// # Example
///
/// ```
/// use tmsmap::address::parse_address;
///
/// let parts = parse_address("1 Main St, Springfield IL 62701");
/// assert_eq!(parts.street, "1 Main St");
/// assert_eq!(parts.city, "Springfield");
/// assert_eq!(parts.state, "IL");
/// assert_eq!(parts.zip_code, "62701");
/// ```
pub fn parse_address(address: &str) -> AddressParts {
    if address.is_empty() {
        return AddressParts::default();
    }

    let capture = |re: &Regex| {
        re.captures(address)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };

    let street = address.split(',').next().unwrap_or_default().trim().to_string();

    AddressParts {
        street,
        city: capture(&CITY_RE),
        state: capture(&STATE_RE),
        zip_code: capture(&ZIP_RE),
    }
}
