//! Identifier Validator
//!
//! Pure checks that gate every mutation entry point. The store itself never
//! validates; callers validate first, then store.
//!
//! - Identifier: canonical UUID text, 8-4-4-4-12 hex digits, any case
//! - Name: a first name of 2-35 ASCII letters, or "first last" where each
//!   part is 1-35 ASCII letters separated by exactly one space

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

lazy_static! {
    static ref IDENTIFIER_REGEX: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    )
    .unwrap();
    static ref NAME_REGEX: Regex =
        Regex::new(r"^(?:[a-zA-Z]{2,35}|[a-zA-Z]{1,35} [a-zA-Z]{1,35})$").unwrap();
}

/// Returns true iff `value` is a UUID in canonical textual form
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_REGEX.is_match(value)
}

/// Returns true iff `name` is a valid display name
pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// Generate a fresh random identifier (lowercase hyphenated v4 UUID)
pub fn generate_identifier() -> String {
    Uuid::new_v4().to_string()
}
