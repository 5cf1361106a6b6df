//! Best-effort interpretation of atom text.

use crate::node::Scalar;
use kstring::KString;
use num::BigInt;

/// Accepted spellings for `true`, paired index-wise with
/// [NO_VALUES] so a toggle keeps the case variant.
pub const YES_VALUES: [&str; 4] = ["yes", "Yes", "True", "true"];
pub const NO_VALUES: [&str; 4] = ["no", "No", "False", "false"];

/// Integer parse, then floating-point parse, then the literal text.
/// The order is fixed: an atom that parses as both int and float is
/// an int.
pub fn scalar(text: &str) -> Scalar {
    if let Ok(n) = text.parse::<BigInt>() {
        return Scalar::Int(n);
    }
    if let Ok(x) = text.parse::<f64>() {
        return Scalar::Float(x);
    }
    Scalar::Str(KString::from_ref(text))
}

/// `Some` only for the recognized boolean literals; anything else is
/// not boolean.
pub fn boolean(text: &str) -> Option<bool> {
    if YES_VALUES.contains(&text) {
        Some(true)
    } else if NO_VALUES.contains(&text) {
        Some(false)
    } else {
        None
    }
}

/// The opposite literal in the same case variant (`Yes` -> `No`).
pub fn toggle_spelling(text: &str) -> Option<&'static str> {
    if let Some(i) = YES_VALUES.iter().position(|v| *v == text) {
        Some(NO_VALUES[i])
    } else if let Some(i) = NO_VALUES.iter().position(|v| *v == text) {
        Some(YES_VALUES[i])
    } else {
        None
    }
}
