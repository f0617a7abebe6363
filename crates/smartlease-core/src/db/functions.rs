//! SQL scalar functions registered on every connection
//!
//! - `cosine_similarity(a BLOB, b BLOB) -> REAL`
//! - `numeric_value(v TEXT) -> REAL` (NULL when the text holds no number)
//! - `contains_ci(haystack TEXT, needle TEXT) -> INTEGER` (Unicode case folding)

use super::vectors::{bytes_to_embedding, cosine_similarity};
use crate::error::Result;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

pub(crate) fn register_functions(conn: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("cosine_similarity", 2, flags, |ctx| {
        let (Some(a), Some(b)) = (blob_arg(ctx, 0), blob_arg(ctx, 1)) else {
            return Ok(None);
        };
        let a = bytes_to_embedding(a);
        let b = bytes_to_embedding(b);
        Ok(Some(cosine_similarity(&a, &b) as f64))
    })?;

    conn.create_scalar_function("numeric_value", 1, flags, |ctx| {
        let value = match ctx.get_raw(0) {
            ValueRef::Integer(i) => Some(i as f64),
            ValueRef::Real(r) => Some(r),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(numeric_value),
            _ => None,
        };
        Ok(value)
    })?;

    conn.create_scalar_function("contains_ci", 2, flags, |ctx| {
        let (Some(haystack), Some(needle)) = (text_arg(ctx, 0), text_arg(ctx, 1)) else {
            return Ok(false);
        };
        Ok(contains_ci(haystack, needle))
    })?;

    Ok(())
}

fn text_arg<'a>(ctx: &'a Context<'_>, idx: usize) -> Option<&'a str> {
    match ctx.get_raw(idx) {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

/// Substring test that ignores case for any script, not only ASCII
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn blob_arg<'a>(ctx: &'a Context<'_>, idx: usize) -> Option<&'a [u8]> {
    match ctx.get_raw(idx) {
        ValueRef::Blob(bytes) => Some(bytes),
        _ => None,
    }
}

/// Numeric reading of a stored attribute.
///
/// Drops every character that is not a digit or a decimal point, then parses
/// what is left: `"$2,500/mo"` reads as `2500`, `"3 beds"` as `3`, and
/// `"n/a"` or `"1.2.3"` as nothing.
pub fn numeric_value(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
