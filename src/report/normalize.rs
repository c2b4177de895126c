//! Filename normalization.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
    static ref NON_WORD_CHAR: Regex = Regex::new(r"[^\w_]").expect("valid word pattern");
}

/// Canonicalize a raw filename into a comparable token string.
///
/// Lower-cases the name, turns every whitespace run into one `_` and every
/// remaining non-word character into `_`. Accented letters are word
/// characters and survive untouched.
pub fn normalize_filename(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let collapsed = WHITESPACE_RUN.replace_all(&lowered, "_");
    NON_WORD_CHAR.replace_all(&collapsed, "_").into_owned()
}
