//! Client filename sanitization.
//!
//! Client-supplied names end up both in the scratch path and in the object key, so
//! they are reduced to a conservative ASCII alphabet before any use.

use crate::constants::{FALLBACK_FILENAME, MAX_FILENAME_LENGTH};

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn is_edge(c: char) -> bool {
    c == '.' || c == '_'
}

/// Reduce a client filename to `[A-Za-z0-9_.-]`.
///
/// Non-ASCII characters are dropped, path separators become word breaks, runs of
/// whitespace collapse into a single `_`, and leading or trailing `.`/`_` are removed.
/// The result may be empty. Applying the function twice yields the same name.
pub fn secure_filename(raw: &str) -> String {
    let ascii: String = raw
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined.chars().filter(|c| is_kept(*c)).collect();
    let trimmed = kept.trim_matches(is_edge);

    // Only ASCII is left, so byte truncation cannot split a character.
    let truncated = &trimmed[..trimmed.len().min(MAX_FILENAME_LENGTH)];
    truncated.trim_matches(is_edge).to_string()
}

/// Sanitize a client filename for use as a path component and object key,
/// falling back to a fixed name when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> String {
    let name = secure_filename(raw);
    if name.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        name
    }
}
