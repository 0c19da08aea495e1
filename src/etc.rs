//! Useful functions with designated modules.

/// Returns the byte offset in `buf` corresponding to the `pos`-th character, which is
/// guaranteed to be aligned to a UTF-8 code point boundary in `buf`.
///
/// If `buf` contains less than `pos` characters, then `buf.len()` is returned.
pub fn pos_to_offset(buf: &str, pos: usize) -> usize {
    buf.chars()
        .take(pos)
        .fold(0, |offset, c| offset + c.len_utf8())
}

/// Returns the number of characters in `buf`.
pub fn char_len(buf: &str) -> usize {
    buf.chars().count()
}

/// Splits `buf` at the `pos`-th character.
pub fn split_at_pos(buf: &str, pos: usize) -> (&str, &str) {
    buf.split_at(pos_to_offset(buf, pos))
}

/// Returns the characters of `buf` in the range `start..end`, where both bounds
/// are character positions clamped to the length of `buf`.
pub fn slice_pos(buf: &str, start: usize, end: usize) -> &str {
    let start = pos_to_offset(buf, start);
    let end = pos_to_offset(buf, end).max(start);
    &buf[start..end]
}

/// Returns `true` if `a` and `b` are equal once non-breaking spaces are read as
/// ordinary spaces.
pub fn same_text(a: &str, b: &str) -> bool {
    a.chars()
        .map(clean_char)
        .eq(b.chars().map(clean_char))
}

/// Replaces non-breaking spaces in `buf` with ordinary spaces.
pub fn clean_text(buf: &str) -> String {
    buf.chars().map(clean_char).collect()
}

fn clean_char(c: char) -> char {
    if c == '\u{a0}' { ' ' } else { c }
}
