use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns.
///
/// ```
/// use dexview::util::display_width;
///
/// assert_eq!(display_width("pikachu"), 7);
/// assert_eq!(display_width("ピカチュウ"), 10);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: char = '…';

/// Truncate a string to at most `max_width` columns, ending in `…` when cut.
///
/// Returns `Cow::Borrowed` when the string already fits.
///
/// ```
/// use dexview::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("charmander", 20), "charmander");
/// assert_eq!(truncate_to_width("charmander", 6), "charm…");
/// assert_eq!(truncate_to_width("charmander", 0), "");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    // Reserve one column for the ellipsis
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::with_capacity(s.len().min(max_width * 4));
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Strip terminal control characters and escape sequences from API text.
///
/// Keeps tab and newline. Returns `Cow::Borrowed` for clean input.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unsafe = |c: char| c.is_control() && c != '\t' && c != '\n';
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI: ESC [ params final-byte
            if chars.peek() == Some(&'[') {
                chars.next();
                for n in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&n) {
                        break;
                    }
                }
            }
            continue;
        }
        if !is_unsafe(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Capitalize each hyphen- or space-separated word of an API name.
///
/// ```
/// use dexview::util::display_name;
///
/// assert_eq!(display_name("mr-mime"), "Mr-Mime");
/// assert_eq!(display_name("bulbasaur"), "Bulbasaur");
/// ```
pub fn display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c == '-' || c == ' ';
    }
    out
}
