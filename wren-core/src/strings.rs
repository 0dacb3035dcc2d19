//! String utilities: placeholder substitution, escapes, masks, interning.
//!
//! The substitution scanner here is the engine behind `${...}` expansion in
//! the evaluator, but it is generic over the delimiter pair and the
//! resolution callback, so it can be reused with any prefix/suffix.

use std::rc::Rc;

use crate::hashtable::{Hashtable, HashtableType, Value};

// ── Placeholder substitution ──────────────────────────────────────────────────

/// Replace every `prefix...suffix` group in `text` with the callback's
/// result.
///
/// - Nested groups are supported: when a group's text itself contains the
///   prefix, the inner groups are substituted first (recursively) — unless
///   the group's text starts with one of `no_replace_prefixes`, in which
///   case it is handed to the callback verbatim (the callback is then
///   responsible for any inner evaluation).
/// - With `allow_escape`, a backslash before the prefix's first character
///   suppresses substitution; the backslash is dropped from the output.
/// - An unterminated group (no closing suffix before end of input) produces
///   no output and bumps `errors`.
/// - A callback returning `None` copies one input character through and
///   bumps `errors`.
pub fn replace_with_callback(
    text: &str,
    prefix: &str,
    suffix: &str,
    allow_escape: bool,
    no_replace_prefixes: &[&str],
    cb: &mut dyn FnMut(&str) -> Option<String>,
    errors: &mut u32,
) -> String {
    let s = text.as_bytes();
    let p = prefix.as_bytes();
    let q = suffix.as_bytes();
    if p.is_empty() || q.is_empty() {
        return text.to_owned();
    }

    let mut out: Vec<u8> = Vec::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if s[i] == b'\\' && i + 1 < s.len() && s[i + 1] == p[0] {
            if allow_escape {
                out.push(s[i + 1]);
            } else {
                out.push(s[i]);
                out.push(s[i + 1]);
            }
            i += 2;
        } else if s[i..].starts_with(p) {
            // locate the matching suffix, counting nested groups
            let mut j = i + p.len();
            let mut sub_count = 0u32;
            let mut sub_level = 0u32;
            let mut terminated = false;
            while j < s.len() {
                if s[j..].starts_with(q) {
                    if sub_level == 0 {
                        terminated = true;
                        break;
                    }
                    sub_level -= 1;
                }
                if allow_escape && s[j] == b'\\' && j + 1 < s.len() && s[j + 1] == p[0] {
                    j += 1;
                } else if s[j..].starts_with(p) {
                    sub_count += 1;
                    sub_level += 1;
                }
                j += 1;
            }
            if !terminated {
                // unterminated group: swallow the rest, emit nothing
                *errors += 1;
                break;
            }

            let mut key = String::from_utf8_lossy(&s[i + p.len()..j]).into_owned();
            if sub_count > 0 && !no_replace_prefixes.iter().any(|np| key.starts_with(np)) {
                let mut sub_errors = 0;
                key = replace_with_callback(
                    &key,
                    prefix,
                    suffix,
                    true,
                    no_replace_prefixes,
                    cb,
                    &mut sub_errors,
                );
                *errors += sub_errors;
            }
            match cb(&key) {
                Some(value) => {
                    out.extend_from_slice(value.as_bytes());
                    i = j + q.len();
                }
                None => {
                    out.push(s[i]);
                    i += 1;
                    *errors += 1;
                }
            }
        } else {
            out.push(s[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

// ── Escaped chars ─────────────────────────────────────────────────────────────

/// Convert backslash escapes to the characters they denote.
///
/// Recognized: `\n \t \r \e \a \b \f \v \\ \" \' \xHH \uHHHH`. An
/// unrecognized escape keeps the escaped character as-is; a trailing
/// backslash is kept literally.
pub fn convert_escaped_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('e') => out.push('\x1b'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('x') => {
                let mut hex = String::new();
                while hex.len() < 2 {
                    match chars.peek() {
                        Some(c) if c.is_ascii_hexdigit() => hex.push(chars.next().unwrap()),
                        _ => break,
                    }
                }
                match u8::from_str_radix(&hex, 16) {
                    Ok(b) => out.push(b as char),
                    Err(_) => out.push('x'),
                }
            }
            Some('u') => {
                let mut hex = String::new();
                while hex.len() < 4 {
                    match chars.peek() {
                        Some(c) if c.is_ascii_hexdigit() => hex.push(chars.next().unwrap()),
                        _ => break,
                    }
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => out.push('u'),
                }
            }
            Some(other) => out.push(other),
        }
    }
    out
}

// ── Cut ───────────────────────────────────────────────────────────────────────

/// Truncate `text` to at most `max` characters, appending `cut_suffix` when
/// something was removed. With `count_suffix`, the suffix's own length
/// counts toward `max`.
pub fn cut(text: &str, max: usize, count_suffix: bool, cut_suffix: &str) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let budget = if count_suffix {
        max.saturating_sub(cut_suffix.chars().count())
    } else {
        max
    };
    let mut out: String = text.chars().take(budget).collect();
    out.push_str(cut_suffix);
    out
}

// ── Mask matching ─────────────────────────────────────────────────────────────

/// Match `text` against a mask where `*` matches any run of characters.
///
/// An empty mask matches nothing. Word segments between wildcards are
/// located greedily left-to-right; a mask not ending in `*` must consume
/// the whole text.
pub fn match_mask(text: &str, mask: &str, case_sensitive: bool) -> bool {
    if mask.is_empty() {
        return false;
    }
    let (text_buf, mask_buf);
    let (mut s, mut m): (&str, &str) = if case_sensitive {
        (text, mask)
    } else {
        text_buf = text.to_lowercase();
        mask_buf = mask.to_lowercase();
        (&text_buf, &mask_buf)
    };

    while !m.is_empty() {
        let mut wildcard = false;
        if m.starts_with('*') {
            wildcard = true;
            m = m.trim_start_matches('*');
            if m.is_empty() {
                return true;
            }
        }
        if s.is_empty() {
            return false;
        }
        let word_end = m.find('*').unwrap_or(m.len());
        let word = &m[..word_end];
        if wildcard {
            match s.find(word) {
                Some(pos) => s = &s[pos + word.len()..],
                None => return false,
            }
        } else {
            if !s.starts_with(word) {
                return false;
            }
            s = &s[word.len()..];
        }
        m = &m[word_end..];
    }
    s.is_empty()
}

// ── Shared strings ────────────────────────────────────────────────────────────

const SHARED_STRINGS_SIZE: usize = 1024;

/// Interning pool for reference-counted strings.
///
/// [`SharedStrings::get`] returns an `Rc<String>`; the reference count and
/// the bytes live in the same allocation, and every caller interning equal
/// content shares it. The returned handle must be treated as immutable.
/// [`SharedStrings::release`] drops a handle and evicts the pool entry once
/// nobody else holds it.
pub struct SharedStrings {
    table: Hashtable,
}

impl SharedStrings {
    pub fn new() -> Self {
        SharedStrings {
            table: Hashtable::with_types(
                SHARED_STRINGS_SIZE,
                HashtableType::String,
                HashtableType::Pointer,
            ),
        }
    }

    /// Intern `text`, returning the pool's shared allocation for it.
    pub fn get(&mut self, text: &str) -> Rc<String> {
        let key = Value::String(text.to_owned());
        if let Some(Value::Pointer(Some(p))) = self.table.get(&key) {
            if let Ok(shared) = p.clone().downcast::<String>() {
                return shared;
            }
        }
        let shared = Rc::new(text.to_owned());
        self.table
            .set(key, Some(Value::Pointer(Some(shared.clone()))));
        shared
    }

    /// Drop one handle; the pool entry is removed when no other handle
    /// remains.
    pub fn release(&mut self, handle: Rc<String>) {
        let key = Value::String((*handle).clone());
        drop(handle);
        let unreferenced = matches!(
            self.table.get(&key),
            Some(Value::Pointer(Some(p))) if Rc::strong_count(p) == 1
        );
        if unreferenced {
            self.table.remove(&key);
        }
    }

    /// Number of handles to `text` held outside the pool.
    pub fn references(&self, text: &str) -> usize {
        match self.table.get(&Value::String(text.to_owned())) {
            Some(Value::Pointer(Some(p))) => Rc::strong_count(p) - 1,
            _ => 0,
        }
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for SharedStrings {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
