//! Expression evaluation over strings.
//!
//! Two services live here: `${...}` variable substitution, and a small
//! condition language layered on top of it (comparisons, `&&`/`||`,
//! parentheses). Everything operates on strings; a condition's result is
//! `"1"` or `"0"`, and a value is truthy iff it is non-empty and not `"0"`.
//!
//! The condition grammar is deliberately not conventional-precedence: after
//! leading parenthesized groups are reduced, the *first* `&&` found at paren
//! level, then the first `||`, splits the expression, and comparators are
//! tried in one fixed priority order. Unparenthesized mixed `&&`/`||`
//! chains therefore group differently than in most languages; this scan
//! order is part of the contract and relied on by saved user conditions.
//!
//! Placeholder resolution consults, in priority order: the caller's extra
//! variables, modifier prefixes (`eval:`, `esc:`, `lower:`, `upper:`,
//! `hide:`, `cut:`, `re:`, `length:`, `env:`, `if:`), the option namespace,
//! buffer-local variables, and finally reflected object paths through the
//! [`HdataRegistry`]. Every failure degrades to an empty string; a malformed
//! expression typed at a prompt must never take the client down.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use regex::{Regex, RegexBuilder};

use crate::config::ConfigRegistry;
use crate::hashtable::{pointer_address, Hashtable, HashtableType, Pointer, Value};
use crate::hdata::{Hdata, HdataRegistry, HdataType};
use crate::strings;

pub const DEFAULT_PREFIX: &str = "${";
pub const DEFAULT_SUFFIX: &str = "}";

const STR_TRUE: &str = "1";
const STR_FALSE: &str = "0";

/// Placeholder contents starting with these are handed to the resolver
/// verbatim, inner placeholders unresolved; the resolver substitutes the
/// branch it selects.
const NO_REPLACE_PREFIXES: &[&str] = &["if:"];

/// A value is true iff non-empty and not the literal `"0"`.
pub fn is_true(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

fn bool_str(value: bool) -> String {
    (if value { STR_TRUE } else { STR_FALSE }).to_owned()
}

// ── Comparators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    RegexMatch,
    RegexNotMatch,
    MaskMatch,
    MaskNotMatch,
    Equal,
    NotEqual,
    LessEqual,
    Less,
    GreaterEqual,
    Greater,
}

impl Comparison {
    fn is_regex(self) -> bool {
        matches!(self, Comparison::RegexMatch | Comparison::RegexNotMatch)
    }
}

/// Fixed scan priority. Order matters: two-char operators whose first char
/// is also an operator must come before it.
const COMPARISONS: [(&str, Comparison); 10] = [
    ("=~", Comparison::RegexMatch),
    ("!~", Comparison::RegexNotMatch),
    ("=*", Comparison::MaskMatch),
    ("!*", Comparison::MaskNotMatch),
    ("==", Comparison::Equal),
    ("!=", Comparison::NotEqual),
    ("<=", Comparison::LessEqual),
    ("<", Comparison::Less),
    (">=", Comparison::GreaterEqual),
    (">", Comparison::Greater),
];

fn is_quoted(text: &str) -> bool {
    !text.is_empty() && text.starts_with('"') && text.ends_with('"')
}

/// Compare two already-evaluated operands, returning `"1"` or `"0"`.
///
/// Regex comparators compile the right operand case-insensitively and test
/// for a match anywhere in the left one; an invalid pattern compares false
/// even under negation. Mask comparators use `*`-wildcard matching. The
/// rest compare numerically only when neither operand is empty, neither is
/// quote-delimited, and both parse completely as base-10 integers;
/// otherwise they fall back to raw byte-wise string comparison.
fn compare(value1: &str, comparison: Comparison, value2: &str) -> String {
    use std::cmp::Ordering;

    match comparison {
        Comparison::RegexMatch | Comparison::RegexNotMatch => {
            let Ok(regex) = RegexBuilder::new(value2).case_insensitive(true).build() else {
                return bool_str(false);
            };
            let mut rc = regex.is_match(value1);
            if comparison == Comparison::RegexNotMatch {
                rc = !rc;
            }
            bool_str(rc)
        }
        Comparison::MaskMatch | Comparison::MaskNotMatch => {
            let mut rc = strings::match_mask(value1, value2, false);
            if comparison == Comparison::MaskNotMatch {
                rc = !rc;
            }
            bool_str(rc)
        }
        _ => {
            let force_string = value1.is_empty()
                || value2.is_empty()
                || (is_quoted(value1) && is_quoted(value2));
            let ordering = if force_string {
                value1.cmp(value2)
            } else {
                match (value1.parse::<i64>(), value2.parse::<i64>()) {
                    (Ok(a), Ok(b)) => a.cmp(&b),
                    _ => value1.cmp(value2),
                }
            };
            let rc = match comparison {
                Comparison::Equal => ordering == Ordering::Equal,
                Comparison::NotEqual => ordering != Ordering::Equal,
                Comparison::LessEqual => ordering != Ordering::Greater,
                Comparison::Less => ordering == Ordering::Less,
                Comparison::GreaterEqual => ordering != Ordering::Less,
                Comparison::Greater => ordering == Ordering::Greater,
                _ => false,
            };
            bool_str(rc)
        }
    }
}

/// Index of the `)` matching the `(` the text starts with, counting nesting.
fn matching_paren(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut level = 0u32;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b'(' => level += 1,
            b')' => {
                if level == 0 {
                    return Some(i);
                }
                level -= 1;
            }
            _ => {}
        }
    }
    None
}

// ── Options and environment ───────────────────────────────────────────────────

/// Evaluation options beyond plain substitution.
#[derive(Default)]
pub struct EvalOptions {
    /// Evaluate as a condition and return `"1"`/`"0"`.
    pub condition: bool,
    /// Custom placeholder delimiters; empty or absent means `${` / `}`.
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Values found in the extra-variables map are themselves substituted.
    pub extra_vars_eval: bool,
    /// With `regex_replace`, switches to regex-replace mode: every match of
    /// `regex` in the input is replaced by the evaluated replacement text,
    /// in which `${re:N}` is bound to the capture groups.
    pub regex: Option<Regex>,
    pub regex_replace: Option<String>,
}

/// The injected lookups evaluation runs against.
///
/// Hands out results only; nothing here is mutated by evaluation.
pub struct EvalEnv<'a> {
    pub hdata: &'a HdataRegistry,
    pub config: &'a ConfigRegistry,
    /// Seed for the default `window` pointer (and, through its `buffer`
    /// field, the default `buffer` pointer) when the caller supplies none.
    pub current_window: Option<Pointer>,
}

impl<'a> EvalEnv<'a> {
    pub fn new(hdata: &'a HdataRegistry, config: &'a ConfigRegistry) -> Self {
        EvalEnv {
            hdata,
            config,
            current_window: None,
        }
    }

    /// Substitute `${...}` placeholders in `expr`.
    ///
    /// `pointers` maps names to object roots for reflected paths;
    /// `extra_vars` is the highest-priority substitution source. Both are
    /// optional and never mutated.
    pub fn evaluate(
        &self,
        expr: &str,
        pointers: Option<&Hashtable>,
        extra_vars: Option<&Hashtable>,
    ) -> String {
        self.evaluate_with_options(expr, pointers, extra_vars, &EvalOptions::default())
    }

    /// Evaluate `expr` as a condition, returning `"1"` or `"0"`.
    pub fn evaluate_condition(
        &self,
        expr: &str,
        pointers: Option<&Hashtable>,
        extra_vars: Option<&Hashtable>,
    ) -> String {
        let options = EvalOptions {
            condition: true,
            ..EvalOptions::default()
        };
        self.evaluate_with_options(expr, pointers, extra_vars, &options)
    }

    pub fn evaluate_with_options(
        &self,
        expr: &str,
        pointers: Option<&Hashtable>,
        extra_vars: Option<&Hashtable>,
        options: &EvalOptions,
    ) -> String {
        // work on a private copy of the pointer map so the caller's is never
        // touched by the default seeding
        let mut effective = match pointers {
            Some(map) => map.dup(),
            None => Hashtable::with_types(32, HashtableType::String, HashtableType::Pointer),
        };
        if let Some(window) = &self.current_window {
            if !effective.has_key_str("window") {
                effective.set_pointer("window", window.clone());
            }
        }
        if !effective.has_key_str("buffer") {
            if let Some(window) = effective.get_pointer("window") {
                if let Some(window_hdata) = self.hdata.get("window") {
                    if let Some(buffer) = window_hdata.pointer(&window, "buffer") {
                        effective.set_pointer("buffer", buffer);
                    }
                }
            }
        }

        let prefix = match options.prefix.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_PREFIX,
        };
        let suffix = match options.suffix.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => DEFAULT_SUFFIX,
        };

        let ctx = EvalContext {
            env: self,
            pointers: &effective,
            extra_vars,
            extra_vars_eval: options.extra_vars_eval,
            prefix,
            suffix,
            regex_matches: RefCell::new(None),
            active_extra: RefCell::new(HashSet::new()),
            errors: Cell::new(0),
        };

        if options.condition {
            bool_str(is_true(&ctx.eval_condition(expr)))
        } else if let (Some(regex), Some(replace)) = (&options.regex, &options.regex_replace) {
            ctx.replace_regex(expr, regex, replace)
        } else {
            ctx.replace_vars(expr)
        }
    }
}

// ── Evaluation context ────────────────────────────────────────────────────────

struct RegexMatches {
    groups: Vec<Option<String>>,
    last_match: usize,
}

struct EvalContext<'a> {
    env: &'a EvalEnv<'a>,
    pointers: &'a Hashtable,
    extra_vars: Option<&'a Hashtable>,
    extra_vars_eval: bool,
    prefix: &'a str,
    suffix: &'a str,
    /// Capture groups of the regex-replace match currently being expanded.
    regex_matches: RefCell<Option<RegexMatches>>,
    /// Extra-variable names currently being expanded, to break reference
    /// cycles: while a name is active, its extra-vars entry is invisible.
    active_extra: RefCell<HashSet<String>>,
    errors: Cell<u32>,
}

impl<'a> EvalContext<'a> {
    fn replace_vars(&self, expr: &str) -> String {
        let mut errors = 0;
        let out = strings::replace_with_callback(
            expr,
            self.prefix,
            self.suffix,
            true,
            NO_REPLACE_PREFIXES,
            &mut |text| Some(self.resolve_var(text)),
            &mut errors,
        );
        self.errors.set(self.errors.get() + errors);
        out
    }

    // ── Conditions ────────────────────────────────────────────────────────────

    /// Find the first occurrence of `search` outside placeholder groups
    /// (and, with `parens`, outside parentheses). Byte offset into `text`.
    fn find_at_level(&self, text: &str, search: &str, parens: bool, escape: bool) -> Option<usize> {
        let s = text.as_bytes();
        let prefix = self.prefix.as_bytes();
        let suffix = self.suffix.as_bytes();
        let needle = search.as_bytes();
        let mut level = 0u32;
        let mut i = 0;
        while i < s.len() {
            if escape
                && s[i] == b'\\'
                && i + 1 < s.len()
                && (s[i + 1] == prefix[0] || (parens && s[i + 1] == b'('))
            {
                i += 1;
            } else if s[i..].starts_with(prefix) {
                level += 1;
                i += prefix.len();
            } else if parens && s[i] == b'(' {
                level += 1;
                i += 1;
            } else if s[i..].starts_with(suffix) {
                level = level.saturating_sub(1);
                i += suffix.len();
            } else if parens && s[i] == b')' {
                level = level.saturating_sub(1);
                i += 1;
            } else if level == 0 && s[i..].starts_with(needle) {
                return Some(i);
            } else {
                i += 1;
            }
        }
        None
    }

    /// The condition algorithm. See the module docs for why this is a scan,
    /// not a precedence climb.
    fn eval_condition(&self, expr: &str) -> String {
        let trimmed = expr.trim_matches(' ');
        if trimmed.is_empty() {
            return String::new();
        }
        let mut expr2 = trimmed.to_owned();

        // reduce leading parenthesized groups: evaluate the interior, splice
        // the result back in front of the trailing text, repeat
        while expr2.starts_with('(') {
            let Some(close) = matching_paren(&expr2) else {
                // unbalanced input degrades to false, never an error
                return String::new();
            };
            let inner = self.eval_condition(&expr2[1..close]);
            let rest = &expr2[close + 1..];
            if rest.is_empty() {
                return inner;
            }
            expr2 = format!("{inner} {rest}");
        }

        // first "&&", then first "||"; short-circuit on the left value
        for (op, is_and) in [("&&", true), ("||", false)] {
            let Some(pos) = self.find_at_level(&expr2, op, true, false) else {
                continue;
            };
            if pos == 0 {
                continue;
            }
            let left = expr2[..pos].trim_end_matches(' ');
            let rc = is_true(&self.eval_condition(left));
            if (!rc && is_and) || (rc && !is_and) {
                return bool_str(rc);
            }
            let right = expr2[pos + op.len()..].trim_start_matches(' ');
            return bool_str(is_true(&self.eval_condition(right)));
        }

        // comparators in fixed priority; an operator at position 0 leaves an
        // empty left operand, which forces string comparison
        for (op, comparison) in COMPARISONS {
            let Some(pos) = self.find_at_level(&expr2, op, true, false) else {
                continue;
            };
            let left = expr2[..pos].trim_end_matches(' ');
            let right = expr2[pos + op.len()..].trim_start_matches(' ');
            let (value1, value2) = if comparison.is_regex() {
                // regex operands get substitution only, so a pattern's own
                // syntax (leading parens, anchors) survives untouched
                (self.replace_vars(left), self.replace_vars(right))
            } else {
                (self.eval_condition(left), self.eval_condition(right))
            };
            return compare(&value1, comparison, &value2);
        }

        // no operator at all: the condition is the substituted text itself
        self.replace_vars(&expr2)
    }

    // ── Regex-replace mode ────────────────────────────────────────────────────

    fn replace_regex(&self, text: &str, regex: &Regex, replace: &str) -> String {
        let mut result = text.to_owned();
        let mut start_offset = 0usize;
        while start_offset < result.len() {
            let Some(caps) = regex.captures(&result[start_offset..]) else {
                break;
            };
            let m0 = caps.get(0).expect("group 0 always participates");
            // an empty match at the start of the search region would loop
            // forever; treat it as no match
            if m0.end() == 0 {
                break;
            }
            let mut groups: Vec<Option<String>> = Vec::with_capacity(caps.len());
            let mut last_match = 0;
            for (i, group) in caps.iter().enumerate() {
                if group.is_some() {
                    last_match = i;
                }
                groups.push(group.map(|m| m.as_str().to_owned()));
            }
            *self.regex_matches.borrow_mut() = Some(RegexMatches { groups, last_match });
            let replacement = self.replace_vars(replace);

            let abs_start = start_offset + m0.start();
            let abs_end = start_offset + m0.end();
            let reached_end = abs_end == result.len();
            result = format!(
                "{}{}{}",
                &result[..abs_start],
                replacement,
                &result[abs_end..]
            );
            if reached_end {
                break;
            }
            start_offset = abs_start + replacement.len();
        }
        *self.regex_matches.borrow_mut() = None;
        result
    }

    // ── Variable resolution ───────────────────────────────────────────────────

    /// Resolve one placeholder's text. Never fails; anything unresolvable is
    /// an empty string.
    fn resolve_var(&self, text: &str) -> String {
        // 1. caller-supplied extra variables
        if let Some(extra) = self.extra_vars {
            if !self.active_extra.borrow().contains(text) {
                if let Some(value) = extra.get_str(text) {
                    if self.extra_vars_eval {
                        self.active_extra.borrow_mut().insert(text.to_owned());
                        let out = self.replace_vars(value);
                        self.active_extra.borrow_mut().remove(text);
                        return out;
                    }
                    return value.to_owned();
                }
            }
        }

        // 2. modifier prefixes
        if let Some(rest) = text.strip_prefix("eval:") {
            return self.replace_vars(rest);
        }
        if let Some(rest) = text.strip_prefix("esc:") {
            return strings::convert_escaped_chars(rest);
        }
        if text.starts_with('\\') && text.len() > 1 && !text[1..].starts_with('\\') {
            return strings::convert_escaped_chars(text);
        }
        if let Some(rest) = text.strip_prefix("lower:") {
            return rest.to_lowercase();
        }
        if let Some(rest) = text.strip_prefix("upper:") {
            return rest.to_uppercase();
        }
        if let Some(rest) = text.strip_prefix("hide:") {
            return self.resolve_hide(rest);
        }
        if let Some(rest) = text.strip_prefix("cut:") {
            return self.resolve_cut(rest);
        }
        if let Some(rest) = text.strip_prefix("re:") {
            return self.resolve_re(rest);
        }
        if let Some(rest) = text.strip_prefix("length:") {
            return rest.chars().count().to_string();
        }
        if let Some(name) = text.strip_prefix("env:") {
            if let Ok(value) = std::env::var(name) {
                return value;
            }
            // fall through like any other unresolved name
        }
        if let Some(rest) = text.strip_prefix("if:") {
            return self.resolve_if(rest);
        }

        // 3. option namespace
        if let Some(value) = self.env.config.string_value(text) {
            return value;
        }

        // 4. buffer-local variable on the "buffer" root
        if let Some(buffer) = self.pointers.get_pointer("buffer") {
            if let Some(buffer_hdata) = self.env.hdata.get("buffer") {
                if let Some(locals) = buffer_hdata.hashtable(&buffer, "local_variables") {
                    if let Some(value) = locals.borrow().get_str(text) {
                        return value.to_owned();
                    }
                }
            }
        }

        // 5. reflected object path
        self.resolve_hdata_path(text)
    }

    /// `hide:char,string`: every character of the string becomes `char`
    /// (which may be several characters, or empty). When the hiding string
    /// itself contains a comma, `;` separates instead.
    fn resolve_hide(&self, args: &str) -> String {
        let sep = if args.starts_with(',') { ';' } else { ',' };
        let Some(pos) = args.find(sep) else {
            return String::new();
        };
        let hide_char = &args[..pos];
        let mut out = String::new();
        for _ in args[pos + 1..].chars() {
            out.push_str(hide_char);
        }
        out
    }

    /// `cut:max,suffix,string` (or `cut:+max,...` to count the suffix toward
    /// the budget).
    fn resolve_cut(&self, args: &str) -> String {
        let (count_suffix, rest) = match args.strip_prefix('+') {
            Some(r) => (true, r),
            None => (false, args),
        };
        let Some(pos) = rest.find(',') else {
            return String::new();
        };
        let Some(pos2) = rest[pos + 1..].find(',').map(|p| pos + 1 + p) else {
            return String::new();
        };
        let Ok(max) = rest[..pos].parse::<i64>() else {
            return String::new();
        };
        if max < 0 {
            return String::new();
        }
        strings::cut(&rest[pos2 + 1..], max as usize, count_suffix, &rest[pos + 1..pos2])
    }

    /// `re:N` (capture group N), `re:+` (highest-numbered group), `re:#`
    /// (number of the highest group). Empty outside regex-replace mode.
    fn resolve_re(&self, arg: &str) -> String {
        let matches = self.regex_matches.borrow();
        let Some(m) = matches.as_ref() else {
            return String::new();
        };
        if arg == "#" {
            return m.last_match.to_string();
        }
        let number = if arg == "+" {
            m.last_match as i64
        } else {
            arg.parse::<i64>().unwrap_or(-1)
        };
        if number >= 0 && (number as usize) <= m.last_match {
            m.groups
                .get(number as usize)
                .cloned()
                .flatten()
                .unwrap_or_default()
        } else {
            String::new()
        }
    }

    /// `if:condition?value_if_true:value_if_false`. With no `?`, the result
    /// is the condition's own `"1"`/`"0"`; a missing false-branch yields an
    /// empty string.
    fn resolve_if(&self, text: &str) -> String {
        let qpos = self.find_at_level(text, "?", false, true);
        let (condition, branches) = match qpos {
            Some(q) => (&text[..q], Some(&text[q + 1..])),
            None => (text, None),
        };
        let rc = is_true(&self.eval_condition(condition));
        match (rc, branches) {
            (rc, None) => bool_str(rc),
            (true, Some(rest)) => {
                let then_branch = match self.find_at_level(rest, ":", false, true) {
                    Some(c) => &rest[..c],
                    None => rest,
                };
                self.replace_vars(then_branch)
            }
            (false, Some(rest)) => match self.find_at_level(rest, ":", false, true) {
                Some(c) => self.replace_vars(&rest[c + 1..]),
                None => String::new(),
            },
        }
    }

    // ── Hdata paths ───────────────────────────────────────────────────────────

    /// Resolve `name.field.field`, `name[list].field...`, or
    /// `name[0xADDR].field...`.
    fn resolve_hdata_path(&self, text: &str) -> String {
        let (head, rest) = match text.find('.') {
            Some(pos) if pos > 0 => (&text[..pos], Some(&text[pos + 1..])),
            _ => (text, None),
        };

        let mut name = head.to_owned();
        let mut list_name: Option<String> = None;
        if let Some(open) = name.find('[') {
            if open > 0 {
                if let Some(close) = name[open + 1..].find(']') {
                    if close > 0 {
                        list_name = Some(name[open + 1..open + 1 + close].to_owned());
                    }
                }
                name.truncate(open);
            }
        }

        let Some(hdata) = self.env.hdata.get(&name) else {
            return String::new();
        };

        let mut pointer: Option<Pointer> = None;
        if let Some(list) = &list_name {
            if let Some(hex) = list.strip_prefix("0x") {
                // a raw address is only trusted if it resolves to a live
                // member of a checked list
                match usize::from_str_radix(hex, 16) {
                    Ok(addr) => match hdata.find_by_address(addr) {
                        Some(p) => pointer = Some(p),
                        None => return String::new(),
                    },
                    Err(_) => return String::new(),
                }
            } else {
                pointer = hdata.get_list(list);
            }
        }
        if pointer.is_none() {
            pointer = self.pointers.get_pointer(&name);
        }
        let Some(pointer) = pointer else {
            return String::new();
        };
        self.hdata_value(&hdata, &pointer, rest)
    }

    /// Walk the remaining dotted path through typed accessors and stringify
    /// the final field.
    fn hdata_value(&self, hdata: &Rc<Hdata>, pointer: &Pointer, path: Option<&str>) -> String {
        let path = match path {
            Some(p) if !p.is_empty() => p,
            _ => return format!("0x{:x}", pointer_address(pointer)),
        };
        let (var_name, rest) = match path.find('.') {
            Some(pos) if pos > 0 => (&path[..pos], Some(&path[pos + 1..])),
            _ => (path, None),
        };
        let Some(var_type) = hdata.get_var_type(var_name) else {
            return String::new();
        };
        match var_type {
            HdataType::Char => hdata.char(pointer, var_name).to_string(),
            HdataType::Integer => hdata.integer(pointer, var_name).to_string(),
            HdataType::Long => hdata.long(pointer, var_name).to_string(),
            HdataType::Time => hdata.time(pointer, var_name).to_string(),
            HdataType::String | HdataType::SharedString => {
                hdata.string(pointer, var_name).unwrap_or_default()
            }
            HdataType::Hashtable => {
                let table = hdata.hashtable(pointer, var_name);
                match rest {
                    // the whole remaining path is the key
                    Some(key) => match table {
                        Some(table) => {
                            let table = table.borrow();
                            match table.get(&Value::String(key.to_owned())) {
                                Some(value) => value.display_string().unwrap_or_default(),
                                None => String::new(),
                            }
                        }
                        None => String::new(),
                    },
                    None => format!(
                        "0x{:x}",
                        table
                            .map(|t| Rc::as_ptr(&t) as *const () as usize)
                            .unwrap_or(0)
                    ),
                }
            }
            HdataType::Pointer => {
                let next = hdata.pointer(pointer, var_name);
                let Some(remaining) = rest else {
                    return format!(
                        "0x{:x}",
                        next.as_ref().map(pointer_address).unwrap_or(0)
                    );
                };
                // a pointer with trailing path recurses into its declared
                // nested type; without a declaration the address is final
                let Some(nested_name) = hdata.get_var_hdata(var_name) else {
                    return format!(
                        "0x{:x}",
                        next.as_ref().map(pointer_address).unwrap_or(0)
                    );
                };
                let Some(nested) = self.env.hdata.get(&nested_name) else {
                    return String::new();
                };
                match next {
                    Some(p) => self.hdata_value(&nested, &p, Some(remaining)),
                    None => String::new(),
                }
            }
            HdataType::Other => String::new(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
