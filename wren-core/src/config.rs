//! Flat `"file.section.option"` option namespace.
//!
//! The registry is the in-memory source the evaluator consults when a
//! placeholder names an option. Each option is typed, and the string form
//! handed back to substitution depends on that type (a boolean never renders
//! as `"true"`, an enum renders its label, a color its canonical name).
//! On-disk persistence and reload live elsewhere; this is only the live
//! lookup surface.

use std::rc::Rc;

use crate::hashtable::{Hashtable, HashtableType, Pointer};

// ── Option values ─────────────────────────────────────────────────────────────

/// A typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    /// An integer constrained to a set of labels; the label is what users
    /// see and what substitution produces.
    Enum { index: usize, labels: Vec<String> },
    String(String),
    /// Canonical color name, e.g. `"lightred"`.
    Color(String),
}

impl OptionValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Boolean(_) => "boolean",
            OptionValue::Integer(_) => "integer",
            OptionValue::Enum { .. } => "enum",
            OptionValue::String(_) => "string",
            OptionValue::Color(_) => "color",
        }
    }

    /// String form used by variable substitution.
    pub fn display_string(&self) -> String {
        match self {
            OptionValue::Boolean(true) => "1".to_owned(),
            OptionValue::Boolean(false) => "0".to_owned(),
            OptionValue::Integer(n) => n.to_string(),
            OptionValue::Enum { index, labels } => {
                labels.get(*index).cloned().unwrap_or_default()
            }
            OptionValue::String(s) => s.clone(),
            OptionValue::Color(name) => name.clone(),
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

const CONFIG_OPTIONS_SIZE: usize = 256;

/// Live option store, keyed by full `"file.section.option"` name.
///
/// Constructed at startup and injected into the evaluator; never reached
/// through a hidden global.
pub struct ConfigRegistry {
    options: Hashtable,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        ConfigRegistry {
            options: Hashtable::with_types(
                CONFIG_OPTIONS_SIZE,
                HashtableType::String,
                HashtableType::Pointer,
            ),
        }
    }

    /// Set (or overwrite) an option. An empty name is refused.
    pub fn set(&mut self, name: &str, value: OptionValue) -> bool {
        if name.is_empty() {
            return false;
        }
        self.options.set_pointer(name, Rc::new(value) as Pointer)
    }

    /// Typed value of an option, `None` if absent.
    pub fn lookup(&self, name: &str) -> Option<Rc<OptionValue>> {
        let p = self.options.get_pointer(name)?;
        p.downcast::<OptionValue>().ok()
    }

    /// `(type name, stringified value)` of an option, `None` if absent.
    pub fn type_and_value(&self, name: &str) -> Option<(&'static str, String)> {
        let value = self.lookup(name)?;
        Some((value.type_name(), value.display_string()))
    }

    /// Stringified value of an option, `None` if absent.
    pub fn string_value(&self, name: &str) -> Option<String> {
        Some(self.lookup(name)?.display_string())
    }

    /// Remove an option. Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        if !self.options.has_key_str(name) {
            return false;
        }
        self.options.remove_str(name);
        true
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
