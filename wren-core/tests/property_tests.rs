use std::collections::HashMap;

use proptest::prelude::*;

use wren_core::{strings, Hashtable, HashtableType, Session, Value};

fn string_table(size: usize) -> Hashtable {
    Hashtable::with_types(size, HashtableType::String, HashtableType::String)
}

proptest! {
    /// get(set(h, key, value), key) == value, for any key and value.
    #[test]
    fn get_after_set(key in "\\PC{0,24}", value in "\\PC{0,24}") {
        let mut table = string_table(16);
        prop_assert!(table.set_str(&key, &value));
        prop_assert_eq!(table.get_str(&key), Some(value.as_str()));
        prop_assert!(table.has_key_str(&key));
    }
}

proptest! {
    /// has_key is true iff the key was set and not subsequently removed,
    /// checked against a HashMap oracle over an arbitrary op sequence.
    #[test]
    fn has_key_tracks_history(
        ops in prop::collection::vec(("[a-h]", "[a-z]{0,4}", any::<bool>()), 0..64),
    ) {
        let mut table = string_table(4); // few buckets, many collisions
        let mut oracle: HashMap<String, String> = HashMap::new();
        for (key, value, insert) in &ops {
            if *insert {
                table.set_str(key, value);
                oracle.insert(key.clone(), value.clone());
            } else {
                table.remove_str(key);
                oracle.remove(key);
            }
        }
        prop_assert_eq!(table.len(), oracle.len());
        for key in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            prop_assert_eq!(table.has_key_str(key), oracle.contains_key(key), "key {}", key);
            prop_assert_eq!(table.get_str(key), oracle.get(key).map(String::as_str));
        }
    }
}

proptest! {
    /// dup yields identical content and identical export for any history of
    /// set/remove calls.
    #[test]
    fn dup_preserves_export(
        ops in prop::collection::vec(("[a-h]", "[a-z]{0,4}", any::<bool>()), 0..64),
    ) {
        let mut table = string_table(4);
        for (key, value, insert) in &ops {
            if *insert {
                table.set_str(key, value);
            } else {
                table.remove_str(key);
            }
        }
        let copy = table.dup();
        prop_assert_eq!(copy.len(), table.len());
        prop_assert_eq!(copy.get_string("keys_values"), table.get_string("keys_values"));
        prop_assert_eq!(copy.get_string("keys"), table.get_string("keys"));
    }
}

proptest! {
    /// remove_all run twice leaves the table empty and usable, both times.
    #[test]
    fn remove_all_twice(keys in prop::collection::vec("[a-z]{1,6}", 0..32)) {
        let mut table = string_table(8);
        for key in &keys {
            table.set_str(key, "v");
        }
        table.remove_all();
        prop_assert_eq!(table.len(), 0);
        table.remove_all();
        prop_assert_eq!(table.len(), 0);
        table.set_str("k", "v");
        prop_assert_eq!(table.get_str("k"), Some("v"));
    }
}

proptest! {
    /// A stored null value is present but reads as absent.
    #[test]
    fn null_values_are_present(key in "[a-z]{1,8}") {
        let mut table = string_table(8);
        table.set(Value::String(key.clone()), None);
        prop_assert!(table.has_key_str(&key));
        prop_assert!(table.get_str(&key).is_none());
    }
}

proptest! {
    /// The evaluator never panics, whatever the input, and a condition
    /// always reduces to "0" or "1".
    #[test]
    fn evaluator_never_panics(expr in "\\PC{0,60}") {
        let session = Session::new();
        let env = session.eval_env();
        let _ = env.evaluate(&expr, None, None);
        let condition = env.evaluate_condition(&expr, None, None);
        prop_assert!(condition == "0" || condition == "1");
    }
}

proptest! {
    /// Nested placeholder soup must degrade, never abort.
    #[test]
    fn placeholder_soup_never_panics(expr in r"[\\${}a-z<>=&|()!~ ]{0,40}") {
        let session = Session::new();
        let env = session.eval_env();
        let _ = env.evaluate(&expr, None, None);
        let _ = env.evaluate_condition(&expr, None, None);
    }
}

proptest! {
    /// cut never yields more characters than the budget plus the suffix.
    #[test]
    fn cut_respects_budget(text in "\\PC{0,40}", max in 0usize..20) {
        let out = strings::cut(&text, max, false, "+");
        prop_assert!(out.chars().count() <= max + 1);
        // counting the suffix keeps the total within max (plus the suffix
        // itself when max is smaller than the suffix)
        let counted = strings::cut(&text, max, true, "+");
        prop_assert!(counted.chars().count() <= max + 1);
        if max >= 1 {
            prop_assert!(counted.chars().count() <= max);
        }
    }
}

proptest! {
    /// "*" matches any text; text always matches itself as a mask when it
    /// contains no wildcard.
    #[test]
    fn mask_identities(text in "[a-zA-Z0-9 ]{0,24}") {
        prop_assert!(strings::match_mask(&text, "*", false));
        if !text.is_empty() {
            prop_assert!(strings::match_mask(&text, &text, true));
        }
    }
}
