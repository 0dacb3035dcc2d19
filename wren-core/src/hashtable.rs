//! Generic key/value container with typed slots and deterministic iteration.
//!
//! Keys and values are tagged unions ([`Value`]) so one container type can
//! hold integers, strings, opaque object handles, raw byte buffers, and
//! timestamps. Two orders are maintained at once:
//!
//! - each bucket chain is kept sorted by the key-compare callback, so the
//!   per-bucket layout depends only on the *set* of keys, never on the
//!   insertion history — this is what makes [`Hashtable::dup`] reproduce an
//!   identical layout;
//! - a separate oldest/newest chain records insertion order, which drives
//!   [`Hashtable::map`] and the string exports.
//!
//! The bucket count is fixed at creation. It is not a capacity limit, only
//! the width of the index array: more buckets, shorter chains.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

/// Opaque shared handle to an arbitrary object, used for `"pointer"` slots.
///
/// Identity is the allocation address (see [`pointer_address`]); two handles
/// are the same pointer iff they share the allocation.
pub type Pointer = Rc<dyn Any>;

/// Address of the allocation behind a [`Pointer`], for identity checks and
/// `0x...` rendering.
pub fn pointer_address(pointer: &Pointer) -> usize {
    Rc::as_ptr(pointer) as *const () as usize
}

// ── Types ─────────────────────────────────────────────────────────────────────

/// Slot type tag for keys or values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashtableType {
    Integer,
    String,
    Pointer,
    Buffer,
    Time,
}

impl HashtableType {
    /// Parse a type name (case-insensitive). Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            _ if name.eq_ignore_ascii_case("integer") => Some(HashtableType::Integer),
            _ if name.eq_ignore_ascii_case("string") => Some(HashtableType::String),
            _ if name.eq_ignore_ascii_case("pointer") => Some(HashtableType::Pointer),
            _ if name.eq_ignore_ascii_case("buffer") => Some(HashtableType::Buffer),
            _ if name.eq_ignore_ascii_case("time") => Some(HashtableType::Time),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashtableType::Integer => "integer",
            HashtableType::String => "string",
            HashtableType::Pointer => "pointer",
            HashtableType::Buffer => "buffer",
            HashtableType::Time => "time",
        }
    }
}

/// A key or value stored in a [`Hashtable`].
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    String(String),
    /// A null pointer is representable (`None`) and distinct from an absent
    /// item.
    Pointer(Option<Pointer>),
    Buffer(Vec<u8>),
    Time(i64),
}

impl Value {
    pub fn kind(&self) -> HashtableType {
        match self {
            Value::Integer(_) => HashtableType::Integer,
            Value::String(_) => HashtableType::String,
            Value::Pointer(_) => HashtableType::Pointer,
            Value::Buffer(_) => HashtableType::Buffer,
            Value::Time(_) => HashtableType::Time,
        }
    }

    /// String view of the value for iteration and variable substitution.
    ///
    /// Buffers are opaque bytes, not text, so they are the one
    /// non-stringifiable kind.
    pub fn display_string(&self) -> Option<String> {
        match self {
            Value::Integer(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Pointer(p) => Some(format!(
                "0x{:x}",
                p.as_ref().map(pointer_address).unwrap_or(0)
            )),
            Value::Buffer(_) => None,
            Value::Time(t) => Some(t.to_string()),
        }
    }

    /// String form used by the `keys`/`values` exports. Unlike
    /// [`Value::display_string`] this never fails: buffers render as
    /// lowercase hex of their content, so re-exporting a [`Hashtable::dup`]
    /// is byte-identical to exporting the original.
    fn export_string(&self) -> String {
        match self {
            Value::Buffer(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2);
                for b in bytes {
                    let _ = write!(out, "{b:02x}");
                }
                out
            }
            other => other.display_string().unwrap_or_default(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Pointer(p) => write!(
                f,
                "Pointer(0x{:x})",
                p.as_ref().map(pointer_address).unwrap_or(0)
            ),
            Value::Buffer(b) => write!(f, "Buffer({} bytes)", b.len()),
            Value::Time(t) => write!(f, "Time({t})"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        default_compare(self, other) == Ordering::Equal && self.kind() == other.kind()
    }
}

// ── Callbacks ─────────────────────────────────────────────────────────────────

/// Custom hash function over a key.
pub type HashCallback = Rc<dyn Fn(&Value) -> u64>;

/// Custom total order over keys; `Equal` means "same key".
pub type CompareCallback = Rc<dyn Fn(&Value, &Value) -> Ordering>;

/// Variant of djb2 over raw bytes: `h ^= (h << 5) + (h >> 2) + byte`.
pub fn hash_djb2(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &b in bytes {
        hash ^= hash
            .wrapping_shl(5)
            .wrapping_add(hash >> 2)
            .wrapping_add(b as u64);
    }
    hash
}

fn default_hash(key: &Value) -> u64 {
    match key {
        Value::Integer(n) => *n as u64,
        Value::String(s) => hash_djb2(s.as_bytes()),
        Value::Pointer(p) => p.as_ref().map(pointer_address).unwrap_or(0) as u64,
        // buffer keys require a custom hash callback; constructor enforces it
        Value::Buffer(_) => 0,
        Value::Time(t) => *t as u64,
    }
}

fn default_compare(key1: &Value, key2: &Value) -> Ordering {
    match (key1, key2) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
        (Value::Pointer(a), Value::Pointer(b)) => {
            let pa = a.as_ref().map(pointer_address).unwrap_or(0);
            let pb = b.as_ref().map(pointer_address).unwrap_or(0);
            pa.cmp(&pb)
        }
        (Value::Buffer(a), Value::Buffer(b)) => a.cmp(b),
        (Value::Time(a), Value::Time(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

// ── Hashtable ─────────────────────────────────────────────────────────────────

struct Item {
    key: Value,
    value: Option<Value>,
    bucket: usize,
    prev_in_bucket: Option<usize>,
    next_in_bucket: Option<usize>,
    prev_created: Option<usize>,
    next_created: Option<usize>,
}

/// The container. See the module docs for the two orders it maintains.
pub struct Hashtable {
    buckets: Vec<Option<usize>>,
    items: Vec<Option<Item>>,
    free_slots: Vec<usize>,
    oldest: Option<usize>,
    newest: Option<usize>,
    count: usize,
    type_keys: HashtableType,
    type_values: HashtableType,
    hash_cb: Option<HashCallback>,
    cmp_cb: Option<CompareCallback>,
}

impl Hashtable {
    /// Create a table from type *names* (`"integer"`, `"string"`,
    /// `"pointer"`, `"buffer"`, `"time"`, case-insensitive).
    ///
    /// Returns `None` if `size <= 0`, a type name is unrecognized, or keys
    /// are buffers (buffer keys need both callbacks; use
    /// [`Hashtable::with_callbacks`]).
    pub fn new(size: i32, type_keys: &str, type_values: &str) -> Option<Self> {
        Self::with_callbacks(size, type_keys, type_values, None, None)
    }

    /// Like [`Hashtable::new`] with custom hash/compare callbacks.
    pub fn with_callbacks(
        size: i32,
        type_keys: &str,
        type_values: &str,
        hash_cb: Option<HashCallback>,
        cmp_cb: Option<CompareCallback>,
    ) -> Option<Self> {
        if size <= 0 {
            return None;
        }
        let type_keys = HashtableType::from_name(type_keys)?;
        let type_values = HashtableType::from_name(type_values)?;
        if type_keys == HashtableType::Buffer && (hash_cb.is_none() || cmp_cb.is_none()) {
            return None;
        }
        Some(Self::build(size as usize, type_keys, type_values, hash_cb, cmp_cb))
    }

    /// Infallible constructor for internal tables with statically known
    /// types.
    pub fn with_types(size: usize, type_keys: HashtableType, type_values: HashtableType) -> Self {
        Self::build(size.max(1), type_keys, type_values, None, None)
    }

    fn build(
        size: usize,
        type_keys: HashtableType,
        type_values: HashtableType,
        hash_cb: Option<HashCallback>,
        cmp_cb: Option<CompareCallback>,
    ) -> Self {
        Hashtable {
            buckets: vec![None; size],
            items: Vec::new(),
            free_slots: Vec::new(),
            oldest: None,
            newest: None,
            count: 0,
            type_keys,
            type_values,
            hash_cb,
            cmp_cb,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bucket count chosen at creation.
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    pub fn type_keys(&self) -> HashtableType {
        self.type_keys
    }

    pub fn type_values(&self) -> HashtableType {
        self.type_values
    }

    fn item(&self, slot: usize) -> &Item {
        self.items[slot].as_ref().unwrap()
    }

    fn item_mut(&mut self, slot: usize) -> &mut Item {
        self.items[slot].as_mut().unwrap()
    }

    fn hash_key(&self, key: &Value) -> u64 {
        match &self.hash_cb {
            Some(cb) => cb(key),
            None => default_hash(key),
        }
    }

    fn compare_keys(&self, key1: &Value, key2: &Value) -> Ordering {
        match &self.cmp_cb {
            Some(cb) => cb(key1, key2),
            None => default_compare(key1, key2),
        }
    }

    fn bucket_of(&self, key: &Value) -> usize {
        (self.hash_key(key) % self.buckets.len() as u64) as usize
    }

    fn find_slot(&self, key: &Value) -> Option<usize> {
        if key.kind() != self.type_keys {
            return None;
        }
        let mut cur = self.buckets[self.bucket_of(key)];
        while let Some(slot) = cur {
            match self.compare_keys(key, &self.item(slot).key) {
                Ordering::Greater => cur = self.item(slot).next_in_bucket,
                Ordering::Equal => return Some(slot),
                Ordering::Less => return None,
            }
        }
        None
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Unique-key upsert.
    ///
    /// Overwriting an existing key drops the old value in place, keeping the
    /// item's bucket-chain position. A new key is linked into its bucket in
    /// compare order and appended to the insertion chain.
    ///
    /// Returns `false` (and does nothing) on a type-tag mismatch or an empty
    /// buffer key/value.
    pub fn set(&mut self, key: Value, value: Option<Value>) -> bool {
        if key.kind() != self.type_keys {
            return false;
        }
        if let Some(v) = &value {
            if v.kind() != self.type_values {
                return false;
            }
        }
        if matches!(&key, Value::Buffer(b) if b.is_empty()) {
            return false;
        }
        if matches!(&value, Some(Value::Buffer(b)) if b.is_empty()) {
            return false;
        }

        let bucket = self.bucket_of(&key);
        let mut pos: Option<usize> = None;
        let mut cur = self.buckets[bucket];
        while let Some(slot) = cur {
            match self.compare_keys(&key, &self.item(slot).key) {
                Ordering::Greater => {
                    pos = Some(slot);
                    cur = self.item(slot).next_in_bucket;
                }
                Ordering::Equal => {
                    // overwrite in place, chain position untouched
                    self.item_mut(slot).value = value;
                    return true;
                }
                Ordering::Less => break,
            }
        }

        let item = Item {
            key,
            value,
            bucket,
            prev_in_bucket: pos,
            next_in_bucket: cur,
            prev_created: self.newest,
            next_created: None,
        };
        let slot = match self.free_slots.pop() {
            Some(s) => {
                self.items[s] = Some(item);
                s
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        };
        match pos {
            Some(p) => self.item_mut(p).next_in_bucket = Some(slot),
            None => self.buckets[bucket] = Some(slot),
        }
        if let Some(n) = cur {
            self.item_mut(n).prev_in_bucket = Some(slot);
        }
        match self.newest {
            Some(n) => self.item_mut(n).next_created = Some(slot),
            None => self.oldest = Some(slot),
        }
        self.newest = Some(slot);
        self.count += 1;
        true
    }

    /// Remove a key. A miss is a no-op.
    pub fn remove(&mut self, key: &Value) {
        if let Some(slot) = self.find_slot(key) {
            self.remove_slot(slot);
        }
    }

    fn remove_slot(&mut self, slot: usize) {
        let item = self.items[slot].take().unwrap();
        match item.prev_in_bucket {
            Some(p) => self.item_mut(p).next_in_bucket = item.next_in_bucket,
            None => self.buckets[item.bucket] = item.next_in_bucket,
        }
        if let Some(n) = item.next_in_bucket {
            self.item_mut(n).prev_in_bucket = item.prev_in_bucket;
        }
        match item.prev_created {
            Some(p) => self.item_mut(p).next_created = item.next_created,
            None => self.oldest = item.next_created,
        }
        match item.next_created {
            Some(n) => self.item_mut(n).prev_created = item.prev_created,
            None => self.newest = item.prev_created,
        }
        self.free_slots.push(slot);
        self.count -= 1;
    }

    /// Drop every item. Bucket storage stays allocated (and empty), so the
    /// table is immediately reusable.
    pub fn remove_all(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = None;
        }
        self.items.clear();
        self.free_slots.clear();
        self.oldest = None;
        self.newest = None;
        self.count = 0;
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    /// Value stored for `key`. `None` means "absent **or** stored null";
    /// [`Hashtable::has_key`] disambiguates.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.find_slot(key)
            .and_then(|slot| self.item(slot).value.as_ref())
    }

    pub fn has_key(&self, key: &Value) -> bool {
        self.find_slot(key).is_some()
    }

    // ── Iteration ─────────────────────────────────────────────────────────────

    /// Visit every item in insertion order.
    pub fn map(&self, mut cb: impl FnMut(&Value, Option<&Value>)) {
        let mut cur = self.oldest;
        while let Some(slot) = cur {
            let item = self.item(slot);
            cb(&item.key, item.value.as_ref());
            cur = item.next_created;
        }
    }

    /// Visit every item in insertion order as string views.
    ///
    /// Items whose key cannot stringify (buffer keys) are skipped; a null
    /// value arrives as `None`.
    pub fn map_string(&self, mut cb: impl FnMut(&str, Option<&str>)) {
        self.map(|key, value| {
            if let Some(key_str) = key.display_string() {
                let value_str = value.and_then(Value::display_string);
                cb(&key_str, value_str.as_deref());
            }
        });
    }

    /// Iterator over `(key, value)` in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            table: self,
            cur: self.oldest,
        }
    }

    /// Deep copy with the same bucket count, type tags, and callbacks.
    ///
    /// Because bucket chains are compare-ordered, the copy's per-bucket
    /// layout is identical to the original's; the insertion chain is
    /// replayed in order too.
    pub fn dup(&self) -> Hashtable {
        let mut out = Hashtable::build(
            self.buckets.len(),
            self.type_keys,
            self.type_values,
            self.hash_cb.clone(),
            self.cmp_cb.clone(),
        );
        self.map(|key, value| {
            out.set(key.clone(), value.cloned());
        });
        out
    }

    // ── String properties ─────────────────────────────────────────────────────

    /// Export a property as a string.
    ///
    /// | Property             | Result                                  |
    /// |----------------------|-----------------------------------------|
    /// | `type_keys`          | key type name                           |
    /// | `type_values`        | value type name                         |
    /// | `keys`               | `key1,key2,...` (insertion order)       |
    /// | `keys_sorted`        | same, sorted                            |
    /// | `values`             | `value1,value2,...`                     |
    /// | `keys_values`        | `key1:value1,key2:value2,...`           |
    /// | `keys_values_sorted` | same, sorted by key                     |
    ///
    /// Null values render as `(null)`.
    pub fn get_string(&self, property: &str) -> Option<String> {
        if property.eq_ignore_ascii_case("type_keys") {
            return Some(self.type_keys.name().to_owned());
        }
        if property.eq_ignore_ascii_case("type_values") {
            return Some(self.type_values.name().to_owned());
        }

        let mut pairs: Vec<(String, String)> = Vec::with_capacity(self.count);
        self.map(|key, value| {
            let key_str = key.export_string();
            let value_str = match value {
                Some(v) => v.export_string(),
                None => "(null)".to_owned(),
            };
            pairs.push((key_str, value_str));
        });

        let (sorted, keys, values) = match property.to_ascii_lowercase().as_str() {
            "keys" => (false, true, false),
            "keys_sorted" => (true, true, false),
            "values" => (false, false, true),
            "keys_values" => (false, true, true),
            "keys_values_sorted" => (true, true, true),
            _ => return None,
        };
        if sorted {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
        }
        let joined = pairs
            .iter()
            .map(|(k, v)| {
                if keys && values {
                    format!("{k}:{v}")
                } else if keys {
                    k.clone()
                } else {
                    v.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        Some(joined)
    }

    // ── String-key convenience ────────────────────────────────────────────────

    /// `set` for string→string tables.
    pub fn set_str(&mut self, key: &str, value: &str) -> bool {
        self.set(
            Value::String(key.to_owned()),
            Some(Value::String(value.to_owned())),
        )
    }

    /// `get` for string-keyed tables holding string values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(&Value::String(key.to_owned())) {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn has_key_str(&self, key: &str) -> bool {
        self.has_key(&Value::String(key.to_owned()))
    }

    pub fn remove_str(&mut self, key: &str) {
        self.remove(&Value::String(key.to_owned()));
    }

    /// `set` for string→pointer tables.
    pub fn set_pointer(&mut self, key: &str, pointer: Pointer) -> bool {
        self.set(
            Value::String(key.to_owned()),
            Some(Value::Pointer(Some(pointer))),
        )
    }

    /// `get` for string-keyed tables holding pointer values.
    pub fn get_pointer(&self, key: &str) -> Option<Pointer> {
        match self.get(&Value::String(key.to_owned())) {
            Some(Value::Pointer(Some(p))) => Some(p.clone()),
            _ => None,
        }
    }
}

impl Clone for Hashtable {
    fn clone(&self) -> Self {
        self.dup()
    }
}

impl fmt::Debug for Hashtable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hashtable")
            .field("size", &self.buckets.len())
            .field("items_count", &self.count)
            .field("type_keys", &self.type_keys)
            .field("type_values", &self.type_values)
            .finish()
    }
}

/// See [`Hashtable::iter`].
pub struct Iter<'a> {
    table: &'a Hashtable,
    cur: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Value, Option<&'a Value>);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cur?;
        let item = self.table.item(slot);
        self.cur = item.next_created;
        Some((&item.key, item.value.as_ref()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn str_table(size: i32) -> Hashtable {
        Hashtable::new(size, "string", "string").unwrap()
    }

    // -- Construction ---------------------------------------------------------

    #[test]
    fn new_rejects_bad_size() {
        assert!(Hashtable::new(0, "string", "string").is_none());
        assert!(Hashtable::new(-8, "string", "string").is_none());
    }

    #[test]
    fn new_rejects_unknown_type() {
        assert!(Hashtable::new(8, "strnig", "string").is_none());
        assert!(Hashtable::new(8, "string", "float").is_none());
    }

    #[test]
    fn new_type_names_case_insensitive() {
        assert!(Hashtable::new(8, "STRING", "Integer").is_some());
    }

    #[test]
    fn buffer_keys_require_callbacks() {
        assert!(Hashtable::new(8, "buffer", "string").is_none());
        let hash: HashCallback = Rc::new(|k| match k {
            Value::Buffer(b) => hash_djb2(b),
            _ => 0,
        });
        let cmp: CompareCallback = Rc::new(default_compare);
        assert!(Hashtable::with_callbacks(8, "buffer", "string", Some(hash), Some(cmp)).is_some());
    }

    // -- set / get / has_key --------------------------------------------------

    #[test]
    fn set_then_get() {
        let mut h = str_table(32);
        assert!(h.set_str("abc", "def"));
        assert_eq!(h.get_str("abc"), Some("def"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn overwrite_keeps_count() {
        let mut h = str_table(32);
        h.set_str("abc", "old");
        h.set_str("abc", "new");
        assert_eq!(h.get_str("abc"), Some("new"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn get_missing_is_none() {
        let h = str_table(32);
        assert!(h.get_str("nope").is_none());
        assert!(!h.has_key_str("nope"));
    }

    #[test]
    fn null_value_present_but_none() {
        let mut h = str_table(32);
        h.set(Value::String("k".into()), None);
        assert!(h.has_key_str("k"));
        assert!(h.get(&Value::String("k".into())).is_none());
    }

    #[test]
    fn type_mismatch_rejected() {
        let mut h = str_table(32);
        assert!(!h.set(Value::Integer(1), Some(Value::String("x".into()))));
        assert!(!h.set(Value::String("x".into()), Some(Value::Integer(1))));
        assert!(h.is_empty());
    }

    #[test]
    fn integer_keys() {
        let mut h = Hashtable::new(8, "integer", "string").unwrap();
        h.set(Value::Integer(42), Some(Value::String("answer".into())));
        assert_eq!(
            h.get(&Value::Integer(42)),
            Some(&Value::String("answer".into()))
        );
        assert!(h.get(&Value::Integer(41)).is_none());
    }

    #[test]
    fn pointer_keys_compare_by_identity() {
        let a: Pointer = Rc::new(1u8);
        let b: Pointer = Rc::new(1u8);
        let mut h = Hashtable::new(8, "pointer", "string").unwrap();
        h.set(
            Value::Pointer(Some(a.clone())),
            Some(Value::String("a".into())),
        );
        assert!(h.has_key(&Value::Pointer(Some(a))));
        assert!(!h.has_key(&Value::Pointer(Some(b))));
    }

    // -- remove ---------------------------------------------------------------

    #[test]
    fn remove_one() {
        let mut h = str_table(32);
        h.set_str("a", "1");
        h.set_str("b", "2");
        h.remove_str("a");
        assert!(!h.has_key_str("a"));
        assert_eq!(h.get_str("b"), Some("2"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut h = str_table(32);
        h.set_str("a", "1");
        h.remove_str("zzz");
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn remove_all_twice() {
        let mut h = str_table(4);
        for i in 0..20 {
            h.set_str(&format!("k{i}"), "v");
        }
        h.remove_all();
        assert_eq!(h.len(), 0);
        h.remove_all();
        assert_eq!(h.len(), 0);
        // still usable afterwards
        h.set_str("again", "yes");
        assert_eq!(h.get_str("again"), Some("yes"));
    }

    // -- Iteration order ------------------------------------------------------

    #[test]
    fn map_in_insertion_order() {
        let mut h = str_table(2); // force collisions
        for key in ["delta", "alpha", "zulu", "bravo"] {
            h.set_str(key, key);
        }
        let mut seen = Vec::new();
        h.map(|k, _| {
            if let Value::String(s) = k {
                seen.push(s.clone());
            }
        });
        assert_eq!(seen, ["delta", "alpha", "zulu", "bravo"]);
    }

    #[test]
    fn insertion_order_survives_overwrite() {
        let mut h = str_table(8);
        h.set_str("a", "1");
        h.set_str("b", "2");
        h.set_str("a", "3"); // overwrite must not move "a" to the end
        let keys: Vec<String> = h
            .iter()
            .map(|(k, _)| match k {
                Value::String(s) => s.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn map_string_skips_buffer_keys() {
        let hash: HashCallback = Rc::new(|k| match k {
            Value::Buffer(b) => hash_djb2(b),
            _ => 0,
        });
        let cmp: CompareCallback = Rc::new(default_compare);
        let mut h =
            Hashtable::with_callbacks(8, "buffer", "string", Some(hash), Some(cmp)).unwrap();
        h.set(
            Value::Buffer(vec![1, 2, 3]),
            Some(Value::String("x".into())),
        );
        let mut calls = 0;
        h.map_string(|_, _| calls += 1);
        assert_eq!(calls, 0);
    }

    #[test]
    fn map_string_passes_null_as_none() {
        let mut h = str_table(8);
        h.set(Value::String("k".into()), None);
        let mut seen = Vec::new();
        h.map_string(|k, v| seen.push((k.to_owned(), v.map(str::to_owned))));
        assert_eq!(seen, [("k".to_owned(), None)]);
    }

    // -- dup ------------------------------------------------------------------

    #[test]
    fn dup_preserves_content_and_export() {
        let mut h = str_table(4);
        for i in 0..16 {
            h.set_str(&format!("key{i}"), &format!("value{i}"));
        }
        h.remove_str("key3");
        h.set_str("key7", "rewritten");
        let d = h.dup();
        assert_eq!(d.len(), h.len());
        assert_eq!(d.get_string("keys_values"), h.get_string("keys_values"));
        for i in 0..16 {
            let k = format!("key{i}");
            assert_eq!(d.get_str(&k), h.get_str(&k), "mismatch at {k}");
        }
    }

    #[test]
    fn dup_is_deep() {
        let mut h = str_table(8);
        h.set_str("a", "1");
        let mut d = h.dup();
        d.set_str("a", "2");
        assert_eq!(h.get_str("a"), Some("1"));
    }

    // -- String exports -------------------------------------------------------

    #[test]
    fn keys_values_export() {
        let mut h = str_table(8);
        h.set_str("b", "2");
        h.set_str("a", "1");
        assert_eq!(h.get_string("keys").as_deref(), Some("b,a"));
        assert_eq!(h.get_string("keys_sorted").as_deref(), Some("a,b"));
        assert_eq!(h.get_string("keys_values").as_deref(), Some("b:2,a:1"));
        assert_eq!(
            h.get_string("keys_values_sorted").as_deref(),
            Some("a:1,b:2")
        );
        assert_eq!(h.get_string("type_keys").as_deref(), Some("string"));
    }

    #[test]
    fn export_null_value() {
        let mut h = str_table(8);
        h.set(Value::String("k".into()), None);
        assert_eq!(h.get_string("keys_values").as_deref(), Some("k:(null)"));
    }

    #[test]
    fn unknown_property_is_none() {
        let h = str_table(8);
        assert!(h.get_string("bogus").is_none());
    }

    // -- Hash function --------------------------------------------------------

    #[test]
    fn djb2_variant_reference_values() {
        // h = 5381, then h ^= (h << 5) + (h >> 2) + byte for each byte
        let mut expected: u64 = 5381;
        for b in b"abc" {
            expected ^= expected
                .wrapping_shl(5)
                .wrapping_add(expected >> 2)
                .wrapping_add(*b as u64);
        }
        assert_eq!(hash_djb2(b"abc"), expected);
        assert_eq!(hash_djb2(b""), 5381);
        assert_ne!(hash_djb2(b"abc"), hash_djb2(b"abd"));
    }

    #[test]
    fn custom_hash_and_compare() {
        // case-insensitive string table
        let hash: HashCallback = Rc::new(|k| match k {
            Value::String(s) => hash_djb2(s.to_ascii_lowercase().as_bytes()),
            _ => 0,
        });
        let cmp: CompareCallback = Rc::new(|a, b| match (a, b) {
            (Value::String(x), Value::String(y)) => x
                .to_ascii_lowercase()
                .cmp(&y.to_ascii_lowercase()),
            _ => Ordering::Equal,
        });
        let mut h =
            Hashtable::with_callbacks(16, "string", "string", Some(hash), Some(cmp)).unwrap();
        h.set_str("Hello", "1");
        assert_eq!(h.get_str("hello"), Some("1"));
        h.set_str("HELLO", "2");
        assert_eq!(h.len(), 1);
    }
}
