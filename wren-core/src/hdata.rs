//! Runtime type descriptors for name-based field access and list traversal.
//!
//! An [`Hdata`] describes one reflectable type: its fields, how to step
//! through a linked list of its instances, and which mutations are allowed.
//! Instances are type-erased [`Pointer`] handles; each field carries accessor
//! closures built at registration time, so a caller can read `"number"` off a
//! buffer it only knows as an opaque handle. The descriptors themselves are
//! registered in a process-wide [`HdataRegistry`] and looked up by name.
//!
//! All metadata (field table, list-root table, registry index) is stored in
//! [`Hashtable`]s.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use crate::eval::EvalEnv;
use crate::hashtable::{pointer_address, Hashtable, HashtableType, Pointer, Value};

// ── Types ─────────────────────────────────────────────────────────────────────

/// Type tag of a reflected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdataType {
    Other,
    Char,
    Integer,
    Long,
    String,
    SharedString,
    Pointer,
    Time,
    Hashtable,
}

impl HdataType {
    pub fn name(self) -> &'static str {
        match self {
            HdataType::Other => "other",
            HdataType::Char => "char",
            HdataType::Integer => "integer",
            HdataType::Long => "long",
            HdataType::String => "string",
            HdataType::SharedString => "shared_string",
            HdataType::Pointer => "pointer",
            HdataType::Time => "time",
            HdataType::Hashtable => "hashtable",
        }
    }
}

/// How an array field's length is determined. A scalar field has no spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArraySize {
    /// `*`: walk the array at runtime, counting entries up to the first null.
    /// Only meaningful for pointer-like element types, since only those can
    /// self-terminate.
    SelfTerminated,
    /// Fixed length known at registration time.
    Fixed(usize),
    /// Length read from a sibling field's current integer value, which
    /// supports `count` + `items` field pairs.
    Var(String),
}

impl ArraySize {
    fn as_spec_string(&self) -> String {
        match self {
            ArraySize::SelfTerminated => "*".to_owned(),
            ArraySize::Fixed(n) => n.to_string(),
            ArraySize::Var(name) => name.clone(),
        }
    }
}

/// A value read from (or written to) a reflected field.
///
/// String and pointer-like variants are nullable, both because a field can
/// legitimately hold nothing and because a null entry terminates a
/// [`ArraySize::SelfTerminated`] array.
#[derive(Clone)]
pub enum FieldValue {
    Other,
    Char(char),
    Integer(i64),
    Long(i64),
    String(Option<String>),
    Pointer(Option<Pointer>),
    Time(i64),
    Hashtable(Option<Rc<RefCell<Hashtable>>>),
}

impl FieldValue {
    /// The zero/null value for a field type, returned on any access failure.
    fn null_of(var_type: HdataType) -> FieldValue {
        match var_type {
            HdataType::Other => FieldValue::Other,
            HdataType::Char => FieldValue::Char('\0'),
            HdataType::Integer => FieldValue::Integer(0),
            HdataType::Long => FieldValue::Long(0),
            HdataType::String | HdataType::SharedString => FieldValue::String(None),
            HdataType::Pointer => FieldValue::Pointer(None),
            HdataType::Time => FieldValue::Time(0),
            HdataType::Hashtable => FieldValue::Hashtable(None),
        }
    }

    fn is_null(&self) -> bool {
        matches!(
            self,
            FieldValue::String(None) | FieldValue::Pointer(None) | FieldValue::Hashtable(None)
        )
    }
}

/// Reads a field off an instance; `index` selects an array element.
pub type Getter = Rc<dyn Fn(&Pointer, Option<usize>) -> FieldValue>;

/// Writes a field on an instance. Returns `false` if the value cannot be
/// applied.
pub type Setter = Rc<dyn Fn(&Pointer, FieldValue) -> bool>;

/// Invoked by [`Hdata::update`] while the update guard is set; expected to
/// call [`Hdata::set`] for each accepted key and return the applied count.
pub type UpdateCallback = Rc<dyn Fn(&Hdata, &Pointer, &Hashtable) -> i32>;

/// Builds a [`Getter`] from a closure over the concrete instance type.
/// An instance of the wrong type reads as [`FieldValue::Other`].
pub fn getter<T: 'static>(f: impl Fn(&T, Option<usize>) -> FieldValue + 'static) -> Getter {
    Rc::new(
        move |instance: &Pointer, index: Option<usize>| match instance.downcast_ref::<T>() {
            Some(obj) => f(obj, index),
            None => FieldValue::Other,
        },
    )
}

/// Builds a [`Setter`] from a closure over the concrete instance type.
pub fn setter<T: 'static>(f: impl Fn(&T, FieldValue) -> bool + 'static) -> Setter {
    Rc::new(
        move |instance: &Pointer, value: FieldValue| match instance.downcast_ref::<T>() {
            Some(obj) => f(obj, value),
            None => false,
        },
    )
}

// ── Field and list descriptors ────────────────────────────────────────────────

struct HdataVar {
    var_type: HdataType,
    update_allowed: bool,
    array_size: Option<ArraySize>,
    hdata_name: Option<String>,
    getter: Getter,
    setter: Option<Setter>,
}

/// Membership in this list vouches for a pointer's validity; lists carrying
/// this flag are scanned by [`Hdata::check_pointer`] when no explicit root is
/// given.
pub const LIST_CHECK_POINTERS: u32 = 1;

/// The root closure is read on every lookup, so traversals always start from
/// the live list head, never a snapshot taken at registration time.
pub type ListRoot = Rc<dyn Fn() -> Option<Pointer>>;

struct HdataList {
    flags: u32,
    root: ListRoot,
}

// ── Hdata ─────────────────────────────────────────────────────────────────────

/// A registered type descriptor. See the module docs.
pub struct Hdata {
    name: String,
    var_prev: Option<String>,
    var_next: Option<String>,
    hash_var: RefCell<Hashtable>,
    hash_list: RefCell<Hashtable>,
    create_allowed: bool,
    delete_allowed: bool,
    update_cb: Option<UpdateCallback>,
    update_pending: Cell<bool>,
}

impl Hdata {
    /// `var_prev`/`var_next` name the pointer fields used by list traversal;
    /// a type that is not kept in a list passes `None` for both.
    pub fn new(
        name: &str,
        var_prev: Option<&str>,
        var_next: Option<&str>,
        create_allowed: bool,
        delete_allowed: bool,
        update_cb: Option<UpdateCallback>,
    ) -> Rc<Hdata> {
        Rc::new(Hdata {
            name: name.to_owned(),
            var_prev: var_prev.map(str::to_owned),
            var_next: var_next.map(str::to_owned),
            hash_var: RefCell::new(Hashtable::with_types(
                32,
                HashtableType::String,
                HashtableType::Pointer,
            )),
            hash_list: RefCell::new(Hashtable::with_types(
                32,
                HashtableType::String,
                HashtableType::Pointer,
            )),
            create_allowed,
            delete_allowed,
            update_cb,
            update_pending: Cell::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a field descriptor. Re-registering a name replaces the
    /// previous descriptor.
    #[allow(clippy::too_many_arguments)]
    pub fn new_var(
        &self,
        name: &str,
        var_type: HdataType,
        update_allowed: bool,
        array_size: Option<ArraySize>,
        hdata_name: Option<&str>,
        getter: Getter,
        setter: Option<Setter>,
    ) {
        if name.is_empty() {
            return;
        }
        let var = Rc::new(HdataVar {
            var_type,
            update_allowed,
            array_size,
            hdata_name: hdata_name.map(str::to_owned),
            getter,
            setter,
        });
        self.hash_var
            .borrow_mut()
            .set_pointer(name, var as Pointer);
    }

    /// Register a named list root.
    pub fn new_list(&self, name: &str, flags: u32, root: ListRoot) {
        if name.is_empty() {
            return;
        }
        let list = Rc::new(HdataList { flags, root });
        self.hash_list
            .borrow_mut()
            .set_pointer(name, list as Pointer);
    }

    fn var(&self, name: &str) -> Option<Rc<HdataVar>> {
        let table = self.hash_var.borrow();
        let p = table.get_pointer(name)?;
        p.downcast::<HdataVar>().ok()
    }

    fn list(&self, name: &str) -> Option<Rc<HdataList>> {
        let table = self.hash_list.borrow();
        let p = table.get_pointer(name)?;
        p.downcast::<HdataList>().ok()
    }

    fn lists(&self) -> Vec<(String, Rc<HdataList>)> {
        let mut out = Vec::new();
        self.hash_list.borrow().map(|key, value| {
            if let (Value::String(name), Some(Value::Pointer(Some(p)))) = (key, value) {
                if let Ok(list) = p.clone().downcast::<HdataList>() {
                    out.push((name.clone(), list));
                }
            }
        });
        out
    }

    // ── Metadata lookups ──────────────────────────────────────────────────────

    pub fn get_var_type(&self, name: &str) -> Option<HdataType> {
        Some(self.var(name)?.var_type)
    }

    pub fn get_var_type_string(&self, name: &str) -> Option<&'static str> {
        Some(self.get_var_type(name)?.name())
    }

    /// Name of the nested type reached through a pointer field, if declared.
    pub fn get_var_hdata(&self, name: &str) -> Option<String> {
        self.var(name)?.hdata_name.clone()
    }

    /// The raw array-size spec (`"*"`, a length, or a sibling field name).
    pub fn get_var_array_size_string(&self, name: &str) -> Option<String> {
        Some(self.var(name)?.array_size.as_ref()?.as_spec_string())
    }

    /// Effective element count of an array field on `instance`.
    ///
    /// `None` when the field is not an array, when a `*` spec is declared on
    /// a non-pointer-like type, or when a sibling length field is missing or
    /// negative.
    pub fn get_var_array_size(&self, instance: &Pointer, name: &str) -> Option<usize> {
        let var = self.var(name)?;
        self.array_size_of(&var, instance)
    }

    fn array_size_of(&self, var: &HdataVar, instance: &Pointer) -> Option<usize> {
        match var.array_size.as_ref()? {
            ArraySize::SelfTerminated => match var.var_type {
                HdataType::String
                | HdataType::SharedString
                | HdataType::Pointer
                | HdataType::Hashtable => {
                    let mut i = 0;
                    loop {
                        let value = (var.getter)(instance, Some(i));
                        if value.is_null() || matches!(value, FieldValue::Other) {
                            return Some(i);
                        }
                        i += 1;
                    }
                }
                _ => None,
            },
            ArraySize::Fixed(n) => Some(*n),
            ArraySize::Var(field) => {
                let length = match self.var(field)?.var_type {
                    HdataType::Char => self.char(instance, field) as i64,
                    HdataType::Integer => self.integer(instance, field),
                    HdataType::Long => self.long(instance, field),
                    _ => return None,
                };
                usize::try_from(length).ok()
            }
        }
    }

    // ── Typed accessors ───────────────────────────────────────────────────────

    /// Read a field, bounds-checking `index` against the declared array size.
    /// Any failure reads as the type's null value.
    fn fetch(&self, instance: &Pointer, index: Option<usize>, name: &str) -> FieldValue {
        let Some(var) = self.var(name) else {
            return FieldValue::Other;
        };
        match (&var.array_size, index) {
            (Some(_), Some(i)) => match self.array_size_of(&var, instance) {
                Some(size) if i < size => (var.getter)(instance, Some(i)),
                _ => FieldValue::null_of(var.var_type),
            },
            // an index on a scalar field reads the scalar
            _ => (var.getter)(instance, None),
        }
    }

    pub fn char(&self, instance: &Pointer, name: &str) -> char {
        self.char_at(instance, None, name)
    }

    pub fn char_at(&self, instance: &Pointer, index: Option<usize>, name: &str) -> char {
        match self.fetch(instance, index, name) {
            FieldValue::Char(c) => c,
            _ => '\0',
        }
    }

    pub fn integer(&self, instance: &Pointer, name: &str) -> i64 {
        self.integer_at(instance, None, name)
    }

    pub fn integer_at(&self, instance: &Pointer, index: Option<usize>, name: &str) -> i64 {
        match self.fetch(instance, index, name) {
            FieldValue::Integer(n) => n,
            _ => 0,
        }
    }

    pub fn long(&self, instance: &Pointer, name: &str) -> i64 {
        self.long_at(instance, None, name)
    }

    pub fn long_at(&self, instance: &Pointer, index: Option<usize>, name: &str) -> i64 {
        match self.fetch(instance, index, name) {
            FieldValue::Long(n) => n,
            _ => 0,
        }
    }

    /// Reads both plain and shared string fields.
    pub fn string(&self, instance: &Pointer, name: &str) -> Option<String> {
        self.string_at(instance, None, name)
    }

    pub fn string_at(&self, instance: &Pointer, index: Option<usize>, name: &str) -> Option<String> {
        match self.fetch(instance, index, name) {
            FieldValue::String(s) => s,
            _ => None,
        }
    }

    pub fn shared_string(&self, instance: &Pointer, name: &str) -> Option<String> {
        self.string(instance, name)
    }

    pub fn pointer(&self, instance: &Pointer, name: &str) -> Option<Pointer> {
        self.pointer_at(instance, None, name)
    }

    pub fn pointer_at(&self, instance: &Pointer, index: Option<usize>, name: &str) -> Option<Pointer> {
        match self.fetch(instance, index, name) {
            FieldValue::Pointer(p) => p,
            _ => None,
        }
    }

    pub fn time(&self, instance: &Pointer, name: &str) -> i64 {
        self.time_at(instance, None, name)
    }

    pub fn time_at(&self, instance: &Pointer, index: Option<usize>, name: &str) -> i64 {
        match self.fetch(instance, index, name) {
            FieldValue::Time(t) => t,
            _ => 0,
        }
    }

    pub fn hashtable(&self, instance: &Pointer, name: &str) -> Option<Rc<RefCell<Hashtable>>> {
        self.hashtable_at(instance, None, name)
    }

    pub fn hashtable_at(
        &self,
        instance: &Pointer,
        index: Option<usize>,
        name: &str,
    ) -> Option<Rc<RefCell<Hashtable>>> {
        match self.fetch(instance, index, name) {
            FieldValue::Hashtable(h) => h,
            _ => None,
        }
    }

    // ── List traversal ────────────────────────────────────────────────────────

    /// Current root of a named list.
    pub fn get_list(&self, name: &str) -> Option<Pointer> {
        (self.list(name)?.root)()
    }

    /// Step `count` times through the prev (`count < 0`) or next field.
    ///
    /// `count == 0` is invalid. The walk stops with `None` the moment a hop
    /// yields null.
    pub fn move_ptr(&self, instance: &Pointer, count: i32) -> Option<Pointer> {
        if count == 0 {
            return None;
        }
        let field = if count < 0 {
            self.var_prev.as_deref()?
        } else {
            self.var_next.as_deref()?
        };
        let mut cur = instance.clone();
        for _ in 0..count.unsigned_abs() {
            cur = self.pointer(&cur, field)?;
        }
        Some(cur)
    }

    fn pointer_in_list(&self, root: &Pointer, candidate: &Pointer) -> bool {
        if pointer_address(root) == pointer_address(candidate) {
            return true;
        }
        let mut cur = root.clone();
        while let Some(next) = self.move_ptr(&cur, 1) {
            if pointer_address(&next) == pointer_address(candidate) {
                return true;
            }
            cur = next;
        }
        false
    }

    /// Validate that `candidate` is a live member before it is trusted
    /// elsewhere.
    ///
    /// With an explicit `list` root, the scan covers that list only. Without
    /// one, every list registered with [`LIST_CHECK_POINTERS`] is scanned;
    /// when no such list exists the pointer is accepted as-is.
    pub fn check_pointer(&self, list: Option<&Pointer>, candidate: &Pointer) -> bool {
        if let Some(root) = list {
            return self.pointer_in_list(root, candidate);
        }
        let mut num_lists = 0;
        let mut found = false;
        for (_, l) in self.lists() {
            if l.flags & LIST_CHECK_POINTERS == 0 {
                continue;
            }
            num_lists += 1;
            if !found {
                if let Some(root) = (l.root)() {
                    found = self.pointer_in_list(&root, candidate);
                }
            }
        }
        num_lists == 0 || found
    }

    /// Resolve a raw address (as printed by `0x...` rendering) back to a live
    /// member of a check-pointers list.
    pub fn find_by_address(&self, address: usize) -> Option<Pointer> {
        for (_, l) in self.lists() {
            if l.flags & LIST_CHECK_POINTERS == 0 {
                continue;
            }
            let mut cur = (l.root)();
            while let Some(node) = cur {
                if pointer_address(&node) == address {
                    return Some(node);
                }
                cur = self.move_ptr(&node, 1);
            }
        }
        None
    }

    /// Walk from `start` in steps of `step`, returning the first node for
    /// which `expr` evaluates truthy. The current node is bound under this
    /// hdata's own name for the expression to inspect.
    pub fn search(&self, env: &EvalEnv, start: &Pointer, expr: &str, step: i32) -> Option<Pointer> {
        if expr.is_empty() || step == 0 {
            return None;
        }
        let mut pointers =
            Hashtable::with_types(32, HashtableType::String, HashtableType::Pointer);
        let mut cur = start.clone();
        loop {
            pointers.set_pointer(&self.name, cur.clone());
            let result = env.evaluate_condition(expr, Some(&pointers), None);
            if crate::eval::is_true(&result) {
                return Some(cur);
            }
            cur = self.move_ptr(&cur, step)?;
        }
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Convert `value` per the field type and apply it through the field's
    /// setter. Permitted only while an update callback is running; fails when
    /// the field disallows updates or the conversion fails.
    ///
    /// Pointer fields accept only the null pointer (`0x0` or `0`): an
    /// arbitrary scanned address has no live object behind it here.
    pub fn set(&self, instance: &Pointer, name: &str, value: &str) -> bool {
        if !self.update_pending.get() {
            return false;
        }
        let Some(var) = self.var(name) else {
            return false;
        };
        if !var.update_allowed {
            return false;
        }
        let Some(set) = var.setter.as_ref() else {
            return false;
        };
        let converted = match var.var_type {
            HdataType::Char => FieldValue::Char(value.chars().next().unwrap_or('\0')),
            HdataType::Integer => match value.parse::<i64>() {
                Ok(n) => FieldValue::Integer(n),
                Err(_) => return false,
            },
            HdataType::Long => match value.parse::<i64>() {
                Ok(n) => FieldValue::Long(n),
                Err(_) => return false,
            },
            HdataType::Time => match value.parse::<i64>() {
                Ok(n) => FieldValue::Time(n),
                Err(_) => return false,
            },
            HdataType::String | HdataType::SharedString => {
                FieldValue::String(Some(value.to_owned()))
            }
            HdataType::Pointer => {
                let digits = value.strip_prefix("0x").unwrap_or(value);
                match usize::from_str_radix(digits, 16) {
                    Ok(0) => FieldValue::Pointer(None),
                    _ => return false,
                }
            }
            HdataType::Other | HdataType::Hashtable => return false,
        };
        set(instance, converted)
    }

    /// Apply a batch of field updates through the registered update callback.
    ///
    /// Three reserved keys answer capability queries without mutating:
    /// `__create_allowed`, `__delete_allowed`, and `__update_allowed` (whose
    /// value names the field asked about). Otherwise the update guard is set,
    /// the callback runs (calling [`Hdata::set`] zero or more times), the
    /// guard is cleared, and the callback's applied-change count is returned.
    /// Everything returns 0 when no update callback is registered.
    pub fn update(&self, instance: &Pointer, fields: &Hashtable) -> i32 {
        let Some(cb) = self.update_cb.as_ref() else {
            return 0;
        };
        if fields.has_key_str("__create_allowed") {
            return self.create_allowed as i32;
        }
        if fields.has_key_str("__delete_allowed") {
            return self.delete_allowed as i32;
        }
        if let Some(field) = fields.get_str("__update_allowed") {
            return self
                .var(field)
                .map_or(0, |var| var.update_allowed as i32);
        }
        self.update_pending.set(true);
        let rc = cb(self, instance, fields);
        self.update_pending.set(false);
        rc
    }

    // ── Comparison ────────────────────────────────────────────────────────────

    /// Compare one field across two instances. A null instance orders before
    /// a non-null one; hashtable and opaque fields compare equal.
    pub fn compare(
        &self,
        instance1: Option<&Pointer>,
        instance2: Option<&Pointer>,
        name: &str,
        case_sensitive: bool,
    ) -> Ordering {
        let (p1, p2) = match (instance1, instance2) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => (a, b),
        };
        match self.get_var_type(name) {
            Some(HdataType::Char) => self.char(p1, name).cmp(&self.char(p2, name)),
            Some(HdataType::Integer) => self.integer(p1, name).cmp(&self.integer(p2, name)),
            Some(HdataType::Long) => self.long(p1, name).cmp(&self.long(p2, name)),
            Some(HdataType::String) | Some(HdataType::SharedString) => {
                match (self.string(p1, name), self.string(p2, name)) {
                    (None, None) => Ordering::Equal,
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (Some(a), Some(b)) => {
                        if case_sensitive {
                            a.cmp(&b)
                        } else {
                            a.to_lowercase().cmp(&b.to_lowercase())
                        }
                    }
                }
            }
            Some(HdataType::Pointer) => {
                let a = self.pointer(p1, name).map(|p| pointer_address(&p)).unwrap_or(0);
                let b = self.pointer(p2, name).map(|p| pointer_address(&p)).unwrap_or(0);
                a.cmp(&b)
            }
            Some(HdataType::Time) => self.time(p1, name).cmp(&self.time(p2, name)),
            _ => Ordering::Equal,
        }
    }

    // ── String properties ─────────────────────────────────────────────────────

    /// Export a property as a string: `var_keys`, `var_values`,
    /// `var_keys_values`, `var_prev`, `var_next`, `list_keys`, `list_values`,
    /// `list_keys_values`.
    pub fn get_string(&self, property: &str) -> Option<String> {
        if property.eq_ignore_ascii_case("var_keys") {
            return self.hash_var.borrow().get_string("keys");
        }
        if property.eq_ignore_ascii_case("var_values") {
            return self.hash_var.borrow().get_string("values");
        }
        if property.eq_ignore_ascii_case("var_keys_values") {
            return self.hash_var.borrow().get_string("keys_values");
        }
        if property.eq_ignore_ascii_case("var_prev") {
            return self.var_prev.clone();
        }
        if property.eq_ignore_ascii_case("var_next") {
            return self.var_next.clone();
        }
        if property.eq_ignore_ascii_case("list_keys") {
            return self.hash_list.borrow().get_string("keys");
        }
        if property.eq_ignore_ascii_case("list_values") {
            return self.hash_list.borrow().get_string("values");
        }
        if property.eq_ignore_ascii_case("list_keys_values") {
            return self.hash_list.borrow().get_string("keys_values");
        }
        None
    }
}

impl std::fmt::Debug for Hdata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hdata")
            .field("name", &self.name)
            .field("var_prev", &self.var_prev)
            .field("var_next", &self.var_next)
            .field("vars", &self.hash_var.borrow().len())
            .field("lists", &self.hash_list.borrow().len())
            .finish()
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Process-wide name → [`Hdata`] index.
///
/// The registry holds non-owning entries in the sense that a descriptor's
/// accessor closures keep whatever they captured alive, not the instances
/// they read. Constructed at startup and injected wherever reflection is
/// needed.
pub struct HdataRegistry {
    hdatas: RefCell<Hashtable>,
}

impl HdataRegistry {
    pub fn new() -> Self {
        HdataRegistry {
            hdatas: RefCell::new(Hashtable::with_types(
                32,
                HashtableType::String,
                HashtableType::Pointer,
            )),
        }
    }

    /// Index `hdata` under its name. The last registration under a name wins;
    /// an empty name is refused.
    pub fn register(&self, hdata: Rc<Hdata>) -> bool {
        if hdata.name().is_empty() {
            return false;
        }
        let name = hdata.name().to_owned();
        self.hdatas.borrow_mut().set_pointer(&name, hdata as Pointer)
    }

    pub fn get(&self, name: &str) -> Option<Rc<Hdata>> {
        let table = self.hdatas.borrow();
        let p = table.get_pointer(name)?;
        p.downcast::<Hdata>().ok()
    }

    /// Drop a registration, e.g. on module unload. Returns `true` if it
    /// existed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut table = self.hdatas.borrow_mut();
        if !table.has_key_str(name) {
            return false;
        }
        table.remove_str(name);
        true
    }

    pub fn len(&self) -> usize {
        self.hdatas.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdatas.borrow().is_empty()
    }
}

impl Default for HdataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
