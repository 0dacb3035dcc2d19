//! Chat buffers and their reflection bindings.
//!
//! A [`Buffer`] is one conversation: a numbered, named container with a
//! title, per-buffer local variables, and highlight words. Buffers live in
//! a doubly-linked [`BufferList`] (strong `next`, weak `prev`), which is
//! what the `"buffer"` hdata type walks. Only `number` and `title` accept
//! updates through the reflection layer.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::hashtable::{Hashtable, HashtableType, Pointer};
use crate::hdata::{
    getter, setter, ArraySize, FieldValue, Hdata, HdataRegistry, HdataType, UpdateCallback,
    LIST_CHECK_POINTERS,
};
use crate::strings::SharedStrings;

/// Default plugin name for buffers opened by the core itself.
const CORE_PLUGIN_NAME: &str = "core";

/// Buffer content kinds: formatted chat lines, or free content drawn by its
/// owner.
pub const BUFFER_TYPE_FORMATTED: i64 = 0;
pub const BUFFER_TYPE_FREE: i64 = 1;

// ── Buffer ────────────────────────────────────────────────────────────────────

pub struct Buffer {
    number: Cell<i64>,
    /// Interned: every core buffer shares one allocation for this.
    plugin_name: RefCell<Rc<String>>,
    name: RefCell<String>,
    full_name: RefCell<String>,
    short_name: RefCell<String>,
    title: RefCell<String>,
    buffer_type: Cell<i64>,
    hidden: Cell<i64>,
    active: Cell<i64>,
    local_variables: Rc<RefCell<Hashtable>>,
    highlight_words_count: Cell<i64>,
    highlight_words: RefCell<Vec<String>>,
    prev_buffer: RefCell<Weak<Buffer>>,
    next_buffer: RefCell<Option<Rc<Buffer>>>,
}

impl Buffer {
    fn new(number: i64, plugin_name: Rc<String>, name: &str) -> Rc<Buffer> {
        let mut locals = Hashtable::with_types(8, HashtableType::String, HashtableType::String);
        locals.set_str("plugin", &plugin_name);
        locals.set_str("name", name);
        Rc::new(Buffer {
            number: Cell::new(number),
            full_name: RefCell::new(format!("{plugin_name}.{name}")),
            plugin_name: RefCell::new(plugin_name),
            name: RefCell::new(name.to_owned()),
            short_name: RefCell::new(name.to_owned()),
            title: RefCell::new(String::new()),
            buffer_type: Cell::new(BUFFER_TYPE_FORMATTED),
            hidden: Cell::new(0),
            active: Cell::new(1),
            local_variables: Rc::new(RefCell::new(locals)),
            highlight_words_count: Cell::new(0),
            highlight_words: RefCell::new(Vec::new()),
            prev_buffer: RefCell::new(Weak::new()),
            next_buffer: RefCell::new(None),
        })
    }

    pub fn number(&self) -> i64 {
        self.number.get()
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn full_name(&self) -> String {
        self.full_name.borrow().clone()
    }

    pub fn short_name(&self) -> String {
        self.short_name.borrow().clone()
    }

    pub fn set_short_name(&self, short_name: &str) {
        *self.short_name.borrow_mut() = short_name.to_owned();
    }

    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    pub fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_owned();
    }

    /// Rename the buffer; `full_name` and the `name` local variable follow.
    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = name.to_owned();
        *self.full_name.borrow_mut() = format!("{}.{name}", self.plugin_name.borrow());
        self.local_variables.borrow_mut().set_str("name", name);
    }

    pub fn buffer_type(&self) -> i64 {
        self.buffer_type.get()
    }

    pub fn set_buffer_type(&self, buffer_type: i64) {
        self.buffer_type.set(buffer_type);
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.get() != 0
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden as i64);
    }

    pub fn local_variable(&self, name: &str) -> Option<String> {
        self.local_variables
            .borrow()
            .get_str(name)
            .map(str::to_owned)
    }

    pub fn set_local_variable(&self, name: &str, value: &str) {
        self.local_variables.borrow_mut().set_str(name, value);
    }

    pub fn unset_local_variable(&self, name: &str) {
        self.local_variables.borrow_mut().remove_str(name);
    }

    pub fn highlight_words(&self) -> Vec<String> {
        self.highlight_words.borrow().clone()
    }

    pub fn set_highlight_words(&self, words: Vec<String>) {
        self.highlight_words_count.set(words.len() as i64);
        *self.highlight_words.borrow_mut() = words;
    }

    pub fn next_buffer(&self) -> Option<Rc<Buffer>> {
        self.next_buffer.borrow().clone()
    }

    pub fn prev_buffer(&self) -> Option<Rc<Buffer>> {
        self.prev_buffer.borrow().upgrade()
    }

    pub fn as_pointer(self: &Rc<Self>) -> Pointer {
        self.clone()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("number", &self.number.get())
            .field("full_name", &*self.full_name.borrow())
            .finish()
    }
}

// ── BufferList ────────────────────────────────────────────────────────────────

/// All open buffers, in number order.
pub struct BufferList {
    shared: Rc<RefCell<SharedStrings>>,
    head: RefCell<Option<Rc<Buffer>>>,
    last: RefCell<Option<Rc<Buffer>>>,
    count: Cell<usize>,
}

impl BufferList {
    pub fn new(shared: Rc<RefCell<SharedStrings>>) -> Rc<BufferList> {
        Rc::new(BufferList {
            shared,
            head: RefCell::new(None),
            last: RefCell::new(None),
            count: Cell::new(0),
        })
    }

    /// Open a buffer at the end of the list; numbers start at 1.
    pub fn add(&self, name: &str) -> Rc<Buffer> {
        let number = self
            .last
            .borrow()
            .as_ref()
            .map(|b| b.number.get() + 1)
            .unwrap_or(1);
        let plugin_name = self.shared.borrow_mut().get(CORE_PLUGIN_NAME);
        let buffer = Buffer::new(number, plugin_name, name);
        let prev = self.last.borrow_mut().take();
        match prev {
            Some(prev) => {
                *buffer.prev_buffer.borrow_mut() = Rc::downgrade(&prev);
                *prev.next_buffer.borrow_mut() = Some(buffer.clone());
                *self.last.borrow_mut() = Some(buffer.clone());
            }
            None => {
                *self.head.borrow_mut() = Some(buffer.clone());
                *self.last.borrow_mut() = Some(buffer.clone());
            }
        }
        self.count.set(self.count.get() + 1);
        buffer
    }

    pub fn head(&self) -> Option<Rc<Buffer>> {
        self.head.borrow().clone()
    }

    pub fn last(&self) -> Option<Rc<Buffer>> {
        self.last.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }

    pub fn find_by_name(&self, name: &str) -> Option<Rc<Buffer>> {
        let mut cur = self.head();
        while let Some(buffer) = cur {
            if *buffer.name.borrow() == name || *buffer.full_name.borrow() == name {
                return Some(buffer);
            }
            cur = buffer.next_buffer();
        }
        None
    }

    pub fn find_by_number(&self, number: i64) -> Option<Rc<Buffer>> {
        let mut cur = self.head();
        while let Some(buffer) = cur {
            if buffer.number.get() == number {
                return Some(buffer);
            }
            cur = buffer.next_buffer();
        }
        None
    }
}

// ── Reflection binding ────────────────────────────────────────────────────────

/// Register the `"buffer"` hdata type: every field the evaluator and the
/// command layer reach by name, plus the `buffers`/`last_buffer` list roots.
pub fn register_hdata(registry: &HdataRegistry, list: &Rc<BufferList>) {
    let update: UpdateCallback = Rc::new(|hdata, instance, fields| {
        let mut rc = 0;
        for field in ["number", "title"] {
            if let Some(value) = fields.get_str(field) {
                if hdata.set(instance, field, value) {
                    rc += 1;
                }
            }
        }
        rc
    });

    let hdata = Hdata::new(
        "buffer",
        Some("prev_buffer"),
        Some("next_buffer"),
        false,
        false,
        Some(update),
    );
    hdata.new_var(
        "number",
        HdataType::Integer,
        true,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::Integer(b.number.get())),
        Some(setter::<Buffer>(|b, v| match v {
            FieldValue::Integer(n) => {
                b.number.set(n);
                true
            }
            _ => false,
        })),
    );
    hdata.new_var(
        "plugin_name",
        HdataType::SharedString,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::String(Some((**b.plugin_name.borrow()).clone()))),
        None,
    );
    hdata.new_var(
        "name",
        HdataType::String,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::String(Some(b.name.borrow().clone()))),
        None,
    );
    hdata.new_var(
        "full_name",
        HdataType::String,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::String(Some(b.full_name.borrow().clone()))),
        None,
    );
    hdata.new_var(
        "short_name",
        HdataType::String,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::String(Some(b.short_name.borrow().clone()))),
        None,
    );
    hdata.new_var(
        "title",
        HdataType::String,
        true,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::String(Some(b.title.borrow().clone()))),
        Some(setter::<Buffer>(|b, v| match v {
            FieldValue::String(Some(s)) => {
                *b.title.borrow_mut() = s;
                true
            }
            _ => false,
        })),
    );
    hdata.new_var(
        "type",
        HdataType::Integer,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::Integer(b.buffer_type.get())),
        None,
    );
    hdata.new_var(
        "hidden",
        HdataType::Integer,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::Integer(b.hidden.get())),
        None,
    );
    hdata.new_var(
        "active",
        HdataType::Integer,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::Integer(b.active.get())),
        None,
    );
    hdata.new_var(
        "local_variables",
        HdataType::Hashtable,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::Hashtable(Some(b.local_variables.clone()))),
        None,
    );
    hdata.new_var(
        "highlight_words_count",
        HdataType::Integer,
        false,
        None,
        None,
        getter::<Buffer>(|b, _| FieldValue::Integer(b.highlight_words_count.get())),
        None,
    );
    hdata.new_var(
        "highlight_words",
        HdataType::String,
        false,
        Some(ArraySize::Var("highlight_words_count".to_owned())),
        None,
        getter::<Buffer>(|b, index| {
            let i = index.unwrap_or(0);
            FieldValue::String(b.highlight_words.borrow().get(i).cloned())
        }),
        None,
    );
    hdata.new_var(
        "prev_buffer",
        HdataType::Pointer,
        false,
        None,
        Some("buffer"),
        getter::<Buffer>(|b, _| {
            FieldValue::Pointer(b.prev_buffer.borrow().upgrade().map(|r| r as Pointer))
        }),
        None,
    );
    hdata.new_var(
        "next_buffer",
        HdataType::Pointer,
        false,
        None,
        Some("buffer"),
        getter::<Buffer>(|b, _| {
            FieldValue::Pointer(b.next_buffer.borrow().clone().map(|r| r as Pointer))
        }),
        None,
    );

    let roots = list.clone();
    hdata.new_list(
        "buffers",
        LIST_CHECK_POINTERS,
        Rc::new(move || roots.head().map(|b| b as Pointer)),
    );
    let roots = list.clone();
    hdata.new_list(
        "last_buffer",
        0,
        Rc::new(move || roots.last().map(|b| b as Pointer)),
    );

    registry.register(hdata);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn new_list() -> Rc<BufferList> {
        BufferList::new(Rc::new(RefCell::new(SharedStrings::new())))
    }

    #[test]
    fn add_assigns_numbers_and_links() {
        let list = new_list();
        let a = list.add("main");
        let b = list.add("chat");
        let c = list.add("logs");
        assert_eq!(a.number(), 1);
        assert_eq!(b.number(), 2);
        assert_eq!(c.number(), 3);
        assert_eq!(list.len(), 3);
        assert_eq!(a.next_buffer().unwrap().number(), 2);
        assert_eq!(c.prev_buffer().unwrap().number(), 2);
        assert!(a.prev_buffer().is_none());
        assert!(c.next_buffer().is_none());
    }

    #[test]
    fn names_and_local_variables() {
        let list = new_list();
        let buffer = list.add("main");
        assert_eq!(buffer.full_name(), "core.main");
        assert_eq!(buffer.local_variable("plugin").as_deref(), Some("core"));
        assert_eq!(buffer.local_variable("name").as_deref(), Some("main"));
        buffer.set_local_variable("channel", "#wren");
        assert_eq!(buffer.local_variable("channel").as_deref(), Some("#wren"));
        buffer.unset_local_variable("channel");
        assert!(buffer.local_variable("channel").is_none());
    }

    #[test]
    fn rename_updates_full_name_and_local() {
        let list = new_list();
        let buffer = list.add("old");
        buffer.set_name("new");
        assert_eq!(buffer.name(), "new");
        assert_eq!(buffer.full_name(), "core.new");
        assert_eq!(buffer.local_variable("name").as_deref(), Some("new"));
    }

    #[test]
    fn plugin_name_is_interned_once() {
        let shared = Rc::new(RefCell::new(SharedStrings::new()));
        let list = BufferList::new(shared.clone());
        let a = list.add("one");
        let b = list.add("two");
        assert!(Rc::ptr_eq(
            &a.plugin_name.borrow(),
            &b.plugin_name.borrow()
        ));
        assert_eq!(shared.borrow().len(), 1);
    }

    #[test]
    fn find_by_name_and_number() {
        let list = new_list();
        list.add("main");
        let chat = list.add("chat");
        assert!(Rc::ptr_eq(&list.find_by_name("chat").unwrap(), &chat));
        assert!(Rc::ptr_eq(&list.find_by_name("core.chat").unwrap(), &chat));
        assert!(Rc::ptr_eq(&list.find_by_number(2).unwrap(), &chat));
        assert!(list.find_by_name("nope").is_none());
        assert!(list.find_by_number(9).is_none());
    }

    #[test]
    fn hdata_reads_fields() {
        let registry = HdataRegistry::new();
        let list = new_list();
        register_hdata(&registry, &list);
        let buffer = list.add("main");
        buffer.set_title("welcome");
        buffer.set_highlight_words(vec!["wren".into(), "core".into()]);

        let hdata = registry.get("buffer").unwrap();
        let p = buffer.as_pointer();
        assert_eq!(hdata.integer(&p, "number"), 1);
        assert_eq!(hdata.string(&p, "full_name").as_deref(), Some("core.main"));
        assert_eq!(hdata.string(&p, "title").as_deref(), Some("welcome"));
        assert_eq!(hdata.get_var_array_size(&p, "highlight_words"), Some(2));
        assert_eq!(
            hdata.string_at(&p, Some(0), "highlight_words").as_deref(),
            Some("wren")
        );
        let locals = hdata.hashtable(&p, "local_variables").unwrap();
        assert_eq!(locals.borrow().get_str("plugin"), Some("core"));
    }

    #[test]
    fn hdata_walks_list() {
        let registry = HdataRegistry::new();
        let list = new_list();
        register_hdata(&registry, &list);
        let a = list.add("one");
        list.add("two");
        let c = list.add("three");

        let hdata = registry.get("buffer").unwrap();
        let root = hdata.get_list("buffers").unwrap();
        assert_eq!(hdata.integer(&root, "number"), 1);
        let third = hdata.move_ptr(&root, 2).unwrap();
        assert_eq!(hdata.integer(&third, "number"), 3);
        assert!(hdata.move_ptr(&third, 1).is_none());
        let last = hdata.get_list("last_buffer").unwrap();
        assert_eq!(hdata.integer(&last, "number"), 3);
        assert!(hdata.check_pointer(None, &c.as_pointer()));
        assert!(hdata.check_pointer(None, &a.as_pointer()));
    }

    #[test]
    fn update_permits_number_and_title_only() {
        let registry = HdataRegistry::new();
        let list = new_list();
        register_hdata(&registry, &list);
        let buffer = list.add("main");
        let hdata = registry.get("buffer").unwrap();
        let p = buffer.as_pointer();

        let mut fields = Hashtable::with_types(8, HashtableType::String, HashtableType::String);
        fields.set_str("number", "7");
        fields.set_str("title", "updated");
        assert_eq!(hdata.update(&p, &fields), 2);
        assert_eq!(buffer.number(), 7);
        assert_eq!(buffer.title(), "updated");

        // name has no setter and update_allowed = false; the callback does
        // not even forward it
        let mut fields = Hashtable::with_types(8, HashtableType::String, HashtableType::String);
        fields.set_str("name", "sneaky");
        assert_eq!(hdata.update(&p, &fields), 0);
        assert_eq!(buffer.name(), "main");

        let mut fields = Hashtable::with_types(8, HashtableType::String, HashtableType::String);
        fields.set_str("__update_allowed", "title");
        assert_eq!(hdata.update(&p, &fields), 1);
        let mut fields = Hashtable::with_types(8, HashtableType::String, HashtableType::String);
        fields.set_str("__update_allowed", "name");
        assert_eq!(hdata.update(&p, &fields), 0);
    }
}
