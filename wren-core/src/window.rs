//! Windows and their reflection bindings.
//!
//! A [`Window`] is a rectangular screen area displaying one buffer. The
//! [`WindowList`] also tracks which window has focus; that focus is what
//! seeds the default `window`/`buffer` pointers during evaluation.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::buffer::Buffer;
use crate::hashtable::Pointer;
use crate::hdata::{
    getter, FieldValue, Hdata, HdataRegistry, HdataType, LIST_CHECK_POINTERS,
};

// ── Window ────────────────────────────────────────────────────────────────────

pub struct Window {
    number: Cell<i64>,
    win_x: Cell<i64>,
    win_y: Cell<i64>,
    win_width: Cell<i64>,
    win_height: Cell<i64>,
    buffer: RefCell<Option<Rc<Buffer>>>,
    prev_window: RefCell<Weak<Window>>,
    next_window: RefCell<Option<Rc<Window>>>,
}

impl Window {
    fn new(number: i64) -> Rc<Window> {
        Rc::new(Window {
            number: Cell::new(number),
            win_x: Cell::new(0),
            win_y: Cell::new(0),
            win_width: Cell::new(80),
            win_height: Cell::new(25),
            buffer: RefCell::new(None),
            prev_window: RefCell::new(Weak::new()),
            next_window: RefCell::new(None),
        })
    }

    pub fn number(&self) -> i64 {
        self.number.get()
    }

    pub fn size(&self) -> (i64, i64) {
        (self.win_width.get(), self.win_height.get())
    }

    pub fn set_geometry(&self, x: i64, y: i64, width: i64, height: i64) {
        self.win_x.set(x);
        self.win_y.set(y);
        self.win_width.set(width);
        self.win_height.set(height);
    }

    pub fn buffer(&self) -> Option<Rc<Buffer>> {
        self.buffer.borrow().clone()
    }

    /// Switch the displayed buffer.
    pub fn show_buffer(&self, buffer: &Rc<Buffer>) {
        *self.buffer.borrow_mut() = Some(buffer.clone());
    }

    pub fn next_window(&self) -> Option<Rc<Window>> {
        self.next_window.borrow().clone()
    }

    pub fn prev_window(&self) -> Option<Rc<Window>> {
        self.prev_window.borrow().upgrade()
    }

    pub fn as_pointer(self: &Rc<Self>) -> Pointer {
        self.clone()
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("number", &self.number.get())
            .field("buffer", &self.buffer.borrow().as_ref().map(|b| b.number()))
            .finish()
    }
}

// ── WindowList ────────────────────────────────────────────────────────────────

pub struct WindowList {
    head: RefCell<Option<Rc<Window>>>,
    last: RefCell<Option<Rc<Window>>>,
    current: RefCell<Option<Rc<Window>>>,
    count: Cell<usize>,
}

impl WindowList {
    pub fn new() -> Rc<WindowList> {
        Rc::new(WindowList {
            head: RefCell::new(None),
            last: RefCell::new(None),
            current: RefCell::new(None),
            count: Cell::new(0),
        })
    }

    /// Open a window at the end of the list. The first window becomes the
    /// current one.
    pub fn add(&self) -> Rc<Window> {
        let number = self
            .last
            .borrow()
            .as_ref()
            .map(|w| w.number.get() + 1)
            .unwrap_or(1);
        let window = Window::new(number);
        let prev = self.last.borrow_mut().take();
        match prev {
            Some(prev) => {
                *window.prev_window.borrow_mut() = Rc::downgrade(&prev);
                *prev.next_window.borrow_mut() = Some(window.clone());
                *self.last.borrow_mut() = Some(window.clone());
            }
            None => {
                *self.head.borrow_mut() = Some(window.clone());
                *self.last.borrow_mut() = Some(window.clone());
                *self.current.borrow_mut() = Some(window.clone());
            }
        }
        self.count.set(self.count.get() + 1);
        window
    }

    pub fn head(&self) -> Option<Rc<Window>> {
        self.head.borrow().clone()
    }

    pub fn current(&self) -> Option<Rc<Window>> {
        self.current.borrow().clone()
    }

    /// Move focus. Ignored if the window is not in this list.
    pub fn set_current(&self, window: &Rc<Window>) {
        let mut cur = self.head();
        while let Some(w) = cur {
            if Rc::ptr_eq(&w, window) {
                *self.current.borrow_mut() = Some(window.clone());
                return;
            }
            cur = w.next_window();
        }
    }

    pub fn len(&self) -> usize {
        self.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }
}

// ── Reflection binding ────────────────────────────────────────────────────────

/// Register the `"window"` hdata type with the `windows` and
/// `current_window` list roots.
pub fn register_hdata(registry: &HdataRegistry, list: &Rc<WindowList>) {
    let hdata = Hdata::new(
        "window",
        Some("prev_window"),
        Some("next_window"),
        false,
        false,
        None,
    );
    hdata.new_var(
        "number",
        HdataType::Integer,
        false,
        None,
        None,
        getter::<Window>(|w, _| FieldValue::Integer(w.number.get())),
        None,
    );
    for (name, read) in [
        ("win_x", (|w: &Window| w.win_x.get()) as fn(&Window) -> i64),
        ("win_y", |w: &Window| w.win_y.get()),
        ("win_width", |w: &Window| w.win_width.get()),
        ("win_height", |w: &Window| w.win_height.get()),
    ] {
        hdata.new_var(
            name,
            HdataType::Integer,
            false,
            None,
            None,
            getter::<Window>(move |w, _| FieldValue::Integer(read(w))),
            None,
        );
    }
    hdata.new_var(
        "buffer",
        HdataType::Pointer,
        false,
        None,
        Some("buffer"),
        getter::<Window>(|w, _| {
            FieldValue::Pointer(w.buffer.borrow().clone().map(|b| b as Pointer))
        }),
        None,
    );
    hdata.new_var(
        "prev_window",
        HdataType::Pointer,
        false,
        None,
        Some("window"),
        getter::<Window>(|w, _| {
            FieldValue::Pointer(w.prev_window.borrow().upgrade().map(|r| r as Pointer))
        }),
        None,
    );
    hdata.new_var(
        "next_window",
        HdataType::Pointer,
        false,
        None,
        Some("window"),
        getter::<Window>(|w, _| {
            FieldValue::Pointer(w.next_window.borrow().clone().map(|r| r as Pointer))
        }),
        None,
    );

    let roots = list.clone();
    hdata.new_list(
        "windows",
        LIST_CHECK_POINTERS,
        Rc::new(move || roots.head().map(|w| w as Pointer)),
    );
    let roots = list.clone();
    hdata.new_list(
        "current_window",
        0,
        Rc::new(move || roots.current().map(|w| w as Pointer)),
    );

    registry.register(hdata);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferList;
    use crate::strings::SharedStrings;

    #[test]
    fn first_window_is_current() {
        let list = WindowList::new();
        let a = list.add();
        let b = list.add();
        assert_eq!(a.number(), 1);
        assert_eq!(b.number(), 2);
        assert!(Rc::ptr_eq(&list.current().unwrap(), &a));
        list.set_current(&b);
        assert!(Rc::ptr_eq(&list.current().unwrap(), &b));
    }

    #[test]
    fn set_current_ignores_foreign_window() {
        let list = WindowList::new();
        let a = list.add();
        let other = WindowList::new().add();
        list.set_current(&other);
        assert!(Rc::ptr_eq(&list.current().unwrap(), &a));
    }

    #[test]
    fn show_buffer() {
        let windows = WindowList::new();
        let buffers = BufferList::new(Rc::new(RefCell::new(SharedStrings::new())));
        let window = windows.add();
        let buffer = buffers.add("main");
        assert!(window.buffer().is_none());
        window.show_buffer(&buffer);
        assert_eq!(window.buffer().unwrap().number(), 1);
    }

    #[test]
    fn hdata_reads_geometry_and_buffer() {
        let registry = HdataRegistry::new();
        let windows = WindowList::new();
        let buffers = BufferList::new(Rc::new(RefCell::new(SharedStrings::new())));
        register_hdata(&registry, &windows);
        crate::buffer::register_hdata(&registry, &buffers);

        let window = windows.add();
        window.set_geometry(0, 0, 112, 40);
        let buffer = buffers.add("main");
        window.show_buffer(&buffer);

        let hdata = registry.get("window").unwrap();
        let p = window.as_pointer();
        assert_eq!(hdata.integer(&p, "win_width"), 112);
        assert_eq!(hdata.integer(&p, "win_height"), 40);
        let shown = hdata.pointer(&p, "buffer").unwrap();
        let buffer_hdata = registry.get("buffer").unwrap();
        assert_eq!(
            buffer_hdata.string(&shown, "full_name").as_deref(),
            Some("core.main")
        );
    }

    #[test]
    fn current_window_list_follows_focus() {
        let registry = HdataRegistry::new();
        let windows = WindowList::new();
        register_hdata(&registry, &windows);
        let a = windows.add();
        let b = windows.add();
        let hdata = registry.get("window").unwrap();
        let current = hdata.get_list("current_window").unwrap();
        assert_eq!(hdata.integer(&current, "number"), a.number());
        windows.set_current(&b);
        let current = hdata.get_list("current_window").unwrap();
        assert_eq!(hdata.integer(&current, "number"), 2);
    }
}
