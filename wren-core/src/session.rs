//! The startup-constructed service owning every registry.
//!
//! A [`Session`] wires the core together: it owns the hdata and option
//! registries, the shared-string pool, and the buffer/window lists, and
//! registers the built-in reflectable types. Collaborators receive the
//! session (or an [`EvalEnv`] borrowed from it) explicitly; there are no
//! process globals to initialize or tear down, dropping the session
//! releases everything.

use std::cell::RefCell;
use std::rc::Rc;

use crate::buffer::{self, Buffer, BufferList};
use crate::config::ConfigRegistry;
use crate::eval::EvalEnv;
use crate::hdata::HdataRegistry;
use crate::strings::SharedStrings;
use crate::window::{self, Window, WindowList};

/// Name of the buffer opened at startup.
const CORE_BUFFER_NAME: &str = "wren";

pub struct Session {
    hdata: HdataRegistry,
    config: ConfigRegistry,
    shared_strings: Rc<RefCell<SharedStrings>>,
    buffers: Rc<BufferList>,
    windows: Rc<WindowList>,
}

impl Session {
    /// Build the registries, register the `"buffer"` and `"window"` types,
    /// and open the core buffer in a first window.
    pub fn new() -> Session {
        let hdata = HdataRegistry::new();
        let shared_strings = Rc::new(RefCell::new(SharedStrings::new()));
        let buffers = BufferList::new(shared_strings.clone());
        let windows = WindowList::new();

        buffer::register_hdata(&hdata, &buffers);
        window::register_hdata(&hdata, &windows);

        let core_buffer = buffers.add(CORE_BUFFER_NAME);
        let window = windows.add();
        window.show_buffer(&core_buffer);

        Session {
            hdata,
            config: ConfigRegistry::new(),
            shared_strings,
            buffers,
            windows,
        }
    }

    /// An evaluation environment seeded with the current window focus.
    pub fn eval_env(&self) -> EvalEnv<'_> {
        EvalEnv {
            hdata: &self.hdata,
            config: &self.config,
            current_window: self.windows.current().map(|w| w.as_pointer()),
        }
    }

    pub fn hdata(&self) -> &HdataRegistry {
        &self.hdata
    }

    pub fn config(&self) -> &ConfigRegistry {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigRegistry {
        &mut self.config
    }

    pub fn shared_strings(&self) -> &Rc<RefCell<SharedStrings>> {
        &self.shared_strings
    }

    pub fn buffers(&self) -> &Rc<BufferList> {
        &self.buffers
    }

    pub fn windows(&self) -> &Rc<WindowList> {
        &self.windows
    }

    pub fn core_buffer(&self) -> Option<Rc<Buffer>> {
        self.buffers.find_by_number(1)
    }

    pub fn current_window(&self) -> Option<Rc<Window>> {
        self.windows.current()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_state() {
        let session = Session::new();
        assert_eq!(session.buffers().len(), 1);
        assert_eq!(session.windows().len(), 1);
        let buffer = session.core_buffer().unwrap();
        assert_eq!(buffer.full_name(), "core.wren");
        let window = session.current_window().unwrap();
        assert_eq!(window.buffer().unwrap().number(), 1);
        assert!(session.hdata().get("buffer").is_some());
        assert!(session.hdata().get("window").is_some());
    }

    #[test]
    fn default_focus_seeds_evaluation() {
        let session = Session::new();
        let env = session.eval_env();
        assert_eq!(env.evaluate_condition("${window.buffer.number} == 1", None, None), "1");
        assert_eq!(env.evaluate("${buffer.full_name}", None, None), "core.wren");
    }

    #[test]
    fn focus_change_moves_the_default_buffer() {
        let session = Session::new();
        let chat = session.buffers().add("chat");
        let second = session.windows().add();
        second.show_buffer(&chat);
        session.windows().set_current(&second);
        let env = session.eval_env();
        assert_eq!(env.evaluate("${buffer.name}", None, None), "chat");
        assert_eq!(env.evaluate("${window.number}", None, None), "2");
    }

    #[test]
    fn drop_releases_everything() {
        let session = Session::new();
        let buffer = Rc::downgrade(&session.core_buffer().unwrap());
        drop(session);
        assert!(buffer.upgrade().is_none());
    }
}
