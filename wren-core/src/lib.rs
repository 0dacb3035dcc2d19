//! Core data and evaluation layer of the wren chat client.
//!
//! Three pieces build on each other:
//!
//! - [`hashtable`]: a generic key/value container with deterministic
//!   iteration, the storage for every registry here;
//! - [`hdata`]: runtime type descriptors that expose internal objects
//!   (buffers, windows, options) for name-based field access and
//!   linked-list traversal;
//! - [`eval`]: `${...}` substitution and a small condition language
//!   resolving variables against caller maps, the option namespace,
//!   buffer-local variables, and reflected object paths, in that order.
//!
//! [`session::Session`] constructs and owns the registries; everything is
//! injected, nothing is global. The layer is single-threaded and never
//! panics on malformed input: expressions typed at a prompt degrade to
//! empty or false results instead.

pub mod buffer;
pub mod config;
pub mod eval;
pub mod hashtable;
pub mod hdata;
pub mod session;
pub mod strings;
pub mod window;

pub use buffer::{Buffer, BufferList};
pub use config::{ConfigRegistry, OptionValue};
pub use eval::{is_true, EvalEnv, EvalOptions};
pub use hashtable::{Hashtable, HashtableType, Pointer, Value};
pub use hdata::{ArraySize, FieldValue, Hdata, HdataRegistry, HdataType};
pub use session::Session;
pub use strings::SharedStrings;
pub use window::{Window, WindowList};
