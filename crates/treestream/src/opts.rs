//! Ambient pass options
//!
//! Passes receive caller-supplied options through a dynamically scoped
//! "current options" slot. The engine never interprets them: every value it
//! builds snapshots the current options, and passes read them back from any
//! token they are handed.
//!
//! Overrides are scoped with [`OptionsScope`], which restores the previous
//! options when dropped, including during unwinding.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Options threaded through a pipeline of passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Free-form arguments supplied by the host
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,

    /// Name of the file being transformed
    #[serde(default)]
    pub file: Option<String>,
}

impl Options {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Builder: set an argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Builder: set the file name.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Look an argument up.
    pub fn arg(&self, name: &str) -> Option<&serde_json::Value> {
        self.args.get(name)
    }
}

thread_local! {
    static CURRENT: RefCell<Rc<Options>> = RefCell::new(Rc::new(Options::default()));
}

/// The options currently in effect.
pub fn current() -> Rc<Options> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Replace the current options.
///
/// Usually called inside a [`scope`] so the replacement is undone.
pub fn set(opts: Options) {
    set_shared(Rc::new(opts));
}

/// Replace the current options with an already shared snapshot.
pub fn set_shared(opts: Rc<Options>) {
    CURRENT.with(|c| *c.borrow_mut() = opts);
}

/// RAII guard that restores the options captured at creation when dropped.
///
/// # Example
///
/// ```
/// use treestream::opts::{self, Options};
///
/// {
///     let _scope = opts::scope();
///     opts::set(Options::new().with_file("a.js"));
///     assert_eq!(opts::current().file.as_deref(), Some("a.js"));
/// }
/// assert_eq!(opts::current().file, None);
/// ```
pub struct OptionsScope {
    saved: Rc<Options>,
}

/// Open a scope; options set inside it are reverted on drop.
pub fn scope() -> OptionsScope {
    OptionsScope { saved: current() }
}

impl Drop for OptionsScope {
    fn drop(&mut self) {
        let saved = self.saved.clone();
        CURRENT.with(|c| *c.borrow_mut() = saved);
    }
}

/// Run `f` with `opts` in effect, restoring the previous options afterwards.
pub fn with_options<T>(opts: Options, f: impl FnOnce() -> T) -> T {
    let _scope = scope();
    set(opts);
    f()
}
