//! Output streams
//!
//! A [`Stream`] sits on top of an input cursor and owns the deferred-output
//! stack. Passes pull tokens from the input, push the tokens they want to
//! keep into a sink, and let the stack remember how each subtree they
//! opened must be closed.
//!
//! Capabilities are grouped per file:
//!
//! - [`output`]: building tokens, `leave`, labels
//! - [`peel`]: re-emitting an input node while rewriting its children
//! - [`template`]: splicing compiled templates around placeholders
//!
//! # Example
//!
//! ```
//! use treestream::stream::output;
//! use treestream::{Kind, Slot};
//!
//! let mut s = output();
//! let mut out = Vec::new();
//! out.push(s.enter(Slot::Top, Kind::ExpressionStatement).unwrap());
//! out.push(s.tok(Slot::Expression, Kind::ThisExpression).unwrap());
//! s.leave(&mut out).unwrap();
//! assert_eq!(out.len(), 3);
//! assert!(out[2].is_close());
//! ```

use std::collections::VecDeque;
use std::rc::Rc;

use crate::cursor::{Level, Leveled, Lookahead, NoInput, TokenSource};
use crate::error::Result;
use crate::kind::Kind;
use crate::opts::Options;
use crate::token::{Token, Value, ValueId};

pub mod output;
pub mod peel;
pub mod template;

/// Cursor stack used by the bundled passes.
pub type Auto = Stream<Level<Lookahead>>;

/// Output-only stream.
pub type Output = Stream<NoInput>;

/// Build a full stream (lookahead, levels, output, peel, templates).
pub fn auto<I>(source: I) -> Result<Auto>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
{
    Ok(Stream::new(Level::new(Lookahead::new(source)?)))
}

/// Build a stream with no input, for emitting generated tokens.
pub fn output() -> Output {
    Stream::new(NoInput)
}

/// Entry of the deferred-output stack.
#[derive(Debug)]
enum Frame {
    /// Emit this close token
    Close(Token),
    /// Consume the real close of a peeled node from input
    Skip(ValueId),
    /// A peeled leaf: nothing to consume
    VirtualClose,
    /// Copy one input token
    Copy,
    /// Flush the tail of the most recent template
    Template,
    /// Emit prebuilt tokens
    Emit(Vec<Token>),
}

/// Stack depth captured by [`Stream::label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// What a new token is built from.
#[derive(Debug, Clone)]
pub enum NodeSpec {
    /// Fresh payload of the kind
    Kind(Kind),
    /// Existing value; the kind is inferred
    Value(Value),
    /// Existing value under an explicit kind
    Both(Kind, Value),
}

impl From<Kind> for NodeSpec {
    fn from(kind: Kind) -> Self {
        NodeSpec::Kind(kind)
    }
}

impl From<Value> for NodeSpec {
    fn from(value: Value) -> Self {
        NodeSpec::Value(value)
    }
}

impl From<(Kind, Value)> for NodeSpec {
    fn from((kind, value): (Kind, Value)) -> Self {
        NodeSpec::Both(kind, value)
    }
}

/// Input cursor plus the deferred-output stack.
pub struct Stream<S> {
    input: S,
    /// Top of the stack is the last element
    stack: Vec<Frame>,
    /// Pending template tails, most recent last
    templates: Vec<VecDeque<Token>>,
}

impl<S: TokenSource> Stream<S> {
    /// Layer a stream over an input cursor.
    pub fn new(input: S) -> Self {
        Self {
            input,
            stack: Vec::new(),
            templates: Vec::new(),
        }
    }

    /// The input cursor.
    pub fn input(&self) -> &S {
        &self.input
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl<S: TokenSource> TokenSource for Stream<S> {
    fn cur(&self) -> Option<&Token> {
        self.input.cur()
    }

    fn take(&mut self) -> Option<Token> {
        self.input.take()
    }

    fn opts(&self) -> Rc<Options> {
        self.input.opts()
    }
}

impl<S: Leveled> Leveled for Stream<S> {
    fn level(&self) -> isize {
        self.input.level()
    }

    fn exhausted(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::VirtualClose))
    }
}
