//! Input cursors
//!
//! Cursors layer on one another the way a pass needs them:
//!
//! - [`Lookahead`] keeps one token of lookahead over any token source
//! - [`Level`] counts depth and adds the subtree-level operations of
//!   [`Leveled`]
//! - [`crate::stream::Stream`] adds the output stack on top
//!
//! The subtree operations are provided methods of [`Leveled`], so every
//! layer above [`Level`] gets them by forwarding `level`.

use std::rc::Rc;

use crate::error::{Result, StreamError};
use crate::kind::Slot;
use crate::opts::{self, Options};
use crate::token::Token;

pub mod level;
pub mod lookahead;
pub mod share;

pub use level::{Level, Sub};
pub use lookahead::Lookahead;
pub use share::{share, Shared};

/// Wrap a token source in a lookahead cursor.
pub fn lookahead<I>(source: I) -> Result<Lookahead>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
{
    Lookahead::new(source)
}

/// Wrap a token source in a depth-tracking cursor.
pub fn levels<I>(source: I) -> Result<Level<Lookahead>>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
{
    Ok(Level::new(Lookahead::new(source)?))
}

/// A pull source of tokens with one token of lookahead.
pub trait TokenSource {
    /// Peek at the next token.
    fn cur(&self) -> Option<&Token>;

    /// Consume the next token, or `None` at the end.
    fn take(&mut self) -> Option<Token>;

    /// Options snapshot of the most recent token taken.
    fn opts(&self) -> Rc<Options> {
        opts::current()
    }
}

/// Source for streams that only produce output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl TokenSource for NoInput {
    fn cur(&self) -> Option<&Token> {
        None
    }

    fn take(&mut self) -> Option<Token> {
        None
    }
}

/// A token source tracking depth.
///
/// Depth starts at 0 and moves by +1 for every `enter` flag and -1 for every
/// `leave` flag of a taken token, so a leaf leaves it unchanged.
pub trait Leveled: TokenSource {
    /// Current depth.
    fn level(&self) -> isize;

    /// True while the node being traversed has no children left to visit.
    ///
    /// Plain level cursors never are; a stream is while its top frame is a
    /// virtual close.
    fn exhausted(&self) -> bool {
        false
    }

    /// The lookahead if it opens a subtree (or is a leaf).
    fn cur_lev(&self) -> Option<&Token> {
        self.cur().filter(|tok| tok.enter)
    }

    /// Consume exactly the next subtree, including its close, into `out`.
    ///
    /// Returns the subtree's last token, or `None` if the lookahead is not
    /// an opener.
    fn one(&mut self, out: &mut Vec<Token>) -> Option<Token> {
        if self.exhausted() || self.cur_lev().is_none() {
            return None;
        }
        let exit = self.level();
        let mut last = None;
        while let Some(tok) = self.take() {
            out.push(tok.clone());
            let done = exit >= self.level();
            last = Some(tok);
            if done {
                break;
            }
        }
        last
    }

    /// Sibling walker over the subtrees starting at the lookahead.
    fn sub(&self) -> Sub {
        Sub::new()
    }

    /// Drain [`Leveled::sub`] into `out`, returning the last token.
    fn sub_into(&mut self, out: &mut Vec<Token>) -> Option<Token> {
        let mut sub = Sub::new();
        let mut last = None;
        while let Some(tok) = sub.next(self) {
            out.push(tok.clone());
            last = Some(tok);
        }
        last
    }

    /// Copy whole sibling subtrees into `out` until the lookahead sits at
    /// `slot`. The found token is returned but left in the input.
    fn until_slot(&mut self, slot: Slot, out: &mut Vec<Token>) -> Option<Token> {
        if self.exhausted() {
            return None;
        }
        loop {
            let tok = self.cur_lev()?.clone();
            if tok.slot == slot {
                return Some(tok);
            }
            self.one(out)?;
        }
    }

    /// Like [`Leveled::until_slot`] but also consumes the found token.
    fn find_slot(&mut self, slot: Slot, out: &mut Vec<Token>) -> Option<Token> {
        if self.exhausted() {
            return None;
        }
        let found = self.until_slot(slot, out)?;
        self.take();
        Some(found)
    }

    /// Like [`Leveled::find_slot`], requiring a match and copying the found
    /// token to `out`.
    fn to_slot(&mut self, slot: Slot, out: &mut Vec<Token>) -> Result<Token> {
        let found = self
            .find_slot(slot, out)
            .ok_or(StreamError::SlotNotFound(slot))?;
        out.push(found.clone());
        Ok(found)
    }

    /// Copy tokens until a close token brings depth back to `level`.
    fn till_level(&mut self, level: isize, out: &mut Vec<Token>) {
        while let Some(tok) = self.take() {
            let leave = tok.leave;
            out.push(tok);
            if leave && self.level() == level {
                return;
            }
        }
    }
}
