//! Depth tracking and the sibling walker

use std::rc::Rc;

use crate::cursor::{Leveled, TokenSource};
use crate::opts::Options;
use crate::token::Token;

/// Cursor layer counting the depth of the tokens taken so far.
pub struct Level<S> {
    inner: S,
    level: isize,
}

impl<S: TokenSource> Level<S> {
    /// Start counting at depth 0.
    pub fn new(inner: S) -> Self {
        Self { inner, level: 0 }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TokenSource> TokenSource for Level<S> {
    fn cur(&self) -> Option<&Token> {
        self.inner.cur()
    }

    fn take(&mut self) -> Option<Token> {
        let tok = self.inner.take()?;
        if tok.enter {
            self.level += 1;
        }
        if tok.leave {
            self.level -= 1;
        }
        Some(tok)
    }

    fn opts(&self) -> Rc<Options> {
        self.inner.opts()
    }
}

impl<S: TokenSource> Leveled for Level<S> {
    fn level(&self) -> isize {
        self.level
    }
}

/// Walker over the tokens of consecutive sibling subtrees.
///
/// The walk starts at the lookahead (which must be an opener) and ends once
/// depth is back at the starting depth and the lookahead no longer opens a
/// sibling. That check runs at the next pull rather than right after a
/// token is returned, so the caller may consume or rewrite input between
/// pulls and the walk resumes from wherever the cursor ends up.
///
/// ```
/// use treestream::cursor::{levels, Leveled};
/// use treestream::template::Template;
/// use treestream::Slot;
///
/// let toks = Template::from("=[a, b]").tokens(Slot::Top).unwrap();
/// let mut s = levels(toks).unwrap();
/// let mut sub = s.sub();
/// let mut seen = 0;
/// while let Some(_tok) = sub.next(&mut s) {
///     seen += 1;
/// }
/// assert_eq!(seen, 8);
/// ```
#[derive(Debug, Default)]
pub struct Sub {
    exit: isize,
    started: bool,
    done: bool,
}

impl Sub {
    /// A walker that has not pulled anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull the next token of the walk from `s`.
    pub fn next<S: Leveled + ?Sized>(&mut self, s: &mut S) -> Option<Token> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if s.exhausted() || s.cur_lev().is_none() {
                self.done = true;
                return None;
            }
            self.exit = s.level();
        } else if self.exit >= s.level() {
            let sibling = s.cur_lev().is_some() && self.exit <= s.level();
            if !sibling {
                self.done = true;
                return None;
            }
        }
        let tok = s.take();
        if tok.is_none() {
            self.done = true;
        }
        tok
    }
}
