//! Template expansion on the output stack
//!
//! A registered template is a token list held apart from the input.
//! [`Stream::open`] emits it up to the next placeholder and returns the
//! placeholder's slot, so the pass can emit the content for that hole.
//! Whatever is left is flushed when the template's frame is unwound.

use tracing::trace;

use crate::cursor::TokenSource;
use crate::error::{Result, StreamError};
use crate::kind::{Kind, Slot};
use crate::stream::{Frame, Stream};
use crate::template::Template;
use crate::token::Token;

/// Placeholder standing for a statement or an expression
pub const HOLE: &str = "$$";
/// Placeholder standing for an expression only
pub const EXPR_HOLE: &str = "$E";

impl<S: TokenSource> Stream<S> {
    /// Register a template for insertion at `slot`.
    pub fn template(&mut self, slot: Slot, template: impl Into<Template>) -> Result<()> {
        let tokens = template.into().tokens(slot)?;
        self.stack.push(Frame::Template);
        self.templates.push(tokens.into());
        Ok(())
    }

    /// Emit the most recent template up to its next placeholder.
    ///
    /// The placeholder itself is dropped; its slot is returned.
    pub fn open(&mut self, out: &mut Vec<Token>) -> Result<Slot> {
        let pending = self
            .templates
            .last_mut()
            .ok_or(StreamError::NoPendingTemplate)?;
        while let Some(tok) = pending.pop_front() {
            if tok.enter {
                let hole = match tok.kind {
                    Kind::ExpressionStatement => pending
                        .front()
                        .map_or(false, |next| is_named(next, &[HOLE])),
                    Kind::Identifier => is_named(&tok, &[HOLE, EXPR_HOLE]),
                    _ => false,
                };
                if hole {
                    if !tok.leave {
                        while let Some(dropped) = pending.pop_front() {
                            if dropped.id() == tok.id() {
                                break;
                            }
                        }
                    }
                    trace!(slot = %tok.slot, "template placeholder");
                    return Ok(tok.slot);
                }
            }
            out.push(tok);
        }
        Err(StreamError::PlaceholderNotFound)
    }
}

fn is_named(tok: &Token, names: &[&str]) -> bool {
    tok.kind == Kind::Identifier
        && tok
            .name()
            .map_or(false, |name| names.contains(&name.as_str()))
}
