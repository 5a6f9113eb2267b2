//! Substitution markers

use tracing::trace;

use crate::cursor::Leveled;
use crate::error::{PassResult, Result};
use crate::kind::{Kind, Slot};
use crate::kit::{move_to, wrap};
use crate::stream::Stream;
use crate::token::Token;

/// Replace every `Subst` marker by its children.
///
/// Each child takes the marker's slot. Markers nested directly inside a
/// marker are flattened into it, so the children end up at the slot of the
/// outermost one.
pub fn complete_subst<I>(input: I) -> PassResult<Vec<Token>>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
{
    wrap("completeSubst", input, walk)
}

fn walk<S: Leveled>(s: &mut Stream<S>, out: &mut Vec<Token>) -> Result<()> {
    let mut sub = s.sub();
    while let Some(tok) = sub.next(s) {
        if tok.kind != Kind::Subst {
            out.push(tok);
            continue;
        }
        if tok.is_open() {
            trace!(slot = %tok.slot, "splicing substitution");
            splice(s, tok.slot, out)?;
        }
    }
    Ok(())
}

fn splice<S: Leveled>(s: &mut Stream<S>, slot: Slot, out: &mut Vec<Token>) -> Result<()> {
    let mut sub = s.sub();
    while let Some(tok) = sub.next(s) {
        if tok.kind == Kind::Subst {
            if tok.is_open() {
                splice(s, slot, out)?;
            }
            continue;
        }
        move_to(s, tok, slot, out, walk)?;
    }
    Ok(())
}
