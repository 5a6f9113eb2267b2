//! Field-type adjustment
//!
//! After a rewrite moves subtrees around, a field may hold a node of the
//! wrong grammatical shape: an expression where a statement list is
//! expected, a statement inside an expression, and so on. This pass
//! compares what each slot requires with what it holds and wraps the node
//! so the two agree.

use tracing::trace;

use crate::cursor::Leveled;
use crate::error::{PassResult, Result};
use crate::kind::{reset_field_info, Kind, Shape, Slot};
use crate::kit::{move_to, wrap};
use crate::stream::Stream;
use crate::token::Token;

/// Make every node fit the shape its slot requires.
///
/// | Slot requires | Node is    | Result                                 |
/// |---------------|------------|----------------------------------------|
/// | block         | expression | `{ return e; }` or `{ e; }`            |
/// | block         | statement  | `{ s; }`                               |
/// | statement     | expression | `return e;` or `e;`                    |
/// | expression    | statement  | `(() => { s; })()`                     |
///
/// `return` is chosen when the expression's value is marked as sitting in
/// a value-producing position ([`crate::token::ValueData::result`]).
/// A `VariableDeclaration` in a slot admitting declarations is kept, and
/// so is anything without a shape requirement. The required shapes are
/// recomputed from the stream itself first.
pub fn adjust_field_type<I>(input: I) -> PassResult<Vec<Token>>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
{
    wrap("adjustFieldType", reset_field_info(input), walk)
}

fn fits(field: Shape, kind: Kind) -> bool {
    let shape = kind.info().shape;
    (field.stmt && shape.stmt)
        || (field.expr && shape.expr)
        || (field.block && shape.block)
        || (field.decl && kind == Kind::VariableDeclaration)
}

fn walk<S: Leveled>(s: &mut Stream<S>, out: &mut Vec<Token>) -> Result<()> {
    let mut sub = s.sub();
    while let Some(tok) = sub.next(s) {
        if !tok.enter {
            out.push(tok);
            continue;
        }
        let field = tok.value.borrow().field.unwrap_or(Shape::NONE);
        if fits(field, tok.kind) {
            out.push(tok);
            continue;
        }
        let shape = tok.kind.info().shape;
        if field.block && (shape.expr || shape.stmt) {
            trace!(kind = %tok.kind, slot = %tok.slot, "wrapping in a block");
            to_block(s, tok, out)?;
        } else if field.stmt && shape.expr {
            trace!(kind = %tok.kind, slot = %tok.slot, "wrapping in a statement");
            let slot = tok.slot;
            statement(s, tok, slot, out)?;
        } else if field.expr && shape.stmt {
            trace!(kind = %tok.kind, slot = %tok.slot, "wrapping in an arrow call");
            to_call(s, tok, out)?;
        } else {
            out.push(tok);
        }
    }
    Ok(())
}

/// Wrap an expression in `return e;` or `e;` at `slot`.
fn statement<S: Leveled>(
    s: &mut Stream<S>,
    tok: Token,
    slot: Slot,
    out: &mut Vec<Token>,
) -> Result<()> {
    let result = tok.value.borrow().result;
    if result {
        out.push(s.enter(slot, Kind::ReturnStatement)?);
        move_to(s, tok, Slot::Argument, out, walk)?;
    } else {
        out.push(s.enter(slot, Kind::ExpressionStatement)?);
        move_to(s, tok, Slot::Expression, out, walk)?;
    }
    s.leave(out)?;
    Ok(())
}

fn to_block<S: Leveled>(s: &mut Stream<S>, tok: Token, out: &mut Vec<Token>) -> Result<()> {
    let label = s.label();
    out.push(s.enter(tok.slot, Kind::BlockStatement)?);
    out.push(s.enter(Slot::Body, Kind::Array)?);
    if tok.kind.info().shape.expr {
        statement(s, tok, Slot::Push, out)?;
    } else {
        move_to(s, tok, Slot::Push, out, walk)?;
    }
    s.unwind(label, out)
}

fn to_call<S: Leveled>(s: &mut Stream<S>, tok: Token, out: &mut Vec<Token>) -> Result<()> {
    let label = s.label();
    out.push(s.enter(tok.slot, Kind::CallExpression)?);
    out.push(s.enter(Slot::Callee, Kind::ArrowFunctionExpression)?);
    out.push(s.tok(Slot::Params, Kind::Array)?);
    if tok.kind == Kind::BlockStatement {
        move_to(s, tok, Slot::Body, out, walk)?;
    } else {
        let body = s.label();
        out.push(s.enter(Slot::Body, Kind::BlockStatement)?);
        out.push(s.enter(Slot::Body, Kind::Array)?);
        move_to(s, tok, Slot::Push, out, walk)?;
        s.unwind(body, out)?;
    }
    s.leave(out)?;
    out.push(s.tok(Slot::Arguments, Kind::Array)?);
    s.unwind(label, out)
}
