//! Expression/statement coercion markers
//!
//! A pass that needs an expression where it may have a statement (or the
//! other way around) wraps the subtree in a `MakeExpr` or `MakeStmt`
//! marker, and [`make_expr`] rewrites the marked subtree afterwards:
//!
//! | Marker     | Subtree     | Result                        |
//! |------------|-------------|-------------------------------|
//! | `MakeExpr` | expression  | unchanged                     |
//! | `MakeExpr` | block       | `(() => { ... })()`           |
//! | `MakeExpr` | statement   | `(() => { stmt })()`          |
//! | `MakeStmt` | statement   | unchanged                     |
//! | `MakeStmt` | expression  | `expr;`                       |

use tracing::trace;

use crate::cursor::{Leveled, TokenSource};
use crate::error::{PassResult, Result, StreamError};
use crate::kind::{Kind, Shape, Slot};
use crate::kit::{move_to, wrap};
use crate::stream::Stream;
use crate::token::Token;

/// Resolve every `MakeExpr` and `MakeStmt` marker.
///
/// A marker directly wrapping another marker is unwrapped; the outer one
/// decides the result.
///
/// # Errors
///
/// [`StreamError::Unconvertible`] if a `MakeExpr` subtree is neither an
/// expression nor a statement.
pub fn make_expr<I>(input: I) -> PassResult<Vec<Token>>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
{
    wrap("makeExpr", input, walk)
}

fn walk<S: Leveled>(s: &mut Stream<S>, out: &mut Vec<Token>) -> Result<()> {
    let mut sub = s.sub();
    while let Some(tok) = sub.next(s) {
        let target = match tok.kind {
            Kind::MakeExpr => Shape::EXPR,
            Kind::MakeStmt => Shape::STMT,
            _ => {
                out.push(tok);
                continue;
            }
        };
        if tok.is_open() {
            coerce(s, tok.slot, target, out)?;
        }
    }
    Ok(())
}

fn coerce<S: Leveled>(
    s: &mut Stream<S>,
    slot: Slot,
    target: Shape,
    out: &mut Vec<Token>,
) -> Result<()> {
    let head = match s.cur_lev() {
        Some(head) => head.clone(),
        None => return Ok(()),
    };
    if matches!(head.kind, Kind::MakeExpr | Kind::MakeStmt) {
        s.take();
        if head.is_leaf() {
            return Ok(());
        }
        coerce(s, slot, target, out)?;
        walk(s, out)?;
        s.close(head.id())?;
        return Ok(());
    }
    s.take();
    if target.expr {
        to_expr(s, head, slot, out)
    } else {
        to_stmt(s, head, slot, out)
    }
}

fn to_expr<S: Leveled>(
    s: &mut Stream<S>,
    head: Token,
    slot: Slot,
    out: &mut Vec<Token>,
) -> Result<()> {
    let shape = head.kind.info().shape;
    if shape.expr {
        return move_to(s, head, slot, out, walk);
    }
    if !shape.stmt && !shape.block {
        return Err(StreamError::Unconvertible {
            kind: head.kind,
            target: Shape::EXPR,
        });
    }
    trace!(kind = %head.kind, %slot, "wrapping in an immediately invoked arrow");
    out.push(s.enter(slot, Kind::CallExpression)?);
    out.push(s.enter(Slot::Callee, Kind::ArrowFunctionExpression)?);
    out.push(s.tok(Slot::Params, Kind::Array)?);
    if shape.block {
        move_to(s, head, Slot::Body, out, walk)?;
    } else {
        let label = s.label();
        out.push(s.enter(Slot::Body, Kind::BlockStatement)?);
        out.push(s.enter(Slot::Body, Kind::Array)?);
        move_to(s, head, Slot::Push, out, walk)?;
        s.unwind(label, out)?;
    }
    s.leave(out)?;
    out.push(s.tok(Slot::Arguments, Kind::Array)?);
    s.leave(out)?;
    Ok(())
}

fn to_stmt<S: Leveled>(
    s: &mut Stream<S>,
    head: Token,
    slot: Slot,
    out: &mut Vec<Token>,
) -> Result<()> {
    let shape = head.kind.info().shape;
    if shape.stmt || shape.block {
        return move_to(s, head, slot, out, walk);
    }
    trace!(kind = %head.kind, %slot, "wrapping in an expression statement");
    out.push(s.enter(slot, Kind::ExpressionStatement)?);
    move_to(s, head, Slot::Expression, out, walk)?;
    s.leave(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::output;
    use crate::tree::{consume, Node};
    use pretty_assertions::assert_eq;

    /// `ReturnStatement { argument: <marker>[ template ] }`
    fn marked(marker: Kind, slot: Slot, inner: &str) -> Vec<Token> {
        let mut s = output();
        let mut out = Vec::new();
        out.push(s.enter(Slot::Top, Kind::ReturnStatement).unwrap());
        out.push(s.enter(slot, marker).unwrap());
        out.extend(s.toks(Slot::Push, inner).unwrap());
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        out
    }

    fn argument(tokens: Vec<Token>) -> Node {
        let mut top = consume(make_expr(tokens).unwrap()).unwrap().top;
        top.take_child(Slot::Argument).unwrap()
    }

    #[test]
    fn test_expression_passes_through() {
        let arg = argument(marked(Kind::MakeExpr, Slot::Argument, "=a + b"));
        assert_eq!(arg.kind, Kind::BinaryExpression);
    }

    #[test]
    fn test_block_becomes_iife() {
        let arg = argument(marked(Kind::MakeExpr, Slot::Argument, "{ a; b; }"));
        assert_eq!(arg.kind, Kind::CallExpression);
        assert_eq!(arg.list(Slot::Arguments), Some(&[][..]));
        let callee = arg.child(Slot::Callee).unwrap();
        assert_eq!(callee.kind, Kind::ArrowFunctionExpression);
        assert_eq!(callee.list(Slot::Params), Some(&[][..]));
        let body = callee.child(Slot::Body).unwrap();
        assert_eq!(body.kind, Kind::BlockStatement);
        assert_eq!(body.list(Slot::Body).map(|b| b.len()), Some(2));
    }

    #[test]
    fn test_statement_becomes_iife_with_block() {
        let arg = argument(marked(Kind::MakeExpr, Slot::Argument, "if (x) y;"));
        let body = arg
            .child(Slot::Callee)
            .and_then(|c| c.child(Slot::Body))
            .unwrap();
        assert_eq!(body.kind, Kind::BlockStatement);
        let stmts = body.list(Slot::Body).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].kind, Kind::IfStatement);
    }

    #[test]
    fn test_make_stmt_wraps_expressions() {
        let toks = marked(Kind::MakeStmt, Slot::Argument, "=f()");
        let out = make_expr(toks).unwrap();
        assert_eq!(out[1].kind, Kind::ExpressionStatement);
        assert_eq!(out[1].slot, Slot::Argument);
        assert_eq!(out[2].slot, Slot::Expression);
        assert_eq!(out[2].kind, Kind::CallExpression);
    }

    #[test]
    fn test_outer_marker_wins() {
        let mut s = output();
        let mut out = Vec::new();
        out.push(s.enter(Slot::Top, Kind::ReturnStatement).unwrap());
        out.push(s.enter(Slot::Argument, Kind::MakeExpr).unwrap());
        out.push(s.enter(Slot::Push, Kind::MakeStmt).unwrap());
        out.extend(s.toks(Slot::Push, "=a").unwrap());
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        let arg = argument(out);
        assert_eq!(arg.kind, Kind::Identifier);
    }

    #[test]
    fn test_markers_inside_coerced_subtrees() {
        let mut s = output();
        let mut out = Vec::new();
        out.push(s.enter(Slot::Top, Kind::ReturnStatement).unwrap());
        out.push(s.enter(Slot::Argument, Kind::MakeExpr).unwrap());
        s.template(Slot::Push, "=f($$)").unwrap();
        let hole = s.open(&mut out).unwrap();
        out.push(s.enter(hole, Kind::MakeExpr).unwrap());
        out.extend(s.toks(Slot::Push, "{ a; }").unwrap());
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        let arg = argument(out);
        assert_eq!(arg.kind, Kind::CallExpression);
        let inner = &arg.list(Slot::Arguments).unwrap()[0];
        assert_eq!(inner.kind, Kind::CallExpression);
        assert_eq!(
            inner.child(Slot::Callee).map(|c| c.kind),
            Some(Kind::ArrowFunctionExpression)
        );
    }

    #[test]
    fn test_unconvertible() {
        let mut s = output();
        let mut out = Vec::new();
        out.push(s.enter(Slot::Top, Kind::ReturnStatement).unwrap());
        out.push(s.enter(Slot::Argument, Kind::MakeExpr).unwrap());
        out.extend(s.toks(Slot::Push, ">a = 1").unwrap());
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        let err = make_expr(out).unwrap_err();
        assert_eq!(
            err.error,
            StreamError::Unconvertible {
                kind: Kind::VariableDeclarator,
                target: Shape::EXPR
            }
        );
        assert_eq!(err.pass, "makeExpr");
    }
}
