//! Variable declaration rewrites

use tracing::{debug, trace};

use crate::cursor::{Leveled, TokenSource};
use crate::error::{PassResult, Result, StreamError};
use crate::kind::{Kind, Shape, Slot};
use crate::kit::{move_to, wrap};
use crate::stream::Stream;
use crate::token::{clone_tokens, Token};

/// Turn every `let`/`const` declaration into `var`.
pub fn all_to_var<I>(input: I) -> impl Iterator<Item = Token>
where
    I: IntoIterator<Item = Token>,
{
    input.into_iter().inspect(|tok| {
        if tok.enter && tok.kind == Kind::VariableDeclaration {
            tok.value.set_attr("kind", "var");
        }
    })
}

/// Move every variable declaration to the start of its function or
/// program scope.
///
/// Each declaration becomes a `var` at the top of the scope with its
/// initializers removed; the initializers stay where they were as
/// assignments:
///
/// ```text
/// function f() {            function f() {
///   g();                      var a, b;
///   let a = 1, b = 2;   =>    g();
/// }                           a = 1;
///                             b = 2;
///                           }
/// ```
///
/// A declaration heading a `for` loop keeps an assignment (or a sequence
/// of them) in the loop's `init`, and in `for ... in`/`for ... of` only
/// the declared pattern. Arrow functions with block bodies, and class and
/// object methods, are scopes of their own.
///
/// A root that is not a scope collects the declarations of its own
/// subtree. They are emitted ahead of it when it sits in a list
/// ([`Slot::Push`]); otherwise a statement root is wrapped in a block
/// holding both.
///
/// # Errors
///
/// [`StreamError::Unconvertible`] for a root outside a list that is not a
/// statement yet has declarations to hoist.
pub fn hoist_var_decls<I>(input: I) -> PassResult<Vec<Token>>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
{
    wrap("hoistVarDecls", input, |s, out| {
        let root = s.cur().map(|tok| tok.kind);
        match root {
            Some(kind) if kind == Kind::Program || is_scope(kind) => {
                let head = s.take().ok_or(StreamError::UnexpectedEnd)?;
                scope(s, head, out)
            }
            _ => {
                let mut decls = Vec::new();
                let mut body = Vec::new();
                walk(s, &mut body, &mut decls)?;
                self::root(s, decls, body, out)
            }
        }
    })
}

fn is_scope(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::FunctionDeclaration | Kind::FunctionExpression | Kind::ClassMethod | Kind::ObjectMethod
    )
}

/// Emit a rewritten root that is not a scope along with its declarations.
fn root<S: TokenSource>(
    s: &mut Stream<S>,
    decls: Vec<Token>,
    body: Vec<Token>,
    out: &mut Vec<Token>,
) -> Result<()> {
    let head = match body.first() {
        Some(head) if !decls.is_empty() && head.slot != Slot::Push => head.clone(),
        _ => {
            out.extend(decls);
            out.extend(body);
            return Ok(());
        }
    };
    if !head.kind.info().shape.stmt {
        return Err(StreamError::Unconvertible {
            kind: head.kind,
            target: Shape::STMT,
        });
    }
    trace!(kind = %head.kind, slot = %head.slot, "wrapping root to hold its declarations");
    let label = s.label();
    out.push(s.enter(head.slot, Kind::BlockStatement)?);
    out.push(s.enter(Slot::Body, Kind::Array)?);
    out.extend(decls);
    out.extend(reslot(body, Slot::Push));
    s.unwind(label, out)
}

fn walk<S: Leveled>(
    s: &mut Stream<S>,
    out: &mut Vec<Token>,
    decls: &mut Vec<Token>,
) -> Result<()> {
    let mut sub = s.sub();
    while let Some(tok) = sub.next(s) {
        if tok.is_open() {
            match tok.kind {
                kind if is_scope(kind) => {
                    scope(s, tok, out)?;
                    continue;
                }
                Kind::ArrowFunctionExpression => {
                    arrow(s, tok, out, decls)?;
                    continue;
                }
                Kind::VariableDeclaration => {
                    declaration(s, tok, out, decls)?;
                    continue;
                }
                _ => {}
            }
        }
        out.push(tok);
    }
    Ok(())
}

/// Rewrite one subtree whose head token was already taken.
fn node<S: Leveled>(
    s: &mut Stream<S>,
    head: Token,
    out: &mut Vec<Token>,
    decls: &mut Vec<Token>,
) -> Result<()> {
    if head.is_open() {
        match head.kind {
            kind if is_scope(kind) => return scope(s, head, out),
            Kind::ArrowFunctionExpression => return arrow(s, head, out, decls),
            _ => {}
        }
    }
    let slot = head.slot;
    move_to(s, head, slot, out, |s, run| walk(s, run, decls))
}

/// Rewrite a function or a program whose head token was already taken.
fn scope<S: Leveled>(s: &mut Stream<S>, head: Token, out: &mut Vec<Token>) -> Result<()> {
    let label = s.label();
    let program = head.kind == Kind::Program;
    out.push(s.peel(Some(head))?);
    if !program {
        s.peel_to(Slot::Body, out)?;
    }
    s.peel_to(Slot::Body, out)?;
    body(s, out)?;
    s.unwind(label, out)
}

/// Rewrite the statement list at the lookahead of a fresh scope.
fn body<S: Leveled>(s: &mut Stream<S>, out: &mut Vec<Token>) -> Result<()> {
    let mut decls = Vec::new();
    let mut stmts = Vec::new();
    walk(s, &mut stmts, &mut decls)?;
    if !decls.is_empty() {
        debug!(tokens = decls.len(), "hoisted declarations");
    }
    out.extend(decls);
    out.extend(stmts);
    Ok(())
}

fn arrow<S: Leveled>(
    s: &mut Stream<S>,
    head: Token,
    out: &mut Vec<Token>,
    decls: &mut Vec<Token>,
) -> Result<()> {
    let label = s.label();
    out.push(s.peel(Some(head))?);
    let block = s
        .until_slot(Slot::Body, out)
        .map_or(false, |tok| tok.kind == Kind::BlockStatement && tok.is_open());
    if block {
        s.peel_to(Slot::Body, out)?;
        s.peel_to(Slot::Body, out)?;
        body(s, out)?;
    } else {
        walk(s, out, decls)?;
    }
    s.unwind(label, out)
}

/// Collected parts of one declaration.
#[derive(Default)]
struct Declared {
    /// Token runs of the declared patterns
    ids: Vec<Vec<Token>>,
    /// Token runs of `id = init` assignments, at slot `Expression`
    assigns: Vec<Vec<Token>>,
}

/// Give a single-subtree token run a new slot.
fn reslot(mut run: Vec<Token>, slot: Slot) -> Vec<Token> {
    if let Some(first) = run.first_mut() {
        first.slot = slot;
    }
    if let Some(last) = run.last_mut() {
        last.slot = slot;
    }
    run
}

fn declaration<S: Leveled>(
    s: &mut Stream<S>,
    head: Token,
    out: &mut Vec<Token>,
    decls: &mut Vec<Token>,
) -> Result<()> {
    let slot = head.slot;
    head.value.set_attr("kind", "var");
    let mut hoisted = vec![s.peel(Some(head.with_slot(Slot::Push)))?];
    let mut found = Declared::default();
    let mut sub = s.sub();
    while let Some(tok) = sub.next(s) {
        if tok.enter && tok.slot == Slot::Id {
            let mut id = vec![tok.clone()];
            if tok.is_open() {
                let level = s.level() - 1;
                s.till_level(level, &mut id);
            }
            hoisted.extend(id.iter().cloned());
            found.ids.push(id);
        } else if tok.enter && tok.slot == Slot::Init && tok.kind != Kind::Null {
            let left = found.ids.last().cloned().unwrap_or_default();
            let mut assign = Vec::new();
            assign.push(s.enter(Slot::Expression, Kind::AssignmentExpression)?);
            if let Some(open) = assign.first() {
                open.value.set_attr("operator", "=");
            }
            assign.extend(reslot(clone_tokens(left), Slot::Left));
            node(s, tok.with_slot(Slot::Right), &mut assign, decls)?;
            s.leave(&mut assign)?;
            found.assigns.push(assign);
            hoisted.push(s.tok(Slot::Init, Kind::Null)?);
        } else {
            hoisted.push(tok);
        }
    }
    s.leave(&mut hoisted)?;
    trace!(%slot, declarators = found.ids.len(), "hoisting declaration");
    decls.extend(hoisted);
    replace(s, slot, found, out)
}

/// Emit what stays in place of a hoisted declaration.
fn replace<S: TokenSource>(
    s: &mut Stream<S>,
    slot: Slot,
    found: Declared,
    out: &mut Vec<Token>,
) -> Result<()> {
    let Declared { ids, assigns } = found;
    match slot {
        Slot::Push => {
            for assign in assigns {
                out.push(s.enter(Slot::Push, Kind::ExpressionStatement)?);
                out.extend(assign);
                s.leave(out)?;
            }
        }
        Slot::Left => {
            if let Some(id) = ids.into_iter().next() {
                out.extend(reslot(clone_tokens(id), Slot::Left));
            }
        }
        Slot::Init => expression(s, slot, assigns, out)?,
        _ => match assigns.len() {
            0 => out.push(s.tok(slot, Kind::EmptyStatement)?),
            1 => {
                out.push(s.enter(slot, Kind::ExpressionStatement)?);
                expression(s, Slot::Expression, assigns, out)?;
                s.leave(out)?;
            }
            _ => {
                let label = s.label();
                out.push(s.enter(slot, Kind::BlockStatement)?);
                out.push(s.enter(Slot::Body, Kind::Array)?);
                for assign in assigns {
                    out.push(s.enter(Slot::Push, Kind::ExpressionStatement)?);
                    out.extend(assign);
                    s.leave(out)?;
                }
                s.unwind(label, out)?;
            }
        },
    }
    Ok(())
}

/// Emit assignments as one expression at `slot`: null, the assignment, or
/// a sequence.
fn expression<S: TokenSource>(
    s: &mut Stream<S>,
    slot: Slot,
    assigns: Vec<Vec<Token>>,
    out: &mut Vec<Token>,
) -> Result<()> {
    match assigns.len() {
        0 => out.push(s.tok(slot, Kind::Null)?),
        1 => {
            for assign in assigns {
                out.extend(reslot(assign, slot));
            }
        }
        _ => {
            let label = s.label();
            out.push(s.enter(slot, Kind::SequenceExpression)?);
            out.push(s.enter(Slot::Expressions, Kind::Array)?);
            for assign in assigns {
                out.extend(reslot(assign, Slot::Push));
            }
            s.unwind(label, out)?;
        }
    }
    Ok(())
}
