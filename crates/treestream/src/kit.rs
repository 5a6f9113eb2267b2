//! Pass running and shared rewrite helpers

use tracing::{debug, debug_span, warn};

use crate::cursor::{Leveled, TokenSource};
use crate::error::{ErrorSite, PassError, PassResult, Result, StreamError};
use crate::kind::{Kind, Slot};
use crate::opts::{self, Options};
use crate::stream::{self, Auto, Label, Stream};
use crate::token::Token;
use crate::tree::{consume, produce, Node};

/// Run a pass body over `input` under the name `name`.
///
/// The body reads from a full [`Auto`] stream and writes into the sink. The
/// first failure is reported as a [`PassError`] attributed to the nearest
/// located node: the last emitted token if it has a location, otherwise
/// the next located node left in the input.
pub fn wrap<I, F>(name: &str, input: I, body: F) -> PassResult<Vec<Token>>
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'static,
    F: FnOnce(&mut Auto, &mut Vec<Token>) -> Result<()>,
{
    let span = debug_span!("pass", name);
    let _enter = span.enter();
    let mut s = stream::auto(input).map_err(|error| PassError {
        pass: name.to_string(),
        error,
        site: None,
        approximated: false,
    })?;
    let mut out = Vec::new();
    match body(&mut s, &mut out) {
        Ok(()) => {
            debug!(tokens = out.len(), "pass finished");
            Ok(out)
        }
        Err(error) => {
            let err = s.error(name, error, out.last());
            warn!(error = %err, "pass failed");
            Err(err)
        }
    }
}

impl<S: TokenSource> Stream<S> {
    /// Attribute `error` to a node, for reporting from pass `name`.
    ///
    /// `near` is the token being processed when the failure happened. When
    /// it has no location the remaining input is scanned for one, and the
    /// result is marked approximated.
    pub fn error(&mut self, name: &str, error: StreamError, near: Option<&Token>) -> PassError {
        let exact = near.and_then(|tok| {
            tok.value.loc().map(|loc| ErrorSite {
                kind: tok.kind,
                loc: Some(loc),
            })
        });
        let (site, approximated) = match exact {
            Some(site) => (Some(site), false),
            None => {
                let found = self.locate();
                let fallback = near.map(|tok| ErrorSite {
                    kind: tok.kind,
                    loc: None,
                });
                (found.or(fallback), true)
            }
        };
        PassError {
            pass: name.to_string(),
            error,
            site,
            approximated,
        }
    }

    /// Consume input up to the next node with a source location.
    pub fn locate(&mut self) -> Option<ErrorSite> {
        while let Some(tok) = self.take() {
            if !tok.enter {
                continue;
            }
            if let Some(loc) = tok.value.loc() {
                return Some(ErrorSite {
                    kind: tok.kind,
                    loc: Some(loc),
                });
            }
        }
        None
    }
}

/// Produce `node`, run `pass` over its tokens with `opts` in effect, and
/// rebuild the result.
pub fn transform<F>(node: &Node, opts: Options, pass: F) -> PassResult<Node>
where
    F: FnOnce(Vec<Token>) -> PassResult<Vec<Token>>,
{
    opts::with_options(opts, || {
        let out = pass(produce(node))?;
        consume(out).map(|c| c.top).map_err(|error| PassError {
            pass: "consume".to_string(),
            error,
            site: None,
            approximated: false,
        })
    })
}

/// Move the next subtree to `slot`.
///
/// The head token `tok` has already been taken. Leaves are re-slotted as
/// they are; other nodes are peeled and `children` rewrites their content.
pub fn move_to<S, F>(
    s: &mut Stream<S>,
    tok: Token,
    slot: Slot,
    out: &mut Vec<Token>,
    children: F,
) -> Result<()>
where
    S: Leveled,
    F: FnOnce(&mut Stream<S>, &mut Vec<Token>) -> Result<()>,
{
    if tok.is_leaf() {
        out.push(tok.with_slot(slot));
        return Ok(());
    }
    out.push(s.peel(Some(tok.with_slot(slot)))?);
    children(s, out)?;
    s.leave(out)?;
    Ok(())
}

/// Where [`to_block_body`] put the statements it was asked to place.
#[derive(Debug)]
#[must_use = "the block body must be finished"]
pub struct BlockBody {
    label: Label,
    spliced: bool,
}

/// Prepare to emit statements in place of the subtree at the lookahead.
///
/// When the lookahead is a `BlockStatement` its wrapper is dropped and the
/// output continues straight into the surrounding statement list;
/// otherwise the output goes into a `Subst` marker for
/// [`crate::passes::complete_subst`] to splice. Close with
/// [`BlockBody::finish`].
pub fn to_block_body<S: Leveled>(s: &mut Stream<S>, out: &mut Vec<Token>) -> Result<BlockBody> {
    let label = s.label();
    let is_block = s
        .cur()
        .map_or(false, |tok| tok.kind == Kind::BlockStatement);
    if is_block {
        s.peel(None)?;
        let mut dropped = Vec::new();
        s.peel_to(Slot::Body, &mut dropped)?;
    } else {
        out.push(s.enter(Slot::Push, Kind::Subst)?);
    }
    Ok(BlockBody {
        label,
        spliced: is_block,
    })
}

impl BlockBody {
    /// Close whatever [`to_block_body`] opened.
    pub fn finish<S: TokenSource>(self, s: &mut Stream<S>, out: &mut Vec<Token>) -> Result<()> {
        if self.spliced {
            let mut dropped = Vec::new();
            s.unwind(self.label, &mut dropped)
        } else {
            s.unwind(self.label, out)
        }
    }
}

/// Run `inner` with its output placed as statements of the current block.
pub fn in_block_body<S, F>(s: &mut Stream<S>, out: &mut Vec<Token>, inner: F) -> Result<()>
where
    S: Leveled,
    F: FnOnce(&mut Stream<S>, &mut Vec<Token>) -> Result<()>,
{
    let body = to_block_body(s, out)?;
    inner(s, out)?;
    body.finish(s, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::complete_subst;
    use crate::template::Template;
    use crate::token::{Loc, Position};
    use pretty_assertions::assert_eq;

    fn at(line: u32) -> Loc {
        Loc {
            start: Position { line, column: 0 },
            end: Position { line, column: 1 },
            source: None,
        }
    }

    #[test]
    fn test_wrap_passes_output_through() {
        let toks = Template::from("=a").tokens(Slot::Top).unwrap();
        let out = wrap("copy", toks, |s, out| {
            s.sub_into(out);
            Ok(())
        })
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_wrap_attributes_errors() {
        let toks = Template::from("=f(a)").tokens(Slot::Top).unwrap();
        toks[4].value.borrow_mut().payload = crate::token::Payload::Node(crate::token::NodeData {
            kind: Some(Kind::Identifier),
            loc: Some(at(3)),
            ..Default::default()
        });
        let err = wrap("failing", toks, |s, out| {
            out.push(s.take().ok_or(StreamError::UnexpectedEnd)?);
            Err(StreamError::PlaceholderNotFound)
        })
        .unwrap_err();
        assert_eq!(err.pass, "failing");
        assert!(err.approximated);
        assert_eq!(err.site.clone().and_then(|s| s.loc), Some(at(3)));
        assert!(err.to_string().contains("during failing (the position is approximated)"));
    }

    #[test]
    fn test_wrap_exact_site() {
        let toks = Template::from("=a").tokens(Slot::Top).unwrap();
        toks[0].value.borrow_mut().payload = crate::token::Payload::Node(crate::token::NodeData {
            kind: Some(Kind::Identifier),
            loc: Some(at(1)),
            ..Default::default()
        });
        let err = wrap("failing", toks, |s, out| {
            out.push(s.take().ok_or(StreamError::UnexpectedEnd)?);
            Err(StreamError::PlaceholderNotFound)
        })
        .unwrap_err();
        assert!(!err.approximated);
        assert_eq!(err.site.map(|s| s.kind), Some(Kind::Identifier));
    }

    #[test]
    fn test_in_block_body_splices_blocks() {
        // `{ a; b; }` inside a statement list: statements land in the list
        let toks = Template::from("{ a; b; }").tokens(Slot::Push).unwrap();
        let out = wrap("splice", toks, |s, out| {
            in_block_body(s, out, |s, out| {
                s.sub_into(out);
                Ok(())
            })
        })
        .unwrap();
        let kinds: Vec<Kind> = out.iter().filter(|t| t.is_open()).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::ExpressionStatement,
                Kind::Identifier,
                Kind::ExpressionStatement,
                Kind::Identifier
            ]
        );
    }

    #[test]
    fn test_in_block_body_wraps_others() {
        let toks = Template::from("a;").tokens(Slot::Push).unwrap();
        let out = wrap("splice", toks, |s, out| {
            in_block_body(s, out, |s, out| {
                s.one(out);
                Ok(())
            })
        })
        .unwrap();
        assert_eq!(out[0].kind, Kind::Subst);
        assert_eq!(out.last().map(|t| t.kind), Some(Kind::Subst));
        let resolved = complete_subst(out).unwrap();
        assert_eq!(resolved[0].kind, Kind::ExpressionStatement);
        assert_eq!(resolved[0].slot, Slot::Push);
    }

    #[test]
    fn test_transform_round_trip() {
        let node = Node::new(Kind::Program).with_list(Slot::Body, vec![]);
        let back = transform(&node, Options::new(), Ok).unwrap();
        assert_eq!(back, node);
    }
}
