//! Token stream well-formedness checks
//!
//! [`verify`] checks what every pass must preserve: opens and closes pair
//! up by value identity and nest as a stack, array elements sit in
//! [`Slot::Push`], and other children sit in a field their parent declares,
//! in declaration order. Control markers obey pairing but are otherwise
//! transparent, as are their direct children, which take their final slot
//! only once the marker is resolved.

use crate::error::{Result, StreamError};
use crate::kind::{Kind, Slot};
use crate::token::{Token, ValueId};

struct Open {
    kind: Kind,
    id: ValueId,
    /// Index in `kind.fields()` of the last child seen
    last_field: Option<usize>,
}

/// Check a token stream.
///
/// # Errors
///
/// The first violation found: [`StreamError::UnmatchedClose`],
/// [`StreamError::CloseMismatch`] or [`StreamError::UnclosedTokens`] for
/// pairing, [`StreamError::InvalidSlot`] for a slot the parent does not
/// admit, [`StreamError::InvalidTree`] for fields out of order.
pub fn verify(tokens: &[Token]) -> Result<()> {
    let mut stack: Vec<Open> = Vec::new();
    for tok in tokens {
        if tok.enter {
            if let Some(parent) = stack.last_mut() {
                check_slot(parent, tok)?;
            }
            if !tok.leave {
                stack.push(Open {
                    kind: tok.kind,
                    id: tok.id(),
                    last_field: None,
                });
            }
            continue;
        }
        let open = stack.pop().ok_or(StreamError::UnmatchedClose {
            kind: tok.kind,
            id: tok.id(),
        })?;
        if open.id != tok.id() {
            return Err(StreamError::CloseMismatch {
                expected: open.id,
                found: Some(tok.id()),
            });
        }
    }
    if stack.is_empty() {
        Ok(())
    } else {
        Err(StreamError::UnclosedTokens { count: stack.len() })
    }
}

fn check_slot(parent: &mut Open, tok: &Token) -> Result<()> {
    if parent.kind.is_ctrl() || tok.kind.is_ctrl() {
        return Ok(());
    }
    if parent.kind == Kind::Array {
        if tok.slot != Slot::Push {
            return Err(StreamError::InvalidSlot {
                parent: Kind::Array,
                slot: tok.slot,
            });
        }
        return Ok(());
    }
    let index = parent
        .kind
        .fields()
        .iter()
        .position(|slot| *slot == tok.slot)
        .ok_or(StreamError::InvalidSlot {
            parent: parent.kind,
            slot: tok.slot,
        })?;
    if parent.last_field.map_or(false, |last| last >= index) {
        return Err(StreamError::InvalidTree(format!(
            "field `{}` of {} out of order",
            tok.slot, parent.kind
        )));
    }
    parent.last_field = Some(index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::output;
    use crate::template::Template;
    use pretty_assertions::assert_eq;

    fn toks(src: &str) -> Vec<Token> {
        Template::from(src).tokens(Slot::Top).unwrap()
    }

    #[test]
    fn test_produced_streams_verify() {
        assert_eq!(verify(&toks("if (a) { b(1, 2); } else c = d ? e : f;")), Ok(()));
        assert_eq!(verify(&toks("for (let i = 0; i < n; i++) x[i] = i;")), Ok(()));
    }

    #[test]
    fn test_pairing() {
        let mut t = toks("=a");
        t.pop();
        assert_eq!(verify(&t), Err(StreamError::UnclosedTokens { count: 1 }));

        let t = toks("=a");
        assert!(matches!(
            verify(&t[1..]),
            Err(StreamError::UnmatchedClose { .. })
        ));
    }

    #[test]
    fn test_slot_membership() {
        let mut t = toks("=f(a)");
        // `a` is the first element of the arguments array
        t[4].slot = Slot::Body;
        t[5].slot = Slot::Body;
        assert_eq!(
            verify(&t),
            Err(StreamError::InvalidSlot {
                parent: Kind::Array,
                slot: Slot::Body
            })
        );

        let mut t = toks("=a.b");
        t[1].slot = Slot::Callee;
        assert_eq!(
            verify(&t),
            Err(StreamError::InvalidSlot {
                parent: Kind::MemberExpression,
                slot: Slot::Callee
            })
        );
    }

    #[test]
    fn test_field_order() {
        let mut s = output();
        let mut out = Vec::new();
        out.push(s.enter(Slot::Top, Kind::MemberExpression).unwrap());
        out.extend(s.toks(Slot::Property, "=b").unwrap());
        out.extend(s.toks(Slot::Object, "=a").unwrap());
        s.leave(&mut out).unwrap();
        assert!(matches!(verify(&out), Err(StreamError::InvalidTree(_))));
    }

    #[test]
    fn test_markers_are_transparent() {
        let mut s = output();
        let mut out = Vec::new();
        out.push(s.enter(Slot::Top, Kind::ExpressionStatement).unwrap());
        out.push(s.enter(Slot::Expression, Kind::MakeExpr).unwrap());
        out.extend(s.toks(Slot::Push, "{ a; }").unwrap());
        s.leave(&mut out).unwrap();
        s.leave(&mut out).unwrap();
        assert_eq!(verify(&out), Ok(()));
    }
}
