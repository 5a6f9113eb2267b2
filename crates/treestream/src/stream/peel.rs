//! Peeling: re-emit an input node, rewrite its children, close it later
//!
//! [`Stream::peel`] emits the opening of a node read from input and pushes
//! two frames: the close to emit and a reminder that the real close is
//! still in the input. When the pass is done with the children,
//! [`Stream::leave`] consumes the input close and emits the stored one.

use crate::cursor::{Leveled, TokenSource};
use crate::error::{Result, StreamError};
use crate::kind::Slot;
use crate::stream::{Frame, NodeSpec, Stream};
use crate::token::{Token, ValueId};

impl<S: Leveled> Stream<S> {
    /// Re-open `tok` (or the next input token) on the output side.
    ///
    /// The returned opening token is not emitted; push it to the sink.
    /// A leaf is peeled with a virtual close: it has no children to visit
    /// and no input close to consume.
    pub fn peel(&mut self, tok: Option<Token>) -> Result<Token> {
        let tok = match tok {
            Some(tok) => tok,
            None => self.take().ok_or(StreamError::UnexpectedEnd)?,
        };
        if !tok.enter {
            return Err(StreamError::NotAnOpener(tok.to_string()));
        }
        let open = self.enter(tok.slot, NodeSpec::Both(tok.kind, tok.value.clone()))?;
        self.stack.push(if tok.leave {
            Frame::VirtualClose
        } else {
            Frame::Skip(tok.id())
        });
        Ok(open)
    }

    /// Copy siblings up to `slot` into `out`, then peel the node found
    /// there and emit its opening.
    ///
    /// Returns the input token that was peeled.
    pub fn peel_to(&mut self, slot: Slot, out: &mut Vec<Token>) -> Result<Token> {
        if self.exhausted() {
            return Err(StreamError::PeelOverVirtualClose);
        }
        let found = self
            .find_slot(slot, out)
            .ok_or(StreamError::SlotNotFound(slot))?;
        out.push(self.peel(Some(found.clone()))?);
        Ok(found)
    }

    /// Peel the next input token if it is an opener.
    pub fn peel_opt(&mut self) -> Result<Option<Token>> {
        if self.cur_lev().is_none() {
            return Ok(None);
        }
        self.peel(None).map(Some)
    }

    /// Copy a whole node through the output stack.
    pub fn copy(&mut self, tok: Option<Token>, out: &mut Vec<Token>) -> Result<()> {
        out.push(self.peel(tok)?);
        self.sub_into(out);
        self.leave(out)?;
        Ok(())
    }

    /// Consume one input token, requiring it to belong to `expected`.
    pub fn close(&mut self, expected: ValueId) -> Result<Token> {
        let tok = self.take();
        match tok {
            Some(tok) if tok.id() == expected => Ok(tok),
            other => Err(StreamError::CloseMismatch {
                expected,
                found: other.map(|t| t.id()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;
    use crate::stream::auto;
    use crate::template::Template;

    fn input(src: &str) -> Vec<Token> {
        Template::from(src).tokens(Slot::Top).unwrap()
    }

    #[test]
    fn test_peel_then_leave_is_symmetric() {
        let toks = input("=f(x)");
        let mut s = auto(toks.clone()).unwrap();
        let mut out = Vec::new();
        out.push(s.peel(None).unwrap());
        s.sub_into(&mut out);
        s.leave(&mut out).unwrap();
        assert!(s.cur().is_none());
        assert_eq!(s.level(), 0);
        let ids: Vec<_> = out.iter().map(Token::id).collect();
        let expected: Vec<_> = toks.iter().map(Token::id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_peel_opt_stops_at_close() {
        let toks = input("=f(x)");
        let mut s = auto(toks.clone()).unwrap();
        let mut out = Vec::new();
        let open = s.peel_opt().unwrap().unwrap();
        assert_eq!(open.id(), toks[0].id());
        out.push(open);
        s.sub_into(&mut out);
        assert!(s.peel_opt().unwrap().is_none());
        s.leave(&mut out).unwrap();
        assert_eq!(out.len(), toks.len());
        assert!(s.peel_opt().unwrap().is_none());
    }

    #[test]
    fn test_peel_to_copies_preceding_fields() {
        let mut s = auto(input("=f(x)")).unwrap();
        let mut out = Vec::new();
        out.push(s.peel(None).unwrap());
        let args = s.peel_to(Slot::Arguments, &mut out).unwrap();
        assert_eq!(args.kind, Kind::Array);
        // call open, callee open+close, arguments open
        assert_eq!(out.len(), 4);
        assert_eq!(out[1].slot, Slot::Callee);
    }

    #[test]
    fn test_peel_requires_opener() {
        let mut s = auto(input("=a")).unwrap();
        s.take();
        let err = s.peel(None).unwrap_err();
        assert!(matches!(err, StreamError::NotAnOpener(_)));
    }

    #[test]
    fn test_virtual_close_blocks_traversal() {
        let toks = input("=a");
        let mut s = auto(toks).unwrap();
        let mut out = Vec::new();
        let leaf = s.tok(Slot::Top, Kind::ThisExpression).unwrap();
        out.push(s.peel(Some(leaf)).unwrap());
        assert!(s.exhausted());
        assert!(s.one(&mut out).is_none());
        assert!(s.sub_into(&mut out).is_none());
        assert!(s.find_slot(Slot::Top, &mut out).is_none());
        assert_eq!(
            s.peel_to(Slot::Top, &mut out).unwrap_err(),
            StreamError::PeelOverVirtualClose
        );
        s.leave(&mut out).unwrap();
        assert_eq!(out.len(), 2);
        // input untouched
        assert!(s.cur().unwrap().is_open());
    }

    #[test]
    fn test_close_checks_identity() {
        let toks = input("=a");
        let open_id = toks[0].id();
        let mut s = auto(toks).unwrap();
        s.take();
        let other = crate::token::Value::new().id();
        assert!(matches!(
            s.close(other),
            Err(StreamError::CloseMismatch { .. })
        ));

        let mut s = auto(input("=a")).unwrap();
        let first = s.take().unwrap();
        assert!(s.close(first.id()).is_ok());
        assert_ne!(first.id(), open_id);
    }

    #[test]
    fn test_skip_checks_identity() {
        let a = input("=a");
        let b = input("=b");
        // open of `a` followed by the close of `b`
        let mixed = vec![a[0].clone(), b[1].clone()];
        let mut s = auto(mixed).unwrap();
        let mut out = Vec::new();
        out.push(s.peel(None).unwrap());
        assert!(matches!(
            s.leave(&mut out),
            Err(StreamError::CloseMismatch { .. })
        ));
    }

    #[test]
    fn test_copy() {
        let toks = input("=[1, 2]");
        let n = toks.len();
        let mut s = auto(toks).unwrap();
        let mut out = Vec::new();
        s.copy(None, &mut out).unwrap();
        assert_eq!(out.len(), n);
        assert!(s.cur().is_none());
    }
}
