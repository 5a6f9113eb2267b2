//! Single-token lookahead over an arbitrary token iterator

use std::rc::Rc;

use crate::cursor::TokenSource;
use crate::error::{Result, StreamError};
use crate::opts::{self, Options};
use crate::token::Token;

/// Base cursor: wraps an iterator and keeps its next token in view.
pub struct Lookahead {
    inner: Box<dyn Iterator<Item = Token>>,
    cur: Option<Token>,
    first: Token,
    opts: Rc<Options>,
}

impl Lookahead {
    /// Wrap a token source.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::EmptyInput`] if the source yields nothing.
    pub fn new<I>(source: I) -> Result<Self>
    where
        I: IntoIterator<Item = Token>,
        I::IntoIter: 'static,
    {
        let mut inner: Box<dyn Iterator<Item = Token>> = Box::new(source.into_iter());
        let first = inner.next().ok_or(StreamError::EmptyInput)?;
        let snapshot = first.value.borrow().opts.clone();
        Ok(Self {
            inner,
            cur: Some(first.clone()),
            first,
            opts: snapshot.unwrap_or_else(opts::current),
        })
    }

    /// The first token of the source.
    pub fn first(&self) -> &Token {
        &self.first
    }
}

impl TokenSource for Lookahead {
    fn cur(&self) -> Option<&Token> {
        self.cur.as_ref()
    }

    fn take(&mut self) -> Option<Token> {
        let tok = self.cur.take()?;
        let snapshot = tok.value.borrow().opts.clone();
        if let Some(opts) = snapshot {
            self.opts = opts;
        }
        self.cur = self.inner.next();
        Some(tok)
    }

    fn opts(&self) -> Rc<Options> {
        self.opts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Kind, Slot};
    use crate::token::Value;

    fn ident(name: &str) -> Token {
        Token::leaf(
            Slot::Top,
            Kind::Identifier,
            Value::for_kind(Kind::Identifier).with_attr("name", name),
        )
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let err = Lookahead::new(Vec::<Token>::new()).err();
        assert_eq!(err, Some(StreamError::EmptyInput));
    }

    #[test]
    fn test_cur_and_take() {
        let mut la = Lookahead::new(vec![ident("a"), ident("b")]).unwrap();
        assert_eq!(la.first().name().as_deref(), Some("a"));
        assert_eq!(la.cur().and_then(Token::name).as_deref(), Some("a"));
        assert_eq!(la.take().and_then(|t| t.name()).as_deref(), Some("a"));
        assert_eq!(la.cur().and_then(Token::name).as_deref(), Some("b"));
        assert!(la.take().is_some());
        assert!(la.cur().is_none());
        assert!(la.take().is_none());
    }

    #[test]
    fn test_tracks_opts_of_taken_tokens() {
        let tagged = ident("b");
        tagged.value.borrow_mut().opts = Some(Rc::new(Options::new().with_file("b.js")));
        let mut la = Lookahead::new(vec![ident("a"), tagged]).unwrap();
        assert_eq!(la.opts().file, None);
        la.take();
        la.take();
        assert_eq!(la.opts().file.as_deref(), Some("b.js"));
    }
}
