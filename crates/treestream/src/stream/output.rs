//! Building tokens and the deferred-output stack

use tracing::trace;

use crate::cursor::TokenSource;
use crate::error::{Result, StreamError};
use crate::kind::{Kind, Slot};
use crate::stream::{Frame, Label, NodeSpec, Stream};
use crate::template::Template;
use crate::token::{Token, Value};

impl<S: TokenSource> Stream<S> {
    /// Resolve a [`NodeSpec`] to a kind and a value ready to be tokenized.
    fn build(&self, slot: Slot, spec: NodeSpec) -> Result<(Kind, Value)> {
        let (kind, value) = match spec {
            NodeSpec::Kind(kind) => (kind, Value::new()),
            NodeSpec::Both(kind, value) => (kind, value),
            NodeSpec::Value(value) => {
                let hint = value.borrow().type_hint;
                let kind = hint
                    .or_else(|| value.recorded_kind())
                    .ok_or(StreamError::CannotInferKind { slot })?;
                (kind, value)
            }
        };
        value.fill_payload(kind);
        let missing = value.borrow().opts.is_none();
        if missing {
            value.borrow_mut().opts = Some(self.opts());
        }
        Ok((kind, value))
    }

    /// Build an opening token and push its close onto the stack.
    ///
    /// The close is emitted by a later [`Stream::leave`] or
    /// [`Stream::unwind`].
    pub fn enter(&mut self, slot: Slot, spec: impl Into<NodeSpec>) -> Result<Token> {
        let (kind, value) = self.build(slot, spec.into())?;
        let open = Token::open(slot, kind, value);
        self.stack.push(Frame::Close(open.closing()));
        Ok(open)
    }

    /// Build a leaf token.
    pub fn tok(&self, slot: Slot, spec: impl Into<NodeSpec>) -> Result<Token> {
        let (kind, value) = self.build(slot, spec.into())?;
        Ok(Token::leaf(slot, kind, value))
    }

    /// Pop frames until a real close, emitting it into `out`.
    ///
    /// Control frames met on the way run in order. Returns the close, or
    /// `None` if the stack ran empty.
    pub fn leave(&mut self, out: &mut Vec<Token>) -> Result<Option<Token>> {
        while let Some(frame) = self.stack.pop() {
            if let Frame::Close(tok) = frame {
                out.push(tok.clone());
                return Ok(Some(tok));
            }
            self.run(frame, out)?;
        }
        Ok(None)
    }

    /// Capture the current stack depth.
    pub fn label(&self) -> Label {
        Label(self.stack.len())
    }

    /// Run every frame pushed since `label` was taken, most recent first.
    pub fn unwind(&mut self, label: Label, out: &mut Vec<Token>) -> Result<()> {
        let at = label.0.min(self.stack.len());
        let frames = self.stack.split_off(at);
        for frame in frames.into_iter().rev() {
            match frame {
                Frame::Close(tok) => out.push(tok),
                frame => self.run(frame, out)?,
            }
        }
        Ok(())
    }

    /// Push prebuilt tokens to be emitted when this frame is unwound.
    pub fn defer(&mut self, tokens: Vec<Token>) {
        self.stack.push(Frame::Emit(tokens));
    }

    /// Push a frame copying one input token when it is unwound.
    pub fn copy_on_leave(&mut self) {
        self.stack.push(Frame::Copy);
    }

    /// Tokens of a template, produced at `slot` and not registered.
    pub fn toks(&self, slot: Slot, template: impl Into<Template>) -> Result<Vec<Token>> {
        template.into().tokens(slot)
    }

    fn run(&mut self, frame: Frame, out: &mut Vec<Token>) -> Result<()> {
        match frame {
            Frame::Close(tok) => out.push(tok),
            Frame::Skip(expected) => {
                let tok = self.input.take().ok_or(StreamError::UnexpectedEnd)?;
                if tok.id() != expected {
                    return Err(StreamError::CloseMismatch {
                        expected,
                        found: Some(tok.id()),
                    });
                }
                trace!(%tok, "skipped peeled close");
            }
            Frame::VirtualClose => {}
            Frame::Copy => {
                let tok = self.input.take().ok_or(StreamError::UnexpectedEnd)?;
                out.push(tok);
            }
            Frame::Template => {
                if let Some(tail) = self.templates.pop() {
                    out.extend(tail);
                }
            }
            Frame::Emit(tokens) => out.extend(tokens),
        }
        Ok(())
    }
}
