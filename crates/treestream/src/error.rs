//! Error types for stream operations and passes

use std::fmt;

use thiserror::Error;

use crate::kind::{Kind, Shape, Slot};
use crate::token::{Loc, ValueId};

/// Failure raised by a cursor, the output stack, the template compiler or a
/// pass.
///
/// None of these are recoverable: each one means a pass broke the stream
/// protocol or asked for something the stream cannot provide.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    /// A cursor was built over a source with no tokens
    #[error("input iterator should be not-empty")]
    EmptyInput,

    /// The input ended while a token was required
    #[error("unexpected end of stream")]
    UnexpectedEnd,

    /// A close token did not match the value it should close
    #[error("close mismatch: expected {expected}, found {}", found.map(|id| id.to_string()).unwrap_or_else(|| "nothing".to_string()))]
    CloseMismatch {
        /// Identity of the subtree being closed
        expected: ValueId,
        /// Identity of the token actually found
        found: Option<ValueId>,
    },

    /// A close token arrived with no matching open
    #[error("unmatched close token {kind}{id}")]
    UnmatchedClose {
        /// Kind of the close token
        kind: Kind,
        /// Identity of the close token
        id: ValueId,
    },

    /// The stream ended with open subtrees
    #[error("{count} subtree(s) left open at end of stream")]
    UnclosedTokens {
        /// Number of unmatched opens
        count: usize,
    },

    /// An opening token was required
    #[error("expected an opening token, got {0}")]
    NotAnOpener(String),

    /// `peel_to` was called while the top frame is a virtual close
    #[error("cannot peel inside a virtually closed node")]
    PeelOverVirtualClose,

    /// The kind of a new token could not be determined
    #[error("couldn't guess type for a token in slot `{slot}`")]
    CannotInferKind {
        /// Slot of the token being built
        slot: Slot,
    },

    /// No sibling at the requested slot
    #[error("slot `{0}` not found")]
    SlotNotFound(Slot),

    /// The pending template has no further placeholder
    #[error("next placeholder is not found")]
    PlaceholderNotFound,

    /// `open` was called with no template registered
    #[error("no pending template")]
    NoPendingTemplate,

    /// Template text failed to compile
    #[error("template `{template}`: {message}")]
    TemplateSyntax {
        /// Template source text
        template: String,
        /// Parser message
        message: String,
    },

    /// A subtree cannot be coerced to the requested shape
    #[error("internal: cannot convert {kind} to {target}")]
    Unconvertible {
        /// Kind of the subtree
        kind: Kind,
        /// Requested shape
        target: Shape,
    },

    /// A slot that the parent kind does not declare
    #[error("field `{slot}` does not exist on {parent}")]
    InvalidSlot {
        /// Parent kind
        parent: Kind,
        /// Offending slot
        slot: Slot,
    },

    /// A control marker reached a consumer that needs plain nodes
    #[error("unresolved control token {0}")]
    UnresolvedControl(Kind),

    /// Malformed input tree
    #[error("invalid tree: {0}")]
    InvalidTree(String),
}

/// Broad class of a [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Pairing, identity or stack discipline was broken
    Protocol,
    /// Something required could not be found or determined
    Inference,
    /// A subtree has a shape none of the expected categories admit
    Shape,
    /// The input tree itself is malformed
    Input,
}

impl StreamError {
    /// Classify the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::EmptyInput
            | StreamError::UnexpectedEnd
            | StreamError::CloseMismatch { .. }
            | StreamError::UnmatchedClose { .. }
            | StreamError::UnclosedTokens { .. }
            | StreamError::NotAnOpener(_)
            | StreamError::PeelOverVirtualClose => ErrorCategory::Protocol,
            StreamError::CannotInferKind { .. }
            | StreamError::SlotNotFound(_)
            | StreamError::PlaceholderNotFound
            | StreamError::NoPendingTemplate
            | StreamError::TemplateSyntax { .. } => ErrorCategory::Inference,
            StreamError::Unconvertible { .. }
            | StreamError::InvalidSlot { .. }
            | StreamError::UnresolvedControl(_) => ErrorCategory::Shape,
            StreamError::InvalidTree(_) => ErrorCategory::Input,
        }
    }
}

/// Result type alias for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Node a failure is attributed to.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSite {
    /// Kind of the node
    pub kind: Kind,
    /// Its source location, if it has one
    pub loc: Option<Loc>,
}

impl fmt::Display for ErrorSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "{} @{}", self.kind, loc),
            None => write!(f, "{} @new", self.kind),
        }
    }
}

/// A [`StreamError`] raised while a named pass was running, attributed to
/// the nearest locatable node.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct PassError {
    /// Name of the pass
    pub pass: String,
    /// Underlying failure
    #[source]
    pub error: StreamError,
    /// Node the failure is attributed to
    pub site: Option<ErrorSite>,
    /// The site was found by scanning ahead rather than at the failure point
    pub approximated: bool,
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} during {}", self.error, self.pass)?;
        if self.approximated {
            write!(f, " (the position is approximated)")?;
        }
        if let Some(site) = &self.site {
            write!(f, " at {}", site)?;
        }
        Ok(())
    }
}

/// Result type alias for whole passes.
pub type PassResult<T> = std::result::Result<T, PassError>;
