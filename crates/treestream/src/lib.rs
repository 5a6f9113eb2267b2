//! # Treestream
//!
//! Streaming rewrites of syntax trees.
//!
//! Treestream represents a tree as a flat sequence of paired enter/leave
//! tokens and transforms it with passes that pull tokens from a cursor and
//! push the tokens they keep into a sink. No pass materializes the tree;
//! each one only remembers, on an explicit stack, how the subtrees it
//! opened have to be closed.
//!
//! ## Architecture
//!
//! - **Token model**: [`Token`], [`Value`], [`Kind`], [`Slot`]
//! - **Cursors**: one-token lookahead and depth tracking ([`cursor`])
//! - **Output stack**: building, peeling and templating ([`stream`])
//! - **Templates**: JavaScript snippets with placeholders ([`template`])
//! - **Passes**: substitution, shape coercion, declaration hoisting
//!   ([`passes`])
//! - **Trees**: producing and consuming concrete trees, ESTree JSON
//!   ([`tree`])
//!
//! ## Example
//!
//! ```
//! use treestream::passes::make_expr;
//! use treestream::stream::output;
//! use treestream::tree::consume;
//! use treestream::{Kind, Slot};
//!
//! // `return <statement>` is fixed up by wrapping the statement in a call
//! let mut s = output();
//! let mut toks = Vec::new();
//! toks.push(s.enter(Slot::Top, Kind::ReturnStatement).unwrap());
//! toks.push(s.enter(Slot::Argument, Kind::MakeExpr).unwrap());
//! toks.extend(s.toks(Slot::Push, "{ a; b; }").unwrap());
//! s.leave(&mut toks).unwrap();
//! s.leave(&mut toks).unwrap();
//!
//! let top = consume(make_expr(toks).unwrap()).unwrap().top;
//! let arg = top.child(Slot::Argument).unwrap();
//! assert_eq!(arg.kind, Kind::CallExpression);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod kind;
pub mod kit;
pub mod opts;
pub mod passes;
pub mod stream;
pub mod template;
pub mod token;
pub mod tree;
pub mod verify;

// Re-export main types
pub use error::{ErrorCategory, ErrorSite, PassError, PassResult, Result, StreamError};
pub use kind::{field_shape, Kind, KindInfo, Shape, Slot};
pub use opts::Options;
pub use stream::{auto, output, Auto, Label, NodeSpec, Output, Stream};
pub use template::Template;
pub use token::{Loc, Position, Token, Value, ValueId};
pub use tree::{consume, produce, Child, Consumed, Node};
pub use verify::verify;

/// Treestream version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
