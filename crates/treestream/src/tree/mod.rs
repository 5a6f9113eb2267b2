//! Concrete trees and their token streams
//!
//! [`Node`] is a plain owned syntax tree. [`produce`] flattens it into a
//! token stream and [`consume`] rebuilds a tree from one; the passes work
//! only on the tokens in between.
//!
//! Field order is insertion order. Builders and [`json::from_json`] insert
//! fields in the order [`crate::Kind::fields`] declares them.

use indexmap::IndexMap;

use crate::error::{Result, StreamError};
use crate::kind::{Kind, Slot};
use crate::opts;
use crate::token::{Attrs, Loc, NodeData, Payload, Token, Value, ValueData, ValueId};

pub mod json;

/// Syntax tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node kind
    pub kind: Kind,
    /// Scalar attributes
    pub attrs: Attrs,
    /// Child fields, in emission order
    pub fields: IndexMap<Slot, Child>,
    /// Source location
    pub loc: Option<Loc>,
    /// Leading comment texts
    pub leading_comments: Vec<String>,
    /// ESTree `type` the node was read as, when it is an alias of `kind`
    pub source_type: Option<String>,
}

/// Content of a node field.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// A single node
    Node(Box<Node>),
    /// A list of nodes
    List(Vec<Node>),
    /// Absent
    Null,
}

impl Node {
    /// Node of `kind` with no attributes or fields.
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
            fields: IndexMap::new(),
            loc: None,
            leading_comments: Vec::new(),
            source_type: None,
        }
    }

    /// `Identifier` named `name`.
    pub fn ident(name: &str) -> Self {
        Self::new(Kind::Identifier).with_attr("name", name)
    }

    /// Builder: set an attribute.
    pub fn with_attr(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Builder: set a single-node field.
    pub fn with_child(mut self, slot: Slot, node: Node) -> Self {
        self.fields.insert(slot, Child::Node(Box::new(node)));
        self
    }

    /// Builder: set a list field.
    pub fn with_list(mut self, slot: Slot, items: Vec<Node>) -> Self {
        self.fields.insert(slot, Child::List(items));
        self
    }

    /// Builder: set a field to a node or null.
    pub fn with_opt(mut self, slot: Slot, node: Option<Node>) -> Self {
        let child = match node {
            Some(node) => Child::Node(Box::new(node)),
            None => Child::Null,
        };
        self.fields.insert(slot, child);
        self
    }

    /// Builder: set the source location.
    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    /// Single-node field.
    pub fn child(&self, slot: Slot) -> Option<&Node> {
        match self.fields.get(&slot) {
            Some(Child::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// List field.
    pub fn list(&self, slot: Slot) -> Option<&[Node]> {
        match self.fields.get(&slot) {
            Some(Child::List(items)) => Some(items),
            _ => None,
        }
    }

    /// Remove a single-node field and return it.
    pub fn take_child(&mut self, slot: Slot) -> Option<Node> {
        match self.fields.shift_remove(&slot) {
            Some(Child::Node(node)) => Some(*node),
            _ => None,
        }
    }

    /// Read an attribute.
    pub fn attr(&self, name: &str) -> Option<&serde_json::Value> {
        self.attrs.get(name)
    }

    /// `name` attribute, for identifiers.
    pub fn name(&self) -> Option<&str> {
        self.attr("name").and_then(|v| v.as_str())
    }

    fn data(&self) -> NodeData {
        NodeData {
            kind: Some(self.kind),
            attrs: self.attrs.clone(),
            loc: self.loc.clone(),
            leading_comments: self.leading_comments.clone(),
            source_type: self.source_type.clone(),
        }
    }
}

/// Flatten a tree at the root slot.
pub fn produce(node: &Node) -> Vec<Token> {
    produce_at(node, Slot::Top)
}

/// Flatten a tree placed at `slot`.
///
/// Every node becomes an open/close pair, every list an `Array` pair with
/// `Push` elements, and every null field a `Null` leaf. Values snapshot
/// the current options.
pub fn produce_at(node: &Node, slot: Slot) -> Vec<Token> {
    let mut out = Vec::new();
    emit(node, slot, &mut out);
    out
}

fn fresh(payload: Payload) -> Value {
    Value::from_data(ValueData {
        payload,
        opts: Some(opts::current()),
        ..Default::default()
    })
}

fn emit(node: &Node, slot: Slot, out: &mut Vec<Token>) {
    let value = fresh(Payload::Node(node.data()));
    out.push(Token::open(slot, node.kind, value.clone()));
    for (field, child) in &node.fields {
        match child {
            Child::Node(child) => emit(child, *field, out),
            Child::List(items) => {
                let arr = fresh(Payload::Array);
                out.push(Token::open(*field, Kind::Array, arr.clone()));
                for item in items {
                    emit(item, Slot::Push, out);
                }
                out.push(Token::close(*field, Kind::Array, arr));
            }
            Child::Null => out.push(Token::leaf(*field, Kind::Null, fresh(Payload::Null))),
        }
    }
    out.push(Token::close(slot, node.kind, value));
}

/// Result of [`consume`].
#[derive(Debug, Clone, PartialEq)]
pub struct Consumed {
    /// Root of the rebuilt tree
    pub top: Node,
}

enum Building {
    Node(Node),
    List(Vec<Node>),
    Null,
}

struct Open {
    id: ValueId,
    slot: Slot,
    building: Building,
}

/// Rebuild a tree from a token stream.
///
/// Attributes are read from each value when its close arrives, so edits
/// made to a payload after its opening was emitted are kept.
///
/// # Errors
///
/// Fails on unpaired or mismatched tokens, on control markers left in the
/// stream, and on streams with no root or more than one.
pub fn consume<I>(tokens: I) -> Result<Consumed>
where
    I: IntoIterator<Item = Token>,
{
    let mut stack: Vec<Open> = Vec::new();
    let mut top: Option<Node> = None;
    for tok in tokens {
        if tok.enter && tok.kind.is_ctrl() {
            return Err(StreamError::UnresolvedControl(tok.kind));
        }
        if tok.is_open() {
            let building = match tok.kind {
                Kind::Array => Building::List(Vec::new()),
                Kind::Null => Building::Null,
                kind => Building::Node(Node::new(kind)),
            };
            stack.push(Open {
                id: tok.id(),
                slot: tok.slot,
                building,
            });
            continue;
        }
        let (slot, child) = if tok.is_leaf() {
            (tok.slot, leaf_child(&tok))
        } else {
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
            let child = match open.building {
                Building::Node(node) => Child::Node(Box::new(finish(node, &tok.value))),
                Building::List(items) => Child::List(items),
                Building::Null => Child::Null,
            };
            (open.slot, child)
        };
        attach(&mut stack, &mut top, slot, child)?;
    }
    if !stack.is_empty() {
        return Err(StreamError::UnclosedTokens { count: stack.len() });
    }
    top.map(|top| Consumed { top })
        .ok_or_else(|| StreamError::InvalidTree("stream has no root node".to_string()))
}

fn leaf_child(tok: &Token) -> Child {
    match tok.kind {
        Kind::Array => Child::List(Vec::new()),
        Kind::Null => Child::Null,
        kind => Child::Node(Box::new(finish(Node::new(kind), &tok.value))),
    }
}

fn finish(mut node: Node, value: &Value) -> Node {
    if let Payload::Node(data) = &value.borrow().payload {
        node.attrs = data.attrs.clone();
        node.loc = data.loc.clone();
        node.leading_comments = data.leading_comments.clone();
        node.source_type = data.source_type.clone();
    }
    node
}

fn attach(
    stack: &mut [Open],
    top: &mut Option<Node>,
    slot: Slot,
    child: Child,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => match &mut parent.building {
            Building::Node(node) => {
                node.fields.insert(slot, child);
            }
            Building::List(items) => match child {
                Child::Node(node) => items.push(*node),
                _ => {
                    return Err(StreamError::InvalidTree(
                        "list elements must be nodes".to_string(),
                    ))
                }
            },
            Building::Null => {
                return Err(StreamError::InvalidTree(
                    "null cannot have children".to_string(),
                ))
            }
        },
        None => match child {
            Child::Node(node) if top.is_none() => *top = Some(*node),
            Child::Node(_) => {
                return Err(StreamError::InvalidTree(
                    "stream has more than one root".to_string(),
                ))
            }
            _ => {
                return Err(StreamError::InvalidTree(
                    "root must be a node".to_string(),
                ))
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Node {
        Node::new(Kind::Program).with_list(
            Slot::Body,
            vec![
                Node::new(Kind::ReturnStatement).with_opt(Slot::Argument, None),
                Node::new(Kind::ExpressionStatement).with_child(
                    Slot::Expression,
                    Node::new(Kind::CallExpression)
                        .with_child(Slot::Callee, Node::ident("f"))
                        .with_list(Slot::Arguments, vec![]),
                ),
            ],
        )
    }

    #[test]
    fn test_produce_pairs() {
        let toks = produce(&sample());
        let opens = toks.iter().filter(|t| t.is_open()).count();
        let closes = toks.iter().filter(|t| t.is_close()).count();
        assert_eq!(opens, closes);
        assert_eq!(toks.iter().filter(|t| t.is_leaf()).count(), 1);
        assert_eq!(toks[0].slot, Slot::Top);
        assert_eq!(toks[1].kind, Kind::Array);
        assert_eq!(toks[2].slot, Slot::Push);
    }

    #[test]
    fn test_round_trip() {
        let tree = sample();
        assert_eq!(consume(produce(&tree)).unwrap().top, tree);
    }

    #[test]
    fn test_attrs_read_at_close() {
        let toks = produce(&Node::ident("a"));
        toks[0].value.set_attr("name", "b");
        assert_eq!(consume(toks).unwrap().top.name(), Some("b"));
    }

    #[test]
    fn test_consume_rejects_markers() {
        let v = Value::new();
        let toks = vec![
            Token::open(Slot::Top, Kind::Subst, v.clone()),
            Token::close(Slot::Top, Kind::Subst, v),
        ];
        assert_eq!(
            consume(toks).unwrap_err(),
            StreamError::UnresolvedControl(Kind::Subst)
        );
    }

    #[test]
    fn test_consume_rejects_broken_pairs() {
        let mut toks = produce(&Node::ident("a"));
        toks.pop();
        assert_eq!(
            consume(toks).unwrap_err(),
            StreamError::UnclosedTokens { count: 1 }
        );

        let a = produce(&Node::ident("a"));
        let b = produce(&Node::ident("b"));
        let err = consume(vec![a[0].clone(), b[1].clone()]).unwrap_err();
        assert!(matches!(err, StreamError::CloseMismatch { .. }));

        let err = consume(vec![b[1].clone()]).unwrap_err();
        assert!(matches!(err, StreamError::UnmatchedClose { .. }));
    }

    #[test]
    fn test_leaf_array_is_empty_list() {
        let v = Value::for_kind(Kind::ArrowFunctionExpression);
        let toks = vec![
            Token::open(Slot::Top, Kind::ArrowFunctionExpression, v.clone()),
            Token::leaf(Slot::Params, Kind::Array, Value::for_kind(Kind::Array)),
            Token::close(Slot::Top, Kind::ArrowFunctionExpression, v),
        ];
        let top = consume(toks).unwrap().top;
        assert_eq!(top.list(Slot::Params), Some(&[][..]));
    }
}
