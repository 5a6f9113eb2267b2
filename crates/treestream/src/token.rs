//! Token model
//!
//! A [`Token`] is one appearance of a node in the flattened stream: its
//! opening, its closing, or both at once for a leaf. Opening and closing
//! tokens of one subtree share a [`Value`] handle; the handle's [`ValueId`]
//! is what identifies the pair.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::kind::{Kind, Shape, Slot};
use crate::opts::Options;

/// Scalar node attributes (`name`, `operator`, literal `value`, ...).
pub type Attrs = serde_json::Map<String, serde_json::Value>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a value, issued once at construction and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u64);

impl ValueId {
    fn fresh() -> Self {
        ValueId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric handle.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (0-indexed)
    pub column: u32,
}

/// Source range a node was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    /// Start of the range
    pub start: Position,
    /// End of the range
    pub end: Position,
    /// File name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}:{}..{}:{}",
            self.source.as_deref().unwrap_or("?"),
            self.start.line,
            self.start.column,
            self.end.line,
            self.end.column
        )
    }
}

/// Node data carried in a value: everything except the children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeData {
    /// Kind recorded when the node was produced
    pub kind: Option<Kind>,
    /// Scalar attributes
    pub attrs: Attrs,
    /// Source location
    pub loc: Option<Loc>,
    /// Leading comment texts
    pub leading_comments: Vec<String>,
    /// ESTree `type` the node was read as, when it is an alias of the kind
    pub source_type: Option<String>,
}

/// What a value stands for.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// Not filled in yet
    #[default]
    Empty,
    /// A tree node
    Node(NodeData),
    /// An array container
    Array,
    /// An absent field
    Null,
}

/// Mutable state behind a [`Value`] handle.
#[derive(Debug, Clone, Default)]
pub struct ValueData {
    /// Node payload
    pub payload: Payload,
    /// Options snapshot captured when the value was built
    pub opts: Option<Rc<Options>>,
    /// The node sits in a value-producing position
    pub result: bool,
    /// Shape required by the slot, written by
    /// [`crate::kind::reset_field_info`]
    pub field: Option<Shape>,
    /// Kind assigned by an earlier classification pass
    pub type_hint: Option<Kind>,
}

/// Shared, identity-carrying handle to a token's payload.
///
/// Cloning the handle keeps the identity; use [`Value::deep_clone`] for an
/// independent copy.
#[derive(Clone)]
pub struct Value {
    id: ValueId,
    data: Rc<RefCell<ValueData>>,
}

impl Default for Value {
    fn default() -> Self {
        Self::new()
    }
}

impl Value {
    /// Create an empty value; its payload is filled in by whoever builds the
    /// token around it.
    pub fn new() -> Self {
        Self::from_data(ValueData::default())
    }

    /// Create a value around existing data.
    pub fn from_data(data: ValueData) -> Self {
        Self {
            id: ValueId::fresh(),
            data: Rc::new(RefCell::new(data)),
        }
    }

    /// Create a value holding node data.
    pub fn node(data: NodeData) -> Self {
        Self::from_data(ValueData {
            payload: Payload::Node(data),
            ..Default::default()
        })
    }

    /// Fresh payload for a kind: array container, null, or an empty node.
    pub fn for_kind(kind: Kind) -> Self {
        let value = Self::new();
        value.fill_payload(kind);
        value
    }

    /// Builder: set an attribute, turning an empty payload into a node.
    pub fn with_attr(self, name: &str, attr: impl Into<serde_json::Value>) -> Self {
        self.set_attr(name, attr);
        self
    }

    /// Builder: mark the value as sitting in a value-producing position.
    pub fn with_result(self, result: bool) -> Self {
        self.borrow_mut().result = result;
        self
    }

    /// Identity handle.
    pub fn id(&self) -> ValueId {
        self.id
    }

    /// True when both handles are the same value.
    pub fn same(&self, other: &Value) -> bool {
        self.id == other.id
    }

    /// Borrow the payload.
    pub fn borrow(&self) -> Ref<'_, ValueData> {
        self.data.borrow()
    }

    /// Mutably borrow the payload.
    pub fn borrow_mut(&self) -> RefMut<'_, ValueData> {
        self.data.borrow_mut()
    }

    /// Kind recorded in the node payload.
    pub fn recorded_kind(&self) -> Option<Kind> {
        match &self.borrow().payload {
            Payload::Node(node) => node.kind,
            Payload::Array => Some(Kind::Array),
            Payload::Null => Some(Kind::Null),
            Payload::Empty => None,
        }
    }

    /// Read an attribute.
    pub fn attr(&self, name: &str) -> Option<serde_json::Value> {
        match &self.borrow().payload {
            Payload::Node(node) => node.attrs.get(name).cloned(),
            _ => None,
        }
    }

    /// Read a string attribute.
    pub fn str_attr(&self, name: &str) -> Option<String> {
        self.attr(name).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Set an attribute.
    pub fn set_attr(&self, name: &str, attr: impl Into<serde_json::Value>) {
        let mut data = self.borrow_mut();
        if !matches!(data.payload, Payload::Node(_)) {
            data.payload = Payload::Node(NodeData::default());
        }
        if let Payload::Node(node) = &mut data.payload {
            node.attrs.insert(name.to_string(), attr.into());
        }
    }

    /// Source location, if the payload is a located node.
    pub fn loc(&self) -> Option<Loc> {
        match &self.borrow().payload {
            Payload::Node(node) => node.loc.clone(),
            _ => None,
        }
    }

    /// True when a leading comment's trimmed text equals `name`.
    pub fn has_annotation(&self, name: &str) -> bool {
        match &self.borrow().payload {
            Payload::Node(node) => node.leading_comments.iter().any(|c| c.trim() == name),
            _ => false,
        }
    }

    /// Make sure the payload matches `kind`, creating it if empty.
    pub(crate) fn fill_payload(&self, kind: Kind) {
        let mut data = self.borrow_mut();
        let fresh = match &mut data.payload {
            Payload::Empty => Some(match kind {
                Kind::Array => Payload::Array,
                Kind::Null => Payload::Null,
                _ => Payload::Node(NodeData {
                    kind: Some(kind),
                    ..Default::default()
                }),
            }),
            Payload::Node(node) => {
                if node.kind.is_none() {
                    node.kind = Some(kind);
                }
                None
            }
            _ => None,
        };
        if let Some(payload) = fresh {
            data.payload = payload;
        }
    }

    /// Independent copy with a fresh identity.
    ///
    /// Attribute maps and comment lists are copied, so edits on the copy
    /// never reach the original.
    pub fn deep_clone(&self) -> Value {
        Self::from_data(self.borrow().clone())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value{}", self.id)
    }
}

/// One event of the flattened tree.
#[derive(Clone, Debug)]
pub struct Token {
    /// Field the node occupies in its parent
    pub slot: Slot,
    /// Node category
    pub kind: Kind,
    /// Opens a subtree (or is a leaf)
    pub enter: bool,
    /// Closes a subtree (or is a leaf)
    pub leave: bool,
    /// Shared payload
    pub value: Value,
}

impl Token {
    /// Opening token.
    pub fn open(slot: Slot, kind: Kind, value: Value) -> Self {
        Self {
            slot,
            kind,
            enter: true,
            leave: false,
            value,
        }
    }

    /// Closing token.
    pub fn close(slot: Slot, kind: Kind, value: Value) -> Self {
        Self {
            slot,
            kind,
            enter: false,
            leave: true,
            value,
        }
    }

    /// Self-contained leaf token.
    pub fn leaf(slot: Slot, kind: Kind, value: Value) -> Self {
        Self {
            slot,
            kind,
            enter: true,
            leave: true,
            value,
        }
    }

    /// Opens a subtree that a later token closes.
    pub fn is_open(&self) -> bool {
        self.enter && !self.leave
    }

    /// Closes a subtree.
    pub fn is_close(&self) -> bool {
        !self.enter && self.leave
    }

    /// Opens and closes at once.
    pub fn is_leaf(&self) -> bool {
        self.enter && self.leave
    }

    /// Identity of the payload.
    pub fn id(&self) -> ValueId {
        self.value.id()
    }

    /// The matching closing token for an opening one.
    pub fn closing(&self) -> Token {
        Token::close(self.slot, self.kind, self.value.clone())
    }

    /// Same token re-tagged to another slot.
    pub fn with_slot(&self, slot: Slot) -> Token {
        Token {
            slot,
            ..self.clone()
        }
    }

    /// Same token re-tagged to another kind.
    pub fn with_kind(&self, kind: Kind) -> Token {
        Token {
            kind,
            ..self.clone()
        }
    }

    /// `name` attribute, for identifiers.
    pub fn name(&self) -> Option<String> {
        self.value.str_attr("name")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match (self.enter, self.leave) {
            (true, true) => "|",
            (true, false) => "\\",
            _ => "/",
        };
        write!(f, "{}{}:{}{}", dir, self.slot, self.kind, self.value.id())
    }
}

/// Copy a run of tokens, giving every copied subtree a fresh value.
///
/// Open/close pairs of the copy share their fresh value, so the copy is a
/// well-formed stream on its own.
pub fn clone_tokens<I>(tokens: I) -> Vec<Token>
where
    I: IntoIterator<Item = Token>,
{
    let mut stack: Vec<Value> = Vec::new();
    let mut out = Vec::new();
    for tok in tokens {
        let value = if tok.enter {
            let copy = tok.value.deep_clone();
            if !tok.leave {
                stack.push(copy.clone());
            }
            copy
        } else if tok.leave {
            stack.pop().unwrap_or_else(|| tok.value.clone())
        } else {
            tok.value.clone()
        };
        out.push(Token {
            slot: tok.slot,
            kind: tok.kind,
            enter: tok.enter,
            leave: tok.leave,
            value,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let a = Value::new();
        let b = Value::new();
        assert!(b.id() > a.id());
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn test_for_kind_payloads() {
        assert_eq!(Value::for_kind(Kind::Array).borrow().payload, Payload::Array);
        assert_eq!(Value::for_kind(Kind::Null).borrow().payload, Payload::Null);
        assert_eq!(
            Value::for_kind(Kind::Identifier).recorded_kind(),
            Some(Kind::Identifier)
        );
    }

    #[test]
    fn test_attrs() {
        let v = Value::new().with_attr("name", "x");
        assert_eq!(v.str_attr("name").as_deref(), Some("x"));
        assert_eq!(v.recorded_kind(), None);
        v.fill_payload(Kind::Identifier);
        assert_eq!(v.recorded_kind(), Some(Kind::Identifier));
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let v = Value::for_kind(Kind::Identifier).with_attr("name", "a");
        let c = v.deep_clone();
        c.set_attr("name", "b");
        assert_eq!(v.str_attr("name").as_deref(), Some("a"));
        assert_eq!(c.str_attr("name").as_deref(), Some("b"));
        assert_ne!(v.id(), c.id());
    }

    #[test]
    fn test_retagging_keeps_identity() {
        let v = Value::for_kind(Kind::Identifier).with_attr("name", "a");
        let tok = Token::leaf(Slot::Callee, Kind::Identifier, v.clone());
        let tagged = tok.with_kind(Kind::ThisExpression);
        assert_eq!(tagged.kind, Kind::ThisExpression);
        assert_eq!(tagged.slot, Slot::Callee);
        assert!(tagged.is_leaf());
        assert_eq!(tagged.id(), v.id());
        assert_eq!(tagged.name().as_deref(), Some("a"));
    }

    #[test]
    fn test_clone_tokens_keeps_pairs() {
        let v = Value::for_kind(Kind::ThisExpression);
        let toks = vec![
            Token::open(Slot::Top, Kind::ThisExpression, v.clone()),
            Token::close(Slot::Top, Kind::ThisExpression, v.clone()),
        ];
        let copy = clone_tokens(toks);
        assert_eq!(copy[0].id(), copy[1].id());
        assert_ne!(copy[0].id(), v.id());
    }

    #[test]
    fn test_annotation() {
        let v = Value::node(NodeData {
            kind: Some(Kind::FunctionDeclaration),
            leading_comments: vec![" @pure ".to_string()],
            ..Default::default()
        });
        assert!(v.has_annotation("@pure"));
        assert!(!v.has_annotation("@impure"));
    }
}
