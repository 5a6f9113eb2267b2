//! ESTree JSON bridge
//!
//! Reads the JSON that parsers such as babel or acorn emit and writes it
//! back. A key becomes a child field when the node's kind declares it;
//! every other key is kept as a scalar attribute. A babel `File` wrapper
//! is unwrapped to its `program`, and plain ESTree `Literal` and `Property`
//! nodes are mapped onto the typed kinds. The alias is remembered and
//! written back as long as the node keeps a kind it can stand for.

use serde_json::{json, Map, Value as Json};

use crate::error::{Result, StreamError};
use crate::kind::{Kind, Slot};
use crate::token::Loc;
use crate::tree::{Child, Node};

/// Parse an ESTree node.
pub fn from_json(value: &Json) -> Result<Node> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(format!("expected a node object, found {}", value)))?;
    let type_name = obj
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| invalid("node without a `type`".to_string()))?;
    if type_name == "File" {
        let program = obj
            .get("program")
            .ok_or_else(|| invalid("`File` without a `program`".to_string()))?;
        return from_json(program);
    }
    let kind = resolve_kind(type_name, obj)?;
    let mut node = Node::new(kind);
    if type_name != kind.name() {
        node.source_type = Some(type_name.to_string());
    }
    for slot in kind.fields() {
        if let Some(field) = obj.get(slot.name()) {
            node.fields.insert(*slot, child_from_json(field)?);
        }
    }
    for (key, field) in obj {
        if key == "type" || field_slot(kind, key).is_some() {
            continue;
        }
        match key.as_str() {
            "loc" => node.loc = serde_json::from_value::<Loc>(field.clone()).ok(),
            "leadingComments" => node.leading_comments = comments(field),
            _ => {
                node.attrs.insert(key.clone(), field.clone());
            }
        }
    }
    Ok(node)
}

/// Parse ESTree JSON text.
pub fn from_str(text: &str) -> Result<Node> {
    let value: Json = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
    from_json(&value)
}

/// Render a node as ESTree JSON.
pub fn to_json(node: &Node) -> Json {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Json::from(type_name(node)));
    for (key, value) in &node.attrs {
        obj.insert(key.clone(), value.clone());
    }
    for (slot, child) in &node.fields {
        let value = match child {
            Child::Node(child) => to_json(child),
            Child::List(items) => Json::Array(items.iter().map(to_json).collect()),
            Child::Null => Json::Null,
        };
        obj.insert(slot.name().to_string(), value);
    }
    if let Some(loc) = &node.loc {
        if let Ok(loc) = serde_json::to_value(loc) {
            obj.insert("loc".to_string(), loc);
        }
    }
    if !node.leading_comments.is_empty() {
        let comments = node
            .leading_comments
            .iter()
            .map(|text| json!({"type": "CommentBlock", "value": text}))
            .collect();
        obj.insert("leadingComments".to_string(), Json::Array(comments));
    }
    Json::Object(obj)
}

fn type_name(node: &Node) -> &str {
    match node.source_type.as_deref() {
        Some(alias @ "Literal")
            if matches!(
                node.kind,
                Kind::NumericLiteral
                    | Kind::StringLiteral
                    | Kind::BooleanLiteral
                    | Kind::NullLiteral
                    | Kind::RegExpLiteral
            ) =>
        {
            alias
        }
        Some(alias @ "Property") if node.kind == Kind::ObjectProperty => alias,
        _ => node.kind.name(),
    }
}

fn invalid(message: String) -> StreamError {
    StreamError::InvalidTree(message)
}

fn field_slot(kind: Kind, key: &str) -> Option<Slot> {
    Slot::from_name(key).filter(|slot| kind.fields().contains(slot))
}

fn resolve_kind(type_name: &str, obj: &Map<String, Json>) -> Result<Kind> {
    if type_name == "Literal" {
        if obj.contains_key("regex") {
            return Ok(Kind::RegExpLiteral);
        }
        return Ok(match obj.get("value") {
            Some(Json::Number(_)) => Kind::NumericLiteral,
            Some(Json::String(_)) => Kind::StringLiteral,
            Some(Json::Bool(_)) => Kind::BooleanLiteral,
            Some(Json::Null) | None => Kind::NullLiteral,
            Some(other) => return Err(invalid(format!("unsupported literal {}", other))),
        });
    }
    if type_name == "Property" {
        return Ok(Kind::ObjectProperty);
    }
    Kind::from_name(type_name).ok_or_else(|| invalid(format!("unknown node type `{}`", type_name)))
}

fn child_from_json(value: &Json) -> Result<Child> {
    match value {
        Json::Null => Ok(Child::Null),
        Json::Array(items) => items
            .iter()
            .map(from_json)
            .collect::<Result<Vec<_>>>()
            .map(Child::List),
        _ => Ok(Child::Node(Box::new(from_json(value)?))),
    }
}

fn comments(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.get("value").and_then(Json::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{consume, produce};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fields_and_attrs() {
        let node = from_json(&json!({
            "type": "VariableDeclaration",
            "kind": "let",
            "start": 0,
            "declarations": [{
                "type": "VariableDeclarator",
                "id": {"type": "Identifier", "name": "a"},
                "init": null
            }]
        }))
        .unwrap();
        assert_eq!(node.kind, Kind::VariableDeclaration);
        assert_eq!(node.attr("kind"), Some(&json!("let")));
        assert_eq!(node.attr("start"), Some(&json!(0)));
        let decl = &node.list(Slot::Declarations).unwrap()[0];
        assert_eq!(decl.child(Slot::Id).and_then(Node::name), Some("a"));
        assert_eq!(decl.fields.get(&Slot::Init), Some(&Child::Null));
    }

    #[test]
    fn test_file_and_literal() {
        let node = from_json(&json!({
            "type": "File",
            "program": {
                "type": "Program",
                "body": [{
                    "type": "ExpressionStatement",
                    "expression": {"type": "Literal", "value": 1}
                }]
            }
        }))
        .unwrap();
        assert_eq!(node.kind, Kind::Program);
        let stmt = &node.list(Slot::Body).unwrap()[0];
        assert_eq!(
            stmt.child(Slot::Expression).map(|n| n.kind),
            Some(Kind::NumericLiteral)
        );
    }

    #[test]
    fn test_location_and_comments() {
        let node = from_json(&json!({
            "type": "Identifier",
            "name": "x",
            "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 1}},
            "leadingComments": [{"type": "CommentLine", "value": " @pure"}]
        }))
        .unwrap();
        assert_eq!(node.loc.as_ref().map(|l| l.end.column), Some(1));
        assert_eq!(node.leading_comments, vec![" @pure".to_string()]);
        let back = to_json(&node);
        assert_eq!(back["loc"]["start"]["line"], json!(1));
        assert_eq!(back["leadingComments"][0]["value"], json!(" @pure"));
    }

    #[test]
    fn test_round_trip() {
        let text = r#"{"type":"Program","body":[{"type":"ReturnStatement","argument":{"type":"Identifier","name":"a"}}]}"#;
        let node = from_str(text).unwrap();
        assert_eq!(to_json(&node), serde_json::from_str::<Json>(text).unwrap());
    }

    fn through_stream(input: &Json) -> Json {
        let node = from_json(input).unwrap();
        to_json(&consume(produce(&node)).unwrap().top)
    }

    #[test]
    fn test_statement_kinds_round_trip() {
        let ident = |name: &str| json!({"type": "Identifier", "name": name});
        let call = |name: &str| {
            json!({
                "type": "ExpressionStatement",
                "expression": {"type": "CallExpression", "callee": ident(name), "arguments": []}
            })
        };
        let input = json!({
            "type": "Program",
            "body": [
                {
                    "type": "TryStatement",
                    "block": {"type": "BlockStatement", "body": [call("f")]},
                    "handler": {
                        "type": "CatchClause",
                        "param": ident("e"),
                        "body": {"type": "BlockStatement", "body": [call("g")]}
                    },
                    "finalizer": {"type": "BlockStatement", "body": []}
                },
                {
                    "type": "DoWhileStatement",
                    "body": {"type": "BlockStatement", "body": [call("h")]},
                    "test": ident("x")
                },
                {
                    "type": "SwitchStatement",
                    "discriminant": ident("x"),
                    "cases": [
                        {"type": "SwitchCase", "test": {"type": "NumericLiteral", "value": 1}, "consequent": [call("a")]},
                        {"type": "SwitchCase", "test": null, "consequent": []}
                    ]
                },
                {
                    "type": "LabeledStatement",
                    "label": ident("outer"),
                    "body": {"type": "DebuggerStatement"}
                }
            ]
        });
        assert_eq!(through_stream(&input), input);
    }

    #[test]
    fn test_aliases_round_trip() {
        let input = json!({
            "type": "ObjectExpression",
            "properties": [
                {
                    "type": "Property",
                    "kind": "init",
                    "key": {"type": "Identifier", "name": "a"},
                    "value": {"type": "Literal", "value": "s"}
                },
                {
                    "type": "Property",
                    "kind": "init",
                    "key": {"type": "Identifier", "name": "b"},
                    "value": {"type": "Literal", "value": null, "regex": {"pattern": "x", "flags": "g"}}
                }
            ]
        });
        let node = from_json(&input).unwrap();
        let props = node.list(Slot::Properties).unwrap();
        assert_eq!(props[0].kind, Kind::ObjectProperty);
        assert_eq!(props[0].child(Slot::Value).map(|v| v.kind), Some(Kind::StringLiteral));
        assert_eq!(props[1].child(Slot::Value).map(|v| v.kind), Some(Kind::RegExpLiteral));
        assert_eq!(through_stream(&input), input);
    }

    #[test]
    fn test_alias_dropped_when_kind_changes() {
        let mut node = from_json(&json!({"type": "Literal", "value": 1})).unwrap();
        assert_eq!(node.source_type.as_deref(), Some("Literal"));
        node.kind = Kind::Identifier;
        assert_eq!(to_json(&node)["type"], json!("Identifier"));
    }

    #[test]
    fn test_unknown_type() {
        let err = from_json(&json!({"type": "JSXElement"})).unwrap_err();
        assert_eq!(
            err,
            StreamError::InvalidTree("unknown node type `JSXElement`".to_string())
        );
    }
}
