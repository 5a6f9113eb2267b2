//! Passes driven through the ESTree JSON bridge

use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use treestream::kit::transform;
use treestream::opts;
use treestream::passes::*;
use treestream::tree::json::{from_json, from_str, to_json};
use treestream::*;

fn ident(name: &str, line: u32) -> Json {
    json!({
        "type": "Identifier",
        "name": name,
        "loc": {
            "start": {"line": line, "column": 4},
            "end": {"line": line, "column": 4 + name.len()}
        }
    })
}

fn run<F>(input: Json, pass: F) -> Json
where
    F: FnOnce(Vec<Token>) -> PassResult<Vec<Token>>,
{
    let node = from_json(&input).unwrap();
    to_json(&transform(&node, Options::new(), pass).unwrap())
}

// ═══════════════════════════════════════════════════════════════════════
// Round trips
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unchanged_by_passes() {
    let input = json!({
        "type": "Program",
        "body": [
            {
                "type": "IfStatement",
                "test": ident("a", 1),
                "consequent": {
                    "type": "BlockStatement",
                    "body": [{
                        "type": "ExpressionStatement",
                        "expression": {
                            "type": "CallExpression",
                            "callee": ident("f", 2),
                            "arguments": [{"type": "NumericLiteral", "value": 1}]
                        }
                    }]
                },
                "alternate": null
            }
        ]
    });
    let out = run(input.clone(), |t| {
        let t = complete_subst(t)?;
        let t = make_expr(t)?;
        adjust_field_type(t)
    });
    assert_eq!(out, input);
}

#[test]
fn test_babel_file_wrapper() {
    let text = r#"{
        "type": "File",
        "program": {
            "type": "Program",
            "sourceType": "module",
            "body": [{"type": "ExpressionStatement", "expression": {"type": "Literal", "value": "s"}}]
        }
    }"#;
    let node = from_str(text).unwrap();
    let top = consume(produce(&node)).unwrap().top;
    let out = to_json(&top);
    assert_eq!(out["type"], json!("Program"));
    assert_eq!(out["sourceType"], json!("module"));
    assert_eq!(out["body"][0]["expression"]["type"], json!("Literal"));
    let stmt = &top.list(Slot::Body).unwrap()[0];
    assert_eq!(
        stmt.child(Slot::Expression).map(|e| e.kind),
        Some(Kind::StringLiteral)
    );
    assert_eq!(out["body"][0]["expression"]["value"], json!("s"));
}

// ═══════════════════════════════════════════════════════════════════════
// Rewrites
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_adjusted_nodes_keep_locations() {
    let input = json!({
        "type": "IfStatement",
        "test": ident("x", 1),
        "consequent": {
            "type": "CallExpression",
            "callee": ident("f", 2),
            "arguments": []
        },
        "alternate": null
    });
    let out = run(input, adjust_field_type);
    let cons = &out["consequent"];
    assert_eq!(cons["type"], json!("ExpressionStatement"));
    assert_eq!(cons.get("loc"), None);
    assert_eq!(cons["expression"]["callee"]["loc"]["start"]["line"], json!(2));
    assert_eq!(out["alternate"], Json::Null);
}

#[test]
fn test_hoisting_from_json() {
    let input = json!({
        "type": "Program",
        "body": [
            {
                "type": "ExpressionStatement",
                "expression": {"type": "CallExpression", "callee": ident("g", 1), "arguments": []}
            },
            {
                "type": "VariableDeclaration",
                "kind": "let",
                "declarations": [{
                    "type": "VariableDeclarator",
                    "id": ident("x", 2),
                    "init": {"type": "NumericLiteral", "value": 1}
                }]
            }
        ]
    });
    let out = run(input, hoist_var_decls);
    let body = out["body"].as_array().unwrap();
    assert_eq!(body.len(), 3);
    assert_eq!(body[0]["type"], json!("VariableDeclaration"));
    assert_eq!(body[0]["kind"], json!("var"));
    assert_eq!(body[0]["declarations"][0]["init"], Json::Null);
    assert_eq!(body[1]["expression"]["callee"]["name"], json!("g"));
    let assign = &body[2]["expression"];
    assert_eq!(assign["type"], json!("AssignmentExpression"));
    assert_eq!(assign["operator"], json!("="));
    assert_eq!(assign["left"]["name"], json!("x"));
    assert_eq!(assign["right"]["value"], json!(1));
}

#[test]
fn test_options_visible_to_passes() {
    let node = from_json(&ident("a", 1)).unwrap();
    let options = Options::new().with_file("input.js").with_arg("loose", true);
    let top = transform(&node, options, |t| {
        let current = opts::current();
        assert_eq!(current.file.as_deref(), Some("input.js"));
        assert_eq!(current.arg("loose"), Some(&json!(true)));
        Ok(t)
    })
    .unwrap();
    assert_eq!(top.name(), Some("a"));
    assert_eq!(opts::current().file, None);
}

fn let_decl(name: &str, value: i64) -> Json {
    json!({
        "type": "VariableDeclaration",
        "kind": "let",
        "declarations": [{
            "type": "VariableDeclarator",
            "id": {"type": "Identifier", "name": name},
            "init": {"type": "NumericLiteral", "value": value}
        }]
    })
}

#[test]
fn test_hoisting_through_classes_and_try() {
    let input = json!({
        "type": "Program",
        "body": [
            {
                "type": "ClassDeclaration",
                "id": {"type": "Identifier", "name": "C"},
                "superClass": null,
                "body": {
                    "type": "ClassBody",
                    "body": [{
                        "type": "ClassMethod",
                        "kind": "method",
                        "key": {"type": "Identifier", "name": "m"},
                        "params": [],
                        "body": {"type": "BlockStatement", "body": [let_decl("a", 1)]}
                    }]
                }
            },
            {
                "type": "TryStatement",
                "block": {"type": "BlockStatement", "body": [let_decl("b", 2)]},
                "handler": null,
                "finalizer": null
            }
        ]
    });
    let out = run(input, hoist_var_decls);
    let body = out["body"].as_array().unwrap();
    assert_eq!(body.len(), 3);
    assert_eq!(body[0]["kind"], json!("var"));
    assert_eq!(body[0]["declarations"][0]["id"]["name"], json!("b"));
    assert_eq!(body[1]["type"], json!("ClassDeclaration"));
    let method = &body[1]["body"]["body"][0];
    assert_eq!(method["key"]["name"], json!("m"));
    let stmts = method["body"]["body"].as_array().unwrap();
    assert_eq!(stmts.len(), 2);
    assert_eq!(stmts[0]["declarations"][0]["id"]["name"], json!("a"));
    assert_eq!(stmts[1]["expression"]["type"], json!("AssignmentExpression"));
    let tried = &body[2]["block"]["body"][0];
    assert_eq!(tried["expression"]["left"]["name"], json!("b"));
    assert_eq!(body[2]["handler"], Json::Null);
}

#[test]
fn test_adjusting_do_while_body() {
    let input = json!({
        "type": "DoWhileStatement",
        "body": {"type": "CallExpression", "callee": ident("f", 1), "arguments": []},
        "test": ident("x", 2)
    });
    let out = run(input, adjust_field_type);
    assert_eq!(out["body"]["type"], json!("ExpressionStatement"));
    assert_eq!(out["body"]["expression"]["callee"]["name"], json!("f"));
    assert_eq!(out["test"]["name"], json!("x"));
}
