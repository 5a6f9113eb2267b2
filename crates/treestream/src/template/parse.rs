//! JavaScript subset parser for template text
//!
//! Built on `syn`'s [`ParseStream`] over the `proc_macro2` lexer, which
//! fixes a few things about the accepted syntax:
//!
//! - strings may be single or double quoted; single-quoted ones are
//!   rewritten to double quotes before lexing
//! - comments are dropped
//! - semicolons are optional between statements, and line breaks carry no
//!   meaning
//! - `$`-prefixed names such as `$$` and `$E` are identifiers
//!
//! Supported: `var`/`let`/`const`, `function` declarations and
//! expressions, arrow functions, `return`, `if`, `while`, `for`
//! (including `in`/`of`), `throw`, `break`, `continue`, blocks, calls,
//! `new`, member access, unary, update, binary, logical, assignment,
//! conditional and sequence expressions, array and object literals.

use std::borrow::Cow;

use proc_macro2::{Delimiter, Spacing};
use syn::buffer::Cursor;
use syn::ext::IdentExt;
use syn::parse::{ParseStream, Parser};
use syn::{braced, bracketed, parenthesized, Ident, LitFloat, LitInt, LitStr, Token};

use crate::kind::{Kind, Slot};
use crate::tree::Node;

/// Parse template source into its top-level statements.
pub fn parse_program(text: &str) -> syn::Result<Vec<Node>> {
    statements.parse_str(&requote(text))
}

/// Rewrite `'...'` string literals as `"..."`.
///
/// The Rust lexer reads `'abc` as a lifetime. Double-quoted strings and
/// comments are copied through untouched.
fn requote(text: &str) -> Cow<'_, str> {
    if !text.contains('\'') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 2);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push(c);
                while let Some(c) = chars.next() {
                    out.push(c);
                    match c {
                        '\\' => out.extend(chars.next()),
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                out.push(c);
                for c in chars.by_ref() {
                    out.push(c);
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                out.push(c);
                let mut prev = '/';
                for c in chars.by_ref() {
                    out.push(c);
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '\'' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push('\\'),
                        },
                        '"' => out.push_str("\\\""),
                        '\'' => break,
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn statements(input: ParseStream) -> syn::Result<Vec<Node>> {
    let mut body = Vec::new();
    while !input.is_empty() {
        body.push(statement(input)?);
    }
    Ok(body)
}

// ═══════════════════════════════════════════════════════════════════════
// Lexical helpers
// ═══════════════════════════════════════════════════════════════════════

/// Match the punctuation characters of `op` at `cursor`, all but the last
/// joined to the next.
fn op_at<'a>(mut cursor: Cursor<'a>, op: &str) -> Option<Cursor<'a>> {
    let count = op.chars().count();
    for (i, ch) in op.chars().enumerate() {
        let (punct, next) = cursor.punct()?;
        if punct.as_char() != ch || (i + 1 < count && punct.spacing() != Spacing::Joint) {
            return None;
        }
        cursor = next;
    }
    Some(cursor)
}

fn peek_op(input: ParseStream, op: &str) -> bool {
    op_at(input.cursor(), op).is_some()
}

fn eat_op(input: ParseStream, op: &str) -> syn::Result<bool> {
    if !peek_op(input, op) {
        return Ok(false);
    }
    input.step(|cursor| match op_at(*cursor, op) {
        Some(rest) => Ok(((), rest)),
        None => Err(cursor.error(format!("expected `{}`", op))),
    })?;
    Ok(true)
}

fn expect_op(input: ParseStream, op: &str) -> syn::Result<()> {
    if eat_op(input, op)? {
        Ok(())
    } else {
        Err(input.error(format!("expected `{}`", op)))
    }
}

fn peek_keyword(input: ParseStream, keyword: &str) -> bool {
    input
        .cursor()
        .ident()
        .map_or(false, |(ident, _)| ident == keyword)
}

fn eat_keyword(input: ParseStream, keyword: &str) -> syn::Result<bool> {
    if !peek_keyword(input, keyword) {
        return Ok(false);
    }
    input.call(Ident::parse_any)?;
    Ok(true)
}

fn eat_semi(input: ParseStream) -> syn::Result<()> {
    if input.peek(Token![;]) {
        input.parse::<Token![;]>()?;
    }
    Ok(())
}

/// A plain name or a `$`-prefixed one.
fn binding(input: ParseStream) -> syn::Result<Node> {
    if input.peek(Token![$]) {
        input.parse::<Token![$]>()?;
        let name = if input.peek(Token![$]) {
            input.parse::<Token![$]>()?;
            "$$".to_string()
        } else if input.cursor().ident().is_some() {
            format!("${}", input.call(Ident::parse_any)?)
        } else {
            "$".to_string()
        };
        return Ok(Node::ident(&name));
    }
    let ident = input.call(Ident::parse_any)?;
    Ok(Node::ident(&ident.to_string()))
}

/// Comma separated items of a delimited group.
fn comma_list(
    input: ParseStream,
    item: fn(ParseStream) -> syn::Result<Node>,
) -> syn::Result<Vec<Node>> {
    let mut items = Vec::new();
    while !input.is_empty() {
        items.push(item(input)?);
        if !input.is_empty() {
            input.parse::<Token![,]>()?;
        }
    }
    Ok(items)
}

// ═══════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════

fn statement(input: ParseStream) -> syn::Result<Node> {
    if input.peek(syn::token::Brace) {
        return block(input);
    }
    if input.peek(Token![;]) {
        input.parse::<Token![;]>()?;
        return Ok(Node::new(Kind::EmptyStatement));
    }
    if ["var", "let", "const"].iter().any(|kw| peek_keyword(input, kw)) {
        let decl = declaration(input)?;
        eat_semi(input)?;
        return Ok(decl);
    }
    if peek_keyword(input, "function") {
        return function(input, Kind::FunctionDeclaration);
    }
    if eat_keyword(input, "return")? {
        let argument = if input.is_empty() || input.peek(Token![;]) {
            None
        } else {
            Some(expression(input)?)
        };
        eat_semi(input)?;
        return Ok(Node::new(Kind::ReturnStatement).with_opt(Slot::Argument, argument));
    }
    if eat_keyword(input, "throw")? {
        let argument = expression(input)?;
        eat_semi(input)?;
        return Ok(Node::new(Kind::ThrowStatement).with_child(Slot::Argument, argument));
    }
    if eat_keyword(input, "if")? {
        let test = parens(input)?;
        let consequent = statement(input)?;
        let alternate = if eat_keyword(input, "else")? {
            Some(statement(input)?)
        } else {
            None
        };
        return Ok(Node::new(Kind::IfStatement)
            .with_child(Slot::Test, test)
            .with_child(Slot::Consequent, consequent)
            .with_opt(Slot::Alternate, alternate));
    }
    if eat_keyword(input, "while")? {
        let test = parens(input)?;
        let body = statement(input)?;
        return Ok(Node::new(Kind::WhileStatement)
            .with_child(Slot::Test, test)
            .with_child(Slot::Body, body));
    }
    if eat_keyword(input, "for")? {
        return for_statement(input);
    }
    for (keyword, kind) in [
        ("break", Kind::BreakStatement),
        ("continue", Kind::ContinueStatement),
    ] {
        if eat_keyword(input, keyword)? {
            eat_semi(input)?;
            return Ok(Node::new(kind).with_opt(Slot::Label, None));
        }
    }
    let expr = expression(input)?;
    eat_semi(input)?;
    Ok(Node::new(Kind::ExpressionStatement).with_child(Slot::Expression, expr))
}

fn block(input: ParseStream) -> syn::Result<Node> {
    let content;
    braced!(content in input);
    let body = statements(&content)?;
    Ok(Node::new(Kind::BlockStatement).with_list(Slot::Body, body))
}

fn parens(input: ParseStream) -> syn::Result<Node> {
    let content;
    parenthesized!(content in input);
    let expr = expression(&content)?;
    if !content.is_empty() {
        return Err(content.error("unexpected token"));
    }
    Ok(expr)
}

fn declaration_kind(input: ParseStream) -> syn::Result<String> {
    Ok(input.call(Ident::parse_any)?.to_string())
}

fn declaration(input: ParseStream) -> syn::Result<Node> {
    let kind = declaration_kind(input)?;
    let mut declarations = Vec::new();
    loop {
        let id = binding(input)?;
        let init = if peek_op(input, "=") && !peek_op(input, "==") && !peek_op(input, "=>") {
            expect_op(input, "=")?;
            Some(assignment(input)?)
        } else {
            None
        };
        declarations.push(
            Node::new(Kind::VariableDeclarator)
                .with_child(Slot::Id, id)
                .with_opt(Slot::Init, init),
        );
        if !input.peek(Token![,]) {
            break;
        }
        input.parse::<Token![,]>()?;
    }
    Ok(Node::new(Kind::VariableDeclaration)
        .with_attr("kind", kind)
        .with_list(Slot::Declarations, declarations))
}

fn for_statement(input: ParseStream) -> syn::Result<Node> {
    let head;
    parenthesized!(head in input);
    let head = &head;

    // `for (x in o)` / `for (var x of o)`
    let fork = head.fork();
    let declared = ["var", "let", "const"].iter().any(|kw| peek_keyword(&fork, kw));
    if declared {
        declaration_kind(&fork)?;
    }
    let left = binding(&fork).ok();
    let each = if peek_keyword(&fork, "in") {
        Some(Kind::ForInStatement)
    } else if peek_keyword(&fork, "of") {
        Some(Kind::ForOfStatement)
    } else {
        None
    };
    if let (Some(kind), Some(_)) = (each, left) {
        let left = if declared {
            let kind = declaration_kind(head)?;
            let id = binding(head)?;
            Node::new(Kind::VariableDeclaration)
                .with_attr("kind", kind)
                .with_list(
                    Slot::Declarations,
                    vec![Node::new(Kind::VariableDeclarator)
                        .with_child(Slot::Id, id)
                        .with_opt(Slot::Init, None)],
                )
        } else {
            binding(head)?
        };
        head.call(Ident::parse_any)?;
        let right = expression(head)?;
        let body = statement(input)?;
        return Ok(Node::new(kind)
            .with_child(Slot::Left, left)
            .with_child(Slot::Right, right)
            .with_child(Slot::Body, body));
    }

    let init = if head.peek(Token![;]) {
        None
    } else if declared {
        Some(declaration(head)?)
    } else {
        Some(expression(head)?)
    };
    head.parse::<Token![;]>()?;
    let test = if head.peek(Token![;]) {
        None
    } else {
        Some(expression(head)?)
    };
    head.parse::<Token![;]>()?;
    let update = if head.is_empty() {
        None
    } else {
        Some(expression(head)?)
    };
    let body = statement(input)?;
    Ok(Node::new(Kind::ForStatement)
        .with_opt(Slot::Init, init)
        .with_opt(Slot::Test, test)
        .with_opt(Slot::Update, update)
        .with_child(Slot::Body, body))
}

fn function(input: ParseStream, kind: Kind) -> syn::Result<Node> {
    input.call(Ident::parse_any)?;
    let id = if input.peek(syn::token::Paren) {
        None
    } else {
        Some(binding(input)?)
    };
    let content;
    parenthesized!(content in input);
    let params = comma_list(&content, binding)?;
    let body = block(input)?;
    Ok(Node::new(kind)
        .with_attr("generator", false)
        .with_attr("async", false)
        .with_opt(Slot::Id, id)
        .with_list(Slot::Params, params)
        .with_child(Slot::Body, body))
}

// ═══════════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════════

const ASSIGN_OPS: &[&str] = &[
    "**=", "<<=", ">>=", "&&=", "||=", "??=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
];

/// Binary operators, longest spelling first, with their precedence.
const BINARY_OPS: &[(&str, u8)] = &[
    ("===", 6),
    ("!==", 6),
    (">>>", 8),
    ("**", 11),
    ("==", 6),
    ("!=", 6),
    ("<=", 7),
    (">=", 7),
    ("&&", 2),
    ("||", 1),
    ("??", 1),
    ("<<", 8),
    (">>", 8),
    ("<", 7),
    (">", 7),
    ("+", 9),
    ("-", 9),
    ("*", 10),
    ("/", 10),
    ("%", 10),
    ("&", 5),
    ("|", 3),
    ("^", 4),
];

fn expression(input: ParseStream) -> syn::Result<Node> {
    let first = assignment(input)?;
    if !input.peek(Token![,]) {
        return Ok(first);
    }
    let mut expressions = vec![first];
    while input.peek(Token![,]) {
        input.parse::<Token![,]>()?;
        expressions.push(assignment(input)?);
    }
    Ok(Node::new(Kind::SequenceExpression).with_list(Slot::Expressions, expressions))
}

fn is_arrow(input: ParseStream) -> bool {
    let cursor = input.cursor();
    if let Some((_, rest)) = cursor.ident() {
        return op_at(rest, "=>").is_some();
    }
    if let Some((_, _, rest)) = cursor.group(Delimiter::Parenthesis) {
        return op_at(rest, "=>").is_some();
    }
    false
}

fn arrow(input: ParseStream) -> syn::Result<Node> {
    let params = if input.peek(syn::token::Paren) {
        let content;
        parenthesized!(content in input);
        comma_list(&content, binding)?
    } else {
        vec![binding(input)?]
    };
    expect_op(input, "=>")?;
    let (body, expression) = if input.peek(syn::token::Brace) {
        (block(input)?, false)
    } else {
        (assignment(input)?, true)
    };
    Ok(Node::new(Kind::ArrowFunctionExpression)
        .with_attr("expression", expression)
        .with_list(Slot::Params, params)
        .with_child(Slot::Body, body))
}

fn assignment(input: ParseStream) -> syn::Result<Node> {
    if is_arrow(input) {
        return arrow(input);
    }
    let left = conditional(input)?;
    let op = ASSIGN_OPS
        .iter()
        .copied()
        .find(|op| peek_op(input, op))
        .or_else(|| {
            (peek_op(input, "=") && !peek_op(input, "==") && !peek_op(input, "=>")).then_some("=")
        });
    let Some(op) = op else {
        return Ok(left);
    };
    expect_op(input, op)?;
    let right = assignment(input)?;
    Ok(Node::new(Kind::AssignmentExpression)
        .with_attr("operator", op)
        .with_child(Slot::Left, left)
        .with_child(Slot::Right, right))
}

fn conditional(input: ParseStream) -> syn::Result<Node> {
    let test = binary(input, 0)?;
    if !input.peek(Token![?]) || peek_op(input, "??") {
        return Ok(test);
    }
    input.parse::<Token![?]>()?;
    let consequent = assignment(input)?;
    input.parse::<Token![:]>()?;
    let alternate = assignment(input)?;
    Ok(Node::new(Kind::ConditionalExpression)
        .with_child(Slot::Test, test)
        .with_child(Slot::Consequent, consequent)
        .with_child(Slot::Alternate, alternate))
}

fn peek_binary(input: ParseStream) -> Option<(&'static str, u8)> {
    if ASSIGN_OPS.iter().any(|op| peek_op(input, op)) {
        return None;
    }
    if peek_keyword(input, "instanceof") {
        return Some(("instanceof", 7));
    }
    if peek_keyword(input, "in") {
        return Some(("in", 7));
    }
    BINARY_OPS.iter().copied().find(|(op, _)| peek_op(input, op))
}

fn binary(input: ParseStream, min: u8) -> syn::Result<Node> {
    let mut left = unary(input)?;
    while let Some((op, prec)) = peek_binary(input) {
        if prec < min {
            break;
        }
        if op.chars().all(char::is_alphabetic) {
            input.call(Ident::parse_any)?;
        } else {
            expect_op(input, op)?;
        }
        let right = binary(input, prec + 1)?;
        let kind = if matches!(op, "&&" | "||" | "??") {
            Kind::LogicalExpression
        } else {
            Kind::BinaryExpression
        };
        left = Node::new(kind)
            .with_attr("operator", op)
            .with_child(Slot::Left, left)
            .with_child(Slot::Right, right);
    }
    Ok(left)
}

fn unary(input: ParseStream) -> syn::Result<Node> {
    for op in ["++", "--"] {
        if eat_op(input, op)? {
            let argument = unary(input)?;
            return Ok(Node::new(Kind::UpdateExpression)
                .with_attr("operator", op)
                .with_attr("prefix", true)
                .with_child(Slot::Argument, argument));
        }
    }
    for op in ["!", "-", "+", "~"] {
        if eat_op(input, op)? {
            return prefix(input, op);
        }
    }
    for op in ["typeof", "void", "delete"] {
        if eat_keyword(input, op)? {
            return prefix(input, op);
        }
    }
    let expr = call_member(input)?;
    for op in ["++", "--"] {
        if eat_op(input, op)? {
            return Ok(Node::new(Kind::UpdateExpression)
                .with_attr("operator", op)
                .with_attr("prefix", false)
                .with_child(Slot::Argument, expr));
        }
    }
    Ok(expr)
}

fn prefix(input: ParseStream, op: &str) -> syn::Result<Node> {
    let argument = unary(input)?;
    Ok(Node::new(Kind::UnaryExpression)
        .with_attr("operator", op)
        .with_attr("prefix", true)
        .with_child(Slot::Argument, argument))
}

fn arguments(input: ParseStream) -> syn::Result<Vec<Node>> {
    let content;
    parenthesized!(content in input);
    comma_list(&content, assignment)
}

/// Extend `object` with one `.name` or `[expr]` access. The flag tells
/// whether anything was parsed.
fn member_tail(input: ParseStream, object: Node) -> syn::Result<(Node, bool)> {
    if input.peek(Token![.]) && !peek_op(input, "..") {
        input.parse::<Token![.]>()?;
        let property = binding(input)?;
        return Ok((member(object, property, false), true));
    }
    if input.peek(syn::token::Bracket) {
        let content;
        bracketed!(content in input);
        let property = expression(&content)?;
        return Ok((member(object, property, true), true));
    }
    Ok((object, false))
}

fn member(object: Node, property: Node, computed: bool) -> Node {
    Node::new(Kind::MemberExpression)
        .with_attr("computed", computed)
        .with_child(Slot::Object, object)
        .with_child(Slot::Property, property)
}

fn call_member(input: ParseStream) -> syn::Result<Node> {
    let mut expr = if eat_keyword(input, "new")? {
        let mut callee = primary(input)?;
        loop {
            let (next, more) = member_tail(input, callee)?;
            callee = next;
            if !more {
                break;
            }
        }
        let args = if input.peek(syn::token::Paren) {
            arguments(input)?
        } else {
            Vec::new()
        };
        Node::new(Kind::NewExpression)
            .with_child(Slot::Callee, callee)
            .with_list(Slot::Arguments, args)
    } else {
        primary(input)?
    };
    loop {
        if input.peek(syn::token::Paren) {
            let args = arguments(input)?;
            expr = Node::new(Kind::CallExpression)
                .with_child(Slot::Callee, expr)
                .with_list(Slot::Arguments, args);
            continue;
        }
        let (next, more) = member_tail(input, expr)?;
        expr = next;
        if !more {
            return Ok(expr);
        }
    }
}

fn primary(input: ParseStream) -> syn::Result<Node> {
    if input.peek(LitStr) {
        let lit: LitStr = input.parse()?;
        return Ok(Node::new(Kind::StringLiteral).with_attr("value", lit.value()));
    }
    if input.peek(LitInt) {
        let lit: LitInt = input.parse()?;
        let value = match lit.base10_parse::<i64>() {
            Ok(int) => serde_json::Value::from(int),
            Err(_) => serde_json::Value::from(lit.base10_parse::<f64>()?),
        };
        return Ok(Node::new(Kind::NumericLiteral).with_attr("value", value));
    }
    if input.peek(LitFloat) {
        let lit: LitFloat = input.parse()?;
        let value = lit.base10_parse::<f64>()?;
        return Ok(Node::new(Kind::NumericLiteral).with_attr("value", value));
    }
    if input.peek(syn::token::Paren) {
        return parens(input);
    }
    if input.peek(syn::token::Bracket) {
        let content;
        bracketed!(content in input);
        let elements = comma_list(&content, assignment)?;
        return Ok(Node::new(Kind::ArrayExpression).with_list(Slot::Elements, elements));
    }
    if input.peek(syn::token::Brace) {
        let content;
        braced!(content in input);
        let properties = comma_list(&content, property)?;
        return Ok(Node::new(Kind::ObjectExpression).with_list(Slot::Properties, properties));
    }
    if peek_keyword(input, "function") {
        return function(input, Kind::FunctionExpression);
    }
    for (keyword, value) in [("true", true), ("false", false)] {
        if eat_keyword(input, keyword)? {
            return Ok(Node::new(Kind::BooleanLiteral).with_attr("value", value));
        }
    }
    if eat_keyword(input, "null")? {
        return Ok(Node::new(Kind::NullLiteral));
    }
    if eat_keyword(input, "this")? {
        return Ok(Node::new(Kind::ThisExpression));
    }
    if input.peek(Token![$]) || input.cursor().ident().is_some() {
        return binding(input);
    }
    Err(input.error("expected an expression"))
}

fn property(input: ParseStream) -> syn::Result<Node> {
    let key = if input.peek(LitStr) || input.peek(LitInt) {
        primary(input)?
    } else {
        binding(input)?
    };
    let (value, shorthand) = if input.peek(Token![:]) {
        input.parse::<Token![:]>()?;
        (assignment(input)?, false)
    } else {
        (key.clone(), true)
    };
    Ok(Node::new(Kind::ObjectProperty)
        .with_attr("computed", false)
        .with_attr("shorthand", shorthand)
        .with_child(Slot::Key, key)
        .with_child(Slot::Value, value))
}
