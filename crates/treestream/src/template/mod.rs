//! Template compiler
//!
//! Templates are small pieces of JavaScript with placeholders, compiled to
//! trees once and kept for the life of the process. A leading sigil picks
//! what the text stands for:
//!
//! | Sigil | Meaning |
//! |-------|---------|
//! | `=`   | one expression |
//! | `*`   | a list of statements |
//! | `>`   | a variable declarator, written as an assignment `a = b` |
//! | none  | exactly one statement |
//!
//! Placeholders are the identifiers `$$` and `$E`; see
//! [`crate::stream::Stream::open`].
//!
//! ```
//! use treestream::template::Template;
//! use treestream::{Kind, Slot};
//!
//! let toks = Template::from("=$$ + 1").tokens(Slot::Argument).unwrap();
//! assert_eq!(toks[0].kind, Kind::BinaryExpression);
//! assert_eq!(toks[0].slot, Slot::Argument);
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::error::{Result, StreamError};
use crate::kind::{Kind, Slot};
use crate::token::{clone_tokens, Token};
use crate::tree::{produce_at, Node};

pub mod parse;

/// Compiled templates keyed by their full source text, sigil included.
static CACHE: Lazy<DashMap<String, Arc<Vec<Node>>>> = Lazy::new(DashMap::new);

/// A template: source text or a ready token list.
#[derive(Debug, Clone)]
pub enum Template {
    /// JavaScript source with an optional leading sigil
    Source(String),
    /// Tokens to copy as they are
    Tokens(Vec<Token>),
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template::Source(text.to_string())
    }
}

impl From<String> for Template {
    fn from(text: String) -> Self {
        Template::Source(text)
    }
}

impl From<Vec<Token>> for Template {
    fn from(tokens: Vec<Token>) -> Self {
        Template::Tokens(tokens)
    }
}

impl Template {
    /// Fresh tokens for this template.
    ///
    /// Source templates are produced at `slot`; token lists are cloned with
    /// their own slots.
    pub fn tokens(&self, slot: Slot) -> Result<Vec<Token>> {
        match self {
            Template::Source(text) => {
                let nodes = compile(text)?;
                Ok(nodes.iter().flat_map(|node| produce_at(node, slot)).collect())
            }
            Template::Tokens(tokens) => Ok(clone_tokens(tokens.iter().cloned())),
        }
    }
}

/// What a template text stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `=`
    Expression,
    /// `*`
    List,
    /// `>`
    Declarator,
    /// no sigil
    Statement,
}

/// Split the sigil off a template text.
pub fn mode(text: &str) -> (Mode, &str) {
    match text.chars().next() {
        Some('=') => (Mode::Expression, &text[1..]),
        Some('*') => (Mode::List, &text[1..]),
        Some('>') => (Mode::Declarator, &text[1..]),
        _ => (Mode::Statement, text),
    }
}

/// Compile a template text, using the process-wide cache.
pub fn compile(text: &str) -> Result<Arc<Vec<Node>>> {
    if let Some(hit) = CACHE.get(text) {
        trace!(template = text, "template cache hit");
        return Ok(Arc::clone(hit.value()));
    }
    trace!(template = text, "template cache miss");
    let (mode, source) = mode(text);
    let body = parse::parse_program(source).map_err(|e| syntax(text, e.to_string()))?;
    let nodes = Arc::new(shape(text, mode, body)?);
    CACHE.insert(text.to_string(), Arc::clone(&nodes));
    Ok(nodes)
}

fn syntax(template: &str, message: String) -> StreamError {
    StreamError::TemplateSyntax {
        template: template.to_string(),
        message,
    }
}

fn single(text: &str, body: Vec<Node>) -> Result<Node> {
    let count = body.len();
    let mut body = body.into_iter();
    match (body.next(), count) {
        (Some(node), 1) => Ok(node),
        _ => Err(syntax(
            text,
            format!("expected exactly one statement, found {}", count),
        )),
    }
}

fn expression(text: &str, stmt: Node) -> Result<Node> {
    let mut stmt = stmt;
    if stmt.kind != Kind::ExpressionStatement {
        return Err(syntax(
            text,
            format!("expected an expression, found {}", stmt.kind),
        ));
    }
    stmt.take_child(Slot::Expression)
        .ok_or_else(|| syntax(text, "empty expression statement".to_string()))
}

fn shape(text: &str, mode: Mode, body: Vec<Node>) -> Result<Vec<Node>> {
    match mode {
        Mode::List => Ok(body),
        Mode::Statement => Ok(vec![single(text, body)?]),
        Mode::Expression => Ok(vec![expression(text, single(text, body)?)?]),
        Mode::Declarator => {
            let mut assign = expression(text, single(text, body)?)?;
            let plain = assign.kind == Kind::AssignmentExpression
                && assign.attr("operator").and_then(|op| op.as_str()) == Some("=");
            if !plain {
                return Err(syntax(text, "expected `name = value`".to_string()));
            }
            let id = assign.take_child(Slot::Left);
            let init = assign.take_child(Slot::Right);
            Ok(vec![Node::new(Kind::VariableDeclarator)
                .with_opt(Slot::Id, id)
                .with_opt(Slot::Init, init)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_modes() {
        assert_eq!(mode("=a"), (Mode::Expression, "a"));
        assert_eq!(mode("*a; b"), (Mode::List, "a; b"));
        assert_eq!(mode(">a = 1"), (Mode::Declarator, "a = 1"));
        assert_eq!(mode("a;"), (Mode::Statement, "a;"));
    }

    #[test]
    fn test_expression_template() {
        let nodes = compile("=a.b").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, Kind::MemberExpression);
    }

    #[test]
    fn test_single_quoted_string_template() {
        let toks = Template::from("=f('abc')").tokens(Slot::Top).unwrap();
        let arg = toks
            .iter()
            .find(|t| t.kind == Kind::StringLiteral)
            .unwrap();
        assert_eq!(arg.slot, Slot::Push);
        assert_eq!(arg.value.str_attr("value").as_deref(), Some("abc"));
    }

    #[test]
    fn test_declarator_template() {
        let nodes = compile(">x = 1").unwrap();
        let decl = &nodes[0];
        assert_eq!(decl.kind, Kind::VariableDeclarator);
        assert_eq!(decl.child(Slot::Id).and_then(Node::name), Some("x"));
        assert_eq!(
            decl.child(Slot::Init).map(|n| n.kind),
            Some(Kind::NumericLiteral)
        );
    }

    #[test]
    fn test_list_template() {
        let nodes = compile("*a; b; c").unwrap();
        assert_eq!(nodes.len(), 3);
        let toks = Template::from("*a; b; c").tokens(Slot::Push).unwrap();
        assert!(toks.iter().filter(|t| t.is_open()).all(|t| t.slot != Slot::Top));
    }

    #[test]
    fn test_statement_template_needs_one_statement() {
        assert!(compile("a; b").is_err());
        assert!(matches!(
            compile("=a; b"),
            Err(StreamError::TemplateSyntax { .. })
        ));
        assert!(compile("return 1").is_ok());
    }

    #[test]
    fn test_cache_returns_same_trees() {
        let first = compile("=cached + 1").unwrap();
        let second = compile("=cached + 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_tokens_are_fresh_each_time() {
        let t = Template::from("=a");
        let first = t.tokens(Slot::Top).unwrap();
        let second = t.tokens(Slot::Top).unwrap();
        assert_ne!(first[0].id(), second[0].id());
    }

    #[test]
    fn test_token_templates_are_cloned() {
        let toks = Template::from("=a").tokens(Slot::Top).unwrap();
        let copy = Template::from(toks.clone()).tokens(Slot::Body).unwrap();
        assert_eq!(copy.len(), toks.len());
        assert_ne!(copy[0].id(), toks[0].id());
        assert_eq!(copy[0].slot, Slot::Top);
    }
}
