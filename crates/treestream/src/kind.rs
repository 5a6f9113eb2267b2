//! Node-shape registry
//!
//! Kinds, slots and the classification tables the passes consult: which
//! fields a kind declares (in order), whether a kind is expression-, statement-
//! or block-shaped, and which shape a grammatical slot requires.
//!
//! The registry covers the ESTree statements, expressions, classes and
//! patterns that babel emits for ES2017 scripts and modules (without
//! import/export declarations). Types outside of it are rejected by the
//! JSON bridge; pass-defined markers travel as [`Kind::Marker`].

use std::fmt;

use crate::token::Token;

/// Node category tag carried by every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    // Program structure
    /// Root of a module or script
    Program,

    // Statements
    /// `expr;`
    ExpressionStatement,
    /// `{ ... }`
    BlockStatement,
    /// `;`
    EmptyStatement,
    /// `return expr;`
    ReturnStatement,
    /// `if (test) consequent else alternate`
    IfStatement,
    /// `while (test) body`
    WhileStatement,
    /// `for (init; test; update) body`
    ForStatement,
    /// `for (left in right) body`
    ForInStatement,
    /// `for (left of right) body`
    ForOfStatement,
    /// `throw expr;`
    ThrowStatement,
    /// `break;`
    BreakStatement,
    /// `continue;`
    ContinueStatement,
    /// `var a = 1, b;`
    VariableDeclaration,
    /// `a = 1` inside a declaration
    VariableDeclarator,
    /// `function f() {}`
    FunctionDeclaration,
    /// `do body while (test);`
    DoWhileStatement,
    /// `try block catch (param) handler finally finalizer`
    TryStatement,
    /// `catch (param) { ... }`
    CatchClause,
    /// `switch (discriminant) { cases }`
    SwitchStatement,
    /// `case test: consequent` or `default: consequent`
    SwitchCase,
    /// `label: body`
    LabeledStatement,
    /// `debugger;`
    DebuggerStatement,
    /// `class C extends B {}`
    ClassDeclaration,

    // Expressions
    /// `function () {}` in expression position
    FunctionExpression,
    /// `() => body`
    ArrowFunctionExpression,
    /// `f(args)`
    CallExpression,
    /// `new F(args)`
    NewExpression,
    /// `a.b` or `a[b]`
    MemberExpression,
    /// A bare name
    Identifier,
    /// `this`
    ThisExpression,
    /// Number literal
    NumericLiteral,
    /// String literal
    StringLiteral,
    /// `true` / `false`
    BooleanLiteral,
    /// `null`
    NullLiteral,
    /// `a + b`
    BinaryExpression,
    /// `a && b`
    LogicalExpression,
    /// `a = b`
    AssignmentExpression,
    /// `!a`, `-a`, `typeof a`
    UnaryExpression,
    /// `a++`
    UpdateExpression,
    /// `a ? b : c`
    ConditionalExpression,
    /// `a, b`
    SequenceExpression,
    /// `[a, b]`
    ArrayExpression,
    /// `{a: b}`
    ObjectExpression,
    /// `a: b` inside an object literal
    ObjectProperty,
    /// `m() {}` inside an object literal
    ObjectMethod,
    /// `class {}` in expression position
    ClassExpression,
    /// Member list of a class
    ClassBody,
    /// `m() {}` inside a class body
    ClassMethod,
    /// `m = function () {}` inside a class body (plain ESTree)
    MethodDefinition,
    /// `x = 1;` inside a class body
    ClassProperty,
    /// `super`
    Super,
    /// `` `a${b}c` ``
    TemplateLiteral,
    /// Literal chunk of a template literal
    TemplateElement,
    /// ``tag`a${b}` ``
    TaggedTemplateExpression,
    /// `/re/g`
    RegExpLiteral,
    /// `await a`
    AwaitExpression,
    /// `yield a`
    YieldExpression,
    /// `...a` in calls and literals
    SpreadElement,

    // Patterns
    /// `{a, b: c}` in binding position
    ObjectPattern,
    /// `[a, b]` in binding position
    ArrayPattern,
    /// `a = 1` in binding position
    AssignmentPattern,
    /// `...rest` in binding position
    RestElement,

    // Pseudo kinds
    /// Array container; children use [`Slot::Push`]
    Array,
    /// Absent optional field
    Null,

    // Control markers
    /// Splice the children in place of the marker
    Subst,
    /// Coerce the child to an expression
    MakeExpr,
    /// Coerce the child to a statement
    MakeStmt,
    /// Pass-defined marker
    Marker(&'static str),
}

/// Grammatical slot a node occupies within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Root of a stream
    Top,
    /// Element of an array container
    Push,
    /// `body`
    Body,
    /// `expression`
    Expression,
    /// `argument`
    Argument,
    /// `test`
    Test,
    /// `consequent`
    Consequent,
    /// `alternate`
    Alternate,
    /// `init`
    Init,
    /// `update`
    Update,
    /// `left`
    Left,
    /// `right`
    Right,
    /// `params`
    Params,
    /// `id`
    Id,
    /// `callee`
    Callee,
    /// `arguments`
    Arguments,
    /// `object`
    Object,
    /// `property`
    Property,
    /// `declarations`
    Declarations,
    /// `elements`
    Elements,
    /// `properties`
    Properties,
    /// `key`
    Key,
    /// `value`
    Value,
    /// `expressions`
    Expressions,
    /// `label`
    Label,
    /// `block`
    Block,
    /// `handler`
    Handler,
    /// `finalizer`
    Finalizer,
    /// `param`
    Param,
    /// `discriminant`
    Discriminant,
    /// `cases`
    Cases,
    /// `superClass`
    SuperClass,
    /// `quasis`
    Quasis,
    /// `tag`
    Tag,
    /// `quasi`
    Quasi,
}

const SLOTS: &[(Slot, &str)] = &[
    (Slot::Top, "top"),
    (Slot::Push, "push"),
    (Slot::Body, "body"),
    (Slot::Expression, "expression"),
    (Slot::Argument, "argument"),
    (Slot::Test, "test"),
    (Slot::Consequent, "consequent"),
    (Slot::Alternate, "alternate"),
    (Slot::Init, "init"),
    (Slot::Update, "update"),
    (Slot::Left, "left"),
    (Slot::Right, "right"),
    (Slot::Params, "params"),
    (Slot::Id, "id"),
    (Slot::Callee, "callee"),
    (Slot::Arguments, "arguments"),
    (Slot::Object, "object"),
    (Slot::Property, "property"),
    (Slot::Declarations, "declarations"),
    (Slot::Elements, "elements"),
    (Slot::Properties, "properties"),
    (Slot::Key, "key"),
    (Slot::Value, "value"),
    (Slot::Expressions, "expressions"),
    (Slot::Label, "label"),
    (Slot::Block, "block"),
    (Slot::Handler, "handler"),
    (Slot::Finalizer, "finalizer"),
    (Slot::Param, "param"),
    (Slot::Discriminant, "discriminant"),
    (Slot::Cases, "cases"),
    (Slot::SuperClass, "superClass"),
    (Slot::Quasis, "quasis"),
    (Slot::Tag, "tag"),
    (Slot::Quasi, "quasi"),
];

impl Slot {
    /// Field name as it appears in ESTree JSON.
    pub fn name(self) -> &'static str {
        SLOTS
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, n)| *n)
            .unwrap_or("?")
    }

    /// Look a slot up by its field name.
    pub fn from_name(name: &str) -> Option<Slot> {
        SLOTS.iter().find(|(_, n)| *n == name).map(|(s, _)| *s)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const KINDS: &[(Kind, &str)] = &[
    (Kind::Program, "Program"),
    (Kind::ExpressionStatement, "ExpressionStatement"),
    (Kind::BlockStatement, "BlockStatement"),
    (Kind::EmptyStatement, "EmptyStatement"),
    (Kind::ReturnStatement, "ReturnStatement"),
    (Kind::IfStatement, "IfStatement"),
    (Kind::WhileStatement, "WhileStatement"),
    (Kind::ForStatement, "ForStatement"),
    (Kind::ForInStatement, "ForInStatement"),
    (Kind::ForOfStatement, "ForOfStatement"),
    (Kind::ThrowStatement, "ThrowStatement"),
    (Kind::BreakStatement, "BreakStatement"),
    (Kind::ContinueStatement, "ContinueStatement"),
    (Kind::VariableDeclaration, "VariableDeclaration"),
    (Kind::VariableDeclarator, "VariableDeclarator"),
    (Kind::FunctionDeclaration, "FunctionDeclaration"),
    (Kind::DoWhileStatement, "DoWhileStatement"),
    (Kind::TryStatement, "TryStatement"),
    (Kind::CatchClause, "CatchClause"),
    (Kind::SwitchStatement, "SwitchStatement"),
    (Kind::SwitchCase, "SwitchCase"),
    (Kind::LabeledStatement, "LabeledStatement"),
    (Kind::DebuggerStatement, "DebuggerStatement"),
    (Kind::ClassDeclaration, "ClassDeclaration"),
    (Kind::FunctionExpression, "FunctionExpression"),
    (Kind::ArrowFunctionExpression, "ArrowFunctionExpression"),
    (Kind::CallExpression, "CallExpression"),
    (Kind::NewExpression, "NewExpression"),
    (Kind::MemberExpression, "MemberExpression"),
    (Kind::Identifier, "Identifier"),
    (Kind::ThisExpression, "ThisExpression"),
    (Kind::NumericLiteral, "NumericLiteral"),
    (Kind::StringLiteral, "StringLiteral"),
    (Kind::BooleanLiteral, "BooleanLiteral"),
    (Kind::NullLiteral, "NullLiteral"),
    (Kind::BinaryExpression, "BinaryExpression"),
    (Kind::LogicalExpression, "LogicalExpression"),
    (Kind::AssignmentExpression, "AssignmentExpression"),
    (Kind::UnaryExpression, "UnaryExpression"),
    (Kind::UpdateExpression, "UpdateExpression"),
    (Kind::ConditionalExpression, "ConditionalExpression"),
    (Kind::SequenceExpression, "SequenceExpression"),
    (Kind::ArrayExpression, "ArrayExpression"),
    (Kind::ObjectExpression, "ObjectExpression"),
    (Kind::ObjectProperty, "ObjectProperty"),
    (Kind::ObjectMethod, "ObjectMethod"),
    (Kind::ClassExpression, "ClassExpression"),
    (Kind::ClassBody, "ClassBody"),
    (Kind::ClassMethod, "ClassMethod"),
    (Kind::MethodDefinition, "MethodDefinition"),
    (Kind::ClassProperty, "ClassProperty"),
    (Kind::Super, "Super"),
    (Kind::TemplateLiteral, "TemplateLiteral"),
    (Kind::TemplateElement, "TemplateElement"),
    (Kind::TaggedTemplateExpression, "TaggedTemplateExpression"),
    (Kind::RegExpLiteral, "RegExpLiteral"),
    (Kind::AwaitExpression, "AwaitExpression"),
    (Kind::YieldExpression, "YieldExpression"),
    (Kind::SpreadElement, "SpreadElement"),
    (Kind::ObjectPattern, "ObjectPattern"),
    (Kind::ArrayPattern, "ArrayPattern"),
    (Kind::AssignmentPattern, "AssignmentPattern"),
    (Kind::RestElement, "RestElement"),
    (Kind::Array, "Array"),
    (Kind::Null, "Null"),
    (Kind::Subst, "Subst"),
    (Kind::MakeExpr, "MakeExpr"),
    (Kind::MakeStmt, "MakeStmt"),
];

impl Kind {
    /// ESTree `type` name.
    pub fn name(self) -> &'static str {
        if let Kind::Marker(name) = self {
            return name;
        }
        KINDS
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, n)| *n)
            .unwrap_or("?")
    }

    /// Look a registered kind up by its ESTree `type` name.
    ///
    /// Pass-defined markers are not registered and never match.
    pub fn from_name(name: &str) -> Option<Kind> {
        KINDS.iter().find(|(_, n)| *n == name).map(|(k, _)| *k)
    }

    /// Declared field slots, in emission order.
    pub fn fields(self) -> &'static [Slot] {
        use Slot::*;
        match self {
            Kind::Program | Kind::BlockStatement | Kind::ClassBody => &[Body],
            Kind::ExpressionStatement => &[Expression],
            Kind::ReturnStatement | Kind::ThrowStatement => &[Argument],
            Kind::IfStatement | Kind::ConditionalExpression => &[Test, Consequent, Alternate],
            Kind::WhileStatement => &[Test, Body],
            Kind::DoWhileStatement => &[Body, Test],
            Kind::TryStatement => &[Block, Handler, Finalizer],
            Kind::CatchClause => &[Param, Body],
            Kind::SwitchStatement => &[Discriminant, Cases],
            Kind::SwitchCase => &[Test, Consequent],
            Kind::LabeledStatement => &[Label, Body],
            Kind::ClassDeclaration | Kind::ClassExpression => &[Id, SuperClass, Body],
            Kind::ClassMethod | Kind::ObjectMethod => &[Key, Params, Body],
            Kind::MethodDefinition | Kind::ClassProperty => &[Key, Value],
            Kind::ForStatement => &[Init, Test, Update, Body],
            Kind::ForInStatement | Kind::ForOfStatement => &[Left, Right, Body],
            Kind::BreakStatement | Kind::ContinueStatement => &[Label],
            Kind::VariableDeclaration => &[Declarations],
            Kind::VariableDeclarator => &[Id, Init],
            Kind::FunctionDeclaration | Kind::FunctionExpression => &[Id, Params, Body],
            Kind::ArrowFunctionExpression => &[Params, Body],
            Kind::CallExpression | Kind::NewExpression => &[Callee, Arguments],
            Kind::MemberExpression => &[Object, Property],
            Kind::BinaryExpression | Kind::LogicalExpression | Kind::AssignmentExpression => {
                &[Left, Right]
            }
            Kind::UnaryExpression
            | Kind::UpdateExpression
            | Kind::AwaitExpression
            | Kind::YieldExpression
            | Kind::SpreadElement
            | Kind::RestElement => &[Argument],
            Kind::AssignmentPattern => &[Left, Right],
            Kind::TemplateLiteral => &[Quasis, Expressions],
            Kind::TaggedTemplateExpression => &[Tag, Quasi],
            Kind::ObjectPattern => &[Properties],
            Kind::ArrayPattern => &[Elements],
            Kind::SequenceExpression => &[Expressions],
            Kind::ArrayExpression => &[Elements],
            Kind::ObjectExpression => &[Properties],
            Kind::ObjectProperty => &[Key, Value],
            _ => &[],
        }
    }

    /// Classification flags for this kind.
    pub fn info(self) -> KindInfo {
        let shape = match self {
            Kind::BlockStatement => Shape::STMT.with(Shape::BLOCK),
            Kind::VariableDeclaration | Kind::FunctionDeclaration | Kind::ClassDeclaration => {
                Shape::STMT.with(Shape::DECL)
            }
            Kind::ExpressionStatement
            | Kind::EmptyStatement
            | Kind::ReturnStatement
            | Kind::IfStatement
            | Kind::WhileStatement
            | Kind::ForStatement
            | Kind::ForInStatement
            | Kind::ForOfStatement
            | Kind::ThrowStatement
            | Kind::BreakStatement
            | Kind::ContinueStatement
            | Kind::DoWhileStatement
            | Kind::TryStatement
            | Kind::SwitchStatement
            | Kind::LabeledStatement
            | Kind::DebuggerStatement => Shape::STMT,
            Kind::FunctionExpression
            | Kind::ArrowFunctionExpression
            | Kind::CallExpression
            | Kind::NewExpression
            | Kind::MemberExpression
            | Kind::Identifier
            | Kind::ThisExpression
            | Kind::NumericLiteral
            | Kind::StringLiteral
            | Kind::BooleanLiteral
            | Kind::NullLiteral
            | Kind::BinaryExpression
            | Kind::LogicalExpression
            | Kind::AssignmentExpression
            | Kind::UnaryExpression
            | Kind::UpdateExpression
            | Kind::ConditionalExpression
            | Kind::SequenceExpression
            | Kind::ArrayExpression
            | Kind::ObjectExpression
            | Kind::ClassExpression
            | Kind::TemplateLiteral
            | Kind::TaggedTemplateExpression
            | Kind::RegExpLiteral
            | Kind::AwaitExpression
            | Kind::YieldExpression => Shape::EXPR,
            _ => Shape::NONE,
        };
        KindInfo {
            shape,
            func: matches!(
                self,
                Kind::FunctionDeclaration
                    | Kind::FunctionExpression
                    | Kind::ArrowFunctionExpression
                    | Kind::ClassMethod
                    | Kind::ObjectMethod
            ),
            ctrl: self.is_ctrl(),
        }
    }

    /// Whether this is a control marker rather than a tree node.
    pub fn is_ctrl(self) -> bool {
        matches!(
            self,
            Kind::Subst | Kind::MakeExpr | Kind::MakeStmt | Kind::Marker(_)
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grammatical category set: any combination of expression, statement,
/// block and declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    /// Expression-shaped
    pub expr: bool,
    /// Statement-shaped
    pub stmt: bool,
    /// Admits a sequence of statements
    pub block: bool,
    /// Declaration
    pub decl: bool,
}

impl Shape {
    /// No category
    pub const NONE: Shape = Shape {
        expr: false,
        stmt: false,
        block: false,
        decl: false,
    };
    /// Expression only
    pub const EXPR: Shape = Shape {
        expr: true,
        ..Shape::NONE
    };
    /// Statement only
    pub const STMT: Shape = Shape {
        stmt: true,
        ..Shape::NONE
    };
    /// Block only
    pub const BLOCK: Shape = Shape {
        block: true,
        ..Shape::NONE
    };
    /// Declaration only
    pub const DECL: Shape = Shape {
        decl: true,
        ..Shape::NONE
    };

    /// Union of two shapes.
    pub const fn with(self, other: Shape) -> Shape {
        Shape {
            expr: self.expr || other.expr,
            stmt: self.stmt || other.stmt,
            block: self.block || other.block,
            decl: self.decl || other.decl,
        }
    }

    /// True if no category is set.
    pub fn is_none(&self) -> bool {
        *self == Shape::NONE
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.expr {
            names.push("expression");
        }
        if self.stmt {
            names.push("statement");
        }
        if self.block {
            names.push("block");
        }
        if self.decl {
            names.push("declaration");
        }
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Classification of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    /// Actual grammatical shape
    pub shape: Shape,
    /// Function-like (introduces a scope)
    pub func: bool,
    /// Control marker
    pub ctrl: bool,
}

/// Shape a node must have to sit in `slot` of a `parent` node.
///
/// For array-valued fields this is the shape of the elements.
pub fn field_shape(parent: Kind, slot: Slot) -> Shape {
    use Kind::*;
    match (parent, slot) {
        (Program | BlockStatement, Slot::Body) => Shape::STMT,
        (ExpressionStatement, Slot::Expression) => Shape::EXPR,
        (ReturnStatement | ThrowStatement, Slot::Argument) => Shape::EXPR,
        (IfStatement | WhileStatement, Slot::Test) => Shape::EXPR,
        (IfStatement, Slot::Consequent | Slot::Alternate) => Shape::STMT,
        (
            WhileStatement | DoWhileStatement | ForStatement | ForInStatement | ForOfStatement
            | LabeledStatement,
            Slot::Body,
        ) => Shape::STMT,
        (DoWhileStatement | SwitchCase, Slot::Test) => Shape::EXPR,
        (SwitchCase, Slot::Consequent) => Shape::STMT,
        (SwitchStatement, Slot::Discriminant) => Shape::EXPR,
        (TryStatement, Slot::Block | Slot::Finalizer) => Shape::BLOCK,
        (CatchClause, Slot::Body) => Shape::BLOCK,
        (ClassMethod | ObjectMethod, Slot::Body) => Shape::BLOCK,
        (ClassDeclaration | ClassExpression, Slot::SuperClass) => Shape::EXPR,
        (MethodDefinition | ClassProperty, Slot::Value) => Shape::EXPR,
        (AwaitExpression | YieldExpression | SpreadElement, Slot::Argument) => Shape::EXPR,
        (AssignmentPattern, Slot::Right) => Shape::EXPR,
        (TemplateLiteral, Slot::Expressions) => Shape::EXPR,
        (TaggedTemplateExpression, Slot::Tag) => Shape::EXPR,
        (ForStatement, Slot::Init) => Shape::EXPR.with(Shape::DECL),
        (ForStatement, Slot::Test | Slot::Update) => Shape::EXPR,
        (ForInStatement | ForOfStatement, Slot::Left) => Shape::DECL,
        (ForInStatement | ForOfStatement, Slot::Right) => Shape::EXPR,
        (FunctionDeclaration | FunctionExpression, Slot::Body) => Shape::BLOCK,
        (ArrowFunctionExpression, Slot::Body) => Shape::BLOCK.with(Shape::EXPR),
        (CallExpression | NewExpression, Slot::Callee | Slot::Arguments) => Shape::EXPR,
        (MemberExpression, Slot::Object) => Shape::EXPR,
        (BinaryExpression | LogicalExpression, Slot::Left | Slot::Right) => Shape::EXPR,
        (AssignmentExpression, Slot::Right) => Shape::EXPR,
        (UnaryExpression, Slot::Argument) => Shape::EXPR,
        (ConditionalExpression, _) => Shape::EXPR,
        (SequenceExpression, Slot::Expressions) => Shape::EXPR,
        (ArrayExpression, Slot::Elements) => Shape::EXPR,
        (ObjectProperty, Slot::Value) => Shape::EXPR,
        (VariableDeclarator, Slot::Init) => Shape::EXPR,
        _ => Shape::NONE,
    }
}

/// Annotate every token's value with the shape its slot requires.
///
/// Control markers are looked through: a node under a marker gets the
/// requirement of the marker's own position. Must run right before
/// any pass reading [`crate::token::ValueData::field`], since earlier
/// rewrites move nodes between slots.
pub fn reset_field_info<I>(tokens: I) -> FieldInfo<I::IntoIter>
where
    I: IntoIterator<Item = Token>,
{
    FieldInfo {
        inner: tokens.into_iter(),
        stack: Vec::new(),
    }
}

/// Iterator adapter returned by [`reset_field_info`].
pub struct FieldInfo<I> {
    inner: I,
    stack: Vec<(Kind, Slot)>,
}

impl<I> FieldInfo<I> {
    fn required(&self, slot: Slot) -> Shape {
        let mut slot = slot;
        let mut frames = self.stack.iter().rev();
        let (parent, parent_slot) = loop {
            match frames.next() {
                Some(&(kind, own)) if kind.is_ctrl() => slot = own,
                Some(&frame) => break frame,
                None => return Shape::NONE,
            }
        };
        if parent != Kind::Array {
            return field_shape(parent, slot);
        }
        // element shape comes from the field holding the array
        let mut array_slot = parent_slot;
        loop {
            match frames.next() {
                Some(&(kind, own)) if kind.is_ctrl() => array_slot = own,
                Some(&(kind, _)) => return field_shape(kind, array_slot),
                None => return Shape::NONE,
            }
        }
    }
}

impl<I: Iterator<Item = Token>> Iterator for FieldInfo<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let tok = self.inner.next()?;
        if tok.enter {
            let shape = self.required(tok.slot);
            tok.value.borrow_mut().field = Some(shape);
            if !tok.leave {
                self.stack.push((tok.kind, tok.slot));
            }
        } else if tok.leave {
            self.stack.pop();
        }
        Some(tok)
    }
}
