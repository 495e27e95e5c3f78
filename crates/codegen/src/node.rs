//! Syntax tree consumed by the code generator.
//!
//! The tree is binary with sibling links: every node has optional `lhs`,
//! `rhs` and `next` children plus an optional leaf payload. Sequences
//! (top-level functions, statements in a block, arguments, return values)
//! are chained through `next`.
//!
//! Shapes the generator understands:
//!
//! | kind                  | lhs                    | rhs                         |
//! |-----------------------|------------------------|-----------------------------|
//! | `DefineFunction`      | `FunctionDeclaration`  | `Block` body                |
//! | `FunctionDeclaration` | `FunctionHeader`       | `FunctionReturnDetails`?    |
//! | `FunctionHeader`      | `Ident` name           | `FunctionArguments`?        |
//! | `FunctionArguments`   | first argument         |                             |
//! | `FunctionArgument`    | `Ident` name           | `Ident` type                |
//! | `Block`               | first statement        |                             |
//! | `Return`              | first value            |                             |
//! | `IfElse`              | `If`                   | else `Block`?               |
//! | `If`                  | condition              | then `Block`                |
//! | `VarDecl`, `Assign`   | `Ident` name           | value                       |
//! | `ExprStmt`            | expression             |                             |
//! | `Call`                | `Ident` callee         | first argument              |
//! | `Primitive`           | `Integer`/`Character`  |                             |
//! | binary operators      | left operand           | right operand               |

use std::fmt;

/// Syntactic kind of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    DefineFunction,
    FunctionDeclaration,
    FunctionHeader,
    FunctionArguments,
    FunctionArgument,
    FunctionReturnDetails,
    FunctionReturnDetail,

    Ident,
    Primitive,
    Integer,
    Character,

    Block,
    Return,
    IfElse,
    If,
    VarDecl,
    ExprStmt,

    Assign,
    Call,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
}

impl SyntaxKind {
    pub fn name(self) -> &'static str {
        match self {
            SyntaxKind::DefineFunction => "DEFINE_FUNCTION",
            SyntaxKind::FunctionDeclaration => "FUNCTION_DECLARATION",
            SyntaxKind::FunctionHeader => "FUNCTION_HEADER",
            SyntaxKind::FunctionArguments => "FUNCTION_ARGUMENTS",
            SyntaxKind::FunctionArgument => "FUNCTION_ARGUMENT",
            SyntaxKind::FunctionReturnDetails => "FUNCTION_RETURN_DETAILS",
            SyntaxKind::FunctionReturnDetail => "FUNCTION_RETURN_DETAIL",
            SyntaxKind::Ident => "IDENT",
            SyntaxKind::Primitive => "PRIMITIVE",
            SyntaxKind::Integer => "INTEGER",
            SyntaxKind::Character => "CHARACTER",
            SyntaxKind::Block => "BLOCK",
            SyntaxKind::Return => "RETURN",
            SyntaxKind::IfElse => "IF_ELSE",
            SyntaxKind::If => "IF",
            SyntaxKind::VarDecl => "VAR_DECL",
            SyntaxKind::ExprStmt => "EXPR_STMT",
            SyntaxKind::Assign => "ASSIGN",
            SyntaxKind::Call => "CALL",
            SyntaxKind::Eq => "EQ",
            SyntaxKind::Ne => "NE",
            SyntaxKind::Lt => "LT",
            SyntaxKind::Le => "LE",
            SyntaxKind::Gt => "GT",
            SyntaxKind::Ge => "GE",
            SyntaxKind::Add => "ADD",
            SyntaxKind::Sub => "SUB",
        }
    }

    /// Comparison kinds: the ones whose code sets the zero flag.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            SyntaxKind::Eq
                | SyntaxKind::Ne
                | SyntaxKind::Lt
                | SyntaxKind::Le
                | SyntaxKind::Gt
                | SyntaxKind::Ge
        )
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Literal payload carried by a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    Integer(i64),
    Character(char),
    Ident(String),
}

impl Leaf {
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Leaf::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Leaf::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// A syntax tree node. The generator only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: SyntaxKind,
    leaf: Option<Leaf>,
    lhs: Option<Box<Node>>,
    rhs: Option<Box<Node>>,
    next: Option<Box<Node>>,
}

impl Node {
    pub fn new(kind: SyntaxKind) -> Self {
        Self {
            kind,
            leaf: None,
            lhs: None,
            rhs: None,
            next: None,
        }
    }

    pub fn with_leaf(mut self, leaf: Leaf) -> Self {
        self.leaf = Some(leaf);
        self
    }

    pub fn with_lhs(mut self, lhs: Node) -> Self {
        self.lhs = Some(Box::new(lhs));
        self
    }

    pub fn with_rhs(mut self, rhs: Node) -> Self {
        self.rhs = Some(Box::new(rhs));
        self
    }

    pub fn with_next(mut self, next: Node) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn leaf(&self) -> Option<&Leaf> {
        self.leaf.as_ref()
    }

    pub fn lhs(&self) -> Option<&Node> {
        self.lhs.as_deref()
    }

    pub fn rhs(&self) -> Option<&Node> {
        self.rhs.as_deref()
    }

    pub fn next(&self) -> Option<&Node> {
        self.next.as_deref()
    }

    /// This node followed by every node reachable through `next`.
    pub fn siblings(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(Some(self), |node| node.next())
    }

    /// Link `nodes` through `next`, returning the head.
    pub fn chain(nodes: Vec<Node>) -> Option<Node> {
        nodes
            .into_iter()
            .rev()
            .fold(None::<Node>, |tail, mut node| {
                node.next = tail.map(Box::new);
                Some(node)
            })
    }

    /// `node` with `children` chained under `lhs`.
    fn with_children(self, children: Vec<Node>) -> Self {
        match Node::chain(children) {
            Some(head) => self.with_lhs(head),
            None => self,
        }
    }

    // ---- Builders for the shapes the generator understands ----

    pub fn ident(name: impl Into<String>) -> Self {
        Node::new(SyntaxKind::Ident).with_leaf(Leaf::Ident(name.into()))
    }

    /// An integer literal expression.
    pub fn integer(value: i64) -> Self {
        Node::new(SyntaxKind::Primitive)
            .with_lhs(Node::new(SyntaxKind::Integer).with_leaf(Leaf::Integer(value)))
    }

    /// A character literal expression.
    pub fn character(value: char) -> Self {
        Node::new(SyntaxKind::Primitive)
            .with_lhs(Node::new(SyntaxKind::Character).with_leaf(Leaf::Character(value)))
    }

    pub fn binary(kind: SyntaxKind, lhs: Node, rhs: Node) -> Self {
        Node::new(kind).with_lhs(lhs).with_rhs(rhs)
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Self {
        let node = Node::new(SyntaxKind::Call).with_lhs(Node::ident(name));
        match Node::chain(args) {
            Some(head) => node.with_rhs(head),
            None => node,
        }
    }

    pub fn assign(name: impl Into<String>, value: Node) -> Self {
        Node::binary(SyntaxKind::Assign, Node::ident(name), value)
    }

    pub fn block(statements: Vec<Node>) -> Self {
        Node::new(SyntaxKind::Block).with_children(statements)
    }

    pub fn ret(values: Vec<Node>) -> Self {
        Node::new(SyntaxKind::Return).with_children(values)
    }

    pub fn var(name: impl Into<String>, init: Node) -> Self {
        Node::binary(SyntaxKind::VarDecl, Node::ident(name), init)
    }

    pub fn expr_stmt(expr: Node) -> Self {
        Node::new(SyntaxKind::ExprStmt).with_lhs(expr)
    }

    pub fn if_else(cond: Node, then: Node, otherwise: Option<Node>) -> Self {
        let branch = Node::binary(SyntaxKind::If, cond, then);
        let node = Node::new(SyntaxKind::IfElse).with_lhs(branch);
        match otherwise {
            Some(block) => node.with_rhs(block),
            None => node,
        }
    }

    /// A function definition whose arguments and return value are declared `int`.
    pub fn function(name: impl Into<String>, args: &[&str], body: Node) -> Self {
        let arguments: Vec<Node> = args
            .iter()
            .map(|arg| {
                Node::binary(
                    SyntaxKind::FunctionArgument,
                    Node::ident(*arg),
                    Node::ident("int"),
                )
            })
            .collect();
        let mut header = Node::new(SyntaxKind::FunctionHeader).with_lhs(Node::ident(name));
        if !arguments.is_empty() {
            let list = Node::new(SyntaxKind::FunctionArguments);
            header = header.with_rhs(list.with_children(arguments));
        }
        let detail = Node::new(SyntaxKind::FunctionReturnDetail).with_lhs(Node::ident("int"));
        let returns = Node::new(SyntaxKind::FunctionReturnDetails).with_lhs(detail);
        let decl = Node::new(SyntaxKind::FunctionDeclaration)
            .with_lhs(header)
            .with_rhs(returns);
        Node::new(SyntaxKind::DefineFunction)
            .with_lhs(decl)
            .with_rhs(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_links_in_order() {
        let head = Node::chain(vec![Node::integer(1), Node::integer(2), Node::integer(3)]).unwrap();
        let values: Vec<i64> = head
            .siblings()
            .filter_map(|n| n.lhs().and_then(Node::leaf).and_then(Leaf::as_integer))
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn chain_of_nothing_is_none() {
        assert_eq!(Node::chain(Vec::new()), None);
    }

    #[test]
    fn function_builder_shape() {
        let f = Node::function("add", &["a", "b"], Node::block(vec![]));
        assert_eq!(f.kind(), SyntaxKind::DefineFunction);
        let header = f.lhs().and_then(Node::lhs).unwrap();
        assert_eq!(header.kind(), SyntaxKind::FunctionHeader);
        let name = Leaf::Ident("add".into());
        assert_eq!(header.lhs().and_then(Node::leaf), Some(&name));
        let args = header.rhs().and_then(Node::lhs).unwrap();
        assert_eq!(args.siblings().count(), 2);
        assert_eq!(f.rhs().map(Node::kind), Some(SyntaxKind::Block));
    }

    #[test]
    fn kind_display() {
        assert_eq!(SyntaxKind::IfElse.to_string(), "IF_ELSE");
        assert!(SyntaxKind::Ge.is_comparison());
        assert!(!SyntaxKind::Add.is_comparison());
    }
}
