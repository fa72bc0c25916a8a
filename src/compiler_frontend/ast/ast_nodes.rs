use crate::compiler_frontend::tokenizer::tokens::TextLocation;

/// The root of a parsed program.
/// Owns every node below it, nothing is shared between subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Declaration(Declaration),
    Assignment {
        target: Identifier,
        value: Expression,
    },
    Expression(Expression),
    If {
        condition: Expression,
        then_block: Block,
        else_block: Option<Block>,
    },
    Return(Expression),
    Function(FunctionDecl),
}

impl StatementKind {
    pub fn node_name(&self) -> &'static str {
        match self {
            StatementKind::Declaration(_) => "declaration",
            StatementKind::Assignment { .. } => "assignment",
            StatementKind::Expression(_) => "expression_statement",
            StatementKind::If { .. } => "if",
            StatementKind::Return(_) => "return",
            StatementKind::Function(_) => "function_decl",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub initializer: Initializer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Init(Expression),
    NoInit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Block { statements }
    }
}

/// The only return type the language has, kept so the signature reads like the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: DataType,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: TextLocation,
}

impl Expression {
    pub fn new(kind: ExpressionKind, location: TextLocation) -> Self {
        Expression { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Number(NumberLiteral),
    Identifier(String),
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberLiteral {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::GreaterThan => ">",
        }
    }
}
