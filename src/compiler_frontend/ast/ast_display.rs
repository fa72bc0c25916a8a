//! Textual AST dump.
//!
//! One node per line as `kind: leaf`, each child indented two spaces deeper than its parent.

use crate::compiler_frontend::ast::ast_nodes::{
    Ast, Block, Expression, ExpressionKind, FunctionDecl, Initializer, NumberLiteral, Statement,
    StatementKind,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for Ast {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write_node(f, 0, "program", "")?;
        for statement in &self.statements {
            write_statement(f, 1, statement)?;
        }
        Ok(())
    }
}

fn write_node(f: &mut Formatter<'_>, level: usize, kind: &str, leaf: &str) -> FmtResult {
    let indent = "  ".repeat(level);

    if leaf.is_empty() {
        writeln!(f, "{indent}{kind}:")
    } else {
        writeln!(f, "{indent}{kind}: {leaf}")
    }
}

fn write_statement(f: &mut Formatter<'_>, level: usize, statement: &Statement) -> FmtResult {
    let kind = statement.kind.node_name();

    match &statement.kind {
        StatementKind::Declaration(declaration) => {
            write_node(f, level, kind, &declaration.name)?;
            match &declaration.initializer {
                Initializer::Init(value) => {
                    write_node(f, level + 1, "init", "")?;
                    write_expression(f, level + 2, value)
                }
                Initializer::NoInit => write_node(f, level + 1, "noinit", ""),
            }
        }

        StatementKind::Assignment { target, value } => {
            write_node(f, level, kind, "")?;
            write_node(f, level + 1, "identifier", &target.name)?;
            write_expression(f, level + 1, value)
        }

        StatementKind::Expression(value) | StatementKind::Return(value) => {
            write_node(f, level, kind, "")?;
            write_expression(f, level + 1, value)
        }

        StatementKind::If {
            condition,
            then_block,
            else_block,
        } => {
            write_node(f, level, kind, "")?;
            write_expression(f, level + 1, condition)?;
            write_block(f, level + 1, then_block)?;
            if let Some(else_block) = else_block {
                write_block(f, level + 1, else_block)?;
            }
            Ok(())
        }

        StatementKind::Function(function) => write_function(f, level, function),
    }
}

fn write_function(f: &mut Formatter<'_>, level: usize, function: &FunctionDecl) -> FmtResult {
    write_node(f, level, "function_decl", &function.name)?;
    for param in &function.params {
        write_node(f, level + 1, "param", &param.name)?;
    }
    write_node(f, level + 1, "return_type", "int")?;
    write_block(f, level + 1, &function.body)
}

fn write_block(f: &mut Formatter<'_>, level: usize, block: &Block) -> FmtResult {
    write_node(f, level, "block", "")?;
    for statement in &block.statements {
        write_statement(f, level + 1, statement)?;
    }
    Ok(())
}

fn write_expression(f: &mut Formatter<'_>, level: usize, expression: &Expression) -> FmtResult {
    match &expression.kind {
        ExpressionKind::Number(NumberLiteral::Int(value)) => {
            write_node(f, level, "number", &value.to_string())
        }
        ExpressionKind::Number(NumberLiteral::Float(value)) => {
            write_node(f, level, "number", &format!("{value:?}"))
        }
        ExpressionKind::Identifier(name) => write_node(f, level, "identifier", name),
        ExpressionKind::BinaryOp { op, lhs, rhs } => {
            write_node(f, level, "binary_op", op.symbol())?;
            write_expression(f, level + 1, lhs)?;
            write_expression(f, level + 1, rhs)
        }
        ExpressionKind::FunctionCall { name, args } => {
            write_node(f, level, "funccall", name)?;
            for arg in args {
                write_expression(f, level + 1, arg)?;
            }
            Ok(())
        }
    }
}
