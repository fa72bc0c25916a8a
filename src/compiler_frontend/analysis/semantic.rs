//! Scope-aware semantic checks over the AST.
//!
//! Every rule violation is collected and the walk always runs to the end,
//! so one pass reports everything. Nothing here blocks IR generation.

use crate::compiler_frontend::ast::ast_nodes::{
    Ast, Block, Expression, ExpressionKind, FunctionDecl, Initializer, Statement, StatementKind,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::scope::ScopeStack;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::{rule_error, semantic_log};

#[derive(Debug, Clone, Copy)]
struct SymbolInfo {
    initialized: bool,
}

pub fn check_program(ast: &Ast) -> Vec<CompilerError> {
    let mut analyzer = SemanticAnalyzer::default();

    for statement in &ast.statements {
        analyzer.check_statement(statement);
    }

    semantic_log!(format!(
        "Semantic analysis found {} issues",
        analyzer.errors.len()
    ));
    analyzer.errors
}

#[derive(Default)]
struct SemanticAnalyzer {
    scopes: ScopeStack<SymbolInfo>,
    errors: Vec<CompilerError>,
}

impl SemanticAnalyzer {
    fn check_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Declaration(declaration) => match &declaration.initializer {
                // The name is registered before the initializer is checked,
                // so `int a = a;` is accepted
                Initializer::Init(value) => {
                    self.add_symbol(&declaration.name, statement.location);
                    self.check_expression(value);
                }

                // Declarations must be initialized. The name stays unregistered.
                Initializer::NoInit => {
                    self.errors.push(rule_error!(
                        format!(
                            "Variable '{}' is not initialized before use.",
                            declaration.name
                        ),
                        statement.location,
                        {
                            CompilationStage => "Semantic Analysis",
                            PrimarySuggestion => "Give the variable a value where it is declared",
                        }
                    ));
                }
            },

            StatementKind::Assignment { target, value } => {
                match self.scopes.lookup_mut(&target.name) {
                    Some(symbol) => symbol.initialized = true,
                    None => self.errors.push(rule_error!(
                        format!(
                            "Variable '{}' is not declared before assignment.",
                            target.name
                        ),
                        target.location,
                        {
                            CompilationStage => "Semantic Analysis",
                            PrimarySuggestion => "Declare the variable with 'int' first",
                        }
                    )),
                }

                self.check_expression(value);
            }

            StatementKind::Expression(value) | StatementKind::Return(value) => {
                self.check_expression(value);
            }

            StatementKind::If {
                condition,
                then_block,
                else_block,
            } => {
                // The condition belongs to the enclosing scope
                self.check_expression(condition);

                self.check_block(then_block);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
            }

            StatementKind::Function(function) => self.check_function(function, statement.location),
        }
    }

    fn check_function(&mut self, function: &FunctionDecl, location: TextLocation) {
        self.add_symbol(&function.name, location);

        self.scopes.push_frame();
        for param in &function.params {
            self.add_symbol(&param.name, param.location);
        }

        self.check_block(&function.body);
        self.scopes.pop_frame();
    }

    fn check_block(&mut self, block: &Block) {
        self.scopes.push_frame();
        for statement in &block.statements {
            self.check_statement(statement);
        }
        self.scopes.pop_frame();
    }

    fn check_expression(&mut self, expression: &Expression) {
        match &expression.kind {
            ExpressionKind::Number(_) => {}

            ExpressionKind::Identifier(name) => {
                let initialized = self
                    .scopes
                    .lookup(name)
                    .is_some_and(|symbol| symbol.initialized);

                if !initialized {
                    self.errors.push(rule_error!(
                        format!("Variable '{name}' is not initialized before use."),
                        expression.location,
                        {
                            CompilationStage => "Semantic Analysis",
                        }
                    ));
                }
            }

            ExpressionKind::BinaryOp { lhs, rhs, .. } => {
                self.check_expression(lhs);
                self.check_expression(rhs);
            }

            // Callee names are resolved during IR generation
            ExpressionKind::FunctionCall { args, .. } => {
                for arg in args {
                    self.check_expression(arg);
                }
            }
        }
    }

    fn add_symbol(&mut self, name: &str, location: TextLocation) {
        if !self.scopes.declare(name, SymbolInfo { initialized: true }) {
            self.errors.push(rule_error!(
                format!("Symbol '{name}' already declared."),
                location,
                {
                    CompilationStage => "Semantic Analysis",
                    AlternativeSuggestion => "Use an assignment to change the existing variable",
                }
            ));
        }
    }
}
