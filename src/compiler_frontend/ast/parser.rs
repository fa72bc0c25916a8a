//! Recursive descent parser from tokens to the AST.
//!
//! There is no error recovery. The first malformed token sequence fails the whole parse,
//! so callers either get a complete program or nothing.
//!
//! All binary operators share one precedence level and associate to the left,
//! so `a + b * c` parses as `(a + b) * c`.

use crate::compiler_frontend::ast::ast_nodes::{
    Ast, BinaryOperator, Block, DataType, Declaration, Expression, ExpressionKind, FunctionDecl,
    Identifier, Initializer, NumberLiteral, Param, Statement, StatementKind,
};
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey};
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, TextLocation, TokenKind};
use crate::{ast_log, settings};

pub fn parse_program(tokens: &mut FileTokens) -> Result<Ast, CompilerError> {
    let mut statements =
        Vec::with_capacity(tokens.length / settings::TOKEN_TO_NODE_RATIO + 1);

    // A program needs at least one statement
    if tokens.is_finished() {
        return Err(syntax_error(tokens, "a statement"));
    }

    while !tokens.is_finished() {
        let statement = parse_statement(tokens)?;
        ast_log!(format!(
            "Parsed {} at line {}",
            statement.kind.node_name(),
            statement.location.line()
        ));
        statements.push(statement);
    }

    Ok(Ast { statements })
}

fn parse_statement(tokens: &mut FileTokens) -> Result<Statement, CompilerError> {
    let location = tokens.current_location();

    let kind = match tokens.current_token_kind() {
        TokenKind::Int => parse_declaration(tokens)?,

        TokenKind::Symbol(_) if tokens.peek_next_kind() == &TokenKind::Assign => {
            parse_assignment(tokens)?
        }

        TokenKind::If => parse_if(tokens)?,

        TokenKind::Return => {
            tokens.advance();
            let value = parse_expression(tokens)?;
            expect(tokens, TokenKind::Semicolon, "';'")?;
            StatementKind::Return(value)
        }

        TokenKind::Function => StatementKind::Function(parse_function(tokens)?),

        _ => {
            let expression = parse_expression(tokens)?;
            expect(tokens, TokenKind::Semicolon, "';'")?;
            StatementKind::Expression(expression)
        }
    };

    Ok(Statement { kind, location })
}

// "int" IDENT ("=" expr ";" | ";")
fn parse_declaration(tokens: &mut FileTokens) -> Result<StatementKind, CompilerError> {
    tokens.advance();
    let name = expect_symbol(tokens, "a variable name")?;

    let initializer = match tokens.current_token_kind() {
        TokenKind::Assign => {
            tokens.advance();
            let value = parse_expression(tokens)?;
            expect(tokens, TokenKind::Semicolon, "';'")?;
            Initializer::Init(value)
        }
        TokenKind::Semicolon => {
            tokens.advance();
            Initializer::NoInit
        }
        _ => return Err(syntax_error(tokens, "'=' or ';'")),
    };

    Ok(StatementKind::Declaration(Declaration { name, initializer }))
}

// IDENT "=" expr ";"
fn parse_assignment(tokens: &mut FileTokens) -> Result<StatementKind, CompilerError> {
    let location = tokens.current_location();
    let name = expect_symbol(tokens, "a variable name")?;
    expect(tokens, TokenKind::Assign, "'='")?;

    let value = parse_expression(tokens)?;
    expect(tokens, TokenKind::Semicolon, "';'")?;

    Ok(StatementKind::Assignment {
        target: Identifier { name, location },
        value,
    })
}

// "if" "(" expr ")" "{" statement* "}" ["else" "{" statement* "}"]
fn parse_if(tokens: &mut FileTokens) -> Result<StatementKind, CompilerError> {
    tokens.advance();
    expect(tokens, TokenKind::OpenParenthesis, "'('")?;
    let condition = parse_expression(tokens)?;
    expect(tokens, TokenKind::CloseParenthesis, "')'")?;

    let then_block = parse_block(tokens)?;

    let else_block = if tokens.current_token_kind() == &TokenKind::Else {
        tokens.advance();
        Some(parse_block(tokens)?)
    } else {
        None
    };

    Ok(StatementKind::If {
        condition,
        then_block,
        else_block,
    })
}

// "function" IDENT "(" params? ")" "->" "int" "{" statement* "}"
fn parse_function(tokens: &mut FileTokens) -> Result<FunctionDecl, CompilerError> {
    tokens.advance();
    let name = expect_symbol(tokens, "a function name")?;
    expect(tokens, TokenKind::OpenParenthesis, "'('")?;

    let mut params = Vec::new();
    if tokens.current_token_kind() != &TokenKind::CloseParenthesis {
        loop {
            let location = tokens.current_location();
            expect(tokens, TokenKind::Int, "'int'")?;
            let param_name = expect_symbol(tokens, "a parameter name")?;

            params.push(Param {
                name: param_name,
                data_type: DataType::Int,
                location,
            });

            if tokens.current_token_kind() != &TokenKind::Comma {
                break;
            }
            tokens.advance();
        }
    }

    expect(tokens, TokenKind::CloseParenthesis, "')'")?;
    expect(tokens, TokenKind::Arrow, "'->'")?;
    expect(tokens, TokenKind::Int, "'int'")?;

    let body = parse_block(tokens)?;

    Ok(FunctionDecl {
        name,
        params,
        return_type: DataType::Int,
        body,
    })
}

fn parse_block(tokens: &mut FileTokens) -> Result<Block, CompilerError> {
    expect(tokens, TokenKind::OpenCurly, "'{'")?;
    nested(tokens, parse_block_body)
}

fn parse_block_body(tokens: &mut FileTokens) -> Result<Block, CompilerError> {

    let mut statements = Vec::new();
    while tokens.current_token_kind() != &TokenKind::CloseCurly {
        if tokens.is_finished() {
            return Err(syntax_error(tokens, "'}'"));
        }
        statements.push(parse_statement(tokens)?);
    }

    tokens.advance();
    Ok(Block::new(statements))
}

pub fn parse_expression(tokens: &mut FileTokens) -> Result<Expression, CompilerError> {
    let mut lhs = parse_primary(tokens)?;

    while let Some(op) = binary_operator(tokens.current_token_kind()) {
        tokens.advance();
        let rhs = parse_primary(tokens)?;
        let location = TextLocation::new(lhs.location.start_pos, rhs.location.end_pos);

        lhs = Expression::new(
            ExpressionKind::BinaryOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            location,
        );
    }

    Ok(lhs)
}

fn binary_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Add => BinaryOperator::Add,
        TokenKind::Subtract => BinaryOperator::Subtract,
        TokenKind::Multiply => BinaryOperator::Multiply,
        TokenKind::Divide => BinaryOperator::Divide,
        TokenKind::GreaterThan => BinaryOperator::GreaterThan,
        _ => return None,
    };

    Some(op)
}

fn parse_primary(tokens: &mut FileTokens) -> Result<Expression, CompilerError> {
    let location = tokens.current_location();

    let kind = match tokens.current_token_kind().to_owned() {
        TokenKind::IntLiteral(value) => {
            tokens.advance();
            ExpressionKind::Number(NumberLiteral::Int(value))
        }

        TokenKind::FloatLiteral(value) => {
            tokens.advance();
            ExpressionKind::Number(NumberLiteral::Float(value))
        }

        TokenKind::Symbol(name) => {
            tokens.advance();

            if tokens.current_token_kind() == &TokenKind::OpenParenthesis {
                tokens.advance();
                let args = nested(tokens, parse_arguments)?;
                ExpressionKind::FunctionCall { name, args }
            } else {
                ExpressionKind::Identifier(name)
            }
        }

        TokenKind::OpenParenthesis => {
            tokens.advance();
            let inner = nested(tokens, parse_expression)?;
            expect(tokens, TokenKind::CloseParenthesis, "')'")?;
            return Ok(inner);
        }

        _ => return Err(syntax_error(tokens, "an expression")),
    };

    Ok(Expression::new(kind, location))
}

// Called after the opening parenthesis, consumes the closing one
fn parse_arguments(tokens: &mut FileTokens) -> Result<Vec<Expression>, CompilerError> {
    let mut args = Vec::new();

    if tokens.current_token_kind() == &TokenKind::CloseParenthesis {
        tokens.advance();
        return Ok(args);
    }

    loop {
        args.push(parse_expression(tokens)?);

        match tokens.current_token_kind() {
            TokenKind::Comma => tokens.advance(),
            TokenKind::CloseParenthesis => {
                tokens.advance();
                return Ok(args);
            }
            _ => return Err(syntax_error(tokens, "',' or ')'")),
        }
    }
}

fn expect(
    tokens: &mut FileTokens,
    kind: TokenKind,
    expected: &'static str,
) -> Result<(), CompilerError> {
    if tokens.current_token_kind() != &kind {
        return Err(syntax_error(tokens, expected));
    }

    tokens.advance();
    Ok(())
}

fn expect_symbol(tokens: &mut FileTokens, expected: &'static str) -> Result<String, CompilerError> {
    match tokens.current_token_kind() {
        TokenKind::Symbol(name) => {
            let name = name.to_owned();
            tokens.advance();
            Ok(name)
        }
        _ => Err(syntax_error(tokens, expected)),
    }
}

fn nested<T>(
    tokens: &mut FileTokens,
    parse: fn(&mut FileTokens) -> Result<T, CompilerError>,
) -> Result<T, CompilerError> {
    if tokens.nesting_depth >= settings::MAX_NESTING_DEPTH {
        let mut error = CompilerError::new_syntax_error(
            format!(
                "Syntax error at line {}, nesting is deeper than {} levels",
                tokens.current_token().line(),
                settings::MAX_NESTING_DEPTH
            ),
            tokens.current_location(),
        );
        error.new_metadata_entry(ErrorMetaDataKey::CompilationStage, "Parsing");
        error.new_metadata_entry(
            ErrorMetaDataKey::PrimarySuggestion,
            "Move part of the expression into a variable",
        );
        return Err(error);
    }

    tokens.nesting_depth += 1;
    let result = parse(tokens);
    tokens.nesting_depth -= 1;
    result
}

/// Names the current token (or the end of the input) and the best known line
fn syntax_error(tokens: &FileTokens, expected: &'static str) -> CompilerError {
    let token = tokens.current_token();

    let (msg, location) = if token.kind == TokenKind::Eof {
        (
            format!("Syntax error at EOF, expected {expected}"),
            TextLocation::new_just_line(tokens.last_known_line()),
        )
    } else {
        (
            format!(
                "Syntax error at token '{}' (line {}), expected {expected}",
                token.kind.value_text(),
                token.line()
            ),
            token.location,
        )
    };

    let mut error = CompilerError::new_syntax_error(msg, location);
    error.new_metadata_entry(ErrorMetaDataKey::CompilationStage, "Parsing");
    error.new_metadata_entry(ErrorMetaDataKey::ExpectedToken, expected);
    error.new_metadata_entry(ErrorMetaDataKey::FoundToken, token.kind.name());
    error
}
