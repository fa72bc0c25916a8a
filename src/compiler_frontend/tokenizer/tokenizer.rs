use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, Token, TokenKind, TokenStream};
use crate::{settings, token_log};

#[macro_export]
macro_rules! return_token {
    ($kind:expr, $stream:expr $(,)?) => {
        return Ok(Some(Token::new($kind, $stream.new_location())))
    };
}

/// Turns source text into tokens.
/// Never fails. Illegal characters are reported into `errors` and skipped.
pub fn tokenize(source_code: &str, errors: &mut Vec<CompilerError>) -> FileTokens {
    let initial_capacity = source_code.len() / settings::SRC_TO_TOKEN_RATIO;

    let mut tokens: Vec<Token> = Vec::with_capacity(initial_capacity);
    let mut stream = TokenStream::new(source_code);

    loop {
        let token = match get_token_kind(&mut stream) {
            Ok(Some(token)) => token,

            // Comments and trailing whitespace
            Ok(None) => continue,

            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        token_log!(#token);

        let finished = token.kind == TokenKind::Eof;
        tokens.push(token);

        if finished {
            break;
        }
    }

    FileTokens::new(tokens)
}

/// Returns the next token.
/// `Ok(None)` means something was consumed that produces no token (a comment).
pub fn get_token_kind(stream: &mut TokenStream) -> Result<Option<Token>, CompilerError> {
    let mut current_char = match stream.next() {
        Some(ch) => ch,
        None => {
            stream.update_start_position();
            return_token!(TokenKind::Eof, stream);
        }
    };

    // Whitespace
    while current_char.is_whitespace() {
        current_char = match stream.next() {
            Some(ch) => ch,
            None => {
                stream.update_start_position();
                return_token!(TokenKind::Eof, stream);
            }
        };
    }

    // To ignore leading whitespace for the next token position
    stream.update_start_position();

    match current_char {
        '+' => return_token!(TokenKind::Add, stream),
        '*' => return_token!(TokenKind::Multiply, stream),
        '>' => return_token!(TokenKind::GreaterThan, stream),
        '=' => return_token!(TokenKind::Assign, stream),
        '(' => return_token!(TokenKind::OpenParenthesis, stream),
        ')' => return_token!(TokenKind::CloseParenthesis, stream),
        '{' => return_token!(TokenKind::OpenCurly, stream),
        '}' => return_token!(TokenKind::CloseCurly, stream),
        ';' => return_token!(TokenKind::Semicolon, stream),
        ',' => return_token!(TokenKind::Comma, stream),

        '-' => {
            if stream.peek() == Some(&'>') {
                stream.next();
                return_token!(TokenKind::Arrow, stream);
            }
            return_token!(TokenKind::Subtract, stream);
        }

        '/' => match stream.peek().copied() {
            Some('/') => {
                skip_line_comment(stream);
                return Ok(None);
            }
            Some('*') => {
                stream.next();
                skip_block_comment(stream)?;
                return Ok(None);
            }
            _ => return_token!(TokenKind::Divide, stream),
        },

        _ => {}
    }

    if current_char.is_ascii_alphabetic() || current_char == '_' {
        return Ok(Some(keyword_or_symbol(current_char, stream)));
    }

    if current_char.is_ascii_digit() {
        return tokenize_number(current_char, stream).map(Some);
    }

    Err(CompilerError::new_lexical_error(
        format!(
            "Illegal character '{current_char}' at line {}",
            stream.start_position.line_number
        ),
        stream.new_location(),
    ))
}

// Identifiers are matched greedily, then checked against the reserved words
fn keyword_or_symbol(first_char: char, stream: &mut TokenStream) -> Token {
    let mut token_value = String::from(first_char);

    while let Some(&next_char) = stream.peek() {
        if !(next_char.is_ascii_alphanumeric() || next_char == '_') {
            break;
        }
        token_value.push(next_char);
        stream.next();
    }

    let kind = TokenKind::from_keyword(&token_value).unwrap_or(TokenKind::Symbol(token_value));
    Token::new(kind, stream.new_location())
}

fn tokenize_number(first_digit: char, stream: &mut TokenStream) -> Result<Token, CompilerError> {
    let mut token_value = String::from(first_digit);
    let mut is_float = false;

    while let Some(&next_char) = stream.peek() {
        if next_char.is_ascii_digit() {
            token_value.push(next_char);
            stream.next();
            continue;
        }

        // A decimal point only counts if a digit follows it
        if next_char == '.' && !is_float {
            let mut lookahead = stream.clone_chars();
            lookahead.next();
            if lookahead.next().is_some_and(|ch| ch.is_ascii_digit()) {
                is_float = true;
                token_value.push('.');
                stream.next();
                continue;
            }
        }

        break;
    }

    if is_float {
        // Only digits and one point, so this always parses
        let value = token_value.parse::<f64>().unwrap_or_default();
        return Ok(Token::new(
            TokenKind::FloatLiteral(value),
            stream.new_location(),
        ));
    }

    match token_value.parse::<i64>() {
        Ok(value) => Ok(Token::new(TokenKind::IntLiteral(value), stream.new_location())),
        Err(_) => Err(CompilerError::new_lexical_error(
            format!(
                "Integer literal '{token_value}' at line {} is too large",
                stream.start_position.line_number
            ),
            stream.new_location(),
        )),
    }
}

fn skip_line_comment(stream: &mut TokenStream) {
    while let Some(&ch) = stream.peek() {
        if ch == '\n' {
            break;
        }
        stream.next();
    }
}

// The stream counts the newlines inside the comment as it consumes them.
// An unterminated block comment still consumes the rest of the input, but is reported.
fn skip_block_comment(stream: &mut TokenStream) -> Result<(), CompilerError> {
    let opening = stream.new_location();

    while let Some(ch) = stream.next() {
        if ch == '*' && stream.peek() == Some(&'/') {
            stream.next();
            return Ok(());
        }
    }

    Err(CompilerError::new_lexical_error(
        format!(
            "Block comment starting at line {} is never closed",
            opening.line()
        ),
        opening,
    ))
}
