use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CharPosition {
    pub line_number: i32,
    pub char_column: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TextLocation {
    pub start_pos: CharPosition,
    pub end_pos: CharPosition,
}

impl TextLocation {
    pub fn new(start: CharPosition, end: CharPosition) -> Self {
        Self {
            start_pos: start,
            end_pos: end,
        }
    }

    pub fn new_just_line(line: i32) -> Self {
        Self {
            start_pos: CharPosition {
                line_number: line,
                char_column: 0,
            },
            end_pos: CharPosition {
                line_number: line,
                char_column: 120, // Arbitrary number
            },
        }
    }

    pub fn line(&self) -> i32 {
        self.start_pos.line_number
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: TextLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: TextLocation) -> Self {
        Self { kind, location }
    }

    pub fn line(&self) -> i32 {
        self.location.start_pos.line_number
    }
}

// Shows up in the token trace as `<line>: <KIND>(<value>)`
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}({})",
            self.line(),
            self.kind.name(),
            self.kind.value_text()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Symbol(String),
    IntLiteral(i64),

    // Lexically accepted so the parser can point at them.
    // Nothing downstream supports floats.
    FloatLiteral(f64),

    // Operators
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
    Assign,
    Arrow,

    // Punctuation
    OpenParenthesis,
    CloseParenthesis,
    OpenCurly,
    CloseCurly,
    Semicolon,
    Comma,

    // Keywords
    If,
    Else,
    While, // Reserved, no loop statements yet
    For,   // Reserved, no loop statements yet
    Def,   // Reserved
    Function,
    Return,
    Int,

    Eof,
}

impl TokenKind {
    pub fn from_keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "def" => TokenKind::Def,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "int" => TokenKind::Int,
            _ => return None,
        };

        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Symbol(_) => "IDENTIFIER",
            TokenKind::IntLiteral(_) | TokenKind::FloatLiteral(_) => "NUMBER",
            TokenKind::Add => "PLUS",
            TokenKind::Subtract => "MINUS",
            TokenKind::Multiply => "TIMES",
            TokenKind::Divide => "DIVIDE",
            TokenKind::GreaterThan => "GT",
            TokenKind::Assign => "EQUALS",
            TokenKind::Arrow => "ARROW",
            TokenKind::OpenParenthesis => "LPAREN",
            TokenKind::CloseParenthesis => "RPAREN",
            TokenKind::OpenCurly => "LBRACE",
            TokenKind::CloseCurly => "RBRACE",
            TokenKind::Semicolon => "SEMI",
            TokenKind::Comma => "COMMA",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::For => "FOR",
            TokenKind::Def => "DEF",
            TokenKind::Function => "FUNCTION",
            TokenKind::Return => "RETURN",
            TokenKind::Int => "INT",
            TokenKind::Eof => "EOF",
        }
    }

    /// The text this token was lexed from, as used in the token trace and syntax errors
    pub fn value_text(&self) -> String {
        match self {
            TokenKind::Symbol(name) => name.to_owned(),
            TokenKind::IntLiteral(value) => value.to_string(),
            TokenKind::FloatLiteral(value) => format!("{value:?}"),
            TokenKind::Add => "+".into(),
            TokenKind::Subtract => "-".into(),
            TokenKind::Multiply => "*".into(),
            TokenKind::Divide => "/".into(),
            TokenKind::GreaterThan => ">".into(),
            TokenKind::Assign => "=".into(),
            TokenKind::Arrow => "->".into(),
            TokenKind::OpenParenthesis => "(".into(),
            TokenKind::CloseParenthesis => ")".into(),
            TokenKind::OpenCurly => "{".into(),
            TokenKind::CloseCurly => "}".into(),
            TokenKind::Semicolon => ";".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::If => "if".into(),
            TokenKind::Else => "else".into(),
            TokenKind::While => "while".into(),
            TokenKind::For => "for".into(),
            TokenKind::Def => "def".into(),
            TokenKind::Function => "function".into(),
            TokenKind::Return => "return".into(),
            TokenKind::Int => "int".into(),
            TokenKind::Eof => String::new(),
        }
    }
}

/// The token sequence for one source file, always terminated by `Eof`.
/// The parser walks it with `index`, so the same tokens can be parsed again after a reset.
#[derive(Clone, Debug)]
pub struct FileTokens {
    pub tokens: Vec<Token>,
    pub index: usize,
    pub length: usize,

    // How many parentheses, call argument lists and blocks the parser is inside
    pub nesting_depth: usize,
}

impl FileTokens {
    pub fn new(tokens: Vec<Token>) -> FileTokens {
        let length = tokens.len();
        FileTokens {
            tokens,
            index: 0,
            length,
            nesting_depth: 0,
        }
    }

    pub fn current_token(&self) -> &Token {
        // The Eof token is always last, so clamp to it
        let index = self.index.min(self.length.saturating_sub(1));
        &self.tokens[index]
    }

    pub fn current_token_kind(&self) -> &TokenKind {
        &self.current_token().kind
    }

    pub fn peek_next_kind(&self) -> &TokenKind {
        let index = (self.index + 1).min(self.length.saturating_sub(1));
        &self.tokens[index].kind
    }

    pub fn current_location(&self) -> TextLocation {
        self.current_token().location
    }

    /// Line of the last real token, for errors reported at the end of the input
    pub fn last_known_line(&self) -> i32 {
        self.tokens
            .iter()
            .rev()
            .find(|token| token.kind != TokenKind::Eof)
            .map(Token::line)
            .unwrap_or(1)
    }

    pub fn advance(&mut self) {
        if self.index < self.length {
            self.index += 1;
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.nesting_depth = 0;
    }

    pub fn is_finished(&self) -> bool {
        self.current_token_kind() == &TokenKind::Eof
    }
}

// The token trace, one token per line
impl fmt::Display for FileTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            if token.kind == TokenKind::Eof {
                break;
            }
            writeln!(f, "{token}")?;
        }
        Ok(())
    }
}

pub struct TokenStream<'a> {
    chars: Peekable<Chars<'a>>,
    pub position: CharPosition,
    pub start_position: CharPosition,
}

impl<'a> TokenStream<'a> {
    pub fn new(source_code: &'a str) -> Self {
        let start = CharPosition {
            line_number: 1,
            char_column: 0,
        };

        Self {
            chars: source_code.chars().peekable(),
            position: start,
            start_position: start,
        }
    }

    pub fn next(&mut self) -> Option<char> {
        let next = self.chars.next();

        if let Some(ch) = next {
            if ch == '\n' {
                self.position.line_number += 1;
                self.position.char_column = 0;
            } else {
                self.position.char_column += 1;
            }
        }

        next
    }

    pub fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Lookahead past the next character without consuming anything
    pub fn clone_chars(&self) -> Peekable<Chars<'a>> {
        self.chars.clone()
    }

    /// Marks the character just consumed as the start of the next token
    pub fn update_start_position(&mut self) {
        self.start_position = self.position;
    }

    pub fn new_location(&self) -> TextLocation {
        TextLocation::new(self.start_position, self.position)
    }
}
