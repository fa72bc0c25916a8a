use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use rustc_hash::FxHashMap;

// The final set of errors and warnings emitted from the compiler
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<CompilerWarning>,
}

impl CompilerMessages {
    pub fn new() -> Self {
        CompilerMessages::default()
    }

    pub fn from_error(error: CompilerError) -> Self {
        CompilerMessages {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    pub fn extend(&mut self, other: CompilerMessages) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn count_errors_of_type(&self, error_type: ErrorType) -> usize {
        self.errors
            .iter()
            .filter(|error| error.error_type == error_type)
            .count()
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ErrorMetaDataKey {
    CompilationStage,

    // Optional suggestions
    PrimarySuggestion,     // One-line fix or top-level idea
    AlternativeSuggestion, // Secondary alternative
    SuggestedInsertion,    // Text that could be inserted

    ExpectedToken,
    FoundToken,
}

impl ErrorMetaDataKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorMetaDataKey::CompilationStage => "CompilationStage",
            ErrorMetaDataKey::PrimarySuggestion => "PrimarySuggestion",
            ErrorMetaDataKey::AlternativeSuggestion => "AlternativeSuggestion",
            ErrorMetaDataKey::SuggestedInsertion => "SuggestedInsertion",
            ErrorMetaDataKey::ExpectedToken => "ExpectedToken",
            ErrorMetaDataKey::FoundToken => "FoundToken",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,
    pub location: TextLocation,
    pub error_type: ErrorType,

    // For creating more structured and detailed error messages
    pub metadata: FxHashMap<ErrorMetaDataKey, &'static str>,
}

impl CompilerError {
    pub fn new(
        msg: impl Into<String>,
        location: TextLocation,
        error_type: ErrorType,
    ) -> CompilerError {
        CompilerError {
            msg: msg.into(),
            location,
            error_type,
            metadata: FxHashMap::default(),
        }
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: &'static str) {
        self.metadata.insert(key, value);
    }

    /// Illegal characters and malformed literals. The tokenizer skips them and keeps going.
    pub fn new_lexical_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::Lexical)
    }

    pub fn new_syntax_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::Syntax)
    }

    pub fn new_rule_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::Rule)
    }

    /// Create a compiler error (internal bug, not user's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, TextLocation::default(), ErrorType::Compiler)
    }

    pub fn line(&self) -> i32 {
        self.location.start_pos.line_number
    }
}

// Adds more information to the CompilerError
// So it knows what stage produced it and how fatal it is
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ErrorType {
    Lexical,    // Recovered by skipping
    Syntax,     // Aborts the whole run
    Rule,       // Semantic diagnostic, advisory only
    IrLowering, // Fatal to the enclosing function
    IrText,     // Serialized IR that can't be read back
    Codegen,    // Fatal to the function being emitted
    Config,
    Compiler,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Lexical => "Lexical Error",
        ErrorType::Syntax => "Syntax Error",
        ErrorType::Rule => "Semantic Error",
        ErrorType::IrLowering => "IR Lowering Error",
        ErrorType::IrText => "Malformed IR",
        ErrorType::Codegen => "Codegen Error",
        ErrorType::Config => "Malformed Config",
        ErrorType::Compiler => "Compiler Bug",
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __compiler_error_value {
    ($error_type:ident, $msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        $crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $loc,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::$error_type,
            metadata: {
                #[allow(unused_mut)]
                let mut map = rustc_hash::FxHashMap::default();
                $(
                    map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value);
                )*
                map
            },
        }
    };
}

/// Builds a semantic rule violation without returning it.
#[macro_export]
macro_rules! rule_error {
    ($msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        $crate::__compiler_error_value!(Rule, $msg, $loc, { $( $key => $value ),* })
    };
    ($msg:expr, $loc:expr) => {
        $crate::__compiler_error_value!(Rule, $msg, $loc, {})
    };
}

/// Returns a new CompilerError for a failure while lowering the AST to IR.
/// Only the enclosing function is abandoned.
#[macro_export]
macro_rules! return_lowering_error {
    ($msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::__compiler_error_value!(IrLowering, $msg, $loc, { $( $key => $value ),* }))
    };
    ($msg:expr, $loc:expr) => {
        return Err($crate::__compiler_error_value!(IrLowering, $msg, $loc, {}))
    };
}

/// Returns a new CompilerError for serialized IR that doesn't follow the line grammar.
#[macro_export]
macro_rules! return_ir_text_error {
    ($msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::__compiler_error_value!(IrText, $msg, $loc, { $( $key => $value ),* }))
    };
    ($msg:expr, $loc:expr) => {
        return Err($crate::__compiler_error_value!(IrText, $msg, $loc, {}))
    };
}

/// Returns a new CompilerError from the instruction selector.
/// IR has no source positions, so the location is always the default.
#[macro_export]
macro_rules! return_codegen_error {
    ($msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::__compiler_error_value!(
            Codegen,
            $msg,
            $crate::compiler_frontend::tokenizer::tokens::TextLocation::default(),
            { $( $key => $value ),* }
        ))
    };
    ($msg:expr) => {
        return Err($crate::__compiler_error_value!(
            Codegen,
            $msg,
            $crate::compiler_frontend::tokenizer::tokens::TextLocation::default(),
            {}
        ))
    };
}

/// Returns a new CompilerError for a malformed config.
#[macro_export]
macro_rules! return_config_error {
    ($msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::__compiler_error_value!(Config, $msg, $loc, { $( $key => $value ),* }))
    };
    ($msg:expr, $loc:expr) => {
        return Err($crate::__compiler_error_value!(Config, $msg, $loc, {}))
    };
}

/// Returns a new CompilerError for internal compiler bugs.
#[macro_export]
macro_rules! return_compiler_error {
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::compiler_error(
            format!($fmt, $($arg),+),
        ));
    }};
    ($msg:expr) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::compiler_error($msg));
    }};
}
