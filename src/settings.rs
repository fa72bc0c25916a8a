use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::return_config_error;
use serde::Deserialize;

pub const IMPLICIT_START_FUNC_NAME: &str = "main";
pub const INT_TYPE_NAME: &str = "i32";

// Every slot is 8 bytes even though values are 4 bytes wide.
// Offsets stay 8-byte aligned below the frame base.
pub const SLOT_SIZE_BYTES: i32 = 8;
pub const STACK_ALIGNMENT_BYTES: i32 = 16;

// Only edi and esi are used for passing arguments
pub const MAX_REGISTER_ARGS: usize = 2;

// Parentheses, argument lists and blocks nested deeper than this are a syntax error.
// Every later stage walks the tree recursively.
pub const MAX_NESTING_DEPTH: usize = 256;

pub const THEN_LABEL_PREFIX: &str = "then";
pub const ELSE_LABEL_PREFIX: &str = "else";
pub const CONTINUATION_LABEL_PREFIX: &str = "ifcont";

// This is a guess about how much should be initially allocated for the token and node vecs.
// Just a heuristic from small test programs.
pub const SRC_TO_TOKEN_RATIO: usize = 4; // About 1/4 source bytes to tokens observed
pub const TOKEN_TO_NODE_RATIO: usize = 6;
pub const MINIMUM_LIKELY_SLOTS: usize = 4;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings for a single compilation.
/// Usually parsed from a `minicc.toml` by whatever driver embeds the compiler.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name given to the implicit function that holds the top-level statements
    pub entry_function: String,

    /// Semantic diagnostics are advisory, so this can be switched off entirely
    pub semantic_analysis: bool,

    /// Run the semantic analyzer and the IR generator at the same time
    pub parallel_analysis: bool,

    pub message_format: MessageFormat,

    /// Promote backend gaps (unhandled IR instructions) to codegen errors
    pub warnings_as_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            entry_function: String::from(IMPLICIT_START_FUNC_NAME),
            semantic_analysis: true,
            parallel_analysis: true,
            message_format: MessageFormat::Pretty,
            warnings_as_errors: false,
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self, CompilerError> {
        let config: Config = match toml::from_str(source) {
            Ok(config) => config,
            Err(e) => {
                let line = e
                    .span()
                    .and_then(|span| source.get(..span.start))
                    .map(|before| before.matches('\n').count() + 1)
                    .unwrap_or(0);

                return_config_error!(
                    format!("Malformed config: {}", e.message()),
                    TextLocation::new_just_line(line as i32),
                    {
                        CompilationStage => "Config",
                    }
                )
            }
        };

        if !is_valid_function_name(&config.entry_function) {
            return_config_error!(
                format!(
                    "'{}' can't be used as the entry function name",
                    config.entry_function
                ),
                TextLocation::default(),
                {
                    CompilationStage => "Config",
                    PrimarySuggestion => "Use a plain identifier such as 'main'",
                }
            )
        }

        Ok(config)
    }
}

fn is_valid_function_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}
