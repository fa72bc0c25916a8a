use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorType};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use saying::say;

#[derive(Clone, Debug)]
pub struct CompilerWarning {
    pub msg: String,
    pub location: TextLocation,
    pub warning_kind: WarningKind,
}

impl CompilerWarning {
    pub fn new(msg: &str, location: TextLocation, warning_kind: WarningKind) -> CompilerWarning {
        CompilerWarning {
            msg: msg.to_owned(),
            location,
            warning_kind,
        }
    }

    /// Used when warnings are configured to be treated as errors
    pub fn into_error(self) -> CompilerError {
        let error_type = match self.warning_kind {
            WarningKind::UnhandledInstruction { .. } => ErrorType::Codegen,
        };

        CompilerError::new(
            format!("{} ({})", self.warning_kind.describe(), self.msg),
            self.location,
            error_type,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningKind {
    // The backend has no instruction sequence for this IR instruction.
    // A comment was emitted in its place.
    UnhandledInstruction { function: String },
}

impl WarningKind {
    pub fn describe(&self) -> String {
        match self {
            WarningKind::UnhandledInstruction { function } => {
                format!("Unhandled IR instruction in '{function}'")
            }
        }
    }
}

pub fn print_formatted_warning(w: CompilerWarning) {
    say!(Yellow "WARNING: ", w.warning_kind.describe());
    say!(w.msg);
}
