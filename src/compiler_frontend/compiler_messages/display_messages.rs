use crate::compiler_frontend::compiler_errors::{
    CompilerError, CompilerMessages, ErrorType, error_type_to_str,
};
use crate::compiler_frontend::compiler_warnings::{CompilerWarning, print_formatted_warning};
use crate::settings::MessageFormat;
use saying::say;
use serde_json::{Value, json};

pub fn print_compiler_messages(messages: CompilerMessages, source: &str, format: MessageFormat) {
    if format == MessageFormat::Json {
        println!("{}", messages_to_json(&messages));
        return;
    }

    for err in messages.errors {
        print_formatted_error(err, source);
    }

    for warning in messages.warnings {
        print_formatted_warning(warning);
    }
}

pub fn print_formatted_error(e: CompilerError, source: &str) {
    let line_number = e.location.start_pos.line_number;

    match e.error_type {
        ErrorType::Lexical => {
            say!(Red "Lexical");
        }

        ErrorType::Syntax => {
            say!("\n(╯°□°)╯  🔥🔥 ", Red "Syntax", " 🔥🔥  Σ(°△°;) ");
        }

        ErrorType::Rule => {
            say!(Red "Semantic");
        }

        ErrorType::IrLowering => {
            say!(Yellow "IR LOWERING - ", Dark Yellow "this function was not lowered");
        }

        ErrorType::IrText => {
            say!(Yellow "MALFORMED IR TEXT - ");
        }

        ErrorType::Codegen => {
            say!(Yellow "CODEGEN - ", Dark Yellow "this function was not emitted");
        }

        ErrorType::Config => {
            say!(Yellow "CONFIG FILE ISSUE - ");
            say!(Red e.msg);
            return;
        }

        ErrorType::Compiler => {
            say!(Yellow "COMPILER BUG - ");
            say!(Dark Yellow "compiler developer skill issue (not your fault)");
        }
    }

    // Line zero means the message has no source position (IR and backend messages)
    if line_number > 0 {
        say!(Dark Magenta "Line ", Bright {line_number});
    }

    say!(Red e.msg);

    if line_number <= 0 {
        return;
    }

    let line = source
        .lines()
        .nth((line_number - 1) as usize)
        .unwrap_or_default();

    println!("\n{line}");

    // spaces before the relevant part of the line
    print!(
        "{}",
        " ".repeat((e.location.start_pos.char_column - 1).max(0) as usize)
    );

    let length_of_underline =
        (e.location.end_pos.char_column - e.location.start_pos.char_column + 1).max(1) as usize;
    say!(Red { "^".repeat(length_of_underline) });
}

pub fn error_to_json(error: &CompilerError) -> Value {
    let mut metadata = error
        .metadata
        .iter()
        .map(|(key, value)| (key.as_str(), *value))
        .collect::<Vec<_>>();
    metadata.sort_unstable();

    let metadata: serde_json::Map<String, Value> = metadata
        .into_iter()
        .map(|(key, value)| (key.to_owned(), Value::from(value)))
        .collect();

    json!({
        "type": error_type_to_str(&error.error_type),
        "message": error.msg,
        "line": error.location.start_pos.line_number,
        "column": error.location.start_pos.char_column,
        "metadata": metadata,
    })
}

pub fn warning_to_json(warning: &CompilerWarning) -> Value {
    json!({
        "warning": warning.warning_kind.describe(),
        "message": warning.msg,
        "line": warning.location.start_pos.line_number,
    })
}

pub fn messages_to_json(messages: &CompilerMessages) -> Value {
    let errors: Vec<Value> = messages.errors.iter().map(error_to_json).collect();
    let warnings: Vec<Value> = messages.warnings.iter().map(warning_to_json).collect();

    json!({
        "errors": errors,
        "warnings": warnings,
    })
}
