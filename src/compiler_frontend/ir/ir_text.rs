//! Textual IR, one instruction per line.
//!
//! This is the form external tools read and write, so `parse_module` accepts
//! exactly what `Display` produces and a round trip loses nothing.
//!
//! ```text
//! define i32 @sum(i32 %x, i32 %y) {
//!   %x = alloca i32
//!   store i32 %x, i32* %x
//!   %0 = load i32, i32* %x
//!   ret i32 %0
//! }
//! ```
//!
//! In value position `%N` is a virtual register and `%name` is the incoming value of a parameter.
//! After `i32*` the name is always a slot.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::ir::ir_nodes::{
    BinOp, Instruction, IrFunction, IrModule, Operand, Predicate, ValueId,
};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::return_ir_text_error;
use crate::settings::INT_TYPE_NAME;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for ValueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "%{}", self.0)
    }
}

impl Display for IrModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

impl Display for IrFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let params = self
            .params
            .iter()
            .map(|param| format!("{INT_TYPE_NAME} %{param}"))
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "define {INT_TYPE_NAME} @{}({params}) {{", self.name)?;

        for instruction in &self.instructions {
            match instruction {
                Instruction::Label { name } => writeln!(f, "{name}:")?,
                _ => writeln!(f, "  {}", self.instruction_text(instruction))?,
            }
        }

        writeln!(f, "}}")
    }
}

impl IrFunction {
    /// Parameter operands need this function's parameter names to print
    pub fn operand_text(&self, operand: &Operand) -> String {
        match operand {
            Operand::Literal(value) => value.to_string(),
            Operand::Value(id) => id.to_string(),
            Operand::Param(index) => match self.params.get(*index) {
                Some(name) => format!("%{name}"),
                None => format!("%arg{index}"),
            },
        }
    }

    /// One instruction as a single line, without indentation
    pub fn instruction_text(&self, instruction: &Instruction) -> String {
        let ty = INT_TYPE_NAME;

        match instruction {
            Instruction::Alloca { slot } => format!("%{slot} = alloca {ty}"),

            Instruction::Store { value, slot } => {
                format!("store {ty} {}, {ty}* %{slot}", self.operand_text(value))
            }

            Instruction::Load { result, slot } => format!("{result} = load {ty}, {ty}* %{slot}"),

            Instruction::BinOp {
                result,
                op,
                lhs,
                rhs,
            } => format!(
                "{result} = {} {ty} {}, {}",
                op.mnemonic(),
                self.operand_text(lhs),
                self.operand_text(rhs)
            ),

            Instruction::Call {
                result,
                callee,
                args,
            } => {
                let args = args
                    .iter()
                    .map(|arg| format!("{ty} {}", self.operand_text(arg)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{result} = call {ty} @{callee}({args})")
            }

            Instruction::Icmp {
                result,
                predicate,
                lhs,
                rhs,
            } => format!(
                "{result} = icmp {} {ty} {}, {}",
                predicate.mnemonic(),
                self.operand_text(lhs),
                self.operand_text(rhs)
            ),

            Instruction::CondBranch {
                condition,
                then_label,
                else_label,
            } => format!(
                "br i1 {}, label %{then_label}, label %{else_label}",
                self.operand_text(condition)
            ),

            Instruction::Branch { label } => format!("br label %{label}"),

            Instruction::Label { name } => format!("{name}:"),

            Instruction::Return { value: Some(value) } => {
                format!("ret {ty} {}", self.operand_text(value))
            }
            Instruction::Return { value: None } => String::from("ret void"),
        }
    }
}

// ============================================================
// Parsing
// ============================================================

pub fn parse_module(text: &str) -> Result<IrModule, CompilerError> {
    let mut module = IrModule::default();
    let mut current: Option<IrFunction> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index as i32 + 1;
        let line = raw_line.trim();

        // Blank lines and comments
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line == "}" {
            match current.take() {
                Some(finished) => module.functions.push(finished),
                None => return_ir_text_error!(
                    "Closing '}' without a function definition",
                    TextLocation::new_just_line(line_number)
                ),
            }
            continue;
        }

        if let Some(function) = current.as_mut() {
            let instruction = parse_instruction(line, &function.params, line_number)?;
            function.instructions.push(instruction);
        } else {
            current = Some(parse_define(line, line_number)?);
        }
    }

    if let Some(unfinished) = current {
        return_ir_text_error!(
            format!("Function '@{}' is missing its closing '}}'", unfinished.name),
            TextLocation::new_just_line(text.lines().count() as i32),
            {
                CompilationStage => "IR Text",
                SuggestedInsertion => "}",
            }
        )
    }

    Ok(module)
}

// define i32 @name(i32 %a, i32 %b) {
fn parse_define(line: &str, line_number: i32) -> Result<IrFunction, CompilerError> {
    let Some(signature) = line
        .strip_prefix("define ")
        .and_then(|rest| rest.strip_prefix(INT_TYPE_NAME))
        .and_then(|rest| rest.trim_start().strip_prefix('@'))
        .and_then(|rest| rest.strip_suffix('{'))
        .map(str::trim_end)
    else {
        return_ir_text_error!(
            format!("Expected a function definition, found '{line}'"),
            TextLocation::new_just_line(line_number),
            {
                CompilationStage => "IR Text",
            }
        )
    };

    let (name, params) = split_call_syntax(signature, line_number)?;

    let mut param_names = Vec::new();
    for param in params {
        let Some(name) = param
            .strip_prefix(INT_TYPE_NAME)
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('%'))
        else {
            return_ir_text_error!(
                format!("Malformed parameter '{param}'"),
                TextLocation::new_just_line(line_number)
            )
        };

        param_names.push(name.to_owned());
    }

    Ok(IrFunction::new(name, param_names))
}

// `name(a, b)` into the name and the trimmed comma separated list
fn split_call_syntax(text: &str, line_number: i32) -> Result<(&str, Vec<&str>), CompilerError> {
    let Some((name, rest)) = text.split_once('(') else {
        return_ir_text_error!(
            format!("Expected '(' in '{text}'"),
            TextLocation::new_just_line(line_number)
        )
    };

    let Some(list) = rest.strip_suffix(')') else {
        return_ir_text_error!(
            format!("Expected ')' at the end of '{text}'"),
            TextLocation::new_just_line(line_number)
        )
    };

    let items = if list.trim().is_empty() {
        Vec::new()
    } else {
        list.split(',').map(str::trim).collect()
    };

    Ok((name.trim(), items))
}

fn parse_instruction(
    line: &str,
    params: &[String],
    line_number: i32,
) -> Result<Instruction, CompilerError> {
    let location = TextLocation::new_just_line(line_number);

    // Labels are a bare name followed by a colon
    if let Some(name) = line.strip_suffix(':') {
        if is_ir_name(name) {
            return Ok(Instruction::Label {
                name: name.to_owned(),
            });
        }
    }

    if let Some((lhs, rhs)) = line.split_once(" = ") {
        let lhs = lhs.trim();
        let rhs = rhs.trim();

        if rhs == format!("alloca {INT_TYPE_NAME}") {
            return Ok(Instruction::Alloca {
                slot: parse_slot_name(lhs, location)?,
            });
        }

        let result = parse_value_id(lhs, location)?;
        let (opcode, rest) = rhs.split_once(' ').unwrap_or((rhs, ""));

        return match opcode {
            "load" => {
                let slot = rest
                    .strip_prefix(INT_TYPE_NAME)
                    .and_then(|rest| rest.trim_start().strip_prefix(','))
                    .map(str::trim);
                let slot = parse_slot_operand(slot.unwrap_or(""), location)?;
                Ok(Instruction::Load { result, slot })
            }

            "call" => {
                let Some(call) = rest
                    .strip_prefix(INT_TYPE_NAME)
                    .and_then(|rest| rest.trim_start().strip_prefix('@'))
                else {
                    return_ir_text_error!(format!("Malformed call '{line}'"), location)
                };

                let (callee, raw_args) = split_call_syntax(call, line_number)?;
                let mut args = Vec::with_capacity(raw_args.len());
                for arg in raw_args {
                    args.push(parse_typed_operand(arg, params, location)?);
                }

                Ok(Instruction::Call {
                    result,
                    callee: callee.to_owned(),
                    args,
                })
            }

            "icmp" => {
                let (predicate_text, operands) = rest.split_once(' ').unwrap_or((rest, ""));
                let Some(predicate) = Predicate::from_mnemonic(predicate_text) else {
                    return_ir_text_error!(
                        format!("Unknown comparison '{predicate_text}'"),
                        location,
                        {
                            CompilationStage => "IR Text",
                            PrimarySuggestion => "Use one of eq, ne, sgt, sge, slt, sle",
                        }
                    )
                };

                let (lhs, rhs) = parse_operand_pair(operands, params, location)?;
                Ok(Instruction::Icmp {
                    result,
                    predicate,
                    lhs,
                    rhs,
                })
            }

            _ => {
                let Some(op) = BinOp::from_mnemonic(opcode) else {
                    return_ir_text_error!(format!("Unknown instruction '{opcode}'"), location)
                };

                let (lhs, rhs) = parse_operand_pair(rest, params, location)?;
                Ok(Instruction::BinOp {
                    result,
                    op,
                    lhs,
                    rhs,
                })
            }
        };
    }

    let (opcode, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match opcode {
        "store" => {
            let Some((value, slot)) = rest.split_once(',') else {
                return_ir_text_error!(format!("Malformed store '{line}'"), location)
            };

            Ok(Instruction::Store {
                value: parse_typed_operand(value.trim(), params, location)?,
                slot: parse_slot_operand(slot.trim(), location)?,
            })
        }

        "br" => {
            if let Some(label) = rest.strip_prefix("label ") {
                return Ok(Instruction::Branch {
                    label: parse_label_operand(label, location)?,
                });
            }

            let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
            let [condition, then_label, else_label] = parts.as_slice() else {
                return_ir_text_error!(format!("Malformed branch '{line}'"), location)
            };

            let Some(condition) = condition.strip_prefix("i1 ") else {
                return_ir_text_error!(
                    format!("Branch condition must be an i1 in '{line}'"),
                    location
                )
            };

            let (Some(then_label), Some(else_label)) = (
                then_label.strip_prefix("label "),
                else_label.strip_prefix("label "),
            ) else {
                return_ir_text_error!(format!("Malformed branch targets in '{line}'"), location)
            };

            Ok(Instruction::CondBranch {
                condition: parse_operand(condition.trim(), params, location)?,
                then_label: parse_label_operand(then_label, location)?,
                else_label: parse_label_operand(else_label, location)?,
            })
        }

        "ret" => {
            if rest == "void" {
                return Ok(Instruction::Return { value: None });
            }

            Ok(Instruction::Return {
                value: Some(parse_typed_operand(rest, params, location)?),
            })
        }

        _ => return_ir_text_error!(
            format!("Unknown instruction '{line}'"),
            location,
            {
                CompilationStage => "IR Text",
            }
        ),
    }
}

// `i32 %a, %b` or `i32 4, %b`
fn parse_operand_pair(
    text: &str,
    params: &[String],
    location: TextLocation,
) -> Result<(Operand, Operand), CompilerError> {
    let Some((lhs, rhs)) = text
        .strip_prefix(INT_TYPE_NAME)
        .and_then(|rest| rest.split_once(','))
    else {
        return_ir_text_error!(format!("Expected two operands in '{text}'"), location)
    };

    Ok((
        parse_operand(lhs.trim(), params, location)?,
        parse_operand(rhs.trim(), params, location)?,
    ))
}

fn parse_typed_operand(
    text: &str,
    params: &[String],
    location: TextLocation,
) -> Result<Operand, CompilerError> {
    match text.strip_prefix(INT_TYPE_NAME) {
        Some(rest) if rest.starts_with(' ') => parse_operand(rest.trim(), params, location),
        _ => return_ir_text_error!(
            format!("Expected an {INT_TYPE_NAME} operand, found '{text}'"),
            location
        ),
    }
}

fn parse_operand(
    text: &str,
    params: &[String],
    location: TextLocation,
) -> Result<Operand, CompilerError> {
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Operand::Literal(value));
    }

    let Some(name) = text.strip_prefix('%') else {
        return_ir_text_error!(format!("Malformed operand '{text}'"), location)
    };

    if !name.is_empty() && name.bytes().all(|byte| byte.is_ascii_digit()) {
        return parse_value_id(text, location).map(Operand::Value);
    }

    match params.iter().position(|param| param == name) {
        Some(index) => Ok(Operand::Param(index)),
        None => return_ir_text_error!(
            format!("'%{name}' is neither a value nor a parameter of this function"),
            location
        ),
    }
}

fn parse_value_id(text: &str, location: TextLocation) -> Result<ValueId, CompilerError> {
    match text.strip_prefix('%').map(str::parse::<u32>) {
        Some(Ok(id)) => Ok(ValueId(id)),
        _ => return_ir_text_error!(
            format!("Expected a numbered value such as '%0', found '{text}'"),
            location
        ),
    }
}

// `i32* %name`
fn parse_slot_operand(text: &str, location: TextLocation) -> Result<String, CompilerError> {
    match text.strip_prefix(INT_TYPE_NAME).and_then(|rest| rest.strip_prefix('*')) {
        Some(slot) => parse_slot_name(slot.trim(), location),
        None => return_ir_text_error!(
            format!("Expected a slot pointer, found '{text}'"),
            location
        ),
    }
}

fn parse_slot_name(text: &str, location: TextLocation) -> Result<String, CompilerError> {
    match text.strip_prefix('%') {
        Some(name) if is_ir_name(name) => Ok(name.to_owned()),
        _ => return_ir_text_error!(format!("Malformed slot name '{text}'"), location),
    }
}

fn parse_label_operand(text: &str, location: TextLocation) -> Result<String, CompilerError> {
    match text.trim().strip_prefix('%') {
        Some(name) if is_ir_name(name) => Ok(name.to_owned()),
        _ => return_ir_text_error!(format!("Malformed label '{text}'"), location),
    }
}

// Identifier characters plus '.' for the numbered suffixes on labels and shadowed slots
fn is_ir_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
        }
        _ => false,
    }
}
