//! x86-64 backend.
//!
//! Lowers an `IrModule` to GNU assembler source (AT&T syntax) for x86-64 Linux.
//! Instruction selection is a single accumulator stack machine: every value lives in `%eax`
//! when it is produced and gets pushed to the machine stack if another value is produced
//! before it is used. Operands are consumed in stack order, which is the order the IR builder
//! emits them in.
//!
//! Functions are emitted independently. A function that can't be emitted is left out of
//! the output with an error, and the rest of the module is still emitted.

mod slot_table;
mod x86_function;

#[cfg(test)]
mod tests;

pub use slot_table::SlotTable;

use crate::codegen_log;
use crate::compiler_frontend::compiler_errors::CompilerMessages;
use crate::compiler_frontend::ir::ir_nodes::IrModule;
use x86_function::FunctionEmitter;

/// Result of lowering an IR module to assembly.
#[derive(Debug, Clone, Default)]
pub struct AsmModule {
    /// Complete assembly source, ready for `as` or `cc`.
    pub source: String,

    /// Functions that made it into `source`, in module order.
    pub emitted_functions: Vec<String>,
}

pub fn lower_ir_to_x86_64(module: &IrModule) -> (AsmModule, CompilerMessages) {
    let mut messages = CompilerMessages::new();
    let mut asm = AsmModule::default();

    asm.source.push_str("\t.text\n");

    for function in &module.functions {
        let mut emitter = FunctionEmitter::new(function);

        match emitter.emit_function() {
            Ok(text) => {
                codegen_log!(format!(
                    "Emitted '{}' ({} IR instructions)",
                    function.name,
                    function.instructions.len()
                ));

                asm.source.push_str(&text);
                asm.emitted_functions.push(function.name.to_owned());
            }
            Err(e) => messages.errors.push(e),
        }

        messages.warnings.extend(emitter.take_warnings());
    }

    // The program doesn't need an executable stack
    asm.source
        .push_str("\t.section\t.note.GNU-stack,\"\",@progbits\n");

    (asm, messages)
}
