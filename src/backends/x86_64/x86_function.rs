use crate::backends::x86_64::slot_table::SlotTable;
use crate::codegen_log;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::compiler_warnings::{CompilerWarning, WarningKind};
use crate::compiler_frontend::ir::ir_nodes::{
    BinOp, Instruction, IrFunction, Operand, Predicate, ValueId,
};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::return_codegen_error;
use crate::settings::{MAX_REGISTER_ARGS, STACK_ALIGNMENT_BYTES};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write;

const PUSH_SIZE_BYTES: i32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Register {
    Eax, // Accumulator and return value
    Ecx, // Right hand operand
    Edi,
    Esi,
}

impl Register {
    fn name32(self) -> &'static str {
        match self {
            Register::Eax => "%eax",
            Register::Ecx => "%ecx",
            Register::Edi => "%edi",
            Register::Esi => "%esi",
        }
    }

    fn name64(self) -> &'static str {
        match self {
            Register::Eax => "%rax",
            Register::Ecx => "%rcx",
            Register::Edi => "%rdi",
            Register::Esi => "%rsi",
        }
    }
}

// System V passes the first integer arguments in these, in order
const ARGUMENT_REGISTERS: [Register; MAX_REGISTER_ARGS] = [Register::Edi, Register::Esi];

pub(crate) struct FunctionEmitter<'ir> {
    function: &'ir IrFunction,
    slots: SlotTable,
    out: String,

    // Value held in %eax that still has a use
    accumulator: Option<ValueId>,

    // Values pushed to the machine stack, the top is last
    spilled: Vec<ValueId>,

    // Values read by at least one instruction. Anything else is dropped as soon as it is produced.
    used_values: FxHashSet<ValueId>,

    // Incoming parameter registers are clobbered by the first call
    seen_call: bool,

    warnings: Vec<CompilerWarning>,
}

impl<'ir> FunctionEmitter<'ir> {
    pub(crate) fn new(function: &'ir IrFunction) -> Self {
        FunctionEmitter {
            function,
            slots: SlotTable::default(),
            out: String::new(),
            accumulator: None,
            spilled: Vec::new(),
            used_values: FxHashSet::default(),
            seen_call: false,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<CompilerWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Returns the assembly for the whole function, from its symbol directives to the last `ret`
    pub(crate) fn emit_function(&mut self) -> Result<String, CompilerError> {
        let function = self.function;

        if function.params.len() > MAX_REGISTER_ARGS {
            return_codegen_error!(
                format!(
                    "Function '{}' has {} parameters, only {MAX_REGISTER_ARGS} can be passed in registers",
                    function.name,
                    function.params.len()
                ),
                {
                    CompilationStage => "Codegen",
                    PrimarySuggestion => "Split the function so it takes at most two parameters",
                }
            )
        }

        self.slots = SlotTable::from_function(function)?;
        self.used_values = check_single_use(function)?;

        let name = &function.name;
        self.raw_line(&format!("\t.globl\t{name}"));
        self.raw_line(&format!("\t.type\t{name}, @function"));
        self.raw_line(&format!("{name}:"));

        self.emit_prologue();

        for instruction in &function.instructions {
            self.emit_instruction(instruction)?;
        }

        // Hand written IR can fall off the end of a function
        if !function.ends_with_return() {
            self.emit_epilogue();
        }

        self.raw_line(&format!("\t.size\t{name}, .-{name}"));

        Ok(std::mem::take(&mut self.out))
    }

    fn emit_prologue(&mut self) {
        self.line("pushq\t%rbp");
        self.line("movq\t%rsp, %rbp");

        let frame_size = self.slots.frame_size();
        if frame_size > 0 {
            self.line(&format!("subq\t${frame_size}, %rsp"));
        }
    }

    fn emit_epilogue(&mut self) {
        self.line("movq\t%rbp, %rsp");
        self.line("popq\t%rbp");
        self.line("ret");
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> Result<(), CompilerError> {
        match instruction {
            // Already laid out by the slot table
            Instruction::Alloca { .. } => {}

            Instruction::Store { value, slot } => {
                let offset = self.slot_offset(slot)?;

                match value {
                    Operand::Literal(literal) => {
                        self.line(&format!("movl\t${literal}, {offset}(%rbp)"));
                    }
                    Operand::Param(index) => {
                        let source = self.param_register(*index)?;
                        self.line(&format!("movl\t{}, {offset}(%rbp)", source.name32()));
                    }
                    Operand::Value(_) => {
                        self.spill_unless_used(instruction);
                        self.load_operands(&[(value, Register::Eax)])?;
                        self.line(&format!("movl\t%eax, {offset}(%rbp)"));
                    }
                }
            }

            Instruction::Load { result, slot } => {
                let offset = self.slot_offset(slot)?;
                self.spill_unless_used(instruction);
                self.line(&format!("movl\t{offset}(%rbp), %eax"));
                self.produce(*result);
            }

            Instruction::BinOp {
                result,
                op,
                lhs,
                rhs,
            } => {
                self.spill_unless_used(instruction);
                self.load_operands(&[(lhs, Register::Eax), (rhs, Register::Ecx)])?;

                match op {
                    BinOp::Add => self.line("addl\t%ecx, %eax"),
                    BinOp::Sub => self.line("subl\t%ecx, %eax"),
                    BinOp::Mul => self.line("imull\t%ecx, %eax"),
                    BinOp::SDiv => {
                        // Sign extend eax into edx:eax first
                        self.line("cltd");
                        self.line("idivl\t%ecx");
                    }
                }

                self.produce(*result);
            }

            Instruction::Icmp {
                result,
                predicate,
                lhs,
                rhs,
            } => {
                self.spill_unless_used(instruction);

                let set_instruction = match predicate {
                    Predicate::Sgt => Some("setg"),
                    Predicate::Ne => Some("setne"),
                    _ => None,
                };

                match set_instruction {
                    Some(set_instruction) => {
                        if let Operand::Literal(literal) = rhs {
                            self.load_operands(&[(lhs, Register::Eax)])?;
                            self.line(&format!("cmpl\t${literal}, %eax"));
                        } else {
                            self.load_operands(&[(lhs, Register::Eax), (rhs, Register::Ecx)])?;
                            self.line("cmpl\t%ecx, %eax");
                        }

                        self.line(&format!("{set_instruction}\t%al"));
                        self.line("movzbl\t%al, %eax");
                    }

                    // Operands are still consumed so the spill stack stays balanced
                    None => {
                        self.load_operands(&[(lhs, Register::Eax), (rhs, Register::Ecx)])?;
                        self.unhandled(instruction);
                    }
                }

                self.produce(*result);
            }

            Instruction::Call {
                result,
                callee,
                args,
            } => {
                if args.len() > MAX_REGISTER_ARGS {
                    return_codegen_error!(
                        format!(
                            "Call to '{callee}' in '{}' passes {} arguments, only {MAX_REGISTER_ARGS} are supported",
                            self.function.name,
                            args.len()
                        ),
                        {
                            CompilationStage => "Codegen",
                        }
                    )
                }

                self.spill_unless_used(instruction);

                let operands: Vec<(&Operand, Register)> =
                    args.iter().zip(ARGUMENT_REGISTERS).collect();
                self.load_operands(&operands)?;

                // Anything still spilled is part of the frame at the call
                let depth = self.slots.frame_size() + self.spilled.len() as i32 * PUSH_SIZE_BYTES;
                let needs_padding = depth % STACK_ALIGNMENT_BYTES != 0;

                if needs_padding {
                    self.line(&format!("subq\t${PUSH_SIZE_BYTES}, %rsp"));
                }
                self.line(&format!("call\t{callee}"));
                if needs_padding {
                    self.line(&format!("addq\t${PUSH_SIZE_BYTES}, %rsp"));
                }

                self.seen_call = true;
                self.produce(*result);
            }

            Instruction::CondBranch {
                condition,
                then_label,
                else_label,
            } => {
                self.spill_unless_used(instruction);
                self.load_operands(&[(condition, Register::Eax)])?;
                self.check_nothing_in_flight(instruction)?;

                let then_label = self.asm_label(then_label);
                let else_label = self.asm_label(else_label);
                self.line("cmpl\t$0, %eax");
                self.line(&format!("je\t{else_label}"));
                self.line(&format!("jmp\t{then_label}"));
            }

            Instruction::Branch { label } => {
                self.check_nothing_in_flight(instruction)?;
                let label = self.asm_label(label);
                self.line(&format!("jmp\t{label}"));
            }

            Instruction::Label { name } => {
                self.check_nothing_in_flight(instruction)?;
                let label = self.asm_label(name);
                self.raw_line(&format!("{label}:"));
            }

            Instruction::Return { value } => {
                match value {
                    Some(Operand::Literal(literal)) => {
                        self.line(&format!("movl\t${literal}, %eax"));
                    }
                    // Already in the accumulator
                    Some(value) => self.load_operands(&[(value, Register::Eax)])?,
                    None => {}
                }

                self.emit_epilogue();

                // The epilogue discards anything left on the stack
                self.accumulator = None;
                self.spilled.clear();
            }
        }

        Ok(())
    }

    /// Moves each operand into its register.
    ///
    /// Values must be consumed in the order they were produced: the last value operand
    /// has to be the accumulator and the ones before it come off the spill stack, top first.
    fn load_operands(&mut self, operands: &[(&Operand, Register)]) -> Result<(), CompilerError> {
        let mut from_accumulator = None;
        let mut pops = Vec::new();
        let mut moves = Vec::new();
        let mut stack_top = self.spilled.len();

        for &(operand, target) in operands.iter().rev() {
            match operand {
                Operand::Value(id) => {
                    let is_next_unused = from_accumulator.is_none() && pops.is_empty();

                    if is_next_unused && self.accumulator == Some(*id) {
                        from_accumulator = Some(target);
                    } else if stack_top > 0 && self.spilled[stack_top - 1] == *id {
                        stack_top -= 1;
                        pops.push(target);
                    } else {
                        return_codegen_error!(
                            format!(
                                "Value {id} is used out of stack order in '{}'",
                                self.function.name
                            ),
                            {
                                CompilationStage => "Codegen",
                            }
                        )
                    }
                }

                Operand::Literal(literal) => {
                    moves.push(format!("movl\t${literal}, {}", target.name32()));
                }

                Operand::Param(index) => {
                    let source = self.param_register(*index)?;
                    if ARGUMENT_REGISTERS.contains(&target) {
                        return_codegen_error!(
                            format!(
                                "Parameter {} of '{}' can't be passed straight to a call",
                                self.function.operand_text(operand),
                                self.function.name
                            ),
                            {
                                CompilationStage => "Codegen",
                                PrimarySuggestion => "Store the parameter in a slot and load it",
                            }
                        )
                    }
                    moves.push(format!("movl\t{}, {}", source.name32(), target.name32()));
                }
            }
        }

        if let Some(target) = from_accumulator {
            if target != Register::Eax {
                self.line(&format!("movl\t%eax, {}", target.name32()));
            }
        }

        for target in pops {
            self.line(&format!("popq\t{}", target.name64()));
        }
        self.spilled.truncate(stack_top);

        // Collected last operand first
        for instruction in moves.iter().rev() {
            self.line(instruction);
        }

        self.accumulator = None;
        Ok(())
    }

    /// Pushes the accumulator if this instruction is about to overwrite a value it doesn't use
    fn spill_unless_used(&mut self, instruction: &Instruction) {
        let Some(id) = self.accumulator else {
            return;
        };

        let used_here = instruction
            .operands()
            .iter()
            .any(|operand| **operand == Operand::Value(id));

        if !used_here {
            self.line("pushq\t%rax");
            self.spilled.push(id);
            self.accumulator = None;
        }
    }

    fn produce(&mut self, result: ValueId) {
        self.accumulator = self.used_values.contains(&result).then_some(result);
    }

    // Values can't flow between blocks, the stack layout would differ per predecessor
    fn check_nothing_in_flight(&self, instruction: &Instruction) -> Result<(), CompilerError> {
        if self.spilled.is_empty() && self.accumulator.is_none() {
            return Ok(());
        }

        let live = self
            .spilled
            .iter()
            .chain(self.accumulator.iter())
            .map(ValueId::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        return_codegen_error!(
            format!(
                "Values {live} are still unused at '{}' in '{}'",
                self.function.instruction_text(instruction),
                self.function.name
            ),
            {
                CompilationStage => "Codegen",
            }
        )
    }

    fn param_register(&self, index: usize) -> Result<Register, CompilerError> {
        let Some(&register) = ARGUMENT_REGISTERS.get(index) else {
            return_codegen_error!(
                format!("'{}' has no parameter number {index}", self.function.name),
                {
                    CompilationStage => "Codegen",
                }
            )
        };

        if self.seen_call {
            return_codegen_error!(
                format!(
                    "Parameter {} of '{}' is read after a call has overwritten it",
                    self.function.operand_text(&Operand::Param(index)),
                    self.function.name
                ),
                {
                    CompilationStage => "Codegen",
                    PrimarySuggestion => "Copy parameters into their slots at the start of the function",
                }
            )
        }

        Ok(register)
    }

    fn slot_offset(&self, slot: &str) -> Result<i32, CompilerError> {
        match self.slots.offset(slot) {
            Some(offset) => Ok(offset),
            None => return_codegen_error!(
                format!(
                    "Slot '%{slot}' is used in '{}' but never allocated",
                    self.function.name
                ),
                {
                    CompilationStage => "Codegen",
                    SuggestedInsertion => "alloca",
                }
            ),
        }
    }

    fn unhandled(&mut self, instruction: &Instruction) {
        let text = self.function.instruction_text(instruction);
        codegen_log!(format!("No instruction sequence for '{text}'"));

        self.line(&format!("# unhandled IR instruction: {text}"));
        self.warnings.push(CompilerWarning::new(
            &format!("'{text}' has no x86-64 lowering, a comment was emitted in its place"),
            TextLocation::default(),
            WarningKind::UnhandledInstruction {
                function: self.function.name.to_owned(),
            },
        ));
    }

    // IR labels are unique per module, the function name keeps hand written IR from colliding
    fn asm_label(&self, label: &str) -> String {
        format!(".L{}.{label}", self.function.name)
    }

    fn line(&mut self, instruction: &str) {
        let _ = writeln!(self.out, "\t{instruction}");
    }

    fn raw_line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }
}

/// The accumulator can only hand each value over once.
/// Returns every value that is used.
fn check_single_use(function: &IrFunction) -> Result<FxHashSet<ValueId>, CompilerError> {
    let mut uses: FxHashMap<ValueId, usize> = FxHashMap::default();
    let mut defined: FxHashSet<ValueId> = FxHashSet::default();

    for instruction in &function.instructions {
        for operand in instruction.operands() {
            if let Operand::Value(id) = operand {
                *uses.entry(*id).or_insert(0) += 1;
            }
        }

        if let Some(result) = instruction.result() {
            if !defined.insert(result) {
                return_codegen_error!(
                    format!("Value {result} is written twice in '{}'", function.name),
                    {
                        CompilationStage => "Codegen",
                    }
                )
            }
        }
    }

    let mut reused: Vec<ValueId> = uses
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| *id)
        .collect();
    reused.sort_unstable();

    if let Some(id) = reused.first() {
        return_codegen_error!(
            format!("Value {id} is used more than once in '{}'", function.name),
            {
                CompilationStage => "Codegen",
                PrimarySuggestion => "Load the slot again for each use",
            }
        )
    }

    Ok(uses.into_keys().collect())
}
