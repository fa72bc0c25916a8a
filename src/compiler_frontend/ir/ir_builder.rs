//! Lowers the AST into an `IrModule`.
//!
//! Top-level statements become the body of the implicit entry function.
//! Each `function` declaration becomes its own `IrFunction`, wherever it appears.
//!
//! A lowering error abandons only the function it happened in. The error is collected,
//! the function is left out of the module, and every other function still lowers.

use crate::compiler_frontend::ast::ast_nodes::{
    Ast, BinaryOperator, Block, Expression, ExpressionKind, FunctionDecl, Initializer,
    NumberLiteral, Statement, StatementKind,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::ir::ir_nodes::{
    BinOp, Instruction, IrFunction, IrModule, Operand, Predicate, ValueId,
};
use crate::compiler_frontend::scope::ScopeStack;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::settings::{
    CONTINUATION_LABEL_PREFIX, ELSE_LABEL_PREFIX, MINIMUM_LIKELY_SLOTS, THEN_LABEL_PREFIX,
};
use crate::{ir_log, return_compiler_error, return_lowering_error};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

pub fn build_module(ast: &Ast, entry_function: &str) -> (IrModule, Vec<CompilerError>) {
    let mut builder = IrBuilder::new(entry_function);
    builder.lower_program(ast);

    let functions = builder.functions.into_iter().flatten().collect();
    (IrModule { functions }, builder.errors)
}

struct IrBuilder<'a> {
    entry_function: &'a str,

    // Every function seen so far and its parameter count
    declared: FxHashMap<String, usize>,

    // Reserved in declaration order, filled in once a function lowers cleanly
    functions: Vec<Option<IrFunction>>,

    errors: Vec<CompilerError>,

    // Shared by the whole module so no two ifs share a label
    next_if_id: usize,
}

/// Per-function lowering state
struct FunctionContext {
    function: IrFunction,

    // Variable name to slot name
    scopes: ScopeStack<String>,

    // Slot names for the declarations still to be lowered, in traversal order
    pending_slots: VecDeque<String>,

    next_value: u32,
}

impl FunctionContext {
    fn new_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    fn emit(&mut self, instruction: Instruction) {
        self.function.instructions.push(instruction);
    }
}

impl<'a> IrBuilder<'a> {
    fn new(entry_function: &'a str) -> Self {
        IrBuilder {
            entry_function,
            declared: FxHashMap::default(),
            functions: Vec::new(),
            errors: Vec::new(),
            next_if_id: 0,
        }
    }

    fn lower_program(&mut self, ast: &Ast) {
        // The entry function is always first in the module
        let entry_index = self.reserve_function();
        let mut ctx = self.new_context(self.entry_function, &[], &ast.statements);

        let mut entry_failed = false;

        for statement in &ast.statements {
            // Function declarations lower on their own even if the entry function has failed
            if let StatementKind::Function(function) = &statement.kind {
                self.lower_function(function, statement.location);
                continue;
            }

            if entry_failed {
                continue;
            }

            if let Err(e) = self.lower_statement(&mut ctx, statement) {
                self.errors.push(e);
                entry_failed = true;
            }
        }

        if !entry_failed {
            self.finish_function(ctx, entry_index);
        }
    }

    fn reserve_function(&mut self) -> usize {
        self.functions.push(None);
        self.functions.len() - 1
    }

    fn finish_function(&mut self, mut ctx: FunctionContext, index: usize) {
        if !ctx.function.ends_with_return() {
            ctx.emit(Instruction::Return {
                value: Some(Operand::Literal(0)),
            });
        }

        ir_log!(format!(
            "Lowered '{}' into {} instructions",
            ctx.function.name,
            ctx.function.instructions.len()
        ));

        self.functions[index] = Some(ctx.function);
    }

    /// Creates the function with a slot for every parameter and declaration already allocated,
    /// then copies each parameter into its slot.
    fn new_context(&self, name: &str, params: &[String], body: &[Statement]) -> FunctionContext {
        let mut slot_names = SlotNamer::default();
        let mut scopes = ScopeStack::new();
        let mut function = IrFunction::new(name, params.to_vec());

        let param_slots: Vec<String> = params
            .iter()
            .map(|param| {
                let slot = slot_names.fresh(param);
                scopes.redeclare(param, slot.clone());
                slot
            })
            .collect();

        let mut pending_slots = VecDeque::with_capacity(MINIMUM_LIKELY_SLOTS);
        collect_declarations(body, &mut slot_names, &mut pending_slots);

        for slot in param_slots.iter().chain(pending_slots.iter()) {
            function
                .instructions
                .push(Instruction::Alloca { slot: slot.clone() });
        }

        for (index, slot) in param_slots.into_iter().enumerate() {
            function.instructions.push(Instruction::Store {
                value: Operand::Param(index),
                slot,
            });
        }

        FunctionContext {
            function,
            scopes,
            pending_slots,
            next_value: 0,
        }
    }

    fn lower_function(&mut self, function: &FunctionDecl, location: TextLocation) {
        if function.name == self.entry_function {
            self.errors.push(lowering_error(
                format!(
                    "Function '{}' has the same name as the implicit entry function",
                    function.name
                ),
                location,
                "Rename the function",
            ));
            return;
        }

        if self.declared.contains_key(&function.name) {
            self.errors.push(lowering_error(
                format!("Function '{}' is already declared", function.name),
                location,
                "Rename one of the functions",
            ));
            return;
        }

        // Incoming values are spelled by parameter name in IR text
        for (index, param) in function.params.iter().enumerate() {
            if function.params[..index].iter().any(|p| p.name == param.name) {
                self.errors.push(lowering_error(
                    format!(
                        "Parameter '{}' is declared more than once in '{}'",
                        param.name, function.name
                    ),
                    param.location,
                    "Give each parameter its own name",
                ));
                return;
            }
        }

        // Registered before the body so it can call itself
        self.declared
            .insert(function.name.to_owned(), function.params.len());

        let index = self.reserve_function();
        let params: Vec<String> = function.params.iter().map(|p| p.name.to_owned()).collect();
        let mut ctx = self.new_context(&function.name, &params, &function.body.statements);

        match self.lower_statements(&mut ctx, &function.body.statements) {
            Ok(()) => self.finish_function(ctx, index),
            Err(e) => self.errors.push(e),
        }
    }

    fn lower_statements(
        &mut self,
        ctx: &mut FunctionContext,
        statements: &[Statement],
    ) -> Result<(), CompilerError> {
        for statement in statements {
            self.lower_statement(ctx, statement)?;
        }
        Ok(())
    }

    fn lower_block(&mut self, ctx: &mut FunctionContext, block: &Block) -> Result<(), CompilerError> {
        ctx.scopes.push_frame();
        let result = self.lower_statements(ctx, &block.statements);
        ctx.scopes.pop_frame();
        result
    }

    fn lower_statement(
        &mut self,
        ctx: &mut FunctionContext,
        statement: &Statement,
    ) -> Result<(), CompilerError> {
        match &statement.kind {
            StatementKind::Declaration(declaration) => {
                let Some(slot) = ctx.pending_slots.pop_front() else {
                    return_compiler_error!(
                        "No slot was allocated for the declaration of '{}' in '{}'",
                        declaration.name,
                        ctx.function.name
                    )
                };

                // Bound before the initializer is lowered, like the analyzer does
                ctx.scopes.redeclare(&declaration.name, slot.clone());

                if let Initializer::Init(value) = &declaration.initializer {
                    let value = self.lower_expression(ctx, value)?;
                    ctx.emit(Instruction::Store { value, slot });
                }
            }

            StatementKind::Assignment { target, value } => {
                let Some(slot) = ctx.scopes.lookup(&target.name).cloned() else {
                    return_lowering_error!(
                        format!("Variable '{}' is not declared", target.name),
                        target.location,
                        {
                            CompilationStage => "IR Generation",
                            PrimarySuggestion => "Declare the variable with 'int' first",
                        }
                    )
                };

                let value = self.lower_expression(ctx, value)?;
                ctx.emit(Instruction::Store { value, slot });
            }

            StatementKind::Expression(value) => {
                self.lower_expression(ctx, value)?;
            }

            StatementKind::Return(value) => {
                let value = self.lower_expression(ctx, value)?;
                ctx.emit(Instruction::Return { value: Some(value) });
            }

            StatementKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let condition = self.lower_expression(ctx, condition)?;
                let truth = ctx.new_value();
                ctx.emit(Instruction::Icmp {
                    result: truth,
                    predicate: Predicate::Ne,
                    lhs: condition,
                    rhs: Operand::Literal(0),
                });

                let id = self.next_if_id;
                self.next_if_id += 1;
                let then_label = format!("{THEN_LABEL_PREFIX}.{id}");
                let else_label = format!("{ELSE_LABEL_PREFIX}.{id}");
                let continuation = format!("{CONTINUATION_LABEL_PREFIX}.{id}");

                ctx.emit(Instruction::CondBranch {
                    condition: Operand::Value(truth),
                    then_label: then_label.clone(),
                    else_label: else_label.clone(),
                });

                ctx.emit(Instruction::Label { name: then_label });
                self.lower_block(ctx, then_block)?;
                if !ctx.function.ends_with_return() {
                    ctx.emit(Instruction::Branch {
                        label: continuation.clone(),
                    });
                }

                ctx.emit(Instruction::Label { name: else_label });
                if let Some(else_block) = else_block {
                    self.lower_block(ctx, else_block)?;
                }
                if !ctx.function.ends_with_return() {
                    ctx.emit(Instruction::Branch {
                        label: continuation.clone(),
                    });
                }

                ctx.emit(Instruction::Label { name: continuation });
            }

            // Nested functions are separate functions with their own slots
            StatementKind::Function(function) => {
                self.lower_function(function, statement.location);
            }
        }

        Ok(())
    }

    fn lower_expression(
        &mut self,
        ctx: &mut FunctionContext,
        expression: &Expression,
    ) -> Result<Operand, CompilerError> {
        match &expression.kind {
            ExpressionKind::Number(NumberLiteral::Int(value)) => {
                if i32::try_from(*value).is_err() {
                    return_lowering_error!(
                        format!("Integer literal {value} does not fit in 32 bits"),
                        expression.location,
                        {
                            CompilationStage => "IR Generation",
                        }
                    )
                }
                Ok(Operand::Literal(*value))
            }

            ExpressionKind::Number(NumberLiteral::Float(value)) => {
                return_lowering_error!(
                    format!("Float literal {value:?} is not supported, only integers are"),
                    expression.location,
                    {
                        CompilationStage => "IR Generation",
                        PrimarySuggestion => "Use an integer literal",
                    }
                )
            }

            ExpressionKind::Identifier(name) => {
                let Some(slot) = ctx.scopes.lookup(name).cloned() else {
                    return_lowering_error!(
                        format!("Variable '{name}' is not declared"),
                        expression.location,
                        {
                            CompilationStage => "IR Generation",
                        }
                    )
                };

                let result = ctx.new_value();
                ctx.emit(Instruction::Load { result, slot });
                Ok(Operand::Value(result))
            }

            ExpressionKind::BinaryOp { op, lhs, rhs } => {
                let lhs = self.lower_expression(ctx, lhs)?;
                let rhs = self.lower_expression(ctx, rhs)?;
                let result = ctx.new_value();

                let instruction = match op {
                    BinaryOperator::Add => binop(result, BinOp::Add, lhs, rhs),
                    BinaryOperator::Subtract => binop(result, BinOp::Sub, lhs, rhs),
                    BinaryOperator::Multiply => binop(result, BinOp::Mul, lhs, rhs),
                    BinaryOperator::Divide => binop(result, BinOp::SDiv, lhs, rhs),

                    // Comparison results are already 0 or 1 at integer width
                    BinaryOperator::GreaterThan => Instruction::Icmp {
                        result,
                        predicate: Predicate::Sgt,
                        lhs,
                        rhs,
                    },
                };

                ctx.emit(instruction);
                Ok(Operand::Value(result))
            }

            ExpressionKind::FunctionCall { name, args } => {
                let Some(&arity) = self.declared.get(name) else {
                    return_lowering_error!(
                        format!("Function '{name}' is not declared"),
                        expression.location,
                        {
                            CompilationStage => "IR Generation",
                            PrimarySuggestion => "Declare the function before calling it",
                        }
                    )
                };

                if arity != args.len() {
                    return_lowering_error!(
                        format!(
                            "Function '{name}' takes {arity} arguments but was called with {}",
                            args.len()
                        ),
                        expression.location,
                        {
                            CompilationStage => "IR Generation",
                        }
                    )
                }

                let mut operands = Vec::with_capacity(args.len());
                for arg in args {
                    operands.push(self.lower_expression(ctx, arg)?);
                }

                let result = ctx.new_value();
                ctx.emit(Instruction::Call {
                    result,
                    callee: name.to_owned(),
                    args: operands,
                });
                Ok(Operand::Value(result))
            }
        }
    }
}

fn binop(result: ValueId, op: BinOp, lhs: Operand, rhs: Operand) -> Instruction {
    Instruction::BinOp {
        result,
        op,
        lhs,
        rhs,
    }
}

fn lowering_error(msg: String, location: TextLocation, suggestion: &'static str) -> CompilerError {
    crate::__compiler_error_value!(IrLowering, msg, location, {
        CompilationStage => "IR Generation",
        PrimarySuggestion => suggestion,
    })
}

/// Hands out one slot name per variable. Repeats of a name get a numbered suffix.
#[derive(Default)]
struct SlotNamer {
    seen: FxHashMap<String, usize>,
}

impl SlotNamer {
    fn fresh(&mut self, name: &str) -> String {
        let count = self.seen.entry(name.to_owned()).or_insert(0);
        let slot = match *count {
            0 => name.to_owned(),
            n => format!("{name}.{n}"),
        };
        *count += 1;
        slot
    }
}

// Walks the body in the same order lowering does, skipping nested function bodies
fn collect_declarations(
    statements: &[Statement],
    slot_names: &mut SlotNamer,
    slots: &mut VecDeque<String>,
) {
    for statement in statements {
        match &statement.kind {
            StatementKind::Declaration(declaration) => {
                slots.push_back(slot_names.fresh(&declaration.name));
            }
            StatementKind::If {
                then_block,
                else_block,
                ..
            } => {
                collect_declarations(&then_block.statements, slot_names, slots);
                if let Some(else_block) = else_block {
                    collect_declarations(&else_block.statements, slot_names, slots);
                }
            }
            _ => {}
        }
    }
}
