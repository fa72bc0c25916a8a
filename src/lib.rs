pub mod backends;
pub mod compiler_frontend;
pub mod settings;

use crate::backends::x86_64::{AsmModule, lower_ir_to_x86_64};
use crate::compiler_frontend::analysis::semantic::check_program;
use crate::compiler_frontend::ast::ast_nodes::Ast;
use crate::compiler_frontend::ast::parser::parse_program;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::display_messages::print_compiler_messages;
use crate::compiler_frontend::ir::ir_builder::build_module;
use crate::compiler_frontend::ir::ir_nodes::IrModule;
use crate::compiler_frontend::ir::ir_text::parse_module;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use crate::compiler_frontend::tokenizer::tokens::FileTokens;
pub use crate::settings::Config;
use std::time::Instant;

/// Every artifact of a successful run.
/// A run is successful as long as it parses, so `messages` may still hold errors
/// for functions that were left out of `ir` or `assembly`.
#[derive(Debug)]
pub struct CompilationResult {
    pub token_trace: String,
    pub ast_dump: String,
    pub ir: IrModule,
    pub ir_text: String,
    pub assembly: AsmModule,
    pub messages: CompilerMessages,
}

pub struct Compiler<'a> {
    pub(crate) config: &'a Config,
}

impl<'a> Compiler<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// -----------------------------
    /// TOKENIZER
    /// -----------------------------
    /// Never fails. Illegal characters and oversized literals are skipped
    /// and reported as lexical errors.
    pub fn source_to_tokens(&self, source_code: &str, errors: &mut Vec<CompilerError>) -> FileTokens {
        tokenize(source_code, errors)
    }

    /// -----------------------------
    /// AST CREATION
    /// -----------------------------
    /// Stops at the first malformed token sequence. There is no partial AST.
    pub fn tokens_to_ast(&self, tokens: &mut FileTokens) -> Result<Ast, CompilerError> {
        tokens.reset();
        parse_program(tokens)
    }

    /// -----------------------------
    /// SEMANTIC ANALYSIS
    /// -----------------------------
    /// Advisory only. Every diagnostic is returned and none of them block IR generation.
    pub fn check_semantics(&self, ast: &Ast) -> Vec<CompilerError> {
        if !self.config.semantic_analysis {
            return Vec::new();
        }

        check_program(ast)
    }

    /// -----------------------------
    /// IR GENERATION
    /// -----------------------------
    /// Functions that fail to lower are left out of the module, their errors are returned.
    pub fn generate_ir(&self, ast: &Ast) -> (IrModule, Vec<CompilerError>) {
        build_module(ast, &self.config.entry_function)
    }

    /// -----------------------------
    /// ASSEMBLY GENERATION
    /// -----------------------------
    pub fn ir_to_assembly(&self, module: &IrModule) -> (AsmModule, CompilerMessages) {
        let (asm, mut messages) = lower_ir_to_x86_64(module);

        if self.config.warnings_as_errors {
            let warnings = std::mem::take(&mut messages.warnings);
            messages
                .errors
                .extend(warnings.into_iter().map(|warning| warning.into_error()));
        }

        (asm, messages)
    }

    /// Reads IR text written by another tool (or by `IrModule`'s `Display`) and emits assembly for it
    pub fn ir_text_to_assembly(
        &self,
        ir_text: &str,
    ) -> Result<(AsmModule, CompilerMessages), CompilerError> {
        let module = parse_module(ir_text)?;
        Ok(self.ir_to_assembly(&module))
    }

    /// Prints errors and warnings in the configured message format
    pub fn report_messages(&self, messages: CompilerMessages, source_code: &str) {
        print_compiler_messages(messages, source_code, self.config.message_format);
    }

    /// Runs every stage in order.
    /// Only a syntax error fails the whole run. Everything else is collected into the result's messages.
    pub fn compile(&self, source_code: &str) -> Result<CompilationResult, CompilerMessages> {
        let mut messages = CompilerMessages::new();

        // ----------------------------------
        //         Token generation
        // ----------------------------------
        let time = Instant::now();
        let mut tokens = self.source_to_tokens(source_code, &mut messages.errors);
        let token_trace = tokens.to_string();
        crate::timer_log!(time, "Tokenized in: ");

        // ----------------------------------
        //          AST generation
        // ----------------------------------
        let time = Instant::now();
        let ast = match self.tokens_to_ast(&mut tokens) {
            Ok(ast) => ast,
            Err(e) => {
                messages.errors.push(e);
                return Err(messages);
            }
        };
        let ast_dump = ast.to_string();
        crate::timer_log!(time, "AST created in: ");

        // ----------------------------------
        //   Semantic analysis + IR generation
        // ----------------------------------
        // Both only read the AST, so they can run side by side
        let time = Instant::now();
        let (semantic_errors, (ir, lowering_errors)) = if self.config.parallel_analysis {
            rayon::join(|| self.check_semantics(&ast), || self.generate_ir(&ast))
        } else {
            (self.check_semantics(&ast), self.generate_ir(&ast))
        };

        messages.errors.extend(semantic_errors);
        messages.errors.extend(lowering_errors);
        let ir_text = ir.to_string();
        crate::timer_log!(time, "Semantic analysis and IR generated in: ");

        // ----------------------------------
        //        Assembly generation
        // ----------------------------------
        let time = Instant::now();
        let (assembly, codegen_messages) = self.ir_to_assembly(&ir);
        messages.extend(codegen_messages);
        crate::timer_log!(time, "Assembly generated in: ");

        Ok(CompilationResult {
            token_trace,
            ast_dump,
            ir,
            ir_text,
            assembly,
            messages,
        })
    }
}
