use crate::backends::x86_64::{SlotTable, lower_ir_to_x86_64};
use crate::compiler_frontend::ast::parser::parse_program;
use crate::compiler_frontend::compiler_errors::{CompilerMessages, ErrorType};
use crate::compiler_frontend::compiler_warnings::WarningKind;
use crate::compiler_frontend::ir::ir_builder::build_module;
use crate::compiler_frontend::ir::ir_nodes::IrModule;
use crate::compiler_frontend::ir::ir_text::parse_module;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;

fn lower_source(source: &str) -> IrModule {
    let mut errors = Vec::new();
    let mut tokens = tokenize(source, &mut errors);
    let ast = parse_program(&mut tokens).unwrap();
    let (module, errors) = build_module(&ast, "main");
    assert!(errors.is_empty(), "{errors:?}");
    module
}

fn asm_for_source(source: &str) -> (String, CompilerMessages) {
    let (asm, messages) = lower_ir_to_x86_64(&lower_source(source));
    (asm.source, messages)
}

fn asm_for_ir(ir: &str) -> (String, Vec<String>, CompilerMessages) {
    let module = parse_module(ir).unwrap();
    let (asm, messages) = lower_ir_to_x86_64(&module);
    (asm.source, asm.emitted_functions, messages)
}

#[test]
fn straight_line_program_uses_slots_and_one_spill() {
    let (asm, messages) = asm_for_source("int a = 4; int b = 3; a = a + b; return a;");
    assert!(messages.is_empty());

    let expected = "\
\t.globl\tmain
\t.type\tmain, @function
main:
\tpushq\t%rbp
\tmovq\t%rsp, %rbp
\tsubq\t$16, %rsp
\tmovl\t$4, -8(%rbp)
\tmovl\t$3, -16(%rbp)
\tmovl\t-8(%rbp), %eax
\tpushq\t%rax
\tmovl\t-16(%rbp), %eax
\tmovl\t%eax, %ecx
\tpopq\t%rax
\taddl\t%ecx, %eax
\tmovl\t%eax, -8(%rbp)
\tmovl\t-8(%rbp), %eax
\tmovq\t%rbp, %rsp
\tpopq\t%rbp
\tret
\t.size\tmain, .-main
";

    assert!(asm.starts_with("\t.text\n"));
    assert!(asm.contains(expected), "{asm}");
    assert!(asm.ends_with("\t.section\t.note.GNU-stack,\"\",@progbits\n"));
}

#[test]
fn parameters_come_from_argument_registers() {
    let (asm, messages) = asm_for_source(
        "function sum(int x, int y) -> int { return x + y; } int r = sum(2, 5); return r;",
    );
    assert!(messages.is_empty());

    assert!(asm.contains("sum:\n\tpushq\t%rbp\n\tmovq\t%rsp, %rbp\n\tsubq\t$16, %rsp\n"));
    assert!(asm.contains("\tmovl\t%edi, -8(%rbp)\n\tmovl\t%esi, -16(%rbp)\n"));

    // One slot in main, so the call needs 8 bytes of padding to stay 16 byte aligned
    assert!(asm.contains(
        "\tmovl\t$2, %edi\n\tmovl\t$5, %esi\n\tsubq\t$8, %rsp\n\tcall\tsum\n\taddq\t$8, %rsp\n\tmovl\t%eax, -8(%rbp)\n"
    ));
}

#[test]
fn call_arguments_are_loaded_from_their_slots_in_order() {
    let (asm, messages) = asm_for_source(
        "function sum(int x, int y) -> int { return x + y; }\n\
         int a = 2; int b = 5; return sum(a, b);",
    );
    assert!(messages.is_empty());

    // Two slots keep the frame aligned without padding
    assert!(asm.contains(
        "\tmovl\t-8(%rbp), %eax\n\tpushq\t%rax\n\tmovl\t-16(%rbp), %eax\n\tmovl\t%eax, %esi\n\tpopq\t%rdi\n\tcall\tsum\n"
    ));
}

#[test]
fn conditional_branch_jumps_to_its_own_labels() {
    let (asm, messages) = asm_for_source("int a = 10; if (a > 5) { return 1; } return 0;");
    assert!(messages.is_empty());

    assert!(asm.contains("\tcmpl\t$5, %eax\n\tsetg\t%al\n\tmovzbl\t%al, %eax\n"));
    assert!(asm.contains("\tcmpl\t$0, %eax\n\tsetne\t%al\n\tmovzbl\t%al, %eax\n"));
    assert!(asm.contains("\tcmpl\t$0, %eax\n\tje\t.Lmain.else.0\n\tjmp\t.Lmain.then.0\n"));
    assert!(asm.contains(".Lmain.then.0:\n\tmovl\t$1, %eax\n"));
    assert!(asm.contains(".Lmain.else.0:\n\tjmp\t.Lmain.ifcont.0\n"));
    assert!(asm.contains(".Lmain.ifcont.0:\n\tmovl\t$0, %eax\n"));
}

#[test]
fn branch_targets_are_read_from_the_instruction() {
    let (asm, _, messages) = asm_for_ir(
        "\
define i32 @pick(i32 %n) {
  %n = alloca i32
  store i32 %n, i32* %n
  %0 = load i32, i32* %n
  br i1 %0, label %yes, label %no
yes:
  ret i32 1
no:
  ret i32 2
}
",
    );
    assert!(messages.is_empty());

    assert!(asm.contains("\tje\t.Lpick.no\n\tjmp\t.Lpick.yes\n"));
    assert!(!asm.contains("then"));
}

#[test]
fn division_sign_extends_first() {
    let (asm, _) = asm_for_source("int a = 9; int b = 2; return a / b;");
    assert!(asm.contains("\tpopq\t%rax\n\tcltd\n\tidivl\t%ecx\n"));
}

#[test]
fn literal_operands_go_straight_into_registers() {
    let (asm, messages) = asm_for_source("int a = 3; return 10 - a;");
    assert!(messages.is_empty());

    assert!(asm.contains("\tmovl\t-8(%rbp), %eax\n\tmovl\t%eax, %ecx\n\tmovl\t$10, %eax\n\tsubl\t%ecx, %eax\n"));
}

#[test]
fn unused_call_results_are_not_kept() {
    let (asm, messages) = asm_for_source(
        "function f() -> int { return 1; } f(); int a = 2; if (a > 1) { a = 3; } return a;",
    );
    assert!(messages.is_empty(), "{messages:?}");
    assert!(!asm.contains("pushq\t%rax"));
}

#[test]
fn unsupported_comparisons_become_comments_and_warnings() {
    let (asm, emitted, messages) = asm_for_ir(
        "\
define i32 @main() {
  %a = alloca i32
  store i32 1, i32* %a
  %0 = load i32, i32* %a
  %1 = icmp slt i32 %0, 3
  ret i32 %1
}
",
    );

    assert_eq!(emitted, ["main"]);
    assert!(messages.errors.is_empty());
    assert_eq!(messages.warnings.len(), 1);
    assert_eq!(
        messages.warnings[0].warning_kind,
        WarningKind::UnhandledInstruction {
            function: String::from("main")
        }
    );
    assert!(asm.contains("\t# unhandled IR instruction: %1 = icmp slt i32 %0, 3\n"));
}

#[test]
fn more_than_two_parameters_fails_only_that_function() {
    let (asm, messages) =
        asm_for_source("function three(int a, int b, int c) -> int { return a; } return 1;");

    assert_eq!(messages.count_errors_of_type(ErrorType::Codegen), 1);
    assert!(messages.errors[0].msg.contains("'three' has 3 parameters"));
    assert!(asm.contains("main:"));
    assert!(!asm.contains("three:"));
}

#[test]
fn calls_with_more_than_two_arguments_are_rejected() {
    let (_, emitted, messages) = asm_for_ir(
        "\
define i32 @main() {
  %0 = call i32 @three(i32 1, i32 2, i32 3)
  ret i32 %0
}
",
    );

    assert!(emitted.is_empty());
    assert!(messages.errors[0].msg.contains("passes 3 arguments"));
}

#[test]
fn values_used_out_of_stack_order_are_errors() {
    let (_, emitted, messages) = asm_for_ir(
        "\
define i32 @main() {
  %a = alloca i32
  %b = alloca i32
  store i32 1, i32* %a
  store i32 2, i32* %b
  %0 = load i32, i32* %a
  %1 = load i32, i32* %b
  %2 = sub i32 %1, %0
  ret i32 %2
}
",
    );

    assert!(emitted.is_empty());
    assert_eq!(messages.errors[0].error_type, ErrorType::Codegen);
    assert!(messages.errors[0].msg.contains("out of stack order"));
}

#[test]
fn values_can_not_cross_a_label() {
    let (_, emitted, messages) = asm_for_ir(
        "\
define i32 @main() {
  %a = alloca i32
  store i32 1, i32* %a
  %0 = load i32, i32* %a
  br label %next
next:
  ret i32 %0
}
",
    );

    assert!(emitted.is_empty());
    assert!(messages.errors[0].msg.contains("still unused"));
}

#[test]
fn stores_to_unallocated_slots_are_errors() {
    let (_, _, messages) = asm_for_ir(
        "\
define i32 @main() {
  store i32 1, i32* %ghost
  ret i32 0
}
",
    );

    assert!(messages.errors[0].msg.contains("'%ghost' is used in 'main' but never allocated"));
}

#[test]
fn slot_offsets_follow_allocation_order() {
    let module = lower_source("int c = 1; int a = 2; if (a > 1) { int b = 3; } return c;");
    let table = SlotTable::from_function(&module.functions[0]).unwrap();

    let offsets: Vec<(&str, i32)> = table.iter().collect();
    assert_eq!(offsets, [("c", -8), ("a", -16), ("b", -24)]);
    assert_eq!(table.frame_size(), 24);

    let again = lower_source("int c = 1; int a = 2; if (a > 1) { int b = 3; } return c;");
    assert_eq!(SlotTable::from_function(&again.functions[0]).unwrap(), table);
}

#[test]
fn duplicate_allocas_are_rejected() {
    let module = parse_module(
        "\
define i32 @main() {
  %a = alloca i32
  %a = alloca i32
  ret i32 0
}
",
    )
    .unwrap();

    let error = SlotTable::from_function(&module.functions[0]).unwrap_err();
    assert_eq!(error.error_type, ErrorType::Codegen);
}
