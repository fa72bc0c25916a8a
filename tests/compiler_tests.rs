use minicc::compiler_frontend::compiler_errors::ErrorType;
use minicc::{Compiler, Config};
use std::fs;
use std::process::Command;

fn compile_to_assembly(source: &str) -> String {
    let config = Config::default();
    let result = Compiler::new(&config)
        .compile(source)
        .unwrap_or_else(|messages| panic!("compilation failed: {:?}", messages.errors));
    result.assembly.source
}

/// Assembles and links the program, runs it and returns its exit status.
/// Returns `None` when the host can't run x86-64 Linux binaries or has no C toolchain.
fn run_assembly(assembly: &str) -> Option<i32> {
    if !cfg!(all(target_arch = "x86_64", target_os = "linux")) {
        return None;
    }

    if Command::new("cc").arg("--version").output().is_err() {
        return None;
    }

    let dir = tempfile::tempdir().unwrap();
    let asm_path = dir.path().join("program.s");
    let exe_path = dir.path().join("program");
    fs::write(&asm_path, assembly).unwrap();

    let linked = Command::new("cc")
        .arg(&asm_path)
        .arg("-o")
        .arg(&exe_path)
        .output()
        .unwrap();
    assert!(
        linked.status.success(),
        "cc failed:\n{}\n{assembly}",
        String::from_utf8_lossy(&linked.stderr)
    );

    let status = Command::new(&exe_path).status().unwrap();
    status.code()
}

fn assert_exit_code(source: &str, expected: i32) {
    let assembly = compile_to_assembly(source);
    if let Some(code) = run_assembly(&assembly) {
        assert_eq!(code, expected, "{source}\n{assembly}");
    }
}

#[test]
fn straight_line_arithmetic_returns_seven() {
    assert_exit_code("int a = 4; int b = 3; a = a + b; return a;", 7);
}

#[test]
fn two_argument_call_returns_seven() {
    assert_exit_code(
        "function sum(int x, int y) -> int { return x + y; } int r = sum(2, 5); return r;",
        7,
    );
}

#[test]
fn if_takes_the_then_arm_only_when_the_condition_holds() {
    assert_exit_code("int a = 10; if (a > 5) { return 1; } return 0;", 1);
    assert_exit_code("int a = 3; if (a > 5) { return 1; } return 0;", 0);
}

#[test]
fn else_arms_and_nested_ifs_run_the_right_path() {
    let source = "\
int a = 8;
int r = 0;
if (a > 5) {
    if (a > 9) { r = 1; } else { r = 2; }
} else {
    r = 3;
}
return r;";

    assert_exit_code(source, 2);
}

#[test]
fn operators_share_one_left_associative_level() {
    // (2 + 3) * 4, not 2 + (3 * 4)
    assert_exit_code("return 2 + 3 * 4;", 20);
    assert_exit_code("return 20 - 4 - 6;", 10);
    assert_exit_code("return 2 + (3 * 4);", 14);
}

#[test]
fn division_is_signed() {
    assert_exit_code("int a = 0 - 9; return a / 3 + 5;", 2);
}

#[test]
fn recursive_calls_keep_pending_values_on_the_stack() {
    assert_exit_code(
        "function fact(int n) -> int {\n\
             if (n > 1) { return n * fact(n - 1); }\n\
             return 1;\n\
         }\n\
         return fact(5);",
        120,
    );
}

#[test]
fn comparison_results_can_be_used_as_integers() {
    assert_exit_code("int a = 4; int b = (a > 3) + (a > 9); return b;", 1);
}

#[test]
fn stray_character_is_skipped_and_the_rest_still_compiles() {
    let config = Config::default();
    let result = Compiler::new(&config)
        .compile("int a = 4; int b = 3 $; return a + b;")
        .unwrap();

    assert_eq!(result.messages.count_errors_of_type(ErrorType::Lexical), 1);
    assert_eq!(result.messages.errors.len(), 1);

    if let Some(code) = run_assembly(&result.assembly.source) {
        assert_eq!(code, 7);
    }
}

#[test]
fn syntax_errors_stop_the_run_with_no_artifacts() {
    let config = Config::default();
    let messages = Compiler::new(&config)
        .compile("int a = 4;\nint b = ;")
        .unwrap_err();

    assert_eq!(messages.errors.len(), 1);
    assert_eq!(messages.errors[0].error_type, ErrorType::Syntax);
    assert_eq!(messages.errors[0].location.line(), 2);
}

#[test]
fn semantic_diagnostics_do_not_block_code_generation() {
    let config = Config::default();
    let result = Compiler::new(&config)
        .compile("int z;\nz = 5;\nreturn z;")
        .unwrap();

    assert!(result.messages.count_errors_of_type(ErrorType::Rule) > 0);
    assert_eq!(result.assembly.emitted_functions, ["main"]);

    if let Some(code) = run_assembly(&result.assembly.source) {
        assert_eq!(code, 5);
    }
}

#[test]
fn every_artifact_is_produced() {
    let config = Config::default();
    let result = Compiler::new(&config)
        .compile("int a = 1; return a;")
        .unwrap();

    assert!(result.token_trace.starts_with("1: INT(int)\n1: IDENTIFIER(a)\n"));
    assert!(result.ast_dump.starts_with("program:\n  declaration: a\n"));
    assert!(result.ir_text.starts_with("define i32 @main() {\n"));
    assert!(result.assembly.source.contains("main:"));
}

#[test]
fn serialized_ir_compiles_to_the_same_assembly() {
    let config = Config::default();
    let compiler = Compiler::new(&config);
    let result = compiler
        .compile("function sum(int x, int y) -> int { return x + y; } return sum(3, 4);")
        .unwrap();

    let (assembly, messages) = compiler.ir_text_to_assembly(&result.ir_text).unwrap();
    assert!(messages.is_empty());
    assert_eq!(assembly.source, result.assembly.source);
}

#[test]
fn warnings_can_be_promoted_to_errors() {
    let ir = "\
define i32 @main() {
  %0 = icmp sle i32 1, 2
  ret i32 %0
}
";

    let lenient = Config::default();
    let (_, messages) = Compiler::new(&lenient).ir_text_to_assembly(ir).unwrap();
    assert_eq!(messages.warnings.len(), 1);
    assert!(messages.errors.is_empty());

    let strict = Config::from_toml_str("warnings_as_errors = true").unwrap();
    let (_, messages) = Compiler::new(&strict).ir_text_to_assembly(ir).unwrap();
    assert!(messages.warnings.is_empty());
    assert_eq!(messages.count_errors_of_type(ErrorType::Codegen), 1);
}

#[test]
fn sequential_and_parallel_analysis_agree() {
    let source = "int x;\nint y = x + 1;\nfunction f(int a) -> int { return a + q; }\nreturn y;";

    let parallel = Config::default();
    let sequential = Config::from_toml_str("parallel_analysis = false").unwrap();

    let first = Compiler::new(&parallel).compile(source).unwrap();
    let second = Compiler::new(&sequential).compile(source).unwrap();

    assert_eq!(first.ir_text, second.ir_text);
    assert_eq!(first.assembly.source, second.assembly.source);

    let messages = |errors: &[minicc::compiler_frontend::compiler_errors::CompilerError]| {
        errors.iter().map(|e| e.msg.clone()).collect::<Vec<_>>()
    };
    assert_eq!(
        messages(&first.messages.errors),
        messages(&second.messages.errors)
    );
}

#[test]
fn custom_entry_function_name_is_used() {
    let config = Config::from_toml_str("entry_function = \"start\"").unwrap();
    let result = Compiler::new(&config).compile("return 3;").unwrap();

    assert_eq!(result.assembly.emitted_functions, ["start"]);
    assert!(result.assembly.source.contains("\t.globl\tstart\n"));
}

#[test]
fn messages_can_be_reported_in_either_format() {
    let source = "int z;\nreturn 1 $;";
    let pretty = Config::default();
    let json = Config::from_toml_str("message_format = \"json\"").unwrap();

    for config in [&pretty, &json] {
        let compiler = Compiler::new(config);
        let result = compiler.compile(source).unwrap();
        assert_eq!(result.messages.errors.len(), 2);
        compiler.report_messages(result.messages, source);
    }
}
