use crate::compiler_frontend::analysis::semantic::check_program;
use crate::compiler_frontend::ast::parser::parse_program;
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorType};
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use proptest::prelude::*;

fn check(source: &str) -> Vec<CompilerError> {
    let mut errors = Vec::new();
    let mut tokens = tokenize(source, &mut errors);
    let ast = parse_program(&mut tokens).unwrap();
    check_program(&ast)
}

fn messages(errors: &[CompilerError]) -> Vec<&str> {
    errors.iter().map(|e| e.msg.as_str()).collect()
}

#[test]
fn declared_and_used_in_order_is_clean() {
    let errors = check("int a = 4; int b = 3; a = a + b; return a;");
    assert!(errors.is_empty(), "{:?}", messages(&errors));
}

#[test]
fn use_before_declaration_is_reported_with_its_line() {
    let errors = check("int a = 1;\nint b = c + a;");

    assert_eq!(
        messages(&errors),
        ["Variable 'c' is not initialized before use."]
    );
    assert_eq!(errors[0].error_type, ErrorType::Rule);
    assert_eq!(errors[0].line(), 2);
}

#[test]
fn declaration_without_initializer_is_flagged_and_later_assignment_too() {
    let errors = check("int z;\nz = 50;");

    assert_eq!(
        messages(&errors),
        [
            "Variable 'z' is not initialized before use.",
            "Variable 'z' is not declared before assignment.",
        ]
    );
    assert_eq!(errors[1].line(), 2);
}

#[test]
fn duplicate_declaration_in_the_same_scope() {
    let errors = check("int x = 1; int x = 2;");
    assert_eq!(messages(&errors), ["Symbol 'x' already declared."]);
}

#[test]
fn if_blocks_get_their_own_scope() {
    // Shadowing inside the block is fine, but the inner name doesn't leak out
    let errors = check(
        "int x = 1;\n\
         if (x > 0) { int x = 2; int y = x; }\n\
         return y;",
    );

    assert_eq!(
        messages(&errors),
        ["Variable 'y' is not initialized before use."]
    );
    assert_eq!(errors[0].line(), 3);
}

#[test]
fn condition_is_checked_in_the_outer_scope() {
    let errors = check("if (q) { int q = 1; }");
    assert_eq!(
        messages(&errors),
        ["Variable 'q' is not initialized before use."]
    );
}

#[test]
fn params_are_initialized_inside_the_function_only() {
    let errors = check(
        "function sum(int x, int y) -> int { return x + y; }\n\
         return x;",
    );

    assert_eq!(
        messages(&errors),
        ["Variable 'x' is not initialized before use."]
    );
}

#[test]
fn function_names_are_symbols_of_the_enclosing_scope() {
    let errors = check("function f() -> int { return 1; } int f = 2;");
    assert_eq!(messages(&errors), ["Symbol 'f' already declared."]);
}

#[test]
fn call_arguments_are_checked_but_callee_is_not() {
    let errors = check("return missing(a, 1);");
    assert_eq!(
        messages(&errors),
        ["Variable 'a' is not initialized before use."]
    );
}

#[test]
fn every_problem_is_reported_in_one_pass() {
    let errors = check("int a; b = 1; return c + d;");
    assert_eq!(errors.len(), 4);
}

proptest! {
    #[test]
    fn declare_before_use_chains_have_no_diagnostics(count in 1usize..24) {
        let mut source = String::from("int v0 = 1;\n");
        for i in 1..count {
            source.push_str(&format!("int v{i} = v{} + {i};\n", i - 1));
        }
        source.push_str(&format!("return v{};", count - 1));

        prop_assert!(check(&source).is_empty());
    }

    #[test]
    fn each_use_before_declaration_is_reported_once(uses in 1usize..12) {
        let terms: Vec<&str> = std::iter::repeat_n("late", uses).collect();
        let source = format!("int early = {};\nint late = 1;", terms.join(" + "));

        let errors = check(&source);
        prop_assert_eq!(errors.len(), uses);
        prop_assert!(errors.iter().all(|e| e.msg.contains("'late'")));
    }
}
