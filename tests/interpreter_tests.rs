// End-to-end tests: source text in, printed lines (or errors) out.

mod common;

use common::{error_of, output_of, Session};
use pretty_assertions::assert_eq;
use treelox::config::DEFAULT_MAX_CALL_DEPTH;
use treelox::{Config, ErrorKind, Evaluator, Notation, Program, Span, Stmt, Value};

fn lines(expected: &[&str]) -> Vec<String> {
    expected.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn arithmetic_is_left_associative_with_precedence() {
    assert_eq!(output_of("print 2 - 3 - 4;"), lines(&["-5"]));
    assert_eq!(output_of("print 2 + 3 * 4;"), lines(&["14"]));
    assert_eq!(output_of("print (2 + 3) * 4;"), lines(&["20"]));
    assert_eq!(output_of("print 8 / 2 / 2;"), lines(&["2"]));
    assert_eq!(output_of("print -2 * -3;"), lines(&["6"]));
}

#[test]
fn plus_adds_numbers_and_concatenates_strings() {
    assert_eq!(output_of("print \"1\" + \"2\";"), lines(&["12"]));
    assert_eq!(output_of("print 1 + 2;"), lines(&["3"]));

    let error = error_of("print 1 + \"2\";");
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert_eq!(
        error.message,
        "Operands of '+' must be two numbers or two strings."
    );
}

#[test]
fn arithmetic_and_comparison_need_numbers() {
    assert_eq!(
        error_of("print 1 < \"2\";").message,
        "Operands of '<' must be numbers."
    );
    assert_eq!(
        error_of("print nil * 2;").message,
        "Operands of '*' must be numbers."
    );
    assert_eq!(
        error_of("print -\"x\";").message,
        "Operand of '-' must be a number."
    );
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    assert_eq!(error_of("print 1 / 0;").message, "Division by zero.");
}

#[test]
fn comparisons_produce_booleans() {
    assert_eq!(
        output_of("print 1 < 2; print 2 <= 2; print 3 > 4; print 4 >= 5;"),
        lines(&["true", "true", "false", "false"])
    );
}

#[test]
fn equality_never_coerces() {
    assert_eq!(
        output_of(
            "print nil == nil; print nil == false; print 1 == 1; \
             print \"a\" == \"a\"; print 1 == \"1\"; print 0 != false;"
        ),
        lines(&["true", "false", "true", "true", "false", "true"])
    );
}

#[test]
fn callables_are_equal_only_to_themselves() {
    assert_eq!(
        output_of(
            "fun f() {} fun g() {} var h = f; \
             print clock == clock; print f == h; print f == g;"
        ),
        lines(&["true", "true", "false"])
    );
}

// ============================================================================
// Truthiness and logical operators
// ============================================================================

#[test]
fn only_nil_and_false_are_falsy() {
    assert_eq!(
        output_of("if (0) print \"a\"; else print \"b\";"),
        lines(&["a"])
    );
    assert_eq!(output_of("if (\"\") print \"empty\";"), lines(&["empty"]));
    assert_eq!(output_of("if (nil) print 1; else print 2;"), lines(&["2"]));
    assert_eq!(
        output_of("print !nil; print !0; print !false;"),
        lines(&["true", "false", "true"])
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(output_of("print false and (1/0);"), lines(&["false"]));
    assert_eq!(output_of("print true or (1/0);"), lines(&["true"]));
}

#[test]
fn logical_operators_return_an_operand() {
    assert_eq!(
        output_of("print nil or \"x\"; print 1 and 2; print nil and 1; print 0 or 1;"),
        lines(&["x", "2", "nil", "0"])
    );
}

// ============================================================================
// Printing
// ============================================================================

#[test]
fn print_renders_every_kind_of_value() {
    assert_eq!(
        output_of(
            "fun f() {} \
             print nil; print true; print 3.0; print 2.5; print \"s\"; \
             print clock; print f;"
        ),
        lines(&["nil", "true", "3", "2.5", "s", "<native fn clock>", "<fn f>"])
    );
}

// ============================================================================
// Variables and scope
// ============================================================================

#[test]
fn inner_block_shadows_and_outer_binding_returns() {
    assert_eq!(
        output_of("{ var a = 1; { var a = 2; print a; } print a; }"),
        lines(&["2", "1"])
    );
}

#[test]
fn var_without_initializer_is_nil() {
    assert_eq!(output_of("var a; print a;"), lines(&["nil"]));
}

#[test]
fn assignment_writes_through_to_the_defining_frame() {
    assert_eq!(
        output_of("var a = 1; { a = 2; { a = a + 1; } } print a;"),
        lines(&["3"])
    );
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(
        output_of("var a; var b; a = b = 3; print a; print b; print (a = 5);"),
        lines(&["3", "3", "5"])
    );
}

#[test]
fn reading_an_undefined_variable_fails_with_its_location() {
    let error = error_of("var a = 1;\n\nprint b;");
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert_eq!(error.message, "Undefined variable 'b'.");
    assert_eq!(error.span.line, 3);
    assert_eq!(error.to_string(), "[line 3] Undefined variable 'b'.");
}

#[test]
fn assigning_an_undefined_variable_does_not_create_it() {
    let mut session = Session::new();
    assert_eq!(session.error_of("y = 1;").message, "Undefined variable 'y'.");
    assert_eq!(session.error_of("print y;").message, "Undefined variable 'y'.");
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn else_binds_to_the_nearest_if() {
    assert_eq!(
        output_of("if (true) if (false) print 1; else print 2;"),
        lines(&["2"])
    );
    assert_eq!(
        output_of("if (false) if (true) print 1; else print 2;"),
        Vec::<String>::new()
    );
}

#[test]
fn while_loops_until_the_condition_is_falsy() {
    assert_eq!(
        output_of("var i = 0; while (i < 3) { print i; i = i + 1; }"),
        lines(&["0", "1", "2"])
    );
    assert_eq!(
        output_of("while (false) print 1; print \"done\";"),
        lines(&["done"])
    );
}

#[test]
fn for_loop_variable_is_scoped_to_the_loop() {
    let mut session = Session::new();
    assert_eq!(
        session.output_of("for (var i = 0; i < 3; i = i + 1) print i;"),
        lines(&["0", "1", "2"])
    );
    assert_eq!(session.error_of("print i;").message, "Undefined variable 'i'.");
}

#[test]
fn for_loop_clauses_are_optional() {
    assert_eq!(
        output_of("var i = 0; for (; i < 2;) { print i; i = i + 1; }"),
        lines(&["0", "1"])
    );
    assert_eq!(
        output_of(
            "fun first() { for (;;) { return \"out\"; } } print first();"
        ),
        lines(&["out"])
    );
}

// ============================================================================
// Functions and closures
// ============================================================================

#[test]
fn closures_share_their_captured_frame() {
    let source = "\
        fun makeCounter() {
            var i = 0;
            fun inc() { i = i + 1; return i; }
            return inc;
        }
        var c = makeCounter();
        print c();
        print c();
        var d = makeCounter();
        print d();
    ";
    assert_eq!(output_of(source), lines(&["1", "2", "1"]));
}

#[test]
fn closures_outlive_the_call_that_created_them() {
    let source = "\
        fun makeAdder(n) {
            fun add(x) { return x + n; }
            return add;
        }
        var add5 = makeAdder(5);
        print add5(3);
    ";
    assert_eq!(output_of(source), lines(&["8"]));
}

#[test]
fn callee_does_not_see_the_callers_locals() {
    let source = "\
        fun reader() { return secret; }
        fun caller() { var secret = 1; return reader(); }
        caller();
    ";
    assert_eq!(error_of(source).message, "Undefined variable 'secret'.");
}

#[test]
fn recursion_works() {
    let source = "\
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
    ";
    assert_eq!(output_of(source), lines(&["55"]));
}

#[test]
fn return_unwinds_through_blocks_and_loops() {
    let source = "\
        fun f() {
            var i = 0;
            while (true) {
                { if (i == 3) return i; }
                i = i + 1;
            }
        }
        print f();
    ";
    assert_eq!(output_of(source), lines(&["3"]));
}

#[test]
fn statements_after_return_do_not_run() {
    assert_eq!(
        output_of(
            "fun g() { print \"before\"; return; print \"after\"; } print g();"
        ),
        lines(&["before", "nil"])
    );
}

#[test]
fn falling_off_the_end_returns_nil() {
    assert_eq!(output_of("fun f() { 1 + 1; } print f();"), lines(&["nil"]));
}

#[test]
fn parameters_can_be_redefined_locally() {
    assert_eq!(
        output_of("fun f(a) { var a = 2; return a; } print f(1);"),
        lines(&["2"])
    );
}

#[test]
fn arguments_are_evaluated_left_to_right() {
    let source = "\
        var log = \"\";
        fun a() { log = log + \"a\"; return 1; }
        fun b() { log = log + \"b\"; return 2; }
        fun add(x, y) { return x + y; }
        print add(a(), b());
        print log;
    ";
    assert_eq!(output_of(source), lines(&["3", "ab"]));
}

#[test]
fn chained_calls_apply_left_to_right() {
    let source = "\
        fun outer(a) { fun inner(b) { return a - b; } return inner; }
        print outer(10)(3);
    ";
    assert_eq!(output_of(source), lines(&["7"]));
}

#[test]
fn only_callables_can_be_called() {
    assert_eq!(
        error_of("\"str\"();").message,
        "Can only call functions and classes."
    );
    assert_eq!(
        error_of("var x = 1; x(2);").message,
        "Can only call functions and classes."
    );
}

#[test]
fn arity_mismatch_is_reported_and_the_session_survives() {
    let mut session = Session::new();
    session.output_of("fun f(a) { return a; }");

    let error = session.error_of("f(1, 2);");
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert_eq!(error.message, "Expected 1 arguments but got 2.");

    assert_eq!(session.output_of("print f(3);"), lines(&["3"]));
}

#[test]
fn clock_is_a_zero_arity_native() {
    assert_eq!(
        output_of("var t = clock(); print t > 0;"),
        lines(&["true"])
    );
    assert_eq!(
        error_of("clock(1);").message,
        "Expected 0 arguments but got 1."
    );
}

// ============================================================================
// Errors and session behaviour
// ============================================================================

#[test]
fn definitions_persist_across_submissions() {
    let mut session = Session::new();
    session.output_of("var x = 1;");
    assert_eq!(session.output_of("print x;"), lines(&["1"]));
    session.output_of("fun inc() { x = x + 1; }");
    assert_eq!(session.output_of("inc(); inc(); print x;"), lines(&["3"]));
}

#[test]
fn runtime_error_abandons_the_rest_of_the_submission() {
    let mut session = Session::new();
    let error = session.error_of("print 1; print nil + 1; print 2;");
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert_eq!(session.take_output(), lines(&["1"]));
}

#[test]
fn syntax_error_prevents_any_execution() {
    let mut session = Session::new();
    let error = session.error_of("print 1; print ;");
    assert_eq!(error.kind, ErrorKind::ParseError);
    assert_eq!(session.take_output(), Vec::<String>::new());
}

#[test]
fn lexical_error_prevents_any_execution() {
    let mut session = Session::new();
    let error = session.error_of("print 1; @");
    assert_eq!(error.kind, ErrorKind::LexError);
    assert_eq!(session.take_output(), Vec::<String>::new());
}

#[test]
fn error_inside_a_block_restores_the_outer_frame() {
    let mut session = Session::new();
    session.output_of("var a = \"outer\";");
    session.error_of("{ var a = \"inner\"; print missing; }");
    assert_eq!(session.output_of("print a;"), lines(&["outer"]));
}

#[test]
fn error_inside_a_call_restores_the_outer_frame() {
    let mut session = Session::new();
    session.output_of("var a = \"global\"; fun f(a) { var b = a; return b + 1; }");
    session.error_of("f(\"x\");");
    assert_eq!(session.output_of("print a;"), lines(&["global"]));
    assert_eq!(session.error_of("print b;").message, "Undefined variable 'b'.");
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let config = Config {
        max_call_depth: 8,
        ..Config::default()
    };
    let mut session = Session::with_config(config);

    let error = session.error_of("fun r(n) { return r(n + 1); } r(0);");
    assert_eq!(error.message, "Stack overflow: maximum call depth of 8 exceeded.");

    // The depth counter unwound with the error: eight nested calls still fit.
    assert_eq!(
        session.output_of(
            "fun d(n) { if (n == 0) return 0; return d(n - 1); } print d(7);"
        ),
        lines(&["0"])
    );
}

const COUNTDOWN: &str = "fun d(n) { if (n == 0) return 0; return d(n - 1) + 1; }";

#[test]
fn default_call_depth_is_reachable_and_enforced() {
    let mut session = Session::new();
    session.output_of(COUNTDOWN);

    // d(n) makes n + 1 nested calls.
    let deepest = DEFAULT_MAX_CALL_DEPTH - 1;
    assert_eq!(
        session.output_of(&format!("print d({});", deepest)),
        vec![deepest.to_string()]
    );

    let error = session.error_of(&format!("d({});", DEFAULT_MAX_CALL_DEPTH + 1));
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert_eq!(
        error.message,
        format!(
            "Stack overflow: maximum call depth of {} exceeded.",
            DEFAULT_MAX_CALL_DEPTH
        )
    );
}

#[test]
fn deep_recursion_does_not_depend_on_the_thread_stack() {
    let output = std::thread::Builder::new()
        .stack_size(512 * 1024)
        .spawn(|| {
            let mut session = Session::new();
            session.output_of(COUNTDOWN);
            let found = session.error_of(&format!("d({});", DEFAULT_MAX_CALL_DEPTH));
            (session.output_of("print d(500);"), found.message)
        })
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(output.0, lines(&["500"]));
    assert!(output.1.starts_with("Stack overflow"));
}

#[test]
fn deeply_grouped_expression_evaluates() {
    let source = format!("print {}1{};", "(".repeat(200), ")".repeat(200));
    assert_eq!(output_of(&source), lines(&["1"]));
}

#[test]
fn return_outside_a_function_is_rejected_by_the_parser() {
    let error = error_of("{ return 1; }");
    assert_eq!(error.kind, ErrorKind::ParseError);
    assert_eq!(error.message, "Can't return from top-level code.");
}

#[test]
fn stray_return_reaching_the_top_level_is_a_runtime_error() {
    // Built by hand: the parser would never produce this program.
    let program = Program {
        statements: vec![Stmt::Return {
            value: None,
            span: Span::new(0, 6, 1),
        }],
    };
    let mut evaluator = Evaluator::with_config(&Config::default(), Box::new(std::io::sink()));

    let error = evaluator.interpret(&program).unwrap_err();
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert_eq!(error.message, "Can't return from top-level code.");
}

// ============================================================================
// REPL lines and AST dumps
// ============================================================================

#[test]
fn repl_line_echoes_a_bare_expression() {
    let mut session = Session::new();
    assert_eq!(session.run_line("1 + 2;").unwrap(), Some(Value::Number(3.0)));
    assert_eq!(session.take_output(), Vec::<String>::new());
}

#[test]
fn repl_line_runs_assignments_calls_and_statements_without_echo() {
    let mut session = Session::new();
    assert_eq!(session.run_line("var x = 1;").unwrap(), None);
    assert_eq!(session.run_line("x = 2;").unwrap(), None);
    assert_eq!(session.run_line("fun f() { print x; }").unwrap(), None);
    assert_eq!(session.run_line("f();").unwrap(), None);
    assert_eq!(session.take_output(), lines(&["2"]));
    assert_eq!(session.run_line("x;").unwrap(), Some(Value::Number(2.0)));
}

#[test]
fn repl_line_reports_errors_and_keeps_the_session() {
    let mut session = Session::new();
    session.run_line("var x = 1;").unwrap();
    let errors = session.run_line("x + nil;").unwrap_err();
    assert_eq!(errors[0].message, "Operands of '+' must be two numbers or two strings.");
    assert_eq!(session.run_line("x;").unwrap(), Some(Value::Number(1.0)));
}

#[test]
fn dump_ast_covers_echoed_repl_lines() {
    let config = Config {
        dump_ast: Some(Notation::Tree),
        ..Config::default()
    };
    let mut session = Session::with_config(config);

    assert_eq!(session.run_line("1 + 2;").unwrap(), Some(Value::Number(3.0)));
    assert_eq!(session.take_output(), lines(&["(; (+ 1 2))"]));

    assert_eq!(session.run_line("print 4;").unwrap(), None);
    assert_eq!(session.take_output(), lines(&["(print 4)", "4"]));
}

#[test]
fn dump_ast_precedes_script_output() {
    let config = Config {
        dump_ast: Some(Notation::Rpn),
        ..Config::default()
    };
    let mut session = Session::with_config(config);
    assert_eq!(
        session.output_of("print 1 + 2;"),
        lines(&["(print 1 2 +)", "3"])
    );
}

#[test]
fn strings_may_span_lines() {
    assert_eq!(
        output_of("print \"one\ntwo\";"),
        lines(&["one", "two"])
    );
}
