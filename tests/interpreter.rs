mod common;

#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use rox::error::RunError;
    use rox::value::Value;

    use super::common::*;

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(output_of("print 1 + 2;"), ["3"]);
        assert_eq!(output_of("print 1 + 2 * 3 - 4 / 2;"), ["5"]);
        assert_eq!(output_of("print (1 + 2) * 3;"), ["9"]);
        assert_eq!(output_of("print 10 - 2 - 3;"), ["5"]);
        assert_eq!(output_of("print -3 + 1.5;"), ["-1.5"]);
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        assert_eq!(output_of("print 1 / 0;"), ["inf"]);
        assert_eq!(output_of("print -1 / 0;"), ["-inf"]);
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(
            output_of("print 1 < 2; print 2 <= 1; print 3 > 3; print 3 >= 3;"),
            ["true", "false", "false", "true"]
        );
        assert_eq!(
            output_of("print nil == nil; print nil == false; print \"a\" == \"a\"; print 1 != 2;"),
            ["true", "false", "true", "true"]
        );
        assert_eq!(output_of("print 1 == \"1\";"), ["false"]);
    }

    #[test]
    fn truthiness_and_not() {
        assert_eq!(
            output_of("print !nil; print !false; print !0; print !\"\";"),
            ["true", "true", "false", "false"]
        );
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(output_of("var a = \"foo\"; print a + \"bar\";"), ["foobar"]);
    }

    #[test]
    fn logical_operators_return_an_operand() {
        assert_eq!(
            output_of("print nil or \"yes\"; print 1 or 2; print nil and 1; print 1 and 2;"),
            ["yes", "1", "nil", "2"]
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        let source = r#"
            fun boom() {
                print "evaluated";
                return true;
            }
            print false and boom();
            print true or boom();
        "#;

        assert_eq!(output_of(source), ["false", "true"]);
    }

    #[test]
    fn type_errors() {
        assert_eq!(runtime_error_of("print -\"a\";"), "Operand must be a number.");
        assert_eq!(runtime_error_of("print 1 < \"a\";"), "Operands must be numbers.");
        assert_eq!(
            runtime_error_of("print 1 + \"a\";"),
            "Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn runtime_error_reports_line_and_stops() {
        let (output, result) = run("print 1;\nprint nil * 2;\nprint 3;");

        assert_eq!(output, "1\n");
        let Err(error) = result else {
            panic!("expected a runtime error");
        };
        assert_eq!(error.exit_code(), 70);
        assert_eq!(error.diagnostics(), ["Operands must be numbers.\n[line 2]"]);
    }

    #[test]
    fn static_errors_exit_with_65() {
        let (_, result) = run("print ;");
        let Err(error) = result else {
            panic!("expected a parse error");
        };
        assert!(matches!(error, RunError::Static(_)));
        assert_eq!(error.exit_code(), 65);
    }

    #[test]
    fn variables_blocks_and_shadowing() {
        let source = r#"
            var a = "global a";
            var b = "global b";
            {
                var a = "outer a";
                {
                    var a = "inner a";
                    print a;
                    print b;
                }
                print a;
            }
            print a;
        "#;

        assert_eq!(
            output_of(source),
            ["inner a", "global b", "outer a", "global a"]
        );
    }

    #[test]
    fn uninitialized_variables_are_nil() {
        assert_eq!(output_of("var a; print a;"), ["nil"]);
    }

    #[test]
    fn undefined_variable() {
        assert_eq!(runtime_error_of("print missing;"), "Undefined variable 'missing'.");
        assert_eq!(runtime_error_of("missing = 1;"), "Undefined variable 'missing'.");
    }

    #[test]
    fn control_flow() {
        let source = r#"
            var total = 0;
            for (var i = 0; i < 5; i = i + 1) {
                if (i == 2) total = total + 100;
                else total = total + i;
            }
            print total;

            var n = 3;
            while (n > 0) n = n - 1;
            print n;
        "#;

        assert_eq!(output_of(source), ["108", "0"]);
    }

    #[test]
    fn recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
        "#;

        assert_eq!(output_of(source), ["610"]);
    }

    #[test]
    fn return_unwinds_out_of_loops() {
        // Neither loop exits on its own; only `return` leaves them.
        let source = r#"
            fun first_over(limit) {
                for (var i = 0; ; i = i + 1) {
                    while (true) {
                        if (i > limit) return i;
                        i = i + 1;
                    }
                }
            }
            print first_over(3);
        "#;

        assert_eq!(output_of(source), ["4"]);
    }

    #[test]
    fn functions_without_return_yield_nil() {
        assert_eq!(output_of("fun f() {} print f();"), ["nil"]);
        assert_eq!(output_of("fun f() { return; } print f();"), ["nil"]);
    }

    #[test]
    fn closure_counter() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }

            var counter = makeCounter();
            counter();
            counter();
        "#;

        assert_eq!(output_of(source), ["1", "2"]);
    }

    #[test]
    fn closures_capture_independent_frames() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }

            var a = makeCounter();
            var b = makeCounter();
            a();
            a();
            print a();
            print b();
        "#;

        assert_eq!(output_of(source), ["3", "1"]);
    }

    #[test]
    fn callable_display() {
        assert_eq!(
            output_of("fun f() {} class C {} print f; print clock; print C; print C();"),
            ["<fn f>", "<native fn>", "C", "C instance"]
        );
    }

    #[test]
    fn clock_returns_seconds() {
        assert_eq!(output_of("print clock() > 0;"), ["true"]);
        assert_eq!(
            runtime_error_of("clock(1);"),
            "Expected 0 arguments but got 1."
        );
    }

    #[test]
    fn arity_mismatch() {
        assert_eq!(
            runtime_error_of("fun f(a, b) {}\nf(1);"),
            "Expected 2 arguments but got 1."
        );
    }

    #[test]
    fn calling_a_non_callable() {
        assert_eq!(
            runtime_error_of("\"not a function\"();"),
            "Can only call functions and classes."
        );
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        let (_, result) = run("fun f() { f(); }\nf();");

        let Err(RunError::Runtime(error)) = result else {
            panic!("expected a runtime error");
        };
        assert_eq!(error.message, "Stack overflow.");
        assert_eq!(error.line, 1);
    }

    #[test]
    fn deeply_nested_source_runs_and_tears_down() {
        const DEPTH: usize = 50_000;

        let groupings = format!("print {}1{};", "(".repeat(DEPTH), ")".repeat(DEPTH));
        assert_eq!(output_of(&groupings), ["1"]);

        let blocks = format!("{}print 2;{}", "{".repeat(DEPTH), "}".repeat(DEPTH));
        assert_eq!(output_of(&blocks), ["2"]);

        let negations = format!("print {}true;", "!".repeat(DEPTH));
        assert_eq!(output_of(&negations), ["true"]);
    }

    #[test]
    fn fields_and_methods() {
        let source = r#"
            class Bagel {
                eat() {
                    print "Crunch crunch crunch!";
                }
            }
            var bagel = Bagel();
            bagel.topping = "seeds";
            print bagel.topping;
            bagel.eat();
        "#;

        assert_eq!(output_of(source), ["seeds", "Crunch crunch crunch!"]);
    }

    #[test]
    fn fields_shadow_methods() {
        let source = r#"
            class A {
                m() { return "method"; }
            }
            var a = A();
            a.m = "field";
            print a.m;
        "#;

        assert_eq!(output_of(source), ["field"]);
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        let source = r#"
            class Person {
                sayName() {
                    print this.name;
                }
            }
            var jane = Person();
            jane.name = "Jane";
            var bill = Person();
            bill.name = "Bill";

            bill.sayName = jane.sayName;
            bill.sayName();
        "#;

        assert_eq!(output_of(source), ["Jane"]);
    }

    #[test]
    fn initializer_runs_and_returns_this() {
        let source = r#"
            class Point {
                init(x, y) {
                    this.x = x;
                    this.y = y;
                }
            }
            var p = Point(1, 2);
            print p.x + p.y;
            print p.init(5, 6) == p;
            print p.x;
        "#;

        assert_eq!(output_of(source), ["3", "true", "5"]);
    }

    #[test]
    fn class_arity_comes_from_init() {
        assert_eq!(
            runtime_error_of("class P { init(a) {} }\nP();"),
            "Expected 1 arguments but got 0."
        );
        assert_eq!(
            runtime_error_of("class Q {}\nQ(1);"),
            "Expected 0 arguments but got 1."
        );
    }

    #[test]
    fn property_errors() {
        assert_eq!(
            runtime_error_of("class A {}\nprint A().nope;"),
            "Undefined property 'nope'."
        );
        assert_eq!(
            runtime_error_of("var x = 1;\nprint x.y;"),
            "Only instances have properties."
        );
        assert_eq!(
            runtime_error_of("var x = 1;\nx.y = 2;"),
            "Only instances have fields."
        );
    }

    #[test]
    fn inheritance_and_super() {
        let source = r#"
            class A {
                say() {
                    return "A";
                }
                inherited() {
                    return "only in A";
                }
            }
            class B < A {
                say() {
                    return super.say() + "B";
                }
            }
            class C < B {}

            print C().say();
            print C().inherited();
        "#;

        assert_eq!(output_of(source), ["AB", "only in A"]);
    }

    #[test]
    fn super_binds_statically_to_the_declaring_class() {
        let source = r#"
            class A {
                method() {
                    print "A method";
                }
            }
            class B < A {
                method() {
                    print "B method";
                }
                test() {
                    super.method();
                }
            }
            class C < B {}
            C().test();
        "#;

        assert_eq!(output_of(source), ["A method"]);
    }

    #[test]
    fn inherited_initializer() {
        let source = r#"
            class Base {
                init(v) {
                    this.v = v;
                }
            }
            class Derived < Base {}
            print Derived(7).v;
        "#;

        assert_eq!(output_of(source), ["7"]);
    }

    #[test]
    fn superclass_must_be_a_class() {
        assert_eq!(
            runtime_error_of("var NotAClass = 1;\nclass B < NotAClass {}"),
            "Superclass must be a class."
        );
    }

    #[test]
    fn globals_persist_across_runs() {
        let (mut lox, buffer) = session();

        lox.run("var a = 1; fun inc() { a = a + 1; }").unwrap();
        lox.run("inc(); print a;").unwrap();

        assert_eq!(buffer.contents(), "2\n");
    }

    #[test]
    fn session_recovers_after_runtime_error() {
        let (mut lox, buffer) = session();

        lox.run("var a = \"kept\";").unwrap();
        assert!(lox.run("{ var a = 1; print nope; }").is_err());
        lox.run("print a;").unwrap();

        assert_eq!(buffer.contents(), "kept\n");
    }

    #[test]
    fn repl_lines_evaluate_bare_expressions() {
        let (mut lox, buffer) = session();

        assert!(matches!(lox.run_line("var a = 40;"), Ok(None)));
        assert_eq!(lox.run_line("a + 2").unwrap(), Some(Value::Number(42.0)));
        assert!(matches!(lox.run_line("print a;"), Ok(None)));
        assert_eq!(
            lox.run_line("\"a\" + \"b\"").unwrap().map(|v| v.to_string()),
            Some("ab".to_string())
        );

        assert_eq!(buffer.contents(), "40\n");
    }

    #[test]
    fn repl_reports_real_syntax_errors() {
        let (mut lox, _) = session();

        let Err(error) = lox.run_line("var = 1;") else {
            panic!("expected a syntax error");
        };
        assert_eq!(
            error.diagnostics(),
            ["[line 1] Error at '=': Expected variable name."]
        );

        // The operand alone parses, but the line is still an error.
        let Err(error) = lox.run_line("* 2") else {
            panic!("expected a syntax error");
        };
        assert_eq!(
            error.diagnostics()[0],
            "[line 1] Error at '*': Missing left-hand operand."
        );
    }

    #[test]
    fn repl_closures_see_later_lines() {
        let (mut lox, buffer) = session();

        lox.run_line("fun show() { print later; }").unwrap();
        lox.run_line("var later = \"defined\";").unwrap();
        lox.run_line("show();").unwrap();

        assert_eq!(buffer.contents(), "defined\n");
    }
}
