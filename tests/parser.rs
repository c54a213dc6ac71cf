#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use rox as lox;

    use lox::ast::{Expr, LiteralValue, Stmt};
    use lox::parser::Parser;
    use lox::scanner::scan_tokens;
    use lox::token::TokenType;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty(), "unexpected lex errors: {:?}", lex_errors);

        let mut parser = Parser::new(&tokens);
        let statements = parser.parse();
        let errors = parser
            .take_errors()
            .iter()
            .map(ToString::to_string)
            .collect();

        (statements, errors)
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        let (statements, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        statements
    }

    /// The lone expression statement `source` parses to.
    fn single_expression(source: &str) -> Stmt {
        let mut statements = parse_ok(source);
        assert_eq!(statements.len(), 1);

        match statements.pop() {
            Some(stmt @ Stmt::Expression(_)) => stmt,
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn binary_operators_fold_left() {
        // (1 - 2) - 3
        let stmt = single_expression("1 - 2 - 3;");
        let Stmt::Expression(Expr::Binary {
            left,
            operator,
            right,
        }) = &stmt
        else {
            panic!("expected binary");
        };

        assert_eq!(operator.token_type, TokenType::MINUS);
        assert_eq!(**right, Expr::Literal(LiteralValue::Number(3.0)));
        assert!(matches!(**left, Expr::Binary { .. }));
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        let stmt = single_expression("1 + 2 * 3;");
        let Stmt::Expression(Expr::Binary {
            left,
            operator,
            right,
        }) = &stmt
        else {
            panic!("expected binary");
        };

        assert_eq!(operator.token_type, TokenType::PLUS);
        assert_eq!(**left, Expr::Literal(LiteralValue::Number(1.0)));
        assert!(matches!(**right, Expr::Binary { ref operator, .. } if operator.lexeme == "*"));
    }

    #[test]
    fn assignment_is_right_associative() {
        let stmt = single_expression("a = b = 1;");
        let Stmt::Expression(Expr::Assign { name, value, .. }) = &stmt else {
            panic!("expected assignment");
        };

        assert_eq!(name.lexeme, "a");
        assert!(matches!(**value, Expr::Assign { ref name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn property_assignment_becomes_set() {
        let stmt = single_expression("a.b.c = 1;");
        let Stmt::Expression(Expr::Set { object, name, .. }) = &stmt else {
            panic!("expected set, got {:?}", stmt);
        };

        assert_eq!(name.lexeme, "c");
        assert!(matches!(**object, Expr::Get { ref name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn for_loop_desugars_into_while() {
        let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected the initializer block");
        };
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected a while loop");
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected body and increment in a block");
        };
        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn empty_for_clauses_loop_on_true() {
        let statements = parse_ok("for (;;) print 1;");

        let Stmt::While { condition, body } = &statements[0] else {
            panic!("expected a bare while loop, got {:?}", statements[0]);
        };
        assert_eq!(*condition, Expr::Literal(LiteralValue::True));
        assert!(matches!(body.as_ref(), Stmt::Print(_)));
    }

    #[test]
    fn class_with_superclass_and_methods() {
        let statements = parse_ok("class B < A { init(x) { this.x = x; } get() { return super.get(); } }");

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected a class");
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));

        let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
        assert_eq!(names, ["init", "get"]);
        assert_eq!(methods[0].params.len(), 1);
    }

    #[test]
    fn expression_ids_are_unique() {
        let (tokens, _) = scan_tokens("a = b + c; this;");
        let mut parser = Parser::with_first_id(&tokens, 10);
        parser.parse();

        // a, b, c, the assignment, and `this`
        assert_eq!(parser.next_id(), 15);
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let (_, errors) = parse("print 1");
        assert_eq!(errors, ["[line 1] Error at end: Expected ';' after value."]);
    }

    #[test]
    fn synchronization_reports_every_bad_declaration() {
        let (statements, errors) = parse("var = 1;\nprint 2;\nvar x = ;\nprint 3;");

        assert_eq!(
            errors,
            [
                "[line 1] Error at '=': Expected variable name.",
                "[line 3] Error at ';': Expected expression.",
            ]
        );
        // The good declarations in between still parse.
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn binary_operator_without_left_operand() {
        let (statements, errors) = parse("* 2;\nprint 1;");

        assert_eq!(
            errors,
            ["[line 1] Error at '*': Missing left-hand operand."]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn missing_left_operand_still_parses_the_right_one() {
        // `1 + 2` is taken at comparison level, then `!= 3` continues as usual.
        let (statements, errors) = parse("== 1 + 2 != 3;");

        assert_eq!(
            errors,
            ["[line 1] Error at '==': Missing left-hand operand."]
        );

        let Some(Stmt::Expression(Expr::Binary { left, operator, .. })) = statements.first() else {
            panic!("expected a binary expression, got {:?}", statements);
        };
        assert_eq!(operator.lexeme, "!=");
        assert!(matches!(**left, Expr::Binary { ref operator, .. } if operator.lexeme == "+"));
    }

    #[test]
    fn invalid_assignment_target_does_not_unwind() {
        let (statements, errors) = parse("1 + 2 = 3;\nprint 4;");

        assert_eq!(errors, ["[line 1] Error at '=': Invalid assignment target."]);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn too_many_parameters_is_non_fatal() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let (statements, errors) = parse(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 parameters."));
        assert!(matches!(&statements[0], Stmt::Function(f) if f.params.len() == 256));
    }

    #[test]
    fn too_many_arguments_is_non_fatal() {
        let arguments: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});\nprint 1;", arguments.join(", "));

        let (statements, errors) = parse(&source);

        assert_eq!(
            errors,
            ["[line 1] Error at '255': Can't have more than 255 arguments."]
        );
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            &statements[0],
            Stmt::Expression(Expr::Call { arguments, .. }) if arguments.len() == 256
        ));
    }

    #[test]
    fn super_requires_a_method_name() {
        let (_, errors) = parse("super;");
        assert_eq!(errors, ["[line 1] Error at ';': Expected '.' after 'super'."]);
    }

    #[test]
    fn parse_expression_accepts_only_a_lone_expression() {
        let (tokens, _) = scan_tokens("1 + 2");
        assert!(Parser::new(&tokens).parse_expression().is_some());

        let (tokens, _) = scan_tokens("1 + 2; 3");
        assert!(Parser::new(&tokens).parse_expression().is_none());
    }
}
