use super::*;
use pretty_assertions::assert_eq;
use supercel_ir::{BinaryOp, ExprKind, Literal, LogicalOp, UnaryOp};

fn parse_ok(source: &str) -> Expr {
    parse(source).unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"))
}

fn parse_err(source: &str) -> ParseError {
    match parse(source) {
        Ok(expr) => panic!("expected error for {source:?}, got {expr}"),
        Err(e) => e,
    }
}

#[test]
fn test_precedence_and_over_or() {
    let expr = parse_ok("a || b && c");
    match expr.kind {
        ExprKind::Logical {
            op: LogicalOp::Or,
            right,
            ..
        } => assert!(matches!(
            right.kind,
            ExprKind::Logical {
                op: LogicalOp::And,
                ..
            }
        )),
        other => panic!("expected ||, got {other:?}"),
    }
}

#[test]
fn test_precedence_arithmetic() {
    assert_eq!(parse_ok("1 + 2 * 3 - 4").to_string(), "1 + 2 * 3 - 4");
    let expr = parse_ok("1 + 2 * 3");
    match expr.kind {
        ExprKind::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            right.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        )),
        other => panic!("expected +, got {other:?}"),
    }
}

#[test]
fn test_left_associative_subtraction() {
    let expr = parse_ok("10 - 3 - 2");
    match expr.kind {
        ExprKind::Binary {
            op: BinaryOp::Sub,
            left,
            right,
        } => {
            assert!(matches!(left.kind, ExprKind::Binary { .. }));
            assert_eq!(right.kind, ExprKind::Literal(Literal::Int(2)));
        }
        other => panic!("expected -, got {other:?}"),
    }
}

#[test]
fn test_platform_call_is_plain_member_call() {
    let expr = parse_ok("platform.daysSinceEvent(\"x\")");
    let ExprKind::Call { callee, args } = expr.kind else {
        panic!("expected call");
    };
    assert_eq!(callee.as_rooted_member(), Some(("platform", "daysSinceEvent")));
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].kind, ExprKind::Literal(Literal::String("x".into())));
}

#[test]
fn test_member_chain_and_index() {
    let expr = parse_ok("user.tags[0].name");
    assert_eq!(expr.to_string(), "user.tags[0].name");
    assert_eq!(expr.span, Span::new(0, 17));
}

#[test]
fn test_unsigned_and_signed_literals() {
    assert_eq!(
        parse_ok("7u").kind,
        ExprKind::Literal(Literal::Uint(7))
    );
    assert_eq!(
        parse_ok("-9223372036854775808").kind,
        ExprKind::Literal(Literal::Int(i64::MIN))
    );
    assert_eq!(
        parse_ok("0x10").kind,
        ExprKind::Literal(Literal::Int(16))
    );
}

#[test]
fn test_int_literal_out_of_range() {
    let err = parse_err("9223372036854775808");
    assert!(err.message.contains("out of range"), "{}", err.message);
    let err = parse_err("-9223372036854775809");
    assert!(err.message.contains("out of range"), "{}", err.message);
}

#[test]
fn test_negation_of_non_literal_is_unary() {
    let expr = parse_ok("-x");
    assert!(matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
    assert_eq!(parse_ok("!!true").to_string(), "!!true");
}

#[test]
fn test_conditional_is_right_associative() {
    let expr = parse_ok("a ? b : c ? d : e");
    let ExprKind::Conditional { else_branch, .. } = expr.kind else {
        panic!("expected conditional");
    };
    assert!(matches!(else_branch.kind, ExprKind::Conditional { .. }));
}

#[test]
fn test_in_operator() {
    let expr = parse_ok("\"a\" in xs");
    assert!(matches!(
        expr.kind,
        ExprKind::Binary {
            op: BinaryOp::In,
            ..
        }
    ));
}

#[test]
fn test_collection_literals() {
    assert_eq!(parse_ok("[1, 2, 3,]").to_string(), "[1, 2, 3]");
    assert_eq!(parse_ok("[]").to_string(), "[]");
    assert_eq!(
        parse_ok("{\"a\": 1, \"b\": [true]}").to_string(),
        "{\"a\": 1, \"b\": [true]}"
    );
}

#[test]
fn test_grouping_is_kept() {
    let expr = parse_ok("(1 + 2) * 3");
    assert_eq!(expr.to_string(), "(1 + 2) * 3");
}

#[test]
fn test_empty_input_is_error() {
    let err = parse_err("");
    assert_eq!(err.position(), 0);
    assert_eq!(err.message, "expected expression, found end of input");
    assert_eq!(parse_err("   ").position(), 3);
}

#[test]
fn test_trailing_tokens_are_error() {
    let err = parse_err("1 2");
    assert_eq!(err.position(), 2);
    assert!(err.message.contains("after expression"));
}

#[test]
fn test_unclosed_paren() {
    let err = parse_err("(1 + 2");
    assert_eq!(err.message, "expected `)`, found end of input");
    assert_eq!(err.position(), 6);
}

#[test]
fn test_missing_member_name() {
    let err = parse_err("user.");
    assert_eq!(err.message, "expected identifier, found end of input");
}

#[test]
fn test_lex_errors_surface_as_syntax_errors() {
    let err = parse_err("a == #");
    assert_eq!(err.message, "unexpected character `#`");
    assert_eq!(err.span, Span::new(5, 6));

    let err = parse_err("\"unterminated");
    assert_eq!(err.message, "unterminated string literal");

    let err = parse_err(r#""bad \q escape""#);
    assert_eq!(err.message, "invalid escape sequence `\\q`");
}

#[test]
fn test_first_error_wins() {
    // The bad escape comes after the unclosed bracket.
    let err = parse_err("[1 2 \"\\q\"");
    assert_eq!(err.position(), 3);
}

#[test]
fn test_nesting_limit() {
    // Debug builds use large frames; give the recursion room.
    let handle = std::thread::Builder::new()
        .stack_size(32 * 1024 * 1024)
        .spawn(|| {
            let ok = format!("{}1{}", "(".repeat(100), ")".repeat(100));
            assert!(parse(&ok).is_ok());

            let n = MAX_NESTING_DEPTH + 1;
            let deep = format!("{}1{}", "(".repeat(n), ")".repeat(n));
            let err = parse_err(&deep);
            assert!(err.message.contains("nested too deeply"), "{}", err.message);

            let bangs = format!("{}true", "!".repeat(n));
            assert!(parse_err(&bangs).message.contains("nested too deeply"));
        })
        .unwrap();
    handle.join().unwrap();
}

#[test]
fn test_long_operator_chain_is_rejected() {
    let sum = format!("1{}", " + 1".repeat(50_000));
    let err = parse_err(&sum);
    assert!(err.message.contains("nested too deeply"), "{}", err.message);

    let mixed = format!("x{}", " && x || x".repeat(25_000));
    assert!(parse_err(&mixed).message.contains("nested too deeply"));
}

#[test]
fn test_long_postfix_chain_is_rejected() {
    let members = format!("x{}", ".a".repeat(50_000));
    let err = parse_err(&members);
    assert!(err.message.contains("nested too deeply"), "{}", err.message);

    let calls = format!("f{}", "()".repeat(50_000));
    assert!(parse_err(&calls).message.contains("nested too deeply"));

    let indexes = format!("xs{}", "[0]".repeat(50_000));
    assert!(parse_err(&indexes).message.contains("nested too deeply"));
}

#[test]
fn test_chain_at_height_limit() {
    // A chain of n terms has height n; the limit itself is accepted.
    let fits = format!("1{}", " + 1".repeat(MAX_NESTING_DEPTH / 2 - 1));
    assert_eq!(parse_ok(&fits).height(), MAX_NESTING_DEPTH / 2);

    let members = format!("x{}", ".a".repeat(MAX_NESTING_DEPTH - 1));
    assert_eq!(parse_ok(&members).height(), MAX_NESTING_DEPTH);

    let over = format!("x{}", ".a".repeat(MAX_NESTING_DEPTH));
    let err = parse_err(&over);
    // Reported at the `.` that crossed the limit.
    assert_eq!(
        usize::try_from(err.position()).unwrap(),
        1 + 2 * (MAX_NESTING_DEPTH - 1)
    );
}

#[test]
fn test_error_display() {
    let err = parse_err("1 +");
    assert_eq!(
        err.to_string(),
        "syntax error at offset 3: expected expression, found end of input"
    );
}
