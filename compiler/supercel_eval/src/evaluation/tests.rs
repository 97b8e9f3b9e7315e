use super::*;
use pretty_assertions::assert_eq;
use supercel_parse::parse;

use crate::environment::{HostNamespace, PlatformDeclarations};
use crate::errors::EvalErrorKind;

fn env() -> Environment {
    let variables = [
        (
            "user".to_string(),
            Value::map([
                ("some_value", Value::Uint(7)),
                ("name", Value::string("ada")),
                ("age", Value::Int(36)),
                (
                    "tags",
                    Value::List(vec![Value::string("a"), Value::string("b")]),
                ),
            ]),
        ),
        ("score".to_string(), Value::Double(2.5)),
    ]
    .into_iter()
    .collect();
    let platform: PlatformDeclarations = [("daysSinceEvent", Vec::new())].into_iter().collect();
    let device: PlatformDeclarations = [("timeSinceEvent", Vec::new())].into_iter().collect();
    Environment::new(variables)
        .with_platform(platform)
        .with_device(device)
}

fn no_host(request: &HostRequest) -> Result<Value, HostError> {
    Err(HostError::failed(format!("unexpected call {}", request.name)))
}

fn eval(source: &str) -> EvalResult {
    let ast = parse(source).unwrap();
    let env = env();
    let mut evaluation = Evaluation::new(&ast, &env);
    evaluation.run_with(no_host)
}

fn eval_ok(source: &str) -> Value {
    match eval(source) {
        Ok(value) => value,
        Err(err) => panic!("`{source}` failed: {err}"),
    }
}

fn eval_code(source: &str) -> &'static str {
    match eval(source) {
        Ok(value) => panic!("`{source}` should fail, got {value}"),
        Err(err) => err.code(),
    }
}

/// Evaluate with a host that answers from `answers` and records the
/// requests it saw.
fn eval_recording(source: &str, answers: &[(&str, Value)]) -> (EvalResult, Vec<HostRequest>) {
    let ast = parse(source).unwrap();
    let env = env();
    let mut seen = Vec::new();
    let result = Evaluation::new(&ast, &env).run_with(|request| {
        seen.push(request.clone());
        answers
            .iter()
            .find(|(name, _)| *name == request.name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| HostError::failed("unknown property"))
    });
    (result, seen)
}

// Arithmetic

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval_ok("1 + 2 * 3"), Value::Int(7));
    assert_eq!(eval_ok("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(eval_ok("10 - 4 - 3"), Value::Int(3));
    assert_eq!(eval_ok("7 % 4"), Value::Int(3));
    assert_eq!(eval_ok("7u + 1u"), Value::Uint(8));
    assert_eq!(eval_ok("1.5 * 2.0"), Value::Double(3.0));
    assert_eq!(eval_ok("5.5 % 2.0"), Value::Double(1.5));
}

#[test]
fn concatenation() {
    assert_eq!(eval_ok(r#""ab" + "cd""#), Value::string("abcd"));
    assert_eq!(
        eval_ok("[1] + [2u]"),
        Value::List(vec![Value::Int(1), Value::Uint(2)])
    );
}

#[test]
fn no_numeric_promotion() {
    assert_eq!(eval_code("7u + 1"), "type_mismatch");
    assert_eq!(eval_code("1 + 1.0"), "type_mismatch");
    assert_eq!(eval_code("true + true"), "type_mismatch");
    assert_eq!(eval_code(r#""a" - "b""#), "type_mismatch");
}

#[test]
fn checked_overflow() {
    assert_eq!(eval_code("9223372036854775807 + 1"), "overflow");
    assert_eq!(eval_code("0u - 1u"), "overflow");
    assert_eq!(eval_code("-9223372036854775808 / -1"), "overflow");
    assert_eq!(eval_code("-(-9223372036854775808)"), "overflow");
    assert_eq!(eval_code("1e308 * 10.0"), "overflow");
    assert_eq!(eval_ok("-9223372036854775808"), Value::Int(i64::MIN));
}

#[test]
fn division_by_zero() {
    assert_eq!(eval_code("1 / 0"), "division_by_zero");
    assert_eq!(eval_code("1u % 0u"), "division_by_zero");
    assert_eq!(eval_code("1.0 / 0.0"), "division_by_zero");
    assert_eq!(eval_code("1.0 % 0.0"), "division_by_zero");
}

#[test]
fn unary_operators() {
    assert_eq!(eval_ok("!true"), Value::Bool(false));
    assert_eq!(eval_ok("-score"), Value::Double(-2.5));
    assert_eq!(eval_ok("-user.age"), Value::Int(-36));
    assert_eq!(eval_code("-7u"), "type_mismatch");
    assert_eq!(eval_code("-user.some_value"), "type_mismatch");
    assert_eq!(eval_code("!1"), "type_mismatch");
}

// Comparison

#[test]
fn strict_equality() {
    assert_eq!(eval_ok("null == null"), Value::Bool(true));
    assert_eq!(eval_ok("user.some_value == 7u"), Value::Bool(true));
    assert_eq!(eval_ok(r#""a" != "b""#), Value::Bool(true));
    assert_eq!(eval_ok("[1, [2]] == [1, [2]]"), Value::Bool(true));
    assert_eq!(eval_ok("[1] == [1, 2]"), Value::Bool(false));
    assert_eq!(eval_ok(r#"{"a": 1} == {"a": 1}"#), Value::Bool(true));
    assert_eq!(eval_ok(r#"{"a": 1} == {"b": 1}"#), Value::Bool(false));

    assert_eq!(eval_code("user.some_value == 7"), "type_mismatch");
    assert_eq!(eval_code("1 == 1.0"), "type_mismatch");
    assert_eq!(eval_code(r#"[1] == ["a"]"#), "type_mismatch");
    assert_eq!(eval_code("null == 0"), "type_mismatch");
}

#[test]
fn equality_checks_variants_past_length_and_key_differences() {
    assert_eq!(eval_code(r#"[1] == ["a", "b"]"#), "type_mismatch");
    assert_eq!(eval_code(r#"[2, 1] != [3, "x"]"#), "type_mismatch");
    assert_eq!(eval_code(r#"{"k": 1} == {"k": "v", "other": 2}"#), "type_mismatch");
    assert_eq!(eval_code(r#"{"a": 1, "k": 1} == {"b": 1, "k": 1u}"#), "type_mismatch");
    assert_eq!(eval_ok(r#"{"a": 1} == {"b": "x"}"#), Value::Bool(false));
    assert_eq!(eval_ok("[1, 2] == [1]"), Value::Bool(false));
}

#[test]
fn ordering() {
    assert_eq!(eval_ok(r#""abc" < "abd""#), Value::Bool(true));
    assert_eq!(eval_ok("2u >= 2u"), Value::Bool(true));
    assert_eq!(eval_ok("-0.0 < 0.0"), Value::Bool(false));
    assert_eq!(eval_code("1 < 2.0"), "type_mismatch");
    assert_eq!(eval_code("true < false"), "type_mismatch");
    assert_eq!(eval_code("[1] < [2]"), "type_mismatch");
}

#[test]
fn membership() {
    assert_eq!(eval_ok(r#""a" in user.tags"#), Value::Bool(true));
    assert_eq!(eval_ok(r#""z" in user.tags"#), Value::Bool(false));
    assert_eq!(eval_ok(r#""name" in user"#), Value::Bool(true));
    assert_eq!(eval_code(r#""a" in "abc""#), "type_mismatch");
    assert_eq!(eval_code(r#"1 in {"a": 1}"#), "type_mismatch");
    assert_eq!(eval_code("1 in user.tags"), "type_mismatch");
}

// Logic

#[test]
fn logical_operators_require_bools() {
    assert_eq!(eval_ok("true && false"), Value::Bool(false));
    assert_eq!(eval_ok("false || true"), Value::Bool(true));
    assert_eq!(eval_code("1 && true"), "type_mismatch");
    assert_eq!(eval_code("true && 1"), "type_mismatch");
    // Decided by the left operand; the right one is never looked at.
    assert_eq!(eval_ok("false && 1"), Value::Bool(false));
    assert_eq!(eval_ok("true || nobody"), Value::Bool(true));
}

#[test]
fn short_circuit_skips_host_calls() {
    for source in ["false && platform.f()", "true || platform.f()"] {
        let (result, seen) = eval_recording(source, &[("f", Value::Bool(true))]);
        assert!(result.is_ok(), "{source}");
        assert_eq!(seen, vec![], "{source}");
    }

    let (result, seen) = eval_recording("true && platform.f()", &[("f", Value::Bool(true))]);
    assert_eq!(result.unwrap(), Value::Bool(true));
    assert_eq!(seen.len(), 1);
}

#[test]
fn conditional_evaluates_one_branch() {
    assert_eq!(
        eval_ok(r#"user.some_value > 5u ? "big" : "small""#),
        Value::string("big")
    );
    let (result, seen) = eval_recording("true ? 1 : platform.f()", &[("f", Value::Int(2))]);
    assert_eq!(result.unwrap(), Value::Int(1));
    assert!(seen.is_empty());
    assert_eq!(eval_code("1 ? 2 : 3"), "type_mismatch");
}

// References

#[test]
fn variable_paths() {
    assert_eq!(eval_ok("user.some_value"), Value::Uint(7));
    assert_eq!(eval_ok("score"), Value::Double(2.5));
}

#[test]
fn undefined_reference_names_path() {
    let err = eval("user.missing_field").unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedReference {
            path: "user.missing_field".into()
        }
    );
    assert_eq!(eval("nobody").unwrap_err().to_string(), "undefined reference: nobody");
    assert_eq!(eval_code("user.name.first"), "undefined_reference");
}

#[test]
fn member_access_on_computed_values() {
    assert_eq!(eval_ok(r#"{"a": 1}.a"#), Value::Int(1));
    assert_eq!(eval_code(r#"{"a": 1}.b"#), "undefined_reference");
    assert_eq!(eval_code("(1).x"), "type_mismatch");
    assert_eq!(eval_code("user.tags[0].x"), "type_mismatch");
}

#[test]
fn indexing() {
    assert_eq!(eval_ok("user.tags[0]"), Value::string("a"));
    assert_eq!(eval_ok("user.tags[1u]"), Value::string("b"));
    assert_eq!(eval_ok(r#"user["name"]"#), Value::string("ada"));
    assert_eq!(
        eval("user.tags[2]").unwrap_err().kind,
        EvalErrorKind::IndexOutOfBounds { index: 2, len: 2 }
    );
    assert_eq!(eval_code("user.tags[-1]"), "index_out_of_bounds");
    assert_eq!(eval_code(r#"user["nope"]"#), "undefined_reference");
    assert_eq!(eval_code(r#"user.tags["x"]"#), "type_mismatch");
    assert_eq!(eval_code(r#""abc"[0]"#), "type_mismatch");
}

#[test]
fn collection_literals() {
    assert_eq!(
        eval_ok(r#"{"a": 1, "b": [true, null]}"#),
        Value::map([
            ("a", Value::Int(1)),
            ("b", Value::List(vec![Value::Bool(true), Value::Null])),
        ])
    );
    assert_eq!(eval_ok("[]"), Value::List(vec![]));
    assert_eq!(eval_code("{1: 2}"), "type_mismatch");
}

// Builtins

#[test]
fn builtin_functions_and_methods() {
    assert_eq!(eval_ok("size(user.tags)"), Value::Int(2));
    assert_eq!(eval_ok("user.name.size()"), Value::Int(3));
    assert_eq!(eval_ok(r#"user.name.startsWith("a")"#), Value::Bool(true));
    assert_eq!(eval_ok(r#"user.tags.contains("b")"#), Value::Bool(true));
    assert_eq!(eval_ok("int(user.some_value) + 1"), Value::Int(8));
    assert_eq!(eval_code("nope(1)"), "undefined_reference");
    assert_eq!(eval_code("user.name.shout()"), "undefined_reference");
    assert_eq!(eval_code("size(1, 2)"), "arity_error");
    assert_eq!(eval_code("(size)(1)"), "type_mismatch");
}

#[test]
fn maybe_recovers_only_missing_values() {
    assert_eq!(eval_ok(r#"maybe(user.missing, "fallback")"#), Value::string("fallback"));
    assert_eq!(eval_ok(r#"maybe(user.name, "fallback")"#), Value::string("ada"));
    assert_eq!(eval_code("maybe(1 / 0, 2)"), "division_by_zero");
    assert_eq!(eval_code("maybe(1)"), "arity_error");
    assert_eq!(eval_code("maybe(nobody, also_nobody)"), "undefined_reference");
}

#[test]
fn maybe_recovers_host_failures() {
    // `no_host` fails every call.
    assert_eq!(eval_ok("maybe(platform.f(), 5) == 5"), Value::Bool(true));
    assert_eq!(
        eval_ok("[1, maybe(2 + platform.f(), 5), 3]"),
        Value::List(vec![Value::Int(1), Value::Int(5), Value::Int(3)])
    );
    assert_eq!(eval_ok(r#"maybe(device.timeSinceEvent("e"), 0u)"#), Value::Uint(0));
    assert_eq!(eval_code("maybe(platform.f(), platform.g())"), "host_callback_error");
    // A host call that succeeds keeps its value.
    let (result, seen) = eval_recording("maybe(platform.f(), 5)", &[("f", Value::Int(1))]);
    assert_eq!(result.unwrap(), Value::Int(1));
    assert_eq!(seen.len(), 1);
}

#[test]
fn recovered_host_failure_resumes_with_fallback() {
    let ast = parse("maybe(platform.f(), 5) + 1").unwrap();
    let env = env();
    let mut evaluation = Evaluation::new(&ast, &env);
    assert!(matches!(evaluation.run().unwrap(), Step::Host(_)));
    let step = evaluation.resume(Err(HostError::TimedOut)).unwrap();
    assert_eq!(step, Step::Complete(Value::Int(6)));
    assert_eq!(evaluation.state(), EvalState::Completed);
}

#[test]
fn maybe_discards_partial_operands() {
    assert_eq!(
        eval_ok("[1, maybe(2 + user.nope.x, 5), 3]"),
        Value::List(vec![Value::Int(1), Value::Int(5), Value::Int(3)])
    );
    assert_eq!(eval_ok("maybe(maybe(a, b), 1) == 1"), Value::Bool(true));
}

// Host calls

#[test]
fn platform_call_end_to_end() {
    let (result, seen) = eval_recording(
        r#"platform.daysSinceEvent("test") == user.some_value"#,
        &[("daysSinceEvent", Value::Uint(7))],
    );
    assert_eq!(result.unwrap(), Value::Bool(true));
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].namespace, HostNamespace::Computed);
    assert_eq!(seen[0].name, "daysSinceEvent");
    assert_eq!(seen[0].args, vec![Value::string("test")]);
}

#[test]
fn host_namespaces_route_calls() {
    let (result, seen) = eval_recording(
        r#"computed.daysSinceEvent("test") + device.timeSinceEvent("test")"#,
        &[
            ("daysSinceEvent", Value::Uint(7)),
            ("timeSinceEvent", Value::Uint(3)),
        ],
    );
    assert_eq!(result.unwrap(), Value::Uint(10));
    let routed: Vec<(HostNamespace, &str)> = seen
        .iter()
        .map(|r| (r.namespace, r.name.as_str()))
        .collect();
    assert_eq!(
        routed,
        [
            (HostNamespace::Computed, "daysSinceEvent"),
            (HostNamespace::Device, "timeSinceEvent"),
        ]
    );
    assert_eq!(
        eval_ok("device"),
        Value::map([("timeSinceEvent", Value::List(vec![]))])
    );
    assert_eq!(eval_ok("computed"), eval_ok("platform"));
    assert_eq!(eval_code("device.timeSinceEvent"), "type_mismatch");
    assert_eq!(eval_code("computed.daysSinceEvent.x"), "type_mismatch");
}

#[test]
fn host_calls_run_left_to_right() {
    let (result, seen) = eval_recording(
        "platform.f(platform.a(), platform.b()) + platform.c()",
        &[
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
            ("c", Value::Int(3)),
            ("f", Value::Int(10)),
        ],
    );
    assert_eq!(result.unwrap(), Value::Int(13));
    let order: Vec<&str> = seen.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, ["a", "b", "f", "c"]);
    assert_eq!(seen[2].args, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn uncalled_platform_property_is_a_type_error() {
    let (result, seen) = eval_recording("platform.daysSinceEvent", &[]);
    assert_eq!(result.unwrap_err().code(), "type_mismatch");
    assert!(seen.is_empty());
    assert_eq!(
        eval_ok("platform"),
        Value::map([("daysSinceEvent", Value::List(vec![]))])
    );
}

#[test]
fn host_error_is_wrapped_with_call_span() {
    let source = "1 + platform.broken()";
    let ast = parse(source).unwrap();
    let ExprKind::Binary { right, .. } = &ast.kind else {
        panic!("expected binary, got {ast}");
    };
    let env = env();
    let err = Evaluation::new(&ast, &env)
        .run_with(|_| Err(HostError::TimedOut))
        .unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::HostCallback {
            namespace: HostNamespace::Computed,
            name: "broken".into(),
            cause: HostError::TimedOut
        }
    );
    assert_eq!(err.span, Some(right.span));
}

#[test]
fn operator_errors_carry_node_span() {
    let ast = parse("1 + (2 / 0)").unwrap();
    let ExprKind::Binary { right, .. } = &ast.kind else {
        panic!("expected binary");
    };
    let ExprKind::Grouping(inner) = &right.kind else {
        panic!("expected grouping");
    };
    let env = env();
    let err = Evaluation::new(&ast, &env).run_with(no_host).unwrap_err();
    assert_eq!(err.span, Some(inner.span));
}

// State machine

#[test]
fn suspend_and_resume() {
    let ast = parse("platform.f(1) + 1").unwrap();
    let env = env();
    let mut evaluation = Evaluation::new(&ast, &env);

    let Step::Host(request) = evaluation.run().unwrap() else {
        panic!("expected a host request");
    };
    assert_eq!(request.name, "f");
    assert_eq!(request.args, vec![Value::Int(1)]);
    assert_eq!(evaluation.state(), EvalState::AwaitingHost);

    let step = evaluation.resume(Ok(Value::Int(41))).unwrap();
    assert_eq!(step, Step::Complete(Value::Int(42)));
    assert_eq!(evaluation.state(), EvalState::Completed);
    assert_eq!(evaluation.host_calls(), 1);

    assert_eq!(evaluation.run().unwrap_err().code(), "invalid_state");
    assert_eq!(
        evaluation.resume(Ok(Value::Null)).unwrap_err().code(),
        "invalid_state"
    );
}

#[test]
fn resume_before_suspension_is_refused() {
    let ast = parse("1").unwrap();
    let env = env();
    let mut evaluation = Evaluation::new(&ast, &env);
    assert_eq!(
        evaluation.resume(Ok(Value::Null)).unwrap_err().code(),
        "invalid_state"
    );
    assert_eq!(evaluation.state(), EvalState::Running);
    assert_eq!(evaluation.run().unwrap(), Step::Complete(Value::Int(1)));
}

#[test]
fn cancel_while_awaiting_host() {
    let ast = parse("platform.f() && platform.g()").unwrap();
    let env = env();
    let mut evaluation = Evaluation::new(&ast, &env);
    assert!(matches!(evaluation.run().unwrap(), Step::Host(_)));

    evaluation.cancel();
    assert_eq!(evaluation.state(), EvalState::Cancelled);

    let err = evaluation.resume(Ok(Value::Bool(true))).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Cancelled);
    assert_eq!(evaluation.state(), EvalState::Cancelled);
    assert_eq!(evaluation.run().unwrap_err().kind, EvalErrorKind::Cancelled);
}

#[test]
fn failed_evaluation_stays_failed() {
    let ast = parse("platform.f()").unwrap();
    let env = env();
    let mut evaluation = Evaluation::new(&ast, &env);
    assert!(matches!(evaluation.run().unwrap(), Step::Host(_)));
    let err = evaluation
        .resume(Err(HostError::failed("boom")))
        .unwrap_err();
    assert_eq!(err.code(), "host_callback_error");
    assert_eq!(evaluation.state(), EvalState::Failed);
    evaluation.cancel();
    assert_eq!(evaluation.state(), EvalState::Failed);
}

// Limits

#[test]
fn step_limit() {
    let ast = parse("1 + 2 + 3").unwrap();
    let env = env();
    let err = Evaluation::new(&ast, &env)
        .with_limits(EvalLimits::default().with_max_steps(2))
        .run_with(no_host)
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::StepLimitExceeded { limit: 2 });

    let mut evaluation =
        Evaluation::new(&ast, &env).with_limits(EvalLimits::default().with_max_steps(5));
    assert_eq!(evaluation.run_with(no_host).unwrap(), Value::Int(6));
    assert_eq!(evaluation.steps(), 5);
}

#[test]
fn host_call_limit() {
    let ast = parse("platform.a() + platform.b()").unwrap();
    let env = env();
    let mut calls = 0;
    let err = Evaluation::new(&ast, &env)
        .with_limits(EvalLimits::default().with_max_host_calls(1))
        .run_with(|_| {
            calls += 1;
            Ok(Value::Int(1))
        })
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::HostCallLimitExceeded { limit: 1 });
    assert_eq!(calls, 1);
}

#[test]
fn deterministic_results_and_requests() {
    let source = r#"platform.f(user.name) + size(user.tags) > 3 ? "yes" : "no""#;
    let answers = [("f", Value::Int(2))];
    let first = eval_recording(source, &answers);
    let second = eval_recording(source, &answers);
    assert_eq!(first, second);
    assert_eq!(first.0.unwrap(), Value::string("yes"));
}
