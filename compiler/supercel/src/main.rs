//! supercel command-line driver.
//!
//! ```text
//! supercel parse <expression>
//! supercel eval <request.json> [--host <answers.json>] [--max-steps N] [--max-host-calls N]
//! ```
//!
//! `-` reads the expression or request from stdin. Exit status is 0 on
//! success, 1 when parsing or evaluation fails, 2 on usage errors.

use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use rustc_hash::FxHashMap;
use serde_json::Value as Json;
use supercel::{
    decode, parse_to_ast, render_parse_error, run_request, ContextError, EvalRequest, FnBridge,
    HostError, Response, Value,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    supercel::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("parse") => parse_command(&args[1..]),
        Some("eval") => eval_command(&args[1..]),
        Some("help" | "--help" | "-h") => {
            print_usage();
            ExitCode::SUCCESS
        }
        Some(other) => usage_error(&format!("unknown command `{other}`")),
        None => {
            print_usage();
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  supercel parse <expression>      Print the expression's AST as JSON");
    eprintln!("  supercel eval <request.json>     Evaluate a JSON request");
    eprintln!();
    eprintln!("Eval options:");
    eprintln!("  --host <answers.json>    Object of property name -> wire value returned");
    eprintln!("                           for every `platform.<name>(...)` call");
    eprintln!("  --max-steps <N>          Fail after N evaluation steps");
    eprintln!("  --max-host-calls <N>     Fail after N host calls");
    eprintln!();
    eprintln!("Use `-` to read the expression or request from stdin.");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=supercel_eval=debug) for tracing output.");
}

fn usage_error(message: &str) -> ExitCode {
    eprintln!("error: {message}");
    eprintln!();
    print_usage();
    ExitCode::from(EXIT_USAGE)
}

fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("cannot read stdin: {e}"))?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("cannot read `{path}`: {e}"))
    }
}

fn parse_command(args: &[String]) -> ExitCode {
    let [expression] = args else {
        return usage_error("`parse` takes exactly one expression");
    };
    let source = if expression == "-" {
        match read_input("-") {
            Ok(text) => text,
            Err(message) => return usage_error(&message),
        }
    } else {
        expression.clone()
    };

    match parse_to_ast(&source) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprint!(
                "{}",
                render_parse_error(&source, &err, std::io::stderr().is_terminal())
            );
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Options of the `eval` command.
#[derive(Debug, Default, PartialEq)]
struct EvalOptions {
    request_path: String,
    host_path: Option<String>,
    max_steps: Option<u64>,
    max_host_calls: Option<u32>,
}

fn parse_eval_options(args: &[String]) -> Result<EvalOptions, String> {
    let mut options = EvalOptions::default();
    let mut request_path = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        // Accept both `--flag value` and `--flag=value`.
        let (flag, inline_value) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = |name: &str| {
            inline_value
                .clone()
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| format!("`{name}` needs a value"))
        };
        match flag {
            "--host" => options.host_path = Some(value("--host")?),
            "--max-steps" => {
                let raw = value("--max-steps")?;
                options.max_steps =
                    Some(raw.parse().map_err(|_| format!("invalid --max-steps `{raw}`"))?);
            }
            "--max-host-calls" => {
                let raw = value("--max-host-calls")?;
                options.max_host_calls =
                    Some(raw.parse().map_err(|_| format!("invalid --max-host-calls `{raw}`"))?);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option `{flag}`")),
            path if request_path.is_none() => request_path = Some(path.to_string()),
            extra => return Err(format!("unexpected argument `{extra}`")),
        }
    }

    options.request_path = request_path.ok_or("`eval` needs a request file")?;
    Ok(options)
}

/// Read `{"name": <wire value>, ...}`.
fn load_answers(path: &str) -> Result<FxHashMap<String, Value>, String> {
    let text = read_input(path)?;
    let json: Json =
        serde_json::from_str(&text).map_err(|e| format!("`{path}` is not JSON: {e}"))?;
    let Json::Object(entries) = json else {
        return Err(format!("`{path}` must be an object of name -> wire value"));
    };
    entries
        .into_iter()
        .map(|(name, wire)| match decode(&wire) {
            Ok(value) => Ok((name, value)),
            Err(e) => Err(format!("`{path}`: answer for `{name}`: {e}")),
        })
        .collect()
}

fn eval_command(args: &[String]) -> ExitCode {
    let options = match parse_eval_options(args) {
        Ok(options) => options,
        Err(message) => return usage_error(&message),
    };
    let text = match read_input(&options.request_path) {
        Ok(text) => text,
        Err(message) => return usage_error(&message),
    };
    let answers = match options.host_path.as_deref().map(load_answers).transpose() {
        Ok(answers) => answers.unwrap_or_default(),
        Err(message) => return usage_error(&message),
    };

    let mut request = match EvalRequest::from_json(&text) {
        Ok(request) => request,
        Err(err) => return report(Err(err.into()), None),
    };
    if options.max_steps.is_some() {
        request.limits.max_steps = options.max_steps;
    }
    if options.max_host_calls.is_some() {
        request.limits.max_host_calls = options.max_host_calls;
    }

    let bridge = FnBridge::new(move |name: &str, _args: &[Value]| {
        tracing::debug!(property = name, "answering from host file");
        answers
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::Failed(format!("no answer for `platform.{name}`")))
    });
    let result = futures::executor::block_on(run_request(&request, &bridge));
    report(result, request.expression.text())
}

/// Print the JSON response; render syntax errors against the source too.
fn report(result: Result<Value, ContextError>, source: Option<&str>) -> ExitCode {
    if let (Err(ContextError::Syntax(err)), Some(source)) = (&result, source) {
        eprint!(
            "{}",
            render_parse_error(source, err, std::io::stderr().is_terminal())
        );
    }
    let response = Response::from_result(result);
    println!("{}", response.to_json());
    if response.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILURE)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn eval_options() {
        let options = parse_eval_options(&args(&[
            "req.json",
            "--host",
            "answers.json",
            "--max-steps=100",
            "--max-host-calls",
            "3",
        ]))
        .unwrap();
        assert_eq!(
            options,
            EvalOptions {
                request_path: "req.json".into(),
                host_path: Some("answers.json".into()),
                max_steps: Some(100),
                max_host_calls: Some(3),
            }
        );
    }

    #[test]
    fn eval_option_errors() {
        assert!(parse_eval_options(&args(&[])).is_err());
        assert!(parse_eval_options(&args(&["a.json", "b.json"])).is_err());
        assert!(parse_eval_options(&args(&["a.json", "--max-steps"])).is_err());
        assert!(parse_eval_options(&args(&["a.json", "--max-steps", "many"])).is_err());
        assert!(parse_eval_options(&args(&["a.json", "--verbose"])).is_err());
    }
}
