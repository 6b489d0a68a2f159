//! End-to-end tests: compile scripts, inspect diagnostics, price on paths.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use mcscript::prelude::*;
use mcscript::script::LogKind;
use std::sync::Arc;

fn valuation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 15).unwrap()
}

fn config() -> ScriptConfig {
    ScriptConfig::new(valuation_date())
}

fn compile(script: &[&str]) -> McScript {
    let spot: PayoffRef = Arc::new(Asset::new(1.0));
    McScript::new(&["S"], vec![spot], script, config())
        .unwrap_or_else(|e| panic!("compile {script:?}: {e}"))
}

fn flat_paths(n: usize) -> PathSet {
    PathSet::repeated(Arc::new(ConstantPath::new(100.0, 0.0)), n)
}

fn value(script: &McScript, name: &str) -> f64 {
    script.npv(&flat_paths(1), &[name]).unwrap()[0]
}

#[test]
fn fixed_payoff_is_exact_for_any_path_count() {
    let script = compile(&["payoff = 5"]);
    for n in [1, 2, 17, 1000] {
        assert_eq!(script.npv(&flat_paths(n), &["payoff"]).unwrap(), vec![5.0]);
    }
}

#[test]
fn sum_of_bound_names() {
    let script = compile(&["a = 2", "b = 3", "c = a + b", "payoff = c"]);
    let path = ConstantPath::new(100.0, 0.0);
    assert_eq!(script.at(&PathContext::new(&path)), 5.0);
}

#[test]
fn multiplication_binds_before_trailing_minus() {
    let script = compile(&["a = 2", "b = 3", "c = a * b - 1"]);
    assert_eq!(value(&script, "c"), 5.0);
    let script = compile(&["a = 2", "b = 3", "c = 1 - a * b"]);
    assert_eq!(value(&script, "c"), -5.0);
    let script = compile(&["c = 10 - 4 - 3"]);
    assert_eq!(value(&script, "c"), 3.0);
}

#[test]
fn if_then_else_truthiness() {
    let script = compile(&[
        "x = IfThenElse(1, 10, 20)",
        "y = IfThenElse(0, 10, 20)",
        "z = IfThenElse(-1, 10, 20)",
        "w = IfThenElse(S > 90 && S < 110, 1, 0)",
    ]);
    assert_eq!(value(&script, "x"), 10.0);
    assert_eq!(value(&script, "y"), 20.0);
    assert_eq!(value(&script, "z"), 20.0);
    assert_eq!(value(&script, "w"), 1.0);
}

#[test]
fn undefined_name_is_logged_and_skipped() {
    let script = compile(&["a = 1", "y = z + 1", "b = a"]);
    assert!(script.payoff("y").is_none());

    let errors: Vec<_> = script.log().errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, Some(1));
    assert!(errors[0].message.contains("'z'"));
    assert!(errors[0].to_string().starts_with("Error line 1:"));

    assert_eq!(value(&script, "b"), 1.0);
    assert_eq!(
        script.npv(&flat_paths(3), &["b", "y"]),
        Err(ScriptError::UnknownPayoff("y".to_string()))
    );
}

#[test]
fn date_tokens_become_year_fractions() {
    let script = compile(&["p = Pay(1, 15Jan2020)", "q = PayoffAt(S, 15Jan2021)"]);
    let times = script.observation_times(&["p"]).unwrap();
    assert_eq!(times.len(), 1);
    assert_relative_eq!(times[0], 365.0 / 365.0, epsilon = 1e-15);
    let times = script.observation_times(&["q"]).unwrap();
    assert_relative_eq!(times[1], 731.0 / 365.0, epsilon = 1e-15);
}

#[test]
fn malformed_dates_fail_their_line() {
    let script = compile(&[
        "ok = 1",
        "a = Pay(1, 15Xxx2020)",
        "b = Pay(1, 15Jan20)",
        "c = Pay(1, 1xJan2020)",
        "d = Pay(1, 15jan2020)",
    ]);
    for name in ["a", "b", "c", "d"] {
        assert!(script.payoff(name).is_none(), "{name} should not be bound");
    }
    assert_eq!(script.log().errors().count(), 4);
    let first = script.log().for_line(1).last().unwrap();
    assert_eq!(first.message, "cannot convert 15Xxx2020 to date.");
}

#[test]
fn overwrite_disabled_keeps_first_binding_on_every_run() {
    let lines = ["x = 1", "x = 2", "y = x"];
    let cfg = config().with_overwrite(false);
    let run = || McScript::new::<&str, _>(&[], vec![], &lines, cfg).unwrap();

    let first = run();
    let second = run();
    assert_eq!(first.log(), second.log());
    assert_eq!(value(&first, "x"), 1.0);
    assert_eq!(value(&first, "y"), 1.0);

    let errors: Vec<String> = first.log().errors().map(ToString::to_string).collect();
    assert_eq!(errors, vec!["Error line 1: Cannot replace 'x'"]);
}

#[test]
fn overwrite_enabled_replaces_binding() {
    let script = compile(&["x = 1", "x = 2"]);
    assert_eq!(value(&script, "x"), 2.0);
    let kinds: Vec<LogKind> = script.log().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![LogKind::Insert, LogKind::Insert, LogKind::Replace]);
}

#[test]
fn nested_functions_differ_between_dialects() {
    let primary = compile(&["a = 1", "b = 4", "c = 2", "x = Min(Max(a, b), c)"]);
    assert_eq!(primary.dialect(), Dialect::Primary);
    assert_eq!(value(&primary, "x"), 2.0);

    let legacy = compile(&["NonRecursive", "a = 1", "b = 4", "c = 2", "x = Min(Max(a, b), c)"]);
    assert_eq!(legacy.dialect(), Dialect::Legacy);
    assert!(legacy.payoff("x").is_none());
    assert_eq!(legacy.log().errors().count(), 1);
    assert_eq!(legacy.log().errors().next().unwrap().line, Some(4));
}

#[test]
fn legacy_dialect_prices_flat_scripts() {
    let script = compile(&[
        "NonRecursive",
        "K = 95",
        "d = S - K",
        "call = Max(d, 0)",
        "payoff = Pay(call, 1)",
    ]);
    assert_eq!(script.log().errors().count(), 0);
    assert_eq!(script.npv(&flat_paths(4), &["payoff"]).unwrap(), vec![5.0]);
}

#[test]
fn names_are_case_sensitive() {
    let one: PayoffRef = Arc::new(FixedAmount::new(1.0));
    let two: PayoffRef = Arc::new(FixedAmount::new(2.0));
    let script = McScript::new(&["X", "x"], vec![one, two], &["y = X + 10 * x"], config()).unwrap();
    assert_eq!(value(&script, "y"), 21.0);

    let script = compile(&["a = 1", "b = ifthenelse(a, 1, 2)", "c = A"]);
    assert!(script.payoff("b").is_none());
    assert!(script.payoff("c").is_none());
}

#[test]
fn result_selection() {
    let path = ConstantPath::new(100.0, 0.0);
    let ctx = PathContext::new(&path);

    let script = compile(&["payoff = 7", "later = 8"]);
    assert_eq!(script.at(&ctx), 7.0);

    let script = compile(&["a = 3", "b = 4"]);
    assert_eq!(script.at(&ctx), 4.0);

    // No script line compiles: the initial binding is the last write.
    let script = compile(&["bad = ?"]);
    assert_eq!(script.at(&ctx), 100.0);
}

#[test]
fn configuration_failures_abort_construction() {
    let one: PayoffRef = Arc::new(FixedAmount::new(1.0));
    assert!(matches!(
        McScript::new(&["a"], vec![], &["x = 1"], config()),
        Err(ScriptError::Configuration(_))
    ));
    assert!(matches!(
        McScript::new(
            &["a", "a"],
            vec![one.clone(), one],
            &["x = 1"],
            config().with_overwrite(false)
        ),
        Err(ScriptError::Configuration(_))
    ));
    assert!(matches!(
        McScript::new::<&str, _>(&[], vec![], &["x = y", ""], config()),
        Err(ScriptError::Configuration(_))
    ));
}

#[test]
fn expressions_record_parsed_lines() {
    let script = compile(&["a = S * 2", "", "b = (a"]);
    assert_eq!(script.expressions(), ["L0:Assignment[a](Mult(Identifier[S], Number[2]))"]);
}

#[test]
fn observation_times_are_a_sorted_union() {
    let script = compile(&[
        "a = Pay(S, 2.0)",
        "b = Pay(1, 0.5) + PayoffAt(S, 3)",
        "c = 5",
    ]);
    assert_eq!(script.observation_times(&["a", "b", "c"]).unwrap(), vec![0.5, 1.0, 2.0, 3.0]);
    assert_eq!(script.observation_times(&["c"]).unwrap(), Vec::<f64>::new());
    assert!(matches!(
        script.observation_times(&["a", "missing"]),
        Err(ScriptError::UnknownPayoff(name)) if name == "missing"
    ));
}

#[test]
fn cached_subresult_is_shared() {
    let script = compile(&["c = Cache(S * 2)", "d = c + c"]);
    assert_eq!(value(&script, "d"), 400.0);
}

#[test]
fn payoff_at_rescales_by_numeraire() {
    let rate = 0.05;
    let paths = PathSet::repeated(Arc::new(ConstantPath::new(100.0, rate)), 2);
    let script = compile(&["q = PayoffAt(S, 2.0)"]);
    let npv = script.npv(&paths, &["q"]).unwrap();
    assert_relative_eq!(npv[0], 100.0 * (-rate).exp(), epsilon = 1e-12);
}

#[test]
fn gbm_forward_and_call_are_close_to_closed_form() {
    let (spot, vol, rate) = (100.0, 0.2, 0.03);
    let sim = GbmSimulation::new(spot, vol, rate, 0.0, 1.0, 4, 20_000, 42).unwrap();
    let script = compile(&["fwd = S", "call = Max(S - 100, 0)"]);
    let npv = script.npv(&sim, &["fwd", "call"]).unwrap();

    // E[S_T] / N(T) = S_0 under the bank-account measure.
    assert_relative_eq!(npv[0], spot, epsilon = 0.6);
    // Black-Scholes ATM call, T = 1.
    assert_relative_eq!(npv[1], 9.4134, epsilon = 0.4);
}

#[test]
fn deeply_nested_line_is_rejected_and_script_continues() {
    let parens = format!("y = {}1{}", "(".repeat(10_000), ")".repeat(10_000));
    let minus = format!("z = {}1", "-".repeat(10_000));
    let sum = format!("w = 1{}", " + 1".repeat(10_000));
    let script = compile(&["a = 1", parens.as_str(), minus.as_str(), sum.as_str(), "b = 2"]);

    for name in ["y", "z", "w"] {
        assert!(script.payoff(name).is_none(), "{name} should not be bound");
    }
    let errors: Vec<_> = script.log().errors().collect();
    assert_eq!(errors.len(), 3);
    for (entry, line) in errors.iter().zip(1..) {
        assert_eq!(entry.line, Some(line));
        assert!(entry.message.contains("nested too deeply"), "{entry}");
    }
    assert_eq!(value(&script, "a"), 1.0);
    assert_eq!(value(&script, "b"), 2.0);
}

#[test]
fn signed_payment_time() {
    let script = compile(&["p = Pay(1, -0.5)", "q = Pay(1, 14Jan2019)"]);
    assert_eq!(script.observation_times(&["p"]).unwrap(), vec![-0.5]);
    assert_relative_eq!(
        script.observation_times(&["q"]).unwrap()[0],
        -1.0 / 365.0,
        epsilon = 1e-15
    );
}
