// Manager behavior across analysis units: cross-unit summary exchange,
// fixpoint memoization, unit-less methods and the timeout escape hatch.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use taintflow_config::{RuleSet, TaintMark};
use taintflow_core::simple_ir::{local, CallSite, MethodBuilder, SimpleProgram};
use taintflow_core::{
    AccessPath, FnUnitResolver, Manager, RuleSetProvider, SingletonUnitResolver, TaintFact,
    Tainted, UnitId,
};

const RULES: &str = r#"[
    {
        "function": { "kind": "Name", "name": "source" },
        "rules": [
            {
                "kind": "MethodSource",
                "condition": { "kind": "ConstantTrue" },
                "actions": [
                    {
                        "kind": "AssignMark",
                        "position": { "kind": "Result" },
                        "mark": "UNTRUSTED"
                    }
                ]
            }
        ]
    },
    {
        "function": { "kind": "Name", "name": "sink" },
        "rules": [
            {
                "kind": "MethodSink",
                "condition": {
                    "kind": "ContainsMark",
                    "position": { "kind": "Argument", "index": 0 },
                    "mark": "UNTRUSTED"
                },
                "note": "untrusted data reaches sink"
            }
        ]
    }
]"#;

fn provider() -> RuleSetProvider {
    RuleSetProvider::new(RuleSet::from_json(RULES).unwrap())
}

fn app_and_lib_program() -> SimpleProgram {
    SimpleProgram::new()
        .with(MethodBuilder::new("lib.id").param("p").ret(local("p")))
        .with(
            MethodBuilder::new("app.main")
                .assign_call(local("x"), CallSite::new("source"))
                .assign_call(local("y"), CallSite::new("lib.id").arg(local("x")))
                .call(CallSite::new("sink").arg(local("y")))
                .ret_void(),
        )
}

fn by_prefix() -> FnUnitResolver<impl Fn(&Arc<str>) -> UnitId + Send + Sync> {
    FnUnitResolver(|method: &Arc<str>| match method.split('.').next() {
        Some("app") => UnitId::named("app"),
        Some("lib") => UnitId::named("lib"),
        _ => UnitId::Unknown,
    })
}

#[test]
fn test_mark_crosses_unit_boundary_through_summary() {
    let program = app_and_lib_program();
    let config = provider();
    let resolver = by_prefix();
    let mut manager = Manager::taint(&program, &program, &config, &resolver);
    let findings = manager.analyze(&[Arc::from("app.main")], None).unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].method.as_ref(), "app.main");
    assert_eq!(findings[0].sink.statement.index, 2);

    // Both units ran, and the callee published a summary.
    assert!(manager.path_edge_count(&UnitId::named("app")).unwrap() > 0);
    assert!(manager.path_edge_count(&UnitId::named("lib")).unwrap() > 0);
    assert!(!manager.summaries_for(&Arc::from("lib.id")).is_empty());
}

#[test]
fn test_callee_fixpoint_runs_once_per_entry_fact() {
    let program = SimpleProgram::new()
        .with(MethodBuilder::new("id").param("p").ret(local("p")))
        .with(
            MethodBuilder::new("main")
                .assign_call(local("x"), CallSite::new("source"))
                .assign_call(local("a"), CallSite::new("id").arg(local("x")))
                .assign_call(local("b"), CallSite::new("id").arg(local("x")))
                .call(CallSite::new("sink").arg(local("b")))
                .ret_void(),
        );
    let config = provider();
    let mut manager = Manager::taint(&program, &program, &config, &SingletonUnitResolver);
    let findings = manager.analyze(&[Arc::from("main")], None).unwrap();
    assert_eq!(findings.len(), 1);

    let entry_fact = TaintFact::Tainted(Tainted::new(
        AccessPath::from_base(local("p")),
        TaintMark::new("UNTRUSTED"),
    ));
    assert_eq!(manager.fixpoint_count(&Arc::from("id"), &entry_fact), 1);
    assert_eq!(manager.fixpoint_count(&Arc::from("id"), &TaintFact::Zero), 1);
}

#[test]
fn test_unit_less_callee_is_not_entered() {
    // `helper` is analyzable but resolves to no unit, so the engine never
    // follows the call and the mark does not come back out of it.
    let program = SimpleProgram::new()
        .with(MethodBuilder::new("helper").param("p").ret(local("p")))
        .with(
            MethodBuilder::new("app.main")
                .assign_call(local("x"), CallSite::new("source"))
                .assign_call(local("y"), CallSite::new("helper").arg(local("x")))
                .call(CallSite::new("sink").arg(local("y")))
                .ret_void(),
        );
    let config = provider();
    let resolver = by_prefix();
    let mut manager = Manager::taint(&program, &program, &config, &resolver);
    let findings = manager.analyze(&[Arc::from("app.main")], None).unwrap();
    assert_eq!(findings.len(), 0);
    assert_eq!(manager.path_edge_count(&UnitId::Unknown), None);
}

#[test]
fn test_unknown_seed_is_skipped() {
    let program = app_and_lib_program();
    let config = provider();
    let resolver = by_prefix();
    let mut manager = Manager::taint(&program, &program, &config, &resolver);
    let findings = manager.analyze(&[Arc::from("unseen")], None).unwrap();
    assert_eq!(findings.len(), 0);
    assert_eq!(manager.total_path_edges(), 0);
}

#[test]
fn test_expired_timeout_returns_partial_results() {
    let program = app_and_lib_program();
    let config = provider();
    let resolver = by_prefix();
    let mut manager = Manager::taint(&program, &program, &config, &resolver);
    let findings = manager
        .analyze(&[Arc::from("app.main")], Some(Duration::ZERO))
        .unwrap();
    // The deadline was already over when analysis began; nothing was
    // explored, and that is a valid partial result.
    assert_eq!(findings.len(), 0);
}

#[test]
fn test_generous_timeout_still_completes() {
    let program = app_and_lib_program();
    let config = provider();
    let resolver = by_prefix();
    let mut manager = Manager::taint(&program, &program, &config, &resolver);
    let findings = manager
        .analyze(&[Arc::from("app.main")], Some(Duration::from_secs(60)))
        .unwrap();
    assert_eq!(findings.len(), 1);
}
