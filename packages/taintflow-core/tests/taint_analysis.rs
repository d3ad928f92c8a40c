// End-to-end taint propagation over the reference IR: marks enter via
// source rules, survive assignments, helpers and analyzable callees, and
// are reported by sink rules.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use taintflow_config::RuleSet;
use taintflow_core::simple_ir::{
    elem, field, local, static_field, string, CallSite, MethodBuilder, SimpleProgram,
};
use taintflow_core::{Manager, RuleSetProvider, SingletonUnitResolver};

const SOURCE_ENTRY: &str = r#"{
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
}"#;

const SINK_ENTRY: &str = r#"{
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
}"#;

fn provider(extra_entries: &[&str]) -> RuleSetProvider {
    let mut entries = vec![SOURCE_ENTRY, SINK_ENTRY];
    entries.extend_from_slice(extra_entries);
    let json = format!("[{}]", entries.join(","));
    RuleSetProvider::new(RuleSet::from_json(&json).unwrap())
}

fn run_taint(program: &SimpleProgram, config: &RuleSetProvider) -> Vec<String> {
    let mut manager = Manager::taint(program, program, config, &SingletonUnitResolver);
    manager
        .analyze(&[Arc::from("main")], None)
        .unwrap()
        .into_iter()
        .map(|finding| {
            format!(
                "{}#{}: {}",
                finding.method, finding.sink.statement.index, finding.message
            )
        })
        .collect()
}

#[test]
fn test_source_to_sink_is_reported() {
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .call(CallSite::new("sink").arg(local("x")))
            .ret_void(),
    );
    let findings = run_taint(&program, &provider(&[]));
    assert_eq!(findings, vec!["main#1: untrusted data reaches sink"]);
}

#[test]
fn test_mark_travels_through_assignment_chain() {
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .assign(local("y"), local("x"))
            .assign(local("z"), local("y"))
            .call(CallSite::new("sink").arg(local("z")))
            .ret_void(),
    );
    let findings = run_taint(&program, &provider(&[]));
    assert_eq!(findings, vec!["main#3: untrusted data reaches sink"]);
}

#[test]
fn test_overwritten_local_is_clean() {
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .assign(local("x"), local("clean"))
            .call(CallSite::new("sink").arg(local("x")))
            .ret_void(),
    );
    let findings = run_taint(&program, &provider(&[]));
    assert_eq!(findings, Vec::<String>::new());
}

#[test]
fn test_array_element_overwrite_keeps_array_tainted() {
    // Element accessors are index-insensitive: storing a clean value into
    // one cell must not clear the mark the array picked up earlier.
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .assign(elem(local("a")), local("x"))
            .assign(elem(local("a")), local("clean"))
            .assign(local("y"), elem(local("a")))
            .call(CallSite::new("sink").arg(local("y")))
            .ret_void(),
    );
    let findings = run_taint(&program, &provider(&[]));
    assert_eq!(findings, vec!["main#4: untrusted data reaches sink"]);
}

#[test]
fn test_assignment_aliases_field_under_both_names() {
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(field(local("x"), "f"), CallSite::new("source"))
            .assign(local("y"), local("x"))
            .call(CallSite::new("sink").arg(field(local("x"), "f")))
            .call(CallSite::new("sink").arg(field(local("y"), "f")))
            .ret_void(),
    );
    let mut findings = run_taint(&program, &provider(&[]));
    findings.sort();
    assert_eq!(
        findings,
        vec![
            "main#2: untrusted data reaches sink",
            "main#3: untrusted data reaches sink",
        ]
    );
}

#[test]
fn test_cleaner_rule_removes_mark() {
    let cleaner = r#"{
        "function": { "kind": "Name", "name": "sanitize" },
        "rules": [
            {
                "kind": "Cleaner",
                "condition": {
                    "kind": "ContainsMark",
                    "position": { "kind": "Argument", "index": 0 },
                    "mark": "UNTRUSTED"
                },
                "actions": [
                    {
                        "kind": "RemoveAllMarks",
                        "position": { "kind": "Argument", "index": 0 }
                    }
                ]
            }
        ]
    }"#;
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .call(CallSite::new("sanitize").arg(local("x")))
            .call(CallSite::new("sink").arg(local("x")))
            .ret_void(),
    );
    let findings = run_taint(&program, &provider(&[cleaner]));
    assert_eq!(findings, Vec::<String>::new());
}

#[test]
fn test_pass_through_rule_copies_mark_to_result() {
    let pass_through = r#"{
        "function": { "kind": "Name", "name": "transform" },
        "rules": [
            {
                "kind": "PassThrough",
                "condition": { "kind": "ConstantTrue" },
                "actions": [
                    {
                        "kind": "CopyAllMarks",
                        "from": { "kind": "Argument", "index": 0 },
                        "to": { "kind": "Result" }
                    }
                ]
            }
        ]
    }"#;
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .assign_call(local("y"), CallSite::new("transform").arg(local("x")))
            .call(CallSite::new("sink").arg(local("y")))
            .ret_void(),
    );
    let findings = run_taint(&program, &provider(&[pass_through]));
    assert_eq!(findings, vec!["main#2: untrusted data reaches sink"]);
}

#[test]
fn test_sink_condition_filters_on_constant_argument() {
    let exec_sink = r#"{
        "function": { "kind": "Name", "name": "run" },
        "rules": [
            {
                "kind": "MethodSink",
                "condition": {
                    "kind": "And",
                    "args": [
                        {
                            "kind": "ContainsMark",
                            "position": { "kind": "Argument", "index": 0 },
                            "mark": "UNTRUSTED"
                        },
                        {
                            "kind": "ConstantEq",
                            "position": { "kind": "Argument", "index": 1 },
                            "value": { "kind": "Str", "value": "exec" }
                        }
                    ]
                },
                "note": "untrusted exec"
            }
        ]
    }"#;
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .call(CallSite::new("run").arg(local("x")).arg(string("log")))
            .call(CallSite::new("run").arg(local("x")).arg(string("exec")))
            .ret_void(),
    );
    let findings = run_taint(&program, &provider(&[exec_sink]));
    assert_eq!(findings, vec!["main#2: untrusted exec"]);
}

#[test]
fn test_string_concat_taints_destination_and_keeps_source() {
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .assign_call(
                local("z"),
                CallSite::new("strcat")
                    .arg(local("x"))
                    .arg(string("!"))
                    .concat(),
            )
            .call(CallSite::new("sink").arg(local("z")))
            .call(CallSite::new("sink").arg(local("x")))
            .ret_void(),
    );
    let mut findings = run_taint(&program, &provider(&[]));
    findings.sort();
    assert_eq!(
        findings,
        vec![
            "main#2: untrusted data reaches sink",
            "main#3: untrusted data reaches sink",
        ]
    );
}

#[test]
fn test_mark_flows_through_analyzable_callee() {
    let program = SimpleProgram::new()
        .with(MethodBuilder::new("id").param("p").ret(local("p")))
        .with(
            MethodBuilder::new("main")
                .assign_call(local("x"), CallSite::new("source"))
                .assign_call(local("y"), CallSite::new("id").arg(local("x")))
                .call(CallSite::new("sink").arg(local("y")))
                .ret_void(),
        );
    let findings = run_taint(&program, &provider(&[]));
    assert_eq!(findings, vec!["main#2: untrusted data reaches sink"]);
}

#[test]
fn test_static_field_carries_mark_out_of_callee() {
    let program = SimpleProgram::new()
        .with(
            MethodBuilder::new("stash")
                .param("p")
                .assign(static_field("G"), local("p"))
                .ret_void(),
        )
        .with(
            MethodBuilder::new("main")
                .assign_call(local("x"), CallSite::new("source"))
                .call(CallSite::new("stash").arg(local("x")))
                .assign(local("y"), static_field("G"))
                .call(CallSite::new("sink").arg(local("y")))
                .ret_void(),
        );
    let findings = run_taint(&program, &provider(&[]));
    assert_eq!(findings, vec!["main#3: untrusted data reaches sink"]);
}

#[test]
fn test_sink_rule_carries_metadata() {
    let program = SimpleProgram::new().with(
        MethodBuilder::new("main")
            .assign_call(local("x"), CallSite::new("source"))
            .call(CallSite::new("sink").arg(local("x")))
            .ret_void(),
    );
    let config = provider(&[]);
    let mut manager = Manager::taint(&program, &program, &config, &SingletonUnitResolver);
    let findings = manager.analyze(&[Arc::from("main")], None).unwrap();
    assert_eq!(findings.len(), 1);
    let rule = findings[0].rule.as_ref().unwrap();
    assert_eq!(rule.note, "untrusted data reaches sink");
}
