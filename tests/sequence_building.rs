// tests/sequence_building.rs

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use conductor::config::TaskObject;
use conductor::errors::ConductorError;
use conductor::exec::TriggerContext;
use conductor::sequence::{leaves, SequenceBuilder, SequenceItem};
use conductor::task::Resolver;

use crate::common::tasks::delay_ok;
use crate::common::{init_tracing, names, resolver, ConfigBuilder, TestResult};

fn build(resolver: &Resolver, tasks: &[&str]) -> Result<Vec<SequenceItem>, ConductorError> {
    let resolution = resolver.resolve(&names(tasks));
    let mut all = resolution.valid.clone();
    all.extend(resolution.invalid.iter().cloned());
    let trigger = TriggerContext::command(Arc::clone(resolver.config()));
    SequenceBuilder::new(Arc::clone(resolver.adaptors()), trigger).build(&all)
}

#[test]
fn invalid_tasks_are_refused() -> TestResult {
    init_tracing();
    let resolver = resolver(ConfigBuilder::new().task_fn("ok", delay_ok(1)).build());

    match build(&resolver, &["ok", "missing"]) {
        Err(ConductorError::InvalidTasks(bad)) => assert_eq!(bad, vec!["missing".to_string()]),
        other => return Err(format!("unexpected result {other:?}").into()),
    }
    Ok(())
}

#[test]
fn groups_mirror_the_task_tree() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("a", delay_ok(1))
        .task_fn("b", delay_ok(1))
        .parallel("both", &["a", "b"])
        .list("all", &["both", "@cb noop"])
        .build();
    let resolver = resolver(config);

    let items = build(&resolver, &["all"])?;

    assert_eq!(items.len(), 1);
    let SequenceItem::SeriesGroup(all) = &items[0] else {
        return Err("expected a series group".into());
    };
    assert_eq!(all.name, "all");
    assert!(matches!(&all.items[0], SequenceItem::ParallelGroup(g) if g.name == "both"));
    assert!(matches!(&all.items[1], SequenceItem::Task(t) if t.runnable.describe() == "@cb noop"));

    let uids: Vec<usize> = leaves(&items).iter().map(|l| l.seq_uid).collect();
    assert_eq!(uids, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn several_subtasks_of_a_parallel_task_form_one_group() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("sass", delay_ok(1))
        .subtask("sass", "dev", toml::Table::new())
        .subtask("sass", "prod", toml::Table::new())
        .build();
    let resolver = resolver(config);

    let series = build(&resolver, &["sass:*"])?;
    let parallel = build(&resolver, &["sass:*@p"])?;
    let single = build(&resolver, &["sass:dev@p"])?;

    assert_eq!(series.len(), 2);
    assert!(series.iter().all(|i| matches!(i, SequenceItem::Task(_))));
    assert_eq!(parallel.len(), 1);
    assert!(matches!(&parallel[0], SequenceItem::ParallelGroup(g) if g.items.len() == 2));
    assert!(matches!(&single[0], SequenceItem::Task(t) if t.subtask.as_deref() == Some("dev")));
    Ok(())
}

#[test]
fn env_and_skip_are_inherited_by_descendants() -> TestResult {
    init_tracing();
    let outer = TaskObject {
        tasks: vec!["inner".into()],
        env: BTreeMap::from([
            ("MODE".to_string(), "outer".to_string()),
            ("KEEP".to_string(), "yes".to_string()),
        ]),
        skip: true,
        ..TaskObject::default()
    };
    let inner = TaskObject {
        tasks: vec!["leaf".into()],
        env: BTreeMap::from([("MODE".to_string(), "inner".to_string())]),
        ..TaskObject::default()
    };
    let config = ConfigBuilder::new()
        .task_fn("leaf", delay_ok(1))
        .object("outer", outer)
        .object("inner", inner)
        .build();
    let resolver = resolver(config);

    let items = build(&resolver, &["outer"])?;
    let leaf = leaves(&items)[0];

    assert_eq!(leaf.env.get("MODE").map(String::as_str), Some("inner"));
    assert_eq!(leaf.env.get("KEEP").map(String::as_str), Some("yes"));
    assert!(leaf.skipped);
    Ok(())
}
