// tests/property_resolution.rs

mod common;

use std::collections::BTreeSet;

use conductor::config::Config;
use conductor::task::{parse_input, TaskError, TaskInput};
use proptest::prelude::*;

use crate::common::{names, resolver, ConfigBuilder};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{0,8}"
}

// Acyclic task graphs: task N may only reference tasks 0..N-1. Tasks
// without references bottom out in a control no-op.
fn acyclic_config_strategy(max_tasks: usize) -> impl Strategy<Value = (Config, usize)> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), num_tasks)
            .prop_map(move |raw_refs| {
                let mut builder = ConfigBuilder::new();
                for (i, potential) in raw_refs.into_iter().enumerate() {
                    let name = format!("task_{i}");
                    let refs: BTreeSet<usize> = if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|r| r % i).collect()
                    };
                    if refs.is_empty() {
                        builder = builder.alias(&name, "@cb noop");
                    } else {
                        let items: Vec<String> = refs.iter().map(|r| format!("task_{r}")).collect();
                        let items: Vec<&str> = items.iter().map(String::as_str).collect();
                        builder = builder.list(&name, &items);
                    }
                }
                (builder.build(), num_tasks)
            })
    })
}

proptest! {
    #[test]
    fn well_formed_names_round_trip(
        name in segment(),
        subs in proptest::collection::vec(segment(), 0..3),
        parallel in any::<bool>(),
    ) {
        let mut raw = name.clone();
        for sub in &subs {
            raw.push(':');
            raw.push_str(sub);
        }
        if parallel {
            raw.push_str("@p");
        }

        let parsed = parse_input(&raw);
        prop_assert!(parsed.is_ok(), "{raw:?} failed to parse: {parsed:?}");
        match parsed.unwrap() {
            TaskInput::Named(p) => {
                prop_assert_eq!(&p.task_name, &name);
                prop_assert_eq!(&p.sub_task_names, &subs);
                prop_assert_eq!(p.is_parallel(), parallel);
            }
            other => prop_assert!(false, "unexpected {other:?}"),
        }
    }

    #[test]
    fn names_with_inner_whitespace_never_parse(
        left in segment(),
        right in segment(),
    ) {
        let raw = format!("{left} {right}");
        let is_invalid_input = matches!(
            parse_input(&raw),
            Err(TaskError::InvalidTaskInput { .. })
        );
        prop_assert!(is_invalid_input);
    }

    #[test]
    fn acyclic_graphs_always_resolve((config, num_tasks) in acyclic_config_strategy(12)) {
        let resolver = resolver(config);
        let all: Vec<String> = (0..num_tasks).map(|i| format!("task_{i}")).collect();

        let resolution = resolver.resolve(&all);

        prop_assert!(resolution.is_valid(), "{:?}", resolution.errors());
        prop_assert_eq!(resolution.valid.len(), num_tasks);
    }

    #[test]
    fn rings_are_always_cycles(len in 1usize..8) {
        let mut builder = ConfigBuilder::new();
        for i in 0..len {
            builder = builder.alias(&format!("ring_{i}"), &format!("ring_{}", (i + 1) % len));
        }
        let resolver = resolver(builder.build());

        let resolution = resolver.resolve(&names(&["ring_0"]));

        prop_assert!(!resolution.is_valid());
        let cycle = resolution.errors().into_iter().find_map(|e| match e {
            TaskError::CircularReference { chain, .. } => Some(chain.clone()),
            _ => None,
        });
        prop_assert!(cycle.is_some());
        let cycle = cycle.unwrap_or_default();
        prop_assert_eq!(cycle.len(), len + 1);
        prop_assert_eq!(cycle.first(), cycle.last());
    }
}
