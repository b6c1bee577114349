// tests/path_properties.rs

use std::collections::HashSet;

use proptest::prelude::*;
use proptest::sample::Index;
use taskchain::dag::discover_paths;
use taskchain_test_utils::builders::{DeclarationsBuilder, TaskBuilder};
use taskchain_test_utils::scripted::{Journal, registry};

// Strategy for a forest of trees, declared in random order.
//
// `parents[i]` is the node whose target node `i` consumes (always an earlier
// node), or `None` for a root reading an input file. Several children may
// share a parent, so ancestors fan out to more than one terminal.
fn forest_strategy() -> impl Strategy<Value = (Vec<Option<usize>>, Vec<usize>)> {
    proptest::collection::vec(proptest::option::weighted(0.75, any::<Index>()), 1..12)
        .prop_map(|picks| {
            picks
                .into_iter()
                .enumerate()
                .map(|(node, pick)| match pick {
                    Some(index) if node > 0 => Some(index.index(node)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .prop_flat_map(|parents| {
            let order: Vec<usize> = (0..parents.len()).collect();
            (Just(parents), Just(order).prop_shuffle())
        })
}

fn source(parents: &[Option<usize>], node: usize) -> String {
    match parents[node] {
        Some(parent) => format!("n{parent}.json"),
        None => format!("in{node}.json"),
    }
}

/// Names along the way from the root down to `node`.
fn lineage(parents: &[Option<usize>], node: usize) -> Vec<String> {
    let mut chain = vec![format!("step n{node}")];
    let mut current = node;
    while let Some(parent) = parents[current] {
        chain.push(format!("step n{parent}"));
        current = parent;
    }
    chain.reverse();
    chain
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn one_path_per_terminal_following_the_lineage((parents, order) in forest_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = DeclarationsBuilder::new(dir.path());
        for &node in &order {
            builder = builder.task(
                TaskBuilder::new("step", &format!("n{node}"))
                    .src(&source(&parents, node))
                    .target(&format!("n{node}.json")),
            );
        }
        let set = builder.build();

        let paths = discover_paths(&set, &registry(&Journal::new())).unwrap();

        let terminals: Vec<usize> = order
            .iter()
            .copied()
            .filter(|node| !parents.contains(&Some(*node)))
            .collect();
        prop_assert_eq!(paths.len(), terminals.len());

        let mut covered = HashSet::new();
        for (path, &terminal) in paths.iter().zip(&terminals) {
            prop_assert_eq!(path.ids(), lineage(&parents, terminal));
            for pair in path.steps().windows(2) {
                prop_assert_eq!(pair[1].src.as_deref(), Some(pair[0].target.as_str()));
            }
            let first = &path.steps()[0];
            prop_assert!(!set.is_declared_target(first.src.as_deref().unwrap()));
            covered.extend(path.ids());
        }
        prop_assert_eq!(covered.len(), parents.len(), "every declaration lies on some path");
    }
}
