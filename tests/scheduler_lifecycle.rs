// tests/scheduler_lifecycle.rs

use std::error::Error;

use taskchain::config::DeclarationSet;
use taskchain::dag::{PathStatus, RunReport, Scheduler, discover_paths};
use taskchain::registry::KindRegistry;
use taskchain::store::KvStore;
use taskchain_test_utils::builders::{DeclarationsBuilder, TaskBuilder};
use taskchain_test_utils::scripted::{Journal, registry};
use taskchain_test_utils::{init_tracing, read_file, write_file};

type TestResult = Result<(), Box<dyn Error>>;

fn step(name: &str, src: &str, target: &str) -> TaskBuilder {
    TaskBuilder::new("step", name).src(src).target(target)
}

fn run_scheduler(set: &DeclarationSet, registry: &KindRegistry) -> Result<RunReport, Box<dyn Error>> {
    let identity = set.identity();
    let mut store = KvStore::open(&identity.root, &identity.name)?;
    let paths = discover_paths(set, registry)?;
    Ok(Scheduler::new(registry, identity).run(paths, &mut store))
}

fn statuses(report: &RunReport) -> Vec<PathStatus> {
    report.entries.iter().map(|e| e.status.clone()).collect()
}

#[test]
fn chain_runs_oldest_first_and_materializes_targets() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("b", "mid.json", "out.json"))
        .task(step("a", "in.json", "mid.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(journal.runs(), vec!["a", "b"]);
    assert_eq!(
        journal.events(),
        vec![
            "pre step a", "run step a", "post step a", "pre step b", "run step b", "post step b"
        ]
    );
    assert_eq!(read_file(dir.path(), "out.json"), "in\na\nb\n");
    assert_eq!(statuses(&report), vec![PathStatus::Completed]);
    assert_eq!(report.discovered, 1);
    assert_eq!(report.executed, 2);
    assert_eq!(report.skipped, 0);
    Ok(())
}

#[test]
fn existing_targets_are_skipped() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    write_file(dir.path(), "mid.json", "already\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("a", "in.json", "mid.json"))
        .task(step("b", "mid.json", "out.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(journal.runs(), vec!["b"]);
    assert_eq!(read_file(dir.path(), "out.json"), "already\nb\n");
    assert_eq!(report.executed, 1);
    assert_eq!(report.skipped, 1);
    Ok(())
}

#[test]
fn failing_task_only_ends_its_own_path() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("a1", "in.json", "m1.json").param("outcome", "fail_run"))
        .task(step("a2", "m1.json", "o1.json"))
        .task(step("b1", "in.json", "o2.json"))
        .task(step("c1", "in.json", "m3.json").param("outcome", "fail_pre"))
        .task(step("c2", "m3.json", "o3.json"))
        .task(step("d1", "in.json", "o4.json").param("outcome", "error"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(journal.runs(), vec!["a1", "b1", "d1"]);
    assert!(!journal.events().iter().any(|e| e.ends_with(" a2") || e.ends_with(" c2")));
    assert!(dir.path().join("o2.json").is_file());

    let statuses = statuses(&report);
    assert_eq!(statuses.len(), 4);
    assert!(matches!(&statuses[0], PathStatus::Failed { task, .. } if task == "step a1"));
    assert_eq!(statuses[1], PathStatus::Completed);
    assert!(matches!(&statuses[2], PathStatus::Failed { task, reason } if task == "step c1" && reason.contains("pre-check")));
    assert!(matches!(&statuses[3], PathStatus::Failed { reason, .. } if reason.contains("scripted failure")));
    assert!(report.has_failures());
    assert_eq!(report.failures().count(), 3);
    Ok(())
}

#[test]
fn failing_post_check_stops_the_path() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("a", "in.json", "mid.json").param("outcome", "fail_post"))
        .task(step("b", "mid.json", "out.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(journal.runs(), vec!["a"]);
    assert!(matches!(&statuses(&report)[0], PathStatus::Failed { reason, .. } if reason.contains("post-check")));
    Ok(())
}

#[test]
fn waiting_path_is_retried_after_the_producing_path() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("waits", "in.json", "joined.json").param("depends_on", "made.json"))
        .task(step("makes", "in.json", "made.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(journal.runs(), vec!["makes", "waits"]);
    let statuses = statuses(&report);
    assert_eq!(statuses.len(), 3);
    assert!(matches!(&statuses[0], PathStatus::Deferred { waiting_for } if waiting_for.ends_with("made.json")));
    assert_eq!(statuses[1], PathStatus::Completed);
    assert_eq!(statuses[2], PathStatus::Completed);
    assert_eq!(report.discovered, 2);
    Ok(())
}

#[test]
fn chained_waits_are_retried_while_other_paths_make_progress() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("first", "in.json", "j1.json").param("depends_on", "b.json"))
        .task(step("second", "in.json", "b.json").param("depends_on", "c.json"))
        .task(step("third", "in.json", "c.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(journal.runs(), vec!["third", "second", "first"]);
    let statuses = statuses(&report);
    assert_eq!(statuses.len(), 6);
    assert!(matches!(&statuses[0], PathStatus::Deferred { waiting_for } if waiting_for.ends_with("b.json")));
    assert!(matches!(&statuses[1], PathStatus::Deferred { waiting_for } if waiting_for.ends_with("c.json")));
    assert_eq!(statuses[2], PathStatus::Completed);
    assert!(matches!(&statuses[3], PathStatus::Deferred { waiting_for } if waiting_for.ends_with("b.json")));
    assert_eq!(statuses[4], PathStatus::Completed);
    assert_eq!(statuses[5], PathStatus::Completed);
    assert!(dir.path().join("j1.json").is_file());
    Ok(())
}

#[test]
fn mutually_waiting_paths_are_abandoned_after_a_pass_without_progress() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("left", "in.json", "left.json").param("depends_on", "right.json"))
        .task(step("right", "in.json", "right.json").param("depends_on", "left.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert!(journal.runs().is_empty());
    let statuses = statuses(&report);
    assert_eq!(statuses.len(), 4);
    assert!(matches!(statuses[0], PathStatus::Deferred { .. }));
    assert!(matches!(statuses[1], PathStatus::Deferred { .. }));
    assert!(matches!(statuses[2], PathStatus::Abandoned { .. }));
    assert!(matches!(statuses[3], PathStatus::Abandoned { .. }));
    Ok(())
}

#[test]
fn waiting_path_is_abandoned_when_nothing_left_can_produce_the_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("waits", "in.json", "joined.json").param("depends_on", "made.json"))
        .task(step("makes", "in.json", "made.json").param("outcome", "fail_run"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(journal.runs(), vec!["makes"]);
    let statuses = statuses(&report);
    assert_eq!(statuses.len(), 3);
    assert!(matches!(statuses[0], PathStatus::Deferred { .. }));
    assert!(matches!(statuses[1], PathStatus::Failed { .. }));
    assert!(matches!(&statuses[2], PathStatus::Abandoned { waiting_for } if waiting_for.ends_with("made.json")));
    assert!(!dir.path().join("joined.json").exists());
    Ok(())
}

#[test]
fn injected_work_runs_oldest_identifier_first_then_the_original() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(
            TaskBuilder::new("origin", "snap")
                .target("snap.json")
                .list("inject", &["20180414", "20180413"]),
        )
        .task(step("shape", "snap.json", "shaped.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(
        journal.runs(),
        vec![
            "snap-20180413",
            "shape-20180413",
            "snap-20180414",
            "shape-20180414",
            "snap",
            "shape",
        ]
    );
    assert_eq!(
        read_file(dir.path(), "shaped20180413.json"),
        "snap-20180413\nshape-20180413\n"
    );
    assert!(dir.path().join("snap20180414.json").is_file());
    assert_eq!(read_file(dir.path(), "shaped.json"), "snap\nshape\n");

    let statuses = statuses(&report);
    assert_eq!(
        statuses[0],
        PathStatus::Injected {
            task: "origin snap".to_string(),
            count: 2
        }
    );
    assert_eq!(statuses.len(), 4);
    assert!(statuses[1..].iter().all(|s| *s == PathStatus::Completed));

    let injections = journal
        .events()
        .iter()
        .filter(|e| e.starts_with("inject "))
        .count();
    assert_eq!(injections, 2, "original asks again but gets nothing new");
    Ok(())
}

#[test]
fn injected_clones_keep_upstream_tasks_unchanged() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "in.json", "in\n");
    let journal = Journal::new();
    let set = DeclarationsBuilder::new(dir.path())
        .task(step("fetch", "in.json", "raw.json"))
        .task(step("split", "raw.json", "part.json").list("inject", &["2"]))
        .task(step("finish", "part.json", "done.json"))
        .build();

    let report = run_scheduler(&set, &registry(&journal))?;

    assert_eq!(
        journal.runs(),
        vec!["fetch", "split-2", "finish-2", "split", "finish"]
    );
    assert_eq!(
        report.entries[1].chain,
        vec!["step fetch", "step split-2", "step finish-2"]
    );
    assert_eq!(read_file(dir.path(), "part2.json"), "in\nfetch\nsplit-2\n");
    assert_eq!(
        read_file(dir.path(), "done2.json"),
        "in\nfetch\nsplit-2\nfinish-2\n"
    );
    assert_eq!(report.skipped, 2, "fetch is skipped by the clone and by the requeued original");
    Ok(())
}
