//! Record, compare, update and orphan handling against temporary golden files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::thread;

use anyhow::bail;
use serde::Serialize;
use serde_json::json;
use testify_snapshot::{SnapshotConfig, SnapshotError, SnapshotVerifier};

const SUITE: &str = "workflow::suite";

#[derive(Serialize)]
struct Account {
    id: u32,
    email: &'static str,
    password: &'static str,
    tags: HashSet<&'static str>,
    manager: Option<&'static str>,
}

fn account(tags: &[&'static str]) -> Account {
    Account {
        id: 7,
        email: "jane@example.com",
        password: "hunter2",
        tags: tags.iter().copied().collect(),
        manager: None,
    }
}

fn config(dir: &Path) -> SnapshotConfig {
    testify_telemetry::init_test_logging();
    SnapshotConfig {
        snapshot_dir: dir.to_path_buf(),
        ..SnapshotConfig::default()
    }
}

fn snap_file(dir: &Path) -> std::path::PathBuf {
    dir.join("workflow.suite.snap")
}

#[test]
fn missing_snapshot_is_recorded_then_matched() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let first_run = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    first_run
        .snapshotter("account")
        .json()
        .with_masked_field("$..password")
        .snapshot(&account(&["b", "a"]))?;

    let recorded = fs::read_to_string(snap_file(dir.path()))?;
    assert_eq!(
        recorded,
        "workflow.suite.account=[\n  {\n    \"email\" : \"jane@example.com\",\n    \"id\" : 7,\n    \"password\" : \"***MASKED***\",\n    \"tags\" : [\n      \"a\",\n      \"b\"\n    ]\n  }\n]\n"
    );

    let second_run = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    second_run
        .snapshotter("account")
        .json()
        .with_masked_field("$..password")
        .snapshot(&account(&["a", "b"]))?;
    second_run.validate_snapshots()?;
    Ok(())
}

#[test]
fn mismatch_carries_both_bodies() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    SnapshotVerifier::new(config(dir.path()), SUITE)?
        .snapshotter("value")
        .json()
        .snapshot(&json!({"a": 1}))?;

    let rerun = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    match rerun.snapshotter("value").json().snapshot(&json!({"a": 2})) {
        Err(SnapshotError::SnapshotMismatch {
            identifier,
            expected,
            actual,
        }) => {
            assert_eq!(identifier, "workflow.suite.value");
            assert_eq!(expected, "[\n  {\n    \"a\" : 1\n  }\n]");
            assert_eq!(actual, "[\n  {\n    \"a\" : 2\n  }\n]");
        }
        other => bail!("expected a mismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn update_filter_overwrites_selected_snapshots() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let recording = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    recording.snapshotter("counter").plain().snapshot(&1)?;
    recording.snapshotter("other").plain().snapshot(&1)?;

    let unrelated_filter = SnapshotConfig {
        update_snapshot: Some("another.suite".to_string()),
        ..config(dir.path())
    };
    let blocked = SnapshotVerifier::new(unrelated_filter, SUITE)?;
    assert!(matches!(
        blocked.snapshotter("counter").plain().snapshot(&2),
        Err(SnapshotError::SnapshotMismatch { .. })
    ));

    let prefix_filter = SnapshotConfig {
        update_snapshot: Some("workflow.suite.counter".to_string()),
        ..config(dir.path())
    };
    let updating = SnapshotVerifier::new(prefix_filter, SUITE)?;
    updating.snapshotter("counter").plain().snapshot(&2)?;
    assert!(matches!(
        updating.snapshotter("other").plain().snapshot(&2),
        Err(SnapshotError::SnapshotMismatch { .. })
    ));

    assert_eq!(
        fs::read_to_string(snap_file(dir.path()))?,
        "workflow.suite.counter=[\n2\n]\n\n\nworkflow.suite.other=[\n1\n]\n"
    );
    Ok(())
}

#[test]
fn ci_mode_rejects_missing_snapshots() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let ci = SnapshotConfig {
        ci: true,
        ..config(dir.path())
    };
    let verifier = SnapshotVerifier::new(ci, SUITE)?;

    match verifier.snapshotter("fresh").base64().snapshot(b"payload") {
        Err(SnapshotError::SnapshotMissing { identifier, path }) => {
            assert_eq!(identifier, "workflow.suite.fresh");
            assert_eq!(path, snap_file(dir.path()));
        }
        other => bail!("expected a missing snapshot, got {other:?}"),
    }
    assert!(!snap_file(dir.path()).exists());
    Ok(())
}

#[test]
fn identifiers_are_unique_per_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let verifier = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    let snapshotter = verifier.snapshotter("scenarios");

    snapshotter.json().with_scenario("empty").snapshot(&Vec::<u8>::new())?;
    snapshotter.json().with_scenario("full").snapshot(&vec![3, 1, 2])?;
    match snapshotter.json().with_scenario("empty").snapshot(&Vec::<u8>::new()) {
        Err(SnapshotError::DuplicateSnapshot { identifier }) => {
            assert_eq!(identifier, "workflow.suite.scenarios[empty]");
        }
        other => bail!("expected a duplicate snapshot, got {other:?}"),
    }

    let recorded = fs::read_to_string(snap_file(dir.path()))?;
    assert_eq!(
        recorded,
        "workflow.suite.scenarios[empty]=[\n  [\n    \n  ]\n]\n\n\nworkflow.suite.scenarios[full]=[\n  [\n    1,\n    2,\n    3\n  ]\n]\n"
    );
    Ok(())
}

#[test]
fn orphans_fail_only_when_several_tests_ran() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let recording = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    recording.snapshotter("kept").plain().snapshot("kept")?;
    recording.snapshotter("dropped").plain().snapshot("dropped")?;
    recording.validate_snapshots()?;

    let single_test = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    single_test.snapshotter("kept").plain().snapshot("kept")?;
    single_test.validate_snapshots()?;

    let several_tests = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    several_tests.snapshotter("kept").plain().snapshot("kept")?;
    several_tests.snapshotter("added").plain().snapshot("added")?;
    match several_tests.validate_snapshots() {
        Err(SnapshotError::OrphanedSnapshots { identifiers, path }) => {
            assert_eq!(identifiers, vec!["workflow.suite.dropped".to_string()]);
            assert_eq!(path, snap_file(dir.path()));
        }
        other => bail!("expected orphaned snapshots, got {other:?}"),
    }

    let tolerant = SnapshotVerifier::new(
        SnapshotConfig {
            fail_on_orphans: false,
            ..config(dir.path())
        },
        SUITE,
    )?;
    tolerant.snapshotter("kept").plain().snapshot("kept")?;
    tolerant.snapshotter("added").plain().snapshot("added")?;
    tolerant.validate_snapshots()?;
    Ok(())
}

#[test]
fn invalid_mask_paths_never_touch_the_golden_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let verifier = SnapshotVerifier::new(config(dir.path()), SUITE)?;

    let result = verifier
        .snapshotter("masked")
        .json()
        .with_masked_fields(["$..password", "$[?(@.id)]"])
        .snapshot(&account(&[]));
    match result {
        Err(err @ SnapshotError::InvalidMaskPath { .. }) => {
            assert_eq!(
                err.to_string(),
                "snapshot serialization failed: invalid mask path"
            );
        }
        other => bail!("expected an invalid mask path, got {other:?}"),
    }
    assert!(!snap_file(dir.path()).exists());
    Ok(())
}

#[test]
fn configuration_file_selects_the_snapshot_directory() -> anyhow::Result<()> {
    testify_telemetry::init_test_logging();
    let root = tempfile::tempdir()?;
    fs::write(
        root.path().join("snapshot.yaml"),
        "snapshot_dir: golden\nfail_on_orphans: false\n",
    )?;

    let config = SnapshotConfig::load(root.path(), |_| None)?;
    let verifier = SnapshotVerifier::new(config, SUITE)?;
    verifier.snapshotter("located").plain().snapshot(&true)?;

    assert!(root.path().join("golden").join("workflow.suite.snap").exists());
    assert!(!verifier.config().fail_on_orphans);
    Ok(())
}

#[test]
fn plain_bodies_with_blank_lines_reverify_after_reload() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let texts = [
        ("paragraphs", "intro\n\n\nkey=value"),
        ("trailing", "line\n\n"),
        ("backslash", "\\"),
    ];

    let first_run = SnapshotVerifier::new(config(dir.path()), SUITE)?;
    for (test, text) in texts {
        first_run.snapshotter(test).plain().snapshot(&text)?;
    }
    let recorded = fs::read_to_string(snap_file(dir.path()))?;
    assert_eq!(
        recorded,
        "workflow.suite.backslash=[\n\\\\\n]\n\n\n\
         workflow.suite.paragraphs=[\nintro\n\\\n\\\nkey=value\n]\n\n\n\
         workflow.suite.trailing=[\nline\n\\\n\\\n]\n"
    );

    let ci = SnapshotConfig {
        ci: true,
        ..config(dir.path())
    };
    let second_run = SnapshotVerifier::new(ci, SUITE)?;
    for (test, text) in texts {
        second_run.snapshotter(test).plain().snapshot(&text)?;
    }
    second_run.validate_snapshots()?;
    Ok(())
}

#[test]
fn parallel_tests_share_one_verifier() -> anyhow::Result<()> {
    const WORKERS: u32 = 8;
    let dir = tempfile::tempdir()?;
    let verifier = SnapshotVerifier::new(config(dir.path()), SUITE)?;

    let (distinct, contended) = thread::scope(|scope| {
        let distinct: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let verifier = &verifier;
                scope.spawn(move || {
                    verifier
                        .snapshotter(format!("worker_{worker}"))
                        .json()
                        .snapshot(&json!({ "worker": worker }))
                })
            })
            .collect();
        let contended: Vec<_> = (0..WORKERS)
            .map(|_| {
                let verifier = &verifier;
                scope.spawn(move || verifier.snapshotter("shared").plain().snapshot(&"same body"))
            })
            .collect();
        (
            distinct.into_iter().map(thread::ScopedJoinHandle::join).collect::<Vec<_>>(),
            contended.into_iter().map(thread::ScopedJoinHandle::join).collect::<Vec<_>>(),
        )
    });

    for outcome in distinct {
        match outcome {
            Ok(result) => result?,
            Err(_) => bail!("snapshot worker panicked"),
        }
    }
    let mut recorded = 0;
    let mut duplicates = 0;
    for outcome in contended {
        match outcome {
            Ok(Ok(())) => recorded += 1,
            Ok(Err(SnapshotError::DuplicateSnapshot { identifier })) => {
                assert_eq!(identifier, "workflow.suite.shared");
                duplicates += 1;
            }
            Ok(Err(other)) => bail!("expected a duplicate snapshot, got {other:?}"),
            Err(_) => bail!("snapshot worker panicked"),
        }
    }
    assert_eq!(recorded, 1);
    assert_eq!(duplicates, WORKERS - 1);
    assert_eq!(verifier.tests_run(), usize::try_from(WORKERS)? + 1);

    let ci = SnapshotConfig {
        ci: true,
        ..config(dir.path())
    };
    let reloaded = SnapshotVerifier::new(ci, SUITE)?;
    for worker in 0..WORKERS {
        reloaded
            .snapshotter(format!("worker_{worker}"))
            .json()
            .snapshot(&json!({ "worker": worker }))?;
    }
    reloaded.snapshotter("shared").plain().snapshot(&"same body")?;
    reloaded.validate_snapshots()?;
    Ok(())
}
