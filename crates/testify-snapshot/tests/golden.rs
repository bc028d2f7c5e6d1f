//! Verifies checked-in golden snapshots in CI mode, so a missing or changed
//! entry fails instead of being recorded.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use testify_snapshot::{SnapshotConfig, SnapshotVerifier};

#[derive(Serialize)]
struct User {
    id: u32,
    name: String,
}

impl fmt::Display for User {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "User[id={}, name={}]", self.id, self.name)
    }
}

#[test]
fn checked_in_snapshots_match() -> anyhow::Result<()> {
    testify_telemetry::init_test_logging();

    let config = SnapshotConfig {
        snapshot_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/__snapshots__"),
        ci: true,
        ..SnapshotConfig::default()
    };
    let verifier = SnapshotVerifier::new(config, "golden")?;
    let user = User {
        id: 1,
        name: "John".to_string(),
    };

    let json = verifier.snapshotter("user_json");
    json.json().snapshot(&user)?;
    json.json()
        .with_scenario("masked")
        .with_masked_field("$[0].name")
        .snapshot(&user)?;

    verifier.snapshotter("user_plain").plain().snapshot(&user)?;
    verifier
        .snapshotter("user_base64")
        .base64()
        .snapshot(format!("{}|{}", user.id, user.name).as_bytes())?;

    assert_eq!(verifier.tests_run(), 3);
    verifier.validate_snapshots()?;
    Ok(())
}
