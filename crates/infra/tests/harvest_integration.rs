//! End-to-end harvests between two SQLite stores.
//!
//! Each test builds a source store in a temporary data directory, runs the
//! harvest service through the SQLite repositories, and inspects the
//! destination store the way a second process would.

mod support;

use harvester_core::ObservationDestination;
use harvester_domain::{HarvestError, HarvestMode, RunOptions};
use harvester_infra::HarvestStores;
use support::*;

fn incremental(batch_size: usize) -> RunOptions {
    RunOptions::new(HarvestMode::Incremental).with_batch_size(batch_size)
}

#[test]
fn incremental_harvest_copies_observations_and_planes() {
    let archive = Archive::new();
    for n in 1..=5 {
        archive.publish(n, 2);
    }

    let report = archive.run(incremental(2)).unwrap();

    assert_eq!(report.observations.found, 5);
    assert_eq!(report.observations.written, 5);
    assert_eq!(archive.destination_ids(), (1..=5).map(id).collect::<Vec<_>>());
    assert_eq!(archive.observation_checkpoint(), Some(cursor(5)));

    let destination = archive.destination();
    let checksum = destination.stored_checksum(id(3)).unwrap().unwrap();
    assert_eq!(checksum.len(), 64);
    assert_ne!(checksum, "source-3");
}

#[test]
fn second_run_without_changes_is_a_noop() {
    let archive = Archive::new();
    for n in 1..=3 {
        archive.publish(n, 1);
    }
    archive.run(incremental(10)).unwrap();

    let report = archive.run(incremental(10)).unwrap();

    assert_eq!(report.observations.found, 0);
    assert_eq!(archive.observation_checkpoint(), Some(cursor(3)));
    assert!(archive.skip_entries().is_empty());
}

#[test]
fn later_source_updates_are_picked_up() {
    let archive = Archive::new();
    archive.publish(1, 1);
    archive.publish(2, 1);
    archive.run(incremental(10)).unwrap();

    archive.publish(7, 3);
    let report = archive.run(incremental(10)).unwrap();

    assert_eq!(report.observations.found, 1);
    assert_eq!(archive.observation_checkpoint(), Some(cursor(7)));
    assert_eq!(archive.destination_plane_count(7), 3);
}

#[test]
fn malformed_record_is_quarantined_then_retried() {
    let archive = Archive::new();
    for n in 1..=4 {
        archive.publish(n, 1);
    }
    let mut broken = observation(3, 1);
    broken.observation.payload = "not json".to_string();
    archive.publish_record(&broken);

    let report = archive.run(incremental(10)).unwrap();

    assert_eq!(report.observations.failed, 1);
    assert_eq!(report.observations.written, 3);
    assert_eq!(archive.observation_checkpoint(), Some(cursor(2)));
    let entries = archive.skip_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].skip_id, id(3));
    assert!(archive.destination_ids().contains(&id(4)));

    archive.publish(3, 1);
    let retry = archive.run(RunOptions::new(HarvestMode::SkipRetry)).unwrap();

    assert_eq!(retry.observations.resolved, 1);
    assert!(archive.skip_entries().is_empty());
    assert_eq!(archive.observation_checkpoint(), Some(cursor(3)));
    assert!(archive.destination_ids().contains(&id(3)));

    let resumed = archive.run(incremental(10)).unwrap();
    assert_eq!(resumed.observations.unchanged, 1);
    assert_eq!(archive.observation_checkpoint(), Some(cursor(4)));
}

#[test]
fn deletions_are_replayed_before_observations() {
    let archive = Archive::new();
    for n in 1..=3 {
        archive.publish(n, 2);
    }
    archive.run(incremental(10)).unwrap();

    archive.retract(2, 50);
    let report = archive.run(incremental(10)).unwrap();

    assert_eq!(report.deletions.deleted, 1);
    assert_eq!(archive.destination_ids(), vec![id(1), id(3)]);
    assert_eq!(archive.deletion_checkpoint().map(|c| c.last_id), Some(id(2)));
    assert_eq!(archive.destination_plane_count(2), 0);
}

#[test]
fn init_skips_past_deletions() {
    let archive = Archive::new();
    archive.publish(1, 0);
    archive.publish(2, 0);
    archive.retract(1, 40);
    archive.retract(2, 60);

    let report = archive.run(incremental(10).with_init(true)).unwrap();

    assert_eq!(report.deletions.deleted, 0);
    let checkpoint = archive.deletion_checkpoint().unwrap();
    assert_eq!((checkpoint.last_modified, checkpoint.last_id), (at(60), id(2)));
}

#[test]
fn dry_run_does_not_create_the_destination() {
    let archive = Archive::new();
    archive.publish(1, 1);
    archive.publish(2, 1);

    assert!(!archive.stores(true).has_destination());
    let report = archive.run(incremental(10).with_dry_run(true)).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.observations.found, 2);
    assert_eq!(report.observations.written, 2);
    assert!(!archive.destination_exists());
}

#[test]
fn dry_run_leaves_existing_destination_untouched() {
    let archive = Archive::new();
    archive.publish(1, 1);
    archive.run(incremental(10)).unwrap();
    archive.publish(2, 1);
    archive.publish(3, 1);

    let report = archive.run(incremental(10).with_dry_run(true)).unwrap();

    assert_eq!(report.observations.found, 2);
    assert_eq!(report.observations.written, 2);
    assert_eq!(archive.destination_ids(), vec![id(1)]);
    assert_eq!(archive.observation_checkpoint(), Some(cursor(1)));
    assert!(archive.skip_entries().is_empty());
}

#[test]
fn full_harvest_reprocesses_everything_once() {
    let archive = Archive::new();
    for n in 1..=3 {
        archive.publish(n, 1);
    }
    archive.run(incremental(10)).unwrap();

    let report = archive.run(RunOptions::new(HarvestMode::Full).with_batch_size(2)).unwrap();

    assert_eq!(report.observations.found, 3);
    assert_eq!(report.observations.unchanged, 3);
    assert_eq!(archive.observation_checkpoint(), Some(cursor(3)));

    let next = archive.run(incremental(10)).unwrap();
    assert_eq!(next.observations.found, 0);
}

#[test]
fn max_date_bounds_the_harvest() {
    let archive = Archive::new();
    for n in 1..=5 {
        archive.publish(n, 0);
    }

    archive.run(incremental(10).with_max_date(Some(at(3)))).unwrap();

    assert_eq!(archive.destination_ids(), vec![id(1), id(2), id(3)]);
    assert_eq!(archive.observation_checkpoint(), Some(cursor(3)));
}

#[test]
fn recompute_repairs_stale_checksums() {
    let archive = Archive::new();
    archive.publish(1, 1);
    archive.publish(2, 1);
    archive.run(incremental(10)).unwrap();
    let original = archive.destination().stored_checksum(id(2)).unwrap();
    archive.destination().update_checksum(id(2), "stale").unwrap();

    let report = archive.run_recompute(RunOptions::new(HarvestMode::Recompute)).unwrap();

    assert_eq!(report.observations.written, 1);
    assert_eq!(report.observations.unchanged, 1);
    assert_eq!(archive.destination().stored_checksum(id(2)).unwrap(), original);
}

#[test]
fn missing_source_store_is_unavailable() {
    let archive = Archive::new();
    let absent = "elsewhere.caom.caom2".parse().unwrap();

    let result = HarvestStores::open(&absent, &archive.destination_coords, &archive.config, false);

    assert!(matches!(result, Err(HarvestError::StoreUnavailable(_))));
    assert!(!archive.data_dir().join("mirror").join("caom.db").exists());
}
