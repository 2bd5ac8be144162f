//! End-to-end batch runs against mock geocoding and place-search servers

use crate::common::{campaign_config, mount_happy_path};
use hive_scan::campaign::{run_campaign, StopReason};
use hive_scan::output::{output_filenames, CSV_HEADERS};
use hive_scan::state::{CursorStore, DedupLedger, CURSOR_FILE, LEDGER_FILE};
use hive_scan::storage::{open_checkpoint_store, CheckpointStore, RunStatus};
use hive_scan::LocationTarget;
use std::path::Path;
use tempfile::TempDir;
use wiremock::MockServer;

const LOCATIONS: &str = "location,radius_miles\n\"Northwood, NH\",10\n\"Dover, NH\",10\n";

fn write_locations(dir: &Path) {
    std::fs::write(dir.join("locations.csv"), LOCATIONS).unwrap();
}

fn ledger_lines(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("state").join(LEDGER_FILE))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_batch_writes_csv_and_advances_cursor() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let dir = TempDir::new().unwrap();
    write_locations(dir.path());
    let config = campaign_config(dir.path(), &server, 1, false);

    let summary = run_campaign(&config, "hash", false).await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::CountBudget);
    assert_eq!(summary.locations_processed, 1);
    assert_eq!(summary.new_records, 2);
    assert_eq!(summary.next_index, 1);

    let cursor = CursorStore::new(dir.path().join("state").join(CURSOR_FILE)).load(2);
    assert_eq!(cursor.next_index, 1);

    let run_dir = summary.output_dir.clone().unwrap();
    let (suppliers, retailers) = output_filenames(&LocationTarget::new("Northwood, NH", 10.0));

    let retailers = std::fs::read_to_string(run_dir.join(retailers)).unwrap();
    let mut lines = retailers.lines();
    assert_eq!(lines.next().unwrap(), CSV_HEADERS.join(","));
    let row = lines.next().unwrap();
    assert!(row.contains("Hannaford"));
    assert!(row.contains("445110"));
    assert!(row.contains("n_101"));

    let suppliers = std::fs::read_to_string(run_dir.join(suppliers)).unwrap();
    assert!(suppliers.contains("Granite State Produce Distributors"));
    assert!(suppliers.contains("424480"));
}

#[tokio::test]
async fn test_repeated_runs_never_emit_an_id_twice() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let dir = TempDir::new().unwrap();
    write_locations(dir.path());
    let config = campaign_config(dir.path(), &server, 2, false);

    let first = run_campaign(&config, "hash", false).await.unwrap();
    // Both locations see the same two establishments
    assert_eq!(first.new_records, 2);
    assert_eq!(first.duplicates_skipped, 2);
    assert_eq!(first.next_index, 0);

    let second = run_campaign(&config, "hash", false).await.unwrap();
    assert_eq!(second.new_records, 0);
    assert_eq!(second.duplicates_skipped, 4);

    let lines = ledger_lines(dir.path());
    assert_eq!(lines.len(), 2);
    let ledger = DedupLedger::open(dir.path().join("state").join(LEDGER_FILE)).unwrap();
    assert!(ledger.contains("n_101"));
    assert!(ledger.contains("w_202"));
}

#[tokio::test]
async fn test_fresh_resets_cursor_but_keeps_ledger() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let dir = TempDir::new().unwrap();
    write_locations(dir.path());
    let config = campaign_config(dir.path(), &server, 1, false);

    run_campaign(&config, "hash", false).await.unwrap();
    let summary = run_campaign(&config, "hash", true).await.unwrap();

    // Started again at 0, so the next start is 1, not 0
    assert_eq!(summary.next_index, 1);
    assert_eq!(summary.new_records, 0);
    assert_eq!(ledger_lines(dir.path()).len(), 2);
}

#[tokio::test]
async fn test_lost_ledger_is_rebuilt_from_checkpoint() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let dir = TempDir::new().unwrap();
    write_locations(dir.path());
    let config = campaign_config(dir.path(), &server, 1, true);

    run_campaign(&config, "hash-1", false).await.unwrap();
    std::fs::remove_file(dir.path().join("state").join(LEDGER_FILE)).unwrap();

    let summary = run_campaign(&config, "hash-2", false).await.unwrap();
    assert_eq!(summary.new_records, 0);
    assert_eq!(summary.ledger_size, 2);

    let store = open_checkpoint_store(&dir.path().join("checkpoint.db")).unwrap();
    assert_eq!(store.count_ledger().unwrap(), 2);

    let runs = store.latest_runs(5).unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.status == RunStatus::Completed));
    assert_eq!(runs[0].config_hash, "hash-2");
    assert_eq!(runs[0].counters.locations_processed, 1);
}

#[tokio::test]
async fn test_empty_location_list_is_no_work() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("locations.csv"), "location,radius_miles\n").unwrap();
    let config = campaign_config(dir.path(), &server, 5, false);

    let summary = run_campaign(&config, "hash", false).await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::NoWork);
    assert!(!dir.path().join("state").join(CURSOR_FILE).exists());
}

#[tokio::test]
async fn test_slash_in_location_does_not_stall_campaign() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("locations.csv"),
        "location,radius_miles\n\"Winston/Salem, NC\",10\n\"Dover, NH\",10\n",
    )
    .unwrap();
    let config = campaign_config(dir.path(), &server, 2, false);

    let first = run_campaign(&config, "hash", false).await.unwrap();
    assert_eq!(first.locations_processed, 2);
    assert_eq!(first.failed_count(), 0);
    assert_eq!(first.new_records, 2);
    assert_eq!(first.next_index, 0);

    let run_dir = first.output_dir.clone().unwrap();
    let (suppliers, retailers) = output_filenames(&LocationTarget::new("Winston/Salem, NC", 10.0));
    assert!(!suppliers.contains('/'));
    let retailers = std::fs::read_to_string(run_dir.join(retailers)).unwrap();
    assert!(retailers.contains("Hannaford"));

    let second = run_campaign(&config, "hash", false).await.unwrap();
    assert_eq!(second.locations_processed, 2);
    assert_eq!(second.new_records, 0);
    assert_eq!(second.next_index, 0);
}

#[tokio::test]
async fn test_location_with_only_known_ids_gets_header_only_files() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let dir = TempDir::new().unwrap();
    write_locations(dir.path());
    let config = campaign_config(dir.path(), &server, 2, false);

    let summary = run_campaign(&config, "hash", false).await.unwrap();
    let run_dir = summary.output_dir.clone().unwrap();

    // Dover comes second and only finds what Northwood already emitted
    let (suppliers, retailers) = output_filenames(&LocationTarget::new("Dover, NH", 10.0));
    let header = CSV_HEADERS.join(",");
    for name in [suppliers, retailers] {
        let contents = std::fs::read_to_string(run_dir.join(name)).unwrap();
        assert_eq!(contents.lines().collect::<Vec<_>>(), vec![header.as_str()]);
    }
}

#[tokio::test]
async fn test_torn_ledger_tail_is_dropped_and_run_continues() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let dir = TempDir::new().unwrap();
    write_locations(dir.path());
    let state_dir = dir.path().join("state");
    std::fs::create_dir_all(&state_dir).unwrap();
    std::fs::write(
        state_dir.join(LEDGER_FILE),
        "{\"provider_id\":\"n_101\"}\n{\"provider_id\":\"w_2",
    )
    .unwrap();
    let config = campaign_config(dir.path(), &server, 1, false);

    let summary = run_campaign(&config, "hash", false).await.unwrap();
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.duplicates_skipped, 1);

    let lines = ledger_lines(dir.path());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "{\"provider_id\":\"w_202\"}");
}
