//! Scenario tests for the novelty core: matching, key derivation, per-entity
//! seen sets, and the snapshot gate, driven through `process_snapshot`.
//!
//! No I/O except temp-dir state files.

use chrono::Utc;
use warnwatch_common::{DocumentSnapshot, WatchConfig};
use warnwatch_scout::identity::derive_key;
use warnwatch_scout::matcher::{matches, score};
use warnwatch_scout::novelty::detect_new;
use warnwatch_scout::pipeline::process_snapshot;
use warnwatch_scout::record_filter::filter_records;
use warnwatch_scout::store::{NoveltyState, StateStore};
use warnwatch_scout::testing::{text_table, warn_table};

// ---------------------------------------------------------------------------
// Acme Corp end to end
// ---------------------------------------------------------------------------

#[test]
fn acme_row_matches_and_derives_expected_key() {
    let table = warn_table(&[["ACME CORPORATION", "2024-01-01", "2024-03-01"]]);

    assert!(score("ACME CORPORATION", "Acme Corp") >= 85);

    let matched = filter_records(&table, "Acme Corp", 85);
    assert_eq!(matched.len(), 1);
    assert_eq!(derive_key(&matched[0]), "2024-01-01|2024-03-01|ACME CORPORATION");
}

#[test]
fn second_run_against_updated_seen_set_finds_nothing() {
    let table = warn_table(&[
        ["Acme Corp", "2024-01-01", "2024-03-01"],
        ["Acme Corp", "2024-02-01", "2024-04-01"],
    ]);
    let matched = filter_records(&table, "Acme", 85);

    let first = detect_new(&matched, &Default::default());
    assert_eq!(first.new_records.len(), 2);

    let second = detect_new(&matched, &first.seen);
    assert!(second.new_records.is_empty());
}

#[test]
fn new_row_in_later_report_is_the_only_alert() {
    let cfg = WatchConfig::for_targets(["Acme"]);
    let mut state = NoveltyState::default();

    let v1 = warn_table(&[["Acme", "2024-01-01", "2024-03-01"]]);
    let snap1 = DocumentSnapshot::new("u", b"v1".to_vec());
    let r1 = process_snapshot(&cfg, &mut state, &snap1, Utc::now(), |_| Ok(v1.clone())).unwrap();
    assert_eq!(r1.new_count("Acme"), 1);

    let v2 = warn_table(&[
        ["Acme", "2024-01-01", "2024-03-01"],
        ["Acme", "2024-05-01", "2024-07-01"],
    ]);
    let snap2 = DocumentSnapshot::new("u", b"v2".to_vec());
    let r2 = process_snapshot(&cfg, &mut state, &snap2, Utc::now(), |_| Ok(v2.clone())).unwrap();

    assert_eq!(r2.new_count("Acme"), 1);
    let alert = r2.batch.for_entity("Acme").unwrap();
    assert_eq!(
        alert.notices[0].get("Notice Date").unwrap().to_string(),
        "2024-05-01"
    );
}

// ---------------------------------------------------------------------------
// Snapshot gate
// ---------------------------------------------------------------------------

#[test]
fn identical_hash_processes_nothing_and_only_moves_last_check() {
    let cfg = WatchConfig::for_targets(["Acme"]);
    let table = warn_table(&[["Acme", "2024-01-01", "2024-03-01"]]);
    let snap = DocumentSnapshot::new("u", b"same bytes".to_vec());

    let mut state = NoveltyState::default();
    let first_at = Utc::now();
    process_snapshot(&cfg, &mut state, &snap, first_at, |_| Ok(table.clone())).unwrap();
    let after_first = state.clone();

    let second_at = first_at + chrono::Duration::hours(1);
    let mut parsed = false;
    let report = process_snapshot(&cfg, &mut state, &snap, second_at, |_| {
        parsed = true;
        Ok(table.clone())
    })
    .unwrap();

    assert!(report.skipped);
    assert!(!parsed);
    assert!(report.batch.is_empty());
    assert_eq!(state.last_check, Some(second_at));
    assert_eq!(state.last_file_hash, after_first.last_file_hash);
    assert_eq!(state.seen_sets(), after_first.seen_sets());
}

// ---------------------------------------------------------------------------
// Per-entity namespaces
// ---------------------------------------------------------------------------

#[test]
fn row_matching_two_entities_is_new_under_each() {
    let cfg = WatchConfig::for_targets(["UCSF", "UC San Francisco"]);
    let table = text_table(
        &["Company", "Notice Date"],
        &[&["UCSF - UC San Francisco", "2024-06-01"], &["Stanford", "2024-06-01"]],
    );
    assert!(matches(Some("UCSF - UC San Francisco"), "UCSF", 85));
    assert!(matches(Some("UCSF - UC San Francisco"), "UC San Francisco", 85));

    let mut state = NoveltyState::default();
    let snap = DocumentSnapshot::new("u", b"v1".to_vec());
    let report = process_snapshot(&cfg, &mut state, &snap, Utc::now(), |_| Ok(table.clone())).unwrap();

    assert_eq!(report.new_count("UCSF"), 1);
    assert_eq!(report.new_count("UC San Francisco"), 1);
    assert_eq!(report.batch.total(), 2);
    assert_eq!(state.seen_for("UCSF"), state.seen_for("UC San Francisco"));
    assert!(state.seen_sets().contains_key("seen_ucsf"));
    assert!(state.seen_sets().contains_key("seen_uc_san_francisco"));
}

#[test]
fn adding_a_target_later_alerts_its_existing_matches() {
    let table = text_table(
        &["Company", "Notice Date"],
        &[&["UCSF - UC San Francisco", "2024-06-01"]],
    );
    let mut state = NoveltyState::default();

    let cfg = WatchConfig::for_targets(["UCSF"]);
    let snap1 = DocumentSnapshot::new("u", b"v1".to_vec());
    process_snapshot(&cfg, &mut state, &snap1, Utc::now(), |_| Ok(table.clone())).unwrap();

    let cfg = WatchConfig::for_targets(["UCSF", "UC San Francisco"]);
    let snap2 = DocumentSnapshot::new("u", b"v2".to_vec());
    let report = process_snapshot(&cfg, &mut state, &snap2, Utc::now(), |_| Ok(table.clone())).unwrap();

    assert_eq!(report.new_count("UCSF"), 0);
    assert_eq!(report.new_count("UC San Francisco"), 1);
}

// ---------------------------------------------------------------------------
// Persistence across runs
// ---------------------------------------------------------------------------

#[test]
fn seen_keys_survive_a_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("warn_state.json"));
    let cfg = WatchConfig::for_targets(["Acme"]);
    let table = warn_table(&[["Acme", "2024-01-01", "2024-03-01"]]);

    let mut state = store.load().unwrap();
    let snap1 = DocumentSnapshot::new("u", b"v1".to_vec());
    process_snapshot(&cfg, &mut state, &snap1, Utc::now(), |_| Ok(table.clone())).unwrap();
    store.save(&state).unwrap();

    let mut reloaded = store.load().unwrap();
    assert_eq!(reloaded, state);

    let snap2 = DocumentSnapshot::new("u", b"v2 reformatted".to_vec());
    let report =
        process_snapshot(&cfg, &mut reloaded, &snap2, Utc::now(), |_| Ok(table.clone())).unwrap();
    assert!(!report.skipped);
    assert!(report.batch.is_empty());
}

#[test]
fn rows_without_identity_columns_dedupe_across_runs() {
    let cfg = WatchConfig::for_targets(["Acme"]);
    let table = text_table(&["Org", "City"], &[&["Acme", "Oakland"], &["Acme", "Fresno"]]);
    let mut state = NoveltyState::default();

    let r1 = process_snapshot(&cfg, &mut state, &DocumentSnapshot::new("u", b"1".to_vec()), Utc::now(), |_| {
        Ok(table.clone())
    })
    .unwrap();
    assert_eq!(r1.new_count("Acme"), 2);

    let r2 = process_snapshot(&cfg, &mut state, &DocumentSnapshot::new("u", b"2".to_vec()), Utc::now(), |_| {
        Ok(table.clone())
    })
    .unwrap();
    assert_eq!(r2.new_count("Acme"), 0);
}
