use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use lei_core::{BatchControl, CancellationToken, Session, SessionOptions, load_reference};
use lei_model::{Classification, LoadMode, LoadOptions, MatchConfig, Query};

const GOLDEN: &str = "\
LEI,Entity.LegalName,Entity.LegalAddress.Country,Entity.EntityStatus,Registration.RegistrationStatus,Registration.RegistrationAuthorityEntityID
529900T8BM49AURSDO55,Acme Corporation Ltd,GB,ACTIVE,ISSUED,01234567
529900HNOAA1KXQJUQ27,Acme Holdings Ltd,GB,ACTIVE,ISSUED,
969500KSV493XWY0PS54,Acme SA,FR,ACTIVE,ISSUED,552120222
5493001KJTIIGC8Y1R12,Zenith Bakery GmbH,DE,ACTIVE,ISSUED,
5493000IBP32UQZ0KL24,Northwind Traders Inc,US,INACTIVE,LAPSED,
";

fn golden_file(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("golden.csv");
    fs::write(&path, GOLDEN).expect("write golden copy");
    path
}

fn session(mode: LoadMode) -> (tempfile::TempDir, Session) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = golden_file(&dir);
    let session = load_reference(&path, mode).expect("load reference");
    (dir, session)
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

#[test]
fn results_follow_input_order() {
    let (_dir, session) = session(LoadMode::Full);
    let queries = names(&[
        "Zenith Bakery GmbH",
        "ACME CORP. LTD",
        "",
        "Acme SA",
        "ACME CORP. LTD",
        "Northwind Traders",
    ]);
    let report = session
        .resolve_batch(&queries, &MatchConfig::default())
        .expect("batch");
    assert_eq!(report.len(), queries.len());
    for (result, query) in report.results.iter().zip(&queries) {
        assert_eq!(&result.input, query);
    }
    assert_eq!(report.results[1], report.results[4]);
    assert_eq!(report.results[2].classification, Classification::NoMatch);
    assert!(!report.cancelled);
}

#[test]
fn acme_and_unrelated_examples() {
    let (_dir, session) = session(LoadMode::Full);
    let report = session
        .resolve_batch(
            &names(&["ACME CORP. LTD", "Quantum Shipping Partners"]),
            &MatchConfig::default(),
        )
        .expect("batch");

    let acme = &report.results[0];
    assert_eq!(acme.classification, Classification::AutoMatched);
    assert_eq!(acme.lei.as_deref(), Some("529900T8BM49AURSDO55"));
    assert_eq!(acme.confidence, 1.0);

    let unrelated = &report.results[1];
    assert_eq!(unrelated.classification, Classification::NoMatch);
    assert!(unrelated.lei.is_none());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let (_dir, session) = session(LoadMode::Full);
    let queries = names(&["Acme", "Acme Holding", "Zenith", "Acme Corp", "Northwind"]);
    let config = MatchConfig::relaxed();
    let first = session.resolve_batch(&queries, &config).expect("first run");
    let second = session
        .resolve_queries(
            &queries.iter().map(|q| Query::new(q.as_str())).collect::<Vec<_>>(),
            &config,
            &BatchControl::default().with_threads(1),
        )
        .expect("second run");
    assert_eq!(
        serde_json::to_string(&first.results).expect("serialize"),
        serde_json::to_string(&second.results).expect("serialize")
    );
}

#[test]
fn malformed_queries_become_error_rows() {
    let (_dir, session) = session(LoadMode::Slim);
    let report = session
        .resolve_batch(
            &names(&["Acme\u{0} SA", "Ac\u{fffd}me", "Acme SA"]),
            &MatchConfig::default(),
        )
        .expect("batch");
    assert_eq!(report.results[0].classification, Classification::Error);
    assert_eq!(report.results[1].classification, Classification::Error);
    assert!(report.results[0].diagnostic.is_some());
    assert_eq!(report.results[2].classification, Classification::AutoMatched);
    assert_eq!(report.count(Classification::Error), 2);
}

#[test]
fn error_rows_keep_query_columns() {
    let (_dir, session) = session(LoadMode::Full);
    let queries = [Query::new("Acme\u{0} SA")
        .with_registry_id("552 120 222")
        .with_country("France")];
    let report = session
        .resolve_queries(&queries, &MatchConfig::default(), &BatchControl::default())
        .expect("batch");
    let result = &report.results[0];
    assert_eq!(result.classification, Classification::Error);
    assert_eq!(result.input_registry_id.as_deref(), Some("552 120 222"));
    assert_eq!(result.input_country.as_deref(), Some("France"));
}

#[test]
fn candidate_cap_limits_alternatives() {
    let (_dir, session) = session(LoadMode::Full);
    let config = MatchConfig::default()
        .with_max_candidates(1)
        .with_max_alternatives(5);
    let report = session
        .resolve_batch(&names(&["Acme"]), &config)
        .expect("batch");
    // One scored candidate: either the best match or the single alternative.
    let result = &report.results[0];
    let listed = result.alternatives.len() + usize::from(result.lei.is_some());
    assert_eq!(listed, 1);
}

#[test]
fn cancelled_before_start_marks_every_query() {
    let (_dir, session) = session(LoadMode::Slim);
    let token = CancellationToken::new();
    token.cancel();
    let queries: Vec<Query> = ["Acme", "Zenith"].into_iter().map(Query::from).collect();
    let report = session
        .resolve_queries(
            &queries,
            &MatchConfig::default(),
            &BatchControl::default().with_cancellation(&token),
        )
        .expect("batch");
    assert!(report.cancelled);
    assert_eq!(report.count(Classification::Cancelled), 2);
    assert_eq!(report.results[1].input, "Zenith");
}

#[test]
fn cancelling_mid_batch_stops_new_queries() {
    let (_dir, session) = session(LoadMode::Slim);
    let token = CancellationToken::new();
    let cancel_after_first = |_processed: usize, _total: usize| token.cancel();
    let queries: Vec<Query> = (0..50).map(|i| Query::new(format!("Acme {i}"))).collect();
    let report = session
        .resolve_queries(
            &queries,
            &MatchConfig::default(),
            &BatchControl::default()
                .with_cancellation(&token)
                .with_threads(1)
                .with_observer(&cancel_after_first),
        )
        .expect("batch");
    assert!(report.cancelled);
    assert_eq!(report.len(), 50);
    let started = report.len() - report.count(Classification::Cancelled);
    assert_eq!(started, 1);
    for (result, query) in report.results.iter().zip(&queries) {
        assert_eq!(result.input, query.name);
    }
}

#[test]
fn observer_sees_every_query() {
    let (_dir, session) = session(LoadMode::Slim);
    let calls = AtomicUsize::new(0);
    let last = Mutex::new((0, 0));
    let observer = |processed: usize, total: usize| {
        calls.fetch_add(1, Ordering::SeqCst);
        let mut last = last.lock().expect("lock");
        if processed > last.0 {
            *last = (processed, total);
        }
    };
    let queries: Vec<Query> = (0..20).map(|i| Query::new(format!("Zenith {i}"))).collect();
    session
        .resolve_queries(
            &queries,
            &MatchConfig::default(),
            &BatchControl::default().with_observer(&observer),
        )
        .expect("batch");
    assert_eq!(calls.load(Ordering::SeqCst), 20);
    assert_eq!(*last.lock().expect("lock"), (20, 20));
}

#[test]
fn active_only_session_drops_inactive_entities() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = golden_file(&dir);
    let options = SessionOptions {
        load: LoadOptions::new(LoadMode::Full).with_active_only(true),
        ..SessionOptions::default()
    };
    let session = Session::open(&path, &options).expect("open session");
    assert_eq!(session.table().len(), 4);
    assert_eq!(session.load_report().filtered_inactive, 1);

    let report = session
        .resolve_batch(&names(&["Northwind Traders Inc"]), &MatchConfig::default())
        .expect("batch");
    assert_eq!(report.results[0].classification, Classification::NoMatch);
}

#[test]
fn registry_ids_resolve_through_queries() {
    let (_dir, session) = session(LoadMode::Full);
    let query = Query::new("Unknown Name").with_registry_id("552 120 222");
    let report = session
        .resolve_queries(&[query], &MatchConfig::default(), &BatchControl::default())
        .expect("batch");
    assert_eq!(report.results[0].lei.as_deref(), Some("969500KSV493XWY0PS54"));
}
