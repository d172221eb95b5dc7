//! End-to-end flows over the library API: xlsx import into a session,
//! edits through the engines, save/export, status ledger, and deletion.

use gridbase::engine;
use gridbase::ledger::StatusLedger;
use gridbase::session::SessionStore;
use gridbase::sheet;
use gridbase::translate::{ActionTranslator, RuleTranslator};
use polars::prelude::*;
use serde_json::json;

fn source_table() -> DataFrame {
    let region = Series::new("Region".into(), vec!["East", "West", "North"]);
    let profit = Series::new("Profit".into(), vec![100i64, 300, 250]);
    let status = Series::new("Status".into(), vec!["open", "open", "closed"]);
    DataFrame::new(vec![region.into(), profit.into(), status.into()]).unwrap()
}

#[test]
fn upload_then_preview_returns_source_columns_and_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("f1.xlsx");
    sheet::xlsx::export(&source_table(), &path).unwrap();

    // The upload handler's core: import, store, record status
    let store = SessionStore::new();
    let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
    let df = sheet::xlsx::import(&path).unwrap();
    store.put("f1", df);
    ledger.update("f1", "uploaded").unwrap();

    let snap = store.snapshot("f1").unwrap();
    assert_eq!(sheet::json::column_names(&snap), vec!["Region", "Profit", "Status"]);
    let rows = sheet::json::records(&snap, Some(2));
    assert_eq!(
        rows,
        json!([
            {"Region": "East", "Profit": 100, "Status": "open"},
            {"Region": "West", "Profit": 300, "Status": "open"},
        ])
    );
    assert_eq!(ledger.get("f1").unwrap().status, "uploaded");
}

#[test]
fn patch_save_reload_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("f1.xlsx");
    let store = SessionStore::new();
    let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
    store.put("f1", source_table());

    let updates: Vec<engine::cells::CellUpdate> =
        serde_json::from_value(json!([{"row": 0, "column": "Profit", "value": 111}])).unwrap();
    engine::cells::apply_cell_patches(&store, "f1", &updates).unwrap();

    // Save to disk, then reload as a fresh session
    let df = store.snapshot("f1").unwrap();
    sheet::xlsx::export(&df, &path).unwrap();
    ledger.update("f1", "modified").unwrap();

    let reloaded = sheet::xlsx::import(&path).unwrap();
    assert_eq!(reloaded.column("Profit").unwrap().i64().unwrap().get(0), Some(111));
    assert_eq!(reloaded.height(), 3);
    assert_eq!(ledger.get("f1").unwrap().status, "modified");
}

#[test]
fn translated_prompt_applies_and_echoes_the_action() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SessionStore::new();
    let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
    store.put("f1", source_table());

    let columns = sheet::json::column_names(&store.snapshot("f1").unwrap());
    let descriptor = RuleTranslator::new()
        .translate("show rows where Profit over 200", &columns)
        .unwrap();
    let applied = engine::apply::apply_action(&store, &ledger, "f1", &descriptor).unwrap();

    assert_eq!(
        serde_json::to_value(&applied).unwrap(),
        json!({"operation": "filter", "column": "Profit", "condition": {"operator": ">", "value": 200}})
    );
    let snap = store.snapshot("f1").unwrap();
    assert_eq!(snap.height(), 2);
    assert_eq!(ledger.get("f1").unwrap().status, "modified");
}

#[test]
fn formula_translation_echoes_the_descriptor_without_applying() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SessionStore::new();
    let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
    store.put("f1", source_table());

    // The generate-formula path: translate and return, never mutate
    let columns = sheet::json::column_names(&store.snapshot("f1").unwrap());
    let descriptor = RuleTranslator::new()
        .translate("show rows where Profit over 200", &columns)
        .unwrap();
    assert_eq!(
        descriptor,
        json!({"operation": "filter", "column": "Profit", "condition": {"operator": ">", "value": 200}})
    );

    assert_eq!(store.snapshot("f1").unwrap().height(), 3);
    assert_eq!(ledger.get("f1").unwrap().status, "not_found");

    // The same descriptor still applies cleanly afterwards
    gridbase::action::validate(&descriptor, &columns).unwrap();
    engine::apply::apply_action(&store, &ledger, "f1", &descriptor).unwrap();
    assert_eq!(store.snapshot("f1").unwrap().height(), 2);
}

#[test]
fn unrecognized_prompt_never_reaches_the_table() {
    let store = SessionStore::new();
    store.put("f1", source_table());
    let columns = sheet::json::column_names(&store.snapshot("f1").unwrap());
    assert!(RuleTranslator::new().translate("do something clever", &columns).is_err());
    assert_eq!(store.snapshot("f1").unwrap().height(), 3);
}

#[test]
fn deletion_drops_the_session_but_keeps_the_status() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SessionStore::new();
    let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
    store.put("f1", source_table());
    ledger.update("f1", "uploaded").unwrap();

    assert!(store.remove("f1"));
    ledger.update("f1", "deleted").unwrap();

    assert!(store.snapshot("f1").is_none());
    assert_eq!(ledger.get("f1").unwrap().status, "deleted");
}

#[test]
fn preview_style_operations_compose_without_committing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SessionStore::new();
    let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
    store.put("f1", source_table());
    let before = store.snapshot("f1").unwrap();

    let filtered = engine::filter::filter_preview(&store, "f1", "Status", "==", "open", 100).unwrap();
    assert_eq!(filtered.count, 2);
    let sorted = engine::sort::sort_preview(&store, &ledger, "f1", "Profit", "desc", 100, false).unwrap();
    assert_eq!(sorted.column("Profit").unwrap().i64().unwrap().get(0), Some(300));

    let after = store.snapshot("f1").unwrap();
    assert!(before.equals_missing(&after));
}
