//! End-to-end quote flows over one application state

use std::time::Duration;

use folio_store::live::queries;
use folio_store::{AppError, AppState, Config, Storage};
use rust_decimal::Decimal;
use shared::models::{PROFILE_KEY, Profile, QuoteStatus, RawNumber};

fn state() -> AppState {
    let storage = Storage::open_in_memory().unwrap();
    AppState::with_storage(&Config::with_work_dir("/nonexistent"), storage).unwrap()
}

fn set_counter(state: &AppState, next: u64) {
    let profile = state.profile.get().unwrap();
    state.storage.put(&Profile { next_folio: next, ..profile }).unwrap();
}

#[tokio::test]
async fn folio_is_consumed_once_per_new_quote() {
    let state = state();
    set_counter(&state, 7);

    let mut draft = state.quotes.new_draft().unwrap();
    assert_eq!(draft.folio, "0007");
    draft.client_name = "Ana".to_string();
    draft.client_phone = "5512345678".to_string();
    draft.items[0].description = "Valve replacement".to_string();
    draft.items[0].quantity = RawNumber::from(2);
    draft.items[0].unit_price = RawNumber::from(100);
    draft.discount_rate = Decimal::from(10);
    draft.tax_rate = Decimal::from(16);

    let saved = state.quotes.save(draft).await.unwrap();
    assert!(saved.created);
    assert_eq!(saved.quote.folio, "0007");
    assert_eq!(saved.quote.total, Decimal::new(2088, 1));
    assert_eq!(state.quotes.sequencer().reserve_next_folio().unwrap(), "0008");

    // Editing keeps the folio and leaves the counter alone
    let mut edited = saved.quote.clone();
    edited.client_name = "Ana Lopez".to_string();
    let again = state.quotes.save(edited).await.unwrap();
    assert!(!again.created);
    assert_eq!(again.quote.folio, "0007");
    assert_eq!(state.storage.get::<Profile>(PROFILE_KEY).unwrap().unwrap().next_folio, 8);
}

#[tokio::test]
async fn concurrent_saves_get_distinct_folios() {
    let state = state();
    let mut handles = Vec::new();
    for i in 0..8 {
        let quotes = state.quotes.clone();
        let mut draft = quotes.new_draft().unwrap();
        draft.client_name = format!("Client {i}");
        draft.client_phone = "5512345678".to_string();
        draft.items[0].description = "Inspection".to_string();
        handles.push(tokio::spawn(async move { quotes.save(draft).await }));
    }

    let mut folios = Vec::new();
    for handle in handles {
        folios.push(handle.await.unwrap().unwrap().quote.folio);
    }
    folios.sort();
    let expected: Vec<String> = (1..=8).map(|n| format!("{n:04}")).collect();
    assert_eq!(folios, expected);
}

#[tokio::test]
async fn live_history_follows_saves_and_status_changes() {
    let state = state();
    let (initial, mut history) = state.live.subscribe(queries::all_quotes_newest_first).unwrap();
    assert!(initial.is_empty());

    let mut draft = state.quotes.new_draft().unwrap();
    draft.client_name = "Ana".to_string();
    draft.client_phone = "5512345678".to_string();
    draft.items[0].description = "Inspection".to_string();
    let saved = state.quotes.save(draft).await.unwrap();

    let update = tokio::time::timeout(Duration::from_secs(2), history.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.len(), 1);
    assert_eq!(update[0].status, QuoteStatus::Pending);

    state.quotes.toggle_status(&saved.quote.id).unwrap();
    let update = tokio::time::timeout(Duration::from_secs(2), history.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update[0].status, QuoteStatus::Paid);

    history.unsubscribe();
    assert!(state.live.is_empty());
    state.shutdown();
}

#[tokio::test]
async fn backup_moves_data_between_stores() {
    let source = state();
    set_counter(&source, 41);
    let mut draft = source.quotes.new_draft().unwrap();
    draft.client_name = "Ana".to_string();
    draft.client_phone = "5512345678".to_string();
    draft.items[0].description = "Inspection".to_string();
    draft.items[0].unit_price = RawNumber::from(350);
    source.quotes.save(draft).await.unwrap();

    let text = source.backup.export_json().unwrap();

    let target = state();
    let summary = target.backup.import_json(&text).unwrap();
    assert_eq!(summary.quotes, 1);
    assert_eq!(target.quotes.list().unwrap(), source.quotes.list().unwrap());
    assert_eq!(target.catalog.list().unwrap(), source.catalog.list().unwrap());
    assert_eq!(target.quotes.sequencer().reserve_next_folio().unwrap(), "0042");
}

#[tokio::test]
async fn rejected_backup_leaves_store_untouched() {
    let state = state();
    let before = state.backup.export().unwrap();
    let version = state.storage.version().unwrap();

    let err = state
        .backup
        .import_json(r#"{"profile": [], "catalog": [], "timestamp": "2025-01-01T00:00:00Z", "version": 1}"#)
        .unwrap_err();
    assert!(matches!(err, AppError::ImportRejected(_)));

    let after = state.backup.export().unwrap();
    assert_eq!(before.catalog, after.catalog);
    assert_eq!(before.profile, after.profile);
    assert_eq!(state.storage.version().unwrap(), version);
}
