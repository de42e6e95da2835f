//! Integration tests for the durable store and history logs.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use gridsight::history::{ENERGY_LOG, FAULT_LOG, FieldValue, Fields, HistoryLog, LogEntry, MAX_ENTRIES};
use gridsight::store::{self, FileStore, KeyValueStore, MemoryStore, PersistentState};

fn entry(tag: &str) -> LogEntry {
    LogEntry::new(
        Fields::from([("tag".to_string(), FieldValue::from(tag))]),
        Fields::from([("avgPrediction".to_string(), FieldValue::from("27.20"))]),
    )
}

fn file_store(dir: &tempfile::TempDir) -> Rc<dyn KeyValueStore> {
    Rc::new(FileStore::new(dir.path()))
}

#[test]
fn entries_persist_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut log = HistoryLog::open(file_store(&dir), ENERGY_LOG);
        log.append(entry("first"));
        log.append(entry("second"));
    }

    let log = HistoryLog::open(file_store(&dir), ENERGY_LOG);
    assert_eq!(log.len(), 2);
    assert_eq!(log.entry(0).unwrap().inputs["tag"], FieldValue::from("second"));
    assert_eq!(log.entry(1).unwrap().inputs["tag"], FieldValue::from("first"));
}

#[test]
fn logs_are_isolated_by_name() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let mut energy = HistoryLog::open(Rc::clone(&store), ENERGY_LOG);
    let fault = HistoryLog::open(Rc::clone(&store), FAULT_LOG);

    energy.append(entry("e"));
    assert_eq!(energy.len(), 1);
    assert!(fault.is_empty());
    assert!(HistoryLog::open(store, FAULT_LOG).is_empty());
}

#[test]
fn corrupt_slot_opens_empty_and_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    fs::write(store.slot_path(ENERGY_LOG), "{not json").unwrap();

    let mut log = HistoryLog::open(file_store(&dir), ENERGY_LOG);
    assert!(log.is_empty());

    log.append(entry("fresh"));
    let reopened = HistoryLog::open(file_store(&dir), ENERGY_LOG);
    assert_eq!(reopened.len(), 1);
}

#[test]
fn oversized_stored_log_is_cut_to_newest() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let many: Vec<LogEntry> = (0..15).map(|i| entry(&i.to_string())).collect();
    store::save(store.as_ref(), FAULT_LOG, &many).unwrap();

    let mut log = HistoryLog::open(Rc::clone(&store), FAULT_LOG);
    assert_eq!(log.len(), MAX_ENTRIES);
    assert_eq!(log.entry(0).unwrap().inputs["tag"], FieldValue::from("0"));

    log.append(entry("new"));
    assert_eq!(log.len(), MAX_ENTRIES);
    assert_eq!(log.entry(9).unwrap().inputs["tag"], FieldValue::from("8"));
}

#[test]
fn clear_persists_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let mut log = HistoryLog::open(file_store(&dir), ENERGY_LOG);
    {
        let seen = Rc::clone(&seen);
        log.subscribe(move |entries| seen.borrow_mut().push(entries.len()));
    }
    log.append(entry("a"));
    log.append(entry("b"));
    log.clear();

    assert_eq!(*seen.borrow(), vec![1, 2, 0]);
    assert!(HistoryLog::open(file_store(&dir), ENERGY_LOG).is_empty());
}

#[test]
fn replayed_inputs_are_the_submitted_ones() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let mut log = HistoryLog::open(store, ENERGY_LOG);
    let mut inputs = Fields::new();
    inputs.insert("Temp".to_string(), FieldValue::from("22.5"));
    inputs.insert("lag_24h".to_string(), FieldValue::Number(135.5));
    log.append(LogEntry::new(inputs.clone(), Fields::new()));

    assert_eq!(HistoryLog::select_entry(log.entry(0).unwrap()), &inputs);
}

#[test]
fn persistent_state_observers_can_unsubscribe() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let calls = Rc::new(RefCell::new(0));
    let mut state = PersistentState::open(Rc::clone(&store), "counter", 0u32);

    let id = {
        let calls = Rc::clone(&calls);
        state.subscribe(move |_| *calls.borrow_mut() += 1)
    };
    state.set(1);
    assert!(state.unsubscribe(id));
    assert!(!state.unsubscribe(id));
    state.update(|n| n + 1);

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(store::load(store.as_ref(), "counter", 0u32), 2);
}
