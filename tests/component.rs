//! Tests for the counting transform's runtime state machine.

use rowtally::testing::{batch, terminal_batch, InMemoryVariableStore};
use rowtally::*;

fn int64_store(name: &str, initial: i64) -> InMemoryVariableStore {
    let store = InMemoryVariableStore::new();
    store.define_user(name, VariableDataType::Int64, initial);
    store
}

#[test]
fn test_overwrite_mode_ignores_prior_value() {
    // Batches of {10, 0, 5}, initial value 999 -> final value 15.
    let store = int64_store("count", 999);
    let mut counter = RowCounter::new(CounterConfig::new("count", false));

    for n in [10, 0, 5] {
        counter.process_input(&batch(n), &store).unwrap();
    }
    counter.process_input(&terminal_batch(), &store).unwrap();

    assert_eq!(counter.row_count(), 15);
    assert_eq!(store.value("count"), Some(15));
}

#[test]
fn test_incremental_mode_adds_to_prior_value() {
    // Same batches, initial value 100 -> final value 115.
    let store = int64_store("count", 100);
    let mut counter = RowCounter::new(CounterConfig::new("count", true));

    for n in [10, 0, 5] {
        counter.process_input(&batch(n), &store).unwrap();
    }
    counter.process_input(&terminal_batch(), &store).unwrap();

    assert_eq!(store.value("count"), Some(115));
}

#[test]
fn test_batch_boundaries_are_invisible() {
    let store_one = int64_store("count", 0);
    let mut one_batch = RowCounter::new(CounterConfig::new("count", false));
    one_batch.process_input(&batch(7), &store_one).unwrap();
    one_batch.process_input(&terminal_batch(), &store_one).unwrap();

    let store_many = int64_store("count", 0);
    let mut many_batches = RowCounter::new(CounterConfig::new("count", false));
    for _ in 0..7 {
        many_batches.process_input(&batch(1), &store_many).unwrap();
    }
    many_batches
        .process_input(&terminal_batch(), &store_many)
        .unwrap();

    assert_eq!(store_one.value("count"), store_many.value("count"));
    assert_eq!(store_one.value("count"), Some(7));
}

#[test]
fn test_no_variable_io_before_end_of_stream() {
    let store = int64_store("count", 0);
    let mut counter = RowCounter::new(CounterConfig::new("count", true));

    counter.process_input(&batch(1000), &store).unwrap();

    assert_eq!(store.reads(), 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(store.read_locks_taken(), 0);
    assert_eq!(store.write_locks_taken(), 0);
}

#[test]
fn test_overwrite_mode_never_reads() {
    let store = int64_store("count", 999);
    let mut counter = RowCounter::new(CounterConfig::new("count", false));

    counter.process_input(&batch(3), &store).unwrap();
    counter.process_input(&terminal_batch(), &store).unwrap();

    assert_eq!(store.reads(), 0);
    assert_eq!(store.read_locks_taken(), 0);
    assert_eq!(store.writes(), 1);
    assert_eq!(store.write_locks_taken(), 1);
}

#[test]
fn test_incremental_mode_reads_once_writes_once() {
    let store = int64_store("count", 10);
    let mut counter = RowCounter::new(CounterConfig::new("count", true));

    counter.process_input(&batch(3), &store).unwrap();
    counter.process_input(&terminal_batch(), &store).unwrap();

    assert_eq!(store.reads(), 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(store.read_locks_taken(), 1);
    assert_eq!(store.write_locks_taken(), 1);
}

#[test]
fn test_repeated_end_of_stream_is_idempotent() {
    let store = int64_store("count", 100);
    let mut counter = RowCounter::new(CounterConfig::new("count", true));

    counter.process_input(&batch(5), &store).unwrap();
    counter.process_input(&terminal_batch(), &store).unwrap();
    counter.process_input(&terminal_batch(), &store).unwrap();

    // One read-modify-write cycle total; the second signal changed nothing.
    assert_eq!(store.value("count"), Some(105));
    assert_eq!(store.reads(), 1);
    assert_eq!(store.writes(), 1);
}

#[test]
fn test_rows_after_finalization_are_ignored() {
    let store = int64_store("count", 0);
    let mut counter = RowCounter::new(CounterConfig::new("count", false));

    counter.process_input(&batch(4), &store).unwrap();
    counter.process_input(&terminal_batch(), &store).unwrap();
    counter.process_input(&batch(3), &store).unwrap();

    assert!(counter.is_finalized());
    assert_eq!(counter.row_count(), 4);
    assert_eq!(store.value("count"), Some(4));
    assert_eq!(store.writes(), 1);
}

#[test]
fn test_lock_contention_aborts_finalization() {
    let store = int64_store("count", 50);
    let mut counter = RowCounter::new(CounterConfig::new("count", true));
    counter.process_input(&batch(5), &store).unwrap();

    // Another component holds the variable while we finalize.
    let held = store.lock_for_write("count").unwrap();
    let result = counter.process_input(&terminal_batch(), &store);

    assert!(matches!(result, Err(AccessError::LockContended(_))));
    assert!(!counter.is_finalized());
    assert_eq!(store.value("count"), Some(50));
    store.unlock(held);
}

#[test]
fn test_write_failure_leaves_counter_unfinalized() {
    let store = int64_store("count", 0);
    let mut counter = RowCounter::new(CounterConfig::new("count", false));
    counter.process_input(&batch(5), &store).unwrap();

    store.fail_next_lock();
    let result = counter.process_input(&terminal_batch(), &store);

    assert!(result.is_err());
    assert!(!counter.is_finalized());
    assert_eq!(store.value("count"), Some(0));
    assert_eq!(store.outstanding_locks(), 0);
}

#[test]
fn test_incremental_overflow_of_narrow_variable_fails() {
    let store = InMemoryVariableStore::new();
    store.define_user("count", VariableDataType::Int32, i64::from(i32::MAX));
    let mut counter = RowCounter::new(CounterConfig::new("count", true));

    counter.process_input(&batch(5), &store).unwrap();
    let result = counter.process_input(&terminal_batch(), &store);

    assert!(matches!(
        result,
        Err(AccessError::ValueOutOfRange { value, .. }) if value == i64::from(i32::MAX) + 5
    ));
    assert!(!counter.is_finalized());
    assert_eq!(store.value("count"), Some(i64::from(i32::MAX)));
    assert_eq!(store.outstanding_locks(), 0);
}

#[test]
fn test_empty_stream_publishes_zero() {
    let store = int64_store("count", 999);
    let mut counter = RowCounter::new(CounterConfig::new("count", false));

    counter.process_input(&terminal_batch(), &store).unwrap();

    assert_eq!(store.value("count"), Some(0));
}

#[test]
fn test_on_row_counts_single_row() {
    let store = int64_store("count", 0);
    let mut counter = RowCounter::new(CounterConfig::new("count", false));

    let row = Row::new(vec![serde_json::json!("cell")]);
    counter.on_row(&row);
    counter.on_row(&row);
    assert_eq!(counter.row_count(), 2);

    counter.finish(&store).unwrap();
    assert_eq!(store.value("count"), Some(2));
}
