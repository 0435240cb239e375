//! Tests for the in-memory variable store and the lock-scoped gateway.

use rowtally::testing::InMemoryVariableStore;
use rowtally::*;

fn store_with(name: &str, data_type: VariableDataType, value: i64) -> InMemoryVariableStore {
    let store = InMemoryVariableStore::new();
    store.define_user(name, data_type, value);
    store
}

#[test]
fn test_resolve_distinguishes_missing_from_defined() {
    let store = store_with("count", VariableDataType::Int32, 7);

    assert!(store.resolve("missing").is_none());
    let info = store.resolve("count").unwrap();
    assert_eq!(info.data_type, VariableDataType::Int32);
    assert!(!info.system);
    assert!(!info.read_only);
}

#[test]
fn test_locks_are_exclusive_per_variable() {
    let store = store_with("count", VariableDataType::Int64, 0);

    let held = store.lock_for_write("count").unwrap();
    assert!(matches!(
        store.lock_for_read("count"),
        Err(AccessError::LockContended(_))
    ));

    store.unlock(held);
    let reacquired = store.lock_for_read("count").unwrap();
    store.unlock(reacquired);
    assert_eq!(store.outstanding_locks(), 0);
}

#[test]
fn test_locking_unknown_variable_fails() {
    let store = InMemoryVariableStore::new();
    assert!(matches!(
        store.lock_for_read("missing"),
        Err(AccessError::VariableGone(_))
    ));
}

#[test]
fn test_read_lock_does_not_grant_write() {
    let store = store_with("count", VariableDataType::Int64, 0);

    let handle = store.lock_for_read("count").unwrap();
    assert!(matches!(
        store.write(&handle, 1),
        Err(AccessError::Host(_))
    ));
    store.unlock(handle);
    assert_eq!(store.value("count"), Some(0));
}

#[test]
fn test_fabricated_handle_is_stale() {
    let store = store_with("count", VariableDataType::Int64, 0);

    let bogus = LockHandle::new(999, "count", LockMode::Read);
    assert!(matches!(
        store.read(&bogus),
        Err(AccessError::StaleHandle(_))
    ));
}

#[test]
fn test_write_respects_declared_type_range() {
    let store = store_with("narrow", VariableDataType::Int32, 0);

    let handle = store.lock_for_write("narrow").unwrap();
    store.write(&handle, i64::from(i32::MAX)).unwrap();
    store.unlock(handle);
    assert_eq!(store.value("narrow"), Some(i64::from(i32::MAX)));

    let handle = store.lock_for_write("narrow").unwrap();
    assert!(matches!(
        store.write(&handle, i64::from(i32::MAX) + 1),
        Err(AccessError::ValueOutOfRange { .. })
    ));
    store.unlock(handle);
    assert_eq!(store.value("narrow"), Some(i64::from(i32::MAX)));
}

#[test]
fn test_unsigned_types_reject_negative_values() {
    let store = store_with("unsigned", VariableDataType::UInt32, 0);

    let handle = store.lock_for_write("unsigned").unwrap();
    assert!(matches!(
        store.write(&handle, -1),
        Err(AccessError::ValueOutOfRange { .. })
    ));
    store.unlock(handle);
}

#[test]
fn test_fail_next_lock_is_one_shot() {
    let store = store_with("count", VariableDataType::Int64, 0);

    store.fail_next_lock();
    assert!(store.lock_for_read("count").is_err());

    let handle = store.lock_for_read("count").unwrap();
    store.unlock(handle);
}

#[test]
fn test_gateway_reads_and_writes_under_lock() {
    let store = store_with("count", VariableDataType::Int64, 41);
    let gateway = VariableGateway::new(&store, "count");

    assert_eq!(gateway.current_value().unwrap(), 41);
    gateway.publish(42).unwrap();

    assert_eq!(store.value("count"), Some(42));
    assert_eq!(store.outstanding_locks(), 0);
    assert_eq!(store.read_locks_taken(), 1);
    assert_eq!(store.write_locks_taken(), 1);
}

#[test]
fn test_gateway_unlocks_when_the_access_fails() {
    let store = store_with("narrow", VariableDataType::Int32, 0);
    let gateway = VariableGateway::new(&store, "narrow");

    let result = gateway.publish(i64::from(i32::MAX) + 1);

    assert!(matches!(result, Err(AccessError::ValueOutOfRange { .. })));
    assert_eq!(store.outstanding_locks(), 0);
    // The write lock was granted and then released.
    assert_eq!(store.write_locks_taken(), 1);
}
