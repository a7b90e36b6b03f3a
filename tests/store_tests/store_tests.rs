//! Tests for VarStore
//!
//! These tests verify:
//! - Create/get/set with case-insensitive names
//! - Type stability and numeric sub-types
//! - INC/DEC semantics
//! - Access control on Owned variables
//! - Slot, byte and owned caps
//! - Ownership release and group lifecycle
//! - Last-value cache refresh and invalidation

use sharedvars::store::{Limits, VarStore, SLOT_CHUNK};
use sharedvars::{Caller, ConnId, Value, VarError, VarFlags, VarType};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> VarStore {
    VarStore::with_limits(Limits {
        max_vars: 1000,
        max_var_bytes: 64 * 1024,
        max_owned: 50,
    })
}

fn setup_store_with_limits(max_vars: usize, max_var_bytes: usize, max_owned: usize) -> VarStore {
    VarStore::with_limits(Limits {
        max_vars,
        max_var_bytes,
        max_owned,
    })
}

fn owned() -> VarFlags {
    VarFlags {
        create_if_missing: true,
        owned: true,
        ..VarFlags::default()
    }
}

fn string(text: &str) -> Value {
    Value::String(text.as_bytes().to_vec())
}

fn assert_counters_consistent(store: &VarStore) {
    assert_eq!(store.stats().payload_bytes, store.recount_payload_bytes());
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_set_creates_and_get_reads() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();

    let outcome = store
        .set(Caller::new(conn, &cache), "app", "title", string("hello"), VarFlags::create(), false)
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.previous, None);
    assert_eq!(store.get(conn, "app", "title").unwrap(), string("hello"));
}

#[test]
fn test_set_without_create_flag_is_not_found() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();

    let result = store.set(
        Caller::new(conn, &cache),
        "app",
        "missing",
        string("x"),
        VarFlags::default(),
        false,
    );

    assert!(matches!(result, Err(VarError::NotFound)));
    assert_eq!(store.stats().groups, 0);
}

#[test]
fn test_names_are_case_insensitive() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "Config", "Mode", string("fast"), VarFlags::create(), false)
        .unwrap();
    let outcome = store
        .set(caller, "CONFIG", "mode", string("slow"), VarFlags::create(), false)
        .unwrap();

    // Second SET hits the same variable instead of creating a new one
    assert!(!outcome.created);
    assert_eq!(store.stats().groups, 1);
    assert_eq!(store.stats().variables, 1);
    assert_eq!(store.get(conn, "config", "MODE").unwrap(), string("slow"));
    // Stored names keep the case of the first SET
    assert_eq!(store.list_groups(), vec!["Config".to_string()]);
    assert_eq!(store.list_names("config").unwrap(), vec!["Mode".to_string()]);
}

#[test]
fn test_set_returns_previous_value() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    let created = store
        .set(caller, "app", "count", Value::Integer(5), VarFlags::create(), true)
        .unwrap();
    assert!(created.created);
    assert_eq!(created.previous, None);

    let updated = store
        .set(caller, "app", "count", Value::Integer(6), VarFlags::default(), true)
        .unwrap();
    assert_eq!(updated.previous, Some(Value::Integer(5)));
    assert_eq!(store.get(conn, "app", "count").unwrap(), Value::Integer(6));
}

#[test]
fn test_empty_names_are_malformed() {
    let store = setup_store();
    let conn = store.open_connection();

    assert!(matches!(store.get(conn, "", "x"), Err(VarError::Malformed(_))));
    assert!(matches!(store.get(conn, "app", ""), Err(VarError::Malformed(_))));
    assert!(matches!(store.delete("app", ""), Err(VarError::Malformed(_))));
    assert!(matches!(store.delete_group(""), Err(VarError::Malformed(_))));
}

// =============================================================================
// Type Tests
// =============================================================================

#[test]
fn test_type_is_fixed_by_first_write() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "app", "flag", Value::Logical(true), VarFlags::create(), false)
        .unwrap();
    let result = store.set(caller, "app", "flag", string("yes"), VarFlags::create(), false);

    assert!(matches!(result, Err(VarError::TypeMismatch)));
    assert_eq!(store.get(conn, "app", "flag").unwrap(), Value::Logical(true));
}

#[test]
fn test_numeric_subtypes_share_a_type() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "app", "ratio", Value::Integer(1), VarFlags::create(), false)
        .unwrap();
    store
        .set(caller, "app", "ratio", Value::Float(0.5), VarFlags::default(), false)
        .unwrap();

    let value = store.get(conn, "app", "ratio").unwrap();
    assert_eq!(value.var_type(), VarType::Numeric);
    assert!(value.is_float());
}

#[test]
fn test_parse_numeric_text() {
    assert_eq!(Value::parse_numeric(b"42").unwrap(), Value::Integer(42));
    assert_eq!(Value::parse_numeric(b" -7 ").unwrap(), Value::Integer(-7));
    assert_eq!(Value::parse_numeric(b"3.25").unwrap(), Value::Float(3.25));
    assert!(matches!(Value::parse_numeric(b"abc"), Err(VarError::Malformed(_))));
    assert!(matches!(Value::parse_numeric(b"1.2.3"), Err(VarError::Malformed(_))));
}

#[test]
fn test_value_text() {
    assert_eq!(&*Value::Integer(42).text(), b"42");
    assert_eq!(&*Value::Float(3.25).text(), b"3.250000");
    assert_eq!(&*Value::Logical(true).text(), b"1");
    assert_eq!(&*Value::Logical(false).text(), b"0");
    assert_eq!(&*Value::Array(vec![1, 2, 3]).text(), &[1u8, 2, 3][..]);
}

// =============================================================================
// INC/DEC Tests
// =============================================================================

#[test]
fn test_increment_creates_at_zero() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    let value = store
        .increment(caller, "stats", "hits", VarFlags::create(), false)
        .unwrap();

    assert_eq!(value, Value::Integer(1));
    assert_eq!(store.get(conn, "stats", "hits").unwrap(), Value::Integer(1));
}

#[test]
fn test_increment_without_create_is_not_found() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();

    let result = store.increment(Caller::new(conn, &cache), "stats", "hits", VarFlags::default(), false);

    assert!(matches!(result, Err(VarError::NotFound)));
}

#[test]
fn test_increment_and_decrement_return_previous() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "stats", "level", Value::Integer(10), VarFlags::create(), false)
        .unwrap();

    assert_eq!(
        store.increment(caller, "stats", "level", VarFlags::default(), true).unwrap(),
        Value::Integer(10)
    );
    assert_eq!(
        store.decrement(caller, "stats", "level", VarFlags::default(), false).unwrap(),
        Value::Integer(10)
    );
    assert_eq!(
        store.decrement(caller, "stats", "level", VarFlags::default(), true).unwrap(),
        Value::Integer(10)
    );
    assert_eq!(store.get(conn, "stats", "level").unwrap(), Value::Integer(9));
}

#[test]
fn test_increment_wraps_at_max() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "stats", "edge", Value::Integer(i64::MAX), VarFlags::create(), false)
        .unwrap();

    assert_eq!(
        store.increment(caller, "stats", "edge", VarFlags::default(), false).unwrap(),
        Value::Integer(i64::MIN)
    );
}

#[test]
fn test_increment_rejects_non_integers() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "app", "name", string("abc"), VarFlags::create(), false)
        .unwrap();
    store
        .set(caller, "app", "ratio", Value::Float(1.5), VarFlags::create(), false)
        .unwrap();

    assert!(matches!(
        store.increment(caller, "app", "name", VarFlags::default(), false),
        Err(VarError::TypeMismatch)
    ));
    assert!(matches!(
        store.decrement(caller, "app", "ratio", VarFlags::default(), false),
        Err(VarError::TypeMismatch)
    ));
    assert_eq!(store.get(conn, "app", "ratio").unwrap(), Value::Float(1.5));
}

// =============================================================================
// Access Control Tests
// =============================================================================

#[test]
fn test_deny_read_blocks_other_connections() {
    let store = setup_store();
    let cache = store.register_worker();
    let owner = store.open_connection();
    let other = store.open_connection();

    let flags = VarFlags {
        deny_read: true,
        ..owned()
    };
    store
        .set(Caller::new(owner, &cache), "app", "secret", string("s3cr3t"), flags, false)
        .unwrap();

    assert_eq!(store.get(owner, "app", "secret").unwrap(), string("s3cr3t"));
    assert!(matches!(store.get(other, "app", "secret"), Err(VarError::ReadDenied)));

    // Writes by others are still allowed
    store
        .set(Caller::new(other, &cache), "app", "secret", string("new"), VarFlags::default(), false)
        .unwrap();
    assert_eq!(store.get(owner, "app", "secret").unwrap(), string("new"));
}

#[test]
fn test_deny_write_blocks_other_connections() {
    let store = setup_store();
    let cache = store.register_worker();
    let owner = store.open_connection();
    let other = store.open_connection();

    let flags = VarFlags {
        deny_write: true,
        ..owned()
    };
    store
        .set(Caller::new(owner, &cache), "app", "locked", Value::Integer(1), flags, false)
        .unwrap();

    let result = store.set(
        Caller::new(other, &cache),
        "app",
        "locked",
        Value::Integer(2),
        VarFlags::default(),
        false,
    );
    assert!(matches!(result, Err(VarError::WriteDenied)));
    assert!(matches!(
        store.increment(Caller::new(other, &cache), "app", "locked", VarFlags::default(), false),
        Err(VarError::WriteDenied)
    ));

    // Reads by others and writes by the owner are allowed
    assert_eq!(store.get(other, "app", "locked").unwrap(), Value::Integer(1));
    store
        .set(Caller::new(owner, &cache), "app", "locked", Value::Integer(3), VarFlags::default(), false)
        .unwrap();
    assert_eq!(store.get(other, "app", "locked").unwrap(), Value::Integer(3));
}

#[test]
fn test_deny_flags_without_owned_have_no_effect() {
    let store = setup_store();
    let cache = store.register_worker();
    let creator = store.open_connection();
    let other = store.open_connection();

    let flags = VarFlags {
        create_if_missing: true,
        deny_read: true,
        deny_write: true,
        owned: false,
    };
    store
        .set(Caller::new(creator, &cache), "app", "open", Value::Integer(1), flags, false)
        .unwrap();

    assert_eq!(store.get(other, "app", "open").unwrap(), Value::Integer(1));
    store
        .set(Caller::new(other, &cache), "app", "open", Value::Integer(2), VarFlags::default(), false)
        .unwrap();
}

#[test]
fn test_list_values_skips_read_denied() {
    let store = setup_store();
    let cache = store.register_worker();
    let owner = store.open_connection();
    let other = store.open_connection();
    let caller = Caller::new(owner, &cache);

    store
        .set(caller, "app", "public", string("visible"), VarFlags::create(), false)
        .unwrap();
    let hidden = VarFlags {
        deny_read: true,
        ..owned()
    };
    store
        .set(caller, "app", "private", string("hidden"), hidden, false)
        .unwrap();

    let names: Vec<String> = store
        .list_values(other, "app", 20)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["public".to_string()]);

    assert_eq!(store.list_values(owner, "app", 20).unwrap().len(), 2);
    // Names listing discloses no values and is not filtered
    assert_eq!(store.list_names("app").unwrap().len(), 2);
}

#[test]
fn test_list_values_truncates_previews() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "app", "text", string("hello world"), VarFlags::create(), false)
        .unwrap();
    store
        .set(caller, "app", "blob", Value::Array(b"abcdefgh".to_vec()), VarFlags::create(), false)
        .unwrap();

    let entries = store.list_values(conn, "app", 8).unwrap();
    assert_eq!(entries[0].preview, b"hello wo".to_vec());
    assert_eq!(entries[0].var_type, VarType::String);
    // Arrays never show more than five bytes
    assert_eq!(entries[1].preview, b"abcde".to_vec());

    let entries = store.list_values(conn, "app", 3).unwrap();
    assert_eq!(entries[1].preview, b"abc".to_vec());
}

// =============================================================================
// Quota Tests
// =============================================================================

#[test]
fn test_slot_cap_counts_allocated_slots() {
    // One group allocates two chunks before reaching 2 * SLOT_CHUNK slots
    let store = setup_store_with_limits(2 * SLOT_CHUNK, 1024, 50);
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    for i in 0..=SLOT_CHUNK {
        store
            .set(caller, "app", &format!("v{}", i), Value::Integer(0), VarFlags::create(), false)
            .unwrap();
    }
    assert_eq!(store.stats().slot_capacity, 2 * SLOT_CHUNK);

    let result = store.set(caller, "app", "overflow", Value::Integer(0), VarFlags::create(), false);
    assert!(matches!(result, Err(VarError::QuotaExceeded(_))));
    assert_eq!(store.stats().variables, SLOT_CHUNK + 1);

    // Existing variables can still be written
    store
        .set(caller, "app", "v0", Value::Integer(9), VarFlags::default(), false)
        .unwrap();
}

#[test]
fn test_single_value_limit_keeps_prior_value() {
    // Single value limit is a quarter of the byte cap
    let store = setup_store_with_limits(1000, 40, 50);
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store
        .set(caller, "app", "short", string("0123456789"), VarFlags::create(), false)
        .unwrap();
    let result = store.set(caller, "app", "short", string("0123456789a"), VarFlags::default(), false);

    assert!(matches!(result, Err(VarError::QuotaExceeded(_))));
    assert_eq!(store.get(conn, "app", "short").unwrap(), string("0123456789"));
    assert_eq!(store.stats().payload_bytes, 10);

    let result = store.set(caller, "app", "fresh", string("0123456789a"), VarFlags::create(), false);
    assert!(matches!(result, Err(VarError::QuotaExceeded(_))));
    assert_eq!(store.stats().variables, 1);
}

#[test]
fn test_byte_cap_counts_replacement_delta() {
    let store = setup_store_with_limits(1000, 40, 50);
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    for name in ["a", "b", "c", "d"] {
        store
            .set(caller, "app", name, string("0123456789"), VarFlags::create(), false)
            .unwrap();
    }
    assert_eq!(store.stats().payload_bytes, 40);

    // Full: a new value does not fit, a same-size replacement does
    let result = store.set(caller, "app", "e", string("x"), VarFlags::create(), false);
    assert!(matches!(result, Err(VarError::QuotaExceeded(_))));
    store
        .set(caller, "app", "a", string("9876543210"), VarFlags::default(), false)
        .unwrap();

    // Shrinking frees room
    store
        .set(caller, "app", "b", string("01234"), VarFlags::default(), false)
        .unwrap();
    store
        .set(caller, "app", "e", string("abcde"), VarFlags::create(), false)
        .unwrap();

    assert_eq!(store.stats().payload_bytes, 40);
    assert_counters_consistent(&store);
}

#[test]
fn test_owned_cap_per_connection() {
    let store = setup_store_with_limits(1000, 1024, 2);
    let cache = store.register_worker();
    let first = store.open_connection();
    let second = store.open_connection();
    let caller = Caller::new(first, &cache);

    store.set(caller, "app", "o1", Value::Integer(1), owned(), false).unwrap();
    store.set(caller, "app", "o2", Value::Integer(2), owned(), false).unwrap();

    let result = store.set(caller, "app", "o3", Value::Integer(3), owned(), false);
    assert!(matches!(result, Err(VarError::QuotaExceeded(_))));
    assert!(matches!(
        store.increment(caller, "app", "o4", owned(), false),
        Err(VarError::QuotaExceeded(_))
    ));
    assert_eq!(store.owned_count(first), 2);

    // Non-owned variables and other connections are unaffected
    store
        .set(caller, "app", "shared", Value::Integer(0), VarFlags::create(), false)
        .unwrap();
    store
        .set(Caller::new(second, &cache), "app", "o3", Value::Integer(3), owned(), false)
        .unwrap();
    assert_eq!(store.owned_count(second), 1);
}

#[test]
fn test_refused_owned_create_leaves_no_variable() {
    let store = setup_store_with_limits(1000, 1024, 1);
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store.set(caller, "app", "o1", Value::Integer(1), owned(), false).unwrap();
    let before = store.stats();

    // Refused before any slot or index entry is taken
    let result = store.set(caller, "other", "o2", Value::Integer(2), owned(), false);
    assert!(matches!(result, Err(VarError::QuotaExceeded(_))));
    assert!(matches!(store.get(conn, "other", "o2"), Err(VarError::NotFound)));
    assert_eq!(store.stats().variables, before.variables);
    assert_eq!(store.stats().groups, before.groups);
    assert_eq!(store.owned_locations(conn).len(), 1);

    // Filling the index again after a delete still records every entry
    store.delete("app", "o1").unwrap();
    store.set(caller, "other", "o2", Value::Integer(2), owned(), false).unwrap();
    assert_eq!(store.owned_locations(conn).len(), 1);
    assert_eq!(store.release_connection(conn), 1);
    assert_counters_consistent(&store);
}

#[test]
fn test_init_quotas() {
    let mut store = VarStore::default();
    store.init_quotas(20, 400);

    let limits = store.limits();
    assert_eq!(limits.max_vars, 20);
    assert_eq!(limits.max_var_bytes, 400);
    assert_eq!(limits.max_owned, 50);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_delete_last_variable_destroys_group() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store.set(caller, "app", "a", string("1"), VarFlags::create(), false).unwrap();
    store.set(caller, "app", "b", string("22"), VarFlags::create(), false).unwrap();
    assert_eq!(store.stats().slot_capacity, SLOT_CHUNK);
    assert_eq!(store.stats().payload_bytes, 3);

    store.delete("app", "a").unwrap();
    assert_eq!(store.stats().groups, 1);
    // Capacity only drops when the group goes away
    assert_eq!(store.stats().slot_capacity, SLOT_CHUNK);
    assert_eq!(store.stats().payload_bytes, 2);

    store.delete("APP", "B").unwrap();
    assert_eq!(store.stats().groups, 0);
    assert_eq!(store.stats().slot_capacity, 0);
    assert_eq!(store.stats().payload_bytes, 0);
    assert!(store.list_groups().is_empty());
    assert!(matches!(store.list_names("app"), Err(VarError::NotFound)));
}

#[test]
fn test_delete_missing_is_not_found() {
    let store = setup_store();

    assert!(matches!(store.delete("app", "x"), Err(VarError::NotFound)));
    assert!(matches!(store.delete_group("app"), Err(VarError::NotFound)));
}

#[test]
fn test_delete_group_removes_all_variables() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    for i in 0..15 {
        store
            .set(caller, "bulk", &format!("v{}", i), string("data"), VarFlags::create(), false)
            .unwrap();
    }
    store.set(caller, "other", "keep", string("k"), VarFlags::create(), false).unwrap();

    assert_eq!(store.delete_group("BULK").unwrap(), 15);
    assert_eq!(store.list_groups(), vec!["other".to_string()]);
    assert_eq!(store.stats().slot_capacity, SLOT_CHUNK);
    assert_counters_consistent(&store);
}

#[test]
fn test_freed_slots_are_reused() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    for name in ["a", "b", "c"] {
        store.set(caller, "app", name, Value::Integer(0), VarFlags::create(), false).unwrap();
    }
    store.delete("app", "b").unwrap();
    store.set(caller, "app", "d", Value::Integer(0), VarFlags::create(), false).unwrap();

    // "d" lands in the slot "b" left behind
    assert_eq!(
        store.list_names("app").unwrap(),
        vec!["a".to_string(), "d".to_string(), "c".to_string()]
    );
}

#[test]
fn test_groups_listed_in_table_order() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    for group in ["alpha", "beta", "gamma"] {
        store.set(caller, group, "v", Value::Integer(0), VarFlags::create(), false).unwrap();
    }
    store.delete_group("beta").unwrap();
    store.set(caller, "delta", "v", Value::Integer(0), VarFlags::create(), false).unwrap();

    assert_eq!(
        store.list_groups(),
        vec!["alpha".to_string(), "delta".to_string(), "gamma".to_string()]
    );
}

#[test]
fn test_release_connection_deletes_owned_variables() {
    let store = setup_store();
    let cache = store.register_worker();
    let owner = store.open_connection();
    let other = store.open_connection();

    let caller = Caller::new(owner, &cache);
    store.set(caller, "session", "user", string("ann"), owned(), false).unwrap();
    store.set(caller, "session", "token", string("abc"), owned(), false).unwrap();
    store.set(caller, "shared", "motd", string("hi"), VarFlags::create(), false).unwrap();
    assert_eq!(store.owned_count(owner), 2);

    assert_eq!(store.release_connection(owner), 2);

    assert_eq!(store.owned_count(owner), 0);
    assert!(matches!(store.get(other, "session", "user"), Err(VarError::NotFound)));
    assert_eq!(store.list_groups(), vec!["shared".to_string()]);
    assert_eq!(store.get(other, "shared", "motd").unwrap(), string("hi"));
    assert_counters_consistent(&store);

    // Releasing twice is a no-op
    assert_eq!(store.release_connection(owner), 0);
}

#[test]
fn test_deleting_owned_variable_updates_owner_index() {
    let store = setup_store_with_limits(1000, 1024, 2);
    let cache = store.register_worker();
    let owner = store.open_connection();
    let caller = Caller::new(owner, &cache);

    store.set(caller, "app", "o1", Value::Integer(1), owned(), false).unwrap();
    store.set(caller, "app", "o2", Value::Integer(2), owned(), false).unwrap();

    // Another connection deletes one of them
    store.delete("app", "o1").unwrap();
    assert_eq!(store.owned_count(owner), 1);
    assert_eq!(store.owned_locations(owner).len(), 1);

    // The freed quota can be used again
    store.set(caller, "app", "o3", Value::Integer(3), owned(), false).unwrap();
    assert_eq!(store.owned_count(owner), 2);
}

#[test]
fn test_shutdown_clears_everything() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    store.set(caller, "a", "x", string("abc"), owned(), false).unwrap();
    store.set(caller, "b", "y", Value::Integer(1), VarFlags::create(), false).unwrap();

    store.shutdown();

    let stats = store.stats();
    assert_eq!(stats.groups, 0);
    assert_eq!(stats.variables, 0);
    assert_eq!(stats.slot_capacity, 0);
    assert_eq!(stats.payload_bytes, 0);
    assert_eq!(store.owned_count(conn), 0);
    assert_eq!(cache.last_value(), None);

    // Still usable afterwards
    store.set(caller, "a", "x", Value::Integer(2), VarFlags::create(), false).unwrap();
}

// =============================================================================
// Last-Value Cache Tests
// =============================================================================

#[test]
fn test_cache_tracks_last_write() {
    let store = setup_store();
    let cache = store.register_worker();
    let conn = store.open_connection();
    let caller = Caller::new(conn, &cache);

    assert_eq!(cache.last_value(), None);

    store.set(caller, "app", "a", string("first"), VarFlags::create(), false).unwrap();
    assert_eq!(cache.last_value(), Some(string("first")));

    store.increment(caller, "app", "n", VarFlags::create(), false).unwrap();
    assert_eq!(cache.last_value(), Some(Value::Integer(1)));

    // Reads do not touch the cache
    store.get(conn, "app", "a").unwrap();
    assert_eq!(cache.last_value(), Some(Value::Integer(1)));
}

#[test]
fn test_delete_invalidates_other_worker_caches() {
    let store = setup_store();
    let writer_cache = store.register_worker();
    let deleter_cache = store.register_worker();
    let writer = store.open_connection();
    let deleter = store.open_connection();

    store
        .set(Caller::new(writer, &writer_cache), "app", "temp", string("v"), VarFlags::create(), false)
        .unwrap();
    store
        .set(Caller::new(deleter, &deleter_cache), "app", "keep", string("k"), VarFlags::create(), false)
        .unwrap();

    store.delete("app", "temp").unwrap();

    assert_eq!(writer_cache.last_value(), None);
    // Caches of unrelated variables survive
    assert_eq!(deleter_cache.last_value(), Some(string("k")));
}

#[test]
fn test_recreated_variable_does_not_revive_cache() {
    let store = setup_store();
    let cache = store.register_worker();
    let other_cache = store.register_worker();
    let conn = ConnId(77);

    store
        .set(Caller::new(conn, &cache), "app", "v", Value::Integer(1), VarFlags::create(), false)
        .unwrap();
    store.delete("app", "v").unwrap();
    store
        .set(Caller::new(conn, &other_cache), "app", "v", Value::Integer(2), VarFlags::create(), false)
        .unwrap();

    assert_eq!(cache.last_value(), None);
    assert_eq!(other_cache.last_value(), Some(Value::Integer(2)));
}
