//! Tests for the filesystem instance store.

use std::fs;
use std::os::unix::fs::PermissionsExt as _;

use ldapaas::instance::{FsInstanceStore, InstanceRecord, InstanceStore as _};
use ldapaas::paths::{LOCK_FILE, RECORD_FILE};
use ldapaas::ErrorKind;

fn record(name: &str, user: &str, port: u16) -> InstanceRecord {
    InstanceRecord {
        name: name.to_string(),
        user: user.to_string(),
        host: "ldap.local".to_string(),
        port,
        base_dn: "dc=example,dc=com".to_string(),
        password: "pw123".to_string(),
    }
}

fn store_with(root: &tempfile::TempDir, records: &[InstanceRecord]) -> FsInstanceStore {
    let store = FsInstanceStore::new(root.path());
    for record in records {
        store.create_area(&record.name).unwrap();
        store.put(&record.name, record).unwrap();
    }
    store
}

#[test]
fn put_then_get() {
    let root = tempfile::tempdir().unwrap();
    let alice = record("alice4200", "alice", 4200);
    let store = store_with(&root, std::slice::from_ref(&alice));

    assert_eq!(store.get("alice4200").unwrap(), alice);
    assert!(store.exists("alice4200").unwrap());
}

#[test]
fn record_file_is_private() {
    let root = tempfile::tempdir().unwrap();
    let store = store_with(&root, &[record("alice4200", "alice", 4200)]);

    let path = store.instance_dir("alice4200").join(RECORD_FILE);
    let mode = fs::metadata(path).unwrap().permissions().mode();
    assert_eq!(mode & 0o077, 0);
}

#[test]
fn existing_area_or_record_is_already_exists() {
    let root = tempfile::tempdir().unwrap();
    let alice = record("alice4200", "alice", 4200);
    let store = store_with(&root, std::slice::from_ref(&alice));

    assert_eq!(
        store.create_area("alice4200").unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );
    let mut changed = alice.clone();
    changed.password = "other".to_string();
    assert_eq!(
        store.put("alice4200", &changed).unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );
    assert_eq!(store.get("alice4200").unwrap(), alice);
}

#[test]
fn put_rejects_mismatched_name() {
    let root = tempfile::tempdir().unwrap();
    let store = FsInstanceStore::new(root.path());
    store.create_area("alice4200").unwrap();

    let err = store
        .put("alice4200", &record("bob4201", "bob", 4201))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn missing_entries_are_not_found() {
    let root = tempfile::tempdir().unwrap();
    let store = FsInstanceStore::new(root.path());

    assert_eq!(store.get("ghost").unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(store.remove("ghost").unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        store
            .put("ghost", &record("ghost", "g", 4200))
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
    assert!(!store.exists("ghost").unwrap());
}

#[test]
fn unparseable_record_is_corrupt() {
    let root = tempfile::tempdir().unwrap();
    let store = store_with(&root, &[record("alice4200", "alice", 4200)]);
    let path = store.instance_dir("alice4200").join(RECORD_FILE);

    fs::write(&path, "{\"name\": \"alice4200\"").unwrap();
    assert_eq!(store.get("alice4200").unwrap_err().kind(), ErrorKind::Corrupt);

    fs::write(&path, "{\"name\": \"alice4200\", \"user\": \"alice\"}").unwrap();
    assert_eq!(store.get("alice4200").unwrap_err().kind(), ErrorKind::Corrupt);
}

#[test]
fn record_under_wrong_key_is_corrupt() {
    let root = tempfile::tempdir().unwrap();
    let store = store_with(&root, &[record("alice4200", "alice", 4200)]);
    let moved = serde_json::to_string(&record("bob4201", "bob", 4201)).unwrap();
    fs::write(store.instance_dir("alice4200").join(RECORD_FILE), moved).unwrap();

    assert_eq!(store.get("alice4200").unwrap_err().kind(), ErrorKind::Corrupt);
}

#[test]
fn keys_that_are_not_tokens_never_touch_disk() {
    let root = tempfile::tempdir().unwrap();
    let store = FsInstanceStore::new(root.path().join("instances"));

    for name in ["", "../etc", "a/b", "bad name", ".lock"] {
        assert_eq!(
            store.create_area(name).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(store.get(name).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(
            store.remove(name).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
    assert_eq!(
        store.list("../").unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert!(!root.path().join("instances").exists());
}

#[test]
fn list_filters_by_prefix_and_skips_non_instances() {
    let root = tempfile::tempdir().unwrap();
    let store = store_with(
        &root,
        &[
            record("bob4202", "bob", 4202),
            record("alice4200", "alice", 4200),
            record("alice4201", "alice", 4201),
        ],
    );
    // A lock file, a stray file and an area without a record.
    fs::write(root.path().join(LOCK_FILE), "").unwrap();
    fs::write(root.path().join("notes"), "x").unwrap();
    store.create_area("alice4299").unwrap();

    assert_eq!(
        store.list("").unwrap(),
        vec!["alice4200", "alice4201", "bob4202"]
    );
    assert_eq!(store.list("alice").unwrap(), vec!["alice4200", "alice4201"]);
    assert!(store.list("carol").unwrap().is_empty());
}

#[test]
fn remove_deletes_whole_area() {
    let root = tempfile::tempdir().unwrap();
    let store = store_with(&root, &[record("alice4200", "alice", 4200)]);
    store
        .write_artifact("alice4200", "install.inf", "[General]\n")
        .unwrap();
    fs::create_dir(store.instance_dir("alice4200").join("db")).unwrap();

    store.remove("alice4200").unwrap();
    assert!(!store.instance_dir("alice4200").exists());
    assert!(store.list("").unwrap().is_empty());
}

#[test]
fn write_artifact_replaces_contents() {
    let root = tempfile::tempdir().unwrap();
    let store = FsInstanceStore::new(root.path());
    store.create_area("alice4200").unwrap();

    let path = store
        .write_artifact("alice4200", "install.inf", "first")
        .unwrap();
    store
        .write_artifact("alice4200", "install.inf", "second")
        .unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "second");
}
