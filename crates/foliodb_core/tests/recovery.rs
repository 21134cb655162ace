//! Crash-and-reopen recovery scenarios.
//!
//! A crash is simulated by dropping the `Database` without terminating
//! its transactions: the WAL files stay behind exactly as they would
//! after a process kill, and the next open must deal with them.

use foliodb_core::{Database, Document, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn wal_file_count(root: &Path) -> usize {
    fs::read_dir(root.join("wal"))
        .unwrap()
        .filter(|e| {
            e.as_ref().unwrap().path().extension().and_then(|x| x.to_str()) == Some("log")
        })
        .count()
}

#[test]
fn reopen_discards_incomplete_transaction() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("db");

    {
        let db = Database::open(&root).unwrap();
        db.create_collection("users").unwrap();

        let tx = db.begin_transaction();
        db.insert_with_transaction(&tx, "users", Document::new().with("name", "Ghost"))
            .unwrap();
        assert_eq!(wal_file_count(&root), 1);

        // Crash: neither commit nor rollback runs.
    }

    let db = Database::open(&root).unwrap();
    assert!(db
        .collection("users")
        .unwrap()
        .all_documents()
        .unwrap()
        .is_empty());
    assert_eq!(wal_file_count(&root), 0);
}

#[test]
fn reopen_discards_several_groups_and_keeps_committed_data() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("db");

    {
        let db = Database::open(&root).unwrap();
        let users = db.create_collection("users").unwrap();
        users.insert(Document::new().with("name", "Durable")).unwrap();

        let committed = db.begin_transaction();
        db.insert_with_transaction(&committed, "users", Document::new().with("name", "AlsoDurable"))
            .unwrap();
        db.commit(&committed).unwrap();

        for n in 0..3 {
            let tx = db.begin_transaction();
            db.insert_with_transaction(&tx, "users", Document::new().with("n", n))
                .unwrap();
            db.insert_with_transaction(&tx, "users", Document::new().with("n", n).with("b", true))
                .unwrap();
        }
        assert_eq!(wal_file_count(&root), 6);
    }

    let db = Database::open(&root).unwrap();
    let docs = db.collection("users").unwrap().all_documents().unwrap();

    let names: Vec<&str> = docs
        .iter()
        .filter_map(|d| d.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, ["Durable", "AlsoDurable"]);
    assert_eq!(docs.len(), 2);
    assert_eq!(wal_file_count(&root), 0);
}

#[test]
fn committed_state_survives_reopen() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("db");
    let id;

    {
        let db = Database::open(&root).unwrap();
        db.create_collection("users").unwrap();

        let tx = db.begin_transaction();
        id = db
            .insert_with_transaction(&tx, "users", Document::new().with("name", "Bob"))
            .unwrap();
        db.commit(&tx).unwrap();
    }

    let db = Database::open(&root).unwrap();
    let doc = db.collection("users").unwrap().find_by_id(&id).unwrap();
    assert_eq!(doc.get("name"), Some(&Value::from("Bob")));
    assert_eq!(wal_file_count(&root), 0);
}

#[test]
fn rolled_back_state_survives_reopen() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("db");

    {
        let db = Database::open(&root).unwrap();
        let users = db.create_collection("users").unwrap();
        users.insert(Document::new().with("name", "Keep")).unwrap();

        let tx = db.begin_transaction();
        db.insert_with_transaction(&tx, "users", Document::new().with("name", "Drop"))
            .unwrap();
        db.rollback(&tx).unwrap();
    }

    let db = Database::open(&root).unwrap();
    let docs = db.collection("users").unwrap().all_documents().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("name"), Some(&Value::from("Keep")));
}
