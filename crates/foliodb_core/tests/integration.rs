//! End-to-end CRUD and index scenarios against a real on-disk database.

use foliodb_core::{CoreError, Database, Document, Value};
use tempfile::tempdir;

#[test]
fn insert_then_find_by_id_roundtrips() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path().join("db")).unwrap();
    let users = db.create_collection("users").unwrap();

    let id = users
        .insert(Document::new().with("name", "Ada").with("age", 37))
        .unwrap();

    let found = users.find_by_id(&id).unwrap();
    // The stored document is the inserted one plus the generated _id.
    assert_eq!(found.get("name"), Some(&Value::from("Ada")));
    assert_eq!(found.get("age"), Some(&Value::Integer(37)));
    assert_eq!(found.id(), Some(id.as_str()));
    assert_eq!(found.len(), 3);
}

#[test]
fn unique_index_rejects_duplicate() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path().join("db")).unwrap();
    let users = db.create_collection("users").unwrap();
    users.create_index("email", true).unwrap();

    users.insert(Document::new().with("email", "a@x")).unwrap();
    let result = users.insert(Document::new().with("email", "a@x"));
    assert!(matches!(result, Err(CoreError::UniqueViolation { .. })));

    assert_eq!(users.all_documents().unwrap().len(), 1);
}

#[test]
fn index_built_over_existing_documents_matches_scan() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path().join("db")).unwrap();
    let users = db.create_collection("users").unwrap();

    let id30a = users.insert(Document::new().with("age", 30)).unwrap();
    let id30b = users.insert(Document::new().with("age", 30)).unwrap();
    users.insert(Document::new().with("age", 31)).unwrap();

    users.create_index("age", false).unwrap();

    let thirty = users.find_by_field("age", &Value::Integer(30)).unwrap();
    let ids: Vec<&str> = thirty.iter().filter_map(Document::id).collect();
    assert_eq!(ids, [id30a.as_str(), id30b.as_str()]);

    let thirty_one = users.find_by_field("age", &Value::Integer(31)).unwrap();
    assert_eq!(thirty_one.len(), 1);
}

#[test]
fn find_by_field_agrees_indexed_and_unindexed() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path().join("db")).unwrap();
    let users = db.create_collection("users").unwrap();

    for (name, city) in [("Ada", "London"), ("Blaise", "Paris"), ("Alan", "London")] {
        users
            .insert(Document::new().with("name", name).with("city", city))
            .unwrap();
    }

    let value = Value::from("London");
    let scanned = users.find_by_field("city", &value).unwrap();

    users.create_index("city", false).unwrap();
    let indexed = users.find_by_field("city", &value).unwrap();

    let mut scanned_names: Vec<&str> = scanned
        .iter()
        .filter_map(|d| d.get("name").and_then(Value::as_str))
        .collect();
    let mut indexed_names: Vec<&str> = indexed
        .iter()
        .filter_map(|d| d.get("name").and_then(Value::as_str))
        .collect();
    scanned_names.sort_unstable();
    indexed_names.sort_unstable();
    assert_eq!(scanned_names, ["Ada", "Alan"]);
    assert_eq!(indexed_names, scanned_names);
}

#[test]
fn numeric_lookup_coerces_between_integer_and_float() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path().join("db")).unwrap();
    let readings = db.create_collection("readings").unwrap();
    readings.create_index("level", false).unwrap();

    readings.insert(Document::new().with("level", 30)).unwrap();
    readings.insert(Document::new().with("level", 30.0)).unwrap();
    readings.insert(Document::new().with("level", 30.5)).unwrap();

    // Integer(30) and Float(30.0) share one posting list.
    assert_eq!(
        readings.find_by_field("level", &Value::Integer(30)).unwrap().len(),
        2
    );
    assert_eq!(
        readings.find_by_field("level", &Value::Float(30.0)).unwrap().len(),
        2
    );
    assert_eq!(
        readings.find_by_field("level", &Value::Float(30.5)).unwrap().len(),
        1
    );
}

#[test]
fn update_is_replacement_and_maintains_indexes() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path().join("db")).unwrap();
    let users = db.create_collection("users").unwrap();
    users.create_index("email", true).unwrap();

    let id = users
        .insert(Document::new().with("email", "a@x").with("age", 37))
        .unwrap();

    users
        .update(&id, Document::new().with("email", "b@x"))
        .unwrap();

    let doc = users.find_by_id(&id).unwrap();
    assert_eq!(doc.get("email"), Some(&Value::from("b@x")));
    assert!(doc.get("age").is_none(), "update must replace, not merge");

    // The old value is free again, the new one taken.
    users.insert(Document::new().with("email", "a@x")).unwrap();
    let result = users.insert(Document::new().with("email", "b@x"));
    assert!(matches!(result, Err(CoreError::UniqueViolation { .. })));
}

#[test]
fn delete_then_find_fails() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path().join("db")).unwrap();
    let users = db.create_collection("users").unwrap();

    let id = users.insert(Document::new().with("name", "Ada")).unwrap();
    users.delete(&id).unwrap();

    assert!(matches!(
        users.find_by_id(&id),
        Err(CoreError::DocumentNotFound { .. })
    ));
    assert!(users.all_documents().unwrap().is_empty());
}

#[test]
fn document_files_are_named_after_their_id() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("db");
    let db = Database::open(&root).unwrap();
    let users = db.create_collection("users").unwrap();

    let id = users.insert(Document::new().with("name", "Ada")).unwrap();

    let path = root.join("users").join(format!("{id}.json"));
    assert!(path.is_file());
    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["_id"], id.as_str());
}

#[test]
fn indexes_are_not_persisted_across_reopen() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("db");

    {
        let db = Database::open(&root).unwrap();
        let users = db.create_collection("users").unwrap();
        users.create_index("email", true).unwrap();
        users.insert(Document::new().with("email", "a@x")).unwrap();
        assert_eq!(users.index_fields(), ["email"]);
    }

    let db = Database::open(&root).unwrap();
    let users = db.collection("users").unwrap();

    // The index is gone, but the data is still queryable by scan, and
    // the index can be rebuilt from the documents.
    assert!(users.index_fields().is_empty());
    assert_eq!(users.find_by_field("email", &Value::from("a@x")).unwrap().len(), 1);

    users.create_index("email", true).unwrap();
    assert_eq!(users.find_by_field("email", &Value::from("a@x")).unwrap().len(), 1);
}
