//! Tests against live MySQL and PostgreSQL servers
//!
//! Set `BIFROST_TEST_MYSQL` or `BIFROST_TEST_PGSQL` to
//! `host=...;port=...;database=...;username=...;password=...` to run them.

mod common;

use bifrost_db::query_builder::{InsertData, Where};
use bifrost_db::{ConnectionParams, Database, DatabaseManager, DatabasesConfig, Error, Params};
use common::server_params;
use serde_json::json;

async fn open(params: ConnectionParams) -> (DatabaseManager, Database) {
    let manager = DatabaseManager::new(DatabasesConfig::new().with_default(params));
    let db = manager.database(None).await.unwrap();
    (manager, db)
}

async fn recreate(db: &Database, table: &str, ddl: &str) {
    db.execute_query(&format!("DROP TABLE IF EXISTS {}", table), Params::None)
        .await
        .unwrap();
    db.execute_query(ddl, Params::None).await.unwrap();
}

#[tokio::test]
async fn test_mysql_roundtrip() {
    let Some(params) = server_params("BIFROST_TEST_MYSQL", "mysql") else {
        eprintln!("BIFROST_TEST_MYSQL not set, skipping");
        return;
    };
    let (_manager, db) = open(params).await;
    assert_eq!(db.driver(), "mysql");
    assert!(!db.has_returning());

    recreate(
        &db,
        "bifrost_people",
        "CREATE TABLE bifrost_people (
            id INT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(40) NOT NULL,
            note TEXT NULL,
            active TINYINT(1) NOT NULL DEFAULT 1
        )",
    )
    .await;

    assert!(db.exist_table("bifrost_people").await.unwrap());
    let fields = db.get_det_table("bifrost_people").await.unwrap();
    assert_eq!(fields.len(), 4);
    assert!(fields[0].is_primary_key);
    assert!(!fields[0].nullable);
    assert!(!fields[1].nullable);
    assert!(fields[2].nullable);
    assert_eq!(fields[3].default.as_deref(), Some("1"));

    let id = db
        .insert(
            "bifrost_people",
            InsertData::new().value("name", "O'Hara \\ Co").value("note", "x"),
            "id",
        )
        .await
        .unwrap();
    assert_eq!(id, Some(json!(1)));

    assert!(db
        .exists("bifrost_people", Where::new().eq("name", "O'Hara \\ Co"))
        .await
        .unwrap());

    db.begin().await.unwrap();
    db.delete("bifrost_people", "").await.unwrap();
    db.rollback().await.unwrap();
    assert!(db.exists("bifrost_people", "").await.unwrap());

    assert!(!db.set_actor_context(&json!({"user": 1})).await.unwrap());
    db.execute_query("DROP TABLE bifrost_people", Params::None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_roundtrip() {
    let Some(params) = server_params("BIFROST_TEST_PGSQL", "pgsql") else {
        eprintln!("BIFROST_TEST_PGSQL not set, skipping");
        return;
    };
    let (manager, db) = open(params).await;
    assert_eq!(db.driver(), "pgsql");
    assert!(db.has_returning());

    recreate(
        &db,
        "bifrost_people",
        "CREATE TABLE bifrost_people (
            id SERIAL PRIMARY KEY,
            name VARCHAR(40) NOT NULL,
            note TEXT,
            status TEXT DEFAULT 'new'
        )",
    )
    .await;

    let fields = db.get_det_table("bifrost_people").await.unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "note", "status"]);
    assert!(fields[0].is_primary_key);
    assert!(!fields[1].nullable);
    assert!(fields[2].nullable);
    assert_eq!(fields[3].default.as_deref(), Some("new"));

    let id = db
        .insert("bifrost_people", InsertData::new().value("name", "ada"), "id")
        .await
        .unwrap();
    assert_eq!(id, Some(json!(1)));

    // Without RETURNING the id comes from the session sequence
    let id = db
        .insert("bifrost_people", InsertData::new().value("name", "bob"), "")
        .await
        .unwrap();
    assert_eq!(id, Some(json!(2)));

    let bound = db.clone().with_bound_parameters();
    let rows = bound
        .select(
            &bifrost_db::SelectQuery::new("bifrost_people")
                .filter(Where::new().eq("name", vec!["ada", "bob"]).is_not_null("status"))
                .order_by("id"),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["status"], json!("new"));

    let err = db
        .execute_query("SELECT * FROM bifrost_missing", Params::None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DatabaseQuery(_)));

    let context = json!({"user": 42, "source": "test"});
    assert!(db.set_actor_context(&context).await.unwrap());
    let other = manager.database(None).await.unwrap();
    assert_eq!(other.get_actor_context().await.unwrap(), Some(context));

    db.execute_query("DROP TABLE bifrost_people", Params::None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_bound_values_keep_column_types() {
    let Some(params) = server_params("BIFROST_TEST_PGSQL", "pgsql") else {
        eprintln!("BIFROST_TEST_PGSQL not set, skipping");
        return;
    };
    let (_manager, db) = open(params).await;
    let db = db.with_bound_parameters();

    recreate(
        &db,
        "bifrost_tokens",
        "CREATE TABLE bifrost_tokens (
            id INT PRIMARY KEY,
            token UUID NOT NULL,
            issued DATE NOT NULL
        )",
    )
    .await;

    let token = uuid::Uuid::new_v4();
    let issued = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    for id in [1, 2, 3] {
        db.insert(
            "bifrost_tokens",
            InsertData::new()
                .value("id", id)
                .value("token", if id == 2 { token } else { uuid::Uuid::new_v4() })
                .value("issued", issued),
            "",
        )
        .await
        .unwrap();
    }

    let rows = db
        .select(
            &bifrost_db::SelectQuery::new("bifrost_tokens")
                .filter(Where::new().eq("id", vec![1, 2]).eq("issued", issued))
                .order_by("id"),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["token"], json!(token.to_string()));

    assert!(db
        .exists("bifrost_tokens", Where::new().eq("token", vec![token]))
        .await
        .unwrap());
    assert_eq!(
        db.delete("bifrost_tokens", Where::new().eq("token", token)).await.unwrap(),
        1
    );

    db.execute_query("DROP TABLE bifrost_tokens", Params::None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_insert_without_sequence_keeps_transaction() {
    let Some(params) = server_params("BIFROST_TEST_PGSQL", "pgsql") else {
        eprintln!("BIFROST_TEST_PGSQL not set, skipping");
        return;
    };
    // A fresh manager opens a fresh session, so lastval() is undefined
    let (_manager, db) = open(params).await;

    recreate(
        &db,
        "bifrost_notes",
        "CREATE TABLE bifrost_notes (code TEXT PRIMARY KEY, body TEXT)",
    )
    .await;

    assert!(db.begin().await.unwrap());
    let id = db
        .insert(
            "bifrost_notes",
            InsertData::new().value("code", "a").value("body", "first"),
            "",
        )
        .await
        .unwrap();
    assert_eq!(id, None);

    db.insert("bifrost_notes", InsertData::new().value("code", "b"), "")
        .await
        .unwrap();
    assert!(db.save().await.unwrap());

    let rows = db
        .execute_query("SELECT code FROM bifrost_notes ORDER BY code", Params::None)
        .await
        .unwrap()
        .into_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["code"], json!("a"));

    db.execute_query("DROP TABLE bifrost_notes", Params::None)
        .await
        .unwrap();
}
