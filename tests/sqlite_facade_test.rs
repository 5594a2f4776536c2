mod common;

use bifrost_db::database::{FieldDescriptor, QueryOutcome};
use bifrost_db::query_builder::{Field, InsertData, SelectQuery, Where};
use bifrost_db::{Error, Params, SqlValue};
use common::{memory_manager, seeded};
use indexmap::IndexMap;
use serde_json::json;

#[tokio::test]
async fn test_tables_and_describe() {
    let (_manager, db) = seeded("describe").await;

    assert_eq!(db.driver(), "sqlite");
    assert!(!db.has_returning());
    assert_eq!(db.get_tables().await.unwrap(), vec!["items"]);
    assert!(db.exist_table("items").await.unwrap());
    assert!(!db.exist_table("missing").await.unwrap());

    let fields = db.get_det_table("items").await.unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "note", "qty"]);

    assert_eq!(
        fields[0],
        FieldDescriptor {
            name: "id".to_string(),
            field_type: "INTEGER".to_string(),
            nullable: false,
            default: None,
            is_primary_key: true,
        }
    );
    assert!(fields[1].nullable);
    assert_eq!(fields[1].default.as_deref(), Some("x"));
    assert!(!fields[1].is_primary_key);
    assert!(!fields[2].nullable);
    assert_eq!(fields[2].default.as_deref(), Some("0"));

    assert!(db.exist_field("items", "qty").await.unwrap());
    assert!(!db.exist_field("items", "price").await.unwrap());
}

#[tokio::test]
async fn test_describe_missing_table_is_empty() {
    let (_manager, db) = seeded("missing").await;
    assert!(db.get_det_table("nope").await.unwrap().is_empty());
    assert!(!db.exist_field("nope", "id").await.unwrap());
}

#[tokio::test]
async fn test_facades_share_the_cached_connection() {
    let manager = memory_manager("shared");
    let first = manager.database(Some("shared")).await.unwrap();
    let second = manager.database(Some("shared")).await.unwrap();

    assert!(first.shares_connection_with(&second));
    assert_eq!(first.cache_key(), "shared:sqlite");

    // An in-memory database only exists on its own connection
    first
        .execute_query("CREATE TABLE marker (id INTEGER)", Params::None)
        .await
        .unwrap();
    assert_eq!(second.get_tables().await.unwrap(), vec!["marker"]);
    assert_eq!(manager.connections().len().await, 1);
}

#[tokio::test]
async fn test_syntax_error_is_database_query_error() {
    let (_manager, db) = seeded("errors").await;

    let err = db.execute_query("SELEC * FROM items", Params::None).await.unwrap_err();
    assert!(matches!(err, Error::DatabaseQuery(_)));
    assert_eq!(err.status_code(), 500);

    let err = db
        .insert("nope", InsertData::new().value("a", 1), "")
        .await
        .unwrap_err();
    assert!(err.is_database_error());
}

#[tokio::test]
async fn test_execute_query_classifies_by_verb() {
    let (_manager, db) = seeded("verbs").await;

    let outcome = db
        .execute_query("INSERT INTO items (note, qty) VALUES ('a', 1), ('b', 2)", Params::None)
        .await
        .unwrap();
    assert_eq!(outcome, QueryOutcome::Affected(2));

    let outcome = db
        .execute_query("  select note from items order by id", Params::None)
        .await
        .unwrap();
    let rows = outcome.into_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["note"], json!("a"));
    assert_eq!(rows[1]["note"], json!("b"));

    let outcome = db
        .execute_query(
            "INSERT INTO items (note) VALUES ('c') RETURNING id",
            Params::None,
        )
        .await
        .unwrap();
    assert_eq!(outcome, QueryOutcome::Returned(Some(json!(3))));

    let outcome = db
        .execute_query("UPDATE items SET qty = qty + 1", Params::None)
        .await
        .unwrap();
    assert_eq!(outcome, QueryOutcome::Affected(3));

    let outcome = db
        .execute_query("UPDATE items SET note = 'Returning' WHERE id = 1", Params::None)
        .await
        .unwrap();
    assert_eq!(outcome, QueryOutcome::Affected(1));
}

#[tokio::test]
async fn test_insert_returns_generated_id() {
    let (_manager, db) = seeded("insert").await;

    let id = db
        .insert("items", InsertData::new().value("note", "first"), "id")
        .await
        .unwrap();
    assert_eq!(id, Some(json!(1)));

    let id = db
        .insert("items", InsertData::new().value("note", "second").value("qty", 4), "")
        .await
        .unwrap();
    assert_eq!(id, Some(json!(2)));
}

#[tokio::test]
async fn test_insert_with_placeholders() {
    let (_manager, db) = seeded("placeholders").await;

    db.insert_with(
        "items",
        InsertData::new().placeholder("note").value("qty", 5),
        "",
        Params::positional(vec!["it's bound"]),
    )
    .await
    .unwrap();

    let rows = db
        .select(&SelectQuery::new("items").fields(vec!["note", "qty"]))
        .await
        .unwrap();
    assert_eq!(rows[0]["note"], json!("it's bound"));
    assert_eq!(rows[0]["qty"], json!(5));
}

#[tokio::test]
async fn test_update_delete_and_exists() {
    let (_manager, db) = seeded("crud").await;
    for note in ["a", "b", "c"] {
        db.insert("items", InsertData::new().value("note", note), "")
            .await
            .unwrap();
    }

    let mut data = IndexMap::new();
    data.insert("qty".to_string(), SqlValue::from(9));
    let updated = db
        .update("items", data, Where::new().eq("note", vec!["a", "b"]))
        .await
        .unwrap();
    assert_eq!(updated, 2);

    assert!(db.exists("items", Where::new().eq("qty", 9)).await.unwrap());
    assert!(!db.exists("items", "qty = 100").await.unwrap());
    assert!(db.exists("items", "").await.unwrap());

    let deleted = db
        .delete("items", Where::any().eq("note", "a").is_null("note"))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let deleted = db.delete("items", "").await.unwrap();
    assert_eq!(deleted, 2);
    assert!(!db.exists("items", "").await.unwrap());
}

#[tokio::test]
async fn test_select_with_all_clauses() {
    let (_manager, db) = seeded("select").await;
    for (note, qty) in [("a", 1), ("a", 2), ("b", 5), ("c", 1)] {
        db.insert("items", InsertData::new().value("note", note).value("qty", qty), "")
            .await
            .unwrap();
    }

    let query = SelectQuery::new("items i")
        .fields(vec![
            Field::aliased("i.note", "label"),
            Field::aliased("SUM(i.qty)", "total"),
        ])
        .join("LEFT JOIN items j ON j.id = i.id")
        .filter(Where::new().ne("i.note", "c"))
        .group_by("i.note")
        .having("SUM(i.qty) > 2")
        .order_by("total DESC")
        .limit(10);

    let rows = db.select(&query).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["label"], json!("b"));
    assert_eq!(rows[0]["total"], json!(5));
    assert_eq!(rows[1]["label"], json!("a"));

    let page = db
        .select(&SelectQuery::new("items").order_by("id").paginate(2, 3))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["id"], json!(4));
}

#[tokio::test]
async fn test_filters_of_empty_groups_match_everything() {
    let (_manager, db) = seeded("empty_groups").await;
    for note in ["a", "b"] {
        db.insert("items", InsertData::new().value("note", note), "")
            .await
            .unwrap();
    }

    let rows = db
        .select(&SelectQuery::new("items").filter(Where::new().or(Where::new())))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    assert!(db.exists("items", Where::new().or(Where::new())).await.unwrap());
    let deleted = db
        .delete("items", Where::new().eq("note", "a").and(Where::any()))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn test_bound_parameters_keep_results() {
    let (_manager, db) = seeded("bound").await;
    let bound = db.clone().with_bound_parameters();
    assert!(bound.shares_connection_with(&db));

    bound
        .insert("items", InsertData::new().value("note", "O'Brien; DROP TABLE items").value("qty", 3), "")
        .await
        .unwrap();

    let rows = bound
        .select(&SelectQuery::new("items").filter(Where::new().eq("note", "O'Brien; DROP TABLE items")))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["qty"], json!(3));

    let mut data = IndexMap::new();
    data.insert("note".to_string(), SqlValue::Null);
    assert_eq!(bound.update("items", data, Where::new().eq("qty", 3)).await.unwrap(), 1);
    assert!(bound.exists("items", Where::new().is_null("note")).await.unwrap());
}

#[tokio::test]
async fn test_transactions() {
    let (manager, db) = seeded("tx").await;
    let other = manager.database(Some("tx")).await.unwrap();

    assert!(db.begin().await.unwrap());
    assert!(other.in_transaction().await);
    db.insert("items", InsertData::new().value("note", "gone"), "")
        .await
        .unwrap();
    assert!(other.rollback().await.unwrap());
    assert!(!db.exists("items", "").await.unwrap());

    db.begin().await.unwrap();
    let err = db.begin().await.unwrap_err();
    assert!(matches!(err, Error::DatabaseQuery(_)));
    db.insert("items", InsertData::new().value("note", "kept"), "")
        .await
        .unwrap();
    assert!(db.save().await.unwrap());
    assert!(db.exists("items", "note = 'kept'").await.unwrap());

    assert!(matches!(db.save().await, Err(Error::DatabaseQuery(_))));
    assert!(matches!(db.rollback().await, Err(Error::DatabaseQuery(_))));
}

#[tokio::test]
async fn test_actor_context_unsupported() {
    let (_manager, db) = seeded("actor").await;
    assert!(!db.set_actor_context(&json!({"user": 7})).await.unwrap());
    assert_eq!(db.get_actor_context().await.unwrap(), None);
}

#[tokio::test]
async fn test_named_parameters_in_raw_sql() {
    let (_manager, db) = seeded("named").await;
    db.execute_query(
        "INSERT INTO items (note, qty) VALUES (:note, :qty)",
        Params::named().bind("note", "n").bind("qty", 2),
    )
    .await
    .unwrap();

    let rows = db
        .execute_query(
            "SELECT qty FROM items WHERE note = :note AND note != ':note'",
            Params::named().bind(":note", "n"),
        )
        .await
        .unwrap()
        .into_rows();
    assert_eq!(rows[0]["qty"], json!(2));

    let err = db
        .execute_query("SELECT :missing", Params::named())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DatabaseQuery(_)));
}
