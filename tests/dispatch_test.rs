mod common;

use bifrost_db::database::QueryOutcome;
use bifrost_db::query_builder::InsertData;
use bifrost_db::{Error, Params, QueryArgs, QueryOutput, SqlValue, Where};
use common::seeded;
use indexmap::IndexMap;
use serde_json::json;

async fn fill(db: &bifrost_db::Database) {
    for (note, qty) in [("a", 1), ("b", 2), ("c", 3)] {
        db.query(QueryArgs::insert(
            InsertData::new().value("note", note).value("qty", qty),
            "items",
        ))
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_exists_takes_priority() {
    let (_manager, db) = seeded("dispatch_exists").await;
    fill(&db).await;

    let mut args = QueryArgs::exists("items").filter(Where::new().eq("note", "b"));
    args.query = Some("DELETE FROM items".to_string());
    args.select = Some("*".into());

    assert_eq!(db.query(args).await.unwrap(), QueryOutput::Exists(true));
    assert!(db.exists("items", "").await.unwrap(), "raw delete must not run");
}

#[tokio::test]
async fn test_exists_without_table_falls_through() {
    let (_manager, db) = seeded("dispatch_fallthrough").await;
    fill(&db).await;

    let mut args = QueryArgs::raw("SELECT COUNT(*) AS total FROM items", Params::None).first();
    args.exists = true;

    let output = db.query(args).await.unwrap();
    match output {
        QueryOutput::First(Some(row)) => assert_eq!(row["total"], json!(3)),
        other => panic!("unexpected output: {:?}", other),
    }
}

#[tokio::test]
async fn test_raw_query_beats_builder_groups() {
    let (_manager, db) = seeded("dispatch_raw").await;
    fill(&db).await;

    let mut args = QueryArgs::raw("UPDATE items SET qty = 0 WHERE note = :note", Params::None)
        .params(Params::named().bind("note", "a"));
    args.delete = Some("items".to_string());

    let output = db.query(args).await.unwrap();
    assert_eq!(output, QueryOutput::Outcome(QueryOutcome::Affected(1)));
    assert!(db.exists("items", "note = 'c'").await.unwrap());
}

#[tokio::test]
async fn test_select_group() {
    let (_manager, db) = seeded("dispatch_select").await;
    fill(&db).await;

    let args = QueryArgs::select(vec!["note", "qty"], "items")
        .filter(Where::new().ge("qty", 2))
        .order("qty DESC")
        .limit(1);
    let output = db.query(args).await.unwrap();
    match output {
        QueryOutput::Rows(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["note"], json!("c"));
        }
        other => panic!("unexpected output: {:?}", other),
    }

    let output = db
        .query(QueryArgs::select("*", "items").filter("qty > 10").first())
        .await
        .unwrap();
    assert_eq!(output, QueryOutput::First(None));
}

#[tokio::test]
async fn test_insert_update_delete_groups() {
    let (_manager, db) = seeded("dispatch_crud").await;

    let output = db
        .query(
            QueryArgs::insert(InsertData::new().placeholder("note").value("qty", 7), "items")
                .params(Params::positional(vec!["bound"]))
                .returning("id"),
        )
        .await
        .unwrap();
    assert_eq!(output, QueryOutput::Inserted(Some(json!(1))));

    let mut set = IndexMap::new();
    set.insert("qty".to_string(), SqlValue::from(8));
    let output = db
        .query(QueryArgs::update("items", set).filter(Where::new().eq("note", "bound")))
        .await
        .unwrap();
    assert_eq!(output, QueryOutput::Affected(1));

    let output = db
        .query(QueryArgs::delete("items").filter(Where::new().eq("qty", 8)))
        .await
        .unwrap();
    assert_eq!(output, QueryOutput::Affected(1));
}

#[tokio::test]
async fn test_invalid_and_empty_arguments() {
    let (_manager, db) = seeded("dispatch_invalid").await;

    let mut args = QueryArgs::new();
    args.select = Some("*".into());
    assert!(matches!(db.query(args).await, Err(Error::InvalidInput(_))));

    let args = QueryArgs::update("items", IndexMap::new());
    assert!(matches!(db.query(args).await, Err(Error::InvalidInput(_))));

    let mut args = QueryArgs::new();
    args.insert = Some(InsertData::new().value("note", "x"));
    assert!(matches!(db.query(args).await, Err(Error::InvalidInput(_))));

    // An empty insert data list is not a populated group
    let mut args = QueryArgs::new();
    args.insert = Some(InsertData::new());
    args.into = Some("items".to_string());
    assert_eq!(db.query(args).await.unwrap(), QueryOutput::NotDispatched);

    assert_eq!(db.query(QueryArgs::new()).await.unwrap(), QueryOutput::NotDispatched);
}
