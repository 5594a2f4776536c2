mod common;

use bifrost_db::query_builder::InsertData;
use bifrost_db::transaction::{HttpStatus, TransactionScope};
use bifrost_db::Error;
use common::seeded;

#[tokio::test]
async fn test_scope_commits_on_success_status() {
    let (_manager, db) = seeded("scope_commit").await;
    let scope = TransactionScope::new(db.clone());

    scope.before().await.unwrap();
    db.insert("items", InsertData::new().value("note", "kept"), "")
        .await
        .unwrap();
    assert!(scope.after(&HttpStatus(201)).await.unwrap());

    assert!(!db.in_transaction().await);
    assert!(db.exists("items", "note = 'kept'").await.unwrap());
}

#[tokio::test]
async fn test_scope_rolls_back_on_error_status() {
    let (_manager, db) = seeded("scope_rollback").await;
    let scope = TransactionScope::new(db.clone());

    scope.before().await.unwrap();
    db.insert("items", InsertData::new().value("note", "gone"), "")
        .await
        .unwrap();
    assert!(!scope.after(&HttpStatus(500)).await.unwrap());

    assert!(!db.exists("items", "").await.unwrap());
}

#[tokio::test]
async fn test_run_keeps_work_error() {
    let (_manager, db) = seeded("scope_run").await;
    let scope = TransactionScope::new(db.clone());

    let result: bifrost_db::Result<()> = scope
        .run(async {
            db.insert("items", InsertData::new().value("note", "first"), "")
                .await?;
            db.insert("missing_table", InsertData::new().value("note", "x"), "")
                .await?;
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(Error::DatabaseQuery(_))));
    assert!(!db.exists("items", "").await.unwrap());

    let id = scope
        .run(async { db.insert("items", InsertData::new().value("note", "ok"), "").await })
        .await
        .unwrap();
    assert_eq!(id, Some(serde_json::json!(1)));
}

#[tokio::test]
async fn test_before_fails_inside_open_transaction() {
    let (_manager, db) = seeded("scope_nested").await;
    db.begin().await.unwrap();

    let scope = TransactionScope::new(db.clone());
    assert!(scope.before().await.is_err());
    assert!(db.rollback().await.unwrap());
}
