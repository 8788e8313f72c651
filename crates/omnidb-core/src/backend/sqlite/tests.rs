//! Tests for SQLite backend

use std::time::Duration;

use super::worker::{classify, declared_type};
use super::{SQLITE_BUSY_TIMEOUT, SQLITE_FOREIGN_KEYS, SqliteBackend};
use crate::error::{DbError, ErrorClass};
use crate::handle::{Handle, HandleState};
use crate::options::{OptionId, OptionValue};
use crate::types::{BindMethod, ColumnType, ResultStatus, RowStatus, Value};

async fn memory_handle() -> Handle {
    let mut handle = Handle::init(Box::new(SqliteBackend::new()), "", "")
        .await
        .unwrap();
    handle
        .bind(":memory:", "", "", BindMethod::Simple)
        .await
        .unwrap();
    handle
}

/// Run `sql` to completion, discarding output
async fn exec(handle: &mut Handle, sql: &str) {
    handle.query(sql).await.unwrap();
    while handle.result(None, 0).await.unwrap() != ResultStatus::Done {}
    handle.result_finish().await.unwrap();
}

/// Collect every row of the current result set as text
async fn collect_rows(handle: &mut Handle, chunk: usize) -> Vec<Vec<Option<String>>> {
    let mut out = Vec::new();
    loop {
        let status = handle.result(None, chunk).await.unwrap();
        if status != ResultStatus::Rows {
            break;
        }
        while handle.row_fetch().unwrap() == RowStatus::Row {
            let width = handle.column_count().unwrap();
            let row = (0..width)
                .map(|i| handle.field_value(i).unwrap().map(|v| v.into_owned()))
                .collect();
            out.push(row);
        }
    }
    out
}

#[tokio::test]
async fn test_select_literal() {
    let mut handle = memory_handle().await;
    handle.query("SELECT 1;").await.unwrap();

    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Rows);
    assert_eq!(handle.column_count().unwrap(), 1);
    assert_eq!(handle.column_name(0).unwrap(), "1");
    assert_eq!(handle.column_type(0).unwrap(), ColumnType::Integer);
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Row);
    assert_eq!(handle.field_value(0).unwrap().as_deref(), Some("1"));
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Done);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Done);

    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_update_reports_rows_affected() {
    let mut handle = memory_handle().await;
    exec(
        &mut handle,
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT); \
         INSERT INTO t (name) VALUES ('a'), ('b'), ('c')",
    )
    .await;

    handle.query("UPDATE t SET name = 'z' WHERE id > 1").await.unwrap();
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert_eq!(handle.rows_affected().unwrap(), 2);
    assert_eq!(handle.column_count().unwrap(), 0);
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Done);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Done);
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_commented_statements_report_rows_affected() {
    let mut handle = memory_handle().await;
    exec(
        &mut handle,
        "CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1), (2), (3)",
    )
    .await;

    handle
        .query(
            "-- bump all rows\nUPDATE t SET x = 1; \
             /* trim */ DELETE FROM t WHERE rowid = 1; \
             CREATE INDEX tx ON t (x)",
        )
        .await
        .unwrap();
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert_eq!(handle.rows_affected().unwrap(), 3);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert_eq!(handle.rows_affected().unwrap(), 1);
    // DDL changes no rows even right after DML
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert_eq!(handle.rows_affected().unwrap(), 0);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Done);
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_syntax_error_is_permanent() {
    let mut handle = memory_handle().await;
    handle.query("BOGUS SQL").await.unwrap();

    let err = handle.result(None, 25).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Permanent);
    assert!(handle.error().contains("syntax error"), "{}", handle.error());
    assert_eq!(handle.error_type(), ErrorClass::Permanent);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Done);

    handle.result_finish().await.unwrap();
    assert_eq!(handle.state(), HandleState::Bound);
    exec(&mut handle, "SELECT 1").await;
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_error_aborts_remaining_statements() {
    let mut handle = memory_handle().await;
    exec(&mut handle, "CREATE TABLE t (x INTEGER)").await;

    handle
        .query("INSERT INTO t VALUES (1); INSERT INTO nosuch VALUES (2); INSERT INTO t VALUES (3)")
        .await
        .unwrap();
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert!(handle.result(None, 25).await.is_err());
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Done);
    handle.result_finish().await.unwrap();

    handle.query("SELECT count(*) FROM t").await.unwrap();
    let rows = collect_rows(&mut handle, 25).await;
    assert_eq!(rows, vec![vec![Some("1".to_string())]]);
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_multiple_statements_in_order() {
    let mut handle = memory_handle().await;
    handle
        .query(
            "CREATE TABLE t (x INTEGER, label VARCHAR(10)); \
             INSERT INTO t VALUES (1, 'one'), (2, NULL); \
             SELECT x, label FROM t ORDER BY x; \
             DELETE FROM t",
        )
        .await
        .unwrap();

    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert_eq!(handle.rows_affected().unwrap(), 2);

    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Rows);
    assert_eq!(handle.set_index().unwrap(), 2);
    assert_eq!(handle.column_type(0).unwrap(), ColumnType::Integer);
    assert_eq!(handle.column_type(1).unwrap(), ColumnType::VarChar);
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Row);
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Row);
    assert!(handle.field_isnull(1).unwrap());
    assert_eq!(handle.field_value(1).unwrap(), None);
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Done);

    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::NoRows);
    assert_eq!(handle.rows_affected().unwrap(), 2);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Done);
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_chunking_preserves_rows() {
    let mut handle = memory_handle().await;
    exec(
        &mut handle,
        "CREATE TABLE n (v INTEGER); \
         WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 10) \
         INSERT INTO n SELECT x FROM c",
    )
    .await;

    for chunk in [1usize, 3, 4, 10, 11, 0] {
        handle.query("SELECT v FROM n ORDER BY v").await.unwrap();
        let mut seen = Vec::new();
        let mut chunks = 0;
        while handle.result(None, chunk).await.unwrap() == ResultStatus::Rows {
            assert_eq!(handle.chunk_index().unwrap(), chunks);
            chunks += 1;
            let len = handle.chunk_len().unwrap();
            if chunk > 0 {
                assert!(len <= chunk);
            }
            while handle.row_fetch().unwrap() == RowStatus::Row {
                seen.push(handle.field(0).unwrap().as_i64().unwrap());
            }
        }
        handle.result_finish().await.unwrap();

        assert_eq!(seen, (1..=10).collect::<Vec<i64>>(), "chunk {}", chunk);
        let expected = if chunk == 0 { 1 } else { 10_usize.div_ceil(chunk) };
        assert_eq!(chunks, expected, "chunk {}", chunk);
    }
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_empty_select_yields_empty_chunk() {
    let mut handle = memory_handle().await;
    exec(&mut handle, "CREATE TABLE t (x INTEGER)").await;

    handle.query("SELECT x FROM t").await.unwrap();
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Rows);
    assert_eq!(handle.column_name(0).unwrap(), "x");
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Done);
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Done);
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

const SLOW_QUERY: &str = "WITH RECURSIVE c(x) AS \
    (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000) \
    SELECT count(*) FROM c";

#[tokio::test]
async fn test_zero_timeout_then_wait() {
    let mut handle = memory_handle().await;
    handle.query(SLOW_QUERY).await.unwrap();

    let status = handle.result(Some(Duration::ZERO), 25).await.unwrap();
    assert_eq!(status, ResultStatus::Timeout);
    assert_eq!(handle.state(), HandleState::QueryActive);

    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Rows);
    assert_eq!(handle.row_fetch().unwrap(), RowStatus::Row);
    assert_eq!(handle.field(0).unwrap(), &Value::Integer(1_000_000));
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_abandon_running_query() {
    let mut handle = memory_handle().await;
    handle.query(SLOW_QUERY).await.unwrap();
    assert_eq!(
        handle.result(Some(Duration::ZERO), 25).await.unwrap(),
        ResultStatus::Timeout
    );
    handle.result_finish().await.unwrap();

    exec(&mut handle, "SELECT 1").await;
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_invalid_utf8_text_keeps_stored_bytes() {
    let mut handle = memory_handle().await;
    exec(
        &mut handle,
        "CREATE TABLE t (s TEXT); INSERT INTO t VALUES (CAST(x'41ff42' AS TEXT)), ('hé')",
    )
    .await;

    handle.query("SELECT s FROM t ORDER BY rowid").await.unwrap();
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Rows);
    assert_eq!(handle.column_type(0).unwrap(), ColumnType::Clob);

    handle.row_fetch().unwrap();
    assert_eq!(handle.field_length(0).unwrap(), 3);
    assert_eq!(handle.field(0).unwrap(), &Value::Blob(vec![0x41, 0xff, 0x42]));
    assert_eq!(
        handle.field_value(0).unwrap().as_deref(),
        Some("A\u{fffd}B")
    );

    handle.row_fetch().unwrap();
    assert_eq!(handle.field_length(0).unwrap(), 3);
    assert_eq!(handle.field(0).unwrap(), &Value::Text("hé".to_string()));
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let host = dir.path().to_str().unwrap();

    let mut handle = Handle::init(Box::new(SqliteBackend::new()), host, "")
        .await
        .unwrap();
    handle.bind("app.db", "", "", BindMethod::Simple).await.unwrap();
    exec(
        &mut handle,
        "CREATE TABLE kv (k TEXT, v BLOB); INSERT INTO kv VALUES ('a', x'0102')",
    )
    .await;
    handle.unbind().await.unwrap();

    handle.bind("app.db", "", "", BindMethod::Simple).await.unwrap();
    handle.query("SELECT k, v FROM kv").await.unwrap();
    assert_eq!(handle.result(None, 25).await.unwrap(), ResultStatus::Rows);
    assert_eq!(handle.column_type(1).unwrap(), ColumnType::Blob);
    handle.row_fetch().unwrap();
    assert_eq!(handle.field(1).unwrap(), &Value::Blob(vec![1, 2]));
    assert_eq!(handle.field_length(1).unwrap(), 2);
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();

    assert!(dir.path().join("app.db").exists());
}

#[tokio::test]
async fn test_init_requires_directory() {
    let err = Handle::init(Box::new(SqliteBackend::new()), "/definitely/not/here", "")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Connect { .. }));
}

#[tokio::test]
async fn test_bind_failure_is_auth_error() {
    let dir = tempfile::tempdir().unwrap();
    let host = dir.path().to_str().unwrap();
    let mut handle = Handle::init(Box::new(SqliteBackend::new()), host, "")
        .await
        .unwrap();

    let err = handle
        .bind("missing/sub/dir.db", "", "", BindMethod::Simple)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Auth { .. }));
    assert_eq!(handle.state(), HandleState::Init);

    let err = handle
        .bind(
            "x.db",
            "",
            "",
            BindMethod::Sasl {
                mechanism: "PLAIN".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotSupported { .. }));
    handle.finish().await.unwrap();
}

#[tokio::test]
async fn test_options() {
    let mut handle = memory_handle().await;

    assert_eq!(
        handle.get_option(OptionId::API_VERSION).unwrap(),
        OptionValue::Int(1)
    );
    assert_eq!(
        handle.get_option(OptionId::THREAD_SAFE).unwrap(),
        OptionValue::Flag(true)
    );
    assert!(matches!(
        handle.get_option(OptionId::TLS),
        Err(DbError::NotSupported { .. })
    ));
    assert_eq!(
        handle.get_option(SQLITE_BUSY_TIMEOUT).unwrap(),
        OptionValue::Int(5000)
    );

    handle
        .set_option(OptionId::MULTI_STATEMENTS, OptionValue::Flag(false))
        .unwrap();
    let err = handle.query("SELECT 1; SELECT 2").await.unwrap_err();
    assert!(matches!(err, DbError::Backend { .. }));
    assert_eq!(err.class(), ErrorClass::Permanent);
    assert!(handle.error().contains("multi_statements"));
    assert_eq!(handle.state(), HandleState::Bound);
    exec(&mut handle, "SELECT 1").await;

    handle
        .set_option(SQLITE_FOREIGN_KEYS, OptionValue::Flag(true))
        .unwrap();
    handle.query("PRAGMA foreign_keys").await.unwrap();
    let rows = collect_rows(&mut handle, 25).await;
    assert_eq!(rows, vec![vec![Some("1".to_string())]]);
    handle.result_finish().await.unwrap();
    handle.finish().await.unwrap();
}

#[test]
fn test_declared_type_affinity() {
    assert_eq!(declared_type(Some("INTEGER")), ColumnType::Integer);
    assert_eq!(declared_type(Some("bigint")), ColumnType::BigInt);
    assert_eq!(declared_type(Some("VARCHAR(20)")), ColumnType::VarChar);
    assert_eq!(declared_type(Some("TEXT")), ColumnType::Clob);
    assert_eq!(declared_type(Some("DOUBLE PRECISION")), ColumnType::Double);
    assert_eq!(declared_type(Some("DATETIME")), ColumnType::Timestamp);
    assert_eq!(declared_type(Some("DATE")), ColumnType::Date);
    assert_eq!(declared_type(Some("BOOLEAN")), ColumnType::Boolean);
    assert_eq!(declared_type(Some("NUMERIC(10,2)")), ColumnType::Decimal);
    assert_eq!(declared_type(None), ColumnType::Unknown);
}

#[test]
fn test_classify_busy_is_transient() {
    let busy = rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        Some("database is locked".into()),
    );
    let err = classify(busy);
    assert_eq!(err.class(), ErrorClass::Transient);
    assert_eq!(err.message(), "database is locked");

    let constraint = rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
        None,
    );
    assert_eq!(classify(constraint).class(), ErrorClass::Permanent);

    assert_eq!(
        classify(rusqlite::Error::InvalidQuery).class(),
        ErrorClass::Unknown
    );
}
