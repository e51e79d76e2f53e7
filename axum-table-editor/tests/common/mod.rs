//! Shared fixtures for the integration tests

#![allow(dead_code)]

use axum_table_editor::{ExportPolicy, SqliteProvider, TableService, TableVisibility};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Rows seeded into `events`
pub const EVENT_COUNT: i64 = 75;

/// In-memory database with an `items` table, an `events` table for
/// pagination, a text-keyed `codes` table, a keyless `notes` table and a
/// hidden `z_secrets` table
pub async fn seeded_pool() -> SqlitePool {
    // One connection that never expires, otherwise each new connection would
    // open a fresh empty in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let statements = [
        "CREATE TABLE items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            price REAL,
            category TEXT
        )",
        "INSERT INTO items (name, price, category) VALUES
            ('Gadget', 24.5, 'tools'),
            ('Gizmo', 3.25, 'toys'),
            ('Doohickey', NULL, 'tools')",
        "CREATE TABLE events (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            payload TEXT
        )",
        "CREATE TABLE codes (code TEXT PRIMARY KEY, label TEXT)",
        "INSERT INTO codes (code, label) VALUES ('007', 'bond'), ('42', 'answer')",
        "CREATE TABLE notes (id INTEGER, body TEXT)",
        "INSERT INTO notes (id, body) VALUES (1, 'first'), (2, 'second')",
        "CREATE TABLE z_secrets (id INTEGER PRIMARY KEY, value TEXT)",
        "INSERT INTO z_secrets (value) VALUES ('hunter2')",
    ];
    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    for index in 1..=EVENT_COUNT {
        let kind = if index % 3 == 0 { "error" } else { "info" };
        sqlx::query("INSERT INTO events (id, kind, payload) VALUES (?, ?, ?)")
            .bind(index)
            .bind(kind)
            .bind(format!("event number {}", index))
            .execute(&pool)
            .await
            .unwrap();
    }

    pool
}

pub fn service(pool: SqlitePool) -> TableService<SqliteProvider> {
    TableService::new(
        Arc::new(SqliteProvider::new(pool)),
        TableVisibility::default(),
        ExportPolicy::unlimited(),
    )
}

pub async fn row_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
