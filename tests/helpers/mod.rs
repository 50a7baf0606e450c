#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use checkpoint::db::DbResult;
use checkpoint::{Connection, DbError, Row, SqliteConnection};

/// Customers <- Orders <- OrderLines, plus an unrelated Products table.
pub const SHOP_SCHEMA: &str = "
CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL REFERENCES customers(id)
);
CREATE TABLE order_lines (
    id INTEGER PRIMARY KEY,
    order_id INTEGER NOT NULL REFERENCES orders(id),
    product_id INTEGER NOT NULL REFERENCES products(id)
);
CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
";

pub const SHOP_DATA: &str = "
INSERT INTO customers (id, name) VALUES (1, 'Ada'), (2, 'Grace');
INSERT INTO products (id, name) VALUES (1, 'Widget');
INSERT INTO orders (id, customer_id) VALUES (1, 1), (2, 2), (3, 2);
INSERT INTO order_lines (id, order_id, product_id) VALUES (1, 1, 1), (2, 3, 1);
";

/// Open a fresh in-memory database with `schema` applied.
pub async fn test_db(schema: &str) -> SqliteConnection {
    let mut conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute(schema).await.unwrap();
    conn
}

/// Open the shop database with sample rows in every table.
pub async fn shop_db() -> SqliteConnection {
    let mut conn = test_db(SHOP_SCHEMA).await;
    conn.execute(SHOP_DATA).await.unwrap();
    conn
}

pub async fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    let rows = conn
        .query(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .await
        .unwrap();
    rows[0].get(0).unwrap().parse().unwrap()
}

pub fn row(values: &[Option<&str>]) -> Row {
    Row::new(values.iter().map(|v| v.map(str::to_owned)).collect())
}

/// Text that only appears in the relationships query of each dialect.
const RELATIONSHIP_MARKERS: &[&str] = &["foreign_key", "pg_constraint", "REFERENCED_TABLE_NAME"];

/// Everything a [`FakeConnection`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Query(String),
    Begin,
    Execute(String),
    Commit,
    Rollback,
}

/// A scripted connection for engines that cannot run in-process.
///
/// Discovery queries are answered from canned rows, routed by the text of
/// the query. Statements are recorded and succeed unless they contain
/// `fail_on` (error) or `hang_on` (never completes in time). BEGIN and
/// COMMIT can be made to hang too.
#[derive(Debug, Default)]
pub struct FakeConnection {
    pub events: Vec<Event>,
    pub server_version: Option<String>,
    pub tables: Vec<Row>,
    pub relationships: Vec<Row>,
    pub temporal_tables: Vec<Row>,
    pub fail_queries: bool,
    pub fail_on: Option<String>,
    pub hang_on: Option<String>,
    pub hang_on_begin: bool,
    pub hang_on_commit: bool,
    pub cancelled: AtomicBool,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Query(_)))
            .count()
    }

    /// Events other than discovery queries.
    pub fn transactions(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| !matches!(e, Event::Query(_)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn database_name(&self) -> Option<String> {
        Some("fake".into())
    }

    fn server_version(&self) -> Option<String> {
        self.server_version.clone()
    }

    async fn query(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        self.events.push(Event::Query(sql.to_owned()));
        if self.fail_queries {
            return Err(DbError::Driver("permission denied".into()));
        }
        let rows = if sql.contains("temporal_type") {
            &self.temporal_tables
        } else if RELATIONSHIP_MARKERS.iter().any(|m| sql.contains(m)) {
            &self.relationships
        } else {
            &self.tables
        };
        Ok(rows.clone())
    }

    async fn execute(&mut self, sql: &str) -> DbResult<()> {
        self.events.push(Event::Execute(sql.to_owned()));
        if self.hang_on.as_deref().is_some_and(|s| sql.contains(s)) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail_on.as_deref().is_some_and(|s| sql.contains(s)) {
            return Err(DbError::Driver(format!("statement failed: {sql}")));
        }
        Ok(())
    }

    async fn begin(&mut self) -> DbResult<()> {
        self.events.push(Event::Begin);
        if self.hang_on_begin {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(())
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.events.push(Event::Commit);
        if self.hang_on_commit {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.events.push(Event::Rollback);
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
