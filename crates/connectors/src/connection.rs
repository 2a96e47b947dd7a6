use crate::error::DriverError;
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use std::fmt;
use tokio_postgres::Client;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseKind {
    MySql,
    Postgres,
    Other(String),
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::MySql => write!(f, "mysql"),
            DatabaseKind::Postgres => write!(f, "postgres"),
            DatabaseKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A live database session returned by a [`Driver`](crate::driver::Driver).
#[async_trait]
pub trait DbConnection: Send + fmt::Debug {
    fn kind(&self) -> DatabaseKind;

    /// Round-trips a trivial query to prove the session is usable.
    async fn ping(&mut self) -> Result<(), DriverError>;

    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

pub type Connection = Box<dyn DbConnection>;

pub struct MySqlConnection {
    conn: mysql_async::Conn,
}

impl MySqlConnection {
    pub(crate) fn new(conn: mysql_async::Conn) -> Self {
        Self { conn }
    }
}

impl fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("id", &self.conn.id())
            .finish()
    }
}

#[async_trait]
impl DbConnection for MySqlConnection {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        let val: Option<i32> = self.conn.query_first("SELECT 1").await?;
        match val {
            Some(1) => Ok(()),
            other => Err(DriverError::Unexpected(format!(
                "MySQL ping returned {other:?}"
            ))),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

pub struct PgConnection {
    client: Client,
}

impl PgConnection {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

#[async_trait]
impl DbConnection for PgConnection {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        let row = self.client.query_one("SELECT 1", &[]).await?;
        let val: i32 = row.try_get(0)?;
        if val != 1 {
            return Err(DriverError::Unexpected(format!(
                "Postgres ping returned {val}"
            )));
        }
        Ok(())
    }

    /// Dropping the client ends the background connection task.
    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        drop(self.client);
        Ok(())
    }
}
