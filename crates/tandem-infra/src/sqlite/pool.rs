//! Connection pools backing the SQLite document store.
//!
//! Every conversation or session mutation ends in a conditional write on one
//! row of `documents`, so writes go through a single connection and never
//! race each other inside SQLite. Reads of whole documents fan out over a
//! read-only pool. The file runs in WAL mode so readers see the last committed
//! version while a write is in flight.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// File name of the document database inside the data directory.
pub const DATABASE_FILE: &str = "tandem.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader and writer pools over the same document database.
///
/// `reader` serves `get`; `writer` holds the one connection that applies
/// conditional `put`s and migrations.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the document database at `database_url`, creating the file and
    /// the `documents` table when missing.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        // The reader pool opens read-only, so the table must exist first.
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }
}

/// URL of the document database kept in `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}/{DATABASE_FILE}", data_dir.display())
}
