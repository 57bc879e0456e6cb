use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use visitlog_common::{Error, FileInfo, NewVisit, PurgedVisit, Result, Visit};

use crate::schema::VISIT_SCHEMA_V1;
use crate::store::VisitStore;

/// SQLite-backed visit log and file summary table.
///
/// All access goes through one connection behind a mutex, so writes are
/// serialized and each operation runs inside its own transaction.
pub struct SqliteVisitStore {
    conn: Mutex<Connection>,
}

impl SqliteVisitStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening visit store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open visit database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.connection()?;
        debug!(
            "ensuring schema v{} ({})",
            VISIT_SCHEMA_V1.version, VISIT_SCHEMA_V1.name
        );
        conn.execute_batch(VISIT_SCHEMA_V1.sql)
            .map_err(|e| Error::Database(format!("visit store migration failed: {e}")))?;

        Ok(())
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("visit database lock poisoned".into()))
    }

    fn find_file_info_sync(&self, filepath: &str) -> Result<Option<FileInfo>> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT id, filepath, filetype, projectname, lastmodification
             FROM fileinfo WHERE filepath = ?1",
            params![filepath],
            row_to_file_info,
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to look up file info: {e}")))
    }

    fn record_visit_sync(&self, visit: &NewVisit) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;

        // filetype and projectname stick to whatever the first visit reported
        tx.execute(
            "INSERT INTO fileinfo (filepath, filetype, projectname, lastmodification)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(filepath) DO UPDATE SET lastmodification = excluded.lastmodification",
            params![visit.filepath, visit.filetype, visit.projectname, visit.exit],
        )
        .map_err(|e| Error::Database(format!("failed to upsert file info: {e}")))?;

        tx.execute(
            "INSERT INTO visits (entry, exit, keystrokes, filepath) VALUES (?1, ?2, ?3, ?4)",
            params![visit.entry, visit.exit, visit.keystrokes, visit.filepath],
        )
        .map_err(|e| Error::Database(format!("failed to insert visit: {e}")))?;

        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit visit: {e}")))
    }

    fn purge_sync(&self, threshold_secs: f64) -> Result<Vec<PurgedVisit>> {
        let mut conn = self.connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;

        let purged = {
            let mut stmt = tx
                .prepare(
                    "SELECT filepath, entry, exit FROM visits
                     WHERE (exit - entry) > ?1
                     ORDER BY id",
                )
                .map_err(|e| Error::Database(format!("failed to prepare purge query: {e}")))?;

            let rows = stmt
                .query_map(params![threshold_secs], |row| {
                    Ok(PurgedVisit {
                        filepath: row.get(0)?,
                        entry: row.get(1)?,
                        exit: row.get(2)?,
                    })
                })
                .map_err(|e| Error::Database(format!("failed to select stale visits: {e}")))?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Database(format!("failed to collect stale visits: {e}")))?
        };

        let deleted = tx
            .execute(
                "DELETE FROM visits WHERE (exit - entry) > ?1",
                params![threshold_secs],
            )
            .map_err(|e| Error::Database(format!("failed to delete stale visits: {e}")))?;
        debug_assert_eq!(deleted, purged.len());

        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit purge: {e}")))?;

        Ok(purged)
    }

    fn list_visits_sync(&self) -> Result<Vec<Visit>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT id, entry, exit, keystrokes, filepath FROM visits ORDER BY id")
            .map_err(|e| Error::Database(format!("failed to prepare visit query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Visit {
                    id: row.get(0)?,
                    entry: row.get(1)?,
                    exit: row.get(2)?,
                    keystrokes: row.get(3)?,
                    filepath: row.get(4)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to query visits: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect visits: {e}")))
    }

    fn list_file_infos_sync(&self) -> Result<Vec<FileInfo>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, filepath, filetype, projectname, lastmodification
                 FROM fileinfo ORDER BY id",
            )
            .map_err(|e| Error::Database(format!("failed to prepare file info query: {e}")))?;

        let rows = stmt
            .query_map([], row_to_file_info)
            .map_err(|e| Error::Database(format!("failed to query file info: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect file info: {e}")))
    }
}

#[async_trait]
impl VisitStore for SqliteVisitStore {
    async fn find_file_info(&self, filepath: &str) -> Result<Option<FileInfo>> {
        self.find_file_info_sync(filepath)
    }

    async fn record_visit(&self, visit: NewVisit) -> Result<()> {
        self.record_visit_sync(&visit)
    }

    async fn purge_visits_longer_than(&self, threshold_secs: f64) -> Result<Vec<PurgedVisit>> {
        self.purge_sync(threshold_secs)
    }

    async fn list_visits(&self) -> Result<Vec<Visit>> {
        self.list_visits_sync()
    }

    async fn list_file_infos(&self) -> Result<Vec<FileInfo>> {
        self.list_file_infos_sync()
    }
}

fn row_to_file_info(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileInfo> {
    Ok(FileInfo {
        id: row.get(0)?,
        filepath: row.get(1)?,
        filetype: row.get(2)?,
        projectname: row.get(3)?,
        lastmodification: row.get(4)?,
    })
}
