use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use visitlog_common::{Error, FileInfo, NewVisit, PurgedVisit, Result, Visit};

use crate::store::VisitStore;

#[derive(Default)]
struct Tables {
    visits: Vec<Visit>,
    file_infos: Vec<FileInfo>,
    next_visit_id: i64,
    next_file_id: i64,
}

/// Non-persistent [`VisitStore`] with the same semantics as the SQLite one.
#[derive(Default)]
pub struct InMemoryVisitStore {
    tables: Mutex<Tables>,
}

impl InMemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Database("in-memory visit store lock poisoned".into()))
    }
}

#[async_trait]
impl VisitStore for InMemoryVisitStore {
    async fn find_file_info(&self, filepath: &str) -> Result<Option<FileInfo>> {
        let tables = self.tables()?;
        Ok(tables
            .file_infos
            .iter()
            .find(|f| f.filepath == filepath)
            .cloned())
    }

    async fn record_visit(&self, visit: NewVisit) -> Result<()> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        let existing = tables
            .file_infos
            .iter()
            .position(|f| f.filepath == visit.filepath);
        match existing {
            Some(idx) => tables.file_infos[idx].lastmodification = visit.exit,
            None => {
                tables.next_file_id += 1;
                let id = tables.next_file_id;
                tables.file_infos.push(FileInfo {
                    id,
                    filepath: visit.filepath.clone(),
                    filetype: visit.filetype,
                    projectname: visit.projectname,
                    lastmodification: visit.exit,
                });
            }
        }

        tables.next_visit_id += 1;
        let id = tables.next_visit_id;
        tables.visits.push(Visit {
            id,
            entry: visit.entry,
            exit: visit.exit,
            keystrokes: visit.keystrokes,
            filepath: visit.filepath,
        });

        Ok(())
    }

    async fn purge_visits_longer_than(&self, threshold_secs: f64) -> Result<Vec<PurgedVisit>> {
        let mut tables = self.tables()?;
        let mut purged = Vec::new();

        tables.visits.retain(|v| {
            if v.duration_secs() as f64 > threshold_secs {
                purged.push(PurgedVisit {
                    filepath: v.filepath.clone(),
                    entry: v.entry,
                    exit: v.exit,
                });
                false
            } else {
                true
            }
        });

        Ok(purged)
    }

    async fn list_visits(&self) -> Result<Vec<Visit>> {
        Ok(self.tables()?.visits.clone())
    }

    async fn list_file_infos(&self) -> Result<Vec<FileInfo>> {
        Ok(self.tables()?.file_infos.clone())
    }
}
