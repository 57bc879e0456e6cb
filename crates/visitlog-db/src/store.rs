use async_trait::async_trait;
use visitlog_common::{FileInfo, NewVisit, PurgedVisit, Result, Visit};

/// Storage capability handed to the HTTP handlers.
#[async_trait]
pub trait VisitStore: Send + Sync {
    async fn find_file_info(&self, filepath: &str) -> Result<Option<FileInfo>>;

    /// Upsert the file summary for `visit.filepath` and append the visit, as
    /// one unit. An existing summary only gets its `lastmodification` moved
    /// to `visit.exit`.
    async fn record_visit(&self, visit: NewVisit) -> Result<()>;

    /// Delete every visit whose `exit - entry` exceeds `threshold_secs` and
    /// return what was removed, in insertion order.
    async fn purge_visits_longer_than(&self, threshold_secs: f64) -> Result<Vec<PurgedVisit>>;

    async fn list_visits(&self) -> Result<Vec<Visit>>;

    async fn list_file_infos(&self) -> Result<Vec<FileInfo>>;
}
