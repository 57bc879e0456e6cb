use serde::{Deserialize, Serialize};

/// One recorded file-editing session.
///
/// `entry` and `exit` are epoch seconds as reported by the client. Nothing
/// checks that `exit >= entry`, so [`Visit::duration_secs`] may be negative,
/// and it is widened to `i128` so any pair of timestamps has a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub entry: i64,
    pub exit: i64,
    pub keystrokes: i64,
    pub filepath: String,
}

impl Visit {
    pub fn duration_secs(&self) -> i128 {
        i128::from(self.exit) - i128::from(self.entry)
    }
}

/// Per-file summary, one row per distinct `filepath`.
///
/// `filetype` and `projectname` are fixed by the first visit for the path;
/// later visits only move `lastmodification` forward (or backward, if the
/// client says so).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: i64,
    pub filepath: String,
    pub filetype: Option<String>,
    pub projectname: Option<String>,
    pub lastmodification: i64,
}

/// Insert shape for a visit before the store assigns its id. Doubles as the
/// `POST /visit` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVisit {
    pub entry: i64,
    pub exit: i64,
    pub keystrokes: i64,
    pub filepath: String,
    #[serde(default)]
    pub filetype: Option<String>,
    #[serde(default)]
    pub projectname: Option<String>,
}

impl NewVisit {
    pub fn duration_secs(&self) -> i128 {
        i128::from(self.exit) - i128::from(self.entry)
    }
}

/// What a purge reports back for each deleted visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgedVisit {
    pub filepath: String,
    pub entry: i64,
    pub exit: i64,
}
