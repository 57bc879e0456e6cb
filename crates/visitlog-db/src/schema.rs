/// A schema revision applied at open time.
///
/// Statements are `CREATE ... IF NOT EXISTS` only: an existing database is
/// never altered.
pub struct Schema {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const VISIT_SCHEMA_V1: Schema = Schema {
    version: 1,
    name: "visits_and_fileinfo",
    sql: "CREATE TABLE IF NOT EXISTS visits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry INTEGER NOT NULL,
            exit INTEGER NOT NULL,
            keystrokes INTEGER NOT NULL,
            filepath TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fileinfo (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filepath TEXT UNIQUE NOT NULL,
            filetype TEXT,
            projectname TEXT,
            lastmodification INTEGER NOT NULL
        );",
};
