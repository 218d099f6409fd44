use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{
    Activity, AttendanceRecord, Evidence, FinancialMovement, RecordKind, ValidationError,
};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Rejected: {0}")]
    Validation(#[from] ValidationError),
}

const MOVEMENT_COLUMNS: &str =
    "id, date, kind, category, amount, note, recorded_by, evidence, evidence_filename";
const ATTENDANCE_COLUMNS: &str = "id, date, service, men, women, children, note";
const ACTIVITY_COLUMNS: &str = "id, date, name, responsible, description";

/// Single-file store for movements, attendance counts and activities.
///
/// The store owns one connection for its whole lifetime. Writes run inside
/// [`Database::with_transaction`], so a failure at any point rolls back.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        // Open or create the database
        let conn = Connection::open(&db_path)?;
        tracing::debug!("Opened database at {:?}", db_path);

        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Fresh private database that vanishes with the handle
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS movements (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                date                TEXT NOT NULL,
                kind                TEXT NOT NULL,
                category            TEXT NOT NULL,
                amount              REAL NOT NULL,
                note                TEXT NOT NULL DEFAULT '',
                recorded_by         TEXT NOT NULL,
                evidence            BLOB,
                evidence_filename   TEXT
            );
            CREATE TABLE IF NOT EXISTS attendance (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                date        TEXT NOT NULL,
                service     TEXT NOT NULL,
                men         INTEGER NOT NULL DEFAULT 0,
                women       INTEGER NOT NULL DEFAULT 0,
                children    INTEGER NOT NULL DEFAULT 0,
                note        TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS activities (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                date        TEXT NOT NULL,
                name        TEXT NOT NULL,
                responsible TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_movements_date ON movements(date);
            CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date);
            CREATE INDEX IF NOT EXISTS idx_activities_date ON activities(date);",
        )?;
        tracing::debug!("Database schema ready");
        Ok(())
    }

    /// Run `f` inside a transaction that commits on `Ok` and rolls back when
    /// dropped on any error path
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let conn: &Connection = &tx;
        let value = f(conn)?;
        tx.commit()?;
        Ok(value)
    }

    /// Validate and insert a movement, returning its ID
    pub fn insert_movement(&self, movement: &FinancialMovement) -> Result<i64, DatabaseError> {
        movement.validate()?;
        let id = self.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO movements (date, kind, category, amount, note, recorded_by, evidence, evidence_filename)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    movement.date,
                    movement.kind.label(),
                    movement.category,
                    movement.amount,
                    movement.note,
                    movement.recorded_by,
                    movement.evidence.as_ref().map(|e| e.data.as_slice()),
                    movement.evidence.as_ref().map(|e| e.filename.as_str()),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        tracing::debug!(id, kind = %movement.kind, "Inserted movement");
        Ok(id)
    }

    /// Insert an attendance count and return its ID
    pub fn insert_attendance(&self, record: &AttendanceRecord) -> Result<i64, DatabaseError> {
        let id = self.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO attendance (date, service, men, women, children, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.date,
                    record.service.label(),
                    record.men,
                    record.women,
                    record.children,
                    record.note,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        tracing::debug!(id, "Inserted attendance record");
        Ok(id)
    }

    /// Validate and insert an activity, returning its ID
    pub fn insert_activity(&self, activity: &Activity) -> Result<i64, DatabaseError> {
        activity.validate()?;
        let id = self.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO activities (date, name, responsible, description)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    activity.date,
                    activity.name,
                    activity.responsible,
                    activity.description,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        tracing::debug!(id, "Inserted activity");
        Ok(id)
    }

    /// Helper function to map a row to a FinancialMovement
    fn row_to_movement(row: &rusqlite::Row) -> Result<FinancialMovement, rusqlite::Error> {
        let kind: String = row.get(2)?;
        let data: Option<Vec<u8>> = row.get(7)?;
        let filename: Option<String> = row.get(8)?;
        let evidence = match (data, filename) {
            (Some(data), filename) => Some(Evidence {
                filename: filename.unwrap_or_else(|| "doc".to_string()),
                data,
            }),
            (None, _) => None,
        };
        Ok(FinancialMovement {
            id: Some(row.get(0)?),
            date: row.get(1)?,
            kind: kind
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
            category: row.get(3)?,
            amount: row.get(4)?,
            note: row.get(5)?,
            recorded_by: row.get(6)?,
            evidence,
        })
    }

    fn row_to_attendance(row: &rusqlite::Row) -> Result<AttendanceRecord, rusqlite::Error> {
        let service: String = row.get(2)?;
        Ok(AttendanceRecord {
            id: Some(row.get(0)?),
            date: row.get(1)?,
            service: service
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
            men: row.get(3)?,
            women: row.get(4)?,
            children: row.get(5)?,
            note: row.get(6)?,
        })
    }

    fn row_to_activity(row: &rusqlite::Row) -> Result<Activity, rusqlite::Error> {
        Ok(Activity {
            id: Some(row.get(0)?),
            date: row.get(1)?,
            name: row.get(2)?,
            responsible: row.get(3)?,
            description: row.get(4)?,
        })
    }

    /// Get all movements, with their evidence, in insertion order
    pub fn get_all_movements(&self) -> Result<Vec<FinancialMovement>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements ORDER BY id ASC"
        ))?;
        let movements = stmt
            .query_map([], Self::row_to_movement)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(movements)
    }

    /// Get a single movement by ID
    pub fn get_movement(&self, id: i64) -> Result<Option<FinancialMovement>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = ?1"
        ))?;
        let movement = stmt
            .query_row(rusqlite::params![id], Self::row_to_movement)
            .optional()?;
        Ok(movement)
    }

    /// Get all attendance records in insertion order
    pub fn get_all_attendance(&self) -> Result<Vec<AttendanceRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance ORDER BY id ASC"
        ))?;
        let records = stmt
            .query_map([], Self::row_to_attendance)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Get all activities in insertion order
    pub fn get_all_activities(&self) -> Result<Vec<Activity>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities ORDER BY id ASC"
        ))?;
        let activities = stmt
            .query_map([], Self::row_to_activity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(activities)
    }

    /// Delete one record by ID. Returns whether a row was removed; a missing
    /// ID is not an error.
    pub fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool, DatabaseError> {
        let removed = self.with_transaction(|conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
            Ok(conn.execute(&sql, rusqlite::params![id])?)
        })?;
        tracing::debug!(%kind, id, removed, "Delete requested");
        Ok(removed > 0)
    }

    pub fn count_records(&self, kind: RecordKind) -> Result<i64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}
