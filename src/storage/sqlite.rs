//! SQLite storage backend for Dossier

use super::traits::{DossierStore, OpenStore, StorageError, StorageResult};
use crate::feature::FeatureCollection;
use crate::graph::{CorefValue, Label, Node, StoredLabel};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// SQLite-backed label ledger and feature-collection table
///
/// Uses a single SQLite database file. Labels live in an append-only table
/// whose rowid is the ledger sequence number. Thread-safe via internal mutex
/// on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Raw label columns, in `SELECT` order
type LabelRow = (
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    i64,
    String,
);

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Append-only label ledger; seq is the replay order
            CREATE TABLE IF NOT EXISTS labels (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id1 TEXT NOT NULL,
                subtopic_id1 TEXT,
                content_id2 TEXT NOT NULL,
                subtopic_id2 TEXT,
                annotator_id TEXT NOT NULL,
                value INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            -- One attribute bag per content item, replaced wholesale
            CREATE TABLE IF NOT EXISTS feature_collections (
                content_id TEXT PRIMARY KEY,
                features_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn insert_label(conn: &Connection, label: &Label) -> StorageResult<u64> {
        conn.execute(
            r#"
            INSERT INTO labels (content_id1, subtopic_id1, content_id2, subtopic_id2,
                                annotator_id, value, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                label.node_a.content_id(),
                label.node_a.subtopic_id(),
                label.node_b.content_id(),
                label.node_b.subtopic_id(),
                label.annotator_id,
                i8::from(label.value),
                label.created_at.to_rfc3339(),
            ],
        )?;
        let rowid = conn.last_insert_rowid();
        u64::try_from(rowid).map_err(|_| StorageError::CorruptRecord(format!("negative rowid {}", rowid)))
    }

    /// Deserialize a label from database columns
    fn row_to_label(row: LabelRow) -> StorageResult<StoredLabel> {
        let (seq, cid1, sub1, cid2, sub2, annotator_id, value, created_at) = row;

        let seq = u64::try_from(seq)
            .map_err(|_| StorageError::CorruptRecord(format!("negative seq {}", seq)))?;
        let value = i8::try_from(value)
            .map_err(|_| StorageError::CorruptRecord(format!("coref value {} out of range", value)))
            .and_then(|v| CorefValue::try_from(v).map_err(StorageError::CorruptRecord))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StorageError::DateParse(e.to_string()))?
            .with_timezone(&Utc);

        Ok(StoredLabel::new(
            seq,
            Label {
                node_a: Node::from_parts(cid1, sub1),
                node_b: Node::from_parts(cid2, sub2),
                annotator_id,
                value,
                created_at,
            },
        ))
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(path = %path.as_ref().display(), "opening label store");
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl DossierStore for SqliteStore {
    // === Label Operations ===

    fn append_label(&self, label: &Label) -> StorageResult<u64> {
        let conn = self.conn()?;
        Self::insert_label(&conn, label)
    }

    fn append_labels(&self, labels: &[Label]) -> StorageResult<Vec<u64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let seqs = labels
            .iter()
            .map(|label| Self::insert_label(&tx, label))
            .collect::<StorageResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(seqs)
    }

    fn load_labels(&self) -> StorageResult<Vec<StoredLabel>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT seq, content_id1, subtopic_id1, content_id2, subtopic_id2,
                    annotator_id, value, created_at
             FROM labels ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut labels = Vec::new();
        for row in rows {
            labels.push(Self::row_to_label(row?)?);
        }
        Ok(labels)
    }

    // === Feature Collection Operations ===

    fn put_feature_collection(&self, content_id: &str, fc: &FeatureCollection) -> StorageResult<()> {
        let conn = self.conn()?;
        let features_json = serde_json::to_string(fc)?;

        conn.execute(
            r#"
            INSERT INTO feature_collections (content_id, features_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(content_id) DO UPDATE SET
                features_json = excluded.features_json,
                updated_at = excluded.updated_at
            "#,
            params![content_id, features_json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_feature_collection(&self, content_id: &str) -> StorageResult<Option<FeatureCollection>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT features_json FROM feature_collections WHERE content_id = ?1",
                params![content_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn random_feature_collection(&self) -> StorageResult<Option<(String, FeatureCollection)>> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT content_id, features_json FROM feature_collections
                 ORDER BY RANDOM() LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((content_id, json)) => Ok(Some((content_id, serde_json::from_str(&json)?))),
            None => Ok(None),
        }
    }
}
