//! SQLite-backed storage engine.
//!
//! # Responsibility
//! - Provide the `StorageBackend` contract over an in-memory SQLite database.
//! - Keep SQL details inside this module.
//!
//! # Invariants
//! - Connections are in-memory only; nothing outlives the instance.
//! - Schema writes and row appends run inside one transaction each.
//! - All access goes through one connection guarded by a mutex.
//! - Cells keep their kind tag next to a native SQLite value; floats are
//!   stored as their IEEE-754 bit pattern so non-finite values survive.

use super::batch::validate_batch;
use super::schema::build_fields;
use super::{
    position_to_identifier, ColumnBatch, RowBatch, StorageBackend, StorageError, StorageResult,
};
use crate::model::collection::Designator;
use crate::model::identifier::{CollectionId, DataId, DesignatorId};
use crate::model::value::{Value, ValueKind};
use log::{error, info};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::time::Instant;

const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS designators (
    collection_id INTEGER NOT NULL REFERENCES collections(id),
    id INTEGER NOT NULL,
    name TEXT NOT NULL,
    kind TEXT,
    PRIMARY KEY (collection_id, id),
    UNIQUE (collection_id, name)
);
CREATE TABLE IF NOT EXISTS rows (
    collection_id INTEGER NOT NULL REFERENCES collections(id),
    id INTEGER NOT NULL,
    PRIMARY KEY (collection_id, id)
);
CREATE TABLE IF NOT EXISTS cells (
    collection_id INTEGER NOT NULL,
    row_id INTEGER NOT NULL,
    designator_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    value BLOB,
    PRIMARY KEY (collection_id, row_id, designator_id),
    FOREIGN KEY (collection_id, row_id) REFERENCES rows(collection_id, id),
    FOREIGN KEY (collection_id, designator_id) REFERENCES designators(collection_id, id)
);";

/// SQLite-backed `StorageBackend`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens a private in-memory database with the storage schema applied.
    ///
    /// # Side effects
    /// - Emits `storage_open` logging events with duration and status.
    pub fn open_in_memory() -> StorageResult<Self> {
        let started_at = Instant::now();
        info!("event=storage_open module=storage status=start backend=sqlite");

        let result = Connection::open_in_memory()
            .map_err(StorageError::from)
            .and_then(|conn| {
                bootstrap_connection(&conn)?;
                Ok(conn)
            });

        match result {
            Ok(conn) => {
                info!(
                    "event=storage_open module=storage status=ok backend=sqlite duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    conn: Mutex::new(conn),
                })
            }
            Err(err) => {
                error!(
                    "event=storage_open module=storage status=error backend=sqlite duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }
}

impl StorageBackend for SqliteStorage {
    fn independent() -> StorageResult<Self> {
        Self::open_in_memory()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn create_collection(&self) -> StorageResult<CollectionId> {
        let conn = self.conn.lock();
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(id) + 1, 0) FROM collections;",
            [],
            |row| row.get(0),
        )?;
        let id = CollectionId::try_from(next).map_err(|_| StorageError::IdentifiersExhausted)?;
        conn.execute("INSERT INTO collections (id) VALUES (?1);", [id])?;
        Ok(id)
    }

    fn contains_collection(&self, collection: CollectionId) -> bool {
        let conn = self.conn.lock();
        collection_exists(&conn, collection).unwrap_or(false)
    }

    fn add_designators(
        &self,
        collection: CollectionId,
        names: &[String],
    ) -> StorageResult<Vec<DesignatorId>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        require_collection(&tx, collection)?;

        let defined: i64 = tx.query_row(
            "SELECT COUNT(*) FROM designators WHERE collection_id = ?1;",
            [collection],
            |row| row.get(0),
        )?;
        if defined > 0 {
            return Err(StorageError::SchemaAlreadyDefined);
        }

        let fields = build_fields(names)?;
        for field in &fields {
            tx.execute(
                "INSERT INTO designators (collection_id, id, name, kind) VALUES (?1, ?2, ?3, NULL);",
                params![collection, field.id, field.name.as_str()],
            )?;
        }
        tx.commit()?;

        Ok(fields.iter().map(|field| field.id).collect())
    }

    fn designators(&self, collection: CollectionId) -> StorageResult<Vec<Designator>> {
        let conn = self.conn.lock();
        require_collection(&conn, collection)?;
        load_designators(&conn, collection)
    }

    fn append_rows(
        &self,
        collection: CollectionId,
        batch: &ColumnBatch,
    ) -> StorageResult<Vec<DataId>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        require_collection(&tx, collection)?;

        let designators = load_designators(&tx, collection)?;
        let validated = validate_batch(&designators, batch)?;

        let base: i64 = tx.query_row(
            "SELECT COALESCE(MAX(id) + 1, 0) FROM rows WHERE collection_id = ?1;",
            [collection],
            |row| row.get(0),
        )?;
        let base = usize::try_from(base).map_err(|_| StorageError::IdentifiersExhausted)?;

        let mut ids = Vec::with_capacity(validated.len);
        for position in 0..validated.len {
            let row_id = position_to_identifier(base + position)?;
            tx.execute(
                "INSERT INTO rows (collection_id, id) VALUES (?1, ?2);",
                params![collection, row_id],
            )?;
            for (designator, column) in designators.iter().zip(&validated.columns) {
                let value = &column[position];
                tx.execute(
                    "INSERT INTO cells (collection_id, row_id, designator_id, kind, value)
                     VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![
                        collection,
                        row_id,
                        designator.id,
                        value.kind().as_str(),
                        encode_cell(value)
                    ],
                )?;
            }
            ids.push(row_id);
        }

        for (designator, kind) in designators.iter().zip(&validated.kinds) {
            if designator.kind.is_none() {
                if let Some(kind) = kind {
                    tx.execute(
                        "UPDATE designators SET kind = ?1 WHERE collection_id = ?2 AND id = ?3;",
                        params![kind.as_str(), collection, designator.id],
                    )?;
                }
            }
        }
        tx.commit()?;

        Ok(ids)
    }

    fn rows_of(
        &self,
        collection: CollectionId,
        designators: &[DesignatorId],
    ) -> StorageResult<RowBatch> {
        let conn = self.conn.lock();
        require_collection(&conn, collection)?;
        let known = load_designators(&conn, collection)?;
        let positions = designators
            .iter()
            .map(|id| {
                known
                    .iter()
                    .position(|designator| designator.id == *id)
                    .ok_or(StorageError::UnknownDesignator(*id))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        if positions.is_empty() {
            return Ok(Vec::new());
        }

        let rows = load_rows(&conn, collection, &known)?;
        Ok(rows
            .values()
            .map(|values| {
                positions
                    .iter()
                    .map(|position| values[*position].clone())
                    .collect()
            })
            .collect())
    }

    fn rows_by(&self, collection: CollectionId, data: &[DataId]) -> StorageResult<ColumnBatch> {
        let conn = self.conn.lock();
        require_collection(&conn, collection)?;
        if data.is_empty() {
            return Ok(ColumnBatch::new());
        }

        let known = load_designators(&conn, collection)?;
        let rows = load_rows(&conn, collection, &known)?;
        let selected = data
            .iter()
            .map(|id| rows.get(id).ok_or(StorageError::UnknownData(*id)))
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(known
            .iter()
            .enumerate()
            .map(|(position, designator)| {
                let column = selected
                    .iter()
                    .map(|values| values[position].clone())
                    .collect();
                (designator.id, column)
            })
            .collect())
    }

    fn row_count(&self, collection: CollectionId) -> StorageResult<usize> {
        let conn = self.conn.lock();
        require_collection(&conn, collection)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM rows WHERE collection_id = ?1;",
            [collection],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| StorageError::InvalidData(format!("negative row count `{count}`")))
    }
}

fn bootstrap_connection(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    Ok(())
}

fn collection_exists(conn: &Connection, collection: CollectionId) -> StorageResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM collections WHERE id = ?1);",
        [collection],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn require_collection(conn: &Connection, collection: CollectionId) -> StorageResult<()> {
    if collection_exists(conn, collection)? {
        Ok(())
    } else {
        Err(StorageError::UnknownCollection(collection))
    }
}

fn load_designators(conn: &Connection, collection: CollectionId) -> StorageResult<Vec<Designator>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, kind FROM designators WHERE collection_id = ?1 ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([collection])?;
    let mut designators = Vec::new();

    while let Some(row) = rows.next()? {
        let kind = match row.get::<_, Option<String>>("kind")? {
            Some(value) => Some(ValueKind::parse(&value).ok_or_else(|| {
                StorageError::InvalidData(format!("invalid kind `{value}` in designators.kind"))
            })?),
            None => None,
        };
        designators.push(Designator {
            id: row.get("id")?,
            name: row.get("name")?,
            kind,
        });
    }

    Ok(designators)
}

/// Loads every row of `collection`, values in designator order.
fn load_rows(
    conn: &Connection,
    collection: CollectionId,
    designators: &[Designator],
) -> StorageResult<BTreeMap<DataId, Vec<Value>>> {
    let mut stmt = conn.prepare(
        "SELECT row_id, designator_id, kind, value
         FROM cells
         WHERE collection_id = ?1
         ORDER BY row_id ASC, designator_id ASC;",
    )?;
    let mut cells = stmt.query([collection])?;
    let mut rows: BTreeMap<DataId, Vec<Value>> = BTreeMap::new();

    while let Some(cell) = cells.next()? {
        let row_id: DataId = cell.get("row_id")?;
        let designator_id: DesignatorId = cell.get("designator_id")?;
        let kind: String = cell.get("kind")?;
        let value = decode_cell(&kind, cell.get("value")?)?;

        let values = rows
            .entry(row_id)
            .or_insert_with(|| vec![Value::Null; designators.len()]);
        let position = designators
            .iter()
            .position(|designator| designator.id == designator_id)
            .ok_or_else(|| {
                StorageError::InvalidData(format!(
                    "cell of row `{row_id}` references unknown designator `{designator_id}`"
                ))
            })?;
        values[position] = value;
    }

    Ok(rows)
}

fn encode_cell(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Integer(number) => SqlValue::Integer(*number),
        Value::Float(number) => SqlValue::Integer(number.to_bits() as i64),
        Value::Text(text) => SqlValue::Text(text.clone()),
        Value::Bytes(bytes) => SqlValue::Blob(bytes.clone()),
    }
}

fn decode_cell(kind: &str, raw: SqlValue) -> StorageResult<Value> {
    let kind = ValueKind::parse(kind)
        .ok_or_else(|| StorageError::InvalidData(format!("invalid kind `{kind}` in cells.kind")))?;
    match (kind, raw) {
        (ValueKind::Null, SqlValue::Null) => Ok(Value::Null),
        (ValueKind::Bool, SqlValue::Integer(flag)) => Ok(Value::Bool(flag != 0)),
        (ValueKind::Integer, SqlValue::Integer(number)) => Ok(Value::Integer(number)),
        (ValueKind::Float, SqlValue::Integer(bits)) => {
            Ok(Value::Float(f64::from_bits(bits as u64)))
        }
        (ValueKind::Text, SqlValue::Text(text)) => Ok(Value::Text(text)),
        (ValueKind::Bytes, SqlValue::Blob(bytes)) => Ok(Value::Bytes(bytes)),
        (kind, raw) => Err(StorageError::InvalidData(format!(
            "cell of kind `{kind}` holds sqlite {:?}",
            raw.data_type()
        ))),
    }
}
