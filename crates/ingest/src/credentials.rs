//! SQLite-backed credential store.
//!
//! One writer connection guarded by a mutex allocates identifiers; every
//! read opens its own read-only connection, so lookups never queue behind
//! the writer's lock. WAL mode keeps readers on the last committed image.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use api_token::{CredentialStore, StoreError, TokenId, Verifier};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hash BLOB NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

pub struct SqliteCredentialStore {
    db_path: PathBuf,
    writer: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (or create) the tokens database at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, rusqlite::Error> {
        let db_path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;")?;
        conn.execute_batch(SCHEMA)?;

        log::info!("Opened credential store at {:?}", db_path);

        Ok(Self {
            db_path,
            writer: Mutex::new(conn),
        })
    }

    /// Open a read-only connection to the database.
    fn open_reader(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn put(&self, verifier: &Verifier) -> Result<TokenId, StoreError> {
        let conn = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO tokens (hash) VALUES (?1)",
            [verifier.as_bytes()],
        )
        .map_err(StoreError::backend)?;
        // Same connection, same lock: nobody else can insert in between.
        Ok(TokenId(conn.last_insert_rowid()))
    }

    fn get_by_identifier(&self, id: TokenId) -> Result<Option<Verifier>, StoreError> {
        let conn = self.open_reader().map_err(StoreError::backend)?;
        conn.query_row("SELECT hash FROM tokens WHERE id = ?1", [id.get()], |row| {
            // Rows written by hand through the sqlite shell end up as TEXT.
            let bytes = match row.get_ref(0)? {
                ValueRef::Blob(b) | ValueRef::Text(b) => b.to_vec(),
                _ => Vec::new(),
            };
            Ok(Verifier::from_bytes(bytes))
        })
        .optional()
        .map_err(StoreError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_token::{CredentialHasher, MIN_WORK_FACTOR, TokenConfig, issue};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn open_temp() -> (tempfile::TempDir, SqliteCredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCredentialStore::open(dir.path().join("tokens.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_and_get() {
        let (_dir, store) = open_temp();
        let verifier = Verifier::from_bytes(b"$2b$04$stored-verifier".to_vec());

        let id = store.put(&verifier).unwrap();
        assert_eq!(id, TokenId(1));
        assert_eq!(store.get_by_identifier(id).unwrap(), Some(verifier));
    }

    #[test]
    fn test_get_unknown_is_none() {
        let (_dir, store) = open_temp();
        assert!(store.get_by_identifier(TokenId(12)).unwrap().is_none());
    }

    #[test]
    fn test_ids_are_sequential() {
        let (_dir, store) = open_temp();
        let a = store.put(&Verifier::from_bytes(b"a".to_vec())).unwrap();
        let b = store.put(&Verifier::from_bytes(b"b".to_vec())).unwrap();
        assert_eq!(a, TokenId(1));
        assert_eq!(b, TokenId(2));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.db");
        let verifier = Verifier::from_bytes(b"durable".to_vec());

        let id = {
            let store = SqliteCredentialStore::open(&path).unwrap();
            store.put(&verifier).unwrap()
        };

        let reopened = SqliteCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.get_by_identifier(id).unwrap(), Some(verifier));
    }

    #[test]
    fn test_created_at_is_stamped_on_insert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.db");
        let store = SqliteCredentialStore::open(&path).unwrap();
        let id = store.put(&Verifier::from_bytes(b"stamped".to_vec())).unwrap();

        let conn = Connection::open(&path).unwrap();
        let created_at: String = conn
            .query_row(
                "SELECT created_at FROM tokens WHERE id = ?1",
                [id.get()],
                |row| row.get(0),
            )
            .unwrap();
        // CURRENT_TIMESTAMP renders as "YYYY-MM-DD HH:MM:SS"
        assert_eq!(created_at.len(), 19);
    }

    #[test]
    fn test_reads_legacy_schema_and_text_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE tokens (id INTEGER PRIMARY KEY AUTOINCREMENT, hash BLOB NOT NULL);
                INSERT INTO tokens (hash) VALUES ('$2b$04$typed-into-the-shell');
                "#,
            )
            .unwrap();
        }

        let store = SqliteCredentialStore::open(&path).unwrap();
        let verifier = store.get_by_identifier(TokenId(1)).unwrap().unwrap();
        assert_eq!(verifier.as_bytes(), b"$2b$04$typed-into-the-shell");

        // New inserts work against the old two-column table as well.
        let id = store.put(&Verifier::from_bytes(b"next".to_vec())).unwrap();
        assert_eq!(id, TokenId(2));
    }

    #[test]
    fn test_concurrent_provisioning_yields_distinct_ids() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);
        let hasher = CredentialHasher::with_cost(MIN_WORK_FACTOR);

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    issue(store.as_ref(), &hasher, &TokenConfig::default())
                        .unwrap()
                        .id()
                })
            })
            .collect();

        let ids: HashSet<TokenId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 100);

        for id in &ids {
            assert!(store.get_by_identifier(*id).unwrap().is_some());
        }
        let count: i64 = store
            .open_reader()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 100);
    }

    #[test]
    fn test_readers_never_see_torn_values() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);
        let payload = vec![b'x'; 4096];

        let writer = {
            let store = Arc::clone(&store);
            let payload = payload.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    store.put(&Verifier::from_bytes(payload.clone())).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let payload = payload.clone();
                thread::spawn(move || {
                    for i in 1..=50 {
                        if let Some(v) = store.get_by_identifier(TokenId(i)).unwrap() {
                            assert_eq!(v.as_bytes(), payload.as_slice());
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
