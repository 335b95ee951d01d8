use async_trait::async_trait;
use ftpcdn_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{Config, FtpConfig};
use crate::coordinator::BlobCoordinator;
use crate::registry::CdnPrefixRegistry;
use crate::remote::{RemoteError, RemoteStore};
use crate::AppState;

/// Fresh migrated SQLite catalog. A single connection keeps every query on
/// the same in-memory database.
pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Migrated SQLite catalog in a temporary file, shared by up to
/// `max_connections` pooled connections. Keep the directory alive for the
/// lifetime of the connection.
pub async fn file_db(max_connections: u32) -> (tempfile::TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("catalog.db").display()
    );

    let mut opt = ConnectOptions::new(url);
    opt.max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    (dir, db)
}

/// Handler state over an in-memory catalog and the given remote store
pub async fn test_state(remote: Arc<MemoryRemoteStore>) -> AppState {
    let db = memory_db().await;
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        server_address: "127.0.0.1:0".to_string(),
        max_file_size: 50 * 1024 * 1024,
        ftp: FtpConfig {
            host: "localhost".to_string(),
            port: 21,
            username: "anonymous".to_string(),
            password: String::new(),
            base_path: remote.base_path().to_string(),
            connect_timeout: Duration::from_secs(1),
        },
    };

    AppState {
        coordinator: BlobCoordinator::new(db.clone(), remote),
        registry: CdnPrefixRegistry::new(db),
        config,
    }
}

/// Remote store kept in a map, with a failure switch per operation
pub struct MemoryRemoteStore {
    base_path: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_store: AtomicBool,
    fail_fetch: AtomicBool,
    fail_remove: AtomicBool,
    store_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            objects: Mutex::new(HashMap::new()),
            fail_store: AtomicBool::new(false),
            fail_fetch: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
            store_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains_key(name)
    }

    /// Drop an object behind the catalog's back
    pub fn forget(&self, name: &str) {
        self.objects.lock().unwrap().remove(name);
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn store(&self, data: Vec<u8>, name: &str) -> Result<(), RemoteError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(RemoteError::Transfer(format!("STOR {}: 451 refused", name)));
        }
        self.objects.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, RemoteError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Connect("connection refused".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| RemoteError::Transfer(format!("RETR {}: 550 not found", name)))
    }

    async fn remove(&self, name: &str) -> Result<(), RemoteError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(RemoteError::Transfer(format!("DELE {}: 550 denied", name)));
        }
        self.objects.lock().unwrap().remove(name);
        Ok(())
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }
}
