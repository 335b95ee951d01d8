use async_trait::async_trait;
use std::io::Cursor;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};
use thiserror::Error;

use crate::config::FtpConfig;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("login failed: {0}")]
    Login(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("session task failed: {0}")]
    Task(String),
}

/// Blob operations against the remote store, keyed by storage name.
///
/// Every call is one independent session; implementations must not keep a
/// connection open between calls.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write `data` under `name` in the base directory, creating the directory if needed
    async fn store(&self, data: Vec<u8>, name: &str) -> Result<(), RemoteError>;

    /// Read the object stored under `name`. A missing object is an error.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, RemoteError>;

    /// Remove the object stored under `name`
    async fn remove(&self, name: &str) -> Result<(), RemoteError>;

    /// Directory all operations are rooted at
    fn base_path(&self) -> &str;
}

/// FTP-backed remote store. Opens a fresh session for every operation.
#[derive(Clone)]
pub struct FtpRemoteStore {
    config: Arc<FtpConfig>,
}

impl FtpRemoteStore {
    pub fn new(config: FtpConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run `op` inside a new session on the blocking pool.
    /// The session is torn down when `op` returns, whatever the outcome.
    async fn with_session<T, F>(&self, op: F) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpSession, &FtpConfig) -> Result<T, RemoteError> + Send + 'static,
    {
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            let mut session = FtpSession::open(&config)?;
            op(&mut session, &config)
        })
        .await
        .map_err(|e| RemoteError::Task(e.to_string()))?
    }
}

#[async_trait]
impl RemoteStore for FtpRemoteStore {
    async fn store(&self, data: Vec<u8>, name: &str) -> Result<(), RemoteError> {
        let name = name.to_string();
        self.with_session(move |session, config| {
            session.ensure_dir(&config.base_path)?;

            let size = data.len();
            session
                .stream
                .put_file(&name, &mut Cursor::new(data))
                .map_err(|e| RemoteError::Transfer(format!("STOR {}: {}", name, e)))?;

            tracing::debug!("📤 Stored remote file: {} ({} bytes)", name, size);
            Ok(())
        })
        .await
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, RemoteError> {
        let name = name.to_string();
        self.with_session(move |session, config| {
            session.change_dir(&config.base_path)?;

            let data = session
                .stream
                .retr_as_buffer(&name)
                .map_err(|e| RemoteError::Transfer(format!("RETR {}: {}", name, e)))?
                .into_inner();

            tracing::debug!("📥 Fetched remote file: {} ({} bytes)", name, data.len());
            Ok(data)
        })
        .await
    }

    async fn remove(&self, name: &str) -> Result<(), RemoteError> {
        let name = name.to_string();
        self.with_session(move |session, config| {
            session.change_dir(&config.base_path)?;

            session
                .stream
                .rm(&name)
                .map_err(|e| RemoteError::Transfer(format!("DELE {}: {}", name, e)))?;

            tracing::debug!("🗑️  Removed remote file: {}", name);
            Ok(())
        })
        .await
    }

    fn base_path(&self) -> &str {
        &self.config.base_path
    }
}

/// One authenticated, binary-mode FTP session. Dropping it sends QUIT.
struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    fn open(config: &FtpConfig) -> Result<Self, RemoteError> {
        let address = config.address();
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| RemoteError::Connect(format!("{}: {}", address, e)))?
            .next()
            .ok_or_else(|| RemoteError::Connect(format!("{}: no address resolved", address)))?;

        let stream = FtpStream::connect_timeout(socket_addr, config.connect_timeout)
            .map_err(|e| RemoteError::Connect(format!("{}: {}", address, e)))?;

        // Constructed before login so that a rejected login still ends with QUIT
        let mut session = Self { stream };

        session
            .stream
            .login(config.username.as_str(), config.password.as_str())
            .map_err(|e| RemoteError::Login(format!("{}@{}: {}", config.username, address, e)))?;

        session
            .stream
            .transfer_type(FileType::Binary)
            .map_err(|e| RemoteError::Command(format!("TYPE I: {}", e)))?;

        session.stream.set_mode(Mode::Passive);

        tracing::debug!("🔗 Opened FTP session to {}", address);
        Ok(session)
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        if path.is_empty() {
            return Ok(());
        }

        let path = self.absolute(path)?;
        self.stream
            .cwd(&path)
            .map_err(|e| RemoteError::Command(format!("CWD {}: {}", path, e)))
    }

    /// Create each missing component of `path`, then change into it
    fn ensure_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let path = self.absolute(path)?;

        for dir in directory_chain(&path) {
            if self.stream.cwd(&dir).is_err() {
                self.stream
                    .mkdir(&dir)
                    .map_err(|e| RemoteError::Command(format!("MKD {}: {}", dir, e)))?;
                tracing::debug!("📁 Created remote directory: {}", dir);
            }
        }

        self.change_dir(&path)
    }

    /// Relative paths are taken from the login directory. Only call this
    /// before the session has changed directory.
    fn absolute(&mut self, path: &str) -> Result<String, RemoteError> {
        if path.starts_with('/') {
            return Ok(path.to_string());
        }

        let home = self
            .stream
            .pwd()
            .map_err(|e| RemoteError::Command(format!("PWD: {}", e)))?;
        Ok(join_path(&home, path))
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        if let Err(e) = self.stream.quit() {
            tracing::debug!("Failed to close FTP session cleanly: {}", e);
        }
    }
}

fn join_path(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Every ancestor of the absolute `path` followed by `path` itself, e.g.
/// `/a/b` gives `["/a", "/a/b"]`
fn directory_chain(path: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = String::new();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = format!("{}/{}", current, segment);
        chain.push(current.clone());
    }

    chain
}
