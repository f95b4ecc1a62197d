//! TOML-file implementation of the store repositories.
//!
//! One `store.toml` holds templates, users and sessions. Every operation is
//! a locked read or a locked read-modify-write through [`AtomicTomlFile`],
//! run on the blocking pool.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task;
use toynet_core::error::{Result, ToynetError};
use toynet_core::session::{
    Session, SessionId, SessionRepository, TemplateRepository, TopoId, UserRepository,
};
use toynet_core::topology::Topology;

use crate::dto::{SessionRecord, StoreFile, TemplateRecord, UserRecord};
use crate::paths::ToynetPaths;
use crate::storage::AtomicTomlFile;

/// Store backed by a single TOML file.
///
/// Cloning is cheap; clones share the same file handle.
#[derive(Clone)]
pub struct TomlStore {
    file: Arc<AtomicTomlFile<StoreFile>>,
}

impl TomlStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicTomlFile::new(path)),
        }
    }

    /// Opens the store at the platform data directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ToynetPaths::default().store_file()?))
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    async fn read<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(StoreFile) -> Result<R> + Send + 'static,
    {
        let file = self.file.clone();
        task::spawn_blocking(move || f(file.read()?))
            .await
            .map_err(|e| ToynetError::data_access(format!("store task failed: {}", e)))?
    }

    async fn update<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut StoreFile) -> Result<R> + Send + 'static,
    {
        let file = self.file.clone();
        task::spawn_blocking(move || file.update(f))
            .await
            .map_err(|e| ToynetError::data_access(format!("store task failed: {}", e)))?
    }

    /// Adds or replaces a topology template.
    ///
    /// The document must parse and pass referential validation.
    pub async fn add_template(&self, topo_id: TopoId, topology: &str) -> Result<()> {
        Topology::parse(topology)?.validate()?;

        let topology = topology.to_string();
        self.update(move |store| {
            match store.templates.iter_mut().find(|t| t.topo_id == topo_id) {
                Some(existing) => existing.topology = topology,
                None => store.templates.push(TemplateRecord { topo_id, topology }),
            }
            Ok(())
        })
        .await?;

        tracing::info!(topo_id, "Stored topology template");
        Ok(())
    }

    /// Registers a user; adding an existing user is a no-op.
    pub async fn add_user(&self, user_id: &str) -> Result<()> {
        let user_id = user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(ToynetError::validation("user id must not be empty"));
        }

        self.update(move |store| {
            if !store.users.iter().any(|u| u.user_id == user_id) {
                store.users.push(UserRecord { user_id });
            }
            Ok(())
        })
        .await
    }

    /// Lists every persisted session, ordered by id.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.read(|store| {
            let mut sessions: Vec<Session> =
                store.sessions.into_iter().map(Session::from).collect();
            sessions.sort_by_key(|s| s.id);
            Ok(sessions)
        })
        .await
    }
}

#[async_trait]
impl TemplateRepository for TomlStore {
    async fn find_topology(&self, topo_id: TopoId) -> Result<Option<String>> {
        self.read(move |store| {
            Ok(store
                .templates
                .into_iter()
                .find(|t| t.topo_id == topo_id)
                .map(|t| t.topology))
        })
        .await
    }
}

#[async_trait]
impl UserRepository for TomlStore {
    async fn exists(&self, user_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        self.read(move |store| Ok(store.users.iter().any(|u| u.user_id == user_id)))
            .await
    }
}

#[async_trait]
impl SessionRepository for TomlStore {
    async fn find_by_id(&self, session_id: SessionId) -> Result<Option<Session>> {
        self.read(move |store| {
            Ok(store
                .sessions
                .into_iter()
                .find(|s| s.session_id == session_id.0)
                .map(Session::from))
        })
        .await
    }

    async fn create(&self, topo_id: TopoId, user_id: &str, topology: &str) -> Result<SessionId> {
        let user_id = user_id.to_string();
        let topology = topology.to_string();

        self.update(move |store| {
            store.last_session_id += 1;
            let session = Session {
                id: SessionId(store.last_session_id),
                topo_id,
                user_id,
                topology,
            };
            store.sessions.push(SessionRecord::from(&session));
            Ok(session.id)
        })
        .await
    }

    async fn update_topology(&self, session_id: SessionId, topology: &str) -> Result<()> {
        let topology = topology.to_string();

        self.update(move |store| {
            let record = store
                .sessions
                .iter_mut()
                .find(|s| s.session_id == session_id.0)
                .ok_or_else(|| ToynetError::not_found("Session", session_id.to_string()))?;
            record.topology = topology;
            Ok(())
        })
        .await
    }
}
