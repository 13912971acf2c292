//! Per-run artifact directories and the periodic cleanup sweep.
//!
//! Layout under the configured root:
//! ```text
//! user_files/
//!   metadata.json             {"<id>": {"timestamp": <unix seconds>}, ...}
//!   <id>/compliance_report.txt
//!   <id>/modified_document.txt
//! ```
//! A run's timestamp is refreshed on every write, so the sweep only ever
//! removes runs that have been idle for longer than the retention window.
//!
//! `metadata.json` is replaced atomically, but the read-modify-write cycle is
//! only serialized within one process. A `check` and a `sweep --watch` running
//! side by side can still lose one another's update. A lost timestamp refresh
//! lets a run expire earlier than its last write.

use crate::aggregator::ComplianceReport;
use crate::reviser::RevisedText;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{sync::oneshot, task::JoinHandle, time::MissedTickBehavior};
use uuid::Uuid;

pub const METADATA_FILE: &str = "metadata.json";
pub const REPORT_FILE: &str = "compliance_report.txt";
pub const REVISION_FILE: &str = "modified_document.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SessionEntry {
    timestamp: i64,
}

type Metadata = BTreeMap<String, SessionEntry>;

#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    retention: Duration,
    metadata_lock: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            root: root.into(),
            retention,
            metadata_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create(&self) -> crate::Result<SessionHandle> {
        let id = Uuid::new_v4().to_string();
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating session directory {}", dir.display()))?;

        self.touch(&id, Utc::now())?;
        tracing::debug!(session = %id, "created session directory");

        Ok(SessionHandle {
            id,
            dir,
            store: self.clone(),
        })
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    fn load_metadata(&self) -> crate::Result<Metadata> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(Metadata::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Metadata::new());
        }
        Ok(serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?)
    }

    /// Written to a temporary file and renamed into place, so a reader in
    /// another process never sees a half-written file.
    fn save_metadata(&self, metadata: &Metadata) -> crate::Result<()> {
        fs::create_dir_all(&self.root)?;
        let tmp = self
            .root
            .join(format!("{}.{}.tmp", METADATA_FILE, Uuid::new_v4()));
        fs::write(&tmp, serde_json::to_string(metadata)?)?;
        fs::rename(&tmp, self.metadata_path())
            .with_context(|| format!("replacing {}", self.metadata_path().display()))?;
        Ok(())
    }

    fn update_metadata<T>(&self, update: impl FnOnce(&mut Metadata) -> T) -> crate::Result<T> {
        let _guard = self
            .metadata_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("session metadata lock poisoned"))?;
        let mut metadata = self.load_metadata()?;
        let result = update(&mut metadata);
        self.save_metadata(&metadata)?;
        Ok(result)
    }

    fn touch(&self, id: &str, at: DateTime<Utc>) -> crate::Result<()> {
        self.update_metadata(|metadata| {
            metadata.insert(
                id.to_string(),
                SessionEntry {
                    timestamp: at.timestamp(),
                },
            );
        })
    }

    pub fn sweep(&self) -> crate::Result<Vec<String>> {
        self.sweep_at(Utc::now())
    }

    /// Removes runs idle for strictly longer than the retention window and
    /// returns their ids. Entries whose directory is already gone are purged too.
    ///
    /// A directory is deleted before its metadata entry is dropped. If the
    /// deletion fails the entry stays, so the next sweep retries it.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> crate::Result<Vec<String>> {
        let retention = self.retention.as_secs() as i64;
        let is_expired = |entry: &SessionEntry| now.timestamp() - entry.timestamp > retention;

        let candidates: Vec<String> = self
            .load_metadata()?
            .into_iter()
            .filter(|(_, entry)| is_expired(entry))
            .map(|(id, _)| id)
            .collect();

        let mut removed = Vec::with_capacity(candidates.len());
        for id in candidates {
            let dir = self.root.join(&id);
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(&dir) {
                    tracing::warn!(session = %id, "could not delete {}: {}", dir.display(), e);
                    continue;
                }
            }
            tracing::info!(session = %id, "Deleted files for expired session");
            removed.push(id);
        }

        if !removed.is_empty() {
            self.update_metadata(|metadata| {
                for id in &removed {
                    // A write may have refreshed the run since it was selected.
                    if metadata.get(id).is_some_and(|entry| is_expired(entry)) {
                        metadata.remove(id);
                    }
                }
            })?;
        }

        Ok(removed)
    }

    pub fn session_ids(&self) -> crate::Result<Vec<String>> {
        Ok(self.load_metadata()?.into_keys().collect())
    }
}

/// Artifacts of one run.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    dir: PathBuf,
    store: SessionStore,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_report(&self, report: &ComplianceReport) -> crate::Result<PathBuf> {
        self.write(REPORT_FILE, report.as_str())
    }

    pub fn write_revision(&self, revision: &RevisedText) -> crate::Result<PathBuf> {
        self.write(REVISION_FILE, revision.as_str())
    }

    fn write(&self, name: &str, content: &str) -> crate::Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        self.store.touch(&self.id, Utc::now())?;
        Ok(path)
    }

    /// Deletes the run's artifacts right away.
    pub fn clear(self) -> crate::Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("deleting {}", self.dir.display()))?;
        }
        self.store.update_metadata(|metadata| {
            metadata.remove(&self.id);
        })
    }
}

/// Background task running [`SessionStore::sweep`] on a fixed interval.
pub struct Sweeper {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// The first sweep runs immediately.
    pub fn spawn(store: SessionStore, interval: Duration) -> Self {
        let (shutdown, mut stop) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = ticker.tick() => {
                        let store = store.clone();
                        match tokio::task::spawn_blocking(move || store.sweep()).await {
                            Ok(Ok(removed)) if !removed.is_empty() => {
                                tracing::info!(removed = removed.len(), "cleanup sweep finished");
                            }
                            Ok(Ok(_)) => tracing::debug!("cleanup sweep found nothing to remove"),
                            Ok(Err(e)) => tracing::warn!("cleanup sweep failed: {:#}", e),
                            Err(e) => tracing::error!("cleanup sweep task failed: {}", e),
                        }
                    }
                }
            }
            tracing::debug!("cleanup sweeper stopped");
        });

        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.handle.await;
    }
}
