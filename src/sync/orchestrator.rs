//! Sync orchestration.
//!
//! One run walks `Checking → Detecting → Downloading → Writing →
//! PersistingCheckpoint` and returns to `Idle`. An empty change set ends
//! the run after detection. Only one run may be active per [`SyncLock`].

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, SyncConfig, SyncMode};
use crate::error::{Error, Result};
use crate::memos::{MemosApi, MemosUser};
use crate::model::{ChangeSet, MemoId, NormalizedMemo};
use crate::siyuan::SiyuanApi;

use super::checkpoint::Checkpoint;
use super::detect::detect_changes;
use super::download::download_resources;
use super::links::StoreLinkResolver;
use super::normalize::Normalizer;
use super::notify::Notifier;
use super::report::SyncReport;
use super::writer::Writer;

/// Single-acquire lock guarding sync runs.
///
/// With a lock file the lock also holds across processes: the file is
/// created exclusively on acquire and removed when the guard drops.
#[derive(Debug, Default)]
pub struct SyncLock {
    held: AtomicBool,
    file: Option<PathBuf>,
}

impl SyncLock {
    /// A lock shared only within this process.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            file: None,
        }
    }

    /// A lock that is also taken by creating `path`.
    #[must_use]
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            held: AtomicBool::new(false),
            file: Some(path.into()),
        }
    }

    /// Take the lock, or `None` if a run is already active here or in
    /// another process.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created for any reason
    /// other than already existing.
    pub fn try_acquire(&self) -> Result<Option<SyncGuard<'_>>> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }

        if let Some(path) = &self.file {
            match create_lock_file(path) {
                Ok(()) => debug!(path = %path.display(), "Acquired sync lock file"),
                Err(e) => {
                    self.held.store(false, Ordering::Release);
                    if e.kind() == io::ErrorKind::AlreadyExists {
                        info!(path = %path.display(), "Sync lock file already present");
                        return Ok(None);
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(Some(SyncGuard { lock: self }))
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Acquire) || self.file.as_ref().is_some_and(|p| p.exists())
    }
}

fn create_lock_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())
}

/// Releases the [`SyncLock`] when dropped.
#[derive(Debug)]
pub struct SyncGuard<'a> {
    lock: &'a SyncLock,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        if let Some(path) = &self.lock.file {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove sync lock file");
            }
        }
        self.lock.held.store(false, Ordering::Release);
    }
}

/// Run state, logged on every transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Checking,
    Detecting,
    Downloading,
    Writing,
    PersistingCheckpoint,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Detecting => "detecting",
            Self::Downloading => "downloading",
            Self::Writing => "writing",
            Self::PersistingCheckpoint => "persisting-checkpoint",
        };
        f.write_str(name)
    }
}

/// Options for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after normalization; nothing is written to SiYuan or the config.
    pub dry_run: bool,
    /// Push a notice when there is nothing to sync; otherwise only log it.
    pub announce_idle: bool,
}

/// Pending changes without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPreview {
    pub checkpoint: String,
    pub added: Vec<MemoId>,
    pub stale: Vec<MemoId>,
    pub memos: Vec<NormalizedMemo>,
}

/// How a run ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    NoChanges { checkpoint: String },
    DryRun(SyncPreview),
    Synced(SyncReport),
}

/// Everything one run needs, passed explicitly.
pub struct SyncContext<'a, M, S, N> {
    pub config: SyncConfig,
    pub memos: &'a M,
    pub store: &'a S,
    pub notifier: &'a N,
    pub lock: &'a SyncLock,
    /// Wall clock at the start of the run; its offset is the local timezone.
    pub now: DateTime<FixedOffset>,
    phase: SyncPhase,
}

impl<'a, M: MemosApi, S: SiyuanApi, N: Notifier> SyncContext<'a, M, S, N> {
    pub fn new(
        config: SyncConfig,
        memos: &'a M,
        store: &'a S,
        notifier: &'a N,
        lock: &'a SyncLock,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            config,
            memos,
            store,
            notifier,
            lock,
            now,
            phase: SyncPhase::Idle,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    fn enter(&mut self, phase: SyncPhase) {
        debug!(from = %self.phase, to = %phase, "Sync phase");
        self.phase = phase;
    }

    /// Validate the configuration and both the Memos URL and token.
    ///
    /// # Errors
    ///
    /// `MissingConfig` for an empty required field, `Unauthorized` for a
    /// rejected token, transport errors when the server is unreachable.
    pub async fn check_prerequisites(&self) -> Result<(SyncMode, MemosUser)> {
        let mode = self.config.check_required()?;
        self.memos.ping().await?;
        let user = self.memos.current_user().await?;
        debug!(user = %user.username, mode = %mode, "Prerequisites satisfied");
        Ok((mode, user))
    }

    /// The stored checkpoint, `now` when it cannot be parsed.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::parse_or_now(&self.config.last_sync_time, self.now)
    }

    /// Fetch every memo and classify it against the checkpoint.
    ///
    /// # Errors
    ///
    /// Any failed page.
    pub async fn detect(&self) -> Result<ChangeSet> {
        let checkpoint = self.checkpoint();
        let changes = detect_changes(self.memos, checkpoint.timestamp()).await?;

        let added: Vec<MemoId> = changes.add_list.iter().map(|m| m.id).collect();
        let stale: Vec<MemoId> = changes.delete_list.iter().map(|m| m.id).collect();
        if self.config.debug {
            info!(checkpoint = %checkpoint, ?added, ?stale, "Detected changes");
        } else {
            debug!(checkpoint = %checkpoint, added = added.len(), stale = stale.len(), "Detected changes");
        }
        Ok(changes)
    }

    /// Run one sync. Errors are reported through the notifier before they
    /// are returned.
    ///
    /// # Errors
    ///
    /// `AlreadySyncing` when another run holds the lock; otherwise the
    /// first stage error. The checkpoint is only persisted once every memo
    /// of the batch has been written and tagged.
    pub async fn run<C: ConfigStore>(
        &mut self,
        config_store: &C,
        options: RunOptions,
    ) -> Result<SyncOutcome> {
        let lock = self.lock;
        let Some(_guard) = lock.try_acquire()? else {
            self.notifier.info("Sync already in progress").await;
            return Err(Error::AlreadySyncing);
        };

        let result = self.run_locked(config_store, options).await;
        self.enter(SyncPhase::Idle);

        match result {
            Ok(outcome) => {
                match &outcome {
                    SyncOutcome::NoChanges { .. } if options.announce_idle => {
                        self.notifier.info("No new memos to sync").await;
                    }
                    SyncOutcome::NoChanges { checkpoint } => {
                        info!(checkpoint = %checkpoint, "No new memos to sync");
                    }
                    SyncOutcome::DryRun(preview) => {
                        info!(
                            added = preview.added.len(),
                            stale = preview.stale.len(),
                            "Dry run complete"
                        );
                    }
                    SyncOutcome::Synced(report) => {
                        self.notifier.info(&report.summary()).await;
                        for failure in &report.failures {
                            self.notifier.error(&failure.to_string()).await;
                        }
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                self.notifier.error(&e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run_locked<C: ConfigStore>(
        &mut self,
        config_store: &C,
        options: RunOptions,
    ) -> Result<SyncOutcome> {
        self.enter(SyncPhase::Checking);
        let (mode, _user) = self.check_prerequisites().await?;

        self.enter(SyncPhase::Detecting);
        let checkpoint = self.checkpoint();
        let changes = self.detect().await?;
        if changes.is_empty() {
            return Ok(SyncOutcome::NoChanges {
                checkpoint: checkpoint.to_string(),
            });
        }

        let mut normalizer = Normalizer::from_config(&self.config, *self.now.offset());
        if options.dry_run {
            // Link resolution creates documents, so previews leave tokens as written.
            normalizer.transformer.bidirectional_links = false;
        }
        let batch = {
            let notebook = self.config.notebook_id.trim();
            let resolver = StoreLinkResolver::new(self.store, notebook, &self.config.subject_path);
            normalizer
                .normalize_batch(&changes.add_list, &resolver)
                .await?
        };

        if options.dry_run {
            return Ok(SyncOutcome::DryRun(SyncPreview {
                checkpoint: checkpoint.to_string(),
                added: changes.add_list.iter().map(|m| m.id).collect(),
                stale: changes.delete_list.iter().map(|m| m.id).collect(),
                memos: batch.memos,
            }));
        }

        self.enter(SyncPhase::Downloading);
        let downloaded = download_resources(
            self.memos,
            self.store,
            &batch.resources,
            &normalizer.resources,
            self.config.resource_download_mode,
        )
        .await?;

        self.enter(SyncPhase::Writing);
        let written = Writer::new(self.store, &self.config, mode)
            .write(&changes.delete_list, &batch)
            .await?;

        let mut report = SyncReport {
            added: changes.add_list.len(),
            stale: changes.delete_list.len(),
            written: written.written.len(),
            deleted: written.deleted.len(),
            downloaded,
            failures: written.failures,
            checkpoint: None,
        };

        let unwritten = report.unwritten();
        if unwritten > 0 {
            warn!(unwritten, "Memos missing from SiYuan, checkpoint left unchanged");
            return Ok(SyncOutcome::Synced(report));
        }

        self.enter(SyncPhase::PersistingCheckpoint);
        report.checkpoint = if self.config.advances_checkpoint() {
            let next = checkpoint.advance(self.now).to_string();
            self.config.last_sync_time.clone_from(&next);
            config_store.save(&self.config)?;
            info!(checkpoint = %next, "Checkpoint advanced");
            Some(next)
        } else {
            info!("Debug mode: checkpoint left unchanged");
            None
        };

        Ok(SyncOutcome::Synced(report))
    }
}
