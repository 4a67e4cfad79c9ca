use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::services::naming::{self, NamingError};

const STAGING_DIR: &str = ".staging";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("invalid owner name")]
    InvalidOwner,

    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },

    #[error("destination name kept colliding after {0} attempts")]
    ConcurrentCollision(u32),

    #[error("file not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An upload spooled to the staging area, not yet visible in any partition.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    pub size: u64,
}

/// Per-owner video storage under a single root directory.
///
/// Each owner gets a partition at `<root>/<username>` holding flat base
/// names. Uploads are first streamed into `<root>/.staging/<uuid>` and then
/// linked into the partition under a collision-resolved name, so a file only
/// ever appears under its final name and never overwrites another.
pub struct MediaLibrary {
    root: PathBuf,
    max_name_probes: u32,
    commit_retries: u32,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>, max_name_probes: u32, commit_retries: u32) -> Self {
        Self {
            root: root.into(),
            max_name_probes,
            commit_retries,
        }
    }

    /// Partition directory for one owner. Owner names come from the URL path
    /// on the public routes, so separators and dotfiles are refused here even
    /// though registration already enforces a stricter charset.
    fn partition(&self, owner: &str) -> Result<PathBuf, LibraryError> {
        if owner.is_empty()
            || owner.starts_with('.')
            || owner.contains('/')
            || owner.contains('\\')
        {
            return Err(LibraryError::InvalidOwner);
        }
        Ok(self.root.join(owner))
    }

    /// Lists the base names in an owner's partition, sorted.
    ///
    /// A missing directory means the owner has never uploaded and reads as an
    /// empty listing. Other I/O failures (e.g. permissions) propagate.
    pub async fn list_files(&self, owner: &str) -> Result<Vec<String>, LibraryError> {
        let dir = self.partition(owner)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Streams an upload into the staging area, enforcing the size cap while
    /// copying. The staged file is invisible to listings until committed.
    pub async fn stage_upload<R>(
        &self,
        reader: &mut R,
        max_size: u64,
    ) -> Result<StagedUpload, LibraryError>
    where
        R: AsyncRead + Unpin,
    {
        let staging_dir = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_dir).await?;

        let path = staging_dir.join(Uuid::new_v4().to_string());
        let mut file = fs::File::create(&path).await?;

        // Read one byte past the cap so an oversize stream is caught without
        // spooling the whole body.
        let mut limited = reader.take(max_size + 1);
        let copied = match tokio::io::copy(&mut limited, &mut file).await {
            Ok(copied) => copied,
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                return Err(e.into());
            }
        };

        if copied > max_size {
            let _ = fs::remove_file(&path).await;
            return Err(LibraryError::TooLarge { limit: max_size });
        }

        file.flush().await?;
        Ok(StagedUpload { path, size: copied })
    }

    /// Moves a staged upload into the owner's partition under a
    /// collision-resolved name and returns that final name.
    ///
    /// The listing consulted by the namer is only a snapshot, so the link
    /// into place uses exclusive-create semantics: `hard_link` fails with
    /// `AlreadyExists` when a racing upload took the name first, in which
    /// case the listing is refreshed and resolution retried a bounded number
    /// of times. Two racers can therefore never both land on one name.
    pub async fn commit(
        &self,
        owner: &str,
        requested: &str,
        staged: StagedUpload,
    ) -> Result<String, LibraryError> {
        let result = self.try_commit(owner, requested, &staged).await;
        let _ = fs::remove_file(&staged.path).await;
        result
    }

    async fn try_commit(
        &self,
        owner: &str,
        requested: &str,
        staged: &StagedUpload,
    ) -> Result<String, LibraryError> {
        let dir = self.partition(owner)?;
        fs::create_dir_all(&dir).await?;

        for attempt in 0..self.commit_retries {
            let listing: HashSet<String> = self.list_files(owner).await?.into_iter().collect();
            let name =
                naming::resolve_destination_name(&listing, requested, self.max_name_probes)?;

            match fs::hard_link(&staged.path, dir.join(&name)).await {
                Ok(()) => return Ok(name),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(
                        owner,
                        name = %name,
                        attempt,
                        "destination taken by a concurrent upload, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LibraryError::ConcurrentCollision(self.commit_retries))
    }

    pub async fn delete_file(&self, owner: &str, name: &str) -> Result<(), LibraryError> {
        let path = self.partition(owner)?.join(checked_name(name)?);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LibraryError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Opens a stored file for streaming; returns the handle and its length.
    pub async fn open_file(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<(fs::File, u64), LibraryError> {
        let path = self.partition(owner)?.join(checked_name(name)?);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(LibraryError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(LibraryError::NotFound);
        }
        Ok((file, metadata.len()))
    }
}

fn checked_name(name: &str) -> Result<&str, LibraryError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\')
    {
        return Err(NamingError::PathTraversal.into());
    }
    Ok(name)
}
