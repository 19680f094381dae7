use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::adapters::xml::{parse_closure_document, write_closure_document};
use crate::domain::model::{ClosureDocument, ServiceType, Subscription};
use crate::domain::ports::{ClosureDataSource, ClosureRepository};
use crate::utils::error::{ClosureError, Result};

pub const DEFAULT_WRITE_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Reads `<folder>/<service type file name>`.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    folder: PathBuf,
}

impl FileDataSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn path_for(&self, service_type: &ServiceType) -> Result<PathBuf> {
        Ok(self.folder.join(service_type.file_name()?))
    }
}

impl ClosureDataSource for FileDataSource {
    fn read_closure_data(&self, service_type: &ServiceType) -> Result<ClosureDocument> {
        let path = self.path_for(service_type)?;
        if !path.exists() {
            return Err(ClosureError::not_found(path.display().to_string()));
        }

        debug!("Reading closure data from {}", path.display());
        let xml = fs::read_to_string(&path)?;
        parse_closure_document(&xml)
    }
}

/// Reads a JSON array of subscriptions, as exported by the subscription store.
pub fn read_subscriptions(path: impl AsRef<Path>) -> Result<Vec<Subscription>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ClosureError::not_found(path.display().to_string()));
    }
    let json = fs::read_to_string(path)?;
    let subscriptions: Vec<Subscription> = serde_json::from_str(&json)
        .map_err(|e| ClosureError::document(format!("{}: {}", path.display(), e)))?;
    debug!("Read {} subscriptions from {}", subscriptions.len(), path.display());
    Ok(subscriptions)
}

/// Writes closure documents through a temp file so readers never see a partial write.
///
/// A save serializes the [`ClosureDocument`] it is given. Closures dropped when the
/// document was read (unreadable start or end dates) are therefore not written back,
/// so a read, edit, save cycle removes them from storage.
#[derive(Debug, Clone)]
pub struct FileRepository {
    folder: PathBuf,
    namespace: String,
    attempts: u32,
    retry_delay: Duration,
}

impl FileRepository {
    pub fn new(folder: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            namespace: namespace.into(),
            attempts: DEFAULT_WRITE_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    fn temp_path(target: &Path) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S-%3f");
        let stem = target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!("{}.{}.xml", stem, stamp))
    }

    /// Runs `op` until it succeeds or the attempts run out.
    fn retrying<T>(&self, path: &Path, mut op: impl FnMut() -> std::io::Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    warn!(
                        "Attempt {}/{} to write {} failed: {}",
                        attempt,
                        self.attempts,
                        path.display(),
                        e
                    );
                    attempt += 1;
                    thread::sleep(self.retry_delay);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl ClosureRepository for FileRepository {
    fn save_closure_info(&self, service_type: &ServiceType, info: &ClosureDocument) -> Result<()> {
        let target = self.folder.join(service_type.file_name()?);
        let xml = write_closure_document(info, &self.namespace)?;

        fs::create_dir_all(&self.folder)?;
        let temp = Self::temp_path(&target);

        let saved = self
            .retrying(&temp, || fs::write(&temp, &xml))
            .and_then(|()| self.retrying(&target, || fs::copy(&temp, &target)));

        // Also covers a partially written temp file
        if temp.exists() {
            if let Err(e) = fs::remove_file(&temp) {
                warn!("Could not remove temp file {}: {}", temp.display(), e);
            }
        }

        match saved {
            Ok(_) => {
                info!(
                    "Saved {} services to {}",
                    info.services.len(),
                    target.display()
                );
                Ok(())
            }
            Err(e) => {
                error!("Giving up writing {}: {}", target.display(), e);
                Err(e)
            }
        }
    }
}
