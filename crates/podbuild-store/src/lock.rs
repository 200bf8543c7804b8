use crate::StoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Exclusive advisory lock on the cache. Released on drop.
pub struct CacheLock {
    lock_file: File,
}

fn open_lock_file(lock_path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?)
}

impl CacheLock {
    /// Block until no other process or thread holds the cache.
    pub fn acquire(lock_path: &Path) -> Result<Self, StoreError> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive()
            .map_err(|e| StoreError::LockFailed(format!("{}: {e}", lock_path.display())))?;
        debug!("acquired cache lock {}", lock_path.display());
        Ok(Self { lock_file: file })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C makes the next download or extraction step fail with
/// [`StoreError::Interrupted`]; a second one exits immediately.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        eprintln!("\ninterrupt received, stopping after the current step...");
    });
}

/// Fail with [`StoreError::Interrupted`] if Ctrl-C was pressed.
pub(crate) fn checkpoint() -> Result<(), StoreError> {
    if INTERRUPTED.load(Ordering::SeqCst) {
        Err(StoreError::Interrupted)
    } else {
        Ok(())
    }
}
