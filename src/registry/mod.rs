//! File registry - the owning context around a fixed file table
//!
//! Design: the table sits behind a reader/writer lock owned here.
//! - Writers: register, unregister, install, remove, update, range, resize
//! - Readers: `get` / `with_file` lookups, which may run concurrently
//!
//! Holding the write lock is what makes a resize quiescent: no lookup can be
//! in flight while the slot array is reallocated. References removed from
//! the table are released after the lock is dropped.


use crate::config::TableConfig;
use crate::errors::{RegistryError, RegistryResult, TableError};
use crate::file::{file_flags, FixedFile};
use crate::logging::{debug, trace};
use crate::table::{FileFlags, FileTable, TableStats};
use parking_lot::{MappedRwLockWriteGuard, RwLock, RwLockWriteGuard};
use std::sync::Arc;

/// Raw slot value asking the registry to pick a free slot
pub const FILE_INDEX_ALLOC: u32 = u32::MAX;

/// Where an install should land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSelect {
    /// Next free slot in the allocation range
    Auto,
    /// This exact slot, replacing whatever is there
    Fixed(usize),
}

impl SlotSelect {
    /// Map a caller-facing slot number, honouring the allocation sentinel
    pub fn from_raw(raw: u32) -> Self {
        if raw == FILE_INDEX_ALLOC {
            Self::Auto
        } else {
            Self::Fixed(raw as usize)
        }
    }
}

impl From<u32> for SlotSelect {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

/// One entry of a batched update
pub enum FileUpdate<F> {
    /// Leave the slot as it is
    Skip,
    /// Empty the slot
    Clear,
    /// Replace the slot contents
    Set(Arc<F>),
}

/// Allocation window as passed by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileIndexRange {
    pub off: u32,
    pub len: u32,
    /// Reserved, must be zero
    pub resv: u64,
}

pub struct FileRegistry<F> {
    table: RwLock<Option<FileTable<F>>>,
    config: TableConfig,
}

impl<F: FixedFile> FileRegistry<F> {
    /// Registry with no table yet
    pub fn new(config: TableConfig) -> Self {
        Self {
            table: RwLock::new(None),
            config,
        }
    }

    /// Registry prepared according to `config`
    ///
    /// A non-zero `initial_capacity` registers a sparse table and applies
    /// the configured allocation range to it.
    pub fn from_config(config: TableConfig) -> RegistryResult<Self> {
        let initial = config.initial_capacity;
        let range = config.alloc_range;
        let registry = Self::new(config);

        if initial > 0 {
            registry.register_sparse(initial)?;
            if let Some(range) = range {
                let mut table = registry.lock_table()?;
                table.set_alloc_range(range.offset, range.len)?;
            }
        }
        Ok(registry)
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn is_registered(&self) -> bool {
        self.table.read().is_some()
    }

    /// Create the table from `files`, each present entry at its own index
    pub fn register_files(&self, files: Vec<Option<Arc<F>>>) -> RegistryResult<()> {
        let mut guard = self.table.write();
        if guard.is_some() {
            return Err(RegistryError::AlreadyRegistered);
        }
        let mut table = self.create_table(files.len())?;

        for (index, file) in files.into_iter().enumerate() {
            if let Some(file) = file {
                let flags = file_flags(&*file);
                table.install_explicit(index, file, flags)?;
            }
        }

        debug!(
            event = "files_registered",
            capacity = table.capacity(),
            occupied = table.len()
        );
        *guard = Some(table);
        Ok(())
    }

    /// Create an all-empty table of `nr` slots
    pub fn register_sparse(&self, nr: usize) -> RegistryResult<()> {
        let mut guard = self.table.write();
        if guard.is_some() {
            return Err(RegistryError::AlreadyRegistered);
        }
        let table = self.create_table(nr)?;

        debug!(event = "sparse_registered", capacity = nr);
        *guard = Some(table);
        Ok(())
    }

    /// Drop the table, releasing every stored reference
    ///
    /// Returns how many references were released.
    pub fn unregister_files(&self) -> RegistryResult<usize> {
        let mut table = self.table.write().take().ok_or(RegistryError::NotRegistered)?;

        let occupied: Vec<usize> = table.occupied().collect();
        let released: Vec<Arc<F>> = occupied
            .into_iter()
            .filter_map(|index| table.remove(index).ok())
            .collect();
        table.destroy();

        debug!(event = "files_unregistered", released = released.len());
        Ok(released.len())
    }

    /// Install `file`, returning the slot it landed in
    ///
    /// A fixed slot that is already occupied has its old reference replaced.
    pub fn install(&self, file: Arc<F>, slot: SlotSelect) -> RegistryResult<usize> {
        let flags = file_flags(&*file);
        let mut table = self.lock_table()?;

        let result = match slot {
            SlotSelect::Auto => table.install_auto(file, flags).map(|index| (index, None)),
            SlotSelect::Fixed(index) => replace_slot(&mut *table, index, file, flags),
        };
        drop(table);

        match result {
            Ok((index, replaced)) => {
                trace!(event = "file_installed", index, flags = ?flags, replaced = replaced.is_some());
                Ok(index)
            }
            Err(err) => {
                debug!(event = "install_failed", slot = ?slot, error = %err);
                Err(err.into())
            }
        }
    }

    /// Take the reference out of slot `index`
    pub fn remove(&self, index: usize) -> RegistryResult<Arc<F>> {
        let file = self.lock_table()?.remove(index).map_err(|err| {
            debug!(event = "remove_failed", index, error = %err);
            err
        })?;

        trace!(event = "file_removed", index);
        Ok(file)
    }

    /// Clone the reference in slot `index`
    pub fn get(&self, index: usize) -> RegistryResult<(Arc<F>, FileFlags)> {
        let guard = self.table.read();
        let table = guard.as_ref().ok_or(RegistryError::NotRegistered)?;
        Ok(table.get(index)?)
    }

    /// Run `f` against slot `index` under the read lock
    #[inline]
    pub fn with_file<R>(&self, index: usize, f: impl FnOnce(&F, FileFlags) -> R) -> RegistryResult<R> {
        let guard = self.table.read();
        let table = guard.as_ref().ok_or(RegistryError::NotRegistered)?;
        let (file, flags) = table.resolve(index)?;
        Ok(f(file, flags))
    }

    /// Apply `updates` to consecutive slots starting at `offset`
    ///
    /// Stops at the first failing entry. Returns the number of entries
    /// processed, or the error if nothing was processed.
    pub fn update_files(&self, offset: usize, updates: Vec<FileUpdate<F>>) -> RegistryResult<usize> {
        let mut table = self.lock_table()?;
        let capacity = table.capacity();
        let end = offset.checked_add(updates.len());
        if end.map_or(true, |end| end > capacity) {
            return Err(TableError::InvalidRange { offset, len: updates.len(), capacity }.into());
        }

        let mut released = Vec::new();
        let mut done = 0;
        let mut failure = None;

        for update in updates {
            let index = offset + done;
            let outcome = match update {
                FileUpdate::Skip => Ok(()),
                FileUpdate::Clear => {
                    if table.is_occupied(index) {
                        table.remove(index).map(|old| released.push(old))
                    } else {
                        Ok(())
                    }
                }
                FileUpdate::Set(file) => {
                    let flags = file_flags(&*file);
                    replace_slot(&mut *table, index, file, flags).map(|(_, old)| released.extend(old))
                }
            };
            if let Err(err) = outcome {
                failure = Some(err);
                break;
            }
            done += 1;
        }
        drop(table);

        debug!(event = "files_updated", offset, done, released = released.len());
        match failure {
            Some(err) if done == 0 => Err(err.into()),
            _ => Ok(done),
        }
    }

    /// Restrict automatic allocation to a caller-supplied window
    pub fn register_alloc_range(&self, range: FileIndexRange) -> RegistryResult<()> {
        if range.resv != 0 {
            return Err(RegistryError::invalid("reserved field must be zero"));
        }
        if range.off.checked_add(range.len).is_none() {
            return Err(RegistryError::invalid("range end overflows"));
        }

        self.lock_table()?
            .set_alloc_range(range.off as usize, range.len as usize)?;
        debug!(event = "alloc_range_set", off = range.off, len = range.len);
        Ok(())
    }

    /// Grow or shrink the table
    pub fn resize(&self, nr: usize) -> RegistryResult<()> {
        self.check_limit(nr)?;
        let mut table = self.lock_table()?;
        let old = table.capacity();
        table.resize(nr)?;

        debug!(event = "table_resized", from = old, to = nr);
        Ok(())
    }

    /// Exclusive access to the table for a batch of mutations
    pub fn lock_table(&self) -> RegistryResult<MappedRwLockWriteGuard<'_, FileTable<F>>> {
        RwLockWriteGuard::try_map(self.table.write(), Option::as_mut)
            .map_err(|_| RegistryError::NotRegistered)
    }

    pub fn stats(&self) -> Option<TableStats> {
        self.table.read().as_ref().map(FileTable::stats)
    }

    fn check_limit(&self, nr: usize) -> RegistryResult<()> {
        if nr == 0 {
            return Err(RegistryError::invalid("table must have at least one slot"));
        }
        if nr > self.config.max_fixed_files {
            return Err(RegistryError::TooManyFiles {
                requested: nr,
                max: self.config.max_fixed_files,
            });
        }
        Ok(())
    }

    fn create_table(&self, nr: usize) -> RegistryResult<FileTable<F>> {
        self.check_limit(nr)?;
        Ok(FileTable::create(nr)?)
    }
}

impl<F> std::fmt::Debug for FileRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRegistry")
            .field("table", &*self.table.read())
            .field("config", &self.config)
            .finish()
    }
}

/// Install at `index`, evicting the previous occupant
///
/// The evicted reference is handed back so the caller can release it
/// outside the lock.
fn replace_slot<F>(
    table: &mut FileTable<F>,
    index: usize,
    file: Arc<F>,
    flags: FileFlags,
) -> Result<(usize, Option<Arc<F>>), TableError> {
    if index >= table.capacity() {
        return Err(TableError::InvalidRange { offset: index, len: 1, capacity: table.capacity() });
    }
    let old = if table.is_occupied(index) {
        Some(table.remove(index)?)
    } else {
        None
    };
    table.install_explicit(index, file, flags)?;
    Ok((index, old))
}
