//! ringfiles - fixed file table for high-throughput I/O contexts
//!
//! Callers refer to shared resources through small integer slots instead of
//! a general handle table. Each slot packs the resource pointer together
//! with fast-path hint flags, and a bitmap with a moving hint drives
//! automatic slot allocation inside a restrictable window.
//!
//! Layering:
//! - `table`: the unlocked core (slot store, codec, cursor, range)
//! - `registry`: the owning context with its lock and registration surface
//! - `config` / `logging`: ambient setup for binaries and services

pub mod config;
pub mod errors;
pub mod file;
pub mod logging;
pub mod registry;
pub mod table;

// Re-export commonly used items
pub use config::{Config, TableConfig};
pub use errors::{RegistryError, RegistryResult, TableError, TableResult};
pub use file::{file_flags, FixedFile};
pub use logging::{init_logging, LogConfig, LogFormat, LogOutput};
pub use registry::{FileIndexRange, FileRegistry, FileUpdate, SlotSelect, FILE_INDEX_ALLOC};
pub use table::{AllocRange, EncodedSlot, FileFlags, FileTable, TableStats};
