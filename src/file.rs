//! Resource contract - what the table needs to know about a stored file
//!
//! The table never looks inside a resource after install. The two
//! properties below are sampled once and cached in the slot flags.

use crate::table::FileFlags;

/// A resource that can be placed in a fixed file slot
pub trait FixedFile {
    /// Resource can be driven without blocking (fast path eligible)
    fn supports_nowait(&self) -> bool;

    /// Backing object is a plain seekable file
    fn is_regular(&self) -> bool;
}

/// Compute the slot flags for a resource (install time only)
#[inline]
pub fn file_flags<F: FixedFile + ?Sized>(file: &F) -> FileFlags {
    let mut flags = FileFlags::empty();
    if file.supports_nowait() {
        flags |= FileFlags::NOWAIT;
    }
    if file.is_regular() {
        flags |= FileFlags::REGULAR;
    }
    flags
}

impl FixedFile for std::fs::File {
    // std file handles issue blocking syscalls
    fn supports_nowait(&self) -> bool {
        false
    }

    fn is_regular(&self) -> bool {
        self.metadata().map(|meta| meta.is_file()).unwrap_or(false)
    }
}

impl<F: FixedFile + ?Sized> FixedFile for Box<F> {
    fn supports_nowait(&self) -> bool {
        (**self).supports_nowait()
    }

    fn is_regular(&self) -> bool {
        (**self).is_regular()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        nowait: bool,
        regular: bool,
    }

    impl FixedFile for Stub {
        fn supports_nowait(&self) -> bool {
            self.nowait
        }

        fn is_regular(&self) -> bool {
            self.regular
        }
    }

    #[test]
    fn flags_follow_properties() {
        let both = Stub { nowait: true, regular: true };
        assert_eq!(file_flags(&both), FileFlags::NOWAIT | FileFlags::REGULAR);

        let none = Stub { nowait: false, regular: false };
        assert!(file_flags(&none).is_empty());
    }

    #[test]
    fn std_file_is_regular_and_blocking() {
        let file = tempfile::tempfile().expect("tempfile");
        let flags = file_flags(&file);
        assert!(flags.contains(FileFlags::REGULAR));
        assert!(!flags.contains(FileFlags::NOWAIT));
    }

    #[test]
    fn boxed_trait_object_forwards() {
        let boxed: Box<dyn FixedFile> = Box::new(Stub { nowait: true, regular: false });
        assert_eq!(file_flags(&boxed), FileFlags::NOWAIT);
    }
}
