use ringfiles::{
    Config, FileFlags, FileIndexRange, FileRegistry, FileUpdate, RegistryError, SlotSelect,
    TableError, FILE_INDEX_ALLOC,
};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

fn temp_file(contents: &[u8]) -> Arc<File> {
    let mut file = tempfile::tempfile().expect("tempfile");
    file.write_all(contents).expect("write");
    file.seek(SeekFrom::Start(0)).expect("rewind");
    Arc::new(file)
}

#[test]
fn real_files_round_trip_through_slots() {
    let registry = FileRegistry::<File>::new(Default::default());
    registry.register_sparse(4).expect("register");

    let index = registry
        .install(temp_file(b"hello"), SlotSelect::from_raw(FILE_INDEX_ALLOC))
        .expect("install");
    assert_eq!(index, 0);

    let (file, flags) = registry.get(index).expect("get");
    assert!(flags.contains(FileFlags::REGULAR));

    let mut contents = String::new();
    (&*file).read_to_string(&mut contents).expect("read");
    assert_eq!(contents, "hello");
}

#[test]
fn config_file_drives_registry_setup() {
    let config = Config::parse(
        r#"
        [table]
        max_fixed_files = 64
        initial_capacity = 32
        alloc_range = { offset = 16, len = 16 }
        "#,
    )
    .expect("config");

    let registry = FileRegistry::<File>::from_config(config.table).expect("registry");

    // low half is left for explicit installs
    assert_eq!(registry.install(temp_file(b"a"), SlotSelect::Fixed(3)), Ok(3));
    assert_eq!(registry.install(temp_file(b"b"), SlotSelect::Auto), Ok(16));

    assert_eq!(
        registry.resize(128),
        Err(RegistryError::TooManyFiles { requested: 128, max: 64 })
    );
}

#[test]
fn full_lifecycle() {
    let registry = FileRegistry::<File>::new(Default::default());
    registry
        .register_files(vec![Some(temp_file(b"0")), None, Some(temp_file(b"2"))])
        .expect("register");

    // auto allocation continues after the last registered slot
    registry
        .register_alloc_range(FileIndexRange { off: 0, len: 3, resv: 0 })
        .expect("range");
    assert_eq!(registry.install(temp_file(b"1"), SlotSelect::Auto), Ok(1));
    assert_eq!(
        registry.install(temp_file(b"x"), SlotSelect::Auto),
        Err(RegistryError::Table(TableError::NoSpace))
    );

    registry.resize(6).expect("grow");
    registry
        .register_alloc_range(FileIndexRange { off: 3, len: 3, resv: 0 })
        .expect("range");
    assert_eq!(registry.install(temp_file(b"3"), SlotSelect::Auto), Ok(3));

    let done = registry
        .update_files(0, vec![FileUpdate::Clear, FileUpdate::Skip, FileUpdate::Set(temp_file(b"z"))])
        .expect("update");
    assert_eq!(done, 3);

    let stats = registry.stats().expect("stats");
    assert_eq!(stats.capacity, 6);
    assert_eq!(stats.occupied, 3);

    registry.remove(1).expect("remove");
    assert_eq!(registry.unregister_files(), Ok(2));
}
