use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ringfiles::{FileFlags, FileTable};
use std::sync::Arc;

fn bench_resolve(c: &mut Criterion) {
    let mut table = FileTable::create(1024).expect("create");
    for i in 0..1024u32 {
        table.install_auto(Arc::new(i), FileFlags::NOWAIT).expect("install");
    }

    c.bench_function("resolve_hot_slot", |b| {
        b.iter(|| {
            let (file, flags) = table.resolve(black_box(512)).expect("resolve");
            black_box((*file, flags))
        });
    });
}

fn bench_install_remove(c: &mut Criterion) {
    let mut table = FileTable::create(1024).expect("create");
    for i in 0..1023u32 {
        table.install_auto(Arc::new(i), FileFlags::empty()).expect("install");
    }
    let file = Arc::new(0u32);

    // one hole left: every install scans to it, every remove rewinds the hint
    c.bench_function("install_remove_cycle", |b| {
        b.iter(|| {
            let index = table.install_auto(file.clone(), FileFlags::empty()).expect("install");
            black_box(table.remove(index).expect("remove"));
        });
    });
}

fn bench_wrapping_scan(c: &mut Criterion) {
    let mut table = FileTable::create(4096).expect("create");
    for i in 0..4096u32 {
        table.install_auto(Arc::new(i), FileFlags::empty()).expect("install");
    }
    let file = Arc::new(0u32);

    // hint parked at the end, free slot at the front
    c.bench_function("wrapping_scan", |b| {
        b.iter(|| {
            drop(table.remove(0).expect("remove front"));
            drop(table.remove(4095).expect("remove back"));
            table.install_explicit(4095, file.clone(), FileFlags::empty()).expect("back");
            let index = table.install_auto(file.clone(), FileFlags::empty()).expect("install");
            black_box(index);
        });
    });
}

criterion_group!(benches, bench_resolve, bench_install_remove, bench_wrapping_scan);
criterion_main!(benches);
