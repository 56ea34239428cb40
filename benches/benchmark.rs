use criterion::{Criterion, black_box, criterion_group, criterion_main};

use attrarium::attribute::AttrValue;
use attrarium::store::AttrStore;

fn value_list_front_insert(c: &mut Criterion) {
    c.bench_function("value list front insert x64", |b| {
        b.iter(|| {
            let mut list = AttrValue::list();
            for i in 0..64 {
                list.insert(0, AttrValue::Long(black_box(i))).unwrap();
            }
            list
        })
    });
}

fn stored_list_push(c: &mut Criterion) {
    let store = AttrStore::in_memory().unwrap();
    let stored = store.create(&AttrValue::list()).unwrap();
    c.bench_function("stored list push", |b| {
        b.iter(|| {
            let list = store.list(&stored).unwrap();
            list.push(&AttrValue::Long(black_box(1))).unwrap();
        })
    });
}

fn stored_map_overwrite(c: &mut Criterion) {
    let store = AttrStore::in_memory().unwrap();
    let stored = store.create(&AttrValue::map()).unwrap();
    c.bench_function("stored map overwrite", |b| {
        b.iter(|| {
            let map = store.map(&stored).unwrap();
            map.put("key", &AttrValue::Long(black_box(1))).unwrap();
        })
    });
}

criterion_group!(
    benches,
    value_list_front_insert,
    stored_list_push,
    stored_map_overwrite
);
criterion_main!(benches);
