use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use virtual_scheduler::{Kwargs, VirtualScheduler};

fn bench_insert_and_cancel(c: &mut Criterion) {
    let scheduler = VirtualScheduler::default();
    let due = scheduler.now() + Duration::seconds(10);

    c.bench_function("insert_and_cancel", |b| {
        b.iter(|| {
            let handle = scheduler.insert_schedule(due, |_: &Kwargs| {}, Kwargs::new(), 0).unwrap();
            black_box(scheduler.cancel(&handle));
        });
    });
}

fn bench_advance_through_one_shots(c: &mut Criterion) {
    c.bench_function("advance_through_100_one_shots", |b| {
        b.iter(|| {
            let scheduler = VirtualScheduler::default();
            let start = scheduler.now();
            for offset in (0..100).rev() {
                scheduler
                    .insert_schedule(start + Duration::seconds(offset), |_: &Kwargs| {}, Kwargs::new(), 0)
                    .unwrap();
            }
            scheduler.fast_forward(Duration::seconds(100)).unwrap();
            black_box(scheduler.metrics().dispatched);
        });
    });
}

fn bench_interval_day(c: &mut Criterion) {
    c.bench_function("minutely_interval_for_one_day", |b| {
        b.iter(|| {
            let scheduler = VirtualScheduler::default();
            scheduler
                .insert_schedule(scheduler.now() + Duration::seconds(60), |_: &Kwargs| {}, Kwargs::new(), 60)
                .unwrap();
            scheduler.fast_forward(Duration::days(1)).unwrap();
            black_box(scheduler.metrics().dispatched);
        });
    });
}

criterion_group!(benches, bench_insert_and_cancel, bench_advance_through_one_shots, bench_interval_day);
criterion_main!(benches);
