//! Registry hot-path micro-benchmark.
//!
//! Measures one control-loop iteration's worth of registry traffic:
//! - acquire + release of a free subsystem
//! - validate by the current owner
//! - rejected acquire by a second owner
//! - scoped guard acquire/drop

use criterion::{Criterion, criterion_group, criterion_main};

use arbiter_ownership::{OwnershipRegistry, Subsystem};

fn bench_acquire_release(c: &mut Criterion) {
    let reg = OwnershipRegistry::new();
    let s = Subsystem::new("Elevator");

    c.bench_function("acquire_release", |b| {
        b.iter(|| {
            reg.acquire_ownership(Some("auto1"), &s);
            reg.release_ownership(Some("auto1"), &s)
        });
    });
}

fn bench_validate_owner(c: &mut Criterion) {
    let reg = OwnershipRegistry::new();
    let s = Subsystem::new("Elevator");
    reg.acquire_ownership(Some("auto1"), &s);

    c.bench_function("validate_owner", |b| {
        b.iter(|| reg.validate_ownership(Some("auto1"), &s));
    });
}

fn bench_rejected_acquire(c: &mut Criterion) {
    let reg = OwnershipRegistry::new();
    let s = Subsystem::new("Elevator");
    reg.acquire_ownership(Some("auto1"), &s);

    c.bench_function("rejected_acquire", |b| {
        b.iter(|| reg.acquire_ownership(Some("teleop"), &s));
    });
}

fn bench_scoped_guard(c: &mut Criterion) {
    let reg = OwnershipRegistry::new();
    let s = Subsystem::new("Elevator");

    c.bench_function("scoped_guard", |b| {
        b.iter(|| {
            let guard = reg.try_acquire(Some("auto1"), &s);
            guard.is_ok()
        });
    });
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_validate_owner,
    bench_rejected_acquire,
    bench_scoped_guard
);
criterion_main!(benches);
