//! Concurrency tests.
//!
//! Many threads race on the same registry; mutual exclusion must hold for
//! every interleaving.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use arbiter_ownership::{OwnershipRegistry, Subsystem};

const THREADS: usize = 16;

#[test]
fn test_exactly_one_racer_wins() {
    for _round in 0..50 {
        let reg = Arc::new(OwnershipRegistry::new());
        let s = Subsystem::new("Elevator");
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let reg = Arc::clone(&reg);
                let s = s.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let token = format!("routine-{i}");
                    barrier.wait();
                    (token.clone(), reg.acquire_ownership(Some(token.as_str()), &s))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter(|(_, won)| *won).collect();
        assert_eq!(winners.len(), 1, "exactly one acquirer must win: {results:?}");
        assert_eq!(reg.owner(&s).unwrap(), winners[0].0.as_str());
    }
}

#[test]
fn test_critical_section_never_shared() {
    let reg = OwnershipRegistry::new();
    let s = Subsystem::new("Climber");
    let inside = AtomicUsize::new(0);
    let entries = AtomicUsize::new(0);

    thread::scope(|scope| {
        for i in 0..THREADS {
            let (reg, s, inside, entries) = (&reg, &s, &inside, &entries);
            scope.spawn(move || {
                let token = format!("routine-{i}");
                for _ in 0..500 {
                    if reg.acquire_ownership(Some(token.as_str()), s) {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        assert_eq!(reg.validate_ownership(Some(token.as_str()), s), Ok(true));
                        entries.fetch_add(1, Ordering::Relaxed);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        assert!(reg.release_ownership(Some(token.as_str()), s));
                    } else {
                        thread::yield_now();
                    }
                }
            });
        }
    });

    assert!(entries.load(Ordering::Relaxed) > 0);
    assert!(!reg.is_owned(&s));
}

#[test]
fn test_scoped_guards_under_contention() {
    let reg = OwnershipRegistry::new();
    let s = Subsystem::new("Wrist");
    let inside = AtomicUsize::new(0);

    thread::scope(|scope| {
        for i in 0..THREADS {
            let (reg, s, inside) = (&reg, &s, &inside);
            scope.spawn(move || {
                let token = format!("routine-{i}");
                for _ in 0..200 {
                    if let Ok(_guard) = reg.try_acquire(Some(token.as_str()), s) {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(reg.owned_count(), 0);
}

#[test]
fn test_release_all_while_others_work() {
    let reg = OwnershipRegistry::new();
    let mine: Vec<_> = (0..32).map(|i| Subsystem::new(format!("mine-{i}"))).collect();
    let theirs: Vec<_> = (0..32).map(|i| Subsystem::new(format!("theirs-{i}"))).collect();

    for s in &mine {
        assert!(reg.acquire_ownership(Some("auto1"), s));
    }

    thread::scope(|scope| {
        scope.spawn(|| {
            for s in &theirs {
                assert!(reg.acquire_ownership(Some("teleop"), s));
            }
        });
        scope.spawn(|| {
            assert_eq!(reg.release_all(Some("auto1")), 32);
        });
    });

    assert_eq!(reg.owned_count(), 32);
    assert!(reg.snapshot().iter().all(|(_, owner)| *owner == "teleop"));
}
