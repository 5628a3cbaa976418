/// Concurrent access integration tests
///
/// These tests verify that shared instances are constructed at most once per
/// sharing scope no matter how many threads race for them, and that scopes
/// stay isolated under concurrent use.

use crossbeam_utils::thread;
use ferrous_ioc::{ContainerBuilder, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const THREADS: usize = 16;

struct Slow(usize);

fn slow_builder(created: Arc<AtomicUsize>) -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder.register(move |_| {
        let id = created.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        Ok(Slow(id))
    });
    builder
}

#[test]
fn test_singleton_constructed_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let mut builder = slow_builder(created.clone());
    builder.register(|ctx| Ok(ctx.resolve::<Slow>()?.0 as u64)).single_instance();
    let container = builder.build().unwrap();
    let barrier = Barrier::new(THREADS);

    let results: Vec<Arc<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    container.resolve::<u64>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scoped_instance_shared_by_threads_using_one_scope() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            Ok(Slow(id))
        })
        .instance_per_lifetime_scope();
    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    let barrier = Barrier::new(THREADS);

    let ids: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    scope.resolve::<Slow>().unwrap().0
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scopes_per_thread_stay_isolated() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(Slow(counter.fetch_add(1, Ordering::SeqCst))))
        .instance_per_lifetime_scope();
    let container = builder.build().unwrap();

    let mut ids: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    let scope = container.begin_lifetime_scope();
                    let a = scope.resolve::<Slow>().unwrap();
                    let b = scope.resolve::<Slow>().unwrap();
                    assert!(Arc::ptr_eq(&a, &b));
                    a.0
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), THREADS);
    assert_eq!(created.load(Ordering::SeqCst), THREADS);
}

#[test]
fn test_lazy_registry_initialization_races() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = slow_builder(created).build().unwrap();
    let barrier = Barrier::new(THREADS);

    let counts: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    // First use of Collection<Slow> initializes it through the sources.
                    container.resolve_all::<Slow>().unwrap().len()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert!(counts.iter().all(|c| *c == 1));
    assert_eq!(container.registry().registrations().len(), 2);
}

#[test]
fn test_disposal_while_other_threads_resolve() {
    let mut builder = ContainerBuilder::new();
    builder.register(|_| Ok(Slow(0))).instance_per_lifetime_scope();
    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                for _ in 0..50 {
                    // Either succeeds or reports the disposal; never panics or deadlocks.
                    let _ = scope.resolve::<Slow>();
                }
            });
        }
        s.spawn(|_| scope.dispose());
    })
    .unwrap();

    assert!(scope.is_disposed());
}
