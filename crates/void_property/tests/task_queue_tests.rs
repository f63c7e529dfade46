//! Task queues driven from several threads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use void_property::prelude::*;

#[test]
fn producers_keep_their_own_order() {
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let log = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..4u32)
        .map(|producer| {
            let queue = queue.clone();
            let log = log.clone();
            thread::spawn(move || {
                for n in 0..25u32 {
                    let log = log.clone();
                    queue.add_task(Box::new(move || log.lock().push((producer, n))));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(queue.process_tasks(), 100);
    let log = log.lock();
    for producer in 0..4 {
        let seen: Vec<u32> = log.iter().filter(|(p, _)| *p == producer).map(|(_, n)| *n).collect();
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
    }
}

#[test]
fn coalesced_submissions_from_many_threads_run_once() {
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let runs = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));

    let writers: Vec<_> = (0..8usize)
        .map(|writer| {
            let queue = queue.clone();
            let runs = runs.clone();
            let last = last.clone();
            thread::spawn(move || {
                for n in 0..50usize {
                    let runs = runs.clone();
                    let last = last.clone();
                    queue.add_coalesced(
                        42,
                        Box::new(move || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            last.store(writer * 100 + n, Ordering::SeqCst);
                        }),
                    );
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(queue.pending(), 1);
    queue.process_tasks();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(last.load(Ordering::SeqCst) % 100, 49);
}

#[test]
fn task_queued_by_a_task_runs_next_batch() {
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let ran = Arc::new(AtomicUsize::new(0));
    let (q, r) = (queue.clone(), ran.clone());
    queue.add_task(Box::new(move || {
        let r = r.clone();
        q.add_task(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }));
    }));

    assert_eq!(queue.process_tasks(), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(queue.process_tasks(), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn threaded_queue_runs_off_the_caller_thread() {
    let queue = ThreadedTaskQueue::new("worker").unwrap();
    let caller = thread::current().id();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    queue.add_task(Box::new(move || {
        *s.lock() = Some(thread::current().id());
    }));
    queue.wait();
    let worker = seen.lock().unwrap();
    assert_ne!(worker, caller);
    assert_eq!(queue.name(), "worker");
}

#[test]
fn cancelled_coalesced_task_can_be_resubmitted() {
    let queue = PollingTaskQueue::new("engine");
    let runs = Arc::new(AtomicUsize::new(0));
    let r = runs.clone();
    let token = queue.add_coalesced(1, Box::new(move || {
        r.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(queue.cancel_task(token));

    let r = runs.clone();
    let again = queue.add_coalesced(1, Box::new(move || {
        r.fetch_add(1, Ordering::SeqCst);
    }));
    assert_ne!(token, again);
    queue.process_tasks();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
