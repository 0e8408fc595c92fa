#![warn(rust_2018_idioms)]

use progress_sync::{ErrorCode, ProgressRing, SyncHandle};

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn ring() -> ProgressRing {
    ProgressRing::new(|| thread::yield_now())
}

#[test]
fn zero_expected_completions_is_immediate() {
    let ring = ring();
    let handle = SyncHandle::new(0);

    assert!(handle.is_complete());
    assert_eq!(handle.remaining(), 0);
    assert_eq!(ring.block_until_complete(&handle), Ok(()));
}

#[test]
fn tracks_remaining_completions() {
    let handle = SyncHandle::new(3);
    let completer = handle.completer();

    completer.complete(1);
    assert!(!handle.is_complete());
    assert_eq!(handle.remaining(), 2);

    completer.complete(2);
    assert!(handle.is_complete());
    assert_eq!(handle.remaining(), 0);
}

#[test]
fn settles_only_after_every_completion() {
    let ring = ring();
    let handle = SyncHandle::new(3);
    let completer = handle.completer();

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let ring = ring.clone();
        thread::spawn(move || tx.send(ring.block_until_complete(&handle)).unwrap())
    };

    for _ in 0..2 {
        completer.complete(1);
        thread::sleep(Duration::from_millis(20));
        assert!(
            rx.try_recv().is_err(),
            "wait returned before the final completion"
        );
    }

    completer.complete(1);
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Ok(()));
    waiter.join().unwrap();
}

#[test]
fn update_applies_batched_completions() {
    let ring = ring();
    let handle = SyncHandle::new(3);
    let completer = handle.completer();

    completer.update(2, Ok(()));
    assert_eq!(handle.remaining(), 1);

    completer.update(1, Ok(()));
    assert_eq!(ring.block_until_complete(&handle), Ok(()));
}

#[test]
fn error_short_circuits_the_count() {
    let ring = ring();
    let failed = ErrorCode::new(-3).unwrap();

    let handle = SyncHandle::new(2);
    let completer = handle.completer();

    completer.complete(1);
    completer.fail(failed);

    // One completion is still outstanding, but the error settles the handle.
    assert!(handle.is_complete());
    assert_eq!(ring.block_until_complete(&handle), Err(failed));
}

#[test]
fn first_recorded_error_wins() {
    let ring = ring();
    let first = ErrorCode::new(-7).unwrap();
    let second = ErrorCode::new(-8).unwrap();

    let handle = SyncHandle::new(3);
    let completer = handle.completer();

    completer.fail(first);
    completer.fail(second);

    assert_eq!(ring.block_until_complete(&handle), Err(first));
}

#[test]
fn late_updates_are_tolerated() {
    let ring = ring();
    let handle = SyncHandle::new(1);
    let completer = handle.completer();

    completer.complete(1);
    assert_eq!(ring.block_until_complete(&handle), Ok(()));

    // Stale callbacks may still fire after the wait settled.
    completer.complete(1);
    assert!(handle.is_complete());
    assert_eq!(handle.remaining(), 0);
}

#[test]
fn completers_are_cloneable() {
    let ring = ring();
    let handle = SyncHandle::new(2);
    let completer = handle.completer();

    let second = completer.clone();
    let t1 = thread::spawn(move || completer.complete(1));
    let t2 = thread::spawn(move || second.complete(1));

    assert_eq!(ring.block_until_complete(&handle), Ok(()));
    t1.join().unwrap();
    t2.join().unwrap();
}

#[test]
fn waiter_can_drop_handle_while_updater_finishes() {
    let ring = ring();

    for _ in 0..200 {
        let handle = SyncHandle::new(1);
        let completer = handle.completer();

        let updater = thread::spawn(move || completer.complete(1));

        assert_eq!(ring.block_until_complete(&handle), Ok(()));
        drop(handle);
        updater.join().unwrap();
    }
}
