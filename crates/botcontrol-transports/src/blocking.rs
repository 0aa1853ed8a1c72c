// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Threads that must never block on network I/O
//!
//! A UI thread (or any event-loop thread) marks itself once. Socket owners
//! consult [`current_thread_may_block`] before doing blocking teardown work
//! inline and hand that work to a helper thread instead when it returns
//! `false`.

use std::cell::Cell;

thread_local! {
    static NONBLOCKING: Cell<bool> = const { Cell::new(false) };
}

/// Mark the calling thread as one that must never block
pub fn mark_current_thread_nonblocking() {
    NONBLOCKING.with(|flag| flag.set(true));
}

/// Undo [`mark_current_thread_nonblocking`]
pub fn clear_current_thread_nonblocking() {
    NONBLOCKING.with(|flag| flag.set(false));
}

/// Whether blocking I/O is permitted on the calling thread
///
/// With the `tokio` feature, threads driving a Tokio runtime also count as
/// non-blocking.
pub fn current_thread_may_block() -> bool {
    if NONBLOCKING.with(Cell::get) {
        return false;
    }

    #[cfg(feature = "tokio")]
    if tokio::runtime::Handle::try_current().is_ok() {
        return false;
    }

    true
}
