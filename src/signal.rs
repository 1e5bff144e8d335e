// SPDX-License-Identifier: MIT
//
// SIGWINCH plumbing. One async-signal-safe handler raises two
// independent latches: the draw side consumes its latch on present/clear,
// the input side on poll_event. Each side observes every resize burst at
// least once without the two racing over a shared flag, and back-to-back
// signals coalesce into a single pending resize per side.

#![allow(unsafe_code)]

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

/// A coalescing one-bit resize flag.
struct ResizeLatch(AtomicBool);

impl ResizeLatch {
    const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the latch, returning whether it was raised.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

static DRAW_RESIZE: ResizeLatch = ResizeLatch::new();
static INPUT_RESIZE: ResizeLatch = ResizeLatch::new();
static INSTALL: Once = Once::new();

/// Consume the draw-side latch.
pub(crate) fn draw_take() -> bool {
    DRAW_RESIZE.take()
}

/// Consume the input-side latch.
pub(crate) fn input_take() -> bool {
    INPUT_RESIZE.take()
}

/// Install the SIGWINCH handler. Safe to call repeatedly.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        // SAFETY: zeroed sigaction is a valid starting value; the handler
        // only touches atomics, which is async-signal-safe.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handle_winch as usize;
            action.sa_flags = libc::SA_RESTART;
            libc::sigemptyset(&raw mut action.sa_mask);
            libc::sigaction(libc::SIGWINCH, &raw const action, std::ptr::null_mut());
        }
    });
}

extern "C" fn handle_winch(_sig: libc::c_int) {
    DRAW_RESIZE.raise();
    INPUT_RESIZE.raise();
}

// ─── Tests ───────────────────────────────────────────────────────────────────
