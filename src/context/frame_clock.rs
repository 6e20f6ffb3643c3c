// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Per-frame signalling.

The renderer calls [FrameClock::tick] once per presented frame; anything awaiting
[FrameClock::next_frame] wakes up.  Closing the clock is how a context is torn down: pending and
future waits resolve to `false` and the loops awaiting them exit.

```
use texture_acquire::context::FrameClock;

let clock = FrameClock::new();
let next = clock.next_frame();
clock.tick();
assert!(futures::executor::block_on(next));

clock.close();
assert!(!futures::executor::block_on(clock.next_frame()));
```
*/

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    shared: Arc<Mutex<ClockState>>,
}

#[derive(Debug, Default)]
struct ClockState {
    frame: u64,
    closed: bool,
    waiters: Vec<Waker>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals that a frame was presented.  Returns the new frame number.
    pub fn tick(&self) -> u64 {
        let (frame, waiters) = {
            let mut state = self.shared.lock().unwrap();
            state.frame += 1;
            (state.frame, std::mem::take(&mut state.waiters))
        };
        for waker in waiters {
            waker.wake();
        }
        frame
    }

    /// Frames presented so far.
    pub fn frame(&self) -> u64 {
        self.shared.lock().unwrap().frame
    }

    /// Tears the clock down.  Idempotent.
    pub fn close(&self) {
        let waiters = {
            let mut state = self.shared.lock().unwrap();
            state.closed = true;
            std::mem::take(&mut state.waiters)
        };
        for waker in waiters {
            waker.wake();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().unwrap().closed
    }

    /// Resolves to `true` at the next [tick](Self::tick), or `false` once the clock is closed.
    pub fn next_frame(&self) -> NextFrame {
        let target = self.frame() + 1;
        NextFrame {
            clock: self.clone(),
            target,
        }
    }

    /// Ticks this clock from the browser's animation frame callback until it is closed.
    #[cfg(target_arch = "wasm32")]
    pub fn drive_from_display(&self) {
        let clock = self.clone();
        crate::sys::request_animation_frame(move || {
            if clock.is_closed() {
                return;
            }
            clock.tick();
            clock.drive_from_display();
        });
    }
}

#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct NextFrame {
    clock: FrameClock,
    target: u64,
}

impl Future for NextFrame {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        let mut state = self.clock.shared.lock().unwrap();
        if state.closed {
            return Poll::Ready(false);
        }
        if state.frame >= self.target {
            return Poll::Ready(true);
        }
        if !state.waiters.iter().any(|w| w.will_wake(cx.waker())) {
            state.waiters.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
