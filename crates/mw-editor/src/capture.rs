//! Scoped pointer capture.
//!
//! A gesture holds a `Subscription` for as long as it runs. Dropping the
//! subscription releases the capture, so every way out of a gesture
//! (release, leave, blur, engine teardown) gives it back.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Host hook that routes pointer events to the canvas while a gesture runs.
pub trait PointerCapture {
    fn acquire(&self);
    fn release(&self);
}

/// For hosts that get every pointer event anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn acquire(&self) {}
    fn release(&self) {}
}

/// Records whether capture is held, for hosts that apply it themselves
/// after each input call.
#[derive(Debug, Default)]
pub struct CaptureFlag {
    held: Cell<bool>,
}

impl CaptureFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }
}

impl PointerCapture for CaptureFlag {
    fn acquire(&self) {
        self.held.set(true);
    }

    fn release(&self) {
        self.held.set(false);
    }
}

/// Holds a capture until dropped.
#[must_use = "capture is released as soon as the subscription is dropped"]
pub struct Subscription {
    capture: Rc<dyn PointerCapture>,
}

impl Subscription {
    pub fn acquire(capture: Rc<dyn PointerCapture>) -> Self {
        capture.acquire();
        Self { capture }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.capture.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        acquired: Cell<u32>,
        released: Cell<u32>,
    }

    impl PointerCapture for Counting {
        fn acquire(&self) {
            self.acquired.set(self.acquired.get() + 1);
        }
        fn release(&self) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[test]
    fn drop_releases_exactly_once() {
        let counting = Rc::new(Counting::default());
        let sub = Subscription::acquire(counting.clone());
        assert_eq!(counting.acquired.get(), 1);
        assert_eq!(counting.released.get(), 0);
        drop(sub);
        assert_eq!(counting.released.get(), 1);
    }

    #[test]
    fn flag_tracks_subscription_lifetime() {
        let flag = Rc::new(CaptureFlag::new());
        {
            let _sub = Subscription::acquire(flag.clone());
            assert!(flag.is_held());
        }
        assert!(!flag.is_held());
    }
}
