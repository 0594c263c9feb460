//! Reactive primitives: signals and render triggers.
//!
//! A [`Signal`] is the storage behind every keyed state slot. Writing to a
//! signal does not re-render anything by itself; it fires the
//! [`RenderTrigger`]s subscribed to it, which mark the owning
//! [`Root`](crate::root::Root) dirty so the next settle pass re-renders.
//!
//! # Example
//!
//! ```
//! use keyed_core::reactive::{RenderTrigger, Signal};
//!
//! let trigger = RenderTrigger::new();
//! let count = Signal::new(0);
//! count.subscribe(trigger.clone());
//!
//! count.update(|n| *n += 1);
//! assert_eq!(count.get(), 1);
//! assert!(trigger.take());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Render trigger
// ============================================================================

/// Shared dirty flag owned by a render root.
///
/// Cloning a trigger shares the same flag.
#[derive(Clone, Default)]
pub struct RenderTrigger {
    dirty: Rc<Cell<bool>>,
}

impl RenderTrigger {
    /// Create a clean trigger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a re-render.
    pub fn request(&self) {
        self.dirty.set(true);
    }

    /// Whether a re-render has been requested.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.dirty.replace(false)
    }

    fn same_as(&self, other: &RenderTrigger) -> bool {
        Rc::ptr_eq(&self.dirty, &other.dirty)
    }
}

impl fmt::Debug for RenderTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTrigger")
            .field("dirty", &self.dirty.get())
            .finish()
    }
}

// ============================================================================
// Signal
// ============================================================================

/// A shared mutable value that notifies its subscribers when written.
///
/// # Example
///
/// ```
/// use keyed_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// count.update(|n| *n += 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<RenderTrigger>>,
}

impl<T> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Subscribe a render trigger to writes on this signal.
    ///
    /// Subscribing the same trigger twice is a no-op.
    pub fn subscribe(&self, trigger: RenderTrigger) {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        if !subscribers.iter().any(|t| t.same_as(&trigger)) {
            subscribers.push(trigger);
        }
    }

    fn notify(&self) {
        for trigger in self.inner.subscribers.borrow().iter() {
            trigger.request();
        }
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.inner.value.borrow_mut());
        self.notify();
    }

    /// Whether two handles point at the same storage.
    pub fn ptr_eq(&self, other: &Signal<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Signal<T> {
    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}
