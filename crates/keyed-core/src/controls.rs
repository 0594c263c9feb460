//! Registry of runtime-owned input controls.
//!
//! Components never own the controls they reference. A control is registered
//! here and handed out as a [`ControlId`]; hooks hold the id in a ref slot and
//! look the control up each time they need it. A ref whose id is no longer
//! registered behaves exactly like an unbound ref.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Unique identifier for a registered control.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ControlId(pub usize);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An input control owned by the surrounding runtime.
pub trait InputControl {
    /// Programmatic activation, e.g. opening a file picker.
    fn activate(&mut self);

    /// The control's current value, `None` when empty.
    fn value(&self) -> Option<&str>;

    /// Replace the control's value. `None` clears it.
    fn set_value(&mut self, value: Option<String>);
}

/// Global counter for generating unique control IDs.
///
/// Ids are never reused, so a stale id can't alias a newer control.
static NEXT_CONTROL_ID: AtomicUsize = AtomicUsize::new(0);

fn next_control_id() -> ControlId {
    ControlId(NEXT_CONTROL_ID.fetch_add(1, Ordering::SeqCst))
}

// Thread-local control registry.
thread_local! {
    static CONTROL_REGISTRY: RefCell<ControlRegistry> = RefCell::new(ControlRegistry::new());
}

struct ControlRegistry {
    controls: HashMap<ControlId, Box<dyn InputControl>>,
    /// Ids whose control is currently taken out by [`with_control`].
    in_use: HashSet<ControlId>,
}

impl ControlRegistry {
    fn new() -> Self {
        Self {
            controls: HashMap::new(),
            in_use: HashSet::new(),
        }
    }
}

/// Register a control and return its ID.
///
/// # Example
///
/// ```ignore
/// let id = register_control(Box::new(FileInput::new()));
/// file_input_ref.set(Some(id));
/// ```
pub fn register_control(control: Box<dyn InputControl>) -> ControlId {
    let id = next_control_id();
    CONTROL_REGISTRY.with(|registry| {
        registry.borrow_mut().controls.insert(id, control);
    });
    tracing::debug!(control = %id, "registered control");
    id
}

/// Run `f` against the control with the given ID.
///
/// Returns `None` if no such control is registered, or if `f` is already
/// running against it further up the stack.
///
/// The control is taken out of the registry while `f` runs, so `f` may use
/// the rest of this module freely. It still counts as registered, and if
/// `f` unregisters it, it is dropped instead of put back.
pub fn with_control<R>(id: ControlId, f: impl FnOnce(&mut dyn InputControl) -> R) -> Option<R> {
    let taken = CONTROL_REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let control = registry.controls.remove(&id)?;
        registry.in_use.insert(id);
        Some(control)
    });
    let Some(mut control) = taken else {
        tracing::trace!(control = %id, "control not available");
        return None;
    };

    let result = f(control.as_mut());

    let orphaned = CONTROL_REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        if registry.in_use.remove(&id) {
            registry.controls.insert(id, control);
            None
        } else {
            Some(control)
        }
    });
    if orphaned.is_some() {
        tracing::debug!(control = %id, "control unregistered while in use");
    }
    Some(result)
}

/// Remove a control, returning it if it was registered.
///
/// A control that is in use by [`with_control`] is dropped once `f`
/// returns; this returns `None` for it.
pub fn unregister_control(id: ControlId) -> Option<Box<dyn InputControl>> {
    let (removed, was_in_use) = CONTROL_REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        (registry.controls.remove(&id), registry.in_use.remove(&id))
    });
    if removed.is_some() || was_in_use {
        tracing::debug!(control = %id, "unregistered control");
    }
    removed
}

/// Whether a control with the given ID is registered.
pub fn is_registered(id: ControlId) -> bool {
    CONTROL_REGISTRY.with(|registry| {
        let registry = registry.borrow();
        registry.controls.contains_key(&id) || registry.in_use.contains(&id)
    })
}

/// Remove every registered control.
pub fn clear_controls() {
    CONTROL_REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        registry.controls.clear();
        registry.in_use.clear();
    });
}

/// Get the number of registered controls (for debugging).
pub fn control_count() -> usize {
    CONTROL_REGISTRY.with(|registry| {
        let registry = registry.borrow();
        registry.controls.len() + registry.in_use.len()
    })
}
