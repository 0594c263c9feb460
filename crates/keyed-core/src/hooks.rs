//! React-style hooks for keyed state, refs, and effects.
//!
//! Hooks are only callable while a [`Root`](crate::root::Root) is rendering.
//! Each root owns a [`HookRegistry`]; the root installs it as the current
//! registry for the duration of the render, and the free functions in this
//! module resolve against it.
//!
//! # Available Hooks
//!
//! | Hook | Purpose |
//! |------|---------|
//! | [`use_keyed_state`] | Labelled state slot with a `(value, setter)` API |
//! | [`use_ref`] | Mutable slot that doesn't trigger re-renders |
//! | [`use_effect`] | Side effect that runs after render when deps change |
//! | [`use_effect_cleanup`] | Same, with a cleanup run before the next run and on unmount |
//! | [`use_mount`] | Effect that runs once, after the first render |
//! | [`use_mounted`] | Flag that turns false once the root unmounts |
//!
//! # Effect ordering
//!
//! Effects never run inside the render. They are queued in declaration order
//! and flushed by the root after the render completes, so two effects
//! declared A then B always run A then B.
//!
//! # Rules of Hooks
//!
//! Hooks must be called in the **exact same order** on every render. Hooks
//! are identified by their position in the call sequence; the key passed to
//! [`use_keyed_state`] is a label for diagnostics and must also stay stable.
//!
//! ## Hook called outside render
//!
//! ```text
//! keyed hooks error: `use_keyed_state` called outside of render!
//! Hooks can only be called during component rendering.
//! ```
//!
//! ## Hook count mismatch
//!
//! ```text
//! keyed hooks error: Hook count mismatch!
//! Previous render had 3 hooks, current render has 2 hooks.
//! ```
//!
//! ## Hook order mismatch
//!
//! ```text
//! keyed hooks error: Hook order mismatch at index 1!
//! Previous render: `use_effect`
//! Current render: `use_keyed_state`
//! ```

use crate::reactive::{RenderTrigger, Signal};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Hook Registry
// ============================================================================

/// Metadata about a hook for debugging purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookMeta {
    /// The hook function name (e.g., "use_keyed_state", "use_effect")
    pub hook_type: &'static str,
    /// Label passed to keyed hooks
    pub key: Option<&'static str>,
    /// The type of value stored (from std::any::type_name)
    pub value_type: &'static str,
}

/// Internal storage for a single hook.
struct HookEntry {
    value: Box<dyn Any>,
    meta: HookMeta,
}

type Cleanup = Box<dyn FnOnce()>;
type CleanupSlot = Rc<RefCell<Option<Cleanup>>>;

/// An effect run queued by the current render.
struct PendingEffect {
    index: usize,
    hook_type: &'static str,
    run: Box<dyn FnOnce()>,
}

/// Registry that manages hook state across renders of one root.
pub(crate) struct HookRegistry {
    /// Stored hook values, indexed by call order
    hooks: Vec<HookEntry>,
    /// Current hook index during rendering (reset to 0 each render)
    current_index: usize,
    /// Whether we're currently inside a render cycle
    is_rendering: bool,
    /// Expected hook count from previous render (for mismatch detection)
    expected_count: Option<usize>,
    /// Number of completed renders
    render_count: usize,
    /// Effect runs queued by the render in progress
    pending_effects: Vec<PendingEffect>,
    /// Cleanup slots of every effect hook, in declaration order
    cleanups: Vec<CleanupSlot>,
    trigger: RenderTrigger,
    mounted: MountedFlag,
}

impl HookRegistry {
    pub(crate) fn new(trigger: RenderTrigger, mounted: MountedFlag) -> Self {
        Self {
            hooks: Vec::new(),
            current_index: 0,
            is_rendering: false,
            expected_count: None,
            render_count: 0,
            pending_effects: Vec::new(),
            cleanups: Vec::new(),
            trigger,
            mounted,
        }
    }

    /// Reset hook index and begin a new render cycle.
    fn begin_render(&mut self) {
        self.current_index = 0;
        self.is_rendering = true;
    }

    /// Validate hook count and end the render cycle.
    pub(crate) fn end_render(&mut self) {
        if let Some(expected) = self.expected_count
            && self.current_index != expected
        {
            panic!(
                "\n\n\x1b[1;31mkeyed hooks error: Hook count mismatch!\x1b[0m\n\
                Previous render had {} hooks, current render has {} hooks.\n\
                Render number: {}\n\n\
                This usually happens when:\n\
                - A hook is called inside a conditional (if/match)\n\
                - A hook is called inside a loop with varying iterations\n\
                - A hook is called inside an early return\n\n\
                Hooks must be called in the exact same order every render.\n",
                expected, self.current_index, self.render_count
            );
        }

        self.expected_count = Some(self.current_index);
        self.is_rendering = false;
        self.render_count += 1;
    }

    /// Gets or creates the hook at the current index.
    ///
    /// Returns the stored value and whether it was created by this call.
    fn use_hook<T: Clone + 'static>(
        &mut self,
        hook_type: &'static str,
        key: Option<&'static str>,
        init: impl FnOnce() -> T,
    ) -> (T, bool) {
        let index = self.current_index;
        self.current_index += 1;

        if let Some(entry) = self.hooks.get(index) {
            if entry.meta.hook_type != hook_type || entry.meta.key != key {
                panic!(
                    "\n\n\x1b[1;31mkeyed hooks error: Hook order mismatch at index {}!\x1b[0m\n\
                    Previous render: `{}`{}\n\
                    Current render: `{}`{}\n\n\
                    Hooks must be called in the exact same order every render.\n",
                    index,
                    entry.meta.hook_type,
                    describe_key(entry.meta.key),
                    hook_type,
                    describe_key(key),
                );
            }

            let value = entry
                .value
                .downcast_ref::<T>()
                .expect("Hook value type mismatch - this is a bug in keyed")
                .clone();
            (value, false)
        } else {
            let value = init();
            self.hooks.push(HookEntry {
                value: Box::new(value.clone()),
                meta: HookMeta {
                    hook_type,
                    key,
                    value_type: std::any::type_name::<T>(),
                },
            });
            (value, true)
        }
    }

    pub(crate) fn take_pending_effects(&mut self) -> Vec<(usize, &'static str, Box<dyn FnOnce()>)> {
        self.pending_effects
            .drain(..)
            .map(|effect| (effect.index, effect.hook_type, effect.run))
            .collect()
    }

    pub(crate) fn take_cleanups(&mut self) -> Vec<Cleanup> {
        self.cleanups
            .iter()
            .filter_map(|slot| slot.borrow_mut().take())
            .collect()
    }

    pub(crate) fn render_count(&self) -> usize {
        self.render_count
    }

    pub(crate) fn debug_info(&self) -> Vec<HookMeta> {
        self.hooks.iter().map(|entry| entry.meta.clone()).collect()
    }

    /// Drop all hook state (on unmount).
    pub(crate) fn clear(&mut self) {
        self.hooks.clear();
        self.pending_effects.clear();
        self.cleanups.clear();
        self.current_index = 0;
        self.is_rendering = false;
        self.expected_count = None;
    }
}

fn describe_key(key: Option<&'static str>) -> String {
    key.map(|k| format!(" (key `{k}`)")).unwrap_or_default()
}

// The registry of the root currently rendering on this thread.
thread_local! {
    static CURRENT_REGISTRY: RefCell<Option<Rc<RefCell<HookRegistry>>>> =
        const { RefCell::new(None) };
}

/// Installs a registry as current for the duration of one render.
///
/// Restores whatever was current before on drop, so roots can render
/// inside one another.
pub(crate) struct RenderScope {
    previous: Option<Rc<RefCell<HookRegistry>>>,
}

impl RenderScope {
    pub(crate) fn enter(registry: &Rc<RefCell<HookRegistry>>) -> Self {
        registry.borrow_mut().begin_render();
        let previous =
            CURRENT_REGISTRY.with(|current| current.replace(Some(Rc::clone(registry))));
        Self { previous }
    }
}

impl Drop for RenderScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_REGISTRY.with(|current| {
            *current.borrow_mut() = previous;
        });
    }
}

/// Run `f` against the registry of the render in progress.
fn with_registry<R>(hook_type: &'static str, f: impl FnOnce(&mut HookRegistry) -> R) -> R {
    let registry = CURRENT_REGISTRY.with(|current| current.borrow().clone());
    // A registry that is already borrowed is mid-hook, so it is rendering.
    let Some(registry) =
        registry.filter(|r| r.try_borrow().map_or(true, |r| r.is_rendering))
    else {
        panic!(
            "\n\n\x1b[1;31mkeyed hooks error: `{}` called outside of render!\x1b[0m\n\
            Hooks can only be called during component rendering.\n\
            Make sure you're not calling hooks in:\n\
            - Event handlers\n\
            - Effects\n\
            - Async callbacks\n",
            hook_type
        );
    };
    let Ok(mut registry) = registry.try_borrow_mut() else {
        panic!(
            "\n\n\x1b[1;31mkeyed hooks error: `{}` called inside another hook!\x1b[0m\n\
            Hooks can't be called from a hook's initializer.\n\
            Call it at the top level of the component instead.\n",
            hook_type
        );
    };
    f(&mut registry)
}

// ============================================================================
// Keyed state
// ============================================================================

/// Setter half of a keyed state slot.
///
/// Setters are stable: every render hands out a setter for the same slot,
/// and two setters compare equal when they write to the same slot.
pub struct StateSetter<T> {
    signal: Signal<T>,
}

impl<T> StateSetter<T> {
    /// Replace the stored value.
    pub fn set(&self, value: T) {
        self.signal.set(value);
    }

    /// Replace the stored value with `f(previous)`.
    ///
    /// `previous` is the value stored at the time the update is applied,
    /// not the value the current render observed, so several updates
    /// scheduled before the next render all compose.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.signal.update(|value| *value = f(value));
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> PartialEq for StateSetter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.signal.ptr_eq(&other.signal)
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateSetter(..)")
    }
}

/// Create or retrieve a labelled state slot.
///
/// Returns the value as of this render and a setter for it. `initial` is
/// only stored on the first render. The key never changes behaviour; it
/// shows up in [`HookMeta`] and in trace output.
///
/// # Example
///
/// ```ignore
/// let (clicks, set_clicks) = use_keyed_state("clicks", 0);
/// let on_click = move || set_clicks.update(|n| n + 1);
/// ```
pub fn use_keyed_state<T: Clone + 'static>(
    key: &'static str,
    initial: T,
) -> (T, StateSetter<T>) {
    let signal = with_registry("use_keyed_state", |registry| {
        let trigger = registry.trigger.clone();
        let (signal, created) = registry.use_hook("use_keyed_state", Some(key), move || {
            let signal = Signal::new(initial);
            signal.subscribe(trigger);
            signal
        });
        if created {
            tracing::trace!(key, "initialized keyed state");
        }
        signal
    });
    (signal.get(), StateSetter { signal })
}

// ============================================================================
// Refs
// ============================================================================

/// Create or retrieve a mutable slot that persists across renders.
///
/// Unlike keyed state, writing a ref never requests a re-render.
///
/// # Example
///
/// ```ignore
/// let input = use_ref(|| None::<ControlId>);
/// input.set(Some(register_control(Box::new(FileInput::new()))));
/// ```
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> RefHandle<T> {
    let inner = with_registry("use_ref", |registry| {
        registry
            .use_hook("use_ref", None, || Rc::new(RefCell::new(init())))
            .0
    });
    RefHandle { inner }
}

/// Handle to a ref value created by `use_ref`.
pub struct RefHandle<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> RefHandle<T> {
    /// Get a reference to the current value.
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.inner.borrow()
    }

    /// Get a mutable reference to the current value.
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Set the value directly.
    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }
}

impl<T: Clone> RefHandle<T> {
    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> Clone for RefHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RefHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefHandle").field(&*self.inner.borrow()).finish()
    }
}

// ============================================================================
// Mount state
// ============================================================================

/// Shared flag that is true while the owning root is mounted.
#[derive(Clone)]
pub struct MountedFlag {
    mounted: Rc<Cell<bool>>,
}

impl MountedFlag {
    pub(crate) fn new() -> Self {
        Self {
            mounted: Rc::new(Cell::new(true)),
        }
    }

    /// Whether the root is still mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub(crate) fn mark_unmounted(&self) {
        self.mounted.set(false);
    }
}

impl fmt::Debug for MountedFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MountedFlag").field(&self.mounted.get()).finish()
    }
}

/// Get the mounted flag of the rendering root.
///
/// Async work started by a handler should check this before writing to
/// anything the component owns.
pub fn use_mounted() -> MountedFlag {
    with_registry("use_mounted", |registry| registry.mounted.clone())
}

// ============================================================================
// Effects
// ============================================================================

/// Storage for effect dependencies and cleanup function.
struct EffectSlot<D> {
    deps: Rc<RefCell<Option<D>>>,
    cleanup: CleanupSlot,
}

impl<D> Clone for EffectSlot<D> {
    fn clone(&self) -> Self {
        Self {
            deps: Rc::clone(&self.deps),
            cleanup: Rc::clone(&self.cleanup),
        }
    }
}

fn schedule_effect<D>(hook_type: &'static str, deps: D, run: Box<dyn FnOnce() -> Option<Cleanup>>)
where
    D: PartialEq + 'static,
{
    with_registry(hook_type, |registry| {
        let index = registry.current_index;
        let (slot, created) = registry.use_hook(hook_type, None, || EffectSlot::<D> {
            deps: Rc::new(RefCell::new(None)),
            cleanup: Rc::new(RefCell::new(None)),
        });
        if created {
            registry.cleanups.push(Rc::clone(&slot.cleanup));
        }

        let changed = slot.deps.borrow().as_ref() != Some(&deps);
        if !changed {
            return;
        }
        *slot.deps.borrow_mut() = Some(deps);

        let cleanup = slot.cleanup;
        registry.pending_effects.push(PendingEffect {
            index,
            hook_type,
            run: Box::new(move || {
                let previous = cleanup.borrow_mut().take();
                if let Some(previous) = previous {
                    previous();
                }
                let next = run();
                *cleanup.borrow_mut() = next;
            }),
        });
    });
}

/// Run a side effect after render when dependencies change.
///
/// The effect always runs after the first render. On later renders it runs
/// only if `deps` differs from the value passed on its previous run.
///
/// # Example
///
/// ```ignore
/// let (clicks, _) = use_keyed_state("clicks", 0);
///
/// use_effect(move || {
///     tracing::info!(clicks, "clicks changed");
/// }, clicks);
/// ```
pub fn use_effect<F, D>(effect_fn: F, deps: D)
where
    F: FnOnce() + 'static,
    D: PartialEq + 'static,
{
    schedule_effect(
        "use_effect",
        deps,
        Box::new(move || {
            effect_fn();
            None
        }),
    );
}

/// Run a side effect with a cleanup function when dependencies change.
///
/// The cleanup runs before the next run of the effect and when the root
/// unmounts.
///
/// # Example
///
/// ```ignore
/// use_effect_cleanup(|| {
///     let subscription = subscribe(id);
///     move || subscription.unsubscribe()
/// }, id);
/// ```
pub fn use_effect_cleanup<F, C, D>(effect_fn: F, deps: D)
where
    F: FnOnce() -> C + 'static,
    C: FnOnce() + 'static,
    D: PartialEq + 'static,
{
    schedule_effect(
        "use_effect_cleanup",
        deps,
        Box::new(move || Some(Box::new(effect_fn()) as Cleanup)),
    );
}

/// Run a side effect only once, after the first render.
///
/// # Example
///
/// ```ignore
/// use_mount(|| {
///     tracing::debug!("mounted");
///     || tracing::debug!("unmounted")
/// });
/// ```
pub fn use_mount<F, C>(effect_fn: F)
where
    F: FnOnce() -> C + 'static,
    C: FnOnce() + 'static,
{
    // Unit deps never change
    use_effect_cleanup(effect_fn, ());
}

// ============================================================================
// Capabilities
// ============================================================================

/// Keyed state storage, as seen by a component data hook.
pub trait StateStore {
    /// Acquire the state slot labelled `key`, initialised to `initial`.
    fn keyed_state<T: Clone + 'static>(
        &self,
        key: &'static str,
        initial: T,
    ) -> (T, StateSetter<T>);

    /// Acquire a ref slot that persists across renders without re-rendering.
    fn ref_slot<T: 'static>(&self, init: impl FnOnce() -> T) -> RefHandle<T>;
}

/// Effect scheduling, as seen by a component data hook.
pub trait ReactiveEffect {
    /// Run `effect` once, after the first render.
    fn run_once(&self, effect: impl FnOnce() + 'static);

    /// Run `effect` after the first render and whenever `deps` changes.
    fn run_on_change<D: PartialEq + 'static>(&self, deps: D, effect: impl FnOnce() + 'static);

    /// Flag that turns false when the component unmounts.
    fn mounted(&self) -> MountedFlag;
}

/// The runtime-backed implementation of [`StateStore`] and
/// [`ReactiveEffect`]. Only usable while a root is rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hooks;

impl StateStore for Hooks {
    fn keyed_state<T: Clone + 'static>(
        &self,
        key: &'static str,
        initial: T,
    ) -> (T, StateSetter<T>) {
        use_keyed_state(key, initial)
    }

    fn ref_slot<T: 'static>(&self, init: impl FnOnce() -> T) -> RefHandle<T> {
        use_ref(init)
    }
}

impl ReactiveEffect for Hooks {
    fn run_once(&self, effect: impl FnOnce() + 'static) {
        use_mount(move || {
            effect();
            || {}
        });
    }

    fn run_on_change<D: PartialEq + 'static>(&self, deps: D, effect: impl FnOnce() + 'static) {
        use_effect(effect, deps);
    }

    fn mounted(&self) -> MountedFlag {
        use_mounted()
    }
}
