//! Render root: mounts a component, flushes its effects, and re-renders
//! until its state settles.

use crate::hooks::{HookMeta, HookRegistry, MountedFlag, RenderScope};
use crate::reactive::RenderTrigger;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Upper bound on re-renders per settle.
///
/// An effect that writes state on every run never settles; this turns that
/// into an error instead of a hang.
pub const MAX_SETTLE_PASSES: usize = 64;

/// Errors reported by a [`Root`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// State was still changing after [`MAX_SETTLE_PASSES`] re-renders.
    #[error("render did not settle after {passes} passes")]
    Unsettled { passes: usize },
    /// The root was used after [`Root::unmount`].
    #[error("root is unmounted")]
    Unmounted,
}

/// A mounted component.
///
/// `V` is whatever the render function returns: usually a struct of values
/// and handlers the surrounding UI reads from.
///
/// # Example
///
/// ```
/// use keyed_core::hooks::use_keyed_state;
/// use keyed_core::root::Root;
///
/// let mut root = Root::mount(|| use_keyed_state("clicks", 0)).unwrap();
/// root.dispatch(|(_, set_clicks)| set_clicks.update(|n| n + 1)).unwrap();
/// assert_eq!(root.output().0, 1);
/// ```
pub struct Root<V> {
    registry: Rc<RefCell<HookRegistry>>,
    render: Box<dyn Fn() -> V>,
    output: V,
    trigger: RenderTrigger,
    mounted: MountedFlag,
}

impl<V> Root<V> {
    /// Render `render` for the first time, run its effects, and settle.
    pub fn mount(render: impl Fn() -> V + 'static) -> Result<Self, RenderError> {
        let trigger = RenderTrigger::new();
        let mounted = MountedFlag::new();
        let registry = Rc::new(RefCell::new(HookRegistry::new(
            trigger.clone(),
            mounted.clone(),
        )));
        let render: Box<dyn Fn() -> V> = Box::new(render);

        let output = render_once(&registry, &*render);
        let mut root = Self {
            registry,
            render,
            output,
            trigger,
            mounted,
        };
        tracing::debug!("mounted root");
        root.flush_effects();
        root.settle()?;
        Ok(root)
    }

    /// The output of the latest render.
    pub fn output(&self) -> &V {
        &self.output
    }

    /// Re-render until no state write is pending.
    ///
    /// Returns the number of re-renders performed.
    pub fn settle(&mut self) -> Result<usize, RenderError> {
        self.ensure_mounted()?;
        let mut passes = 0;
        while self.trigger.take() {
            if passes == MAX_SETTLE_PASSES {
                tracing::warn!(passes, "render did not settle");
                return Err(RenderError::Unsettled { passes });
            }
            self.output = render_once(&self.registry, &*self.render);
            self.flush_effects();
            passes += 1;
        }
        if passes > 0 {
            tracing::debug!(passes, "settled");
        }
        Ok(passes)
    }

    /// Deliver one event to the latest output, then settle.
    ///
    /// Every event settles on its own, so effects observe each event's
    /// state changes separately even when two events arrive back to back.
    pub fn dispatch<R>(&mut self, event: impl FnOnce(&V) -> R) -> Result<R, RenderError> {
        self.ensure_mounted()?;
        let result = event(&self.output);
        self.settle()?;
        Ok(result)
    }

    /// Run effect cleanups and drop all hook state.
    ///
    /// Idempotent. Anything holding the root's [`MountedFlag`] sees it turn
    /// false before cleanups run.
    pub fn unmount(&mut self) {
        if !self.mounted.is_mounted() {
            return;
        }
        self.mounted.mark_unmounted();

        let cleanups = self.registry.borrow_mut().take_cleanups();
        for cleanup in cleanups {
            cleanup();
        }
        self.registry.borrow_mut().clear();
        tracing::debug!("unmounted root");
    }

    /// Whether [`unmount`](Self::unmount) has not been called yet.
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_mounted()
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> usize {
        self.registry.borrow().render_count()
    }

    /// Metadata of every hook, in call order. Useful for devtools.
    pub fn hooks_debug_info(&self) -> Vec<HookMeta> {
        self.registry.borrow().debug_info()
    }

    fn ensure_mounted(&self) -> Result<(), RenderError> {
        if self.mounted.is_mounted() {
            Ok(())
        } else {
            Err(RenderError::Unmounted)
        }
    }

    /// Run the effects queued by the latest render, in declaration order.
    fn flush_effects(&mut self) {
        let pending = self.registry.borrow_mut().take_pending_effects();
        for (index, hook_type, run) in pending {
            tracing::trace!(index, hook_type, "running effect");
            run();
        }
    }
}

impl<V> Drop for Root<V> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn render_once<V>(registry: &Rc<RefCell<HookRegistry>>, render: &dyn Fn() -> V) -> V {
    let output = {
        let _scope = RenderScope::enter(registry);
        render()
    };
    registry.borrow_mut().end_render();
    output
}
