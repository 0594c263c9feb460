//! Core runtime for keyed: keyed state slots, refs, effects, render roots,
//! and the registry of runtime-owned input controls.

pub mod controls;
pub mod hooks;
pub mod reactive;
pub mod root;

// Re-export hooks for ergonomic state management
pub use hooks::{
    use_effect, use_effect_cleanup, use_keyed_state, use_mount, use_mounted, use_ref, HookMeta,
    Hooks, MountedFlag, ReactiveEffect, RefHandle, StateSetter, StateStore,
};

pub use controls::{
    clear_controls, control_count, is_registered, register_control, unregister_control,
    with_control, ControlId, InputControl,
};
pub use reactive::{RenderTrigger, Signal};
pub use root::{RenderError, Root, MAX_SETTLE_PASSES};
