//! keyed - keyed-state data hooks for an import component.
//!
//! The component comes in two variants, both built on the hooks runtime in
//! [`keyed_core`]:
//!
//! - [`use_example_component_data`] tracks clicks on an import button and
//!   forwards them to a file input.
//! - [`use_file_upload_component_data`] also uploads the picked file as the
//!   `csv` field of a multipart form.
//!
//! # Quick Start
//!
//! ```ignore
//! use keyed::prelude::*;
//! use std::rc::Rc;
//!
//! let client: Rc<dyn UploadClient> = Rc::new(ReqwestUploadClient::new()?);
//! let mut root = Root::mount(move || use_file_upload_component_data(&Hooks, Rc::clone(&client)))?;
//!
//! let input = register_control(Box::new(FileInput::new()));
//! root.output().file_input_ref.set(Some(input));
//!
//! root.dispatch(|data| data.handle_imported_component_clicked())?;
//! assert_eq!(root.output().num_events, 2);
//! ```
//!
//! # Rules of Hooks
//!
//! Data hooks must be called unconditionally from a render function passed
//! to [`Root::mount`](keyed_core::Root::mount). See [`keyed_core::hooks`].
//!
//! # Features
//!
//! - `file-dialogs`: [`file_input::NativeFilePicker`], a file input backed by
//!   a native open-file dialog.

pub mod component;
pub mod file_input;
pub mod upload;

pub mod prelude {
    //! Common imports for keyed applications.
    pub use crate::component::{
        use_example_component_data, use_file_upload_component_data, ExampleComponentData,
        FileInputRef, FileUploadComponentData, StateKey, UploadOutcome, CSV_FIELD, FORM_URL,
    };
    pub use crate::file_input::FileInput;
    #[cfg(feature = "file-dialogs")]
    pub use crate::file_input::NativeFilePicker;
    pub use crate::upload::{
        ClientConfig, ReqwestUploadClient, SelectedFile, UploadClient, UploadError, UploadForm,
        UploadResponse,
    };
    pub use keyed_core::{
        register_control, unregister_control, Hooks, InputControl, ReactiveEffect, Root,
        StateStore,
    };
}

// Re-export the component hooks at crate root
pub use component::{
    use_example_component_data, use_file_upload_component_data, ExampleComponentData,
    FileUploadComponentData, UploadOutcome, FORM_URL,
};
pub use upload::{ReqwestUploadClient, SelectedFile, UploadClient, UploadError};

pub use keyed_core as core;
