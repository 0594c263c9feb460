//! File input controls.
//!
//! [`FileInput`] is a headless control: activation runs an optional hook and
//! the value is whatever was last written. With the `file-dialogs` feature,
//! [`NativeFilePicker`] opens a native open-file dialog on activation using
//! the `rfd` crate.

use keyed_core::InputControl;

/// Callback run when a [`FileInput`] is activated.
pub type ActivationHook = Box<dyn FnMut(&mut Option<String>)>;

/// A headless file input.
///
/// # Example
///
/// ```
/// use keyed::file_input::FileInput;
/// use keyed_core::InputControl;
///
/// let mut input = FileInput::new().on_activate(|value| *value = Some("grades.csv".into()));
/// input.activate();
/// assert_eq!(input.value(), Some("grades.csv"));
/// ```
#[derive(Default)]
pub struct FileInput {
    value: Option<String>,
    on_activate: Option<ActivationHook>,
}

impl FileInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a value already selected.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Run `hook` on every activation. The hook may replace the value.
    pub fn on_activate(mut self, hook: impl FnMut(&mut Option<String>) + 'static) -> Self {
        self.on_activate = Some(Box::new(hook));
        self
    }
}

impl InputControl for FileInput {
    fn activate(&mut self) {
        if let Some(hook) = self.on_activate.as_mut() {
            hook(&mut self.value);
        }
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }
}

impl std::fmt::Debug for FileInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileInput")
            .field("value", &self.value)
            .field("on_activate", &self.on_activate.is_some())
            .finish()
    }
}

#[cfg(feature = "file-dialogs")]
pub use native::NativeFilePicker;

#[cfg(feature = "file-dialogs")]
mod native {
    use keyed_core::InputControl;
    use rfd::FileDialog;

    /// File input that opens a native open-file dialog when activated.
    ///
    /// The chosen path becomes the control's value. Cancelling the dialog
    /// leaves the previous value in place.
    pub struct NativeFilePicker {
        title: String,
        extensions: Vec<String>,
        value: Option<String>,
    }

    impl NativeFilePicker {
        /// A picker restricted to `.csv` files.
        pub fn csv() -> Self {
            Self {
                title: String::from("Select a CSV file"),
                extensions: vec![String::from("csv")],
                value: None,
            }
        }

        /// Set the dialog title.
        pub fn set_title(mut self, title: impl Into<String>) -> Self {
            self.title = title.into();
            self
        }
    }

    impl InputControl for NativeFilePicker {
        fn activate(&mut self) {
            let extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
            let picked = FileDialog::new()
                .set_title(self.title.as_str())
                .add_filter("CSV", &extensions)
                .pick_file();
            match picked {
                Some(path) => {
                    tracing::info!("Selected: {}", path.display());
                    self.value = Some(path.display().to_string());
                }
                None => tracing::debug!("file dialog cancelled"),
            }
        }

        fn value(&self) -> Option<&str> {
            self.value.as_deref()
        }

        fn set_value(&mut self, value: Option<String>) {
            self.value = value;
        }
    }
}
