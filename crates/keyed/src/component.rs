//! Data hooks for the example import component.
//!
//! Two variants share the same state layout:
//!
//! - [`use_example_component_data`] counts clicks on the import button and
//!   forwards them to a file input.
//! - [`use_file_upload_component_data`] additionally uploads the file picked
//!   in that input to [`FORM_URL`].
//!
//! Both mark themselves loaded after the first render and count "events":
//! one for the mount, plus one per click or file selection.
//!
//! # Example
//!
//! ```ignore
//! use keyed::component::use_file_upload_component_data;
//! use keyed_core::{Hooks, Root};
//!
//! let client: Rc<dyn UploadClient> = Rc::new(ReqwestUploadClient::new()?);
//! let mut root = Root::mount(move || use_file_upload_component_data(&Hooks, Rc::clone(&client)))?;
//!
//! root.dispatch(|data| data.handle_imported_component_clicked())?;
//! let upload = root.dispatch(|data| data.handle_file_input_changed(file))?;
//! upload.await?;
//! ```

use crate::upload::{SelectedFile, UploadClient, UploadForm, UploadResponse, UploadResult};
use futures_util::future::{self, FutureExt, LocalBoxFuture};
use keyed_core::{
    is_registered, with_control, ControlId, MountedFlag, ReactiveEffect, RefHandle, StateSetter,
    StateStore,
};
use std::fmt;
use std::rc::Rc;

/// Endpoint the upload form posts to.
pub const FORM_URL: &str = "http://localhost:18000/form-url";

/// Form field carrying the uploaded file.
pub const CSV_FIELD: &str = "csv";

/// Labels of the component's state slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKey {
    ImportedClicked,
    FileInputChanged,
    Loaded,
    NumEvents,
}

impl StateKey {
    pub const ALL: [StateKey; 4] = [
        StateKey::ImportedClicked,
        StateKey::FileInputChanged,
        StateKey::Loaded,
        StateKey::NumEvents,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            StateKey::ImportedClicked => "importedClicked",
            StateKey::FileInputChanged => "fileInputChanged",
            StateKey::Loaded => "loaded",
            StateKey::NumEvents => "numEvents",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ref to the file input the component forwards clicks to.
///
/// Holds the id of a runtime-owned control; `None` until the UI binds it.
pub type FileInputRef = RefHandle<Option<ControlId>>;

/// The id in `file_input_ref`, if it still names a registered control.
fn bound_control(file_input_ref: &FileInputRef) -> Option<ControlId> {
    file_input_ref.get().filter(|id| is_registered(*id))
}

fn click_imported_component(file_input_ref: &FileInputRef, set_import_clicked: &StateSetter<u32>) {
    match bound_control(file_input_ref) {
        Some(id) => {
            with_control(id, |control| control.activate());
        }
        None => tracing::debug!("file input ref is unbound; skipping activation"),
    }
    set_import_clicked.update(|clicked| clicked + 1);
}

/// Slots shared by both variants.
struct CommonSlots {
    import_clicked: u32,
    set_import_clicked: StateSetter<u32>,
    loaded: bool,
    set_loaded: StateSetter<bool>,
    num_events: u32,
    set_num_events: StateSetter<u32>,
}

fn use_common_slots<H: StateStore>(hooks: &H) -> CommonSlots {
    let (import_clicked, set_import_clicked) =
        hooks.keyed_state(StateKey::ImportedClicked.as_str(), 0u32);
    let (loaded, set_loaded) = hooks.keyed_state(StateKey::Loaded.as_str(), false);
    let (num_events, set_num_events) = hooks.keyed_state(StateKey::NumEvents.as_str(), 0u32);
    CommonSlots {
        import_clicked,
        set_import_clicked,
        loaded,
        set_loaded,
        num_events,
        set_num_events,
    }
}

// ============================================================================
// Basic variant
// ============================================================================

/// Output of [`use_example_component_data`].
#[derive(Clone)]
pub struct ExampleComponentData {
    /// Times the import button was clicked.
    pub import_clicked: u32,
    /// True from the first effect flush on.
    pub loaded: bool,
    /// 1 for the mount, plus one per click.
    pub num_events: u32,
    pub file_input_ref: FileInputRef,
    pub form_action: &'static str,
    set_import_clicked: StateSetter<u32>,
}

impl ExampleComponentData {
    /// Activate the bound file input, if any, and count the click.
    pub fn handle_imported_component_clicked(&self) {
        click_imported_component(&self.file_input_ref, &self.set_import_clicked);
    }
}

impl fmt::Debug for ExampleComponentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleComponentData")
            .field("import_clicked", &self.import_clicked)
            .field("loaded", &self.loaded)
            .field("num_events", &self.num_events)
            .field("file_input_ref", &self.file_input_ref)
            .field("form_action", &self.form_action)
            .finish()
    }
}

/// Data hook for the import component without upload.
pub fn use_example_component_data<H>(hooks: &H) -> ExampleComponentData
where
    H: StateStore + ReactiveEffect,
{
    let slots = use_common_slots(hooks);
    let file_input_ref: FileInputRef = hooks.ref_slot(|| None);

    let set_loaded = slots.set_loaded;
    hooks.run_once(move || set_loaded.set(true));

    let set_num_events = slots.set_num_events;
    hooks.run_on_change(slots.import_clicked, move || {
        set_num_events.update(|n| n + 1);
    });

    ExampleComponentData {
        import_clicked: slots.import_clicked,
        loaded: slots.loaded,
        num_events: slots.num_events,
        file_input_ref,
        form_action: FORM_URL,
        set_import_clicked: slots.set_import_clicked,
    }
}

// ============================================================================
// Upload variant
// ============================================================================

/// What a file change ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The file input ref was unbound; nothing was sent.
    Skipped,
    /// Uploaded, and the file input was cleared.
    Uploaded(UploadResponse),
    /// Uploaded, but the component unmounted or the input went away before
    /// the response arrived, so the input was left alone.
    Stale(UploadResponse),
}

/// Output of [`use_file_upload_component_data`].
#[derive(Clone)]
pub struct FileUploadComponentData {
    /// Times the import button was clicked.
    pub import_clicked: u32,
    /// True from the first effect flush on.
    pub loaded: bool,
    /// 1 for the mount, plus one per click or file selection.
    pub num_events: u32,
    /// The most recently selected file.
    pub file_input_changed: Option<SelectedFile>,
    pub file_input_ref: FileInputRef,
    pub form_action: &'static str,
    set_import_clicked: StateSetter<u32>,
    set_file_input_changed: StateSetter<Option<SelectedFile>>,
    client: Rc<dyn UploadClient>,
    mounted: MountedFlag,
}

impl FileUploadComponentData {
    /// Activate the bound file input, if any, and count the click.
    pub fn handle_imported_component_clicked(&self) {
        click_imported_component(&self.file_input_ref, &self.set_import_clicked);
    }

    /// Record the selection and upload it as the `csv` field of a form.
    ///
    /// State is updated before this returns; the returned future only does
    /// the network round trip and, on success, clears the file input so the
    /// same file can be picked again. A failed upload resolves to the error
    /// and leaves the input untouched.
    pub fn handle_file_input_changed(
        &self,
        file: SelectedFile,
    ) -> LocalBoxFuture<'static, UploadResult<UploadOutcome>> {
        if bound_control(&self.file_input_ref).is_none() {
            tracing::debug!(file = file.name(), "file input ref is unbound; ignoring file change");
            return future::ready(Ok(UploadOutcome::Skipped)).boxed_local();
        }

        self.set_file_input_changed.set(Some(file.clone()));

        tracing::info!(
            url = self.form_action,
            file = file.name(),
            bytes = file.len(),
            "uploading file"
        );
        let request = self
            .client
            .post_form(self.form_action, UploadForm::single_file(CSV_FIELD, file));
        let file_input_ref = self.file_input_ref.clone();
        let mounted = self.mounted.clone();

        async move {
            let response = request.await?;
            tracing::info!(status = response.status, "upload complete");

            if !mounted.is_mounted() {
                tracing::warn!("component unmounted during upload; not clearing file input");
                return Ok(UploadOutcome::Stale(response));
            }
            let cleared = bound_control(&file_input_ref)
                .and_then(|id| with_control(id, |control| control.set_value(None)));
            match cleared {
                Some(()) => Ok(UploadOutcome::Uploaded(response)),
                None => {
                    tracing::warn!("file input went away during upload; not clearing it");
                    Ok(UploadOutcome::Stale(response))
                }
            }
        }
        .boxed_local()
    }
}

impl fmt::Debug for FileUploadComponentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUploadComponentData")
            .field("import_clicked", &self.import_clicked)
            .field("loaded", &self.loaded)
            .field("num_events", &self.num_events)
            .field("file_input_changed", &self.file_input_changed)
            .field("file_input_ref", &self.file_input_ref)
            .field("form_action", &self.form_action)
            .finish_non_exhaustive()
    }
}

/// Data hook for the import component with upload.
pub fn use_file_upload_component_data<H>(
    hooks: &H,
    client: Rc<dyn UploadClient>,
) -> FileUploadComponentData
where
    H: StateStore + ReactiveEffect,
{
    let slots = use_common_slots(hooks);
    let (file_input_changed, set_file_input_changed) =
        hooks.keyed_state(StateKey::FileInputChanged.as_str(), None::<SelectedFile>);
    let file_input_ref: FileInputRef = hooks.ref_slot(|| None);
    let mounted = hooks.mounted();

    let set_loaded = slots.set_loaded;
    hooks.run_once(move || set_loaded.set(true));

    let set_num_events = slots.set_num_events;
    hooks.run_on_change(
        (slots.import_clicked, file_input_changed.clone()),
        move || set_num_events.update(|n| n + 1),
    );

    FileUploadComponentData {
        import_clicked: slots.import_clicked,
        loaded: slots.loaded,
        num_events: slots.num_events,
        file_input_changed,
        file_input_ref,
        form_action: FORM_URL,
        set_import_clicked: slots.set_import_clicked,
        set_file_input_changed,
        client,
        mounted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_input::FileInput;
    use crate::upload::{UploadError, UploadResponse};
    use futures_util::future::BoxFuture;
    use keyed_core::{register_control, unregister_control, Hooks, Root};
    use std::cell::{Cell, RefCell};

    /// Records every form it is asked to post.
    #[derive(Default)]
    struct RecordingClient {
        requests: RefCell<Vec<(String, UploadForm)>>,
        reject_with: Cell<Option<u16>>,
    }

    impl UploadClient for RecordingClient {
        fn post_form(
            &self,
            url: &str,
            form: UploadForm,
        ) -> BoxFuture<'static, UploadResult<UploadResponse>> {
            self.requests.borrow_mut().push((url.to_owned(), form));
            let result = match self.reject_with.get() {
                Some(status) => Err(UploadError::Status { status }),
                None => Ok(UploadResponse {
                    status: 200,
                    body: String::from("ok"),
                }),
            };
            future::ready(result).boxed()
        }
    }

    /// Forwards to [`Hooks`], remembering the keys state was acquired with
    /// and how often run-once effects actually ran.
    #[derive(Clone, Default)]
    struct KeyRecorder {
        keys: Rc<RefCell<Vec<&'static str>>>,
        once_runs: Rc<Cell<u32>>,
    }

    impl StateStore for KeyRecorder {
        fn keyed_state<T: Clone + 'static>(
            &self,
            key: &'static str,
            initial: T,
        ) -> (T, StateSetter<T>) {
            self.keys.borrow_mut().push(key);
            Hooks.keyed_state(key, initial)
        }

        fn ref_slot<T: 'static>(&self, init: impl FnOnce() -> T) -> RefHandle<T> {
            Hooks.ref_slot(init)
        }
    }

    impl ReactiveEffect for KeyRecorder {
        fn run_once(&self, effect: impl FnOnce() + 'static) {
            let runs = Rc::clone(&self.once_runs);
            Hooks.run_once(move || {
                runs.set(runs.get() + 1);
                effect();
            });
        }

        fn run_on_change<D: PartialEq + 'static>(&self, deps: D, effect: impl FnOnce() + 'static) {
            Hooks.run_on_change(deps, effect);
        }

        fn mounted(&self) -> MountedFlag {
            Hooks.mounted()
        }
    }

    fn mount_upload(client: &Rc<RecordingClient>) -> Root<FileUploadComponentData> {
        let client: Rc<dyn UploadClient> = client.clone();
        Root::mount(move || use_file_upload_component_data(&Hooks, Rc::clone(&client))).unwrap()
    }

    fn bind<V>(
        root: &Root<V>,
        file_input_ref: impl Fn(&V) -> &FileInputRef,
        input: FileInput,
    ) -> ControlId {
        let id = register_control(Box::new(input));
        file_input_ref(root.output()).set(Some(id));
        id
    }

    fn control_value(id: ControlId) -> Option<String> {
        with_control(id, |control| control.value().map(str::to_owned)).flatten()
    }

    fn csv(contents: &str) -> SelectedFile {
        SelectedFile::new("grades.csv", contents.as_bytes().to_vec())
    }

    mod example_component {
        use super::*;

        #[test]
        fn initializes_state_fields() {
            let recorder = KeyRecorder::default();
            let hooks = recorder.clone();
            let root = Root::mount(move || use_example_component_data(&hooks)).unwrap();

            let data = root.output();
            assert_eq!(data.import_clicked, 0);
            assert_eq!(data.form_action, FORM_URL);
            assert_eq!(data.file_input_ref.get(), None);
            assert_eq!(
                recorder.keys.borrow()[..3],
                [
                    StateKey::ImportedClicked.as_str(),
                    StateKey::Loaded.as_str(),
                    StateKey::NumEvents.as_str(),
                ]
            );
        }

        #[test]
        fn loaded_flips_once_after_first_render() {
            let recorder = KeyRecorder::default();
            let hooks = recorder.clone();
            let history = Rc::new(RefCell::new(Vec::new()));
            let history_in_render = Rc::clone(&history);
            let mut root = Root::mount(move || {
                let data = use_example_component_data(&hooks);
                history_in_render.borrow_mut().push(data.loaded);
                data
            })
            .unwrap();
            assert_eq!(recorder.once_runs.get(), 1);

            for _ in 0..3 {
                root.dispatch(|data| data.handle_imported_component_clicked())
                    .unwrap();
            }

            assert_eq!(recorder.once_runs.get(), 1);
            let history = history.borrow();
            assert!(history.len() > 4);
            assert_eq!(history.first(), Some(&false));
            assert!(history[1..].iter().all(|loaded| *loaded));
        }

        #[test]
        fn two_clicks_count_three_events() {
            let mut root = Root::mount(|| use_example_component_data(&Hooks)).unwrap();
            assert_eq!(root.output().num_events, 1);

            root.dispatch(|data| data.handle_imported_component_clicked())
                .unwrap();
            root.dispatch(|data| data.handle_imported_component_clicked())
                .unwrap();

            assert_eq!(root.output().import_clicked, 2);
            assert_eq!(root.output().num_events, 3);
            assert!(root.output().loaded);
        }

        #[test]
        fn click_with_unbound_ref_still_counts() {
            let activations = Rc::new(Cell::new(0));
            let counter = Rc::clone(&activations);
            // Registered but never bound to the ref.
            let _id = register_control(Box::new(
                FileInput::new().on_activate(move |_| counter.set(counter.get() + 1)),
            ));
            let mut root = Root::mount(|| use_example_component_data(&Hooks)).unwrap();

            root.dispatch(|data| data.handle_imported_component_clicked())
                .unwrap();

            assert_eq!(root.output().import_clicked, 1);
            assert_eq!(activations.get(), 0);
        }

        #[test]
        fn click_with_bound_ref_activates_input() {
            let activations = Rc::new(Cell::new(0));
            let counter = Rc::clone(&activations);
            let mut root = Root::mount(|| use_example_component_data(&Hooks)).unwrap();
            bind(
                &root,
                |data| &data.file_input_ref,
                FileInput::new().on_activate(move |_| counter.set(counter.get() + 1)),
            );

            root.dispatch(|data| data.handle_imported_component_clicked())
                .unwrap();

            assert_eq!(activations.get(), 1);
            assert_eq!(root.output().import_clicked, 1);
        }

        #[test]
        fn activation_may_query_the_control_registry() {
            let bound = Rc::new(Cell::new(None));
            let seen = Rc::new(Cell::new(None));
            let (bound_in_hook, seen_in_hook) = (Rc::clone(&bound), Rc::clone(&seen));
            let mut root = Root::mount(|| use_example_component_data(&Hooks)).unwrap();
            let id = bind(
                &root,
                |data| &data.file_input_ref,
                FileInput::new().on_activate(move |_| {
                    seen_in_hook.set(bound_in_hook.get().map(is_registered));
                }),
            );
            bound.set(Some(id));

            root.dispatch(|data| data.handle_imported_component_clicked())
                .unwrap();

            assert_eq!(seen.get(), Some(true));
            assert!(is_registered(id));
            assert_eq!(root.output().import_clicked, 1);
        }

        #[test]
        fn click_after_input_removed_skips_activation() {
            let activations = Rc::new(Cell::new(0));
            let counter = Rc::clone(&activations);
            let mut root = Root::mount(|| use_example_component_data(&Hooks)).unwrap();
            let id = bind(
                &root,
                |data| &data.file_input_ref,
                FileInput::new().on_activate(move |_| counter.set(counter.get() + 1)),
            );
            unregister_control(id);

            root.dispatch(|data| data.handle_imported_component_clicked())
                .unwrap();

            assert_eq!(activations.get(), 0);
            assert_eq!(root.output().import_clicked, 1);
            assert_eq!(root.output().num_events, 2);
        }
    }

    mod file_upload_component {
        use super::*;

        #[test]
        fn initializes_state_fields() {
            let recorder = KeyRecorder::default();
            let hooks = recorder.clone();
            let client: Rc<dyn UploadClient> = Rc::new(RecordingClient::default());
            let root = Root::mount(move || {
                use_file_upload_component_data(&hooks, Rc::clone(&client))
            })
            .unwrap();

            assert_eq!(root.output().file_input_changed, None);
            assert_eq!(root.output().num_events, 1);
            assert!(root.output().loaded);

            let keys = recorder.keys.borrow();
            assert_eq!(
                keys[..4],
                [
                    StateKey::ImportedClicked.as_str(),
                    StateKey::Loaded.as_str(),
                    StateKey::NumEvents.as_str(),
                    StateKey::FileInputChanged.as_str(),
                ]
            );
            for key in StateKey::ALL {
                assert!(keys.contains(&key.as_str()), "missing state key {key}");
            }
            // Every render asks for the same keys in the same order.
            assert_eq!(keys.len() % 4, 0);
            assert_eq!(recorder.once_runs.get(), 1);
        }

        #[tokio::test]
        async fn activation_can_deliver_selection_to_handler() {
            let client = Rc::new(RecordingClient::default());
            let mut root = mount_upload(&client);
            let handlers = root.output().clone();
            let pending = Rc::new(RefCell::new(None));
            let pending_in_hook = Rc::clone(&pending);
            let id = bind(
                &root,
                |data| &data.file_input_ref,
                FileInput::new().on_activate(move |value| {
                    *value = Some(String::from("grades.csv"));
                    let upload = handlers.handle_file_input_changed(csv("a,b\n"));
                    *pending_in_hook.borrow_mut() = Some(upload);
                }),
            );

            root.dispatch(|data| data.handle_imported_component_clicked())
                .unwrap();
            let upload = pending.borrow_mut().take().expect("activation picks a file");
            let outcome = upload.await.unwrap();

            assert!(matches!(outcome, UploadOutcome::Uploaded(_)));
            assert_eq!(client.requests.borrow().len(), 1);
            assert_eq!(root.output().import_clicked, 1);
            assert!(root.output().file_input_changed.is_some());
            assert_eq!(control_value(id), None);
        }

        #[tokio::test]
        async fn file_change_posts_csv_and_clears_input() {
            let client = Rc::new(RecordingClient::default());
            let mut root = mount_upload(&client);
            let id = bind(
                &root,
                |data| &data.file_input_ref,
                FileInput::new().with_value("C:\\fakepath\\grades.csv"),
            );
            let file = csv("name,grade\nada,A\n");

            let selected = file.clone();
            let upload = root
                .dispatch(move |data| data.handle_file_input_changed(selected))
                .unwrap();
            // State is already settled before the upload resolves.
            assert_eq!(root.output().file_input_changed, Some(file.clone()));
            assert_eq!(root.output().num_events, 2);

            let outcome = upload.await.unwrap();

            assert!(matches!(outcome, UploadOutcome::Uploaded(ref r) if r.status == 200));
            let requests = client.requests.borrow();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].0, FORM_URL);
            assert_eq!(requests[0].1.len(), 1);
            assert_eq!(requests[0].1.get(CSV_FIELD), Some(&file));
            assert_eq!(control_value(id), None);
        }

        #[tokio::test]
        async fn file_change_with_unbound_ref_is_ignored() {
            let client = Rc::new(RecordingClient::default());
            let mut root = mount_upload(&client);

            let outcome = root
                .dispatch(|data| data.handle_file_input_changed(csv("a,b\n")))
                .unwrap()
                .await
                .unwrap();

            assert_eq!(outcome, UploadOutcome::Skipped);
            assert!(client.requests.borrow().is_empty());
            assert_eq!(root.output().file_input_changed, None);
            assert_eq!(root.output().num_events, 1);
        }

        #[tokio::test]
        async fn rejected_upload_surfaces_error_and_keeps_value() {
            let client = Rc::new(RecordingClient::default());
            client.reject_with.set(Some(500));
            let mut root = mount_upload(&client);
            let id = bind(
                &root,
                |data| &data.file_input_ref,
                FileInput::new().with_value("C:\\fakepath\\grades.csv"),
            );

            let result = root
                .dispatch(|data| data.handle_file_input_changed(csv("a,b\n")))
                .unwrap()
                .await;

            assert!(matches!(result, Err(UploadError::Status { status: 500 })));
            assert_eq!(client.requests.borrow().len(), 1);
            assert_eq!(control_value(id).as_deref(), Some("C:\\fakepath\\grades.csv"));
            assert!(root.output().file_input_changed.is_some());
        }

        #[tokio::test]
        async fn unmount_before_response_leaves_input_alone() {
            let client = Rc::new(RecordingClient::default());
            let mut root = mount_upload(&client);
            let id = bind(
                &root,
                |data| &data.file_input_ref,
                FileInput::new().with_value("grades.csv"),
            );

            let upload = root
                .dispatch(|data| data.handle_file_input_changed(csv("a,b\n")))
                .unwrap();
            root.unmount();

            let outcome = upload.await.unwrap();

            assert!(matches!(outcome, UploadOutcome::Stale(_)));
            assert_eq!(control_value(id).as_deref(), Some("grades.csv"));
        }

        #[tokio::test]
        async fn input_removed_before_response_is_stale() {
            let client = Rc::new(RecordingClient::default());
            let mut root = mount_upload(&client);
            let id = bind(&root, |data| &data.file_input_ref, FileInput::new());

            let upload = root
                .dispatch(|data| data.handle_file_input_changed(csv("a,b\n")))
                .unwrap();
            unregister_control(id);

            assert!(matches!(upload.await, Ok(UploadOutcome::Stale(_))));
        }

        #[tokio::test]
        async fn events_count_mount_clicks_and_selections() {
            let client = Rc::new(RecordingClient::default());
            let mut root = mount_upload(&client);
            bind(&root, |data| &data.file_input_ref, FileInput::new());

            for _ in 0..3 {
                root.dispatch(|data| data.handle_imported_component_clicked())
                    .unwrap();
            }
            // Same contents, separate picks.
            for _ in 0..2 {
                root.dispatch(|data| data.handle_file_input_changed(csv("same\n")))
                    .unwrap()
                    .await
                    .unwrap();
            }

            assert_eq!(root.output().import_clicked, 3);
            assert_eq!(root.output().num_events, 1 + 3 + 2);
            assert_eq!(client.requests.borrow().len(), 2);
        }
    }
}
