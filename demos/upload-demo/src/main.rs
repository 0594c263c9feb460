//! upload-demo - drives the keyed file-upload component without a UI.
//!
//! Mounts the component, binds a file input, clicks the import button twice,
//! then "picks" a CSV and uploads it to the component's form endpoint.
//! Start something listening on `localhost:18000` to see the upload succeed;
//! otherwise the failure is logged and the input keeps its value.
//!
//! With `--features file-dialogs` the input is a native file picker and the
//! first click opens it.

use keyed::core::with_control;
use keyed::prelude::*;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

const SAMPLE_CSV: &str = "name,grade\nada,A\ngrace,A\nalan,B\n";

#[cfg(not(feature = "file-dialogs"))]
fn file_input(sample: PathBuf) -> Box<dyn InputControl> {
    // Stands in for the user picking a file: every activation selects the sample.
    Box::new(FileInput::new().on_activate(move |value| {
        *value = Some(sample.display().to_string());
    }))
}

#[cfg(feature = "file-dialogs")]
fn file_input(_sample: PathBuf) -> Box<dyn InputControl> {
    Box::new(NativeFilePicker::csv().set_title("Pick grades to import"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt::try_init();

    let sample = std::env::temp_dir().join("keyed-demo-grades.csv");
    tokio::fs::write(&sample, SAMPLE_CSV).await?;

    let client: Rc<dyn UploadClient> =
        Rc::new(ReqwestUploadClient::with_config(&ClientConfig::default())?);
    let mut root =
        Root::mount(move || use_file_upload_component_data(&Hooks, Rc::clone(&client)))?;
    tracing::info!(
        loaded = root.output().loaded,
        num_events = root.output().num_events,
        "mounted"
    );

    let input = register_control(file_input(sample));
    root.output().file_input_ref.set(Some(input));

    root.dispatch(|data| data.handle_imported_component_clicked())?;
    root.dispatch(|data| data.handle_imported_component_clicked())?;
    tracing::info!(
        import_clicked = root.output().import_clicked,
        num_events = root.output().num_events,
        "clicked import twice"
    );

    let picked = with_control(input, |control| control.value().map(str::to_owned)).flatten();
    let Some(path) = picked else {
        tracing::info!("no file picked");
        return Ok(());
    };

    let file = SelectedFile::read(&path).await?;
    let upload = root.dispatch(|data| data.handle_file_input_changed(file))?;
    match upload.await {
        Ok(outcome) => tracing::info!(?outcome, "file change handled"),
        Err(e) => tracing::error!("Upload to {} failed: {}", FORM_URL, e),
    }

    let value = with_control(input, |control| control.value().map(str::to_owned)).flatten();
    tracing::info!(
        num_events = root.output().num_events,
        input_value = ?value,
        "done"
    );

    root.unmount();
    unregister_control(input);
    Ok(())
}
