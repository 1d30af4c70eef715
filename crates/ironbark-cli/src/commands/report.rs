use ironbark_application::reporting;
use std::path::PathBuf;

pub(super) fn run(input: PathBuf) -> Result<(), String> {
    let reader = crate::infra::build_artifact_reader();
    let text = reporting::report(&input, reader.as_ref())?;
    println!("{text}");
    Ok(())
}
