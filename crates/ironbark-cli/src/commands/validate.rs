use ironbark_application::config::load_config;
use ironbark_application::validation::validate;
use std::path::PathBuf;

pub(super) fn run(config_path: PathBuf, strict: bool) -> Result<(), String> {
    let config = load_config(&config_path)?;
    super::common::print_config_summary("validate", &config);

    let market_data = crate::infra::build_bar_repository(&config)?;
    let report = validate(&config, strict, market_data.as_ref())?;

    let pretty = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to render validation report: {err}"))?;
    println!("{pretty}");
    Ok(())
}
