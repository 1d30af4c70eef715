use ironbark_application::config::{Config, DataSource};
use ironbark_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use ironbark_domain::repositories::market_data::BarRepository;
use ironbark_infrastructure::artifacts::{FsArtifactReader, FsArtifactWriter};
use ironbark_infrastructure::market_data::{CsvBarRepository, PostgresBarRepository};
use std::env;

pub fn build_bar_repository(config: &Config) -> Result<Box<dyn BarRepository>, String> {
    match config.data.source {
        DataSource::Csv => {
            let dir = config
                .data
                .csv_dir
                .as_deref()
                .ok_or_else(|| "data.source = csv requires data.csv_dir".to_string())?;
            Ok(Box::new(CsvBarRepository::new(dir)))
        }
        DataSource::Postgres => {
            let url = resolve_db_url(config)?;
            let repo = PostgresBarRepository::new(
                &url,
                config.data.table.clone(),
                config.data.pool_size,
            )?;
            Ok(Box::new(repo))
        }
    }
}

fn resolve_db_url(config: &Config) -> Result<String, String> {
    match config.data.database_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Ok(url.to_string()),
        _ => env::var("IRONBARK_DB_URL").map_err(|_| {
            "missing data.database_url in config and env IRONBARK_DB_URL is not set".to_string()
        }),
    }
}

pub fn build_artifact_writer() -> Box<dyn ArtifactWriter> {
    Box::new(FsArtifactWriter)
}

pub fn build_artifact_reader() -> Box<dyn ArtifactReader> {
    Box::new(FsArtifactReader)
}
