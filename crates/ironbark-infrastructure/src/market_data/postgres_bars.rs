use ironbark_domain::errors::DataError;
use ironbark_domain::repositories::market_data::BarRepository;
use ironbark_domain::value_objects::bar::Bar;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use std::time::Instant;

/// Reads bars from a `(symbol, timestamp, open, high, low, close, volume)`
/// table, timestamps as epoch seconds. The schema itself belongs to the
/// surrounding persistence layer; this adapter only queries it.
#[derive(Debug, Clone)]
pub struct PostgresBarRepository {
    pool: Pool<PostgresConnectionManager<NoTls>>,
    table: String,
}

impl PostgresBarRepository {
    pub fn new(database_url: &str, table: String, pool_size: u32) -> Result<Self, String> {
        validate_table_name(&table)?;

        let config = database_url
            .parse::<postgres::Config>()
            .map_err(|err| format!("invalid postgres url: {err}"))?;
        let manager = PostgresConnectionManager::new(config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|err| format!("failed to build postgres pool: {err}"))?;

        Ok(Self { pool, table })
    }
}

impl BarRepository for PostgresBarRepository {
    fn get_bars(&self, symbol: &str, start: i64, end: i64) -> Result<Vec<Bar>, DataError> {
        let span = tracing::info_span!("infra.postgres.get_bars", symbol = %symbol, table = %self.table);
        let _enter = span.enter();
        let load_start = Instant::now();

        let storage_err = |message: String| DataError::Storage {
            symbol: symbol.to_string(),
            message,
        };

        let mut client = self
            .pool
            .get()
            .map_err(|err| storage_err(format!("failed to get connection: {err}")))?;

        let query = format!(
            "SELECT timestamp, open, high, low, close, volume FROM {} \
             WHERE symbol = $1 AND timestamp >= $2 AND timestamp <= $3 \
             ORDER BY timestamp",
            self.table
        );
        let rows = client
            .query(&query, &[&symbol, &start, &end])
            .map_err(|err| storage_err(format!("query failed: {err}")))?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            let volume: i64 = row.get("volume");
            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp: row.get("timestamp"),
                open: row.get("open"),
                high: row.get("high"),
                low: row.get("low"),
                close: row.get("close"),
                volume: volume.max(0) as u64,
            });
        }

        metrics::histogram!("ironbark.infra.postgres.get_bars_ms")
            .record(load_start.elapsed().as_millis() as f64);
        if bars.is_empty() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        tracing::debug!(rows = bars.len(), "loaded bars from postgres");
        Ok(bars)
    }
}

/// The table name is interpolated into SQL, so it is restricted to plain
/// identifiers.
fn validate_table_name(table: &str) -> Result<(), String> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(format!("invalid table name '{table}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::validate_table_name;

    #[test]
    fn table_names_are_restricted_to_identifiers() {
        assert!(validate_table_name("daily_prices").is_ok());
        assert!(validate_table_name("market.daily_prices").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1prices").is_err());
        assert!(validate_table_name("prices; drop table users").is_err());
    }
}
