pub mod csv_bars;
pub mod postgres_bars;

pub use csv_bars::CsvBarRepository;
pub use postgres_bars::PostgresBarRepository;
