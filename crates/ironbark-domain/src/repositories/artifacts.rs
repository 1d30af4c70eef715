use crate::services::analytics::PerformanceReport;
use crate::services::engine::SignalRejection;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade::TradeRecord;
use std::path::Path;

/// Port for run artifacts. The core stays free of filesystem I/O; the
/// infrastructure adapter owns the actual writes.
pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_trades_csv(&self, path: &Path, trades: &[TradeRecord]) -> Result<(), String>;
    fn write_equity_csv(&self, path: &Path, points: &[EquityPoint]) -> Result<(), String>;
    fn write_rejections_jsonl(
        &self,
        path: &Path,
        rejections: &[SignalRejection],
    ) -> Result<(), String>;
    fn write_summary_json(
        &self,
        path: &Path,
        report: &PerformanceReport,
        meta: Option<&serde_json::Value>,
    ) -> Result<(), String>;
}

pub trait ArtifactReader {
    fn read_summary_json(&self, path: &Path) -> Result<serde_json::Value, String>;
    fn exists(&self, path: &Path) -> bool;
}
