use ironbark_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use ironbark_domain::services::analytics::PerformanceReport;
use ironbark_domain::services::engine::SignalRejection;
use ironbark_domain::value_objects::equity_point::EquityPoint;
use ironbark_domain::value_objects::trade::TradeRecord;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Filesystem adapter for run artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactWriter;

impl ArtifactWriter for FsArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        fs::create_dir_all(path)
            .map_err(|err| format!("failed to create {}: {err}", path.display()))
    }

    fn write_trades_csv(&self, path: &Path, trades: &[TradeRecord]) -> Result<(), String> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
        for trade in trades {
            writer
                .serialize(trade)
                .map_err(|err| format!("failed to write trade row: {err}"))?;
        }
        writer
            .flush()
            .map_err(|err| format!("failed to flush {}: {err}", path.display()))
    }

    fn write_equity_csv(&self, path: &Path, points: &[EquityPoint]) -> Result<(), String> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
        for point in points {
            writer
                .serialize(point)
                .map_err(|err| format!("failed to write equity row: {err}"))?;
        }
        writer
            .flush()
            .map_err(|err| format!("failed to flush {}: {err}", path.display()))
    }

    fn write_rejections_jsonl(
        &self,
        path: &Path,
        rejections: &[SignalRejection],
    ) -> Result<(), String> {
        let mut file = fs::File::create(path)
            .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
        for rejection in rejections {
            let line = serde_json::to_string(rejection)
                .map_err(|err| format!("failed to serialize rejection: {err}"))?;
            writeln!(file, "{line}")
                .map_err(|err| format!("failed to write {}: {err}", path.display()))?;
        }
        Ok(())
    }

    fn write_summary_json(
        &self,
        path: &Path,
        report: &PerformanceReport,
        meta: Option<&serde_json::Value>,
    ) -> Result<(), String> {
        let json = serde_json::json!({
            "summary": report,
            "meta": meta,
        });
        let pretty = serde_json::to_string_pretty(&json)
            .map_err(|err| format!("failed to serialize summary: {err}"))?;
        fs::write(path, pretty).map_err(|err| format!("failed to write {}: {err}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactReader;

impl ArtifactReader for FsArtifactReader {
    fn read_summary_json(&self, path: &Path) -> Result<serde_json::Value, String> {
        let raw = fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
        serde_json::from_str(&raw).map_err(|err| format!("failed to parse {}: {err}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::{FsArtifactReader, FsArtifactWriter};
    use ironbark_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
    use ironbark_domain::services::analytics::{analyze, AnalyticsConfig};
    use ironbark_domain::services::engine::SignalRejection;
    use ironbark_domain::value_objects::equity_point::EquityPoint;
    use ironbark_domain::value_objects::side::Side;
    use ironbark_domain::value_objects::signal::SignalType;
    use ironbark_domain::value_objects::trade::TradeRecord;

    #[test]
    fn writes_and_reads_back_a_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("demo");
        let writer = FsArtifactWriter;
        writer.ensure_dir(&run_dir).unwrap();

        let trades = vec![TradeRecord {
            symbol: "BHP".to_string(),
            side: Side::Long,
            quantity: 10,
            entry_price: 100.0,
            entry_timestamp: 86_400,
            exit_price: 110.0,
            exit_timestamp: 172_800,
            realized_pnl: 100.0,
            return_pct: 0.1,
            holding_secs: 86_400,
            commission: 5.0,
        }];
        let equity = vec![
            EquityPoint {
                timestamp: 86_400,
                total_value: 100_000.0,
                cash: 99_000.0,
                position_value: 1_000.0,
            },
            EquityPoint {
                timestamp: 172_800,
                total_value: 100_100.0,
                cash: 100_100.0,
                position_value: 0.0,
            },
        ];
        let rejections = vec![SignalRejection {
            timestamp: 86_400,
            symbol: "CSL".to_string(),
            signal_type: SignalType::Buy,
            quantity: 500,
            reason: "insufficient_capital".to_string(),
        }];
        let report = analyze(&equity, &trades, 100_000.0, &AnalyticsConfig::default());

        writer
            .write_trades_csv(&run_dir.join("trades.csv"), &trades)
            .unwrap();
        writer
            .write_equity_csv(&run_dir.join("equity.csv"), &equity)
            .unwrap();
        writer
            .write_rejections_jsonl(&run_dir.join("rejections.jsonl"), &rejections)
            .unwrap();
        writer
            .write_summary_json(
                &run_dir.join("summary.json"),
                &report,
                Some(&serde_json::json!({"run_id": "demo"})),
            )
            .unwrap();

        let trades_csv = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
        assert!(trades_csv.contains("BHP"));
        assert!(trades_csv.lines().count() == 2);

        let jsonl = std::fs::read_to_string(run_dir.join("rejections.jsonl")).unwrap();
        assert!(jsonl.contains("insufficient_capital"));

        let reader = FsArtifactReader;
        assert!(reader.exists(&run_dir.join("summary.json")));
        let value = reader.read_summary_json(&run_dir.join("summary.json")).unwrap();
        assert_eq!(value["meta"]["run_id"], "demo");
        assert_eq!(value["summary"]["total_trades"], 1);
    }
}
