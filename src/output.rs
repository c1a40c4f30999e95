//! Terminal rendering for reports and stats

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::query::AggregateReport;
use crate::storage::MartStats;

/// Render an aggregate report as a rounded table
pub fn report_table(report: &AggregateReport) -> String {
    if report.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(report.columns.clone());
    for row in &report.rows {
        let mut record = row.groups.clone();
        record.extend(row.measures.iter().map(|m| format_measure(*m)));
        builder.push_record(record);
    }

    builder.build().with(Style::rounded()).to_string()
}

/// Render store statistics as a two-column table
pub fn stats_table(stats: &MartStats) -> String {
    let rows = [
        ("Dates", stats.dates),
        ("Customers", stats.customers),
        ("Products", stats.products),
        ("Stores", stats.stores),
        ("Facts", stats.facts),
    ];

    let mut builder = Builder::default();
    builder.push_record(["Table", "Rows"]);
    for (label, count) in rows {
        builder.push_record([label.to_string(), count.to_string()]);
    }

    builder.build().with(Style::rounded()).to_string()
}

/// Whole-number measures print without a trailing ".0"
fn format_measure(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::AggregateRow;

    #[test]
    fn test_format_measure() {
        assert_eq!(format_measure(30.0), "30");
        assert_eq!(format_measure(12.5), "12.50");
        assert_eq!(format_measure(0.0), "0");
    }

    #[test]
    fn test_report_table_contains_headers_and_values() {
        let report = AggregateReport {
            columns: vec!["year".to_string(), "revenue".to_string()],
            rows: vec![AggregateRow {
                groups: vec!["2025".to_string()],
                measures: vec![75.0],
            }],
        };

        let rendered = report_table(&report);
        assert!(rendered.contains("year"));
        assert!(rendered.contains("revenue"));
        assert!(rendered.contains("2025"));
        assert!(rendered.contains("75"));
    }

    #[test]
    fn test_empty_report_renders_nothing() {
        let report = AggregateReport {
            columns: vec!["revenue".to_string()],
            rows: vec![],
        };
        assert_eq!(report_table(&report), "");
    }
}
