//! Periodic reports over a built model.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tally_core::prelude::*;
use tally_engine::prelude::*;

use crate::error::ModelResult;

/// How a report line reads its node for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Accrued amount over the period.
    Accrue,
    /// Payments in `(start, end]`.
    Over,
    /// Balance at the period end.
    At,
}

impl Measure {
    fn read(self, scope: &Scope, node: NodeId, period: &Period) -> TallyResult<f64> {
        match self {
            Measure::Accrue => scope.accrue(node, period.start(), period.end()),
            Measure::Over => scope.over(node, period.start(), period.end()),
            Measure::At => scope.at(node, period.end()),
        }
    }
}

/// One labelled row of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    /// Row label.
    pub label: String,
    /// Node path below the root.
    pub path: String,
    /// How the node is read.
    pub measure: Measure,
}

impl ReportLine {
    /// Creates a report line.
    pub fn new(label: impl Into<String>, path: impl Into<String>, measure: Measure) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            measure,
        }
    }
}

/// A model together with its reporting calendar and headline lines.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    /// The model tree.
    pub model: Model,
    /// Lines reported by default.
    pub lines: Vec<ReportLine>,
    /// Start of the first reporting period.
    pub start: Date,
    /// Reporting frequency.
    pub frequency: Frequency,
    /// How period ends are rolled.
    pub roll: DateRoll,
}

impl BuiltModel {
    /// The first `count` reporting periods.
    #[must_use]
    pub fn periods(&self, count: usize) -> Vec<Period> {
        Period::series(self.start, self.frequency, self.roll)
            .take(count)
            .collect()
    }

    /// Evaluates every line over the first `count` periods in one scope.
    ///
    /// # Errors
    ///
    /// Returns an error if a line's path does not resolve or evaluation fails.
    pub fn report(&self, count: usize) -> ModelResult<Report> {
        let periods = self.periods(count);
        let scope = self.model.enter_scope();

        let mut rows = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let node = self.model.find(&line.path)?;
            let values = periods
                .iter()
                .map(|period| line.measure.read(&scope, node, period))
                .collect::<TallyResult<Vec<_>>>()?;
            rows.push(ReportRow {
                label: line.label.clone(),
                measure: line.measure,
                values,
            });
        }

        let stats = scope.close();
        debug!(
            model = self.model.name(self.model.root()),
            periods = periods.len(),
            elements = stats.elements_produced,
            query_hits = stats.query_hits,
            "report evaluated"
        );

        Ok(Report {
            model: self.model.name(self.model.root()).to_string(),
            dates: periods.iter().map(Period::end).collect(),
            rows,
        })
    }
}

/// Values of one line, one per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Row label.
    pub label: String,
    /// How the values were read.
    pub measure: Measure,
    /// One value per reporting period.
    pub values: Vec<f64>,
}

impl ReportRow {
    /// Sum across periods for flow lines, or the last value for balances.
    #[must_use]
    pub fn total(&self) -> f64 {
        match self.measure {
            Measure::At => self.values.last().copied().unwrap_or(0.0),
            Measure::Accrue | Measure::Over => self.values.iter().sum(),
        }
    }
}

/// An evaluated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Name of the model's root.
    pub model: String,
    /// Period end dates, one per column.
    pub dates: Vec<Date>,
    /// Rows in line order.
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// The row labelled `label`.
    #[must_use]
    pub fn row(&self, label: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|row| row.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Fixed;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn sample() -> BuiltModel {
        let start = date(2024, 12, 31);
        let mut builder = ModelBuilder::new("sample");
        let root = builder.root();
        let quarters = Period::series(start, Frequency::Quarterly, DateRoll::MonthEnd);
        builder
            .add_accrual(
                root,
                "sales",
                Fixed(AccrualSeries::generate(move || {
                    quarters.clone().map(|period| Accrual::cmonthly(period, 30.0))
                })),
            )
            .unwrap();
        builder
            .add_balance(
                root,
                "cash",
                Fixed(
                    BalanceSeries::literal(vec![
                        Balance::new(start, 5.0),
                        Balance::new(date(2025, 5, 1), 8.0),
                    ])
                    .unwrap(),
                ),
            )
            .unwrap();
        BuiltModel {
            model: builder.build().unwrap(),
            lines: vec![
                ReportLine::new("Sales", "sales", Measure::Accrue),
                ReportLine::new("Cash", "cash", Measure::At),
            ],
            start,
            frequency: Frequency::Monthly,
            roll: DateRoll::MonthEnd,
        }
    }

    #[test]
    fn test_report_columns_and_rows() {
        let report = sample().report(6).unwrap();
        assert_eq!(report.model, "sample");
        assert_eq!(report.dates.len(), 6);
        assert_eq!(report.dates[1], date(2025, 2, 28));

        let sales = report.row("Sales").unwrap();
        for value in &sales.values {
            assert!((value - 10.0).abs() < 1e-9);
        }
        assert!((sales.total() - 60.0).abs() < 1e-9);

        let cash = report.row("Cash").unwrap();
        assert_eq!(cash.values, vec![5.0, 5.0, 5.0, 5.0, 8.0, 8.0]);
        assert_eq!(cash.total(), 8.0);
        assert!(report.row("Missing").is_none());
    }

    #[test]
    fn test_unknown_path_fails() {
        let mut built = sample();
        built.lines.push(ReportLine::new("Ghost", "nowhere", Measure::Over));
        assert!(built.report(1).is_err());
    }

    #[test]
    fn test_measure_serializes_snake_case() {
        let json = serde_json::to_string(&Measure::Accrue).unwrap();
        assert_eq!(json, "\"accrue\"");
    }
}
