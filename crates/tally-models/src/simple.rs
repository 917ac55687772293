//! A five-line income model.
//!
//! ```text
//! simple
//! ├── operating
//! │   ├── revenue              grows each quarter at an annual rate
//! │   └── operating_expense    a share of revenue
//! ├── operating_income
//! ├── interest_expense         semiannual 30/360 coupon on constant principal
//! └── net_income
//! ```

use serde::{Deserialize, Serialize};

use tally_core::prelude::*;
use tally_engine::config::{Validate, ValidationError};
use tally_engine::prelude::*;

use crate::error::ModelResult;
use crate::items::AccrualTotal;
use crate::report::{BuiltModel, Measure, ReportLine};
use crate::ymd;

/// Assumptions for the simple model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleAssumptions {
    /// First day of the first quarter; quarters end on month ends.
    pub start_date: Date,
    /// Revenue in the first quarter.
    pub initial_revenue: f64,
    /// Annual revenue growth, applied pro rata each quarter.
    pub revenue_growth: f64,
    /// Operating expense as a (negative) fraction of revenue.
    pub opex_pct_revenue: f64,
    /// Constant debt principal.
    pub principal: f64,
    /// Benchmark rate the coupon is set over.
    pub base_rate: f64,
    /// Spread over the benchmark rate.
    pub coupon_spread: f64,
}

impl Default for SimpleAssumptions {
    fn default() -> Self {
        Self {
            start_date: ymd(2020, 12, 31),
            initial_revenue: 1000.0,
            revenue_growth: 0.15,
            opex_pct_revenue: -0.65,
            principal: 1500.0,
            base_rate: 0.04,
            coupon_spread: 0.03,
        }
    }
}

impl SimpleAssumptions {
    /// All-in annual coupon.
    #[must_use]
    pub fn coupon(&self) -> f64 {
        self.base_rate + self.coupon_spread
    }

    /// The same assumptions with a different growth rate.
    #[must_use]
    pub fn with_revenue_growth(mut self, growth: f64) -> Self {
        self.revenue_growth = growth;
        self
    }
}

impl Validate for SimpleAssumptions {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.initial_revenue.is_finite() || self.initial_revenue < 0.0 {
            errors.push(ValidationError::new(
                "initial_revenue",
                "must be a non-negative number",
            ));
        }
        if !(self.revenue_growth > -1.0 && self.revenue_growth.is_finite()) {
            errors.push(ValidationError::new("revenue_growth", "must be above -100%"));
        }
        if !(-1.0..=0.0).contains(&self.opex_pct_revenue) {
            errors.push(ValidationError::new(
                "opex_pct_revenue",
                "must be between -1 and 0",
            ));
        }
        if !self.principal.is_finite() || self.principal < 0.0 {
            errors.push(ValidationError::new("principal", "must be non-negative"));
        }
        if !self.coupon().is_finite() {
            errors.push(ValidationError::new("coupon_spread", "coupon must be finite"));
        }
        errors
    }
}

/// Quarterly revenue growing at `growth` per year, pro rata by calendar month.
#[derive(Debug, Clone)]
pub struct Revenue {
    start: Date,
    initial: f64,
    growth: f64,
}

impl AccrualItem for Revenue {
    fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        let growth = self.growth;
        Ok(AccrualSeries::unfold(
            (self.start, self.initial),
            move |&(start, value)| {
                let period = Period::new(start, DateRoll::MonthEnd.advance(start, 3)?)?;
                let yf = period.year_fraction(DayCountConvention::CalendarMonthly)?;
                let next = value * (1.0 + growth * yf);
                Ok(Some((Accrual::cmonthly(period, value), (period.end(), next))))
            },
        ))
    }
}

/// Interest on a constant principal, accrued semiannually on 30/360.
#[derive(Debug, Clone)]
pub struct InterestExpense {
    start: Date,
    principal: f64,
    coupon: f64,
}

impl AccrualItem for InterestExpense {
    fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        let (start, principal, coupon) = (self.start, self.principal, self.coupon);
        Ok(AccrualSeries::from_fn(move || {
            Period::series(start, Frequency::SemiAnnual, DateRoll::MonthEnd).map(move |period| {
                let yf = period.year_fraction(DayCountConvention::Thirty360)?;
                Ok(Accrual::thirty360(period, principal * -coupon * yf))
            })
        }))
    }
}

/// Builds the simple model under `assumptions`.
///
/// # Errors
///
/// Returns a config error if the assumptions are invalid.
pub fn build(assumptions: &SimpleAssumptions) -> ModelResult<BuiltModel> {
    assumptions.validate_or_error()?;

    let mut builder = ModelBuilder::new("simple");
    let root = builder.root();
    let operating = builder.group(root, "operating")?;
    let revenue = builder.add_accrual(
        operating,
        "revenue",
        Revenue {
            start: assumptions.start_date,
            initial: assumptions.initial_revenue,
            growth: assumptions.revenue_growth,
        },
    )?;
    let operating_expense = builder.add_accrual(
        operating,
        "operating_expense",
        AccrualTotal::new().weighted(revenue, assumptions.opex_pct_revenue),
    )?;
    let operating_income = builder.add_accrual(
        root,
        "operating_income",
        AccrualTotal::new().plus(revenue).plus(operating_expense),
    )?;
    let interest_expense = builder.add_accrual(
        root,
        "interest_expense",
        InterestExpense {
            start: assumptions.start_date,
            principal: assumptions.principal,
            coupon: assumptions.coupon(),
        },
    )?;
    builder.add_accrual(
        root,
        "net_income",
        AccrualTotal::new().plus(operating_income).plus(interest_expense),
    )?;

    let lines = vec![
        ReportLine::new("Revenue", "operating.revenue", Measure::Accrue),
        ReportLine::new("Operating expense", "operating.operating_expense", Measure::Accrue),
        ReportLine::new("Operating income", "operating_income", Measure::Accrue),
        ReportLine::new("Interest expense", "interest_expense", Measure::Accrue),
        ReportLine::new("Net income", "net_income", Measure::Accrue),
    ];

    Ok(BuiltModel {
        model: builder.build()?,
        lines,
        start: assumptions.start_date,
        frequency: Frequency::Quarterly,
        roll: DateRoll::MonthEnd,
    })
}
