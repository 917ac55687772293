//! An apartment rent roll.
//!
//! Every unit starts from an in-place lease and follows a renewal policy,
//! which makes its lease sequence infinite. Each unit's potential rent is a
//! node of its own; income lines aggregate across units.
//!
//! ```text
//! rent_roll
//! ├── units
//! │   └── unit_101, unit_102, ...   potential rent per unit
//! └── income
//!     ├── gross_rent
//!     ├── vacancy                   vacant units plus a general vacancy rate
//!     ├── credit_loss
//!     ├── other_income
//!     └── effective_gross_income
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use tally_core::prelude::*;
use tally_engine::config::{Validate, ValidationError};
use tally_engine::prelude::*;

use crate::error::ModelResult;
use crate::items::AccrualTotal;
use crate::report::{BuiltModel, Measure, ReportLine};
use crate::ymd;

/// Unit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitType {
    /// Studio.
    #[serde(rename = "studio")]
    Studio,
    /// One bedroom.
    #[serde(rename = "1br")]
    OneBedroom,
    /// Two bedrooms.
    #[serde(rename = "2br")]
    TwoBedroom,
}

/// A lease, or a vacant stretch priced at market rent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    /// First day of the lease.
    pub start: Date,
    /// Day after the last day of the lease.
    pub end: Date,
    /// Contract rent, or market rent while vacant.
    pub monthly_rent: f64,
    /// True for a vacant stretch.
    #[serde(default)]
    pub vacant: bool,
}

impl Lease {
    /// The period the lease covers.
    pub fn period(&self) -> TallyResult<Period> {
        Period::new(self.start, self.end)
    }

    /// Rent over the whole lease, counting calendar months.
    pub fn total_rent(&self) -> TallyResult<f64> {
        let yf = self.period()?.year_fraction(DayCountConvention::CalendarMonthly)?;
        Ok(self.monthly_rent * 12.0 * yf)
    }
}

/// How a unit's next lease follows the current one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalPolicy {
    /// Length of every new or renewed lease.
    pub term_months: u32,
    /// Rent increase at each turnover.
    pub rent_growth: f64,
    /// Vacant months between a departing tenant and the next one.
    pub downtime_months: u32,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            term_months: 12,
            rent_growth: 0.03,
            downtime_months: 1,
        }
    }
}

impl RenewalPolicy {
    /// The lease following `previous`.
    ///
    /// A vacant stretch is followed by a new lease at the same market rent.
    /// An occupied lease either renews at a higher rent or, for units that
    /// turn over, is followed by a vacant stretch priced at that higher rent.
    pub fn next_lease(&self, renews: bool, previous: &Lease) -> TallyResult<Lease> {
        let start = previous.end;
        if previous.vacant {
            return Ok(Lease {
                start,
                end: start.add_months(self.term_months as i32)?,
                monthly_rent: previous.monthly_rent,
                vacant: false,
            });
        }
        let monthly_rent = previous.monthly_rent * (1.0 + self.rent_growth);
        if renews || self.downtime_months == 0 {
            Ok(Lease {
                start,
                end: start.add_months(self.term_months as i32)?,
                monthly_rent,
                vacant: false,
            })
        } else {
            Ok(Lease {
                start,
                end: start.add_months(self.downtime_months as i32)?,
                monthly_rent,
                vacant: true,
            })
        }
    }
}

/// One apartment unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAssumptions {
    /// Unit identifier; becomes the node name.
    pub unit: String,
    /// Layout.
    pub unit_type: UnitType,
    /// The in-place lease.
    pub initial_lease: Lease,
    /// Whether the tenant renews at every expiry.
    pub renews: bool,
}

impl UnitAssumptions {
    /// The unit's endless lease sequence.
    pub fn leases(&self, policy: RenewalPolicy) -> impl Iterator<Item = TallyResult<Lease>> + Send {
        let renews = self.renews;
        std::iter::successors(Some(Ok(self.initial_lease)), move |previous| match previous {
            Ok(lease) => Some(policy.next_lease(renews, lease)),
            Err(_) => None,
        })
    }

    fn series<F>(&self, policy: RenewalPolicy, value: F) -> AccrualSeries
    where
        F: Fn(&Lease) -> TallyResult<f64> + Send + Sync + Clone + 'static,
    {
        let unit = self.clone();
        AccrualSeries::from_fn(move || {
            let value = value.clone();
            unit.leases(policy).map(move |lease| {
                let lease = lease?;
                Ok(Accrual::cmonthly(lease.period()?, value(&lease)?))
            })
        })
    }
}

/// Assumptions for the rent roll model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RentRollAssumptions {
    /// Market name, for reports.
    pub market: String,
    /// First day of the first reported quarter.
    pub start_date: Date,
    /// General vacancy applied to occupied rent.
    pub vacancy_rate: f64,
    /// Allowance for uncollected rent, as a share of rent net of vacancy.
    pub credit_loss_pct: f64,
    /// Parking, laundry and other fees, as a share of net rent.
    pub other_income_pct: f64,
    /// Renewal policy shared by every unit.
    pub renewal: RenewalPolicy,
    /// The units.
    pub units: Vec<UnitAssumptions>,
}

impl Default for RentRollAssumptions {
    fn default() -> Self {
        let unit = |unit: &str, unit_type, start, end, monthly_rent, vacant, renews| UnitAssumptions {
            unit: unit.to_string(),
            unit_type,
            initial_lease: Lease {
                start,
                end,
                monthly_rent,
                vacant,
            },
            renews,
        };
        Self {
            market: "Austin".to_string(),
            start_date: ymd(2025, 1, 1),
            vacancy_rate: 0.05,
            credit_loss_pct: 0.01,
            other_income_pct: 0.03,
            renewal: RenewalPolicy::default(),
            units: vec![
                unit("unit_101", UnitType::Studio, ymd(2025, 1, 1), ymd(2026, 1, 1), 1000.0, false, true),
                unit("unit_102", UnitType::OneBedroom, ymd(2024, 7, 1), ymd(2025, 7, 1), 1400.0, false, false),
                unit("unit_201", UnitType::TwoBedroom, ymd(2025, 1, 1), ymd(2025, 3, 1), 1900.0, true, true),
            ],
        }
    }
}

impl Validate for RentRollAssumptions {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.units.is_empty() {
            errors.push(ValidationError::new("units", "at least one unit is required"));
        }
        let mut seen = HashSet::new();
        for unit in &self.units {
            let field = format!("units.{}", unit.unit);
            if unit.unit.is_empty() || unit.unit.contains('.') {
                errors.push(ValidationError::new(&field, "unit id must be non-empty and contain no '.'"));
            }
            if !seen.insert(unit.unit.as_str()) {
                errors.push(ValidationError::new(&field, "duplicate unit id"));
            }
            if unit.initial_lease.end <= unit.initial_lease.start {
                errors.push(ValidationError::new(&field, "lease must end after it starts"));
            }
            if !unit.initial_lease.monthly_rent.is_finite() || unit.initial_lease.monthly_rent < 0.0 {
                errors.push(ValidationError::new(&field, "rent must be non-negative"));
            }
        }
        if self.renewal.term_months == 0 {
            errors.push(ValidationError::new("renewal.term_months", "must be at least 1"));
        }
        if !(self.renewal.rent_growth > -1.0 && self.renewal.rent_growth.is_finite()) {
            errors.push(ValidationError::new("renewal.rent_growth", "must be above -100%"));
        }
        for (field, pct) in [
            ("vacancy_rate", self.vacancy_rate),
            ("credit_loss_pct", self.credit_loss_pct),
            ("other_income_pct", self.other_income_pct),
        ] {
            if !(0.0..=1.0).contains(&pct) {
                errors.push(ValidationError::new(field, "must be between 0 and 1"));
            }
        }
        errors
    }
}

/// Potential rent of one unit: contract rent when leased, market rent when vacant.
#[derive(Debug, Clone)]
pub struct UnitRent {
    unit: UnitAssumptions,
    policy: RenewalPolicy,
}

impl AccrualItem for UnitRent {
    fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        Ok(self.unit.series(self.policy, Lease::total_rent))
    }
}

/// Lost rent: all of it on vacant stretches, `vacancy_rate` of it otherwise.
#[derive(Debug, Clone)]
pub struct Vacancy {
    units: Vec<UnitAssumptions>,
    policy: RenewalPolicy,
    vacancy_rate: f64,
}

impl AccrualItem for Vacancy {
    fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        let rate = self.vacancy_rate;
        Ok(AccrualSeries::sum(self.units.iter().map(|unit| {
            unit.series(self.policy, move |lease: &Lease| {
                let lost = if lease.vacant { 1.0 } else { rate };
                Ok(-lease.total_rent()? * lost)
            })
        })))
    }
}

/// Builds the rent roll model under `assumptions`.
///
/// # Errors
///
/// Returns a config error if the assumptions are invalid.
pub fn build(assumptions: &RentRollAssumptions) -> ModelResult<BuiltModel> {
    assumptions.validate_or_error()?;

    let mut builder = ModelBuilder::new("rent_roll");
    let root = builder.root();
    let units = builder.group(root, "units")?;
    let mut gross = AccrualTotal::new();
    for unit in &assumptions.units {
        let node = builder.add_accrual(
            units,
            &unit.unit,
            UnitRent {
                unit: unit.clone(),
                policy: assumptions.renewal,
            },
        )?;
        gross = gross.plus(node);
    }

    let income = builder.group(root, "income")?;
    let gross_rent = builder.add_accrual(income, "gross_rent", gross)?;
    let vacancy = builder.add_accrual(
        income,
        "vacancy",
        Vacancy {
            units: assumptions.units.clone(),
            policy: assumptions.renewal,
            vacancy_rate: assumptions.vacancy_rate,
        },
    )?;
    let credit_pct = -assumptions.credit_loss_pct;
    let credit_loss = builder.add_accrual(
        income,
        "credit_loss",
        AccrualTotal::new()
            .weighted(gross_rent, credit_pct)
            .weighted(vacancy, credit_pct),
    )?;
    let other_pct = assumptions.other_income_pct;
    let other_income = builder.add_accrual(
        income,
        "other_income",
        AccrualTotal::new()
            .weighted(gross_rent, other_pct)
            .weighted(vacancy, other_pct)
            .weighted(credit_loss, other_pct),
    )?;
    builder.add_accrual(
        income,
        "effective_gross_income",
        AccrualTotal::new()
            .plus(gross_rent)
            .plus(vacancy)
            .plus(credit_loss)
            .plus(other_income),
    )?;

    tracing::debug!(
        market = %assumptions.market,
        units = assumptions.units.len(),
        "rent roll built"
    );

    let lines = vec![
        ReportLine::new("Gross rent", "income.gross_rent", Measure::Accrue),
        ReportLine::new("Vacancy", "income.vacancy", Measure::Accrue),
        ReportLine::new("Credit loss", "income.credit_loss", Measure::Accrue),
        ReportLine::new("Other income", "income.other_income", Measure::Accrue),
        ReportLine::new(
            "Effective gross income",
            "income.effective_gross_income",
            Measure::Accrue,
        ),
    ];

    Ok(BuiltModel {
        model: builder.build()?,
        lines,
        start: assumptions.start_date,
        frequency: Frequency::Quarterly,
        roll: DateRoll::SameDay,
    })
}
