//! A linked income statement, balance sheet and cash flow statement.
//!
//! Revenue continues its quarterly history at a growth schedule read through
//! a weighted average. Interest accrues on debt outstanding at the start of
//! each quarter, and a revolver is drawn or repaid so that cash ends every
//! quarter at the minimum balance whenever borrowing is outstanding. Both
//! loops read balances strictly before the date being produced.
//!
//! ```text
//! three_statement
//! ├── income          revenue .. net_income
//! ├── balance_sheet
//! │   ├── assets      cash, receivables, ppe, total_assets
//! │   ├── liabilities payables, revolver, long_term_debt, total_liabilities
//! │   ├── equity      shareholders_equity
//! │   └── check       assets - liabilities - equity
//! ├── cash_flow       operating, investing, financing, total
//! ├── footnotes       capex, working capital, revolver sizing
//! └── assumptions     revenue_growth
//! ```

use serde::{Deserialize, Serialize};

use tally_core::prelude::*;
use tally_engine::config::{Validate, ValidationError};
use tally_engine::prelude::*;

use crate::error::ModelResult;
use crate::items::{
    AccrualTotal, BalanceTotal, Changes, Fixed, PaymentTotal, Proportional, Rollforward, Settled,
};
use crate::report::{BuiltModel, Measure, ReportLine};
use crate::ymd;

// =============================================================================
// ASSUMPTIONS
// =============================================================================

/// One reported period of history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAccrual {
    /// Period start.
    pub start: Date,
    /// Period end.
    pub end: Date,
    /// Reported amount.
    pub value: f64,
}

/// An annual rate in force from `from` until the next step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateStep {
    /// First date the rate applies.
    pub from: Date,
    /// Annual rate.
    pub rate: f64,
}

/// Balance sheet at the start date. Equity is the residual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningBalances {
    /// Cash.
    pub cash: f64,
    /// Accounts receivable.
    pub receivables: f64,
    /// Net property, plant and equipment.
    pub ppe: f64,
    /// Accounts payable.
    pub payables: f64,
    /// Revolver outstanding.
    pub revolver: f64,
    /// Term debt outstanding.
    pub long_term_debt: f64,
}

impl Default for OpeningBalances {
    fn default() -> Self {
        Self {
            cash: 150.0,
            receivables: 315.0,
            ppe: 800.0,
            payables: 157.5,
            revolver: 0.0,
            long_term_debt: 500.0,
        }
    }
}

impl OpeningBalances {
    /// Shareholders' equity that balances the opening balance sheet.
    #[must_use]
    pub fn equity(&self) -> f64 {
        self.cash + self.receivables + self.ppe
            - self.payables
            - self.revolver
            - self.long_term_debt
    }
}

/// Assumptions for the three statement model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreeStatementAssumptions {
    /// Last historical date; projections start here.
    pub start_date: Date,
    /// Reported quarterly revenue, ending on `start_date`.
    pub revenue_history: Vec<HistoricalAccrual>,
    /// Annual revenue growth schedule.
    pub revenue_growth: Vec<RateStep>,
    /// Cost of revenue as a (negative) share of revenue.
    pub cost_of_revenue_pct: f64,
    /// Operating expenses as a (negative) share of revenue.
    pub opex_pct_revenue: f64,
    /// Annual rate on revolver and term debt.
    pub interest_rate: f64,
    /// Tax rate on pretax income.
    pub tax_rate: f64,
    /// Receivables as a share of quarterly revenue.
    pub receivables_pct_revenue: f64,
    /// Payables as a share of quarterly cost of revenue.
    pub payables_pct_cost: f64,
    /// Opening balance sheet.
    pub opening: OpeningBalances,
    /// Scheduled term debt repayment per quarter.
    pub debt_amortization: f64,
    /// Capital spending in the first projected quarter.
    pub capex: f64,
    /// Annual growth of capital spending.
    pub capex_growth: f64,
    /// Cash floor maintained with the revolver.
    pub min_cash: f64,
}

impl Default for ThreeStatementAssumptions {
    fn default() -> Self {
        let quarter = |start, end, value| HistoricalAccrual { start, end, value };
        Self {
            start_date: ymd(2024, 12, 31),
            revenue_history: vec![
                quarter(ymd(2023, 12, 31), ymd(2024, 3, 31), 900.0),
                quarter(ymd(2024, 3, 31), ymd(2024, 6, 30), 950.0),
                quarter(ymd(2024, 6, 30), ymd(2024, 9, 30), 1000.0),
                quarter(ymd(2024, 9, 30), ymd(2024, 12, 31), 1050.0),
            ],
            revenue_growth: vec![
                RateStep {
                    from: ymd(2024, 12, 31),
                    rate: 0.10,
                },
                RateStep {
                    from: ymd(2026, 12, 31),
                    rate: 0.05,
                },
            ],
            cost_of_revenue_pct: -0.6,
            opex_pct_revenue: -0.25,
            interest_rate: 0.08,
            tax_rate: 0.21,
            receivables_pct_revenue: 0.3,
            payables_pct_cost: 0.25,
            opening: OpeningBalances::default(),
            debt_amortization: 25.0,
            capex: 40.0,
            capex_growth: 0.05,
            min_cash: 100.0,
        }
    }
}

impl Validate for ThreeStatementAssumptions {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        match self.revenue_history.last() {
            None => errors.push(ValidationError::new(
                "revenue_history",
                "at least one historical period is required",
            )),
            Some(last) if last.end != self.start_date => errors.push(ValidationError::new(
                "revenue_history",
                format!("history must end on the start date {}", self.start_date),
            )),
            Some(_) => {}
        }
        if self.revenue_history.iter().any(|q| q.end <= q.start) {
            errors.push(ValidationError::new(
                "revenue_history",
                "every period must end after it starts",
            ));
        }

        match self.revenue_growth.first() {
            None => errors.push(ValidationError::new(
                "revenue_growth",
                "at least one rate step is required",
            )),
            Some(first) if first.from > self.start_date => errors.push(ValidationError::new(
                "revenue_growth",
                "the first step must start on or before the start date",
            )),
            Some(_) => {}
        }
        if self.revenue_growth.windows(2).any(|w| w[1].from <= w[0].from) {
            errors.push(ValidationError::new(
                "revenue_growth",
                "steps must be in strictly increasing date order",
            ));
        }

        if !(0.0..=1.0).contains(&self.tax_rate) {
            errors.push(ValidationError::new("tax_rate", "must be between 0 and 1"));
        }
        for (field, value) in [
            ("min_cash", self.min_cash),
            ("debt_amortization", self.debt_amortization),
            ("capex", self.capex),
            ("opening.cash", self.opening.cash),
            ("opening.revolver", self.opening.revolver),
            ("opening.long_term_debt", self.opening.long_term_debt),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ValidationError::new(field, "must be non-negative"));
            }
        }
        for (field, value) in [
            ("cost_of_revenue_pct", self.cost_of_revenue_pct),
            ("opex_pct_revenue", self.opex_pct_revenue),
            ("interest_rate", self.interest_rate),
            ("receivables_pct_revenue", self.receivables_pct_revenue),
            ("payables_pct_cost", self.payables_pct_cost),
            ("capex_growth", self.capex_growth),
        ] {
            if !value.is_finite() {
                errors.push(ValidationError::new(field, "must be a finite number"));
            }
        }
        errors
    }
}

impl ThreeStatementAssumptions {
    fn history(&self) -> TallyResult<AccrualSeries> {
        let accruals = self
            .revenue_history
            .iter()
            .map(|q| Ok(Accrual::cmonthly(Period::new(q.start, q.end)?, q.value)))
            .collect::<TallyResult<Vec<_>>>()?;
        AccrualSeries::literal(accruals)
    }

    fn growth_schedule(&self) -> TallyResult<AccrualSeries> {
        let mut accruals = Vec::with_capacity(self.revenue_growth.len());
        for (i, step) in self.revenue_growth.iter().enumerate() {
            let period = match self.revenue_growth.get(i + 1) {
                Some(next) => Period::new(step.from, next.from)?,
                None => Period::open(step.from),
            };
            accruals.push(Accrual::cmonthly(period, step.rate));
        }
        AccrualSeries::literal(accruals)
    }
}

// =============================================================================
// LINE ITEMS
// =============================================================================

fn next_quarter(date: Date) -> TallyResult<Date> {
    DateRoll::MonthEnd.advance(date, 3)
}

/// Revenue history continued quarter by quarter.
///
/// Each projected quarter keeps the previous quarter's run rate and grows it
/// by the schedule's weighted average rate over the new quarter.
#[derive(Debug, Clone)]
pub struct Revenue {
    history: AccrualSeries,
    growth: AccrualRef,
}

impl AccrualItem for Revenue {
    fn accruals(&self, ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        let growth = ctx.accruals(self.growth);
        Ok(self.history.then(move |last| {
            let growth = growth.clone();
            AccrualSeries::unfold(last.clone(), move |previous: &Accrual| {
                let period = Period::new(previous.end(), next_quarter(previous.end())?)?;
                let yf = period.year_fraction(previous.day_count())?;
                let run_rate = previous.rate()?;
                let rate = growth.w_avg(period.start(), period.end())?;
                let next = Accrual::new(
                    period,
                    run_rate * yf * (1.0 + rate * yf),
                    previous.day_count(),
                );
                Ok(Some((next.clone(), next)))
            })
        }))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::current(self.growth)]
    }
}

/// Quarterly interest on debt outstanding at the start of each quarter.
#[derive(Debug, Clone)]
pub struct InterestExpense {
    start: Date,
    rate: f64,
    debt: Vec<BalanceRef>,
}

impl AccrualItem for InterestExpense {
    fn accruals(&self, ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        let debt = BalanceSeries::sum(self.debt.iter().map(|node| ctx.balances(*node)));
        let (start, rate) = (self.start, self.rate);
        Ok(AccrualSeries::from_fn(move || {
            let debt = debt.clone();
            Period::series(start, Frequency::Quarterly, DateRoll::MonthEnd).map(move |period| {
                let yf = period.year_fraction(DayCountConvention::CalendarMonthly)?;
                let debt = debt.clone();
                let interest = Value::deferred(move || Ok(-debt.at(period.start())? * rate * yf));
                Ok(Accrual::cmonthly(period, interest))
            })
        }))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.debt.iter().map(|node| Dependency::lagged(*node)).collect()
    }
}

/// Quarterly capital spending, growing pro rata at an annual rate.
#[derive(Debug, Clone)]
pub struct CapitalExpenditures {
    start: Date,
    first: f64,
    growth: f64,
}

impl PaymentItem for CapitalExpenditures {
    fn payments(&self, _ctx: &EvalContext) -> TallyResult<PaymentSeries> {
        let growth = self.growth;
        Ok(PaymentSeries::unfold(
            (self.start, self.first),
            move |&(date, amount)| {
                let next = next_quarter(date)?;
                let yf = Period::new(date, next)?.year_fraction(DayCountConvention::CalendarMonthly)?;
                Ok(Some((Payment::new(next, -amount), (next, amount * (1.0 + growth * yf)))))
            },
        ))
    }
}

/// Term debt repaid by a fixed amount each quarter until it is gone.
#[derive(Debug, Clone)]
pub struct LongTermDebt {
    opening: Balance,
    amortization: f64,
}

impl BalanceItem for LongTermDebt {
    fn balances(&self, _ctx: &EvalContext) -> TallyResult<BalanceSeries> {
        let amortization = self.amortization;
        Ok(BalanceSeries::literal(vec![self.opening.clone()])?.then(move |last| {
            BalanceSeries::unfold(last.clone(), move |previous: &Balance| {
                let next = Balance::new(
                    next_quarter(previous.date())?,
                    (previous.value()? - amortization).max(0.0),
                );
                Ok(Some((next.clone(), next)))
            })
        }))
    }
}

/// Revolver draws (positive) and repayments (negative) sized on each flow
/// date against the cash and revolver balances the day before.
///
/// A shortfall below the cash floor is drawn. A surplus repays whatever is
/// outstanding.
#[derive(Debug, Clone)]
pub struct RevolverDraws {
    start: Date,
    min_cash: f64,
    before_revolver: PaymentRef,
    cash: BalanceRef,
    revolver: BalanceRef,
}

impl PaymentItem for RevolverDraws {
    fn payments(&self, ctx: &EvalContext) -> TallyResult<PaymentSeries> {
        let cash = ctx.balances(self.cash);
        let revolver = ctx.balances(self.revolver);
        let min_cash = self.min_cash;
        Ok(ctx
            .payments(self.before_revolver)
            .after(self.start)
            .map_into(move |flow| {
                let (cash, revolver) = (cash.clone(), revolver.clone());
                let date = flow.date();
                let amount = flow.amount().clone();
                let draw = Value::deferred(move || {
                    let prior = date.add_days(-1);
                    let shortfall = min_cash - (cash.at(prior)? + amount.get()?);
                    let outstanding = revolver.at(prior)?.max(0.0);
                    Ok(shortfall.max(-outstanding))
                });
                Ok(Payment::new(date, draw))
            }))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![
            Dependency::current(self.before_revolver),
            Dependency::lagged(self.cash),
            Dependency::lagged(self.revolver),
        ]
    }
}

// =============================================================================
// MODEL
// =============================================================================

/// Builds the three statement model under `assumptions`.
///
/// # Errors
///
/// Returns a config error if the assumptions are invalid.
pub fn build(assumptions: &ThreeStatementAssumptions) -> ModelResult<BuiltModel> {
    assumptions.validate_or_error()?;
    let start = assumptions.start_date;
    let opening = assumptions.opening;
    let at_start = |value: f64| Balance::new(start, value);

    let mut builder = ModelBuilder::new("three_statement");
    let root = builder.root();
    let income = builder.group(root, "income")?;
    let balance_sheet = builder.group(root, "balance_sheet")?;
    let assets = builder.group(balance_sheet, "assets")?;
    let liabilities = builder.group(balance_sheet, "liabilities")?;
    let equity = builder.group(balance_sheet, "equity")?;
    let cash_flow = builder.group(root, "cash_flow")?;
    let footnotes = builder.group(root, "footnotes")?;
    let inputs = builder.group(root, "assumptions")?;

    // Nodes inside the financing loops are declared before they are defined.
    let cash = builder.balance(assets, "cash")?;
    let revolver = builder.balance(liabilities, "revolver")?;
    let long_term_debt = builder.balance(liabilities, "long_term_debt")?;
    let capex = builder.payment(footnotes, "capital_expenditures")?;
    let working_capital = builder.balance(footnotes, "working_capital")?;
    let before_revolver = builder.payment(footnotes, "cash_flow_before_revolver")?;
    let draws = builder.payment(footnotes, "net_revolver_draws")?;

    // Income statement
    let growth = builder.add_accrual(
        inputs,
        "revenue_growth",
        Fixed(assumptions.growth_schedule()?),
    )?;
    let revenue = builder.add_accrual(
        income,
        "revenue",
        Revenue {
            history: assumptions.history()?,
            growth,
        },
    )?;
    let cost_of_revenue = builder.add_accrual(
        income,
        "cost_of_revenue",
        AccrualTotal::new().weighted(revenue, assumptions.cost_of_revenue_pct),
    )?;
    let operating_expenses = builder.add_accrual(
        income,
        "operating_expenses",
        AccrualTotal::new().weighted(revenue, assumptions.opex_pct_revenue),
    )?;
    let operating_income = builder.add_accrual(
        income,
        "operating_income",
        AccrualTotal::new()
            .plus(revenue)
            .plus(cost_of_revenue)
            .plus(operating_expenses),
    )?;
    let interest_expense = builder.add_accrual(
        income,
        "interest_expense",
        InterestExpense {
            start,
            rate: assumptions.interest_rate,
            debt: vec![revolver, long_term_debt],
        },
    )?;
    let pretax_income = builder.add_accrual(
        income,
        "pretax_income",
        AccrualTotal::new().plus(operating_income).plus(interest_expense),
    )?;
    let tax_expense = builder.add_accrual(
        income,
        "tax_expense",
        AccrualTotal::new().weighted(pretax_income, -assumptions.tax_rate),
    )?;
    let net_income = builder.add_accrual(
        income,
        "net_income",
        AccrualTotal::new().plus(pretax_income).plus(tax_expense),
    )?;

    // Balance sheet
    let receivables = builder.add_balance(
        assets,
        "receivables",
        Proportional {
            opening: at_start(opening.receivables),
            source: revenue,
            factor: assumptions.receivables_pct_revenue,
        },
    )?;
    let ppe = builder.add_balance(
        assets,
        "ppe",
        Rollforward::new(at_start(opening.ppe)).flow(capex, -1.0),
    )?;
    let total_assets = builder.add_balance(
        assets,
        "total_assets",
        BalanceTotal::new().plus(cash).plus(receivables).plus(ppe),
    )?;
    let payables = builder.add_balance(
        liabilities,
        "payables",
        Proportional {
            opening: at_start(opening.payables),
            source: cost_of_revenue,
            factor: -assumptions.payables_pct_cost,
        },
    )?;
    builder.define_balance(
        revolver,
        Rollforward::new(at_start(opening.revolver)).flow(draws, 1.0),
    )?;
    builder.define_balance(
        long_term_debt,
        LongTermDebt {
            opening: at_start(opening.long_term_debt),
            amortization: assumptions.debt_amortization,
        },
    )?;
    let total_liabilities = builder.add_balance(
        liabilities,
        "total_liabilities",
        BalanceTotal::new()
            .plus(payables)
            .plus(revolver)
            .plus(long_term_debt),
    )?;

    // Cash flow statement
    let settled_income = builder.add_payment(
        cash_flow,
        "net_income",
        Settled {
            source: net_income,
            after: start,
        },
    )?;
    let working_capital_flow =
        builder.add_payment(cash_flow, "working_capital", Changes::negated(working_capital))?;
    let operating = builder.add_payment(
        cash_flow,
        "operating",
        PaymentTotal::new().plus(settled_income).plus(working_capital_flow),
    )?;
    let investing = builder.add_payment(cash_flow, "investing", PaymentTotal::new().plus(capex))?;
    let debt_flow = builder.add_payment(cash_flow, "long_term_debt", Changes::of(long_term_debt))?;
    let revolver_flow = builder.add_payment(cash_flow, "revolver", Changes::of(revolver))?;
    let financing = builder.add_payment(
        cash_flow,
        "financing",
        PaymentTotal::new().plus(debt_flow).plus(revolver_flow),
    )?;
    builder.add_payment(
        cash_flow,
        "total",
        PaymentTotal::new()
            .plus(operating)
            .plus(investing)
            .plus(financing),
    )?;

    // Equity and the balance check close the loop through net income.
    let shareholders_equity = builder.add_balance(
        equity,
        "shareholders_equity",
        Rollforward::new(at_start(opening.equity())).flow(settled_income, 1.0),
    )?;
    builder.add_balance(
        balance_sheet,
        "check",
        BalanceTotal::new()
            .plus(total_assets)
            .minus(total_liabilities)
            .minus(shareholders_equity),
    )?;

    // Footnotes
    builder.define_payment(
        capex,
        CapitalExpenditures {
            start,
            first: assumptions.capex,
            growth: assumptions.capex_growth,
        },
    )?;
    builder.define_balance(
        working_capital,
        BalanceTotal::new().plus(receivables).minus(payables),
    )?;
    builder.define_payment(
        before_revolver,
        PaymentTotal::new()
            .plus(operating)
            .plus(investing)
            .plus(debt_flow),
    )?;
    builder.define_payment(
        draws,
        RevolverDraws {
            start,
            min_cash: assumptions.min_cash,
            before_revolver,
            cash,
            revolver,
        },
    )?;
    builder.define_balance(
        cash,
        Rollforward::new(at_start(opening.cash))
            .flow(before_revolver, 1.0)
            .flow(draws, 1.0),
    )?;

    let lines = vec![
        ReportLine::new("Revenue", "income.revenue", Measure::Accrue),
        ReportLine::new("Operating income", "income.operating_income", Measure::Accrue),
        ReportLine::new("Interest expense", "income.interest_expense", Measure::Accrue),
        ReportLine::new("Net income", "income.net_income", Measure::Accrue),
        ReportLine::new("Operating cash flow", "cash_flow.operating", Measure::Over),
        ReportLine::new("Investing cash flow", "cash_flow.investing", Measure::Over),
        ReportLine::new("Financing cash flow", "cash_flow.financing", Measure::Over),
        ReportLine::new("Net revolver draws", "footnotes.net_revolver_draws", Measure::Over),
        ReportLine::new("Cash", "balance_sheet.assets.cash", Measure::At),
        ReportLine::new("Revolver", "balance_sheet.liabilities.revolver", Measure::At),
        ReportLine::new("Total assets", "balance_sheet.assets.total_assets", Measure::At),
        ReportLine::new("Balance check", "balance_sheet.check", Measure::At),
    ];

    Ok(BuiltModel {
        model: builder.build()?,
        lines,
        start,
        frequency: Frequency::Quarterly,
        roll: DateRoll::MonthEnd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_first_projected_quarter() {
        let built = build(&ThreeStatementAssumptions::default()).unwrap();
        let report = built.report(2).unwrap();

        let revenue = report.row("Revenue").unwrap();
        assert_relative_eq!(revenue.values[0], 1050.0 * (1.0 + 0.10 * 0.25), epsilon = 1e-9);

        // 500 of term debt at 8% for a quarter, then 475 after amortization.
        let interest = report.row("Interest expense").unwrap();
        assert_relative_eq!(interest.values[0], -10.0, epsilon = 1e-9);
        assert_relative_eq!(interest.values[1], -9.5, epsilon = 1e-9);
    }

    #[test]
    fn test_balance_sheet_balances() {
        let built = build(&ThreeStatementAssumptions::default()).unwrap();
        let report = built.report(12).unwrap();
        for value in &report.row("Balance check").unwrap().values {
            assert_abs_diff_eq!(*value, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_growth_schedule_steps_down() {
        let assumptions = ThreeStatementAssumptions::default();
        let built = build(&assumptions).unwrap();
        let scope = built.model.enter_scope();
        let revenue = built.model.find("income.revenue").unwrap();

        let q = |y, m, d| date(y, m, d);
        let last_fast = scope.accrue(revenue, q(2026, 9, 30), q(2026, 12, 31)).unwrap();
        let first_slow = scope.accrue(revenue, q(2026, 12, 31), q(2027, 3, 31)).unwrap();
        assert_relative_eq!(first_slow, last_fast * (1.0 + 0.05 * 0.25), epsilon = 1e-9);
    }

    #[test]
    fn test_revolver_holds_cash_at_floor() {
        let assumptions = ThreeStatementAssumptions {
            capex: 400.0,
            ..ThreeStatementAssumptions::default()
        };
        let built = build(&assumptions).unwrap();
        let report = built.report(8).unwrap();

        let cash = &report.row("Cash").unwrap().values;
        let revolver = &report.row("Revolver").unwrap().values;
        assert!(revolver[0] > 0.0);
        for (cash, revolver) in cash.iter().zip(revolver) {
            assert!(*revolver >= -1e-9);
            assert!(*cash >= assumptions.min_cash - 1e-6);
            if *revolver > 1e-9 {
                assert_abs_diff_eq!(*cash, assumptions.min_cash, epsilon = 1e-6);
            }
        }
        for value in &report.row("Balance check").unwrap().values {
            assert_abs_diff_eq!(*value, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cash_flow_explains_cash() {
        let built = build(&ThreeStatementAssumptions::default()).unwrap();
        let scope = built.model.enter_scope();
        let total = built.model.find("cash_flow.total").unwrap();
        let cash = built.model.find("balance_sheet.assets.cash").unwrap();

        for period in built.periods(6) {
            let flow = scope.over(total, period.start(), period.end()).unwrap();
            let change = scope.at(cash, period.end()).unwrap() - scope.at(cash, period.start()).unwrap();
            assert_abs_diff_eq!(flow, change, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_history_must_reach_start_date() {
        let mut assumptions = ThreeStatementAssumptions::default();
        assumptions.revenue_history.pop();
        let errors = assumptions.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "revenue_history");
        assert!(build(&assumptions).is_err());
    }
}
