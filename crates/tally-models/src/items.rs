//! Reusable line items shared by the example models.
//!
//! Most statement lines are weighted sums of other lines, fixed schedules, or
//! balances rolled forward by flows. The model-specific items live next to
//! the model that uses them.

use tally_core::prelude::*;
use tally_engine::prelude::*;

macro_rules! total_item {
    ($(#[$doc:meta])* $name:ident, $item:ident, $method:ident, $reference:ty, $series:ty, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            terms: Vec<($reference, f64)>,
        }

        impl $name {
            /// An empty total.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Adds `node`.
            #[must_use]
            pub fn plus(self, node: $reference) -> Self {
                self.weighted(node, 1.0)
            }

            /// Subtracts `node`.
            #[must_use]
            pub fn minus(self, node: $reference) -> Self {
                self.weighted(node, -1.0)
            }

            /// Adds `node` scaled by `weight`.
            #[must_use]
            pub fn weighted(mut self, node: $reference, weight: f64) -> Self {
                self.terms.push((node, weight));
                self
            }
        }

        impl $item for $name {
            fn $method(&self, ctx: &EvalContext) -> TallyResult<$series> {
                Ok(<$series>::sum(
                    self.terms
                        .iter()
                        .map(|(node, weight)| ctx.$read(*node).scale(*weight)),
                ))
            }

            fn dependencies(&self) -> Vec<Dependency> {
                self.terms
                    .iter()
                    .map(|(node, _)| Dependency::current(*node))
                    .collect()
            }
        }
    };
}

total_item!(
    /// Weighted sum of accrual lines.
    AccrualTotal,
    AccrualItem,
    accruals,
    AccrualRef,
    AccrualSeries,
    accruals
);
total_item!(
    /// Weighted sum of payment lines.
    PaymentTotal,
    PaymentItem,
    payments,
    PaymentRef,
    PaymentSeries,
    payments
);
total_item!(
    /// Weighted sum of balance lines, with step semantics.
    BalanceTotal,
    BalanceItem,
    balances,
    BalanceRef,
    BalanceSeries,
    balances
);

/// A series fixed at construction, such as a rate schedule.
#[derive(Debug, Clone)]
pub struct Fixed<T>(pub Series<T>);

impl AccrualItem for Fixed<Accrual> {
    fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
        Ok(self.0.clone())
    }
}

impl PaymentItem for Fixed<Payment> {
    fn payments(&self, _ctx: &EvalContext) -> TallyResult<PaymentSeries> {
        Ok(self.0.clone())
    }
}

impl BalanceItem for Fixed<Balance> {
    fn balances(&self, _ctx: &EvalContext) -> TallyResult<BalanceSeries> {
        Ok(self.0.clone())
    }
}

/// Accruals settled as payments on each period end, strictly after `after`.
#[derive(Debug, Clone)]
pub struct Settled {
    /// Line being settled.
    pub source: AccrualRef,
    /// Settlements on or before this date are dropped.
    pub after: Date,
}

impl PaymentItem for Settled {
    fn payments(&self, ctx: &EvalContext) -> TallyResult<PaymentSeries> {
        Ok(ctx.accruals(self.source).to_payments().after(self.after))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::current(self.source)]
    }
}

/// Period-over-period changes of a balance line, scaled by `factor`.
#[derive(Debug, Clone)]
pub struct Changes {
    /// Balance whose changes are taken.
    pub source: BalanceRef,
    /// Sign or scale applied to every change.
    pub factor: f64,
}

impl Changes {
    /// Changes of `source` as they are.
    #[must_use]
    pub fn of(source: BalanceRef) -> Self {
        Self {
            source,
            factor: 1.0,
        }
    }

    /// Changes of `source` with the sign flipped, as for asset increases
    /// consuming cash.
    #[must_use]
    pub fn negated(source: BalanceRef) -> Self {
        Self {
            source,
            factor: -1.0,
        }
    }
}

impl PaymentItem for Changes {
    fn payments(&self, ctx: &EvalContext) -> TallyResult<PaymentSeries> {
        Ok(ctx.balances(self.source).changes().scale(self.factor))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::current(self.source)]
    }
}

/// An opening balance rolled forward by weighted payment flows.
#[derive(Debug, Clone)]
pub struct Rollforward {
    opening: Balance,
    flows: Vec<(PaymentRef, f64)>,
}

impl Rollforward {
    /// Starts from `opening` with no flows.
    #[must_use]
    pub fn new(opening: Balance) -> Self {
        Self {
            opening,
            flows: Vec::new(),
        }
    }

    /// Adds `node` as a flow scaled by `weight`.
    #[must_use]
    pub fn flow(mut self, node: PaymentRef, weight: f64) -> Self {
        self.flows.push((node, weight));
        self
    }
}

impl BalanceItem for Rollforward {
    fn balances(&self, ctx: &EvalContext) -> TallyResult<BalanceSeries> {
        let flows = PaymentSeries::sum(
            self.flows
                .iter()
                .map(|(node, weight)| ctx.payments(*node).scale(*weight)),
        );
        Ok(BalanceSeries::literal(vec![self.opening.clone()])?.then(move |last| {
            BalanceSeries::accumulate(last.clone(), flows.after(last.date()))
        }))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.flows
            .iter()
            .map(|(node, _)| Dependency::current(*node))
            .collect()
    }
}

/// An opening balance followed by a fixed fraction of an accrual line,
/// recorded at each accrual's period end.
///
/// Working-capital lines such as receivables (a share of revenue) or payables
/// (a share of cost of revenue) are driven this way.
#[derive(Debug, Clone)]
pub struct Proportional {
    /// Balance before the first driven date.
    pub opening: Balance,
    /// Driving accrual line.
    pub source: AccrualRef,
    /// Balance per unit of the driver's period value.
    pub factor: f64,
}

impl BalanceItem for Proportional {
    fn balances(&self, ctx: &EvalContext) -> TallyResult<BalanceSeries> {
        let source = ctx.accruals(self.source);
        let factor = self.factor;
        Ok(BalanceSeries::literal(vec![self.opening.clone()])?.then(move |last| {
            source.after(last.date()).map_into(move |accrual| {
                Ok(Balance::new(
                    accrual.end(),
                    accrual.amount().map(move |value| value * factor),
                ))
            })
        }))
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::current(self.source)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn quarterly(value: f64) -> Fixed<Accrual> {
        let accruals = Period::series(date(2024, 12, 31), Frequency::Quarterly, DateRoll::MonthEnd)
            .take(4)
            .map(|period| Accrual::cmonthly(period, value))
            .collect();
        Fixed(AccrualSeries::literal(accruals).unwrap())
    }

    #[test]
    fn test_totals_and_rollforward() {
        let mut builder = ModelBuilder::new("test");
        let root = builder.root();
        let sales = builder.add_accrual(root, "sales", quarterly(100.0)).unwrap();
        let costs = builder
            .add_accrual(root, "costs", AccrualTotal::new().weighted(sales, -0.4))
            .unwrap();
        let profit = builder
            .add_accrual(root, "profit", AccrualTotal::new().plus(sales).plus(costs))
            .unwrap();
        let start = date(2024, 12, 31);
        let settled = builder
            .add_payment(root, "settled", Settled { source: profit, after: start })
            .unwrap();
        let retained = builder
            .add_balance(
                root,
                "retained",
                Rollforward::new(Balance::new(start, 10.0)).flow(settled, 1.0),
            )
            .unwrap();
        let model = builder.build().unwrap();

        let scope = model.enter_scope();
        let end = date(2025, 12, 31);
        assert_relative_eq!(scope.accrue(profit.node(), start, end).unwrap(), 240.0, epsilon = 1e-9);
        assert_relative_eq!(scope.over(settled.node(), start, end).unwrap(), 240.0, epsilon = 1e-9);
        assert_relative_eq!(scope.at(retained.node(), date(2025, 6, 30)).unwrap(), 130.0, epsilon = 1e-9);
        assert_relative_eq!(scope.at(retained.node(), end).unwrap(), 250.0, epsilon = 1e-9);
        assert_eq!(model.dependencies(profit.node()).len(), 2);
    }

    #[test]
    fn test_proportional_and_changes() {
        let mut builder = ModelBuilder::new("test");
        let root = builder.root();
        let sales = builder.add_accrual(root, "sales", quarterly(100.0)).unwrap();
        let start = date(2024, 12, 31);
        let receivables = builder
            .add_balance(
                root,
                "receivables",
                Proportional {
                    opening: Balance::new(start, 20.0),
                    source: sales,
                    factor: 0.5,
                },
            )
            .unwrap();
        let released = builder
            .add_payment(root, "released", Changes::negated(receivables))
            .unwrap();
        let model = builder.build().unwrap();

        let scope = model.enter_scope();
        assert_eq!(scope.at(receivables.node(), start).unwrap(), 20.0);
        assert_eq!(scope.at(receivables.node(), date(2025, 3, 31)).unwrap(), 50.0);
        // Receivables grow from 20 to 50 and then stay flat.
        assert_eq!(scope.over(released.node(), start, date(2025, 12, 31)).unwrap(), -30.0);
    }

    #[test]
    fn test_balance_total_with_signs() {
        let mut builder = ModelBuilder::new("test");
        let root = builder.root();
        let start = date(2025, 1, 1);
        let assets = builder
            .add_balance(
                root,
                "assets",
                Fixed(BalanceSeries::literal(vec![Balance::new(start, 100.0)]).unwrap()),
            )
            .unwrap();
        let debts = builder
            .add_balance(
                root,
                "debts",
                Fixed(BalanceSeries::literal(vec![Balance::new(date(2025, 2, 1), 30.0)]).unwrap()),
            )
            .unwrap();
        let net = builder
            .add_balance(root, "net", BalanceTotal::new().plus(assets).minus(debts))
            .unwrap();
        let model = builder.build().unwrap();

        let scope = model.enter_scope();
        assert_eq!(scope.at(net.node(), date(2025, 1, 15)).unwrap(), 100.0);
        assert_eq!(scope.at(net.node(), date(2025, 3, 1)).unwrap(), 70.0);
    }
}
