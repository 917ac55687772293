//! Property-based tests for the series algebra.
//!
//! These check the laws every projection relies on:
//! - Addition is commutative and associative, element by element
//! - Accrued totals over adjacent windows add up to the total over their union
//! - Summation never changes the total accrued over a window
//! - Balance lookups follow step-function semantics

use approx::assert_relative_eq;
use proptest::prelude::*;
use tally_core::prelude::*;

// =============================================================================
// GENERATORS
// =============================================================================

fn anchor() -> Date {
    Date::from_ymd(2023, 12, 31).unwrap()
}

fn accruals(frequency: Frequency, values: &[f64], convention: DayCountConvention) -> AccrualSeries {
    let periods = Period::series(anchor(), frequency, DateRoll::MonthEnd);
    AccrualSeries::literal(
        periods
            .zip(values.iter())
            .map(|(period, value)| Accrual::new(period, *value, convention))
            .collect(),
    )
    .unwrap()
}

/// Back-to-back accruals starting `start` days after the anchor, one per
/// `(length in days, value)` piece.
fn ragged(start: i64, pieces: &[(i64, f64)], convention: DayCountConvention) -> AccrualSeries {
    let mut from = anchor().add_days(start);
    let mut items = Vec::with_capacity(pieces.len());
    for (len, value) in pieces {
        let to = from.add_days(*len);
        items.push(Accrual::new(Period::new(from, to).unwrap(), *value, convention));
        from = to;
    }
    AccrualSeries::literal(items).unwrap()
}

fn elements(series: &AccrualSeries) -> Vec<(Period, f64)> {
    series
        .iterate()
        .map(|item| item.and_then(|a| Ok((a.period(), a.value()?))))
        .collect::<TallyResult<Vec<_>>>()
        .unwrap()
}

fn assert_same_elements(left: &AccrualSeries, right: &AccrualSeries) {
    let (left, right) = (elements(left), elements(right));
    assert_eq!(left.len(), right.len());
    for ((lp, lv), (rp, rv)) in left.iter().zip(right.iter()) {
        assert_eq!(lp, rp);
        assert_relative_eq!(*lv, *rv, epsilon = 1e-9, max_relative = 1e-12);
    }
}

fn payments(points: &[(i64, f64)]) -> PaymentSeries {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(offset, _)| *offset);
    PaymentSeries::literal(
        sorted
            .into_iter()
            .map(|(offset, value)| Payment::new(anchor().add_days(offset), value))
            .collect(),
    )
    .unwrap()
}

fn amounts(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1_000.0..1_000.0f64, 1..len)
}

fn cash_points() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((1i64..400, -500.0..500.0f64), 0..12)
}

fn pieces() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((1i64..120, -1_000.0..1_000.0f64), 1..6)
}

fn convention() -> impl Strategy<Value = DayCountConvention> {
    prop::sample::select(DayCountConvention::all().to_vec())
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_payment_sum_is_commutative(a in cash_points(), b in cash_points(), end in 1i64..450) {
        let (a, b) = (payments(&a), payments(&b));
        let end = anchor().add_days(end);
        let left = (a.clone() + b.clone()).over(anchor(), end).unwrap();
        let right = (b + a).over(anchor(), end).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_accrual_sum_is_commutative(
        a in amounts(8),
        b in amounts(4),
        c1 in convention(),
        c2 in convention(),
        offset in 1i64..700,
    ) {
        let a = accruals(Frequency::Quarterly, &a, c1);
        let b = accruals(Frequency::SemiAnnual, &b, c2);
        let end = anchor().add_days(offset);
        let left = (a.clone() + b.clone()).accrue(anchor(), end).unwrap();
        let right = (b + a).accrue(anchor(), end).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_accrual_sum_is_associative(
        a in pieces(),
        b in pieces(),
        c in pieces(),
        starts in (0i64..60, 0i64..60, 0i64..60),
        conventions in (convention(), convention(), convention()),
        offset in 1i64..400,
    ) {
        let a = ragged(starts.0, &a, conventions.0);
        let b = ragged(starts.1, &b, conventions.1);
        let c = ragged(starts.2, &c, conventions.2);

        let left = (a.clone() + b.clone()) + c.clone();
        let right = a.clone() + (b.clone() + c.clone());
        let flat = AccrualSeries::sum([a, b, c]);
        assert_same_elements(&left, &right);
        assert_same_elements(&left, &flat);

        let end = anchor().add_days(offset);
        let mid = anchor().add_days(offset / 2);
        assert_relative_eq!(
            left.accrue(mid, end).unwrap(),
            right.accrue(mid, end).unwrap(),
            epsilon = 1e-9,
            max_relative = 1e-12
        );
    }

    #[test]
    fn prop_windows_are_additive(
        values in amounts(8),
        conv in convention(),
        cut in 0i64..400,
        extra in 0i64..400,
    ) {
        let series = accruals(Frequency::Quarterly, &values, conv);
        let mid = anchor().add_days(cut);
        let end = mid.add_days(extra);
        let whole = series.accrue(anchor(), end).unwrap();
        let parts = series.accrue(anchor(), mid).unwrap() + series.accrue(mid, end).unwrap();
        assert_relative_eq!(whole, parts, epsilon = 1e-6, max_relative = 1e-9);
    }

    #[test]
    fn prop_sum_preserves_window_totals(
        a in amounts(8),
        b in amounts(4),
        conv in convention(),
        start in 0i64..200,
        len in 0i64..500,
    ) {
        let a = accruals(Frequency::Quarterly, &a, conv);
        let b = accruals(Frequency::SemiAnnual, &b, conv);
        let start = anchor().add_days(start);
        let end = start.add_days(len);
        let combined = (a.clone() + b.clone()).accrue(start, end).unwrap();
        let separate = a.accrue(start, end).unwrap() + b.accrue(start, end).unwrap();
        assert_relative_eq!(combined, separate, epsilon = 1e-6, max_relative = 1e-9);
    }

    #[test]
    fn prop_balance_is_a_step_function(points in cash_points(), probe in 1i64..450) {
        let mut sorted = points;
        sorted.sort_by_key(|(offset, _)| *offset);
        sorted.dedup_by_key(|(offset, _)| *offset);
        let balances = BalanceSeries::literal(
            sorted
                .iter()
                .map(|(offset, value)| Balance::new(anchor().add_days(*offset), *value))
                .collect(),
        )
        .unwrap();

        let date = anchor().add_days(probe);
        let expected = sorted.iter().rev().find(|(offset, _)| *offset <= probe).map(|(_, v)| *v);
        match expected {
            Some(value) => prop_assert_eq!(balances.at(date).unwrap(), value),
            None => prop_assert!(balances.at(date).is_err()),
        }
    }

    #[test]
    fn prop_attribution_round_trips(
        start in 0i64..400,
        len in 2i64..800,
        split in 0.0..1.0f64,
        value in -1_000.0..1_000.0f64,
        conv in convention(),
    ) {
        let from = anchor().add_days(start);
        let period = Period::new(from, from.add_days(len)).unwrap();
        let accrual = Accrual::new(period, value, conv);
        prop_assert_eq!(accrual.attributed_value(&period).unwrap(), value);

        let at = from.add_days(1 + ((len - 1) as f64 * split) as i64);
        let (left, right) = period.split(at).unwrap();
        let halves =
            accrual.attributed_value(&left).unwrap() + accrual.attributed_value(&right).unwrap();
        assert_relative_eq!(halves, value, epsilon = 1e-9, max_relative = 1e-12);
    }

    #[test]
    fn prop_day_count_names_round_trip(conv in convention()) {
        let parsed: DayCountConvention = conv.name().parse().unwrap();
        prop_assert_eq!(parsed, conv);
    }

    #[test]
    fn prop_cmonthly_month_end_steps_are_exact(months in 1i32..120) {
        let end = anchor().add_months_to_month_end(months).unwrap();
        let yf = DayCountConvention::CalendarMonthly.year_fraction(anchor(), end);
        assert_relative_eq!(yf, f64::from(months) / 12.0, epsilon = 1e-12);
    }
}
