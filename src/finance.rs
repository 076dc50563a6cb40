//! General functions related to finance.
use crate::units::{Dimensionless, Money};

/// Calculates the compound growth factor `(1 + rate)^periods`.
///
/// Used both to escalate first-year costs and to deflate nominal values into real dollars.
pub fn growth_factor(rate: Dimensionless, periods: i32) -> Dimensionless {
    (Dimensionless(1.0) + rate).powi(periods)
}

/// Express a nominal value from `year` in `base_year` dollars
pub fn to_real_dollars(
    value: Money,
    year: u32,
    base_year: u32,
    real_dollar_discount_rate: Dimensionless,
) -> Money {
    let periods = year as i32 - base_year as i32;
    value / growth_factor(real_dollar_discount_rate, periods)
}

/// Calculates the net present value of a stream of cash flows.
///
/// The first cash flow is taken to occur in the present and is therefore not discounted.
pub fn net_present_value<I>(cash_flows: I, discount_rate: Dimensionless) -> Money
where
    I: IntoIterator<Item = Money>,
{
    cash_flows
        .into_iter()
        .zip(0..)
        .map(|(cash_flow, period)| cash_flow / growth_factor(discount_rate, period))
        .sum()
}

/// The revenue requirement stream generated by capitalising `capital` for `lifetime` years.
///
/// Each year recovers straight-line depreciation plus return and maintenance charged on the
/// book value remaining at the end of the year, matching how the rate base is rolled forward.
pub fn capital_revenue_requirements(
    capital: Money,
    lifetime: u32,
    rate_of_return: Dimensionless,
    maintenance_cost_pct: Dimensionless,
) -> Vec<Money> {
    if lifetime == 0 {
        return Vec::new();
    }

    let annual_depreciation = capital / Dimensionless(lifetime as f64);
    (1..=lifetime)
        .map(|years_elapsed| {
            let book_value = capital - annual_depreciation * Dimensionless(years_elapsed as f64);
            annual_depreciation + book_value * (rate_of_return + maintenance_cost_pct)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 5, 1.0)]
    #[case(0.1, 2, 1.21)]
    #[case(0.05, 0, 1.0)]
    #[case(0.1, -1, 0.9090909090909091)]
    fn test_growth_factor(#[case] rate: f64, #[case] periods: i32, #[case] expected: f64) {
        let result = growth_factor(Dimensionless(rate), periods);
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(110.0, 2026, 2025, 0.1, 100.0)]
    #[case(100.0, 2025, 2025, 0.1, 100.0)]
    #[case(121.0, 2027, 2025, 0.1, 100.0)]
    fn test_to_real_dollars(
        #[case] value: f64,
        #[case] year: u32,
        #[case] base_year: u32,
        #[case] rate: f64,
        #[case] expected: f64,
    ) {
        let result = to_real_dollars(Money(value), year, base_year, Dimensionless(rate));
        assert_approx_eq!(Money, result, Money(expected), epsilon = 1e-9);
    }

    #[test]
    fn test_net_present_value() {
        let flows = [Money(100.0), Money(110.0), Money(121.0)];
        let npv = net_present_value(flows, Dimensionless(0.1));
        assert_approx_eq!(Money, npv, Money(300.0), epsilon = 1e-9);
    }

    #[test]
    fn test_net_present_value_empty() {
        assert_eq!(
            net_present_value(std::iter::empty(), Dimensionless(0.1)),
            Money(0.0)
        );
    }

    #[test]
    fn test_capital_revenue_requirements() {
        // 100 over 4 years at 10% return, no maintenance
        let stream = capital_revenue_requirements(
            Money(100.0),
            4,
            Dimensionless(0.1),
            Dimensionless(0.0),
        );
        let expected = [Money(32.5), Money(30.0), Money(27.5), Money(25.0)];
        assert_eq!(stream.len(), expected.len());
        for (actual, expected) in stream.into_iter().zip(expected) {
            assert_approx_eq!(Money, actual, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_capital_revenue_requirements_zero_lifetime() {
        assert!(
            capital_revenue_requirements(Money(100.0), 0, Dimensionless(0.1), Dimensionless(0.0))
                .is_empty()
        );
    }
}
