//! General functions related to finance: annuities and discounting.
use crate::units::{Dimensionless, MoneyPerPower};

/// The annuity factor used to spread an up-front capital cost over an asset's lifetime.
///
/// Calculated as `wacc / (1 + wacc - (1 + wacc)^(1 - lifetime))`. A zero WACC gives straight-line
/// annualisation and a zero lifetime gives no annual cost.
pub fn annuity_factor(wacc: Dimensionless, lifetime: f64) -> Dimensionless {
    if lifetime <= 0.0 {
        return Dimensionless(0.0);
    }
    if wacc == Dimensionless(0.0) {
        return Dimensionless(1.0 / lifetime);
    }

    let one = Dimensionless(1.0);
    wacc / (one + wacc - (one + wacc).powf(1.0 - lifetime))
}

/// The annual cost of one unit of capacity: annuitised capital cost plus fixed O&M
pub fn annualised_cost(
    capital_cost: MoneyPerPower,
    fixed_om_cost: MoneyPerPower,
    wacc: Dimensionless,
    lifetime: f64,
) -> MoneyPerPower {
    capital_cost * annuity_factor(wacc, lifetime) + fixed_om_cost
}

/// Sum of discount factors over the years of an asset's remaining life within the horizon.
///
/// An asset built in `period` contributes annual costs for `min(L·(N - period + 1), lifetime)`
/// years, where `N` is the number of periods and `L` the number of years per period. The factor
/// is `(1 - (1+r)^-years) / (1 - 1/(1+r))`.
pub fn remaining_life_factor(
    discount_rate: Dimensionless,
    years_per_period: u32,
    num_periods: u32,
    period: u32,
    lifetime: f64,
) -> Dimensionless {
    let years_in_horizon = f64::from(years_per_period * (num_periods - period + 1));
    let years = years_in_horizon.min(lifetime);
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(years);
    }

    let one = Dimensionless(1.0);
    (one - (one + discount_rate).powf(-years)) / (one - one / (one + discount_rate))
}

/// Sum of annual discount factors within one period: `Σ_{j=0..L-1} (1+r)^-j`.
///
/// Operational costs are calculated for a representative year and scaled by this factor to cover
/// every year of the period.
pub fn operational_discount(discount_rate: Dimensionless, years_per_period: u32) -> Dimensionless {
    let one = Dimensionless(1.0);
    let sum = (0..years_per_period)
        .map(|j| (one + discount_rate).powi(-(j as i32)).value())
        .sum();

    Dimensionless(sum)
}

/// The factor discounting costs in the given period back to the first year of the horizon.
///
/// `(1+r)^(-L·(period-1))`, with periods numbered from 1.
pub fn discount_multiplier(
    discount_rate: Dimensionless,
    years_per_period: u32,
    period: u32,
) -> Dimensionless {
    let exponent = -((years_per_period * (period - 1)) as i32);
    (Dimensionless(1.0) + discount_rate).powi(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.05, 0.0, 0.0)] // Edge case: lifetime==0
    #[case(0.0, 10.0, 0.1)] // Other edge case: wacc==0
    #[case(0.05, 1.0, 1.0)] // Single year: 0.05 / (1.05 - 1)
    #[case(0.05, 40.0, 0.05 / (1.05 - 1.05_f64.powf(-39.0)))]
    fn test_annuity_factor(#[case] wacc: f64, #[case] lifetime: f64, #[case] expected: f64) {
        let result = annuity_factor(Dimensionless(wacc), lifetime);
        assert_approx_eq!(f64, result.value(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_annualised_cost() {
        let result = annualised_cost(
            MoneyPerPower(1000.0),
            MoneyPerPower(20.0),
            Dimensionless(0.0),
            20.0,
        );
        assert_approx_eq!(MoneyPerPower, result, MoneyPerPower(70.0));
    }

    #[rstest]
    #[case(0.0, 5, 3, 1, 40.0, 15.0)] // Horizon shorter than lifetime
    #[case(0.0, 5, 3, 1, 10.0, 10.0)] // Lifetime shorter than horizon
    #[case(0.0, 5, 3, 3, 40.0, 5.0)] // Last period
    #[case(0.05, 1, 1, 1, 40.0, 1.0)] // One year of costs is undiscounted
    #[case(0.05, 2, 1, 1, 40.0, 1.0 + 1.0 / 1.05)]
    fn test_remaining_life_factor(
        #[case] rate: f64,
        #[case] years_per_period: u32,
        #[case] num_periods: u32,
        #[case] period: u32,
        #[case] lifetime: f64,
        #[case] expected: f64,
    ) {
        let result = remaining_life_factor(
            Dimensionless(rate),
            years_per_period,
            num_periods,
            period,
            lifetime,
        );
        assert_approx_eq!(f64, result.value(), expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(0.05, 1, 1.0)]
    #[case(0.0, 5, 5.0)]
    #[case(0.05, 3, 1.0 + 1.0 / 1.05 + 1.0 / (1.05 * 1.05))]
    fn test_operational_discount(
        #[case] rate: f64,
        #[case] years_per_period: u32,
        #[case] expected: f64,
    ) {
        let result = operational_discount(Dimensionless(rate), years_per_period);
        assert_approx_eq!(f64, result.value(), expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(1, 1.0)]
    #[case(2, 1.05_f64.powi(-5))]
    #[case(3, 1.05_f64.powi(-10))]
    fn test_discount_multiplier(#[case] period: u32, #[case] expected: f64) {
        let result = discount_multiplier(Dimensionless(0.05), 5, period);
        assert_approx_eq!(f64, result.value(), expected, epsilon = 1e-12);
    }
}
