//! Recoverable, out-of-domain conditions encountered while building a model run.
//!
//! These are not errors: the model clamps the offending value to a sensible floor or ceiling and
//! carries on, returning the warnings alongside its results.
use crate::scenario::{Scenario, Utility};
use crate::units::{Money, MoneyPerEnergy};
use derive_more::Display;
use log::warn;

/// A recoverable problem with a model run
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ModelWarning {
    /// More households are converted by NPAs each year than there are gas customers
    #[display(
        "NPA households per year ({per_year}) exceeds initial gas users ({gas_users}). \
        This may lead to unrealistic results."
    )]
    NpaHouseholdsExceedGasUsers {
        /// Households converted each year
        per_year: u64,
        /// Initial gas customers
        gas_users: u64,
    },
    /// Cumulative conversions were capped at the number of gas customers
    #[display(
        "{year}: requested {requested} cumulative conversions but only {available} gas \
        customers are available; conversions capped"
    )]
    ConversionsExceedCustomers {
        /// The year in which the cap was first applied
        year: u32,
        /// Cumulative conversions requested (NPA plus scattershot)
        requested: u64,
        /// Initial gas customers
        available: u64,
    },
    /// The avoided pipe value exceeded the BAU leak-prone pipe spend
    #[display(
        "{scenario} {year}: avoided pipe value ({avoided}) exceeds BAU LPP spend ({lpp}); \
        LPP spend floored at zero"
    )]
    AvoidedPipeExceedsSpend {
        /// The scenario
        scenario: Scenario,
        /// The year
        year: u32,
        /// Requested avoided pipe value
        avoided: Money,
        /// BAU leak-prone pipe spend for the year
        lpp: Money,
    },
    /// The rate base was driven negative and clamped to zero
    #[display("{scenario} {utility} {year}: rate base would be {value}; clamped to zero")]
    NegativeRatebase {
        /// The scenario
        scenario: Scenario,
        /// The utility
        utility: Utility,
        /// The year
        year: u32,
        /// The unclamped rate base
        value: Money,
    },
    /// Fixed charges recovered more than the revenue requirement
    #[display(
        "{scenario} {utility} {year}: volumetric tariff would be {tariff}; clamped to zero"
    )]
    NegativeTariff {
        /// The scenario
        scenario: Scenario,
        /// The utility
        utility: Utility,
        /// The year
        year: u32,
        /// The unclamped tariff
        tariff: MoneyPerEnergy,
    },
    /// There were no volumetric sales over which to spread the revenue requirement
    #[display("{scenario} {utility} {year}: no volumetric sales; tariff set to zero")]
    NoVolumetricSales {
        /// The scenario
        scenario: Scenario,
        /// The utility
        utility: Utility,
        /// The year
        year: u32,
    },
}

/// Write each warning to the log
pub fn log_warnings<'a, I>(warnings: I)
where
    I: IntoIterator<Item = &'a ModelWarning>,
{
    for warning in warnings {
        warn!("{warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let warning = ModelWarning::NegativeRatebase {
            scenario: Scenario::GasCapex,
            utility: Utility::Gas,
            year: 2030,
            value: Money(-5.0),
        };
        assert_eq!(
            warning.to_string(),
            "gas_capex gas 2030: rate base would be -5; clamped to zero"
        );
    }
}
