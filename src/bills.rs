//! Allocates utility tariffs into annual delivery bills for converted and unconverted households.
//!
//! All bills are expressed in first-year dollars.
use crate::engine::{YearlyFinancials, electrified_load_kwh};
use crate::finance::to_real_dollars;
use crate::params::InputParams;
use crate::scenario::{Scenario, Utility};
use crate::units::{Dimensionless, Money};
use anyhow::{Result, ensure};
use itertools::Itertools;

/// The annual delivery bill of one household, split by utility
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HouseholdBill {
    /// The gas component
    pub gas: Money,
    /// The electric component
    pub electric: Money,
}

impl HouseholdBill {
    /// The component for the given utility
    pub fn for_utility(&self, utility: Utility) -> Money {
        match utility {
            Utility::Gas => self.gas,
            Utility::Electric => self.electric,
        }
    }

    /// The combined gas and electric bill
    pub fn total(&self) -> Money {
        self.gas + self.electric
    }
}

/// Household bills for one year of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct BillYear {
    /// The calendar year
    pub year: u32,
    /// Households which have left gas for electricity.
    ///
    /// Counts NPA conversions and scattershot electrification together, so it is non-zero in BAU.
    pub num_converts: u64,
    /// Households still on gas
    pub num_nonconverts: u64,
    /// The bill of a converted household
    pub converts: HouseholdBill,
    /// The bill of a household still on gas
    pub nonconverts: HouseholdBill,
}

impl BillYear {
    /// Combined bills of every converted household
    pub fn converts_class_total(&self) -> Money {
        self.converts.total() * Dimensionless(self.num_converts as f64)
    }

    /// Combined bills of every household still on gas
    pub fn nonconverts_class_total(&self) -> Money {
        self.nonconverts.total() * Dimensionless(self.num_nonconverts as f64)
    }
}

/// Household bills for every year of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct BillsByYear {
    /// The scenario
    pub scenario: Scenario,
    /// One entry per year, in order
    pub years: Vec<BillYear>,
}

/// Compute the household bills for a scenario from its gas and electric results.
///
/// Converts use no gas, and use extra electricity for heat pump space and water heating.
pub fn allocate_bills(
    gas: &YearlyFinancials,
    electric: &YearlyFinancials,
    input: &InputParams,
) -> Result<BillsByYear> {
    ensure!(
        gas.utility == Utility::Gas && electric.utility == Utility::Electric,
        "Bills must be allocated from gas and electric results"
    );
    ensure!(
        gas.scenario == electric.scenario,
        "Gas results are for {} but electric results are for {}",
        gas.scenario,
        electric.scenario
    );
    ensure!(
        gas.years.iter().map(|y| y.year).eq(electric.years.iter().map(|y| y.year)),
        "Gas and electric results for {} cover different years",
        gas.scenario
    );

    let Some(base_year) = gas.years.first().map(|y| y.year) else {
        return Ok(BillsByYear {
            scenario: gas.scenario,
            years: Vec::new(),
        });
    };

    let gas_usage = input.gas.per_user_heating_need_therms
        + input.gas.per_user_water_heating_need_therms;
    let electric_usage = input.electric.per_user_electric_need_kwh;
    let convert_usage = electric_usage + electrified_load_kwh(input);
    let real = |value, year| {
        to_real_dollars(
            value,
            year,
            base_year,
            input.shared.real_dollar_discount_rate,
        )
    };

    let years = gas
        .years
        .iter()
        .zip_eq(&electric.years)
        .map(|(g, e)| {
            let nonconverts = HouseholdBill {
                gas: real(
                    input.gas.user_bill_fixed_charge + g.variable_tariff * gas_usage,
                    g.year,
                ),
                electric: real(
                    input.electric.user_bill_fixed_charge + e.variable_tariff * electric_usage,
                    e.year,
                ),
            };
            let converts = HouseholdBill {
                gas: Money(0.0),
                electric: real(
                    input.electric.user_bill_fixed_charge + e.variable_tariff * convert_usage,
                    e.year,
                ),
            };

            BillYear {
                year: g.year,
                num_converts: input.gas.num_users_init.saturating_sub(g.num_users),
                num_nonconverts: g.num_users,
                converts,
                nonconverts,
            }
        })
        .collect();

    Ok(BillsByYear {
        scenario: gas.scenario,
        years,
    })
}
