//! The fixed set of cost-recovery scenarios which are simulated.
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A type of utility
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Utility {
    /// The gas distribution utility
    Gas,
    /// The electric distribution utility
    Electric,
}

/// How a utility recovers NPA spending
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    DeserializeLabeledStringEnum,
)]
#[strum(serialize_all = "snake_case")]
pub enum Treatment {
    /// Capitalised on the rate base and depreciated
    #[string = "capex"]
    Capex,
    /// Expensed in the year incurred
    #[string = "opex"]
    Opex,
}

/// A cost-recovery scenario.
///
/// The order of the variants is the order in which scenarios are enumerated and reported.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Business as usual: no NPA projects
    Bau,
    /// The gas utility capitalises NPA costs
    GasCapex,
    /// The gas utility expenses NPA costs
    GasOpex,
    /// The electric utility capitalises NPA costs
    ElectricCapex,
    /// The electric utility expenses NPA costs
    ElectricOpex,
    /// NPA costs are paid from public funds
    Taxpayer,
    /// The gas utility earns a return on a share of the net savings
    PerformanceIncentive,
}

impl Scenario {
    /// Build the scenario in which `utility` pays for NPAs with the given treatment
    pub fn from_payer(utility: Utility, treatment: Treatment) -> Self {
        match (utility, treatment) {
            (Utility::Gas, Treatment::Capex) => Self::GasCapex,
            (Utility::Gas, Treatment::Opex) => Self::GasOpex,
            (Utility::Electric, Treatment::Capex) => Self::ElectricCapex,
            (Utility::Electric, Treatment::Opex) => Self::ElectricOpex,
        }
    }

    /// Whether NPA projects are carried out in this scenario
    pub fn has_npa(self) -> bool {
        self != Self::Bau
    }

    /// The identifier used as a join key in result tables
    pub fn id(self) -> String {
        self.to_string()
    }
}

/// A single simulation instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioRun {
    /// The scenario
    pub scenario: Scenario,
    /// The first year simulated
    pub start_year: u32,
    /// The year after the last year simulated
    pub end_year: u32,
}

impl ScenarioRun {
    /// The utility paying for NPAs, if a utility does.
    ///
    /// For the performance incentive scenario this is the gas utility, which is the utility
    /// receiving the incentive.
    pub fn utility(&self) -> Option<Utility> {
        match self.scenario {
            Scenario::GasCapex | Scenario::GasOpex | Scenario::PerformanceIncentive => {
                Some(Utility::Gas)
            }
            Scenario::ElectricCapex | Scenario::ElectricOpex => Some(Utility::Electric),
            Scenario::Bau | Scenario::Taxpayer => None,
        }
    }

    /// The treatment of NPA costs by the paying utility, if fixed by the scenario
    pub fn treatment(&self) -> Option<Treatment> {
        match self.scenario {
            Scenario::GasCapex | Scenario::ElectricCapex => Some(Treatment::Capex),
            Scenario::GasOpex | Scenario::ElectricOpex => Some(Treatment::Opex),
            Scenario::Bau | Scenario::Taxpayer | Scenario::PerformanceIncentive => None,
        }
    }

    /// The scenario identifier, e.g. `gas_capex`
    pub fn scenario_id(&self) -> String {
        self.scenario.id()
    }

    /// Iterate over the years of this run
    pub fn years(&self) -> std::ops::Range<u32> {
        self.start_year..self.end_year
    }
}

/// Enumerate the scenarios to simulate.
///
/// Produces the baseline, the cross product of `utilities` and `treatments`, and the taxpayer and
/// performance incentive scenarios. Duplicate inputs are ignored and the output is always in
/// [`Scenario`] order.
pub fn enumerate_scenarios(
    start_year: u32,
    end_year: u32,
    utilities: &[Utility],
    treatments: &[Treatment],
) -> Result<Vec<ScenarioRun>> {
    ensure!(
        end_year > start_year,
        "End year ({end_year}) must be after start year ({start_year})"
    );

    let wanted = |scenario: &Scenario| match scenario {
        Scenario::Bau | Scenario::Taxpayer | Scenario::PerformanceIncentive => true,
        _ => utilities.iter().any(|&utility| {
            treatments
                .iter()
                .any(|&treatment| Scenario::from_payer(utility, treatment) == *scenario)
        }),
    };

    Ok(Scenario::iter()
        .filter(wanted)
        .map(|scenario| ScenarioRun {
            scenario,
            start_year,
            end_year,
        })
        .collect())
}

/// Enumerate every scenario for both utilities and both treatments
pub fn enumerate_all_scenarios(start_year: u32, end_year: u32) -> Result<Vec<ScenarioRun>> {
    let utilities: Vec<_> = Utility::iter().collect();
    let treatments: Vec<_> = Treatment::iter().collect();
    enumerate_scenarios(start_year, end_year, &utilities, &treatments)
}
