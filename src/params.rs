//! Defines the parameter bundles for a model run, which represent the contents of a model file.
//!
//! A model file is a single TOML document with a `[gas]`, `[electric]`, `[shared]` and
//! `[web_params]` section, plus an optional `[performance_incentive]` section. Percentage fields
//! are written as values between 0 and 100 and are converted into proportions on load.
use crate::input::{deserialise_percent, input_err_msg, read_toml};
use crate::scenario::Treatment;
use crate::units::{Dimensionless, Energy, Money, MoneyPerPower, Power};
use crate::warning::ModelWarning;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

pub mod registry;
use registry::check_parameter_bounds;

/// Static assumptions for the gas utility
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GasParams {
    /// Number of gas customers in the first year
    pub num_users_init: u64,
    /// Gas rate base in the first year
    pub ratebase_init: Money,
    /// Allowed rate of return on the rate base
    #[serde(deserialize_with = "deserialise_percent")]
    pub ror: Dimensionless,
    /// Remaining depreciation lifetime of the initial rate base, in years
    pub default_depreciation_lifetime: u32,
    /// Depreciation lifetime of replaced leak-prone pipe, in years
    pub pipeline_depreciation_lifetime: u32,
    /// Depreciation lifetime of non-LPP baseline investment, in years
    pub non_lpp_depreciation_lifetime: u32,
    /// Annual non-LPP capital investment as a proportion of the initial rate base
    #[serde(deserialize_with = "deserialise_percent")]
    pub baseline_non_lpp_ratebase_growth: Dimensionless,
    /// Annual maintenance cost as a proportion of the rate base
    #[serde(deserialize_with = "deserialise_percent")]
    pub pipeline_maintenance_cost_pct: Dimensionless,
    /// Annual space heating need per customer, in therms
    pub per_user_heating_need_therms: Energy,
    /// Annual water heating need per customer, in therms
    pub per_user_water_heating_need_therms: Energy,
    /// Annual fixed charge per customer
    pub user_bill_fixed_charge: Money,
}

/// Static assumptions for the electric utility
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ElectricParams {
    /// Number of electric customers in the first year
    pub num_users_init: u64,
    /// Electric rate base in the first year
    pub ratebase_init: Money,
    /// Allowed rate of return on the rate base
    #[serde(deserialize_with = "deserialise_percent")]
    pub ror: Dimensionless,
    /// Remaining depreciation lifetime of the initial rate base and of baseline investment
    pub default_depreciation_lifetime: u32,
    /// Depreciation lifetime of distribution grid upgrades, in years
    pub grid_upgrade_depreciation_lifetime: u32,
    /// Annual non-NPA capital investment as a proportion of the initial rate base
    #[serde(deserialize_with = "deserialise_percent")]
    pub baseline_non_npa_ratebase_growth: Dimensionless,
    /// Annual maintenance cost as a proportion of the rate base
    #[serde(deserialize_with = "deserialise_percent")]
    pub electric_maintenance_cost_pct: Dimensionless,
    /// Cost of each kW of peak demand above the grid's headroom, in first-year dollars
    pub distribution_cost_per_peak_kw_increase_init: MoneyPerPower,
    /// Heat pump coefficient of performance
    pub hp_efficiency: Dimensionless,
    /// Electric water heater efficiency (coefficient of performance for heat pump water heaters)
    pub water_heater_efficiency: Dimensionless,
    /// Peak winter demand added by one heat pump, in kW
    pub hp_peak_kw: Power,
    /// Peak summer demand of one household air conditioner, in kW
    pub aircon_peak_kw: Power,
    /// Annual electricity need per customer before electrification, in kWh
    pub per_user_electric_need_kwh: Energy,
    /// Annual fixed charge per customer
    pub user_bill_fixed_charge: Money,
}

/// Assumptions shared by both utilities
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SharedParams {
    /// The first year of the analysis; real-dollar figures are expressed in this year's dollars
    pub start_year: u32,
    /// Annual escalation of operating costs
    #[serde(deserialize_with = "deserialise_percent")]
    pub cost_inflation_rate: Dimensionless,
    /// Annual escalation of capital costs
    #[serde(deserialize_with = "deserialise_percent")]
    pub construction_inflation_rate: Dimensionless,
    /// Discount rate used to express nominal dollars in start-year dollars
    #[serde(deserialize_with = "deserialise_percent")]
    pub real_dollar_discount_rate: Dimensionless,
    /// Discount rate used when valuing NPA savings for the performance incentive
    #[serde(deserialize_with = "deserialise_percent")]
    pub npv_discount_rate: Dimensionless,
    /// Share of net NPA savings the gas utility may capitalise as an incentive
    #[serde(deserialize_with = "deserialise_percent")]
    pub performance_incentive_pct: Dimensionless,
    /// Number of years over which the incentive is recovered
    pub incentive_payback_period: u32,
    /// Cost of electrifying one household, in first-year dollars
    pub npa_install_costs_init: Money,
    /// Depreciation lifetime of capitalised NPA costs, in years
    pub npa_lifetime: u32,
}

/// Inputs which size the NPA program and the surrounding electrification
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WebParams {
    /// Number of NPA projects carried out each year of the program
    pub npa_num_projects: u64,
    /// Number of households converted by each NPA project
    pub num_converts: u64,
    /// Value of the pipe replacement avoided per converted household, in first-year dollars
    pub pipe_value_per_user: Money,
    /// Cost of decommissioning pipe per converted household, in first-year dollars
    #[serde(default)]
    pub pipe_decomm_cost_per_user: Money,
    /// Unused peak winter capacity on the electric grid, in kW
    pub peak_kw_winter_headroom: Power,
    /// Unused peak summer capacity on the electric grid, in kW
    pub peak_kw_summer_headroom: Power,
    /// Proportion of households which already have air conditioning
    #[serde(deserialize_with = "deserialise_percent")]
    pub aircon_percent_adoption_pre_npa: Dimensionless,
    /// Households leaving gas each year independently of the NPA program
    pub scattershot_electrification_users_per_year: u64,
    /// Gas utility fixed overhead costs, in first-year dollars
    pub gas_fixed_overhead_costs: Money,
    /// Electric utility fixed overhead costs, in first-year dollars
    pub electric_fixed_overhead_costs: Money,
    /// Annual spend on leak-prone pipe replacement under business as usual, in first-year dollars
    pub gas_bau_lpp_costs_per_year: Money,
    /// First year of the NPA program (inclusive)
    pub npa_year_start: u32,
    /// Last year of the NPA program (inclusive)
    pub npa_year_end: u32,
    /// Whether converted households are scattered, so that no pipe can be retired
    #[serde(default)]
    pub is_scattershot: bool,
}

impl WebParams {
    /// Households converted by NPA projects in each year of the program, if representable
    pub fn npa_households_per_year(&self) -> Option<u64> {
        self.npa_num_projects.checked_mul(self.num_converts)
    }
}

/// What counts as the savings on which the performance incentive is paid
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default)]
pub enum SavingsBasis {
    /// Present value of the revenue requirement the avoided pipe would have generated
    #[default]
    #[string = "revenue_requirement"]
    RevenueRequirement,
    /// The avoided capital cost itself
    #[string = "capital_cost"]
    CapitalCost,
}

/// The period over which the performance incentive is recovered
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default)]
pub enum RecoveryPeriod {
    /// `shared.incentive_payback_period`
    #[default]
    #[string = "incentive_payback"]
    IncentivePayback,
    /// `shared.npa_lifetime`
    #[string = "npa_lifetime"]
    NpaLifetime,
}

/// How the performance incentive scenario is computed
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IncentiveFormula {
    /// The definition of savings
    #[serde(default)]
    pub savings_basis: SavingsBasis,
    /// The recovery period for the incentive
    #[serde(default)]
    pub recovery_period: RecoveryPeriod,
    /// How the gas utility carries the NPA costs themselves
    #[serde(default = "default_incentive_npa_treatment")]
    pub npa_cost_treatment: Treatment,
}

fn default_incentive_npa_treatment() -> Treatment {
    Treatment::Opex
}

impl Default for IncentiveFormula {
    fn default() -> Self {
        Self {
            savings_basis: SavingsBasis::default(),
            recovery_period: RecoveryPeriod::default(),
            npa_cost_treatment: default_incentive_npa_treatment(),
        }
    }
}

impl IncentiveFormula {
    /// The number of years over which incentive capital is depreciated
    pub fn recovery_lifetime(&self, shared: &SharedParams) -> u32 {
        match self.recovery_period {
            RecoveryPeriod::IncentivePayback => shared.incentive_payback_period,
            RecoveryPeriod::NpaLifetime => shared.npa_lifetime,
        }
    }
}

/// The parameters consumed by the financial engine
#[derive(Debug, Clone, PartialEq)]
pub struct InputParams {
    /// Gas utility assumptions
    pub gas: GasParams,
    /// Electric utility assumptions
    pub electric: ElectricParams,
    /// Shared assumptions
    pub shared: SharedParams,
    /// The performance incentive formula
    pub incentive: IncentiveFormula,
}

/// The raw contents of a model file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    #[serde(default)]
    run_name: Option<String>,
    #[serde(default)]
    description: String,
    end_year: u32,
    gas: GasParams,
    electric: ElectricParams,
    shared: SharedParams,
    web_params: WebParams,
    #[serde(default)]
    performance_incentive: IncentiveFormula,
}

/// Represents the contents of an entire model file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    /// The name of this run
    pub run_name: String,
    /// A description of the run
    pub description: String,
    /// The final year of the analysis (inclusive)
    pub end_year: u32,
    /// Utility and shared assumptions
    pub input: InputParams,
    /// NPA program sizing
    pub web: WebParams,
}

impl ModelParameters {
    /// Read a model file from the specified path.
    ///
    /// If the file does not specify `run_name`, the file stem is used instead.
    ///
    /// # Returns
    ///
    /// The model parameters or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(file_path: P) -> Result<ModelParameters> {
        let file_path = file_path.as_ref();
        let file: ModelFile = read_toml(file_path)?;
        let run_name = file.run_name.clone().unwrap_or_else(|| {
            file_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let params = Self::from_file(run_name, file);
        params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(params)
    }

    /// Read a model from a TOML string
    pub fn from_toml_str(run_name: &str, toml_str: &str) -> Result<ModelParameters> {
        let file: ModelFile = toml::from_str(toml_str)?;
        let run_name = file.run_name.clone().unwrap_or_else(|| run_name.to_string());
        let params = Self::from_file(run_name, file);
        params.validate()?;

        Ok(params)
    }

    fn from_file(run_name: String, file: ModelFile) -> Self {
        Self {
            run_name,
            description: file.description,
            end_year: file.end_year,
            input: InputParams {
                gas: file.gas,
                electric: file.electric,
                shared: file.shared,
                incentive: file.performance_incentive,
            },
            web: file.web_params,
        }
    }

    /// The analysis years as a start year and an exclusive end year
    pub fn analysis_years(&self) -> (u32, u32) {
        (self.input.shared.start_year, self.end_year + 1)
    }

    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        check_parameter_bounds(self)?;
        check_analysis_period(self.input.shared.start_year, self.end_year)?;
        check_npa_window(&self.web)?;
        check_npa_program_size(&self.web)?;
        check_efficiencies(&self.input.electric)?;
        check_rates(&self.input.shared)?;

        Ok(())
    }

    /// Recoverable problems with the parameters which don't prevent a run
    pub fn warnings(&self) -> Vec<ModelWarning> {
        let per_year = self.web.npa_households_per_year().unwrap_or(u64::MAX);
        let gas_users = self.input.gas.num_users_init;
        if per_year > gas_users {
            vec![ModelWarning::NpaHouseholdsExceedGasUsers {
                per_year,
                gas_users,
            }]
        } else {
            Vec::new()
        }
    }
}

/// Check that the analysis period covers at least one year
fn check_analysis_period(start_year: u32, end_year: u32) -> Result<()> {
    ensure!(
        end_year >= start_year,
        "`end_year` ({end_year}) must not be before `shared.start_year` ({start_year})"
    );

    Ok(())
}

/// Check that the NPA program window is in order
fn check_npa_window(web: &WebParams) -> Result<()> {
    ensure!(
        web.npa_year_start <= web.npa_year_end,
        "`web_params.npa_year_start` ({}) must not be after `web_params.npa_year_end` ({})",
        web.npa_year_start,
        web.npa_year_end
    );

    Ok(())
}

/// Check that the households converted each year fit in a household count
fn check_npa_program_size(web: &WebParams) -> Result<()> {
    ensure!(
        web.npa_households_per_year().is_some(),
        "`web_params.npa_num_projects` ({}) times `web_params.num_converts` ({}) is too large",
        web.npa_num_projects,
        web.num_converts
    );

    Ok(())
}

/// Check that appliance efficiencies are usable as divisors
fn check_efficiencies(electric: &ElectricParams) -> Result<()> {
    ensure!(
        electric.hp_efficiency > Dimensionless(0.0),
        "`electric.hp_efficiency` must be greater than zero"
    );
    ensure!(
        electric.water_heater_efficiency > Dimensionless(0.0),
        "`electric.water_heater_efficiency` must be greater than zero"
    );

    Ok(())
}

/// Check that escalation and discount rates are above -100%
fn check_rates(shared: &SharedParams) -> Result<()> {
    for (name, rate) in [
        ("shared.cost_inflation_rate", shared.cost_inflation_rate),
        (
            "shared.construction_inflation_rate",
            shared.construction_inflation_rate,
        ),
        (
            "shared.real_dollar_discount_rate",
            shared.real_dollar_discount_rate,
        ),
        ("shared.npv_discount_rate", shared.npv_discount_rate),
    ] {
        check_rate(name, rate)?;
    }

    Ok(())
}

/// Check that a single rate is greater than -100%
pub fn check_rate(name: &str, rate: Dimensionless) -> Result<()> {
    ensure!(
        rate.is_finite() && rate > Dimensionless(-1.0),
        "`{name}` must be greater than -100%"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{SAMPLE_MODEL_TOML, assert_error, model_parameters};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[rstest]
    fn test_from_toml_str_converts_percentages(model_parameters: ModelParameters) {
        // 8% in the file
        assert_approx_eq!(
            Dimensionless,
            model_parameters.input.gas.ror,
            Dimensionless(0.08)
        );
        assert_eq!(model_parameters.run_name, "sample");
        assert_eq!(model_parameters.analysis_years(), (2025, 2051));
    }

    #[test]
    fn test_from_path_uses_file_stem() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("my_run.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            // Drop the run name so the stem is used
            let contents = SAMPLE_MODEL_TOML.replace("run_name = \"sample\"\n", "");
            write!(file, "{contents}").unwrap();
        }

        let params = ModelParameters::from_path(&file_path).unwrap();
        assert_eq!(params.run_name, "my_run");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let contents = SAMPLE_MODEL_TOML.replace("[gas]\n", "[gas]\nnot_a_field = 1\n");
        assert!(ModelParameters::from_toml_str("x", &contents).is_err());
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let contents =
            SAMPLE_MODEL_TOML.replace("npa_num_projects = 10", "npa_num_projects = -10");
        assert!(ModelParameters::from_toml_str("x", &contents).is_err());
    }

    #[rstest]
    fn test_default_incentive_formula(model_parameters: ModelParameters) {
        let formula = &model_parameters.input.incentive;
        assert_eq!(formula.savings_basis, SavingsBasis::RevenueRequirement);
        assert_eq!(formula.recovery_period, RecoveryPeriod::IncentivePayback);
        assert_eq!(formula.npa_cost_treatment, Treatment::Opex);
    }

    #[test]
    fn test_incentive_formula_from_file() {
        let contents = format!(
            "{SAMPLE_MODEL_TOML}\n[performance_incentive]\nsavings_basis = \"capital_cost\"\n\
            recovery_period = \"npa_lifetime\"\nnpa_cost_treatment = \"capex\"\n"
        );
        let params = ModelParameters::from_toml_str("x", &contents).unwrap();
        let formula = &params.input.incentive;
        assert_eq!(formula.savings_basis, SavingsBasis::CapitalCost);
        assert_eq!(formula.npa_cost_treatment, Treatment::Capex);
        assert_eq!(
            formula.recovery_lifetime(&params.input.shared),
            params.input.shared.npa_lifetime
        );
    }

    #[rstest]
    #[case(2025, 2025, true)]
    #[case(2025, 2050, true)]
    #[case(2025, 2024, false)]
    fn test_check_analysis_period(#[case] start: u32, #[case] end: u32, #[case] valid: bool) {
        assert_eq!(check_analysis_period(start, end).is_ok(), valid);
    }

    #[rstest]
    fn test_check_npa_window(mut model_parameters: ModelParameters) {
        model_parameters.web.npa_year_start = 2030;
        model_parameters.web.npa_year_end = 2029;
        assert_error!(
            check_npa_window(&model_parameters.web),
            "`web_params.npa_year_start` (2030) must not be after `web_params.npa_year_end` (2029)"
        );
    }

    #[rstest]
    fn test_check_npa_program_size(mut model_parameters: ModelParameters) {
        assert!(check_npa_program_size(&model_parameters.web).is_ok());
        assert_eq!(model_parameters.web.npa_households_per_year(), Some(200));

        model_parameters.web.npa_num_projects = 5_000_000_000;
        model_parameters.web.num_converts = 5_000_000_000;
        assert!(model_parameters.web.npa_households_per_year().is_none());
        assert_error!(
            check_npa_program_size(&model_parameters.web),
            "`web_params.npa_num_projects` (5000000000) times `web_params.num_converts` \
             (5000000000) is too large"
        );
    }

    #[test]
    fn test_oversized_program_is_rejected() {
        let contents = SAMPLE_MODEL_TOML
            .replace("npa_num_projects = 10", "npa_num_projects = 5000000000")
            .replace("num_converts = 20", "num_converts = 5000000000");
        assert!(ModelParameters::from_toml_str("x", &contents).is_err());
    }

    #[rstest]
    #[case(0.05, true)]
    #[case(-0.5, true)]
    #[case(-1.0, false)]
    #[case(-1.5, false)]
    #[case(f64::NAN, false)]
    fn test_check_rate(#[case] rate: f64, #[case] valid: bool) {
        assert_eq!(check_rate("rate", Dimensionless(rate)).is_ok(), valid);
    }

    #[rstest]
    fn test_warnings(mut model_parameters: ModelParameters) {
        assert!(model_parameters.warnings().is_empty());

        model_parameters.input.gas.num_users_init = 5;
        assert_eq!(
            model_parameters.warnings(),
            [ModelWarning::NpaHouseholdsExceedGasUsers {
                per_year: model_parameters.web.npa_num_projects * model_parameters.web.num_converts,
                gas_users: 5
            }]
        );
    }

    #[rstest]
    fn test_check_efficiencies(mut model_parameters: ModelParameters) {
        model_parameters.input.electric.hp_efficiency = Dimensionless(0.0);
        assert_error!(
            check_efficiencies(&model_parameters.input.electric),
            "`electric.hp_efficiency` must be greater than zero"
        );
    }
}
