//! A registry describing every user-configurable parameter.
//!
//! Each entry records where the parameter lives in a model file, how it is labelled, whether it is
//! a percentage and which bounds apply to its user-facing value. The registry drives range
//! validation and the parameters table written alongside model results.
use super::ModelParameters;
use crate::input::proportion_to_percent;
use crate::units::Dimensionless;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of a parameter as shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// Whole numbers (counts, years, lifetimes)
    Int,
    /// Floating-point numbers
    Float,
    /// Flags
    Bool,
}

impl ParameterType {
    /// The name of the type as written to the parameters table
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }
}

/// The value of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    /// A whole number
    Int(u64),
    /// A floating-point number
    Float(f64),
    /// A flag
    Bool(bool),
}

impl ParameterValue {
    /// The value as a float, if numeric
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(value as f64),
            Self::Float(value) => Some(value),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Describes a single configurable parameter
pub struct ParameterDef {
    /// Identifier for the parameter
    pub name: &'static str,
    /// Human-readable label
    pub label: &'static str,
    /// Location of the parameter in a model file
    pub config_path: &'static [&'static str],
    /// The parameter's type
    pub kind: ParameterType,
    /// Whether the parameter is written as a percentage (0-100) in model files
    pub is_pct: bool,
    /// Minimum permitted user-facing value (inclusive)
    pub min: Option<f64>,
    /// Maximum permitted user-facing value (inclusive)
    pub max: Option<f64>,
    /// Retrieve the internal value of the parameter
    getter: fn(&ModelParameters) -> ParameterValue,
}

impl ParameterDef {
    /// The value used internally by the model (proportions for percentage fields)
    pub fn internal_value(&self, params: &ModelParameters) -> ParameterValue {
        (self.getter)(params)
    }

    /// The value as written in model files (percentages for percentage fields)
    pub fn user_value(&self, params: &ModelParameters) -> ParameterValue {
        match self.internal_value(params) {
            ParameterValue::Float(value) if self.is_pct => {
                ParameterValue::Float(proportion_to_percent(Dimensionless(value)))
            }
            value => value,
        }
    }

    /// The config path joined with dots, as used in error messages
    pub fn dotted_path(&self) -> String {
        self.config_path.join(".")
    }

    /// Check the user-facing value against this parameter's bounds
    fn check(&self, params: &ModelParameters) -> Result<()> {
        let Some(value) = self.user_value(params).as_f64() else {
            return Ok(());
        };

        ensure!(
            value.is_finite(),
            "Invalid value for `{}` ({}): must be a finite number",
            self.dotted_path(),
            self.label
        );
        if let Some(min) = self.min {
            ensure!(
                value >= min,
                "Invalid value for `{}` ({}): {value} is less than the minimum of {min}",
                self.dotted_path(),
                self.label
            );
        }
        if let Some(max) = self.max {
            ensure!(
                value <= max,
                "Invalid value for `{}` ({}): {value} is greater than the maximum of {max}",
                self.dotted_path(),
                self.label
            );
        }

        Ok(())
    }
}

macro_rules! param {
    (
        $name:literal,
        $label:literal,
        [$($path:literal),+],
        $kind:ident,
        pct = $pct:literal,
        min = $min:expr,
        max = $max:expr,
        |$p:ident| $get:expr
    ) => {
        ParameterDef {
            name: $name,
            label: $label,
            config_path: &[$($path),+],
            kind: ParameterType::$kind,
            is_pct: $pct,
            min: $min,
            max: $max,
            getter: |$p: &ModelParameters| -> ParameterValue { $get },
        }
    };
}

/// Every configurable parameter, in the order they appear in the parameters table
pub static PARAMETERS: &[ParameterDef] = &[
    // Gas utility
    param!("gas_num_users_init", "Initial gas customers", ["gas", "num_users_init"], Int,
        pct = false, min = Some(1.0), max = None,
        |p| ParameterValue::Int(p.input.gas.num_users_init)),
    param!("gas_ratebase_init", "Initial gas rate base ($)", ["gas", "ratebase_init"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.gas.ratebase_init.value())),
    param!("gas_ror", "Gas rate of return (%)", ["gas", "ror"], Float,
        pct = true, min = Some(0.0), max = Some(100.0),
        |p| ParameterValue::Float(p.input.gas.ror.value())),
    param!("gas_default_depreciation_lifetime", "Gas existing asset lifetime (years)",
        ["gas", "default_depreciation_lifetime"], Int,
        pct = false, min = Some(1.0), max = Some(150.0),
        |p| ParameterValue::Int(p.input.gas.default_depreciation_lifetime.into())),
    param!("pipeline_depreciation_lifetime", "Pipeline depreciation lifetime (years)",
        ["gas", "pipeline_depreciation_lifetime"], Int,
        pct = false, min = Some(1.0), max = Some(150.0),
        |p| ParameterValue::Int(p.input.gas.pipeline_depreciation_lifetime.into())),
    param!("non_lpp_depreciation_lifetime", "Non-LPP depreciation lifetime (years)",
        ["gas", "non_lpp_depreciation_lifetime"], Int,
        pct = false, min = Some(1.0), max = Some(150.0),
        |p| ParameterValue::Int(p.input.gas.non_lpp_depreciation_lifetime.into())),
    param!("baseline_non_lpp_ratebase_growth", "Gas baseline non-LPP investment (% of rate base)",
        ["gas", "baseline_non_lpp_ratebase_growth"], Float,
        pct = true, min = Some(-100.0), max = Some(100.0),
        |p| ParameterValue::Float(p.input.gas.baseline_non_lpp_ratebase_growth.value())),
    param!("pipeline_maintenance_cost_pct", "Pipeline maintenance cost (% of rate base)",
        ["gas", "pipeline_maintenance_cost_pct"], Float,
        pct = true, min = Some(0.0), max = Some(100.0),
        |p| ParameterValue::Float(p.input.gas.pipeline_maintenance_cost_pct.value())),
    param!("per_user_heating_need_therms", "Space heating need per customer (therms)",
        ["gas", "per_user_heating_need_therms"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.gas.per_user_heating_need_therms.value())),
    param!("per_user_water_heating_need_therms", "Water heating need per customer (therms)",
        ["gas", "per_user_water_heating_need_therms"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.gas.per_user_water_heating_need_therms.value())),
    param!("gas_user_bill_fixed_charge", "Gas annual fixed charge ($)",
        ["gas", "user_bill_fixed_charge"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.gas.user_bill_fixed_charge.value())),
    // Electric utility
    param!("electric_num_users_init", "Initial electric customers",
        ["electric", "num_users_init"], Int,
        pct = false, min = Some(1.0), max = None,
        |p| ParameterValue::Int(p.input.electric.num_users_init)),
    param!("electric_ratebase_init", "Initial electric rate base ($)",
        ["electric", "ratebase_init"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.electric.ratebase_init.value())),
    param!("electric_ror", "Electric rate of return (%)", ["electric", "ror"], Float,
        pct = true, min = Some(0.0), max = Some(100.0),
        |p| ParameterValue::Float(p.input.electric.ror.value())),
    param!("electric_default_depreciation_lifetime", "Electric asset lifetime (years)",
        ["electric", "default_depreciation_lifetime"], Int,
        pct = false, min = Some(1.0), max = Some(150.0),
        |p| ParameterValue::Int(p.input.electric.default_depreciation_lifetime.into())),
    param!("grid_upgrade_depreciation_lifetime", "Grid upgrade depreciation lifetime (years)",
        ["electric", "grid_upgrade_depreciation_lifetime"], Int,
        pct = false, min = Some(1.0), max = Some(150.0),
        |p| ParameterValue::Int(p.input.electric.grid_upgrade_depreciation_lifetime.into())),
    param!("baseline_non_npa_ratebase_growth",
        "Electric baseline investment (% of rate base)",
        ["electric", "baseline_non_npa_ratebase_growth"], Float,
        pct = true, min = Some(-100.0), max = Some(100.0),
        |p| ParameterValue::Float(p.input.electric.baseline_non_npa_ratebase_growth.value())),
    param!("electric_maintenance_cost_pct", "Electric maintenance cost (% of rate base)",
        ["electric", "electric_maintenance_cost_pct"], Float,
        pct = true, min = Some(0.0), max = Some(100.0),
        |p| ParameterValue::Float(p.input.electric.electric_maintenance_cost_pct.value())),
    param!("distribution_cost_per_peak_kw_increase_init",
        "Distribution cost per kW of peak increase ($)",
        ["electric", "distribution_cost_per_peak_kw_increase_init"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(
            p.input.electric.distribution_cost_per_peak_kw_increase_init.value()
        )),
    param!("hp_efficiency", "Heat pump efficiency (COP)", ["electric", "hp_efficiency"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.electric.hp_efficiency.value())),
    param!("water_heater_efficiency", "Water heater efficiency",
        ["electric", "water_heater_efficiency"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.electric.water_heater_efficiency.value())),
    param!("hp_peak_kw", "Heat pump peak demand (kW)", ["electric", "hp_peak_kw"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.electric.hp_peak_kw.value())),
    param!("aircon_peak_kw", "Air conditioner peak demand (kW)",
        ["electric", "aircon_peak_kw"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.electric.aircon_peak_kw.value())),
    param!("per_user_electric_need_kwh", "Electricity need per customer (kWh)",
        ["electric", "per_user_electric_need_kwh"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.electric.per_user_electric_need_kwh.value())),
    param!("electric_user_bill_fixed_charge", "Electric annual fixed charge ($)",
        ["electric", "user_bill_fixed_charge"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.electric.user_bill_fixed_charge.value())),
    // Shared
    param!("start_year", "Start year", ["shared", "start_year"], Int,
        pct = false, min = Some(1.0), max = None,
        |p| ParameterValue::Int(p.input.shared.start_year.into())),
    param!("end_year", "End year", ["end_year"], Int,
        pct = false, min = Some(1.0), max = None,
        |p| ParameterValue::Int(p.end_year.into())),
    param!("cost_inflation_rate", "Cost inflation rate (%)",
        ["shared", "cost_inflation_rate"], Float,
        pct = true, min = None, max = None,
        |p| ParameterValue::Float(p.input.shared.cost_inflation_rate.value())),
    param!("construction_inflation_rate", "Construction inflation rate (%)",
        ["shared", "construction_inflation_rate"], Float,
        pct = true, min = None, max = None,
        |p| ParameterValue::Float(p.input.shared.construction_inflation_rate.value())),
    param!("real_dollar_discount_rate", "Real dollar discount rate (%)",
        ["shared", "real_dollar_discount_rate"], Float,
        pct = true, min = None, max = None,
        |p| ParameterValue::Float(p.input.shared.real_dollar_discount_rate.value())),
    param!("npv_discount_rate", "NPV discount rate (%)", ["shared", "npv_discount_rate"], Float,
        pct = true, min = None, max = None,
        |p| ParameterValue::Float(p.input.shared.npv_discount_rate.value())),
    param!("performance_incentive_pct", "Performance incentive (% of savings)",
        ["shared", "performance_incentive_pct"], Float,
        pct = true, min = Some(0.0), max = Some(100.0),
        |p| ParameterValue::Float(p.input.shared.performance_incentive_pct.value())),
    param!("incentive_payback_period", "Incentive payback period (years)",
        ["shared", "incentive_payback_period"], Int,
        pct = false, min = Some(1.0), max = Some(150.0),
        |p| ParameterValue::Int(p.input.shared.incentive_payback_period.into())),
    param!("npa_install_costs_init", "NPA install cost per household ($)",
        ["shared", "npa_install_costs_init"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.input.shared.npa_install_costs_init.value())),
    param!("npa_lifetime", "NPA lifetime (years)", ["shared", "npa_lifetime"], Int,
        pct = false, min = Some(1.0), max = Some(150.0),
        |p| ParameterValue::Int(p.input.shared.npa_lifetime.into())),
    // NPA program sizing
    param!("npa_projects_per_year", "NPA projects per year",
        ["web_params", "npa_num_projects"], Int,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Int(p.web.npa_num_projects)),
    param!("num_converts_per_project", "Households converted per project",
        ["web_params", "num_converts"], Int,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Int(p.web.num_converts)),
    param!("pipe_value_per_user", "Avoided pipe value per household ($)",
        ["web_params", "pipe_value_per_user"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.web.pipe_value_per_user.value())),
    param!("pipe_decomm_cost_per_user", "Pipe decommissioning cost per household ($)",
        ["web_params", "pipe_decomm_cost_per_user"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.web.pipe_decomm_cost_per_user.value())),
    param!("peak_kw_winter_headroom", "Winter peak headroom (kW)",
        ["web_params", "peak_kw_winter_headroom"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.web.peak_kw_winter_headroom.value())),
    param!("peak_kw_summer_headroom", "Summer peak headroom (kW)",
        ["web_params", "peak_kw_summer_headroom"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.web.peak_kw_summer_headroom.value())),
    param!("aircon_percent_adoption_pre_npa", "Air conditioning adoption before NPA (%)",
        ["web_params", "aircon_percent_adoption_pre_npa"], Float,
        pct = true, min = Some(0.0), max = Some(100.0),
        |p| ParameterValue::Float(p.web.aircon_percent_adoption_pre_npa.value())),
    param!("scattershot_electrification_users_per_year",
        "Scattershot electrification (households per year)",
        ["web_params", "scattershot_electrification_users_per_year"], Int,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Int(p.web.scattershot_electrification_users_per_year)),
    param!("gas_fixed_overhead_costs", "Gas fixed overhead costs ($)",
        ["web_params", "gas_fixed_overhead_costs"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.web.gas_fixed_overhead_costs.value())),
    param!("electric_fixed_overhead_costs", "Electric fixed overhead costs ($)",
        ["web_params", "electric_fixed_overhead_costs"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.web.electric_fixed_overhead_costs.value())),
    param!("gas_bau_lpp_costs_per_year", "BAU leak-prone pipe spend per year ($)",
        ["web_params", "gas_bau_lpp_costs_per_year"], Float,
        pct = false, min = Some(0.0), max = None,
        |p| ParameterValue::Float(p.web.gas_bau_lpp_costs_per_year.value())),
    param!("npa_year_start", "First NPA year", ["web_params", "npa_year_start"], Int,
        pct = false, min = None, max = None,
        |p| ParameterValue::Int(p.web.npa_year_start.into())),
    param!("npa_year_end", "Last NPA year", ["web_params", "npa_year_end"], Int,
        pct = false, min = None, max = None,
        |p| ParameterValue::Int(p.web.npa_year_end.into())),
    param!("is_scattershot", "NPA conversions are scattered", ["web_params", "is_scattershot"],
        Bool, pct = false, min = None, max = None,
        |p| ParameterValue::Bool(p.web.is_scattershot)),
];

/// Look up a parameter definition by name
pub fn get_parameter(name: &str) -> Option<&'static ParameterDef> {
    PARAMETERS.iter().find(|def| def.name == name)
}

/// Check every registered parameter against its bounds
pub fn check_parameter_bounds(params: &ModelParameters) -> Result<()> {
    for def in PARAMETERS {
        def.check(params)?;
    }

    Ok(())
}

/// A row of the parameters table written alongside results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    /// Parameter identifier
    pub parameter_name: String,
    /// Human-readable label
    pub label: String,
    /// User-facing value
    pub value: String,
    /// The type of the value
    #[serde(rename = "type")]
    pub value_type: String,
    /// Location of the parameter in the model file
    pub config_path: String,
}

/// Build the parameters table for a model, echoing every user-facing value.
///
/// The table ends with two metadata rows: the run name and the NPA year range.
pub fn parameter_rows(params: &ModelParameters) -> Vec<ParameterRow> {
    let mut rows: Vec<_> = PARAMETERS
        .iter()
        .map(|def| ParameterRow {
            parameter_name: def.name.into(),
            label: def.label.into(),
            value: def.user_value(params).to_string(),
            value_type: def.kind.name().into(),
            config_path: def.config_path.join(" > "),
        })
        .collect();

    rows.push(ParameterRow {
        parameter_name: "run_name".into(),
        label: "Selected scenario/run name".into(),
        value: params.run_name.clone(),
        value_type: "str".into(),
        config_path: "metadata".into(),
    });
    rows.push(ParameterRow {
        parameter_name: "npa_year_range".into(),
        label: "NPA year range".into(),
        value: format!("{}-{}", params.web.npa_year_start, params.web.npa_year_end),
        value_type: "list".into(),
        config_path: "metadata".into(),
    });

    rows
}
