//! Expands the static first-year parameters into year-indexed series.
//!
//! Each year is built from the year before it and the static parameters only, via [`step`], so the
//! whole series is a scan over the analysis years.
use crate::finance::growth_factor;
use crate::params::{ElectricParams, GasParams, SharedParams, WebParams, check_rate};
use crate::units::{Dimensionless, Money, MoneyPerPower};
use crate::warning::ModelWarning;
use anyhow::{Result, ensure};
use log::debug;

/// The inputs for a single analysis year
#[derive(Debug, Clone, PartialEq)]
pub struct YearInputs {
    /// The calendar year
    pub year: u32,
    /// Households converted by NPA projects this year
    pub npa_converts: u64,
    /// Households converted by NPA projects up to and including this year
    pub cumulative_npa_converts: u64,
    /// Households electrifying independently of the NPA program this year
    pub scattershot_converts: u64,
    /// Households electrified independently of the NPA program up to and including this year
    pub cumulative_scattershot_converts: u64,
    /// Households requested to have been electrified up to and including this year, before the
    /// cap at the number of gas customers
    pub requested_converts: u64,
    /// Escalation of capital costs relative to the first year
    pub construction_escalation: Dimensionless,
    /// Escalation of operating costs relative to the first year
    pub cost_escalation: Dimensionless,
    /// NPA install cost per converted household
    pub npa_install_cost_per_user: Money,
    /// Avoided pipe value per converted household
    pub pipe_value_per_user: Money,
    /// Pipe decommissioning cost per converted household
    pub pipe_decomm_cost_per_user: Money,
    /// Leak-prone pipe spend under business as usual
    pub gas_bau_lpp_costs: Money,
    /// Cost of each kW of new peak demand
    pub distribution_cost_per_peak_kw: MoneyPerPower,
    /// Gas utility fixed overhead costs
    pub gas_fixed_overhead_costs: Money,
    /// Electric utility fixed overhead costs
    pub electric_fixed_overhead_costs: Money,
}

impl YearInputs {
    /// Total households electrified so far, whether by NPA or not
    pub fn cumulative_converts(&self) -> u64 {
        self.cumulative_npa_converts + self.cumulative_scattershot_converts
    }

    /// Whether cumulative conversions were capped at the number of gas customers
    pub fn conversions_capped(&self) -> bool {
        self.cumulative_converts() < self.requested_converts
    }

    /// NPA program cost per converted household (install plus decommissioning)
    pub fn npa_cost_per_user(&self) -> Money {
        self.npa_install_cost_per_user + self.pipe_decomm_cost_per_user
    }
}

/// The static parameters from which every year is derived
#[derive(Debug, Clone, Copy)]
pub struct SeriesInputs<'a> {
    /// NPA program sizing
    pub web: &'a WebParams,
    /// Shared assumptions
    pub shared: &'a SharedParams,
    /// The number of gas customers available for conversion
    pub available_customers: u64,
    /// First-year cost of each kW of new peak demand
    pub distribution_cost_per_peak_kw_init: MoneyPerPower,
    /// The first analysis year
    pub start_year: u32,
}

impl SeriesInputs<'_> {
    /// Households converted by NPA projects in `year`, before any cap.
    ///
    /// Saturates at `u64::MAX`.
    fn requested_npa_converts(&self, year: u32) -> u64 {
        if (self.web.npa_year_start..=self.web.npa_year_end).contains(&year) {
            self.web.npa_households_per_year().unwrap_or(u64::MAX)
        } else {
            0
        }
    }
}

/// Build the inputs for the year after `prev` (or the first year if `prev` is `None`)
pub fn step(inputs: &SeriesInputs, prev: Option<&YearInputs>) -> YearInputs {
    let (index, prev_npa, prev_scattershot, prev_requested) = match prev {
        Some(prev) => (
            prev.year + 1 - inputs.start_year,
            prev.cumulative_npa_converts,
            prev.cumulative_scattershot_converts,
            prev.requested_converts,
        ),
        None => (0, 0, 0, 0),
    };
    let year = inputs.start_year + index;

    // Households already converted stay converted. New NPA conversions take priority over
    // scattershot electrification for the customers that remain.
    let remaining = inputs
        .available_customers
        .saturating_sub(prev_npa + prev_scattershot);
    let requested_npa = inputs.requested_npa_converts(year);
    let requested_scattershot = inputs.web.scattershot_electrification_users_per_year;
    let npa_converts = requested_npa.min(remaining);
    let scattershot_converts = requested_scattershot.min(remaining - npa_converts);

    let periods = index as i32;
    let construction_escalation = growth_factor(inputs.shared.construction_inflation_rate, periods);
    let cost_escalation = growth_factor(inputs.shared.cost_inflation_rate, periods);

    YearInputs {
        year,
        npa_converts,
        cumulative_npa_converts: prev_npa + npa_converts,
        scattershot_converts,
        cumulative_scattershot_converts: prev_scattershot + scattershot_converts,
        requested_converts: prev_requested
            .saturating_add(requested_npa)
            .saturating_add(requested_scattershot),
        construction_escalation,
        cost_escalation,
        npa_install_cost_per_user: inputs.shared.npa_install_costs_init * construction_escalation,
        pipe_value_per_user: inputs.web.pipe_value_per_user * construction_escalation,
        pipe_decomm_cost_per_user: inputs.web.pipe_decomm_cost_per_user * construction_escalation,
        gas_bau_lpp_costs: inputs.web.gas_bau_lpp_costs_per_year * construction_escalation,
        distribution_cost_per_peak_kw: construction_escalation
            * inputs.distribution_cost_per_peak_kw_init,
        gas_fixed_overhead_costs: inputs.web.gas_fixed_overhead_costs * cost_escalation,
        electric_fixed_overhead_costs: inputs.web.electric_fixed_overhead_costs * cost_escalation,
    }
}

/// The year-indexed inputs for an analysis period
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesParams {
    years: Vec<YearInputs>,
    warnings: Vec<ModelWarning>,
}

impl TimeSeriesParams {
    /// The first analysis year
    pub fn start_year(&self) -> Option<u32> {
        self.years.first().map(|y| y.year)
    }

    /// The number of analysis years
    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Whether there are no analysis years
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Iterate over the years in order
    pub fn iter(&self) -> impl Iterator<Item = &YearInputs> {
        self.years.iter()
    }

    /// Get the inputs for a given calendar year
    pub fn get(&self, year: u32) -> Option<&YearInputs> {
        let index = year.checked_sub(self.start_year()?)?;
        self.years.get(index as usize)
    }

    /// Warnings raised while building the series
    pub fn warnings(&self) -> &[ModelWarning] {
        &self.warnings
    }

    /// Look up a series by name, with one value per year.
    ///
    /// Counts are returned as floating-point values. Returns `None` for an unknown name.
    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        let get: fn(&YearInputs) -> f64 = match name {
            "npa_converts" => |y| y.npa_converts as f64,
            "cumulative_npa_converts" => |y| y.cumulative_npa_converts as f64,
            "scattershot_converts" => |y| y.scattershot_converts as f64,
            "cumulative_scattershot_converts" => |y| y.cumulative_scattershot_converts as f64,
            "npa_install_cost_per_user" => |y| y.npa_install_cost_per_user.value(),
            "pipe_value_per_user" => |y| y.pipe_value_per_user.value(),
            "pipe_decomm_cost_per_user" => |y| y.pipe_decomm_cost_per_user.value(),
            "gas_bau_lpp_costs" => |y| y.gas_bau_lpp_costs.value(),
            "distribution_cost_per_peak_kw" => |y| y.distribution_cost_per_peak_kw.value(),
            "gas_fixed_overhead_costs" => |y| y.gas_fixed_overhead_costs.value(),
            "electric_fixed_overhead_costs" => |y| y.electric_fixed_overhead_costs.value(),
            _ => return None,
        };

        Some(self.years.iter().map(get).collect())
    }
}

/// Build the year-indexed inputs for the years `start_year..end_year`.
///
/// The electric parameters contribute the first-year grid upgrade cost.
pub fn build_time_series(
    web: &WebParams,
    shared: &SharedParams,
    gas: &GasParams,
    electric: &ElectricParams,
    start_year: u32,
    end_year: u32,
) -> Result<TimeSeriesParams> {
    ensure!(
        end_year > start_year,
        "End year ({end_year}) must be after start year ({start_year})"
    );
    check_rate("shared.cost_inflation_rate", shared.cost_inflation_rate)?;
    check_rate(
        "shared.construction_inflation_rate",
        shared.construction_inflation_rate,
    )?;

    let inputs = SeriesInputs {
        web,
        shared,
        available_customers: gas.num_users_init,
        distribution_cost_per_peak_kw_init: electric.distribution_cost_per_peak_kw_increase_init,
        start_year,
    };

    let years: Vec<_> = (start_year..end_year)
        .scan(None, |prev: &mut Option<YearInputs>, _| {
            let next = step(&inputs, prev.as_ref());
            *prev = Some(next.clone());
            Some(next)
        })
        .collect();

    // Warn once, in the first year the cap bites
    let warnings = years
        .iter()
        .find(|y| y.conversions_capped())
        .map(|y| ModelWarning::ConversionsExceedCustomers {
            year: y.year,
            requested: y.requested_converts,
            available: gas.num_users_init,
        })
        .into_iter()
        .collect();

    debug!(
        "Built time series for {start_year}-{}: {} cumulative NPA converts",
        end_year - 1,
        years.last().map_or(0, |y| y.cumulative_npa_converts)
    );

    Ok(TimeSeriesParams { years, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model_parameters, time_series};
    use crate::params::ModelParameters;
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;

    fn build(params: &ModelParameters, start_year: u32, end_year: u32) -> Result<TimeSeriesParams> {
        let input = &params.input;
        build_time_series(
            &params.web,
            &input.shared,
            &input.gas,
            &input.electric,
            start_year,
            end_year,
        )
    }

    #[rstest]
    fn test_one_entry_per_year(time_series: TimeSeriesParams) {
        assert_eq!(time_series.len(), 26);
        assert_eq!(time_series.start_year(), Some(2025));
        assert!(
            time_series
                .iter()
                .map(|y| y.year)
                .eq(2025..2051)
        );
        assert!(time_series.warnings().is_empty());
    }

    #[rstest]
    fn test_cumulative_converts_monotonic(time_series: TimeSeriesParams) {
        let cumulative = time_series.series("cumulative_npa_converts").unwrap();
        assert!(cumulative.iter().tuple_windows().all(|(a, b)| a <= b));

        // 10 projects of 20 households for 2026-2035
        let expected = (10 * 20 * 10) as f64;
        assert_eq!(time_series.get(2035).unwrap().cumulative_npa_converts, 2000);
        assert_eq!(cumulative.last().copied(), Some(expected));
        assert!(
            time_series
                .iter()
                .filter(|y| y.year > 2035)
                .all(|y| y.npa_converts == 0 && y.cumulative_npa_converts == 2000)
        );
        assert_eq!(time_series.get(2025).unwrap().npa_converts, 0);
    }

    #[rstest]
    fn test_scattershot_independent_of_window(time_series: TimeSeriesParams) {
        assert!(time_series.iter().all(|y| y.scattershot_converts == 50));
        assert_eq!(
            time_series.get(2050).unwrap().cumulative_scattershot_converts,
            50 * 26
        );
    }

    #[rstest]
    fn test_costs_escalate(time_series: TimeSeriesParams) {
        let year = time_series.get(2027).unwrap();
        assert_approx_eq!(
            Money,
            year.pipe_value_per_user,
            Money(12000.0 * 1.04 * 1.04),
            epsilon = 1e-6
        );
        assert_approx_eq!(
            Money,
            year.gas_fixed_overhead_costs,
            Money(5_000_000.0 * 1.03 * 1.03),
            epsilon = 1e-6
        );
        assert_approx_eq!(
            Money,
            year.npa_cost_per_user(),
            Money(16000.0 * 1.04 * 1.04),
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_conversions_capped(mut model_parameters: ModelParameters) {
        model_parameters.input.gas.num_users_init = 500;
        let ts = build(&model_parameters, 2025, 2051).unwrap();

        assert!(ts.iter().all(|y| y.cumulative_converts() <= 500));
        assert_eq!(ts.get(2050).unwrap().cumulative_converts(), 500);
        assert!(
            ts.series("cumulative_npa_converts")
                .unwrap()
                .iter()
                .tuple_windows()
                .all(|(a, b)| a <= b)
        );

        // 2025: 50, 2026: 300, 2027: 550
        assert_eq!(
            ts.warnings(),
            [ModelWarning::ConversionsExceedCustomers {
                year: 2027,
                requested: 550,
                available: 500
            }]
        );
    }

    #[rstest]
    fn test_huge_program_saturates(mut model_parameters: ModelParameters) {
        model_parameters.web.npa_num_projects = 5_000_000_000;
        model_parameters.web.num_converts = 5_000_000_000;
        let ts = build(&model_parameters, 2025, 2051).unwrap();

        let gas_users = model_parameters.input.gas.num_users_init;
        assert_eq!(ts.get(2050).unwrap().cumulative_converts(), gas_users);
        assert_eq!(ts.get(2050).unwrap().requested_converts, u64::MAX);
        assert_eq!(
            ts.warnings(),
            [ModelWarning::ConversionsExceedCustomers {
                year: 2026,
                requested: u64::MAX,
                available: gas_users
            }]
        );
    }

    #[rstest]
    fn test_invalid_years(model_parameters: ModelParameters) {
        assert_error!(
            build(&model_parameters, 2030, 2030),
            "End year (2030) must be after start year (2030)"
        );
    }

    #[rstest]
    fn test_invalid_escalation_rate(mut model_parameters: ModelParameters) {
        model_parameters.input.shared.construction_inflation_rate = Dimensionless(-1.0);
        assert_error!(
            build(&model_parameters, 2025, 2030),
            "`shared.construction_inflation_rate` must be greater than -100%"
        );
    }

    #[rstest]
    fn test_series_unknown_name(time_series: TimeSeriesParams) {
        assert!(time_series.series("not_a_series").is_none());
        assert_eq!(time_series.series("npa_converts").unwrap().len(), 26);
    }
}
