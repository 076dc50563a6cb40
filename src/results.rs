//! Runs every scenario and assembles the results into tables.
//!
//! Results are keyed by `(year, scenario_id, utility_type)`. Comparison tables hold a chosen set of
//! metrics, either as absolute values or as differences from the business-as-usual scenario.
use crate::bills::{BillYear, BillsByYear, allocate_bills};
use crate::engine::{FinancialYear, YearlyFinancials, run_scenario};
use crate::input::proportion_to_percent;
use crate::params::{InputParams, WebParams};
use crate::scenario::{Scenario, ScenarioRun, Utility};
use crate::time_series::TimeSeriesParams;
use crate::warning::ModelWarning;
use anyhow::Result;
use indexmap::IndexMap;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString};

/// A metric reported for each year, scenario and utility
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
pub enum Metric {
    /// Rate base at the end of the year
    Ratebase,
    /// Rate base in start-year dollars
    InflationAdjustedRatebase,
    /// Depreciation charged this year
    DepreciationExpense,
    /// Capital placed in service this year, excluding baseline growth
    CapitalAdditions,
    /// Baseline capital placed in service this year
    GrowthTerm,
    /// Leak-prone pipe replacement capitalised this year
    LppSpend,
    /// NPA program cost carried by the utility
    NpaSpend,
    /// Grid upgrade capital placed in service this year
    GridUpgradeSpend,
    /// Performance incentive capitalised this year
    PerformanceIncentive,
    /// NPA costs expensed this year
    OpexAdditions,
    /// Maintenance charged on the rate base
    MaintenanceCost,
    /// Fixed overhead costs
    FixedOverheadCosts,
    /// Return earned on the rate base
    ReturnOnRatebase,
    /// Total revenue the utility must recover
    RevenueRequirement,
    /// Revenue requirement in start-year dollars
    InflationAdjustedRevenueRequirement,
    /// Share of the revenue requirement which is return on the rate base, as a percentage
    ReturnOnRatebasePct,
    /// Number of customers
    NumUsers,
    /// Total volumetric sales
    VolumetricSales,
    /// Revenue recovered through fixed charges
    FixedChargeRevenue,
    /// Per-unit charge
    VariableTariff,
    /// This utility's part of a converted household's bill, in start-year dollars
    ConvertsBillPerUser,
    /// This utility's part of an unconverted household's bill, in start-year dollars
    NonconvertsBillPerUser,
    /// A converted household's combined gas and electric bill, in start-year dollars
    ConvertsTotalBillPerUser,
    /// An unconverted household's combined gas and electric bill, in start-year dollars
    NonconvertsTotalBillPerUser,
    /// Number of converted households
    NumConverts,
    /// Number of households still on gas
    NumNonconverts,
    /// Combined bills of every converted household, in start-year dollars
    ConvertsClassTotalBill,
    /// Combined bills of every household still on gas, in start-year dollars
    NonconvertsClassTotalBill,
}

/// The metrics compared across scenarios by default
pub const DEFAULT_COMPARE_COLS: &[Metric] = &[
    Metric::InflationAdjustedRevenueRequirement,
    Metric::VariableTariff,
    Metric::InflationAdjustedRatebase,
    Metric::ReturnOnRatebasePct,
    Metric::NonconvertsBillPerUser,
    Metric::ConvertsBillPerUser,
    Metric::NonconvertsTotalBillPerUser,
    Metric::ConvertsTotalBillPerUser,
];

/// Every metric for one year, scenario and utility
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub year: u32,
    pub scenario_id: Scenario,
    pub utility_type: Utility,
    pub ratebase: f64,
    pub inflation_adjusted_ratebase: f64,
    pub depreciation_expense: f64,
    pub capital_additions: f64,
    pub growth_term: f64,
    pub lpp_spend: f64,
    pub npa_spend: f64,
    pub grid_upgrade_spend: f64,
    pub performance_incentive: f64,
    pub opex_additions: f64,
    pub maintenance_cost: f64,
    pub fixed_overhead_costs: f64,
    pub return_on_ratebase: f64,
    pub revenue_requirement: f64,
    pub inflation_adjusted_revenue_requirement: f64,
    pub return_on_ratebase_pct: f64,
    pub num_users: u64,
    pub volumetric_sales: f64,
    pub fixed_charge_revenue: f64,
    pub variable_tariff: f64,
    pub converts_bill_per_user: f64,
    pub nonconverts_bill_per_user: f64,
    pub converts_total_bill_per_user: f64,
    pub nonconverts_total_bill_per_user: f64,
    pub num_converts: u64,
    pub num_nonconverts: u64,
    pub converts_class_total_bill: f64,
    pub nonconverts_class_total_bill: f64,
}

impl ResultRow {
    fn new(scenario: Scenario, utility: Utility, fin: &FinancialYear, bills: &BillYear) -> Self {
        Self {
            year: fin.year,
            scenario_id: scenario,
            utility_type: utility,
            ratebase: fin.ratebase.value(),
            inflation_adjusted_ratebase: fin.inflation_adjusted_ratebase.value(),
            depreciation_expense: fin.depreciation_expense.value(),
            capital_additions: fin.capital_additions.value(),
            growth_term: fin.growth_term.value(),
            lpp_spend: fin.lpp_spend.value(),
            npa_spend: fin.npa_spend.value(),
            grid_upgrade_spend: fin.grid_upgrade_spend.value(),
            performance_incentive: fin.performance_incentive.value(),
            opex_additions: fin.opex_additions.value(),
            maintenance_cost: fin.maintenance_cost.value(),
            fixed_overhead_costs: fin.fixed_overhead_costs.value(),
            return_on_ratebase: fin.return_on_ratebase.value(),
            revenue_requirement: fin.revenue_requirement.value(),
            inflation_adjusted_revenue_requirement: fin
                .inflation_adjusted_revenue_requirement
                .value(),
            return_on_ratebase_pct: proportion_to_percent(fin.return_on_ratebase_pct),
            num_users: fin.num_users,
            volumetric_sales: fin.volumetric_sales.value(),
            fixed_charge_revenue: fin.fixed_charge_revenue.value(),
            variable_tariff: fin.variable_tariff.value(),
            converts_bill_per_user: bills.converts.for_utility(utility).value(),
            nonconverts_bill_per_user: bills.nonconverts.for_utility(utility).value(),
            converts_total_bill_per_user: bills.converts.total().value(),
            nonconverts_total_bill_per_user: bills.nonconverts.total().value(),
            num_converts: bills.num_converts,
            num_nonconverts: bills.num_nonconverts,
            converts_class_total_bill: bills.converts_class_total().value(),
            nonconverts_class_total_bill: bills.nonconverts_class_total().value(),
        }
    }

    /// Get the value of a metric
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Ratebase => self.ratebase,
            Metric::InflationAdjustedRatebase => self.inflation_adjusted_ratebase,
            Metric::DepreciationExpense => self.depreciation_expense,
            Metric::CapitalAdditions => self.capital_additions,
            Metric::GrowthTerm => self.growth_term,
            Metric::LppSpend => self.lpp_spend,
            Metric::NpaSpend => self.npa_spend,
            Metric::GridUpgradeSpend => self.grid_upgrade_spend,
            Metric::PerformanceIncentive => self.performance_incentive,
            Metric::OpexAdditions => self.opex_additions,
            Metric::MaintenanceCost => self.maintenance_cost,
            Metric::FixedOverheadCosts => self.fixed_overhead_costs,
            Metric::ReturnOnRatebase => self.return_on_ratebase,
            Metric::RevenueRequirement => self.revenue_requirement,
            Metric::InflationAdjustedRevenueRequirement => {
                self.inflation_adjusted_revenue_requirement
            }
            Metric::ReturnOnRatebasePct => self.return_on_ratebase_pct,
            Metric::NumUsers => self.num_users as f64,
            Metric::VolumetricSales => self.volumetric_sales,
            Metric::FixedChargeRevenue => self.fixed_charge_revenue,
            Metric::VariableTariff => self.variable_tariff,
            Metric::ConvertsBillPerUser => self.converts_bill_per_user,
            Metric::NonconvertsBillPerUser => self.nonconverts_bill_per_user,
            Metric::ConvertsTotalBillPerUser => self.converts_total_bill_per_user,
            Metric::NonconvertsTotalBillPerUser => self.nonconverts_total_bill_per_user,
            Metric::NumConverts => self.num_converts as f64,
            Metric::NumNonconverts => self.num_nonconverts as f64,
            Metric::ConvertsClassTotalBill => self.converts_class_total_bill,
            Metric::NonconvertsClassTotalBill => self.nonconverts_class_total_bill,
        }
    }
}

/// The results of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResults {
    /// The scenario run
    pub run: ScenarioRun,
    /// Gas utility financials
    pub gas: YearlyFinancials,
    /// Electric utility financials
    pub electric: YearlyFinancials,
    /// Household bills
    pub bills: BillsByYear,
}

impl ScenarioResults {
    /// The result rows for this scenario, ordered by year then utility
    pub fn rows(&self) -> impl Iterator<Item = ResultRow> + '_ {
        let scenario = self.run.scenario;
        self.gas
            .years
            .iter()
            .zip(&self.electric.years)
            .zip(&self.bills.years)
            .flat_map(move |((gas, electric), bills)| {
                [
                    ResultRow::new(scenario, Utility::Gas, gas, bills),
                    ResultRow::new(scenario, Utility::Electric, electric, bills),
                ]
            })
    }

    /// Warnings from both utilities
    pub fn warnings(&self) -> impl Iterator<Item = &ModelWarning> {
        self.gas.warnings.iter().chain(&self.electric.warnings)
    }
}

/// The results of every scenario, in enumeration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultsByScenario(IndexMap<Scenario, ScenarioResults>);

impl ResultsByScenario {
    /// Get the results for a scenario
    pub fn get(&self, scenario: Scenario) -> Option<&ScenarioResults> {
        self.0.get(&scenario)
    }

    /// Iterate over the scenarios' results in order
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioResults> {
        self.0.values()
    }

    /// The number of scenarios
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no scenarios
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every result row, ordered by scenario, then year, then utility
    pub fn rows(&self) -> impl Iterator<Item = ResultRow> + '_ {
        self.iter().flat_map(ScenarioResults::rows)
    }

    /// Warnings from every scenario
    pub fn warnings(&self) -> impl Iterator<Item = &ModelWarning> {
        self.iter().flat_map(ScenarioResults::warnings)
    }
}

impl FromIterator<ScenarioResults> for ResultsByScenario {
    fn from_iter<I: IntoIterator<Item = ScenarioResults>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|results| (results.run.scenario, results))
                .collect(),
        )
    }
}

/// Run the gas and electric engines and the bill allocator for one scenario
fn run_one(
    run: &ScenarioRun,
    input: &InputParams,
    web: &WebParams,
    ts: &TimeSeriesParams,
) -> Result<ScenarioResults> {
    let gas = run_scenario(Utility::Gas, input, web, ts, run)?;
    let electric = run_scenario(Utility::Electric, input, web, ts, run)?;
    let bills = allocate_bills(&gas, &electric, input)?;

    Ok(ScenarioResults {
        run: *run,
        gas,
        electric,
        bills,
    })
}

/// Run every scenario.
///
/// Scenarios are independent so are run in parallel. The results are returned in the order of
/// `scenarios`.
pub fn run_all_scenarios(
    scenarios: &[ScenarioRun],
    input: &InputParams,
    web: &WebParams,
    ts: &TimeSeriesParams,
) -> Result<ResultsByScenario> {
    debug!("Running {} scenarios", scenarios.len());
    let results = scenarios
        .par_iter()
        .map(|run| run_one(run, input, web, ts))
        .collect::<Result<Vec<_>>>()?;

    Ok(results.into_iter().collect())
}

/// One row of a comparison table
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// The year
    pub year: u32,
    /// The scenario
    pub scenario: Scenario,
    /// The utility
    pub utility: Utility,
    /// One value per compared metric
    pub values: Vec<f64>,
}

/// A table of selected metrics for every year, scenario and utility
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComparisonTable {
    /// The compared metrics, in column order
    pub compare_cols: Vec<Metric>,
    /// The rows
    pub rows: Vec<ComparisonRow>,
    /// Rows which could not be compared because the baseline has no matching key
    pub dropped_rows: usize,
}

impl ComparisonTable {
    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the value of a metric for a key, if present
    pub fn value(
        &self,
        year: u32,
        scenario: Scenario,
        utility: Utility,
        metric: Metric,
    ) -> Option<f64> {
        let col = self.compare_cols.iter().position(|m| *m == metric)?;
        self.rows
            .iter()
            .find(|row| row.year == year && row.scenario == scenario && row.utility == utility)
            .map(|row| row.values[col])
    }
}

/// Compare every scenario against `baseline`, including the baseline itself.
///
/// Rows are inner-joined with the baseline on `(year, utility_type)`; rows with no counterpart in
/// the baseline are skipped and counted in [`ComparisonTable::dropped_rows`].
pub fn compare_to(
    results: &ResultsByScenario,
    baseline: Scenario,
    compare_cols: &[Metric],
) -> ComparisonTable {
    let baseline_rows: HashMap<_, _> = results
        .get(baseline)
        .into_iter()
        .flat_map(ScenarioResults::rows)
        .map(|row| ((row.year, row.utility_type), row))
        .collect();

    let mut table = ComparisonTable {
        compare_cols: compare_cols.to_vec(),
        ..ComparisonTable::default()
    };
    for row in results.rows() {
        let Some(base) = baseline_rows.get(&(row.year, row.utility_type)) else {
            table.dropped_rows += 1;
            continue;
        };

        table.rows.push(ComparisonRow {
            year: row.year,
            scenario: row.scenario_id,
            utility: row.utility_type,
            values: compare_cols
                .iter()
                .map(|&metric| row.value(metric) - base.value(metric))
                .collect(),
        });
    }

    if table.dropped_rows > 0 {
        debug!(
            "{} rows had no {baseline} counterpart and were dropped",
            table.dropped_rows
        );
    }

    table
}

/// The difference between every non-BAU scenario and BAU for the given metrics
pub fn create_delta_df(results: &ResultsByScenario, compare_cols: &[Metric]) -> ComparisonTable {
    let mut table = compare_to(results, Scenario::Bau, compare_cols);
    table.rows.retain(|row| row.scenario != Scenario::Bau);
    table
}

/// The absolute values of the given metrics for every scenario, including BAU
pub fn return_absolute_values_df(
    results: &ResultsByScenario,
    compare_cols: &[Metric],
) -> ComparisonTable {
    ComparisonTable {
        compare_cols: compare_cols.to_vec(),
        rows: results
            .rows()
            .map(|row| ComparisonRow {
                year: row.year,
                scenario: row.scenario_id,
                utility: row.utility_type,
                values: compare_cols.iter().map(|&metric| row.value(metric)).collect(),
            })
            .collect(),
        dropped_rows: 0,
    }
}

/// One value of a comparison table in long format
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRow {
    pub year: u32,
    pub scenario_id: Scenario,
    pub utility_type: Utility,
    pub metric_name: Metric,
    pub metric_value: f64,
}

/// Reshape a comparison table into one row per value
pub fn transform_to_long_format(table: &ComparisonTable) -> Vec<LongRow> {
    table
        .rows
        .iter()
        .flat_map(|row| {
            table
                .compare_cols
                .iter()
                .zip(&row.values)
                .map(|(&metric_name, &metric_value)| LongRow {
                    year: row.year,
                    scenario_id: row.scenario,
                    utility_type: row.utility,
                    metric_name,
                    metric_value,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model_parameters, time_series};
    use crate::params::ModelParameters;
    use crate::scenario::enumerate_all_scenarios;
    use float_cmp::approx_eq;
    use itertools::Itertools;
    use rstest::{fixture, rstest};
    use strum::IntoEnumIterator;

    #[fixture]
    fn results(
        model_parameters: ModelParameters,
        time_series: TimeSeriesParams,
    ) -> ResultsByScenario {
        let (start_year, end_year) = model_parameters.analysis_years();
        let scenarios = enumerate_all_scenarios(start_year, end_year).unwrap();
        run_all_scenarios(
            &scenarios,
            &model_parameters.input,
            &model_parameters.web,
            &time_series,
        )
        .unwrap()
    }

    fn all_metrics() -> Vec<Metric> {
        Metric::iter().collect()
    }

    #[rstest]
    fn test_results_in_enumeration_order(results: ResultsByScenario) {
        itertools::assert_equal(
            results.iter().map(|r| r.run.scenario),
            Scenario::iter(),
        );
    }

    #[rstest]
    fn test_rows_uniquely_keyed(results: ResultsByScenario) {
        let rows = results.rows().collect_vec();
        assert_eq!(rows.len(), 26 * 7 * 2);
        assert!(
            rows.iter()
                .map(|row| (row.year, row.scenario_id, row.utility_type))
                .all_unique()
        );
    }

    #[rstest]
    fn test_baseline_against_itself_is_zero(results: ResultsByScenario) {
        let table = compare_to(&results, Scenario::Bau, &all_metrics());
        let bau_rows = table
            .rows
            .iter()
            .filter(|row| row.scenario == Scenario::Bau)
            .collect_vec();
        assert_eq!(bau_rows.len(), 26 * 2);
        assert!(bau_rows.iter().all(|row| row.values.iter().all(|v| *v == 0.0)));
    }

    #[rstest]
    fn test_delta_shape(results: ResultsByScenario) {
        let delta = create_delta_df(&results, DEFAULT_COMPARE_COLS);
        assert_eq!(delta.rows.len(), 26 * 6 * 2);
        assert_eq!(delta.dropped_rows, 0);
        assert!(delta.rows.iter().all(|row| row.scenario != Scenario::Bau));

        let absolute = return_absolute_values_df(&results, DEFAULT_COMPARE_COLS);
        assert_eq!(absolute.rows.len(), 26 * 7 * 2);
    }

    #[rstest]
    fn test_absolute_delta_consistency(results: ResultsByScenario) {
        let metrics = all_metrics();
        let delta = create_delta_df(&results, &metrics);
        let absolute = return_absolute_values_df(&results, &metrics);
        for row in &delta.rows {
            for (&metric, &value) in metrics.iter().zip(&row.values) {
                let get = |scenario| {
                    absolute
                        .value(row.year, scenario, row.utility, metric)
                        .unwrap()
                };
                let expected = get(row.scenario) - get(Scenario::Bau);
                assert!(approx_eq!(f64, value, expected, epsilon = 1e-9));
            }
        }
    }

    #[rstest]
    fn test_mismatched_years_are_dropped(
        model_parameters: ModelParameters,
        time_series: TimeSeriesParams,
    ) {
        let runs = [
            ScenarioRun {
                scenario: Scenario::Bau,
                start_year: 2025,
                end_year: 2030,
            },
            ScenarioRun {
                scenario: Scenario::GasCapex,
                start_year: 2025,
                end_year: 2035,
            },
        ];
        let results = run_all_scenarios(
            &runs,
            &model_parameters.input,
            &model_parameters.web,
            &time_series,
        )
        .unwrap();

        let delta = create_delta_df(&results, DEFAULT_COMPARE_COLS);
        assert_eq!(delta.rows.len(), 5 * 2);
        assert_eq!(delta.dropped_rows, 5 * 2);
    }

    #[rstest]
    fn test_delta_without_baseline_is_empty(
        model_parameters: ModelParameters,
        time_series: TimeSeriesParams,
    ) {
        let runs = [ScenarioRun {
            scenario: Scenario::Taxpayer,
            start_year: 2025,
            end_year: 2027,
        }];
        let results = run_all_scenarios(
            &runs,
            &model_parameters.input,
            &model_parameters.web,
            &time_series,
        )
        .unwrap();

        let delta = create_delta_df(&results, DEFAULT_COMPARE_COLS);
        assert!(delta.is_empty());
        assert_eq!(delta.dropped_rows, 4);
    }

    #[test]
    fn test_empty_results() {
        let results = ResultsByScenario::default();
        assert!(create_delta_df(&results, DEFAULT_COMPARE_COLS).is_empty());
        assert!(return_absolute_values_df(&results, DEFAULT_COMPARE_COLS).is_empty());
    }

    #[rstest]
    fn test_long_format(results: ResultsByScenario) {
        let table = return_absolute_values_df(
            &results,
            &[Metric::VariableTariff, Metric::RevenueRequirement],
        );
        let long = transform_to_long_format(&table);
        assert_eq!(long.len(), table.rows.len() * 2);

        let first = &long[0];
        assert_eq!(first.year, 2025);
        assert_eq!(first.scenario_id, Scenario::Bau);
        assert_eq!(first.utility_type, Utility::Gas);
        assert_eq!(first.metric_name, Metric::VariableTariff);
        assert_eq!(long[1].metric_name, Metric::RevenueRequirement);
        assert_eq!(first.metric_value, table.rows[0].values[0]);
    }
}
