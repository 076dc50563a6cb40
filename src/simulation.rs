//! Request-scoped entry points for running the model.
use crate::params::ModelParameters;
use crate::results::{
    ComparisonTable, DEFAULT_COMPARE_COLS, ResultsByScenario, create_delta_df,
    return_absolute_values_df, run_all_scenarios,
};
use crate::scenario::enumerate_all_scenarios;
use crate::time_series::build_time_series;
use crate::warning::ModelWarning;
use anyhow::Result;
use log::info;

/// The output of a model run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResults {
    /// The results of every scenario
    pub results: ResultsByScenario,
    /// Recoverable problems encountered while running
    pub warnings: Vec<ModelWarning>,
}

/// Run every scenario over the years `start_year..end_year`.
///
/// # Arguments
///
/// * `params` - The model parameters
/// * `start_year` - The first year to simulate
/// * `end_year` - The year after the last year to simulate
pub fn run(params: &ModelParameters, start_year: u32, end_year: u32) -> Result<SimulationResults> {
    let input = &params.input;
    let ts = build_time_series(
        &params.web,
        &input.shared,
        &input.gas,
        &input.electric,
        start_year,
        end_year,
    )?;
    let scenarios = enumerate_all_scenarios(start_year, end_year)?;
    let results = run_all_scenarios(&scenarios, input, &params.web, &ts)?;

    let warnings: Vec<_> = params
        .warnings()
        .into_iter()
        .chain(ts.warnings().iter().cloned())
        .chain(results.warnings().cloned())
        .collect();
    info!(
        "Simulated {} scenarios for {start_year}-{} with {} warnings",
        results.len(),
        end_year - 1,
        warnings.len()
    );

    Ok(SimulationResults { results, warnings })
}

/// The default comparison metrics as differences from BAU
pub fn to_delta(results: &SimulationResults) -> ComparisonTable {
    create_delta_df(&results.results, DEFAULT_COMPARE_COLS)
}

/// The default comparison metrics as absolute values
pub fn to_absolute(results: &SimulationResults) -> ComparisonTable {
    return_absolute_values_df(&results.results, DEFAULT_COMPARE_COLS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model_parameters;
    use crate::scenario::Scenario;
    use rstest::rstest;

    #[rstest]
    fn test_run(model_parameters: ModelParameters) {
        let (start_year, end_year) = model_parameters.analysis_years();
        let results = run(&model_parameters, start_year, end_year).unwrap();
        assert_eq!(results.results.len(), 7);
        assert!(results.warnings.is_empty());

        let delta = to_delta(&results);
        assert_eq!(delta.compare_cols, DEFAULT_COMPARE_COLS);
        assert!(delta.rows.iter().all(|row| row.scenario != Scenario::Bau));
        assert_eq!(to_absolute(&results).rows.len(), 26 * 7 * 2);
    }

    #[rstest]
    fn test_run_huge_program(mut model_parameters: ModelParameters) {
        model_parameters.web.npa_num_projects = 5_000_000_000;
        model_parameters.web.num_converts = 5_000_000_000;
        let results = run(&model_parameters, 2025, 2030).unwrap();
        assert!(results.warnings.contains(&ModelWarning::NpaHouseholdsExceedGasUsers {
            per_year: u64::MAX,
            gas_users: 10000
        }));
    }

    #[rstest]
    fn test_run_invalid_years(model_parameters: ModelParameters) {
        assert!(run(&model_parameters, 2030, 2030).is_err());
    }

    #[rstest]
    fn test_run_collects_warnings(mut model_parameters: ModelParameters) {
        model_parameters.input.gas.num_users_init = 100;
        let results = run(&model_parameters, 2025, 2030).unwrap();
        assert!(matches!(
            results.warnings.first(),
            Some(ModelWarning::NpaHouseholdsExceedGasUsers { .. })
        ));
        assert!(
            results
                .warnings
                .iter()
                .any(|w| matches!(w, ModelWarning::ConversionsExceedCustomers { .. }))
        );
    }
}
