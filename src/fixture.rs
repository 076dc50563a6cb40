//! Fixtures for tests

use crate::params::{InputParams, ModelParameters};
use crate::time_series::{TimeSeriesParams, build_time_series};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The bundled sample model
pub const SAMPLE_MODEL_TOML: &str = include_str!("../presets/sample.toml");

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters::from_toml_str("sample", SAMPLE_MODEL_TOML).unwrap()
}

#[fixture]
pub fn input_params(model_parameters: ModelParameters) -> InputParams {
    model_parameters.input
}

#[fixture]
pub fn time_series(model_parameters: ModelParameters) -> TimeSeriesParams {
    let (start_year, end_year) = model_parameters.analysis_years();
    let input = &model_parameters.input;
    build_time_series(
        &model_parameters.web,
        &input.shared,
        &input.gas,
        &input.electric,
        start_year,
        end_year,
    )
    .unwrap()
}
