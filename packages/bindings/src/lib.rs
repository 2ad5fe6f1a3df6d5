use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;

use measure_lattice_core::lattice::params::LatticeParams;
use measure_lattice_core::partition::axis::Axis;
use measure_lattice_core::partition::session::PartitionSession;
use measure_lattice_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_axis(axis: &str) -> NapiResult<Axis> {
    serde_json::from_value(serde_json::Value::String(axis.to_lowercase())).map_err(|_| {
        napi::Error::from_reason(format!(
            "axis must be 'vertical' or 'horizontal', got '{axis}'"
        ))
    })
}

fn to_decimal(field: &str, value: f64) -> NapiResult<Decimal> {
    Decimal::try_from(value)
        .map_err(|e| napi::Error::from_reason(format!("{field}: {value} is not representable: {e}")))
}

// ---------------------------------------------------------------------------
// Partition and sigma-algebra
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_partition(input_json: String) -> NapiResult<String> {
    let input: measure_lattice_core::partition::session::PartitionInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = measure_lattice_core::partition::session::analyze_partition(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sigma_algebra(input_json: String) -> NapiResult<String> {
    let input: measure_lattice_core::partition::sigma::SigmaAlgebraInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = measure_lattice_core::partition::sigma::analyze_sigma_algebra(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn filtration(input_json: String) -> NapiResult<String> {
    let input: measure_lattice_core::filtration::FiltrationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        measure_lattice_core::filtration::analyze_filtration(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn binomial_filtration(steps: u32, config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    let input = measure_lattice_core::filtration::binomial_filtration(steps, &config.limits)
        .map_err(to_napi_error)?;
    let output =
        measure_lattice_core::filtration::analyze_filtration(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Binomial lattice
// ---------------------------------------------------------------------------

#[napi]
pub fn build_lattice(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let params: LatticeParams = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output = measure_lattice_core::lattice::model::analyze_lattice(&params, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn enumerate_paths(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let params: LatticeParams = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output = measure_lattice_core::lattice::model::analyze_paths(&params, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn price_option(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let params: LatticeParams = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output = measure_lattice_core::lattice::model::price_european_option(&params, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn verify_martingale(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let params: LatticeParams = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output = measure_lattice_core::martingale::analyze_martingale(&params, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn binomial_model(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let params: LatticeParams = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output = measure_lattice_core::lattice::model::analyze_binomial_model(&params, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Interactive partition session
// ---------------------------------------------------------------------------

/// Partition state held on the JS side between edits.
#[napi]
pub struct PartitionSessionHandle {
    inner: PartitionSession,
}

#[napi]
impl PartitionSessionHandle {
    #[napi(constructor)]
    pub fn new(width: f64, height: f64, config_json: Option<String>) -> napi::Result<Self> {
        let config = parse_config(config_json)?;
        let inner = PartitionSession::new(
            to_decimal("width", width)?,
            to_decimal("height", height)?,
            config,
        )
        .map_err(to_napi_error)?;
        Ok(Self { inner })
    }

    /// Returns the outcome and the axis's cut list as JSON.
    #[napi]
    pub fn add_cut(&mut self, axis: String, coordinate: f64) -> NapiResult<String> {
        let update = self
            .inner
            .add_cut(parse_axis(&axis)?, to_decimal("coordinate", coordinate)?);
        serde_json::to_string(&update).map_err(to_napi_error)
    }

    #[napi]
    pub fn remove_cut(&mut self, axis: String, index: u32) -> NapiResult<String> {
        let update = self
            .inner
            .remove_cut(parse_axis(&axis)?, index as usize)
            .map_err(to_napi_error)?;
        serde_json::to_string(&update).map_err(to_napi_error)
    }

    #[napi]
    pub fn move_cut(&mut self, axis: String, index: u32, target: f64) -> NapiResult<String> {
        let update = self
            .inner
            .move_cut(parse_axis(&axis)?, index as usize, to_decimal("target", target)?)
            .map_err(to_napi_error)?;
        serde_json::to_string(&update).map_err(to_napi_error)
    }

    #[napi]
    pub fn assign_value(&mut self, atom_index: u32, value: f64) -> NapiResult<()> {
        self.inner
            .assign_value(atom_index as usize, to_decimal("value", value)?)
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn clear_value(&mut self, atom_index: u32) -> bool {
        self.inner.clear_value(atom_index as usize).is_some()
    }

    #[napi]
    pub fn atom_count(&self) -> u32 {
        self.inner.atom_count() as u32
    }

    #[napi]
    pub fn snapshot(&self) -> NapiResult<String> {
        let snapshot = self.inner.snapshot().map_err(to_napi_error)?;
        serde_json::to_string(&snapshot).map_err(to_napi_error)
    }
}
