//! Flow mode and user-facing configuration of a flow domain.
//!
//! A `FlowConfig` can be kept in a JSON file:
//! ```json
//! {
//!   "flow_mode": "axisymmetric-flow",
//!   "pressure": 101325.0,
//!   "soret": false,
//!   "radiation": { "enabled": true, "emissivity_left": 0.1, "emissivity_right": 0.0 },
//!   "refine": { "ratio": 10.0, "slope": 0.8, "curve": 0.8, "prune": -0.001,
//!               "grid-min": 1e-10, "max-points": 1000 }
//! }
//! ```
use super::StFlow::StFlow;
use super::flow_error::FlowError;
use super::refine_criteria::RefineCriteria;
use super::simple_gas_models::ONE_ATM;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Selects the continuity, momentum and lambda formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMode {
    /// freely propagating flame; the flame position is pinned by a fixed temperature point
    #[serde(rename = "free-flow")]
    Free,
    /// stagnation / counterflow geometry with spread rate and lambda
    #[serde(rename = "axisymmetric-flow")]
    Axisymmetric,
    /// burner-stabilized flow with fixed mass flow rate
    #[serde(rename = "unstrained-flow")]
    Unstrained,
}

impl FlowMode {
    pub fn domain_type(&self) -> &'static str {
        match self {
            FlowMode::Free => "free-flow",
            FlowMode::Axisymmetric => "axisymmetric-flow",
            FlowMode::Unstrained => "unstrained-flow",
        }
    }

    pub fn from_domain_type(name: &str) -> Option<Self> {
        match name {
            "free-flow" => Some(FlowMode::Free),
            "axisymmetric-flow" => Some(FlowMode::Axisymmetric),
            "unstrained-flow" => Some(FlowMode::Unstrained),
            _ => None,
        }
    }

    /// spread rate and lambda are solved only in axisymmetric flows
    pub fn uses_lambda(&self) -> bool {
        matches!(self, FlowMode::Axisymmetric)
    }

    pub fn is_free(&self) -> bool {
        matches!(self, FlowMode::Free)
    }

    /// viscosity enters only the momentum equation
    pub fn default_viscosity(&self) -> bool {
        self.uses_lambda()
    }
}

impl fmt::Display for FlowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.domain_type())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiationConfig {
    pub enabled: bool,
    pub emissivity_left: f64,
    pub emissivity_right: f64,
}

impl Default for RadiationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            emissivity_left: 0.0,
            emissivity_right: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPointConfig {
    pub location: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub flow_mode: FlowMode,
    /// Pa
    pub pressure: f64,
    /// overrides the flow mode default when set
    pub viscosity: Option<bool>,
    pub soret: bool,
    pub radiation: RadiationConfig,
    /// refresh transport on the whole domain even while a Jacobian is assembled
    pub force_full_update: bool,
    pub refine: RefineCriteria,
    pub fixed_point: Option<FixedPointConfig>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::new(FlowMode::Axisymmetric)
    }
}

impl FlowConfig {
    pub fn new(flow_mode: FlowMode) -> Self {
        Self {
            flow_mode,
            pressure: ONE_ATM,
            viscosity: None,
            soret: false,
            radiation: RadiationConfig::default(),
            force_full_update: false,
            refine: RefineCriteria::default(),
            fixed_point: None,
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, FlowError> {
        let content = fs::read_to_string(path)?;
        let config: FlowConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FlowError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks every value that the domain setters would reject
    pub fn validate(&self) -> Result<(), FlowError> {
        for (side, value) in [
            ("left", self.radiation.emissivity_left),
            ("right", self.radiation.emissivity_right),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FlowError::InvalidEmissivity { side, value });
            }
        }
        if !(self.pressure > 0.0) {
            return Err(FlowError::InvalidMetadata(format!(
                "pressure must be positive, got {}",
                self.pressure
            )));
        }
        self.refine.validate()
    }

    /// Applies the configuration to an existing domain. Nothing is changed when
    /// validation fails.
    pub fn apply(&self, flow: &mut StFlow) -> Result<(), FlowError> {
        if flow.flow_mode() != self.flow_mode {
            return Err(FlowError::InvalidMetadata(format!(
                "flow mode is fixed at construction: domain is '{}', configuration asks for '{}'",
                flow.flow_mode(),
                self.flow_mode
            )));
        }
        self.validate()?;
        flow.set_pressure(self.pressure);
        if let Some(dovisc) = self.viscosity {
            flow.set_viscosity_flag(dovisc);
        }
        flow.enable_soret(self.soret);
        flow.set_boundary_emissivities(
            self.radiation.emissivity_left,
            self.radiation.emissivity_right,
        )?;
        flow.enable_radiation(self.radiation.enabled);
        flow.set_force_full_update(self.force_full_update);
        flow.set_refine_criteria(self.refine)?;
        if let Some(fp) = self.fixed_point {
            flow.set_fixed_point(fp.location, fp.temperature);
        }
        Ok(())
    }
}
