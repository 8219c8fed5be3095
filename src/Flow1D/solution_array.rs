//! # Solution array
//!
//! Generic record of named per-point series plus a JSON metadata map, used to
//! store a flow domain and to restore it later.
//!
//! | field | content |
//! |-------|---------|
//! | `grid` | coordinates |
//! | `velocity`, `spread_rate`, `T`, `lambda`, species names | active components |
//! | `D` | density |
//! | `radiative-heat-loss` | only when radiation is enabled |
//!
//! Metadata keys written by [`StFlow::get_meta`]: `type`, `points`,
//! `transport-model`, `phase` (`name`, `source`), `radiation-enabled`,
//! `emissivity-left`, `emissivity-right`, `energy-enabled` (bool or per point),
//! `Soret-enabled`, `species-enabled` (bool or per species), `refine-criteria`,
//! `fixed-point` (`location`, `temperature`).
use super::StFlow::StFlow;
use super::flow_config::FlowMode;
use super::flow_error::FlowError;
use super::grid_layout::{C_OFFSET_Y, Grid};
use super::phase_api::Transport;
use super::refine_criteria::RefineCriteria;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolutionArray {
    points: usize,
    /// Pa
    pressure: f64,
    names: Vec<String>,
    data: HashMap<String, Vec<f64>>,
    meta: Map<String, Value>,
}

impl SolutionArray {
    pub fn new(points: usize, pressure: f64, meta: Map<String, Value>) -> Self {
        Self {
            points,
            pressure,
            names: Vec::new(),
            data: HashMap::new(),
            meta,
        }
    }

    pub fn n_points(&self) -> usize {
        self.points
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Adds or replaces a series; its length must equal the number of points
    pub fn set_component(&mut self, name: &str, values: Vec<f64>) -> Result<(), FlowError> {
        if values.len() != self.points {
            return Err(FlowError::SizeMismatch(format!(
                "component '{}' has {} values, the array has {} points",
                name,
                values.len(),
                self.points
            )));
        }
        if !self.data.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.data.insert(name.to_string(), values);
        Ok(())
    }

    pub fn get_component(&self, name: &str) -> Option<&[f64]> {
        self.data.get(name).map(|v| v.as_slice())
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn remove_component(&mut self, name: &str) -> Option<Vec<f64>> {
        self.names.retain(|n| n != name);
        self.data.remove(name)
    }

    /// names in insertion order
    pub fn component_names(&self) -> &[String] {
        &self.names
    }

    pub fn to_json_string(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Metadata parsed and validated before anything is applied to the domain
struct MetaUpdate {
    /// replacement model, `None` if the current one already matches
    transport: Option<Box<dyn Transport>>,
    energy: Option<Vec<bool>>,
    soret: Option<bool>,
    species: Option<Vec<bool>>,
    radiation: Option<(bool, Option<(f64, f64)>)>,
    refine: Option<RefineCriteria>,
    fixed_point: Option<(f64, f64)>,
}

fn meta_error(key: &str, expected: &str) -> FlowError {
    FlowError::InvalidMetadata(format!("'{}' must be {}", key, expected))
}

fn as_f64(value: &Value, key: &str) -> Result<f64, FlowError> {
    value.as_f64().ok_or_else(|| meta_error(key, "a number"))
}

fn as_bool(value: &Value, key: &str) -> Result<bool, FlowError> {
    value.as_bool().ok_or_else(|| meta_error(key, "a boolean"))
}

/// `true` if every flag agrees, in which case a single value is stored
fn uniform(flags: &[bool]) -> Option<bool> {
    match flags.first() {
        Some(&first) if flags.iter().all(|&f| f == first) => Some(first),
        _ => None,
    }
}

impl StFlow {
    pub fn get_meta(&self) -> Map<String, Value> {
        let sol = self.solution.borrow();
        let thermo = sol.thermo();
        let mut state = Map::new();
        state.insert("type".into(), json!(self.domain_type()));
        state.insert("points".into(), json!(self.n_points()));
        state.insert("transport-model".into(), json!(sol.transport_model()));
        state.insert(
            "phase".into(),
            json!({
                "name": thermo.name(),
                "source": thermo.source().unwrap_or_else(|| "<unknown>".to_string()),
            }),
        );

        state.insert("radiation-enabled".into(), json!(self.do_radiation));
        if self.do_radiation {
            state.insert("emissivity-left".into(), json!(self.epsilon_left));
            state.insert("emissivity-right".into(), json!(self.epsilon_right));
        }

        match uniform(&self.do_energy) {
            Some(e) => state.insert("energy-enabled".into(), json!(e)),
            None => state.insert("energy-enabled".into(), json!(self.do_energy)),
        };

        state.insert("Soret-enabled".into(), json!(self.do_soret));

        match uniform(&self.do_species) {
            Some(s) => {
                state.insert("species-enabled".into(), json!(s));
            }
            None => {
                let mut species = Map::new();
                for (k, &flag) in self.do_species.iter().enumerate() {
                    species.insert(thermo.species_name(k), json!(flag));
                }
                state.insert("species-enabled".into(), Value::Object(species));
            }
        }

        let criteria = self.refiner.criteria();
        state.insert(
            "refine-criteria".into(),
            json!({
                "ratio": criteria.ratio,
                "slope": criteria.slope,
                "curve": criteria.curve,
                "prune": criteria.prune,
                "grid-min": criteria.grid_min,
                "max-points": criteria.max_points,
            }),
        );

        if let Some((location, temperature)) = self.fixed_point {
            state.insert(
                "fixed-point".into(),
                json!({ "location": location, "temperature": temperature }),
            );
        }
        state
    }

    /// `n` is the number of points the metadata will be applied to
    fn parse_meta(&self, state: &Map<String, Value>, n: usize) -> Result<MetaUpdate, FlowError> {
        if let Some(t) = state.get("type").and_then(Value::as_str) {
            match FlowMode::from_domain_type(t) {
                Some(mode) if mode == self.flow_mode => {}
                Some(mode) => warn!(
                    "metadata of a {} domain applied to {} domain '{}'",
                    mode, self.flow_mode, self.id
                ),
                None => warn!(
                    "metadata of unknown type '{}' applied to '{}' domain '{}'",
                    t,
                    self.domain_type(),
                    self.id
                ),
            }
        }

        let energy = match state.get("energy-enabled") {
            None => None,
            Some(Value::Bool(e)) => Some(vec![*e; n]),
            Some(Value::Array(values)) => {
                if values.len() != n {
                    return Err(FlowError::InvalidMetadata(format!(
                        "'energy-enabled' has {} entries for {} points",
                        values.len(),
                        n
                    )));
                }
                Some(
                    values
                        .iter()
                        .map(|v| as_bool(v, "energy-enabled"))
                        .collect::<Result<Vec<bool>, FlowError>>()?,
                )
            }
            Some(_) => return Err(meta_error("energy-enabled", "a boolean or an array")),
        };

        let transport_model = match state.get("transport-model") {
            None => "mixture-averaged".to_string(),
            Some(v) => v
                .as_str()
                .ok_or_else(|| meta_error("transport-model", "a string"))?
                .to_string(),
        };
        if transport_model == "none" {
            return Err(FlowError::InvalidTransportModel(transport_model));
        }
        let transport = self
            .solution
            .borrow()
            .build_transport_model(&transport_model)?;
        if let Some(t) = &transport {
            if t.transport_model() == "none" {
                return Err(FlowError::InvalidTransportModel(t.transport_model()));
            }
        }

        let soret = match state.get("Soret-enabled") {
            None => None,
            Some(v) => Some(as_bool(v, "Soret-enabled")?),
        };

        let nsp = self.n_species();
        let species = match state.get("species-enabled") {
            None => None,
            Some(Value::Bool(s)) => Some(vec![*s; nsp]),
            Some(Value::Object(map)) => {
                let sol = self.solution.borrow();
                let mut flags = self.do_species.clone();
                for (k, flag) in flags.iter_mut().enumerate() {
                    if let Some(v) = map.get(&sol.thermo().species_name(k)) {
                        *flag = as_bool(v, "species-enabled")?;
                    }
                }
                Some(flags)
            }
            Some(_) => return Err(meta_error("species-enabled", "a boolean or a map")),
        };

        let radiation = match state.get("radiation-enabled") {
            None => None,
            Some(v) => {
                let enabled = as_bool(v, "radiation-enabled")?;
                if enabled {
                    let left = as_f64(
                        state.get("emissivity-left").unwrap_or(&Value::Null),
                        "emissivity-left",
                    )?;
                    let right = as_f64(
                        state.get("emissivity-right").unwrap_or(&Value::Null),
                        "emissivity-right",
                    )?;
                    for (side, value) in [("left", left), ("right", right)] {
                        if !(0.0..=1.0).contains(&value) {
                            return Err(FlowError::InvalidEmissivity { side, value });
                        }
                    }
                    Some((true, Some((left, right))))
                } else {
                    Some((false, None))
                }
            }
        };

        let refine = match state.get("refine-criteria") {
            None => None,
            Some(Value::Object(c)) => {
                let current = *self.refiner.criteria();
                let get = |key: &str, default: f64| -> Result<f64, FlowError> {
                    c.get(key).map_or(Ok(default), |v| as_f64(v, key))
                };
                let max_points = match c.get("max-points") {
                    None => current.max_points,
                    Some(v) => v
                        .as_u64()
                        .ok_or_else(|| meta_error("max-points", "a non-negative integer"))?
                        as usize,
                };
                let criteria = RefineCriteria {
                    ratio: get("ratio", current.ratio)?,
                    slope: get("slope", current.slope)?,
                    curve: get("curve", current.curve)?,
                    prune: get("prune", current.prune)?,
                    grid_min: get("grid-min", current.grid_min)?,
                    max_points,
                };
                criteria.validate()?;
                Some(criteria)
            }
            Some(_) => return Err(meta_error("refine-criteria", "a map")),
        };

        let fixed_point = match state.get("fixed-point") {
            None => None,
            Some(fp) => Some((
                as_f64(
                    fp.get("location").unwrap_or(&Value::Null),
                    "fixed-point.location",
                )?,
                as_f64(
                    fp.get("temperature").unwrap_or(&Value::Null),
                    "fixed-point.temperature",
                )?,
            )),
        };

        Ok(MetaUpdate {
            transport,
            energy,
            soret,
            species,
            radiation,
            refine,
            fixed_point,
        })
    }

    fn apply_meta(&mut self, update: MetaUpdate) -> Result<(), FlowError> {
        if let Some(transport) = update.transport {
            self.solution.borrow_mut().set_transport(transport);
        }
        self.sync_models()?;

        if let Some(energy) = update.energy {
            self.do_energy = energy;
        }
        if let Some(soret) = update.soret {
            self.do_soret = soret;
        }
        if let Some(species) = update.species {
            self.do_species = species;
        }
        if let Some((enabled, emissivities)) = update.radiation {
            self.do_radiation = enabled;
            if let Some((left, right)) = emissivities {
                self.epsilon_left = left;
                self.epsilon_right = right;
            }
        }
        if let Some(criteria) = update.refine {
            self.refiner.set_criteria(criteria)?;
        }
        if let Some(fp) = update.fixed_point {
            self.fixed_point = Some(fp);
        }
        Ok(())
    }

    /// Reapplies flags stored by `get_meta`. Invalid metadata leaves the domain unchanged.
    pub fn set_meta(&mut self, state: &Map<String, Value>) -> Result<(), FlowError> {
        let update = self.parse_meta(state, self.n_points())?;
        self.apply_meta(update)
    }

    /// Exports the grid, the active components of the domain-local state `soln`,
    /// the density and the radiative heat loss together with the metadata
    pub fn as_array(&self, soln: &[f64]) -> Result<SolutionArray, FlowError> {
        if soln.len() != self.size() {
            return Err(FlowError::SizeMismatch(format!(
                "state of domain '{}' has length {}, expected {}",
                self.id,
                soln.len(),
                self.size()
            )));
        }
        let n = self.n_points();
        let mut arr = SolutionArray::new(n, self.press, self.get_meta());
        arr.set_component("grid", self.grid.z().to_vec())?;
        for i in 0..self.n_components() {
            if !self.component_active(i) {
                continue;
            }
            let data: Vec<f64> = (0..n).map(|j| soln[self.layout.index(i, j)]).collect();
            arr.set_component(&self.component_name(i), data)?;
        }
        // density rather than pressure
        arr.set_component("D", self.rho.clone())?;
        if self.do_radiation {
            arr.set_component("radiative-heat-loss", self.qdot_radiation.clone())?;
        }
        Ok(arr)
    }

    /// Restores the grid, component values and flags from `arr` into the
    /// domain-local state `soln`, then refreshes the properties on the whole
    /// domain. `soln` must be sized for the array's point count. Series
    /// lengths and metadata are checked first; on failure nothing changes.
    pub fn from_array(&mut self, arr: &SolutionArray, soln: &mut [f64]) -> Result<(), FlowError> {
        let z = arr
            .get_component("grid")
            .ok_or_else(|| FlowError::InvalidMetadata("solution array has no grid".to_string()))?;
        let grid = Grid::new(z)?;
        let n = grid.n_points();
        if soln.len() != self.layout.size(n) {
            return Err(FlowError::SizeMismatch(format!(
                "state of domain '{}' has length {}, the array needs {}",
                self.id,
                soln.len(),
                self.layout.size(n)
            )));
        }
        if arr.n_points() != n {
            return Err(FlowError::SizeMismatch(format!(
                "solution array declares {} points, its grid has {}",
                arr.n_points(),
                n
            )));
        }
        for name in (0..self.n_components()).map(|i| self.component_name(i)) {
            if let Some(data) = arr.get_component(&name) {
                if data.len() != n {
                    return Err(FlowError::SizeMismatch(format!(
                        "component '{}' has {} values, the grid has {} points",
                        name,
                        data.len(),
                        n
                    )));
                }
            }
        }
        let update = self.parse_meta(arr.meta(), n)?;

        self.setup_grid(grid.z())?;
        self.press = arr.pressure();
        self.apply_meta(update)?;

        for i in 0..self.n_components() {
            if !self.component_active(i) {
                continue;
            }
            let name = self.component_name(i);
            match arr.get_component(&name) {
                Some(data) => {
                    for (j, value) in data.iter().enumerate() {
                        soln[self.layout.index(i, j)] = *value;
                    }
                }
                None => warn!(
                    "Saved state does not contain values for component '{}' in domain '{}'",
                    name, self.id
                ),
            }
        }

        self.update_properties(soln, 0, n - 1)?;
        if self.do_radiation {
            self.compute_radiation(soln, 0, n - 1);
        }
        info!(
            "domain '{}' restored: {} points, {} species",
            self.id,
            n,
            self.n_components() - C_OFFSET_Y
        );
        Ok(())
    }
}
