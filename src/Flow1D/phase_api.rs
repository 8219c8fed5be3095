//! # Phase API
//!
//! Contracts of the models the flow domain queries but does not own:
//!
//! - **`ThermoPhase`**: thermodynamic state of the gas (T, P, composition) and the
//!   properties derived from it (density, mean molecular weight, heat capacity,
//!   partial molar enthalpies).
//! - **`Transport`**: viscosity, thermal conductivity and diffusion data evaluated
//!   at the state currently held by a `ThermoPhase`.
//! - **`Kinetics`**: net molar production rates at the current thermo state.
//!
//! All three are grouped in a **`Solution`** which is owned by the caller and
//! shared with the domains through `Rc<RefCell<Solution>>`. A domain subscribes
//! when it is created and unsubscribes when it is dropped. When the transport or
//! kinetics model of the solution is replaced, every subscriber is marked stale
//! and resynchronizes itself before its next evaluation.
use nalgebra::DMatrix;
use std::cell::Cell;
use std::rc::Rc;
use thiserror::Error;

/// Failures reported by the thermo, transport and kinetics models
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhaseError {
    #[error("Invalid temperature: {0}")]
    InvalidTemperature(f64),
    #[error("Invalid pressure: {0}")]
    InvalidPressure(f64),
    #[error("Invalid composition: {0}")]
    InvalidComposition(String),
    #[error("Unknown transport model: {0}")]
    UnknownTransportModel(String),
    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Thermodynamic state of an ideal or real gas mixture
pub trait ThermoPhase {
    fn name(&self) -> String;
    /// file or library the phase definition came from, if known
    fn source(&self) -> Option<String> {
        None
    }
    fn n_species(&self) -> usize;
    fn species_name(&self, k: usize) -> String;
    fn species_index(&self, name: &str) -> Option<usize>;
    /// molecular weights, kg/kmol
    fn molecular_weights(&self) -> Vec<f64>;
    fn max_temp(&self) -> f64;

    fn set_temperature(&mut self, T: f64) -> Result<(), PhaseError>;
    fn temperature(&self) -> f64;
    fn set_pressure(&mut self, P: f64) -> Result<(), PhaseError>;
    fn pressure(&self) -> f64;
    /// sets mass fractions after normalizing them to unit sum
    fn set_mass_fractions(&mut self, Y: &[f64]) -> Result<(), PhaseError>;
    /// sets mass fractions as given
    fn set_mass_fractions_no_norm(&mut self, Y: &[f64]) -> Result<(), PhaseError>;
    fn get_mass_fractions(&self, Y: &mut [f64]);

    /// kg/m³
    fn density(&self) -> f64;
    /// kg/kmol
    fn mean_molecular_weight(&self) -> f64;
    /// J/(kg·K)
    fn cp_mass(&self) -> f64;
    /// J/kmol
    fn get_partial_molar_enthalpies(&self, hk: &mut [f64]);
}

/// Transport properties evaluated at the state held by `thermo`
pub trait Transport {
    /// model tag: "mixture-averaged", "multicomponent", "multicomponent-CK" ... or "none"
    fn transport_model(&self) -> String;
    /// Pa·s
    fn viscosity(&mut self, thermo: &dyn ThermoPhase) -> Result<f64, PhaseError>;
    /// W/(m·K)
    fn thermal_conductivity(&mut self, thermo: &dyn ThermoPhase) -> Result<f64, PhaseError>;
    /// mixture-averaged diffusion coefficients, m²/s
    fn get_mix_diff_coeffs(
        &mut self,
        thermo: &dyn ThermoPhase,
        d: &mut [f64],
    ) -> Result<(), PhaseError>;
    /// multicomponent diffusion coefficients D(k, m), m²/s
    fn get_multi_diff_coeffs(
        &mut self,
        thermo: &dyn ThermoPhase,
        d: &mut DMatrix<f64>,
    ) -> Result<(), PhaseError>;
    /// thermal diffusion coefficients, kg/(m·s)
    fn get_thermal_diff_coeffs(
        &mut self,
        thermo: &dyn ThermoPhase,
        dt: &mut [f64],
    ) -> Result<(), PhaseError>;
}

/// Homogeneous reaction rates evaluated at the state held by `thermo`
pub trait Kinetics {
    /// net molar production rates, kmol/(m³·s)
    fn get_net_production_rates(
        &mut self,
        thermo: &dyn ThermoPhase,
        wdot: &mut [f64],
    ) -> Result<(), PhaseError>;
}

/// builds a transport model from its name
pub type TransportFactory = Box<dyn Fn(&str) -> Result<Box<dyn Transport>, PhaseError>>;

/// Externally owned aggregate of thermo, kinetics and transport models.
///
/// Subscribers are kept in a slot arena: an id returned by `subscribe` stays
/// valid until `unsubscribe`, after which its slot can be handed out again.
/// Each live id maps to exactly one stale-flag.
pub struct Solution {
    thermo: Box<dyn ThermoPhase>,
    kinetics: Box<dyn Kinetics>,
    transport: Box<dyn Transport>,
    transport_factory: Option<TransportFactory>,
    subscribers: Vec<Option<Rc<Cell<bool>>>>,
}

impl Solution {
    pub fn new(
        thermo: Box<dyn ThermoPhase>,
        kinetics: Box<dyn Kinetics>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            thermo,
            kinetics,
            transport,
            transport_factory: None,
            subscribers: Vec::new(),
        }
    }

    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    pub fn thermo(&self) -> &dyn ThermoPhase {
        self.thermo.as_ref()
    }

    pub fn thermo_mut(&mut self) -> &mut dyn ThermoPhase {
        self.thermo.as_mut()
    }

    pub fn transport_model(&self) -> String {
        self.transport.transport_model()
    }

    /// Borrows the thermo state together with the transport model
    pub fn thermo_and_transport(&mut self) -> (&mut dyn ThermoPhase, &mut dyn Transport) {
        (self.thermo.as_mut(), self.transport.as_mut())
    }

    /// Borrows the thermo state together with the kinetics model
    pub fn thermo_and_kinetics(&mut self) -> (&mut dyn ThermoPhase, &mut dyn Kinetics) {
        (self.thermo.as_mut(), self.kinetics.as_mut())
    }

    pub fn set_kinetics(&mut self, kinetics: Box<dyn Kinetics>) {
        self.kinetics = kinetics;
        self.notify_changed();
    }

    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = transport;
        self.notify_changed();
    }

    /// Builds the transport model named `name` with the registered factory
    /// without installing it. Returns `None` if the current model already has
    /// that name.
    pub fn build_transport_model(
        &self,
        name: &str,
    ) -> Result<Option<Box<dyn Transport>>, PhaseError> {
        if self.transport.transport_model() == name {
            return Ok(None);
        }
        let factory = self
            .transport_factory
            .as_ref()
            .ok_or_else(|| PhaseError::UnknownTransportModel(name.to_string()))?;
        Ok(Some(factory(name)?))
    }

    /// Replaces the transport model by one built from `name` with the registered factory.
    /// Nothing happens if the current model already has that name.
    pub fn set_transport_model(&mut self, name: &str) -> Result<(), PhaseError> {
        if let Some(transport) = self.build_transport_model(name)? {
            self.set_transport(transport);
        }
        Ok(())
    }

    /// Registers a subscriber. Returns its id and the flag raised on every model change.
    pub fn subscribe(&mut self) -> (usize, Rc<Cell<bool>>) {
        let flag = Rc::new(Cell::new(false));
        let slot = Some(Rc::clone(&flag));
        match self.subscribers.iter().position(Option::is_none) {
            Some(id) => {
                self.subscribers[id] = slot;
                (id, flag)
            }
            None => {
                self.subscribers.push(slot);
                (self.subscribers.len() - 1, flag)
            }
        }
    }

    pub fn unsubscribe(&mut self, id: usize) {
        if let Some(slot) = self.subscribers.get_mut(id) {
            *slot = None;
        }
    }

    pub fn n_subscribers(&self) -> usize {
        self.subscribers.iter().filter(|s| s.is_some()).count()
    }

    fn notify_changed(&self) {
        for flag in self.subscribers.iter().flatten() {
            flag.set(true);
        }
    }
}
