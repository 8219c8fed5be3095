//! # Simple gas models
//!
//! Minimal implementations of the phase API contracts:
//!
//! - **`SimpleGas`**: ideal gas mixture with constant per-species heat capacities and
//!   formation enthalpies, `h_k = W_k (h°_k + cp_k (T - 298.15))`
//! - **`ConstantTransport`**: temperature-independent transport coefficients, reported
//!   as "mixture-averaged" or "multicomponent"
//! - **`InertKinetics`** and **`OneStepKinetics`** (irreversible A => B with an
//!   Arrhenius rate, first order in A)
//!
//! They are enough to drive the flow domain in tests and demos without a full
//! thermochemical database.
use super::phase_api::{Kinetics, PhaseError, ThermoPhase, Transport, TransportFactory};
use nalgebra::DMatrix;

/// Universal gas constant, J/(kmol·K)
pub const GAS_CONSTANT: f64 = 8314.46261815324;
/// One standard atmosphere, Pa
pub const ONE_ATM: f64 = 101325.0;
const T_REF: f64 = 298.15;

#[derive(Debug, Clone)]
pub struct SimpleGas {
    name: String,
    species: Vec<String>,
    mw: Vec<f64>,
    cp: Vec<f64>,
    h_formation: Vec<f64>,
    max_temp: f64,
    T: f64,
    P: f64,
    Y: Vec<f64>,
}

impl SimpleGas {
    /// Creates a gas from (species name, molecular weight kg/kmol) pairs.
    /// The initial state is 300 K, 1 atm, pure first species.
    pub fn new(species: Vec<(String, f64)>) -> Self {
        let n = species.len();
        let (names, mw): (Vec<String>, Vec<f64>) = species.into_iter().unzip();
        let mut Y = vec![0.0; n];
        if n > 0 {
            Y[0] = 1.0;
        }
        Self {
            name: "simple-gas".to_string(),
            species: names,
            mw,
            cp: vec![1000.0; n],
            h_formation: vec![0.0; n],
            max_temp: 3500.0,
            T: 300.0,
            P: ONE_ATM,
            Y,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// heat capacities, J/(kg·K)
    pub fn with_cp(mut self, cp: Vec<f64>) -> Self {
        self.cp = cp;
        self
    }

    /// formation enthalpies at 298.15 K, J/kg
    pub fn with_formation_enthalpies(mut self, h: Vec<f64>) -> Self {
        self.h_formation = h;
        self
    }

    pub fn with_max_temp(mut self, t: f64) -> Self {
        self.max_temp = t;
        self
    }

    fn check_len(&self, Y: &[f64]) -> Result<(), PhaseError> {
        if Y.len() != self.species.len() {
            return Err(PhaseError::InvalidComposition(format!(
                "expected {} mass fractions, got {}",
                self.species.len(),
                Y.len()
            )));
        }
        Ok(())
    }
}

impl ThermoPhase for SimpleGas {
    fn name(&self) -> String {
        self.name.clone()
    }
    fn n_species(&self) -> usize {
        self.species.len()
    }
    fn species_name(&self, k: usize) -> String {
        self.species.get(k).cloned().unwrap_or_default()
    }
    fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s == name)
    }
    fn molecular_weights(&self) -> Vec<f64> {
        self.mw.clone()
    }
    fn max_temp(&self) -> f64 {
        self.max_temp
    }

    fn set_temperature(&mut self, T: f64) -> Result<(), PhaseError> {
        if !T.is_finite() || T <= 0.0 {
            return Err(PhaseError::InvalidTemperature(T));
        }
        self.T = T;
        Ok(())
    }
    fn temperature(&self) -> f64 {
        self.T
    }
    fn set_pressure(&mut self, P: f64) -> Result<(), PhaseError> {
        if !P.is_finite() || P <= 0.0 {
            return Err(PhaseError::InvalidPressure(P));
        }
        self.P = P;
        Ok(())
    }
    fn pressure(&self) -> f64 {
        self.P
    }
    fn set_mass_fractions(&mut self, Y: &[f64]) -> Result<(), PhaseError> {
        self.check_len(Y)?;
        let clipped: Vec<f64> = Y.iter().map(|y| y.max(0.0)).collect();
        let sum: f64 = clipped.iter().sum();
        if sum <= 0.0 {
            return Err(PhaseError::InvalidComposition(
                "mass fractions sum to zero".to_string(),
            ));
        }
        self.Y = clipped.iter().map(|y| y / sum).collect();
        Ok(())
    }
    fn set_mass_fractions_no_norm(&mut self, Y: &[f64]) -> Result<(), PhaseError> {
        self.check_len(Y)?;
        self.Y.copy_from_slice(Y);
        Ok(())
    }
    fn get_mass_fractions(&self, Y: &mut [f64]) {
        Y.copy_from_slice(&self.Y);
    }

    fn density(&self) -> f64 {
        self.P * self.mean_molecular_weight() / (GAS_CONSTANT * self.T)
    }
    fn mean_molecular_weight(&self) -> f64 {
        let s: f64 = self.Y.iter().zip(&self.mw).map(|(y, w)| y / w).sum();
        1.0 / s
    }
    fn cp_mass(&self) -> f64 {
        self.Y.iter().zip(&self.cp).map(|(y, c)| y * c).sum()
    }
    fn get_partial_molar_enthalpies(&self, hk: &mut [f64]) {
        for (k, h) in hk.iter_mut().enumerate() {
            *h = self.mw[k] * (self.h_formation[k] + self.cp[k] * (self.T - T_REF));
        }
    }
}

/// Temperature-independent transport coefficients
#[derive(Debug, Clone)]
pub struct ConstantTransport {
    model: String,
    pub viscosity: f64,
    pub conductivity: f64,
    pub diffusivity: Vec<f64>,
    pub thermal_diffusion: Vec<f64>,
}

impl ConstantTransport {
    fn with_model(model: &str, n_species: usize) -> Self {
        Self {
            model: model.to_string(),
            viscosity: 1.8e-5,
            conductivity: 0.026,
            diffusivity: vec![2.0e-5; n_species],
            thermal_diffusion: vec![0.0; n_species],
        }
    }

    pub fn mixture_averaged(n_species: usize) -> Self {
        Self::with_model("mixture-averaged", n_species)
    }

    /// D(k, m) = D_k off the diagonal, zero on it
    pub fn multicomponent(n_species: usize) -> Self {
        Self::with_model("multicomponent", n_species)
    }

    /// placeholder model that the flow domain must reject
    pub fn none(n_species: usize) -> Self {
        Self::with_model("none", n_species)
    }

    pub fn with_diffusivity(mut self, d: Vec<f64>) -> Self {
        self.diffusivity = d;
        self
    }

    pub fn with_thermal_diffusion(mut self, dt: Vec<f64>) -> Self {
        self.thermal_diffusion = dt;
        self
    }

    /// factory understanding "mixture-averaged", "multicomponent" and "none"
    pub fn factory(n_species: usize) -> TransportFactory {
        Box::new(move |name: &str| match name {
            "mixture-averaged" | "multicomponent" | "none" => {
                Ok(Box::new(Self::with_model(name, n_species)) as Box<dyn Transport>)
            }
            other => Err(PhaseError::UnknownTransportModel(other.to_string())),
        })
    }
}

impl Transport for ConstantTransport {
    fn transport_model(&self) -> String {
        self.model.clone()
    }
    fn viscosity(&mut self, _thermo: &dyn ThermoPhase) -> Result<f64, PhaseError> {
        Ok(self.viscosity)
    }
    fn thermal_conductivity(&mut self, _thermo: &dyn ThermoPhase) -> Result<f64, PhaseError> {
        Ok(self.conductivity)
    }
    fn get_mix_diff_coeffs(
        &mut self,
        _thermo: &dyn ThermoPhase,
        d: &mut [f64],
    ) -> Result<(), PhaseError> {
        d.copy_from_slice(&self.diffusivity);
        Ok(())
    }
    fn get_multi_diff_coeffs(
        &mut self,
        _thermo: &dyn ThermoPhase,
        d: &mut DMatrix<f64>,
    ) -> Result<(), PhaseError> {
        let n = self.diffusivity.len();
        for k in 0..n {
            for m in 0..n {
                d[(k, m)] = if k == m { 0.0 } else { self.diffusivity[k] };
            }
        }
        Ok(())
    }
    fn get_thermal_diff_coeffs(
        &mut self,
        _thermo: &dyn ThermoPhase,
        dt: &mut [f64],
    ) -> Result<(), PhaseError> {
        dt.copy_from_slice(&self.thermal_diffusion);
        Ok(())
    }
}

/// No reactions
#[derive(Debug, Clone, Copy, Default)]
pub struct InertKinetics;

impl Kinetics for InertKinetics {
    fn get_net_production_rates(
        &mut self,
        _thermo: &dyn ThermoPhase,
        wdot: &mut [f64],
    ) -> Result<(), PhaseError> {
        wdot.fill(0.0);
        Ok(())
    }
}

/// Irreversible A => B, rate = A_pre exp(-Ea/RT) [A]. Product rate is scaled by
/// W_A/W_B so that the reaction conserves mass.
#[derive(Debug, Clone)]
pub struct OneStepKinetics {
    pub reactant: usize,
    pub product: usize,
    pub pre_exponential: f64,
    /// J/kmol
    pub activation_energy: f64,
}

impl Kinetics for OneStepKinetics {
    fn get_net_production_rates(
        &mut self,
        thermo: &dyn ThermoPhase,
        wdot: &mut [f64],
    ) -> Result<(), PhaseError> {
        let n = thermo.n_species();
        if self.reactant >= n || self.product >= n {
            return Err(PhaseError::CalculationError(
                "reaction refers to a species outside the phase".to_string(),
            ));
        }
        let mut Y = vec![0.0; n];
        thermo.get_mass_fractions(&mut Y);
        let mw = thermo.molecular_weights();
        let T = thermo.temperature();
        let k = self.pre_exponential * (-self.activation_energy / (GAS_CONSTANT * T)).exp();
        let conc = thermo.density() * Y[self.reactant] / mw[self.reactant];
        let rate = k * conc;
        wdot.fill(0.0);
        wdot[self.reactant] = -rate;
        wdot[self.product] += rate * mw[self.reactant] / mw[self.product];
        Ok(())
    }
}
