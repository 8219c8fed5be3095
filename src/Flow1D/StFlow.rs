//! # StFlow: one-dimensional reacting flow domain
//!
//! `StFlow` turns the state of a stretched (axisymmetric), freely propagating or
//! unstrained flow on a 1D grid into residuals of the governing equations. The
//! nonlinear solver that drives it lives elsewhere: it calls [`StFlow::eval`]
//! either for the whole domain or for the band of points around one perturbed
//! point while it assembles a banded Jacobian.
//!
//! ## Ownership of the models
//! The domain does not own the thermo, kinetics and transport models. It keeps a
//! shared handle to a caller-owned [`Solution`] and subscribes to it on
//! construction; the subscription is removed in `Drop`. Replacing a model in the
//! solution raises the domain's stale flag and the domain re-reads the transport
//! model before its next evaluation.
//!
//! ## Internal buffers
//! Thermo properties, transport coefficients, diffusive fluxes and radiative
//! losses are cached in domain-private buffers. Every evaluation rewrites the
//! entries it reads before reading them, so the result of `eval` depends only on
//! the state handed in and on the configuration (grid, flags, fixed point).
use super::flow_config::{FlowConfig, FlowMode};
use super::flow_error::FlowError;
use super::grid_layout::{
    C_OFFSET_E, C_OFFSET_L, C_OFFSET_T, C_OFFSET_U, C_OFFSET_V, C_OFFSET_Y, Diag, Grid,
    StateLayout, linear_interp,
};
use super::phase_api::Solution;
use super::refine_criteria::{GridRefiner, RefineCriteria};
use log::{debug, info, warn};
use nalgebra::DMatrix;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct StFlow {
    pub(super) id: String,
    pub(super) solution: Rc<RefCell<Solution>>,
    subscription: usize,
    models_changed: Rc<Cell<bool>>,
    pub(super) flow_mode: FlowMode,
    pub(super) layout: StateLayout,
    pub(super) grid: Grid,
    loc: usize,
    first_point: usize,
    pub(super) press: f64,
    /// molecular weights
    pub(super) wt: Vec<f64>,

    // per point
    pub(super) rho: Vec<f64>,
    pub(super) wtm: Vec<f64>,
    pub(super) cp: Vec<f64>,
    pub(super) wdot: DMatrix<f64>,
    pub(super) hk: DMatrix<f64>,
    pub(super) qdot_radiation: Vec<f64>,
    pub(super) fixedtemp: Vec<f64>,

    // per interval
    pub(super) visc: Vec<f64>,
    pub(super) tcon: Vec<f64>,
    /// mixture-averaged: rho W_k D_k / W; multicomponent: rho W_k / W^2
    pub(super) diff: DMatrix<f64>,
    pub(super) multidiff: Vec<DMatrix<f64>>,
    pub(super) dthermal: DMatrix<f64>,
    pub(super) flux: DMatrix<f64>,

    pub(super) do_energy: Vec<bool>,
    pub(super) do_species: Vec<bool>,
    pub(super) do_multicomponent: bool,
    pub(super) do_soret: bool,
    pub(super) do_radiation: bool,
    pub(super) dovisc: bool,
    force_full_update: bool,
    pub(super) epsilon_left: f64,
    pub(super) epsilon_right: f64,
    /// indices of CO2 and H2O
    pub(super) k_radiating: [Option<usize>; 2],

    /// (location, temperature) pinning a free flame
    pub(super) fixed_point: Option<(f64, f64)>,
    zfix: Vec<f64>,
    tfix: Vec<f64>,
    pub(super) k_excess_left: usize,
    pub(super) k_excess_right: usize,

    pub(super) refiner: GridRefiner,
    lower: Vec<f64>,
    upper: Vec<f64>,
    prev: Option<Vec<f64>>,
    jac_update_needed: bool,
}

impl StFlow {
    /// Creates a domain with `points` uniformly spaced points on [0, 1).
    ///
    /// Fails if the solution's transport model is "none" or if fewer than two
    /// points are requested.
    pub fn new(
        solution: Rc<RefCell<Solution>>,
        id: &str,
        points: usize,
        flow_mode: FlowMode,
    ) -> Result<Self, FlowError> {
        let grid = Grid::uniform(points)?;
        let (nsp, wt, press, max_temp, k_radiating, model) = {
            let sol = solution.borrow();
            let thermo = sol.thermo();
            (
                thermo.n_species(),
                thermo.molecular_weights(),
                thermo.pressure(),
                thermo.max_temp(),
                [thermo.species_index("CO2"), thermo.species_index("H2O")],
                sol.transport_model(),
            )
        };
        if model == "none" {
            return Err(FlowError::InvalidTransportModel(model));
        }
        let layout = StateLayout::new(nsp);
        let nv = layout.n_components();
        let (subscription, models_changed) = solution.borrow_mut().subscribe();

        let mut refiner = GridRefiner::new(nv);
        for n in [C_OFFSET_U, C_OFFSET_V, C_OFFSET_T, C_OFFSET_L] {
            refiner.set_active(n, false);
        }

        let mut lower = vec![-1e20; nv];
        let mut upper = vec![1e20; nv];
        lower[C_OFFSET_T] = 200.0;
        upper[C_OFFSET_T] = 2.0 * max_temp;
        for k in 0..nsp {
            lower[layout.species(k)] = -1.0e-7;
            upper[layout.species(k)] = 1.0e5;
        }

        let mut flow = Self {
            id: id.to_string(),
            solution,
            subscription,
            models_changed,
            flow_mode,
            layout,
            grid,
            loc: 0,
            first_point: 0,
            press,
            wt,
            rho: Vec::new(),
            wtm: Vec::new(),
            cp: Vec::new(),
            wdot: DMatrix::zeros(0, 0),
            hk: DMatrix::zeros(0, 0),
            qdot_radiation: Vec::new(),
            fixedtemp: Vec::new(),
            visc: Vec::new(),
            tcon: Vec::new(),
            diff: DMatrix::zeros(0, 0),
            multidiff: Vec::new(),
            dthermal: DMatrix::zeros(0, 0),
            flux: DMatrix::zeros(0, 0),
            do_energy: Vec::new(),
            do_species: vec![true; nsp],
            do_multicomponent: is_multicomponent(&model),
            do_soret: false,
            do_radiation: false,
            dovisc: flow_mode.default_viscosity(),
            force_full_update: false,
            epsilon_left: 0.0,
            epsilon_right: 0.0,
            k_radiating,
            fixed_point: None,
            zfix: Vec::new(),
            tfix: Vec::new(),
            k_excess_left: 0,
            k_excess_right: 0,
            refiner,
            lower,
            upper,
            prev: None,
            jac_update_needed: false,
        };
        flow.allocate(points);
        info!(
            "created {} domain '{}': {} points, {} species, transport '{}'",
            flow_mode, flow.id, points, nsp, model
        );
        Ok(flow)
    }

    /// Creates a domain and applies `config` to it
    pub fn from_config(
        solution: Rc<RefCell<Solution>>,
        id: &str,
        points: usize,
        config: &FlowConfig,
    ) -> Result<Self, FlowError> {
        let mut flow = Self::new(solution, id, points, config.flow_mode)?;
        config.apply(&mut flow)?;
        Ok(flow)
    }

    /// (re)allocates every per-point and per-interval buffer
    fn allocate(&mut self, points: usize) {
        let nsp = self.layout.n_species();
        let intervals = points - 1;
        self.rho = vec![0.0; points];
        self.wtm = vec![0.0; points];
        self.cp = vec![0.0; points];
        self.wdot = DMatrix::zeros(nsp, points);
        self.hk = DMatrix::zeros(nsp, points);
        self.qdot_radiation = vec![0.0; points];
        self.fixedtemp.resize(points, 0.0);
        self.do_energy.resize(points, false);

        self.visc = vec![0.0; intervals];
        self.tcon = vec![0.0; intervals];
        self.diff = DMatrix::zeros(nsp, intervals);
        self.flux = DMatrix::zeros(nsp, intervals);
        self.allocate_multicomponent(intervals);

        if let Some(prev) = &self.prev {
            if prev.len() != self.layout.size(points) {
                self.prev = None;
            }
        }
    }

    fn allocate_multicomponent(&mut self, intervals: usize) {
        let nsp = self.layout.n_species();
        if self.do_multicomponent {
            self.multidiff = vec![DMatrix::zeros(nsp, nsp); intervals];
            self.dthermal = DMatrix::zeros(nsp, intervals);
        } else {
            self.multidiff = Vec::new();
            self.dthermal = DMatrix::zeros(0, 0);
        }
    }

    /// Re-reads the transport model after the solution reported a model change
    pub(super) fn sync_models(&mut self) -> Result<(), FlowError> {
        if !self.models_changed.get() {
            return Ok(());
        }
        let model = self.solution.borrow().transport_model();
        if model == "none" {
            return Err(FlowError::InvalidTransportModel(model));
        }
        self.do_multicomponent = is_multicomponent(&model);
        self.allocate_multicomponent(self.n_points() - 1);
        self.models_changed.set(false);
        debug!("domain '{}' now uses transport '{}'", self.id, model);
        Ok(())
    }

    ////////////////////////////////////////GRID///////////////////////////////////////////////

    /// Replaces the grid. On failure nothing changes.
    pub fn setup_grid(&mut self, z: &[f64]) -> Result<(), FlowError> {
        let grid = Grid::new(z)?;
        if grid.n_points() != self.n_points() {
            self.allocate(grid.n_points());
        }
        self.grid = grid;
        Ok(())
    }

    /// Reallocates all buffers for `points` points. `n_components` must match the
    /// species count of the phase. When the point count changes the grid is
    /// replaced by a uniform one over the current span; call `setup_grid` next.
    pub fn resize(&mut self, n_components: usize, points: usize) -> Result<(), FlowError> {
        if n_components != self.layout.n_components() {
            return Err(FlowError::SizeMismatch(format!(
                "domain '{}' has {} components per point, got {}",
                self.id,
                self.layout.n_components(),
                n_components
            )));
        }
        if points < 2 {
            return Err(FlowError::InvalidGrid(format!(
                "at least two grid points are required, got {}",
                points
            )));
        }
        if points != self.n_points() {
            let (z0, z1) = (self.grid.z_at(0), self.grid.z_at(self.n_points() - 1));
            let z: Vec<f64> = (0..points)
                .map(|j| z0 + (z1 - z0) * j as f64 / (points - 1) as f64)
                .collect();
            self.grid = Grid::new(&z)?;
        }
        self.allocate(points);
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn z(&self, j: usize) -> f64 {
        self.grid.z_at(j)
    }

    pub fn n_points(&self) -> usize {
        self.grid.n_points()
    }

    pub fn n_species(&self) -> usize {
        self.layout.n_species()
    }

    pub fn n_components(&self) -> usize {
        self.layout.n_components()
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    /// position of component `n` at point `j` in a domain-local state slice
    pub fn index(&self, n: usize, j: usize) -> usize {
        self.layout.index(n, j)
    }

    /// Places this domain in a multi-domain state vector: its block starts at
    /// `loc` and its first point has global index `first_point`.
    pub fn locate(&mut self, loc: usize, first_point: usize) {
        self.loc = loc;
        self.first_point = first_point;
    }

    pub fn loc(&self) -> usize {
        self.loc
    }

    pub fn first_point(&self) -> usize {
        self.first_point
    }

    pub fn last_point(&self) -> usize {
        self.first_point + self.n_points() - 1
    }

    /// length of the domain-local slice of the state vector
    pub fn size(&self) -> usize {
        self.layout.size(self.n_points())
    }

    ////////////////////////////////////////CONFIGURATION//////////////////////////////////////

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flow_mode(&self) -> FlowMode {
        self.flow_mode
    }

    pub fn domain_type(&self) -> &'static str {
        self.flow_mode.domain_type()
    }

    pub fn transport_model(&self) -> String {
        self.solution.borrow().transport_model()
    }

    pub fn is_multicomponent(&self) -> bool {
        self.do_multicomponent
    }

    pub fn set_pressure(&mut self, p: f64) {
        self.press = p;
    }

    pub fn pressure(&self) -> f64 {
        self.press
    }

    pub fn set_viscosity_flag(&mut self, dovisc: bool) {
        self.dovisc = dovisc;
    }

    /// Soret requires multicomponent transport; the check happens in `finalize`
    pub fn enable_soret(&mut self, with_soret: bool) {
        self.do_soret = with_soret;
    }

    pub fn with_soret(&self) -> bool {
        self.do_soret
    }

    pub fn enable_radiation(&mut self, do_radiation: bool) {
        self.do_radiation = do_radiation;
    }

    pub fn radiation_enabled(&self) -> bool {
        self.do_radiation
    }

    pub fn set_boundary_emissivities(&mut self, e_left: f64, e_right: f64) -> Result<(), FlowError> {
        if !(0.0..=1.0).contains(&e_left) {
            return Err(FlowError::InvalidEmissivity {
                side: "left",
                value: e_left,
            });
        }
        if !(0.0..=1.0).contains(&e_right) {
            return Err(FlowError::InvalidEmissivity {
                side: "right",
                value: e_right,
            });
        }
        self.epsilon_left = e_left;
        self.epsilon_right = e_right;
        Ok(())
    }

    pub fn left_emissivity(&self) -> f64 {
        self.epsilon_left
    }

    pub fn right_emissivity(&self) -> f64 {
        self.epsilon_right
    }

    /// Refresh transport on the whole domain even during banded evaluation
    pub fn set_force_full_update(&mut self, force: bool) {
        self.force_full_update = force;
    }

    pub fn force_full_update(&self) -> bool {
        self.force_full_update
    }

    pub fn refiner(&self) -> &GridRefiner {
        &self.refiner
    }

    pub fn set_refine_criteria(&mut self, criteria: RefineCriteria) -> Result<(), FlowError> {
        self.refiner.set_criteria(criteria)
    }

    pub fn set_bounds(&mut self, n: usize, lower: f64, upper: f64) -> Result<(), FlowError> {
        if n >= self.n_components() {
            return Err(FlowError::SizeMismatch(format!(
                "component {} out of range",
                n
            )));
        }
        self.lower[n] = lower;
        self.upper[n] = upper;
        Ok(())
    }

    pub fn lower_bound(&self, n: usize) -> f64 {
        self.lower[n]
    }

    pub fn upper_bound(&self, n: usize) -> f64 {
        self.upper[n]
    }

    ////////////////////////////////////////FIXED POINT / TEMPERATURE//////////////////////////

    pub fn set_fixed_point(&mut self, z: f64, t: f64) {
        self.fixed_point = Some((z, t));
    }

    /// (location, temperature)
    pub fn fixed_point(&self) -> Option<(f64, f64)> {
        self.fixed_point
    }

    /// Stores a reference temperature profile on the normalized coordinate
    /// (z - z0)/(zN - z0). `finalize` interpolates it onto the current grid
    /// when the energy equation is off.
    pub fn set_fixed_temp_profile(&mut self, zfixed: &[f64], tfixed: &[f64]) -> Result<(), FlowError> {
        if zfixed.len() != tfixed.len() || zfixed.is_empty() {
            return Err(FlowError::SizeMismatch(format!(
                "fixed temperature profile needs matching non-empty arrays, got {} and {}",
                zfixed.len(),
                tfixed.len()
            )));
        }
        self.zfix = zfixed.to_vec();
        self.tfix = tfixed.to_vec();
        Ok(())
    }

    pub fn fixed_temp_profile(&self) -> (&[f64], &[f64]) {
        (&self.zfix, &self.tfix)
    }

    /// Pins the temperature at point `j` and disables the energy equation there
    pub fn set_temperature(&mut self, j: usize, t: f64) -> Result<(), FlowError> {
        self.check_point(j)?;
        self.fixedtemp[j] = t;
        self.do_energy[j] = false;
        Ok(())
    }

    /// temperature imposed at `j` while the energy equation is off there
    pub fn t_fixed(&self, j: usize) -> f64 {
        self.fixedtemp[j]
    }

    /// Enables the energy equation at point `j`, or everywhere for `None`
    pub fn solve_energy_eqn(&mut self, j: Option<usize>) {
        let changed = self.set_energy_flags(j, true);
        self.refiner.set_active(C_OFFSET_U, true);
        self.refiner.set_active(C_OFFSET_V, true);
        self.refiner.set_active(C_OFFSET_T, true);
        if changed {
            self.need_jac_update();
        }
    }

    /// Disables the energy equation at point `j`, or everywhere for `None`
    pub fn fix_temperature(&mut self, j: Option<usize>) {
        let changed = self.set_energy_flags(j, false);
        self.refiner.set_active(C_OFFSET_U, false);
        self.refiner.set_active(C_OFFSET_V, false);
        self.refiner.set_active(C_OFFSET_T, false);
        if changed {
            self.need_jac_update();
        }
    }

    fn set_energy_flags(&mut self, j: Option<usize>, value: bool) -> bool {
        match j {
            None => {
                let changed = self.do_energy.iter().any(|&e| e != value);
                self.do_energy.fill(value);
                changed
            }
            Some(j) => match self.do_energy.get_mut(j) {
                Some(flag) => {
                    let changed = *flag != value;
                    *flag = value;
                    changed
                }
                None => false,
            },
        }
    }

    pub fn do_energy(&self, j: usize) -> bool {
        self.do_energy[j]
    }

    pub fn solve_species(&mut self, k: Option<usize>) {
        if self.set_species_flags(k, true) {
            self.need_jac_update();
        }
    }

    pub fn fix_species(&mut self, k: Option<usize>) {
        if self.set_species_flags(k, false) {
            self.need_jac_update();
        }
    }

    fn set_species_flags(&mut self, k: Option<usize>, value: bool) -> bool {
        match k {
            None => {
                let changed = self.do_species.iter().any(|&s| s != value);
                self.do_species.fill(value);
                changed
            }
            Some(k) => match self.do_species.get_mut(k) {
                Some(flag) => {
                    let changed = *flag != value;
                    *flag = value;
                    changed
                }
                None => false,
            },
        }
    }

    pub fn do_species(&self, k: usize) -> bool {
        self.do_species[k]
    }

    fn need_jac_update(&mut self) {
        self.jac_update_needed = true;
    }

    /// true once a change of equation structure made the solver's Jacobian stale
    pub fn needs_jacobian_update(&self) -> bool {
        self.jac_update_needed
    }

    pub fn clear_jacobian_update(&mut self) {
        self.jac_update_needed = false;
    }

    fn check_point(&self, j: usize) -> Result<(), FlowError> {
        if j >= self.n_points() {
            return Err(FlowError::SizeMismatch(format!(
                "point {} out of range for domain '{}' with {} points",
                j,
                self.id,
                self.n_points()
            )));
        }
        Ok(())
    }

    ////////////////////////////////////////ELECTRIC FIELD/////////////////////////////////////

    fn not_implemented(&self, what: &str) -> FlowError {
        FlowError::NotImplemented(format!(
            "{} is not used by '{}' domains",
            what,
            self.domain_type()
        ))
    }

    pub fn solve_electric_field(&mut self, _j: Option<usize>) -> Result<(), FlowError> {
        Err(self.not_implemented("solve_electric_field"))
    }

    pub fn fix_electric_field(&mut self, _j: Option<usize>) -> Result<(), FlowError> {
        Err(self.not_implemented("fix_electric_field"))
    }

    pub fn do_electric_field(&self, _j: usize) -> Result<bool, FlowError> {
        Err(self.not_implemented("do_electric_field"))
    }

    pub fn solving_stage(&self) -> Result<usize, FlowError> {
        Err(self.not_implemented("solving_stage"))
    }

    pub fn set_solving_stage(&mut self, _stage: usize) -> Result<(), FlowError> {
        Err(self.not_implemented("set_solving_stage"))
    }

    ////////////////////////////////////////COMPONENTS/////////////////////////////////////////

    pub fn component_name(&self, n: usize) -> String {
        match n {
            C_OFFSET_U => "velocity".to_string(),
            C_OFFSET_V => "spread_rate".to_string(),
            C_OFFSET_T => "T".to_string(),
            C_OFFSET_L => "lambda".to_string(),
            C_OFFSET_E => "eField".to_string(),
            _ if n < self.n_components() => {
                self.solution.borrow().thermo().species_name(n - C_OFFSET_Y)
            }
            _ => "<unknown>".to_string(),
        }
    }

    pub fn component_index(&self, name: &str) -> Result<usize, FlowError> {
        match name {
            "velocity" => Ok(C_OFFSET_U),
            "spread_rate" => Ok(C_OFFSET_V),
            "T" => Ok(C_OFFSET_T),
            "lambda" => Ok(C_OFFSET_L),
            "eField" => Ok(C_OFFSET_E),
            _ => self
                .solution
                .borrow()
                .thermo()
                .species_index(name)
                .map(|k| self.layout.species(k))
                .ok_or_else(|| FlowError::UnknownComponent(name.to_string())),
        }
    }

    /// spread rate and lambda only take part in axisymmetric flows; eField never does
    pub fn component_active(&self, n: usize) -> bool {
        match n {
            C_OFFSET_V | C_OFFSET_L => self.flow_mode.uses_lambda(),
            C_OFFSET_E => false,
            _ => true,
        }
    }

    ////////////////////////////////////////STATE HELPERS//////////////////////////////////////

    fn check_local(&self, len: usize, what: &str) -> Result<(), FlowError> {
        if len != self.size() {
            return Err(FlowError::SizeMismatch(format!(
                "{} of domain '{}' has length {}, expected {}",
                what,
                self.id,
                len,
                self.size()
            )));
        }
        Ok(())
    }

    /// Fills T and Y at every point from the current thermo state
    pub fn get_initial_solution(&mut self, x: &mut [f64]) -> Result<(), FlowError> {
        self.check_local(x.len(), "state")?;
        let nsp = self.n_species();
        let sol = self.solution.borrow();
        let thermo = sol.thermo();
        let mut Y = vec![0.0; nsp];
        thermo.get_mass_fractions(&mut Y);
        for j in 0..self.n_points() {
            x[self.layout.index(C_OFFSET_T, j)] = thermo.temperature();
            let iy = self.layout.index(C_OFFSET_Y, j);
            x[iy..iy + nsp].copy_from_slice(&Y);
            self.rho[j] = thermo.density();
        }
        Ok(())
    }

    /// Normalizes the mass fractions at every point through the thermo model
    pub fn reset_bad_values(&mut self, x: &mut [f64]) -> Result<(), FlowError> {
        self.check_local(x.len(), "state")?;
        let nsp = self.n_species();
        let mut sol = self.solution.borrow_mut();
        let thermo = sol.thermo_mut();
        for j in 0..self.n_points() {
            let iy = self.layout.index(C_OFFSET_Y, j);
            let Y = &mut x[iy..iy + nsp];
            thermo.set_mass_fractions(Y)?;
            thermo.get_mass_fractions(Y);
        }
        Ok(())
    }

    /// Stores `x` as the previous time-step solution read by the transient terms
    pub fn init_time_integration(&mut self, dt: f64, x: &[f64]) -> Result<(), FlowError> {
        self.check_local(x.len(), "state")?;
        if !(dt > 0.0) {
            return Err(FlowError::InvalidMetadata(format!(
                "time step must be positive, got {}",
                dt
            )));
        }
        self.prev = Some(x.to_vec());
        Ok(())
    }

    pub fn set_steady_mode(&mut self) {
        self.prev = None;
    }

    pub fn is_steady(&self) -> bool {
        self.prev.is_none()
    }

    /// value of entry `i` at the previous time step; the current value in steady mode
    #[inline]
    pub(super) fn prev_value(&self, x: &[f64], i: usize) -> f64 {
        match &self.prev {
            Some(prev) => prev[i],
            None => x[i],
        }
    }

    pub fn density(&self, j: usize) -> f64 {
        self.rho[j]
    }

    pub fn radiative_heat_loss(&self) -> &[f64] {
        &self.qdot_radiation
    }

    /// diffusive mass flux of species `k` across interval `j`, kg/(m²·s)
    pub fn diffusive_flux(&self, k: usize, j: usize) -> f64 {
        self.flux[(k, j)]
    }

    /// viscosity on interval `j`
    pub fn viscosity(&self, j: usize) -> f64 {
        self.visc[j]
    }

    /// thermal conductivity on interval `j`
    pub fn thermal_conductivity(&self, j: usize) -> f64 {
        self.tcon[j]
    }

    pub fn left_excess_species(&self) -> usize {
        self.k_excess_left
    }

    pub fn right_excess_species(&self) -> usize {
        self.k_excess_right
    }

    ////////////////////////////////////////FINALIZE / EVAL////////////////////////////////////

    /// Prepares the domain for solving with the domain-local state `x`: checks
    /// the transport setup, captures the fixed temperature profile and
    /// relocates the fixed point of a free flame onto the current grid.
    pub fn finalize(&mut self, x: &[f64]) -> Result<(), FlowError> {
        self.sync_models()?;
        self.check_local(x.len(), "state")?;
        if !self.do_multicomponent && self.do_soret {
            return Err(FlowError::SoretRequiresMulticomponent);
        }
        debug!(
            "finalizing domain '{}': {} points, energy {}",
            self.id,
            self.n_points(),
            if self.do_energy[0] { "on" } else { "off" }
        );

        let e = self.do_energy[0];
        for j in 0..self.n_points() {
            self.fixedtemp[j] = if e || self.zfix.is_empty() {
                self.T(x, j)
            } else {
                linear_interp(self.grid.normalized(j), &self.zfix, &self.tfix)
            };
        }
        if e {
            self.solve_energy_eqn(None);
        }

        if self.flow_mode.is_free() {
            if let Some((zfixed, tfixed)) = self.fixed_point {
                if self.grid.z().iter().any(|&z| z == zfixed) {
                    return Ok(());
                }
                for j in 0..self.n_points() - 1 {
                    // where the temperature profile crosses the fixed temperature
                    if (self.T(x, j) - tfixed) * (self.T(x, j + 1) - tfixed) <= 0.0 {
                        self.fixed_point = Some((self.z(j + 1), self.T(x, j + 1)));
                        debug!(
                            "domain '{}': fixed point moved to z = {}, T = {}",
                            self.id,
                            self.z(j + 1),
                            self.T(x, j + 1)
                        );
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates residuals and their classification.
    ///
    /// `jg` is the global index of a perturbed point while a Jacobian is built,
    /// `None` for the whole domain. Only this domain's block of `x`, `rsd` and
    /// `diag` (see [`StFlow::locate`]) is read or written. `rdt` weights the
    /// transient terms (reciprocal time step, zero for steady problems).
    pub fn eval(
        &mut self,
        jg: Option<usize>,
        x_global: &[f64],
        rsd_global: &mut [f64],
        diag_global: &mut [Diag],
        rdt: f64,
    ) -> Result<(), FlowError> {
        // a perturbed point outside this domain's band of influence changes nothing here
        if let Some(j) = jg {
            if j + 1 < self.first_point || j > self.last_point() + 1 {
                return Ok(());
            }
        }
        self.sync_models()?;
        if self.do_soret && !self.do_multicomponent {
            return Err(FlowError::SoretRequiresMulticomponent);
        }

        let n = self.size();
        let end = self.loc + n;
        if x_global.len() < end || rsd_global.len() < end || diag_global.len() < end {
            return Err(FlowError::SizeMismatch(format!(
                "domain '{}' needs entries {}..{} of the global vectors",
                self.id, self.loc, end
            )));
        }
        let x = &x_global[self.loc..end];
        let rsd = &mut rsd_global[self.loc..end];
        let diag = &mut diag_global[self.loc..end];

        let last = self.n_points() - 1;
        let (jmin, jmax) = match jg {
            None => (0, last),
            Some(j) => {
                let jpt = j as isize - self.first_point as isize;
                (
                    (jpt - 1).max(0) as usize,
                    (jpt + 1).min(last as isize) as usize,
                )
            }
        };

        self.update_properties(x, jmin, jmax)?;
        if self.do_radiation {
            self.compute_radiation(x, jmin, jmax);
        }

        self.eval_continuity(x, rsd, diag, rdt, jmin, jmax);
        self.eval_momentum(x, rsd, diag, rdt, jmin, jmax);
        self.eval_energy(x, rsd, diag, rdt, jmin, jmax);
        self.eval_lambda(x, rsd, diag, rdt, jmin, jmax);
        self.eval_electric_field(x, rsd, diag, rdt, jmin, jmax);
        self.eval_species(x, rsd, diag, rdt, jmin, jmax);
        Ok(())
    }
}

impl Drop for StFlow {
    fn drop(&mut self) {
        match self.solution.try_borrow_mut() {
            Ok(mut sol) => sol.unsubscribe(self.subscription),
            Err(_) => warn!(
                "domain '{}' dropped while its solution is borrowed; subscriber slot {} stays registered",
                self.id, self.subscription
            ),
        }
    }
}

fn is_multicomponent(model: &str) -> bool {
    model == "multicomponent" || model == "multicomponent-CK"
}
