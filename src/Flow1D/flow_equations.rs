//! Residual assemblers, one per conservation law.
//!
//! Each assembler writes the residual and the classification of its component
//! at points `jmin..=jmax`. Boundary rows are only written when the window
//! touches the boundary; interior rows use the caches refreshed by
//! `update_properties`.
//!
//! | equation | boundary rows | interior rows |
//! |----------|---------------|---------------|
//! | continuity | left: flux divergence; right: `rho u` (axisymmetric) or `rho u_N - rho u_N-1` | depends on flow mode |
//! | momentum | `V` | `(shear - lambda - rho u dV/dz - rho V^2)/rho - rdt dV/dt` |
//! | energy | `T` | enthalpy transport / (rho cp) or `T - T_fixed` |
//! | lambda | left: `-rho u`; right: `lambda_N - lambda_N-1` | `lambda_j - lambda_j-1` |
//! | species | flux balance, excess species: `1 - sum Y` | `(W_k wdot_k - rho u dY/dz - dj_k/dz)/rho - rdt dY/dt` |
use super::StFlow::StFlow;
use super::grid_layout::{C_OFFSET_E, C_OFFSET_L, C_OFFSET_T, C_OFFSET_U, C_OFFSET_V, Diag};

/// Fraction of the left-boundary density used as the mass flux at the fixed
/// point of a free flame when the energy equation is off there. Empirical; the
/// value only has to give the solver a reasonable starting mass flux.
pub const FIXED_POINT_MASS_FLUX_FRACTION: f64 = 0.3;

impl StFlow {
    /// interior points of the window
    fn interior(&self, jmin: usize, jmax: usize) -> std::ops::RangeInclusive<usize> {
        jmin.max(1)..=jmax.min(self.n_points() - 2)
    }

    pub(super) fn eval_continuity(
        &self,
        x: &[f64],
        rsd: &mut [f64],
        diag: &mut [Diag],
        _rdt: f64,
        jmin: usize,
        jmax: usize,
    ) {
        let last = self.n_points() - 1;
        let i = |j: usize| self.layout.index(C_OFFSET_U, j);

        // the left boundary has the same form for all flow modes
        if jmin == 0 {
            rsd[i(0)] = -(self.rho_u(x, 1) - self.rho_u(x, 0)) / self.grid.dz_at(0)
                - (self.rho[1] * self.V(x, 1) + self.rho[0] * self.V(x, 0));
            diag[i(0)] = Diag::Algebraic;
        }

        if jmax == last {
            rsd[i(last)] = if self.flow_mode.uses_lambda() {
                self.rho_u(x, last)
            } else {
                self.rho_u(x, last) - self.rho_u(x, last - 1)
            };
            diag[i(last)] = Diag::Algebraic;
        }

        for j in self.interior(jmin, jmax) {
            rsd[i(j)] = if self.flow_mode.uses_lambda() {
                // mass flow information travels right to left from the right
                // boundary; lambda travels the other way
                -(self.rho_u(x, j + 1) - self.rho_u(x, j)) / self.grid.dz_at(j)
                    - (self.rho[j + 1] * self.V(x, j + 1) + self.rho[j] * self.V(x, j))
            } else if self.flow_mode.is_free() {
                // V = 0 by definition
                match self.fixed_point {
                    Some((zfixed, tfixed)) if self.z(j) == zfixed => {
                        if self.do_energy[j] {
                            self.T(x, j) - tfixed
                        } else {
                            self.rho_u(x, j) - self.rho[0] * FIXED_POINT_MASS_FLUX_FRACTION
                        }
                    }
                    Some((zfixed, _)) if self.z(j) < zfixed => {
                        -(self.rho_u(x, j + 1) - self.rho_u(x, j)) / self.grid.dz_at(j)
                    }
                    _ => -(self.rho_u(x, j) - self.rho_u(x, j - 1)) / self.grid.dz_at(j - 1),
                }
            } else {
                // fixed mass flow rate
                self.rho_u(x, j) - self.rho_u(x, j - 1)
            };
            diag[i(j)] = Diag::Algebraic;
        }
    }

    pub(super) fn eval_momentum(
        &self,
        x: &[f64],
        rsd: &mut [f64],
        diag: &mut [Diag],
        rdt: f64,
        jmin: usize,
        jmax: usize,
    ) {
        let last = self.n_points() - 1;
        let i = |j: usize| self.layout.index(C_OFFSET_V, j);

        if !self.flow_mode.uses_lambda() {
            for j in jmin..=jmax {
                rsd[i(j)] = self.V(x, j);
                diag[i(j)] = Diag::Algebraic;
            }
            return;
        }

        if jmin == 0 {
            rsd[i(0)] = self.V(x, 0);
            diag[i(0)] = Diag::Algebraic;
        }
        if jmax == last {
            rsd[i(last)] = self.V(x, last);
            diag[i(last)] = Diag::Algebraic;
        }

        for j in self.interior(jmin, jmax) {
            rsd[i(j)] = (self.shear(x, j)
                - self.lambda(x, j)
                - self.rho_u(x, j) * self.dVdz(x, j)
                - self.rho[j] * self.V(x, j) * self.V(x, j))
                / self.rho[j]
                - rdt * (self.V(x, j) - self.V_prev(x, j));
            diag[i(j)] = Diag::Differential;
        }
    }

    pub(super) fn eval_lambda(
        &self,
        x: &[f64],
        rsd: &mut [f64],
        diag: &mut [Diag],
        _rdt: f64,
        jmin: usize,
        jmax: usize,
    ) {
        let last = self.n_points() - 1;
        let i = |j: usize| self.layout.index(C_OFFSET_L, j);

        if !self.flow_mode.uses_lambda() {
            for j in jmin..=jmax {
                rsd[i(j)] = self.lambda(x, j);
                diag[i(j)] = Diag::Algebraic;
            }
            return;
        }

        if jmin == 0 {
            rsd[i(0)] = -self.rho_u(x, 0);
            diag[i(0)] = Diag::Algebraic;
        }
        if jmax == last {
            rsd[i(last)] = self.lambda(x, last) - self.lambda(x, last - 1);
            diag[i(last)] = Diag::Algebraic;
        }
        for j in self.interior(jmin, jmax) {
            rsd[i(j)] = self.lambda(x, j) - self.lambda(x, j - 1);
            diag[i(j)] = Diag::Algebraic;
        }
    }

    pub(super) fn eval_energy(
        &self,
        x: &[f64],
        rsd: &mut [f64],
        diag: &mut [Diag],
        rdt: f64,
        jmin: usize,
        jmax: usize,
    ) {
        let last = self.n_points() - 1;
        let i = |j: usize| self.layout.index(C_OFFSET_T, j);

        // boundary values are imposed by the neighbouring boundary domains
        if jmin == 0 {
            rsd[i(0)] = self.T(x, 0);
            diag[i(0)] = Diag::Algebraic;
        }
        if jmax == last {
            rsd[i(last)] = self.T(x, last);
            diag[i(last)] = Diag::Algebraic;
        }

        for j in self.interior(jmin, jmax) {
            if self.do_energy[j] {
                let mut sum = 0.0;
                for k in 0..self.n_species() {
                    let flxk = 0.5 * (self.flux[(k, j - 1)] + self.flux[(k, j)]);
                    sum += self.wdot[(k, j)] * self.hk[(k, j)];
                    sum += flxk * self.dhk_dz(x, k, j) / self.wt[k];
                }
                let rho_cp = self.rho[j] * self.cp[j];
                let mut r = (-self.cp[j] * self.rho_u(x, j) * self.dTdz(x, j)
                    - self.div_heat_flux(x, j)
                    - sum)
                    / rho_cp;
                r -= rdt * (self.T(x, j) - self.T_prev(x, j));
                if self.do_radiation {
                    r -= self.qdot_radiation[j] / rho_cp;
                }
                rsd[i(j)] = r;
                diag[i(j)] = Diag::Differential;
            } else {
                rsd[i(j)] = self.T(x, j) - self.t_fixed(j);
                diag[i(j)] = Diag::Algebraic;
            }
        }
    }

    /// The electric field is not solved in this domain; its residual pins it to zero
    pub(super) fn eval_electric_field(
        &self,
        x: &[f64],
        rsd: &mut [f64],
        diag: &mut [Diag],
        _rdt: f64,
        jmin: usize,
        jmax: usize,
    ) {
        for j in jmin..=jmax {
            let n = self.layout.index(C_OFFSET_E, j);
            rsd[n] = x[n];
            diag[n] = Diag::Algebraic;
        }
    }

    pub(super) fn eval_species(
        &self,
        x: &[f64],
        rsd: &mut [f64],
        diag: &mut [Diag],
        rdt: f64,
        jmin: usize,
        jmax: usize,
    ) {
        let last = self.n_points() - 1;
        let nsp = self.n_species();
        let i = |k: usize, j: usize| self.layout.index(self.layout.species(k), j);

        if jmin == 0 {
            let mut sum = 0.0;
            for k in 0..nsp {
                sum += self.Y(x, k, 0);
                rsd[i(k, 0)] = -(self.flux[(k, 0)] + self.rho_u(x, 0) * self.Y(x, k, 0));
                diag[i(k, 0)] = Diag::Algebraic;
            }
            rsd[i(self.k_excess_left, 0)] = 1.0 - sum;
        }

        if jmax == last {
            let mut sum = 0.0;
            for k in 0..nsp {
                sum += self.Y(x, k, last);
                rsd[i(k, last)] =
                    self.flux[(k, last - 1)] + self.rho_u(x, last) * self.Y(x, k, last);
                diag[i(k, last)] = Diag::Algebraic;
            }
            rsd[i(self.k_excess_right, last)] = 1.0 - sum;
        }

        for j in self.interior(jmin, jmax) {
            for k in 0..nsp {
                let convec = self.rho_u(x, j) * self.dYdz(x, k, j);
                let diffus =
                    2.0 * (self.flux[(k, j)] - self.flux[(k, j - 1)]) / (self.z(j + 1) - self.z(j - 1));
                rsd[i(k, j)] = (self.wt[k] * self.wdot[(k, j)] - convec - diffus) / self.rho[j]
                    - rdt * (self.Y(x, k, j) - self.Y_prev(x, k, j));
                diag[i(k, j)] = Diag::Differential;
            }
        }
    }
}
