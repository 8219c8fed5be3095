//! Thermo and transport property refresh, diffusive fluxes and the finite
//! difference helpers shared by the equation assemblers.
//!
//! Points carry thermo properties (density, mean molecular weight, heat
//! capacity, partial molar enthalpies, production rates). Intervals `j..j+1`
//! carry transport properties evaluated at the interval midpoint and the
//! diffusive mass fluxes:
//!
//! ```text
//! mixture-averaged: j_k = rho W_k D_k / W (X_k,j - X_k,j+1) / dz + Y_k,j * sum_m(-j_m)
//! multicomponent:   j_k = rho W_k / W^2 * sum_m W_m D_km (X_m,j+1 - X_m,j) / dz
//! Soret:            j_k -= D^T_k * 2 (T_j+1 - T_j) / ((T_j+1 + T_j) dz)
//! ```
use super::StFlow::StFlow;
use super::flow_error::FlowError;
use super::grid_layout::{C_OFFSET_L, C_OFFSET_T, C_OFFSET_U, C_OFFSET_V, C_OFFSET_Y};
use super::phase_api::ThermoPhase;
use std::rc::Rc;

impl StFlow {
    #[inline]
    pub(super) fn u(&self, x: &[f64], j: usize) -> f64 {
        x[self.layout.index(C_OFFSET_U, j)]
    }

    #[inline]
    pub(super) fn V(&self, x: &[f64], j: usize) -> f64 {
        x[self.layout.index(C_OFFSET_V, j)]
    }

    #[inline]
    pub(super) fn T(&self, x: &[f64], j: usize) -> f64 {
        x[self.layout.index(C_OFFSET_T, j)]
    }

    #[inline]
    pub(super) fn lambda(&self, x: &[f64], j: usize) -> f64 {
        x[self.layout.index(C_OFFSET_L, j)]
    }

    #[inline]
    pub(super) fn Y(&self, x: &[f64], k: usize, j: usize) -> f64 {
        x[self.layout.index(self.layout.species(k), j)]
    }

    /// mole fraction; needs `wtm` at `j`
    #[inline]
    pub(super) fn X(&self, x: &[f64], k: usize, j: usize) -> f64 {
        self.wtm[j] * self.Y(x, k, j) / self.wt[k]
    }

    #[inline]
    pub(super) fn rho_u(&self, x: &[f64], j: usize) -> f64 {
        self.rho[j] * self.u(x, j)
    }

    pub(super) fn T_prev(&self, x: &[f64], j: usize) -> f64 {
        self.prev_value(x, self.layout.index(C_OFFSET_T, j))
    }

    pub(super) fn V_prev(&self, x: &[f64], j: usize) -> f64 {
        self.prev_value(x, self.layout.index(C_OFFSET_V, j))
    }

    pub(super) fn Y_prev(&self, x: &[f64], k: usize, j: usize) -> f64 {
        self.prev_value(x, self.layout.index(self.layout.species(k), j))
    }

    /// upwind point for one-sided derivatives at interior point `j`
    #[inline]
    fn upwind(&self, x: &[f64], j: usize) -> usize {
        if self.u(x, j) > 0.0 { j } else { j + 1 }
    }

    pub(super) fn dVdz(&self, x: &[f64], j: usize) -> f64 {
        let jloc = self.upwind(x, j);
        (self.V(x, jloc) - self.V(x, jloc - 1)) / self.grid.dz_at(jloc - 1)
    }

    pub(super) fn dTdz(&self, x: &[f64], j: usize) -> f64 {
        let jloc = self.upwind(x, j);
        (self.T(x, jloc) - self.T(x, jloc - 1)) / self.grid.dz_at(jloc - 1)
    }

    pub(super) fn dYdz(&self, x: &[f64], k: usize, j: usize) -> f64 {
        let jloc = self.upwind(x, j);
        (self.Y(x, k, jloc) - self.Y(x, k, jloc - 1)) / self.grid.dz_at(jloc - 1)
    }

    /// upwinded gradient of the partial molar enthalpy of species `k`
    pub(super) fn dhk_dz(&self, x: &[f64], k: usize, j: usize) -> f64 {
        let jloc = self.upwind(x, j);
        (self.hk[(k, jloc)] - self.hk[(k, jloc - 1)]) / self.grid.dz_at(jloc - 1)
    }

    /// d/dz(mu dV/dz) at interior point `j`
    pub(super) fn shear(&self, x: &[f64], j: usize) -> f64 {
        let c1 = self.visc[j - 1] * (self.V(x, j) - self.V(x, j - 1));
        let c2 = self.visc[j] * (self.V(x, j + 1) - self.V(x, j));
        2.0 * (c2 / (self.z(j + 1) - self.z(j)) - c1 / (self.z(j) - self.z(j - 1)))
            / (self.z(j + 1) - self.z(j - 1))
    }

    /// -d/dz(k dT/dz) at interior point `j`
    pub(super) fn div_heat_flux(&self, x: &[f64], j: usize) -> f64 {
        let c1 = self.tcon[j - 1] * (self.T(x, j) - self.T(x, j - 1));
        let c2 = self.tcon[j] * (self.T(x, j + 1) - self.T(x, j));
        -2.0 * (c2 / (self.z(j + 1) - self.z(j)) - c1 / (self.z(j) - self.z(j - 1)))
            / (self.z(j + 1) - self.z(j - 1))
    }

    fn mass_fractions<'a>(&self, x: &'a [f64], j: usize) -> &'a [f64] {
        let iy = self.layout.index(C_OFFSET_Y, j);
        &x[iy..iy + self.n_species()]
    }

    fn set_gas(&self, thermo: &mut dyn ThermoPhase, x: &[f64], j: usize) -> Result<(), FlowError> {
        thermo.set_temperature(self.T(x, j))?;
        thermo.set_mass_fractions_no_norm(self.mass_fractions(x, j))?;
        thermo.set_pressure(self.press)?;
        Ok(())
    }

    fn set_gas_at_midpoint(
        &self,
        thermo: &mut dyn ThermoPhase,
        x: &[f64],
        j: usize,
    ) -> Result<(), FlowError> {
        thermo.set_temperature(0.5 * (self.T(x, j) + self.T(x, j + 1)))?;
        let ybar: Vec<f64> = self
            .mass_fractions(x, j)
            .iter()
            .zip(self.mass_fractions(x, j + 1))
            .map(|(a, b)| 0.5 * (a + b))
            .collect();
        thermo.set_mass_fractions_no_norm(&ybar)?;
        thermo.set_pressure(self.press)?;
        Ok(())
    }

    /// Refreshes every cache read by the residuals of points `jmin..=jmax`
    pub(super) fn update_properties(
        &mut self,
        x: &[f64],
        jmin: usize,
        jmax: usize,
    ) -> Result<(), FlowError> {
        let last = self.n_points() - 1;
        // one point / interval beyond the residual window on each side
        let j0 = jmin.max(1) - 1;
        let j1 = (jmax + 1).min(last);

        self.update_thermo(x, j0, j1)?;
        if self.flow_mode.is_free() && j0 > 0 {
            // the fixed-point residual reads the density at the left boundary
            self.update_thermo(x, 0, 0)?;
        }
        if self.force_full_update() {
            self.update_transport(x, 0, last)?;
        } else {
            self.update_transport(x, j0, j1)?;
        }

        if jmin == 0 {
            self.k_excess_left = excess_species(self.mass_fractions(x, 0));
        }
        if jmax == last {
            self.k_excess_right = excess_species(self.mass_fractions(x, last));
        }

        self.update_diff_fluxes(x, j0, j1);
        Ok(())
    }

    /// thermo properties and production rates at points `j0..=j1`
    pub(super) fn update_thermo(&mut self, x: &[f64], j0: usize, j1: usize) -> Result<(), FlowError> {
        let solution = Rc::clone(&self.solution);
        let mut sol = solution.borrow_mut();
        let (thermo, kinetics) = sol.thermo_and_kinetics();
        let mut buf = vec![0.0; self.n_species()];
        for j in j0..=j1 {
            self.set_gas(thermo, x, j)?;
            self.rho[j] = thermo.density();
            self.wtm[j] = thermo.mean_molecular_weight();
            self.cp[j] = thermo.cp_mass();
            thermo.get_partial_molar_enthalpies(&mut buf);
            self.hk.column_mut(j).copy_from_slice(&buf);
            kinetics.get_net_production_rates(&*thermo, &mut buf)?;
            self.wdot.column_mut(j).copy_from_slice(&buf);
        }
        Ok(())
    }

    /// transport properties on intervals `j0..j1`
    pub(super) fn update_transport(&mut self, x: &[f64], j0: usize, j1: usize) -> Result<(), FlowError> {
        let nsp = self.n_species();
        let solution = Rc::clone(&self.solution);
        let mut sol = solution.borrow_mut();
        let (thermo, transport) = sol.thermo_and_transport();
        let mut buf = vec![0.0; nsp];
        for j in j0..j1 {
            self.set_gas_at_midpoint(thermo, x, j)?;
            let wtm = thermo.mean_molecular_weight();
            let rho = thermo.density();
            self.visc[j] = if self.dovisc {
                transport.viscosity(&*thermo)?
            } else {
                0.0
            };
            if self.do_multicomponent {
                transport.get_multi_diff_coeffs(&*thermo, &mut self.multidiff[j])?;
                // the factor outside the sum over species
                for k in 0..nsp {
                    self.diff[(k, j)] = self.wt[k] * rho / (wtm * wtm);
                }
                if self.do_soret {
                    transport.get_thermal_diff_coeffs(&*thermo, &mut buf)?;
                    self.dthermal.column_mut(j).copy_from_slice(&buf);
                }
            } else {
                transport.get_mix_diff_coeffs(&*thermo, &mut buf)?;
                for k in 0..nsp {
                    self.diff[(k, j)] = buf[k] * self.wt[k] * rho / wtm;
                }
            }
            self.tcon[j] = transport.thermal_conductivity(&*thermo)?;
        }
        Ok(())
    }

    /// diffusive mass fluxes on intervals `j0..j1`
    pub(super) fn update_diff_fluxes(&mut self, x: &[f64], j0: usize, j1: usize) {
        let nsp = self.n_species();
        if self.do_multicomponent {
            for j in j0..j1 {
                let dz = self.z(j + 1) - self.z(j);
                for k in 0..nsp {
                    let mut sum = 0.0;
                    for m in 0..nsp {
                        sum += self.wt[m]
                            * self.multidiff[j][(k, m)]
                            * (self.X(x, m, j + 1) - self.X(x, m, j));
                    }
                    self.flux[(k, j)] = sum * self.diff[(k, j)] / dz;
                }
            }
        } else {
            for j in j0..j1 {
                let dz = self.z(j + 1) - self.z(j);
                let mut sum = 0.0;
                for k in 0..nsp {
                    let f = self.diff[(k, j)] * (self.X(x, k, j) - self.X(x, k, j + 1)) / dz;
                    self.flux[(k, j)] = f;
                    sum -= f;
                }
                // correction flux so that the species fluxes sum to zero
                for k in 0..nsp {
                    self.flux[(k, j)] += sum * self.Y(x, k, j);
                }
            }
        }

        if self.do_soret {
            for m in j0..j1 {
                let gradlogT = 2.0 * (self.T(x, m + 1) - self.T(x, m))
                    / ((self.T(x, m + 1) + self.T(x, m)) * (self.z(m + 1) - self.z(m)));
                for k in 0..nsp {
                    self.flux[(k, m)] -= self.dthermal[(k, m)] * gradlogT;
                }
            }
        }
    }
}

/// index of the largest mass fraction, lowest index on ties
fn excess_species(Y: &[f64]) -> usize {
    let mut kmax = 0;
    for (k, &y) in Y.iter().enumerate() {
        if y > Y[kmax] {
            kmax = k;
        }
    }
    kmax
}
