//! Optically thin radiative heat loss.
//!
//! The Planck mean absorption coefficient is a sum over the radiating species
//! CO2 and H2O of `P X_k a_k(T)`, with `a_k` a fifth order polynomial in
//! `1000/T` normalized by one atmosphere. The loss at a point is
//!
//! ```text
//! q_rad = 2 k_P (2 sigma T^4 - eps_left sigma T_left^4 - eps_right sigma T_right^4)
//! ```
use super::StFlow::StFlow;
use super::simple_gas_models::ONE_ATM;

/// W/(m²·K⁴)
pub const STEFAN_BOLTZMANN: f64 = 5.670374419e-8;

const C_H2O: [f64; 6] = [-0.23093, -1.12390, 9.41530, -2.99880, 0.51382, -1.86840e-5];
const C_CO2: [f64; 6] = [18.741, -121.310, 273.500, -194.050, 56.310, -5.8169];

fn planck_polynomial(c: &[f64; 6], T: f64) -> f64 {
    let theta = 1000.0 / T;
    let mut p = 0.0;
    let mut power = 1.0;
    for coeff in c {
        p += coeff * power;
        power *= theta;
    }
    p / ONE_ATM
}

/// Planck mean absorption coefficient of H2O per unit partial pressure, 1/(m·Pa)
pub fn planck_mean_h2o(T: f64) -> f64 {
    planck_polynomial(&C_H2O, T)
}

/// Planck mean absorption coefficient of CO2 per unit partial pressure, 1/(m·Pa)
pub fn planck_mean_co2(T: f64) -> f64 {
    planck_polynomial(&C_CO2, T)
}

impl StFlow {
    /// Radiative loss at points `jmin..=jmax`. Needs `wtm` refreshed there.
    pub(super) fn compute_radiation(&mut self, x: &[f64], jmin: usize, jmax: usize) {
        let last = self.n_points() - 1;
        let boundary_rad_left = self.epsilon_left * STEFAN_BOLTZMANN * self.T(x, 0).powi(4);
        let boundary_rad_right = self.epsilon_right * STEFAN_BOLTZMANN * self.T(x, last).powi(4);
        let [k_co2, k_h2o] = self.k_radiating;

        for j in jmin..=jmax {
            let T = self.T(x, j);
            let mut k_P = 0.0;
            if let Some(k) = k_h2o {
                k_P += self.press * self.X(x, k, j) * planck_mean_h2o(T);
            }
            if let Some(k) = k_co2 {
                k_P += self.press * self.X(x, k, j) * planck_mean_co2(T);
            }
            self.qdot_radiation[j] = 2.0
                * k_P
                * (2.0 * STEFAN_BOLTZMANN * T.powi(4) - boundary_rad_left - boundary_rad_right);
        }
    }
}
