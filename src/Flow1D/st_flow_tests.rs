#[cfg(test)]
mod tests {
    use crate::Flow1D::StFlow::StFlow;
    use crate::Flow1D::flow_config::{FixedPointConfig, FlowConfig, FlowMode};
    use crate::Flow1D::flow_equations::FIXED_POINT_MASS_FLUX_FRACTION;
    use crate::Flow1D::flow_error::FlowError;
    use crate::Flow1D::flow_radiation::{STEFAN_BOLTZMANN, planck_mean_co2, planck_mean_h2o};
    use crate::Flow1D::grid_layout::{
        C_OFFSET_E, C_OFFSET_L, C_OFFSET_T, C_OFFSET_U, C_OFFSET_V, C_OFFSET_Y, Diag,
    };
    use crate::Flow1D::phase_api::{PhaseError, Solution};
    use crate::Flow1D::simple_gas_models::{
        ConstantTransport, GAS_CONSTANT, InertKinetics, ONE_ATM, OneStepKinetics, SimpleGas,
    };
    use crate::Flow1D::solution_array::SolutionArray;
    use approx::assert_relative_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::NamedTempFile;

    const GRID5: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
    const SENTINEL: f64 = 999.0;

    fn solution_with(species: &[(&str, f64)], transport: ConstantTransport) -> Rc<RefCell<Solution>> {
        let n = species.len();
        let gas = SimpleGas::new(species.iter().map(|(s, w)| (s.to_string(), *w)).collect());
        let solution = Solution::new(Box::new(gas), Box::new(InertKinetics), Box::new(transport))
            .with_transport_factory(ConstantTransport::factory(n));
        Rc::new(RefCell::new(solution))
    }

    fn two_species() -> Rc<RefCell<Solution>> {
        solution_with(&[("A", 28.0), ("B", 32.0)], ConstantTransport::mixture_averaged(2))
    }

    /// A => B with heat release, so every term of the energy equation is non-zero
    fn reacting() -> Rc<RefCell<Solution>> {
        let gas = SimpleGas::new(vec![("A".to_string(), 28.0), ("B".to_string(), 32.0)])
            .with_cp(vec![1100.0, 1300.0])
            .with_formation_enthalpies(vec![2.0e6, 0.0]);
        let kinetics = OneStepKinetics {
            reactant: 0,
            product: 1,
            pre_exponential: 1.0e4,
            activation_energy: 4.0e7,
        };
        let transport = ConstantTransport::mixture_averaged(2).with_diffusivity(vec![2.0e-5, 3.0e-5]);
        Rc::new(RefCell::new(Solution::new(
            Box::new(gas),
            Box::new(kinetics),
            Box::new(transport),
        )))
    }

    fn flow_on(solution: Rc<RefCell<Solution>>, mode: FlowMode, z: &[f64]) -> StFlow {
        let mut flow = StFlow::new(solution, "flame", z.len(), mode).unwrap();
        flow.setup_grid(z).unwrap();
        flow
    }

    fn uniform_state(flow: &StFlow, u: f64, T: f64, Y: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; flow.size()];
        for j in 0..flow.n_points() {
            x[flow.index(C_OFFSET_U, j)] = u;
            x[flow.index(C_OFFSET_T, j)] = T;
            for (k, y) in Y.iter().enumerate() {
                x[flow.index(C_OFFSET_Y + k, j)] = *y;
            }
        }
        x
    }

    /// every component varies along the grid, u changes sign
    fn varying_state(flow: &StFlow) -> Vec<f64> {
        let mut x = vec![0.0; flow.size()];
        for j in 0..flow.n_points() {
            let s = j as f64;
            x[flow.index(C_OFFSET_U, j)] = 0.2 - 0.1 * s;
            x[flow.index(C_OFFSET_V, j)] = 0.5 * s;
            x[flow.index(C_OFFSET_T, j)] = 600.0 + 150.0 * s;
            x[flow.index(C_OFFSET_L, j)] = -1.0 - 0.1 * s;
            let y0 = 0.8 - 0.12 * s;
            x[flow.index(C_OFFSET_Y, j)] = y0;
            x[flow.index(C_OFFSET_Y + 1, j)] = 1.0 - y0;
        }
        x
    }

    fn eval_full(flow: &mut StFlow, x: &[f64], rdt: f64) -> (Vec<f64>, Vec<Diag>) {
        let mut rsd = vec![SENTINEL; x.len()];
        let mut diag = vec![Diag::Differential; x.len()];
        flow.eval(None, x, &mut rsd, &mut diag, rdt).unwrap();
        (rsd, diag)
    }

    #[test]
    fn test_uniform_unstrained_state_has_zero_residuals() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        let (rsd, diag) = eval_full(&mut flow, &x, 0.0);

        for j in 0..5 {
            assert_relative_eq!(rsd[flow.index(C_OFFSET_U, j)], 0.0, epsilon = 1e-12);
            for k in 0..2 {
                assert_relative_eq!(rsd[flow.index(C_OFFSET_Y + k, j)], 0.0, epsilon = 1e-12);
            }
            // inactive in unstrained flow
            assert_eq!(rsd[flow.index(C_OFFSET_V, j)], 0.0);
            assert_eq!(rsd[flow.index(C_OFFSET_L, j)], 0.0);
            assert_eq!(rsd[flow.index(C_OFFSET_E, j)], 0.0);
        }
        for j in 1..4 {
            assert_relative_eq!(rsd[flow.index(C_OFFSET_T, j)], 0.0, epsilon = 1e-12);
        }
        // boundary temperatures are imposed by the neighbouring domains
        assert_eq!(rsd[flow.index(C_OFFSET_T, 0)], 300.0);
        assert_eq!(rsd[flow.index(C_OFFSET_T, 4)], 300.0);
        assert!(!rsd.contains(&SENTINEL));

        for n in 0..flow.n_components() {
            assert_eq!(diag[flow.index(n, 0)], Diag::Algebraic);
            assert_eq!(diag[flow.index(n, 4)], Diag::Algebraic);
        }
        assert_eq!(diag[flow.index(C_OFFSET_Y, 2)], Diag::Differential);
    }

    #[test]
    fn test_unstrained_continuity_is_mass_flux_difference() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let mut x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        for j in 0..5 {
            x[flow.index(C_OFFSET_U, j)] = 0.1 * (j + 1) as f64;
            x[flow.index(C_OFFSET_T, j)] = 300.0 + 50.0 * j as f64;
        }
        let (rsd, diag) = eval_full(&mut flow, &x, 0.0);
        for j in 1..5 {
            let expected = flow.density(j) * x[flow.index(C_OFFSET_U, j)]
                - flow.density(j - 1) * x[flow.index(C_OFFSET_U, j - 1)];
            assert_relative_eq!(rsd[flow.index(C_OFFSET_U, j)], expected, epsilon = 1e-12);
            assert_eq!(diag[flow.index(C_OFFSET_U, j)], Diag::Algebraic);
        }
        // ideal gas: density falls with temperature
        assert!(flow.density(0) > flow.density(4));
        // viscosity is skipped outside axisymmetric flow
        assert_eq!(flow.viscosity(0), 0.0);
    }

    #[test]
    fn test_one_normalization_residual_per_boundary() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let mut x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        // mass fractions deliberately not summing to one at the boundaries
        x[flow.index(C_OFFSET_Y, 0)] = 0.3;
        x[flow.index(C_OFFSET_Y + 1, 0)] = 0.6;
        x[flow.index(C_OFFSET_Y, 4)] = 0.8;
        x[flow.index(C_OFFSET_Y + 1, 4)] = 0.1;
        let (rsd, _) = eval_full(&mut flow, &x, 0.0);

        assert_eq!(flow.left_excess_species(), 1);
        assert_eq!(flow.right_excess_species(), 0);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_Y + 1, 0)], 0.1, epsilon = 1e-12);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_Y, 4)], 0.1, epsilon = 1e-12);
        // the other species keep their flux balance (u = 0)
        assert_relative_eq!(
            rsd[flow.index(C_OFFSET_Y, 0)],
            -flow.diffusive_flux(0, 0),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            rsd[flow.index(C_OFFSET_Y + 1, 4)],
            flow.diffusive_flux(1, 3),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_excess_species_follows_the_state() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let x = uniform_state(&flow, 0.0, 300.0, &[0.9, 0.1]);
        eval_full(&mut flow, &x, 0.0);
        assert_eq!(flow.left_excess_species(), 0);
        let x = uniform_state(&flow, 0.0, 300.0, &[0.1, 0.9]);
        eval_full(&mut flow, &x, 0.0);
        assert_eq!(flow.left_excess_species(), 1);
        assert_eq!(flow.right_excess_species(), 1);
    }

    #[test]
    fn test_mixture_averaged_fluxes_sum_to_zero() {
        let mut flow = flow_on(reacting(), FlowMode::Unstrained, &GRID5);
        let x = varying_state(&flow);
        eval_full(&mut flow, &x, 0.0);
        for j in 0..4 {
            let f0 = flow.diffusive_flux(0, j);
            let f1 = flow.diffusive_flux(1, j);
            assert!(f0.abs() > 1e-8);
            assert_relative_eq!(f0 + f1, 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_energy_equation_toggle() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let mut x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        for j in 0..5 {
            x[flow.index(C_OFFSET_T, j)] = 300.0 + 100.0 * j as f64;
        }
        flow.finalize(&x).unwrap();
        assert!(!flow.do_energy(2));
        assert_eq!(flow.t_fixed(2), 500.0);

        x[flow.index(C_OFFSET_T, 2)] += 10.0;
        let (rsd, diag) = eval_full(&mut flow, &x, 0.0);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_T, 2)], 10.0, epsilon = 1e-12);
        assert_eq!(diag[flow.index(C_OFFSET_T, 2)], Diag::Algebraic);

        flow.clear_jacobian_update();
        flow.solve_energy_eqn(None);
        assert!(flow.needs_jacobian_update());
        assert!(flow.refiner().is_active(C_OFFSET_T));
        let (_, diag) = eval_full(&mut flow, &x, 0.0);
        for j in 1..4 {
            assert_eq!(diag[flow.index(C_OFFSET_T, j)], Diag::Differential);
        }
        assert_eq!(diag[flow.index(C_OFFSET_T, 0)], Diag::Algebraic);

        flow.clear_jacobian_update();
        flow.fix_temperature(Some(2));
        assert!(flow.needs_jacobian_update());
        let (_, diag) = eval_full(&mut flow, &x, 0.0);
        assert_eq!(diag[flow.index(C_OFFSET_T, 1)], Diag::Differential);
        assert_eq!(diag[flow.index(C_OFFSET_T, 2)], Diag::Algebraic);

        // no structural change, no new Jacobian
        flow.clear_jacobian_update();
        flow.fix_temperature(Some(2));
        flow.solve_species(None);
        assert!(!flow.needs_jacobian_update());
    }

    #[test]
    fn test_fixed_temperature_profile_is_interpolated() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        flow.set_fixed_temp_profile(&[0.0, 1.0], &[300.0, 1300.0]).unwrap();
        flow.finalize(&x).unwrap();
        assert_relative_eq!(flow.t_fixed(2), 800.0, epsilon = 1e-12);
        assert_relative_eq!(flow.t_fixed(4), 1300.0, epsilon = 1e-12);

        flow.set_temperature(1, 450.0).unwrap();
        assert_eq!(flow.t_fixed(1), 450.0);
        assert!(flow.set_temperature(5, 450.0).is_err());
        assert!(flow.set_fixed_temp_profile(&[0.0], &[]).is_err());
    }

    #[test]
    fn test_soret_requires_multicomponent_transport() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        flow.enable_soret(true);
        assert!(matches!(
            flow.finalize(&x),
            Err(FlowError::SoretRequiresMulticomponent)
        ));
        let mut rsd = vec![0.0; x.len()];
        let mut diag = vec![Diag::Algebraic; x.len()];
        assert!(matches!(
            flow.eval(None, &x, &mut rsd, &mut diag, 0.0),
            Err(FlowError::SoretRequiresMulticomponent)
        ));

        let transport = ConstantTransport::multicomponent(2).with_thermal_diffusion(vec![1e-7, -1e-7]);
        let mut flow = flow_on(
            solution_with(&[("A", 28.0), ("B", 32.0)], transport),
            FlowMode::Unstrained,
            &GRID5,
        );
        flow.enable_soret(true);
        let x = varying_state(&flow);
        flow.finalize(&x).unwrap();
        eval_full(&mut flow, &x, 0.0);
        assert!(flow.is_multicomponent());
    }

    #[test]
    fn test_multicomponent_and_soret_fluxes() {
        let species = [("A", 28.0), ("B", 32.0), ("C", 44.0)];
        let d = [2.0e-5, 3.5e-5, 1.2e-5];
        let dt = [1.0e-7, -2.5e-7, 4.0e-8];
        let transport = ConstantTransport::multicomponent(3)
            .with_diffusivity(d.to_vec())
            .with_thermal_diffusion(dt.to_vec());
        let mut flow = flow_on(solution_with(&species, transport), FlowMode::Unstrained, &GRID5);

        let Y = |j: usize| {
            let s = j as f64;
            [0.6 - 0.1 * s, 0.3 + 0.04 * s, 0.1 + 0.06 * s]
        };
        let T = |j: usize| 400.0 + 200.0 * j as f64;
        let mut x = vec![0.0; flow.size()];
        for j in 0..5 {
            x[flow.index(C_OFFSET_U, j)] = 0.1;
            x[flow.index(C_OFFSET_T, j)] = T(j);
            for (k, y) in Y(j).iter().enumerate() {
                x[flow.index(C_OFFSET_Y + k, j)] = *y;
            }
        }

        // interval 2, evaluated at its midpoint
        let j = 2;
        let W: Vec<f64> = species.iter().map(|(_, w)| *w).collect();
        let wtm = |y: &[f64; 3]| 1.0 / y.iter().zip(&W).map(|(y, w)| y / w).sum::<f64>();
        let X = |y: &[f64; 3], m: usize| wtm(y) * y[m] / W[m];
        let (y0, y1) = (Y(j), Y(j + 1));
        let ybar: [f64; 3] = std::array::from_fn(|k| 0.5 * (y0[k] + y1[k]));
        let wmid = wtm(&ybar);
        let rho = flow.pressure() * wmid / (GAS_CONSTANT * 0.5 * (T(j) + T(j + 1)));
        let dz = GRID5[j + 1] - GRID5[j];
        let expected: Vec<f64> = (0..3)
            .map(|k| {
                let sum: f64 = (0..3)
                    .filter(|&m| m != k)
                    .map(|m| W[m] * d[k] * (X(&y1, m) - X(&y0, m)))
                    .sum();
                W[k] * rho / (wmid * wmid) * sum / dz
            })
            .collect();

        flow.finalize(&x).unwrap();
        eval_full(&mut flow, &x, 0.0);
        for k in 0..3 {
            assert!(expected[k].abs() > 1e-9);
            assert_relative_eq!(flow.diffusive_flux(k, j), expected[k], max_relative = 1e-10);
        }

        flow.enable_soret(true);
        flow.finalize(&x).unwrap();
        eval_full(&mut flow, &x, 0.0);
        let gradlogT = 2.0 * (T(j + 1) - T(j)) / ((T(j + 1) + T(j)) * dz);
        for k in 0..3 {
            assert_relative_eq!(
                flow.diffusive_flux(k, j),
                expected[k] - dt[k] * gradlogT,
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn test_failed_setup_grid_changes_nothing() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let size = flow.size();
        assert!(matches!(
            flow.setup_grid(&[0.0, 0.5, 0.4]),
            Err(FlowError::InvalidGrid(_))
        ));
        assert!(matches!(flow.setup_grid(&[0.0]), Err(FlowError::InvalidGrid(_))));
        assert_eq!(flow.n_points(), 5);
        assert_eq!(flow.grid().z(), &GRID5[..]);
        assert_eq!(flow.size(), size);
        assert_eq!(flow.radiative_heat_loss().len(), 5);

        flow.setup_grid(&[0.0, 0.1, 0.3]).unwrap();
        assert_eq!(flow.n_points(), 3);
        assert_eq!(flow.radiative_heat_loss().len(), 3);
        assert_relative_eq!(flow.grid().dz_at(1), 0.2, epsilon = 1e-15);
    }

    #[test]
    fn test_resize_keeps_the_span() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        assert!(matches!(flow.resize(3, 9), Err(FlowError::SizeMismatch(_))));
        assert!(flow.resize(flow.n_components(), 1).is_err());
        flow.resize(flow.n_components(), 9).unwrap();
        assert_eq!(flow.n_points(), 9);
        assert_relative_eq!(flow.z(8), 1.0, epsilon = 1e-15);
        assert_relative_eq!(flow.z(4), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_transport_none_is_rejected() {
        let solution = solution_with(&[("A", 28.0), ("B", 32.0)], ConstantTransport::none(2));
        assert!(matches!(
            StFlow::new(solution, "flame", 5, FlowMode::Free),
            Err(FlowError::InvalidTransportModel(_))
        ));
    }

    #[test]
    fn test_model_change_is_picked_up() {
        let solution = two_species();
        let mut flow = flow_on(Rc::clone(&solution), FlowMode::Unstrained, &GRID5);
        let other = StFlow::new(Rc::clone(&solution), "other", 4, FlowMode::Free).unwrap();
        assert_eq!(solution.borrow().n_subscribers(), 2);
        drop(other);
        assert_eq!(solution.borrow().n_subscribers(), 1);

        let x = varying_state(&flow);
        assert!(!flow.is_multicomponent());
        solution.borrow_mut().set_transport_model("multicomponent").unwrap();
        flow.finalize(&x).unwrap();
        assert!(flow.is_multicomponent());
        assert_eq!(flow.transport_model(), "multicomponent");
        eval_full(&mut flow, &x, 0.0);

        solution.borrow_mut().set_transport_model("none").unwrap();
        let mut rsd = vec![0.0; x.len()];
        let mut diag = vec![Diag::Algebraic; x.len()];
        assert!(matches!(
            flow.eval(None, &x, &mut rsd, &mut diag, 0.0),
            Err(FlowError::InvalidTransportModel(_))
        ));
    }

    #[test]
    fn test_drop_while_solution_is_borrowed() {
        let solution = two_species();
        let flow = flow_on(Rc::clone(&solution), FlowMode::Unstrained, &GRID5);
        {
            let held = solution.borrow();
            drop(flow);
            // the slot cannot be released while the borrow is held
            assert_eq!(held.n_subscribers(), 1);
        }
        let other = flow_on(Rc::clone(&solution), FlowMode::Unstrained, &GRID5);
        assert_eq!(solution.borrow().n_subscribers(), 2);
        drop(other);
        assert_eq!(solution.borrow().n_subscribers(), 1);
    }

    #[test]
    fn test_electric_field_is_not_implemented() {
        let mut flow = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        let errors = vec![
            flow.solve_electric_field(None).unwrap_err(),
            flow.fix_electric_field(Some(1)).unwrap_err(),
            flow.do_electric_field(0).unwrap_err(),
            flow.solving_stage().unwrap_err(),
            flow.set_solving_stage(2).unwrap_err(),
        ];
        for e in errors {
            assert!(e.is_not_implemented(), "{}", e);
        }
        assert!(!FlowError::InvalidGrid("x".into()).is_not_implemented());
    }

    #[test]
    fn test_boundary_emissivities_are_validated() {
        let mut flow = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        assert!(matches!(
            flow.set_boundary_emissivities(1.5, 0.2),
            Err(FlowError::InvalidEmissivity { side: "left", .. })
        ));
        assert!(matches!(
            flow.set_boundary_emissivities(0.2, -0.1),
            Err(FlowError::InvalidEmissivity { side: "right", .. })
        ));
        assert_eq!(flow.left_emissivity(), 0.0);
        assert_eq!(flow.right_emissivity(), 0.0);
        flow.set_boundary_emissivities(0.3, 1.0).unwrap();
        assert_eq!(flow.left_emissivity(), 0.3);
        assert_eq!(flow.right_emissivity(), 1.0);
    }

    #[test]
    fn test_banded_eval_matches_full_eval() {
        let z = [0.0, 0.1, 0.25, 0.45, 0.7, 1.0];
        let mut full = flow_on(reacting(), FlowMode::Axisymmetric, &z);
        full.solve_energy_eqn(None);
        let x = varying_state(&full);
        let (rsd_full, diag_full) = eval_full(&mut full, &x, 0.0);

        // a fresh domain has never seen the full state
        let mut banded = flow_on(reacting(), FlowMode::Axisymmetric, &z);
        banded.solve_energy_eqn(None);
        let mut rsd = vec![SENTINEL; x.len()];
        let mut diag = vec![Diag::Differential; x.len()];
        banded.eval(Some(2), &x, &mut rsd, &mut diag, 0.0).unwrap();

        for j in 0..z.len() {
            for n in 0..banded.n_components() {
                let i = banded.index(n, j);
                if (1..=3).contains(&j) {
                    assert_relative_eq!(rsd[i], rsd_full[i], max_relative = 1e-12, epsilon = 1e-14);
                    assert_eq!(diag[i], diag_full[i]);
                } else {
                    assert_eq!(rsd[i], SENTINEL);
                }
            }
        }
    }

    #[test]
    fn test_force_full_update_refreshes_all_intervals() {
        let mut flow = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        flow.set_force_full_update(true);
        let x = varying_state(&flow);
        let mut rsd = vec![0.0; x.len()];
        let mut diag = vec![Diag::Algebraic; x.len()];
        flow.eval(Some(0), &x, &mut rsd, &mut diag, 0.0).unwrap();
        for j in 0..4 {
            assert_eq!(flow.thermal_conductivity(j), 0.026);
            assert_eq!(flow.viscosity(j), 1.8e-5);
        }
    }

    #[test]
    fn test_located_domain_only_touches_its_block() {
        let mut reference = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        let x = varying_state(&reference);
        let (rsd_ref, _) = eval_full(&mut reference, &x, 0.0);

        let mut flow = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        flow.locate(7, 3);
        assert_eq!(flow.last_point(), 7);
        let total = 7 + flow.size() + 4;
        let mut x_global = vec![0.0; total];
        x_global[7..7 + flow.size()].copy_from_slice(&x);
        let mut rsd = vec![SENTINEL; total];
        let mut diag = vec![Diag::Differential; total];

        // perturbed point two points left of the domain
        flow.eval(Some(1), &x_global, &mut rsd, &mut diag, 0.0).unwrap();
        assert!(rsd.iter().all(|&r| r == SENTINEL));

        // neighbour of the first point: only point 0 is refreshed
        flow.eval(Some(2), &x_global, &mut rsd, &mut diag, 0.0).unwrap();
        for n in 0..flow.n_components() {
            let i = flow.index(n, 0);
            assert_relative_eq!(rsd[7 + i], rsd_ref[i], max_relative = 1e-12, epsilon = 1e-14);
            assert_eq!(rsd[7 + flow.index(n, 1)], SENTINEL);
        }

        flow.eval(None, &x_global, &mut rsd, &mut diag, 0.0).unwrap();
        assert!(rsd[..7].iter().all(|&r| r == SENTINEL));
        assert!(rsd[7 + flow.size()..].iter().all(|&r| r == SENTINEL));
        for i in 0..flow.size() {
            assert_relative_eq!(rsd[7 + i], rsd_ref[i], max_relative = 1e-12, epsilon = 1e-14);
        }

        let mut short = vec![0.0; 7];
        assert!(matches!(
            flow.eval(None, &x_global, &mut short, &mut diag, 0.0),
            Err(FlowError::SizeMismatch(_))
        ));
    }

    #[test]
    fn test_free_flow_fixed_point() {
        let mut flow = flow_on(two_species(), FlowMode::Free, &GRID5);
        let mut x = uniform_state(&flow, 0.5, 300.0, &[0.5, 0.5]);
        for (j, T) in [300.0, 500.0, 900.0, 1500.0, 1800.0].iter().enumerate() {
            x[flow.index(C_OFFSET_T, j)] = *T;
        }
        flow.set_fixed_point(0.6, 1000.0);
        flow.finalize(&x).unwrap();
        assert_eq!(flow.fixed_point(), Some((0.75, 1500.0)));

        // energy off at the fixed point: mass flux pinned to a fraction of rho(0)
        let (rsd, _) = eval_full(&mut flow, &x, 0.0);
        assert_relative_eq!(
            rsd[flow.index(C_OFFSET_U, 3)],
            flow.density(3) * 0.5 - FIXED_POINT_MASS_FLUX_FRACTION * flow.density(0),
            epsilon = 1e-12
        );
        // upstream of the fixed point
        assert_relative_eq!(
            rsd[flow.index(C_OFFSET_U, 2)],
            -(flow.density(3) * 0.5 - flow.density(2) * 0.5) / 0.25,
            epsilon = 1e-12
        );

        flow.solve_energy_eqn(None);
        let (rsd, _) = eval_full(&mut flow, &x, 0.0);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_U, 3)], 0.0, epsilon = 1e-12);

        // a fixed point on a grid point is kept
        flow.set_fixed_point(0.5, 700.0);
        flow.finalize(&x).unwrap();
        assert_eq!(flow.fixed_point(), Some((0.5, 700.0)));
    }

    #[test]
    fn test_free_flow_without_fixed_point_is_upwind() {
        let mut flow = flow_on(two_species(), FlowMode::Free, &GRID5);
        let mut x = uniform_state(&flow, 0.5, 300.0, &[0.5, 0.5]);
        for j in 0..5 {
            x[flow.index(C_OFFSET_T, j)] = 300.0 + 200.0 * j as f64;
        }
        let (rsd, _) = eval_full(&mut flow, &x, 0.0);
        for j in 1..4 {
            let expected = -(flow.density(j) * 0.5 - flow.density(j - 1) * 0.5) / 0.25;
            assert_relative_eq!(rsd[flow.index(C_OFFSET_U, j)], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_axisymmetric_momentum_and_lambda() {
        let mut flow = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        let mut x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        for j in 0..5 {
            x[flow.index(C_OFFSET_L, j)] = -2.0;
            x[flow.index(C_OFFSET_V, j)] = j as f64;
        }
        let (rsd, diag) = eval_full(&mut flow, &x, 0.0);
        let rho = flow.density(2);

        // u = 0: continuity reduces to the radial outflow term
        assert_relative_eq!(rsd[flow.index(C_OFFSET_U, 2)], -rho * 5.0, max_relative = 1e-12);
        // linear V: no shear
        assert_relative_eq!(
            rsd[flow.index(C_OFFSET_V, 2)],
            (2.0 - rho * 4.0) / rho,
            max_relative = 1e-12
        );
        assert_eq!(diag[flow.index(C_OFFSET_V, 2)], Diag::Differential);
        assert_eq!(rsd[flow.index(C_OFFSET_V, 0)], 0.0);
        assert_eq!(rsd[flow.index(C_OFFSET_V, 4)], 4.0);
        // right boundary: rho u = 0
        assert_eq!(rsd[flow.index(C_OFFSET_U, 4)], 0.0);

        for j in 0..5 {
            assert_eq!(rsd[flow.index(C_OFFSET_L, j)], 0.0);
            assert_eq!(diag[flow.index(C_OFFSET_L, j)], Diag::Algebraic);
        }
        assert_eq!(flow.viscosity(1), 1.8e-5);
    }

    #[test]
    fn test_transient_terms_use_previous_solution() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        flow.solve_energy_eqn(None);
        let x = uniform_state(&flow, 0.0, 300.0, &[0.5, 0.5]);
        let prev = uniform_state(&flow, 0.0, 290.0, &[0.4, 0.6]);
        assert!(flow.init_time_integration(0.0, &prev).is_err());
        flow.init_time_integration(0.1, &prev).unwrap();
        assert!(!flow.is_steady());

        let (rsd, _) = eval_full(&mut flow, &x, 10.0);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_T, 2)], -100.0, epsilon = 1e-9);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_Y, 2)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_Y + 1, 2)], 1.0, epsilon = 1e-12);

        flow.set_steady_mode();
        let (rsd, _) = eval_full(&mut flow, &x, 10.0);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_T, 2)], 0.0, epsilon = 1e-9);
        assert_relative_eq!(rsd[flow.index(C_OFFSET_Y, 2)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_radiation_loss_from_co2_and_h2o() {
        let solution = solution_with(
            &[("N2", 28.0), ("CO2", 44.0), ("H2O", 18.0)],
            ConstantTransport::mixture_averaged(3),
        );
        let mut flow = flow_on(solution, FlowMode::Unstrained, &GRID5);
        let x = uniform_state(&flow, 0.0, 1500.0, &[0.7, 0.2, 0.1]);

        eval_full(&mut flow, &x, 0.0);
        assert!(flow.radiative_heat_loss().iter().all(|&q| q == 0.0));

        flow.enable_radiation(true);
        eval_full(&mut flow, &x, 0.0);
        let W = 1.0 / (0.7 / 28.0 + 0.2 / 44.0 + 0.1 / 18.0);
        let k_P = ONE_ATM
            * (W * 0.1 / 18.0 * planck_mean_h2o(1500.0) + W * 0.2 / 44.0 * planck_mean_co2(1500.0));
        let expected = 2.0 * k_P * 2.0 * STEFAN_BOLTZMANN * 1500.0_f64.powi(4);
        for q in flow.radiative_heat_loss() {
            assert!(*q > 0.0);
            assert_relative_eq!(*q, expected, max_relative = 1e-10);
        }

        // hot walls radiate back
        flow.set_boundary_emissivities(1.0, 1.0).unwrap();
        eval_full(&mut flow, &x, 0.0);
        assert_relative_eq!(flow.radiative_heat_loss()[2], 0.0, epsilon = 1e-6);

        // energy equation on: the loss enters the interior residual
        flow.set_boundary_emissivities(0.0, 0.0).unwrap();
        flow.solve_energy_eqn(None);
        let (rsd, _) = eval_full(&mut flow, &x, 0.0);
        assert_relative_eq!(
            rsd[flow.index(C_OFFSET_T, 2)],
            -expected / (flow.density(2) * 1000.0),
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_component_names_and_indices() {
        let flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        assert_eq!(flow.component_name(C_OFFSET_U), "velocity");
        assert_eq!(flow.component_name(C_OFFSET_V), "spread_rate");
        assert_eq!(flow.component_name(C_OFFSET_E), "eField");
        assert_eq!(flow.component_name(C_OFFSET_Y + 1), "B");
        assert_eq!(flow.component_index("B").unwrap(), C_OFFSET_Y + 1);
        assert_eq!(flow.component_index("lambda").unwrap(), C_OFFSET_L);
        assert!(matches!(
            flow.component_index("Q"),
            Err(FlowError::UnknownComponent(_))
        ));
        assert!(flow.component_active(C_OFFSET_T));
        assert!(!flow.component_active(C_OFFSET_V));
        assert!(!flow.component_active(C_OFFSET_E));
        assert_eq!(flow.domain_type(), "unstrained-flow");
        // bounds
        assert_eq!(flow.lower_bound(C_OFFSET_T), 200.0);
        assert_eq!(flow.upper_bound(C_OFFSET_T), 7000.0);
        assert_eq!(flow.lower_bound(C_OFFSET_Y), -1.0e-7);
    }

    #[test]
    fn test_initial_solution_and_bad_values() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let mut x = vec![0.0; flow.size()];
        flow.get_initial_solution(&mut x).unwrap();
        assert_eq!(x[flow.index(C_OFFSET_T, 3)], 300.0);
        assert_eq!(x[flow.index(C_OFFSET_Y, 3)], 1.0);
        assert_relative_eq!(
            flow.density(3),
            ONE_ATM * 28.0 / (8314.46261815324 * 300.0),
            max_relative = 1e-12
        );

        x[flow.index(C_OFFSET_Y, 1)] = 0.6;
        x[flow.index(C_OFFSET_Y + 1, 1)] = 0.6;
        flow.reset_bad_values(&mut x).unwrap();
        assert_relative_eq!(x[flow.index(C_OFFSET_Y, 1)], 0.5, epsilon = 1e-15);
        assert!(flow.get_initial_solution(&mut [0.0; 3]).is_err());
    }

    #[test]
    fn test_meta_flags() {
        let mut flow = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        let meta = flow.get_meta();
        assert_eq!(meta["type"], json!("axisymmetric-flow"));
        assert_eq!(meta["energy-enabled"], json!(false));
        assert_eq!(meta["species-enabled"], json!(true));
        assert_eq!(meta["phase"]["source"], json!("<unknown>"));
        assert!(!meta.contains_key("emissivity-left"));
        assert!(!meta.contains_key("fixed-point"));

        flow.solve_energy_eqn(Some(1));
        flow.fix_species(Some(0));
        let meta = flow.get_meta();
        assert_eq!(meta["energy-enabled"], json!([false, true, false, false, false]));
        assert_eq!(meta["species-enabled"], json!({ "A": false, "B": true }));

        // invalid metadata is rejected as a whole
        let mut bad = meta.clone();
        bad.insert("Soret-enabled".into(), json!(true));
        bad.insert("radiation-enabled".into(), json!(true));
        bad.insert("emissivity-left".into(), json!(2.0));
        bad.insert("emissivity-right".into(), json!(0.1));
        assert!(flow.set_meta(&bad).is_err());
        assert!(!flow.with_soret());
        assert!(!flow.radiation_enabled());

        let mut good = meta.clone();
        good.insert("refine-criteria".into(), json!({ "ratio": 4.0, "max-points": 50 }));
        good.insert("energy-enabled".into(), json!(true));
        good.insert("type".into(), json!("free-flow"));
        flow.set_meta(&good).unwrap();
        assert_eq!(flow.refiner().criteria().ratio, 4.0);
        assert_eq!(flow.refiner().criteria().max_points, 50);
        assert_eq!(flow.refiner().criteria().slope, 0.8);
        assert!(flow.do_energy(3));
        assert!(!flow.do_species(0));

        good.insert("refine-criteria".into(), json!({ "ratio": 1.0 }));
        assert!(matches!(
            flow.set_meta(&good),
            Err(FlowError::InvalidRefineCriteria(_))
        ));
        assert_eq!(flow.refiner().criteria().ratio, 4.0);
    }

    #[test]
    fn test_solution_array_round_trip_through_json_file() {
        let mut flow = flow_on(reacting(), FlowMode::Axisymmetric, &GRID5);
        flow.set_pressure(5.0e4);
        flow.enable_radiation(true);
        flow.set_boundary_emissivities(0.2, 0.3).unwrap();
        flow.fix_species(Some(1));
        flow.solve_energy_eqn(Some(2));
        flow.set_fixed_point(0.5, 900.0);
        let x = varying_state(&flow);
        eval_full(&mut flow, &x, 0.0);

        let arr = flow.as_array(&x).unwrap();
        assert!(arr.has_component("D"));
        assert!(arr.has_component("radiative-heat-loss"));
        assert!(arr.has_component("spread_rate"));
        assert!(!arr.has_component("eField"));
        assert_eq!(arr.component_names()[0], "grid");

        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), arr.to_json_string().unwrap()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let loaded = SolutionArray::from_json_str(&text).unwrap();

        let mut restored = StFlow::new(reacting(), "restored", 3, FlowMode::Axisymmetric).unwrap();
        let mut x2 = vec![0.0; restored.layout().size(loaded.n_points())];
        restored.from_array(&loaded, &mut x2).unwrap();

        assert_eq!(restored.n_points(), 5);
        assert_eq!(restored.pressure(), 5.0e4);
        for (a, b) in restored.grid().z().iter().zip(GRID5.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-15);
        }
        for (a, b) in x2.iter().zip(x.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-14, epsilon = 1e-15);
        }
        for j in 0..5 {
            assert_relative_eq!(restored.density(j), flow.density(j), max_relative = 1e-12);
        }
        assert!(restored.radiation_enabled());
        assert_eq!(restored.left_emissivity(), 0.2);
        assert_eq!(restored.right_emissivity(), 0.3);
        assert!(restored.do_energy(2));
        assert!(!restored.do_energy(1));
        assert!(restored.do_species(0));
        assert!(!restored.do_species(1));
        assert_eq!(restored.fixed_point(), Some((0.5, 900.0)));
    }

    #[test]
    fn test_missing_component_keeps_prior_value() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let x = varying_state(&flow);
        eval_full(&mut flow, &x, 0.0);
        let mut arr = flow.as_array(&x).unwrap();
        assert!(!arr.has_component("radiative-heat-loss"));
        arr.remove_component("T");

        let mut restored = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let mut x2 = uniform_state(&restored, 0.0, 1234.0, &[0.5, 0.5]);
        restored.from_array(&arr, &mut x2).unwrap();
        for j in 0..5 {
            assert_eq!(x2[restored.index(C_OFFSET_T, j)], 1234.0);
            assert_relative_eq!(
                x2[restored.index(C_OFFSET_Y, j)],
                x[flow.index(C_OFFSET_Y, j)],
                epsilon = 1e-15
            );
        }

        let mut wrong = vec![0.0; 3];
        assert!(matches!(
            restored.from_array(&arr, &mut wrong),
            Err(FlowError::SizeMismatch(_))
        ));
        arr.remove_component("grid");
        assert!(matches!(
            restored.from_array(&arr, &mut x2),
            Err(FlowError::InvalidMetadata(_))
        ));
    }

    /// record of a 5-point flow with `edit` applied to its JSON form
    fn edited_record(edit: impl Fn(&mut serde_json::Value)) -> SolutionArray {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let x = varying_state(&flow);
        eval_full(&mut flow, &x, 0.0);
        let text = flow.as_array(&x).unwrap().to_json_string().unwrap();
        let mut record: serde_json::Value = serde_json::from_str(&text).unwrap();
        edit(&mut record);
        SolutionArray::from_json_str(&record.to_string()).unwrap()
    }

    #[test]
    fn test_series_length_is_checked_on_import() {
        const OLD_GRID: [f64; 5] = [0.0, 0.1, 0.2, 0.3, 0.4];
        let long = edited_record(|r| r["data"]["T"] = json!([300.0, 400.0, 500.0, 600.0, 700.0, 800.0]));
        let short = edited_record(|r| r["data"]["T"] = json!([300.0, 400.0, 500.0, 600.0]));
        let miscounted = edited_record(|r| r["points"] = json!(6));

        for arr in [long, short, miscounted] {
            let mut flow = flow_on(two_species(), FlowMode::Unstrained, &OLD_GRID);
            let mut x = uniform_state(&flow, 0.0, 1234.0, &[0.5, 0.5]);
            let before = x.clone();
            assert!(matches!(
                flow.from_array(&arr, &mut x),
                Err(FlowError::SizeMismatch(_))
            ));
            assert_eq!(x, before);
            assert_eq!(flow.grid().z(), &OLD_GRID[..]);
        }
    }

    #[test]
    fn test_unbuildable_transport_model_leaves_domain_unchanged() {
        const OLD_GRID: [f64; 5] = [0.0, 0.1, 0.2, 0.3, 0.4];
        let arr = edited_record(|r| {
            r["pressure"] = json!(2.0 * ONE_ATM);
            r["meta"]["transport-model"] = json!("multicomponent");
        });

        // no transport factory registered
        let mut flow = flow_on(reacting(), FlowMode::Unstrained, &OLD_GRID);
        let pressure = flow.pressure();
        let mut x = uniform_state(&flow, 0.0, 1234.0, &[0.5, 0.5]);
        let before = x.clone();
        assert!(matches!(
            flow.from_array(&arr, &mut x),
            Err(FlowError::Phase(PhaseError::UnknownTransportModel(_)))
        ));
        assert_eq!(flow.grid().z(), &OLD_GRID[..]);
        assert_eq!(flow.pressure(), pressure);
        assert_eq!(x, before);
        assert_eq!(flow.transport_model(), "mixture-averaged");

        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &OLD_GRID);
        flow.from_array(&arr, &mut x).unwrap();
        assert_eq!(flow.grid().z(), &GRID5[..]);
        assert_eq!(flow.pressure(), 2.0 * ONE_ATM);
        assert!(flow.is_multicomponent());
    }

    #[test]
    fn test_from_config() {
        let mut config = FlowConfig::new(FlowMode::Free);
        config.pressure = 2.0 * ONE_ATM;
        config.radiation.enabled = true;
        config.radiation.emissivity_right = 0.5;
        config.fixed_point = Some(FixedPointConfig {
            location: 0.5,
            temperature: 1000.0,
        });
        let flow = StFlow::from_config(two_species(), "flame", 5, &config).unwrap();
        assert_eq!(flow.pressure(), 2.0 * ONE_ATM);
        assert!(flow.radiation_enabled());
        assert_eq!(flow.right_emissivity(), 0.5);
        assert_eq!(flow.fixed_point(), Some((0.5, 1000.0)));

        let mut wrong_mode = flow_on(two_species(), FlowMode::Axisymmetric, &GRID5);
        assert!(config.apply(&mut wrong_mode).is_err());

        config.radiation.emissivity_left = -1.0;
        assert!(matches!(
            StFlow::from_config(two_species(), "flame", 5, &config),
            Err(FlowError::InvalidEmissivity { side: "left", .. })
        ));
    }

    #[test]
    fn test_solution_table() {
        let mut flow = flow_on(two_species(), FlowMode::Unstrained, &GRID5);
        let x = uniform_state(&flow, 0.1, 300.0, &[0.5, 0.5]);
        let table = flow.solution_table(&x).unwrap();
        // header plus one row per point
        assert_eq!(table.len(), 6);
        let text = table.to_string();
        assert!(text.contains("velocity"));
        assert!(!text.contains("spread_rate"));
        assert!(flow.solution_table(&x[1..]).is_err());
        flow.enable_radiation(true);
        assert_eq!(flow.radiation_table().len(), 6);
        assert!(flow.show(&x).is_ok());
    }
}
