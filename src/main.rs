use flame1d::Flow1D::grid_layout::{C_OFFSET_T, C_OFFSET_U, C_OFFSET_Y};
use flame1d::Flow1D::simple_gas_models::{ConstantTransport, OneStepKinetics, SimpleGas};
use flame1d::{Diag, FlowConfig, FlowError, FlowMode, Solution, StFlow};
use log::{LevelFilter, error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::cell::RefCell;
use std::rc::Rc;

/// Burner-stabilized A => B flame on a uniform grid: one residual evaluation
fn burner_flame() -> Result<(), FlowError> {
    let gas = SimpleGas::new(vec![("A".to_string(), 28.0), ("B".to_string(), 28.0)])
        .with_name("A-B")
        .with_cp(vec![1200.0, 1200.0])
        .with_formation_enthalpies(vec![1.5e6, 0.0]);
    let kinetics = OneStepKinetics {
        reactant: 0,
        product: 1,
        pre_exponential: 1.0e8,
        activation_energy: 1.2e8,
    };
    let solution = Rc::new(RefCell::new(
        Solution::new(
            Box::new(gas),
            Box::new(kinetics),
            Box::new(ConstantTransport::mixture_averaged(2)),
        )
        .with_transport_factory(ConstantTransport::factory(2)),
    ));

    let mut config = FlowConfig::new(FlowMode::Unstrained);
    config.radiation.enabled = true;
    let points = 11;
    let mut flow = StFlow::from_config(Rc::clone(&solution), "burner", points, &config)?;
    let z: Vec<f64> = (0..points).map(|j| 0.002 * j as f64).collect();
    flow.setup_grid(&z)?;

    let mut x = vec![0.0; flow.size()];
    flow.get_initial_solution(&mut x)?;
    for j in 0..points {
        let s = j as f64 / (points - 1) as f64;
        x[flow.index(C_OFFSET_U, j)] = 0.5;
        x[flow.index(C_OFFSET_T, j)] = 300.0 + 1500.0 * s;
        x[flow.index(C_OFFSET_Y, j)] = 1.0 - s;
        x[flow.index(C_OFFSET_Y + 1, j)] = s;
    }
    flow.solve_energy_eqn(None);
    flow.finalize(&x)?;

    let mut rsd = vec![0.0; x.len()];
    let mut diag = vec![Diag::Algebraic; x.len()];
    flow.eval(None, &x, &mut rsd, &mut diag, 0.0)?;
    let norm = rsd.iter().map(|r| r * r).sum::<f64>().sqrt();
    info!("residual norm {:.4e}", norm);
    flow.show(&x)?;

    let arr = flow.as_array(&x)?;
    info!("stored components: {:?}", arr.component_names());
    Ok(())
}

pub fn main() {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    if let Err(e) = burner_flame() {
        error!("{}", e);
    }
}
