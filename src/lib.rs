#[allow(non_snake_case)]
pub mod Flow1D;

pub use Flow1D::StFlow::StFlow;
pub use Flow1D::flow_config::{FlowConfig, FlowMode};
pub use Flow1D::flow_error::FlowError;
pub use Flow1D::grid_layout::Diag;
pub use Flow1D::phase_api::{Kinetics, PhaseError, Solution, ThermoPhase, Transport};
pub use Flow1D::solution_array::SolutionArray;
