//! # One-dimensional reacting flow (Flow1D) Module
//!
//! Residual evaluation for a steady or transient one-dimensional reacting flow:
//! axisymmetric stagnation (counterflow) flames, freely propagating premixed
//! flames and burner-stabilized (unstrained) flames. A Newton/time-stepping
//! solver outside this module owns the global state vector and calls
//! [`StFlow::StFlow::eval`] to obtain residuals and the algebraic/differential
//! classification of every unknown.
//!
//! ## Mathematical Model
//!
//! ### Nomenclature
//!
//! | Symbol | Description | Units |
//! |--------|-------------|-------|
//! | `u` | axial velocity | m/s |
//! | `V` | scaled radial velocity (spread rate) `v/r` | 1/s |
//! | `T` | temperature | K |
//! | `Λ` | radial pressure curvature `(1/r) dP/dr` | Pa/m² |
//! | `Y_k` | mass fraction of species k | - |
//! | `ρ` | density | kg/m³ |
//! | `μ` | viscosity | Pa·s |
//! | `λ` | thermal conductivity | W/(m·K) |
//! | `j_k` | diffusive mass flux | kg/(m²·s) |
//! | `ω_k` | net molar production rate | kmol/(m³·s) |
//! | `h_k` | partial molar enthalpy | J/kmol |
//!
//! ### Governing Equations
//!
//! ```text
//! continuity:  d(ρu)/dz + 2ρV = 0
//! momentum:    ρ dV/dt + ρu dV/dz + ρV² = d/dz(μ dV/dz) - Λ
//! Λ:           dΛ/dz = 0
//! energy:      ρcp dT/dt + ρcp u dT/dz = d/dz(λ dT/dz) - Σ j_k/W_k dh_k/dz - Σ h_k ω_k - q_rad
//! species:     ρ dY_k/dt + ρu dY_k/dz = -dj_k/dz + W_k ω_k
//! ```
//!
//! In free and unstrained flows `V = Λ = 0` and continuity reduces to a constant
//! mass flux. A free flame is pinned by fixing the temperature at one interior
//! point, which turns the mass flux into an eigenvalue.
//!
//! ### Discretization
//!
//! Convective terms use first-order upwind differences chosen by the sign of
//! `u`; diffusive terms use central differences of interval fluxes. Transport
//! properties live on interval midpoints.
//!
//! ### State layout
//!
//! Point-major: `[u, V, T, Λ, E, Y_0 .. Y_K-1]` per point. The electric field
//! slot `E` is present in the layout but always pinned to zero.
//!
//! ## Submodules
//! - `StFlow`: the flow domain, configuration and evaluation entry points
//! - `flow_properties`, `flow_equations`, `flow_radiation`: residual internals
//! - `phase_api`: thermo / kinetics / transport contracts and the shared `Solution`
//! - `simple_gas_models`: small concrete models for tests and demos
//! - `solution_array`, `flow_config`, `flow_output`: storage, configuration and tables

pub mod StFlow;
pub mod flow_config;
pub mod flow_equations;
pub mod flow_error;
pub mod flow_output;
pub mod flow_properties;
pub mod flow_radiation;
pub mod grid_layout;
pub mod phase_api;
pub mod refine_criteria;
pub mod simple_gas_models;
pub mod solution_array;
mod st_flow_tests;
