//! Grid and per-point state layout.
//!
//! The solution of a flow domain is stored point by point: every grid point holds
//! `C_OFFSET_Y + n_species` consecutive values
//!
//! | offset | component |
//! |--------|-----------|
//! | 0 | axial velocity `u` |
//! | 1 | spread rate `V` |
//! | 2 | temperature `T` |
//! | 3 | mass-flow eigenvalue `lambda` |
//! | 4 | electric field (inactive) |
//! | 5.. | species mass fractions `Y_k` |
use super::flow_error::FlowError;

pub const C_OFFSET_U: usize = 0;
pub const C_OFFSET_V: usize = 1;
pub const C_OFFSET_T: usize = 2;
pub const C_OFFSET_L: usize = 3;
pub const C_OFFSET_E: usize = 4;
pub const C_OFFSET_Y: usize = 5;

/// Classification of a residual entry handed to the solver together with the residual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Diag {
    /// constraint without a time derivative
    #[default]
    Algebraic,
    /// equation with a transient term
    Differential,
}

impl Diag {
    pub fn is_differential(&self) -> bool {
        matches!(self, Diag::Differential)
    }
}

/// Ordered, strictly increasing grid with cached interval widths
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    z: Vec<f64>,
    dz: Vec<f64>,
}

impl Grid {
    /// Validates and builds a grid. Needs at least two strictly increasing points.
    pub fn new(z: &[f64]) -> Result<Self, FlowError> {
        if z.len() < 2 {
            return Err(FlowError::InvalidGrid(format!(
                "at least two grid points are required, got {}",
                z.len()
            )));
        }
        let mut dz = Vec::with_capacity(z.len() - 1);
        for j in 1..z.len() {
            // also rejects NaN
            if !(z[j] > z[j - 1]) {
                return Err(FlowError::InvalidGrid(
                    "grid points must be monotonically increasing".to_string(),
                ));
            }
            dz.push(z[j] - z[j - 1]);
        }
        Ok(Self { z: z.to_vec(), dz })
    }

    /// points j/n, j = 0..n
    pub fn uniform(points: usize) -> Result<Self, FlowError> {
        let z: Vec<f64> = (0..points).map(|j| j as f64 / points as f64).collect();
        Self::new(&z)
    }

    pub fn n_points(&self) -> usize {
        self.z.len()
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn dz(&self) -> &[f64] {
        &self.dz
    }

    pub fn z_at(&self, j: usize) -> f64 {
        self.z[j]
    }

    pub fn dz_at(&self, j: usize) -> f64 {
        self.dz[j]
    }

    /// coordinate normalized to [0, 1] over the domain
    pub fn normalized(&self, j: usize) -> f64 {
        let n = self.z.len() - 1;
        (self.z[j] - self.z[0]) / (self.z[n] - self.z[0])
    }
}

/// Maps (component, point) pairs onto positions in a domain-local state slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLayout {
    n_species: usize,
}

impl StateLayout {
    pub fn new(n_species: usize) -> Self {
        Self { n_species }
    }

    pub fn n_species(&self) -> usize {
        self.n_species
    }

    /// components per grid point
    pub fn n_components(&self) -> usize {
        C_OFFSET_Y + self.n_species
    }

    #[inline]
    pub fn index(&self, n: usize, j: usize) -> usize {
        n + self.n_components() * j
    }

    #[inline]
    pub fn species(&self, k: usize) -> usize {
        C_OFFSET_Y + k
    }

    /// length of a domain-local state slice holding `points` grid points
    pub fn size(&self, points: usize) -> usize {
        self.n_components() * points
    }
}

/// Piecewise linear interpolation of (xp, fp) at x, clamped to the end values
pub fn linear_interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if xp.is_empty() {
        return 0.0;
    }
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    let i = xp.partition_point(|&v| v <= x);
    let (x0, x1) = (xp[i - 1], xp[i]);
    let (f0, f1) = (fp[i - 1], fp[i]);
    f0 + (f1 - f0) * (x - x0) / (x1 - x0)
}
