//! Configuration pushed to the mesh refinement collaborator.
//!
//! The flow domain never reads refinement decisions. It only decides which
//! components take part in refinement and carries the numeric criteria so they
//! can be stored and restored with the solution.
use super::flow_error::FlowError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RefineCriteria {
    /// max ratio of neighbouring interval widths
    pub ratio: f64,
    /// max relative change of a component between two points
    pub slope: f64,
    /// max relative change of the slope between two intervals
    pub curve: f64,
    /// points are removed where all changes fall below `prune` times the thresholds
    pub prune: f64,
    pub grid_min: f64,
    pub max_points: usize,
}

impl Default for RefineCriteria {
    fn default() -> Self {
        Self {
            ratio: 10.0,
            slope: 0.8,
            curve: 0.8,
            prune: -0.001,
            grid_min: 1e-10,
            max_points: 1000,
        }
    }
}

impl RefineCriteria {
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.ratio < 2.0 {
            return Err(FlowError::InvalidRefineCriteria(format!(
                "'ratio' must be greater than 2.0 ({} was specified)",
                self.ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.slope) {
            return Err(FlowError::InvalidRefineCriteria(format!(
                "'slope' must be between 0.0 and 1.0 ({} was specified)",
                self.slope
            )));
        }
        if !(0.0..=1.0).contains(&self.curve) {
            return Err(FlowError::InvalidRefineCriteria(format!(
                "'curve' must be between 0.0 and 1.0 ({} was specified)",
                self.curve
            )));
        }
        if self.prune > self.curve || self.prune > self.slope {
            return Err(FlowError::InvalidRefineCriteria(format!(
                "'prune' must be less than 'curve' and 'slope' ({} was specified)",
                self.prune
            )));
        }
        if self.grid_min <= 0.0 {
            return Err(FlowError::InvalidRefineCriteria(
                "'grid-min' must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Criteria plus the per-component activation flags
#[derive(Debug, Clone, PartialEq)]
pub struct GridRefiner {
    criteria: RefineCriteria,
    active: Vec<bool>,
}

impl GridRefiner {
    /// all components active, default criteria
    pub fn new(n_components: usize) -> Self {
        Self {
            criteria: RefineCriteria::default(),
            active: vec![true; n_components],
        }
    }

    pub fn criteria(&self) -> &RefineCriteria {
        &self.criteria
    }

    /// Validates before applying; the previous criteria survive a failure
    pub fn set_criteria(&mut self, criteria: RefineCriteria) -> Result<(), FlowError> {
        criteria.validate()?;
        self.criteria = criteria;
        Ok(())
    }

    pub fn set_active(&mut self, component: usize, active: bool) {
        if let Some(flag) = self.active.get_mut(component) {
            *flag = active;
        }
    }

    pub fn is_active(&self, component: usize) -> bool {
        self.active.get(component).copied().unwrap_or(false)
    }
}
