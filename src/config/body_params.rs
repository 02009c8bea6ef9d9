use crate::config::constants;
use crate::core::BodyKind;
use crate::error::{SimError, SimResult};
use crate::geometry::Aabb;
use crate::math::{Real, is_positive_finite};

/// Construction-time settings for one body
#[derive(Clone, Debug)]
pub struct BodyParams {
    pub name: String,
    pub kind: BodyKind,

    /// Reference inter-particle distance (lattice pitch)
    pub spacing: Real,

    /// Smoothing length as a multiple of `spacing`
    pub smoothing_length_ratio: Real,

    /// Cutoff radius as a multiple of the smoothing length
    pub cutoff_factor: Real,

    /// Spatial index cell edge as a multiple of the cutoff radius (>= 1)
    pub cell_size_factor: Real,

    /// Box covered by the spatial index; defaults to the generated particle
    /// bounds grown by one cutoff radius
    pub domain: Option<Aabb>,

    /// Named per-particle scalar fields (density, pressure, species...)
    pub fields: Vec<String>,
}

impl BodyParams {
    pub fn new(name: impl Into<String>, kind: BodyKind, spacing: Real) -> Self {
        Self {
            name: name.into(),
            kind,
            spacing,
            smoothing_length_ratio: constants::SMOOTHING_LENGTH_RATIO,
            cutoff_factor: constants::CUTOFF_FACTOR,
            cell_size_factor: constants::CELL_SIZE_FACTOR,
            domain: None,
            fields: Vec::new(),
        }
    }

    pub fn with_smoothing_length_ratio(mut self, ratio: Real) -> Self {
        self.smoothing_length_ratio = ratio;
        self
    }

    pub fn with_cutoff_factor(mut self, factor: Real) -> Self {
        self.cutoff_factor = factor;
        self
    }

    pub fn with_cell_size_factor(mut self, factor: Real) -> Self {
        self.cell_size_factor = factor;
        self
    }

    pub fn with_domain(mut self, domain: Aabb) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    #[inline]
    pub fn smoothing_length(&self) -> Real {
        self.spacing * self.smoothing_length_ratio
    }

    #[inline]
    pub fn cutoff_radius(&self) -> Real {
        self.smoothing_length() * self.cutoff_factor
    }

    pub fn validate(&self) -> SimResult<()> {
        if !is_positive_finite(self.spacing) {
            return Err(SimError::configuration(format!(
                "body '{}': spacing must be positive and finite, got {}",
                self.name, self.spacing
            )));
        }
        if !is_positive_finite(self.smoothing_length_ratio) || !is_positive_finite(self.cutoff_factor)
        {
            return Err(SimError::configuration(format!(
                "body '{}': cutoff radius must be positive, got {}",
                self.name,
                self.cutoff_radius()
            )));
        }
        if !self.cell_size_factor.is_finite() || self.cell_size_factor < 1.0 {
            return Err(SimError::configuration(format!(
                "body '{}': cell size factor must be >= 1, got {}",
                self.name, self.cell_size_factor
            )));
        }
        Ok(())
    }
}
