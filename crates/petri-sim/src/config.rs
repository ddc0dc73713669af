//! Simulation configuration, parsing, and validation.
//!
//! Configurations arrive as RON key/value files (or are built in code),
//! then pass one `validate()` gate before a [`Simulation`] is
//! constructed. Everything that can be rejected statically is rejected
//! here: degenerate domains, inverted radii, time steps that violate the
//! diffusion stability bound, unknown FDS moduli.
//!
//! [`Simulation`]: crate::driver::Simulation

use petri_core::{Mode, StateSpace, Vec3};
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Name of the gradient the regulatory pathway samples and secretes into.
pub const FGF4: &str = "fgf4";

/// Which motility decision tree the simulation uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotilityRuleset {
    /// The standard ruleset with the `guye_move` / `eunbi_move` sub-flags.
    Standard,
    /// The NetLogo-style ruleset that only re-evaluates moving cells.
    Netlogo,
}

/// One diffusible morphogen.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradientConfig {
    /// Gradient name; `"fgf4"` is required by the regulatory pathway.
    pub name: String,
    /// Uniform initial concentration.
    pub initial: f64,
    /// Diffusion constant `D`.
    pub diffusivity: f64,
}

/// Complete configuration of one simulation run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Simulation name, used in output file names.
    pub name: String,
    /// Directory snapshot sinks write into.
    pub output_dir: PathBuf,
    /// Spatial dimensionality: 2 or 3.
    pub dimensions: u8,
    /// Domain extents per axis; `size[2]` must be 0 in 2D mode.
    pub size: [f64; 3],
    /// Initial NANOG-high pluripotent cells.
    pub num_nanog_high: usize,
    /// Initial GATA6-high pluripotent cells.
    pub num_gata6_high: usize,
    /// End time of the run in seconds.
    pub end_time: f64,
    /// Macro-step duration `Δt_step` in seconds.
    pub step_dt: f64,
    /// Motion sub-step duration `Δt_move` in seconds.
    pub move_dt: f64,
    /// Upper bound on the motion window per macro-step, in seconds.
    pub move_max_time: f64,
    /// Diffusion sub-step duration `Δt_diff` in seconds.
    pub diffuse_dt: f64,
    /// Morphogen grid spacing `Δx` in meters.
    pub resolution: f64,
    /// Concentration ceiling `C_max`.
    pub max_concentration: f64,
    /// Smallest cell radius, assigned right after division.
    pub min_radius: f64,
    /// Largest cell radius.
    pub max_radius: f64,
    /// Division threshold for pluripotent cells `T_div_p`.
    pub pluri_div_thresh: u32,
    /// Division threshold for differentiated cells `T_div_d`.
    pub diff_div_thresh: u32,
    /// Differentiation threshold `T_diff`.
    pub pluri_to_diff: u32,
    /// Death threshold `T_death`.
    pub death_thresh: u32,
    /// Steps between regulatory updates `T_fds`.
    pub fds_thresh: u32,
    /// Proximity radius `r_n` in meters.
    pub neighbor_distance: f64,
    /// Nearest-of-type search radius `r_near` in meters.
    pub nearest_distance: f64,
    /// Minimum proximity degree below which a pluripotent cell is lonely.
    pub lonely_threshold: u32,
    /// Proximity degree at which differentiated division is inhibited.
    pub contact_inhibition: u32,
    /// Differentiated neighbors required to force differentiation.
    pub diff_surround_threshold: u32,
    /// FDS modulus `k`, 2 (Boolean) or 3 (ternary).
    pub fds_states: u8,
    /// Diffusible morphogens; must include `"fgf4"`.
    pub gradients: Vec<GradientConfig>,
    /// Cells appended per batch during division; 0 appends all at once.
    pub group_size: usize,
    /// Image quality factor for rendering sinks (canvas is `1500 · Q`).
    pub image_quality: u32,
    /// Seed for every random draw in the run.
    pub seed: u64,
    /// Active motility force magnitude `F_mot` in newtons.
    pub motility_force: f64,
    /// Motility decision tree.
    pub motility_ruleset: MotilityRuleset,
    /// Standard ruleset: GATA6-high cells chase the nearest
    /// differentiated cell.
    pub guye_move: bool,
    /// Standard ruleset: NANOG-high cells avoid GATA6-high cells and seek
    /// NANOG-high cells.
    pub eunbi_move: bool,
    /// First step at which the regulatory pathway is active.
    pub induction_step: u64,
    /// Mass assigned to every cell at setup.
    pub cell_mass: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "colony".into(),
            output_dir: PathBuf::from("."),
            dimensions: 2,
            size: [1e-3, 1e-3, 0.0],
            num_nanog_high: 500,
            num_gata6_high: 500,
            end_time: 64_800.0,
            step_dt: 1_800.0,
            move_dt: 200.0,
            move_max_time: 1_800.0,
            diffuse_dt: 0.24,
            resolution: 1e-5,
            max_concentration: 30.0,
            min_radius: 5e-6,
            max_radius: 6e-6,
            pluri_div_thresh: 36,
            diff_div_thresh: 72,
            pluri_to_diff: 72,
            death_thresh: 144,
            fds_thresh: 1,
            neighbor_distance: 1e-5,
            nearest_distance: 1.5e-5,
            lonely_threshold: 5,
            contact_inhibition: 6,
            diff_surround_threshold: 6,
            fds_states: 2,
            gradients: vec![GradientConfig {
                name: FGF4.into(),
                initial: 0.0,
                diffusivity: 1e-12,
            }],
            group_size: 0,
            image_quality: 1,
            seed: 0,
            motility_force: 2e-9,
            motility_ruleset: MotilityRuleset::Standard,
            guye_move: true,
            eunbi_move: false,
            induction_step: 0,
            cell_mass: 1e-12,
        }
    }
}

impl SimConfig {
    /// Parse a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|err| ConfigError::Parse {
            reason: err.to_string(),
        })
    }

    /// Spatial mode derived from `dimensions`.
    pub fn mode(&self) -> Mode {
        if self.dimensions == 3 {
            Mode::ThreeD
        } else {
            Mode::TwoD
        }
    }

    /// FDS value space derived from `fds_states`.
    ///
    /// Falls back to Boolean for unvalidated configurations; `validate()`
    /// rejects anything other than 2 or 3.
    pub fn state_space(&self) -> StateSpace {
        StateSpace::from_modulus(self.fds_states).unwrap_or(StateSpace::Boolean)
    }

    /// Domain extents as a vector.
    pub fn size_vec(&self) -> Vec3 {
        Vec3::new(self.size[0], self.size[1], self.size[2])
    }

    /// Radius gained per division-counter tick for pluripotent cells.
    pub fn pluri_growth(&self) -> f64 {
        (self.max_radius - self.min_radius) / f64::from(self.pluri_div_thresh.max(1))
    }

    /// Radius gained per division-counter tick for differentiated cells.
    pub fn diff_growth(&self) -> f64 {
        (self.max_radius - self.min_radius) / f64::from(self.diff_div_thresh.max(1))
    }

    /// Motion sub-steps per macro-step: the motion window is the
    /// macro-step capped at `move_max_time`, split into `Δt_move` pieces.
    pub fn move_substeps(&self) -> usize {
        (self.step_dt.min(self.move_max_time) / self.move_dt).ceil() as usize
    }

    /// Check every structural invariant. Called by the driver before any
    /// state is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.dimensions != 2 && self.dimensions != 3 {
            return Err(ConfigError::BadDimensions {
                value: self.dimensions,
            });
        }

        for (axis, label) in [(0usize, 'x'), (1, 'y')] {
            if !(self.size[axis] > 0.0) || !self.size[axis].is_finite() {
                return Err(ConfigError::ZeroDomain { axis: label });
            }
        }
        match self.mode() {
            Mode::TwoD => {
                if self.size[2] != 0.0 {
                    return Err(ConfigError::ZeroDomain { axis: 'z' });
                }
            }
            Mode::ThreeD => {
                if !(self.size[2] > 0.0) || !self.size[2].is_finite() {
                    return Err(ConfigError::ZeroDomain { axis: 'z' });
                }
            }
        }

        for (what, value) in [
            ("step_dt", self.step_dt),
            ("move_dt", self.move_dt),
            ("move_max_time", self.move_max_time),
            ("diffuse_dt", self.diffuse_dt),
            ("resolution", self.resolution),
            ("max_concentration", self.max_concentration),
            ("min_radius", self.min_radius),
            ("max_radius", self.max_radius),
            ("neighbor_distance", self.neighbor_distance),
            ("nearest_distance", self.nearest_distance),
            ("cell_mass", self.cell_mass),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::NonPositive { what, value });
            }
        }
        if !(self.end_time >= 0.0) || !self.end_time.is_finite() {
            return Err(ConfigError::NonPositive {
                what: "end_time",
                value: self.end_time,
            });
        }
        if !(self.motility_force >= 0.0) || !self.motility_force.is_finite() {
            return Err(ConfigError::NonPositive {
                what: "motility_force",
                value: self.motility_force,
            });
        }
        if self.move_dt > self.step_dt {
            return Err(ConfigError::MoveStepTooLarge {
                move_dt: self.move_dt,
                step_dt: self.step_dt,
            });
        }
        if self.min_radius >= self.max_radius {
            return Err(ConfigError::RadiusOrder {
                min: self.min_radius,
                max: self.max_radius,
            });
        }
        if StateSpace::from_modulus(self.fds_states).is_none() {
            return Err(ConfigError::BadStateSpace {
                value: self.fds_states,
            });
        }

        let mut seen_fgf4 = false;
        for (index, gradient) in self.gradients.iter().enumerate() {
            if gradient.name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if self.gradients[..index]
                .iter()
                .any(|other| other.name == gradient.name)
            {
                return Err(ConfigError::DuplicateGradient {
                    name: gradient.name.clone(),
                });
            }
            if !(gradient.diffusivity >= 0.0) || !gradient.diffusivity.is_finite() {
                return Err(ConfigError::NonPositive {
                    what: "diffusivity",
                    value: gradient.diffusivity,
                });
            }
            if !(0.0..=self.max_concentration).contains(&gradient.initial) {
                return Err(ConfigError::InitialConcentration {
                    name: gradient.name.clone(),
                    value: gradient.initial,
                    c_max: self.max_concentration,
                });
            }
            // Explicit Euler stability: a = D·Δt/Δx² must not exceed 1/(2d).
            if gradient.diffusivity > 0.0 {
                let dims = f64::from(self.dimensions);
                let stable_dt =
                    self.resolution * self.resolution / (2.0 * dims * gradient.diffusivity);
                if self.diffuse_dt > stable_dt {
                    return Err(ConfigError::UnstableDiffusion {
                        name: gradient.name.clone(),
                        configured_dt: self.diffuse_dt,
                        stable_dt,
                    });
                }
            }
            seen_fgf4 |= gradient.name == FGF4;
        }
        if !seen_fgf4 {
            return Err(ConfigError::RequiredGradient { name: FGF4 });
        }

        Ok(())
    }
}

/// Errors detected while parsing or validating a configuration.
///
/// All of these are fatal at startup.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The RON input did not parse.
    Parse {
        /// Parser diagnostic.
        reason: String,
    },
    /// The simulation name or a gradient name is empty.
    EmptyName,
    /// `dimensions` is not 2 or 3.
    BadDimensions {
        /// The rejected value.
        value: u8,
    },
    /// A domain axis has a degenerate extent for the chosen mode.
    ZeroDomain {
        /// The offending axis.
        axis: char,
    },
    /// A parameter that must be positive (or non-negative) is not.
    NonPositive {
        /// Parameter name.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The motion sub-step exceeds the macro-step.
    MoveStepTooLarge {
        /// Configured motion sub-step.
        move_dt: f64,
        /// Configured macro-step.
        step_dt: f64,
    },
    /// `min_radius` is not strictly below `max_radius`.
    RadiusOrder {
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },
    /// The FDS modulus is not 2 or 3.
    BadStateSpace {
        /// The rejected value.
        value: u8,
    },
    /// Two gradients share a name.
    DuplicateGradient {
        /// The duplicated name.
        name: String,
    },
    /// A gradient's initial concentration falls outside `[0, C_max]`.
    InitialConcentration {
        /// Gradient name.
        name: String,
        /// The rejected value.
        value: f64,
        /// The configured ceiling.
        c_max: f64,
    },
    /// The diffusion sub-step violates the explicit-Euler stability bound.
    UnstableDiffusion {
        /// Gradient name.
        name: String,
        /// Configured sub-step.
        configured_dt: f64,
        /// Largest stable sub-step.
        stable_dt: f64,
    },
    /// A gradient the model depends on is missing.
    RequiredGradient {
        /// The missing name.
        name: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { reason } => write!(f, "configuration parse error: {reason}"),
            Self::EmptyName => write!(f, "names must be non-empty"),
            Self::BadDimensions { value } => {
                write!(f, "dimensions must be 2 or 3, got {value}")
            }
            Self::ZeroDomain { axis } => {
                write!(f, "domain extent on the {axis} axis is invalid for this mode")
            }
            Self::NonPositive { what, value } => {
                write!(f, "{what} must be positive and finite, got {value}")
            }
            Self::MoveStepTooLarge { move_dt, step_dt } => {
                write!(f, "move_dt {move_dt} exceeds step_dt {step_dt}")
            }
            Self::RadiusOrder { min, max } => {
                write!(f, "min_radius {min} must be below max_radius {max}")
            }
            Self::BadStateSpace { value } => {
                write!(f, "fds_states must be 2 or 3, got {value}")
            }
            Self::DuplicateGradient { name } => {
                write!(f, "gradient '{name}' is defined twice")
            }
            Self::InitialConcentration { name, value, c_max } => {
                write!(
                    f,
                    "gradient '{name}' initial concentration {value} outside [0, {c_max}]"
                )
            }
            Self::UnstableDiffusion {
                name,
                configured_dt,
                stable_dt,
            } => {
                write!(
                    f,
                    "gradient '{name}': diffuse_dt {configured_dt} exceeds the stable bound {stable_dt}"
                )
            }
            Self::RequiredGradient { name } => {
                write!(f, "a gradient named '{name}' is required")
            }
        }
    }
}

impl Error for ConfigError {}
