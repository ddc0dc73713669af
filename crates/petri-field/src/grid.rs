//! A single morphogen concentration grid.

use petri_core::{Mode, Vec3};

/// A scalar concentration field on a regular grid with spacing
/// `resolution` on every axis. The z axis collapses to a single layer in
/// 2D mode.
///
/// Diffusion runs in sub-steps of `Δt_diff` with an optional smaller
/// remainder step, each an explicit five-point (2D) or seven-point (3D)
/// stencil update. Boundaries are reflective: before every sub-step the
/// halo ring is overwritten with the adjacent interior values, which makes
/// the scheme conservative under clipping-free conditions.
#[derive(Clone, Debug)]
pub struct Gradient {
    name: String,
    points: [usize; 3],
    resolution: f64,
    diffusivity: f64,
    c_max: f64,
    data: Vec<f64>,
    front: Vec<f64>,
    back: Vec<f64>,
}

impl Gradient {
    /// Build a grid covering `[0, size]` with one point every
    /// `resolution`, uniformly filled with `initial`.
    ///
    /// # Panics
    ///
    /// Panics if `resolution` or `c_max` is not positive, or if
    /// `diffusivity` is negative or non-finite.
    pub fn new(
        name: impl Into<String>,
        size: Vec3,
        mode: Mode,
        resolution: f64,
        diffusivity: f64,
        c_max: f64,
        initial: f64,
    ) -> Self {
        assert!(
            resolution.is_finite() && resolution > 0.0,
            "grid resolution must be finite and positive, got {resolution}"
        );
        assert!(
            diffusivity.is_finite() && diffusivity >= 0.0,
            "diffusivity must be finite and >= 0, got {diffusivity}"
        );
        assert!(
            c_max.is_finite() && c_max > 0.0,
            "maximum concentration must be finite and positive, got {c_max}"
        );

        let axis_points = |extent: f64| (extent / resolution).round() as usize + 1;
        let points = [
            axis_points(size.x),
            axis_points(size.y),
            match mode {
                Mode::TwoD => 1,
                Mode::ThreeD => axis_points(size.z),
            },
        ];
        let len = points[0] * points[1] * points[2];
        let padded = (points[0] + 2) * (points[1] + 2) * (points[2] + 2);

        Self {
            name: name.into(),
            points,
            resolution,
            diffusivity,
            c_max,
            data: vec![initial.clamp(0.0, c_max); len],
            front: vec![0.0; padded],
            back: vec![0.0; padded],
        }
    }

    /// Gradient name, e.g. `"fgf4"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid points per axis.
    pub fn points(&self) -> [usize; 3] {
        self.points
    }

    /// Grid spacing.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Diffusion constant.
    pub fn diffusivity(&self) -> f64 {
        self.diffusivity
    }

    /// Concentration ceiling.
    pub fn c_max(&self) -> f64 {
        self.c_max
    }

    /// `true` when the grid has a single z layer.
    pub fn is_planar(&self) -> bool {
        self.points[2] == 1
    }

    /// Spatial dimension of the stencil (2 or 3).
    fn stencil_dim(&self) -> usize {
        if self.is_planar() {
            2
        } else {
            3
        }
    }

    /// Largest stable diffusion sub-step: `a = D·Δt/Δx² ≤ 1/(2d)`.
    ///
    /// Returns `None` for a zero diffusivity, which imposes no constraint.
    pub fn max_stable_dt(&self) -> Option<f64> {
        if self.diffusivity == 0.0 {
            return None;
        }
        let d = self.stencil_dim() as f64;
        Some(self.resolution * self.resolution / (2.0 * d * self.diffusivity))
    }

    /// Sum of all grid concentrations.
    pub fn total_mass(&self) -> f64 {
        self.data.iter().sum()
    }

    fn flat(&self, index: [usize; 3]) -> usize {
        (index[0] * self.points[1] + index[1]) * self.points[2] + index[2]
    }

    /// Concentration at a grid point, for tests and sampling.
    pub fn at(&self, index: [usize; 3]) -> f64 {
        self.data[self.flat(index)]
    }

    /// Overwrite a grid point, clipped to `[0, c_max]`.
    pub fn set(&mut self, index: [usize; 3], value: f64) {
        let flat = self.flat(index);
        self.data[flat] = value.clamp(0.0, self.c_max);
    }

    /// Nearest grid point to a location (round-to-nearest per axis,
    /// clamped into the grid).
    pub fn nearest_point(&self, location: Vec3) -> [usize; 3] {
        let clamp_axis = |value: f64, n: usize| -> usize {
            let raw = (value / self.resolution).round();
            if raw <= 0.0 {
                0
            } else {
                (raw as usize).min(n - 1)
            }
        };
        [
            clamp_axis(location.x, self.points[0]),
            clamp_axis(location.y, self.points[1]),
            if self.is_planar() {
                0
            } else {
                clamp_axis(location.z, self.points[2])
            },
        ]
    }

    /// Concentration at the grid point nearest to `location`.
    pub fn concentration_at(&self, location: Vec3) -> f64 {
        self.at(self.nearest_point(location))
    }

    /// Add `amount` at the grid point nearest to `location`.
    ///
    /// Negative amounts model binding; the value is not clipped here, the
    /// next diffusion pass clips.
    pub fn adjust_nearest(&mut self, location: Vec3, amount: f64) {
        let flat = self.flat(self.nearest_point(location));
        self.data[flat] += amount;
    }

    /// Distribute `amount` over the four grid points surrounding
    /// `location` in its plane, weighted by inverse distance.
    ///
    /// Points farther than `reach` from the location are skipped; if the
    /// location sits exactly on a point, that point receives everything.
    pub fn adjust_distributed(&mut self, location: Vec3, amount: f64, reach: f64) {
        let base_x = (location.x / self.resolution).floor().max(0.0) as usize;
        let base_y = (location.y / self.resolution).floor().max(0.0) as usize;
        let layer = if self.is_planar() {
            0
        } else {
            self.nearest_point(location)[2]
        };

        let corners = [
            [base_x, base_y, layer],
            [base_x + 1, base_y, layer],
            [base_x, base_y + 1, layer],
            [base_x + 1, base_y + 1, layer],
        ];

        // First pass: distances and the reciprocal-sum normalizer. A cell
        // sitting exactly on a grid point short-circuits to that point.
        let mut distances = [f64::NAN; 4];
        let mut total = 0.0;
        for (slot, corner) in corners.iter().enumerate() {
            if corner[0] >= self.points[0] || corner[1] >= self.points[1] {
                continue;
            }
            let point = Vec3::new(
                corner[0] as f64 * self.resolution,
                corner[1] as f64 * self.resolution,
                location.z,
            );
            let mag = location.distance(point);
            if mag > reach {
                continue;
            }
            if mag == 0.0 {
                let flat = self.flat(*corner);
                self.data[flat] += amount;
                return;
            }
            distances[slot] = mag;
            total += 1.0 / mag;
        }

        if total == 0.0 {
            return;
        }
        for (slot, corner) in corners.iter().enumerate() {
            let mag = distances[slot];
            if !mag.is_nan() {
                let flat = self.flat(*corner);
                self.data[flat] += amount / (mag * total);
            }
        }
    }

    /// Clip every grid point to `[0, c_max]`.
    pub fn clip(&mut self) {
        for value in &mut self.data {
            *value = value.clamp(0.0, self.c_max);
        }
    }

    /// Advance diffusion across one macro-step.
    ///
    /// Runs `floor(step_dt / diffuse_dt)` sub-steps of `diffuse_dt` plus a
    /// final remainder sub-step when `step_dt` does not divide evenly.
    /// Concentrations are clipped before and after the sequence.
    pub fn diffuse(&mut self, step_dt: f64, diffuse_dt: f64) {
        assert!(
            diffuse_dt > 0.0,
            "diffusion sub-step must be positive, got {diffuse_dt}"
        );
        self.clip();
        if self.diffusivity == 0.0 || step_dt <= 0.0 {
            return;
        }

        let full_steps = (step_dt / diffuse_dt).floor() as usize;
        let remainder = step_dt - full_steps as f64 * diffuse_dt;

        self.load_padded();
        for _ in 0..full_steps {
            self.substep(diffuse_dt);
        }
        if remainder > 0.0 {
            self.substep(remainder);
        }
        self.store_padded();

        self.clip();
    }

    /// Copy the interior into the padded front buffer.
    fn load_padded(&mut self) {
        let [nx, ny, nz] = self.points;
        self.front.fill(0.0);
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let flat = (x * ny + y) * nz + z;
                    self.front[padded_index(self.points, x + 1, y + 1, z + 1)] = self.data[flat];
                }
            }
        }
    }

    /// Copy the padded front buffer back into the interior.
    fn store_padded(&mut self) {
        let [nx, ny, nz] = self.points;
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let flat = (x * ny + y) * nz + z;
                    self.data[flat] = self.front[padded_index(self.points, x + 1, y + 1, z + 1)];
                }
            }
        }
    }

    /// One Jacobi update of duration `dt` on the padded buffers.
    fn substep(&mut self, dt: f64) {
        let [nx, ny, nz] = self.points;
        let alpha = dt * self.diffusivity / (self.resolution * self.resolution);
        let planar = self.is_planar();
        let beta = if planar {
            1.0 - 4.0 * alpha
        } else {
            1.0 - 6.0 * alpha
        };

        self.reflect_halo();

        let points = self.points;
        let idx = move |x: usize, y: usize, z: usize| padded_index(points, x, y, z);
        for x in 1..=nx {
            for y in 1..=ny {
                for z in 1..=nz {
                    let mut sum = self.front[idx(x - 1, y, z)]
                        + self.front[idx(x + 1, y, z)]
                        + self.front[idx(x, y - 1, z)]
                        + self.front[idx(x, y + 1, z)];
                    if !planar {
                        sum += self.front[idx(x, y, z - 1)] + self.front[idx(x, y, z + 1)];
                    }
                    self.back[idx(x, y, z)] = alpha * sum + beta * self.front[idx(x, y, z)];
                }
            }
        }

        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Mirror the first interior layer into the halo on every live axis.
    fn reflect_halo(&mut self) {
        let [nx, ny, nz] = self.points;
        let points = self.points;
        let idx = move |x: usize, y: usize, z: usize| padded_index(points, x, y, z);

        for y in 0..ny + 2 {
            for z in 0..nz + 2 {
                self.front[idx(0, y, z)] = self.front[idx(1, y, z)];
                self.front[idx(nx + 1, y, z)] = self.front[idx(nx, y, z)];
            }
        }
        for x in 0..nx + 2 {
            for z in 0..nz + 2 {
                self.front[idx(x, 0, z)] = self.front[idx(x, 1, z)];
                self.front[idx(x, ny + 1, z)] = self.front[idx(x, ny, z)];
            }
        }
        if !self.is_planar() {
            for x in 0..nx + 2 {
                for y in 0..ny + 2 {
                    self.front[idx(x, y, 0)] = self.front[idx(x, y, 1)];
                    self.front[idx(x, y, nz + 1)] = self.front[idx(x, y, nz)];
                }
            }
        }
    }
}

fn padded_index(points: [usize; 3], x: usize, y: usize, z: usize) -> usize {
    (x * (points[1] + 2) + y) * (points[2] + 2) + z
}
