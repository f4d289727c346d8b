use crate::render::Surface;
use rand::Rng;

/// Half-width of the square box an agent relocates within.
pub const RELOCATION_SPAN: f64 = 10.0;

/// Neighbor count below which a social agent goes looking for company.
pub const SOCIAL_LONELY_THRESHOLD: usize = 4;
/// Neighbor count above which an antisocial agent leaves.
pub const ANTISOCIAL_CROWD_THRESHOLD: usize = 1;

/// The two behavior variants. They differ only in the threshold test applied
/// to the neighbor count (self excluded).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Temperament {
    Social,
    AntiSocial,
}

impl Temperament {
    /// The per-step movement decision. `neighbor_count` must not include the
    /// deciding agent itself.
    pub fn wants_to_move(self, neighbor_count: usize) -> bool {
        match self {
            Temperament::Social => neighbor_count < SOCIAL_LONELY_THRESHOLD,
            Temperament::AntiSocial => neighbor_count > ANTISOCIAL_CROWD_THRESHOLD,
        }
    }
}

/// A point agent on the continuous plane.
///
/// Owned exclusively by the roster; the sector grid tracks agents by handle
/// and never holds a copy.
#[derive(Clone, Debug)]
pub struct Agent {
    temperament: Temperament,
    position: [f64; 2],
    radius: f64,
    moved: bool,
}

impl Agent {
    pub fn new(temperament: Temperament, position: [f64; 2], radius: f64) -> Self {
        Self {
            temperament,
            position,
            radius,
            moved: false,
        }
    }

    pub fn temperament(&self) -> Temperament {
        self.temperament
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    /// Whether this agent moved during the step currently being processed.
    pub fn moved(&self) -> bool {
        self.moved
    }

    pub(crate) fn clear_moved(&mut self) {
        self.moved = false;
    }

    /// Update the position and set the moved flag.
    ///
    /// The comparison is exact float equality on purpose: two coincident
    /// random draws count as "did not move", and an epsilon comparison would
    /// change the convergence semantics.
    pub fn set_position(&mut self, position: [f64; 2]) {
        self.moved = position != self.position;
        self.position = position;
    }

    /// Draw a relocation target: each axis uniform within
    /// [`RELOCATION_SPAN`] of the current coordinate, redrawn per axis until
    /// it lands inside `[0, bounds)`.
    pub fn relocation_target(&self, bounds: [f64; 2], rng: &mut impl Rng) -> [f64; 2] {
        let mut target = self.position;
        for axis in 0..2 {
            let lo = self.position[axis] - RELOCATION_SPAN;
            let hi = self.position[axis] + RELOCATION_SPAN;
            loop {
                let candidate = rng.random_range(lo..hi);
                if (0.0..bounds[axis]).contains(&candidate) {
                    target[axis] = candidate;
                    break;
                }
            }
        }
        target
    }

    /// Delegate rendering to the presentation layer. The core never draws
    /// anything itself.
    pub fn draw(&self, surface: &mut dyn Surface, scale: f64) {
        surface.draw_agent(self, scale);
    }
}
