use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

/// SpeedDraw is the random source of the race. Each call returns the distance a participant
/// covers in one round, which must lie in [min_speed, max_speed].
pub trait SpeedDraw: Send {
    fn draw(&mut self, min_speed: f64, max_speed: f64) -> f64;
}

/// RngDraw samples every advance uniformly from the speed bounds using the wrapped generator.
#[derive(Debug, Clone)]
pub struct RngDraw<R> {
    rng: R,
}

impl<R: Rng + Send> RngDraw<R> {
    pub fn new(rng: R) -> RngDraw<R> {
        RngDraw { rng }
    }
}

impl RngDraw<StdRng> {
    pub fn from_entropy() -> RngDraw<StdRng> {
        RngDraw::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> RngDraw<StdRng> {
        RngDraw::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> SpeedDraw for RngDraw<R> {
    fn draw(&mut self, min_speed: f64, max_speed: f64) -> f64 {
        if max_speed <= min_speed {
            return min_speed;
        }
        Uniform::new_inclusive(min_speed, max_speed).sample(&mut self.rng)
    }
}

/// SequenceDraw replays a fixed, cyclic list of fractions in [0, 1]. A fraction f maps to
/// min_speed + f * (max_speed - min_speed), so 0.0 always yields the minimum speed. Fractions
/// outside [0, 1] are clamped, non-finite ones are replaced by 0.0.
#[derive(Debug, Clone)]
pub struct SequenceDraw {
    fractions: Vec<f64>,
    idx: usize,
}

impl SequenceDraw {
    pub fn new(fractions: Vec<f64>) -> SequenceDraw {
        let fractions = if fractions.is_empty() {
            vec![0.0]
        } else {
            fractions
                .into_iter()
                .map(|f| if f.is_finite() { f.clamp(0.0, 1.0) } else { 0.0 })
                .collect()
        };
        SequenceDraw { fractions, idx: 0 }
    }

    pub fn constant(fraction: f64) -> SequenceDraw {
        SequenceDraw::new(vec![fraction])
    }
}

impl SpeedDraw for SequenceDraw {
    fn draw(&mut self, min_speed: f64, max_speed: f64) -> f64 {
        let f = self.fractions[self.idx];
        self.idx = (self.idx + 1) % self.fractions.len();
        min_speed + f * (max_speed - min_speed)
    }
}
