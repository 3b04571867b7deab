use crate::config::SimulationSettings;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Lower bound applied to the risk score when it scales the spread.
pub const MIN_RISK_SPREAD: f64 = 0.1;

/// Draws schedule samples around a base estimate and reports a high percentile.
pub struct Simulator {
    rng: StdRng,
    samples: usize,
    percentile: f64,
}

impl Simulator {
    pub fn new(settings: &SimulationSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            samples: settings.samples,
            percentile: settings.percentile,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(&SimulationSettings {
            seed: Some(seed),
            ..SimulationSettings::default()
        })
    }

    /// Samples `N(base_days, base_days * max(risk, 0.1))` and returns the
    /// configured percentile truncated to whole days.
    pub fn estimate_days(&mut self, base_days: f64, risk: f64) -> i64 {
        let std_dev = base_days * risk.max(MIN_RISK_SPREAD);
        let normal = match Normal::new(base_days, std_dev) {
            Ok(normal) => normal,
            Err(error) => {
                tracing::warn!(base_days, std_dev, error = %error, "invalid schedule distribution");
                return base_days.trunc() as i64;
            }
        };

        let mut samples: Vec<f64> = normal
            .sample_iter(&mut self.rng)
            .take(self.samples)
            .collect();

        match percentile(&mut samples, self.percentile) {
            Some(value) => value.trunc() as i64,
            None => base_days.trunc() as i64,
        }
    }
}

/// Percentile with linear interpolation between the two closest ranks.
/// Sorts `values` in place.
pub fn percentile(values: &mut [f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(values[lower] + (values[upper] - values[lower]) * fraction)
}
