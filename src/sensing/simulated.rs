use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::source::{Acceleration, AccelerometerSource, SensorError};

/// Device lying flat: gravity on -z, in g.
const RESTING_GRAVITY: Acceleration = Acceleration {
    x: 0.0,
    y: 0.0,
    z: -1.0,
};

/// Stand-in for the platform motion service on hosts without one.
///
/// Produces the resting gravity vector with gaussian noise on each axis and
/// can be told to fail a share of reads.
pub struct SimulatedAccelerometer {
    rng: StdRng,
    noise: Normal<f64>,
    failure_rate: f64,
}

impl SimulatedAccelerometer {
    pub fn new(noise_stdev: f64) -> Result<Self, SensorError> {
        Self::from_rng(StdRng::from_entropy(), noise_stdev)
    }

    /// Deterministic output for a given seed.
    pub fn with_seed(seed: u64, noise_stdev: f64) -> Result<Self, SensorError> {
        Self::from_rng(StdRng::seed_from_u64(seed), noise_stdev)
    }

    fn from_rng(rng: StdRng, noise_stdev: f64) -> Result<Self, SensorError> {
        let noise = Normal::new(0.0, noise_stdev)
            .map_err(|err| SensorError::InvalidConfig(format!("noise stdev {noise_stdev}: {err}")))?;
        Ok(Self {
            rng,
            noise,
            failure_rate: 0.0,
        })
    }

    /// Probability in `[0, 1]` that a read fails.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }
}

impl AccelerometerSource for SimulatedAccelerometer {
    fn read(&mut self) -> Result<Acceleration, SensorError> {
        if self.failure_rate > 0.0 && self.rng.gen_bool(self.failure_rate) {
            return Err(SensorError::ReadFailed("simulated read failure".into()));
        }

        Ok(Acceleration {
            x: RESTING_GRAVITY.x + self.noise.sample(&mut self.rng),
            y: RESTING_GRAVITY.y + self.noise.sample(&mut self.rng),
            z: RESTING_GRAVITY.z + self.noise.sample(&mut self.rng),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_near_gravity() {
        let stdev = 0.01;
        let mut source = SimulatedAccelerometer::with_seed(7, stdev).unwrap();
        for _ in 0..100 {
            let reading = source.read().unwrap();
            assert!(reading.x.abs() <= 6.0 * stdev);
            assert!(reading.y.abs() <= 6.0 * stdev);
            assert!((reading.z + 1.0).abs() <= 6.0 * stdev);
        }
    }

    #[test]
    fn same_seed_same_readings() {
        let mut a = SimulatedAccelerometer::with_seed(42, 0.05).unwrap();
        let mut b = SimulatedAccelerometer::with_seed(42, 0.05).unwrap();
        for _ in 0..10 {
            assert_eq!(a.read().unwrap(), b.read().unwrap());
        }
    }

    #[test]
    fn failure_rate_of_one_always_fails() {
        let mut source = SimulatedAccelerometer::with_seed(1, 0.05)
            .unwrap()
            .with_failure_rate(1.0);
        assert!(matches!(source.read(), Err(SensorError::ReadFailed(_))));
    }

    #[test]
    fn invalid_stdev_is_rejected() {
        assert!(matches!(
            SimulatedAccelerometer::new(f64::NAN),
            Err(SensorError::InvalidConfig(_))
        ));
    }
}
