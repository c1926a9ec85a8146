//! Expected final particle positions used as a correctness check.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::RegressionOutcome;
use crate::{BenchError, BenchResult};

use super::workload::ParticleState;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Baseline {
    None,
    /// Particles must end where they started.
    Stationary,
    /// First particle must end at a fixed position.
    FirstParticle { lon: f64, lat: f64 },
    /// Solid-body rotation around (30, 30) with a one-day period.
    RadialRotation,
}

impl Baseline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Baseline::None => "none",
            Baseline::Stationary => "stationary",
            Baseline::FirstParticle { .. } => "first-particle",
            Baseline::RadialRotation => "radial-rotation",
        }
    }

    /// Compare `state` with this baseline.
    ///
    /// `initial` holds the release positions and `default_age_s` is used for
    /// the rotation angle when the workload did not report an age. Returns
    /// `Ok(None)` for [`Baseline::None`] and a [`BenchError::Regression`]
    /// when the worst deviation exceeds `tolerance`.
    pub fn check(
        &self,
        initial: (&[f64], &[f64]),
        state: Option<&ParticleState>,
        default_age_s: f64,
        tolerance: f64,
    ) -> BenchResult<Option<RegressionOutcome>> {
        if matches!(self, Baseline::None) {
            return Ok(None);
        }
        let state = state.ok_or_else(|| {
            BenchError::Regression(format!(
                "{} baseline needs final particle positions but the workload reported none",
                self
            ))
        })?;
        if state.lon.len() != state.lat.len() {
            return Err(BenchError::Workload(format!(
                "workload reported {} longitudes and {} latitudes",
                state.lon.len(),
                state.lat.len()
            )));
        }

        let (expected_lon, expected_lat) = self.expected(initial, state, default_age_s);
        let compared = expected_lon.len();
        if state.lon.len() < compared {
            return Err(BenchError::Regression(format!(
                "{} baseline expects {compared} particles, workload reported {}",
                self,
                state.lon.len()
            )));
        }

        let max_abs_error = state
            .lon
            .iter()
            .zip(&expected_lon)
            .chain(state.lat.iter().zip(&expected_lat))
            .map(|(got, want)| (got - want).abs())
            .fold(0.0_f64, f64::max);

        let outcome = RegressionOutcome {
            baseline: self.to_string(),
            max_abs_error,
            tolerance,
            passed: max_abs_error <= tolerance,
        };
        if !outcome.passed {
            return Err(BenchError::Regression(format!(
                "{} baseline: max abs error {max_abs_error:.3e} exceeds tolerance {tolerance:.1e}",
                self
            )));
        }
        Ok(Some(outcome))
    }

    fn expected(
        &self,
        initial: (&[f64], &[f64]),
        state: &ParticleState,
        default_age_s: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        match *self {
            Baseline::None => (Vec::new(), Vec::new()),
            Baseline::Stationary => (initial.0.to_vec(), initial.1.to_vec()),
            Baseline::FirstParticle { lon, lat } => (vec![lon], vec![lat]),
            Baseline::RadialRotation => {
                let age = state.age_s.unwrap_or(default_age_s);
                let theta = 2.0 * PI * age / SECONDS_PER_DAY;
                initial
                    .0
                    .iter()
                    .map(|&lon0| {
                        let r = lon0 - 30.0;
                        (r * theta.cos() + 30.0, -r * theta.sin() + 30.0)
                    })
                    .unzip()
            }
        }
    }
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(lon: Vec<f64>, lat: Vec<f64>, age_s: Option<f64>) -> ParticleState {
        ParticleState { lon, lat, age_s }
    }

    #[test]
    fn test_none_skips_check() {
        assert!(Baseline::None.check((&[], &[]), None, 0.0, 0.0).unwrap().is_none());
    }

    #[test]
    fn test_stationary_passes_for_unmoved_particles() {
        let lon = [-10.0, 10.0];
        let lat = [-30.0, -20.0];
        let s = state(lon.to_vec(), lat.to_vec(), None);
        let outcome = Baseline::Stationary
            .check((&lon, &lat), Some(&s), 864_000.0, 1e-6)
            .unwrap()
            .unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.max_abs_error, 0.0);
    }

    #[test]
    fn test_stationary_fails_when_moved() {
        let lon = [0.0];
        let lat = [0.0];
        let s = state(vec![0.1], vec![0.0], None);
        let err = Baseline::Stationary
            .check((&lon, &lat), Some(&s), 0.0, 1e-6)
            .unwrap_err();
        assert!(matches!(err, BenchError::Regression(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_missing_positions_is_regression() {
        let err = Baseline::Stationary
            .check((&[0.0], &[0.0]), None, 0.0, 1e-6)
            .unwrap_err();
        assert!(err.to_string().contains("reported none"));
    }

    #[test]
    fn test_first_particle_only_compares_first() {
        let s = state(vec![-9.820091, 99.0], vec![-30.106716, 99.0], None);
        let outcome = Baseline::FirstParticle {
            lon: -9.820091,
            lat: -30.106716,
        }
        .check((&[-10.0, 10.0], &[-30.0, -20.0]), Some(&s), 0.0, 1e-5)
        .unwrap()
        .unwrap();
        assert!(outcome.passed);
    }

    #[test]
    fn test_radial_rotation_quarter_day() {
        // r = 10, theta = pi/2 after six hours
        let s = state(vec![30.0], vec![20.0], Some(21_600.0));
        let outcome = Baseline::RadialRotation
            .check((&[40.0], &[30.0]), Some(&s), 0.0, 5e-2)
            .unwrap()
            .unwrap();
        assert!(outcome.max_abs_error < 1e-9);
    }

    #[test]
    fn test_radial_rotation_uses_default_age() {
        let s = state(vec![40.0], vec![30.0], None);
        assert!(Baseline::RadialRotation
            .check((&[40.0], &[30.0]), Some(&s), SECONDS_PER_DAY, 5e-2)
            .is_ok());
    }
}
