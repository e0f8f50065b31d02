//! Wave excitation for joint bodies.
//!
//! Regular seas are a single sinusoid of the reference height and period.
//! Irregular seas sum `segments` components drawn from a Bretschneider
//! spectrum with seeded random phases, scaled so the significant wave height
//! equals the reference height.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Sea state type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaveType {
    /// Flat water, no excitation
    Calm,
    /// Single regular wave
    #[default]
    Regular,
    /// Irregular sea built from spectrum segments
    Irregular { segments: u32 },
}

/// Wave environment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub wave_type: WaveType,
    /// Wave height (m); significant height for irregular seas
    pub reference_height: f64,
    /// Wave period (s); peak period for irregular seas
    pub reference_period: f64,
    /// Seed for irregular wave phases
    pub seed: u64,
    /// Time over which the excitation ramps up from zero (s)
    pub ramp_time: f64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        WaveConfig {
            wave_type: WaveType::Regular,
            reference_height: 1.0,
            reference_period: 8.0,
            seed: 0,
            ramp_time: 5.0,
        }
    }
}

impl WaveConfig {
    pub fn calm() -> Self {
        WaveConfig {
            wave_type: WaveType::Calm,
            ..Default::default()
        }
    }

    pub fn regular(height: f64, period: f64) -> Self {
        WaveConfig {
            wave_type: WaveType::Regular,
            reference_height: height,
            reference_period: period,
            ..Default::default()
        }
    }

    pub fn irregular(height: f64, period: f64, segments: u32, seed: u64) -> Self {
        WaveConfig {
            wave_type: WaveType::Irregular { segments },
            reference_height: height,
            reference_period: period,
            seed,
            ..Default::default()
        }
    }

    pub fn with_ramp_time(mut self, ramp_time: f64) -> Self {
        self.ramp_time = ramp_time;
        self
    }

    /// Check the settings, returning a reason on failure
    pub fn check(&self) -> Result<(), String> {
        if self.wave_type == WaveType::Calm {
            return Ok(());
        }
        if !(self.reference_height.is_finite() && self.reference_height >= 0.0) {
            return Err(format!(
                "reference height must be non-negative, got {}",
                self.reference_height
            ));
        }
        if !(self.reference_period.is_finite() && self.reference_period > 0.0) {
            return Err(format!(
                "reference period must be positive, got {}",
                self.reference_period
            ));
        }
        if !(self.ramp_time.is_finite() && self.ramp_time >= 0.0) {
            return Err(format!("ramp time must be non-negative, got {}", self.ramp_time));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct WaveComponent {
    amplitude: f64,
    omega: f64,
    phase: f64,
}

/// Surface elevation generator built from a [`WaveConfig`]
#[derive(Debug, Clone)]
pub struct WaveField {
    components: Vec<WaveComponent>,
    ramp_time: f64,
}

impl WaveField {
    pub fn new(config: &WaveConfig) -> Self {
        let components = match config.wave_type {
            WaveType::Calm => Vec::new(),
            _ if config.check().is_err() || config.reference_height == 0.0 => Vec::new(),
            WaveType::Regular => vec![WaveComponent {
                amplitude: config.reference_height / 2.0,
                omega: TAU / config.reference_period,
                phase: 0.0,
            }],
            WaveType::Irregular { segments } => irregular_components(config, segments.max(1)),
        };

        WaveField {
            components,
            ramp_time: config.ramp_time,
        }
    }

    /// Surface elevation (m) at time `t`
    pub fn elevation(&self, t: f64) -> f64 {
        let ramp = if self.ramp_time > 0.0 {
            (t / self.ramp_time).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let sum: f64 = self
            .components
            .iter()
            .map(|c| c.amplitude * (c.omega * t + c.phase).sin())
            .sum();
        ramp * sum
    }

    /// Significant wave height 4·sqrt(m0) of the component set
    pub fn significant_height(&self) -> f64 {
        let m0: f64 = self.components.iter().map(|c| c.amplitude.powi(2) / 2.0).sum();
        4.0 * m0.sqrt()
    }

    pub fn is_calm(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Unnormalised Bretschneider spectrum shape for peak frequency `peak`
fn bretschneider_shape(omega: f64, peak: f64) -> f64 {
    omega.powi(-5) * (-1.25 * (peak / omega).powi(4)).exp()
}

fn irregular_components(config: &WaveConfig, segments: u32) -> Vec<WaveComponent> {
    let peak = TAU / config.reference_period;
    let (low, high) = (0.5 * peak, 3.0 * peak);
    let d_omega = (high - low) / segments as f64;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut components: Vec<WaveComponent> = (0..segments)
        .map(|i| {
            let omega = low + (i as f64 + 0.5) * d_omega;
            WaveComponent {
                amplitude: (2.0 * bretschneider_shape(omega, peak) * d_omega).sqrt(),
                omega,
                phase: rng.gen_range(0.0..TAU),
            }
        })
        .collect();

    // Scale so 4·sqrt(m0) matches the reference height
    let m0: f64 = components.iter().map(|c| c.amplitude.powi(2) / 2.0).sum();
    if m0 > 0.0 {
        let scale = config.reference_height / (4.0 * m0.sqrt());
        for c in &mut components {
            c.amplitude *= scale;
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_calm_sea_is_flat() {
        let field = WaveField::new(&WaveConfig::calm());
        assert!(field.is_calm());
        assert_eq!(field.elevation(3.7), 0.0);
    }

    #[test]
    fn test_regular_wave_crest() {
        let field = WaveField::new(&WaveConfig::regular(2.0, 8.0).with_ramp_time(0.0));
        // Crest a quarter period in
        assert_relative_eq!(field.elevation(2.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(field.elevation(0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ramp_scales_early_elevation() {
        let config = WaveConfig::regular(2.0, 8.0).with_ramp_time(4.0);
        let field = WaveField::new(&config);
        // Half way through the ramp at the crest
        assert_relative_eq!(field.elevation(2.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_irregular_matches_significant_height() {
        let field = WaveField::new(&WaveConfig::irregular(1.5, 9.0, 64, 7));
        assert_eq!(field.len(), 64);
        assert_relative_eq!(field.significant_height(), 1.5, max_relative = 1e-9);
    }

    #[test]
    fn test_irregular_phases_follow_seed() {
        let a = WaveField::new(&WaveConfig::irregular(1.0, 8.0, 16, 42).with_ramp_time(0.0));
        let b = WaveField::new(&WaveConfig::irregular(1.0, 8.0, 16, 42).with_ramp_time(0.0));
        let c = WaveField::new(&WaveConfig::irregular(1.0, 8.0, 16, 43).with_ramp_time(0.0));

        assert_eq!(a.elevation(12.3), b.elevation(12.3));
        assert!((a.elevation(12.3) - c.elevation(12.3)).abs() > 1e-9);
    }

    #[test]
    fn test_invalid_period_rejected() {
        let config = WaveConfig::regular(1.0, 0.0);
        assert!(config.check().is_err());
        assert!(WaveField::new(&config).is_calm());
    }
}
