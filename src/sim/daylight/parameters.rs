use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Ambient calculation parameters passed to `rfluxmtx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfluxmtxParameters {
    /// `-aa` ambient accuracy, [0, 1].
    pub ambient_accuracy: f64,
    /// `-ad` ambient divisions.
    pub ambient_divisions: u32,
    /// `-ab` ambient bounces.
    pub ambient_bounces: u32,
    /// `-lw` limit weight, (0, 1].
    pub limit_weight: f64,
    /// `-I` computes irradiance at the sender points.
    pub irradiance_calc: bool,
}

impl RfluxmtxParameters {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ambient_accuracy) {
            return Err(Error::Configuration(format!(
                "ambient accuracy must be in [0, 1], got {}",
                self.ambient_accuracy
            )));
        }
        if self.ambient_divisions == 0 {
            return Err(Error::Configuration(
                "ambient divisions must be positive".to_string(),
            ));
        }
        if !(self.limit_weight > 0.0 && self.limit_weight <= 1.0) {
            return Err(Error::Configuration(format!(
                "limit weight must be in (0, 1], got {}",
                self.limit_weight
            )));
        }
        Ok(())
    }

    /// Copy with a different number of ambient bounces.
    pub fn with_bounces(&self, ambient_bounces: u32) -> Self {
        Self {
            ambient_bounces,
            ..self.clone()
        }
    }

    pub fn to_args(&self) -> String {
        let mut args = format!(
            "-aa {} -ab {} -ad {} -lw {}",
            self.ambient_accuracy, self.ambient_bounces, self.ambient_divisions, self.limit_weight
        );
        if self.irradiance_calc {
            args.push_str(" -I");
        }
        args
    }
}

impl Default for RfluxmtxParameters {
    fn default() -> Self {
        Self {
            ambient_accuracy: 0.1,
            ambient_divisions: 4096,
            ambient_bounces: 5,
            limit_weight: 0.0002,
            irradiance_calc: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let params = RfluxmtxParameters::default();
        assert_eq!(params.to_args(), "-aa 0.1 -ab 5 -ad 4096 -lw 0.0002 -I");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_with_bounces() {
        let params = RfluxmtxParameters::default().with_bounces(1);
        assert_eq!(params.ambient_bounces, 1);
        assert_eq!(params.ambient_divisions, 4096);
    }

    #[test]
    fn test_invalid_parameters() {
        let params = RfluxmtxParameters {
            limit_weight: 0.0,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(Error::Configuration(_))));

        let params = RfluxmtxParameters {
            ambient_accuracy: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: RfluxmtxParameters = serde_json::from_str(r#"{"ambient_bounces": 2}"#).unwrap();
        assert_eq!(params.ambient_bounces, 2);
        assert!((params.ambient_accuracy - 0.1).abs() < 1e-12);
    }
}
