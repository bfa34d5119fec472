use serde::{Deserialize, Serialize};
use voxgate_features::FeatureConfig;

/// Default name of the background (impostor) identity.
pub const DEFAULT_BACKGROUND: &str = "background";

/// Mixture training parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmmConfig {
    /// Components per enrolled identity (default: 16).
    pub components: usize,
    /// Components for the background model (default: 64).
    pub background_components: usize,
    /// Random initializations; the best fit is kept (default: 3).
    pub n_init: usize,
    /// EM iteration cap (default: 100).
    pub max_iter: usize,
    /// Convergence threshold on mean log-likelihood change (default: 1e-3).
    pub tol: f64,
    /// Added to every variance (default: 1e-3).
    pub reg_covar: f64,
    /// Base seed for initialization (default: 0).
    pub seed: u64,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            components: 16,
            background_components: 64,
            n_init: 3,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-3,
            seed: 0,
        }
    }
}

/// Template alignment parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DtwConfig {
    /// Sakoe-Chiba band half-width in frames; `None` aligns without a band.
    pub band: Option<usize>,
}

/// Acceptance thresholds for the two authentication stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Identification succeeds when the best margin over the background
    /// model is strictly greater (default: 15.0).
    pub margin_threshold: f64,
    /// Passphrase verification succeeds when the alignment distance is
    /// strictly lower (default: 70.0).
    pub distance_threshold: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            margin_threshold: 15.0,
            distance_threshold: 70.0,
        }
    }
}

/// Complete authentication configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the background identity (default: "background").
    pub background: String,
    /// Extraction worker threads; 0 uses one per CPU (default: 0).
    pub workers: usize,
    pub features: FeatureConfig,
    pub gmm: GmmConfig,
    pub dtw: DtwConfig,
    pub decision: DecisionConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND.to_string(),
            workers: 0,
            features: FeatureConfig::default(),
            gmm: GmmConfig::default(),
            dtw: DtwConfig::default(),
            decision: DecisionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.background, "background");
        assert_eq!(cfg.gmm.components, 16);
        assert_eq!(cfg.gmm.background_components, 64);
        assert_eq!(cfg.decision.margin_threshold, 15.0);
        assert_eq!(cfg.decision.distance_threshold, 70.0);
        assert_eq!(cfg.dtw.band, None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: AuthConfig =
            serde_json::from_str(r#"{"decision": {"margin_threshold": 4.5}, "dtw": {"band": 20}}"#)
                .unwrap();
        assert_eq!(cfg.decision.margin_threshold, 4.5);
        assert_eq!(cfg.decision.distance_threshold, 70.0);
        assert_eq!(cfg.dtw.band, Some(20));
        assert_eq!(cfg.features.num_coefficients, 20);
    }
}
