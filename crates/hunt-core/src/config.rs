//! TOML config loading and CLI override merging for the run entry point.
//!
//! Priority chain: built-in defaults < TOML values < CLI flags. Every
//! recognized training field is optional in the file, so a partial config
//! only pins what it names.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use hunt::training::{HuntConfig, UpdateOrder};

/// Top-level structure of `configs/hunt.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct HuntToml {
    /// Grid geometry and network sizing.
    #[serde(default)]
    pub problem: ProblemToml,
    /// Training hyperparameter overrides.
    #[serde(default)]
    pub training: TrainingOverrides,
    /// Test-set location and names.
    #[serde(default)]
    pub data: DataToml,
}

/// Grid geometry and network sizing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProblemToml {
    /// Side length of the data grid (`dim = length²`).
    pub length: usize,
    /// Side length of the latent prior grid.
    pub length_prior: usize,
    /// Additive floor keeping every cell strictly positive.
    pub dust_const: f64,
    /// Weight of the generator's upsampled-latent skip connection.
    pub skip_const: f64,
    /// Generator hidden width; defaults to `6 * dim`.
    pub width_gen: Option<usize>,
    /// Predictor hidden width; defaults to `6 * dim`.
    pub width_pred: Option<usize>,
    /// Regularization as a fraction of the largest ground cost.
    pub eps_frac: f64,
    /// Rows sampled from each test set.
    pub n_test: usize,
}

impl Default for ProblemToml {
    fn default() -> Self {
        Self {
            length: 28,
            length_prior: 7,
            dust_const: 1e-6,
            skip_const: 0.75,
            width_gen: None,
            width_pred: None,
            eps_frac: 5e-4,
            n_test: 100,
        }
    }
}

impl ProblemToml {
    /// Eager validation of the problem geometry.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.length < 2 {
            anyhow::bail!("length must be at least 2, got {}", self.length);
        }
        if self.length_prior < 1 || self.length_prior > self.length {
            anyhow::bail!(
                "length_prior must lie in [1, length], got {} (length {})",
                self.length_prior,
                self.length
            );
        }
        if !(self.dust_const > 0.0 && self.dust_const.is_finite()) {
            anyhow::bail!("dust_const must be positive and finite, got {}", self.dust_const);
        }
        if !(self.skip_const >= 0.0 && self.skip_const.is_finite()) {
            anyhow::bail!("skip_const must be nonnegative, got {}", self.skip_const);
        }
        if !(self.eps_frac > 0.0 && self.eps_frac.is_finite()) {
            anyhow::bail!("eps_frac must be positive and finite, got {}", self.eps_frac);
        }
        if self.n_test < 1 {
            anyhow::bail!("n_test must be at least 1");
        }
        Ok(())
    }
}

/// Optional overrides for [`HuntConfig`] fields.
#[derive(Debug, Default, Deserialize)]
pub struct TrainingOverrides {
    pub n_loops: Option<usize>,
    pub n_mini_loops_pred: Option<usize>,
    pub n_mini_loops_gen: Option<usize>,
    pub n_batch: Option<usize>,
    pub n_accumulation_pred: Option<usize>,
    pub n_accumulation_gen: Option<usize>,
    pub lr_pred: Option<f64>,
    pub lr_gen: Option<f64>,
    pub lr_fact_pred: Option<f64>,
    pub lr_fact_gen: Option<f64>,
    pub learn_gen: Option<bool>,
    pub bootstrapped: Option<bool>,
    pub n_boot: Option<usize>,
    pub boot_refresh: Option<usize>,
    pub extend_data: Option<bool>,
    pub test_iter: Option<usize>,
    pub checkpoint: Option<usize>,
    pub n_sink_target: Option<usize>,
    pub update_order: Option<UpdateOrder>,
    pub seed: Option<u64>,
}

/// Test-set location and names.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DataToml {
    /// Directory holding `<name>.jsonl` files.
    pub dir: PathBuf,
    /// Named test sets to load.
    pub sets: Vec<String>,
}

impl Default for DataToml {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            sets: ["mnist", "cifar", "lfw", "bear", "quickdraw"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Load and deserialize a [`HuntToml`] from a TOML file.
pub fn load_hunt_toml(path: &Path) -> anyhow::Result<HuntToml> {
    let contents = std::fs::read_to_string(path)?;
    let config: HuntToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded run config");
    Ok(config)
}

/// Build the training config from defaults, TOML overrides, and CLI flags.
pub fn build_hunt_config(
    overrides: &TrainingOverrides,
    cli_loops: Option<usize>,
    cli_seed: Option<u64>,
    cli_resume: Option<usize>,
) -> HuntConfig {
    let mut config = HuntConfig::new();
    if let Some(v) = overrides.n_loops {
        config.n_loops = v;
    }
    if let Some(v) = overrides.n_mini_loops_pred {
        config.n_mini_loops_pred = v;
    }
    if let Some(v) = overrides.n_mini_loops_gen {
        config.n_mini_loops_gen = v;
    }
    if let Some(v) = overrides.n_batch {
        config.n_batch = v;
    }
    if let Some(v) = overrides.n_accumulation_pred {
        config.n_accumulation_pred = v;
    }
    if let Some(v) = overrides.n_accumulation_gen {
        config.n_accumulation_gen = v;
    }
    if let Some(v) = overrides.lr_pred {
        config.lr_pred = v;
    }
    if let Some(v) = overrides.lr_gen {
        config.lr_gen = v;
    }
    if let Some(v) = overrides.lr_fact_pred {
        config.lr_fact_pred = v;
    }
    if let Some(v) = overrides.lr_fact_gen {
        config.lr_fact_gen = v;
    }
    if let Some(v) = overrides.learn_gen {
        config.learn_gen = v;
    }
    if let Some(v) = overrides.bootstrapped {
        config.bootstrapped = v;
    }
    if let Some(v) = overrides.n_boot {
        config.n_boot = v;
    }
    if let Some(v) = overrides.boot_refresh {
        config.boot_refresh = v;
    }
    if let Some(v) = overrides.extend_data {
        config.extend_data = v;
    }
    if let Some(v) = overrides.test_iter {
        config.test_iter = v;
    }
    if let Some(v) = overrides.checkpoint {
        config.checkpoint = v;
    }
    if let Some(v) = overrides.n_sink_target {
        config.n_sink_target = v;
    }
    if let Some(v) = overrides.update_order {
        config.update_order = v;
    }
    if let Some(v) = overrides.seed {
        config.seed = v;
    }

    // CLI flags take highest priority.
    if let Some(v) = cli_loops {
        config.n_loops = v;
    }
    if let Some(v) = cli_seed {
        config.seed = v;
    }
    config.resume_from = cli_resume;

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_toml() {
        let toml_str = r#"
[problem]
length = 16
length_prior = 4
dust_const = 1e-5
n_test = 50

[training]
n_loops = 2000
n_batch = 100
lr_pred = 0.1
bootstrapped = false
update_order = "GeneratorFirst"

[data]
dir = "datasets"
sets = ["mnist", "cifar"]
"#;
        let config: HuntToml = toml::from_str(toml_str).unwrap();
        assert_eq!(config.problem.length, 16);
        assert_eq!(config.problem.length_prior, 4);
        assert_eq!(config.problem.n_test, 50);
        // Unnamed problem fields keep their defaults.
        assert!((config.problem.skip_const - 0.75).abs() < 1e-12);

        assert_eq!(config.training.n_loops, Some(2000));
        assert_eq!(config.training.bootstrapped, Some(false));
        assert_eq!(
            config.training.update_order,
            Some(UpdateOrder::GeneratorFirst)
        );

        assert_eq!(config.data.dir, PathBuf::from("datasets"));
        assert_eq!(config.data.sets, vec!["mnist", "cifar"]);
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: HuntToml = toml::from_str("").unwrap();
        assert_eq!(config.problem.length, 28);
        assert_eq!(config.data.sets.len(), 5);
        assert!(config.training.n_loops.is_none());
    }

    #[test]
    fn test_override_priority_chain() {
        let overrides = TrainingOverrides {
            n_loops: Some(1000),
            seed: Some(7),
            ..Default::default()
        };
        // TOML beats defaults.
        let config = build_hunt_config(&overrides, None, None, None);
        assert_eq!(config.n_loops, 1000);
        assert_eq!(config.seed, 7);

        // CLI beats TOML.
        let config = build_hunt_config(&overrides, Some(50), Some(99), Some(25));
        assert_eq!(config.n_loops, 50);
        assert_eq!(config.seed, 99);
        assert_eq!(config.resume_from, Some(25));
    }

    #[test]
    fn test_problem_validation() {
        let good = ProblemToml::default();
        assert!(good.validate().is_ok());

        let bad = ProblemToml {
            length_prior: 99,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = ProblemToml {
            dust_const: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = ProblemToml {
            n_test: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
