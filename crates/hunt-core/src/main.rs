//! Run entry point: configure, load the test sets, precompute ground truth,
//! and let the hunt begin.

mod config;
mod data;
mod results;

use std::path::PathBuf;

use anyhow::Context;
use burn::module::Module;
use burn::prelude::*;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use hunt::eval::{EvaluationHarness, GROUND_TRUTH_ITERS};
use hunt::model::{GenNet, GenNetConfig, PredNet, PredNetConfig};
use hunt::training::{the_hunt, EvasionObjective, HuntConfig, HuntContext};
use hunt::HuntError;
use transport::{eps_from_cost, CostMatrix, SinkhornSolver, StopCriterion};

use config::ProblemToml;

#[cfg(feature = "wgpu")]
type InnerBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
type InnerBackend = burn::backend::ndarray::NdArray<f32>;
type TrainBackend = burn::backend::Autodiff<InnerBackend>;

/// Train a Sinkhorn potential predictor and its pair generator.
#[derive(Parser)]
#[command(name = "sinkhorn-hunt", version, about)]
struct Cli {
    /// Path to the run config TOML file.
    #[arg(long, default_value = "configs/hunt.toml")]
    config: PathBuf,
    /// Directory containing the named test-set JSONL files.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Base directory for timestamped run output.
    #[arg(long, default_value = "stamps")]
    out_dir: PathBuf,
    /// Override the total number of outer loops.
    #[arg(long)]
    n_loops: Option<usize>,
    /// Override the RNG seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Existing run directory to resume into.
    #[arg(long, requires = "resume_from")]
    resume_dir: Option<PathBuf>,
    /// Completed-loop count of the checkpoint to resume from.
    #[arg(long, requires = "resume_dir")]
    resume_from: Option<usize>,
    /// Request a device kind: "cpu" or "gpu".
    #[arg(long)]
    device: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let file_config = if cli.config.exists() {
        config::load_hunt_toml(&cli.config)?
    } else {
        tracing::info!(path = %cli.config.display(), "No config file found, using defaults");
        config::HuntToml::default()
    };
    let problem = file_config.problem;
    problem.validate()?;

    let training = config::build_hunt_config(
        &file_config.training,
        cli.n_loops,
        cli.seed,
        cli.resume_from,
    );
    training.validate()?;

    let device = select_device(cli.device.as_deref())?;
    tracing::info!(
        backend = core::any::type_name::<InnerBackend>(),
        "Device selected"
    );

    let dim = problem.length * problem.length;
    let dim_prior = problem.length_prior * problem.length_prior;
    let cost = CostMatrix::<InnerBackend>::squared_grid(problem.length, &device)?;
    let eps = eps_from_cost(&cost, problem.eps_frac)?;
    tracing::info!(eps, "Entropic regularization parameter");

    // Test sets move to the device once, here, not per iteration.
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| file_config.data.dir.clone());
    let mut sample_rng = StdRng::seed_from_u64(training.seed);
    let mut sets = Vec::new();
    for name in &file_config.data.sets {
        let path = data_dir.join(format!("{name}.jsonl"));
        let rows = data::load_test_set(&path, dim)
            .with_context(|| format!("loading test set '{name}'"))?;
        let rows = data::preprocess(rows, problem.dust_const)
            .with_context(|| format!("preprocessing test set '{name}'"))?;
        let rows = data::sample_rows(rows, problem.n_test, &mut sample_rng)
            .with_context(|| format!("sampling test set '{name}'"))?;
        sets.push((name.clone(), data::to_tensor::<InnerBackend>(&rows, &device)));
        tracing::info!(set = %name, rows = problem.n_test, "Loaded test set");
    }

    tracing::info!("Precomputing test-set divergences and targets...");
    let harness = EvaluationHarness::precompute(
        &cost,
        eps,
        sets,
        StopCriterion::fixed(GROUND_TRUTH_ITERS),
    )?;

    let width_gen = problem.width_gen.unwrap_or(6 * dim);
    let width_pred = problem.width_pred.unwrap_or(6 * dim);
    let generator = GenNetConfig::new(problem.length_prior, problem.length, width_gen)
        .with_dust_const(problem.dust_const)
        .with_skip_const(problem.skip_const)
        .init::<TrainBackend>(&device);
    let predictor = PredNetConfig::new(dim, width_pred).init::<TrainBackend>(&device);
    tracing::info!(
        gen_params = generator.num_params(),
        pred_params = predictor.num_params(),
        "Networks initialized"
    );

    let run_dir = match &cli.resume_dir {
        Some(dir) => dir.clone(),
        None => results::create_run_dir(&cli.out_dir)?,
    };
    let params = hyperparams(
        &problem,
        &training,
        dim,
        dim_prior,
        eps,
        width_gen,
        width_pred,
        &generator,
        &predictor,
    );
    results::write_params(&run_dir.join("params.txt"), &params)?;

    let ctx = HuntContext::<TrainBackend> {
        device: device.clone(),
        solver: SinkhornSolver::new(&cost, eps)?,
        dim,
    };

    let (_generator, _predictor, history) = the_hunt(
        generator,
        predictor,
        &EvasionObjective,
        &ctx,
        &harness,
        &training,
        &run_dir,
    )?;

    results::write_history(&run_dir.join("history.json"), &history)?;
    tracing::info!(run_dir = %run_dir.display(), "The hunt is over. Time to rest.");
    Ok(())
}

fn select_device(requested: Option<&str>) -> anyhow::Result<<TrainBackend as Backend>::Device> {
    match requested {
        None => Ok(Default::default()),
        Some("gpu") => {
            if cfg!(feature = "wgpu") {
                Ok(Default::default())
            } else {
                Err(HuntError::Device(
                    "an accelerator was requested but this build only has the CPU backend \
                     (rebuild with --features wgpu)"
                        .into(),
                )
                .into())
            }
        }
        Some("cpu") => {
            if cfg!(feature = "wgpu") {
                Err(HuntError::Device(
                    "cpu was requested but this build uses the wgpu backend".into(),
                )
                .into())
            } else {
                Ok(Default::default())
            }
        }
        Some(other) => Err(HuntError::Device(format!(
            "unknown device kind '{other}' (expected \"cpu\" or \"gpu\")"
        ))
        .into()),
    }
}

/// The recognized hyperparameters, dumped one `name: value` per line.
#[allow(clippy::too_many_arguments)]
fn hyperparams(
    problem: &ProblemToml,
    training: &HuntConfig,
    dim: usize,
    dim_prior: usize,
    eps: f64,
    width_gen: usize,
    width_pred: usize,
    generator: &GenNet<TrainBackend>,
    predictor: &PredNet<TrainBackend>,
) -> Vec<(&'static str, String)> {
    vec![
        (
            "date",
            chrono::Local::now().format("%d.%m.%Y").to_string(),
        ),
        ("prior distribution length", problem.length_prior.to_string()),
        ("data length", problem.length.to_string()),
        ("prior distribution dimension", dim_prior.to_string()),
        ("data dimension", dim.to_string()),
        ("regularization parameter", eps.to_string()),
        ("dust constant", problem.dust_const.to_string()),
        ("skip connection constant", problem.skip_const.to_string()),
        ("no. layers gen", generator.layer_count().to_string()),
        ("no. layers pred", predictor.layer_count().to_string()),
        ("hidden layer width gen", width_gen.to_string()),
        ("hidden layer width pred", width_pred.to_string()),
        (
            "total no. trainable parameters gen",
            generator.num_params().to_string(),
        ),
        (
            "total no. trainable parameters pred",
            predictor.num_params().to_string(),
        ),
        ("device", core::any::type_name::<InnerBackend>().to_string()),
        ("gen net learning rate", training.lr_gen.to_string()),
        ("pred net learning rate", training.lr_pred.to_string()),
        (
            "learning rate scale factor gen",
            training.lr_fact_gen.to_string(),
        ),
        (
            "learning rate scale factor pred",
            training.lr_fact_pred.to_string(),
        ),
        (
            "no. unique data points gen",
            (training.n_loops * training.n_mini_loops_gen * training.n_batch).to_string(),
        ),
        (
            "no. unique data points pred",
            (training.n_loops * training.n_mini_loops_pred * training.n_batch).to_string(),
        ),
        ("no. loops", training.n_loops.to_string()),
        ("no. mini loops gen", training.n_mini_loops_gen.to_string()),
        ("no. mini loops pred", training.n_mini_loops_pred.to_string()),
        ("batch size gradient update", training.n_batch.to_string()),
        (
            "batch size per step gen",
            (training.n_batch * training.n_accumulation_gen).to_string(),
        ),
        (
            "batch size per step pred",
            (training.n_batch * training.n_accumulation_pred).to_string(),
        ),
        (
            "no. gradients per step gen",
            training.n_accumulation_gen.to_string(),
        ),
        (
            "no. gradients per step pred",
            training.n_accumulation_pred.to_string(),
        ),
        ("target solve iterations", training.n_sink_target.to_string()),
        ("test_iter", training.test_iter.to_string()),
        ("no. test samples", problem.n_test.to_string()),
        ("learn gen?", training.learn_gen.to_string()),
        ("bootstrapped?", training.bootstrapped.to_string()),
        ("no. bootstraps", training.n_boot.to_string()),
        ("bootstrap refresh cadence", training.boot_refresh.to_string()),
        ("extend data?", training.extend_data.to_string()),
        ("update order", format!("{:?}", training.update_order)),
        ("checkpoint", training.checkpoint.to_string()),
        ("seed", training.seed.to_string()),
    ]
}
