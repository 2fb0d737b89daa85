//! The hunt: alternating, bootstrapped optimization of predictor and
//! generator.
//!
//! One outer loop acquires batches (fresh from the generator, or from the
//! bootstrap pool), accumulates gradients over sub-batches, applies one
//! optimizer step per mini-loop at a geometrically decaying learning rate,
//! and on fixed cadences evaluates against precomputed ground truth and
//! persists checkpoints. A non-finite loss or target aborts the run: with no
//! recovery mechanism beyond learning-rate decay, continuing would only
//! train on corrupted gradients.

use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{GradientsAccumulator, GradientsParams, Optimizer, SgdConfig};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use transport::{potential, SinkhornSolver, StopCriterion};

use crate::eval::EvaluationHarness;
use crate::model::{sample_latent, DensityGenerator, PotentialPredictor};
use crate::training::buffer::BootstrapBuffer;
use crate::training::loss::{hilbert_loss, GenObjective};
use crate::training::metrics::{HuntHistory, LossPoint};
use crate::{HuntError, Result};

/// Which network steps first within an outer loop.
///
/// Alternating-update ordering interacts with the two decaying learning
/// rates, so it is an explicit parameter rather than an implicit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOrder {
    PredictorFirst,
    GeneratorFirst,
}

/// Hyperparameters of the hunt.
#[derive(Config, Debug)]
pub struct HuntConfig {
    /// Number of outer loops.
    #[config(default = 50_000)]
    pub n_loops: usize,
    /// Predictor optimizer steps per outer loop.
    #[config(default = 1)]
    pub n_mini_loops_pred: usize,
    /// Generator optimizer steps per outer loop.
    #[config(default = 1)]
    pub n_mini_loops_gen: usize,
    /// Rows per acquired batch.
    #[config(default = 200)]
    pub n_batch: usize,
    /// Sub-batches accumulated per predictor step.
    #[config(default = 5)]
    pub n_accumulation_pred: usize,
    /// Sub-batches accumulated per generator step.
    #[config(default = 5)]
    pub n_accumulation_gen: usize,
    /// Base predictor learning rate.
    #[config(default = 0.25)]
    pub lr_pred: f64,
    /// Base generator learning rate.
    #[config(default = 0.25)]
    pub lr_gen: f64,
    /// Per-loop geometric decay factor for the predictor rate.
    #[config(default = 0.99997)]
    pub lr_fact_pred: f64,
    /// Per-loop geometric decay factor for the generator rate.
    #[config(default = 1.0)]
    pub lr_fact_gen: f64,
    /// Whether the generator trains at all (it always synthesizes data).
    #[config(default = true)]
    pub learn_gen: bool,
    /// Whether batches are drawn from the bootstrap pool.
    #[config(default = true)]
    pub bootstrapped: bool,
    /// Bootstrap pool capacity, in batches.
    #[config(default = 40)]
    pub n_boot: usize,
    /// Once the pool is full, regenerate the oldest batch every this many
    /// loops (FIFO refresh).
    #[config(default = 1)]
    pub boot_refresh: usize,
    /// Augment fresh batches with the swapped pairs and their
    /// row-scaling-derived targets.
    #[config(default = false)]
    pub extend_data: bool,
    /// Loops between evaluations.
    #[config(default = 1000)]
    pub test_iter: usize,
    /// Loops between checkpoints (the final loop always checkpoints).
    #[config(default = 50_000)]
    pub checkpoint: usize,
    /// Sinkhorn iterations per in-loop target solve.
    #[config(default = 250)]
    pub n_sink_target: usize,
    /// Which network updates first within a loop.
    #[config(default = "UpdateOrder::PredictorFirst")]
    pub update_order: UpdateOrder,
    /// Seed for tensor sampling and pool draws.
    #[config(default = 42)]
    pub seed: u64,
    /// Resume from the checkpoint tagged with this completed-loop count.
    pub resume_from: Option<usize>,
}

impl HuntConfig {
    /// Eager validation; every violation aborts before training begins.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("n_loops", self.n_loops),
            ("n_mini_loops_pred", self.n_mini_loops_pred),
            ("n_mini_loops_gen", self.n_mini_loops_gen),
            ("n_batch", self.n_batch),
            ("n_accumulation_pred", self.n_accumulation_pred),
            ("n_accumulation_gen", self.n_accumulation_gen),
            ("test_iter", self.test_iter),
            ("checkpoint", self.checkpoint),
            ("n_sink_target", self.n_sink_target),
            ("boot_refresh", self.boot_refresh),
        ];
        for (name, value) in positive {
            if value < 1 {
                return Err(HuntError::Config(format!(
                    "{name} must be at least 1, got {value}"
                )));
            }
        }
        if self.bootstrapped && self.n_boot < 1 {
            return Err(HuntError::Config(
                "n_boot must be at least 1 when bootstrapping is enabled".into(),
            ));
        }
        for (name, value) in [("lr_pred", self.lr_pred), ("lr_gen", self.lr_gen)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(HuntError::Config(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("lr_fact_pred", self.lr_fact_pred),
            ("lr_fact_gen", self.lr_fact_gen),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(HuntError::Config(format!(
                    "{name} must lie in (0, 1], got {value}"
                )));
            }
        }
        if let Some(step) = self.resume_from {
            if step >= self.n_loops {
                return Err(HuntError::Config(format!(
                    "resume_from = {step} is past n_loops = {}",
                    self.n_loops
                )));
            }
        }
        Ok(())
    }
}

/// Effective learning rate at an outer loop: `base * fact^loop`.
pub fn lr_at(base: f64, fact: f64, loop_idx: usize) -> f64 {
    base * fact.powi(loop_idx as i32)
}

/// Metadata saved alongside each checkpoint for resuming training.
#[derive(Serialize, Deserialize, Debug)]
pub struct CheckpointMeta {
    /// Completed outer loops at the time of the snapshot.
    pub loop_count: usize,
    pub pred_steps: u64,
    pub gen_steps: u64,
}

/// Run-scoped state threaded through the hunt rather than held globally:
/// the device, the target solver (on the inner backend — target solves
/// never build autodiff graphs), and the grid dimension.
pub struct HuntContext<B: AutodiffBackend> {
    pub device: B::Device,
    pub solver: SinkhornSolver<B::InnerBackend>,
    pub dim: usize,
}

enum Phase {
    Predictor,
    Generator,
}

/// Run the hunt.
///
/// Returns the trained networks and the collected time series. The
/// generator synthesizes every training batch whether or not `learn_gen` is
/// set; evaluation always goes through the `valid()` forms of the networks
/// and cannot touch optimizer state.
pub fn the_hunt<B, G, P, O>(
    mut generator: G,
    mut predictor: P,
    objective: &O,
    ctx: &HuntContext<B>,
    harness: &EvaluationHarness<B::InnerBackend>,
    config: &HuntConfig,
    run_dir: &Path,
) -> Result<(G, P, HuntHistory)>
where
    B: AutodiffBackend,
    G: DensityGenerator<B> + AutodiffModule<B>,
    G::InnerModule: DensityGenerator<B::InnerBackend>,
    P: PotentialPredictor<B> + AutodiffModule<B>,
    P::InnerModule: PotentialPredictor<B::InnerBackend>,
    O: GenObjective<B>,
{
    config.validate()?;
    B::seed(config.seed);
    let mut rng = StdRng::seed_from_u64(config.seed);
    std::fs::create_dir_all(run_dir)
        .map_err(|e| HuntError::Checkpoint(format!("cannot create {}: {e}", run_dir.display())))?;

    let mut opt_pred = SgdConfig::new().init();
    let mut opt_gen = SgdConfig::new().init();
    let mut history = HuntHistory::default();
    let mut pool: BootstrapBuffer<B> = BootstrapBuffer::new(config.n_boot);

    let start_loop = match config.resume_from {
        Some(step) => {
            let (gen, pred, og, op, meta) = restore_checkpoint(
                run_dir,
                step,
                generator,
                predictor,
                opt_gen,
                opt_pred,
                &ctx.device,
            )?;
            generator = gen;
            predictor = pred;
            opt_gen = og;
            opt_pred = op;
            history.pred_steps = meta.pred_steps;
            history.gen_steps = meta.gen_steps;
            tracing::info!(
                loop_count = meta.loop_count,
                pred_steps = meta.pred_steps,
                gen_steps = meta.gen_steps,
                "Resumed from checkpoint"
            );
            step
        }
        None => 0,
    };

    // Baseline evaluation before any update.
    run_evaluation(harness, &predictor.valid(), start_loop, &mut history);

    let train_start = Instant::now();
    for loop_idx in start_loop..config.n_loops {
        if config.bootstrapped {
            if !pool.is_full() {
                let (x, t) = fresh_batch(&generator, ctx, config, loop_idx)?;
                pool.push(x, t);
            } else if loop_idx % config.boot_refresh == 0 {
                let (x, t) = fresh_batch(&generator, ctx, config, loop_idx)?;
                pool.replace_oldest(x, t);
            }
        }

        let phases = match config.update_order {
            UpdateOrder::PredictorFirst => [Phase::Predictor, Phase::Generator],
            UpdateOrder::GeneratorFirst => [Phase::Generator, Phase::Predictor],
        };
        for phase in phases {
            match phase {
                Phase::Predictor => {
                    predictor = predictor_update(
                        predictor,
                        &generator,
                        &mut opt_pred,
                        ctx,
                        config,
                        loop_idx,
                        &pool,
                        &mut rng,
                        &mut history,
                    )?;
                }
                Phase::Generator if config.learn_gen => {
                    generator = generator_update(
                        generator,
                        &predictor,
                        objective,
                        &mut opt_gen,
                        ctx,
                        config,
                        loop_idx,
                        &mut history,
                    )?;
                }
                Phase::Generator => {}
            }
        }

        let done = loop_idx + 1;
        if done % config.test_iter == 0 {
            run_evaluation(harness, &predictor.valid(), done, &mut history);

            let elapsed = train_start.elapsed().as_secs_f64();
            let loops_run = (done - start_loop) as f64;
            let eta_secs = elapsed * (config.n_loops - done) as f64 / loops_run.max(1.0);
            let last_loss = history.train_loss.last().map(|p| p.loss).unwrap_or(f64::NAN);
            tracing::info!(
                loop_idx = done,
                lr_pred = format!("{:.3e}", lr_at(config.lr_pred, config.lr_fact_pred, loop_idx)),
                loss = format!("{last_loss:.5}"),
                eta = format_eta(eta_secs),
                "Hunt progress"
            );
        }

        if done % config.checkpoint == 0 || done == config.n_loops {
            save_checkpoint(
                run_dir,
                done,
                &generator,
                &predictor,
                &opt_gen,
                &opt_pred,
                &history,
            )?;
            tracing::info!(loop_count = done, "Checkpoint saved");
        }
    }

    tracing::info!(
        pred_steps = history.pred_steps,
        gen_steps = history.gen_steps,
        elapsed_secs = format!("{:.1}", train_start.elapsed().as_secs_f64()),
        "Hunt finished"
    );
    Ok((generator, predictor, history))
}

/// Synthesize a batch and its targets without building autodiff graphs.
fn fresh_batch<B, G>(
    generator: &G,
    ctx: &HuntContext<B>,
    config: &HuntConfig,
    loop_idx: usize,
) -> Result<(Tensor<B, 2>, Tensor<B, 2>)>
where
    B: AutodiffBackend,
    G: DensityGenerator<B> + AutodiffModule<B>,
    G::InnerModule: DensityGenerator<B::InnerBackend>,
{
    let gen_eval = generator.valid();
    let z = sample_latent::<B::InnerBackend>(config.n_batch, gen_eval.latent_width(), &ctx.device);
    let x = gen_eval.forward(z);
    let (mu, nu) = split_pairs(&x, ctx.dim);
    let v0 = Tensor::ones_like(&mu);

    let scalings = ctx.solver.iterate(
        mu.clone(),
        nu.clone(),
        v0,
        StopCriterion::fixed(config.n_sink_target),
    )?;
    let targets = potential::log_centered(scalings.v.clone());

    let (x, targets) = if config.extend_data {
        // The row scalings solve the swapped problem, so flipped pairs come
        // with their targets for free.
        let swapped = Tensor::cat(vec![nu, mu], 1);
        let swapped_targets = potential::log_centered(scalings.u.clone());
        (
            Tensor::cat(vec![x, swapped], 0),
            Tensor::cat(vec![targets, swapped_targets], 0),
        )
    } else {
        (x, targets)
    };
    ensure_finite(&targets, "training targets", loop_idx)?;

    Ok((Tensor::from_inner(x), Tensor::from_inner(targets)))
}

#[allow(clippy::too_many_arguments)]
fn predictor_update<B, G, P>(
    mut predictor: P,
    generator: &G,
    optimizer: &mut impl Optimizer<P, B>,
    ctx: &HuntContext<B>,
    config: &HuntConfig,
    loop_idx: usize,
    pool: &BootstrapBuffer<B>,
    rng: &mut StdRng,
    history: &mut HuntHistory,
) -> Result<P>
where
    B: AutodiffBackend,
    G: DensityGenerator<B> + AutodiffModule<B>,
    G::InnerModule: DensityGenerator<B::InnerBackend>,
    P: PotentialPredictor<B> + AutodiffModule<B>,
{
    let lr = lr_at(config.lr_pred, config.lr_fact_pred, loop_idx);
    for _ in 0..config.n_mini_loops_pred {
        let mut accumulator = GradientsAccumulator::<P>::new();
        let mut loss_sum = 0.0;
        for _ in 0..config.n_accumulation_pred {
            let (x, t) = if config.bootstrapped {
                pool.draw(rng).ok_or_else(|| {
                    HuntError::Data("bootstrap pool is empty at draw time".into())
                })?
            } else {
                fresh_batch(generator, ctx, config, loop_idx)?
            };
            let prediction = predictor.forward(x);
            let loss =
                hilbert_loss(prediction, t).div_scalar(config.n_accumulation_pred as f64);
            let loss_val: f64 = loss.clone().into_scalar().elem();
            if !loss_val.is_finite() {
                return Err(HuntError::NonFinite("predictor loss", loop_idx));
            }
            loss_sum += loss_val;

            let grads = GradientsParams::from_grads(loss.backward(), &predictor);
            accumulator.accumulate(&predictor, grads);
        }
        predictor = optimizer.step(lr, predictor, accumulator.grads());
        history.pred_steps += 1;
        history.train_loss.push(LossPoint {
            loop_idx,
            loss: loss_sum,
        });
    }
    Ok(predictor)
}

#[allow(clippy::too_many_arguments)]
fn generator_update<B, G, P, O>(
    mut generator: G,
    predictor: &P,
    objective: &O,
    optimizer: &mut impl Optimizer<G, B>,
    ctx: &HuntContext<B>,
    config: &HuntConfig,
    loop_idx: usize,
    history: &mut HuntHistory,
) -> Result<G>
where
    B: AutodiffBackend,
    G: DensityGenerator<B> + AutodiffModule<B>,
    P: PotentialPredictor<B> + AutodiffModule<B>,
    O: GenObjective<B>,
{
    let lr = lr_at(config.lr_gen, config.lr_fact_gen, loop_idx);
    for _ in 0..config.n_mini_loops_gen {
        let mut accumulator = GradientsAccumulator::<G>::new();
        let mut loss_sum = 0.0;
        for _ in 0..config.n_accumulation_gen {
            // Generated pairs stay differentiable; targets come from a
            // detached copy on the inner backend.
            let z = sample_latent::<B>(config.n_batch, generator.latent_width(), &ctx.device);
            let x = generator.forward(z);
            let (mu, nu) = split_pairs(&x.clone().inner(), ctx.dim);
            let v0 = Tensor::ones_like(&mu);
            let scalings = ctx.solver.iterate(
                mu,
                nu,
                v0,
                StopCriterion::fixed(config.n_sink_target),
            )?;
            let targets = potential::log_centered(scalings.v);
            ensure_finite(&targets, "generator targets", loop_idx)?;
            let targets = Tensor::from_inner(targets);

            let prediction = predictor.forward(x);
            let loss = objective
                .objective(prediction, targets)
                .div_scalar(config.n_accumulation_gen as f64);
            let loss_val: f64 = loss.clone().into_scalar().elem();
            if !loss_val.is_finite() {
                return Err(HuntError::NonFinite("generator loss", loop_idx));
            }
            loss_sum += loss_val;

            // from_grads extracts only the generator's parameters even
            // though gradients flowed back through the predictor.
            let grads = GradientsParams::from_grads(loss.backward(), &generator);
            accumulator.accumulate(&generator, grads);
        }
        generator = optimizer.step(lr, generator, accumulator.grads());
        history.gen_steps += 1;
        history.gen_loss.push(LossPoint {
            loop_idx,
            loss: loss_sum,
        });
    }
    Ok(generator)
}

/// Evaluate the (already `valid()`) predictor on every test set, logging and
/// recording per-set outcomes. A failing set is logged and skipped.
fn run_evaluation<IB, PV>(
    harness: &EvaluationHarness<IB>,
    eval_model: &PV,
    loop_idx: usize,
    history: &mut HuntHistory,
) where
    IB: Backend,
    PV: PotentialPredictor<IB>,
{
    for (name, outcome) in harness.evaluate(eval_model, loop_idx) {
        match outcome {
            Ok(point) => {
                tracing::info!(
                    set = %name,
                    loop_idx,
                    loss = format!("{:.5}", point.loss),
                    rel_err_sink = format!("{:.4}", point.rel_err_sink),
                    rel_err_exact = format!("{:.4}", point.rel_err_exact),
                    mcv = format!("{:.2e}", point.mean_constraint_violation),
                    warmstart_benefit = format!("{:.4}", point.warmstart_exact.benefit()),
                    "Evaluation"
                );
                history.push_eval(&name, point);
            }
            Err(e) => {
                tracing::warn!(set = %name, error = %e, "Evaluation failed for test set");
            }
        }
    }
}

fn split_pairs<B: Backend>(x: &Tensor<B, 2>, dim: usize) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [rows, _] = x.dims();
    (
        x.clone().slice([0..rows, 0..dim]),
        x.clone().slice([0..rows, dim..2 * dim]),
    )
}

fn ensure_finite<B: Backend>(
    t: &Tensor<B, 2>,
    what: &'static str,
    loop_idx: usize,
) -> Result<()> {
    let probe: f64 = t.clone().sum().into_scalar().elem();
    if !probe.is_finite() {
        return Err(HuntError::NonFinite(what, loop_idx));
    }
    Ok(())
}

fn format_eta(secs: f64) -> String {
    if secs < 60.0 {
        format!("{secs:.0}s")
    } else if secs < 3600.0 {
        format!("{:.0}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

fn step_dir(run_dir: &Path, loop_count: usize) -> PathBuf {
    run_dir.join(format!("step_{loop_count}"))
}

fn save_checkpoint<B, G, P>(
    run_dir: &Path,
    loop_count: usize,
    generator: &G,
    predictor: &P,
    opt_gen: &impl Optimizer<G, B>,
    opt_pred: &impl Optimizer<P, B>,
    history: &HuntHistory,
) -> Result<()>
where
    B: AutodiffBackend,
    G: AutodiffModule<B>,
    P: AutodiffModule<B>,
{
    let dir = step_dir(run_dir, loop_count);
    std::fs::create_dir_all(&dir)
        .map_err(|e| HuntError::Checkpoint(format!("cannot create {}: {e}", dir.display())))?;
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();

    generator
        .clone()
        .save_file(dir.join("generator"), &recorder)
        .map_err(|e| {
            HuntError::Checkpoint(format!("saving generator at loop {loop_count}: {e}"))
        })?;
    predictor
        .clone()
        .save_file(dir.join("predictor"), &recorder)
        .map_err(|e| {
            HuntError::Checkpoint(format!("saving predictor at loop {loop_count}: {e}"))
        })?;
    recorder
        .record(opt_gen.to_record(), dir.join("optimizer_gen"))
        .map_err(|e| HuntError::Checkpoint(format!("saving generator optimizer: {e}")))?;
    recorder
        .record(opt_pred.to_record(), dir.join("optimizer_pred"))
        .map_err(|e| HuntError::Checkpoint(format!("saving predictor optimizer: {e}")))?;

    let meta = CheckpointMeta {
        loop_count,
        pred_steps: history.pred_steps,
        gen_steps: history.gen_steps,
    };
    let meta_file = std::fs::File::create(dir.join("meta.json"))
        .map_err(|e| HuntError::Checkpoint(format!("creating meta.json: {e}")))?;
    serde_json::to_writer(meta_file, &meta)
        .map_err(|e| HuntError::Checkpoint(format!("writing meta.json: {e}")))?;
    Ok(())
}

type Restored<G, P, OG, OP> = (G, P, OG, OP, CheckpointMeta);

#[allow(clippy::too_many_arguments)]
fn restore_checkpoint<B, G, P, OG, OP>(
    run_dir: &Path,
    loop_count: usize,
    generator: G,
    predictor: P,
    opt_gen: OG,
    opt_pred: OP,
    device: &B::Device,
) -> Result<Restored<G, P, OG, OP>>
where
    B: AutodiffBackend,
    G: AutodiffModule<B>,
    P: AutodiffModule<B>,
    OG: Optimizer<G, B>,
    OP: Optimizer<P, B>,
{
    let dir = step_dir(run_dir, loop_count);
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();

    let generator = generator
        .load_file(dir.join("generator"), &recorder, device)
        .map_err(|e| {
            HuntError::Checkpoint(format!("loading generator from {}: {e}", dir.display()))
        })?;
    let predictor = predictor
        .load_file(dir.join("predictor"), &recorder, device)
        .map_err(|e| {
            HuntError::Checkpoint(format!("loading predictor from {}: {e}", dir.display()))
        })?;

    let gen_record = recorder
        .load(dir.join("optimizer_gen"), device)
        .map_err(|e| HuntError::Checkpoint(format!("loading generator optimizer: {e}")))?;
    let opt_gen = opt_gen.load_record(gen_record);
    let pred_record = recorder
        .load(dir.join("optimizer_pred"), device)
        .map_err(|e| HuntError::Checkpoint(format!("loading predictor optimizer: {e}")))?;
    let opt_pred = opt_pred.load_record(pred_record);

    let meta_path = dir.join("meta.json");
    let meta_file = std::fs::File::open(&meta_path)
        .map_err(|e| HuntError::Checkpoint(format!("opening {}: {e}", meta_path.display())))?;
    let meta: CheckpointMeta = serde_json::from_reader(meta_file)
        .map_err(|e| HuntError::Checkpoint(format!("parsing {}: {e}", meta_path.display())))?;
    Ok((generator, predictor, opt_gen, opt_pred, meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lr_schedule_geometric() {
        let base = 0.25;
        let fact = 0.5;
        assert!((lr_at(base, fact, 0) - 0.25).abs() < 1e-12);
        assert!((lr_at(base, fact, 1) - 0.125).abs() < 1e-12);
        assert!((lr_at(base, fact, 3) - 0.03125).abs() < 1e-12);

        // Factor 1.0 keeps the rate constant.
        assert!((lr_at(base, 1.0, 10_000) - base).abs() < 1e-12);

        // Default decay over a full run: 0.25 * 0.99997^50000 ≈ 0.0558.
        let decayed = lr_at(0.25, 0.99997, 50_000);
        assert!((decayed - 0.0558).abs() < 1e-3, "got {decayed}");
    }

    #[test]
    fn test_config_validation() {
        let good = HuntConfig::new();
        assert!(good.validate().is_ok());

        let bad = HuntConfig::new().with_n_mini_loops_pred(0);
        assert!(matches!(bad.validate(), Err(HuntError::Config(_))));

        let bad = HuntConfig::new().with_n_accumulation_gen(0);
        assert!(matches!(bad.validate(), Err(HuntError::Config(_))));

        let bad = HuntConfig::new().with_lr_pred(f64::NAN);
        assert!(matches!(bad.validate(), Err(HuntError::Config(_))));

        let bad = HuntConfig::new().with_lr_fact_pred(1.5);
        assert!(matches!(bad.validate(), Err(HuntError::Config(_))));

        let bad = HuntConfig::new()
            .with_n_loops(10)
            .with_resume_from(Some(10));
        assert!(matches!(bad.validate(), Err(HuntError::Config(_))));

        let bad = HuntConfig::new().with_bootstrapped(true).with_n_boot(0);
        assert!(matches!(bad.validate(), Err(HuntError::Config(_))));
    }

    #[test]
    fn test_update_order_serde() {
        let json = serde_json::to_string(&UpdateOrder::GeneratorFirst).unwrap();
        let back: UpdateOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UpdateOrder::GeneratorFirst);
    }
}
