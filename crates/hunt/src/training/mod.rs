//! Training machinery: loss functions, bootstrap pool, metrics time series,
//! and the scheduler that ties them together.

pub mod buffer;
pub mod loss;
pub mod metrics;
pub mod scheduler;

pub use buffer::BootstrapBuffer;
pub use loss::{hilbert_loss, EvasionObjective, GenObjective};
pub use metrics::{EvalPoint, HuntHistory, LossPoint, WarmStart};
pub use scheduler::{lr_at, the_hunt, CheckpointMeta, HuntConfig, HuntContext, UpdateOrder};
