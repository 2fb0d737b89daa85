//! Bootstrap pool: cached training batches reused across gradient steps.
//!
//! Computing Sinkhorn targets is the expensive part of batch acquisition, so
//! the scheduler caches whole `(input, target)` batches and draws from the
//! pool instead of regenerating every step. Refresh policy: FIFO — the pool
//! fills to capacity first, then `replace_oldest` swaps out the
//! longest-lived batch on the scheduler's cadence. Draws are uniform.

use burn::prelude::*;
use rand::Rng;

/// Bounded pool of cached `(input, target)` batches.
///
/// Exclusively owned by the scheduler; mutation only happens between
/// gradient steps.
pub struct BootstrapBuffer<B: Backend> {
    batches: Vec<(Tensor<B, 2>, Tensor<B, 2>)>,
    next_out: usize,
    capacity: usize,
}

impl<B: Backend> BootstrapBuffer<B> {
    /// Create an empty pool holding at most `capacity` batches.
    pub fn new(capacity: usize) -> Self {
        Self {
            batches: Vec::with_capacity(capacity),
            next_out: 0,
            capacity,
        }
    }

    /// Number of cached batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether the pool holds no batches yet.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Whether the pool has reached capacity.
    pub fn is_full(&self) -> bool {
        self.batches.len() >= self.capacity
    }

    /// Add a batch to a pool that is not yet full.
    pub fn push(&mut self, input: Tensor<B, 2>, target: Tensor<B, 2>) {
        debug_assert!(!self.is_full(), "push on a full pool");
        self.batches.push((input, target));
    }

    /// Replace the longest-lived batch with a fresh one.
    pub fn replace_oldest(&mut self, input: Tensor<B, 2>, target: Tensor<B, 2>) {
        if self.batches.is_empty() {
            self.batches.push((input, target));
            return;
        }
        self.batches[self.next_out] = (input, target);
        self.next_out = (self.next_out + 1) % self.batches.len();
    }

    /// Draw a uniformly random cached batch (cheap tensor-handle clones).
    pub fn draw(&self, rng: &mut impl Rng) -> Option<(Tensor<B, 2>, Tensor<B, 2>)> {
        if self.batches.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.batches.len());
        let (x, t) = &self.batches[idx];
        Some((x.clone(), t.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type TestBackend = NdArray<f32>;

    fn batch(tag: f32) -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 2>) {
        let device = Default::default();
        let x = Tensor::from_data(TensorData::new(vec![tag; 4], [2, 2]), &device);
        let t = Tensor::from_data(TensorData::new(vec![-tag; 4], [2, 2]), &device);
        (x, t)
    }

    fn tag_of(t: &Tensor<TestBackend, 2>) -> f32 {
        let data: Vec<f32> = t.clone().into_data().to_vec().unwrap();
        data[0]
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut pool = BootstrapBuffer::<TestBackend>::new(2);
        assert!(pool.is_empty());
        let (x, t) = batch(1.0);
        pool.push(x, t);
        assert!(!pool.is_full());
        let (x, t) = batch(2.0);
        pool.push(x, t);
        assert!(pool.is_full());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_replace_oldest_rotates() {
        let mut pool = BootstrapBuffer::<TestBackend>::new(2);
        let (x, t) = batch(1.0);
        pool.push(x, t);
        let (x, t) = batch(2.0);
        pool.push(x, t);

        let (x, t) = batch(3.0);
        pool.replace_oldest(x, t);
        let tags: Vec<f32> = pool.batches.iter().map(|(x, _)| tag_of(x)).collect();
        assert_eq!(tags, vec![3.0, 2.0]);

        let (x, t) = batch(4.0);
        pool.replace_oldest(x, t);
        let tags: Vec<f32> = pool.batches.iter().map(|(x, _)| tag_of(x)).collect();
        assert_eq!(tags, vec![3.0, 4.0]);
    }

    #[test]
    fn test_draw_is_seeded() {
        let mut pool = BootstrapBuffer::<TestBackend>::new(3);
        for tag in [1.0, 2.0, 3.0] {
            let (x, t) = batch(tag);
            pool.push(x, t);
        }
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        for _ in 0..10 {
            let (xa, _) = pool.draw(&mut rng_a).unwrap();
            let (xb, _) = pool.draw(&mut rng_b).unwrap();
            assert_eq!(tag_of(&xa), tag_of(&xb));
        }
    }

    #[test]
    fn test_draw_empty_is_none() {
        let pool = BootstrapBuffer::<TestBackend>::new(2);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(pool.draw(&mut rng).is_none());
    }

    #[test]
    fn test_draw_pairs_inputs_with_their_targets() {
        let mut pool = BootstrapBuffer::<TestBackend>::new(2);
        for tag in [5.0, 7.0] {
            let (x, t) = batch(tag);
            pool.push(x, t);
        }
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..8 {
            let (x, t) = pool.draw(&mut rng).unwrap();
            assert_eq!(tag_of(&x), -tag_of(&t), "input/target pairing broke");
        }
    }
}
