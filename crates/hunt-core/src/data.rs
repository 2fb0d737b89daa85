//! Test-set loading and preprocessing.
//!
//! Each named test set is a JSONL file: one JSON array of `2 * dim`
//! nonnegative floats per line, the two halves of a distribution pair
//! concatenated. Preprocessing normalizes each half, mixes in the dust
//! floor, and renormalizes, so downstream code can rely on strictly
//! positive cells summing to one.

use std::io::BufRead;
use std::path::Path;

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;

/// Load raw pair rows from a JSONL file, validating shape and finiteness.
pub fn load_test_set(path: &Path, dim: usize) -> anyhow::Result<Vec<Vec<f64>>> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("failed to open test set {}: {e}", path.display()))?;
    let reader = std::io::BufReader::new(file);

    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Vec<f64> = serde_json::from_str(&line).map_err(|e| {
            anyhow::anyhow!("{}:{}: malformed row: {e}", path.display(), line_no + 1)
        })?;
        if row.len() != 2 * dim {
            anyhow::bail!(
                "{}:{}: row has {} entries, expected {}",
                path.display(),
                line_no + 1,
                row.len(),
                2 * dim
            );
        }
        if row.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            anyhow::bail!(
                "{}:{}: row contains negative or non-finite mass",
                path.display(),
                line_no + 1
            );
        }
        rows.push(row);
    }
    if rows.is_empty() {
        anyhow::bail!("test set {} is empty", path.display());
    }
    Ok(rows)
}

/// Normalize each half to unit mass, add the dust floor, renormalize.
pub fn preprocess(rows: Vec<Vec<f64>>, dust_const: f64) -> anyhow::Result<Vec<Vec<f32>>> {
    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        let dim = row.len() / 2;
        let mut processed = Vec::with_capacity(row.len());
        for half in [&row[..dim], &row[dim..]] {
            let sum: f64 = half.iter().sum();
            if sum <= 0.0 {
                anyhow::bail!("row {idx}: a distribution half has zero total mass");
            }
            let scale = 1.0 + dust_const * dim as f64;
            processed.extend(
                half.iter()
                    .map(|&x| ((x / sum + dust_const) / scale) as f32),
            );
        }
        out.push(processed);
    }
    Ok(out)
}

/// Draw `n_test` distinct rows with the run's seeded RNG.
pub fn sample_rows(
    rows: Vec<Vec<f32>>,
    n_test: usize,
    rng: &mut impl Rng,
) -> anyhow::Result<Vec<Vec<f32>>> {
    if rows.len() < n_test {
        anyhow::bail!(
            "test set has {} rows, fewer than the requested {n_test}",
            rows.len()
        );
    }
    let picked = rand::seq::index::sample(rng, rows.len(), n_test);
    Ok(picked.into_iter().map(|i| rows[i].clone()).collect())
}

/// Stack rows into a `(n, 2 * dim)` tensor on the target device.
///
/// # Panics
/// Panics on an empty slice or inconsistent row widths.
pub fn to_tensor<B: Backend>(rows: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
    assert!(!rows.is_empty(), "rows must not be empty");
    let width = rows[0].len();
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(
            row.len(),
            width,
            "row {i} has width {}, expected {width}",
            row.len()
        );
    }
    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::from_data(TensorData::new(flat, [rows.len(), width]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_load_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.jsonl");
        std::fs::write(
            &path,
            "[0.4, 0.3, 0.2, 0.1, 0.1, 0.2, 0.3, 0.4]\n\n[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]\n",
        )
        .unwrap();

        let rows = load_test_set(&path, 4).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 8);
    }

    #[test]
    fn test_load_rejects_bad_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "[0.5, 0.5]\n").unwrap();
        assert!(load_test_set(&path, 4).is_err());
    }

    #[test]
    fn test_load_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        assert!(load_test_set(&path, 4).is_err());
    }

    #[test]
    fn test_load_rejects_negative_mass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "[0.5, -0.5, 0.5, 0.5, 0.25, 0.25, 0.25, 0.25]\n").unwrap();
        assert!(load_test_set(&path, 2).is_err());
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(load_test_set(&path, 4).is_err());
    }

    #[test]
    fn test_preprocess_normalizes_with_dust() {
        let rows = vec![vec![2.0, 6.0, 1.0, 3.0]];
        let dust = 1e-4;
        let out = preprocess(rows, dust).unwrap();
        let row = &out[0];

        for half in [&row[..2], &row[2..]] {
            let sum: f32 = half.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "half sums to {sum}");
            assert!(half.iter().all(|&x| x > 0.0));
        }
        // Ratios within a half survive normalization: 6/2 = 3 (up to dust).
        assert!((row[1] / row[0] - 3.0).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_rejects_zero_half() {
        let rows = vec![vec![0.0, 0.0, 1.0, 1.0]];
        assert!(preprocess(rows, 1e-6).is_err());
    }

    #[test]
    fn test_sample_rows_seeded_and_bounded() {
        let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32]).collect();
        let mut rng_a = StdRng::seed_from_u64(5);
        let mut rng_b = StdRng::seed_from_u64(5);
        let a = sample_rows(rows.clone(), 4, &mut rng_a).unwrap();
        let b = sample_rows(rows.clone(), 4, &mut rng_b).unwrap();
        assert_eq!(a, b, "same seed must draw the same rows");
        assert_eq!(a.len(), 4);

        assert!(sample_rows(rows, 11, &mut rng_a).is_err());
    }

    #[test]
    fn test_to_tensor_shape() {
        let rows = vec![vec![0.1f32, 0.9], vec![0.5, 0.5], vec![0.3, 0.7]];
        let t = to_tensor::<TestBackend>(&rows, &Default::default());
        assert_eq!(t.dims(), [3, 2]);
        let data: Vec<f32> = t.into_data().to_vec().unwrap();
        assert_eq!(data, vec![0.1, 0.9, 0.5, 0.5, 0.3, 0.7]);
    }
}
