//! K-fold splitting.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, TrainerError};

/// A single train/validation partition of row indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Contiguous K-fold splitter. The first `n % k` folds hold one extra sample.
#[derive(Debug, Clone)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            seed: 0,
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(TrainerError::config(
                "kfold",
                format!("n_folds must be at least 2, got {}", self.n_splits),
            ));
        }
        if n_samples < self.n_splits {
            return Err(TrainerError::data(
                "kfold",
                format!(
                    "cannot split {} samples into {} folds",
                    n_samples, self.n_splits
                ),
            ));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();
            folds.push(Fold {
                train_indices,
                test_indices,
            });
            current += fold_size;
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_folds_cover_every_row_once() {
        let folds = KFold::new(3).split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test_indices.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(folds[0].test_indices, vec![0, 1, 2, 3]);
        assert_eq!(folds[1].train_indices, vec![0, 1, 2, 3, 7, 8, 9]);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn shuffled_folds_are_reproducible() {
        let a = KFold::new(3).with_shuffle(7).split(30).unwrap();
        let b = KFold::new(3).with_shuffle(7).split(30).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, KFold::new(3).split(30).unwrap());
    }

    #[test]
    fn too_few_samples() {
        let err = KFold::new(3).split(2).unwrap_err();
        assert!(matches!(err, TrainerError::Data { .. }));
        assert!(matches!(
            KFold::new(1).split(10).unwrap_err(),
            TrainerError::Configuration { .. }
        ));
    }
}
