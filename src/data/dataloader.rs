use ndarray::Axis;
use rand::{seq::SliceRandom, Rng};

use super::dataset::{Batch, Dataset};

/// Lazy, restartable producer of mini-batches over a dataset.
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> DataLoader<'a> {
    /// # Panics
    /// If `batch_size` is zero.
    pub fn new(dataset: &'a Dataset, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");

        Self {
            dataset,
            order: (0..dataset.len()).collect(),
            batch_size,
            cursor: 0,
        }
    }

    /// Reshuffles the visiting order and restarts the loader.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
        self.cursor = 0;
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Returns the amount of batches in a full pass.
    #[inline]
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Returns the next batch, or None if the pass is exhausted.
    pub fn next_batch(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let idx = &self.order[self.cursor..end];
        self.cursor = end;

        let xs = self.dataset.features().select(Axis(0), idx);
        let ys = idx.iter().map(|&i| self.dataset.labels()[i]).collect();
        Some(Batch { xs, ys })
    }
}

impl Iterator for DataLoader<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}
