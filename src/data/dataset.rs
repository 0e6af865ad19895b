use ndarray::{Array2, ArrayView2, Axis};

/// An in-memory supervised classification dataset.
///
/// Row `i` of `features` is the input of the `i`-th sample and `labels[i]` its class.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Vec<usize>,
    num_classes: usize,
}

impl Dataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Panics
    /// - if `features.nrows() != labels.len()`
    /// - if any label is not lower than `num_classes`
    pub fn new(features: Array2<f32>, labels: Vec<usize>, num_classes: usize) -> Self {
        assert_eq!(
            features.nrows(),
            labels.len(),
            "features and labels must have the same amount of samples"
        );
        assert!(
            labels.iter().all(|&y| y < num_classes),
            "labels must be lower than num_classes"
        );

        Self {
            features,
            labels,
            num_classes,
        }
    }

    /// Creates an empty dataset with the given input width.
    pub fn empty(num_features: usize, num_classes: usize) -> Self {
        Self {
            features: Array2::zeros((0, num_features)),
            labels: Vec::new(),
            num_classes,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    #[inline]
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    #[inline]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Copies the given rows into a new dataset, keeping their order.
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            num_classes: self.num_classes,
        }
    }
}

/// An owned mini-batch of samples.
#[derive(Debug, Clone)]
pub struct Batch {
    pub xs: Array2<f32>,
    pub ys: Vec<usize>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.ys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }
}
