use std::collections::{btree_map, BTreeMap};

use serde::{Deserialize, Serialize};

use super::{ParamsErr, Result, Tensor};

/// An ordered mapping from parameter name to tensor, the unit exchanged between the
/// orchestrator and the participants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    tensors: BTreeMap<String, Tensor>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tensor, returning the previous one under the same name if any.
    pub fn insert(&mut self, key: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(key.into(), tensor)
    }

    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.tensors.get(key)
    }

    /// Same as `get` but a missing key is an error.
    pub fn require(&self, key: &str) -> Result<&Tensor> {
        self.tensors.get(key).ok_or_else(|| ParamsErr::MissingKey {
            key: key.to_string(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Tensor> {
        self.tensors.iter()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Returns the total amount of scalar parameters across every tensor.
    pub fn num_params(&self) -> usize {
        self.tensors.values().map(Tensor::len).sum()
    }

    /// Checks that `self` has exactly the same keys as `expected` and that every tensor
    /// has the same shape.
    ///
    /// # Arguments
    /// * `expected` - The reference parameter set.
    ///
    /// # Returns
    /// The first mismatch found, walking keys in order.
    pub fn check_compatible(&self, expected: &ParameterSet) -> Result<()> {
        for (key, tensor) in &expected.tensors {
            let Some(own) = self.tensors.get(key) else {
                return Err(ParamsErr::MissingKey { key: key.clone() });
            };

            if own.shape() != tensor.shape() {
                return Err(ParamsErr::ShapeMismatch {
                    key: key.clone(),
                    got: own.shape().to_vec(),
                    expected: tensor.shape().to_vec(),
                });
            }
        }

        if let Some(key) = self.keys().find(|k| !expected.tensors.contains_key(*k)) {
            return Err(ParamsErr::UnexpectedKey {
                key: key.to_string(),
            });
        }

        Ok(())
    }
}

impl FromIterator<(String, Tensor)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (String, Tensor)>>(iter: T) -> Self {
        Self {
            tensors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, Tensor);
    type IntoIter = btree_map::IntoIter<String, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tensors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a Tensor);
    type IntoIter = btree_map::Iter<'a, String, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tensors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, Vec<usize>)]) -> ParameterSet {
        entries
            .iter()
            .map(|(k, shape)| (k.to_string(), Tensor::zeros(shape.clone())))
            .collect()
    }

    #[test]
    fn compatible_sets() {
        let a = params(&[("w", vec![2, 3]), ("b", vec![3])]);
        let b = params(&[("b", vec![3]), ("w", vec![2, 3])]);
        assert!(a.check_compatible(&b).is_ok());
        assert_eq!(a.num_params(), 9);
    }

    #[test]
    fn detects_missing_and_unexpected_keys() {
        let global = params(&[("w", vec![2]), ("b", vec![1])]);

        let missing = params(&[("w", vec![2])]);
        assert_eq!(
            missing.check_compatible(&global),
            Err(ParamsErr::MissingKey { key: "b".into() })
        );

        let extra = params(&[("w", vec![2]), ("b", vec![1]), ("z", vec![1])]);
        assert_eq!(
            extra.check_compatible(&global),
            Err(ParamsErr::UnexpectedKey { key: "z".into() })
        );
    }

    #[test]
    fn detects_shape_mismatch() {
        let global = params(&[("w", vec![2, 2])]);
        let other = params(&[("w", vec![4])]);

        assert_eq!(
            other.check_compatible(&global),
            Err(ParamsErr::ShapeMismatch {
                key: "w".into(),
                got: vec![4],
                expected: vec![2, 2],
            })
        );
    }
}
