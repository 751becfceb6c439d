use log::trace;
use rand::Rng;

use grove_core::impurity::ClassCounts;
use grove_core::model::Observer;
use grove_data::TrainingSet;

use super::node::Node;
use super::split::SplitFinder;
use crate::params::TreeParams;

/// Grows one tree by recursive splitting.
///
/// A node becomes a leaf holding the majority class when it is at
/// `max_depth`, is reached by fewer than `min_samples_split` samples, is pure,
/// or when the split finder has no split with positive gain.  Accepted splits
/// always leave both children non-empty, so every recursive call works on a
/// strictly smaller index set.
pub struct TreeBuilder<'a, 'b, R: ?Sized, O> {
    params: &'b TreeParams,
    data: TrainingSet<'a>,
    finder: SplitFinder<'a>,
    rng: &'b mut R,
    observer: &'b mut O,
}

impl<'a, 'b, R, O> TreeBuilder<'a, 'b, R, O>
where
    R: Rng + ?Sized,
    O: Observer,
{
    /// Returns a builder drawing feature subsets from `rng`
    pub fn new(
        params: &'b TreeParams,
        data: TrainingSet<'a>,
        finder: SplitFinder<'a>,
        rng: &'b mut R,
        observer: &'b mut O,
    ) -> Self {
        TreeBuilder {
            params: params,
            data: data,
            finder: finder,
            rng: rng,
            observer: observer,
        }
    }

    /// Grows the tree over `indices`, which must be non-empty and in range
    pub fn build(mut self, indices: &[usize]) -> Node {
        self.grow(indices, 0)
    }

    fn grow(&mut self, indices: &[usize], depth: usize) -> Node {
        self.observer.record("nodes", 1);
        let counts = ClassCounts::from_indices(self.data.y, indices, self.data.n_classes);
        let majority = counts.majority().unwrap_or(0);

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || counts.is_pure()
        {
            return self.leaf(majority);
        }

        let split = match self
            .finder
            .find(indices, &counts, &mut *self.rng, &mut *self.observer)
        {
            Some(split) => split,
            None => {
                self.observer.record("rejected_splits", 1);
                return self.leaf(majority);
            }
        };

        trace!(
            "depth {}: split {} samples on feature {} at {} (gain {:.6})",
            depth,
            indices.len(),
            split.feature,
            split.threshold,
            split.gain
        );

        let left = self.grow(&split.left, depth + 1);
        let right = self.grow(&split.right, depth + 1);
        Node::internal(split.feature, split.threshold, majority, left, right)
    }

    fn leaf(&mut self, class: u32) -> Node {
        self.observer.record("leaves", 1);
        Node::leaf(class)
    }
}
