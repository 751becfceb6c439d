use log::info;
use rand::Rng;
use rayon::prelude::*;

use grove_core::impurity::majority_from_counts;
use grove_core::model::sampler::{bootstrap_indices, seeded, tree_seeds};
use grove_core::model::{Evaluator, Observer};
use grove_core::{ModelError, Result};
use grove_data::{SampleMatrix, TrainingSet};

use super::histogram::BinnedMatrix;
use super::tree::{DecisionTree, FeatureWidth};
use crate::params::{ForestParams, SplitMode};

#[derive(Debug, Clone)]
/// Bagged ensemble of decision trees predicting by majority vote.
///
/// Every tree is grown on its own bootstrap sample with its own generator,
/// seeded from the caller's generator before any tree is trained, so the
/// ensemble is the same whether trees are grown one after another or on the
/// rayon pool.
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_classes: usize,
    width: FeatureWidth,
}

impl RandomForest {
    /// Returns an unfitted forest
    pub fn new(params: ForestParams) -> Self {
        RandomForest {
            params: params,
            trees: Vec::new(),
            n_classes: 0,
            width: FeatureWidth::Exact(0),
        }
    }

    /// Wraps trees read back from a stream
    pub(crate) fn from_trees(params: ForestParams, trees: Vec<DecisionTree>) -> Self {
        let n_classes = trees.iter().map(DecisionTree::n_classes).max().unwrap_or(0);
        let required = trees
            .iter()
            .map(|t| match t.feature_width() {
                FeatureWidth::Exact(n) | FeatureWidth::AtLeast(n) => n,
            })
            .max()
            .unwrap_or(0);
        RandomForest {
            params: params,
            trees: trees,
            n_classes: n_classes,
            width: FeatureWidth::AtLeast(required),
        }
    }

    /// Trains `n_trees` trees on bootstrap samples of `x`
    pub fn fit<R: Rng + ?Sized>(&mut self, x: &SampleMatrix, y: &[u32], rng: &mut R) -> Result<()> {
        self.fit_observed(x, y, rng, &mut ())
    }

    /// Trains while collecting counters.  Each tree reports into a fresh
    /// observer which is merged into `observer` in tree order.
    pub fn fit_observed<R, O>(
        &mut self,
        x: &SampleMatrix,
        y: &[u32],
        rng: &mut R,
        observer: &mut O,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
        O: Observer + Default,
    {
        self.params.validate()?;
        let data = TrainingSet::new(x, y)?;

        // Bin boundaries depend only on the full matrix; share them
        let bins = match self.params.tree.split_mode {
            SplitMode::Histogram => Some(BinnedMatrix::new(x, self.params.tree.max_bins)),
            SplitMode::Exact => None,
        };
        let seeds = tree_seeds(self.params.n_trees, rng);
        info!(
            "training {} trees on {} samples ({} features, parallel: {})",
            seeds.len(),
            data.len(),
            data.n_features(),
            self.params.parallel
        );

        let params = &self.params;
        let grow_one = |seed: u64| -> (DecisionTree, O) {
            let mut prng = seeded(seed);
            let mut indices = bootstrap_indices(data.len(), &mut prng);
            indices.sort_unstable();

            let mut tree = DecisionTree::new(params.tree.clone());
            let mut stats = O::default();
            tree.grow(data, bins.as_ref(), &indices, &mut prng, &mut stats);
            (tree, stats)
        };
        let grown: Vec<(DecisionTree, O)> = if params.parallel {
            seeds.into_par_iter().map(grow_one).collect()
        } else {
            seeds.into_iter().map(grow_one).collect()
        };

        let mut trees = Vec::with_capacity(grown.len());
        for (tree, stats) in grown {
            observer.merge(stats);
            trees.push(tree);
        }
        info!(
            "trained forest: {} trees, {} nodes",
            trees.len(),
            trees.iter().map(DecisionTree::n_nodes).sum::<usize>()
        );

        self.trees = trees;
        self.n_classes = data.n_classes;
        self.width = FeatureWidth::Exact(data.n_features());
        Ok(())
    }

    /// Flattens every tree
    pub fn flatten(&mut self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        for tree in self.trees.iter_mut() {
            tree.flatten()?;
        }
        Ok(())
    }

    /// Settings the forest was built with
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// The ensemble members
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Number of trained trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of classes seen at training time
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// True once trees have been trained or loaded
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Row width accepted by `predict`
    pub fn feature_width(&self) -> FeatureWidth {
        self.width
    }

    fn vote(&self, row: &[f64], votes: &mut [usize]) -> Result<u32> {
        for v in votes.iter_mut() {
            *v = 0;
        }
        for tree in self.trees.iter() {
            votes[tree.predict_unchecked(row)? as usize] += 1;
        }
        majority_from_counts(votes).ok_or(ModelError::NotFitted)
    }

    /// Predicts the class of one row
    pub fn predict_row(&self, row: &[f64]) -> Result<u32> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        self.width.check(row.len())?;
        let mut votes = vec![0; self.n_classes];
        self.vote(row, &mut votes)
    }

    /// Predicts one class per row of `x`
    pub fn predict(&self, x: &SampleMatrix) -> Result<Vec<u32>> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        self.width.check(x.n_cols())?;

        if self.params.parallel {
            return (0..x.n_rows())
                .into_par_iter()
                .map(|i| {
                    let mut votes = vec![0; self.n_classes];
                    self.vote(x.row(i), &mut votes)
                })
                .collect();
        }

        // Trees outer, rows inner: each tree stays hot while it scores the batch
        let k = self.n_classes;
        let mut votes = vec![0usize; x.n_rows() * k];
        for tree in self.trees.iter() {
            for (i, row) in x.rows().enumerate() {
                votes[i * k + tree.predict_unchecked(row)? as usize] += 1;
            }
        }
        (0..x.n_rows())
            .map(|i| majority_from_counts(&votes[i * k..(i + 1) * k]).ok_or(ModelError::NotFitted))
            .collect()
    }
}

/// Infallible scoring for callers that hold a fitted forest.  An unfitted
/// forest has no votes and scores every row as class 0; use `predict_row`
/// to get `NotFitted` instead.  Rows must be wide enough for every tree.
impl Evaluator<[f64], u32> for RandomForest {
    fn evaluate(&self, payload: &[f64]) -> u32 {
        let mut votes = vec![0; self.n_classes];
        self.vote(payload, &mut votes).unwrap_or(0)
    }
}
