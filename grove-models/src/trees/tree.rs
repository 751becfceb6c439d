use log::debug;
use rand::Rng;

use grove_core::model::sampler::FeatureSampler;
use grove_core::model::Observer;
use grove_core::{ModelError, Result};
use grove_data::dataset::all_indices;
use grove_data::{SampleMatrix, TrainingSet};

use super::base::FlatTree;
use super::builder::TreeBuilder;
use super::histogram::BinnedMatrix;
use super::node::Node;
use super::split::SplitFinder;
use crate::params::{FeatureSubset, SplitMode, TreeParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Row width a model accepts at prediction time
pub enum FeatureWidth {
    /// Trained in memory: rows must match the training width
    Exact(usize),
    /// Loaded from a stream: rows must reach every feature the splits test
    AtLeast(usize),
}

impl FeatureWidth {
    /// Checks a row width against this constraint
    pub fn check(&self, got: usize) -> Result<()> {
        let ok = match *self {
            FeatureWidth::Exact(n) => got == n,
            FeatureWidth::AtLeast(n) => got >= n,
        };
        if ok {
            return Ok(());
        }
        let expected = match *self {
            FeatureWidth::Exact(n) | FeatureWidth::AtLeast(n) => n,
        };
        Err(ModelError::DimensionMismatch {
            what: "feature count",
            expected: expected,
            got: got,
        })
    }
}

#[derive(Debug, Clone)]
/// A single classification tree: its settings, the grown node graph and,
/// optionally, the flattened copy used for prediction.
pub struct DecisionTree {
    params: TreeParams,
    root: Option<Node>,
    flat: Option<FlatTree>,
    n_classes: usize,
    width: FeatureWidth,
}

impl DecisionTree {
    /// Returns an unfitted tree
    pub fn new(params: TreeParams) -> Self {
        DecisionTree {
            params: params,
            root: None,
            flat: None,
            n_classes: 0,
            width: FeatureWidth::Exact(0),
        }
    }

    /// Wraps a node graph read back from a stream
    pub(crate) fn from_root(params: TreeParams, root: Option<Node>) -> Self {
        let n_classes = root.as_ref().map(|r| r.max_class() as usize + 1).unwrap_or(0);
        let width = FeatureWidth::AtLeast(root.as_ref().map(Node::required_features).unwrap_or(0));
        DecisionTree {
            params: params,
            root: root,
            flat: None,
            n_classes: n_classes,
            width: width,
        }
    }

    /// Trains on every row of `x`
    pub fn fit<R: Rng + ?Sized>(&mut self, x: &SampleMatrix, y: &[u32], rng: &mut R) -> Result<()> {
        self.fit_observed(x, y, None, rng, &mut ())
    }

    /// Trains on the rows listed in `indices`, duplicates included
    pub fn fit_indices<R: Rng + ?Sized>(
        &mut self,
        x: &SampleMatrix,
        y: &[u32],
        indices: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        self.fit_observed(x, y, Some(indices), rng, &mut ())
    }

    /// Trains while reporting counters to `observer`.  With `indices` unset
    /// every row is used.
    pub fn fit_observed<R, O>(
        &mut self,
        x: &SampleMatrix,
        y: &[u32],
        indices: Option<&[usize]>,
        rng: &mut R,
        observer: &mut O,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
        O: Observer,
    {
        self.params.validate()?;
        let data = TrainingSet::new(x, y)?;
        let owned;
        let indices = match indices {
            Some(indices) => {
                data.check_indices(indices)?;
                indices
            }
            None => {
                owned = all_indices(data.len());
                &owned[..]
            }
        };

        let bins = match self.params.split_mode {
            SplitMode::Histogram => Some(BinnedMatrix::new(x, self.params.max_bins)),
            SplitMode::Exact => None,
        };
        self.grow(data, bins.as_ref(), indices, rng, observer);
        Ok(())
    }

    /// Grows a new tree from validated inputs, replacing any previous one
    pub(crate) fn grow<R, O>(
        &mut self,
        data: TrainingSet,
        bins: Option<&BinnedMatrix>,
        indices: &[usize],
        rng: &mut R,
        observer: &mut O,
    ) where
        R: Rng + ?Sized,
        O: Observer,
    {
        let sampler = match self.params.feature_subset {
            FeatureSubset::All => FeatureSampler::all(data.n_features()),
            FeatureSubset::Sqrt => FeatureSampler::sqrt(data.n_features()),
        };
        debug!(
            "fitting tree on {} samples, {} features, {} classes ({:?}, {} candidate features)",
            indices.len(),
            data.n_features(),
            data.n_classes,
            self.params.split_mode,
            sampler.len()
        );

        let finder = SplitFinder::new(data, bins, sampler);
        let root = TreeBuilder::new(&self.params, data, finder, rng, observer).build(indices);
        debug!(
            "fitted tree with {} nodes, depth {}",
            root.n_nodes(),
            root.depth()
        );

        self.root = Some(root);
        self.flat = None;
        self.n_classes = data.n_classes;
        self.width = FeatureWidth::Exact(data.n_features());
    }

    /// Builds the flattened form; prediction uses it from now on
    pub fn flatten(&mut self) -> Result<()> {
        let root = self.root.as_ref().ok_or(ModelError::NotFitted)?;
        let flat = FlatTree::from_node(root);
        debug!("flattened tree into {} records", flat.len());
        self.flat = Some(flat);
        Ok(())
    }

    /// Drops the flattened form
    pub fn unflatten(&mut self) {
        self.flat = None;
    }

    /// True when prediction walks the flattened form
    pub fn is_flattened(&self) -> bool {
        self.flat.is_some()
    }

    /// True once a tree has been grown or loaded
    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    /// Settings this tree was grown with
    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// The node graph, if fitted
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// The flattened form, if built
    pub fn flat(&self) -> Option<&FlatTree> {
        self.flat.as_ref()
    }

    /// Number of classes seen at training time
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Row width accepted by `predict`
    pub fn feature_width(&self) -> FeatureWidth {
        self.width
    }

    /// Depth of the grown tree, 0 when unfitted
    pub fn depth(&self) -> usize {
        self.root.as_ref().map(Node::depth).unwrap_or(0)
    }

    /// Number of nodes, 0 when unfitted
    pub fn n_nodes(&self) -> usize {
        self.root.as_ref().map(Node::n_nodes).unwrap_or(0)
    }

    /// Number of leaves, 0 when unfitted
    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map(Node::n_leaves).unwrap_or(0)
    }

    #[inline]
    /// Predicts one row without checking its width
    pub(crate) fn predict_unchecked(&self, row: &[f64]) -> Result<u32> {
        match (&self.flat, &self.root) {
            (Some(flat), _) => Ok(flat.predict(row)),
            (None, Some(root)) => Ok(root.predict(row)),
            (None, None) => Err(ModelError::NotFitted),
        }
    }

    /// Predicts the class of one row
    pub fn predict_row(&self, row: &[f64]) -> Result<u32> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        self.width.check(row.len())?;
        self.predict_unchecked(row)
    }

    /// Predicts one class per row of `x`
    pub fn predict(&self, x: &SampleMatrix) -> Result<Vec<u32>> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        self.width.check(x.n_cols())?;
        x.rows().map(|row| self.predict_unchecked(row)).collect()
    }
}
