//! Hyperparameters for trees and forests.  Both parameter sets can be read
//! from JSON; missing fields take their defaults.
use std::io::Read;

use grove_core::{ModelError, Result};

/// Largest number of bin boundaries per feature in histogram mode.  Bins are
/// addressed with a `u8`.
pub const MAX_BINS: usize = 255;

/// Deepest tree accepted by `fit` and by the model loader.  Growing,
/// predicting and decoding recurse once per level.
pub const MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// How thresholds are searched
pub enum SplitMode {
    /// Sort each candidate feature and scan every distinct value
    Exact,
    /// Scan precomputed quantile bins
    Histogram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Which features are candidates at each node
pub enum FeatureSubset {
    /// Every feature, in index order
    All,
    /// A fresh random subset of `max(1, round(sqrt(n_features)))` per node
    Sqrt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Settings for growing one decision tree
pub struct TreeParams {
    /// Nodes at this depth become leaves.  The root is at depth 0.
    pub max_depth: usize,

    /// Nodes reached by fewer samples become leaves
    pub min_samples_split: usize,

    /// Exact or histogram split search
    pub split_mode: SplitMode,

    /// Bin boundaries per feature in histogram mode
    pub max_bins: usize,

    /// Full feature scan or random feature subset
    pub feature_subset: FeatureSubset,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 5,
            min_samples_split: 2,
            split_mode: SplitMode::Exact,
            max_bins: MAX_BINS,
            feature_subset: FeatureSubset::All,
        }
    }
}

/// Checks that a value fits the 4-byte integer fields of the model format
fn check_header_field(name: &str, value: usize) -> Result<()> {
    if value > i32::max_value() as usize {
        return Err(ModelError::InvalidParams(format!(
            "{} = {} does not fit in a 32-bit field",
            name, value
        )));
    }
    Ok(())
}

impl TreeParams {
    /// Validates the settings
    pub fn validate(&self) -> Result<()> {
        if self.max_depth > MAX_DEPTH {
            return Err(ModelError::InvalidParams(format!(
                "max_depth must be at most {}, got {}",
                MAX_DEPTH, self.max_depth
            )));
        }
        check_header_field("min_samples_split", self.min_samples_split)?;
        if self.max_bins < 2 || self.max_bins > MAX_BINS {
            return Err(ModelError::InvalidParams(format!(
                "max_bins must be in [2, {}], got {}",
                MAX_BINS, self.max_bins
            )));
        }
        Ok(())
    }

    /// Reads and validates parameters from JSON
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let params: TreeParams = serde_json::from_reader(reader)
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Settings for a random forest
pub struct ForestParams {
    /// Number of trees
    pub n_trees: usize,

    /// Settings shared by every tree
    pub tree: TreeParams,

    /// Train trees and score rows on the rayon pool
    pub parallel: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 50,
            tree: TreeParams {
                max_depth: 8,
                min_samples_split: 5,
                feature_subset: FeatureSubset::Sqrt,
                ..TreeParams::default()
            },
            parallel: false,
        }
    }
}

impl ForestParams {
    /// Validates the settings
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(ModelError::InvalidParams("n_trees must be at least 1".into()));
        }
        check_header_field("n_trees", self.n_trees)?;
        self.tree.validate()
    }

    /// Reads and validates parameters from JSON
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let params: ForestParams = serde_json::from_reader(reader)
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod params_tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TreeParams::default().validate().is_ok());
        assert!(ForestParams::default().validate().is_ok());
        assert_eq!(ForestParams::default().tree.feature_subset, FeatureSubset::Sqrt);
    }

    #[test]
    fn test_json_partial() {
        let json = r#"{"n_trees": 3, "tree": {"max_depth": 4, "split_mode": "Histogram"}}"#;
        let params = ForestParams::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(params.n_trees, 3);
        assert_eq!(params.tree.max_depth, 4);
        assert_eq!(params.tree.split_mode, SplitMode::Histogram);
        // Untouched fields fall back to TreeParams defaults
        assert_eq!(params.tree.min_samples_split, 2);
        assert!(!params.parallel);
    }

    #[test]
    fn test_invalid() {
        let mut params = TreeParams::default();
        params.max_bins = 1;
        assert!(matches!(params.validate(), Err(ModelError::InvalidParams(_))));
        params.max_bins = 256;
        assert!(params.validate().is_err());

        let mut forest = ForestParams::default();
        forest.n_trees = 0;
        assert!(forest.validate().is_err());

        assert!(TreeParams::from_json_reader("{\"max_depth\": -1}".as_bytes()).is_err());
        assert!(TreeParams::from_json_reader("not json".as_bytes()).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut params = TreeParams::default();
        params.max_depth = 0;
        assert!(params.validate().is_ok());
        params.max_depth = MAX_DEPTH;
        assert!(params.validate().is_ok());
        params.max_depth = MAX_DEPTH + 1;
        assert!(matches!(params.validate(), Err(ModelError::InvalidParams(_))));
        params.max_depth = 100_000;
        assert!(params.validate().is_err());

        let mut forest = ForestParams::default();
        forest.tree.max_depth = MAX_DEPTH + 1;
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let params = ForestParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back = ForestParams::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(params, back);
    }
}
