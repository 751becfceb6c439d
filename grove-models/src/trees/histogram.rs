use float_ord::FloatOrd;
use log::debug;

use grove_data::SampleMatrix;

#[derive(Debug, Clone, PartialEq)]
/// Per-feature quantile bin boundaries.  A value's bin is the index of the
/// first boundary greater than or equal to it; the last boundary of every
/// feature is that feature's training maximum.
pub struct BinThresholds(Vec<Vec<f64>>);

impl BinThresholds {
    /// Computes the boundaries for every column with at most `max_bins`
    /// boundaries per feature
    pub fn new(x: &SampleMatrix, max_bins: usize) -> Self {
        BinThresholds(
            (0..x.n_cols())
                .map(|f| boundaries(x.column(f), max_bins))
                .collect(),
        )
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.0.len()
    }

    /// Boundaries of one feature, ascending and distinct
    pub fn feature(&self, f: usize) -> &[f64] {
        &self.0[f]
    }

    #[inline]
    /// Bin of `value` for feature `f`.  Values above the training maximum map
    /// past the last bin.
    pub fn bin(&self, f: usize, value: f64) -> usize {
        let bounds = &self.0[f];
        bounds.partition_point(|&b| b < value)
    }
}

/// Boundaries for one column.  With few distinct values every distinct value
/// is a boundary; otherwise `max_bins - 1` rank-spaced quantiles plus the max.
fn boundaries(column: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<FloatOrd<f64>> = column.iter().map(|&v| FloatOrd(v)).collect();
    sorted.sort_unstable();

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() <= max_bins {
        return distinct.into_iter().map(|v| v.0).collect();
    }

    let n = sorted.len();
    let max = sorted[n - 1];
    let mut bounds: Vec<FloatOrd<f64>> = Vec::with_capacity(max_bins);
    for k in 1..max_bins {
        let candidate = sorted[k * n / max_bins];
        if candidate < max && bounds.last().map_or(true, |&last| last < candidate) {
            bounds.push(candidate);
        }
    }
    bounds.push(max);
    bounds.into_iter().map(|v| v.0).collect()
}

#[derive(Debug, Clone)]
/// Training matrix discretized once per fit: one `u8` bin per sample and
/// feature, stored column-major next to the boundaries that produced it.
pub struct BinnedMatrix {
    n_rows: usize,
    bins: Vec<u8>,
    thresholds: BinThresholds,
}

impl BinnedMatrix {
    /// Discretizes every value of `x`
    pub fn new(x: &SampleMatrix, max_bins: usize) -> Self {
        let thresholds = BinThresholds::new(x, max_bins);
        let n_rows = x.n_rows();
        let mut bins = Vec::with_capacity(n_rows * x.n_cols());
        for f in 0..x.n_cols() {
            let bounds = thresholds.feature(f);
            for &v in x.column(f) {
                // Every training value is at most the last boundary
                let bin = bounds.partition_point(|&b| b < v).min(bounds.len() - 1);
                bins.push(bin as u8);
            }
        }
        debug!(
            "discretized {} features x {} samples, widest feature has {} bins",
            x.n_cols(),
            n_rows,
            (0..x.n_cols())
                .map(|f| thresholds.feature(f).len())
                .max()
                .unwrap_or(0)
        );
        BinnedMatrix {
            n_rows: n_rows,
            bins: bins,
            thresholds: thresholds,
        }
    }

    #[inline]
    /// Bins of one feature for every sample
    pub fn column(&self, f: usize) -> &[u8] {
        &self.bins[f * self.n_rows..(f + 1) * self.n_rows]
    }

    #[inline]
    /// Number of bins of feature `f`
    pub fn n_bins(&self, f: usize) -> usize {
        self.thresholds.feature(f).len()
    }

    #[inline]
    /// Upper boundary of `bin`, the threshold of a split after that bin
    pub fn threshold(&self, f: usize, bin: usize) -> f64 {
        self.thresholds.feature(f)[bin]
    }

    /// The boundaries used for discretization
    pub fn thresholds(&self) -> &BinThresholds {
        &self.thresholds
    }
}
