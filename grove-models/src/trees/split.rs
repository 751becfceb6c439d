//! Split Finder
//! ---
//!
//! Finds the best `(feature, threshold)` for the samples reaching a node.
//! Two orthogonal settings drive the search: the threshold source (exact
//! sorted scan, or a scan over precomputed bins) and the candidate features
//! (all of them, or a random subset re-drawn per node).
//!
//! Both scans move samples from the right side to the left side in
//! increasing feature order while keeping per-class counts and the running
//! sum of squared counts for each side, so each candidate's weighted Gini is
//! O(1).  The first candidate with the strictly best gain wins.
use float_ord::FloatOrd;
use rand::Rng;

use grove_core::impurity::{gini_from_sum_of_squares, ClassCounts};
use grove_core::model::sampler::FeatureSampler;
use grove_core::model::Observer;
use grove_data::{IndexSet, TrainingSet};

use super::histogram::BinnedMatrix;

/// Gains at or below this are rounding noise, not an improvement
pub const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
/// An accepted split and the partition it induces
pub struct Split {
    /// Column to test
    pub feature: usize,
    /// Samples with `value <= threshold` go left
    pub threshold: f64,
    /// Reduction in weighted Gini impurity
    pub gain: f64,
    /// Rows sent left, in their original order
    pub left: IndexSet,
    /// Rows sent right, in their original order
    pub right: IndexSet,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    /// Winning bin in histogram mode; partitions by bin, never by re-matching
    /// the threshold
    bin: Option<u8>,
}

/// Running left/right class statistics for one linear scan
struct Scan {
    left: Vec<u64>,
    right: Vec<u64>,
    left_sq: u64,
    right_sq: u64,
    n_left: usize,
    n_right: usize,
    n: usize,
    parent_gini: f64,
}

impl Scan {
    fn new(parent: &ClassCounts) -> Self {
        let right: Vec<u64> = parent.as_slice().iter().map(|&c| c as u64).collect();
        let right_sq = right.iter().map(|&c| c * c).sum();
        Scan {
            left: vec![0; right.len()],
            right: right,
            left_sq: 0,
            right_sq: right_sq,
            n_left: 0,
            n_right: parent.total(),
            n: parent.total(),
            parent_gini: parent.gini(),
        }
    }

    fn reset(&mut self, parent: &ClassCounts) {
        for (l, (r, &p)) in self
            .left
            .iter_mut()
            .zip(self.right.iter_mut().zip(parent.as_slice()))
        {
            *l = 0;
            *r = p as u64;
        }
        self.left_sq = 0;
        self.right_sq = self.right.iter().map(|&c| c * c).sum();
        self.n_left = 0;
        self.n_right = self.n;
    }

    #[inline]
    /// Moves `k` samples of `class` from the right side to the left side
    fn shift(&mut self, class: usize, k: u64) {
        let l = self.left[class];
        let r = self.right[class];
        // (c + k)² - c² = 2ck + k²  and  c² - (c - k)² = 2ck - k²
        self.left_sq += 2 * l * k + k * k;
        self.right_sq -= 2 * r * k - k * k;
        self.left[class] = l + k;
        self.right[class] = r - k;
        self.n_left += k as usize;
        self.n_right -= k as usize;
    }

    #[inline]
    fn gain(&self) -> f64 {
        let n = self.n as f64;
        let gini_left = gini_from_sum_of_squares(self.left_sq as f64, self.n_left);
        let gini_right = gini_from_sum_of_squares(self.right_sq as f64, self.n_right);
        self.parent_gini
            - (self.n_left as f64 / n) * gini_left
            - (self.n_right as f64 / n) * gini_right
    }
}

/// Reusable split search over one training set
pub struct SplitFinder<'a> {
    data: TrainingSet<'a>,
    bins: Option<&'a BinnedMatrix>,
    sampler: FeatureSampler,

    // Scratch reused across nodes
    entries: Vec<(FloatOrd<f64>, u32)>,
    histogram: Vec<u64>,
}

impl<'a> SplitFinder<'a> {
    /// Exact search when `bins` is `None`, histogram search otherwise
    pub fn new(
        data: TrainingSet<'a>,
        bins: Option<&'a BinnedMatrix>,
        sampler: FeatureSampler,
    ) -> Self {
        SplitFinder {
            data: data,
            bins: bins,
            sampler: sampler,
            entries: Vec::new(),
            histogram: Vec::new(),
        }
    }

    /// Searches the best split for `indices`, whose class counts are `parent`.
    /// Returns `None` when no candidate has positive gain.
    pub fn find<R, O>(
        &mut self,
        indices: &[usize],
        parent: &ClassCounts,
        rng: &mut R,
        observer: &mut O,
    ) -> Option<Split>
    where
        R: Rng + ?Sized,
        O: Observer,
    {
        if indices.len() < 2 {
            return None;
        }
        observer.record("split_searches", 1);

        let mut scan = Scan::new(parent);
        let mut best: Option<Candidate> = None;
        let mut best_gain = MIN_GAIN;

        // Split the borrows so the drawn features can be read while scratch
        // buffers are written
        let SplitFinder {
            data,
            bins,
            sampler,
            entries,
            histogram,
        } = self;
        let features = sampler.draw(rng);
        observer.record("features_scanned", features.len() as u64);

        for &f in features {
            scan.reset(parent);
            let found = match bins {
                None => scan_exact(data, f, indices, entries, &mut scan, best_gain),
                Some(binned) => {
                    scan_histogram(data, binned, f, indices, histogram, &mut scan, best_gain)
                }
            };
            if let Some(candidate) = found {
                best_gain = candidate.gain;
                best = Some(candidate);
            }
        }

        let best = best?;
        let (left, right) = self.partition(indices, &best);
        if left.is_empty() || right.is_empty() {
            return None;
        }
        Some(Split {
            feature: best.feature,
            threshold: best.threshold,
            gain: best.gain,
            left: left,
            right: right,
        })
    }

    fn partition(&self, indices: &[usize], best: &Candidate) -> (IndexSet, IndexSet) {
        let mut left = Vec::with_capacity(indices.len());
        let mut right = Vec::with_capacity(indices.len());
        match (best.bin, self.bins) {
            (Some(bin), Some(binned)) => {
                let column = binned.column(best.feature);
                for &i in indices {
                    if column[i] <= bin {
                        left.push(i);
                    } else {
                        right.push(i);
                    }
                }
            }
            _ => {
                let column = self.data.x.column(best.feature);
                for &i in indices {
                    if column[i] <= best.threshold {
                        left.push(i);
                    } else {
                        right.push(i);
                    }
                }
            }
        }
        (left, right)
    }
}

/// Sorted scan over one feature.  Returns a candidate only if it beats
/// `best_gain`.
fn scan_exact(
    data: &TrainingSet,
    f: usize,
    indices: &[usize],
    entries: &mut Vec<(FloatOrd<f64>, u32)>,
    scan: &mut Scan,
    mut best_gain: f64,
) -> Option<Candidate> {
    let column = data.x.column(f);
    entries.clear();
    entries.extend(indices.iter().map(|&i| (FloatOrd(column[i]), data.y[i])));
    entries.sort_unstable_by_key(|e| e.0);

    let mut best = None;
    for k in 0..entries.len() - 1 {
        scan.shift(entries[k].1 as usize, 1);

        // No threshold separates equal values
        let (lo, hi) = (entries[k].0, entries[k + 1].0);
        if lo == hi {
            continue;
        }

        let gain = scan.gain();
        if gain > best_gain {
            best_gain = gain;
            best = Some(Candidate {
                feature: f,
                threshold: midpoint(lo.0, hi.0),
                gain: gain,
                bin: None,
            });
        }
    }
    best
}

/// Halfway between two distinct values, falling back to the lower one when
/// the midpoint rounds up to the upper value
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) * 0.5;
    if mid < hi {
        mid
    } else {
        lo
    }
}

/// Bin-count scan over one feature.  Returns a candidate only if it beats
/// `best_gain`.
fn scan_histogram(
    data: &TrainingSet,
    binned: &BinnedMatrix,
    f: usize,
    indices: &[usize],
    histogram: &mut Vec<u64>,
    scan: &mut Scan,
    mut best_gain: f64,
) -> Option<Candidate> {
    let n_classes = data.n_classes;
    let n_bins = binned.n_bins(f);
    let column = binned.column(f);

    histogram.clear();
    histogram.resize(n_bins * n_classes, 0);
    for &i in indices {
        histogram[column[i] as usize * n_classes + data.y[i] as usize] += 1;
    }

    let mut best = None;
    for bin in 0..n_bins {
        let counts = &histogram[bin * n_classes..(bin + 1) * n_classes];
        let mut moved = 0;
        for (class, &k) in counts.iter().enumerate() {
            if k > 0 {
                scan.shift(class, k);
                moved += k;
            }
        }
        if moved == 0 {
            continue;
        }
        if scan.n_right == 0 {
            break;
        }

        let gain = scan.gain();
        if gain > best_gain {
            best_gain = gain;
            best = Some(Candidate {
                feature: f,
                threshold: binned.threshold(f, bin),
                gain: gain,
                bin: Some(bin as u8),
            });
        }
    }
    best
}
