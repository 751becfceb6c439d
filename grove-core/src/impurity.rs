//! Impurity & Majority
//! ---
//!
//! Gini impurity and majority class over label multisets.  Counting is always
//! done in ascending class id order, so the majority tie-break is
//! deterministic: among the classes with the highest count, the lowest class
//! id wins.

/// Dense per-class counts for one label multiset
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCounts {
    counts: Vec<usize>,
    total: usize,
}

impl ClassCounts {
    /// Zero counts for `n_classes` classes
    pub fn new(n_classes: usize) -> Self {
        ClassCounts {
            counts: vec![0; n_classes],
            total: 0,
        }
    }

    /// Counts the labels selected by `indices`
    pub fn from_indices(labels: &[u32], indices: &[usize], n_classes: usize) -> Self {
        let mut counts = ClassCounts::new(n_classes);
        for &idx in indices {
            counts.add(labels[idx]);
        }
        counts
    }

    #[inline]
    /// Adds one observation of `class`
    pub fn add(&mut self, class: u32) {
        self.counts[class as usize] += 1;
        self.total += 1;
    }

    /// Resets every count to zero, keeping the allocation
    pub fn clear(&mut self) {
        for c in self.counts.iter_mut() {
            *c = 0;
        }
        self.total = 0;
    }

    /// Number of observations
    pub fn total(&self) -> usize {
        self.total
    }

    /// Raw counts indexed by class id
    pub fn as_slice(&self) -> &[usize] {
        &self.counts
    }

    /// Gini impurity of the counted multiset
    pub fn gini(&self) -> f64 {
        gini_from_counts(&self.counts, self.total)
    }

    /// Majority class, `None` when nothing was counted
    pub fn majority(&self) -> Option<u32> {
        majority_from_counts(&self.counts)
    }

    /// True when at most one class is present
    pub fn is_pure(&self) -> bool {
        self.counts.iter().filter(|&&c| c > 0).count() <= 1
    }

    /// Sum of squared counts, the running quantity the split scan maintains
    pub fn sum_of_squares(&self) -> f64 {
        self.counts.iter().map(|&c| (c * c) as f64).sum()
    }
}

/// Gini impurity `1 - Σ (count_c / total)²`.  Zero for an empty multiset.
pub fn gini_from_counts(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.;
    }
    let inv_total = 1. / total as f64;
    let mut impurity = 1.;
    for &c in counts {
        if c > 0 {
            let p = c as f64 * inv_total;
            impurity -= p * p;
        }
    }
    impurity
}

#[inline]
/// Gini impurity from a running sum of squared class counts: `1 - Σc² / n²`
pub fn gini_from_sum_of_squares(sum_of_squares: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.;
    }
    let n = n as f64;
    1. - sum_of_squares / (n * n)
}

/// Index of the highest count; ties go to the lowest class id
pub fn majority_from_counts(counts: &[usize]) -> Option<u32> {
    let mut best: Option<(u32, usize)> = None;
    for (class, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => (),
            _ => best = Some((class as u32, count)),
        }
    }
    best.map(|(class, _)| class)
}

/// Number of classes implied by a label vector, `max(label) + 1`
pub fn num_classes(labels: &[u32]) -> usize {
    labels.iter().max().map(|&m| m as usize + 1).unwrap_or(0)
}

fn count_labels(labels: &[u32]) -> Vec<usize> {
    let mut counts = vec![0; num_classes(labels)];
    for &label in labels {
        counts[label as usize] += 1;
    }
    counts
}

/// Gini impurity of a label multiset
pub fn gini(labels: &[u32]) -> f64 {
    gini_from_counts(&count_labels(labels), labels.len())
}

/// Majority class of a label multiset, `None` when empty
pub fn majority(labels: &[u32]) -> Option<u32> {
    majority_from_counts(&count_labels(labels))
}
