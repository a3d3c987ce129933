//! Summaries of a generation's fitness and of gene magnitudes.

use serde::Serialize;

use crate::{
    genes::{INIT_MAX, INIT_MIN},
    genetic::rank_by_fitness,
};

/// Descriptive statistics of one generation's fitness scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitnessStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// Upper median: `sorted[len / 2]`.
    pub median: f32,
    /// Population standard deviation.
    pub std_dev: f32,
    /// Index of the best agent; the lowest index wins ties.
    pub best_index: usize,
}

impl FitnessStats {
    /// Computes statistics over `fitness`, or `None` if it is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use neuroarcade_training::stats::FitnessStats;
    ///
    /// let stats = FitnessStats::new(&[1.0, 5.0, 3.0, 2.0, 4.0]).unwrap();
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.median, 3.0);
    /// assert_eq!(stats.best_index, 1);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(fitness: &[f32]) -> Option<Self> {
        let best_index = *rank_by_fitness(fitness).first()?;

        let mut sorted = fitness.to_vec();
        sorted.sort_by(f32::total_cmp);
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let n = sorted.len() as f32;
        let mean = sorted.iter().sum::<f32>() / n;
        let median = sorted[sorted.len() / 2];
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;

        Some(Self {
            min,
            max,
            mean,
            median,
            std_dev: variance.sqrt(),
            best_index,
        })
    }
}

/// Magnitude summary of a set of genes.
///
/// Mutation never clamps, so `max_abs` and `outside_init_range` grow when a
/// lineage drifts away from the `[-1, 1]` initialization range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeneStats {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean_abs: f32,
    pub max_abs: f32,
    /// Genes outside `[INIT_MIN, INIT_MAX]`.
    pub outside_init_range: usize,
}

impl GeneStats {
    /// Returns `None` if `genes` yields nothing.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(genes: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut genes = genes.into_iter();
        let first = genes.next()?;
        let mut stats = Self {
            count: 0,
            min: first,
            max: first,
            mean_abs: 0.0,
            max_abs: 0.0,
            outside_init_range: 0,
        };
        let mut abs_sum = 0.0;
        for gene in std::iter::once(first).chain(genes) {
            stats.count += 1;
            stats.min = stats.min.min(gene);
            stats.max = stats.max.max(gene);
            stats.max_abs = stats.max_abs.max(gene.abs());
            abs_sum += gene.abs();
            if !(INIT_MIN..=INIT_MAX).contains(&gene) {
                stats.outside_init_range += 1;
            }
        }
        stats.mean_abs = abs_sum / stats.count as f32;
        Some(stats)
    }
}
