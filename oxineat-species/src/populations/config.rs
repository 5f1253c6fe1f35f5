use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for speciation and
/// reproduction.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population. Only used to spawn the
    /// initial population and to detect over-allocation.
    pub pop_size: NonZeroUsize,
    /// Compatibility distance threshold, beyond which
    /// genomes are considered as belonging to
    /// different species.
    pub compat_threshold: f64,
    /// Number of generations without improvement
    /// after which a species is penalized.
    pub drop_off_age: usize,
    /// Fitness multiplier for species aged 10 or less.
    /// A value of 1.0 disables the boost.
    pub age_significance: f64,
    /// Fraction of each species, by rank, allowed
    /// to become parents.
    pub survival_threshold: f64,
    /// Power of the weight mutations applied to
    /// population champion clones.
    pub weight_mut_power: f64,
    /// Chance that offspring are produced by
    /// mutation alone.
    pub mutate_only_prob: f64,
    /// Chance of a node addition mutation.
    pub mutate_add_node_prob: f64,
    /// Chance of a link addition mutation, when no
    /// node was added.
    pub mutate_add_link_prob: f64,
    /// Chance that the second parent is taken from
    /// another species.
    pub interspecies_mate_rate: f64,
    /// Chance of multipoint crossover.
    pub mate_multipoint_prob: f64,
    /// Relative weight of multipoint-average crossover,
    /// against singlepoint, when multipoint was not chosen.
    pub mate_multipoint_avg_prob: f64,
    /// Relative weight of singlepoint crossover.
    pub mate_singlepoint_prob: f64,
    /// Chance that a crossover child is left unmutated.
    pub mate_only_prob: f64,
    /// Maximum attempts of a link addition mutation.
    pub new_link_tries: usize,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use oxineat_species::PopulationConfig;
    ///
    /// let cfg1 = PopulationConfig::zero();
    ///
    /// let cfg2 = PopulationConfig {
    ///     // Specify some values here...
    ///     survival_threshold: 0.2,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// # assert_eq!(cfg1.pop_size.get(), 1);
    /// # assert_eq!(cfg2.survival_threshold, 0.2);
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            pop_size: unsafe { NonZeroUsize::new_unchecked(1) },
            compat_threshold: 0.0,
            drop_off_age: 0,
            age_significance: 0.0,
            survival_threshold: 0.0,
            weight_mut_power: 0.0,
            mutate_only_prob: 0.0,
            mutate_add_node_prob: 0.0,
            mutate_add_link_prob: 0.0,
            interspecies_mate_rate: 0.0,
            mate_multipoint_prob: 0.0,
            mate_multipoint_avg_prob: 0.0,
            mate_singlepoint_prob: 0.0,
            mate_only_prob: 0.0,
            new_link_tries: 0,
        }
    }
}
