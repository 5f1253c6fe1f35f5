use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Connection-weight perturbation modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightMutation {
    /// Add Gaussian noise to the existing weights.
    Gaussian,
    /// Replace the weights with fresh Gaussian values.
    ColdGaussian,
}

/// An interface for genomes that can be evolved by NEAT.
///
/// The population only ever calls these operations; how genes are
/// represented, aligned, mutated or compared is left entirely to
/// the implementor. Any randomness an operation needs must be taken
/// from the passed `rng`, otherwise runs are not reproducible.
pub trait Genome: Sized {
    type Config;
    type InnovationHistory: InnovationHistory<Config = Self::Config>;
    /// Network built from the genome, used for recurrency checks
    /// during link addition.
    type Phenotype;

    /// Returns the genome's identifier.
    fn id(&self) -> usize;

    /// Returns an exact copy of the genome with the new identifier.
    fn duplicate(&self, new_id: usize) -> Self;

    /// Returns the compatibility distance between two genomes.
    /// A distance of 0 means the genomes are identical for
    /// speciation purposes.
    fn compatibility(&self, other: &Self, config: &Self::Config) -> f64;

    /// Splits an existing connection with a new node.
    fn mutate_add_node(&mut self, history: &mut Self::InnovationHistory, rng: &mut dyn RngCore);

    /// Attempts to add a new connection, trying at most `tries`
    /// candidate node pairs.
    fn mutate_add_link(
        &mut self,
        phenotype: &Self::Phenotype,
        history: &mut Self::InnovationHistory,
        tries: usize,
        rng: &mut dyn RngCore,
    );

    /// Perturbs connection weights. `rate` is the chance of
    /// each weight being affected.
    fn mutate_link_weights(
        &mut self,
        power: f64,
        rate: f64,
        mode: WeightMutation,
        rng: &mut dyn RngCore,
    );

    /// Applies every non-structural mutation (weights, enable
    /// toggles, ...) according to the genome's own configuration.
    fn mutate_all_nonstructural(&mut self, config: &Self::Config, rng: &mut dyn RngCore);

    /// Multipoint crossover. Matching genes are inherited from
    /// a random parent.
    fn mate_multipoint(
        &self,
        other: &Self,
        new_id: usize,
        fitness: f64,
        other_fitness: f64,
        rng: &mut dyn RngCore,
    ) -> Self;

    /// Multipoint crossover. Matching genes are averaged.
    fn mate_multipoint_avg(
        &self,
        other: &Self,
        new_id: usize,
        fitness: f64,
        other_fitness: f64,
        rng: &mut dyn RngCore,
    ) -> Self;

    /// Single-point crossover.
    fn mate_singlepoint(&self, other: &Self, new_id: usize, rng: &mut dyn RngCore) -> Self;

    /// Builds the genome's phenotype.
    fn genesis(&self, generation: usize) -> Self::Phenotype;
}

/// An Innovation History is used to keep track
/// of genetic innovations throught successive
/// generations of genomes.
///
/// The exact function and utility of the
/// InnovationHistory is left to the implementor.
pub trait InnovationHistory {
    type Config;

    fn new(config: &Self::Config) -> Self;
}
