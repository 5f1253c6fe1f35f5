//! The speciation and reproduction engine of NeuroEvolution of
//! Augmenting Topologies, following the 2002 paper:
//! <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! Organisms (genomes with fitness and reproduction status) are
//! clustered into species by genetic compatibility. Each generation
//! their fitness is shared within the species and penalized for
//! stagnation, an integer offspring budget is allotted to each species,
//! and the next generation is produced by cloning, mutation and
//! crossover.
//!
//! The genome itself is opaque: any type implementing the [`Genome`]
//! trait can be evolved. All randomness is drawn from an explicitly
//! passed [`Draws`] source, so a run is reproducible given a seed.
//!
//! # Example usage
//! ```ignore
//! use oxineat_species::{Population, PopulationConfig, RngDraws};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! // With `G` a suitable type implementing `Genome`...
//! let mut draws = RngDraws::new(ChaCha8Rng::seed_from_u64(42));
//! let mut population = Population::new(seed_genome, population_config, genetic_config, &mut draws)?;
//! for _ in 0..100 {
//!     population.evaluate_fitness(evaluate);
//!     if let Err(e) = population.epoch(&mut draws) {
//!         eprintln!("{}", e);
//!         break;
//!     }
//! }
//! ```

mod genome;
mod organisms;
mod populations;
mod rng;

#[cfg(test)]
mod test_utils;

pub use genome::*;
pub use organisms::{Organism, OrganismID, Organisms};
pub use populations::*;
pub use rng::{Draws, RngDraws};
