//! A Population is a collection of organisms.
//! These are grouped into species, which are
//! evolved using the organisms' fitness as the
//! source of selective pressure.
mod config;
mod errors;
pub mod logging;
mod offspring_factory;
mod species;

use crate::{Draws, Genome, InnovationHistory, Organism, OrganismID, Organisms, WeightMutation};
pub use config::PopulationConfig;
pub use errors::{EvolutionError, SpeciesError};
use offspring_factory::OffspringFactory;
pub use species::{Species, SpeciesID};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::HashSet;

/// A population of organisms, partitioned into species.
///
/// Besides the organisms and species themselves, the population
/// is the context reproduction works in: it holds the genomes'
/// innovation history and issues new species IDs.
#[derive(Serialize, Deserialize)]
pub struct Population<C, H, G> {
    species: Vec<Species>,
    organisms: Organisms<G>,
    history: H,
    generation: usize,
    last_species: usize,
    population_config: PopulationConfig,
    genetic_config: C,
}

impl<C, H, G> Population<C, H, G>
where
    G: Genome<InnovationHistory = H, Config = C>,
    H: InnovationHistory<Config = C>,
{
    /// Creates a new population of [`pop_size`] copies of `seed`,
    /// each with freshly randomized connection weights, and
    /// speciates them.
    ///
    /// The type of `genetic_config` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    ///
    /// [`pop_size`]: PopulationConfig::pop_size
    pub fn new<D>(
        seed: G,
        population_config: PopulationConfig,
        genetic_config: C,
        draws: &mut D,
    ) -> Result<Population<C, H, G>, SpeciesError>
    where
        D: Draws + ?Sized,
    {
        let mut population = Self::empty(population_config, genetic_config);
        for i in 0..population.population_config.pop_size.get() {
            let mut genome = seed.duplicate(i);
            genome.mutate_link_weights(1.0, 1.0, WeightMutation::ColdGaussian, draws.rng());
            population.add_organism(genome)?;
        }
        Ok(population)
    }

    /// Creates a new population from the passed genomes,
    /// unmodified, speciating them in order.
    pub fn new_seeded(
        genomes: impl IntoIterator<Item = G>,
        population_config: PopulationConfig,
        genetic_config: C,
    ) -> Result<Population<C, H, G>, SpeciesError> {
        let mut population = Self::empty(population_config, genetic_config);
        for genome in genomes {
            population.add_organism(genome)?;
        }
        Ok(population)
    }

    fn empty(population_config: PopulationConfig, genetic_config: C) -> Population<C, H, G> {
        Population {
            species: vec![],
            organisms: Organisms::new(),
            history: H::new(&genetic_config),
            generation: 0,
            last_species: 0,
            population_config,
            genetic_config,
        }
    }

    /// Adds a genome to the population as a new organism of
    /// the current generation.
    pub fn add_organism(&mut self, genome: G) -> Result<OrganismID, SpeciesError> {
        let (id, _) = self.speciate(Organism::new(genome, self.generation))?;
        Ok(id)
    }

    /// Inserts an organism into the population, placing it in
    /// the first species whose first member is within the
    /// compatibility threshold, or in a new species. Species
    /// created here age from the next epoch on.
    ///
    /// Returns the organism's ID and its species. Fails, leaving
    /// the population untouched, if a species' first member is
    /// missing from the population.
    pub fn speciate(
        &mut self,
        organism: Organism<G>,
    ) -> Result<(OrganismID, SpeciesID), SpeciesError> {
        place_organism(
            &mut self.species,
            &mut self.organisms,
            &mut self.last_species,
            organism,
            false,
            &self.population_config,
            &self.genetic_config,
        )
    }

    /// Removes an organism from its species and
    /// from the population.
    pub fn remove_organism(&mut self, id: OrganismID) -> Result<Organism<G>, SpeciesError> {
        if let Some(species_id) = self.organisms.member(id)?.species() {
            let index = self.species_index(species_id)?;
            self.species[index].remove_organism(id)?;
        }
        self.organisms
            .remove(id)
            .ok_or(SpeciesError::UnknownOrganism(id))
    }

    /// Evaluates the fitness of each organism in the
    /// population using the passed evaluator, in species order.
    pub fn evaluate_fitness<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&G) -> f64,
    {
        for species in &self.species {
            for id in &species.organisms {
                if let Some(organism) = self.organisms.get_mut(*id) {
                    organism.fitness = evaluator(&organism.genome);
                }
            }
        }
    }

    /// Sets the fitness of a single organism.
    pub fn set_fitness(&mut self, id: OrganismID, fitness: f64) -> Result<(), SpeciesError> {
        self.organisms.member_mut(id)?.fitness = fitness;
        Ok(())
    }

    /// Produces the offspring allotted to a species, registering
    /// new species in the population as needed. `ranked` lists
    /// the population's species from best to worst, and is used
    /// to pick mates from other species.
    ///
    /// Returns the IDs of the new organisms.
    ///
    /// # Errors
    /// Returns an error if the species does not exist, or if it has
    /// offspring allotted but no members.
    pub fn reproduce<D>(
        &mut self,
        species: SpeciesID,
        generation: usize,
        ranked: &[SpeciesID],
        draws: &mut D,
    ) -> Result<Vec<OrganismID>, SpeciesError>
    where
        D: Draws + ?Sized,
    {
        OffspringFactory {
            species: &mut self.species,
            organisms: &mut self.organisms,
            history: &mut self.history,
            last_species: &mut self.last_species,
            population_config: &self.population_config,
            genetic_config: &self.genetic_config,
            draws,
            generation,
        }
        .generate_offspring(species, ranked)
    }

    /// Evolves the population by one generation.
    ///
    /// Each species' fitness is adjusted, every organism is
    /// given its share of the next generation in proportion to
    /// its adjusted fitness, and the shares are counted species
    /// by species, in order of their best organism's fitness.
    /// Organisms ranked too low within their species are culled,
    /// every species reproduces, and the previous generation is
    /// replaced by the offspring. Species left without members
    /// go extinct; the rest age by one generation.
    ///
    /// # Errors
    /// Returns an error if the population has become degenerate
    /// (no organisms, or a total adjusted fitness of zero), or if
    /// the species and organisms have gone out of sync.
    pub fn epoch<D>(&mut self, draws: &mut D) -> Result<(), EvolutionError>
    where
        D: Draws + ?Sized,
    {
        let generation = self.generation + 1;

        for species in &mut self.species {
            species.adjust_fitness(&mut self.organisms, &self.population_config)?;
            species.compute_avg_fitness(&self.organisms)?;
            species.compute_max_fitness(&self.organisms)?;
        }

        self.assign_expected_offspring()?;
        let ranked = self.rank_species()?;
        self.count_offspring(&ranked)?;

        if let Some(champion) = self.champion_of(&ranked) {
            self.organisms.member_mut(champion)?.is_population_champion = true;
        }

        self.remove_eliminated()?;
        let parents: HashSet<OrganismID, RandomState> = self
            .species
            .iter()
            .flat_map(|s| s.organisms.iter().copied())
            .collect();

        for &species in &ranked {
            self.reproduce(species, generation, &ranked, draws)?;
        }

        for species in &mut self.species {
            species.organisms.retain(|id| !parents.contains(id));
        }
        for id in parents {
            self.organisms.remove(id);
        }
        self.species.retain(|s| s.size() > 0);
        for species in &mut self.species {
            species.increment_age();
        }

        self.generation = generation;
        log::debug!(
            "generation {}: {} organisms in {} species",
            self.generation,
            self.organisms.len(),
            self.species.len()
        );
        Ok(())
    }

    /// Gives each organism its share of the next generation:
    /// its adjusted fitness over the population's mean.
    fn assign_expected_offspring(&mut self) -> Result<(), EvolutionError> {
        let members: Vec<OrganismID> = self
            .species
            .iter()
            .flat_map(|s| s.organisms.iter().copied())
            .collect();
        let mut total = 0.0;
        for &id in &members {
            total += self.organisms.member(id)?.fitness;
        }
        if members.is_empty() || total <= 0.0 {
            return Err(EvolutionError::DegeneratePopulation);
        }

        let average = total / members.len() as f64;
        for &id in &members {
            let organism = self.organisms.member_mut(id)?;
            organism.expected_offspring = organism.fitness / average;
        }
        Ok(())
    }

    /// Returns the IDs of all species, sorted by the
    /// original fitness of their best member, best first.
    /// Empty species rank last.
    fn rank_species(&self) -> Result<Vec<SpeciesID>, SpeciesError> {
        let mut ranking = Vec::with_capacity(self.species.len());
        for species in &self.species {
            let best = match species.organisms.first() {
                Some(id) => self.organisms.member(*id)?.original_fitness,
                None => f64::NEG_INFINITY,
            };
            ranking.push((species.id(), best));
        }
        ranking.sort_by(|(_, f1), (_, f2)| f2.partial_cmp(f1).unwrap_or(Ordering::Equal));
        Ok(ranking.into_iter().map(|(id, _)| id).collect())
    }

    /// Counts each species' offspring in rank order, carrying the
    /// fractional skim between species. Offspring lost to rounding
    /// go to the best species.
    fn count_offspring(&mut self, ranked: &[SpeciesID]) -> Result<(), SpeciesError> {
        let mut skim = 0.0;
        let mut allotted = 0;
        for &id in ranked {
            let index = self.species_index(id)?;
            skim = self.species[index].count_offspring(&self.organisms, skim)?;
            allotted += self.species[index].expected_offspring;
        }

        let target = self.population_config.pop_size.get();
        match ranked.first() {
            Some(&best) if allotted < target => {
                log::debug!("giving {} lost offspring to species {:?}", target - allotted, best);
                let index = self.species_index(best)?;
                self.species[index].expected_offspring += target - allotted;
            }
            _ => {}
        }
        Ok(())
    }

    /// Removes the organisms marked for elimination.
    fn remove_eliminated(&mut self) -> Result<(), SpeciesError> {
        for species in &mut self.species {
            let mut survivors = Vec::with_capacity(species.organisms.len());
            for &id in &species.organisms {
                if self.organisms.member(id)?.to_eliminate {
                    self.organisms.remove(id);
                } else {
                    survivors.push(id);
                }
            }
            species.organisms = survivors;
        }
        Ok(())
    }

    fn champion_of(&self, ranked: &[SpeciesID]) -> Option<OrganismID> {
        let best = ranked.first()?;
        self.species
            .iter()
            .find(|s| s.id() == *best)
            .and_then(|s| s.organisms.first().copied())
    }

    fn species_index(&self, id: SpeciesID) -> Result<usize, SpeciesError> {
        self.species
            .iter()
            .position(|s| s.id() == id)
            .ok_or(SpeciesError::UnknownSpecies(id))
    }

    /// Returns the organism with the highest fitness, the first
    /// found in species order in case of ties.
    pub fn champion(&self) -> Option<OrganismID> {
        let mut champion: Option<(OrganismID, f64)> = None;
        for species in &self.species {
            for &id in &species.organisms {
                if let Some(organism) = self.organisms.get(id) {
                    if champion.map_or(true, |(_, best)| organism.fitness > best) {
                        champion = Some((id, organism.fitness));
                    }
                }
            }
        }
        champion.map(|(id, _)| id)
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Returns the species with the passed ID.
    pub fn get_species(&self, id: SpeciesID) -> Option<&Species> {
        self.species.iter().find(|s| s.id() == id)
    }

    /// Returns the species list and the organisms together,
    /// for driving [`Species`] operations directly.
    pub fn species_and_organisms_mut(&mut self) -> (&mut [Species], &mut Organisms<G>) {
        (&mut self.species, &mut self.organisms)
    }

    /// Returns the population's organisms.
    pub fn organisms(&self) -> &Organisms<G> {
        &self.organisms
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the number of species ever created, which
    /// is also the last issued species ID.
    pub fn last_species(&self) -> usize {
        self.last_species
    }

    /// Returns the population's innovation history.
    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.population_config
    }

    pub fn genetic_config(&self) -> &C {
        &self.genetic_config
    }
}

/// Places an organism in the first species whose first member
/// is within the compatibility threshold, or in a new species
/// if there is none. Returns the organism's new ID and its
/// species.
fn place_organism<C, G>(
    species: &mut Vec<Species>,
    organisms: &mut Organisms<G>,
    last_species: &mut usize,
    mut organism: Organism<G>,
    novel: bool,
    population_config: &PopulationConfig,
    genetic_config: &C,
) -> Result<(OrganismID, SpeciesID), SpeciesError>
where
    G: Genome<Config = C>,
{
    let mut compatible = None;
    for (index, s) in species.iter().enumerate() {
        let first = match s.organisms.first() {
            Some(id) => organisms.member(*id)?,
            None => continue,
        };
        if organism.genome.compatibility(&first.genome, genetic_config)
            < population_config.compat_threshold
        {
            compatible = Some(index);
            break;
        }
    }
    let index = match compatible {
        Some(index) => index,
        None => {
            *last_species += 1;
            let id = SpeciesID(*last_species);
            log::debug!("registered new species {:?}", id);
            species.push(Species::new_novel(id, novel));
            species.len() - 1
        }
    };

    let species_id = species[index].id();
    organism.set_species(Some(species_id));
    let id = organisms.insert(organism);
    species[index].add_organism(id);
    Ok((id, species_id))
}
