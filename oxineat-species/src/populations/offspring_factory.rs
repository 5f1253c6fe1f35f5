use super::*;

/// Chance that a population champion's clone has its weights
/// perturbed rather than gaining a new link.
const SUPER_CHAMP_WEIGHT_MUTATION_PROB: f64 = 0.8;
/// Species expecting more offspring than this keep
/// an unmodified copy of their champion.
const CHAMPION_CLONE_THRESHOLD: usize = 5;
/// Attempts at picking another species as a mate source.
const INTERSPECIES_ATTEMPTS: usize = 5;

/// How a baby came to be.
#[derive(Debug)]
enum Origin {
    PopulationChampionClone,
    ChampionClone,
    Mutation,
    Crossover,
}

/// Auxiliary type for offspring generation.
/// Holds the parts of a population needed to produce a
/// species' allotted offspring and place each baby into
/// a species.
pub(super) struct OffspringFactory<'a, C, H, G, D: ?Sized> {
    pub(super) species: &'a mut Vec<Species>,
    pub(super) organisms: &'a mut Organisms<G>,
    pub(super) history: &'a mut H,
    pub(super) last_species: &'a mut usize,
    pub(super) population_config: &'a PopulationConfig,
    pub(super) genetic_config: &'a C,
    pub(super) draws: &'a mut D,
    pub(super) generation: usize,
}

impl<'a, C, H, G, D> OffspringFactory<'a, C, H, G, D>
where
    G: Genome<InnovationHistory = H, Config = C>,
    D: Draws + ?Sized,
{
    /// Generate the offspring allotted to a species.
    ///
    /// The parents are the species' members at the time of
    /// the call; offspring placed back into the same species
    /// never become parents of their siblings.
    pub(super) fn generate_offspring(
        mut self,
        species_id: SpeciesID,
        ranked: &[SpeciesID],
    ) -> Result<Vec<OrganismID>, SpeciesError> {
        let species = self
            .species
            .iter()
            .find(|s| s.id() == species_id)
            .ok_or(SpeciesError::UnknownSpecies(species_id))?;
        let expected = species.expected_offspring;
        if expected == 0 {
            return Ok(vec![]);
        }
        let parents = species.organisms.clone();
        let champion = *parents
            .first()
            .ok_or(SpeciesError::EmptySpeciesReproduction(species_id))?;

        if expected > self.population_config.pop_size.get() {
            log::warn!(
                "species {:?} expects {} offspring, more than the population size of {}",
                species_id,
                expected,
                self.population_config.pop_size
            );
        }

        let mut champion_cloned = false;
        let mut offspring = Vec::with_capacity(expected.min(self.population_config.pop_size.get()));
        for count in 0..expected {
            let (baby, origin) = if self.organisms.member(champion)?.super_champ_offspring > 0 {
                (
                    self.clone_population_champion(champion, count)?,
                    Origin::PopulationChampionClone,
                )
            } else if !champion_cloned && expected > CHAMPION_CLONE_THRESHOLD {
                champion_cloned = true;
                let genome = self.organisms.member(champion)?.genome.duplicate(count);
                (Organism::new(genome, self.generation), Origin::ChampionClone)
            } else if self.draws.uniform() < self.population_config.mutate_only_prob
                || parents.len() == 1
            {
                (self.mutate_parent(&parents, count)?, Origin::Mutation)
            } else {
                (
                    self.mate_parents(species_id, &parents, ranked, count)?,
                    Origin::Crossover,
                )
            };

            let (id, placed_in) = place_organism(
                self.species,
                self.organisms,
                self.last_species,
                baby,
                true,
                self.population_config,
                self.genetic_config,
            )?;
            log::trace!(
                "species {:?} baby {} ({:?}) placed in species {:?}",
                species_id,
                count,
                origin,
                placed_in
            );
            offspring.push(id);
        }
        Ok(offspring)
    }

    /// Clones the population champion, using up one of its
    /// reserved offspring. All clones but the last are mutated;
    /// the last inherits the champion's record.
    fn clone_population_champion(
        &mut self,
        champion: OrganismID,
        count: usize,
    ) -> Result<Organism<G>, SpeciesError> {
        let parent = self.organisms.member(champion)?;
        let remaining = parent.super_champ_offspring;
        let record = (remaining == 1 && parent.is_population_champion)
            .then(|| parent.original_fitness);
        let mut genome = parent.genome.duplicate(count);

        let mut structural = false;
        if remaining > 1 {
            if self.draws.uniform() < SUPER_CHAMP_WEIGHT_MUTATION_PROB
                || self.population_config.mutate_add_link_prob == 0.0
            {
                genome.mutate_link_weights(
                    self.population_config.weight_mut_power,
                    1.0,
                    WeightMutation::Gaussian,
                    self.draws.rng(),
                );
            } else {
                let phenotype = genome.genesis(self.generation);
                genome.mutate_add_link(
                    &phenotype,
                    self.history,
                    self.population_config.new_link_tries,
                    self.draws.rng(),
                );
                structural = true;
            }
        }
        self.organisms.member_mut(champion)?.super_champ_offspring -= 1;

        let mut baby = Organism::new(genome, self.generation);
        baby.mutation_struct_baby = structural;
        if let Some(fitness) = record {
            baby.is_population_champion_child = true;
            baby.highest_fitness = fitness;
        }
        Ok(baby)
    }

    /// Copies a random parent and mutates the copy.
    fn mutate_parent(
        &mut self,
        parents: &[OrganismID],
        count: usize,
    ) -> Result<Organism<G>, SpeciesError> {
        let mom = self.pick(parents);
        let mut genome = self.organisms.member(mom)?.genome.duplicate(count);
        let structural = self.mutate(&mut genome);

        let mut baby = Organism::new(genome, self.generation);
        baby.mutation_struct_baby = structural;
        Ok(baby)
    }

    /// Crosses a random parent with either another random parent
    /// or the champion of a (usually better ranked) species, and
    /// possibly mutates the result.
    fn mate_parents(
        &mut self,
        species_id: SpeciesID,
        parents: &[OrganismID],
        ranked: &[SpeciesID],
        count: usize,
    ) -> Result<Organism<G>, SpeciesError> {
        let config = self.population_config;
        let mom_id = self.pick(parents);
        let dad_id = if self.draws.uniform() > config.interspecies_mate_rate {
            self.pick(parents)
        } else {
            self.foreign_mate(species_id, ranked).unwrap_or(parents[0])
        };

        let mom = self.organisms.member(mom_id)?;
        let dad = self.organisms.member(dad_id)?;
        let mut genome = if self.draws.uniform() < config.mate_multipoint_prob {
            mom.genome.mate_multipoint(
                &dad.genome,
                count,
                mom.original_fitness,
                dad.original_fitness,
                self.draws.rng(),
            )
        } else if self.draws.uniform()
            < config.mate_multipoint_avg_prob
                / (config.mate_multipoint_avg_prob + config.mate_singlepoint_prob)
        {
            mom.genome.mate_multipoint_avg(
                &dad.genome,
                count,
                mom.original_fitness,
                dad.original_fitness,
                self.draws.rng(),
            )
        } else {
            mom.genome.mate_singlepoint(&dad.genome, count, self.draws.rng())
        };

        let mutate = self.draws.uniform() > config.mate_only_prob
            || mom_id == dad_id
            || dad.genome.compatibility(&mom.genome, self.genetic_config) == 0.0;
        let structural = mutate && self.mutate(&mut genome);

        let mut baby = Organism::new(genome, self.generation);
        baby.mate_baby = true;
        baby.mutation_struct_baby = structural;
        Ok(baby)
    }

    /// Picks the first member of another species, favoring the
    /// top of the ranking. Gives up after a few draws that land
    /// on the mating species itself, taking its own first member.
    fn foreign_mate(&mut self, species_id: SpeciesID, ranked: &[SpeciesID]) -> Option<OrganismID> {
        let mut candidate = species_id;
        let last = ranked.len().checked_sub(1)? as f64;
        for _ in 0..INTERSPECIES_ATTEMPTS {
            let multiplier = (self.draws.std_gaussian() / 4.0).min(1.0);
            let index = (multiplier * last + 0.5).floor().clamp(0.0, last) as usize;
            candidate = ranked[index];
            if candidate != species_id {
                break;
            }
        }
        self.species
            .iter()
            .find(|s| s.id() == candidate)
            .and_then(|s| s.organisms.first().copied())
    }

    /// Picks a random parent. `parents` must not be empty.
    fn pick(&mut self, parents: &[OrganismID]) -> OrganismID {
        let last = parents.len() - 1;
        parents[self.draws.index(parents.len()).min(last)]
    }

    /// Applies a single mutation: a new node, else a new link,
    /// else every non-structural mutation. Returns whether the
    /// genome's structure changed.
    fn mutate(&mut self, genome: &mut G) -> bool {
        let config = self.population_config;
        if self.draws.uniform() < config.mutate_add_node_prob {
            genome.mutate_add_node(self.history, self.draws.rng());
            true
        } else if self.draws.uniform() < config.mutate_add_link_prob {
            let phenotype = genome.genesis(self.generation);
            genome.mutate_add_link(
                &phenotype,
                self.history,
                config.new_link_tries,
                self.draws.rng(),
            );
            true
        } else {
            genome.mutate_all_nonstructural(self.genetic_config, self.draws.rng());
            false
        }
    }
}
