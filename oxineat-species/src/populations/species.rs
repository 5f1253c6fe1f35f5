use super::logging::SpeciesReport;
use super::{PopulationConfig, SpeciesError};
use crate::{OrganismID, Organisms};

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;

/// Multiplier applied to the fitness of stagnated species.
const STAGNATION_PENALTY: f64 = 0.01;
/// Species up to this age receive the youth fitness boost.
const YOUTH_AGE: usize = 10;
/// Floor for negative fitness values.
const MIN_FITNESS: f64 = 0.0001;

/// Species identifier, issued in increasing order
/// by the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesID(pub usize);

/// Species are collections of reproductively
/// compatible (within a certain [compatibility threshold])
/// organisms. Membership is determined by calculating
/// the compatibility distance to the first member of
/// the species, which after [fitness adjustment] is
/// its champion.
///
/// A species only stores the IDs of its members; the
/// organisms themselves live in an [`Organisms`] arena.
///
/// [compatibility threshold]: PopulationConfig::compat_threshold
/// [fitness adjustment]: Species::adjust_fitness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    id: SpeciesID,
    age: usize,
    is_novel: bool,
    avg_fitness: f64,
    max_fitness: f64,
    max_fitness_ever: f64,
    age_of_last_improvement: usize,
    pub(super) expected_offspring: usize,
    pub(super) organisms: Vec<OrganismID>,
}

impl Species {
    /// Creates a new, empty species of age 1.
    ///
    /// # Examples
    /// ```
    /// use oxineat_species::{Species, SpeciesID};
    ///
    /// let species = Species::new(SpeciesID(3));
    ///
    /// assert_eq!(species.id(), SpeciesID(3));
    /// assert_eq!(species.age(), 1);
    /// assert_eq!(species.size(), 0);
    /// ```
    pub fn new(id: SpeciesID) -> Species {
        Species {
            id,
            age: 1,
            is_novel: false,
            avg_fitness: 0.0,
            max_fitness: 0.0,
            max_fitness_ever: 0.0,
            age_of_last_improvement: 0,
            expected_offspring: 0,
            organisms: vec![],
        }
    }

    /// Creates a new species which won't age during
    /// its first generation.
    pub fn new_novel(id: SpeciesID, novel: bool) -> Species {
        Species {
            is_novel: novel,
            ..Species::new(id)
        }
    }

    pub fn id(&self) -> SpeciesID {
        self.id
    }

    pub fn age(&self) -> usize {
        self.age
    }

    pub fn is_novel(&self) -> bool {
        self.is_novel
    }

    pub fn avg_fitness(&self) -> f64 {
        self.avg_fitness
    }

    pub fn max_fitness(&self) -> f64 {
        self.max_fitness
    }

    pub fn max_fitness_ever(&self) -> f64 {
        self.max_fitness_ever
    }

    pub fn age_of_last_improvement(&self) -> usize {
        self.age_of_last_improvement
    }

    /// Number of offspring allotted by the last
    /// call to [`count_offspring`](Species::count_offspring).
    pub fn expected_offspring(&self) -> usize {
        self.expected_offspring
    }

    /// Returns the species' members, best first once
    /// fitness has been adjusted.
    pub fn organisms(&self) -> &[OrganismID] {
        &self.organisms
    }

    /// Returns the number of members.
    pub fn size(&self) -> usize {
        self.organisms.len()
    }

    /// Returns the number of generations since the
    /// species last improved.
    pub fn last_improved(&self) -> usize {
        self.age.saturating_sub(self.age_of_last_improvement)
    }

    /// Ages the species by one generation. A novel species
    /// loses its novelty instead.
    pub fn increment_age(&mut self) {
        if self.is_novel {
            self.is_novel = false;
        } else {
            self.age += 1;
        }
    }

    /// Adds an organism to the species. Returns `false`
    /// (leaving the species unchanged) if it was already
    /// a member.
    ///
    /// # Examples
    /// ```
    /// use oxineat_species::{OrganismID, Species, SpeciesID};
    ///
    /// let mut species = Species::new(SpeciesID(0));
    ///
    /// assert!(species.add_organism(OrganismID(7)));
    /// assert!(!species.add_organism(OrganismID(7)));
    /// assert_eq!(species.organisms(), &[OrganismID(7)]);
    /// ```
    pub fn add_organism(&mut self, organism: OrganismID) -> bool {
        if self.organisms.contains(&organism) {
            return false;
        }
        self.organisms.push(organism);
        true
    }

    /// Removes an organism from the species, preserving
    /// the order of the remaining members.
    ///
    /// # Errors
    /// Returns an error, leaving the species unchanged,
    /// if the organism is not a member.
    ///
    /// # Examples
    /// ```
    /// use oxineat_species::{OrganismID, Species, SpeciesID};
    ///
    /// let mut species = Species::new(SpeciesID(0));
    /// species.add_organism(OrganismID(1));
    ///
    /// assert!(species.remove_organism(OrganismID(2)).is_err());
    /// assert!(species.remove_organism(OrganismID(1)).is_ok());
    /// assert_eq!(species.size(), 0);
    /// ```
    pub fn remove_organism(&mut self, organism: OrganismID) -> Result<(), SpeciesError> {
        match self.organisms.iter().position(|o| *o == organism) {
            Some(i) => {
                self.organisms.remove(i);
                Ok(())
            }
            None => Err(SpeciesError::InvalidRemoval {
                species: self.id,
                organism,
            }),
        }
    }

    /// Shares fitness among the species' members, penalizing
    /// stagnation and boosting youth, then ranks the members by
    /// adjusted fitness, marks the champion, and marks for
    /// elimination those ranked too low to become parents.
    ///
    /// Each member's fitness before adjustment is kept as its
    /// `original_fitness`. An empty species is left untouched.
    pub fn adjust_fitness<G>(
        &mut self,
        organisms: &mut Organisms<G>,
        config: &PopulationConfig,
    ) -> Result<(), SpeciesError> {
        if self.organisms.is_empty() {
            return Ok(());
        }

        let mut age_debt = (self.age as i64 - self.age_of_last_improvement as i64 + 1)
            - config.drop_off_age as i64;
        if age_debt == 0 {
            age_debt = 1;
        }

        let size = self.organisms.len() as f64;
        let mut ranking = Vec::with_capacity(self.organisms.len());
        for &id in &self.organisms {
            let organism = organisms.member_mut(id)?;
            organism.original_fitness = organism.fitness;
            organism.is_champion = false;
            organism.to_eliminate = false;

            // Inherited from the reference algorithm: the penalty
            // applies whenever the debt reaches 1, which includes
            // the forced case above.
            if age_debt >= 1 {
                organism.fitness *= STAGNATION_PENALTY;
            }
            if self.age <= YOUTH_AGE {
                organism.fitness *= config.age_significance;
            }
            if organism.fitness < 0.0 {
                organism.fitness = MIN_FITNESS;
            }
            organism.fitness /= size;

            ranking.push((id, organism.fitness));
        }

        // Stable, so ties keep their previous relative order.
        ranking.sort_by(|(_, f1), (_, f2)| f2.partial_cmp(f1).unwrap_or(Ordering::Equal));
        self.organisms = ranking.into_iter().map(|(id, _)| id).collect();

        let champion = organisms.member_mut(self.organisms[0])?;
        champion.is_champion = true;
        if champion.original_fitness > self.max_fitness_ever {
            self.age_of_last_improvement = self.age;
            self.max_fitness_ever = champion.original_fitness;
        }

        let parents = (config.survival_threshold * size + 1.0).floor() as usize;
        for &id in self.organisms.iter().skip(parents) {
            organisms.member_mut(id)?.to_eliminate = true;
        }
        Ok(())
    }

    /// Computes, stores and returns the mean fitness of
    /// the species' members (0 for an empty species).
    pub fn compute_avg_fitness<G>(&mut self, organisms: &Organisms<G>) -> Result<f64, SpeciesError> {
        let mut total = 0.0;
        for &id in &self.organisms {
            total += organisms.member(id)?.fitness;
        }
        self.avg_fitness = if self.organisms.is_empty() {
            0.0
        } else {
            total / self.organisms.len() as f64
        };
        Ok(self.avg_fitness)
    }

    /// Computes, stores and returns the maximum fitness of
    /// the species' members. Fitness values below 0 are
    /// reported as 0.
    pub fn compute_max_fitness<G>(&mut self, organisms: &Organisms<G>) -> Result<f64, SpeciesError> {
        let mut max = 0.0;
        for &id in &self.organisms {
            let fitness = organisms.member(id)?.fitness;
            if fitness > max {
                max = fitness;
            }
        }
        self.max_fitness = max;
        Ok(self.max_fitness)
    }

    /// Computes the number of offspring allotted to the species
    /// from its members' individual `expected_offspring`.
    ///
    /// Whole offspring are counted directly, while fractional
    /// offspring are accumulated into `skim`, the remainder carried
    /// over from the previously counted species. Each time the skim
    /// adds up to a whole offspring, it is allotted to this species.
    /// Returns the remaining skim, to be passed to the next species
    /// in rank order. Fails if any member's share is infinite or NaN.
    pub fn count_offspring<G>(
        &mut self,
        organisms: &Organisms<G>,
        mut skim: f64,
    ) -> Result<f64, SpeciesError> {
        self.expected_offspring = 0;
        for &id in &self.organisms {
            let expected = organisms.member(id)?.expected_offspring;
            if !expected.is_finite() {
                return Err(SpeciesError::InvalidOffspringShare(id));
            }
            let expected = expected.max(0.0);
            self.expected_offspring = self
                .expected_offspring
                .saturating_add(expected.floor() as usize);
            skim += expected % 1.0;
            if skim >= 1.0 {
                let whole = skim.floor();
                self.expected_offspring += whole as usize;
                skim -= whole;
            }
        }
        Ok(skim)
    }

    /// Returns the member with the highest (strictly positive)
    /// fitness, the first one found in case of ties.
    pub fn find_champion<G>(
        &self,
        organisms: &Organisms<G>,
    ) -> Result<Option<OrganismID>, SpeciesError> {
        let mut best_fitness = 0.0;
        let mut champion = None;
        for &id in &self.organisms {
            let fitness = organisms.member(id)?.fitness;
            if fitness > best_fitness {
                best_fitness = fitness;
                champion = Some(id);
            }
        }
        Ok(champion)
    }

    /// Returns a human-readable summary of the species.
    pub fn report<G>(&self, organisms: &Organisms<G>) -> SpeciesReport {
        SpeciesReport {
            id: self.id,
            age: self.age,
            avg_fitness: self.avg_fitness,
            max_fitness: self.max_fitness,
            max_fitness_ever: self.max_fitness_ever,
            expected_offspring: self.expected_offspring,
            age_of_last_improvement: self.age_of_last_improvement,
            members: self
                .organisms
                .iter()
                .filter_map(|id| organisms.get(*id))
                .map(|o| o.to_string())
                .collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_age(&mut self, age: usize, age_of_last_improvement: usize) {
        self.age = age;
        self.age_of_last_improvement = age_of_last_improvement;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Organism;
    use proptest::prelude::*;

    fn config(survival_threshold: f64) -> PopulationConfig {
        PopulationConfig {
            survival_threshold,
            age_significance: 1.0,
            drop_off_age: 15,
            ..PopulationConfig::zero()
        }
    }

    fn species_with(fitnesses: &[f64]) -> (Species, Organisms<()>) {
        let mut organisms = Organisms::new();
        let mut species = Species::new(SpeciesID(0));
        for &fitness in fitnesses {
            let mut o = Organism::new((), 0);
            o.fitness = fitness;
            species.add_organism(organisms.insert(o));
        }
        (species, organisms)
    }

    fn original_fitnesses(species: &Species, organisms: &Organisms<()>) -> Vec<f64> {
        species
            .organisms()
            .iter()
            .map(|id| organisms.get(*id).unwrap().original_fitness)
            .collect()
    }

    #[test]
    fn adjust_fitness_ranks_and_culls() {
        let (mut species, mut organisms) = species_with(&[6.0, 2.0, 10.0, 4.0, 8.0]);
        species.adjust_fitness(&mut organisms, &config(0.4)).unwrap();

        assert_eq!(
            original_fitnesses(&species, &organisms),
            vec![10.0, 8.0, 6.0, 4.0, 2.0]
        );
        let flags: Vec<(bool, bool)> = species
            .organisms()
            .iter()
            .map(|id| {
                let o = organisms.get(*id).unwrap();
                (o.is_champion, o.to_eliminate)
            })
            .collect();
        assert_eq!(
            flags,
            vec![
                (true, false),
                (false, false),
                (false, false),
                (false, true),
                (false, true)
            ]
        );
    }

    #[test]
    fn adjust_fitness_shares_and_penalizes() {
        // age 1, last improvement 0, drop off 15: debt is -13, no penalty.
        let (mut species, mut organisms) = species_with(&[10.0, 20.0]);
        species
            .adjust_fitness(
                &mut organisms,
                &PopulationConfig {
                    age_significance: 2.0,
                    ..config(1.0)
                },
            )
            .unwrap();
        let fitness: Vec<f64> = species
            .organisms()
            .iter()
            .map(|id| organisms.get(*id).unwrap().fitness)
            .collect();
        assert_eq!(fitness, vec![20.0, 10.0]);
        assert_eq!(species.max_fitness_ever(), 20.0);
        assert_eq!(species.age_of_last_improvement(), 1);
    }

    #[test]
    fn zero_age_debt_still_penalizes() {
        // (age - last improvement + 1) - drop off == 0 is forced to 1.
        let (mut species, mut organisms) = species_with(&[50.0]);
        species.set_age(20, 6);
        species.adjust_fitness(&mut organisms, &config(1.0)).unwrap();
        let id = species.organisms()[0];
        assert!((organisms.get(id).unwrap().fitness - 0.5).abs() < 1e-12);
    }

    #[test]
    fn negative_fitness_is_clamped() {
        let (mut species, mut organisms) = species_with(&[-3.0, 1.0]);
        species.adjust_fitness(&mut organisms, &config(1.0)).unwrap();
        let last = species.organisms()[1];
        let o = organisms.get(last).unwrap();
        assert_eq!(o.original_fitness, -3.0);
        assert!((o.fitness - MIN_FITNESS / 2.0).abs() < 1e-15);
    }

    #[test]
    fn adjust_fitness_on_desynchronized_species_fails() {
        let (mut species, mut organisms) = species_with(&[1.0]);
        species.add_organism(OrganismID(99));
        assert_eq!(
            species.adjust_fitness(&mut organisms, &config(1.0)),
            Err(SpeciesError::UnknownOrganism(OrganismID(99)))
        );
    }

    #[test]
    fn avg_and_max_fitness() {
        let (mut species, organisms) = species_with(&[1.0, 2.0, 6.0]);
        assert_eq!(species.compute_avg_fitness(&organisms).unwrap(), 3.0);
        assert_eq!(species.compute_max_fitness(&organisms).unwrap(), 6.0);
        assert_eq!(species.avg_fitness(), 3.0);
        assert_eq!(species.max_fitness(), 6.0);

        let (mut empty, organisms) = species_with(&[]);
        assert_eq!(empty.compute_avg_fitness(&organisms).unwrap(), 0.0);
        assert_eq!(empty.compute_max_fitness(&organisms).unwrap(), 0.0);
    }

    #[test]
    fn count_offspring_carries_skim() {
        let (mut species, mut organisms) = species_with(&[1.0, 1.0]);
        for id in species.organisms().to_vec() {
            organisms.get_mut(id).unwrap().expected_offspring = 1.6;
        }
        let skim = species.count_offspring(&organisms, 0.0).unwrap();
        assert_eq!(species.expected_offspring(), 3);
        assert!((skim - 0.2).abs() < 1e-9);
    }

    #[test]
    fn count_offspring_rejects_non_finite_shares() {
        for share in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let (mut species, mut organisms) = species_with(&[1.0, 1.0]);
            let bad = species.organisms()[1];
            organisms.get_mut(bad).unwrap().expected_offspring = share;
            assert_eq!(
                species.count_offspring(&organisms, 0.0),
                Err(SpeciesError::InvalidOffspringShare(bad))
            );
        }
    }

    #[test]
    fn count_offspring_saturates_huge_shares() {
        let (mut species, mut organisms) = species_with(&[1.0, 1.0]);
        for id in species.organisms().to_vec() {
            organisms.get_mut(id).unwrap().expected_offspring = 1e300;
        }
        let skim = species.count_offspring(&organisms, 0.5).unwrap();
        assert_eq!(species.expected_offspring(), usize::MAX);
        assert_eq!(skim, 0.5);
    }

    #[test]
    fn find_champion_ignores_non_positive() {
        let (species, organisms) = species_with(&[0.0, 0.0]);
        assert_eq!(species.find_champion(&organisms).unwrap(), None);
        let (species, organisms) = species_with(&[1.0, 3.0, 3.0]);
        assert_eq!(
            species.find_champion(&organisms).unwrap(),
            Some(species.organisms()[1])
        );
    }

    #[test]
    fn novel_species_skip_one_aging() {
        let mut species = Species::new_novel(SpeciesID(1), true);
        species.increment_age();
        assert_eq!((species.age(), species.is_novel()), (1, false));
        species.increment_age();
        assert_eq!(species.age(), 2);
        assert_eq!(species.last_improved(), 2);
    }

    #[test]
    fn report_lists_members() {
        let (mut species, mut organisms) = species_with(&[4.0, 2.0]);
        species.adjust_fitness(&mut organisms, &config(0.0)).unwrap();
        let report = species.report(&organisms).to_string();
        assert!(report.starts_with("Species #0, age=1,"));
        assert!(report.contains("Has 2 Organisms"));
        assert!(report.contains("[champion]"));
        assert!(report.contains("[eliminated]"));
    }

    proptest! {
        #[test]
        fn adjusted_species_invariants(
            fitnesses in prop::collection::vec(-10.0f64..100.0, 1..40),
            survival_threshold in 0.0f64..1.0,
        ) {
            let (mut species, mut organisms) = species_with(&fitnesses);
            species.adjust_fitness(&mut organisms, &config(survival_threshold)).unwrap();

            let members: Vec<&Organism<()>> = species
                .organisms()
                .iter()
                .map(|id| organisms.get(*id).unwrap())
                .collect();
            for pair in members.windows(2) {
                prop_assert!(pair[0].fitness >= pair[1].fitness);
            }

            prop_assert_eq!(members.iter().filter(|o| o.is_champion).count(), 1);
            prop_assert!(members[0].is_champion);

            let parents = (survival_threshold * fitnesses.len() as f64 + 1.0).floor() as usize;
            let eliminated = fitnesses.len().saturating_sub(parents);
            prop_assert_eq!(members.iter().filter(|o| o.to_eliminate).count(), eliminated);
            prop_assert!(members[fitnesses.len() - eliminated..].iter().all(|o| o.to_eliminate));
        }

        #[test]
        fn max_fitness_ever_never_decreases(
            generations in prop::collection::vec(prop::collection::vec(0.0f64..100.0, 1..10), 1..20),
        ) {
            let mut species = Species::new(SpeciesID(0));
            let mut organisms = Organisms::new();
            let mut previous = species.max_fitness_ever();
            for (age, fitnesses) in generations.iter().enumerate() {
                species.organisms.clear();
                for &fitness in fitnesses {
                    let mut o = Organism::new((), age);
                    o.fitness = fitness;
                    species.add_organism(organisms.insert(o));
                }
                species.set_age(age + 1, species.age_of_last_improvement());
                species.adjust_fitness(&mut organisms, &config(0.5)).unwrap();
                prop_assert!(species.max_fitness_ever() >= previous);
                prop_assert!(species.age_of_last_improvement() <= species.age());
                previous = species.max_fitness_ever();
            }
        }

        #[test]
        fn chained_skim_conserves_offspring(
            shares in prop::collection::vec(prop::collection::vec(0.0f64..5.0, 0..10), 1..10),
        ) {
            let mut organisms = Organisms::new();
            let mut all_species = vec![];
            for (i, members) in shares.iter().enumerate() {
                let mut species = Species::new(SpeciesID(i));
                for &share in members {
                    let mut o = Organism::new((), 0);
                    o.expected_offspring = share;
                    species.add_organism(organisms.insert(o));
                }
                all_species.push(species);
            }

            let mut skim = 0.0;
            let mut allotted = 0;
            for species in &mut all_species {
                skim = species.count_offspring(&organisms, skim).unwrap();
                allotted += species.expected_offspring();
            }
            let ideal: f64 = shares.iter().flatten().sum();
            prop_assert!((0.0..1.0 + 1e-9).contains(&skim));
            prop_assert!((allotted as f64 + skim - ideal).abs() < 1e-6);
        }

        #[test]
        fn removal_undoes_addition(count in 0u64..20, extra in 20u64..40) {
            let mut species = Species::new(SpeciesID(0));
            for i in 0..count {
                species.add_organism(OrganismID(i));
            }
            let before = species.organisms().to_vec();
            prop_assert!(species.add_organism(OrganismID(extra)));
            species.remove_organism(OrganismID(extra)).unwrap();
            prop_assert_eq!(species.organisms(), &before[..]);
            prop_assert!(species.remove_organism(OrganismID(extra)).is_err());
            prop_assert_eq!(species.organisms(), &before[..]);
        }
    }
}
