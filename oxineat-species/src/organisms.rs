//! Organisms and the arena that owns them.
//!
//! Species refer to their members by [`OrganismID`], and organisms
//! refer back to their species by [`SpeciesID`], so neither owns
//! the other.
use crate::populations::{SpeciesError, SpeciesID};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::fmt;

/// Organism identifier, unique within a population's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganismID(pub u64);

/// A genome together with its evaluated fitness and
/// reproduction status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organism<G> {
    pub genome: G,
    /// Fitness, modified in place by fitness sharing and penalties.
    pub fitness: f64,
    /// Fitness as evaluated, before any adjustment.
    pub original_fitness: f64,
    /// The organism's share of the next generation's offspring.
    pub expected_offspring: f64,
    /// Generation in which the organism was born.
    pub generation: usize,
    /// Best performer of its species.
    pub is_champion: bool,
    /// Ranked too low to become a parent.
    pub to_eliminate: bool,
    /// Remaining guaranteed clones of a population-level champion.
    pub super_champ_offspring: usize,
    pub is_population_champion: bool,
    pub is_population_champion_child: bool,
    /// Fitness inherited from a population champion parent.
    pub highest_fitness: f64,
    /// Born from a structural mutation.
    pub mutation_struct_baby: bool,
    /// Born from crossover.
    pub mate_baby: bool,
    species: Option<SpeciesID>,
}

impl<G> Organism<G> {
    /// Returns a new unevaluated organism.
    pub fn new(genome: G, generation: usize) -> Organism<G> {
        Organism {
            genome,
            fitness: 0.0,
            original_fitness: 0.0,
            expected_offspring: 0.0,
            generation,
            is_champion: false,
            to_eliminate: false,
            super_champ_offspring: 0,
            is_population_champion: false,
            is_population_champion_child: false,
            highest_fitness: 0.0,
            mutation_struct_baby: false,
            mate_baby: false,
            species: None,
        }
    }

    /// Returns the species the organism currently belongs to.
    pub fn species(&self) -> Option<SpeciesID> {
        self.species
    }

    pub(crate) fn set_species(&mut self, species: Option<SpeciesID>) {
        self.species = species;
    }
}

impl<G> fmt::Display for Organism<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Organism born {}, fitness={:.3}, original_fitness={:.3}, expected_offspring={:.3}",
            self.generation, self.fitness, self.original_fitness, self.expected_offspring
        )?;
        if self.is_champion {
            write!(f, " [champion]")?;
        }
        if self.to_eliminate {
            write!(f, " [eliminated]")?;
        }
        Ok(())
    }
}

/// Arena owning every organism of a population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisms<G> {
    members: HashMap<OrganismID, Organism<G>, RandomState>,
    next_id: u64,
}

impl<G> Organisms<G> {
    /// Creates an empty arena.
    ///
    /// # Examples
    /// ```
    /// use oxineat_species::{Organism, Organisms};
    ///
    /// let mut organisms = Organisms::new();
    /// let id = organisms.insert(Organism::new("genome", 0));
    ///
    /// assert_eq!(organisms.len(), 1);
    /// assert_eq!(organisms.get(id).unwrap().genome, "genome");
    /// ```
    pub fn new() -> Organisms<G> {
        Organisms {
            members: HashMap::default(),
            next_id: 0,
        }
    }

    /// Adds an organism and returns its newly issued ID.
    pub fn insert(&mut self, organism: Organism<G>) -> OrganismID {
        let id = OrganismID(self.next_id);
        self.next_id += 1;
        self.members.insert(id, organism);
        id
    }

    /// Removes and returns an organism.
    pub fn remove(&mut self, id: OrganismID) -> Option<Organism<G>> {
        self.members.remove(&id)
    }

    pub fn get(&self, id: OrganismID) -> Option<&Organism<G>> {
        self.members.get(&id)
    }

    pub fn get_mut(&mut self, id: OrganismID) -> Option<&mut Organism<G>> {
        self.members.get_mut(&id)
    }

    /// Like [`get`](Organisms::get), but a missing organism is
    /// reported as an arena/species desynchronization.
    pub(crate) fn member(&self, id: OrganismID) -> Result<&Organism<G>, SpeciesError> {
        self.members.get(&id).ok_or(SpeciesError::UnknownOrganism(id))
    }

    pub(crate) fn member_mut(&mut self, id: OrganismID) -> Result<&mut Organism<G>, SpeciesError> {
        self.members
            .get_mut(&id)
            .ok_or(SpeciesError::UnknownOrganism(id))
    }

    pub fn contains(&self, id: OrganismID) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns an iterator over all organisms.
    /// No ordering is guaranteed.
    pub fn iter(&self) -> impl Iterator<Item = (OrganismID, &Organism<G>)> {
        self.members.iter().map(|(id, o)| (*id, o))
    }
}

impl<G> Default for Organisms<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let mut organisms = Organisms::new();
        let a = organisms.insert(Organism::new(1, 0));
        let b = organisms.insert(Organism::new(2, 0));
        assert_ne!(a, b);
        assert_eq!(organisms.remove(a).map(|o| o.genome), Some(1));
        let c = organisms.insert(Organism::new(3, 0));
        assert_ne!(a, c);
        assert_ne!(b, c);
        assert!(!organisms.contains(a));
        assert_eq!(organisms.len(), 2);
    }

    #[test]
    fn missing_member_is_an_error() {
        let organisms = Organisms::<u8>::new();
        assert!(matches!(
            organisms.member(OrganismID(3)),
            Err(SpeciesError::UnknownOrganism(OrganismID(3)))
        ));
    }

    #[test]
    fn new_organism_is_unflagged() {
        let o = Organism::new((), 4);
        assert_eq!(o.generation, 4);
        assert_eq!(o.species(), None);
        assert!(!o.is_champion && !o.to_eliminate && !o.mate_baby && !o.mutation_struct_baby);
        assert_eq!(o.super_champ_offspring, 0);
    }
}
