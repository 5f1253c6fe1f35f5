use super::SpeciesID;
use crate::OrganismID;

use thiserror::Error;

/// Violations of species membership and reproduction preconditions.
/// Any of these means the species list and the organism arena have
/// gone out of sync upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeciesError {
    /// The organism is not a member of the species.
    #[error("attempted removal of nonexistant organism {organism:?} from species {species:?}")]
    InvalidRemoval {
        species: SpeciesID,
        organism: OrganismID,
    },
    /// Offspring were allotted to a species without members.
    #[error("attempted reproduction out of empty species {0:?}")]
    EmptySpeciesReproduction(SpeciesID),
    /// A species lists an organism missing from the population.
    #[error("organism {0:?} is not in the population")]
    UnknownOrganism(OrganismID),
    /// No species with this ID exists in the population.
    #[error("species {0:?} is not in the population")]
    UnknownSpecies(SpeciesID),
    /// An organism's expected offspring is infinite or NaN.
    #[error("organism {0:?} has a non-finite offspring share")]
    InvalidOffspringShare(OrganismID),
}

/// Failures of a whole evolution step.
#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("attempted evolution on degenerate population")]
    DegeneratePopulation,
    #[error(transparent)]
    Species(#[from] SpeciesError),
}
