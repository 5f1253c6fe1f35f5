use super::{Population, SpeciesID};

use crate::genome::Genome;
use crate::Organism;

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug)]
pub enum ReportingLevel {
    /// Clones every species' report, including its members.
    AllSpecies,
    /// Clones species reports and their champions' genomes.
    SpeciesChampions,
    /// Clones only the population champion.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A snapshot of a population.
#[derive(Clone, Debug)]
pub struct Log<G> {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord<G>,
    pub species_count: usize,
    pub organism_stats: Vec<(String, Option<Stats>)>,
}

impl<G> fmt::Display for Log<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Log {{")?;
        writeln!(f, "\tgeneration_number: {:?}", self.generation_number)?;
        writeln!(f, "\tspecies_count: {:?}", self.species_count)?;
        for (name, stats) in &self.organism_stats {
            writeln!(f, "\t{}: {:?}", name, stats)?;
        }
        write!(f, "}}")
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f64,
    pub minimum: f64,
    pub mean: f64,
    pub median: f64,
}

impl Stats {
    /// Returns statistics about numbers in a sequence,
    /// or `None` if it is empty.
    ///
    /// # Examples
    /// ```
    /// use oxineat_species::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied()).unwrap();
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    ///
    /// assert!(Stats::from(std::iter::empty()).is_none());
    /// ```
    pub fn from(data: impl Iterator<Item = f64>) -> Option<Stats> {
        let mut data: Vec<f64> = data.collect();
        if data.is_empty() {
            return None;
        }
        data.sort_by(|a, b| a.total_cmp(b));
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Some(Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f64>() / data.len() as f64,
            median,
        })
    }
}

/// Human-readable summary of a species.
#[derive(Clone, Debug)]
pub struct SpeciesReport {
    pub id: SpeciesID,
    pub age: usize,
    pub avg_fitness: f64,
    pub max_fitness: f64,
    pub max_fitness_ever: f64,
    pub expected_offspring: usize,
    pub age_of_last_improvement: usize,
    /// One line per member, best first.
    pub members: Vec<String>,
}

impl fmt::Display for SpeciesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Species #{}, age={}, avg_fitness={:.3}, max_fitness={:.3}, max_fitness_ever={:.3}, \
            expected_offspring={}, age_of_last_improvement={}",
            self.id.0,
            self.age,
            self.avg_fitness,
            self.max_fitness,
            self.max_fitness_ever,
            self.expected_offspring,
            self.age_of_last_improvement
        )?;
        writeln!(f, "Has {} Organisms", self.members.len())?;
        for member in &self.members {
            writeln!(f, "{}", member)?;
        }
        Ok(())
    }
}

/// A reporting-level dependant store
/// of species and genomes from a population.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord<G> {
    /// Full species reports.
    Species(Vec<SpeciesReport>),
    /// Species reports without members, and the
    /// genome of each species' champion.
    SpeciesChampions(Vec<(SpeciesReport, Option<G>)>),
    /// Only population champion.
    PopulationChampion(Option<G>),
    /// Empty.
    None,
}

/// A log of the evolution of a population over time.
#[derive(Clone, Debug)]
pub struct EvolutionLogger<G> {
    reporting_level: ReportingLevel,
    logs: Vec<Log<G>>,
}

impl<G: Genome + Clone> EvolutionLogger<G> {
    /// Returns a logger with the appropiate reporting level.
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger<G> {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of a population.
    ///
    /// The `stat_extractor` provides a way of
    /// obtaining arbitrary statistics on the population's
    /// organisms, where each statistic is named by `stat_names`.
    pub fn log<const N: usize>(
        &mut self,
        population: &Population<G::Config, G::InnovationHistory, G>,
        stat_extractor: &impl Fn(&Organism<G>) -> [f64; N],
        stat_names: [&str; N],
    ) {
        let organisms = population.organisms();
        let mut columns = vec![Vec::new(); N];
        for species in population.species() {
            for organism in species.organisms().iter().filter_map(|id| organisms.get(*id)) {
                for (column, value) in columns.iter_mut().zip(stat_extractor(organism)) {
                    column.push(value);
                }
            }
        }
        let organism_stats = stat_names
            .iter()
            .map(|name| name.to_string())
            .zip(columns)
            .map(|(name, data)| (name, Stats::from(data.into_iter())))
            .collect();

        let champion_genome = |id| organisms.get(id).map(|o| o.genome.clone());
        let generation_sample = match self.reporting_level {
            ReportingLevel::AllSpecies => GenerationMemberRecord::Species(
                population.species().map(|s| s.report(organisms)).collect(),
            ),
            ReportingLevel::SpeciesChampions => GenerationMemberRecord::SpeciesChampions(
                population
                    .species()
                    .map(|s| {
                        let mut report = s.report(organisms);
                        report.members.clear();
                        let champion = s.organisms().first().copied().and_then(champion_genome);
                        (report, champion)
                    })
                    .collect(),
            ),
            ReportingLevel::PopulationChampion => GenerationMemberRecord::PopulationChampion(
                population.champion().and_then(champion_genome),
            ),
            ReportingLevel::NoGenomes => GenerationMemberRecord::None,
        };

        let snapshot = Log {
            generation_number: population.generation(),
            generation_sample,
            species_count: population.species().count(),
            organism_stats,
        };
        log::debug!("{}", snapshot);
        self.logs.push(snapshot);
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log<G>> {
        self.logs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_even_length_median() {
        let stats = Stats::from([4.0, 1.0, 3.0, 2.0].into_iter()).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
        assert_eq!((stats.minimum, stats.maximum), (1.0, 4.0));
    }

    #[test]
    fn log_display_lists_stats() {
        let log = Log::<()> {
            generation_number: 3,
            generation_sample: GenerationMemberRecord::None,
            species_count: 2,
            organism_stats: vec![("fitness".into(), Stats::from([1.0].into_iter()))],
        };
        let text = log.to_string();
        assert!(text.contains("generation_number: 3"));
        assert!(text.contains("fitness: Some(Stats"));
    }
}
