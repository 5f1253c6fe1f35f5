mod polynomial;

use oxineat_species::logging::{EvolutionLogger, ReportingLevel, Stats};
use oxineat_species::{Genome, OrganismID, Population, PopulationConfig, RngDraws};
use polynomial::{DegreeHistory, PolyConfig, PolyGenome};

use anyhow::{Context, Result};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use rayon::prelude::*;
use serde::Deserialize;

use std::fs;

const DEFAULT_SETTINGS: &str = include_str!("../config.ron");

type CurvePopulation = Population<PolyConfig, DegreeHistory, PolyGenome>;

#[derive(Deserialize)]
struct Settings {
    seed: u64,
    generations: usize,
    /// Coefficients of the target polynomial, by degree.
    target: Vec<f64>,
    samples: usize,
    target_error: f64,
    population: PopulationConfig,
    genome: PolyConfig,
}

impl Settings {
    /// Reads settings from the RON file at `path`,
    /// or the built-in defaults if there is none.
    fn load(path: Option<String>) -> Result<Settings> {
        let text = match &path {
            Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path))?,
            None => DEFAULT_SETTINGS.to_string(),
        };
        ron::from_str(&text).context("parsing settings")
    }

    /// Samples the target curve at evenly spaced points in [-1, 1].
    fn sample_target(&self) -> Vec<(f64, f64)> {
        let step = 2.0 / self.samples.saturating_sub(1).max(1) as f64;
        (0..self.samples)
            .map(|i| {
                let x = -1.0 + i as f64 * step;
                let y = self
                    .target
                    .iter()
                    .enumerate()
                    .map(|(degree, c)| c * x.powi(degree as i32))
                    .sum::<f64>();
                (x, y)
            })
            .collect()
    }
}

fn mean_squared_error(genome: &PolyGenome, samples: &[(f64, f64)]) -> f64 {
    let polynomial = genome.genesis(0);
    samples
        .iter()
        .map(|(x, y)| (polynomial.evaluate(*x) - y).powi(2))
        .sum::<f64>()
        / samples.len().max(1) as f64
}

fn evaluate(population: &mut CurvePopulation, samples: &[(f64, f64)]) -> Result<()> {
    let scores: Vec<(OrganismID, f64)> = population
        .organisms()
        .iter()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|(id, organism)| (*id, 1.0 / (1.0 + mean_squared_error(&organism.genome, samples))))
        .collect();
    for (id, fitness) in scores {
        population.set_fitness(id, fitness)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load(std::env::args().nth(1))?;
    let samples = settings.sample_target();

    let mut draws = RngDraws::new(ChaCha8Rng::seed_from_u64(settings.seed));
    let mut population: CurvePopulation = Population::new(
        PolyGenome::new(0, &[0, 1]),
        settings.population.clone(),
        settings.genome.clone(),
        &mut draws,
    )?;
    let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);

    let mut best = None;
    for _ in 0..settings.generations {
        evaluate(&mut population, &samples)?;
        logger.log(
            &population,
            &|o| [o.fitness, o.genome.active_terms() as f64],
            ["fitness", "active_terms"],
        );

        let champion = population
            .champion()
            .and_then(|id| population.organisms().get(id))
            .context("population died out")?;
        let error = mean_squared_error(&champion.genome, &samples);
        log::info!(
            "generation {}: {} species, best error {:.6}",
            population.generation(),
            population.species().count(),
            error
        );
        best = Some(champion.genome.clone());
        if error < settings.target_error {
            log::info!("target reached at generation {}", population.generation());
            break;
        }

        population.epoch(&mut draws)?;
    }

    println!(
        "Species count over the run: {:?}",
        Stats::from(logger.iter().map(|snapshot| snapshot.species_count as f64))
    );
    println!(
        "Degrees introduced, in order: {:?}",
        population.history().introduced()
    );
    if let Some(genome) = best {
        println!("Best fit: {}", genome);
        println!("{}", ron::ser::to_string_pretty(&genome, Default::default())?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_parse() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.population.pop_size.get(), 150);
        assert_eq!(settings.genome.max_degree, 6);
    }

    #[test]
    fn target_sampling() {
        let settings = Settings {
            target: vec![1.0, 2.0],
            samples: 3,
            ..Settings::load(None).unwrap()
        };
        assert_eq!(
            settings.sample_target(),
            vec![(-1.0, -1.0), (0.0, 1.0), (1.0, 3.0)]
        );
    }

    #[test]
    fn exact_fit_has_no_error() {
        let samples = [(0.0, 0.0), (1.0, 0.0)];
        assert_eq!(mean_squared_error(&PolyGenome::new(0, &[0, 1]), &samples), 0.0);
    }

    #[test]
    fn short_run_keeps_population_size() {
        let settings = Settings {
            generations: 3,
            ..Settings::load(None).unwrap()
        };
        let samples = settings.sample_target();
        let mut draws = RngDraws::new(ChaCha8Rng::seed_from_u64(settings.seed));
        let mut population: CurvePopulation = Population::new(
            PolyGenome::new(0, &[0, 1]),
            settings.population.clone(),
            settings.genome.clone(),
            &mut draws,
        )
        .unwrap();
        for _ in 0..settings.generations {
            evaluate(&mut population, &samples).unwrap();
            population.epoch(&mut draws).unwrap();
        }
        assert_eq!(population.organisms().len(), 150);
        assert_eq!(population.generation(), 3);
    }
}
