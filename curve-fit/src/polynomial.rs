use oxineat_species::{Genome, InnovationHistory, WeightMutation};

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use std::fmt;

/// A single `coefficient * x^degree` term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub degree: u32,
    pub coefficient: f64,
    pub enabled: bool,
}

/// Configuration for polynomial genomes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolyConfig {
    /// Highest degree a term may have.
    pub max_degree: u32,
    /// Chance of each coefficient being perturbed
    /// by a non-structural mutation.
    pub weight_mutation_rate: f64,
    pub weight_mutation_power: f64,
    /// Chance of each term being switched on or off
    /// by a non-structural mutation.
    pub toggle_chance: f64,
    pub disjoint_factor: f64,
    pub coefficient_factor: f64,
}

/// Keeps track of the degrees introduced
/// into the population, in order.
#[derive(Debug)]
pub struct DegreeHistory {
    max_degree: u32,
    introduced: Vec<u32>,
}

impl DegreeHistory {
    fn record(&mut self, degree: u32) {
        if !self.introduced.contains(&degree) {
            log::debug!("degree {} introduced", degree);
            self.introduced.push(degree);
        }
    }

    pub fn introduced(&self) -> &[u32] {
        &self.introduced
    }
}

impl InnovationHistory for DegreeHistory {
    type Config = PolyConfig;

    fn new(config: &PolyConfig) -> DegreeHistory {
        DegreeHistory {
            max_degree: config.max_degree,
            introduced: vec![],
        }
    }
}

/// The expressed polynomial: enabled terms only.
pub struct Polynomial {
    terms: Vec<(u32, f64)>,
}

impl Polynomial {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.terms
            .iter()
            .map(|&(degree, coefficient)| coefficient * x.powi(degree as i32))
            .sum()
    }

    fn expresses(&self, degree: u32) -> bool {
        self.terms.iter().any(|&(d, _)| d == degree)
    }
}

/// A genome encoding a polynomial as a list of terms,
/// sorted by degree. Each degree appears at most once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolyGenome {
    id: usize,
    terms: Vec<Term>,
}

impl PolyGenome {
    /// Creates a genome with enabled, zero-valued
    /// terms of the given degrees.
    pub fn new(id: usize, degrees: &[u32]) -> PolyGenome {
        PolyGenome::from_terms(
            id,
            degrees
                .iter()
                .map(|&degree| Term {
                    degree,
                    coefficient: 0.0,
                    enabled: true,
                })
                .collect(),
        )
    }

    fn from_terms(id: usize, mut terms: Vec<Term>) -> PolyGenome {
        terms.sort_by_key(|t| t.degree);
        terms.dedup_by_key(|t| t.degree);
        PolyGenome { id, terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn active_terms(&self) -> usize {
        self.terms.iter().filter(|t| t.enabled).count()
    }

    fn insert(&mut self, term: Term) {
        match self.terms.binary_search_by_key(&term.degree, |t| t.degree) {
            Ok(i) => self.terms[i] = term,
            Err(i) => self.terms.insert(i, term),
        }
    }

    /// Pairs up the terms of two genomes by degree.
    fn align<'a>(&'a self, other: &'a PolyGenome) -> Vec<(Option<&'a Term>, Option<&'a Term>)> {
        let mut aligned = Vec::with_capacity(self.terms.len().max(other.terms.len()));
        let (mut a, mut b) = (self.terms.iter().peekable(), other.terms.iter().peekable());
        loop {
            let degrees = (a.peek().map(|t| t.degree), b.peek().map(|t| t.degree));
            let pair = match degrees {
                (None, None) => break,
                (Some(_), None) => (a.next(), None),
                (None, Some(_)) => (None, b.next()),
                (Some(x), Some(y)) if x < y => (a.next(), None),
                (Some(x), Some(y)) if x > y => (None, b.next()),
                _ => (a.next(), b.next()),
            };
            aligned.push(pair);
        }
        aligned
    }
}

impl Genome for PolyGenome {
    type Config = PolyConfig;
    type InnovationHistory = DegreeHistory;
    type Phenotype = Polynomial;

    fn id(&self) -> usize {
        self.id
    }

    fn duplicate(&self, new_id: usize) -> PolyGenome {
        PolyGenome {
            id: new_id,
            terms: self.terms.clone(),
        }
    }

    fn compatibility(&self, other: &PolyGenome, config: &PolyConfig) -> f64 {
        let mut disjoint = 0;
        let mut matching = 0;
        let mut difference = 0.0;
        for pair in self.align(other) {
            match pair {
                (Some(a), Some(b)) => {
                    matching += 1;
                    difference += (a.coefficient - b.coefficient).abs();
                }
                _ => disjoint += 1,
            }
        }
        let size = self.terms.len().max(other.terms.len()).max(1) as f64;
        let mean_difference = if matching > 0 {
            difference / matching as f64
        } else {
            0.0
        };
        config.disjoint_factor * disjoint as f64 / size + config.coefficient_factor * mean_difference
    }

    /// Appends a term one degree above the current highest.
    fn mutate_add_node(&mut self, history: &mut DegreeHistory, rng: &mut dyn RngCore) {
        let degree = self.terms.last().map_or(0, |t| t.degree + 1);
        if degree > history.max_degree {
            return;
        }
        history.record(degree);
        self.insert(Term {
            degree,
            coefficient: rng.sample(StandardNormal),
            enabled: true,
        });
    }

    /// Expresses a random degree the polynomial lacks, either by
    /// re-enabling its term or by adding a new one.
    fn mutate_add_link(
        &mut self,
        phenotype: &Polynomial,
        history: &mut DegreeHistory,
        tries: usize,
        rng: &mut dyn RngCore,
    ) {
        for _ in 0..tries {
            let degree = rng.gen_range(0..=history.max_degree);
            if phenotype.expresses(degree) {
                continue;
            }
            match self.terms.iter_mut().find(|t| t.degree == degree) {
                Some(term) => term.enabled = true,
                None => {
                    history.record(degree);
                    self.insert(Term {
                        degree,
                        coefficient: rng.sample(StandardNormal),
                        enabled: true,
                    });
                }
            }
            return;
        }
    }

    fn mutate_link_weights(
        &mut self,
        power: f64,
        rate: f64,
        mode: WeightMutation,
        rng: &mut dyn RngCore,
    ) {
        for term in &mut self.terms {
            if rng.gen::<f64>() < rate {
                let noise = rng.sample::<f64, _>(StandardNormal) * power;
                match mode {
                    WeightMutation::Gaussian => term.coefficient += noise,
                    WeightMutation::ColdGaussian => term.coefficient = noise,
                }
            }
        }
    }

    fn mutate_all_nonstructural(&mut self, config: &PolyConfig, rng: &mut dyn RngCore) {
        self.mutate_link_weights(
            config.weight_mutation_power,
            config.weight_mutation_rate,
            WeightMutation::Gaussian,
            rng,
        );
        for term in &mut self.terms {
            if rng.gen::<f64>() < config.toggle_chance {
                term.enabled = !term.enabled;
            }
        }
    }

    /// Matching terms come from a random parent, unmatched
    /// terms from the fitter one (from both on a tie).
    fn mate_multipoint(
        &self,
        other: &PolyGenome,
        new_id: usize,
        fitness: f64,
        other_fitness: f64,
        rng: &mut dyn RngCore,
    ) -> PolyGenome {
        let terms = self
            .align(other)
            .into_iter()
            .filter_map(|pair| match pair {
                (Some(a), Some(b)) => Some(if rng.gen::<bool>() { a } else { b }),
                (Some(a), None) if fitness >= other_fitness => Some(a),
                (None, Some(b)) if other_fitness >= fitness => Some(b),
                _ => None,
            })
            .cloned()
            .collect();
        PolyGenome::from_terms(new_id, terms)
    }

    /// As [`mate_multipoint`](Genome::mate_multipoint), but matching
    /// coefficients are averaged.
    fn mate_multipoint_avg(
        &self,
        other: &PolyGenome,
        new_id: usize,
        fitness: f64,
        other_fitness: f64,
        rng: &mut dyn RngCore,
    ) -> PolyGenome {
        let terms = self
            .align(other)
            .into_iter()
            .filter_map(|pair| match pair {
                (Some(a), Some(b)) => Some(Term {
                    degree: a.degree,
                    coefficient: (a.coefficient + b.coefficient) / 2.0,
                    enabled: if rng.gen::<bool>() { a.enabled } else { b.enabled },
                }),
                (Some(a), None) if fitness >= other_fitness => Some(a.clone()),
                (None, Some(b)) if other_fitness >= fitness => Some(b.clone()),
                _ => None,
            })
            .collect();
        PolyGenome::from_terms(new_id, terms)
    }

    /// Terms below a random degree come from `self`,
    /// the rest from `other`.
    fn mate_singlepoint(&self, other: &PolyGenome, new_id: usize, rng: &mut dyn RngCore) -> PolyGenome {
        let highest = self
            .terms
            .iter()
            .chain(&other.terms)
            .map(|t| t.degree)
            .max()
            .unwrap_or(0);
        let point = rng.gen_range(0..=highest);
        let terms = self
            .terms
            .iter()
            .filter(|t| t.degree < point)
            .chain(other.terms.iter().filter(|t| t.degree >= point))
            .cloned()
            .collect();
        PolyGenome::from_terms(new_id, terms)
    }

    fn genesis(&self, _generation: usize) -> Polynomial {
        Polynomial {
            terms: self
                .terms
                .iter()
                .filter(|t| t.enabled)
                .map(|t| (t.degree, t.coefficient))
                .collect(),
        }
    }
}

impl fmt::Display for PolyGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms = self.terms.iter().filter(|t| t.enabled).peekable();
        if terms.peek().is_none() {
            return write!(f, "0");
        }
        for (i, term) in terms.enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            match term.degree {
                0 => write!(f, "{:.3}", term.coefficient)?,
                1 => write!(f, "{:.3}x", term.coefficient)?,
                d => write!(f, "{:.3}x^{}", term.coefficient, d)?,
            }
        }
        Ok(())
    }
}
