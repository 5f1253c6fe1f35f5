//! Test doubles: a one-dimensional genome that records every
//! operation applied to it, and a draw source with scripted values.
use crate::{Draws, Genome, InnovationHistory, WeightMutation};

use rand::{Rng, RngCore};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

use std::collections::VecDeque;

/// A genome that is just a point on a line. Compatibility is
/// the distance between points.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MockGenome {
    pub id: usize,
    pub position: f64,
    pub operations: Vec<String>,
}

impl MockGenome {
    pub fn new(id: usize, position: f64) -> MockGenome {
        MockGenome {
            id,
            position,
            operations: vec![],
        }
    }

    pub fn at(position: f64) -> MockGenome {
        MockGenome::new(0, position)
    }

    fn offspring(&self, new_id: usize, operation: String) -> MockGenome {
        MockGenome {
            id: new_id,
            position: self.position,
            operations: vec![operation],
        }
    }
}

/// Non-structural mutations move a genome by
/// between 0.5 and 1.5 times `drift`.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockConfig {
    pub drift: f64,
}

#[derive(Debug, Default)]
pub(crate) struct MockHistory {
    pub nodes_added: usize,
    pub links_added: usize,
}

impl InnovationHistory for MockHistory {
    type Config = MockConfig;

    fn new(_: &MockConfig) -> MockHistory {
        MockHistory::default()
    }
}

impl Genome for MockGenome {
    type Config = MockConfig;
    type InnovationHistory = MockHistory;
    type Phenotype = usize;

    fn id(&self) -> usize {
        self.id
    }

    fn duplicate(&self, new_id: usize) -> MockGenome {
        let mut copy = self.clone();
        copy.id = new_id;
        copy.operations.push("duplicate".into());
        copy
    }

    fn compatibility(&self, other: &MockGenome, _: &MockConfig) -> f64 {
        (self.position - other.position).abs()
    }

    fn mutate_add_node(&mut self, history: &mut MockHistory, _: &mut dyn RngCore) {
        history.nodes_added += 1;
        self.operations.push("add_node".into());
    }

    fn mutate_add_link(
        &mut self,
        phenotype: &usize,
        history: &mut MockHistory,
        tries: usize,
        _: &mut dyn RngCore,
    ) {
        history.links_added += 1;
        self.operations.push(format!("add_link@{}x{}", phenotype, tries));
    }

    fn mutate_link_weights(
        &mut self,
        _power: f64,
        _rate: f64,
        mode: WeightMutation,
        _: &mut dyn RngCore,
    ) {
        self.operations.push(format!("weights {:?}", mode));
    }

    fn mutate_all_nonstructural(&mut self, config: &MockConfig, rng: &mut dyn RngCore) {
        self.position += config.drift * (0.5 + rng.gen::<f64>());
        self.operations.push("nonstructural".into());
    }

    fn mate_multipoint(
        &self,
        other: &MockGenome,
        new_id: usize,
        _: f64,
        _: f64,
        _: &mut dyn RngCore,
    ) -> MockGenome {
        self.offspring(new_id, format!("multipoint x{}", other.id))
    }

    fn mate_multipoint_avg(
        &self,
        other: &MockGenome,
        new_id: usize,
        _: f64,
        _: f64,
        _: &mut dyn RngCore,
    ) -> MockGenome {
        self.offspring(new_id, format!("multipoint_avg x{}", other.id))
    }

    fn mate_singlepoint(&self, other: &MockGenome, new_id: usize, _: &mut dyn RngCore) -> MockGenome {
        self.offspring(new_id, format!("singlepoint x{}", other.id))
    }

    fn genesis(&self, generation: usize) -> usize {
        generation
    }
}

/// Returns the given uniform and Gaussian values in order,
/// panicking once they run out. Genome operations get a
/// fixed-seed generator.
pub(crate) struct ScriptedDraws {
    uniforms: VecDeque<f64>,
    gaussians: VecDeque<f64>,
    rng: ChaCha8Rng,
}

impl ScriptedDraws {
    pub fn new(uniforms: &[f64], gaussians: &[f64]) -> ScriptedDraws {
        ScriptedDraws {
            uniforms: uniforms.iter().copied().collect(),
            gaussians: gaussians.iter().copied().collect(),
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    /// Whether every scripted value has been drawn.
    pub fn exhausted(&self) -> bool {
        self.uniforms.is_empty() && self.gaussians.is_empty()
    }
}

impl Draws for ScriptedDraws {
    fn uniform(&mut self) -> f64 {
        self.uniforms.pop_front().expect("ran out of uniform draws")
    }

    fn std_gaussian(&mut self) -> f64 {
        self.gaussians.pop_front().expect("ran out of gaussian draws")
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }
}
