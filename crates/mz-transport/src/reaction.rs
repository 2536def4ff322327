//! First-order inter-species reaction network.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// One first-order reaction: species `from` produces species `to` at
/// `rate` (1/s). A reaction with `from == to` and a negative rate models
/// self-consumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub from: usize,
    pub to: usize,
    pub rate: f64,
}

/// Collection of first-order reactions, assembled into the dense rate
/// matrix `K[to][from]` consumed by the coupled contaminant solve:
///
/// `dC_α/dt = Σ_β K[α][β] · C_β`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionNetwork {
    reactions: Vec<Reaction>,
}

impl ReactionNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, from: usize, to: usize, rate: f64) {
        self.reactions.push(Reaction { from, to, rate });
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    /// Dense `K[to][from]` for `num_species`; reactions referencing species
    /// outside the range are ignored.
    pub fn build_matrix(&self, num_species: usize) -> DMatrix<f64> {
        let mut k = DMatrix::zeros(num_species, num_species);
        for rxn in &self.reactions {
            if rxn.from < num_species && rxn.to < num_species {
                k[(rxn.to, rxn.from)] += rxn.rate;
            }
        }
        k
    }
}
