//! Ready made networks used throughout the documentation and the demos.

use crate::error::Result;
use crate::network::Network;

/// Negative autoregulation of a gene by its own protein dimer.
///
/// The dimer `P2` binds the free `gene` into the repressed `P2_gene`, which cannot be
/// transcribed. Transcription makes `mRNA`, translation makes `P`, two `P` make a `P2`.
pub fn gene_regulation() -> Result<Network> {
    Network::new("gene regulation")
        .with_species("gene", 10)?
        .with_species("P2_gene", 0)?
        .with_species("mRNA", 0)?
        .with_species("P", 0)?
        .with_species("P2", 0)?
        .with_reaction("repression binding", 1.0, "gene + P2 --> P2_gene")?
        .with_reaction("reverse repression binding", 10.0, "P2_gene --> gene + P2")?
        .with_reaction("transcription", 0.01, "gene --> gene + mRNA")?
        .with_reaction("translation", 10.0, "mRNA --> mRNA + P")?
        .with_reaction("dimerization", 1.0, "2 P --> P2")?
        .with_reaction("dissociation", 1.0, "P2 --> 2 P")?
        .with_reaction("mRNA degradation", 0.1, "mRNA --> 0")?
        .with_reaction("protein degradation", 0.01, "P --> 0")
}

/// Kendall's birth, death and immigration process on a single species `X`.
pub fn birth_death_immigration(birth: f64, death: f64, immigration: f64, initial: u64) -> Result<Network> {
    Network::new("birth-death-immigration")
        .with_species("X", initial)?
        .with_reaction("birth", birth, "X --> 2 X")?
        .with_reaction("death", death, "X --> 0")?
        .with_reaction("immigration", immigration, "0 --> X")
}

/// Reversible dimerization of a monomer.
pub fn dimerization() -> Result<Network> {
    Network::new("dimerization")
        .with_species("P", 301)?
        .with_species("P2", 0)?
        .with_reaction("dimerization", 0.00166, "2 P --> P2")?
        .with_reaction("dissociation", 0.2, "P2 --> 2 P")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction_network::ReactionNetwork;

    #[test]
    fn builtin_models_compile() {
        for network in [
            gene_regulation().unwrap(),
            birth_death_immigration(2.0, 1.0, 0.5, 5).unwrap(),
            dimerization().unwrap(),
        ] {
            let compiled = ReactionNetwork::compile(&network).unwrap();
            assert_eq!(compiled.num_reactions(), network.num_reactions());
        }
    }

    #[test]
    fn gene_regulation_dependencies() {
        let network = ReactionNetwork::compile(&gene_regulation().unwrap()).unwrap();
        let translation = (0..network.num_reactions())
            .find(|&j| network.reaction_name(j) == "translation")
            .unwrap();
        let dependents: Vec<&str> = network
            .dependents(translation)
            .iter()
            .map(|&j| network.reaction_name(j))
            .collect();
        // translation only makes P
        assert_eq!(dependents, vec!["dimerization", "protein degradation"]);
    }
}
