//! Parser for reaction formulas like `2 A + B --> C` and `0 --> X`.

use super::reaction::term::Term;
use super::species::{Count, Name};
use crate::error::{Result, SimError};

const ARROWS: [&str; 2] = ["-->", "->"];

/// Splits a formula into its reactant and product terms.
pub fn parse(formula: &str) -> Result<(Vec<Term>, Vec<Term>)> {
    let fail = |reason: &str| SimError::Formula {
        formula: formula.to_string(),
        reason: reason.to_string(),
    };

    let arrow = ARROWS
        .iter()
        .find(|arrow| formula.contains(**arrow))
        .ok_or_else(|| fail("missing `-->`"))?;

    let mut sides = formula.splitn(2, arrow);
    let lhs = sides.next().unwrap_or_default();
    let rhs = sides.next().unwrap_or_default();
    if ARROWS.iter().any(|a| rhs.contains(a)) {
        return Err(fail("more than one arrow"));
    }

    let reactants = parse_side(lhs).map_err(|reason| fail(&reason))?;
    let products = parse_side(rhs).map_err(|reason| fail(&reason))?;
    Ok((reactants, products))
}

fn parse_side(side: &str) -> std::result::Result<Vec<Term>, String> {
    let side = side.trim();
    if side.is_empty() || side == "0" || side == "∅" {
        return Ok(Vec::new());
    }

    side.split('+').map(parse_term).collect()
}

fn parse_term(term: &str) -> std::result::Result<Term, String> {
    let term = term.trim();
    if term.is_empty() {
        return Err("empty term".to_string());
    }

    let digits = term.chars().take_while(|c| c.is_ascii_digit()).count();
    let (coefficient, rest) = if digits == 0 {
        (1, term)
    } else {
        let coefficient: u64 = term[..digits]
            .parse()
            .map_err(|_| format!("coefficient in `{}` is too large", term))?;
        let rest = term[digits..].trim_start();
        (coefficient, rest.strip_prefix('*').unwrap_or(rest).trim_start())
    };

    if coefficient == 0 {
        return Err(format!("zero coefficient in `{}`", term));
    }
    if !is_identifier(rest) {
        return Err(format!("`{}` is not a species name", rest));
    }

    Ok(Term::new(Name(rest.to_string()), Count(coefficient)))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(name: &str, coefficient: u64) -> Term {
        Term::new(Name::from(name), Count(coefficient))
    }

    #[test]
    fn parses_binding_reaction() {
        let (reactants, products) = parse("gene + P2 --> P2_gene").unwrap();
        assert_eq!(reactants, vec![term("gene", 1), term("P2", 1)]);
        assert_eq!(products, vec![term("P2_gene", 1)]);
    }

    #[test]
    fn parses_coefficients_in_every_spelling() {
        let (reactants, products) = parse("2 P --> P2").unwrap();
        assert_eq!(reactants, vec![term("P", 2)]);
        assert_eq!(products, vec![term("P2", 1)]);

        let (reactants, _) = parse("2P -> P2").unwrap();
        assert_eq!(reactants, vec![term("P", 2)]);

        let (reactants, _) = parse("3*A --> 0").unwrap();
        assert_eq!(reactants, vec![term("A", 3)]);
    }

    #[test]
    fn empty_sides() {
        let (reactants, products) = parse("0 --> X").unwrap();
        assert!(reactants.is_empty());
        assert_eq!(products, vec![term("X", 1)]);

        let (reactants, products) = parse("mRNA --> ∅").unwrap();
        assert_eq!(reactants, vec![term("mRNA", 1)]);
        assert!(products.is_empty());

        let (_, products) = parse("X -->").unwrap();
        assert!(products.is_empty());
    }

    #[test]
    fn dotted_names_are_species() {
        let (reactants, _) = parse("setup.call --> 0").unwrap();
        assert_eq!(reactants, vec![term("setup.call", 1)]);
    }

    #[test]
    fn rejects_malformed_formulas() {
        assert!(matches!(parse("A + B"), Err(SimError::Formula { .. })));
        assert!(parse("A --> B --> C").is_err());
        assert!(parse("A + --> B").is_err());
        assert!(parse("0 A --> B").is_err());
        assert!(parse("A --> 2").is_err());
        assert!(parse("A-B --> C").is_err());
    }
}
