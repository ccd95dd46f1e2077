//! Line-oriented text formats for reaction networks and initial counts.
//!
//! Reactions are written one per line as `reactants : products : rate`, where each
//! side is a whitespace-separated list of `species count` pairs and may be empty:
//!
//! ```text
//! # dimerization
//! A 2 : B 3 : 1.0
//! B 1 :     : 0.05
//! ```
//!
//! Initial counts are written as `species value`, one per line; anything after the
//! value is ignored.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{ParseError, Result, SimError};
use crate::network::{Reaction, Stoichiometry};

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, raw)| (idx + 1, raw.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn parse_side(side: &str, line: usize) -> Result<Stoichiometry, ParseError> {
    let tokens: Vec<&str> = side.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(ParseError::OddTokens { line });
    }
    let mut out = Stoichiometry::new();
    for pair in tokens.chunks_exact(2) {
        let multiplicity = pair[1]
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidMultiplicity {
                line,
                token: pair[1].to_owned(),
            })?;
        out.add(pair[0], multiplicity);
    }
    Ok(out)
}

/// Parses reaction lines. Rates and multiplicities are checked for range when the
/// reactions are placed into a network.
pub fn parse_reactions(text: &str) -> Result<Vec<Reaction>, ParseError> {
    let mut reactions = Vec::new();
    for (line, content) in content_lines(text) {
        let parts: Vec<&str> = content.split(':').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ParseError::FieldCount {
                line,
                found: parts.len(),
            });
        }
        let reactants = parse_side(parts[0], line)?;
        let products = parse_side(parts[1], line)?;
        let rate = parts[2]
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidRate {
                line,
                token: parts[2].to_owned(),
            })?;
        reactions.push(Reaction::new(reactants, products, rate));
    }
    if reactions.is_empty() {
        return Err(ParseError::Empty { what: "reactions" });
    }
    debug!("parsed {} reactions", reactions.len());
    Ok(reactions)
}

/// Parses initial-count lines into `(species, count)` pairs in file order.
///
/// Lines with fewer than two tokens are skipped. Negative counts are accepted here
/// and rejected when the state is built.
pub fn parse_initial_counts(text: &str) -> Result<Vec<(String, i64)>, ParseError> {
    let mut counts = Vec::new();
    for (line, content) in content_lines(text) {
        let mut tokens = content.split_whitespace();
        let (Some(species), Some(value)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        let count = value.parse::<i64>().map_err(|_| ParseError::InvalidCount {
            line,
            token: value.to_owned(),
        })?;
        counts.push((species.to_owned(), count));
    }
    if counts.is_empty() {
        return Err(ParseError::Empty {
            what: "initial counts",
        });
    }
    debug!("parsed {} initial counts", counts.len());
    Ok(counts)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| SimError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

pub fn load_reactions(path: impl AsRef<Path>) -> Result<Vec<Reaction>> {
    Ok(parse_reactions(&read(path.as_ref())?)?)
}

pub fn load_initial_counts(path: impl AsRef<Path>) -> Result<Vec<(String, i64)>> {
    Ok(parse_initial_counts(&read(path.as_ref())?)?)
}
