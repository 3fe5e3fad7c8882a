// Molecular formula validation
// A formula is a juxtaposition of recognized atom tokens: <Symbol><optional count>

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use super::mass::{self, Atom, IonMode, ATOMS};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("Molecular formula is blank")]
    Blank,

    #[error("Invalid molecular formula {formula:?}: unrecognized {residue:?}")]
    InvalidFormula { formula: String, residue: String },

    #[error("Invalid ionization mode {0:?}: must be an integer charge")]
    InvalidMode(String),
}

/// Compiled `<Symbol>(\d*)` pattern for one recognized atom
pub(crate) struct AtomToken {
    pub atom: &'static Atom,
    pub pattern: Regex,
}

/// Token patterns for every recognized atom, compiled once
pub(crate) fn atom_tokens() -> &'static [AtomToken] {
    static TOKENS: OnceLock<Vec<AtomToken>> = OnceLock::new();
    TOKENS.get_or_init(|| {
        ATOMS
            .iter()
            .map(|atom| AtomToken {
                atom,
                pattern: Regex::new(&format!("{}(\\d*)", regex::escape(atom.symbol)))
                    .expect("atom symbols are literal patterns"),
            })
            .collect()
    })
}

/// Validate a formula by stripping every recognized token.
///
/// Each recognized symbol removes all of its `<Symbol><digits>` occurrences; whatever
/// is left over is unrecognized. No canonical ordering, parentheses or hydrate
/// notation is understood.
pub fn validate(formula: &str) -> Result<&str, FormulaError> {
    if formula.trim().is_empty() {
        return Err(FormulaError::Blank);
    }

    let mut residue = formula.to_string();
    for token in atom_tokens() {
        residue = token.pattern.replace_all(&residue, "").into_owned();
    }

    if residue.is_empty() {
        Ok(formula)
    } else {
        Err(FormulaError::InvalidFormula {
            formula: formula.to_string(),
            residue,
        })
    }
}

/// A molecular formula that passed validation.
///
/// The only way to build one is through [`Formula::parse`], so holding a `Formula`
/// means the string decomposes into recognized atom tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Formula(String);

impl Formula {
    pub fn parse(formula: &str) -> Result<Self, FormulaError> {
        validate(formula).map(|valid| Formula(valid.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Count of each recognized atom, taken from its first token only
    pub fn atom_counts(&self) -> Vec<(&'static str, u64)> {
        atom_tokens()
            .iter()
            .filter_map(|token| {
                first_count(&token.pattern, &self.0).map(|count| (token.atom.symbol, count as u64))
            })
            .collect()
    }

    pub fn monoisotopic_mass(&self) -> f64 {
        mass::monoisotopic_mass(self)
    }

    pub fn m_z(&self, mode: IonMode) -> f64 {
        mass::charged_mass(self.monoisotopic_mass(), mode)
    }
}

/// Count from the first `<Symbol><digits>` match, 1 when no digits follow
pub(crate) fn first_count(pattern: &Regex, formula: &str) -> Option<f64> {
    let captures = pattern.captures(formula)?;
    let digits = captures.get(1).map_or("", |m| m.as_str());
    if digits.is_empty() {
        Some(1.0)
    } else {
        digits.parse::<f64>().ok()
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

impl TryFrom<String> for Formula {
    type Error = FormulaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)?;
        Ok(Formula(value))
    }
}

impl From<Formula> for String {
    fn from(formula: Formula) -> Self {
        formula.0
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Formula {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_recognized_tokens() {
        for formula in ["C6H6O6", "H2O", "CH4", "C5H5N5", "C10H16N5O13P3", "C2H6OS", "CH3I", "NO", "P"] {
            assert!(validate(formula).is_ok(), "{} should be valid", formula);
        }
    }

    #[test]
    fn test_validate_accepts_any_order_and_repeats() {
        assert!(validate("O6H6C6").is_ok());
        assert!(validate("CH3COOH").is_ok());
    }

    #[test]
    fn test_validate_rejects_unrecognized_atom() {
        let err = validate("C6Z6O6").unwrap_err();
        assert_eq!(
            err,
            FormulaError::InvalidFormula {
                formula: "C6Z6O6".to_string(),
                residue: "Z6".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_rejects_two_letter_elements() {
        // C and l are split: C is stripped, l remains
        assert!(matches!(
            validate("NaCl"),
            Err(FormulaError::InvalidFormula { .. })
        ));
        assert!(validate("C2H5Br").is_err());
    }

    #[test]
    fn test_validate_rejects_grouping_and_whitespace() {
        assert!(validate("Ca(OH)2").is_err());
        assert!(validate("CuSO4·5H2O").is_err());
        assert!(validate("C6 H6").is_err());
        assert!(validate("c6h6").is_err());
    }

    #[test]
    fn test_validate_rejects_blank() {
        assert_eq!(validate(""), Err(FormulaError::Blank));
        assert_eq!(validate("   "), Err(FormulaError::Blank));
    }

    #[test]
    fn test_electron_is_not_a_formula_token() {
        assert!(validate("C6H6O6e").is_err());
    }

    #[test]
    fn test_formula_parse_and_display() {
        let formula = Formula::parse("C6H6O6").unwrap();
        assert_eq!(formula.as_str(), "C6H6O6");
        assert_eq!(formula.to_string(), "C6H6O6");
        assert!(formula == *"C6H6O6");
        assert!("C6Z6O6".parse::<Formula>().is_err());
    }

    #[test]
    fn test_atom_counts_use_first_token() {
        let formula = Formula::parse("C6H12O6").unwrap();
        assert_eq!(formula.atom_counts(), vec![("H", 12), ("C", 6), ("O", 6)]);

        // Only the first C group is counted
        let acetic = Formula::parse("CH3COOH").unwrap();
        assert_eq!(acetic.atom_counts(), vec![("H", 3), ("C", 1), ("O", 1)]);
    }

    #[test]
    fn test_formula_serde_validates() {
        let formula: Formula = serde_json::from_str("\"C6H6O6\"").unwrap();
        assert_eq!(formula.as_str(), "C6H6O6");
        assert_eq!(serde_json::to_string(&formula).unwrap(), "\"C6H6O6\"");

        let invalid: Result<Formula, _> = serde_json::from_str("\"C6Z6O6\"");
        assert!(invalid.is_err());
    }
}
