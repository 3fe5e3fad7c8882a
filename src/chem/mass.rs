// Monoisotopic mass and m/z calculation
// Fixed table of most-abundant-isotope masses for the recognized atoms

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::formula::{atom_tokens, first_count, Formula, FormulaError};

/// A recognized atom and its monoisotopic mass
#[derive(Debug)]
pub struct Atom {
    pub symbol: &'static str,
    pub monoisotopic_mass: f64,
}

/// Electron mass, used only for ion arithmetic; never a formula token
pub const ELECTRON_MASS: f64 = 0.00054857990943;

pub const HYDROGEN_MASS: f64 = 1.00782503224;

// Atoms recognized in molecular formulas
pub const ATOMS: &[Atom] = &[
    Atom {
        symbol: "H",
        monoisotopic_mass: HYDROGEN_MASS,
    },
    Atom {
        symbol: "C",
        monoisotopic_mass: 12.0,
    },
    Atom {
        symbol: "N",
        monoisotopic_mass: 14.0030740052,
    },
    Atom {
        symbol: "O",
        monoisotopic_mass: 15.9949146221,
    },
    Atom {
        symbol: "P",
        monoisotopic_mass: 30.97376151,
    },
    Atom {
        symbol: "S",
        monoisotopic_mass: 31.972072,
    },
    Atom {
        symbol: "I",
        monoisotopic_mass: 126.904457,
    },
];

/// Monoisotopic mass of a validated formula.
///
/// Each atom contributes the count of its FIRST token only. A formula that repeats an
/// element in disjoint groups (`CH3COOH`) is therefore under-counted; callers relying
/// on exact masses should store formulas in condensed Hill-like form.
pub fn monoisotopic_mass(formula: &Formula) -> f64 {
    atom_tokens()
        .iter()
        .filter_map(|token| {
            first_count(&token.pattern, formula.as_str())
                .map(|count| count * token.atom.monoisotopic_mass)
        })
        .sum()
}

/// Integer ionization charge, e.g. -1 for [M-H]- or +1 for [M+H]+
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IonMode(i32);

impl IonMode {
    pub const NEUTRAL: IonMode = IonMode(0);
    pub const NEGATIVE: IonMode = IonMode(-1);
    pub const POSITIVE: IonMode = IonMode(1);

    pub fn new(charge: i32) -> Self {
        IonMode(charge)
    }

    pub fn charge(&self) -> i32 {
        self.0
    }

    /// Adduct notation for display, e.g. "[M-H]-" or "[M+2H]2+"
    pub fn label(&self) -> String {
        match self.0 {
            0 => "M".to_string(),
            1 => "[M+H]+".to_string(),
            -1 => "[M-H]-".to_string(),
            n if n > 0 => format!("[M+{}H]{}+", n, n),
            n => format!("[M-{}H]{}-", -n, -n),
        }
    }
}

impl fmt::Display for IonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IonMode {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i32>()
            .map(IonMode)
            .map_err(|_| FormulaError::InvalidMode(s.to_string()))
    }
}

impl TryFrom<f64> for IonMode {
    type Error = FormulaError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i32::MIN as f64
            && value <= i32::MAX as f64
        {
            Ok(IonMode(value as i32))
        } else {
            Err(FormulaError::InvalidMode(value.to_string()))
        }
    }
}

/// Mass-to-charge ratio of a known mass: mass + mode * (H - e)
pub fn charged_mass(mass: f64, mode: IonMode) -> f64 {
    mass + mode.0 as f64 * (HYDROGEN_MASS - ELECTRON_MASS)
}

/// m/z for a possibly unavailable mass; unavailable in, unavailable out
pub fn m_z(mass: Option<f64>, mode: IonMode) -> Option<f64> {
    mass.map(|m| charged_mass(m, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aconitate() -> Formula {
        Formula::parse("C6H6O6").unwrap()
    }

    #[test]
    fn test_monoisotopic_mass() {
        let mass = monoisotopic_mass(&aconitate());
        assert!((mass - 174.01643792604).abs() < 1e-9);
    }

    #[test]
    fn test_m_z_negative_and_positive() {
        let mass = aconitate().monoisotopic_mass();
        let negative = charged_mass(mass, IonMode::NEGATIVE);
        let positive = charged_mass(mass, IonMode::POSITIVE);
        assert!((negative - 173.00916147370944).abs() < 1e-9);
        assert!((positive - 175.02371437837056).abs() < 1e-9);
        assert!((aconitate().m_z(IonMode::NEUTRAL) - mass).abs() < 1e-12);
    }

    #[test]
    fn test_m_z_unavailable_mass() {
        assert_eq!(m_z(None, IonMode::POSITIVE), None);
        let mz = m_z(Some(100.0), IonMode::new(2)).unwrap();
        assert!((mz - (100.0 + 2.0 * (HYDROGEN_MASS - ELECTRON_MASS))).abs() < 1e-12);
    }

    #[test]
    fn test_implicit_count_of_one() {
        let methane = Formula::parse("CH4").unwrap();
        let expected = 12.0 + 4.0 * HYDROGEN_MASS;
        assert!((methane.monoisotopic_mass() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sulfur_phosphorus_iodine() {
        let formula = Formula::parse("PSI").unwrap();
        let expected = 30.97376151 + 31.972072 + 126.904457;
        assert!((formula.monoisotopic_mass() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_groups_only_count_first() {
        // Acetic acid is C2H4O2, but only the first C/H/O tokens are used
        let acetic = Formula::parse("CH3COOH").unwrap();
        let expected = 12.0 + 3.0 * HYDROGEN_MASS + 15.9949146221;
        assert!((acetic.monoisotopic_mass() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ion_mode_parsing() {
        assert_eq!("-1".parse::<IonMode>().unwrap(), IonMode::NEGATIVE);
        assert_eq!("+1".parse::<IonMode>().unwrap(), IonMode::POSITIVE);
        assert_eq!(" 2 ".parse::<IonMode>().unwrap().charge(), 2);
        assert!(matches!(
            "1.5".parse::<IonMode>(),
            Err(FormulaError::InvalidMode(_))
        ));
        assert!("positive".parse::<IonMode>().is_err());
    }

    #[test]
    fn test_ion_mode_from_float() {
        assert_eq!(IonMode::try_from(-1.0).unwrap(), IonMode::NEGATIVE);
        assert!(IonMode::try_from(0.5).is_err());
        assert!(IonMode::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_ion_mode_label() {
        assert_eq!(IonMode::NEGATIVE.label(), "[M-H]-");
        assert_eq!(IonMode::POSITIVE.label(), "[M+H]+");
        assert_eq!(IonMode::new(2).label(), "[M+2H]2+");
        assert_eq!(IonMode::new(-3).label(), "[M-3H]3-");
        assert_eq!(IonMode::NEUTRAL.label(), "M");
    }
}
