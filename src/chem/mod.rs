// Chemistry module
// Molecular formula validation, monoisotopic mass and m/z

pub mod formula;
pub mod mass;

pub use formula::{validate, Formula, FormulaError};
pub use mass::{
    charged_mass, m_z, monoisotopic_mass, Atom, IonMode, ATOMS, ELECTRON_MASS, HYDROGEN_MASS,
};
