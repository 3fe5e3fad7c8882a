// Metabolite DB - compound, retention time and mass database for metabolomics standards
// Module declarations

pub mod chem;
pub mod config;
pub mod export;
pub mod import;
pub mod state;
pub mod web;
