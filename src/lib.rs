pub mod config;
pub mod csv_import;
pub mod currency;
pub mod error;
pub mod models;
pub mod pdf_import;
pub mod pp;
pub mod validation;
