pub mod crypto;
pub mod errors;
pub mod merkle;
