pub mod errors;
pub mod proof;
pub mod reward;
pub mod target;
