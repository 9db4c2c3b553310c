pub mod apply;
pub mod bls;
pub mod constants;
pub mod errors;
pub mod proof;
pub mod types;
pub mod utils;
pub mod verify;
