//! Test utilities shared by the unit tests
//!
//! Feed fixtures in the shape of the daily CBR document, plus scripted
//! stand-ins for the fetcher and the repository.

pub mod factories;
pub mod mocks;

pub use factories::*;
pub use mocks::*;
