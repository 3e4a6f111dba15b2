pub mod judge;

pub use judge::*;
