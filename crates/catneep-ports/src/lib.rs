pub mod audio;
pub mod input;
pub mod storage;
pub mod types;

pub use audio::*;
pub use input::*;
pub use storage::*;
pub use types::*;
