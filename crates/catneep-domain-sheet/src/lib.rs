pub mod model;
pub mod note_info;
pub mod notesheet_text;
pub mod subdivision;

pub use model::*;
pub use note_info::*;
pub use notesheet_text::*;
pub use subdivision::*;
