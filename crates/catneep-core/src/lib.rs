pub mod clock;
pub mod diagnostics;
pub mod handle;
pub mod input_queue;
pub mod ipc;
pub mod session;

pub use clock::*;
pub use diagnostics::*;
pub use handle::*;
pub use input_queue::*;
pub use ipc::*;
pub use session::*;
