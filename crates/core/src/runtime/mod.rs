pub mod return_timer;
mod scheduler;
mod shutdown;

pub use return_timer::PendingReturn;
pub use scheduler::Runtime;
pub use shutdown::ShutdownGuard;
pub use crate::types::RuntimeStatus;
