pub mod entry;
pub mod ordering;
pub mod task;

pub use entry::*;
pub use ordering::*;
pub use task::*;
