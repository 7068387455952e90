pub mod error;
pub mod task;

pub use error::TaskmanagerError;
pub use task::{parse_iso8601, Task, DEFAULT_STATUS};
