mod http;
mod local;
mod traits;

pub use http::HttpService;
pub use local::{LocalService, DUE_DATE_FORMAT_ERROR, TITLE_REQUIRED_ERROR};
pub use traits::{ServiceError, TaskService};
