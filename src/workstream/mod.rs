pub mod manager;
pub mod model;

pub use manager::{WorkstreamError, WorkstreamManager};
pub use model::{AppState, Workstream, WorkstreamStatus};
