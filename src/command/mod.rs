mod dispatcher;

pub use dispatcher::{CommandDispatcher, CommandError, CommandOutcome};
