mod dispatch;
mod event;
mod mode;
mod runloop;

pub use dispatch::{dispatch, AppRuntime, Command, Msg};
pub use event::{AppEvent, AsyncEventSource, EventSourceRegistry, TickEventSource};
pub use mode::{InputRouter, Mode};
pub use runloop::App;
