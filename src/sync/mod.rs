mod engine;

pub use engine::{FakeSyncEngine, NotifySyncEngine, SyncEngine, SyncEvent};
