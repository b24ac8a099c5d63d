mod store;

pub use store::{PersistError, Store};
