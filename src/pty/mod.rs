pub mod decoder;
pub mod error;
pub mod session;

pub use decoder::Utf8Decoder;
pub use error::{PtyError, PtyErrorCode};
pub use session::{PtyManager, PtyOutput};
