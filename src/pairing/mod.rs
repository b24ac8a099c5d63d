mod orchestrator;

pub use orchestrator::{PairingError, PairingHealth, PairingState, Pairing};
