//! Event lifecycle: display classification and the controller that drives
//! start/end transitions and raffle countdowns against the backend.

mod classifier;
mod controller;

pub use classifier::{classify, classify_raffle};
pub use controller::{ControllerUpdate, LifecycleController};
