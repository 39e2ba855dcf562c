pub mod catalog;
pub mod channel;
pub mod contracts;
pub mod controller;
pub mod error;
pub mod simulated;

pub use catalog::*;
pub use channel::*;
pub use contracts::*;
pub use controller::*;
pub use error::*;
pub use simulated::*;
