pub mod actions;
pub mod catalog;
pub mod config;
pub mod events;
pub mod hydrate;
pub mod reducer;
pub mod state;

pub use actions::*;
pub use catalog::*;
pub use events::*;
pub use reducer::*;
pub use state::*;
