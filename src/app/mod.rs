//! Application wiring: shared state around the settlement engine.

mod state;

pub use state::AppState;
