mod actors;
pub mod audit;
pub mod cache;
pub mod error;
pub mod events;
pub mod store;
pub mod types;

// re-export the coordinator handle as if it is the coordinator itself.
pub use actors::coordinator::{JobCoordinatorHandle as JobCoordinator, SolverCommand};
pub use events::JobOutcome;
