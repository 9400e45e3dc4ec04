pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod swipes;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
