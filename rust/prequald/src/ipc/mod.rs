mod error;
mod handlers;
mod router;
mod types;

pub use handlers::wizard::handle_verified;
pub use router::handle_request;
pub use types::{AppState, Event, Reply, Request};
