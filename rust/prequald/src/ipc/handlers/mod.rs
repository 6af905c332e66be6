pub mod core;
pub mod setup;
pub mod submissions;
pub mod wizard;
