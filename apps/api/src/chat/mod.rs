pub mod controller;
pub mod handlers;
pub mod prompts;
pub mod session;
pub mod store;
