//! Web server for the game webhook and Discord interactions
//!
//! Both endpoints authenticate before reading anything from the body.

mod routes;
mod server;

pub use routes::AppState;
pub use server::{start_web_server, WebServerConfig};
