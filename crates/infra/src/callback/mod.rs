//! Loopback receiver for the authorization redirect

mod server;

pub use server::OAuthCallbackServer;
