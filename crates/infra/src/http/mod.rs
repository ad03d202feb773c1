//! HTTP plumbing shared by the resource API client

mod client;

pub use client::{HttpClient, HttpClientBuilder};
