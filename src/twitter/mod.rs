mod client;
mod oauth;

pub use client::TwitterClient;
