pub mod blocks;
pub mod client;
pub mod signing;

pub use client::{OAuthGrant, SlackClient, SlackError};
