pub mod auth;
pub mod communities;
pub mod error;
pub mod friends;
pub mod middleware;
pub mod posts;
