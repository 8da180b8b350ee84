pub mod auth;
pub mod claims;
pub mod jwt;
pub mod middleware;
