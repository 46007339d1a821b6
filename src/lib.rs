pub mod config;
pub mod database;
pub mod feed;
pub mod middleware;
pub mod post;
pub mod router;
pub mod user;
pub mod utils;
