pub mod controller;
pub mod index;
pub mod model;
pub mod notifier;
pub mod server;
pub mod session;
