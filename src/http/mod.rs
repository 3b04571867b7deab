pub mod handler;
pub mod server;

pub use server::{router, HttpServer};
