pub mod client;
pub mod core;
pub mod dtos;
pub mod entity;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod start;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_support;
