pub mod claims;
pub mod payload;
pub mod repository;
