pub mod auth;
pub mod dashboard;
pub mod permissions;
pub mod resource;
pub mod settings;
pub mod users;
