use std::sync::LazyLock;
use regex::Regex;

pub mod auth;
pub mod catalog;
pub mod permission;
pub mod response;
pub mod role;
pub mod setting;
pub mod user;

pub static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9]{7,15}$").expect("Invalid Regex")
});
