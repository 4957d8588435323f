#[path = "config/validation.rs"]
mod validation;
