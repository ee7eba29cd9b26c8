//! Domain layer: entities, the ports the application depends on, and field validation.

pub mod admin;
pub mod merchant;
pub mod ports;
pub mod transaction;
pub mod validation;
