//! Data Transfer Objects for admin responses and query strings.

pub mod common_dto;
pub mod registration_dto;

pub use common_dto::*;
pub use registration_dto::*;
