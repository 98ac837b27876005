pub mod auth_service;
pub mod drive_service;
