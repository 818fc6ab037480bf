pub mod assignment;
pub mod auth;
pub mod dashboard;
pub mod notification;
pub mod ticket;
