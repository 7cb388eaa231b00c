pub mod analytics;
pub mod discount;
pub mod notification;
pub mod plan;
pub mod subscription;
pub mod user;
