pub mod postgres_service;
pub mod user_model;

pub use postgres_service::DatabaseService;
pub use user_model::{PgUserModel, UserModel};
