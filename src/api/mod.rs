// HTTP resources exposed by the service

pub mod users;
