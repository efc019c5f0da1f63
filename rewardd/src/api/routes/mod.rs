pub mod actions;
pub mod health;
pub mod lessons;
pub mod users;
