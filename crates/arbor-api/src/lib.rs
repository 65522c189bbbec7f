pub mod auth;
pub mod error;
pub mod likes;
pub mod middleware;
pub mod posts;
pub mod replies;
pub mod routes;
pub mod storage;

mod views;
