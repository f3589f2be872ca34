pub mod admission;
pub mod handlers;
pub mod middleware;
pub mod pdf;
pub mod routes;

pub use routes::create_router;
