mod handlers;
mod model;
mod routes;
mod store;

pub use model::*;
pub use routes::router;
