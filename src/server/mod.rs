pub mod server;
pub mod routes;
