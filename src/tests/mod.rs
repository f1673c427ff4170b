pub mod common;
mod issuance_concurrency;
mod distributed_cache;
