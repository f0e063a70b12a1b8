mod common;
mod concurrency;
mod expiration_and_cache;
mod mocks;
