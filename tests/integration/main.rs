//! Integration tests for the job queue and worker pool.

mod helpers;
mod pool_test;
mod postgres_test;
