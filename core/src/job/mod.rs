pub mod runner;

pub use runner::{BatchHandle, BatchRequest, BatchRunner, RunnerError};
