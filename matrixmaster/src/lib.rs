//! Landmark task worker.
//!
//! Reads street-view images and saliency maps from an [`ObjectStore`], runs
//! the landmark flows from the `landmarks` crate and keeps the results in a
//! [`LandmarkStore`]. [`WorkerPool`] runs requests with bounded concurrency
//! per task kind and reports each outcome to a [`TaskReporter`].

pub mod config;
pub mod landmark;
pub mod reporter;
pub mod store;
pub mod tasks;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Buckets, Config, WorkerSlots};
pub use landmark::{Landmark, TaskInput};
pub use reporter::{FailureCode, LogReporter, TaskReporter};
pub use store::{
    FsObjectStore, LandmarkChange, LandmarkStore, MemoryLandmarkStore, MemoryObjectStore,
    ObjectStore, StoreError,
};
pub use tasks::{run_task, TaskContext, TaskKind};
pub use worker::{TaskRequest, WorkerPool};
