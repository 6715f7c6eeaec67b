//! Ingestion: the fetch → parse → normalize → store pipeline and the timer
//! that drives it.

mod clock;
mod pipeline;
mod scheduler;

pub use clock::PassClock;
pub use pipeline::{FeedError, Ingestor, PassError, PassReport};
pub use scheduler::{
    spawn_ingest_scheduler, spawn_periodic, IngestTask, PeriodicTask, SchedulerHandle,
};
