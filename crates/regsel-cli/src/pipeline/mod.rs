pub mod ingest;
pub mod input;
pub mod predict;
pub mod report;
pub mod train;
pub mod transform;
