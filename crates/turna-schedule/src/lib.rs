pub mod collaborators;
pub mod extraction;
pub mod input;
pub mod materializer;
pub mod thumbnail;
pub mod vacation;

pub use collaborators::{BlobStore, DemandExtractor, PdfRenderer, ThumbnailRenderer};
pub use extraction::ExtractionHandler;
pub use input::{AllocationMode, ExtractDemandInput, GenerateScheduleInput, ScheduleMode, ThumbnailInput};
pub use materializer::{archive_schedule, delete_schedule, publish_schedule, ScheduleHandler};
pub use thumbnail::ThumbnailHandler;
