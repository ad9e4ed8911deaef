// HTTP ingress for classification batches.

pub mod handler;
pub mod models;
pub mod server;

pub use handler::{ClassificationIngress, OrchestratorIngress};
pub use models::{ClassifyBatchRequest, ClassifyBatchResponse, MAX_BATCH_SIZE};
pub use server::{create_router, start_server};
