// Outbound load distribution: round-robin dispatcher plus the global
// submission pacer.

pub mod dispatcher;
pub mod ratelimit;

pub use dispatcher::{
    BatchSubmission, BatchTransport, Dispatcher, DispatcherConfig, EndpointReport, HttpTransport,
    SubmissionAck,
};
pub use ratelimit::{PacerConfig, SubmissionPacer};
