pub mod broker;
pub mod failed;
pub mod retry;

pub use broker::{JobEnvelope, TaskBroker};
pub use failed::{FailedJob, FailedJobs};
pub use retry::RetryPolicy;
