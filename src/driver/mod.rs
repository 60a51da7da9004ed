//! Audio-thread sampling and the background send worker

pub mod mailbox;
pub mod sampler;
pub mod worker;

pub use mailbox::{wake_channel, DriverState, Mailbox};
pub use sampler::SamplingDriver;
pub use worker::{send_pending, SendWorker, WorkerParts};
