pub mod id_generator;
pub mod jobs_api;
pub mod message_queue;
pub mod worker_launcher;

pub use id_generator::{IdGenerator, UuidIdGenerator};
pub use jobs_api::JobsApi;
pub use message_queue::{MessageBus, Subscription};
pub use worker_launcher::WorkerLauncher;
