mod admin;
mod blobs;
mod caller;
mod error;
mod health;
mod jobs;
mod uploads;

pub use admin::{ADMIN_TOKEN_HEADER, reset_identity_handler};
pub use blobs::blob_handler;
pub use caller::{BOT_VERIFIED_HEADER, Caller, IDENTITY_KEY_HEADER, IDENTITY_TIER_HEADER};
pub use error::{ApiError, ErrorResponse};
pub use health::health_handler;
pub use jobs::{
    cancel_job_handler, job_status_handler, submit_job_handler, transcript_handler,
};
pub use uploads::upload_handler;
