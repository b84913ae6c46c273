//! HTTP request handlers for the Media Broker.

pub mod health;
pub mod meetings;
pub mod metrics;

pub use health::health_check;
pub use meetings::{
    close_producer, connect_transport, consume_media, end_meeting, get_meeting_info,
    join_meeting, leave_meeting, pause_consumer, pause_producer, produce_media, resume_consumer,
    resume_producer, start_meeting,
};
pub use metrics::metrics_handler;
