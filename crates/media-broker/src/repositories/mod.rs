//! Repository layer for the Media Broker.

pub mod meeting_affinity;

pub use meeting_affinity::MeetingAffinityRepository;
