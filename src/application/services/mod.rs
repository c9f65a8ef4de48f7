//! Application services - Poll and vote rules over the storage traits

pub mod poll_service;
pub mod vote_service;

pub use poll_service::PollService;
pub use vote_service::VoteService;
