//! Structured event logging for the workflows and backend calls.

pub mod events;
