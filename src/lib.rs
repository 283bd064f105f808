pub mod client;

pub use client::{render, ApiClient, Backoff, ClientError, FeedEvent, Predictor, Subscriber};
