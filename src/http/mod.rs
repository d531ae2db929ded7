mod client;

pub use client::{HttpClient, PayloadRequest, RequestOutcome, WafResponse};
