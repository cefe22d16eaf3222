//! Poll request body sent to the alarm endpoint.
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PollRequest<'a> {
    pub device_id: &'a str,
    /// Milliseconds since boot at the time of the request.
    pub timestamp: u32,
}

impl<'a> PollRequest<'a> {
    pub fn new(device_id: &'a str, timestamp: u32) -> Self {
        Self {
            device_id,
            timestamp,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
