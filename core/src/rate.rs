//! Rate-limit window reported on every API response.

use crate::http::HttpResponse;

pub const HEADER_RATE_LIMIT: &str = "X-Ratelimit-Limit";
pub const HEADER_RATE_REMAINING: &str = "X-Ratelimit-Remaining";
pub const HEADER_RATE_RESET: &str = "X-Ratelimit-Reset";

/// Missing or malformed headers read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rate {
    /// Maximum number of requests allowed per minute.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset: u32,
}

impl Rate {
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            limit: read_header(response, HEADER_RATE_LIMIT),
            remaining: read_header(response, HEADER_RATE_REMAINING),
            reset: read_header(response, HEADER_RATE_RESET),
        }
    }
}

fn read_header(response: &HttpResponse, name: &str) -> u32 {
    let Some(raw) = response.header(name) else {
        return 0;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(header = name, value = raw, "ignoring malformed rate header: {e}");
            0
        }
    }
}
