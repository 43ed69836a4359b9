//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::transport::{ApiRequest, Transport, TransportError, TransportResponse};

pub(crate) type Scripted = Result<TransportResponse, TransportError>;

/// Replays queued responses in order and records every request. Once the
/// queue is empty it answers `200 {}`.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn with(responses: Vec<Scripted>) -> Self {
        Self { responses: Mutex::new(responses.into()), requests: Mutex::new(Vec::new()) }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| ok("{}"))
    }
}

pub(crate) fn ok(body: &str) -> Scripted {
    status(200, body)
}

pub(crate) fn status(code: u16, body: &str) -> Scripted {
    Ok(TransportResponse { status: code, body: body.to_owned() })
}
