use may::sync::mpsc;
use tracing::warn;

use super::Response;

/// Destination for a finished response.
///
/// `deliver` consumes the sink, so each request's response can be handed
/// over at most once.
pub trait ResponseSink: Send + 'static {
    fn deliver(self, response: Response);
}

impl<F> ResponseSink for F
where
    F: FnOnce(Response) + Send + 'static,
{
    fn deliver(self, response: Response) {
        self(response);
    }
}

/// Sink that forwards the response over a `may` channel.
///
/// A dropped receiver is logged; the response is discarded.
#[must_use]
pub fn channel_sink(tx: mpsc::Sender<Response>) -> impl ResponseSink {
    move |response: Response| {
        let status = response.status;
        if tx.send(response).is_err() {
            warn!(status, "Response receiver dropped before delivery");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::HeaderVec;

    #[test]
    fn channel_sink_forwards_once() {
        let (tx, rx) = mpsc::channel();
        channel_sink(tx).deliver(Response::new(204, HeaderVec::new(), Vec::new()));
        assert_eq!(rx.recv().unwrap().status, 204);
        assert!(rx.recv().is_err());
    }
}
