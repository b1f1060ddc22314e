//! Minimal request/response capability surface.
//!
//! The hook composes with any server abstraction exposing these traits.
//! Every `ResponseChannel` member has an "unsupported" default; the hook
//! feature-detects at each call site and degrades gracefully, so a bare
//! implementation is valid (it just gets no metrics endpoint and no
//! latency tracking).

/// Read-only view of an incoming request.
pub trait RequestHead {
    /// HTTP method, if known. Missing methods default to GET.
    fn method(&self) -> Option<&str>;
    /// Request target (path plus optional query string), if known.
    fn target(&self) -> Option<&str>;
}

/// One-shot completion signals a response channel can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// The response was written out normally.
    Finish,
    /// The connection ended before the response completed.
    Close,
}

/// Callback registered for a completion signal. Fired at most once.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Write side of a request/response cycle, with optional capabilities.
pub trait ResponseChannel {
    /// Current status code, if one has been set.
    fn status(&self) -> Option<u16> {
        None
    }

    fn set_status(&mut self, _code: u16) {}

    /// Set a response header. Returns false when unsupported.
    fn set_header(&mut self, _name: &str, _value: &str) -> bool {
        false
    }

    /// Write the body and terminate the cycle. Returns false when
    /// unsupported; the caller then treats the request as ordinary.
    fn end(&mut self, _body: &str) -> bool {
        false
    }

    /// Subscribe a one-shot callback to a completion signal. Returns
    /// false when unsupported.
    fn once(&mut self, _signal: CompletionSignal, _callback: CompletionCallback) -> bool {
        false
    }
}
