// src/detect.rs

//! Connection detection over instance output.
//!
//! The orchestrator never inspects output itself; it asks a
//! [`ConnectionDetector`] about each stdout chunk. [`MarkerDetector`] is the
//! configured implementation (exact substring match against a marker list),
//! and any `Fn(&str) -> bool` closure works as well.

use std::fmt;

/// Predicate deciding whether one chunk of output signals a successful
/// downstream connection.
pub trait ConnectionDetector: Send + Sync {
    fn is_connected(&self, chunk: &str) -> bool;
}

impl<F> ConnectionDetector for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_connected(&self, chunk: &str) -> bool {
        self(chunk)
    }
}

/// Matches when the chunk contains any configured marker verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct MarkerDetector {
    markers: Vec<String>,
}

impl MarkerDetector {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Debug for MarkerDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerDetector")
            .field("markers", &self.markers.len())
            .finish()
    }
}

impl ConnectionDetector for MarkerDetector {
    fn is_connected(&self, chunk: &str) -> bool {
        self.markers.iter().any(|m| chunk.contains(m.as_str()))
    }
}
