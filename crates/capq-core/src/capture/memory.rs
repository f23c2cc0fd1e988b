//! In-memory capture backend
//!
//! Scripted interfaces and a shared frame feed. Clones share the feed, so a
//! test can keep one handle and push frames (or inject a failure) while a
//! session reads through another.

use super::{CaptureBackend, OpenOptions, PacketStream};
use crate::error::{Error, Result};
use crate::interface::InterfaceId;
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
enum Feed {
    Frame(Bytes),
    Failure(String),
}

#[derive(Debug, Default)]
struct Shared {
    feed: Mutex<VecDeque<Feed>>,
    ready: Condvar,
    opened: Mutex<Vec<OpenRecord>>,
    closed: AtomicUsize,
}

/// One call to [`CaptureBackend::open`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRecord {
    /// Interface that was opened
    pub interface: InterfaceId,
    /// Options it was opened with
    pub options: OpenOptions,
}

/// Capture backend fed from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    interfaces: BTreeSet<String>,
    default: Option<String>,
    deny_permission: bool,
    open_failure: Option<String>,
    shared: Arc<Shared>,
}

impl MemoryBackend {
    /// Backend with no interfaces
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend exposing `names`; the first one becomes the default
    pub fn with_interfaces<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self {
            default: names.first().cloned(),
            interfaces: names.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Override the platform default (may name an interface that is not listed)
    pub fn default_to(mut self, name: Option<&str>) -> Self {
        self.default = name.map(str::to_string);
        self
    }

    /// Make interface enumeration fail with a permission error
    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Make every `open` fail with a capture error
    pub fn fail_open(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    /// Queue a frame for capture
    pub fn push_frame(&self, frame: impl Into<Bytes>) {
        self.push(Feed::Frame(frame.into()));
    }

    /// Queue several frames for capture
    pub fn push_frames<I, B>(&self, frames: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut feed = self.shared.feed.lock();
        feed.extend(frames.into_iter().map(|f| Feed::Frame(f.into())));
        drop(feed);
        self.shared.ready.notify_all();
    }

    /// Make the stream fail once the frames queued so far are consumed
    pub fn fail(&self, message: impl Into<String>) {
        self.push(Feed::Failure(message.into()));
    }

    /// Frames and failures not read yet
    pub fn pending(&self) -> usize {
        self.shared.feed.lock().len()
    }

    /// Every `open` call made so far
    pub fn opened(&self) -> Vec<OpenRecord> {
        self.shared.opened.lock().clone()
    }

    /// How many streams have been closed
    pub fn close_count(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn push(&self, item: Feed) {
        self.shared.feed.lock().push_back(item);
        self.shared.ready.notify_all();
    }
}

impl CaptureBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn list_interfaces(&self) -> Result<BTreeSet<String>> {
        if self.deny_permission {
            return Err(Error::PermissionDenied(
                "interface enumeration requires elevated privileges".into(),
            ));
        }
        Ok(self.interfaces.clone())
    }

    fn default_interface(&self) -> Option<String> {
        self.default.clone()
    }

    fn open(&self, interface: &InterfaceId, options: &OpenOptions) -> Result<Box<dyn PacketStream>> {
        self.shared.opened.lock().push(OpenRecord {
            interface: interface.clone(),
            options: options.clone(),
        });

        if let Some(message) = &self.open_failure {
            return Err(Error::capture(message.clone()));
        }

        Ok(Box::new(MemoryStream {
            shared: Arc::clone(&self.shared),
            options: options.clone(),
            closed: false,
        }))
    }
}

struct MemoryStream {
    shared: Arc<Shared>,
    options: OpenOptions,
    closed: bool,
}

impl PacketStream for MemoryStream {
    fn next_frame(&mut self) -> Result<Option<Bytes>> {
        let deadline = Instant::now().checked_add(self.options.read_timeout);
        let mut feed = self.shared.feed.lock();

        loop {
            match feed.pop_front() {
                Some(Feed::Frame(mut frame)) => {
                    frame.truncate(self.options.snaplen);
                    return Ok(Some(frame));
                }
                Some(Feed::Failure(message)) => return Err(Error::capture(message)),
                None => {}
            }

            let Some(deadline) = deadline else {
                return Ok(None);
            };
            if self.shared.ready.wait_until(&mut feed, deadline).timed_out() && feed.is_empty() {
                return Ok(None);
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
