//! Message delivery in and out of the node
use std::{io::{self, BufRead, Write}, marker::PhantomData, sync::Arc};

use concurrent_queue::{ConcurrentQueue, ForcePushError, PopError};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// No more messages will ever arrive / be accepted
    #[error("Topic '{0}' is closed")]
    Closed(String),
    #[error("I/O error")]
    Io(#[from] io::Error),
    #[error("Unable to decode message on line {line}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unable to encode message")]
    Encode(#[source] serde_json::Error),
}

impl TransportError {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// Sends messages out. Takes ownership of each message.
pub trait Publisher<M> {
    fn publish(&mut self, message: M) -> Result<(), TransportError>;
}

/// Receives messages, without blocking
pub trait Subscriber<M> {
    /// Next message, `Ok(None)` if none is waiting right now
    fn try_recv(&mut self) -> Result<Option<M>, TransportError>;
}

/// In-process topic with keep-last semantics.
///
/// Holds at most `depth` messages; publishing into a full topic drops the
/// oldest one. Handles are cheap to clone and share one queue.
pub struct Topic<M> {
    name: Arc<str>,
    queue: Arc<ConcurrentQueue<M>>,
}

impl<M> Clone for Topic<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<M> Topic<M> {
    pub fn new(name: &str, depth: usize) -> Self {
        Self {
            name: Arc::from(name),
            queue: Arc::new(ConcurrentQueue::bounded(depth.max(1))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Messages currently waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Stop accepting messages. Already-queued messages can still be received.
    pub fn close(&self) -> bool {
        self.queue.close()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl<M> Publisher<M> for Topic<M> {
    fn publish(&mut self, message: M) -> Result<(), TransportError> {
        match self.queue.force_push(message) {
            Ok(None) => Ok(()),
            Ok(Some(_dropped)) => {
                tracing::trace!(topic = %self.name, "queue full, dropped oldest message");
                Ok(())
            },
            Err(ForcePushError(_)) => Err(TransportError::Closed(self.name.to_string())),
        }
    }
}

impl<M> Subscriber<M> for Topic<M> {
    fn try_recv(&mut self) -> Result<Option<M>, TransportError> {
        match self.queue.pop() {
            Ok(message) => Ok(Some(message)),
            Err(PopError::Empty) => Ok(None),
            Err(PopError::Closed) => Err(TransportError::Closed(self.name.to_string())),
        }
    }
}

/// Writes each message as one line of JSON
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<M: Serialize, W: Write> Publisher<M> for JsonLinesSink<W> {
    fn publish(&mut self, message: M) -> Result<(), TransportError> {
        serde_json::to_writer(&mut self.writer, &message)
            .map_err(TransportError::Encode)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads one JSON message per line; blank lines are ignored.
///
/// End of input is reported as [TransportError::Closed].
pub struct JsonLinesSource<R, M> {
    reader: R,
    name: String,
    line: usize,
    buf: String,
    _message: PhantomData<fn() -> M>,
}

impl<R: BufRead, M: DeserializeOwned> JsonLinesSource<R, M> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            reader,
            name: name.into(),
            line: 0,
            buf: String::new(),
            _message: PhantomData,
        }
    }
}

impl<R: BufRead, M: DeserializeOwned> Subscriber<M> for JsonLinesSource<R, M> {
    fn try_recv(&mut self) -> Result<Option<M>, TransportError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Err(TransportError::Closed(self.name.clone()));
            }
            self.line += 1;
            let line = self.line;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text)
                .map(Some)
                .map_err(|source| TransportError::Decode { line, source });
        }
    }
}
