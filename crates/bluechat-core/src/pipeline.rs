//! Message Pipeline
//!
//! Turns submitted text into frames, frames into remote messages, and holds
//! the single pending send while a session is being established.

use tracing::{debug, warn};

use crate::errors::TransportError;
use crate::transport::{Delivery, SessionTransport};
use crate::types::Message;

// ----------------------------------------------------------------------------
// Pending Send Buffer
// ----------------------------------------------------------------------------

/// One optional slot, last write wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSendBuffer {
    slot: Option<String>,
}

impl PendingSendBuffer {
    /// Store `text`, returning the unsent value it displaced
    pub fn put(&mut self, text: String) -> Option<String> {
        self.slot.replace(text)
    }

    pub fn take(&mut self) -> Option<String> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

// ----------------------------------------------------------------------------
// Pipeline
// ----------------------------------------------------------------------------

/// What happened to a submitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Written to the link; `message` is the local echo to publish
    Sent { delivery: Delivery, message: Message },
    /// No ready link; stored in the pending buffer
    Buffered { overwritten: Option<String> },
}

#[derive(Debug, Clone, Default)]
pub struct MessagePipeline {
    pending: PendingSendBuffer,
}

impl MessagePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &PendingSendBuffer {
        &self.pending
    }

    /// Write now if the link is ready, otherwise buffer
    pub fn submit(
        &mut self,
        text: String,
        transport: &mut SessionTransport,
    ) -> Result<SubmitOutcome, TransportError> {
        if !transport.is_ready() {
            let overwritten = self.pending.put(text);
            if let Some(ref dropped) = overwritten {
                warn!("Pending message {:?} replaced before a link formed", dropped);
            }
            return Ok(SubmitOutcome::Buffered { overwritten });
        }

        let (delivery, message) = Self::send(text, transport)?;
        Ok(SubmitOutcome::Sent { delivery, message })
    }

    /// Flush the pending buffer through a link that just became ready.
    ///
    /// On a failed write the text goes back into the buffer.
    pub fn on_transport_ready(
        &mut self,
        transport: &mut SessionTransport,
    ) -> Result<Option<(Delivery, Message)>, TransportError> {
        let Some(text) = self.pending.take() else {
            return Ok(None);
        };
        debug!("Flushing pending message ({} bytes)", text.len());

        match Self::send(text.clone(), transport) {
            Ok(sent) => Ok(Some(sent)),
            Err(e) => {
                self.pending.put(text);
                Err(e)
            }
        }
    }

    /// Decode one frame into a remote message
    pub fn on_bytes_received(&self, bytes: &[u8]) -> Message {
        let text = String::from_utf8_lossy(bytes);
        if let std::borrow::Cow::Owned(_) = text {
            warn!("Frame of {} bytes was not valid UTF-8", bytes.len());
        }
        Message::remote(text.into_owned())
    }

    /// Drop anything still pending
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn send(
        text: String,
        transport: &mut SessionTransport,
    ) -> Result<(Delivery, Message), TransportError> {
        let mut text = text;
        let delivery = transport.write(text.as_bytes().to_vec())?;
        // Echo what the peer will actually see
        if delivery.truncated > 0 {
            text.truncate(delivery.bytes.len());
        }
        Ok((delivery, Message::local(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkRole, Provenance};

    fn ready_transport(max: usize) -> SessionTransport {
        let mut transport = SessionTransport::new(max);
        transport.open(LinkRole::Peripheral, None);
        transport.mark_ready();
        transport
    }

    #[test]
    fn test_pending_buffer_last_write_wins() {
        let mut buffer = PendingSendBuffer::default();
        assert_eq!(buffer.put("first".into()), None);
        assert_eq!(buffer.put("second".into()), Some("first".into()));
        assert_eq!(buffer.peek(), Some("second"));
        assert_eq!(buffer.take(), Some("second".into()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_submit_without_link_buffers() {
        let mut pipeline = MessagePipeline::new();
        let mut transport = SessionTransport::new(512);

        let outcome = pipeline.submit("hi".into(), &mut transport).unwrap();
        assert_eq!(outcome, SubmitOutcome::Buffered { overwritten: None });
        assert_eq!(pipeline.pending().peek(), Some("hi"));

        let outcome = pipeline.submit("there".into(), &mut transport).unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Buffered {
                overwritten: Some("hi".into())
            }
        );
        assert_eq!(pipeline.pending().peek(), Some("there"));
    }

    #[test]
    fn test_submit_on_ready_link_echoes_locally() {
        let mut pipeline = MessagePipeline::new();
        let mut transport = ready_transport(512);

        match pipeline.submit("hi".into(), &mut transport).unwrap() {
            SubmitOutcome::Sent { delivery, message } => {
                assert_eq!(delivery.bytes, b"hi");
                assert_eq!(message.text(), "hi");
                assert_eq!(message.provenance(), Provenance::Local);
            }
            other => panic!("expected Sent, got {other:?}"),
        }
        assert!(pipeline.pending().is_empty());
    }

    #[test]
    fn test_truncated_echo_matches_wire() {
        let mut pipeline = MessagePipeline::new();
        let mut transport = ready_transport(3);

        match pipeline.submit("hello".into(), &mut transport).unwrap() {
            SubmitOutcome::Sent { delivery, message } => {
                assert_eq!(delivery.bytes, b"hel");
                assert_eq!(message.text(), "hel");
            }
            other => panic!("expected Sent, got {other:?}"),
        }
    }

    #[test]
    fn test_flush_on_transport_ready() {
        let mut pipeline = MessagePipeline::new();
        let mut transport = SessionTransport::new(512);
        pipeline.submit("hi".into(), &mut transport).unwrap();

        transport.open(LinkRole::Central, None);
        // Not ready yet: flush fails and keeps the text
        assert!(pipeline.on_transport_ready(&mut transport).is_err());
        assert_eq!(pipeline.pending().peek(), Some("hi"));

        transport.mark_ready();
        let (delivery, message) = pipeline.on_transport_ready(&mut transport).unwrap().unwrap();
        assert_eq!(delivery.bytes, b"hi");
        assert_eq!(message.text(), "hi");
        assert!(pipeline.pending().is_empty());

        assert!(pipeline.on_transport_ready(&mut transport).unwrap().is_none());
    }

    #[test]
    fn test_decode_remote_frame() {
        let pipeline = MessagePipeline::new();
        let message = pipeline.on_bytes_received("héllo".as_bytes());
        assert_eq!(message.text(), "héllo");
        assert_eq!(message.provenance(), Provenance::Remote);

        let lossy = pipeline.on_bytes_received(&[0x68, 0xFF, 0x69]);
        assert_eq!(lossy.text(), "h\u{FFFD}i");
    }
}
