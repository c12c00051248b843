// File: testing-framework/src/peer/framing.rs
//
// XML Stream Framing
//
// Splits the byte stream of a component connection into the stream header,
// complete top-level stanzas, and the closing tag. Stanzas are returned as the
// exact bytes received so that diagnostics show what the gateway wrote.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Upper bound on buffered bytes without a complete frame
pub const MAX_PENDING_BYTES: usize = 4 * 1024 * 1024;

/// One unit of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `<stream:stream ...>` opened by the peer
    StreamOpen,
    /// One complete top-level element
    Stanza(String),
    /// `</stream:stream>`
    StreamClose,
}

/// Incremental framer over received bytes
#[derive(Debug, Default)]
pub struct StanzaFramer {
    buf: Vec<u8>,
    stream_open: bool,
}

impl StanzaFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not framed yet
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn is_stream_open(&self) -> bool {
        self.stream_open
    }

    /// Next complete frame, or `None` until more bytes arrive
    pub fn next_frame(&mut self) -> Option<Frame> {
        let (frame, consumed) = self.scan()?;
        self.buf.drain(..consumed);
        if frame == Frame::StreamOpen {
            self.stream_open = true;
        }
        Some(frame)
    }

    fn scan(&self) -> Option<(Frame, usize)> {
        let mut reader = Reader::from_reader(&self.buf[..]);
        reader.check_end_names(false);

        let mut depth = 0usize;
        let mut start = 0usize;

        loop {
            if depth == 0 {
                start = reader.buffer_position();
            }
            // Incomplete markup shows up as an error or an early Eof; both
            // mean the frame is not complete yet.
            let event = reader.read_event().ok()?;
            match event {
                Event::Start(ref e) if !self.stream_open && depth == 0 => {
                    if e.name().as_ref().ends_with(b"stream") {
                        return Some((Frame::StreamOpen, reader.buffer_position()));
                    }
                    depth += 1;
                }
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => {
                    return Some((Frame::StreamClose, reader.buffer_position()));
                }
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((self.stanza(start, reader.buffer_position()), reader.buffer_position()));
                    }
                }
                Event::Empty(_) if depth == 0 => {
                    return Some((self.stanza(start, reader.buffer_position()), reader.buffer_position()));
                }
                Event::Eof => return None,
                // Declarations, whitespace between stanzas and nested content
                _ => {}
            }
        }
    }

    fn stanza(&self, start: usize, end: usize) -> Frame {
        let text = String::from_utf8_lossy(&self.buf[start..end]);
        Frame::Stanza(text.trim_start().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "<?xml version='1.0'?><stream:stream xmlns='jabber:component:accept' xmlns:stream='http://etherx.jabber.org/streams' to='biboumi.localhost'>";

    #[test]
    fn test_header_then_stanzas() {
        let mut framer = StanzaFramer::new();
        framer.push(HEADER.as_bytes());
        framer.push(b"<handshake>abc</handshake>  <presence from='a' to='b'/>");

        assert_eq!(framer.next_frame(), Some(Frame::StreamOpen));
        assert!(framer.is_stream_open());
        assert_eq!(
            framer.next_frame(),
            Some(Frame::Stanza("<handshake>abc</handshake>".to_string()))
        );
        assert_eq!(
            framer.next_frame(),
            Some(Frame::Stanza("<presence from='a' to='b'/>".to_string()))
        );
        assert_eq!(framer.next_frame(), None);
    }

    #[test]
    fn test_split_across_reads() {
        let mut framer = StanzaFramer::new();
        framer.push(HEADER.as_bytes());
        assert_eq!(framer.next_frame(), Some(Frame::StreamOpen));

        let stanza = "<message to='x'><body>a &amp; b</body><x xmlns='jabber:x:data'><field/></x></message>";
        let (head, tail) = stanza.split_at(23);
        framer.push(head.as_bytes());
        assert_eq!(framer.next_frame(), None);
        framer.push(tail.as_bytes());
        assert_eq!(framer.next_frame(), Some(Frame::Stanza(stanza.to_string())));
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_header_split_across_reads() {
        let mut framer = StanzaFramer::new();
        framer.push(&HEADER.as_bytes()[..40]);
        assert_eq!(framer.next_frame(), None);
        framer.push(&HEADER.as_bytes()[40..]);
        assert_eq!(framer.next_frame(), Some(Frame::StreamOpen));
    }

    #[test]
    fn test_stream_close() {
        let mut framer = StanzaFramer::new();
        framer.push(HEADER.as_bytes());
        framer.push(b"<iq type='result'/></stream:stream>");
        assert_eq!(framer.next_frame(), Some(Frame::StreamOpen));
        assert!(matches!(framer.next_frame(), Some(Frame::Stanza(_))));
        assert_eq!(framer.next_frame(), Some(Frame::StreamClose));
    }

    #[test]
    fn test_nested_same_name_elements() {
        let mut framer = StanzaFramer::new();
        framer.push(HEADER.as_bytes());
        framer.next_frame();
        let stanza = "<message><message><body>inner</body></message></message>";
        framer.push(stanza.as_bytes());
        assert_eq!(framer.next_frame(), Some(Frame::Stanza(stanza.to_string())));
    }
}
