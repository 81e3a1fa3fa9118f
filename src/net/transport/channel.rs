/*!
 * Loopback Channels
 * In-memory byte streams and datagram queues backing the transports
 */

use crate::core::limits::MAX_DATAGRAM_SIZE;
use crate::core::types::Size;
use crate::net::socket::{SocketError, SocketResult};
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::collections::VecDeque;
use std::sync::Arc;

/// One direction of a stream connection, backed by a ring buffer
pub(crate) struct StreamChannel {
    state: Mutex<StreamState>,
}

struct StreamState {
    buffer: HeapRb<u8>,
    /// Writer is gone: drained buffer reads as end-of-stream
    writer_closed: bool,
    /// Reader is gone: writes fail with EPIPE
    reader_closed: bool,
}

impl StreamChannel {
    pub fn new(capacity: Size) -> Self {
        Self {
            state: Mutex::new(StreamState {
                buffer: HeapRb::<u8>::new(capacity),
                writer_closed: false,
                reader_closed: false,
            }),
        }
    }

    pub fn write(&self, data: &[u8]) -> SocketResult<Size> {
        let mut state = self.state.lock();
        if state.reader_closed || state.writer_closed {
            return Err(SocketError::BrokenPipe);
        }
        if data.is_empty() {
            return Ok(0);
        }
        if state.buffer.vacant_len() == 0 {
            return Err(SocketError::WouldBlock);
        }
        Ok(state.buffer.push_slice(data))
    }

    pub fn read(&self, buf: &mut [u8]) -> SocketResult<Size> {
        let mut state = self.state.lock();
        if state.buffer.is_empty() {
            if state.writer_closed || state.reader_closed {
                return Ok(0);
            }
            return Err(SocketError::WouldBlock);
        }
        Ok(state.buffer.pop_slice(buf))
    }

    pub fn close_writer(&self) {
        self.state.lock().writer_closed = true;
    }

    /// Discards anything still buffered
    pub fn close_reader(&self) {
        let mut state = self.state.lock();
        state.reader_closed = true;
        while state.buffer.try_pop().is_some() {}
    }

    pub fn buffered(&self) -> Size {
        self.state.lock().buffer.occupied_len()
    }
}

/// Receive queue of a datagram endpoint; any number of senders
pub(crate) struct DatagramChannel {
    state: Mutex<DatagramState>,
}

struct DatagramState {
    queue: VecDeque<Vec<u8>>,
    capacity: usize,
    reader_closed: bool,
}

impl DatagramChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(DatagramState {
                queue: VecDeque::new(),
                capacity,
                reader_closed: false,
            }),
        }
    }

    pub fn send(&self, data: &[u8]) -> SocketResult<Size> {
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(SocketError::invalid_argument(format!(
                "datagram of {} bytes exceeds {}",
                data.len(),
                MAX_DATAGRAM_SIZE
            )));
        }
        let mut state = self.state.lock();
        if state.reader_closed {
            // Receiver stopped reading: datagrams are dropped on the floor
            return Ok(data.len());
        }
        if state.queue.len() >= state.capacity {
            return Err(SocketError::WouldBlock);
        }
        state.queue.push_back(data.to_vec());
        Ok(data.len())
    }

    /// Pops one datagram, truncating it to `buf`
    pub fn recv(&self, buf: &mut [u8]) -> SocketResult<Size> {
        let mut state = self.state.lock();
        match state.queue.pop_front() {
            Some(datagram) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok(len)
            }
            None if state.reader_closed => Ok(0),
            None => Err(SocketError::WouldBlock),
        }
    }

    pub fn close_reader(&self) {
        let mut state = self.state.lock();
        state.reader_closed = true;
        state.queue.clear();
    }

    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }
}

/// Both directions of a connected stream, seen from one side
struct StreamLink {
    rx: Arc<StreamChannel>,
    tx: Arc<StreamChannel>,
}

pub(crate) struct StreamEndpoint {
    link: Mutex<Option<StreamLink>>,
    capacity: Size,
}

pub(crate) struct DatagramEndpoint {
    inbox: Arc<DatagramChannel>,
    peer: Mutex<Option<Arc<DatagramChannel>>>,
    queue_len: usize,
}

/// Data path shared by every transport variant
pub(crate) enum Endpoint {
    Stream(StreamEndpoint),
    Datagram(DatagramEndpoint),
}

impl Endpoint {
    pub fn stream(capacity: Size) -> Self {
        Self::Stream(StreamEndpoint {
            link: Mutex::new(None),
            capacity,
        })
    }

    pub fn datagram(queue_len: usize) -> Self {
        Self::Datagram(DatagramEndpoint {
            inbox: Arc::new(DatagramChannel::new(queue_len)),
            peer: Mutex::new(None),
            queue_len,
        })
    }

    /// Fresh, unlinked endpoint of the same kind and sizing
    pub fn sibling(&self) -> Self {
        match self {
            Self::Stream(stream) => Self::stream(stream.capacity),
            Self::Datagram(datagram) => Self::datagram(datagram.queue_len),
        }
    }

    /// Cross-connect two stream endpoints
    pub fn link(a: &Endpoint, b: &Endpoint) -> SocketResult<()> {
        let (Self::Stream(a), Self::Stream(b)) = (a, b) else {
            return Err(SocketError::operation_not_supported(
                "stream link between non-stream endpoints",
            ));
        };
        let a_to_b = Arc::new(StreamChannel::new(a.capacity));
        let b_to_a = Arc::new(StreamChannel::new(b.capacity));
        *a.link.lock() = Some(StreamLink {
            rx: Arc::clone(&b_to_a),
            tx: Arc::clone(&a_to_b),
        });
        *b.link.lock() = Some(StreamLink {
            rx: a_to_b,
            tx: b_to_a,
        });
        Ok(())
    }

    /// Undo a link made for a connection that was then refused
    pub fn unlink(&self) {
        if let Self::Stream(stream) = self {
            if let Some(link) = stream.link.lock().take() {
                link.tx.close_writer();
                link.rx.close_reader();
            }
        }
    }

    /// Make `target` the default destination of this datagram endpoint
    pub fn set_destination(&self, target: &Endpoint) -> SocketResult<()> {
        let (Self::Datagram(this), Self::Datagram(target)) = (self, target) else {
            return Err(SocketError::operation_not_supported(
                "datagram destination on a non-datagram endpoint",
            ));
        };
        *this.peer.lock() = Some(Arc::clone(&target.inbox));
        Ok(())
    }

    pub fn send(&self, data: &[u8]) -> SocketResult<Size> {
        match self {
            Self::Stream(stream) => match stream.link.lock().as_ref() {
                Some(link) => link.tx.write(data),
                None => Err(SocketError::NotConnected),
            },
            Self::Datagram(datagram) => match datagram.peer.lock().as_ref() {
                Some(peer) => peer.send(data),
                None => Err(SocketError::DestinationRequired),
            },
        }
    }

    pub fn recv(&self, buf: &mut [u8]) -> SocketResult<Size> {
        match self {
            Self::Stream(stream) => match stream.link.lock().as_ref() {
                Some(link) => link.rx.read(buf),
                None => Err(SocketError::NotConnected),
            },
            Self::Datagram(datagram) => datagram.inbox.recv(buf),
        }
    }

    pub fn shut_down_for_reading(&self) {
        match self {
            Self::Stream(stream) => {
                if let Some(link) = stream.link.lock().as_ref() {
                    link.rx.close_reader();
                }
            }
            Self::Datagram(datagram) => datagram.inbox.close_reader(),
        }
    }

    pub fn shut_down_for_writing(&self) {
        match self {
            Self::Stream(stream) => {
                if let Some(link) = stream.link.lock().as_ref() {
                    link.tx.close_writer();
                }
            }
            // Nothing to tell a shared receive queue
            Self::Datagram(_) => {}
        }
    }

    pub fn is_linked(&self) -> bool {
        match self {
            Self::Stream(stream) => stream.link.lock().is_some(),
            Self::Datagram(datagram) => datagram.peer.lock().is_some(),
        }
    }

    /// Bytes or datagrams waiting to be read
    pub fn readable(&self) -> usize {
        match self {
            Self::Stream(stream) => stream
                .link
                .lock()
                .as_ref()
                .map(|link| link.rx.buffered())
                .unwrap_or(0),
            Self::Datagram(datagram) => datagram.inbox.pending(),
        }
    }
}

impl Drop for StreamEndpoint {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.tx.close_writer();
            link.rx.close_reader();
        }
    }
}

impl Drop for DatagramEndpoint {
    fn drop(&mut self) {
        self.inbox.close_reader();
    }
}
