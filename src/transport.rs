use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::UdpSocket;
use std::rc::Rc;

/// A reliable, ordered datagram channel.
///
/// The record layer assumes nothing is lost or reordered below it.
pub trait Transport {
    /// Read exactly one datagram into `buf`, returning its length.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send `datagram` as one datagram.
    fn write(&mut self, datagram: &[u8]) -> io::Result<()>;
}

/// A connected socket.
impl Transport for UdpSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }

    fn write(&mut self, datagram: &[u8]) -> io::Result<()> {
        let n = self.send(datagram)?;
        if n != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "datagram truncated on send",
            ));
        }
        Ok(())
    }
}

type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// One end of an in-memory datagram pipe.
///
/// Reads never block: an empty queue is `io::ErrorKind::WouldBlock`.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    incoming: Queue,
    outgoing: Queue,
    writes: usize,
}

impl MemoryTransport {
    /// Two connected ends.
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let a: Queue = Default::default();
        let b: Queue = Default::default();
        (
            MemoryTransport {
                incoming: Rc::clone(&a),
                outgoing: Rc::clone(&b),
                writes: 0,
            },
            MemoryTransport {
                incoming: b,
                outgoing: a,
                writes: 0,
            },
        )
    }

    /// Number of transport writes made through this end.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of datagrams waiting to be read at this end.
    pub fn queued(&self) -> usize {
        self.incoming.borrow().len()
    }

    /// Take the next datagram waiting at this end, bypassing the record layer.
    pub fn pop_datagram(&self) -> Option<Vec<u8>> {
        self.incoming.borrow_mut().pop_front()
    }

    /// Queue a raw datagram for the next read at this end.
    pub fn inject(&self, datagram: &[u8]) {
        self.incoming.borrow_mut().push_back(datagram.to_vec());
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(datagram) = self.incoming.borrow_mut().pop_front() else {
            return Err(io::ErrorKind::WouldBlock.into());
        };
        // Like a datagram socket, excess bytes are discarded.
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok(n)
    }

    fn write(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.writes += 1;
        self.outgoing.borrow_mut().push_back(datagram.to_vec());
        Ok(())
    }
}
