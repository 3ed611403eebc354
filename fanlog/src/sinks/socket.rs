//! UDP sink sending one datagram per log line

use super::{OutputFormat, SinkSettings};
use crate::error::SinkError;
use crate::level::Level;
use crate::record::Tags;
use crate::sink::Sink;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

/// Sends each accepted log line as a single UDP datagram to a fixed peer.
///
/// Delivery is best effort; a datagram the peer never reads is not an error.
pub struct SocketSink {
    peer: SocketAddr,
    format: OutputFormat,
    socket: Mutex<Option<UdpSocket>>,
    settings: Mutex<SinkSettings>,
}

impl SocketSink {
    /// Bind an ephemeral local port and connect it to `address`
    pub fn connect(address: impl ToSocketAddrs, format: OutputFormat) -> io::Result<Self> {
        let peer = address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing"))?;

        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(peer)?;
        tracing::debug!(%peer, "Socket sink connected");

        Ok(Self {
            peer,
            format,
            socket: Mutex::new(Some(socket)),
            settings: Mutex::new(SinkSettings::default()),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn settings(&self) -> SinkSettings {
        self.settings.lock().clone()
    }

    fn emit(&self, level: Level, message: &str) -> Result<(), SinkError> {
        let line = {
            let settings = self.settings.lock();
            if !settings.accepts(level) {
                return Ok(());
            }
            settings.render(self.format, level, message)?
        };

        let socket = self.socket.lock();
        let socket = socket.as_ref().ok_or(SinkError::Closed)?;
        socket.send(line.as_bytes())?;
        Ok(())
    }
}

impl Sink for SocketSink {
    fn write(&self, level: Level, values: &[String]) -> Result<(), SinkError> {
        self.emit(level, &values.join(" "))
    }

    fn write_formatted(&self, level: Level, args: fmt::Arguments<'_>) -> Result<(), SinkError> {
        self.emit(level, &args.to_string())
    }

    /// Datagrams are sent immediately
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.socket.lock().take();
        Ok(())
    }

    fn set_level(&self, level: Level) {
        self.settings.lock().level = level;
    }

    fn set_colored(&self, colored: bool) {
        self.settings.lock().colored = colored;
    }

    fn set_time_rotated(&self, time_rotated: bool) {
        self.settings.lock().rotation.time_rotated = time_rotated;
    }

    fn set_retentions(&self, retentions: i64) {
        self.settings.lock().rotation.retentions = retentions;
    }

    fn set_rotate_size(&self, rotate_size: u64) {
        self.settings.lock().rotation.rotate_size = rotate_size;
    }

    fn set_rotate_lines(&self, rotate_lines: u64) {
        self.settings.lock().rotation.rotate_lines = rotate_lines;
    }

    fn set_tags(&self, tags: Arc<Tags>) {
        self.settings.lock().tags = tags;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn listener() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        socket
    }

    fn recv_line(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 2048];
        let (len, _) = socket.recv_from(&mut buf).unwrap();
        String::from_utf8(buf[..len].to_vec()).unwrap()
    }

    #[test]
    fn test_each_line_is_one_datagram() {
        let receiver = listener();
        let sink = SocketSink::connect(receiver.local_addr().unwrap(), OutputFormat::Text).unwrap();
        assert_eq!(sink.peer(), receiver.local_addr().unwrap());

        let mut tags = Tags::new();
        tags.insert("host".to_string(), "edge-1".to_string());
        sink.set_tags(Arc::new(tags));

        sink.write(Level::Info, &["eddie".to_string(), "18".to_string()]).unwrap();
        sink.write_formatted(Level::Debug, format_args!("pi is {:.2}", 3.1415)).unwrap();

        let first = recv_line(&receiver);
        assert!(first.ends_with("INFO [host=edge-1] eddie 18\n"));
        let second = recv_line(&receiver);
        assert!(second.ends_with("DEBUG [host=edge-1] pi is 3.14\n"));
    }

    #[test]
    fn test_threshold_and_close() {
        let receiver = listener();
        let sink = SocketSink::connect(receiver.local_addr().unwrap(), OutputFormat::Json).unwrap();
        sink.set_level(Level::Warning);

        sink.write(Level::Info, &["dropped".to_string()]).unwrap();
        sink.write(Level::Error, &["kept".to_string()]).unwrap();
        assert!(recv_line(&receiver).contains(r#""message":"kept""#));

        sink.close().unwrap();
        let err = sink.write(Level::Error, &["late".to_string()]).unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }
}
