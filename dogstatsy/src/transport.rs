use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs as _, UdpSocket},
};

#[cfg(target_os = "linux")]
use std::{
    os::unix::net::UnixDatagram,
    path::{Path, PathBuf},
};

use tracing::debug;

/// A connectionless channel that carries encoded metrics to the remote server.
///
/// Each call to `send` carries exactly one metric line. Implementations should not block for any meaningful amount of
/// time, and should not retry: errors are reported to the client's error hook and the metric is dropped.
pub trait Transport: Send + Sync {
    /// Sends a single payload, returning the number of bytes sent.
    ///
    /// # Errors
    ///
    /// If the payload could not be handed off to the underlying channel, an error is returned.
    fn send(&self, payload: &[u8]) -> io::Result<usize>;

    /// Returns the transport ID.
    ///
    /// This is a short acronym describing the transport, such as `udp` for UDP, and is used in diagnostics.
    fn transport_id(&self) -> &'static str {
        "custom"
    }
}

#[derive(Clone, Debug)]
pub(crate) enum RemoteAddr {
    Udp(Vec<SocketAddr>),

    #[cfg(target_os = "linux")]
    Unixgram(PathBuf),
}

impl RemoteAddr {
    /// Returns the transport ID for the remote address.
    pub const fn transport_id(&self) -> &'static str {
        match self {
            RemoteAddr::Udp(_) => "udp",
            #[cfg(target_os = "linux")]
            RemoteAddr::Unixgram(_) => "uds",
        }
    }

    /// Opens a transport to the remote address.
    pub fn open(&self) -> io::Result<Box<dyn Transport>> {
        match self {
            RemoteAddr::Udp(addrs) => UdpTransport::connect(addrs).map(|t| Box::new(t) as Box<dyn Transport>),

            #[cfg(target_os = "linux")]
            RemoteAddr::Unixgram(path) => UnixgramTransport::connect(path).map(|t| Box::new(t) as Box<dyn Transport>),
        }
    }
}

impl<'a> TryFrom<&'a str> for RemoteAddr {
    type Error = String;

    fn try_from(addr: &'a str) -> Result<Self, Self::Error> {
        #[cfg(target_os = "linux")]
        if let Some((scheme, path)) = addr.split_once("://") {
            return match scheme {
                "unixgram" => Ok(RemoteAddr::Unixgram(PathBuf::from(path))),
                _ => Err(format!("invalid scheme '{scheme}' (expected 'unixgram')")),
            };
        }

        match addr.to_socket_addrs() {
            Ok(addrs) => {
                let addrs = addrs.collect::<Vec<_>>();
                if addrs.is_empty() {
                    Err(format!("'{addr}' did not resolve to any addresses"))
                } else {
                    Ok(RemoteAddr::Udp(addrs))
                }
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

/// UDP transport.
///
/// The socket is bound to an ephemeral port and connected to the first resolved address that accepts the connection,
/// trying IPv4 addresses before IPv6 ones. It is non-blocking: a full send buffer surfaces as a `WouldBlock` error
/// rather than stalling the caller.
pub(crate) struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    fn connect(addrs: &[SocketAddr]) -> io::Result<Self> {
        let mut last_error = None;
        let ipv4_first = addrs.iter().filter(|a| a.is_ipv4()).chain(addrs.iter().filter(|a| a.is_ipv6()));
        for addr in ipv4_first {
            let local_addr = if addr.is_ipv4() {
                SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
            } else {
                SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
            };

            let result = UdpSocket::bind(local_addr).and_then(|socket| {
                socket.connect(addr)?;
                socket.set_nonblocking(true)?;
                Ok(socket)
            });

            match result {
                Ok(socket) => {
                    debug!(remote_addr = %addr, "Opened UDP transport.");
                    return Ok(UdpTransport { socket });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no remote addresses to connect to")
        }))
    }
}

impl Transport for UdpTransport {
    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send(payload)
    }

    fn transport_id(&self) -> &'static str {
        "udp"
    }
}

/// Unix domain socket transport, in datagram (`SOCK_DGRAM`) mode.
#[cfg(target_os = "linux")]
pub(crate) struct UnixgramTransport {
    socket: UnixDatagram,
}

#[cfg(target_os = "linux")]
impl UnixgramTransport {
    fn connect(path: &Path) -> io::Result<Self> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(path)?;
        socket.set_nonblocking(true)?;

        debug!(path = %path.display(), "Opened Unix datagram transport.");
        Ok(UnixgramTransport { socket })
    }
}

#[cfg(target_os = "linux")]
impl Transport for UnixgramTransport {
    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send(payload)
    }

    fn transport_id(&self) -> &'static str {
        "uds"
    }
}
