//! Serial channel for the real tty
//!
//! Opens the device through tokio-serial with the requested line settings and
//! exposes it as a non-blocking [`Channel`].

use crate::channel::Channel;
use async_trait::async_trait;
use serialtest_core::{ExerciserError, Interest, Parity, PortSettings, Readiness, Result};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time::timeout;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, warn};

/// How long single-byte mode waits for the port to accept its bytes
const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll a non-blocking operation exactly once; `Pending` becomes `WouldBlock`.
///
/// The stream's poll functions go through the readiness guard, so a
/// would-block here also clears the readiness that [`Channel::ready`] waits on.
fn poll_once<T>(op: impl FnOnce(&mut Context<'_>) -> Poll<io::Result<T>>) -> io::Result<T> {
    let mut cx = Context::from_waker(Waker::noop());
    match op(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => Err(io::Error::from(io::ErrorKind::WouldBlock)),
    }
}

/// Serial channel over an opened tty
pub struct SerialChannel {
    port: SerialStream,
    port_path: String,
}

impl SerialChannel {
    /// Open and configure the serial port described by `settings`
    ///
    /// The port is opened non-blocking and exclusive, 8 data bits, and both
    /// queues are flushed so the run starts from a clean line.
    pub fn open(settings: &PortSettings) -> Result<Self> {
        let port_path = settings
            .path
            .as_deref()
            .ok_or_else(|| ExerciserError::InvalidInput("Port argument required".to_string()))?;

        debug!(
            "Opening serial port: {} ({} baud, parity {:?}, {} stop bits, rts/cts {})",
            port_path,
            settings.baud,
            settings.parity,
            if settings.two_stop_bits { 2 } else { 1 },
            if settings.rts_cts { "on" } else { "off" }
        );

        #[allow(unused_mut)]
        let mut port = tokio_serial::new(port_path, settings.baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(to_serial_parity(settings.parity)?)
            .stop_bits(to_serial_stop_bits(settings.two_stop_bits))
            .flow_control(to_serial_flow_control(settings.rts_cts))
            .open_native_async()
            .map_err(|e| {
                error!("Failed to open serial port {}: {}", port_path, e);
                ExerciserError::Serial(format!("Failed to open serial port {}: {}", port_path, e))
            })?;

        #[cfg(unix)]
        port.set_exclusive(true).map_err(|e| {
            error!("Failed to lock serial port {}: {}", port_path, e);
            ExerciserError::Serial(format!("Failed to lock device file: {}", e))
        })?;

        port.clear(tokio_serial::ClearBuffer::All).map_err(|e| {
            warn!("Failed to flush serial port {}: {}", port_path, e);
            ExerciserError::Serial(format!("Failed to clear buffers: {}", e))
        })?;

        debug!("Serial port opened successfully");

        Ok(Self::from_stream(port, port_path))
    }

    /// Wrap an already configured stream
    pub fn from_stream(port: SerialStream, name: impl Into<String>) -> Self {
        Self {
            port,
            port_path: name.into(),
        }
    }

    /// Write `bytes` in a single write call and return how many were accepted
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        debug!("TX: {:02x?}", bytes);

        let written = timeout(SEND_TIMEOUT, self.port.write(bytes))
            .await
            .map_err(|_| {
                error!("Write timeout");
                ExerciserError::Io(io::Error::from(io::ErrorKind::TimedOut))
            })??;

        self.port.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl Channel for SerialChannel {
    async fn ready(&mut self, interest: Interest, wait: Duration) -> io::Result<Readiness> {
        if interest.is_empty() {
            tokio::time::sleep(wait).await;
            return Ok(Readiness::default());
        }

        let port = &self.port;
        let first = timeout(wait, async {
            tokio::select! {
                res = port.readable(), if interest.read => res.map(|()| Readiness {
                    readable: true,
                    writable: false,
                }),
                res = port.writable(), if interest.write => res.map(|()| Readiness {
                    readable: false,
                    writable: true,
                }),
            }
        })
        .await;

        let mut ready = match first {
            Ok(ready) => ready?,
            Err(_) => return Ok(Readiness::default()),
        };

        // Whichever side lost the race may be ready as well
        if interest.write && !ready.writable {
            ready.writable = matches!(timeout(Duration::ZERO, port.writable()).await, Ok(Ok(())));
        }
        if interest.read && !ready.readable {
            ready.readable = matches!(timeout(Duration::ZERO, port.readable()).await, Ok(Ok(())));
        }

        Ok(ready)
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let port = &mut self.port;
        let mut read_buf = ReadBuf::new(buf);
        poll_once(|cx| Pin::new(port).poll_read(cx, &mut read_buf))?;
        Ok(read_buf.filled().len())
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let port = &mut self.port;
        poll_once(|cx| Pin::new(port).poll_write(cx, buf))
    }

    async fn drain(&mut self) -> io::Result<()> {
        self.port.flush().await
    }

    fn restore(&mut self) -> io::Result<()> {
        self.port
            .clear(tokio_serial::ClearBuffer::All)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }

    fn name(&self) -> &str {
        &self.port_path
    }
}

/// Map the configured parity onto the serial backend
///
/// Stick parity (mark/space) needs `CMSPAR`, which the backend does not expose.
pub fn to_serial_parity(parity: Parity) -> Result<tokio_serial::Parity> {
    match parity {
        Parity::None => Ok(tokio_serial::Parity::None),
        Parity::Odd => Ok(tokio_serial::Parity::Odd),
        Parity::Even => Ok(tokio_serial::Parity::Even),
        Parity::Mark | Parity::Space => Err(ExerciserError::Unsupported(format!(
            "{:?} parity is not supported by the serial backend",
            parity
        ))),
    }
}

pub fn to_serial_stop_bits(two_stop_bits: bool) -> tokio_serial::StopBits {
    if two_stop_bits {
        tokio_serial::StopBits::Two
    } else {
        tokio_serial::StopBits::One
    }
}

pub fn to_serial_flow_control(rts_cts: bool) -> tokio_serial::FlowControl {
    if rts_cts {
        tokio_serial::FlowControl::Hardware
    } else {
        tokio_serial::FlowControl::None
    }
}

/// A serial port known to the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortListing {
    pub name: String,
    /// USB VID/PID when the port is a USB device
    pub usb: Option<(u16, u16)>,
    pub description: String,
}

/// Enumerate serial ports
pub fn list_ports() -> Result<Vec<PortListing>> {
    let ports = tokio_serial::available_ports().map_err(|e| {
        error!("Failed to enumerate serial ports: {}", e);
        ExerciserError::Serial(format!("Failed to enumerate ports: {}", e))
    })?;

    Ok(ports
        .into_iter()
        .map(|port| {
            debug!("Found port: {}", port.port_name);
            match port.port_type {
                tokio_serial::SerialPortType::UsbPort(info) => PortListing {
                    name: port.port_name,
                    usb: Some((info.vid, info.pid)),
                    description: info.product.unwrap_or_else(|| "USB serial".to_string()),
                },
                tokio_serial::SerialPortType::PciPort => PortListing {
                    name: port.port_name,
                    usb: None,
                    description: "PCI serial".to_string(),
                },
                tokio_serial::SerialPortType::BluetoothPort => PortListing {
                    name: port.port_name,
                    usb: None,
                    description: "Bluetooth serial".to_string(),
                },
                tokio_serial::SerialPortType::Unknown => PortListing {
                    name: port.port_name,
                    usb: None,
                    description: "serial".to_string(),
                },
            }
        })
        .collect())
}
