//! Serial port access
//!
//! Port discovery plus the byte-level link the transport drives. The
//! table's controller speaks 8N1 without flow control, so only the port
//! name and baud rate are configurable.

use sandtable_core::ConnectionError;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Default baud rate of the table's controller
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Per-call timeout of the underlying port. Response deadlines are enforced
/// above this, so reads only need to return promptly.
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Parameters for opening a serial link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialParams {
    /// Port name (e.g. "/dev/ttyACM0", "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl SerialParams {
    /// Parameters for `port` at the default baud rate
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name
    pub port_name: String,
    /// Human readable description
    pub description: String,
    /// Manufacturer name if available
    pub manufacturer: Option<String>,
    /// USB vendor and product IDs if applicable
    pub usb_ids: Option<(u16, u16)>,
}

impl SerialPortInfo {
    fn from_serialport(port: &serialport::SerialPortInfo) -> Self {
        let (manufacturer, usb_ids) = match &port.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                (usb.manufacturer.clone(), Some((usb.vid, usb.pid)))
            }
            _ => (None, None),
        };
        Self {
            port_name: port.port_name.clone(),
            description: describe_port(port),
            manufacturer,
            usb_ids,
        }
    }
}

/// List serial ports a controller board could be attached to
///
/// - Windows: COM*
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>, ConnectionError> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectionError::IoError {
            reason: format!("failed to enumerate ports: {}", e),
        }
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_controller_port(&port.port_name))
        .map(SerialPortInfo::from_serialport)
        .collect())
}

fn is_controller_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    ["/dev/ttyUSB", "/dev/ttyACM", "/dev/cu.usbserial-", "/dev/cu.usbmodem"]
        .iter()
        .any(|prefix| port_name.starts_with(prefix))
}

fn describe_port(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => format!(
            "USB {} {}",
            usb.manufacturer.as_deref().unwrap_or("Device"),
            usb.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Byte link to the controller.
///
/// `read` may return `Ok(0)` or an error of kind `TimedOut`/`WouldBlock`
/// when nothing arrived; callers treat both as "no data yet".
pub trait SerialLink: Send {
    /// Write the whole buffer
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard bytes received but not yet read
    fn clear_input(&mut self) -> io::Result<()>;

    /// Port name for log messages
    fn name(&self) -> String;
}

/// Hardware serial port backed by the `serialport` crate
pub struct RealSerialPort {
    name: String,
    port: Box<dyn serialport::SerialPort>,
}

impl RealSerialPort {
    /// Open a port as 8N1 without flow control
    pub fn open(params: &SerialParams) -> Result<Self, ConnectionError> {
        let port = serialport::new(&params.port, params.baud_rate)
            .timeout(PORT_READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                ConnectionError::FailedToOpen {
                    port: params.port.clone(),
                    reason: e.to_string(),
                }
            })?;

        tracing::info!("Opened {} at {} baud", params.port, params.baud_rate);
        Ok(Self {
            name: params.port.clone(),
            port,
        })
    }
}

impl SerialLink for RealSerialPort {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
