//! Table-to-host responses

use super::{MessageType, HEADER};
use crate::serial::SerialLink;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Pause between empty reads while waiting for a response
const IDLE_READ_PAUSE: Duration = Duration::from_millis(1);

/// A decoded response from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Frame accepted
    Confirm,
    /// Frame rejected
    Fail,
    /// Position rejected, the table's buffer is full
    BufferFull,
    /// Number of buffered positions
    BufferSize(u8),
    /// Any other status byte
    Unexpected(u8),
}

impl Response {
    /// Whether the table asked for the frame to be sent again later
    pub fn is_rejection(&self) -> bool {
        matches!(self, Response::Fail | Response::BufferFull)
    }
}

/// Wait up to `timeout` for one response frame.
///
/// Bytes before the sync header are skipped. Returns `Ok(None)` if no
/// complete response arrived in time; I/O errors other than timeouts are
/// passed on.
pub fn read_response(link: &mut dyn SerialLink, timeout: Duration) -> io::Result<Option<Response>> {
    let deadline = Instant::now() + timeout;

    let mut window = [0u8; 2];
    while window != HEADER {
        let Some(byte) = read_byte(link, deadline)? else {
            return Ok(None);
        };
        window = [window[1], byte];
    }

    let Some(status) = read_byte(link, deadline)? else {
        tracing::debug!("Response header without status byte");
        return Ok(None);
    };

    let response = match MessageType::try_from(status) {
        Ok(MessageType::Confirm) => Response::Confirm,
        Ok(MessageType::Fail) => Response::Fail,
        Ok(MessageType::BufferFull) => Response::BufferFull,
        Ok(MessageType::BufferSizeReply) => match read_byte(link, deadline)? {
            Some(size) => Response::BufferSize(size),
            None => {
                tracing::debug!("Buffer size reply without payload");
                return Ok(None);
            }
        },
        _ => Response::Unexpected(status),
    };

    Ok(Some(response))
}

fn read_byte(link: &mut dyn SerialLink, deadline: Instant) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match link.read(&mut buf) {
            Ok(1) => return Ok(Some(buf[0])),
            Ok(_) => {}
            Err(e) if is_idle_error(&e) => {}
            Err(e) => return Err(e),
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(IDLE_READ_PAUSE);
    }
}

fn is_idle_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Bytes(VecDeque<u8>);

    impl SerialLink for Bytes {
        fn write_all(&mut self, _data: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "idle")),
            }
        }

        fn clear_input(&mut self) -> io::Result<()> {
            self.0.clear();
            Ok(())
        }

        fn name(&self) -> String {
            "bytes".to_string()
        }
    }

    fn read(bytes: &[u8]) -> Option<Response> {
        let mut link = Bytes(bytes.iter().copied().collect());
        read_response(&mut link, Duration::from_millis(20)).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(read(&[0x61, 0x62, 0x69]), Some(Response::Confirm));
        assert_eq!(read(&[0x61, 0x62, 0x70]), Some(Response::Fail));
        assert_eq!(read(&[0x61, 0x62, 0x73]), Some(Response::BufferFull));
        assert_eq!(read(&[0x61, 0x62, 0x72, 0x11]), Some(Response::BufferSize(17)));
        assert_eq!(read(&[0x61, 0x62, 0x42]), Some(Response::Unexpected(0x42)));
    }

    #[test]
    fn test_skips_noise_before_header() {
        assert_eq!(read(&[0x00, 0x61, 0x61, 0x62, 0x69]), Some(Response::Confirm));
    }

    #[test]
    fn test_timeout_yields_none() {
        assert_eq!(read(&[]), None);
        assert_eq!(read(&[0x61, 0x62]), None);
        assert_eq!(read(&[0x61, 0x62, 0x72]), None);
    }

    #[test]
    fn test_hard_errors_propagate() {
        struct Broken;
        impl SerialLink for Broken {
            fn write_all(&mut self, _data: &[u8]) -> io::Result<()> {
                Ok(())
            }
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            }
            fn clear_input(&mut self) -> io::Result<()> {
                Ok(())
            }
            fn name(&self) -> String {
                "broken".to_string()
            }
        }

        assert!(read_response(&mut Broken, Duration::from_millis(5)).is_err());
    }
}
