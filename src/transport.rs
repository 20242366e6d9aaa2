//! Host connection abstraction

use embedded_io::{Read, ReadReady, Write};

/// Byte link to the host, typically a USB CDC-ACM serial port
///
/// `read` is only called after `read_ready` reported data, so it never blocks
/// the console.
pub trait HostLink: Read + ReadReady + Write {
    /// Check if a terminal is attached (for USB: configured and DTR set)
    fn is_connected(&mut self) -> bool;

    /// Drop everything received so far
    ///
    /// Hosts often send modem probes before the user opens a terminal.
    fn discard_input(&mut self) -> Result<(), Self::Error> {
        let mut scratch = [0u8; 16];
        while self.read_ready()? {
            if self.read(&mut scratch)? == 0 {
                break;
            }
        }
        Ok(())
    }
}
