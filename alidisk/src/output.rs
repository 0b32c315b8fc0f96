//! Destination for user-facing command output.

use std::io::Write;

pub enum Output {
    Stdout,
    Buffer(Vec<u8>),
}

impl Output {
    pub fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Output::Stdout => {
                std::io::stdout().write_all(data)?;
                std::io::stdout().flush()
            }
            Output::Buffer(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
        }
    }

    pub fn writeln(&mut self, s: &str) -> std::io::Result<()> {
        self.write(s.as_bytes())?;
        self.write(b"\n")
    }

    /// Drains captured text. Always empty for stdout.
    pub fn take(&mut self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buf) => String::from_utf8_lossy(&std::mem::take(buf)).into_owned(),
        }
    }
}
