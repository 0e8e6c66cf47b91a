//! Application layer - Stage services and API services built on the ports.

pub mod cleanup;
pub mod compressor;
pub mod converter;
pub mod ingest;
pub mod markers;
pub mod merger;
pub mod stage;

#[cfg(test)]
pub(crate) mod testing {
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    pub fn exit_ok() -> Output {
        Output {
            status: ExitStatus::from_raw(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Output of a process that exited with status 1.
    pub fn exit_failed(stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }
}
