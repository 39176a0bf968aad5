use std::fmt;
use std::io::{self, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

pub const DEFAULT_PIPE_PATH: &str = "/tmp/audio_pipe";

/// Where payload bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Named pipe, created with mode 0666 if missing.
    Pipe(PathBuf),
    /// `host:port` of a listening TCP consumer.
    Tcp(String),
}

impl Default for SinkTarget {
    fn default() -> Self {
        SinkTarget::Pipe(PathBuf::from(DEFAULT_PIPE_PATH))
    }
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkTarget::Pipe(path) => write!(f, "pipe {}", path.display()),
            SinkTarget::Tcp(addr) => write!(f, "tcp {}", addr),
        }
    }
}

impl SinkTarget {
    /// Work that must succeed before the writer thread starts.
    pub(crate) fn prepare(&self) -> io::Result<()> {
        match self {
            SinkTarget::Pipe(path) => ensure_fifo(path),
            SinkTarget::Tcp(_) => Ok(()),
        }
    }

    /// Open the consumer side. For a pipe this blocks until a reader opens it.
    pub(crate) fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        match self {
            SinkTarget::Pipe(path) => {
                let file = std::fs::OpenOptions::new().write(true).open(path)?;
                Ok(Box::new(file))
            }
            SinkTarget::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str())?;
                stream.set_nodelay(true)?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// Create a FIFO at `path` unless something already exists there.
#[cfg(unix)]
pub fn ensure_fifo(path: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::FileTypeExt;

    match std::fs::metadata(path) {
        Ok(meta) => {
            if !meta.file_type().is_fifo() {
                tracing::warn!("{} exists and is not a named pipe", path.display());
            }
            return Ok(());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    if unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) } != 0 {
        return Err(io::Error::last_os_error());
    }
    tracing::info!("Created named pipe at {}", path.display());
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_fifo(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "named pipes are only supported on unix",
    ))
}
