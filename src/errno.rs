use core::fmt;

/// Kernel error numbers surfaced to user mode.
///
/// Values follow the conventional POSIX assignments so user programs can
/// share errno tables with other systems. `NoProcSlot` has no Linux
/// number; it takes the BSD process-limit slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    NoEntry = 2,
    NoSuchProcess = 3,
    Io = 5,
    TooBig = 7,
    NoExec = 8,
    BadFd = 9,
    NoChild = 10,
    NoMemory = 12,
    Fault = 14,
    Exists = 17,
    NotDir = 20,
    IsDir = 21,
    Invalid = 22,
    TooManyFiles = 24,
    NoSpace = 28,
    IllegalSeek = 29,
    NameTooLong = 36,
    NoProcSlot = 67,
}

impl Errno {
    /// Numeric value as delivered to user mode.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Errno::NoEntry => write!(f, "No such file or directory"),
            Errno::NoSuchProcess => write!(f, "No such process"),
            Errno::Io => write!(f, "I/O error"),
            Errno::TooBig => write!(f, "Argument list too long"),
            Errno::NoExec => write!(f, "Exec format error"),
            Errno::BadFd => write!(f, "Bad file descriptor"),
            Errno::NoChild => write!(f, "No child processes"),
            Errno::NoMemory => write!(f, "Out of memory"),
            Errno::Fault => write!(f, "Bad address"),
            Errno::Exists => write!(f, "File exists"),
            Errno::NotDir => write!(f, "Not a directory"),
            Errno::IsDir => write!(f, "Is a directory"),
            Errno::Invalid => write!(f, "Invalid argument"),
            Errno::TooManyFiles => write!(f, "Too many open files"),
            Errno::NoSpace => write!(f, "No space left on device"),
            Errno::IllegalSeek => write!(f, "Illegal seek"),
            Errno::NameTooLong => write!(f, "File name too long"),
            Errno::NoProcSlot => write!(f, "Too many processes in system"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Errno>;
