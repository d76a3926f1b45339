//! Numeric constants shared with user mode.

/// Highest assignable PID. PID 0 is the kernel process.
pub const PROC_MAX: i32 = 255;

/// Length of each per-process file table.
pub const OPEN_MAX: usize = 64;

/// Longest path accepted from user mode, terminator included.
pub const PATH_MAX: usize = 1024;

/// Upper bound on the user-stack footprint of an argv block.
pub const ARG_MAX: usize = 65536;

// Open flags. The low two bits are the access mode.
pub const O_RDONLY: u32 = 0;
pub const O_WRONLY: u32 = 1;
pub const O_RDWR: u32 = 2;
pub const O_ACCMODE: u32 = 3;
pub const O_CREAT: u32 = 0o100;
pub const O_TRUNC: u32 = 0o1000;
pub const O_APPEND: u32 = 0o2000;

// lseek whence values.
pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

/// Standard descriptors, bound to the console at process creation.
pub const STDIN_FILENO: i32 = 0;
pub const STDOUT_FILENO: i32 = 1;
pub const STDERR_FILENO: i32 = 2;

/// Encode an `_exit` code into the status word seen by `waitpid`.
pub fn encode_exit(code: i32) -> i32 {
    (code & 0xff) << 2
}

/// Recover the exit code from an encoded status word.
pub fn exit_status(status: i32) -> i32 {
    (status >> 2) & 0xff
}

/// Bytes occupied by the syscall instruction; the forked child's saved
/// program counter is advanced by this much so it resumes after the trap.
pub const SYSCALL_INSN_LEN: u64 = 2;

/// Top of the user stack in every address space.
pub const USER_STACK_TOP: u64 = 0x8000_0000;

/// Size of the user stack mapping (16 KiB).
pub const USER_STACK_SIZE: u64 = 4096 * 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_encoding_round_trips() {
        for code in [0, 1, 42, 255] {
            assert_eq!(exit_status(encode_exit(code)), code);
        }
        // Only the low byte survives, like the original encoding.
        assert_eq!(exit_status(encode_exit(0x1ff)), 0xff);
    }
}
