use crate::abi::SYSCALL_INSN_LEN;

/// Snapshot of the user-mode register file, saved on syscall entry and
/// restored on the way back to Ring 3.
///
/// Syscall convention: number in `rax`, arguments in
/// `rdi`/`rsi`/`rdx`/`r10`, result back in `rax` (negative values encode
/// `-errno`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Trapframe {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub rbp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub rip: u64,
    pub rflags: u64,
    pub rsp: u64,
}

impl Trapframe {
    pub fn syscall_number(&self) -> u64 {
        self.rax
    }

    pub fn arg0(&self) -> u64 {
        self.rdi
    }

    pub fn arg1(&self) -> u64 {
        self.rsi
    }

    pub fn arg2(&self) -> u64 {
        self.rdx
    }

    pub fn arg3(&self) -> u64 {
        self.r10
    }

    /// Store a syscall result: the scalar on success, `-errno` on failure.
    pub fn set_syscall_result(&mut self, result: crate::errno::Result<i64>) {
        self.rax = match result {
            Ok(value) => value as u64,
            Err(e) => -(e.code() as i64) as u64,
        };
    }

    /// Move the saved program counter past the trapping syscall
    /// instruction so the thread resumes at the next one.
    pub fn advance_past_syscall(&mut self) {
        self.rip += SYSCALL_INSN_LEN;
    }

    /// Rewrite this frame so a forked child observes a successful syscall
    /// returning 0.
    pub fn set_forked_child_return(&mut self) {
        self.rax = 0;
        self.advance_past_syscall();
    }
}
