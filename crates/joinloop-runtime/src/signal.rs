// src/signal.rs
//
// Crash context for JIT-compiled join loops.
// Registers a SIGSEGV/SIGBUS handler that prints the combination being run
// (e.g. "sweep [5, 3, 9] :: mask=0b101 cond_mask=0b01") before dying.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Maximum context entries (stack depth)
const MAX_CONTEXT_DEPTH: usize = 4;
/// Maximum length of each context entry
const MAX_CONTEXT_LEN: usize = 192;

#[allow(clippy::declare_interior_mutable_const)]
static CONTEXT_STACK: [[AtomicU8; MAX_CONTEXT_LEN]; MAX_CONTEXT_DEPTH] = {
    const INIT_BYTE: AtomicU8 = AtomicU8::new(0);
    const INIT_ENTRY: [AtomicU8; MAX_CONTEXT_LEN] = [INIT_BYTE; MAX_CONTEXT_LEN];
    [INIT_ENTRY; MAX_CONTEXT_DEPTH]
};
#[allow(clippy::declare_interior_mutable_const)]
static CONTEXT_LENS: [AtomicUsize; MAX_CONTEXT_DEPTH] = {
    const INIT: AtomicUsize = AtomicUsize::new(0);
    [INIT; MAX_CONTEXT_DEPTH]
};
static CONTEXT_DEPTH: AtomicUsize = AtomicUsize::new(0);

static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

fn store_entry(idx: usize, ctx: &str) {
    let bytes = ctx.as_bytes();
    let len = bytes.len().min(MAX_CONTEXT_LEN - 1);

    for (i, &b) in bytes[..len].iter().enumerate() {
        CONTEXT_STACK[idx][i].store(b, Ordering::Release);
    }
    CONTEXT_STACK[idx][len].store(0, Ordering::Release);
    CONTEXT_LENS[idx].store(len, Ordering::Release);
}

/// Push a context entry describing the operation that is starting.
pub fn push_context(ctx: &str) {
    let depth = CONTEXT_DEPTH.load(Ordering::Acquire);
    if depth >= MAX_CONTEXT_DEPTH {
        return;
    }
    store_entry(depth, ctx);
    CONTEXT_DEPTH.store(depth + 1, Ordering::Release);
}

/// Pop the most recent context entry.
pub fn pop_context() {
    let depth = CONTEXT_DEPTH.load(Ordering::Acquire);
    if depth > 0 {
        CONTEXT_DEPTH.store(depth - 1, Ordering::Release);
    }
}

/// Replace the top context entry; pushes when the stack is empty.
pub fn replace_context(ctx: &str) {
    let depth = CONTEXT_DEPTH.load(Ordering::Acquire);
    if depth == 0 {
        push_context(ctx);
        return;
    }
    store_entry(depth - 1, ctx);
}

/// Install the SIGSEGV/SIGBUS handler. Only the first call installs it.
pub fn install_segfault_handler() {
    if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = segfault_handler as usize;
        action.sa_flags = libc::SA_SIGINFO;

        libc::sigaction(libc::SIGSEGV, &action, std::ptr::null_mut());
        libc::sigaction(libc::SIGBUS, &action, std::ptr::null_mut());
    }
}

// Must stay async-signal-safe: raw write(2) only, no allocation.
fn write_stderr(bytes: &[u8]) {
    unsafe {
        libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

extern "C" fn segfault_handler(
    sig: libc::c_int,
    _info: *mut libc::siginfo_t,
    _ctx: *mut libc::c_void,
) {
    write_stderr(if sig == libc::SIGSEGV {
        b"\nSEGFAULT in generated join loop"
    } else {
        b"\nBUS ERROR in generated join loop"
    });

    let depth = CONTEXT_DEPTH.load(Ordering::Acquire).min(MAX_CONTEXT_DEPTH);
    for (i, entry) in CONTEXT_STACK.iter().enumerate().take(depth) {
        write_stderr(if i == 0 { b": " } else { b" :: " });

        let len = CONTEXT_LENS[i].load(Ordering::Acquire);
        let mut buf = [0u8; MAX_CONTEXT_LEN];
        for (byte, stored) in buf.iter_mut().zip(entry).take(len) {
            *byte = stored.load(Ordering::Acquire);
        }
        write_stderr(&buf[..len]);
    }
    write_stderr(b"\n");

    // Re-raise with the default action so the exit status reflects the signal
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = libc::SIG_DFL;
        libc::sigaction(sig, &action, std::ptr::null_mut());
        libc::raise(sig);
    }
}
