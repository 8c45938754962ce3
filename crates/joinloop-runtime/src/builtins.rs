// src/builtins.rs

use std::cell::{Cell, RefCell};
use std::io::{self, Write};

/// One visited combination of per-level iterator values, outermost first.
pub type IteratorTuple = Vec<i64>;

thread_local! {
    static TUPLE_CAPTURE: RefCell<Option<Vec<IteratorTuple>>> = const { RefCell::new(None) };
    static ECHO: Cell<bool> = const { Cell::new(false) };
}

/// Enable or disable echoing recorded tuples to stdout.
///
/// Echoed tuples use the `a, b, c` line format, which is also what the
/// `reference` command prints, so the two streams can be diffed directly.
pub fn set_echo(enabled: bool) {
    ECHO.with(|cell| cell.set(enabled));
}

/// Format a tuple the way echoed output prints it.
pub fn format_tuple(tuple: &[i64]) -> String {
    tuple
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a capture is currently active on this thread.
#[cfg(test)]
fn is_capturing() -> bool {
    TUPLE_CAPTURE.with(|cell| cell.borrow().is_some())
}

/// Start capturing recorded tuples on this thread.
///
/// The capture ends when the returned guard is finished or dropped, so an
/// aborted run never leaks tuples into the next one.
pub fn begin_capture() -> CaptureGuard {
    TUPLE_CAPTURE.with(|cell| {
        let mut slot = cell.borrow_mut();
        assert!(slot.is_none(), "tuple capture already active on this thread");
        *slot = Some(Vec::new());
    });
    CaptureGuard { _not_send: std::marker::PhantomData }
}

/// Active tuple capture. See [`begin_capture`].
pub struct CaptureGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl CaptureGuard {
    /// End the capture and return everything recorded, in call order.
    pub fn finish(self) -> Vec<IteratorTuple> {
        TUPLE_CAPTURE.with(|cell| cell.borrow_mut().take().unwrap_or_default())
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        TUPLE_CAPTURE.with(|cell| {
            cell.borrow_mut().take();
        });
    }
}

fn record(tuple: IteratorTuple) {
    if ECHO.with(Cell::get) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", format_tuple(&tuple));
    }
    TUPLE_CAPTURE.with(|cell| {
        if let Some(ref mut captured) = *cell.borrow_mut() {
            captured.push(tuple);
        }
    });
}

/// Record the iterator values of one innermost-body invocation.
///
/// `values` points at `len` consecutive i64 slots; it may be null when `len`
/// is zero (a nest with no levels).
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn joinloop_record_iterators(values: *const i64, len: i64) {
    let tuple = if values.is_null() || len <= 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(values, len as usize) }.to_vec()
    };
    record(tuple);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_call_order() {
        let capture = begin_capture();
        let a = [0i64, 1, 2];
        let b = [4i64, 2, 8];
        joinloop_record_iterators(a.as_ptr(), 3);
        joinloop_record_iterators(b.as_ptr(), 3);
        assert_eq!(capture.finish(), vec![vec![0, 1, 2], vec![4, 2, 8]]);
    }

    #[test]
    fn null_pointer_records_empty_tuple() {
        let capture = begin_capture();
        joinloop_record_iterators(std::ptr::null(), 0);
        assert_eq!(capture.finish(), vec![Vec::<i64>::new()]);
    }

    #[test]
    fn dropped_guard_discards_tuples() {
        {
            let _capture = begin_capture();
            let a = [7i64];
            joinloop_record_iterators(a.as_ptr(), 1);
            assert!(is_capturing());
        }
        assert!(!is_capturing());

        let capture = begin_capture();
        assert!(capture.finish().is_empty());
    }

    #[test]
    fn recording_without_capture_is_a_no_op() {
        let a = [1i64, 2];
        joinloop_record_iterators(a.as_ptr(), 2);
        assert!(!is_capturing());
    }

    #[test]
    fn format_matches_echo_lines() {
        assert_eq!(format_tuple(&[0, 2, 8]), "0, 2, 8");
        assert_eq!(format_tuple(&[99]), "99");
        assert_eq!(format_tuple(&[]), "");
    }

    #[test]
    #[should_panic(expected = "already active")]
    fn nested_capture_panics() {
        let _outer = begin_capture();
        let _inner = begin_capture();
    }
}
