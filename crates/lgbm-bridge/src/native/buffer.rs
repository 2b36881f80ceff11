//! Guess-then-fetch protocol for engine outputs of unknown size.
//!
//! The engine fills a caller buffer and reports how much space it actually
//! needed. When that exceeds what was provided, the buffer is grown to the
//! reported size and the call is retried exactly once. A second shortfall
//! means the engine is misbehaving and surfaces as [`Error::Protocol`].

use crate::{Error, Result};

/// Longest name (NUL included) accepted from a name fetch.
pub const MAX_NAME_LENGTH: usize = 1024;

/// Per-name buffer size tried before any retry.
pub const INITIAL_NAME_CAPACITY: usize = 128;

/// What the engine reported after a name fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameFetch {
    pub count: i32,
    /// Longest name including its NUL terminator.
    pub required_len: usize,
}

/// Convert an engine-reported element count, rejecting negative values.
pub fn written_len(operation: &'static str, out_len: i64) -> Result<usize> {
    usize::try_from(out_len).map_err(|_| Error::Protocol {
        operation,
        detail: format!("negative length {out_len}"),
    })
}

/// Fill `buf` through `call`, growing it at most once.
///
/// `call` receives the buffer and returns the element count the engine
/// needs. On return `buf` is truncated to that count. The buffer is not
/// reallocated when its current length already suffices.
pub fn fill_growable<T, F>(
    operation: &'static str,
    buf: &mut Vec<T>,
    initial: usize,
    mut call: F,
) -> Result<()>
where
    T: Copy + Default,
    F: FnMut(&mut [T]) -> Result<usize>,
{
    if buf.len() < initial {
        buf.resize(initial, T::default());
    }
    let required = call(buf)?;
    if required > buf.len() {
        tracing::debug!(operation, provided = buf.len(), required, "growing buffer");
        buf.resize(required, T::default());
        let again = call(buf)?;
        if again > buf.len() {
            return Err(Error::Protocol {
                operation,
                detail: format!("required size grew from {required} to {again} after resize"),
            });
        }
        buf.truncate(again);
    } else {
        buf.truncate(required);
    }
    Ok(())
}

/// [`fill_growable`] into a fresh buffer.
pub fn fetch_growable<T, F>(operation: &'static str, initial: usize, call: F) -> Result<Vec<T>>
where
    T: Copy + Default,
    F: FnMut(&mut [T]) -> Result<usize>,
{
    let mut buf = Vec::new();
    fill_growable(operation, &mut buf, initial, call)?;
    Ok(buf)
}

/// Fetch exactly `expected` names.
///
/// Every per-name buffer shares one length. The returned count must equal
/// `expected`, and no name may exceed [`MAX_NAME_LENGTH`].
pub fn fetch_names<F>(operation: &'static str, expected: usize, mut call: F) -> Result<Vec<String>>
where
    F: FnMut(&mut [Vec<u8>]) -> Result<NameFetch>,
{
    let mut capacity = INITIAL_NAME_CAPACITY;
    let mut buffers = vec![vec![0u8; capacity]; expected];
    let mut outcome = call(&mut buffers)?;

    if outcome.required_len > MAX_NAME_LENGTH {
        return Err(Error::Protocol {
            operation,
            detail: format!(
                "name length {} exceeds the {MAX_NAME_LENGTH} byte limit",
                outcome.required_len
            ),
        });
    }
    if outcome.required_len > capacity {
        capacity = outcome.required_len;
        buffers = vec![vec![0u8; capacity]; expected];
        outcome = call(&mut buffers)?;
        if outcome.required_len > capacity {
            return Err(Error::Protocol {
                operation,
                detail: format!(
                    "name length grew from {capacity} to {} after resize",
                    outcome.required_len
                ),
            });
        }
    }

    if usize::try_from(outcome.count).ok() != Some(expected) {
        return Err(Error::Protocol {
            operation,
            detail: format!("expected {expected} names, engine returned {}", outcome.count),
        });
    }

    buffers
        .iter()
        .map(|bytes| text_until_nul(operation, bytes))
        .collect()
}

/// Decode a NUL-terminated UTF-8 string.
pub(crate) fn text_until_nul(operation: &'static str, bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec()).map_err(|_| Error::Protocol {
        operation,
        detail: "engine returned text that is not valid UTF-8".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_lengths_are_protocol_errors() {
        assert_eq!(written_len("op", 12).unwrap(), 12);
        assert!(matches!(
            written_len("op", -1),
            Err(Error::Protocol { operation: "op", .. })
        ));
    }

    /// Simulates an engine producing `size` elements regardless of buffer.
    fn engine_call(size: usize, calls: &mut Vec<usize>) -> impl FnMut(&mut [u8]) -> Result<usize> + '_ {
        move |buf: &mut [u8]| {
            calls.push(buf.len());
            let n = buf.len().min(size);
            buf[..n].fill(b'x');
            Ok(size)
        }
    }

    #[test]
    fn small_guess_retries_once() {
        let mut calls = Vec::new();
        let out = fetch_growable("op", 4, engine_call(10, &mut calls)).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(calls, vec![4, 10]);
    }

    #[test]
    fn sufficient_guess_calls_once() {
        let mut calls = Vec::new();
        let out = fetch_growable("op", 16, engine_call(10, &mut calls)).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(calls, vec![16]);
    }

    #[test]
    fn reused_buffer_keeps_allocation() {
        let mut buf: Vec<f64> = Vec::with_capacity(32);
        buf.resize(32, 0.0);
        let ptr = buf.as_ptr();
        fill_growable("op", &mut buf, 8, |b| Ok(b.len().min(20))).unwrap();
        assert_eq!(buf.len(), 20);
        assert_eq!(buf.as_ptr(), ptr);
    }

    #[test]
    fn growing_twice_is_a_protocol_error() {
        let mut size = 8;
        let err = fetch_growable::<u8, _>("op", 4, |_| {
            size *= 2;
            Ok(size)
        })
        .unwrap_err();
        assert!(matches!(err, Error::Protocol { operation: "op", .. }));
    }

    fn write_names<'a>(names: &'a [&'a str]) -> impl FnMut(&mut [Vec<u8>]) -> Result<NameFetch> + 'a {
        move |buffers: &mut [Vec<u8>]| {
            let required = names.iter().map(|n| n.len() + 1).max().unwrap_or(0);
            for (buf, name) in buffers.iter_mut().zip(names) {
                if buf.len() >= name.len() + 1 {
                    buf[..name.len()].copy_from_slice(name.as_bytes());
                    buf[name.len()] = 0;
                }
            }
            Ok(NameFetch {
                count: names.len() as i32,
                required_len: required,
            })
        }
    }

    #[test]
    fn names_are_fetched_and_trimmed() {
        let names = fetch_names("names", 2, write_names(&["age", "income"])).unwrap();
        assert_eq!(names, vec!["age", "income"]);
    }

    #[test]
    fn long_names_trigger_one_retry() {
        let long = "f".repeat(INITIAL_NAME_CAPACITY + 10);
        let mut calls = 0;
        let source = [long.as_str()];
        let mut inner = write_names(&source);
        let names = fetch_names("names", 1, |b| {
            calls += 1;
            inner(b)
        })
        .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(names[0], long);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = fetch_names("names", 3, write_names(&["a", "b"])).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn oversized_names_are_rejected() {
        let err = fetch_names("names", 1, |_| {
            Ok(NameFetch {
                count: 1,
                required_len: MAX_NAME_LENGTH + 1,
            })
        })
        .unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
