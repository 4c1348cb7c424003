//! Guards for the recursive descent in the parser and evaluator.
//!
//! Nested expressions and Lox calls recurse on the native stack. Wrapping each
//! recursive step in [`ensure_sufficient_stack`] moves execution onto a fresh
//! heap-allocated segment when the current one runs low, so the nesting and
//! call-depth limits hold on any thread, not just an 8 MiB main thread.

/// Grow when less than this much stack remains (100 KiB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment (1 MiB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
