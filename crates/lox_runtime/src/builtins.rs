//! Native functions available in the global scope of both evaluators.

use std::sync::OnceLock;
use std::time::Instant;

use crate::core::heap::NativeFn;
use crate::core::value::Value;

static START: OnceLock<Instant> = OnceLock::new();

/// Monotonic seconds since an arbitrary epoch (first use).
fn clock(_args: &[Value]) -> Result<Value, String> {
    let start = START.get_or_init(Instant::now);
    Ok(Value::number(start.elapsed().as_secs_f64()))
}

/// `(name, arity, function)` for every built-in.
pub fn natives() -> &'static [(&'static str, u8, NativeFn)] {
    &[("clock", 0, clock)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_non_decreasing() {
        let a = clock(&[]).unwrap().as_number();
        let b = clock(&[]).unwrap().as_number();
        assert!(b >= a);
        assert!(a >= 0.0);
    }
}
