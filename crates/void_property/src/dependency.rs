//! Thread-local dependency collection for function binds
//!
//! While a function bind evaluates its function, every property read on
//! the same thread is recorded. Collectors nest; a read is recorded by the
//! innermost one only.

use std::cell::RefCell;
use std::sync::Weak;

use crate::property::StackProperty;

thread_local! {
    static COLLECTORS: RefCell<Vec<Vec<Weak<StackProperty>>>> = RefCell::new(Vec::new());
}

/// Record a property read
pub(crate) fn record(property: &Weak<StackProperty>) {
    COLLECTORS.with(|collectors| {
        if let Some(current) = collectors.borrow_mut().last_mut() {
            if !current.iter().any(|seen| seen.ptr_eq(property)) {
                current.push(property.clone());
            }
        }
    });
}

/// Run `f`, returning its result and every property it read
pub(crate) fn collect<R>(f: impl FnOnce() -> R) -> (R, Vec<Weak<StackProperty>>) {
    COLLECTORS.with(|collectors| collectors.borrow_mut().push(Vec::new()));
    let guard = PopOnDrop;
    let result = f();
    drop(guard);
    let deps = COLLECTORS.with(|collectors| collectors.borrow_mut().pop().unwrap_or_default());
    (result, deps)
}

// Keeps the collector stack balanced if `f` panics
struct PopOnDrop;

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        if std::thread::panicking() {
            COLLECTORS.with(|collectors| {
                collectors.borrow_mut().pop();
            });
        }
    }
}

/// True if both lists name the same properties in the same order
pub(crate) fn same_set(a: &[Weak<StackProperty>], b: &[Weak<StackProperty>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ptr_eq(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any::Any;
    use std::sync::Arc;

    #[test]
    fn test_collect_records_reads() {
        let a = StackProperty::new("a", Any::new(1i32));
        let b = StackProperty::new("b", Any::new(2i32));

        let (sum, deps) = collect(|| {
            let x = a.get_value().map(|v| v.get_or_default::<i32>()).unwrap_or(0);
            let y = b.get_value().map(|v| v.get_or_default::<i32>()).unwrap_or(0);
            let _again = a.get_value();
            x + y
        });
        assert_eq!(sum, 3);
        assert_eq!(deps.len(), 2);
        assert!(deps[0].ptr_eq(&Arc::downgrade(&a)));
    }

    #[test]
    fn test_reads_outside_collector_are_ignored() {
        let a = StackProperty::new("a", Any::new(1i32));
        let _ = a.get_value();
        let ((), deps) = collect(|| {});
        assert!(deps.is_empty());
    }

    #[test]
    fn test_nested_collectors() {
        let a = StackProperty::new("a", Any::new(1i32));
        let b = StackProperty::new("b", Any::new(2i32));
        let (inner, outer) = collect(|| {
            let _ = a.get_value();
            let ((), inner) = collect(|| {
                let _ = b.get_value();
            });
            inner
        });
        assert_eq!(outer.len(), 1);
        assert_eq!(inner.len(), 1);
        assert!(inner[0].ptr_eq(&Arc::downgrade(&b)));
    }
}
