//! Per-entry-point function pointer cache

use crate::binder::Binder;
use crate::error::BindError;
use once_cell::sync::OnceCell;

/// Function pointer resolved on first use
///
/// A successful resolution is cached for the life of the slot; a failure is
/// not, so the next call asks the binder again.
pub struct LazySymbol<F> {
    name: &'static str,
    slot: OnceCell<F>,
}

impl<F: Copy> LazySymbol<F> {
    /// Slot for the exported symbol `name`
    ///
    /// # Safety
    ///
    /// `F` must be the function pointer type of the exported symbol.
    pub const unsafe fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: OnceCell::new(),
        }
    }

    /// Exported symbol name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the pointer has been resolved
    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Cached pointer, resolving it through `binder` on first use
    pub fn get(&self, binder: &Binder) -> Result<F, BindError> {
        self.slot
            .get_or_try_init(|| {
                let raw = binder.resolve(self.name)?;
                // SAFETY: guaranteed by the contract of `new`.
                Ok(unsafe { raw.cast::<F>() })
            })
            .copied()
    }
}

impl<F> std::fmt::Debug for LazySymbol<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySymbol")
            .field("name", &self.name)
            .field("bound", &self.slot.get().is_some())
            .finish()
    }
}

/// Declare a table of lazily bound vendor entry points
///
/// Every field is a [`LazySymbol`] named after the exported symbol it binds.
///
/// ```ignore
/// symbol_table! {
///     pub struct PlatformSymbols {
///         c_pm_open: unsafe extern "C" fn(*const c_char) -> i32;
///         c_pm_close: unsafe extern "C" fn(i32) -> i32;
///     }
/// }
/// static PM: PlatformSymbols = PlatformSymbols::new();
/// ```
///
/// The declared signatures are trusted; they must match the library.
#[macro_export]
macro_rules! symbol_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $sym:ident : $ty:ty; )*
        }
    ) => {
        $(#[$meta])*
        #[allow(non_snake_case)]
        $vis struct $name {
            $( pub $sym: $crate::LazySymbol<$ty>, )*
        }

        impl $name {
            /// Table with every entry unbound
            pub const fn new() -> Self {
                // SAFETY: the declared signatures mirror the vendor headers.
                unsafe {
                    Self {
                        $( $sym: $crate::LazySymbol::new(stringify!($sym)), )*
                    }
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::tests::fake_binder;
    use crate::binder::tests::version_ok;
    use std::sync::atomic::Ordering;

    crate::symbol_table! {
        struct TestSymbols {
            c_pm_add_one: extern "C" fn(i32) -> i32;
            c_pm_missing: extern "C" fn() -> i32;
        }
    }

    #[test]
    fn test_resolved_once() {
        let (binder, counters) = fake_binder(Some(version_ok));
        let table = TestSymbols::new();
        assert!(!table.c_pm_add_one.is_bound());

        let f = table.c_pm_add_one.get(&binder).unwrap();
        assert_eq!(f(1), 2);
        // version symbol + c_pm_add_one
        let after_first = counters.lookups.load(Ordering::SeqCst);
        assert_eq!(after_first, 2);

        for i in 0..10 {
            let f = table.c_pm_add_one.get(&binder).unwrap();
            assert_eq!(f(i), i + 1);
        }
        assert_eq!(counters.lookups.load(Ordering::SeqCst), after_first);
        assert!(table.c_pm_add_one.is_bound());
    }

    #[test]
    fn test_failure_is_not_cached() {
        let (binder, counters) = fake_binder(Some(version_ok));
        let table = TestSymbols::new();

        for _ in 0..2 {
            let err = table.c_pm_missing.get(&binder).unwrap_err();
            assert_eq!(err, BindError::FunctionNotFound("c_pm_missing"));
        }
        assert!(!table.c_pm_missing.is_bound());
        // version symbol once, then one lookup per attempt
        assert_eq!(counters.lookups.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_every_entry_fails_without_version_symbol() {
        let (binder, _) = fake_binder(None);
        let table = TestSymbols::new();
        assert!(table.c_pm_add_one.get(&binder).unwrap_err().is_incompatible());
        assert!(table.c_pm_missing.get(&binder).unwrap_err().is_incompatible());
    }

    #[test]
    fn test_static_table() {
        static TABLE: TestSymbols = TestSymbols::new();
        let (binder, _) = fake_binder(Some(version_ok));
        assert_eq!(TABLE.c_pm_add_one.name(), "c_pm_add_one");
        assert_eq!((TABLE.c_pm_add_one.get(&binder).unwrap())(9), 10);
    }
}
