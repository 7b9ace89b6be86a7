//! Typed handles.
//!
//! Each arena in the linker gets its own key type so a connection handle can
//! never index the module arena by accident.

/// Declares a `u32` newtype usable as an [`Arena`](crate::Arena) key.
///
/// The generated type is `Copy`, ordered by slot, hashable, printable as its
/// slot number and serde-serializable, so the invoking crate needs `serde`
/// in its dependencies.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Handle for slot `index`.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Slot number.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl $crate::ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                $name::from_raw(index)
            }

            fn as_raw(self) -> u32 {
                $name::as_raw(self)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    crate::define_id!(
        /// Handle used by the macro tests.
        PortId
    );

    #[test]
    fn displays_slot_number() {
        assert_eq!(PortId::from_raw(7).to_string(), "7");
        assert_eq!(PortId::from_raw(7).as_raw(), 7);
    }

    #[test]
    fn sorts_by_slot() {
        let ids: BTreeSet<PortId> = [5, 1, 3, 1].into_iter().map(PortId::from_raw).collect();
        let raw: Vec<u32> = ids.into_iter().map(PortId::as_raw).collect();
        assert_eq!(raw, vec![1, 3, 5]);
    }

    #[test]
    fn serializes_as_bare_number() {
        assert_eq!(serde_json::to_string(&PortId::from_raw(12)).unwrap(), "12");
        let back: PortId = serde_json::from_str("12").unwrap();
        assert_eq!(back, PortId::from_raw(12));
    }
}
