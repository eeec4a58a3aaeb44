//! Macros to support the implementation of conversion traits.

/// The main implementation macro for conversion traits.
///
/// See `convert.rs` for examples of this macro in use.
///
/// The arguments are:
///
/// - `@with_byte_impls`: an optional token which indicates that byte slice and vector trait impls
///   should be generated. If present, it must be the first argument.
///
/// - `$type`: the target type of the conversion traits. For example, this is `HeaderName` when
///   implementing `ToHeaderKey`.
///
/// - `$trait`: the name of the user-facing trait being implemented, for example
///   `ToHeaderKey`. This should be a trait with no methods that inherits from `$sealed`, where the
///    actual conversion methods exist. This trait is not defined in this macro expansion so that it
///    may be documented more easily.
///
/// - `$sealed`: the name of the supertrait that the caller gave to `$trait`. This is usually just
///   `Sealed`. This trait _is_ defined in the macro expansion, and so should not be defined by the
///   caller.
///
/// - `$invalid`: the [`ValidationError`][crate::error::ValidationError] variant that conversion
///   failure maps to.
///
/// - `$extra_bound*`: zero or more additional trait bounds that can be useful to apply to `$type`,
///   commonly `std::fmt::Debug` and `std::fmt::Display`.
///
/// The recommended pattern is to create a one-off module for each conversion trait, use the macro
/// in that module's scope, hand-write any non-standard implementations of `$sealed`, and then
/// export only `$trait`. This prevents other code from adding implementations of the trait or using
/// it as a monomorphic substitute for [`std::convert::TryInto`].
macro_rules! convert_fallible {
    ( $type:path, $trait:ident, $sealed:ident, $invalid:expr $(, $extra_bound:path )* ) => {
        #[allow(unused)]
        use std::str::FromStr;

        impl Borrowable<$type> for $type {
            fn as_ref(&self) -> &$type {
                self
            }
        }

        impl Borrowable<$type> for &$type {
            fn as_ref(&self) -> &$type {
                self
            }
        }

        impl $trait for $type {}
        impl<'a> $trait for &'a $type {}
        impl $trait for &str {}
        impl $trait for String {}
        impl $trait for &String {}

        pub trait $sealed {
            type Borrowable: Borrowable<$type> $(+ $extra_bound )*;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError>;
            fn into_owned(self) -> Result<$type, ValidationError>;
        }

        impl $sealed for $type {
            type Borrowable = $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                Ok(self)
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                Ok(self)
            }
        }

        impl<'a> $sealed for &'a $type {
            type Borrowable = &'a $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                Ok(self)
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                Ok(self.clone())
            }
        }

        impl $sealed for &str {
            type Borrowable = $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                <$type>::from_str(self).map_err(|_| $invalid)
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                $sealed::into_borrowable(self)
            }
        }

        impl $sealed for String {
            type Borrowable = $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                $sealed::into_borrowable(self.as_str())
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                $sealed::into_owned(self.as_str())
            }
        }

        impl $sealed for &String {
            type Borrowable = $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                $sealed::into_borrowable(self.as_str())
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                $sealed::into_owned(self.as_str())
            }
        }
    };
    ( @with_byte_impls, $type:path, $trait:ident, $sealed:ident, $invalid:expr $(, $extra_bound:path )* ) => {
        convert_fallible!($type, $trait, $sealed, $invalid $(, $extra_bound )*);

        impl $trait for &[u8] {}
        impl $trait for Vec<u8> {}
        impl $trait for &Vec<u8> {}

        impl $sealed for &[u8] {
            type Borrowable = $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                <$type>::try_from(self).map_err(|_| $invalid)
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                $sealed::into_borrowable(self)
            }
        }

        impl $sealed for Vec<u8> {
            type Borrowable = $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                $sealed::into_borrowable(self.as_slice())
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                $sealed::into_owned(self.as_slice())
            }
        }

        impl $sealed for &Vec<u8> {
            type Borrowable = $type;

            fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
                $sealed::into_borrowable(self.as_slice())
            }

            fn into_owned(self) -> Result<$type, ValidationError> {
                $sealed::into_owned(self.as_slice())
            }
        }
    };
}
