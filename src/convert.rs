//! Convenient conversion traits.
//
// This module contains traits which make using the crate feel a little bit more like using a
// dynamically-typed language. By making our methods take `impl ToHeaderKey`, for example, rather
// than `HeaderName`, we allow a variety of types to be used as arguments without burdening the end
// user with a lot of explicit conversions.
//
// These traits are similar in spirit to [`std::convert::TryInto`], but failures are reported as
// the crate's `ValidationError` so that the exact contract message for each argument position is
// produced at the point of conversion.
//
// Some complicated trait design is used so that if a method does not need an owned value, it can
// borrow the value passed in and avoid a clone. Luckily, we are able to use sealed traits to hide
// this complexity from the end user.
#[macro_use]
mod macros;

use crate::error::ValidationError;
use ::url::Url;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;

pub(crate) use self::borrowable::Borrowable;
pub use self::header_key::ToHeaderKey;
pub use self::header_value::ToHeaderValue;
pub use self::status_code::ToStatusCode;

mod borrowable {
    pub trait Borrowable<T> {
        fn as_ref(&self) -> &T;
    }
}

mod header_key {
    use super::*;

    /// Types that can be converted to a [`HeaderName`] for use as a header key.
    ///
    /// Some methods in this crate accept `impl ToHeaderKey` arguments. Any of the types below can
    /// be passed as those arguments and the conversion will be performed automatically. When the
    /// conversion fails, the calling method returns
    /// [`ValidationError::HeaderKey`][crate::error::ValidationError::HeaderKey].
    ///
    /// | Source type                                                | Can fail? |
    /// |------------------------------------------------------------|-----------|
    /// | [`HeaderName` or `&HeaderName`][`HeaderName`]              | No        |
    /// | [`&str`][`str`], [`String`, or `&String`][`String`]        | Yes       |
    /// | [`&[u8]`][`std::slice`], [`Vec<u8>`, or `&Vec<u8>`][`Vec`] | Yes       |
    pub trait ToHeaderKey: Sealed {}

    convert_fallible!(
        @with_byte_impls,
        HeaderName,
        ToHeaderKey,
        Sealed,
        ValidationError::HeaderKey,
        std::fmt::Debug,
        std::fmt::Display
    );
}

mod header_value {
    use super::*;

    /// Types that can be converted to a [`HeaderValue`].
    ///
    /// Some methods in this crate accept `impl ToHeaderValue` arguments. Any of the types below
    /// can be passed as those arguments and the conversion will be performed automatically. When
    /// the conversion fails, the calling method returns
    /// [`ValidationError::HeaderValue`][crate::error::ValidationError::HeaderValue].
    ///
    /// | Source type                                                | Can fail? |
    /// |------------------------------------------------------------|-----------|
    /// | [`HeaderName` or `&HeaderName`][`HeaderName`]              | No        |
    /// | [`HeaderValue` or `&HeaderValue`][`HeaderValue`]           | No        |
    /// | [`Url` or `&Url`][`Url`]                                   | No        |
    /// | [`&str`][`str`], [`String`, or `&String`][`String`]        | Yes       |
    /// | [`&[u8]`][`std::slice`], [`Vec<u8>`, or `&Vec<u8>`][`Vec`] | Yes       |
    pub trait ToHeaderValue: Sealed {}

    convert_fallible!(
        @with_byte_impls,
        HeaderValue,
        ToHeaderValue,
        Sealed,
        ValidationError::HeaderValue,
        std::fmt::Debug
    );

    impl ToHeaderValue for HeaderName {}
    impl ToHeaderValue for &HeaderName {}
    impl ToHeaderValue for Url {}
    impl ToHeaderValue for &Url {}

    impl Sealed for HeaderName {
        type Borrowable = HeaderValue;

        fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
            Ok(HeaderValue::from(self))
        }

        fn into_owned(self) -> Result<HeaderValue, ValidationError> {
            Ok(HeaderValue::from(self))
        }
    }

    impl Sealed for &HeaderName {
        type Borrowable = HeaderValue;

        fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
            Ok(HeaderValue::from(self.clone()))
        }

        fn into_owned(self) -> Result<HeaderValue, ValidationError> {
            Ok(HeaderValue::from(self.clone()))
        }
    }

    impl Sealed for Url {
        type Borrowable = HeaderValue;

        fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
            Sealed::into_borrowable(self.as_str())
        }

        fn into_owned(self) -> Result<HeaderValue, ValidationError> {
            Sealed::into_owned(self.as_str())
        }
    }

    impl Sealed for &Url {
        type Borrowable = HeaderValue;

        fn into_borrowable(self) -> Result<Self::Borrowable, ValidationError> {
            Sealed::into_borrowable(self.as_str())
        }

        fn into_owned(self) -> Result<HeaderValue, ValidationError> {
            Sealed::into_owned(self.as_str())
        }
    }
}

mod status_code {
    use super::*;

    /// Types that can be converted to a [`StatusCode`].
    ///
    /// Some methods in this crate accept `impl ToStatusCode` arguments. Any of the types below can
    /// be passed as those arguments and the conversion will be performed automatically. When the
    /// conversion fails, the calling method returns
    /// [`ValidationError::StatusCode`][crate::error::ValidationError::StatusCode].
    ///
    /// | Source type                                         | Can fail? |
    /// |-----------------------------------------------------|-----------|
    /// | [`StatusCode` or `&StatusCode`][`StatusCode`]       | No        |
    /// | [`u16`]                                             | Yes       |
    /// | [`i32`]                                             | Yes       |
    /// | [`&str`][`str`], [`String`, or `&String`][`String`] | Yes       |
    pub trait ToStatusCode: Sealed {}

    impl ToStatusCode for StatusCode {}
    impl ToStatusCode for &StatusCode {}
    impl ToStatusCode for u16 {}
    impl ToStatusCode for i32 {}
    impl ToStatusCode for &str {}
    impl ToStatusCode for String {}
    impl ToStatusCode for &String {}

    pub trait Sealed {
        fn into_status_code(self) -> Result<StatusCode, ValidationError>;
    }

    impl Sealed for StatusCode {
        fn into_status_code(self) -> Result<StatusCode, ValidationError> {
            Ok(self)
        }
    }

    impl Sealed for &StatusCode {
        fn into_status_code(self) -> Result<StatusCode, ValidationError> {
            Ok(*self)
        }
    }

    impl Sealed for u16 {
        fn into_status_code(self) -> Result<StatusCode, ValidationError> {
            StatusCode::from_u16(self).map_err(|_| ValidationError::StatusCode)
        }
    }

    impl Sealed for i32 {
        fn into_status_code(self) -> Result<StatusCode, ValidationError> {
            u16::try_from(self)
                .map_err(|_| ValidationError::StatusCode)
                .and_then(Sealed::into_status_code)
        }
    }

    impl Sealed for &str {
        fn into_status_code(self) -> Result<StatusCode, ValidationError> {
            self.parse::<u16>()
                .map_err(|_| ValidationError::StatusCode)
                .and_then(Sealed::into_status_code)
        }
    }

    impl Sealed for String {
        fn into_status_code(self) -> Result<StatusCode, ValidationError> {
            Sealed::into_status_code(self.as_str())
        }
    }

    impl Sealed for &String {
        fn into_status_code(self) -> Result<StatusCode, ValidationError> {
            Sealed::into_status_code(self.as_str())
        }
    }
}
