use std::borrow::Cow;

use bytestr::ByteStr;
use http::{HeaderMap, HeaderName, HeaderValue};

use super::{Headers, Validated};
use crate::{Error, Result};

/// Types that can be used as one or more header values.
///
/// Implemented for string-like types (a single value), integers, and
/// vectors, arrays and slices of string-like types (several values).
pub trait IntoHeaderValues {
    /// Converts `self` into the list of raw, not yet validated values.
    fn into_header_values(self) -> Vec<String>;
}

macro_rules! single_value {
    ($($ty:ty),*) => {
        $(
            impl IntoHeaderValues for $ty {
                fn into_header_values(self) -> Vec<String> {
                    vec![self.to_string()]
                }
            }
        )*
    };
}
single_value!(&str, String, &String, Cow<'_, str>, u16, u32, u64, usize, i32, i64);

impl IntoHeaderValues for ByteStr {
    fn into_header_values(self) -> Vec<String> {
        vec![self.as_str().to_owned()]
    }
}

impl<T: Into<String>> IntoHeaderValues for Vec<T> {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<String>, const N: usize> IntoHeaderValues for [T; N] {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: AsRef<str>> IntoHeaderValues for &[T] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|value| value.as_ref().to_owned()).collect()
    }
}

impl TryFrom<&Headers> for HeaderMap {
    type Error = Error;

    /// Converts to an `http` header map. Names are lowercased by `http`; values
    /// carrying an obs-fold cannot be represented and are rejected.
    fn try_from(headers: &Headers) -> Result<Self> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, values) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|error| Error::invalid_header(format!("{name:?}: {error}")))?;
            for value in values {
                let value = HeaderValue::from_str(value)
                    .map_err(|error| Error::invalid_header(format!("{name}: {error}")))?;
                map.append(name.clone(), value);
            }
        }
        Ok(map)
    }
}

impl TryFrom<&HeaderMap> for Headers {
    type Error = Error;

    /// Imports an `http` header map. Values that are not valid UTF-8 are decoded lossily.
    fn try_from(map: &HeaderMap) -> Result<Self> {
        let mut headers = Headers::new();
        for (name, value) in map {
            let value = String::from_utf8_lossy(value.as_bytes());
            headers.append(Validated::new(name.as_str(), value)?);
        }
        Ok(headers)
    }
}
