use std::borrow::Cow;
use std::fs::File;

use bytes::Bytes;
use bytestr::ByteStr;

use super::{Backend, OpenMode, Stream};

macro_rules! from_bytes {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Stream {
                fn from(data: $ty) -> Self {
                    Stream::from_bytes(data)
                }
            }
        )*
    };
}
from_bytes!(Bytes, Vec<u8>, Box<[u8]>, String, &'static [u8], &'static str);

impl From<ByteStr> for Stream {
    fn from(data: ByteStr) -> Self {
        Stream::from_bytes(Bytes::from(data))
    }
}

impl From<Cow<'_, [u8]>> for Stream {
    fn from(data: Cow<'_, [u8]>) -> Self {
        Stream::from_bytes(data.into_owned())
    }
}

impl From<Cow<'_, str>> for Stream {
    fn from(data: Cow<'_, str>) -> Self {
        Stream::from_bytes(data.into_owned())
    }
}

/// Wraps an already opened file as a readable and writable stream.
impl From<File> for Stream {
    fn from(file: File) -> Self {
        Stream::with_backend(Backend::File(file), OpenMode::READ_WRITE, None)
    }
}
