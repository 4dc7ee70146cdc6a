//! Case-insensitive, case-preserving, multi-valued header storage.
//!
//! [`Headers`] keeps header entries in insertion order, which is the order they
//! would be emitted on the wire. Lookups ignore ASCII case, while the stored
//! name keeps the casing of the write that created it.
//!
//! A `Headers` value is never shared between messages: every `with_*` call on a
//! message clones the whole bag, applies one change and hands the copy to the
//! new message.
//!
//! # Examples
//!
//! ```rust
//! use http_message_kit::{HttpMessage, Message};
//!
//! let message = Message::new()
//!     .with_header("X-Trace-Id", "abc")?
//!     .with_added_header("x-trace-id", ["def", "ghi"])?;
//!
//! assert_eq!(message.header("X-TRACE-ID"), ["abc", "def", "ghi"]);
//! assert_eq!(message.header_line("x-trace-id"), "abc, def, ghi");
//! # Ok::<(), http_message_kit::Error>(())
//! ```
mod convert;
pub(crate) mod syntax;

pub use convert::IntoHeaderValues;

use std::collections::HashMap;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    values: Vec<String>,
}

/// An ordered header bag with case-insensitive lookup.
///
/// Entries are stored once per name under ASCII case-insensitive comparison and
/// indexed by their lowercase name, so lookups never scan the whole bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

/// A header name and values that passed validation and trimming.
#[derive(Debug)]
pub(crate) struct Validated {
    name: String,
    values: Vec<String>,
}

impl Validated {
    /// Checks the header name and every value, trimming values of SP / HTAB.
    ///
    /// An empty list of values is rejected, there is no way to express it on the wire.
    pub(crate) fn new(name: &str, values: impl IntoHeaderValues) -> Result<Self> {
        let validated = syntax::validate_name(name).and_then(|()| {
            let values = values.into_header_values();
            if values.is_empty() {
                return Err(crate::Error::invalid_header(format!(
                    "header {name:?} needs at least one value"
                )));
            }
            let values = values
                .iter()
                .map(|value| {
                    let value = syntax::trim_value(value);
                    syntax::validate_value(name, value).map(|()| value.to_owned())
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Self {
                name: name.to_owned(),
                values,
            })
        });

        if let Err(error) = &validated {
            log::debug!("rejected header {name:?}: {error}");
        }
        validated
    }
}

impl Headers {
    /// Creates an empty header bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header bag from name/value pairs, appending repeated names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`](crate::Error::InvalidHeader) if any name or value is illegal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::Headers;
    ///
    /// let headers = Headers::try_from_pairs([("Accept", "text/html"), ("accept", "*/*")])?;
    /// assert_eq!(headers.get("ACCEPT"), ["text/html", "*/*"]);
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn try_from_pairs<I, N, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: IntoHeaderValues,
    {
        let mut headers = Self::new();
        for (name, values) in pairs {
            headers.append(Validated::new(name.as_ref(), values)?);
        }
        Ok(headers)
    }

    /// Returns the number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a header with this name exists, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns every value of a header, or an empty slice if it is absent.
    pub fn get(&self, name: &str) -> &[String] {
        self.position(name)
            .map(|at| self.entries[at].values.as_slice())
            .unwrap_or_default()
    }

    /// Returns the values of a header joined with `", "`, or an empty string.
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Returns the stored (case-preserved) name for a header.
    pub fn stored_name(&self, name: &str) -> Option<&str> {
        self.position(name).map(|at| self.entries[at].name.as_str())
    }

    /// Iterates over `(name, values)` pairs in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Replaces any existing entry and appends the new one at the end.
    pub(crate) fn set(&mut self, header: Validated) {
        self.remove(&header.name);
        self.push(header.name, header.values);
    }

    /// Replaces any existing entry and puts the new one in front of all others.
    pub(crate) fn set_first(&mut self, header: Validated) {
        self.remove(&header.name);
        self.entries.insert(
            0,
            Entry {
                name: header.name,
                values: header.values,
            },
        );
        self.reindex();
    }

    /// Appends values to an existing entry, keeping its stored name and position.
    pub(crate) fn append(&mut self, header: Validated) {
        match self.position(&header.name) {
            Some(at) => self.entries[at].values.extend(header.values),
            None => self.push(header.name, header.values),
        }
    }

    /// Removes an entry, returning whether one existed.
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(at) => {
                self.entries.remove(at);
                self.reindex();
                true
            }
            None => false,
        }
    }

    fn push(&mut self, name: String, values: Vec<String>) {
        self.index
            .insert(name.to_ascii_lowercase(), self.entries.len());
        self.entries.push(Entry { name, values });
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(at, entry)| (entry.name.to_ascii_lowercase(), at))
            .collect();
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
