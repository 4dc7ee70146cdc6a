use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{UploadErrorCode, UploadedFile};
use crate::{Error, Result};

/// A normalized upload field: a single file, a list, or a map keyed by field name.
///
/// The shape mirrors the form field names, so `files[a][b]` ends up as
/// `Map { "a": Map { "b": File } }` under the `files` field.
#[derive(Debug, Clone)]
pub enum UploadTree {
    /// A single uploaded file.
    File(UploadedFile),
    /// Files submitted under a list-style field name such as `files[]`.
    List(Vec<UploadTree>),
    /// Files submitted under named sub-keys such as `files[avatar]`, in submitted order.
    Map(IndexMap<String, UploadTree>),
}

impl UploadTree {
    /// Returns the file if this node is a leaf.
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// Returns the children if this node is a list.
    pub fn as_list(&self) -> Option<&[UploadTree]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Returns the children if this node is a map.
    pub fn as_map(&self) -> Option<&IndexMap<String, UploadTree>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a child of a map node.
    pub fn get(&self, key: &str) -> Option<&UploadTree> {
        self.as_map()?.get(key)
    }

    /// Returns every file in this subtree, depth first.
    pub fn files(&self) -> Vec<&UploadedFile> {
        let mut files = Vec::new();
        self.collect_into(&mut files);
        files
    }

    fn collect_into<'a>(&'a self, files: &mut Vec<&'a UploadedFile>) {
        match self {
            Self::File(file) => files.push(file),
            Self::List(list) => list.iter().for_each(|node| node.collect_into(files)),
            Self::Map(map) => map.values().for_each(|node| node.collect_into(files)),
        }
    }
}

impl From<UploadedFile> for UploadTree {
    fn from(file: UploadedFile) -> Self {
        Self::File(file)
    }
}

/// Normalizes a raw upload table into one [`UploadTree`] per form field.
///
/// Each field holds a descriptor with the keys `tmp_name`, `size`, `error`, `name`
/// and `type`, every one a parallel structure of the same shape. `null` means no
/// uploads. Temporary files are opened read-only; failed uploads keep their error
/// code and get no stream.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if a descriptor is malformed: not an object,
/// missing `tmp_name`, an unknown error code, a non-integer size, or non-string
/// client fields. Returns [`Error::Transport`] if a temporary file cannot be opened.
///
/// # Examples
///
/// ```rust
/// use http_message_kit::normalize_files;
/// use serde_json::json;
///
/// let files = normalize_files(&json!({
///     "avatar": {
///         "tmp_name": null,
///         "size": 0,
///         "error": 4,
///         "name": "",
///         "type": "",
///     }
/// }))?;
///
/// let avatar = files["avatar"].as_file().unwrap();
/// assert!(!avatar.error().is_ok());
/// # Ok::<(), http_message_kit::Error>(())
/// ```
pub fn normalize_files(files: &Value) -> Result<IndexMap<String, UploadTree>> {
    let fields = match files {
        Value::Null => return Ok(IndexMap::new()),
        Value::Object(fields) => fields,
        _ => return Err(Error::invalid_argument("upload table must be an object")),
    };

    fields
        .iter()
        .map(|(field, value)| -> Result<(String, UploadTree)> {
            let descriptor = Descriptor::parse(field, value)?;
            Ok((field.clone(), descriptor.normalize(field)?))
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Key<'a> {
    Index(usize),
    Name(&'a str),
}

/// How a descriptor node is laid out, decided from its `tmp_name`.
enum Shape<'a> {
    Leaf,
    FlatList(usize),
    Nested(Nested<'a>),
}

enum Nested<'a> {
    List(usize),
    Map(&'a Map<String, Value>),
}

/// Borrowed view of one descriptor level. Missing parallel fields are `None`.
#[derive(Debug, Clone, Copy)]
struct Descriptor<'a> {
    tmp_name: &'a Value,
    size: Option<&'a Value>,
    error: Option<&'a Value>,
    name: Option<&'a Value>,
    media_type: Option<&'a Value>,
}

impl<'a> Descriptor<'a> {
    fn parse(field: &str, value: &'a Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::invalid_argument(format!(
                "upload descriptor {field:?} must be an object"
            )));
        };
        let tmp_name = map.get("tmp_name").ok_or_else(|| {
            Error::invalid_argument(format!("upload descriptor {field:?} has no tmp_name"))
        })?;
        Ok(Self {
            tmp_name,
            size: map.get("size"),
            error: map.get("error"),
            name: map.get("name"),
            media_type: map.get("type"),
        })
    }

    fn shape(&self) -> Shape<'a> {
        match self.tmp_name {
            Value::Array(items) if items.iter().all(is_scalar) => Shape::FlatList(items.len()),
            Value::Array(items) => Shape::Nested(Nested::List(items.len())),
            Value::Object(map) => Shape::Nested(Nested::Map(map)),
            _ => Shape::Leaf,
        }
    }

    /// Transposes the five parallel structures at `key`.
    fn at(&self, key: Key<'_>) -> Option<Self> {
        Some(Self {
            tmp_name: child(Some(self.tmp_name), key)?,
            size: child(self.size, key),
            error: child(self.error, key),
            name: child(self.name, key),
            media_type: child(self.media_type, key),
        })
    }

    fn normalize(&self, path: &str) -> Result<UploadTree> {
        match self.shape() {
            Shape::Leaf => self.file(path).map(UploadTree::File),
            Shape::FlatList(len) => (0..len)
                .map(|index| -> Result<UploadTree> {
                    let path = format!("{path}[{index}]");
                    self.child(Key::Index(index), &path)?
                        .file(&path)
                        .map(UploadTree::File)
                })
                .collect::<Result<_>>()
                .map(UploadTree::List),
            Shape::Nested(Nested::List(len)) => (0..len)
                .map(|index| -> Result<UploadTree> {
                    let path = format!("{path}[{index}]");
                    self.child(Key::Index(index), &path)?.normalize(&path)
                })
                .collect::<Result<_>>()
                .map(UploadTree::List),
            Shape::Nested(Nested::Map(map)) => map
                .keys()
                .map(|key| -> Result<(String, UploadTree)> {
                    let path = format!("{path}[{key}]");
                    let node = self.child(Key::Name(key), &path)?.normalize(&path)?;
                    Ok((key.clone(), node))
                })
                .collect::<Result<_>>()
                .map(UploadTree::Map),
        }
    }

    fn child(&self, key: Key<'_>, path: &str) -> Result<Self> {
        self.at(key)
            .ok_or_else(|| Error::invalid_argument(format!("upload descriptor {path:?} is missing")))
    }

    fn file(&self, path: &str) -> Result<UploadedFile> {
        let malformed =
            |what: &str| Error::invalid_argument(format!("upload {path:?} has an invalid {what}"));

        let size = match self.size {
            None | Some(Value::Null) => None,
            Some(size) => Some(size.as_u64().ok_or_else(|| malformed("size"))?),
        };
        let error = match self.error {
            None | Some(Value::Null) => UploadErrorCode::Ok,
            Some(code) => UploadErrorCode::try_from(code.as_i64().ok_or_else(|| malformed("error"))?)?,
        };
        let client_filename = optional_string(self.name).ok_or_else(|| malformed("name"))?;
        let client_media_type =
            optional_string(self.media_type).ok_or_else(|| malformed("type"))?;

        log::trace!("normalizing upload {path:?}: {error:?}, {size:?} bytes");

        if !error.is_ok() {
            return Ok(UploadedFile::failed(
                size,
                error,
                client_filename,
                client_media_type,
            ));
        }
        let Value::String(tmp_name) = self.tmp_name else {
            return Err(malformed("tmp_name"));
        };
        UploadedFile::from_path(tmp_name, size, error, client_filename, client_media_type)
    }
}

fn child<'a>(value: Option<&'a Value>, key: Key<'_>) -> Option<&'a Value> {
    match (value?, key) {
        (Value::Array(items), Key::Index(index)) => items.get(index),
        (Value::Object(map), Key::Name(name)) => map.get(name),
        _ => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// `Some(None)` for absent, `null` or empty strings, `None` for anything that is not a string.
fn optional_string(value: Option<&Value>) -> Option<Option<String>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(text)) if text.is_empty() => Some(None),
        Some(Value::String(text)) => Some(Some(text.clone())),
        Some(_) => None,
    }
}
