use core::fmt;
use core::str::FromStr;
use std::fs::OpenOptions;

use crate::Error;

/// A parsed `fopen`-style open mode such as `"rb"`, `"w+"` or `"a"`.
///
/// The base letter decides how a file is opened; a `+` adds the missing half of
/// read/write access. `b` and `t` flags are accepted and ignored.
///
/// | mode | readable | writable | creates | truncates | appends |
/// |------|----------|----------|---------|-----------|---------|
/// | `r`  | yes      | `+`      | no      | no        | no      |
/// | `w`  | `+`      | yes      | yes     | yes       | no      |
/// | `a`  | `+`      | yes      | yes     | no        | yes     |
/// | `x`  | `+`      | yes      | new     | no        | no      |
/// | `c`  | `+`      | yes      | yes     | no        | no      |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    base: Base,
    plus: bool,
    raw: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    Read,
    Write,
    Append,
    Exclusive,
    Create,
}

impl OpenMode {
    /// `r+b`, the mode of in-memory streams.
    pub const READ_WRITE: Self = Self {
        base: Base::Read,
        plus: true,
        raw: "r+b",
    };
    /// `rb`, used for uploaded temporary files and plain readers.
    pub const READ: Self = Self {
        base: Base::Read,
        plus: false,
        raw: "rb",
    };
    /// `wb`, used for move destinations and plain writers.
    pub const WRITE: Self = Self {
        base: Base::Write,
        plus: false,
        raw: "wb",
    };

    /// Returns `true` if a stream opened with this mode can be read.
    pub const fn is_readable(self) -> bool {
        self.plus || matches!(self.base, Base::Read)
    }

    /// Returns `true` if a stream opened with this mode can be written.
    pub const fn is_writable(self) -> bool {
        self.plus || !matches!(self.base, Base::Read)
    }

    /// Returns the canonical spelling of this mode.
    pub const fn as_str(self) -> &'static str {
        self.raw
    }

    pub(crate) fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.is_readable())
            .write(self.is_writable());
        match self.base {
            Base::Read => {}
            Base::Write => {
                options.create(true).truncate(true);
            }
            Base::Append => {
                options.create(true).append(true);
            }
            Base::Exclusive => {
                options.create_new(true);
            }
            Base::Create => {
                options.create(true);
            }
        }
        options
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::invalid_argument(format!("invalid stream mode {mode:?}"));

        let mut chars = mode.chars();
        let base = match chars.next() {
            Some('r') => Base::Read,
            Some('w') => Base::Write,
            Some('a') => Base::Append,
            Some('x') => Base::Exclusive,
            Some('c') => Base::Create,
            _ => return Err(invalid()),
        };

        let mut plus = false;
        for flag in chars {
            match flag {
                '+' if !plus => plus = true,
                'b' | 't' => {}
                _ => return Err(invalid()),
            }
        }

        let raw = match (base, plus) {
            (Base::Read, false) => "rb",
            (Base::Read, true) => "r+b",
            (Base::Write, false) => "wb",
            (Base::Write, true) => "w+b",
            (Base::Append, false) => "ab",
            (Base::Append, true) => "a+b",
            (Base::Exclusive, false) => "xb",
            (Base::Exclusive, true) => "x+b",
            (Base::Create, false) => "cb",
            (Base::Create, true) => "c+b",
        };
        Ok(Self { base, plus, raw })
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("r", true, false)]
    #[case("rb", true, false)]
    #[case("r+", true, true)]
    #[case("w", false, true)]
    #[case("w+b", true, true)]
    #[case("a", false, true)]
    #[case("a+", true, true)]
    #[case("x", false, true)]
    #[case("c+t", true, true)]
    fn capabilities_follow_mode(
        #[case] mode: &str,
        #[case] readable: bool,
        #[case] writable: bool,
    ) {
        let mode: OpenMode = mode.parse().unwrap();
        assert_eq!(mode.is_readable(), readable);
        assert_eq!(mode.is_writable(), writable);
    }

    #[rstest]
    #[case("")]
    #[case("q")]
    #[case("r++")]
    #[case("rw")]
    fn rejects_unknown_modes(#[case] mode: &str) {
        assert!(matches!(
            mode.parse::<OpenMode>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn canonical_spelling() {
        assert_eq!("r+".parse::<OpenMode>().unwrap().as_str(), "r+b");
        assert_eq!(OpenMode::READ.to_string(), "rb");
    }
}
