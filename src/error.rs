use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Loading a module either succeeds completely or fails with one of the parsing variants
/// ([`Error::Malformed`], [`Error::OutOfBounds`], [`Error::Empty`], [`Error::NotSupported`]).
/// These are fatal for the module in question and are never retried. Incompatibilities found
/// while scanning are *not* errors; they are reported through
/// [`crate::compat::Verdict::Reject`].
///
/// # Examples
///
/// ```rust
/// use modcompat::{Error, metadata::module::Module};
///
/// match Module::from_mem(vec![0x00, 0x01]) {
///     Ok(_) => println!("loaded"),
///     Err(Error::NotSupported) => println!("not a module"),
///     Err(Error::Malformed { message, .. }) => println!("malformed: {message}"),
///     Err(e) => println!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The module is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the module.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// This file type is not supported.
    ///
    /// Returned when the input does not start with the module magic or uses a format
    /// version this library does not understand.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A token does not point to a valid row of its table.
    #[error("Invalid token - {0}")]
    InvalidToken(Token),

    /// A requested in-place replacement would change the shape of the instruction stream.
    ///
    /// Rewrites must keep the encoded size of an instruction, so that branch offsets
    /// and instruction positions stay valid.
    #[error("Rewrite rejected - {0}")]
    RewriteRejected(String),

    /// A rule catalogue or redirect table could not be loaded.
    #[error("Invalid catalogue - {0}")]
    Catalogue(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Catalogue(error.to_string())
    }
}
