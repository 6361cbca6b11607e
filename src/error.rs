use thiserror::Error;

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
/// Only structural problems surface as errors from the public API. Everything a handler
/// finds while examining instructions is reported as a classification in the
/// [`crate::rewriter::RewriteReport`] instead, so a single misbehaving handler never aborts
/// the pass for the rest of a module.
///
/// # Error Categories
///
/// ## Module Parsing Errors
/// - [`Error::Malformed`] - Corrupted container, unknown opcode, truncated operand, dangling token
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::Empty`] - Empty input provided
///
/// ## Rewriting Errors
/// - [`Error::IncompatibleFacade`] - A facade target does not offer a compatible call shape
/// - [`Error::Handler`] - A handler could not complete its examination
///
/// # Examples
///
/// ```rust
/// use dotshim::{metadata::BinaryModule, Error};
///
/// match BinaryModule::from_bytes(&[0x00, 0x01]) {
///     Ok(module) => println!("Loaded {}", module.name()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed module: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The module is damaged and could not be decoded.
    ///
    /// Raised for corrupt container metadata, unknown opcodes, truncated instruction
    /// streams and token operands which point at reference rows that do not exist.
    /// Such modules are rejected before any handler sees them.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a buffer.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// A facade rewrite target has an incompatible call shape.
    ///
    /// Produced by facade handlers when the replacement type does not declare a member
    /// with the same name and parameter count as the original call. The pass turns this
    /// into a `detected-incompatible-facade` classification and leaves the call untouched.
    #[error("Facade {facade} has no member compatible with {member}")]
    IncompatibleFacade {
        /// Display form of the original member reference
        member: String,
        /// Full name of the facade type that was searched
        facade: String,
    },

    /// A handler failed to examine an instruction or module header.
    #[error("Handler {name} failed: {message}")]
    Handler {
        /// Name of the failing handler
        name: &'static str,
        /// Description of the failure
        message: String,
    },

    /// The rewrite mappings handed to the pipeline builder are inconsistent.
    ///
    /// Raised when a mapping target is itself a mapping key, which would make the
    /// result of a pass depend on how often it runs.
    #[error("Invalid rewrite mapping: {0}")]
    InvalidMapping(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` if this error describes a structurally broken module.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::Malformed { .. } | Error::OutOfBounds { .. } | Error::Empty
        )
    }
}
