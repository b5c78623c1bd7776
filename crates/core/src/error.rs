use crate::native::NativeResult;

/// Result alias that carries the custom [`GlassesError`] type.
pub type Result<T> = std::result::Result<T, GlassesError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum GlassesError {
    /// Free-form message for conditions that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// The registry could not build a subsystem. Never cached, so the next
    /// request for the same id attempts construction again.
    #[error("failed to construct subsystem `{id}` ({type_name}): {reason}")]
    Construction {
        id: String,
        type_name: &'static str,
        reason: String,
    },
    /// An id is already bound to a subsystem of a different type.
    #[error("subsystem `{id}` is registered with a type other than {expected}")]
    DescriptorMismatch { id: String, expected: &'static str },
    /// A native call reported a failure code.
    #[error("native call `{operation}` failed with {result:?}")]
    Native {
        operation: &'static str,
        result: NativeResult,
    },
    /// The hardware backend was selected but no native layer was supplied.
    #[error("hardware backend requires a native {0} implementation")]
    MissingNativeLayer(&'static str),
    /// Simulated scene objects may only be created while the main-thread
    /// queue is being drained.
    #[error("`{0}` must run on the main-thread tick")]
    OffMainThread(&'static str),
    /// Device queries were issued while the glasses are not running.
    #[error("device is not available")]
    DeviceUnavailable,
    /// A shared lock was poisoned by a panicking holder.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
}

impl GlassesError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for GlassesError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for GlassesError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
