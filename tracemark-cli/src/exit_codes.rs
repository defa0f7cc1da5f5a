//! Process exit statuses, after sysexits.h.
//!
//! Scripts branch on these: 65 means the mark itself is missing, forged or
//! malformed, while 66 and 74 point at the filesystem.

use tracemark_core::TracemarkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    /// Anything not classified below
    General = 1,
    /// EX_USAGE: bad key or unsupported carrier
    Usage = 64,
    /// EX_DATAERR: no watermark, bad signature, malformed payload
    DataErr = 65,
    /// EX_NOINPUT: input file unreadable
    NoInput = 66,
    /// EX_UNAVAILABLE: capability missing from this build
    Unavailable = 69,
    /// EX_IOERR: output file unwritable
    IoErr = 74,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Pick a status for a failed command.
    ///
    /// A [`TracemarkError`] anywhere in the chain decides; otherwise the
    /// context messages the commands attach are matched.
    pub fn classify(err: &anyhow::Error) -> Self {
        if let Some(core) = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<TracemarkError>())
        {
            return Self::from_core(core);
        }

        let message = format!("{err:#}");
        if message.contains("Failed to read file") {
            Self::NoInput
        } else if message.contains("Failed to write") {
            Self::IoErr
        } else if message.contains("Verification failed")
            || message.contains("No watermark found")
            || message.contains("Invalid payload")
        {
            Self::DataErr
        } else if message.contains("Invalid key") || message.contains("Unsupported carrier") {
            Self::Usage
        } else if message.contains("unavailable") {
            Self::Unavailable
        } else {
            Self::General
        }
    }

    fn from_core(err: &TracemarkError) -> Self {
        match err {
            TracemarkError::Key(_) => Self::Usage,
            TracemarkError::NativeUnavailable => Self::Unavailable,
            TracemarkError::Io(_) => Self::IoErr,
            TracemarkError::TaskJoin(_) => Self::General,
            TracemarkError::Format(_)
            | TracemarkError::SignatureMismatch(_)
            | TracemarkError::CapacityExceeded { .. }
            | TracemarkError::ImageTooLarge { .. }
            | TracemarkError::ImageCodec(_)
            | TracemarkError::InsertionPointNotFound { .. } => Self::DataErr,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}
