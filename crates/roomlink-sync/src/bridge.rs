//! Best-effort mirroring of booking fields into an embedding parent context.
//!
//! When the meeting page runs embedded, the parent page has its own
//! `booking-id`, `client-name` and `client-email` fields that should follow
//! the booking. The parent may be absent or unreachable; that is an ordinary
//! outcome, not an error, and nothing here may fail the caller.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use roomlink_core::BookingRecord;

/// Parent-side fields the bridge knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentField {
    BookingId,
    ClientName,
    ClientEmail,
}

impl ParentField {
    /// Stable element identifier in the parent document.
    pub const fn element_id(&self) -> &'static str {
        match self {
            Self::BookingId => "booking-id",
            Self::ClientName => "client-name",
            Self::ClientEmail => "client-email",
        }
    }
}

/// Failure to reach or write into the parent context.
#[derive(Debug, thiserror::Error)]
pub enum FrameAccessError {
    #[error("Parent context is not accessible: {0}")]
    Denied(String),

    #[error("Parent field {0} not found")]
    MissingField(&'static str),

    #[error("Parent context I/O error: {0}")]
    Io(String),
}

/// A reachable parent context.
pub trait ParentFrame: Send + Sync {
    fn set_field(&self, field: ParentField, value: &str) -> Result<(), FrameAccessError>;
}

/// Result of one mirroring attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// No parent context; nothing to do.
    Detached,
    /// Parent reached; `fields` values were written.
    Synced { fields: usize },
}

#[derive(Clone, Default)]
pub struct CrossFrameBridge {
    parent: Option<Arc<dyn ParentFrame>>,
}

impl std::fmt::Debug for CrossFrameBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossFrameBridge")
            .field("attached", &self.parent.is_some())
            .finish()
    }
}

impl CrossFrameBridge {
    pub fn new(parent: Arc<dyn ParentFrame>) -> Self {
        Self {
            parent: Some(parent),
        }
    }

    /// A bridge for a page that is not embedded.
    pub fn detached() -> Self {
        Self { parent: None }
    }

    /// Resolve the parent lazily; a failed resolution yields a detached bridge.
    pub fn resolve<F>(resolver: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn ParentFrame>, FrameAccessError>,
    {
        match resolver() {
            Ok(parent) => Self::new(parent),
            Err(e) => {
                debug!(error = %e, "No parent context available");
                Self::detached()
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }

    /// Copy `id`, `client_name` and `client_email` into the parent.
    ///
    /// Individual field failures are logged at debug and skipped.
    pub fn mirror(&self, record: &BookingRecord) -> BridgeOutcome {
        let Some(parent) = &self.parent else {
            return BridgeOutcome::Detached;
        };

        let values = [
            (ParentField::BookingId, Some(record.id.as_str())),
            (ParentField::ClientName, record.client_name.as_deref()),
            (ParentField::ClientEmail, record.client_email.as_deref()),
        ];

        let mut fields = 0;
        for (field, value) in values {
            let Some(value) = value else { continue };
            match parent.set_field(field, value) {
                Ok(()) => fields += 1,
                Err(e) => debug!(field = field.element_id(), error = %e, "Parent field not synced"),
            }
        }

        BridgeOutcome::Synced { fields }
    }
}

/// Parent context kept as a JSON object of element id to value on disk.
///
/// Used by the binary so an embedding process can watch one file for the
/// fields a browser parent page would display.
#[derive(Debug, Clone)]
pub struct JsonFieldsParent {
    path: PathBuf,
}

impl JsonFieldsParent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_fields(&self) -> Result<Map<String, Value>, FrameAccessError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(FrameAccessError::Io(e.to_string())),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(FrameAccessError::Denied(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(FrameAccessError::Denied(e.to_string())),
        }
    }
}

impl ParentFrame for JsonFieldsParent {
    fn set_field(&self, field: ParentField, value: &str) -> Result<(), FrameAccessError> {
        let mut fields = self.read_fields()?;
        fields.insert(field.element_id().to_string(), Value::String(value.to_string()));
        let body = serde_json::to_string_pretty(&Value::Object(fields))
            .map_err(|e| FrameAccessError::Io(e.to_string()))?;
        std::fs::write(&self.path, body).map_err(|e| FrameAccessError::Io(e.to_string()))
    }
}
