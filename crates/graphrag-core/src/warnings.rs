//! The warnings channel: a structured stream of non-fatal events, kept
//! separate from the error path so the engine stays embeddable.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A metadata value could not be expressed as an [`crate::ScalarValue`]
    /// and was skipped by the edge function.
    UnsupportedMetadataValue,
    /// A denormalized list value was encountered while the adapter is
    /// operating in normalized mode.
    DenormalizedValueInNormalizedMode,
    /// An override field passed to a strategy builder is not a recognized
    /// configuration field.
    UnknownStrategyOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningEvent {
    pub kind: WarningKind,
    pub message: String,
}

impl WarningEvent {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A sink for [`WarningEvent`]s. Callers may supply a
/// `crossbeam_channel::Sender` (cloneable, cheap to pass around); when absent
/// warnings are simply dropped after being logged via `tracing::warn`.
pub type WarningSink = crossbeam_channel::Sender<WarningEvent>;

pub fn emit(sink: Option<&WarningSink>, event: WarningEvent) {
    tracing::warn!(kind = ?event.kind, message = %event.message, "graphrag warning");
    if let Some(sink) = sink {
        let _ = sink.send(event);
    }
}
