//! Secondary pointers attached to a diagnostic.

use crate::subject::Subject;
use serde::{Deserialize, Serialize};

/// Rendering marker for a [`Label`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// Drawn with `^`.
    Primary,
    /// Drawn with `-`.
    Secondary,
}

/// An entity involved in a diagnostic, with a short remark.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// Entity pointed at.
    pub subject: Subject,
    /// Remark.
    pub message: String,
    /// Marker.
    pub style: LabelStyle,
}

impl Label {
    fn styled(style: LabelStyle, subject: Subject, message: impl Into<String>) -> Self {
        Self {
            subject,
            message: message.into(),
            style,
        }
    }

    /// Points at the offending entity itself.
    pub fn primary(subject: Subject, message: impl Into<String>) -> Self {
        Self::styled(LabelStyle::Primary, subject, message)
    }

    /// Points at something else involved, such as a connection's partner.
    pub fn secondary(subject: Subject, message: impl Into<String>) -> Self {
        Self::styled(LabelStyle::Secondary, subject, message)
    }
}
