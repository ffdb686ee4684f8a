//! Error type shared by authoring, scripts and host adapters.
//!
//! The per-frame gravity accessor never surfaces these; runtime gaps are
//! folded into the fallback chain inside [`crate::engine::Engine`].

use crate::contact::ContactPoint;

pub type Result<T> = std::result::Result<T, GravityError>;

#[derive(thiserror::Error, Debug)]
pub enum GravityError {
    #[error("no rider or contact-point target given")]
    NoTargets,
    #[error("unknown rider {0}")]
    UnknownRider(u32),
    #[error("malformed timestamp {0}: expected [minutes, seconds, frames]")]
    MalformedTimestamp(String),
    #[error("base rider must have an id")]
    MissingRiderId,
    #[error("contact point {0} out of range (0..17)")]
    InvalidContactPoint(u8),
    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(i64),
    #[error("malformed keyframe: {0}")]
    MalformedKeyframe(String),
    #[error("shape '{shape}' has no offset for {point}")]
    MissingShapePoint { shape: String, point: ContactPoint },
    #[error("anchor {0} missing from live rider data")]
    MissingAnchor(ContactPoint),
    #[error("unknown contact point group '{0}'")]
    UnknownGroup(String),
    #[error("script: {0}")]
    Script(#[from] serde_json::Error),
    #[error("host: {0}")]
    Host(String),
}

impl GravityError {
    pub fn host(msg: impl Into<String>) -> Self {
        GravityError::Host(msg.into())
    }

    pub fn malformed_keyframe(msg: impl Into<String>) -> Self {
        GravityError::MalformedKeyframe(msg.into())
    }

    /// True for errors that indicate broken shape/anchor data rather than a
    /// bad authoring call.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            GravityError::MissingShapePoint { .. } | GravityError::MissingAnchor(_)
        )
    }
}
