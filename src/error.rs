use std::fmt;
use std::io;

use thiserror::Error;

/// Which of the three framebuffer allocation steps failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStage {
    BufferCreate,
    FramebufferRegister,
    Mapping,
}

impl fmt::Display for AllocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AllocationStage::BufferCreate => "dumb buffer creation",
            AllocationStage::FramebufferRegister => "framebuffer registration",
            AllocationStage::Mapping => "memory mapping",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum KmsError {
    /// No candidate device node yielded an open handle with a usable
    /// resource enumeration.
    #[error("no usable DRM device among {tried:?}")]
    DeviceNotFound { tried: Vec<String> },

    /// Enumeration worked but every connector reports disconnected or
    /// unknown. Normal when no monitor is attached.
    #[error("no connected output on this device")]
    NoConnectedOutput,

    /// The selected connector's current encoder id matches none of the
    /// enumerated encoders (or the connector has no encoder at all).
    #[error("no enumerated encoder drives connector {connector_id}")]
    NoEncoderForConnector { connector_id: u32 },

    /// The encoder names no active CRTC, or the kernel refused to
    /// return pipeline state for it.
    #[error("no usable CRTC behind encoder {encoder_id}")]
    CrtcUnavailable {
        encoder_id: u32,
        #[source]
        source: Option<io::Error>,
    },

    /// One of create / register / map failed for a buffer request.
    #[error("framebuffer allocation failed during {stage}")]
    AllocationFailed {
        stage: AllocationStage,
        #[source]
        source: io::Error,
    },

    /// Operation attempted on a session whose teardown already ran.
    #[error("device session is already closed")]
    SessionClosed,
}
