use std::io;

use super::framebuffer::MappedRegion;

/// Live connection state of a connector, as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

/// Connector, encoder and CRTC ids enumerated for one device.
#[derive(Debug, Clone, Default)]
pub struct ResourceIds {
    pub connectors: Vec<u32>,
    pub encoders: Vec<u32>,
    pub crtcs: Vec<u32>,
}

/// One physical output port.
#[derive(Debug, Clone)]
pub struct ConnectorDesc {
    pub id: u32,
    /// Interface name plus index, e.g. "HDMIA-1".
    pub name: String,
    pub state: ConnectionState,
    /// Encoder currently driving this connector, if any.
    pub encoder_id: Option<u32>,
}

/// Signal-path unit bridging a connector to a CRTC. Fetched only to
/// learn the CRTC id, never retained.
#[derive(Debug, Clone)]
pub struct EncoderDesc {
    pub id: u32,
    pub crtc_id: Option<u32>,
}

/// Geometry of the mode a CRTC is currently scanning out.
#[derive(Debug, Clone)]
pub struct DisplayMode {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub vrefresh: u32,
}

/// The display pipeline driving a connector.
#[derive(Debug, Clone)]
pub struct CrtcDesc {
    pub id: u32,
    pub mode: Option<DisplayMode>,
}

/// A kernel-allocated dumb buffer. Pitch and size come back from the
/// kernel and are authoritative; the requested geometry is a hint the
/// kernel may round up for alignment.
#[derive(Debug, Clone, Copy)]
pub struct DumbBufferDesc {
    pub handle: u32,
    pub width: u32,
    pub height: u32,
    pub bpp: u32,
    pub pitch: u32,
    pub size: u64,
}

/// Kernel mode-setting primitives this tool needs from a device node.
///
/// `Card` implements this over real ioctls; tests drive the discovery
/// and teardown logic through an in-memory fake.
pub trait ModeDevice {
    fn resource_ids(&self) -> io::Result<ResourceIds>;
    fn connector_desc(&self, id: u32) -> io::Result<ConnectorDesc>;
    fn encoder_desc(&self, id: u32) -> io::Result<EncoderDesc>;
    fn crtc_desc(&self, id: u32) -> io::Result<CrtcDesc>;

    /// DRM_IOCTL_MODE_CREATE_DUMB.
    fn create_dumb(&self, width: u32, height: u32, bpp: u32) -> io::Result<DumbBufferDesc>;
    /// Legacy ADDFB: registers the buffer as displayable, returns the
    /// framebuffer id.
    fn register_framebuffer(&self, buffer: &DumbBufferDesc, depth: u32) -> io::Result<u32>;
    /// MAP_DUMB plus the mmap itself, at the kernel-reported offset and
    /// for the kernel-reported size.
    fn map_dumb(&self, buffer: &DumbBufferDesc) -> io::Result<MappedRegion>;
    /// RMFB. Must precede destroy_dumb for the same buffer.
    fn remove_framebuffer(&self, fb_id: u32) -> io::Result<()>;
    /// DRM_IOCTL_MODE_DESTROY_DUMB.
    fn destroy_dumb(&self, handle: u32) -> io::Result<()>;
}
