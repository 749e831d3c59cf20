use crate::error::KmsError;

use super::card::Card;
use super::device::{ConnectorDesc, CrtcDesc, ModeDevice, ResourceIds};
use super::discover;
use super::framebuffer::Framebuffer;

/// One device handle, its resource enumeration, the selected
/// connector/CRTC pair, and every framebuffer allocated against it.
///
/// Teardown runs in the reverse of acquisition order and exactly once;
/// a second `close` is a no-op. For multiple displays, build one
/// session per device.
pub struct DeviceSession<D: ModeDevice = Card> {
    device: Option<D>,
    path: Option<String>,
    resources: Option<ResourceIds>,
    connector: Option<ConnectorDesc>,
    crtc: Option<CrtcDesc>,
    framebuffers: Vec<Framebuffer>,
}

impl DeviceSession<Card> {
    /// Open the first usable candidate device and resolve its active
    /// pipeline. Nothing is left open on failure.
    pub fn open(candidates: &[String]) -> Result<Self, KmsError> {
        let opened = discover::open_device(candidates)?;
        let mut session = Self::resolve(opened.device, opened.resources)?;
        session.path = Some(opened.path);
        Ok(session)
    }
}

impl<D: ModeDevice> DeviceSession<D> {
    /// Resolve connector, encoder and CRTC on an already-open device.
    /// On failure the device handle closes on the way out.
    pub fn resolve(device: D, resources: ResourceIds) -> Result<Self, KmsError> {
        let output = discover::resolve_output(&device, &resources)?;
        Ok(Self {
            device: Some(device),
            path: None,
            resources: Some(resources),
            connector: Some(output.connector),
            crtc: Some(output.crtc),
            framebuffers: Vec::new(),
        })
    }

    /// Path the device was opened through, when the session came from
    /// the candidate-list opener.
    pub fn device_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn connector(&self) -> Option<&ConnectorDesc> {
        self.connector.as_ref()
    }

    pub fn crtc(&self) -> Option<&CrtcDesc> {
        self.crtc.as_ref()
    }

    pub fn resources(&self) -> Option<&ResourceIds> {
        self.resources.as_ref()
    }

    pub fn framebuffers(&self) -> &[Framebuffer] {
        &self.framebuffers
    }

    pub fn framebuffers_mut(&mut self) -> &mut [Framebuffer] {
        &mut self.framebuffers
    }

    /// Allocate one displayable framebuffer: create the dumb buffer,
    /// register it at the fixed display depth, map it. The buffer is
    /// tracked by the session from the moment the dumb buffer exists,
    /// so a failure in the register or map step leaves nothing behind
    /// once `close` runs. Earlier buffers are never rolled back here.
    pub fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<&Framebuffer, KmsError> {
        let device = self.device.as_ref().ok_or(KmsError::SessionClosed)?;
        let mut fb = Framebuffer::create(device, width, height, bpp)?;
        let finished = fb.finish(device);
        self.framebuffers.push(fb);
        finished?;
        let idx = self.framebuffers.len() - 1;
        Ok(&self.framebuffers[idx])
    }

    /// Release everything this session still holds, in reverse
    /// acquisition order: framebuffers newest-first (unmap, remove
    /// framebuffer object, destroy dumb buffer), then CRTC, connector
    /// and resource enumeration, then the device handle. Idempotent.
    pub fn close(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        while let Some(fb) = self.framebuffers.pop() {
            fb.release(&device);
        }
        self.crtc = None;
        self.connector = None;
        self.resources = None;
        // device handle closes last
        drop(device);
    }
}

impl<D: ModeDevice> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}
