use std::fs::{File, OpenOptions};
use std::io;
use std::num::NonZeroU32;
use std::os::fd::{AsFd, BorrowedFd};
use std::ptr;

use drm::control::{connector, crtc, encoder, framebuffer, Device as ControlDevice};
use drm::Device;
use drm_fourcc::DrmFourcc;
use rustix::mm::{self, MapFlags, ProtFlags};

use super::device::{
    ConnectionState, ConnectorDesc, CrtcDesc, DisplayMode, DumbBufferDesc, EncoderDesc,
    ModeDevice, ResourceIds,
};
use super::framebuffer::{packed_format, MappedRegion};

pub struct Card(File);

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl Device for Card {}
impl ControlDevice for Card {}

impl Card {
    /// Open a DRM device node read-write. `File` opens with
    /// close-on-exec on Linux, so the handle does not leak across exec.
    pub fn open(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Card(file))
    }
}

/// Kernel object ids are non-zero; 0 is the kernel's "none".
fn mode_handle<T: From<NonZeroU32>>(id: u32) -> io::Result<T> {
    NonZeroU32::new(id)
        .map(T::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "mode object id is zero"))
}

/// View of a dumb buffer that the drm crate can register via ADDFB.
struct BufferRef {
    desc: DumbBufferDesc,
    handle: drm::buffer::Handle,
}

impl drm::buffer::Buffer for BufferRef {
    fn size(&self) -> (u32, u32) {
        (self.desc.width, self.desc.height)
    }

    fn format(&self) -> DrmFourcc {
        packed_format(self.desc.bpp).unwrap_or(DrmFourcc::Xrgb8888)
    }

    fn pitch(&self) -> u32 {
        self.desc.pitch
    }

    fn handle(&self) -> drm::buffer::Handle {
        self.handle
    }
}

impl ModeDevice for Card {
    fn resource_ids(&self) -> io::Result<ResourceIds> {
        let res = self.resource_handles()?;
        Ok(ResourceIds {
            connectors: res.connectors().iter().map(|&h| u32::from(h)).collect(),
            encoders: res.encoders().iter().map(|&h| u32::from(h)).collect(),
            crtcs: res.crtcs().iter().map(|&h| u32::from(h)).collect(),
        })
    }

    fn connector_desc(&self, id: u32) -> io::Result<ConnectorDesc> {
        let handle: connector::Handle = mode_handle(id)?;
        let info = self.get_connector(handle, false)?;
        let state = match info.state() {
            connector::State::Connected => ConnectionState::Connected,
            connector::State::Disconnected => ConnectionState::Disconnected,
            connector::State::Unknown => ConnectionState::Unknown,
        };
        Ok(ConnectorDesc {
            id,
            name: format!("{:?}-{}", info.interface(), info.interface_id()),
            state,
            encoder_id: info.current_encoder().map(u32::from),
        })
    }

    fn encoder_desc(&self, id: u32) -> io::Result<EncoderDesc> {
        let handle: encoder::Handle = mode_handle(id)?;
        let info = self.get_encoder(handle)?;
        Ok(EncoderDesc {
            id,
            crtc_id: info.crtc().map(u32::from),
        })
    }

    fn crtc_desc(&self, id: u32) -> io::Result<CrtcDesc> {
        let handle: crtc::Handle = mode_handle(id)?;
        let info = self.get_crtc(handle)?;
        let mode = info.mode().map(|m| {
            let (width, height) = m.size();
            DisplayMode {
                name: m.name().to_string_lossy().into_owned(),
                width,
                height,
                vrefresh: m.vrefresh(),
            }
        });
        Ok(CrtcDesc { id, mode })
    }

    fn create_dumb(&self, width: u32, height: u32, bpp: u32) -> io::Result<DumbBufferDesc> {
        let req = drm_ffi::mode::dumbbuffer::create(self.as_fd(), width, height, bpp, 0)
            .map_err(io::Error::from)?;
        Ok(DumbBufferDesc {
            handle: req.handle,
            width: req.width,
            height: req.height,
            bpp,
            pitch: req.pitch,
            size: req.size,
        })
    }

    fn register_framebuffer(&self, buffer: &DumbBufferDesc, depth: u32) -> io::Result<u32> {
        let buf = BufferRef {
            desc: *buffer,
            handle: mode_handle(buffer.handle)?,
        };
        let fb = self.add_framebuffer(&buf, depth, buffer.bpp)?;
        Ok(u32::from(fb))
    }

    fn map_dumb(&self, buffer: &DumbBufferDesc) -> io::Result<MappedRegion> {
        let map = drm_ffi::mode::dumbbuffer::map(self.as_fd(), buffer.handle, 0, 0)
            .map_err(io::Error::from)?;

        let len = buffer.size as usize;
        let ptr = unsafe {
            mm::mmap(
                ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                self.as_fd(),
                map.offset,
            )
            .map_err(io::Error::from)?
        };

        Ok(unsafe { MappedRegion::from_raw(ptr, len) })
    }

    fn remove_framebuffer(&self, fb_id: u32) -> io::Result<()> {
        let handle: framebuffer::Handle = mode_handle(fb_id)?;
        self.destroy_framebuffer(handle)
    }

    fn destroy_dumb(&self, handle: u32) -> io::Result<()> {
        drm_ffi::mode::dumbbuffer::destroy(self.as_fd(), handle).map_err(io::Error::from)?;
        Ok(())
    }
}
