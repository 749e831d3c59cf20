use std::ffi::c_void;
use std::fmt;
use std::slice;

use drm_fourcc::DrmFourcc;
use rustix::mm;

use crate::error::{AllocationStage, KmsError};

use super::device::{DumbBufferDesc, ModeDevice};

/// Color depth passed to ADDFB. Fixed at 24 no matter what bpp the
/// buffer was created with: pixels are 32-bit aligned but only 24 bits
/// carry color.
pub const DISPLAY_DEPTH: u32 = 24;

/// Packed-pixel format implied by a buffer's bpp at depth 24.
pub fn packed_format(bpp: u32) -> Option<DrmFourcc> {
    match bpp {
        32 => Some(DrmFourcc::Xrgb8888),
        24 => Some(DrmFourcc::Rgb888),
        16 => Some(DrmFourcc::Rgb565),
        _ => None,
    }
}

/// An owned, shared, read-write mapping of a dumb buffer. Unmapped on
/// drop; must not outlive the device handle the mapping came from.
pub struct MappedRegion {
    ptr: *mut c_void,
    len: usize,
}

impl MappedRegion {
    /// Safety: `ptr` must be a live mmap of exactly `len` bytes, and
    /// ownership of the mapping transfers to the returned value.
    pub(crate) unsafe fn from_raw(ptr: *mut c_void, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Anonymous mapping, for exercising buffer lifecycles without a
    /// device.
    #[cfg(test)]
    pub(crate) fn anonymous(len: usize) -> std::io::Result<Self> {
        let ptr = unsafe {
            mm::mmap_anonymous(
                std::ptr::null_mut(),
                len,
                mm::ProtFlags::READ | mm::ProtFlags::WRITE,
                mm::MapFlags::PRIVATE,
            )
            .map_err(std::io::Error::from)?
        };
        Ok(Self { ptr, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // The binary only writes into mappings; reads happen in tests.
    #[allow(dead_code)]
    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr as *const u8, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr as *mut u8, self.len) }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe {
            let _ = mm::munmap(self.ptr, self.len);
        }
    }
}

// Manual impl: the mapping address is meaningless to a reader and
// changes every run, so only the length is printed.
impl fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegion").field("len", &self.len).finish()
    }
}

/// A dumb buffer and the kernel objects layered on top of it. `fb_id`
/// and `region` stay `None` if registration or mapping never happened,
/// so a half-built buffer can still be reclaimed at teardown.
#[derive(Debug)]
pub struct Framebuffer {
    buffer: DumbBufferDesc,
    fb_id: Option<u32>,
    region: Option<MappedRegion>,
}

impl Framebuffer {
    /// Step 1 of 3: allocate the dumb buffer.
    pub(crate) fn create<D: ModeDevice>(
        device: &D,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<Self, KmsError> {
        let buffer = device
            .create_dumb(width, height, bpp)
            .map_err(|source| KmsError::AllocationFailed {
                stage: AllocationStage::BufferCreate,
                source,
            })?;
        Ok(Self {
            buffer,
            fb_id: None,
            region: None,
        })
    }

    /// Steps 2 and 3: register as a displayable framebuffer, then map.
    /// On failure the buffer keeps whatever it acquired; the session
    /// reclaims it in teardown.
    pub(crate) fn finish<D: ModeDevice>(&mut self, device: &D) -> Result<(), KmsError> {
        let fb_id = device
            .register_framebuffer(&self.buffer, DISPLAY_DEPTH)
            .map_err(|source| KmsError::AllocationFailed {
                stage: AllocationStage::FramebufferRegister,
                source,
            })?;
        self.fb_id = Some(fb_id);

        let region = device
            .map_dumb(&self.buffer)
            .map_err(|source| KmsError::AllocationFailed {
                stage: AllocationStage::Mapping,
                source,
            })?;
        self.region = Some(region);
        Ok(())
    }

    /// Reverse of acquisition: unmap, remove the framebuffer object,
    /// destroy the dumb buffer. Release failures are logged, not
    /// propagated; teardown keeps going.
    pub(crate) fn release<D: ModeDevice>(mut self, device: &D) {
        self.region = None;
        if let Some(fb_id) = self.fb_id.take() {
            if let Err(e) = device.remove_framebuffer(fb_id) {
                tracing::warn!("cannot remove framebuffer {fb_id}: {e}");
            }
        }
        let handle = self.buffer.handle;
        if let Err(e) = device.destroy_dumb(handle) {
            tracing::warn!("cannot destroy dumb buffer {handle}: {e}");
        }
    }

    pub fn buffer(&self) -> &DumbBufferDesc {
        &self.buffer
    }

    /// Display-side id. `None` only for a buffer whose allocation
    /// failed partway.
    pub fn fb_id(&self) -> Option<u32> {
        self.fb_id
    }

    pub fn pitch(&self) -> u32 {
        self.buffer.pitch
    }

    pub fn size(&self) -> u64 {
        self.buffer.size
    }

    pub fn region(&self) -> Option<&MappedRegion> {
        self.region.as_ref()
    }

    pub fn region_mut(&mut self) -> Option<&mut MappedRegion> {
        self.region.as_mut()
    }
}
