//! In-memory stand-in for a DRM device, used by the discovery and
//! session tests. Records every buffer-lifecycle call so release order
//! and exactly-once semantics can be asserted.

use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;

use super::device::{
    ConnectionState, ConnectorDesc, CrtcDesc, DisplayMode, DumbBufferDesc, EncoderDesc,
    ModeDevice, ResourceIds,
};
use super::framebuffer::MappedRegion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    CreateDumb(u32),
    RegisterFb { fb_id: u32, handle: u32, depth: u32 },
    Map(u32),
    RemoveFb(u32),
    DestroyDumb(u32),
}

#[derive(Debug)]
pub(crate) struct FakeDevice {
    connectors: Vec<ConnectorDesc>,
    encoders: Vec<EncoderDesc>,
    crtcs: Vec<CrtcDesc>,
    crtc_fetch_fails: bool,
    fail_nth_create: Option<usize>,
    fail_nth_register: Option<usize>,
    creates: Cell<usize>,
    registers: Cell<usize>,
    next_handle: Cell<u32>,
    next_fb_id: Cell<u32>,
    fetched_connectors: RefCell<Vec<u32>>,
    events: Rc<RefCell<Vec<Event>>>,
}

impl FakeDevice {
    fn new(
        connectors: Vec<ConnectorDesc>,
        encoders: Vec<EncoderDesc>,
        crtcs: Vec<CrtcDesc>,
    ) -> Self {
        Self {
            connectors,
            encoders,
            crtcs,
            crtc_fetch_fails: false,
            fail_nth_create: None,
            fail_nth_register: None,
            creates: Cell::new(0),
            registers: Cell::new(0),
            next_handle: Cell::new(1),
            next_fb_id: Cell::new(100),
            fetched_connectors: RefCell::new(Vec::new()),
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// No connectors at all; the opener must reject such a device.
    pub(crate) fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    /// One connected connector 10 -> encoder 20 -> CRTC 30 at 1920x1080.
    pub(crate) fn with_connected_output() -> Self {
        Self::with_connector_states(&[ConnectionState::Connected])
    }

    /// Connectors with ids 10, 11, ... in the given states; connected
    /// ones point at encoder 20, which drives CRTC 30.
    pub(crate) fn with_connector_states(states: &[ConnectionState]) -> Self {
        let connectors = states
            .iter()
            .enumerate()
            .map(|(i, &state)| ConnectorDesc {
                id: 10 + i as u32,
                name: format!("HDMIA-{}", i + 1),
                state,
                encoder_id: (state == ConnectionState::Connected).then_some(20),
            })
            .collect();
        let encoders = vec![EncoderDesc {
            id: 20,
            crtc_id: Some(30),
        }];
        let crtcs = vec![CrtcDesc {
            id: 30,
            mode: Some(DisplayMode {
                name: "1920x1080".into(),
                width: 1920,
                height: 1080,
                vrefresh: 60,
            }),
        }];
        Self::new(connectors, encoders, crtcs)
    }

    pub(crate) fn drop_encoders(&mut self) {
        self.encoders.clear();
    }

    pub(crate) fn detach_connector_encoder(&mut self) {
        for conn in &mut self.connectors {
            conn.encoder_id = None;
        }
    }

    pub(crate) fn idle_encoder(&mut self) {
        for enc in &mut self.encoders {
            enc.crtc_id = None;
        }
    }

    pub(crate) fn fail_crtc_fetch(&mut self) {
        self.crtc_fetch_fails = true;
    }

    /// Make the nth (0-based) CREATE_DUMB call fail.
    pub(crate) fn fail_create(&mut self, nth: usize) {
        self.fail_nth_create = Some(nth);
    }

    /// Make the nth (0-based) ADDFB call fail.
    pub(crate) fn fail_register(&mut self, nth: usize) {
        self.fail_nth_register = Some(nth);
    }

    /// Handle onto the event log that survives the device moving into a
    /// session.
    pub(crate) fn event_log(&self) -> Rc<RefCell<Vec<Event>>> {
        self.events.clone()
    }

    pub(crate) fn fetched_connectors(&self) -> Vec<u32> {
        self.fetched_connectors.borrow().clone()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

fn not_found(what: &str, id: u32) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no {what} with id {id}"))
}

impl ModeDevice for FakeDevice {
    fn resource_ids(&self) -> io::Result<ResourceIds> {
        Ok(ResourceIds {
            connectors: self.connectors.iter().map(|c| c.id).collect(),
            encoders: self.encoders.iter().map(|e| e.id).collect(),
            crtcs: self.crtcs.iter().map(|c| c.id).collect(),
        })
    }

    fn connector_desc(&self, id: u32) -> io::Result<ConnectorDesc> {
        self.fetched_connectors.borrow_mut().push(id);
        self.connectors
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found("connector", id))
    }

    fn encoder_desc(&self, id: u32) -> io::Result<EncoderDesc> {
        self.encoders
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| not_found("encoder", id))
    }

    fn crtc_desc(&self, id: u32) -> io::Result<CrtcDesc> {
        if self.crtc_fetch_fails {
            return Err(io::Error::new(io::ErrorKind::Other, "CRTC state torn down"));
        }
        self.crtcs
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found("CRTC", id))
    }

    fn create_dumb(&self, width: u32, height: u32, bpp: u32) -> io::Result<DumbBufferDesc> {
        let n = self.creates.get();
        self.creates.set(n + 1);
        if self.fail_nth_create == Some(n) {
            return Err(io::Error::from_raw_os_error(12)); // ENOMEM
        }
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        // kernel rounds the row up, so pitch and size exceed the naive
        // width * bpp / 8 computation for most widths
        let pitch = (width * (bpp / 8) + 63) & !63;
        let size = u64::from(pitch) * u64::from(height);
        self.record(Event::CreateDumb(handle));
        Ok(DumbBufferDesc {
            handle,
            width,
            height,
            bpp,
            pitch,
            size,
        })
    }

    fn register_framebuffer(&self, buffer: &DumbBufferDesc, depth: u32) -> io::Result<u32> {
        let n = self.registers.get();
        self.registers.set(n + 1);
        if self.fail_nth_register == Some(n) {
            return Err(io::Error::from_raw_os_error(22)); // EINVAL
        }
        let fb_id = self.next_fb_id.get();
        self.next_fb_id.set(fb_id + 1);
        self.record(Event::RegisterFb {
            fb_id,
            handle: buffer.handle,
            depth,
        });
        Ok(fb_id)
    }

    fn map_dumb(&self, buffer: &DumbBufferDesc) -> io::Result<MappedRegion> {
        self.record(Event::Map(buffer.handle));
        MappedRegion::anonymous(buffer.size as usize)
    }

    fn remove_framebuffer(&self, fb_id: u32) -> io::Result<()> {
        self.record(Event::RemoveFb(fb_id));
        Ok(())
    }

    fn destroy_dumb(&self, handle: u32) -> io::Result<()> {
        self.record(Event::DestroyDumb(handle));
        Ok(())
    }
}
