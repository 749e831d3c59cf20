use clap::Parser;

/// Device nodes tried when no --device is given, in order.
pub const DEFAULT_DEVICES: [&str; 2] = ["/dev/dri/card0", "/dev/dri/card1"];

#[derive(Parser, Debug)]
#[command(
    name = "kmsfb",
    about = "Discover a KMS display pipeline and allocate mapped dumb framebuffers"
)]
pub struct Config {
    /// DRM device path to try (repeatable, tried in order).
    /// Defaults to /dev/dri/card0 then /dev/dri/card1.
    #[arg(short, long = "device")]
    pub devices: Vec<String>,

    /// Requested buffer width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Requested buffer height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Bits per pixel of the dumb buffer (display depth stays 24)
    #[arg(long, default_value_t = 32)]
    pub bpp: u32,

    /// Number of framebuffers to allocate
    #[arg(short = 'n', long, default_value_t = 3)]
    pub buffers: usize,
}

impl Config {
    /// Candidate device paths in the order they should be attempted.
    pub fn device_candidates(&self) -> Vec<String> {
        if self.devices.is_empty() {
            DEFAULT_DEVICES.iter().map(|s| s.to_string()).collect()
        } else {
            self.devices.clone()
        }
    }
}
