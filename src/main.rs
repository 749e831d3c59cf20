mod config;
mod error;
mod kms;

use std::process::ExitCode;

use clap::Parser;

use config::Config;
use error::KmsError;
use kms::session::DeviceSession;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = Config::parse();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(config: &Config) -> Result<(), KmsError> {
    let candidates = config.device_candidates();
    let mut session = DeviceSession::open(&candidates)?;

    if let Some(res) = session.resources() {
        tracing::debug!(
            "enumerated {} connector(s), {} encoder(s), {} CRTC(s)",
            res.connectors.len(),
            res.encoders.len(),
            res.crtcs.len()
        );
    }
    if let (Some(conn), Some(crtc)) = (session.connector(), session.crtc()) {
        tracing::info!(
            "{}: connector {} ({}) driven by CRTC {}",
            session.device_path().unwrap_or("pipeline"),
            conn.id,
            conn.name,
            crtc.id
        );
    }

    for i in 0..config.buffers {
        match session.create_framebuffer(config.width, config.height, config.bpp) {
            Ok(fb) => {
                tracing::info!(
                    "framebuffer {}: id {}, handle {}, pitch {}, size {} ({} bytes mapped)",
                    i,
                    fb.fb_id().unwrap_or(0),
                    fb.buffer().handle,
                    fb.pitch(),
                    fb.size(),
                    fb.region().map_or(0, |r| r.len())
                );
            }
            Err(e) => {
                session.close();
                return Err(e);
            }
        }
    }

    // start every buffer out black so the first scanout is defined
    for fb in session.framebuffers_mut() {
        if let Some(region) = fb.region_mut() {
            region.as_mut_slice().fill(0);
        }
    }

    let total: u64 = session.framebuffers().iter().map(|fb| fb.size()).sum();
    tracing::info!(
        "allocated {} framebuffer(s), {} bytes total",
        session.framebuffers().len(),
        total
    );

    session.close();
    Ok(())
}

fn report(err: &KmsError) {
    tracing::error!("{err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        tracing::error!("  caused by: {cause}");
        source = cause.source();
    }
}

/// Distinct exit statuses per failure class: no device, nothing
/// plugged in, inconsistent resource graph, allocation failure.
fn exit_code(err: &KmsError) -> u8 {
    match err {
        KmsError::DeviceNotFound { .. } => 2,
        KmsError::NoConnectedOutput => 3,
        KmsError::NoEncoderForConnector { .. } | KmsError::CrtcUnavailable { .. } => 4,
        KmsError::AllocationFailed { .. } => 5,
        KmsError::SessionClosed => 1,
    }
}
