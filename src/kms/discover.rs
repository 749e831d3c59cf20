use std::io;

use crate::error::KmsError;

use super::card::Card;
use super::device::{ConnectionState, ConnectorDesc, CrtcDesc, ModeDevice, ResourceIds};

/// The connector -> encoder -> CRTC chain for one active output.
#[derive(Debug, Clone)]
pub struct ResolvedOutput {
    pub connector: ConnectorDesc,
    pub crtc: CrtcDesc,
}

/// A device that survived the open-and-enumerate probe, together with
/// the candidate path it was reached through. The path is the value
/// named in the "using device" diagnostic.
#[derive(Debug)]
pub struct OpenedDevice<D = Card> {
    pub device: D,
    pub resources: ResourceIds,
    pub path: String,
}

/// Try each candidate path in order; the first that opens and yields a
/// usable resource enumeration wins. A failed attempt closes its handle
/// (drop) before the next candidate is tried.
pub fn open_device(candidates: &[String]) -> Result<OpenedDevice, KmsError> {
    open_device_with(candidates, Card::open)
}

pub(crate) fn open_device_with<D, F>(
    candidates: &[String],
    mut open: F,
) -> Result<OpenedDevice<D>, KmsError>
where
    D: ModeDevice,
    F: FnMut(&str) -> io::Result<D>,
{
    for path in candidates {
        let device = match open(path) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!("cannot open {path}: {e}");
                continue;
            }
        };
        match device.resource_ids() {
            Ok(res) if !res.connectors.is_empty() => {
                tracing::info!("using device: {path}");
                return Ok(OpenedDevice {
                    device,
                    resources: res,
                    path: path.clone(),
                });
            }
            Ok(_) => {
                tracing::debug!("{path}: no connectors enumerated");
            }
            Err(e) => {
                tracing::debug!("{path}: cannot get mode resources: {e}");
            }
        }
    }
    Err(KmsError::DeviceNotFound {
        tried: candidates.to_vec(),
    })
}

/// Resolve the pipeline for the first connected connector:
/// connector search, encoder lookup, CRTC fetch.
pub fn resolve_output<D: ModeDevice>(
    device: &D,
    res: &ResourceIds,
) -> Result<ResolvedOutput, KmsError> {
    let connector = find_connected_connector(device, res)?;
    tracing::info!(
        "connected output: {} (connector {})",
        connector.name,
        connector.id
    );

    let encoder_id = connector
        .encoder_id
        .ok_or(KmsError::NoEncoderForConnector {
            connector_id: connector.id,
        })?;
    let crtc_id = find_crtc_id(device, res, connector.id, encoder_id)?;

    let crtc = device.crtc_desc(crtc_id).map_err(|e| KmsError::CrtcUnavailable {
        encoder_id,
        source: Some(e),
    })?;
    if let Some(mode) = &crtc.mode {
        tracing::info!(
            "CRTC {}: {} {}x{}@{}",
            crtc.id,
            mode.name,
            mode.width,
            mode.height,
            mode.vrefresh
        );
    }

    Ok(ResolvedOutput { connector, crtc })
}

/// First connector in enumeration order whose state is Connected.
/// Rejected connectors are dropped as soon as they are inspected.
fn find_connected_connector<D: ModeDevice>(
    device: &D,
    res: &ResourceIds,
) -> Result<ConnectorDesc, KmsError> {
    for &id in &res.connectors {
        let conn = match device.connector_desc(id) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("connector {id}: {e}");
                continue;
            }
        };
        if conn.state == ConnectionState::Connected {
            return Ok(conn);
        }
        tracing::debug!("connector {id} ({}): {:?}", conn.name, conn.state);
    }
    Err(KmsError::NoConnectedOutput)
}

/// Find the enumerated encoder whose id the connector names and extract
/// its CRTC id. The encoder itself is never kept.
fn find_crtc_id<D: ModeDevice>(
    device: &D,
    res: &ResourceIds,
    connector_id: u32,
    encoder_id: u32,
) -> Result<u32, KmsError> {
    for &id in &res.encoders {
        let enc = match device.encoder_desc(id) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("encoder {id}: {e}");
                continue;
            }
        };
        if enc.id == encoder_id {
            return enc.crtc_id.ok_or(KmsError::CrtcUnavailable {
                encoder_id,
                source: None,
            });
        }
    }
    Err(KmsError::NoEncoderForConnector { connector_id })
}
