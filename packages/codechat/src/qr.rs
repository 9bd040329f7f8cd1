//! Login challenge rendering.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;

/// Encode a raw challenge string as a QR code and wrap the SVG in a
/// `data:image/svg+xml;base64,...` URL.
pub fn challenge_data_url(challenge: &str) -> Result<String> {
    let code = QrCode::new(challenge.as_bytes()).context("challenge does not fit in a QR code")?;
    let svg = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    let encoded = STANDARD.encode(svg.as_bytes());
    Ok(format!("data:image/svg+xml;base64,{encoded}"))
}

/// Render the challenge for a terminal using Unicode half-blocks.
pub fn challenge_text(challenge: &str) -> Result<String> {
    let code = QrCode::new(challenge.as_bytes()).context("challenge does not fit in a QR code")?;
    Ok(code
        .render::<char>()
        .quiet_zone(true)
        .module_dimensions(2, 1)
        .build())
}
