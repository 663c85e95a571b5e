//! Stream URL construction.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::Session;

/// Deterministic stream URL construction.
///
/// Implementations must be pure: the same inputs always produce the same URL,
/// otherwise every cycle would produce a spurious delta.
pub trait UrlBuilder: Send + Sync {
    fn build(&self, session: &Session, device: &str, channel: u32, stream: u32) -> String;
}

/// Transport scheme of the generated playback URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamScheme {
    #[default]
    Rtmp,
    Rtsp,
}

impl FromStr for StreamScheme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rtmp" => Ok(StreamScheme::Rtmp),
            "rtsp" => Ok(StreamScheme::Rtsp),
            _ => Err(CoreError::UnknownScheme(s.to_string())),
        }
    }
}

impl fmt::Display for StreamScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamScheme::Rtmp => f.write_str("rtmp"),
            StreamScheme::Rtsp => f.write_str("rtsp"),
        }
    }
}

/// URL builder for the CMSV8 media gateway.
///
/// Produces `{scheme}://{host}:{port}/3/3?AVType=1&jsession=..&DevIDNO=..&Channel=..&Stream=..`.
#[derive(Debug, Clone)]
pub struct StreamUrlBuilder {
    scheme: StreamScheme,
    host: String,
    port: u16,
}

impl StreamUrlBuilder {
    pub fn new(scheme: StreamScheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }
}

impl UrlBuilder for StreamUrlBuilder {
    fn build(&self, session: &Session, device: &str, channel: u32, stream: u32) -> String {
        format!(
            "{}://{}:{}/3/3?AVType=1&jsession={}&DevIDNO={}&Channel={}&Stream={}",
            self.scheme,
            self.host,
            self.port,
            session.token(),
            device,
            channel,
            stream
        )
    }
}
