//! Widget usage telemetry.
//!
//! Every index node records the widgets mounted under it. When the node's
//! slot takes part in a round-trip, the payload is encoded into a single
//! request header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Request header carrying the encoded payload.
pub const TELEMETRY_HEADER: &str = "x-prism-telemetry";

/// One mounted widget kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetUsage {
	#[serde(rename = "type")]
	pub widget_type: String,
	/// Sorted option names the widget was built with.
	pub params: Vec<String>,
	/// Built from a connector rather than a packaged widget.
	pub uses_connector: bool,
}

impl WidgetUsage {
	pub fn new(widget_type: impl Into<String>, params: Option<Vec<String>>) -> Self {
		let uses_connector = params.is_none();
		let mut params = params.unwrap_or_default();
		params.sort();
		params.dedup();
		Self {
			widget_type: widget_type.into(),
			params,
			uses_connector,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPayload {
	pub widgets: Vec<WidgetUsage>,
}

impl TelemetryPayload {
	/// Records `usage` unless an identical entry exists. Returns whether the
	/// payload changed.
	pub fn update(&mut self, usage: WidgetUsage) -> bool {
		if self.widgets.contains(&usage) {
			return false;
		}
		self.widgets.push(usage);
		true
	}

	pub fn is_empty(&self) -> bool {
		self.widgets.is_empty()
	}
}

/// Turns a payload into an opaque header value.
pub trait TelemetryEncoder {
	fn encode(&self, payload: &TelemetryPayload) -> String;
}

/// `postcard` bytes, base64 encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedTelemetryEncoder;

impl PackedTelemetryEncoder {
	/// Inverse of [`TelemetryEncoder::encode`]; `None` on malformed input.
	pub fn decode(value: &str) -> Option<TelemetryPayload> {
		let bytes = STANDARD.decode(value).ok()?;
		postcard::from_bytes(&bytes).ok()
	}
}

impl TelemetryEncoder for PackedTelemetryEncoder {
	fn encode(&self, payload: &TelemetryPayload) -> String {
		match postcard::to_allocvec(payload) {
			Ok(bytes) => STANDARD.encode(bytes),
			Err(error) => {
				tracing::warn!(%error, "failed to encode telemetry payload");
				String::new()
			}
		}
	}
}
