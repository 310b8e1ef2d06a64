//! Error types for index tree operations.

use thiserror::Error;

use crate::NodeId;

/// Malformed arguments or construction options. Surfaced synchronously and
/// never recovered internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
	/// The target index name is absent or empty.
	#[error("the `index_name` option is required")]
	MissingIndexName,

	/// `add_widgets` was given nothing to add.
	#[error("`add_widgets` expects a non-empty list of widgets")]
	EmptyWidgetList,

	/// A widget exposes neither `init` nor `render`.
	#[error("the widget at position {position} expects a `render` and/or an `init` method")]
	MissingInitOrRender {
		/// Position of the offending widget in the argument list.
		position: usize,
	},

	/// A widget passed to `remove_widgets` cannot be disposed.
	#[error("the widget at position {position} expects a `dispose` method")]
	MissingDispose {
		/// Position of the offending widget in the argument list.
		position: usize,
	},
}

/// Failure reported by a [`SearchClient`](crate::SearchClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("search client error: {message}")]
pub struct ClientError {
	pub message: String,
	/// Transport status code, when the failure came from a response.
	pub status: Option<u16>,
}

impl ClientError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			status: None,
		}
	}

	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);
		self
	}
}

/// Index tree error.
#[derive(Debug, Error)]
pub enum IndexError {
	#[error(transparent)]
	Configuration(#[from] ConfigurationError),

	/// The id does not resolve to a node, or the node was released.
	#[error("unknown index node {0:?}")]
	UnknownNode(NodeId),

	/// The operation needs an initialized node.
	#[error("index node {0:?} is not initialized")]
	NotLive(NodeId),

	#[error(transparent)]
	Client(#[from] ClientError),

	/// A UI state fragment could not be decoded.
	#[error("invalid UI state fragment for `{index_id}`: {source}")]
	UiState {
		index_id: String,
		#[source]
		source: serde_json::Error,
	},
}

/// Result type for index tree operations.
pub type Result<T> = std::result::Result<T, IndexError>;
