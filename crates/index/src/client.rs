//! Search transport consumed by the runtime.
//!
//! The client owns the network: retries, timeouts and authentication are its
//! business. Futures are `'static` and local; the runtime keeps them pending
//! while the tree keeps changing.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use prism_params::{FacetValuesResponse, QueryState, SearchRequest, SearchResults};
use serde::Serialize;

use crate::error::ClientError;
use crate::executor::RequestHeaders;

/// A facet value search on one index.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetValuesRequest {
	pub index_name: String,
	pub facet_name: String,
	pub facet_query: String,
	pub max_facet_hits: Option<u32>,
	pub params: QueryState,
}

pub trait SearchClient {
	/// Runs every request in one network call. The response holds one entry
	/// per request, in request order.
	fn search(
		&self,
		requests: Vec<SearchRequest>,
		headers: &RequestHeaders,
	) -> LocalBoxFuture<'static, Result<Vec<SearchResults>, ClientError>>;

	fn search_for_facet_values(
		&self,
		request: FacetValuesRequest,
		headers: &RequestHeaders,
	) -> LocalBoxFuture<'static, Result<FacetValuesResponse, ClientError>>;
}

impl<T: SearchClient + ?Sized> SearchClient for Rc<T> {
	fn search(
		&self,
		requests: Vec<SearchRequest>,
		headers: &RequestHeaders,
	) -> LocalBoxFuture<'static, Result<Vec<SearchResults>, ClientError>> {
		(**self).search(requests, headers)
	}

	fn search_for_facet_values(
		&self,
		request: FacetValuesRequest,
		headers: &RequestHeaders,
	) -> LocalBoxFuture<'static, Result<FacetValuesResponse, ClientError>> {
		(**self).search_for_facet_values(request, headers)
	}
}
