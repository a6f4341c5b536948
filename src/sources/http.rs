/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */
use crate::sources::errors::SourceError;
use log::debug;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

/// Status and body of a completed request. Adapters inspect both before
/// deciding what went wrong, since providers put the useful detail in the
/// body of error responses.
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub body: String,
}

impl Response {
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Maps any non-2xx status to a BadResponse.
	pub fn ensure_success(self) -> Result<Self, SourceError> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(SourceError::BadResponse(format!(
				"Request failed with status: {}",
				self.status.as_u16()
			)))
		}
	}

	pub fn json<R: DeserializeOwned>(&self) -> Result<R, SourceError> {
		Ok(serde_json::from_str(&self.body)?)
	}

	/// Builds a response from a raw status code and body, for exercising
	/// adapters against recorded provider replies.
	#[cfg(test)]
	pub fn canned(status: u16, body: &str) -> Response {
		Response {
			status: StatusCode::from_u16(status).unwrap(),
			body: body.to_string(),
		}
	}
}

pub struct Client {
	client: reqwest::blocking::Client,
}

impl Client {
	pub fn new() -> Result<Self, SourceError> {
		let client = reqwest::blocking::Client::builder()
			.user_agent(concat!("pricehist/", env!("CARGO_PKG_VERSION")))
			.build()?;
		Ok(Client { client })
	}

	/// Sends a GET. Transport failures become RequestError; HTTP error
	/// statuses are returned for the caller to classify.
	pub fn get(&self, url: &str, query_params: &[(&str, String)]) -> Result<Response, SourceError> {
		self.get_with_headers(url, query_params, &[])
	}

	pub fn get_with_headers(
		&self,
		url: &str,
		query_params: &[(&str, String)],
		headers: &[(&str, String)],
	) -> Result<Response, SourceError> {
		let mut request = self.client.request(Method::GET, url);
		if !query_params.is_empty() {
			request = request.query(query_params);
		}
		for (name, value) in headers {
			request = request.header(*name, value.as_str());
		}
		let request = request.build()?;

		debug!("Sending GET to {}", request.url());
		let response = self.client.execute(request)?;
		let status = response.status();
		let body = response.text()?;
		debug!("Received status {} with {} bytes", status.as_u16(), body.len());

		Ok(Response { status, body })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ensure_success() {
		assert!(Response::canned(200, "").ensure_success().is_ok());
		assert!(Response::canned(204, "").ensure_success().is_ok());
		let err = Response::canned(503, "down").ensure_success().err().unwrap();
		assert_eq!(
			err,
			SourceError::BadResponse("Request failed with status: 503".to_string())
		);
	}

	#[test]
	fn test_only_2xx_is_success() {
		assert!(!Response::canned(199, "").is_success());
		assert!(!Response::canned(304, "").is_success());
		assert!(!Response::canned(404, "").is_success());
		assert!(Response::canned(299, "").is_success());
		let err = Response::canned(304, "").ensure_success().err().unwrap();
		assert_eq!(
			err,
			SourceError::BadResponse("Request failed with status: 304".to_string())
		);
	}

	#[test]
	fn test_json() {
		let parsed: Vec<u32> = Response::canned(200, "[1, 2, 3]").json().unwrap();
		assert_eq!(parsed, vec![1, 2, 3]);
		let err = Response::canned(200, "<html>").json::<Vec<u32>>().unwrap_err();
		assert!(matches!(err, SourceError::ResponseParsingError(_)));
	}
}
