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
use thiserror::Error;

/// Everything a source can fail with. None of these are retried; they all
/// end up in front of the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
	#[error(
		"Invalid pair '{base}/{quote}'. {}Run 'pricehist source {source_id} --symbols' for information about valid pairs.",
		.message.as_ref().map(|m| format!("{} ", m)).unwrap_or_default()
	)]
	InvalidPair {
		base: String,
		quote: String,
		source_id: String,
		message: Option<String>,
	},

	#[error(
		"Invalid price type '{price_type}' for pair '{base}/{quote}'. Run 'pricehist source {source_id}' for information about valid types."
	)]
	InvalidType {
		price_type: String,
		base: String,
		quote: String,
		source_id: String,
	},

	#[error(
		"Access credentials for source '{source_id}' are unavailable or invalid. Set the environment variables '{}' correctly. Run 'pricehist source {source_id}' for more information about credentials.{}",
		.keys.join("', '"),
		.message.as_ref().map(|m| format!("\n{}", m)).unwrap_or_default()
	)]
	CredentialsError {
		keys: Vec<String>,
		source_id: String,
		message: Option<String>,
	},

	#[error("Source request rate limit reached. {0}")]
	RateLimit(String),

	#[error("An error occurred while making a request to the source. {0}")]
	RequestError(String),

	#[error("A bad response was received from the source. {0}")]
	BadResponse(String),

	#[error("An error occurred while parsing data from the source. {0}")]
	ResponseParsingError(String),
}

impl SourceError {
	pub fn invalid_pair(base: &str, quote: &str, source_id: &str) -> Self {
		SourceError::InvalidPair {
			base: base.to_string(),
			quote: quote.to_string(),
			source_id: source_id.to_string(),
			message: None,
		}
	}

	pub fn invalid_pair_because(
		base: &str,
		quote: &str,
		source_id: &str,
		message: &str,
	) -> Self {
		SourceError::InvalidPair {
			base: base.to_string(),
			quote: quote.to_string(),
			source_id: source_id.to_string(),
			message: Some(message.to_string()),
		}
	}

	pub fn invalid_type(price_type: &str, base: &str, quote: &str, source_id: &str) -> Self {
		SourceError::InvalidType {
			price_type: price_type.to_string(),
			base: base.to_string(),
			quote: quote.to_string(),
			source_id: source_id.to_string(),
		}
	}

	pub fn parsing<E: std::fmt::Display>(e: E) -> Self {
		SourceError::ResponseParsingError(e.to_string())
	}
}

impl From<reqwest::Error> for SourceError {
	fn from(e: reqwest::Error) -> Self {
		SourceError::RequestError(e.to_string())
	}
}

impl From<serde_json::Error> for SourceError {
	fn from(e: serde_json::Error) -> Self {
		SourceError::ResponseParsingError(e.to_string())
	}
}
