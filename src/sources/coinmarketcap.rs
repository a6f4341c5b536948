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
use crate::prices::price::Price;
use crate::prices::series::Series;
use crate::sources::errors::SourceError;
use crate::sources::http::{Client, Response};
use crate::sources::source::Source;
use crate::util::date::Date;
use crate::util::decimal;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::env;

const WEB_API: &str = "https://web-api.coinmarketcap.com";
const PRO_API: &str = "https://pro-api.coinmarketcap.com";
const API_KEY_NAME: &str = "COINMARKETCAP_API_KEY";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

const UNEXPECTED_QUOTES: &str = "Unexpected content. This can happen when the quote currency \
	 symbol can't be found, and potentially for other reasons.";

pub struct CoinMarketCap;

/// Where requests go. The public web endpoints need no key; with a key the
/// official API is used instead.
#[derive(Debug, PartialEq, Eq)]
struct Endpoint {
	base: &'static str,
	key: Option<String>,
}

impl Endpoint {
	fn from_env() -> Self {
		Self::with_key(env::var(API_KEY_NAME).ok().filter(|k| !k.is_empty()))
	}

	fn with_key(key: Option<String>) -> Self {
		match key {
			Some(key) => Endpoint {
				base: PRO_API,
				key: Some(key),
			},
			None => Endpoint { base: WEB_API, key: None },
		}
	}

	fn headers(&self) -> Vec<(&'static str, String)> {
		self.key
			.iter()
			.map(|key| (API_KEY_HEADER, key.clone()))
			.collect()
	}

	fn get(&self, client: &Client, path: &str, params: &[(&str, String)]) -> Result<Response, SourceError> {
		client.get_with_headers(&format!("{}{}", self.base, path), params, &self.headers())
	}
}

/// An entry from the cryptocurrency or fiat map. Metals carry a code
/// rather than a symbol.
#[derive(Debug, Deserialize)]
struct Listing {
	id: u64,
	#[serde(default)]
	symbol: Option<String>,
	#[serde(default)]
	code: Option<String>,
	#[serde(default)]
	name: String,
}

impl Listing {
	fn symbol(&self) -> &str {
		self.symbol
			.as_deref()
			.filter(|s| !s.is_empty())
			.or(self.code.as_deref())
			.unwrap_or("")
	}
}

#[derive(Deserialize)]
struct StatusEnvelope {
	status: Status,
}

#[derive(Deserialize)]
struct Status {
	error_code: Option<i64>,
	error_message: Option<String>,
}

impl Source for CoinMarketCap {
	fn id(&self) -> &'static str {
		"coinmarketcap"
	}

	fn name(&self) -> &'static str {
		"CoinMarketCap"
	}

	fn description(&self) -> &'static str {
		"The world's most-referenced price-tracking website for cryptoassets"
	}

	fn source_url(&self) -> &'static str {
		"https://coinmarketcap.com/"
	}

	fn start(&self) -> Date {
		Date::ymd(2013, 4, 28)
	}

	fn types(&self) -> Vec<&'static str> {
		vec!["mid", "open", "high", "low", "close"]
	}

	fn notes(&self) -> String {
		format!(
			"This source makes unofficial use of endpoints that power CoinMarketCap's \
			 public web interface. The price data comes from a public equivalent of \
			 the OHLCV Historical endpoint found in CoinMarketCap's official API. \
			 If the environment variable {} is set, the official API is used with \
			 that key instead.\n\
			 CoinMarketCap currency symbols are not necessarily unique, so it is \
			 recommended that you use IDs, which can be listed via the --symbols \
			 option. For example, 'ETH/BTC' is 'id=1027/id=1'. The corresponding \
			 symbols will be used in output.",
			API_KEY_NAME
		)
	}

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
		let listings = self.listings(&Client::new()?, &Endpoint::from_env())?;
		Ok(listings
			.iter()
			.map(|l| {
				(
					format!("id={}", l.id),
					format!("{} {}", l.symbol(), l.name).trim().to_string(),
				)
			})
			.collect())
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
		if series.quote.is_empty() {
			return Err(SourceError::invalid_pair(&series.base, &series.quote, self.id()));
		}
		if !self.types().iter().any(|t| *t == series.price_type) {
			return Err(SourceError::invalid_type(
				&series.price_type,
				&series.base,
				&series.quote,
				self.id(),
			));
		}

		let client = Client::new()?;
		let endpoint = Endpoint::from_env();
		let base_id = listing_id(&series.base);
		let quote_id = listing_id(&series.quote);

		let listings = if base_id.is_some() || quote_id.is_some() {
			self.listings(&client, &endpoint)?
		} else {
			vec![]
		};

		let response = endpoint.get(
			&client,
			"/v1/cryptocurrency/ohlcv/historical",
			&params(series, base_id, quote_id),
		)?;
		classify(&response, series, self.id(), Date::today())?;

		let quote_key = quote_id.unwrap_or(series.quote.as_str());
		let prices = parse_prices(&response, quote_key, series)?;

		let mut result = series.with_prices(prices);
		if let Some(symbol) = base_id.and_then(|id| symbol_for(&listings, id)) {
			result = result.rename_base(symbol);
		}
		if let Some(symbol) = quote_id.and_then(|id| symbol_for(&listings, id)) {
			result = result.rename_quote(symbol);
		}
		Ok(result)
	}
}

impl CoinMarketCap {
	/// Cryptocurrencies by rank, then fiat currencies and metals.
	fn listings(&self, client: &Client, endpoint: &Endpoint) -> Result<Vec<Listing>, SourceError> {
		let crypto = endpoint.get(
			client,
			"/v1/cryptocurrency/map",
			&[("sort", "cmc_rank".to_string())],
		)?;
		let mut listings = parse_listings(check_listing_response(crypto, self.id())?)?;

		let fiat = endpoint.get(client, "/v1/fiat/map", &[("include_metals", "true".to_string())])?;
		listings.extend(parse_listings(check_listing_response(fiat, self.id())?)?);
		Ok(listings)
	}
}

/// The numeric part of an `id=N` symbol. Symbols arrive uppercased, so the
/// prefix is matched without regard to case.
fn listing_id(symbol: &str) -> Option<&str> {
	match symbol.get(..3) {
		Some(prefix) if prefix.eq_ignore_ascii_case("id=") && symbol.len() > 3 => Some(&symbol[3..]),
		_ => None,
	}
}

fn symbol_for<'a>(listings: &'a [Listing], id: &str) -> Option<&'a str> {
	listings
		.iter()
		.find(|l| l.id.to_string() == id)
		.map(Listing::symbol)
		.filter(|s| !s.is_empty())
}

/// The provider counts back one period from the start, so the start is
/// moved back a day to include it.
fn params(series: &Series, base_id: Option<&str>, quote_id: Option<&str>) -> Vec<(&'static str, String)> {
	let mut params = Vec::with_capacity(4);
	match base_id {
		Some(id) => params.push(("id", id.to_string())),
		None => params.push(("symbol", series.base.clone())),
	}
	match quote_id {
		Some(id) => params.push(("convert_id", id.to_string())),
		None => params.push(("convert", series.quote.clone())),
	}
	let start = series.start.previous().unwrap_or(series.start);
	params.push(("time_start", start.timestamp().to_string()));
	params.push(("time_end", series.end.timestamp().to_string()));
	params
}

/// The provider's own error code and message, or the raw body when it
/// isn't the usual status document.
fn provider_error(body: &str) -> (Option<i64>, String) {
	match serde_json::from_str::<StatusEnvelope>(body) {
		Ok(envelope) => (
			envelope.status.error_code,
			envelope.status.error_message.unwrap_or_default(),
		),
		Err(_) => (None, body.to_string()),
	}
}

fn rejected_credentials(response: &Response, source_id: &str) -> Option<SourceError> {
	let (code, message) = provider_error(&response.body);
	let status = response.status.as_u16();
	if status == 401 || status == 403 || matches!(code, Some(1001) | Some(1002)) {
		Some(SourceError::CredentialsError {
			keys: vec![API_KEY_NAME.to_string()],
			source_id: source_id.to_string(),
			message: Some(message).filter(|m| !m.is_empty()),
		})
	} else {
		None
	}
}

fn check_listing_response(response: Response, source_id: &str) -> Result<Response, SourceError> {
	if let Some(e) = rejected_credentials(&response, source_id) {
		return Err(e);
	}
	response.ensure_success()
}

fn classify(response: &Response, series: &Series, source_id: &str, today: Date) -> Result<(), SourceError> {
	if let Some(e) = rejected_credentials(response, source_id) {
		return Err(e);
	}
	if response.is_success() {
		return Ok(());
	}

	let (_, message) = provider_error(&response.body);
	let bad = |m: &str| Err(SourceError::BadResponse(m.to_string()));
	let pair = |m: &str| {
		Err(SourceError::invalid_pair_because(
			&series.base,
			&series.quote,
			source_id,
			m,
		))
	};

	match response.status.as_u16() {
		400 if message.contains("must be a valid ISO 8601") => Err(SourceError::BadResponse(format!(
			"The start date can't precede the source start date of {}.",
			CoinMarketCap.start()
		))),
		400 if message.contains("must be older than") => {
			if series.start > today {
				bad("The start date must be in the past.")
			} else {
				bad("The start date must precede or match the end date.")
			}
		},
		400 if message.contains("Invalid value for \"convert\"") => pair("Bad quote symbol."),
		400 if message.contains("Invalid value for \"convert_id\"") => pair("Bad quote ID."),
		400 if message.contains("No items found.") => {
			if listing_id(&series.base).is_some() {
				pair("Bad base ID.")
			} else {
				pair("Bad base symbol.")
			}
		},
		429 => Err(SourceError::RateLimit(message)),
		status => Err(SourceError::BadResponse(format!(
			"Request failed with status: {}",
			status
		))),
	}
}

fn parse_listings(response: Response) -> Result<Vec<Listing>, SourceError> {
	let value: Value = response.json()?;
	let data = value
		.get("data")
		.ok_or_else(|| SourceError::parsing("Unexpected content"))?;
	let listings: Vec<Listing> = serde_json::from_value(data.clone())?;
	if listings.is_empty() {
		return Err(SourceError::parsing("Empty data section"));
	}
	Ok(listings)
}

/// Daily quotes are keyed by the requested quote symbol or ID. Dates come
/// from the opening time of each period.
fn parse_prices(response: &Response, quote_key: &str, series: &Series) -> Result<Vec<Price>, SourceError> {
	let value: Value = response.json()?;
	let data = value
		.get("data")
		.ok_or_else(|| SourceError::parsing("Unexpected content"))?;
	let quotes = data
		.get("quotes")
		.and_then(Value::as_array)
		.ok_or_else(|| SourceError::parsing(UNEXPECTED_QUOTES))?;

	let mut prices = Vec::with_capacity(quotes.len());
	for item in quotes {
		let day = item
			.get("time_open")
			.and_then(Value::as_str)
			.and_then(|t| t.get(0..10))
			.ok_or_else(|| SourceError::parsing("Quote without an opening time"))?;
		let date = Date::from_str(day).map_err(SourceError::parsing)?;
		if date < series.start || date > series.end {
			continue;
		}

		let quote = item
			.get("quote")
			.and_then(|q| q.get(quote_key))
			.ok_or_else(|| SourceError::parsing(UNEXPECTED_QUOTES))?;
		prices.push(Price::new(date, amount(quote, &series.price_type, date)?));
	}

	prices.sort_by_key(|p| p.date);
	Ok(prices)
}

fn amount(quote: &Value, price_type: &str, date: Date) -> Result<Decimal, SourceError> {
	let field = |name: &str| -> Result<Decimal, SourceError> {
		let parsed = match quote.get(name) {
			Some(Value::Number(n)) => decimal::parse(&n.to_string()),
			_ => None,
		};
		parsed.ok_or_else(|| SourceError::parsing(format!("Invalid {} price on {}", name, date)))
	};
	match price_type {
		"mid" => decimal::midpoint(field("high")?, field("low")?)
			.ok_or_else(|| SourceError::parsing(format!("Mid price overflow on {}", date))),
		other => field(other),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	const BTC_AUD: &str = r#"{
		"status": {"error_code": 0, "error_message": null},
		"data": {"id": 1, "name": "Bitcoin", "symbol": "BTC", "quotes": [
			{"time_open": "2020-12-31T00:00:00.000Z", "quote": {"AUD": {
				"open": 37000.1, "high": 37500.2, "low": 36000.3, "close": 37400.4}}},
			{"time_open": "2021-01-01T00:00:00.000Z", "quote": {"AUD": {
				"open": 37658.83948707033, "high": 38417.9137031205,
				"low": 37410.787501639206, "close": 38181.99133300758}}},
			{"time_open": "2021-01-02T00:00:00.000Z", "quote": {"AUD": {
				"open": 38184.98611600528, "high": 43096.681197423015,
				"low": 37814.17187096672, "close": 41760.62923079505}}}
		]}
	}"#;

	const CRYPTO_MAP: &str = r#"{"data": [
		{"id": 1, "name": "Bitcoin", "symbol": "BTC", "rank": 1},
		{"id": 1027, "name": "Ethereum", "symbol": "ETH", "rank": 2}
	]}"#;

	const FIAT_MAP: &str = r#"{"data": [
		{"id": 2782, "name": "Australian Dollar", "sign": "$", "symbol": "AUD"},
		{"id": 3575, "name": "Gold Troy Ounce", "code": "XAU"}
	]}"#;

	fn series(base: &str, quote: &str, price_type: &str) -> Series {
		Series::new(base, quote, price_type, Date::ymd(2021, 1, 1), Date::ymd(2021, 1, 2))
	}

	fn status_body(message: &str) -> String {
		serde_json::json!({"status": {"error_code": 400, "error_message": message}}).to_string()
	}

	fn classified(status: u16, body: &str, series: &Series) -> Result<(), SourceError> {
		classify(
			&Response::canned(status, body),
			series,
			"coinmarketcap",
			Date::ymd(2021, 6, 1),
		)
	}

	#[test]
	fn test_normalize_symbol() {
		assert_eq!(CoinMarketCap.normalize_symbol("btc"), "BTC");
		assert_eq!(CoinMarketCap.normalize_symbol("id=1"), "ID=1");
	}

	#[test]
	fn test_listing_id() {
		assert_eq!(listing_id("ID=1"), Some("1"));
		assert_eq!(listing_id("id=2782"), Some("2782"));
		assert_eq!(listing_id("ID="), None);
		assert_eq!(listing_id("BTC"), None);
		assert_eq!(listing_id("ID"), None);
	}

	#[test]
	fn test_endpoint_depends_on_key() {
		let public = Endpoint::with_key(None);
		assert_eq!(public.base, WEB_API);
		assert!(public.headers().is_empty());

		let official = Endpoint::with_key(Some("abc123".to_string()));
		assert_eq!(official.base, PRO_API);
		assert_eq!(official.headers(), vec![("X-CMC_PRO_API_KEY", "abc123".to_string())]);
	}

	#[test]
	fn test_params_by_symbol() {
		let params = params(&series("BTC", "AUD", "mid"), None, None);
		assert_eq!(
			params,
			vec![
				("symbol", "BTC".to_string()),
				("convert", "AUD".to_string()),
				("time_start", "1609372800".to_string()),
				("time_end", "1609545600".to_string()),
			]
		);
	}

	#[test]
	fn test_params_by_id() {
		let params = params(&series("ID=1", "ID=2782", "mid"), Some("1"), Some("2782"));
		assert_eq!(params[0], ("id", "1".to_string()));
		assert_eq!(params[1], ("convert_id", "2782".to_string()));
	}

	mod parsing {
		use super::*;

		#[test]
		fn test_prices_within_interval() {
			let response = Response::canned(200, BTC_AUD);
			let prices = parse_prices(&response, "AUD", &series("BTC", "AUD", "close")).unwrap();
			assert_eq!(
				prices,
				vec![
					Price::new(Date::ymd(2021, 1, 1), dec!(38181.99133300758)),
					Price::new(Date::ymd(2021, 1, 2), dec!(41760.62923079505)),
				]
			);
		}

		#[test]
		fn test_every_type() {
			let response = Response::canned(200, BTC_AUD);
			let first = |t: &str| parse_prices(&response, "AUD", &series("BTC", "AUD", t)).unwrap()[0].amount;
			assert_eq!(first("open"), dec!(37658.83948707033));
			assert_eq!(first("high"), dec!(38417.9137031205));
			assert_eq!(first("low"), dec!(37410.787501639206));
			assert_eq!(first("close"), dec!(38181.99133300758));
			assert_eq!(first("mid"), dec!(37914.350602379853));
		}

		#[test]
		fn test_empty_quotes() {
			let body = r#"{"data": {"id": 1, "symbol": "BTC", "quotes": []}}"#;
			let response = Response::canned(200, body);
			assert!(parse_prices(&response, "AUD", &series("BTC", "AUD", "mid"))
				.unwrap()
				.is_empty());
		}

		#[test]
		fn test_missing_quotes_explains_why() {
			let response = Response::canned(200, r#"{"data":{}}"#);
			let err = parse_prices(&response, "USD", &series("NOTABASE", "USD", "mid")).unwrap_err();
			assert!(err.to_string().contains("quote currency symbol can't be found"));
			assert!(err.to_string().contains("other reasons"));
		}

		#[test]
		fn test_unexpected_content() {
			let response = Response::canned(200, r#"{"notdata": []}"#);
			let err = parse_prices(&response, "AUD", &series("BTC", "AUD", "mid")).unwrap_err();
			assert_eq!(err, SourceError::parsing("Unexpected content"));

			let response = Response::canned(200, "NOT JSON");
			let err = parse_prices(&response, "AUD", &series("BTC", "AUD", "mid")).unwrap_err();
			assert!(err.to_string().contains("while parsing data"));
		}

		#[test]
		fn test_listings() {
			let mut listings = parse_listings(Response::canned(200, CRYPTO_MAP)).unwrap();
			listings.extend(parse_listings(Response::canned(200, FIAT_MAP)).unwrap());
			assert_eq!(symbol_for(&listings, "1"), Some("BTC"));
			assert_eq!(symbol_for(&listings, "2782"), Some("AUD"));
			assert_eq!(symbol_for(&listings, "3575"), Some("XAU"));
			assert_eq!(symbol_for(&listings, "99999"), None);
		}

		#[test]
		fn test_listing_problems() {
			let err = parse_listings(Response::canned(200, "{}")).unwrap_err();
			assert_eq!(err, SourceError::parsing("Unexpected content"));
			let err = parse_listings(Response::canned(200, r#"{"data": []}"#)).unwrap_err();
			assert_eq!(err, SourceError::parsing("Empty data section"));
		}
	}

	mod classifying {
		use super::*;

		#[test]
		fn test_success() {
			assert!(classified(200, BTC_AUD, &series("BTC", "AUD", "mid")).is_ok());
		}

		#[test]
		fn test_start_before_source_start() {
			let body = r#"{ "status": { "error_code": 400, "error_message":
				"\"time_start\" must be a valid ISO 8601 timestamp or unix time value",
			} }"#;
			let err = classified(400, body, &series("BTC", "AUD", "mid")).unwrap_err();
			assert!(matches!(err, SourceError::BadResponse(_)));
			assert!(err.to_string().contains("start date can't precede"));
		}

		#[test]
		fn test_start_in_future_or_reversed() {
			let body = status_body("\"time_start\" must be older than \"time_end\".");
			let future = Series::new("BTC", "AUD", "mid", Date::ymd(2030, 1, 1), Date::ymd(2030, 1, 7));
			let err = classified(400, &body, &future).unwrap_err();
			assert!(err.to_string().contains("start date must be in the past"));

			let reversed = Series::new("BTC", "AUD", "mid", Date::ymd(2021, 1, 7), Date::ymd(2021, 1, 1));
			let err = classified(400, &body, &reversed).unwrap_err();
			assert!(err.to_string().contains("start date must precede or match the end"));
		}

		#[test]
		fn test_bad_symbols_and_ids() {
			let body = status_body("Invalid value for \"convert\": \"NOTAQUOTE\"");
			let err = classified(400, &body, &series("BTC", "NOTAQUOTE", "mid")).unwrap_err();
			assert!(matches!(err, SourceError::InvalidPair { .. }));
			assert!(err.to_string().contains("Bad quote symbol."));

			let body = status_body("Invalid value for \"convert_id\": \"20000\"");
			let err = classified(400, &body, &series("BTC", "ID=20000", "mid")).unwrap_err();
			assert!(err.to_string().contains("Bad quote ID."));

			let body = status_body("No items found.");
			let err = classified(400, &body, &series("ID=20000", "USD", "mid")).unwrap_err();
			assert!(err.to_string().contains("Bad base ID."));
			let err = classified(400, &body, &series("NOTABASE", "USD", "mid")).unwrap_err();
			assert!(err.to_string().contains("Bad base symbol."));
		}

		#[test]
		fn test_rejected_key_is_credentials_error() {
			let body = r#"{"status": {"error_code": 1001, "error_message": "This API Key is invalid."}}"#;
			let err = classified(401, body, &series("BTC", "AUD", "mid")).unwrap_err();
			assert_eq!(
				err,
				SourceError::CredentialsError {
					keys: vec!["COINMARKETCAP_API_KEY".to_string()],
					source_id: "coinmarketcap".to_string(),
					message: Some("This API Key is invalid.".to_string()),
				}
			);
			assert!(err.to_string().contains("'COINMARKETCAP_API_KEY'"));

			let body = r#"{"status": {"error_code": 1002, "error_message": "API key missing."}}"#;
			assert!(matches!(
				check_listing_response(Response::canned(403, body), "coinmarketcap"),
				Err(SourceError::CredentialsError { .. })
			));
		}

		#[test]
		fn test_rate_limit_and_other_failures() {
			let body = r#"{"status": {"error_code": 1008, "error_message": "You've exceeded your API Key's HTTP request rate limit."}}"#;
			let err = classified(429, body, &series("BTC", "AUD", "mid")).unwrap_err();
			assert!(matches!(err, SourceError::RateLimit(_)));

			let err = classified(500, "Some other reason", &series("BTC", "AUD", "mid")).unwrap_err();
			assert_eq!(
				err,
				SourceError::BadResponse("Request failed with status: 500".to_string())
			);

			let err = check_listing_response(Response::canned(500, "down"), "coinmarketcap").unwrap_err();
			assert!(matches!(err, SourceError::BadResponse(_)));
		}
	}

	#[test]
	fn test_missing_quote_is_invalid_pair() {
		let err = CoinMarketCap.fetch(&series("BTC", "", "mid")).unwrap_err();
		assert!(matches!(err, SourceError::InvalidPair { .. }));
	}

	#[test]
	fn test_unknown_type() {
		let err = CoinMarketCap.fetch(&series("BTC", "AUD", "adjclose")).unwrap_err();
		assert!(matches!(err, SourceError::InvalidType { .. }));
	}
}
