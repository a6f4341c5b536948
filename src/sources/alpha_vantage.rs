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
use log::{info, warn};
use rust_decimal::Decimal;
use serde_json::Value;
use std::env;

const QUERY_URL: &str = "https://www.alphavantage.co/query";
const PHYSICAL_LIST_URL: &str = "https://www.alphavantage.co/physical_currency_list/";
const DIGITAL_LIST_URL: &str = "https://www.alphavantage.co/digital_currency_list/";
const API_KEY_NAME: &str = "ALPHAVANTAGE_API_KEY";

/// Compact responses only hold the last 100 data points.
const COMPACT_DAYS: i64 = 95;

pub struct AlphaVantage;

/// Which API family a pair is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Market {
	Stock,
	Physical,
	Digital { quote: String },
}

impl Market {
	fn series_key(&self) -> &'static str {
		match self {
			Market::Stock => "Time Series (Daily)",
			Market::Physical => "Time Series FX (Daily)",
			Market::Digital { .. } => "Time Series (Digital Currency Daily)",
		}
	}

	/// Candidate entry keys for a field, most specific first. Digital
	/// responses have used both forms over time.
	fn field_keys(&self, field: &str) -> Vec<String> {
		let numbered = match field {
			"open" => "1. open",
			"high" => "2. high",
			"low" => "3. low",
			"close" => "4. close",
			"adjclose" => "5. adjusted close",
			_ => return vec![],
		};
		match self {
			Market::Digital { quote } => {
				let alpha = numbered.replacen(". ", "a. ", 1);
				vec![format!("{} ({})", alpha, quote), numbered.to_string()]
			},
			_ => vec![numbered.to_string()],
		}
	}
}

impl Source for AlphaVantage {
	fn id(&self) -> &'static str {
		"alphavantage"
	}

	fn name(&self) -> &'static str {
		"Alpha Vantage"
	}

	fn description(&self) -> &'static str {
		"Provider of market data for stocks, forex and cryptocurrencies"
	}

	fn source_url(&self) -> &'static str {
		"https://www.alphavantage.co/"
	}

	fn start(&self) -> Date {
		Date::ymd(1995, 1, 1)
	}

	fn types(&self) -> Vec<&'static str> {
		vec!["close", "open", "high", "low", "adjclose", "mid"]
	}

	fn notes(&self) -> String {
		let key_status = if configured_key().is_some() {
			"already set"
		} else {
			"NOT YET set"
		};
		format!(
			"Alpha Vantage has data on digital (crypto) currencies, physical \
			 (fiat) currencies and stocks.\n\
			 You should obtain a free API key from \
			 https://www.alphavantage.co/support/#api-key and set it in \
			 the {} environment variable ({}), otherwise, pricehist will \
			 attempt to use a generic key.\n\
			 The PAIR for currencies should be in BASE/QUOTE form. The quote \
			 symbol must always be for a physical currency. The --symbols \
			 option will list all digital and physical currency symbols.\n\
			 The PAIR for stocks is the stock symbol only. The quote currency \
			 will be determined automatically. {}\n\
			 The price type 'adjclose' is only available for stocks.\n\
			 Alpha Vantage's standard API call frequency limits is 5 calls \
			 per minute and 500 per day, so you may need to pause between \
			 successive commands. Note that retrieving prices for one stock \
			 consumes two API calls.",
			API_KEY_NAME,
			key_status,
			STOCK_SYMBOLS_MESSAGE
		)
	}

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
		info!("{}", STOCK_SYMBOLS_MESSAGE);
		let client = Client::new()?;
		let mut symbols = currency_list(&client, DIGITAL_LIST_URL, "Digital")?;
		symbols.extend(currency_list(&client, PHYSICAL_LIST_URL, "Physical")?);
		Ok(symbols)
	}

	fn search(&self, query: &str) -> Option<Result<Vec<(String, String)>, SourceError>> {
		Some(self.search_matches(query).map(|matches| {
			matches
				.iter()
				.map(|m| {
					let describe = ["2. name", "3. type", "4. region", "8. currency"]
						.iter()
						.map(|k| text(m, k))
						.collect::<Vec<_>>()
						.join(", ");
					(text(m, "1. symbol"), describe)
				})
				.collect()
		}))
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
		let client = Client::new()?;
		let key = api_key();

		let (market, quote) = if series.quote.is_empty() {
			let currency = self.stock_currency(&series.base)?;
			(Market::Stock, currency)
		} else {
			if series.price_type == "adjclose" {
				return Err(SourceError::invalid_type(
					&series.price_type,
					&series.base,
					&series.quote,
					self.id(),
				));
			}
			let physical = currency_list(&client, PHYSICAL_LIST_URL, "Physical")?;
			let is_physical = |s: &str| physical.iter().any(|(code, _)| code == s);
			if !is_physical(series.quote.as_str()) {
				return Err(SourceError::invalid_pair_because(
					&series.base,
					&series.quote,
					self.id(),
					"The quote must be a physical currency.",
				));
			}
			if is_physical(series.base.as_str()) {
				(Market::Physical, series.quote.clone())
			} else {
				(
					Market::Digital {
						quote: series.quote.clone(),
					},
					series.quote.clone(),
				)
			}
		};

		let params = query_params(&market, series, &key);
		let response = client.get(QUERY_URL, &params)?.ensure_success()?;
		let data: Value = response.json()?;
		check_errors(&data, series, self.id(), &market)?;

		let prices = parse_prices(&data, &market, series)?;
		Ok(series.with_prices(prices).rename_quote(&quote))
	}
}

const STOCK_SYMBOLS_MESSAGE: &str = "Stock symbols can be discovered using the --search option.";

impl AlphaVantage {
	fn search_matches(&self, query: &str) -> Result<Vec<Value>, SourceError> {
		let params = [
			("function", "SYMBOL_SEARCH".to_string()),
			("keywords", query.to_string()),
			("apikey", api_key()),
		];
		let response = Client::new()?.get(QUERY_URL, &params)?.ensure_success()?;
		let data: Value = response.json()?;
		check_service_messages(&data, self.id())?;

		match data.get("bestMatches").and_then(Value::as_array) {
			Some(matches) => Ok(matches.clone()),
			None => Err(SourceError::parsing("Unexpected content.")),
		}
	}

	/// Stocks are requested by symbol alone; the quote is the currency the
	/// exchange lists them in.
	fn stock_currency(&self, symbol: &str) -> Result<String, SourceError> {
		let matches = self.search_matches(symbol)?;
		matches
			.iter()
			.find(|m| text(m, "1. symbol") == symbol)
			.map(|m| text(m, "8. currency"))
			.ok_or_else(|| {
				SourceError::invalid_pair_because(symbol, "", self.id(), "Unknown stock symbol.")
			})
	}
}

fn configured_key() -> Option<String> {
	env::var(API_KEY_NAME).ok().filter(|k| !k.is_empty())
}

fn api_key() -> String {
	configured_key().unwrap_or_else(|| {
		warn!(
			"The environment variable {} is empty. Using a generic key. \
			 Get a free API key from https://www.alphavantage.co/support/#api-key \
			 if you run into call frequency limits.",
			API_KEY_NAME
		);
		generic_key()
	})
}

fn generic_key() -> String {
	format!("pricehist_{}", env!("CARGO_PKG_VERSION"))
}

fn text(value: &Value, key: &str) -> String {
	value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn output_size(start: Date) -> &'static str {
	match Date::today().add_days(-COMPACT_DAYS) {
		Some(cutoff) if start >= cutoff => "compact",
		_ => "full",
	}
}

fn query_params(market: &Market, series: &Series, key: &str) -> Vec<(&'static str, String)> {
	let mut params = match market {
		Market::Stock => vec![
			("function", "TIME_SERIES_DAILY_ADJUSTED".to_string()),
			("symbol", series.base.clone()),
			("outputsize", output_size(series.start).to_string()),
		],
		Market::Physical => vec![
			("function", "FX_DAILY".to_string()),
			("from_symbol", series.base.clone()),
			("to_symbol", series.quote.clone()),
			("outputsize", output_size(series.start).to_string()),
		],
		Market::Digital { quote } => vec![
			("function", "DIGITAL_CURRENCY_DAILY".to_string()),
			("symbol", series.base.clone()),
			("market", quote.clone()),
		],
	};
	params.push(("apikey", key.to_string()));
	params
}

/// Alpha Vantage reports most problems with a 200 status and a message.
fn check_service_messages(data: &Value, source_id: &str) -> Result<(), SourceError> {
	for key in ["Note", "Information"] {
		let Some(message) = data.get(key).and_then(Value::as_str) else {
			continue;
		};
		let lower = message.to_lowercase();

		// Throttling messages also mention premium plans, so check them first
		if ["call frequency", "rate limit", "requests per day"]
			.iter()
			.any(|s| lower.contains(s))
		{
			return Err(SourceError::RateLimit(message.to_string()));
		}
		if ["premium", "api key", "apikey"].iter().any(|s| lower.contains(s)) {
			return Err(SourceError::CredentialsError {
				keys: vec![API_KEY_NAME.to_string()],
				source_id: source_id.to_string(),
				message: Some(message.to_string()),
			});
		}
	}

	Ok(())
}

fn check_errors(
	data: &Value,
	series: &Series,
	source_id: &str,
	market: &Market,
) -> Result<(), SourceError> {
	check_service_messages(data, source_id)?;

	if let Some(message) = data.get("Error Message").and_then(Value::as_str) {
		return match market {
			Market::Digital { .. } | Market::Physical if message.contains("Invalid API call") => Err(
				SourceError::invalid_pair(&series.base, &series.quote, source_id),
			),
			Market::Stock if message.contains("Invalid API call") => Err(
				SourceError::invalid_pair_because(&series.base, "", source_id, "Unknown stock symbol."),
			),
			_ => Err(SourceError::BadResponse(message.to_string())),
		};
	}

	Ok(())
}

fn parse_prices(data: &Value, market: &Market, series: &Series) -> Result<Vec<Price>, SourceError> {
	let days = data
		.get(market.series_key())
		.and_then(Value::as_object)
		.ok_or_else(|| SourceError::parsing("Unexpected content."))?;

	// serde_json maps are sorted, and ISO dates sort chronologically
	let mut prices = Vec::new();
	for (day, entries) in days {
		let date = Date::from_str(day).map_err(SourceError::parsing)?;
		if date < series.start || date > series.end {
			continue;
		}

		let field = |name: &str| -> Result<Decimal, SourceError> {
			market
				.field_keys(name)
				.iter()
				.find_map(|k| entries.get(k).and_then(Value::as_str))
				.and_then(decimal::parse)
				.ok_or_else(|| SourceError::parsing(format!("Missing {} price for {}", name, day)))
		};

		let amount = if series.price_type == "mid" {
			decimal::midpoint(field("high")?, field("low")?)
				.ok_or_else(|| SourceError::parsing(format!("Mid price overflow on {}", day)))?
		} else {
			field(&series.price_type)?
		};
		prices.push(Price::new(date, amount));
	}

	prices.sort_by_key(|p| p.date);
	Ok(prices)
}

fn currency_list(
	client: &Client,
	url: &str,
	label: &str,
) -> Result<Vec<(String, String)>, SourceError> {
	let response = client.get(url, &[])?.ensure_success()?;
	parse_currency_list(&response, label)
}

/// The lists are CSV with a `currency code,currency name` header.
fn parse_currency_list(response: &Response, label: &str) -> Result<Vec<(String, String)>, SourceError> {
	let mut reader = csv::ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.from_reader(response.body.as_bytes());

	let mut symbols = Vec::new();
	for record in reader.records() {
		let record = record.map_err(SourceError::parsing)?;
		let code = record.get(0).unwrap_or_default().trim();
		let name = record.get(1).unwrap_or_default().trim();
		if !code.is_empty() {
			symbols.push((code.to_string(), format!("{}: {}", label, name)));
		}
	}

	if symbols.is_empty() {
		return Err(SourceError::parsing("Expected data not found"));
	}
	Ok(symbols)
}
