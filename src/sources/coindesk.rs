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
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const HISTORICAL_URL: &str = "https://api.coindesk.com/v1/bpi/historical/close.json";
const CURRENCIES_URL: &str = "https://api.coindesk.com/v1/bpi/supported-currencies.json";

pub struct CoinDesk;

#[derive(Deserialize)]
struct Historical {
	#[serde(default)]
	bpi: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct SupportedCurrency {
	currency: String,
	country: String,
}

impl Source for CoinDesk {
	fn id(&self) -> &'static str {
		"coindesk"
	}

	fn name(&self) -> &'static str {
		"CoinDesk Bitcoin Price Index"
	}

	fn description(&self) -> &'static str {
		"An average of Bitcoin prices across leading global exchanges. \n\
		 Powered by CoinDesk, https://www.coindesk.com/price/bitcoin"
	}

	fn source_url(&self) -> &'static str {
		"https://www.coindesk.com/coindesk-api"
	}

	fn start(&self) -> Date {
		Date::ymd(2010, 7, 17)
	}

	fn types(&self) -> Vec<&'static str> {
		vec!["close"]
	}

	fn notes(&self) -> String {
		String::new()
	}

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
		let response = Client::new()?.get(CURRENCIES_URL, &[])?.ensure_success()?;
		parse_symbols(&response)
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
		// BTC is the only base. BTC as the quote silently returns BTC/USD,
		// and XBT as the quote fails server-side.
		if series.base != "BTC" || series.quote == "BTC" || series.quote == "XBT" {
			return Err(SourceError::invalid_pair(&series.base, &series.quote, self.id()));
		}

		let params = [
			("currency", series.quote.clone()),
			("start", series.start.to_string()),
			("end", series.end.to_string()),
		];
		let response = Client::new()?.get(HISTORICAL_URL, &params)?;
		classify(&response, series, self.id())?;

		Ok(series.with_prices(parse_prices(&response.body)?))
	}
}

/// Turns the error responses CoinDesk is known to give into useful errors.
fn classify(response: &Response, series: &Series, source_id: &str) -> Result<(), SourceError> {
	let text = &response.body;
	match response.status.as_u16() {
		404 if text.contains("currency was not found") => {
			Err(SourceError::invalid_pair(&series.base, &series.quote, source_id))
		},
		404 if text.contains("only covers data from") => {
			Err(SourceError::BadResponse(text.to_string()))
		},
		404 if text.contains("end date is before") && series.end < series.start => Err(
			SourceError::BadResponse("End date is before start date.".to_string()),
		),
		404 if text.contains("end date is before") => Err(SourceError::BadResponse(
			"The start date must be in the past.".to_string(),
		)),
		500 if text.contains("No results returned from database") => {
			Err(SourceError::BadResponse(
				"No results returned from database. This can happen when data \
				 for a valid quote currency (e.g. CUP) doesn't go all the way \
				 back to the start date, and potentially for other reasons."
					.to_string(),
			))
		},
		_ if response.is_success() => Ok(()),
		status => Err(SourceError::BadResponse(format!(
			"Request failed with status: {}",
			status
		))),
	}
}

fn parse_prices(body: &str) -> Result<Vec<Price>, SourceError> {
	let data: Historical = serde_json::from_str(body)?;
	data.bpi
		.iter()
		.map(|(day, value)| {
			let date = Date::from_str(day).map_err(SourceError::parsing)?;
			let amount = match value {
				Value::Number(n) => decimal::parse(&n.to_string()),
				Value::String(s) => decimal::parse(s),
				_ => None,
			}
			.ok_or_else(|| SourceError::parsing(format!("Invalid price for {}", day)))?;
			Ok(Price::new(date, amount))
		})
		.collect()
}

fn parse_symbols(response: &Response) -> Result<Vec<(String, String)>, SourceError> {
	let mut currencies: Vec<SupportedCurrency> = response.json()?;
	currencies.retain(|c| c.currency != "BTC" && c.currency != "XBT");
	currencies.sort_by(|a, b| a.currency.cmp(&b.currency));

	if currencies.is_empty() {
		return Err(SourceError::parsing("Expected data not found"));
	}

	Ok(currencies
		.into_iter()
		.map(|c| {
			(
				format!("BTC/{}", c.currency),
				format!("Bitcoin against {}", c.country),
			)
		})
		.collect())
}
