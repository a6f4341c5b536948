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

const VALET_URL: &str = "https://www.bankofcanada.ca/valet";

pub struct BankOfCanada;

#[derive(Deserialize)]
struct Observations {
	#[serde(default)]
	observations: Vec<BTreeMap<String, Value>>,
}

#[derive(Deserialize)]
struct SeriesList {
	series: BTreeMap<String, SeriesListing>,
}

#[derive(Deserialize)]
struct SeriesListing {
	description: String,
}

impl Source for BankOfCanada {
	fn id(&self) -> &'static str {
		"bankofcanada"
	}

	fn name(&self) -> &'static str {
		"Bank of Canada"
	}

	fn description(&self) -> &'static str {
		"Daily exchange rates of the Canadian dollar from the Bank of Canada"
	}

	fn source_url(&self) -> &'static str {
		"https://www.bankofcanada.ca/valet/docs"
	}

	fn start(&self) -> Date {
		Date::ymd(2017, 1, 3)
	}

	fn types(&self) -> Vec<&'static str> {
		vec!["default"]
	}

	fn notes(&self) -> String {
		"Currently, only daily exchange rates are supported. They are \
		 published once each business day by 16:30 ET. \
		 All Bank of Canada exchange rates are indicative rates only.\n\
		 To request support for other data provided by the \
		 Bank of Canada Valet Web Services, please open an \
		 issue in pricehist's Gitlab project."
			.to_string()
	}

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError> {
		let url = format!("{}/lists/series/json", VALET_URL);
		let response = Client::new()?.get(&url, &[])?.ensure_success()?;
		parse_symbols(&response)
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError> {
		if series.base.len() != 3 || series.quote.len() != 3 {
			return Err(SourceError::invalid_pair(&series.base, &series.quote, self.id()));
		}

		let series_name = format!("FX{}{}", series.base, series.quote);
		let url = format!("{}/observations/{}/json", VALET_URL, series_name);
		let params = [
			("start_date", series.start.to_string()),
			("end_date", series.end.to_string()),
			("order_dir", "asc".to_string()),
		];
		let response = Client::new()?.get(&url, &params)?;
		classify(&response, series, self.id())?;

		Ok(series.with_prices(parse_prices(&response.body, &series_name)?))
	}
}

fn classify(response: &Response, series: &Series, source_id: &str) -> Result<(), SourceError> {
	let text = &response.body;
	match response.status.as_u16() {
		404 if text.contains("not found") => {
			Err(SourceError::invalid_pair(&series.base, &series.quote, source_id))
		},
		400 if text.contains("End date must be greater than the Start date") => {
			let message = response
				.json::<Value>()
				.ok()
				.and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
				.unwrap_or_else(|| text.to_string());
			Err(SourceError::BadResponse(message))
		},
		_ if response.is_success() => Ok(()),
		status => Err(SourceError::BadResponse(format!(
			"Request failed with status: {}",
			status
		))),
	}
}

/// Observations look like `{"d": "2021-01-04", "FXCADUSD": {"v": "0.7843"}}`.
fn parse_prices(body: &str, series_name: &str) -> Result<Vec<Price>, SourceError> {
	let data: Observations = serde_json::from_str(body)?;
	let mut prices = Vec::with_capacity(data.observations.len());

	for observation in &data.observations {
		let day = observation
			.get("d")
			.and_then(Value::as_str)
			.ok_or_else(|| SourceError::parsing("Observation without a date"))?;
		let date = Date::from_str(day).map_err(SourceError::parsing)?;

		// Holidays can appear without a value for the series
		let Some(value) = observation
			.get(series_name)
			.and_then(|o| o.get("v"))
			.and_then(Value::as_str)
		else {
			continue;
		};
		let amount = decimal::parse(value)
			.ok_or_else(|| SourceError::parsing(format!("Invalid rate '{}' on {}", value, day)))?;
		prices.push(Price::new(date, amount));
	}

	Ok(prices)
}

/// FX series names are `FX` plus two three-letter codes.
fn parse_symbols(response: &Response) -> Result<Vec<(String, String)>, SourceError> {
	let list: SeriesList = response.json()?;
	let symbols: Vec<(String, String)> = list
		.series
		.iter()
		.filter(|(name, _)| name.len() == 8 && name.starts_with("FX") && name.is_ascii())
		.map(|(name, listing)| {
			(
				format!("{}/{}", &name[2..5], &name[5..8]),
				listing.description.clone(),
			)
		})
		.collect();

	if symbols.is_empty() {
		return Err(SourceError::parsing("Expected data not found"));
	}
	Ok(symbols)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn series(base: &str, quote: &str) -> Series {
		Series::new(
			base,
			quote,
			"default",
			Date::ymd(2021, 1, 1),
			Date::ymd(2021, 1, 8),
		)
	}

	fn response(status: u16, body: &str) -> Response {
		Response::canned(status, body)
	}

	#[test]
	fn test_parse_prices() {
		let body = r#"{
			"terms": {"url": "https://www.bankofcanada.ca/terms/"},
			"seriesDetail": {"FXCADUSD": {"label": "CAD/USD"}},
			"observations": [
				{"d": "2021-01-04", "FXCADUSD": {"v": "0.7843"}},
				{"d": "2021-01-05", "FXCADUSD": {"v": "0.7870"}},
				{"d": "2021-01-06"}
			]
		}"#;
		let prices = parse_prices(body, "FXCADUSD").unwrap();
		assert_eq!(
			prices,
			vec![
				Price::new(Date::ymd(2021, 1, 4), dec!(0.7843)),
				Price::new(Date::ymd(2021, 1, 5), dec!(0.7870)),
			]
		);
		assert_eq!(prices[1].amount.to_string(), "0.7870");
	}

	#[test]
	fn test_parse_prices_bad() {
		assert!(parse_prices(r#"{"observations": []}"#, "FXCADUSD").unwrap().is_empty());
		assert!(matches!(
			parse_prices("Not JSON", "FXCADUSD"),
			Err(SourceError::ResponseParsingError(_))
		));
		assert!(matches!(
			parse_prices(r#"{"observations": [{"FXCADUSD": {"v": "1"}}]}"#, "FXCADUSD"),
			Err(SourceError::ResponseParsingError(_))
		));
	}

	#[test]
	fn test_classify() {
		let s = series("CAD", "XZY");
		assert!(classify(&response(200, "{}"), &s, "bankofcanada").is_ok());
		assert!(matches!(
			classify(
				&response(404, r#"{"message": "Series FXCADXZY not found."}"#),
				&s,
				"bankofcanada"
			),
			Err(SourceError::InvalidPair { .. })
		));
		assert_eq!(
			classify(
				&response(
					400,
					r#"{"message": "Bad date range. End date must be greater than the Start date."}"#
				),
				&s,
				"bankofcanada"
			),
			Err(SourceError::BadResponse(
				"Bad date range. End date must be greater than the Start date.".to_string()
			))
		);
		assert!(matches!(
			classify(&response(500, "oops"), &s, "bankofcanada"),
			Err(SourceError::BadResponse(_))
		));
	}

	#[test]
	fn test_parse_symbols() {
		let body = r#"{"series": {
			"FXUSDCAD": {"label": "USD/CAD", "description": "US dollar to Canadian dollar daily exchange rate"},
			"FXAUDCAD": {"label": "AUD/CAD", "description": "Australian dollar to Canadian dollar daily exchange rate"},
			"BD.CDN.2YR": {"label": "2 year", "description": "Government of Canada benchmark bond yields"},
			"FXMUSDCAD": {"label": "USD/CAD monthly", "description": "Monthly average"}
		}}"#;
		let symbols = parse_symbols(&response(200, body)).unwrap();
		assert_eq!(symbols.len(), 2);
		assert_eq!(symbols[0].0, "AUD/CAD");
		assert_eq!(symbols[1].0, "USD/CAD");
		assert_eq!(symbols[1].1, "US dollar to Canadian dollar daily exchange rate");
	}

	#[test]
	fn test_symbol_length_checked_before_request() {
		assert!(matches!(
			BankOfCanada.fetch(&series("CAD", "USDT")),
			Err(SourceError::InvalidPair { .. })
		));
	}
}
