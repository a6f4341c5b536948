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
use crate::prices::series::Series;
use crate::sources::errors::SourceError;
use crate::util::date::Date;

const LABEL_WIDTH: usize = 11;

/// A provider of historical prices.
///
/// `fetch` takes a series shell (pair, type and date range, no prices) and
/// returns a populated copy, possibly with corrected symbols. Implementations
/// do their own request segmentation and never retry.
pub trait Source {
	fn id(&self) -> &'static str;
	fn name(&self) -> &'static str;
	fn description(&self) -> &'static str;
	fn source_url(&self) -> &'static str;

	/// Earliest date the provider has data for
	fn start(&self) -> Date;

	/// Supported price types; the first is the default
	fn types(&self) -> Vec<&'static str>;

	fn notes(&self) -> String;

	fn symbols(&self) -> Result<Vec<(String, String)>, SourceError>;

	/// None when the provider has no search facility.
	fn search(&self, _query: &str) -> Option<Result<Vec<(String, String)>, SourceError>> {
		None
	}

	fn fetch(&self, series: &Series) -> Result<Series, SourceError>;

	fn normalize_symbol(&self, symbol: &str) -> String {
		symbol.to_uppercase()
	}

	fn format_info(&self, total_width: usize) -> String {
		let types = self.types().join(", ");
		let start = self.start().to_string();
		let notes = self.notes();
		let fields = [
			("ID", self.id(), true),
			("Name", self.name(), true),
			("Description", self.description(), true),
			("URL", self.source_url(), false),
			("Start", start.as_str(), true),
			("Types", types.as_str(), true),
			("Notes", notes.as_str(), true),
		];

		fields
			.iter()
			.filter(|(_, value, _)| !value.is_empty())
			.map(|(key, value, wrap)| format_field(key, value, *wrap, total_width))
			.collect::<Vec<_>>()
			.join("\n")
	}
}

/// One `KEY : VALUE` entry. Wrapped lines hang under the value's first
/// column; blank lines within the value stay blank.
fn format_field(key: &str, value: &str, wrap: bool, total_width: usize) -> String {
	let label = format!("{:<width$} : ", key, width = LABEL_WIDTH);
	let indent = " ".repeat(label.len());
	let width = total_width.saturating_sub(label.len()).max(1);

	let mut lines = Vec::new();
	for paragraph in value.split('\n') {
		if paragraph.trim().is_empty() {
			lines.push(String::new());
		} else if wrap {
			lines.extend(wrap_words(paragraph, width));
		} else {
			lines.push(paragraph.to_string());
		}
	}

	lines
		.iter()
		.enumerate()
		.map(|(i, line)| match (i, line.is_empty()) {
			(0, _) => format!("{}{}", label, line),
			(_, true) => String::new(),
			(_, false) => format!("{}{}", indent, line),
		})
		.collect::<Vec<_>>()
		.join("\n")
}

/// Greedy word wrap. A word longer than the width gets a line to itself.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
	let mut lines = Vec::new();
	let mut current = String::new();
	for word in text.split_whitespace() {
		if current.is_empty() {
			current.push_str(word);
		} else if current.chars().count() + 1 + word.chars().count() <= width {
			current.push(' ');
			current.push_str(word);
		} else {
			lines.push(std::mem::take(&mut current));
			current.push_str(word);
		}
	}
	if !current.is_empty() {
		lines.push(current);
	}
	lines
}

/// Symbols left-justified in a column four wider than the longest, each
/// followed by its description and a newline.
pub fn format_symbols(rows: &[(String, String)]) -> String {
	let width = rows.iter().map(|(s, _)| s.chars().count()).max().unwrap_or(0);
	rows.iter()
		.map(|(symbol, description)| {
			format!("{:<width$}{}\n", symbol, description, width = width + 4)
		})
		.collect()
}

pub fn format_search(rows: &[(String, String)]) -> String {
	format_symbols(rows)
}
