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
use crate::outputs::format::Format;
use crate::outputs::{Output, OutputError};
use crate::prices::series::Series;
use crate::sources::source::Source;

/// `P` price directives, readable by Ledger and hledger. An empty time
/// drops the time column entirely.
pub struct Ledger;

impl Output for Ledger {
	fn format(
		&self,
		series: &Series,
		_source: &dyn Source,
		fmt: &Format,
	) -> Result<String, OutputError> {
		let base = fmt.base(&series.base);
		let quote = fmt.quote(&series.quote);
		let timesep = if fmt.time.is_empty() { "" } else { " " };

		let mut output = String::new();
		for price in &series.prices {
			output.push_str(&format!(
				"P {}{}{} {} {}\n",
				fmt.format_date(&price.date),
				timesep,
				fmt.time,
				base,
				fmt.format_quote_amount(quote, &price.amount)
			));
		}
		Ok(output)
	}
}
