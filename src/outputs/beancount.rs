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
use crate::outputs::format::{Format, SymbolPlacement};
use crate::outputs::{Output, OutputError};
use crate::prices::series::Series;
use crate::sources::source::Source;

/// Beancount `price` directives. Beancount only accepts the currency after
/// the number, so the configured symbol placement is ignored.
pub struct Beancount;

impl Output for Beancount {
	fn format(
		&self,
		series: &Series,
		_source: &dyn Source,
		fmt: &Format,
	) -> Result<String, OutputError> {
		let trailing = Format {
			symbol: SymbolPlacement::RightSpace,
			..fmt.clone()
		};
		let base = fmt.base(&series.base);
		let quote = fmt.quote(&series.quote);

		let mut output = String::new();
		for price in &series.prices {
			output.push_str(&format!(
				"{} price {} {}\n",
				trailing.format_date(&price.date),
				base,
				trailing.format_quote_amount(quote, &price.amount)
			));
		}
		Ok(output)
	}
}
