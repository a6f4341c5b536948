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
use ::csv::{QuoteStyle, Terminator, WriterBuilder};

/// Delimited rows with a header, quoted only where needed. Lines always end
/// in a bare newline.
pub struct Csv;

impl Output for Csv {
	fn format(
		&self,
		series: &Series,
		source: &dyn Source,
		fmt: &Format,
	) -> Result<String, OutputError> {
		let mut writer = WriterBuilder::new()
			.delimiter(fmt.csvdelim)
			.quote(b'"')
			.double_quote(true)
			.quote_style(QuoteStyle::Necessary)
			.terminator(Terminator::Any(b'\n'))
			.from_writer(vec![]);

		writer.write_record(["date", "base", "quote", "amount", "source", "type"])?;

		let base = fmt.base(&series.base);
		let quote = fmt.quote(&series.quote);
		for price in &series.prices {
			writer.write_record([
				fmt.format_date(&price.date).as_str(),
				base,
				quote,
				fmt.format_num(&price.amount).as_str(),
				source.id(),
				series.price_type.as_str(),
			])?;
		}

		let bytes = writer
			.into_inner()
			.map_err(|e| OutputError::Csv(e.into_error().into()))?;
		Ok(String::from_utf8(bytes)?)
	}
}
