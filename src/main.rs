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
use crate::config::config_file::{csv_delimiter, Config};
use crate::config::filesystem::Filesystem;
use crate::fetch::orchestrator;
use crate::outputs::format::{Format, SymbolPlacement};
use crate::outputs::OutputKind;
use crate::prices::series::Series;
use crate::sources::source::{format_search, format_symbols};
use crate::util::date::Date;
use anyhow::{anyhow, bail, Error};
use chrono::Local;
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use log::{debug, error, info};
use std::io::{self, Write};
use std::process;

mod config;
mod fetch;
mod logger;
mod outputs;
mod prices;
mod sources;
mod util;

#[derive(Parser)]
#[command(
	name = "pricehist",
	version,
	about = "Fetch historical price data",
	arg_required_else_help = true
)]
struct Cli {
	/// Show all log messages
	#[arg(long, global = true)]
	verbose: bool,

	/// Custom config file location (default: ~/.config/pricehist/config.toml)
	#[arg(long, global = true)]
	config: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// List sources
	Sources,

	/// Show source details
	Source {
		/// The source identifier
		#[arg(value_parser = PossibleValuesParser::new(sources::ids()))]
		source: String,

		/// List the available symbols for this source
		#[arg(long, conflicts_with = "search")]
		symbols: bool,

		/// Search for symbols, if possible
		#[arg(long, value_name = "QUERY")]
		search: Option<String>,
	},

	/// Fetch prices
	Fetch(FetchArgs),
}

#[derive(Args)]
struct FetchArgs {
	// ----------------
	// -- POSITIONAL --
	// ----------------
	/// The source identifier
	#[arg(value_parser = PossibleValuesParser::new(sources::ids()))]
	source: String,

	/// Pair, usually BASE/QUOTE, e.g. BTC/USD
	#[arg(value_parser = valid_pair)]
	pair: (String, String),

	// -----------
	// -- FLAGS --
	// -----------
	/// Price type, e.g. close (default: the source's first type)
	#[arg(short = 't', long = "type", value_name = "TYPE")]
	price_type: Option<String>,

	/// Start date, inclusive (default: source start)
	#[arg(short, long, value_name = "DATE", value_parser = valid_date)]
	start: Option<Date>,

	/// Start date, exclusive (also -sx)
	#[arg(long, value_name = "DATE", value_parser = valid_date_after, conflicts_with = "start")]
	startx: Option<Date>,

	/// End date, inclusive (default: today)
	#[arg(short, long, value_name = "DATE", value_parser = valid_date)]
	end: Option<Date>,

	/// End date, exclusive (also -ex)
	#[arg(long, value_name = "DATE", value_parser = valid_date_before, conflicts_with = "end")]
	endx: Option<Date>,

	/// Output format (default: csv)
	#[arg(short, long, value_name = "FMT")]
	output: Option<OutputKind>,

	/// Invert the price, swapping base and quote
	#[arg(long)]
	invert: bool,

	/// Round to the given number of decimal places
	#[arg(long, value_name = "INT")]
	quantize: Option<u32>,

	/// Rename the base symbol in output
	#[arg(long, value_name = "SYM")]
	fmt_base: Option<String>,

	/// Rename the quote symbol in output
	#[arg(long, value_name = "SYM")]
	fmt_quote: Option<String>,

	/// Set a particular time of day in output (default: 00:00:00)
	#[arg(long, value_name = "TIME")]
	fmt_time: Option<String>,

	/// Decimal point in output (default: '.')
	#[arg(long, value_name = "CHAR", value_parser = valid_char)]
	fmt_decimal: Option<String>,

	/// Thousands separator in output, empty for none (default: none)
	#[arg(long, value_name = "CHAR", value_parser = valid_thousands)]
	fmt_thousands: Option<String>,

	/// Commodity symbol placement in output (default: rightspace)
	#[arg(long, value_name = "LOCATION")]
	fmt_symbol: Option<SymbolPlacement>,

	/// Date separator in output (default: '-')
	#[arg(long, value_name = "CHAR", value_parser = valid_char)]
	fmt_datesep: Option<String>,

	/// Field delimiter for CSV output (default: ',')
	#[arg(long, value_name = "CHAR", value_parser = csv_delimiter)]
	fmt_csvdelim: Option<u8>,
}

impl FetchArgs {
	/// The config file's format settings with any flags laid over them.
	fn format(&self, config: &Config) -> Result<Format, Error> {
		let mut fmt = config.format()?;
		fmt.base = self.fmt_base.clone();
		fmt.quote = self.fmt_quote.clone();
		if let Some(time) = &self.fmt_time {
			fmt.time = time.clone();
		}
		if let Some(decimal) = &self.fmt_decimal {
			fmt.decimal = decimal.clone();
		}
		if let Some(thousands) = &self.fmt_thousands {
			fmt.thousands = thousands.clone();
		}
		if let Some(symbol) = self.fmt_symbol {
			fmt.symbol = symbol;
		}
		if let Some(datesep) = &self.fmt_datesep {
			fmt.datesep = datesep.clone();
		}
		if let Some(csvdelim) = self.fmt_csvdelim {
			fmt.csvdelim = csvdelim;
		}
		Ok(fmt)
	}
}

fn main() {
	let cli = Cli::parse_from(expand_short_aliases(std::env::args()));

	if let Err(e) = logger::init(cli.verbose) {
		eprintln!("Unable to start logging: {}", e);
	}

	debug!("Began pricehist run at {}.", Local::now().format("%Y-%m-%d %H:%M:%S"));

	let status = match run(cli) {
		Ok(()) => 0,
		Err(e) => {
			error!("{}", e);
			debug!("{:?}", e);
			1
		},
	};

	debug!("Ended pricehist run at {}.", Local::now().format("%Y-%m-%d %H:%M:%S"));
	process::exit(status);
}

fn run(cli: Cli) -> Result<(), Error> {
	match cli.command {
		Command::Sources => emit(&format!("{}\n", sources::formatted())),
		Command::Source {
			source,
			symbols,
			search,
		} => {
			let source = find_source(&source)?;
			if symbols {
				emit(&format_symbols(&source.symbols()?))
			} else if let Some(query) = search {
				let rows = match source.search(&query) {
					Some(rows) => rows?,
					None => bail!("Symbol search is not possible for the {} source.", source.id()),
				};
				if rows.is_empty() {
					info!("No results found for query '{}'.", query);
					Ok(())
				} else {
					emit(&format_search(&rows))
				}
			} else {
				emit(&format!("{}\n", source.format_info(80)))
			}
		},
		Command::Fetch(args) => {
			// only fetching has anything to configure
			let config = Filesystem::new().get_config(cli.config.as_ref())?;
			emit(&fetch(&args, &config)?)
		},
	}
}

fn fetch(args: &FetchArgs, config: &Config) -> Result<String, Error> {
	let source = find_source(&args.source)?;

	let base = source.normalize_symbol(&args.pair.0);
	let quote = source.normalize_symbol(&args.pair.1);

	let price_type = match &args.price_type {
		Some(t) => t.clone(),
		None => source
			.types()
			.first()
			.map(|t| t.to_string())
			.ok_or_else(|| anyhow!("The {} source has no price types.", source.id()))?,
	};
	if !source.types().iter().any(|t| *t == price_type) {
		bail!(
			"The requested price type '{}' is not recognized by the {} source!",
			price_type,
			source.id()
		);
	}

	let start = args.start.or(args.startx).unwrap_or_else(|| source.start());
	let end = args.end.or(args.endx).unwrap_or_else(Date::today);
	if end < start {
		bail!("The end date '{}' precedes the start date '{}'!", end, start);
	}

	let fmt = args.format(config)?;
	let output = args.output.unwrap_or_else(|| config.output());
	let series = Series::new(&base, &quote, &price_type, start, end);

	Ok(orchestrator::fetch(
		&series,
		source.as_ref(),
		output.output().as_ref(),
		args.invert,
		args.quantize,
		&fmt,
	)?)
}

fn find_source(id: &str) -> Result<Box<dyn sources::source::Source>, Error> {
	sources::by_id(id).ok_or_else(|| anyhow!("Unknown source '{}'.", id))
}

/// Writes to stdout as-is. A reader that hangs up early isn't an error.
fn emit(text: &str) -> Result<(), Error> {
	let mut stdout = io::stdout().lock();
	match stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
		Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
			debug!("The output pipe was closed.");
			Ok(())
		},
		result => Ok(result?),
	}
}

/// Clap only allows single-character short flags, so the two-letter
/// exclusive date flags are rewritten to their long forms.
fn expand_short_aliases(args: impl Iterator<Item = String>) -> Vec<String> {
	args.map(|arg| match arg.as_str() {
		"-sx" => "--startx".to_string(),
		"-ex" => "--endx".to_string(),
		_ => arg,
	})
	.collect()
}

fn valid_pair(s: &str) -> Result<(String, String), Error> {
	let mut parts = s.split('/');
	let base = parts.next().unwrap_or_default();
	let quote = parts.next().unwrap_or_default();
	if base.is_empty() {
		bail!("Invalid pair '{}'. It should look like BASE/QUOTE or BASE.", s);
	}
	Ok((base.to_string(), quote.to_string()))
}

fn valid_date(s: &str) -> Result<Date, Error> {
	if s == "today" {
		return Ok(Date::today());
	}
	Date::from_str(s).map_err(|_| anyhow!("Not a valid date: '{}'.", s))
}

fn valid_date_after(s: &str) -> Result<Date, Error> {
	valid_date(s)?
		.next()
		.ok_or_else(|| anyhow!("Not a valid date: '{}'.", s))
}

fn valid_date_before(s: &str) -> Result<Date, Error> {
	valid_date(s)?
		.previous()
		.ok_or_else(|| anyhow!("Not a valid date: '{}'.", s))
}

fn valid_char(s: &str) -> Result<String, Error> {
	if s.chars().count() != 1 {
		bail!("'{}' must be a single character.", s);
	}
	Ok(s.to_string())
}

fn valid_thousands(s: &str) -> Result<String, Error> {
	if s.is_empty() {
		return Ok(String::new());
	}
	valid_char(s)
}
