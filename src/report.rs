//! CSV census report.
//!
//! The layout is consumed by spreadsheets and existing scripts, so the column
//! order, quoting and the trailing comma on every line are fixed.

use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::model::{CityRecord, GroupStats, RciGroup};

/// Number of columns in every report line.
pub const COLUMN_COUNT: usize = 47;

/// The header line, without its line break.
pub const COLUMN_HEADER: &str = concat!(
    "City Name,Mayor Name,Mayor Rating,Difficulty,Tile Size,Residential Pop.,Commercial Jobs,Industrial Jobs,Workforce Percentage,",
    "R§ Pop.,R§ Extrapolated Pop.,R§ Tax Rate,R§§ Pop.,R§§ Extrapolated Pop.,R§§ Tax Rate,R§§§ Pop.,R§§§ Extrapolated Pop.,R§§§ Tax Rate,",
    "Cs§ Pop.,Cs§ Extrapolated Pop.,Cs§ Tax Rate,Cs§§ Pop.,Cs§§ Extrapolated Pop.,Cs§§ Tax Rate,Cs§§§ Pop.,Cs§§§ Extrapolated Pop.,Cs§§§ Tax Rate,",
    "Co§§ Pop.,Co§§ Extrapolated Pop.,Co§§ Tax Rate,Co§§§ Pop.,Co§§§ Extrapolated Pop.,Co§§§ Tax Rate,IR Pop.,IR Extrapolated Pop.,IR Tax Rate,",
    "ID Pop.,ID Extrapolated Pop.,ID Tax Rate,IM Pop.,IM Extrapolated Pop.,IM Tax Rate,IHT Pop.,IHT Extrapolated Pop.,IHT Tax Rate,Budget,Income,",
);

const CURRENCY_SYMBOL: char = '§';

fn percentage(value: f64, precision: usize) -> String {
    format!("{value:.precision$}%")
}

fn currency(value: f64) -> String {
    format!("{CURRENCY_SYMBOL}{value:.2}")
}

fn push_group(fields: &mut Vec<String>, stats: GroupStats) {
    fields.push(stats.population.to_string());
    fields.push(stats.extrapolated_population.to_string());
    fields.push(percentage(stats.tax_rate * 100.0, 1));
}

/// Formats one record as its report fields, in column order.
pub fn row_fields(record: &CityRecord) -> Vec<String> {
    let mut fields = Vec::with_capacity(COLUMN_COUNT);

    fields.push(record.city_name().to_string());
    fields.push(record.mayor_name().to_string());
    fields.push(record.mayor_rating().to_string());
    fields.push(record.difficulty().to_string());
    fields.push(record.tile_size().to_string());
    fields.push(record.residential_population().to_string());
    fields.push(record.commercial_jobs().to_string());
    fields.push(record.industrial_jobs().to_string());
    fields.push(percentage(record.workforce_percentage(), 1));

    for group in RciGroup::ALL {
        push_group(&mut fields, record.group(group));
    }

    fields.push(currency(record.budget()));
    fields.push(currency(record.income()));

    fields
}

/// Writes the header and one line per record to `sink`.
///
/// Nothing is rolled back if the sink fails part way through.
pub fn write_report<W: Write>(records: &[CityRecord], mut sink: W) -> Result<()> {
    sink.write_all(COLUMN_HEADER.as_bytes())?;
    sink.write_all(b"\n")?;

    // Each field is closed by a comma, so the record terminator is a comma and
    // line breaks go straight to the sink between records.
    for record in records {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b','))
            .from_writer(&mut sink);
        writer.write_record(row_fields(record))?;
        writer.flush()?;
        drop(writer);

        sink.write_all(b"\n")?;
    }

    sink.flush()?;
    Ok(())
}

/// Creates (or truncates) `path` and writes the report into it.
pub fn write_report_file(records: &[CityRecord], path: &Path) -> Result<()> {
    debug!(path = %path.display(), rows = records.len(), "Writing census report");

    let file = File::create(path)
        .with_context(|| format!("creating report file '{}'", path.display()))?;
    let mut out = BufWriter::new(file);

    write_report(records, &mut out)
        .with_context(|| format!("writing report file '{}'", path.display()))?;
    out.flush()?;

    Ok(())
}
