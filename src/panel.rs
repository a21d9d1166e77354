//! Values shown in the region census overlay.

use crate::census::RegionTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    Number,
    Money,
}

/// One labelled value of the overlay panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    pub label: &'static str,
    pub value: i64,
    pub format: NumberFormat,
}

impl PanelRow {
    fn number(label: &'static str, value: i64) -> Self {
        Self {
            label,
            value,
            format: NumberFormat::Number,
        }
    }

    pub fn text(&self) -> String {
        match self.format {
            NumberFormat::Number => format_number(self.value),
            NumberFormat::Money => format_money(self.value),
        }
    }
}

/// The overlay rows, in display order.
pub fn panel_rows(totals: &RegionTotals) -> Vec<PanelRow> {
    vec![
        PanelRow::number("Residential", totals.residential_population),
        PanelRow::number("R§", totals.r1),
        PanelRow::number("R§§", totals.r2),
        PanelRow::number("R§§§", totals.r3),
        PanelRow::number("Commercial", totals.commercial_jobs),
        PanelRow::number("Cs§", totals.cs1),
        PanelRow::number("Cs§§", totals.cs2),
        PanelRow::number("Cs§§§", totals.cs3),
        PanelRow::number("Co§§", totals.co2),
        PanelRow::number("Co§§§", totals.co3),
        PanelRow::number("Industrial", totals.industrial_jobs),
        PanelRow::number("IR", totals.ir),
        PanelRow::number("ID", totals.id),
        PanelRow::number("IM", totals.im),
        PanelRow::number("IHT", totals.iht),
        PanelRow::number("Total Cities", totals.total_cities()),
        PanelRow::number("Developed Cities", totals.developed_cities),
        PanelRow::number("Undeveloped Cities", totals.undeveloped_cities),
        PanelRow {
            label: "Region Funds",
            value: totals.region_funds,
            format: NumberFormat::Money,
        },
    ]
}

fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats `value` with `,` between groups of three digits.
pub fn format_number(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    format!("{sign}{}", group_digits(value.unsigned_abs()))
}

/// Like [`format_number`], with the `§` currency glyph in front of the digits.
pub fn format_money(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    format!("{sign}§{}", group_digits(value.unsigned_abs()))
}
