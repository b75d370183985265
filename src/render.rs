use std::fmt::Write;

use crate::models::{ExecutiveReport, Kpi, KpiRow, ManagerReport, Period};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `$1,234.56`
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}${}.{:02}",
        group_thousands(&(cents / 100).to_string()),
        cents % 100
    )
}

fn format_value(kpi: Kpi, value: f64) -> String {
    if kpi.is_currency() {
        format_currency(value)
    } else {
        format!("{value:.0}")
    }
}

const FONT_STYLE: &str =
    "<style>\n    body, table, p, td, li {\n        font-family: Calibri, sans-serif;\n    }\n</style>";

fn kpi_table<'a>(
    output: &mut String,
    title: &str,
    period: Period,
    rows: impl Iterator<Item = &'a KpiRow>,
) {
    let value_header = match period {
        Period::Daily => "Day Value",
        Period::Ytd => "Year Value",
    };

    let _ = writeln!(
        output,
        "<div style='text-align: center; margin-bottom: 10px; font-size: 16pt'><b>{title}</b></div>"
    );
    let _ = writeln!(
        output,
        "<table border='1' cellpadding='10' cellspacing='0' style='border-collapse: collapse; text-align: center; font-size: 14pt; width: 100%;'>"
    );
    let _ = writeln!(
        output,
        "<thead><tr><th>Indicator</th><th>{value_header}</th><th>Target</th><th>Scenario</th></tr></thead>"
    );
    let _ = writeln!(output, "<tbody>");
    for row in rows {
        let color = if row.met_target { "green" } else { "red" };
        let _ = writeln!(
            output,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td style=\"color: {color}; font-size: 18pt;\">&#9689;</td></tr>",
            row.kpi.display_name(),
            format_value(row.kpi, row.actual),
            format_value(row.kpi, row.target),
        );
    }
    let _ = writeln!(output, "</tbody>");
    let _ = writeln!(output, "</table>");
}

pub fn render_manager_report(report: &ManagerReport, manager_first_name: &str) -> RenderedMail {
    let subject = format!(
        "OnePage {} - {}",
        report.date.format("%Y/%m/%d"),
        report.store_name
    );

    let mut body = String::new();
    let _ = writeln!(body, "{FONT_STYLE}");
    let _ = writeln!(body, "<p>Good Morning, {manager_first_name}</p>");
    let _ = writeln!(
        body,
        "<p>Yesterday's result ({}) of {} was:</p>",
        report.date.format("%m/%d"),
        report.store_name
    );
    let _ = writeln!(body, "<table style='width: 100%; border-collapse: collapse;'><tr>");
    for (period, title) in [(Period::Daily, "Daily Values"), (Period::Ytd, "Yearly Values")] {
        let _ = writeln!(body, "<td style='width: 50%; vertical-align: top; padding: 10px;'>");
        kpi_table(&mut body, title, period, report.rows(period));
        let _ = writeln!(body, "</td>");
    }
    let _ = writeln!(body, "</tr></table>");
    let _ = writeln!(
        body,
        "<p>Please find attached the spreadsheet with all the data for further details.</p>"
    );
    let _ = writeln!(body, "<p>Should you have any questions, feel free to reach out.</p>");

    RenderedMail { subject, body }
}

pub fn render_executive_report(report: &ExecutiveReport) -> RenderedMail {
    let subject = format!(
        "Daily and YTD Store Revenue Rankings - {}",
        report.date.format("%Y/%m/%d")
    );

    let mut body = String::new();
    let _ = writeln!(body, "{FONT_STYLE}");
    let _ = writeln!(body, "<p>Dear Board,</p>");
    let _ = writeln!(
        body,
        "<p>We are pleased to share the revenue performance rankings for our stores:</p>"
    );

    for period in Period::ALL {
        let heading = match period {
            Period::Daily => format!("Daily Performance (Date: {})", report.date.format("%m/%d")),
            Period::Ytd => format!("YTD Performance (Year: {})", report.date.format("%Y")),
        };
        let _ = writeln!(body, "<p><b>{heading}:</b></p>");

        match (report.best(period), report.worst(period)) {
            (Some(best), Some(worst)) => {
                let _ = writeln!(body, "<ul>");
                let _ = writeln!(
                    body,
                    "<li><span style='color: green;'>Best Store:</span> <b>{}</b> with a revenue of <b>{}</b>.</li>",
                    best.store_name,
                    format_currency(best.revenue)
                );
                let _ = writeln!(
                    body,
                    "<li><span style='color: red;'>Worst Store:</span> <b>{}</b> with a revenue of <b>{}</b>.</li>",
                    worst.store_name,
                    format_currency(worst.revenue)
                );
                let _ = writeln!(body, "</ul>");
            }
            _ => {
                let _ = writeln!(body, "<p>No stores ranked for this period.</p>");
            }
        }

        let _ = writeln!(body, "<ol>");
        for entry in &report.ranking(period).entries {
            let _ = writeln!(
                body,
                "<li>{} ({})</li>",
                report.store_name(&entry.store_id),
                format_currency(entry.revenue)
            );
        }
        let _ = writeln!(body, "</ol>");
    }

    let _ = writeln!(
        body,
        "<p>The detailed daily and yearly rankings are attached for your review.</p>"
    );
    let _ = writeln!(body, "<p>Should you have any questions, feel free to reach out.</p>");

    RenderedMail { subject, body }
}
