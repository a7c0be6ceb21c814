//! Server-rendered index page.

use crate::models::{PlanetRecord, TransitReport};

/// Escape text for interpolation into HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render the form, and the result section when a report is given.
pub fn render_page(star_id: &str, threshold: &str, report: Option<&TransitReport>) -> String {
    let result = report.map(render_result).unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Exoplanet Transit Finder</title>
<style>
body {{ font-family: sans-serif; max-width: 1040px; margin: 2em auto; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #ccc; padding: 4px 10px; }}
.message {{ font-weight: bold; }}
</style>
</head>
<body>
<h1>Exoplanet Transit Finder</h1>
<form method="post" action="/">
<label>Star ID <input name="star_id" value="{star_id}" placeholder="KIC 11446443"></label>
<label>Threshold <input name="threshold" value="{threshold}" placeholder="0.995"></label>
<button type="submit">Search</button>
</form>
{result}</body>
</html>
"#,
        star_id = escape_html(star_id),
        threshold = escape_html(threshold),
        result = result,
    )
}

fn render_result(report: &TransitReport) -> String {
    let mut html = format!(
        "<p class=\"message\">{}</p>\n",
        escape_html(&report.message)
    );

    if let Some(url) = &report.plot_url {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"Light curve for {}\">\n",
            escape_html(url),
            escape_html(&report.star_id)
        ));
    }

    if !report.planets.is_empty() {
        html.push_str("<h2>Confirmed planets</h2>\n<table>\n");
        html.push_str(
            "<tr><th>Name</th><th>Host</th><th>Period (days)</th><th>Radius (Earth)</th></tr>\n",
        );
        for planet in &report.planets {
            html.push_str(&planet_row(planet));
        }
        html.push_str("</table>\n");
    }
    html
}

fn planet_row(planet: &PlanetRecord) -> String {
    let number = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        escape_html(&planet.name),
        escape_html(&planet.host),
        number(planet.orbital_period_days),
        number(planet.radius_earth),
    )
}
