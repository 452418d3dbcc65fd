use std::collections::HashMap;
use tracing::debug;

const ENTRY_SEPARATOR: &str = "{e}{s}";
const LABEL_END: &str = "{m}";
const VALUE_END: &str = "</td><td>&nbsp;</td><td>";

/// Reads the label/value table a Tasmota plug serves on `/?m=1`.
///
/// The body is a run of `{s}label{m}...value</td><td>&nbsp;</td><td>unit{e}`
/// rows; everything before the first row separator is page chrome. Rows whose
/// value is not a finite number are left out.
pub fn parse_tasmota_markup(markup: &str) -> HashMap<String, f64> {
    let mut readings = HashMap::new();

    for entry in markup.trim().split(ENTRY_SEPARATOR).skip(1) {
        let label = entry.split(LABEL_END).next().unwrap_or_default().trim();

        let value_section = entry.split(VALUE_END).next().unwrap_or_default();
        let value = value_section.rsplit('>').next().unwrap_or_default().trim();

        match value.parse::<f64>() {
            Ok(value) if value.is_finite() => {
                readings.insert(label.to_string(), value);
            }
            _ => debug!("Skipping reading \"{}\" with value \"{}\"", label, value),
        }
    }

    readings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::model::PlugMetrics;

    fn row(label: &str, value: &str, unit: &str) -> String {
        format!(
            "{{s}}{}{{m}}</td><td style='text-align:left'>{}</td><td>&nbsp;</td><td> {}{{e}}",
            label, value, unit
        )
    }

    fn page(rows: &[String]) -> String {
        //Tasmota opens the table with a header row before the readings
        format!(
            "{{t}}{{s}}</th><th></th><th style='text-align:center'>Energy</th><th></th><td>{{e}}{}{{t}}",
            rows.concat()
        )
    }

    fn plug_page() -> String {
        page(&[
            row("Voltage", "231", "V"),
            row("Current", "0.452", "A"),
            row("Active Power", "88", "W"),
            row("Apparent Power", "104", "VA"),
            row("Reactive Power", "55", "VAr"),
            row("Power Factor", "0.85", ""),
        ])
    }

    #[test]
    fn plug_page_parses_into_metrics() {
        let readings = parse_tasmota_markup(&plug_page());
        let metrics = PlugMetrics::from_readings(&readings).unwrap();

        assert_eq!(metrics.voltage, 231.0);
        assert_eq!(metrics.current, 0.452);
        assert_eq!(metrics.active_power, 88.0);
        assert_eq!(metrics.apparent_power, 104.0);
        assert_eq!(metrics.reactive_power, 55.0);
        assert_eq!(metrics.power_factor, 0.85);
    }

    #[test]
    fn page_without_rows_is_empty() {
        assert!(parse_tasmota_markup("{t}{t}").is_empty());
    }

    #[test]
    fn non_numeric_values_are_skipped() {
        let page = page(&[row("Voltage", "n/a", "V"), row("Current", "0.5", "A")]);
        let readings = parse_tasmota_markup(&page);

        assert_eq!(readings.len(), 1);
        assert_eq!(readings["Current"], 0.5);
        assert!(PlugMetrics::from_readings(&readings).is_err());
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let page = page(&[
            row("Voltage", "NaN", "V"),
            row("Current", "inf", "A"),
            row("Active Power", "-infinity", "W"),
            row("Power Factor", "0.9", ""),
        ]);
        let readings = parse_tasmota_markup(&page);

        assert_eq!(readings.len(), 1);
        assert_eq!(readings["Power Factor"], 0.9);
    }
}
