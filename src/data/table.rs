//! Measurement tables: one record per sweep step plus the run parameters.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// One sweep step: column name to measured or requested value.
pub type Record = BTreeMap<String, f64>;

/// Value of a run parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    None,
}

impl ParamValue {
    /// Parse a value as written by [`fmt::Display`].
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == "None" {
            return ParamValue::None;
        }
        match text.parse::<f64>() {
            Ok(n) => ParamValue::Number(n),
            Err(_) => ParamValue::Text(text.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => write!(f, "{}", s),
            ParamValue::None => write!(f, "None"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<Option<f64>> for ParamValue {
    fn from(value: Option<f64>) -> Self {
        value.map(ParamValue::Number).unwrap_or(ParamValue::None)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Column keys in a fixed order, the records and the run parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub keys: Vec<String>,
    pub records: Vec<Record>,
    pub parameters: Vec<(String, ParamValue)>,
}

impl Table {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Set a parameter, replacing an earlier value with the same name.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        match self.parameters.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.parameters.push((name.to_string(), value)),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// All present values of a column, in record order.
    pub fn column(&self, key: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.get(key).copied())
            .collect()
    }

    /// `(x, y)` pairs from records that have both columns.
    pub fn column_pairs(&self, x: &str, y: &str) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|r| Some((*r.get(x)?, *r.get(y)?)))
            .collect()
    }

    /// Column keys matching any of the regex `patterns` (whole-key match),
    /// in table order.
    pub fn select_columns(&self, patterns: &[String]) -> Result<Vec<String>, regex::Error> {
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(&format!("^(?:{})$", p)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .keys
            .iter()
            .filter(|k| regexes.iter().any(|r| r.is_match(k)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, f64)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_param_value_parse() {
        assert_eq!(ParamValue::parse("2.2"), ParamValue::Number(2.2));
        assert_eq!(ParamValue::parse("None"), ParamValue::None);
        assert_eq!(ParamValue::parse(""), ParamValue::None);
        assert_eq!(
            ParamValue::parse("rgbw-lux"),
            ParamValue::Text("rgbw-lux".to_string())
        );
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::from(1.0).to_string(), "1");
        assert_eq!(ParamValue::from(None).to_string(), "None");
        assert_eq!(ParamValue::from("white").to_string(), "white");
    }

    #[test]
    fn test_set_parameter_replaces() {
        let mut table = Table::new(&["requested"]);
        table.set_parameter("w_gamma", 1.0);
        table.set_parameter("rgb_gamma", 2.2);
        table.set_parameter("w_gamma", 2.0);
        assert_eq!(table.parameters.len(), 2);
        assert_eq!(table.parameter("w_gamma"), Some(&ParamValue::Number(2.0)));
        assert_eq!(table.parameters[0].0, "w_gamma");
    }

    #[test]
    fn test_columns_skip_missing_cells() {
        let mut table = Table::new(&["requested", "lux", "cct"]);
        table.push(record(&[("requested", 0.0), ("lux", 1.0)]));
        table.push(record(&[("requested", 0.5), ("lux", 50.0), ("cct", 2700.0)]));

        assert_eq!(table.len(), 2);
        assert_eq!(table.column("lux"), vec![1.0, 50.0]);
        assert_eq!(table.column("cct"), vec![2700.0]);
        assert_eq!(table.column_pairs("requested", "cct"), vec![(0.5, 2700.0)]);
        assert!(table.has_column("cct"));
        assert!(!table.has_column("w"));
    }

    #[test]
    fn test_select_columns() {
        let table = Table::new(&["requested", "w_lux", "rgb_lux", "rgbw_lux", "w_cct"]);
        let pick = |p: &[&str]| {
            let patterns: Vec<String> = p.iter().map(|s| s.to_string()).collect();
            table.select_columns(&patterns).unwrap()
        };
        assert_eq!(pick(&[".*_lux"]), vec!["w_lux", "rgb_lux", "rgbw_lux"]);
        // Whole-key match only
        assert_eq!(pick(&["lux"]), Vec::<String>::new());
        assert_eq!(pick(&["w_cct", "w_lux"]), vec!["w_lux", "w_cct"]);
        assert!(table.select_columns(&["(".to_string()]).is_err());
    }
}
