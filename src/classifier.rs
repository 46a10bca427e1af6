//! Telemetry line classifier
//!
//! Recognizes which of the known BMS message shapes a tokenized line
//! matches and extracts raw field values at fixed token positions.
//!
//! # Shapes
//!
//! A shape is a whole-token presence/absence predicate over the line plus
//! an extractor that reads values at shape-specific indices. Shapes are
//! kept in a fixed priority order and evaluated first-match-wins, so
//! overlapping predicates (e.g. `current` vs. `Charging`, `soc` vs.
//! `total soc`) resolve deterministically.
//!
//! The classifier is a pure function: no state, no side effects. A line
//! that satisfies a predicate but is too short for its extractor yields
//! [`MonitorError::Extraction`]; the caller records it and moves on.

use crate::error::{MonitorError, Result};
use crate::types::FieldUpdate;

/// Split a raw line into whitespace-delimited tokens.
///
/// Terminators are expected to be stripped already; consecutive whitespace
/// collapses, so re-joining with single spaces reproduces the sequence.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Result of classifying one tokenized line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The line matched a shape; extracted updates in table order
    Matched(Vec<FieldUpdate>),
    /// No shape predicate matched; the line goes to the transcript only
    Unrecognized,
}

impl Classification {
    /// Updates extracted from the line, empty for unrecognized lines
    pub fn updates(&self) -> &[FieldUpdate] {
        match self {
            Classification::Matched(updates) => updates,
            Classification::Unrecognized => &[],
        }
    }
}

/// One recognized message shape
struct Shape {
    name: &'static str,
    matches: fn(&[&str]) -> bool,
    extract: fn(&'static str, &[&str]) -> Result<Vec<FieldUpdate>>,
}

fn has(tokens: &[&str], word: &str) -> bool {
    tokens.contains(&word)
}

fn token<'a>(shape: &'static str, tokens: &'a [&str], index: usize) -> Result<&'a str> {
    tokens.get(index).copied().ok_or(MonitorError::Extraction {
        shape,
        index,
        token_count: tokens.len(),
    })
}

/// Substring after the first `=` in a token, empty when there is none
fn after_eq(token: &str) -> &str {
    token.split_once('=').map(|(_, rest)| rest).unwrap_or("")
}

/// The shape table, in priority order. Predicates are case-sensitive
/// whole-token tests; extraction indices are 0-based offsets into the line.
static SHAPES: &[Shape] = &[
    Shape {
        name: "cell_volt",
        matches: |t| has(t, "cell") && has(t, "volt") && !has(t, "dev") && !has(t, "pack"),
        extract: |s, t| {
            let cell = token(s, t, 1)?;
            let value = token(s, t, 3)?;
            Ok(vec![FieldUpdate::new(format!("volt{}", cell), value)])
        },
    },
    Shape {
        name: "mean_cell_voltage",
        matches: |t| has(t, "mean") && has(t, "cell") && has(t, "voltage"),
        extract: |s, t| {
            Ok(vec![
                FieldUpdate::new("mean_cell_voltage", token(s, t, 7)?),
                FieldUpdate::new("pack_volt", token(s, t, 3)?),
            ])
        },
    },
    Shape {
        name: "term_volt",
        matches: |t| has(t, "term"),
        extract: |s, t| Ok(vec![FieldUpdate::new("term_volt", token(s, t, 2)?)]),
    },
    Shape {
        name: "drain_volt",
        matches: |t| has(t, "drain"),
        extract: |s, t| Ok(vec![FieldUpdate::new("drain_volt", token(s, t, 2)?)]),
    },
    Shape {
        name: "current",
        matches: |t| has(t, "current") && !has(t, "Charging"),
        extract: |s, t| Ok(vec![FieldUpdate::new("current", token(s, t, 2)?)]),
    },
    Shape {
        name: "cell_soc",
        matches: |t| has(t, "soc") && !has(t, "zp") && !has(t, "total"),
        extract: |s, t| {
            let key = format!("{}{}", token(s, t, 0)?, token(s, t, 1)?);
            Ok(vec![FieldUpdate::new(key, token(s, t, 3)?)])
        },
    },
    Shape {
        name: "total_soc",
        matches: |t| has(t, "total") && has(t, "soc") && !has(t, "volt"),
        extract: |s, t| {
            Ok(vec![
                FieldUpdate::new("total_soc", token(s, t, 2)?),
                FieldUpdate::new("time_remaining", token(s, t, 7)?),
                FieldUpdate::new("capacity", token(s, t, 4)?),
            ])
        },
    },
    Shape {
        name: "deviation",
        matches: |t| has(t, "deviation"),
        extract: |s, t| {
            Ok(vec![
                FieldUpdate::new("temperature_gradient", token(s, t, 3)?),
                FieldUpdate::new("mean_temp", token(s, t, 6)?),
            ])
        },
    },
    Shape {
        name: "vsafe",
        matches: |t| has(t, "Vsafe"),
        extract: |s, t| Ok(vec![FieldUpdate::new("Vsafe", after_eq(token(s, t, 1)?))]),
    },
    Shape {
        name: "charging",
        matches: |t| has(t, "Charging"),
        extract: |s, t| {
            Ok(vec![
                FieldUpdate::new("Charging_Mode", token(s, t, 2)?),
                FieldUpdate::new("max_current", after_eq(token(s, t, 5)?)),
                FieldUpdate::new("Vbus", after_eq(token(s, t, 3)?)),
            ])
        },
    },
    Shape {
        name: "adc",
        matches: |t| has(t, "adc"),
        extract: |s, t| {
            let key = format!("{}{}", token(s, t, 0)?, token(s, t, 1)?);
            Ok(vec![FieldUpdate::new(key, token(s, t, 3)?)])
        },
    },
    Shape {
        name: "dtc",
        matches: |t| has(t, "DTC"),
        extract: |s, t| Ok(vec![FieldUpdate::new("Error_Codes", token(s, t, 1)?)]),
    },
];

/// Classify one tokenized line against the shape table.
///
/// Returns the extracted updates for the first matching shape,
/// `Unrecognized` when no predicate matches, or an extraction error when
/// the matching shape cannot read its token positions.
pub fn classify(tokens: &[&str]) -> Result<Classification> {
    for shape in SHAPES {
        if (shape.matches)(tokens) {
            let updates = (shape.extract)(shape.name, tokens)?;
            return Ok(Classification::Matched(updates));
        }
    }
    Ok(Classification::Unrecognized)
}

/// Tokenize and classify a raw line in one step
pub fn classify_line(line: &str) -> Result<Classification> {
    classify(&tokenize(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(line: &str) -> Vec<FieldUpdate> {
        match classify_line(line).expect("classification failed") {
            Classification::Matched(updates) => updates,
            Classification::Unrecognized => panic!("expected a match for {:?}", line),
        }
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        assert_eq!(tokenize("cell  0\tvolt 41230"), vec!["cell", "0", "volt", "41230"]);
        assert_eq!(tokenize("  "), Vec::<&str>::new());
    }

    #[test]
    fn test_cell_volt_shape() {
        let updates = matched("cell 3 volt 41230");
        assert_eq!(updates, vec![FieldUpdate::new("volt3", "41230")]);
    }

    #[test]
    fn test_cell_volt_excluded_by_dev_and_pack() {
        assert_eq!(classify_line("cell 3 volt dev 12").unwrap(), Classification::Unrecognized);
        // "pack cell volt" falls through cell_volt; nothing else claims it
        assert_eq!(classify_line("pack 3 volt cell").unwrap(), Classification::Unrecognized);
    }

    #[test]
    fn test_mean_cell_voltage_shape() {
        let updates = matched("mean cell voltage 36500 over 8 cells 3650");
        assert_eq!(
            updates,
            vec![
                FieldUpdate::new("mean_cell_voltage", "3650"),
                FieldUpdate::new("pack_volt", "36500"),
            ]
        );
    }

    #[test]
    fn test_term_and_drain_shapes() {
        assert_eq!(matched("term volt 29000"), vec![FieldUpdate::new("term_volt", "29000")]);
        assert_eq!(matched("drain volt 28500"), vec![FieldUpdate::new("drain_volt", "28500")]);
    }

    #[test]
    fn test_current_shape() {
        assert_eq!(matched("pack current 1500"), vec![FieldUpdate::new("current", "1500")]);
    }

    #[test]
    fn test_current_yields_to_charging() {
        // "current" appears, but "Charging" routes the line to the charging shape
        let updates = matched("max current Charging Vbus=5000 limit Imax=2000");
        assert_eq!(
            updates,
            vec![
                FieldUpdate::new("Charging_Mode", "Charging"),
                FieldUpdate::new("max_current", "2000"),
                FieldUpdate::new("Vbus", "5000"),
            ]
        );
    }

    #[test]
    fn test_cell_soc_shape_key_from_tokens() {
        let updates = matched("soc 4 = 875");
        assert_eq!(updates, vec![FieldUpdate::new("soc4", "875")]);
    }

    #[test]
    fn test_cell_soc_excluded_by_zp() {
        assert_eq!(classify_line("soc 4 zp 875").unwrap(), Classification::Unrecognized);
    }

    #[test]
    fn test_total_soc_shape() {
        let updates = matched("total soc 875 of 36000 mAh remaining 300");
        assert_eq!(
            updates,
            vec![
                FieldUpdate::new("total_soc", "875"),
                FieldUpdate::new("time_remaining", "300"),
                FieldUpdate::new("capacity", "36000"),
            ]
        );
    }

    #[test]
    fn test_total_soc_excluded_by_volt() {
        // "total soc volt" matches neither cell_soc (total) nor total_soc (volt)
        assert_eq!(
            classify_line("total soc volt 875").unwrap(),
            Classification::Unrecognized
        );
    }

    #[test]
    fn test_deviation_shape() {
        let updates = matched("temp deviation is 5 with mean 25");
        assert_eq!(
            updates,
            vec![
                FieldUpdate::new("temperature_gradient", "5"),
                FieldUpdate::new("mean_temp", "25"),
            ]
        );
    }

    #[test]
    fn test_vsafe_shape() {
        let updates = matched("Vsafe limit=36500");
        assert_eq!(updates, vec![FieldUpdate::new("Vsafe", "36500")]);
    }

    #[test]
    fn test_vsafe_without_equals_is_empty() {
        let updates = matched("Vsafe 36500");
        assert_eq!(updates, vec![FieldUpdate::new("Vsafe", "")]);
    }

    #[test]
    fn test_charging_shape() {
        let updates = matched("mode Charging CC Vbus=5000 at Imax=2000");
        assert_eq!(
            updates,
            vec![
                FieldUpdate::new("Charging_Mode", "CC"),
                FieldUpdate::new("max_current", "2000"),
                FieldUpdate::new("Vbus", "5000"),
            ]
        );
    }

    #[test]
    fn test_adc_shape() {
        let updates = matched("adc 0 = 253");
        assert_eq!(updates, vec![FieldUpdate::new("adc0", "253")]);
    }

    #[test]
    fn test_dtc_shape() {
        let updates = matched("DTC P0A80,P0A1F");
        assert_eq!(updates, vec![FieldUpdate::new("Error_Codes", "P0A80,P0A1F")]);
    }

    #[test]
    fn test_unrecognized_line() {
        assert_eq!(classify_line("boot ok v1.2.3").unwrap(), Classification::Unrecognized);
        assert!(classify_line("boot ok").unwrap().updates().is_empty());
    }

    #[test]
    fn test_short_adc_line_is_extraction_error() {
        let err = classify_line("adc 0").unwrap_err();
        match err {
            MonitorError::Extraction { shape, index, token_count } => {
                assert_eq!(shape, "adc");
                assert_eq!(index, 3);
                assert_eq!(token_count, 2);
            }
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_cell_volt_line_is_extraction_error() {
        let err = classify_line("cell volt").unwrap_err();
        assert!(matches!(err, MonitorError::Extraction { shape: "cell_volt", .. }));
    }

    #[test]
    fn test_case_sensitivity() {
        // Predicates are case-sensitive: "Cell" is not "cell"
        assert_eq!(classify_line("Cell 3 Volt 41230").unwrap(), Classification::Unrecognized);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Tokenizing then re-joining with single spaces is stable on
            // well-formed ASCII input.
            #[test]
            fn tokenize_roundtrip(tokens in proptest::collection::vec("[A-Za-z0-9=,._-]{1,12}", 1..16)) {
                let line = tokens.join(" ");
                let split = tokenize(&line);
                prop_assert_eq!(split, tokens.iter().map(String::as_str).collect::<Vec<_>>());
            }

            // The classifier never panics, whatever the input line.
            #[test]
            fn classify_total(line in "[ -~]{0,80}") {
                let _ = classify_line(&line);
            }
        }
    }
}
