//! Test data builders for telemetry lines
//!
//! Each builder emits a line whose tokens put the interesting values at
//! the positions the classifier extracts from.

/// `cell <n> volt <raw>` -> `volt<n> = <raw>`
pub fn cell_volt_line(cell: u32, raw: &str) -> String {
    format!("cell {} volt {}", cell, raw)
}

/// `soc <n> = <raw>` -> `soc<n> = <raw>`
pub fn cell_soc_line(cell: u32, raw: &str) -> String {
    format!("soc {} = {}", cell, raw)
}

/// `total soc <soc> of <capacity> mAh remaining <time>` ->
/// `total_soc`, `capacity`, `time_remaining`
pub fn total_soc_line(soc: &str, capacity: &str, time_remaining: &str) -> String {
    format!("total soc {} of {} mAh remaining {}", soc, capacity, time_remaining)
}

/// `adc <n> = <raw>` -> `adc<n> = <raw>`
pub fn adc_line(channel: u32, raw: &str) -> String {
    format!("adc {} = {}", channel, raw)
}

/// `DTC <codes>` -> `Error_Codes = <codes>`
pub fn dtc_line(codes: &str) -> String {
    format!("DTC {}", codes)
}

/// `mean cell voltage <pack> over 8 cells <mean>` ->
/// `pack_volt`, `mean_cell_voltage`
pub fn mean_voltage_line(pack: &str, mean: &str) -> String {
    format!("mean cell voltage {} over 8 cells {}", pack, mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmsmon_rs::{classify_line, Classification, FieldUpdate};

    #[test]
    fn test_builders_hit_documented_indices() {
        let updates = match classify_line(&cell_volt_line(3, "41230")).unwrap() {
            Classification::Matched(updates) => updates,
            Classification::Unrecognized => panic!("builder line unrecognized"),
        };
        assert_eq!(updates, vec![FieldUpdate::new("volt3", "41230")]);

        let updates = match classify_line(&total_soc_line("875", "36000", "300")).unwrap() {
            Classification::Matched(updates) => updates,
            Classification::Unrecognized => panic!("builder line unrecognized"),
        };
        assert_eq!(
            updates,
            vec![
                FieldUpdate::new("total_soc", "875"),
                FieldUpdate::new("time_remaining", "300"),
                FieldUpdate::new("capacity", "36000"),
            ]
        );
    }
}
