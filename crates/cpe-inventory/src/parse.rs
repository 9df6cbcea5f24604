//! Field extraction from device command output.
//!
//! Only labeled substrings are located; no command grammar is parsed.

use cpe_core::MODEL_NOT_FOUND;

/// Hostname from `show running-config | include hostname`.
///
/// Takes the last token of the first line starting with `hostname`.
pub fn hostname(output: &str) -> Option<String> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("hostname"))?;
    line.split_whitespace().skip(1).last().map(str::to_string)
}

/// Serial number from `show inventory | include SN:`.
///
/// Takes the last token of the first line carrying an `SN:` label. The
/// chassis entry comes first, so module serials never stand in for it.
pub fn serial_number(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("SN:"))
        .and_then(|line| {
            let value = line.rsplit("SN:").next().unwrap_or_default();
            last_token(value)
        })
}

/// Model number from full `show inventory` output.
///
/// Uses the value of the first `PID:` label, up to the next comma.
pub fn model_number(output: &str) -> String {
    output
        .lines()
        .find_map(|line| line.split_once("PID:"))
        .map(|(_, rest)| rest.split(',').next().unwrap_or_default().trim())
        .filter(|pid| !pid.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| MODEL_NOT_FOUND.to_string())
}

/// Interface summary from `show ip interface brief | exclude unassigned`.
pub fn interface_summary(output: &str) -> String {
    output.trim().to_string()
}

fn last_token(s: &str) -> Option<String> {
    s.split_whitespace().last().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "\
NAME: \"Chassis\", DESCR: \"Cisco ISR4331 Chassis\"
PID: ISR4331/K9        , VID: V04  , SN: FDO21120K4L

NAME: \"Power Supply Module 0\", DESCR: \"250W AC Power Supply for Cisco ISR 4330\"
PID: PWR-4330-AC       , VID: V02  , SN: PST2111N3ZM
";

    #[test]
    fn test_hostname() {
        assert_eq!(hostname("hostname branch-rtr-01\n"), Some("branch-rtr-01".to_string()));
        assert_eq!(
            hostname("Building configuration...\n hostname edge\n"),
            Some("edge".to_string())
        );
        assert_eq!(hostname(""), None);
        assert_eq!(hostname("hostname\n"), None);
        assert_eq!(hostname("% Invalid input detected\n"), None);
    }

    #[test]
    fn test_serial_number_takes_first_sn_label() {
        let filtered = "PID: ISR4331/K9        , VID: V04  , SN: FDO21120K4L\n\
                        PID: PWR-4330-AC       , VID: V02  , SN: PST2111N3ZM\n";
        assert_eq!(serial_number(filtered), Some("FDO21120K4L".to_string()));
        assert_eq!(serial_number("SN:\n"), None);
        assert_eq!(serial_number(""), None);
    }

    #[test]
    fn test_model_number() {
        assert_eq!(model_number(INVENTORY), "ISR4331/K9");
        assert_eq!(model_number("NAME: \"Chassis\"\n"), MODEL_NOT_FOUND);
        assert_eq!(model_number("PID: , VID: V01\n"), MODEL_NOT_FOUND);
    }

    #[test]
    fn test_interface_summary_trims() {
        let out = "\nInterface   IP-Address  OK? Method Status Protocol\nGi0/0/0  10.0.0.1  YES NVRAM  up  up\n\n";
        assert!(interface_summary(out).starts_with("Interface"));
        assert!(interface_summary(out).ends_with("up  up"));
    }
}
