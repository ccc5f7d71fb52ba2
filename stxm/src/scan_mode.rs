use serde::{Deserialize, Serialize};

/// How an acquisition is processed, decided by its energy count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// One energy: display only.
    Single,
    /// Two energies: aligned pair and elemental map.
    Map,
    /// More than two energies: aligned stack and spectra.
    Stack,
    /// One line imaged over many energies; columns are energies.
    LineScan,
}

impl ScanMode {
    /// `is_line_scan` comes from the acquisition header and wins over the
    /// energy count.
    pub fn classify(energy_count: usize, is_line_scan: bool) -> Self {
        if is_line_scan {
            return ScanMode::LineScan;
        }
        match energy_count {
            0 | 1 => ScanMode::Single,
            2 => ScanMode::Map,
            _ => ScanMode::Stack,
        }
    }

    /// Whether frames of this mode are registered against a reference.
    pub fn needs_alignment(self) -> bool {
        matches!(self, ScanMode::Map | ScanMode::Stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(ScanMode::classify(1, false), ScanMode::Single);
        assert_eq!(ScanMode::classify(2, false), ScanMode::Map);
        assert_eq!(ScanMode::classify(3, false), ScanMode::Stack);
        assert_eq!(ScanMode::classify(120, false), ScanMode::Stack);
        assert_eq!(ScanMode::classify(120, true), ScanMode::LineScan);
    }

    #[test]
    fn test_needs_alignment() {
        assert!(ScanMode::Map.needs_alignment());
        assert!(ScanMode::Stack.needs_alignment());
        assert!(!ScanMode::Single.needs_alignment());
        assert!(!ScanMode::LineScan.needs_alignment());
    }
}
