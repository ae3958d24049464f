use serde::{Deserialize, Serialize};

/// Whole-run totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sim {
    /// Value of the global cycle counter when the last core completed.
    pub cycles: u64,
}
