use serde::{Deserialize, Serialize};

/// Resolved requests classified by whether any other cache held a valid
/// copy at the time of resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accesses {
    pub private: u64,
    pub shared: u64,
}

impl Accesses {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.private + self.shared
    }

    #[must_use]
    pub fn private_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.private as f64 / self.total() as f64
    }

    #[must_use]
    pub fn shared_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.shared as f64 / self.total() as f64
    }
}
