use crate::classify::Classification;

/// Whether an explicit transaction is believed to be open.
///
/// Tracked from statement text alone. The engine is never asked, so a
/// statement that failed still moves the state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    Idle,
    InTransaction,
}

impl TransactionState {
    /// State after a statement with the given classification. Ending wins
    /// over beginning when a statement carries both.
    pub fn next(self, class: Classification) -> Self {
        if class.ends {
            Self::Idle
        } else if class.begins {
            Self::InTransaction
        } else {
            self
        }
    }

    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}
