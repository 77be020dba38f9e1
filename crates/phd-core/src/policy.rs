use std::str::FromStr;

use phd_domain::SubmissionStatus;

use crate::errors::StoreFault;

/// Chequeo de transiciones de estado de un envío.
///
/// - `Lenient`: no se consulta el estado previo (un envío aprobado puede
///   re-aprobarse o borrarse dos veces). Comportamiento histórico.
/// - `Strict`: sólo se aceptan las transiciones de
///   `SubmissionStatus::can_transition_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Lenient,
    Strict,
}

impl TransitionPolicy {
    pub fn check(&self, from: SubmissionStatus, to: SubmissionStatus) -> Result<(), StoreFault> {
        match self {
            Self::Lenient => Ok(()),
            Self::Strict if from.can_transition_to(to) => Ok(()),
            Self::Strict => Err(StoreFault::IllegalTransition { from, to }),
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown transition policy '{other}' (expected 'lenient' or 'strict')")),
        }
    }
}
