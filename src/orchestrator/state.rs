//! Per-indicator classification state machine. Transitions are forward-only;
//! `Completed` and `Failed` are terminal.

use serde::{Deserialize, Serialize};

use crate::domain::{IndicatorOpsError, Result, StageName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorState {
    New,
    Normalizing,
    Timing,
    Family,
    Type,
    Review,
    Final,
    Completed,
    Failed,
}

impl IndicatorState {
    pub fn for_stage(stage: StageName) -> Self {
        match stage {
            StageName::Normalization => IndicatorState::Normalizing,
            StageName::Time => IndicatorState::Timing,
            StageName::Family => IndicatorState::Family,
            StageName::Type => IndicatorState::Type,
            StageName::Review => IndicatorState::Review,
            StageName::Final => IndicatorState::Final,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            IndicatorState::New => 0,
            IndicatorState::Normalizing => 1,
            IndicatorState::Timing => 2,
            IndicatorState::Family => 3,
            IndicatorState::Type => 4,
            IndicatorState::Review => 5,
            IndicatorState::Final => 6,
            IndicatorState::Completed => 7,
            IndicatorState::Failed => 8,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IndicatorState::Completed | IndicatorState::Failed)
    }

    pub fn can_advance_to(&self, next: IndicatorState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            IndicatorState::Failed => true,
            // Final review is conditional: completion is legal from Review too
            IndicatorState::Completed => {
                matches!(self, IndicatorState::Review | IndicatorState::Final)
            }
            _ => next.rank() == self.rank() + 1,
        }
    }

    pub fn advance(&mut self, next: IndicatorState) -> Result<()> {
        if !self.can_advance_to(next) {
            return Err(IndicatorOpsError::internal(format!(
                "illegal state transition {self:?} -> {next:?}"
            )));
        }
        *self = next;
        Ok(())
    }
}
