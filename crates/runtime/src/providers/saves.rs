//! Saving throw services.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use status_core::{ActorId, DegreeOfSuccess, SaveType};

use crate::api::{SavingThrowService, ServiceError};

/// Always reports the same degree of success.
#[derive(Debug, Clone, Copy)]
pub struct FixedSavingThrow(pub DegreeOfSuccess);

#[async_trait]
impl SavingThrowService for FixedSavingThrow {
    async fn roll(
        &self,
        _actor: ActorId,
        _save: SaveType,
        _dc: u32,
    ) -> Result<DegreeOfSuccess, ServiceError> {
        Ok(self.0)
    }
}

/// Rolls a d20 plus the character's modifier against the DC.
///
/// Seeded so a scripted run can be replayed exactly.
pub struct D20SavingThrow {
    rng: Mutex<StdRng>,
    modifiers: HashMap<(ActorId, SaveType), i32>,
}

impl D20SavingThrow {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            modifiers: HashMap::new(),
        }
    }

    /// Sets the modifier added to `actor`'s `save` rolls (default 0).
    pub fn with_modifier(mut self, actor: ActorId, save: SaveType, modifier: i32) -> Self {
        self.modifiers.insert((actor, save), modifier);
        self
    }

    pub fn modifier(&self, actor: ActorId, save: SaveType) -> i32 {
        self.modifiers.get(&(actor, save)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SavingThrowService for D20SavingThrow {
    async fn roll(
        &self,
        actor: ActorId,
        save: SaveType,
        dc: u32,
    ) -> Result<DegreeOfSuccess, ServiceError> {
        let natural: u8 = {
            let mut rng = self.rng.lock().map_err(|_| ServiceError::LockPoisoned)?;
            rng.gen_range(1..=20)
        };
        let modifier = self.modifier(actor, save);
        let total = i32::from(natural).saturating_add(modifier);
        let dc = i32::try_from(dc).unwrap_or(i32::MAX);
        let degree = DegreeOfSuccess::from_check(total, dc, natural);

        tracing::debug!(
            %actor,
            %save,
            natural,
            modifier,
            total,
            dc,
            %degree,
            "rolled saving throw"
        );
        Ok(degree)
    }
}
