use crate::error::{DrawError, Result};
use crate::prize::{
    generate_prize_id, normalize_description, validate_id, validate_name,
    validate_remaining_count, validate_total_count,
};
use crate::types::Prize;

/// CRUD over an ordered prize sequence, usually a working copy of the aggregate.
pub struct PrizeRegistry<'a> {
    prizes: &'a mut Vec<Prize>,
}

impl<'a> PrizeRegistry<'a> {
    pub fn new(prizes: &'a mut Vec<Prize>) -> Self {
        Self { prizes }
    }

    /// Validate and append a new prize. Checks run name, then count, so the
    /// first broken rule is the one reported.
    pub fn add(&mut self, name: &str, count: f64, description: Option<&str>) -> Result<Prize> {
        let name = validate_name(name)?;
        let count = validate_total_count(count)?;
        let description = normalize_description(description);

        let prize = Prize::new(generate_prize_id(), name, count, description);
        self.prizes.push(prize.clone());

        tracing::debug!("Registered prize '{}' x{} as {}", prize.name, count, prize.id);
        Ok(prize)
    }

    /// Set the remaining count of an existing prize. The total is immutable and
    /// the new value is not clamped to it.
    pub fn update(&mut self, id: &str, new_remaining: f64) -> Result<Prize> {
        validate_id(id)?;

        let prize = self
            .prizes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DrawError::not_found(id))?;

        let new_remaining = validate_remaining_count(new_remaining)?;
        if new_remaining > prize.total_count {
            tracing::warn!(
                "Prize '{}' restocked above its total ({} > {})",
                prize.name,
                new_remaining,
                prize.total_count
            );
        }
        prize.remaining_count = new_remaining;

        Ok(prize.clone())
    }

    pub fn remove(&mut self, id: &str) -> Result<Prize> {
        validate_id(id)?;

        let index = self
            .prizes
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| DrawError::not_found(id))?;

        Ok(self.prizes.remove(index))
    }

    pub fn list(&self) -> Vec<Prize> {
        self.prizes.clone()
    }

    pub fn list_available(&self) -> Vec<Prize> {
        self.prizes
            .iter()
            .filter(|p| p.is_available())
            .cloned()
            .collect()
    }
}
