use crate::error::{DrawError, Result};
use crate::types::Prize;
use rand::Rng;

/// Weighted draw over the prizes it is handed. Holds no state of its own.
pub struct DrawEngine<'a> {
    prizes: &'a mut [Prize],
}

impl<'a> DrawEngine<'a> {
    pub fn new(prizes: &'a mut [Prize]) -> Self {
        Self { prizes }
    }

    pub fn draw(&mut self) -> Option<Prize> {
        self.draw_with(&mut rand::rng())
    }

    /// Pick one available prize with probability proportional to its
    /// remaining count and decrement it. `None` when nothing is left.
    pub fn draw_with<R: Rng>(&mut self, rng: &mut R) -> Option<Prize> {
        let total_weight: u64 = self
            .prizes
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.remaining_count as u64)
            .sum();

        if total_weight == 0 {
            return None;
        }

        let r = rng.random_range(0.0..total_weight as f64);
        let index = select_weighted(self.prizes, r)?;

        let prize = &mut self.prizes[index];
        prize.remaining_count -= 1;
        Some(prize.clone())
    }

    pub fn has_available(&self) -> bool {
        self.prizes.iter().any(|p| p.is_available())
    }

    /// Take one unit of a prize outside the weighted draw.
    pub fn decrement(&mut self, id: &str) -> Result<Prize> {
        let prize = self
            .prizes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DrawError::not_found(id))?;

        if prize.remaining_count == 0 {
            return Err(DrawError::Depleted {
                id: prize.id.clone(),
                name: prize.name.clone(),
            });
        }

        prize.remaining_count -= 1;
        Ok(prize.clone())
    }

    pub fn reset_all(&mut self) {
        for prize in self.prizes.iter_mut() {
            prize.remaining_count = prize.total_count;
        }
    }
}

/// Index of the first available prize whose cumulative weight exceeds `r`.
/// Falls back to the last available prize if rounding leaves `r` uncovered.
fn select_weighted(prizes: &[Prize], r: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    let mut last = None;

    for (index, prize) in prizes.iter().enumerate() {
        if !prize.is_available() {
            continue;
        }
        cumulative += prize.remaining_count as f64;
        if r < cumulative {
            return Some(index);
        }
        last = Some(index);
    }

    last
}
