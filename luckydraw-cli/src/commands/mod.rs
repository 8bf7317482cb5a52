pub mod admin;
pub mod draw;
pub mod prize;

pub use admin::{handle_clear, handle_reset, handle_restore_defaults};
pub use draw::{handle_draw, handle_history, handle_status, handle_watch};
pub use prize::{handle_prize_command, PrizeCommands};

use luckydraw_core::Prize;

pub(crate) fn describe(prize: &Prize) -> String {
    match &prize.description {
        Some(description) => format!("{} ({})", prize.name, description),
        None => prize.name.clone(),
    }
}
