use super::describe;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use luckydraw_core::prize::parse_count;
use luckydraw_core::{DrawError, Result, SessionController};

#[derive(Subcommand)]
pub enum PrizeCommands {
    /// Add a prize to the pool
    Add {
        /// Prize name (up to 50 characters)
        name: String,
        /// Number of units in stock
        count: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },

    /// Set the remaining count of a prize
    Update {
        /// Prize ID
        id: String,
        /// New remaining count
        count: String,
    },

    /// Remove a prize from the pool
    Remove {
        /// Prize ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Hand out one unit of a specific prize without drawing
    Decrement {
        /// Prize ID
        id: String,
    },

    /// List prizes
    List {
        /// Only show prizes with stock left
        #[arg(short, long)]
        available: bool,
    },
}

pub async fn handle_prize_command(cmd: PrizeCommands, controller: &SessionController) -> Result<()> {
    match cmd {
        PrizeCommands::Add {
            name,
            count,
            description,
        } => {
            let count = parse_count(&count)?;
            let prize = controller
                .add_prize(&name, count, description.as_deref())
                .await?
                .persisted()
                .await?;

            println!("Prize added.");
            println!("  ID: {}", prize.id);
            println!("  Name: {}", describe(&prize));
            println!("  Stock: {}", prize.total_count);
        }

        PrizeCommands::Update { id, count } => {
            let count = parse_count(&count)?;
            let prize = controller.update_prize(&id, count).await?.persisted().await?;

            println!(
                "'{}' now has {} of {} left.",
                prize.name, prize.remaining_count, prize.total_count
            );
        }

        PrizeCommands::Remove { id, yes } => {
            let name = controller
                .state()
                .find_prize(&id)
                .map(|p| p.name.clone())
                .ok_or_else(|| DrawError::not_found(&id))?;

            if !yes {
                let confirm = Confirm::new()
                    .with_prompt(format!("Remove prize '{}' from the pool?", name))
                    .default(false)
                    .interact()
                    .map_err(|e| DrawError::internal(e.to_string()))?;

                if !confirm {
                    println!("Removal cancelled.");
                    return Ok(());
                }
            }

            let prize = controller.remove_prize(&id).await?.persisted().await?;
            println!("Prize '{}' removed.", prize.name);
        }

        PrizeCommands::Decrement { id } => {
            let prize = controller.decrement_prize(&id).await?.persisted().await?;
            println!(
                "Handed out one '{}'. {} left.",
                prize.name, prize.remaining_count
            );
        }

        PrizeCommands::List { available } => {
            let prizes = if available {
                controller.available_prizes()
            } else {
                controller.list_prizes()
            };

            if prizes.is_empty() {
                println!("No prizes found.");
                println!("Add one with: luckydraw prize add <name> <count>");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["ID", "Name", "Remaining", "Total", "Description"]);

            for prize in &prizes {
                table.add_row(vec![
                    prize.id.clone(),
                    prize.name.clone(),
                    prize.remaining_count.to_string(),
                    prize.total_count.to_string(),
                    prize.description.clone().unwrap_or_default(),
                ]);
            }

            println!("{}", table);
        }
    }

    Ok(())
}
