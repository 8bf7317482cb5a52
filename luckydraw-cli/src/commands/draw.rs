use super::describe;
use chrono::{Local, TimeZone};
use comfy_table::{presets::UTF8_FULL, Table};
use luckydraw_core::{DrawError, LotteryAggregate, Result, SessionController};

pub async fn handle_draw(times: u32, controller: &SessionController) -> Result<()> {
    for round in 1..=times {
        match controller.draw().await?.persisted().await? {
            Some(prize) => {
                println!("Draw #{}: {}", round, describe(&prize));
            }
            None => {
                println!("No prizes left to draw.");
                break;
            }
        }
    }

    let state = controller.state();
    println!();
    println!("Total drawn: {}", state.total_drawn);
    println!("Remaining: {}", state.remaining_total());
    Ok(())
}

pub fn handle_status(controller: &SessionController) -> Result<()> {
    print_status(&controller.state());
    Ok(())
}

pub fn handle_history(limit: Option<usize>, controller: &SessionController) -> Result<()> {
    let history = controller.history();
    if history.is_empty() {
        println!("No draws yet.");
        return Ok(());
    }

    let skip = limit.map_or(0, |limit| history.len().saturating_sub(limit));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Time", "Prize", "Left after draw"]);

    for (index, entry) in history.iter().enumerate().skip(skip) {
        let left = entry
            .remaining_inventory
            .get(&entry.prize_name)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            (index + 1).to_string(),
            format_timestamp(entry.timestamp),
            entry.prize_name.clone(),
            left,
        ]);
    }

    println!("{}", table);
    Ok(())
}

/// Print every state change until Ctrl-C.
pub async fn handle_watch(controller: &SessionController) -> Result<()> {
    let mut updates = controller.watch();
    print_status(&updates.borrow_and_update());
    println!();
    println!("Watching for changes. Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Err(DrawError::internal("Session stopped while watching"));
                }
                let state = updates.borrow_and_update().clone();
                if state.is_drawing {
                    println!("Drawing...");
                    continue;
                }
                println!();
                print_status(&state);
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    Ok(())
}

fn print_status(state: &LotteryAggregate) {
    match &state.current_result {
        Some(prize) => println!("Current result: {}", describe(prize)),
        None => println!("Current result: -"),
    }
    println!("Total drawn: {}", state.total_drawn);
    println!(
        "Remaining: {} across {} prizes",
        state.remaining_total(),
        state.prizes.iter().filter(|p| p.is_available()).count()
    );
}

fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}
