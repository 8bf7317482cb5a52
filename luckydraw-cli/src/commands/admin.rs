use dialoguer::Confirm;
use luckydraw_core::{DrawError, Result, SessionController};

fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| DrawError::internal(e.to_string()))
}

pub async fn handle_reset(yes: bool, controller: &SessionController) -> Result<()> {
    if !confirm("Restock every prize and wipe the draw history?", yes)? {
        println!("Reset cancelled.");
        return Ok(());
    }

    controller.reset().await?.persisted().await?;
    println!(
        "All prizes restocked. {} units available.",
        controller.state().remaining_total()
    );
    Ok(())
}

pub async fn handle_restore_defaults(yes: bool, controller: &SessionController) -> Result<()> {
    if !confirm("Replace the pool with the default prizes?", yes)? {
        println!("Restore cancelled.");
        return Ok(());
    }

    controller.restore_defaults().await?.persisted().await?;
    println!(
        "Default prizes restored ({} prizes).",
        controller.list_prizes().len()
    );
    Ok(())
}

pub async fn handle_clear(yes: bool, controller: &SessionController) -> Result<()> {
    if !confirm(
        "Delete every prize and the draw history? This action cannot be undone.",
        yes,
    )? {
        println!("Clear cancelled.");
        return Ok(());
    }

    controller.clear().await?;
    println!("Lottery state cleared.");
    Ok(())
}
