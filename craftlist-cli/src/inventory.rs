use std::path::PathBuf;

use clap::Subcommand;
use craftlist_lib::{
    Error,
    optimizer::{Duplicates, UserInventory, optimize},
};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Suggest ways to free up inventory space
    Optimize { path: PathBuf },
}

pub fn handle(cmd: &Command) -> Result<(), Error> {
    match cmd {
        Command::Optimize { path } => {
            let inventory = UserInventory::load(path)?;
            let found = optimize(&[&Duplicates], &inventory);

            if found.is_empty() {
                println!("Nothing to optimize");
            }
            for optimization in found {
                println!(
                    "[{}] item {} x{} in {}: also in {}",
                    optimization.optimizer,
                    optimization.item.item_id,
                    optimization.item.quantity,
                    optimization.item.location_name(),
                    optimization.containers.join(", ")
                );
            }
        }
    }

    Ok(())
}
