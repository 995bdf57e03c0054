use clap::Subcommand;
use colored::Colorize;
use craftlist_lib::{
    Error, GraphListStore, List, ListId, ListRepository, ListStore, StoreError, UserId,
};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List an author's lists
    Ls {
        #[arg(short, long)]
        author: String,
    },
    /// Create a new list
    New {
        #[arg(short, long)]
        author: String,
        name: String,
        /// Make the list visible to everyone
        #[arg(long)]
        public: bool,
    },
    /// Show the items of a list
    Show { id: String },
    /// Add an item to a list
    AddItem { id: String, item: u32, amount: u32 },
    /// Remove a list
    Rm { id: String },
    /// Remove every list of an author
    Purge {
        #[arg(short, long)]
        author: String,
    },
}

pub async fn handle(store: &GraphListStore, cmd: &Command) -> Result<(), Error> {
    match cmd {
        Command::Ls { author } => {
            let lists: Vec<List> = store
                .find_by_author(&UserId::new(author.as_str())?)
                .await?
                .collect();
            if lists.is_empty() {
                println!("{}", "No lists".dimmed());
            }
            for list in lists {
                print_summary(&list);
            }
        }
        Command::New {
            author,
            name,
            public,
        } => {
            let mut list = List::new(name, UserId::new(author.as_str())?);
            list.public = *public;
            let list = store.add(list).await?;
            print_summary(&list);
        }
        Command::Show { id } => {
            let list = fetch(store, id).await?;
            print_summary(&list);
            for row in list.items() {
                let line = format!("  {:>8}  {}/{}", row.item_id, row.done, row.amount);
                if row.is_complete() {
                    println!("{}", line.green());
                } else {
                    println!("{line}");
                }
            }
        }
        Command::AddItem { id, item, amount } => {
            let mut list = fetch(store, id).await?;
            list.add_item(*item, *amount);
            store.update(&list).await?;
        }
        Command::Rm { id } => {
            store.remove(&ListId::new(id.as_str())?).await?;
        }
        Command::Purge { author } => {
            let author = UserId::new(author.as_str())?;
            if let Err(err) = store.delete_by_author(&author).await {
                if let StoreError::PartialDelete { remaining, .. } = &err {
                    for id in remaining {
                        eprintln!("{} {id}", "not removed:".yellow());
                    }
                }
                return Err(err.into());
            }
            println!("Removed all lists of {author}");
        }
    }

    Ok(())
}

async fn fetch(store: &GraphListStore, id: &str) -> Result<List, Error> {
    let id = ListId::new(id)?;
    store
        .get(&id)
        .await?
        .ok_or_else(|| StoreError::NotFound(id).into())
}

fn print_summary(list: &List) {
    let id = list.id().map(ListId::as_str).unwrap_or("-");
    let visibility = if list.public { " (public)" } else { "" };
    println!(
        "{}  {}{}  {} item(s), created {}",
        id.bold(),
        list.name,
        visibility.cyan(),
        list.items().len(),
        list.created_at().format("%Y-%m-%d %H:%M")
    );
}
