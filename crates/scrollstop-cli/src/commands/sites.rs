use clap::Subcommand;
use scrollstop_core::{Category, SiteLists};

#[derive(Subcommand)]
pub enum SitesAction {
    /// List sites in a category (or all)
    List {
        /// Category: blocked, news, or adult
        category: Option<String>,
    },
    /// Add a site to a category list
    Add {
        /// Category: blocked, news, or adult
        category: String,
        /// Hostname or URL fragment to match
        site: String,
    },
    /// Remove a site from a category list
    Remove {
        category: String,
        site: String,
    },
}

pub fn run(action: SitesAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store()?;

    match action {
        SitesAction::List { category } => {
            let lists = SiteLists::load(&store);
            match category {
                Some(name) => {
                    let category: Category = name.parse()?;
                    for site in lists.list(category) {
                        println!("{site}");
                    }
                }
                None => {
                    println!("{}", serde_json::to_string_pretty(&lists)?);
                }
            }
        }
        SitesAction::Add { category, site } => {
            let category: Category = category.parse()?;
            SiteLists::add(&store, category, &site)?;
            println!("added {site} to {}", category.as_str());
        }
        SitesAction::Remove { category, site } => {
            let category: Category = category.parse()?;
            SiteLists::remove(&store, category, &site)?;
            println!("removed {site} from {}", category.as_str());
        }
    }
    Ok(())
}
