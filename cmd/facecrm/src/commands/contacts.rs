//! Contact listing and maintenance commands.

use clap::{Args, Subcommand};
use facecrm_faceid::{ContactRepository, Interaction, NewInteraction};
use serde::Serialize;

use super::{ContactView, get_config, open_store, output, print_info, print_success};
use crate::Cli;

/// List, show and delete contacts.
#[derive(Args)]
pub struct ContactsCommand {
    #[command(subcommand)]
    command: ContactsSubcommand,
}

#[derive(Subcommand)]
enum ContactsSubcommand {
    /// List contacts
    #[command(alias = "ls")]
    List {
        /// Only contacts whose name, company or title contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one contact and its interactions
    Show {
        /// Contact ID
        id: String,
    },
    /// Delete a contact, its photo and its interactions
    #[command(alias = "rm")]
    Delete {
        /// Contact ID
        id: String,
    },
    /// Log a meeting with a contact
    Note {
        /// Contact ID
        id: String,
        /// What was discussed
        #[arg(long)]
        notes: String,
        /// Where it happened
        #[arg(long)]
        location: Option<String>,
    },
}

#[derive(Serialize)]
struct ContactDetail {
    #[serde(flatten)]
    contact: ContactView,
    interactions: Vec<Interaction>,
}

impl ContactsCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let repo = open_store(&cfg).await?;

        match &self.command {
            ContactsSubcommand::List { search } => {
                let contacts = match search {
                    Some(q) => repo.search(q).await?,
                    None => repo.list().await?,
                };
                if contacts.is_empty() {
                    print_info("No contacts found");
                    return Ok(());
                }
                let views: Vec<ContactView> = contacts.iter().map(ContactView::from).collect();
                output(cli).write(&views)
            }

            ContactsSubcommand::Show { id } => {
                let contact = repo
                    .get(id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("contact '{}' not found", id))?;
                let detail = ContactDetail {
                    contact: ContactView::from(&contact),
                    interactions: repo.interactions_for(id).await?,
                };
                output(cli).write(&detail)
            }

            ContactsSubcommand::Delete { id } => {
                if repo.get(id).await?.is_none() {
                    anyhow::bail!("contact '{}' not found", id);
                }
                repo.delete(id).await?;
                print_success(&format!("Contact {} deleted", id));
                Ok(())
            }

            ContactsSubcommand::Note { id, notes, location } => {
                let interaction = repo
                    .add_interaction(NewInteraction {
                        contact_id: id.clone(),
                        notes: notes.clone(),
                        location: location.clone(),
                    })
                    .await?;
                output(cli).write(&interaction)
            }
        }
    }
}
