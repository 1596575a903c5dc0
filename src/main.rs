//! Inbox sync CLI
//!
//! Drives the inbox engine against a marketplace backend: watch the inbox,
//! list threads, read a thread, reply, or delete a conversation.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use inbox_sync::config::Config;
use inbox_sync::grouper::Conversation;
use inbox_sync::messages::ListingId;
use inbox_sync::notify::{ChannelNotifier, Notification};
use inbox_sync::scheduler::CycleOutcome;
use inbox_sync::store::{SortOrder, ThreadSummary};
use inbox_sync::InboxEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Inbox sync - marketplace conversations from the terminal
#[derive(Parser)]
#[command(name = "inbox-sync")]
#[command(about = "Sync and act on a marketplace message inbox")]
struct Cli {
    /// API root (overrides INBOX_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token (overrides INBOX_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Your sender identity (overrides INBOX_IDENTITY)
    #[arg(long, global = true)]
    identity: Option<String>,

    /// Poll interval in seconds (overrides INBOX_POLL_INTERVAL_SECS)
    #[arg(long, global = true)]
    interval_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the inbox until interrupted
    Watch,

    /// List conversations
    Threads {
        /// Oldest activity first
        #[arg(long)]
        oldest: bool,
    },

    /// Show a conversation and mark it read
    Show {
        /// Listing ID of the conversation
        listing: ListingId,
    },

    /// Reply to a conversation
    Reply {
        /// Listing ID of the conversation
        listing: ListingId,

        /// Reply text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete a whole conversation
    Delete {
        /// Listing ID of the conversation
        listing: ListingId,
    },
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(identity) = &self.identity {
            config.identity = identity.clone();
        }
        if let Some(secs) = self.interval_secs {
            config.poll_interval = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = cli.config().context("invalid configuration")?;
    let (notifier, mut notices) = ChannelNotifier::new();
    let engine = InboxEngine::from_config(&config, Arc::new(notifier))?;

    let result = match cli.command {
        Commands::Watch => cmd_watch(&engine, &mut notices).await,
        Commands::Threads { oldest } => {
            let order = if oldest {
                SortOrder::Oldest
            } else {
                SortOrder::Newest
            };
            cmd_threads(&engine, order).await
        }
        Commands::Show { listing } => cmd_show(&engine, listing).await,
        Commands::Reply { listing, text } => cmd_reply(&engine, listing, &text.join(" ")).await,
        Commands::Delete { listing } => cmd_delete(&engine, listing).await,
    };

    print_notices(&mut notices);
    result
}

// ============================================================================
// Commands
// ============================================================================

async fn sync(engine: &InboxEngine) -> anyhow::Result<()> {
    match engine.sync_now().await {
        CycleOutcome::Failed(reason) => bail!("could not load inbox: {}", reason),
        _ => Ok(()),
    }
}

async fn cmd_watch(
    engine: &InboxEngine,
    notices: &mut mpsc::UnboundedReceiver<Notification>,
) -> anyhow::Result<()> {
    let (stop, shutdown) = watch::channel(false);
    let mut revisions = engine.store().subscribe();
    let poller = engine.spawn_polling(shutdown);

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                print_threads(&engine.store().threads(SortOrder::Newest));
            }
            Some(notice) = notices.recv() => {
                println!("{}", notice);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    let _ = stop.send(true);
    poller.await.context("poll loop panicked")?;
    Ok(())
}

async fn cmd_threads(engine: &InboxEngine, order: SortOrder) -> anyhow::Result<()> {
    sync(engine).await?;
    print_threads(&engine.store().threads(order));
    Ok(())
}

async fn cmd_show(engine: &InboxEngine, listing: ListingId) -> anyhow::Result<()> {
    sync(engine).await?;
    let read = engine.select_thread(listing).await?;

    if let Some(conversation) = engine.store().conversation(listing) {
        print_conversation(&conversation);
    }
    if !read.marked.is_empty() {
        let status = if read.confirmed { "" } else { " (not confirmed by server)" };
        println!("\nMarked {} message(s) read{}", read.marked.len(), status);
    }
    Ok(())
}

async fn cmd_reply(engine: &InboxEngine, listing: ListingId, text: &str) -> anyhow::Result<()> {
    sync(engine).await?;
    engine.select_thread(listing).await?;
    engine.type_draft(text);

    let sent = engine.send_reply().await?;
    println!("Reply sent (anchored on message {})", sent.anchor);
    Ok(())
}

async fn cmd_delete(engine: &InboxEngine, listing: ListingId) -> anyhow::Result<()> {
    sync(engine).await?;
    engine.delete_conversation(listing).await?;
    println!("Conversation {} deleted", listing);
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn format_thread(thread: &ThreadSummary) -> String {
    let badge = if thread.unread > 0 {
        format!(" ({} unread)", thread.unread)
    } else {
        String::new()
    };
    let who = if thread.preview_is_own { "You: " } else { "" };
    format!(
        "[{}] {:>6}  {}{}\n         {}{}",
        thread.avatar_initial.unwrap_or('?'),
        thread.listing_id,
        thread.title,
        badge,
        who,
        thread.preview
    )
}

fn print_threads(threads: &[ThreadSummary]) {
    if threads.is_empty() {
        println!("No conversations");
        return;
    }
    for thread in threads {
        println!("{}", format_thread(thread));
    }
}

fn print_conversation(conversation: &Conversation) {
    println!("{} (listing {})", conversation.title, conversation.listing_id);
    for message in conversation.sorted_messages() {
        let who = if message.is_own {
            "You"
        } else {
            message.sender_identity.as_str()
        };
        println!(
            "  {}  {}: {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            who,
            message.body
        );
    }
}

fn print_notices(notices: &mut mpsc::UnboundedReceiver<Notification>) {
    while let Ok(notice) = notices.try_recv() {
        println!("{}", notice);
    }
}
