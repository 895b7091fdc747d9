use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::books::picker;
use shelf_app::AppContext;
use shelf_db::{Book, CatalogStore, Select};
use shelf_kernel::{settings::Settings, ModuleRegistry};

/// Operator commands for the shelf catalog.
#[derive(Parser, Debug)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the catalog with the current ranking feed.
    Sync,
    /// Read the catalog.
    Books {
        #[command(subcommand)]
        action: BooksAction,
    },
    /// Print the SQL migrations collected from every module, in order.
    Migrations,
}

#[derive(Subcommand, Debug)]
enum BooksAction {
    /// Every book, best ranked first.
    List {
        /// Emit JSON instead of one line per book.
        #[arg(long)]
        json: bool,
    },
    /// A random handful, as served to readers.
    Pick {
        #[arg(long, default_value_t = picker::PICK_COUNT)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    let app = AppContext::from_settings(&settings)?;

    match cli.command {
        Command::Sync => {
            let report = app.catalog_sync().run().await?;
            tracing::info!(
                purged = report.purged,
                inserted = report.inserted,
                "sync finished"
            );
            println!("{}", report.message());
        }
        Command::Books { action } => match action {
            BooksAction::List { json } => {
                let books = app.store.select(&Select::all().by_ranking()).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&books)?);
                } else {
                    books.iter().for_each(print_book);
                }
            }
            BooksAction::Pick { count } => {
                let books = app.store.select(&Select::all()).await?;
                let picks = picker::pick(&books, count, &mut rand::thread_rng());
                picks.iter().for_each(print_book);
            }
        },
        Command::Migrations => {
            let mut registry = ModuleRegistry::new();
            shelf_app::modules::register_all(&mut registry, &app)?;
            for (module, migration) in registry.collect_migrations() {
                println!("-- {}/{}", module, migration.id);
                println!("{}", migration.up.trim());
            }
        }
    }

    Ok(())
}

fn print_book(book: &Book) {
    println!(
        "{:>3}  {}  {} / {}",
        book.ranking, book.id, book.title, book.author
    );
}
