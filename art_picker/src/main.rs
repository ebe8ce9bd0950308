//! MTG Art Picker - command line front end
//!
//! Creates projects from decklists, lets the user browse and pick printings
//! card by card, and exports the chosen artwork.

use art_picker::config::SCRYFALL_API_BASE;
use art_picker::console;
use art_picker::models::{FrameYear, Stamp};
use art_picker::{
    BorderFilter, CancelFlag, CardIdentity, ExportOutcome, FilterConfiguration,
    MissingSelectionPolicy, ProjectSession, RecentProjects, ScryfallCatalog, SelectOutcome,
    Settings,
};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;
type Session = ProjectSession<ScryfallCatalog>;

/// Pick card art printings for a decklist and export the images
#[derive(Parser, Debug)]
#[command(name = "art_picker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scryfall API base URL
    #[arg(long, global = true, default_value = SCRYFALL_API_BASE)]
    api_base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a project from a decklist file and fetch printings
    New {
        /// Project directory to create
        dir: PathBuf,
        /// Decklist text file
        #[arg(short, long)]
        deck: PathBuf,
        /// Do not contact Scryfall yet
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
    /// Show every card with its selection
    Status { dir: PathBuf },
    /// Show or change the global printing filters
    Filters {
        dir: PathBuf,
        #[command(flatten)]
        changes: FilterArgs,
    },
    /// List the candidate printings of a card (default: the active card)
    Browse {
        dir: PathBuf,
        /// Card number as shown by `status`
        #[arg(long)]
        card: Option<usize>,
    },
    /// Select a printing for a card
    Pick {
        dir: PathBuf,
        #[arg(long)]
        card: usize,
        /// Printing number as shown by `browse`
        #[arg(long)]
        printing: usize,
    },
    /// Browse and pick interactively, with undo, until `q`
    Session { dir: PathBuf },
    /// Remove a card's selection
    Clear {
        dir: PathBuf,
        #[arg(long)]
        card: usize,
    },
    /// Toggle ignoring the global filters for one card
    AllPrints {
        dir: PathBuf,
        #[arg(long)]
        card: usize,
    },
    /// Re-fetch a card's printings from Scryfall
    Refresh {
        dir: PathBuf,
        #[arg(long)]
        card: usize,
    },
    /// Write the selected images to a folder
    Export {
        dir: PathBuf,
        /// Output folder (default: <dir>/export)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Export nothing if any card is unselected
        #[arg(long, default_value_t = false)]
        abort_on_missing: bool,
        /// One file per requested copy
        #[arg(long, default_value_t = false)]
        per_copy: bool,
        /// Concurrent downloads (default: 4)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// List recently opened projects
    Recent,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// any, borderless, black, white or silver
    #[arg(long, value_parser = parse_border)]
    border: Option<BorderFilter>,
    /// 1993, 1997, 2003, 2015, future or any
    #[arg(long)]
    frame: Option<String>,
    /// Required frame effect (repeatable)
    #[arg(long = "effect")]
    effects: Vec<String>,
    /// Drop all required frame effects
    #[arg(long, default_value_t = false)]
    clear_effects: bool,
    #[arg(long)]
    prefer_borderless: Option<bool>,
    #[arg(long)]
    full_art_only: Option<bool>,
    #[arg(long)]
    hi_res_only: Option<bool>,
    #[arg(long)]
    default_only: Option<bool>,
    #[arg(long)]
    atypical_only: Option<bool>,
    #[arg(long)]
    exclude_universes_beyond: Option<bool>,
    /// oval, acorn, triangle, arena, circle, heart or any
    #[arg(long)]
    stamp: Option<String>,
    /// Start from the default filters
    #[arg(long, default_value_t = false)]
    reset: bool,
}

fn parse_border(s: &str) -> Result<BorderFilter, String> {
    BorderFilter::parse(s).ok_or_else(|| format!("unknown border '{}'", s))
}

impl FilterArgs {
    fn is_empty(&self) -> bool {
        self.border.is_none()
            && self.frame.is_none()
            && self.effects.is_empty()
            && !self.clear_effects
            && self.prefer_borderless.is_none()
            && self.full_art_only.is_none()
            && self.hi_res_only.is_none()
            && self.default_only.is_none()
            && self.atypical_only.is_none()
            && self.exclude_universes_beyond.is_none()
            && self.stamp.is_none()
            && !self.reset
    }

    fn apply(&self, current: &FilterConfiguration) -> CliResult<FilterConfiguration> {
        let mut config = if self.reset {
            FilterConfiguration::default()
        } else {
            current.clone()
        };
        if let Some(border) = self.border {
            config.border = border;
        }
        if let Some(frame) = &self.frame {
            config.frame_year = match frame.as_str() {
                "any" => None,
                other => Some(
                    FrameYear::parse(other).ok_or_else(|| format!("unknown frame '{}'", other))?,
                ),
            };
        }
        if self.clear_effects {
            config.frame_effects.clear();
        }
        config
            .frame_effects
            .extend(self.effects.iter().map(|e| e.to_lowercase()));
        if let Some(stamp) = &self.stamp {
            config.stamp = match stamp.as_str() {
                "any" => None,
                other => {
                    Some(Stamp::parse(other).ok_or_else(|| format!("unknown stamp '{}'", other))?)
                }
            };
        }
        let flags = [
            (self.prefer_borderless, &mut config.prefer_borderless),
            (self.full_art_only, &mut config.full_art_only),
            (self.hi_res_only, &mut config.hi_res_only),
            (self.default_only, &mut config.default_only),
            (self.atypical_only, &mut config.atypical_only),
            (self.exclude_universes_beyond, &mut config.exclude_universes_beyond),
        ];
        for (value, field) in flags {
            if let Some(value) = value {
                *field = value;
            }
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings {
        api_base_url: args.api_base_url.clone(),
        ..Settings::default()
    };

    if let Err(e) = run(args.command, settings).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, settings: Settings) -> CliResult<()> {
    match command {
        Command::New {
            dir,
            deck,
            offline,
        } => {
            let bytes = std::fs::read(&deck)?;
            let text = String::from_utf8_lossy(&bytes);
            let catalog = ScryfallCatalog::new(&settings)?;
            let (mut session, warnings) = Session::create(&dir, &text, catalog, settings)?;
            for warning in &warnings {
                println!("warning: {}", warning);
            }
            if !offline {
                for item in session.warm_cache().await? {
                    if let Err(e) = item.result {
                        println!("could not fetch {}: {}", item.card_name, e);
                    }
                }
            }
            remember(&dir);
            console::write_status(&mut io::stdout(), &session)?;
        }
        Command::Status { dir } => {
            let session = open(&dir, settings)?;
            console::write_status(&mut io::stdout(), &session)?;
        }
        Command::Filters { dir, changes } => {
            let mut session = open(&dir, settings)?;
            if !changes.is_empty() {
                let filters = changes.apply(session.selector().filters())?;
                session.set_filters(filters)?;
            }
            println!("{}", serde_json::to_string_pretty(session.selector().filters())?);
        }
        Command::Browse { dir, card } => {
            let mut session = open(&dir, settings)?;
            let number = card.unwrap_or(session.state().active_card_index + 1);
            let identity = card_at(&session, number)?;
            session.go_to(number - 1)?;
            session.load_card(&identity).await?;
            console::write_candidates(&mut io::stdout(), &session, &identity)?;
        }
        Command::Session { dir } => {
            let mut session = open(&dir, settings)?;
            console::run_console(&mut session, io::stdin().lock(), &mut io::stdout()).await?;
        }
        Command::Pick {
            dir,
            card,
            printing,
        } => {
            let mut session = open(&dir, settings)?;
            let identity = card_at(&session, card)?;
            let list = session.load_card(&identity).await?;
            if printing == 0 || printing > list.len() {
                return Err(format!(
                    "printing {} out of range (card has {} candidates)",
                    printing,
                    list.len()
                )
                .into());
            }
            let cursor = session.selector().selection(&identity).cursor_index.unwrap_or(0);
            session.move_cursor(&identity, printing as isize - 1 - cursor as isize)?;
            match session.select_current(&identity)? {
                SelectOutcome::Selected(id) => println!("Selected {} for card {}", id, card),
                SelectOutcome::NoCandidates => println!("No printings match the current filters"),
            }
        }
        Command::Clear { dir, card } => {
            let mut session = open(&dir, settings)?;
            let identity = card_at(&session, card)?;
            if session.clear_selection(&identity)? {
                println!("Cleared selection of card {}", card);
            } else {
                println!("Card {} has no selection", card);
            }
        }
        Command::AllPrints { dir, card } => {
            let mut session = open(&dir, settings)?;
            let identity = card_at(&session, card)?;
            let enabled = session.toggle_all_prints(&identity)?;
            println!(
                "All prints {} for card {}",
                if enabled { "on" } else { "off" },
                card
            );
        }
        Command::Refresh { dir, card } => {
            let mut session = open(&dir, settings)?;
            let identity = card_at(&session, card)?;
            match session.refresh(&identity).await {
                Ok(count) => println!("Refreshed card {}: {} printings", card, count),
                Err(e) => println!("Could not refresh card {}: {}", card, e),
            }
        }
        Command::Export {
            dir,
            out,
            abort_on_missing,
            per_copy,
            workers,
        } => {
            let mut settings = settings;
            if let Some(workers) = workers {
                settings.export_workers = workers;
            }
            let session = open(&dir, settings)?;
            let mut options = session.export_options(&out.unwrap_or_else(|| dir.join("export")));
            options.one_file_per_copy = per_copy;
            if abort_on_missing {
                options.missing = MissingSelectionPolicy::Abort;
            }

            let cancel = CancelFlag::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, finishing files in progress");
                    on_interrupt.cancel();
                }
            });

            let summary = session.export(&options, &cancel).await?;
            for item in &summary.items {
                match &item.outcome {
                    ExportOutcome::Written { paths } => {
                        for path in paths {
                            println!("written  {}", path.display());
                        }
                    }
                    ExportOutcome::Skipped(reason) => {
                        println!("skipped  {} ({})", item.card_name, reason)
                    }
                    ExportOutcome::Failed(reason) => {
                        println!("FAILED   {}: {}", item.card_name, reason)
                    }
                }
            }
            println!(
                "{} written, {} skipped, {} failed{}",
                summary.written(),
                summary.skipped(),
                summary.failed(),
                if summary.cancelled { " (cancelled)" } else { "" }
            );
        }
        Command::Recent => {
            let recent = RecentProjects::load(&RecentProjects::default_path());
            if recent.is_empty() {
                println!("No recent projects");
            }
            for path in recent.iter() {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn open(dir: &Path, settings: Settings) -> CliResult<Session> {
    let catalog = ScryfallCatalog::new(&settings)?;
    let session = Session::open(dir, catalog, settings)?;
    remember(dir);
    Ok(session)
}

/// Add a project to the recent list; failures only get logged
fn remember(dir: &Path) {
    let path = RecentProjects::default_path();
    let mut recent = RecentProjects::load(&path);
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    recent.touch(&dir);
    if let Err(e) = recent.save(&path) {
        log::warn!("Failed to update recent projects: {}", e);
    }
}

/// Resolve a 1-based card number
fn card_at(session: &Session, number: usize) -> CliResult<CardIdentity> {
    number
        .checked_sub(1)
        .and_then(|index| session.identity_at(index))
        .ok_or_else(|| {
            format!(
                "card {} out of range (project has {} cards)",
                number,
                session.state().cards.len()
            )
            .into()
        })
}
