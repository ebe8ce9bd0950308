//! Interactive picking session and text rendering for the CLI
//!
//! [`run_console`] keeps one [`ProjectSession`] open and reads one command
//! per line, so browsing, selecting and undo carry over between commands.
//! Every change is saved as it happens.

use crate::catalog::Catalog;
use crate::error::{PickerError, Result};
use crate::models::CardIdentity;
use crate::selection::{SelectOutcome, SelectionPhase, UndoOutcome};
use crate::session::ProjectSession;
use std::io::{self, BufRead, Write};

pub const HELP: &str = "\
Commands:
  j / k    next / previous candidate
  m <n>    move the cursor by n candidates
  s        select the candidate under the cursor and go to the next card
  c        clear the selection of this card
  a        toggle all prints for this card
  u        undo the last selection change
  n / p    next / previous card
  g <n>    go to card n
  r        refresh this card from Scryfall
  l        list the candidates of this card
  t        show every card
  h        show this help
  q        quit";

/// One line of console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Move the cursor by this many candidates
    Move(isize),
    Select,
    Clear,
    AllPrints,
    Undo,
    NextCard,
    PreviousCard,
    /// 1-based card number
    GoTo(usize),
    Refresh,
    List,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?.to_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return None;
        }
        let parsed = match (command.as_str(), arg) {
            ("j", None) => ConsoleCommand::Move(1),
            ("k", None) => ConsoleCommand::Move(-1),
            ("m", Some(delta)) => ConsoleCommand::Move(delta.parse().ok()?),
            ("s", None) => ConsoleCommand::Select,
            ("c", None) => ConsoleCommand::Clear,
            ("a", None) => ConsoleCommand::AllPrints,
            ("u", None) => ConsoleCommand::Undo,
            ("n", None) => ConsoleCommand::NextCard,
            ("p", None) => ConsoleCommand::PreviousCard,
            ("g", Some(number)) => ConsoleCommand::GoTo(number.parse().ok()?),
            ("r", None) => ConsoleCommand::Refresh,
            ("l", None) => ConsoleCommand::List,
            ("t", None) => ConsoleCommand::Status,
            ("h" | "?", None) => ConsoleCommand::Help,
            ("q", None) => ConsoleCommand::Quit,
            _ => return None,
        };
        Some(parsed)
    }
}

/// Read commands from `input` until `q` or end of input
pub async fn run_console<C, R, W>(
    session: &mut ProjectSession<C>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    C: Catalog + 'static,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{}", HELP)?;
    show_active(session, out).await?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match ConsoleCommand::parse(&line) {
            Some(ConsoleCommand::Quit) => break,
            Some(command) => execute(session, command, out).await?,
            None => writeln!(out, "Unknown command {:?} (h for help)", line.trim())?,
        }
    }
    Ok(())
}

async fn execute<C, W>(session: &mut ProjectSession<C>, command: ConsoleCommand, out: &mut W) -> Result<()>
where
    C: Catalog + 'static,
    W: Write,
{
    match command {
        ConsoleCommand::NextCard => {
            session.next_card()?;
            show_active(session, out).await
        }
        ConsoleCommand::PreviousCard => {
            session.previous_card()?;
            show_active(session, out).await
        }
        ConsoleCommand::GoTo(number) => {
            let count = session.state().cards.len();
            if number == 0 || number > count {
                writeln!(out, "Card {} out of range (project has {} cards)", number, count)?;
                return Ok(());
            }
            session.go_to(number - 1)?;
            show_active(session, out).await
        }
        ConsoleCommand::Undo => match session.undo()? {
            UndoOutcome::Restored(identity) => {
                writeln!(out, "Undid last change to {}", card_name(session, &identity))?;
                show_active(session, out).await
            }
            UndoOutcome::NothingToUndo => Ok(writeln!(out, "Nothing to undo")?),
        },
        ConsoleCommand::Status => Ok(write_status(out, session)?),
        ConsoleCommand::Help => Ok(writeln!(out, "{}", HELP)?),
        ConsoleCommand::Quit => Ok(()),
        ConsoleCommand::Clear => {
            let Some(identity) = active_identity(session, out)? else {
                return Ok(());
            };
            let name = card_name(session, &identity);
            if session.clear_selection(&identity)? {
                writeln!(out, "Cleared selection of {}", name)?;
            } else {
                writeln!(out, "{} has no selection", name)?;
            }
            Ok(())
        }
        ConsoleCommand::Refresh => {
            let Some(identity) = active_identity(session, out)? else {
                return Ok(());
            };
            let name = card_name(session, &identity);
            match session.refresh(&identity).await {
                Ok(count) => {
                    writeln!(out, "Refreshed {}: {} printings", name, count)?;
                    Ok(write_candidates(out, session, &identity)?)
                }
                Err(e @ PickerError::FetchFailure(_)) => {
                    Ok(writeln!(out, "Could not refresh {}: {}", name, e)?)
                }
                Err(e) => Err(e),
            }
        }
        ConsoleCommand::Move(delta) => {
            let Some(identity) = loaded_active(session, out).await? else {
                return Ok(());
            };
            session.move_cursor(&identity, delta)?;
            Ok(write_candidates(out, session, &identity)?)
        }
        ConsoleCommand::Select => {
            let Some(identity) = loaded_active(session, out).await? else {
                return Ok(());
            };
            match session.select_current(&identity)? {
                SelectOutcome::Selected(id) => {
                    writeln!(out, "Selected {} for {}", id, card_name(session, &identity))?;
                    show_active(session, out).await
                }
                SelectOutcome::NoCandidates => {
                    Ok(writeln!(out, "No printings match the current filters")?)
                }
            }
        }
        ConsoleCommand::AllPrints => {
            let Some(identity) = loaded_active(session, out).await? else {
                return Ok(());
            };
            let enabled = session.toggle_all_prints(&identity)?;
            writeln!(
                out,
                "All prints {} for {}",
                if enabled { "on" } else { "off" },
                card_name(session, &identity)
            )?;
            Ok(write_candidates(out, session, &identity)?)
        }
        ConsoleCommand::List => {
            let Some(identity) = loaded_active(session, out).await? else {
                return Ok(());
            };
            Ok(write_candidates(out, session, &identity)?)
        }
    }
}

fn card_name<C: Catalog + 'static>(session: &ProjectSession<C>, identity: &CardIdentity) -> String {
    session
        .state()
        .card(identity)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| identity.to_string())
}

fn active_identity<C, W>(session: &ProjectSession<C>, out: &mut W) -> Result<Option<CardIdentity>>
where
    C: Catalog + 'static,
    W: Write,
{
    let identity = session.selector().active_identity();
    if identity.is_none() {
        writeln!(out, "The project has no cards")?;
    }
    Ok(identity)
}

/// Active card with its printings loaded; fetch failures are reported and
/// yield `None`
async fn loaded_active<C, W>(session: &mut ProjectSession<C>, out: &mut W) -> Result<Option<CardIdentity>>
where
    C: Catalog + 'static,
    W: Write,
{
    let Some(identity) = active_identity(session, out)? else {
        return Ok(None);
    };
    match session.load_card(&identity).await {
        Ok(_) => Ok(Some(identity)),
        Err(e @ PickerError::FetchFailure(_)) => {
            writeln!(
                out,
                "Could not fetch printings for {}: {}",
                card_name(session, &identity),
                e
            )?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn show_active<C, W>(session: &mut ProjectSession<C>, out: &mut W) -> Result<()>
where
    C: Catalog + 'static,
    W: Write,
{
    let Some(identity) = loaded_active(session, out).await? else {
        return Ok(());
    };
    let state = session.state();
    writeln!(
        out,
        "Card {}/{}: {}",
        state.active_card_index + 1,
        state.cards.len(),
        card_name(session, &identity)
    )?;
    Ok(write_candidates(out, session, &identity)?)
}

/// One line per card with its selection, `>` marking the active card
pub fn write_status<C, W>(out: &mut W, session: &ProjectSession<C>) -> io::Result<()>
where
    C: Catalog + 'static,
    W: Write,
{
    let state = session.state();
    for (index, card) in state.cards.iter().enumerate() {
        let identity = card.identity();
        let selection = session.selector().selection(&identity);
        let active = if index == state.active_card_index { '>' } else { ' ' };
        let choice = match selection.phase() {
            SelectionPhase::Selected(id) => id.to_string(),
            SelectionPhase::Browsing(_) | SelectionPhase::Unselected => "-".to_string(),
        };
        let loaded = if session.selector().has_printings(&identity) {
            ""
        } else {
            " (not fetched)"
        };
        let override_flag = if selection.all_prints_override {
            " [all prints]"
        } else {
            ""
        };
        writeln!(
            out,
            "{}{:>3}. {}x {:<32} {}{}{}",
            active,
            index + 1,
            card.requested_quantity,
            card.name,
            choice,
            override_flag,
            loaded
        )?;
    }
    let progress = session.progress();
    writeln!(out, "{}/{} cards selected", progress.selected, progress.total)
}

/// Numbered candidate list; `>` marks the cursor, `*` the selection
pub fn write_candidates<C, W>(
    out: &mut W,
    session: &ProjectSession<C>,
    identity: &CardIdentity,
) -> io::Result<()>
where
    C: Catalog + 'static,
    W: Write,
{
    let list = session.selector().candidates(identity);
    let selection = session.selector().selection(identity);
    if list.is_empty() {
        return writeln!(out, "No printings match the current filters");
    }
    let cursor = selection.cursor_index.unwrap_or(0);
    for (index, printing) in list.printings.iter().enumerate() {
        let id = printing.id();
        let marker = if index == cursor { '>' } else { ' ' };
        let selected = if selection.selected_printing.as_ref() == Some(&id) {
            '*'
        } else {
            ' '
        };
        let released = printing
            .release_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "undated".to_string());
        writeln!(
            out,
            "{}{}{:>3}. {:<12} {} ({}) {:?}{}",
            marker,
            selected,
            index + 1,
            id.to_string(),
            printing.set_name,
            released,
            printing.border,
            printing
                .frame_year
                .map(|f| format!(" {}", f.as_str()))
                .unwrap_or_default()
        )?;
    }
    writeln!(out, "{:?}: {} candidates", list.basis, list.len())
}
