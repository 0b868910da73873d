//! Line-oriented front end over a [`ContactBook`].

use std::io::Write;
use std::ops::ControlFlow;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error};

use crate::command::{CommandProcessor, CommandResult};
use crate::contact::Contact;
use crate::controller::ContactBook;

pub fn format_contacts(contacts: &[Contact]) -> String {
    if contacts.is_empty() {
        return "No contacts.\n".to_string();
    }
    let mut out = String::new();
    for c in contacts {
        out.push_str(&format!(
            "{:<36}  {:<24}  {:<16}  {:<28}  {}  {}\n",
            c.id,
            c.name,
            c.phone,
            c.email.as_deref().unwrap_or("-"),
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.notes.as_deref().unwrap_or(""),
        ));
    }
    out
}

/// Reads commands from `input` until EOF or `quit`.
///
/// Command failures are reported on `output` and the loop keeps going; only
/// I/O errors on the streams themselves end it early.
pub async fn run<R, W>(book: &mut ContactBook, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let processor = CommandProcessor::new();
    let mut lines = input.lines();

    prompt(book, output)?;
    while let Some(line) = lines.next_line().await? {
        if let Some(command) = processor.parse_line(&line) {
            debug!("Shell command: {:?}", command);
            match execute(book, command, output).await {
                Ok(ControlFlow::Break(())) => break,
                Ok(ControlFlow::Continue(())) => {}
                Err(e) => writeln!(output, "Error: {}", e)?,
            }
        }
        prompt(book, output)?;
    }
    writeln!(output)?;
    Ok(())
}

fn prompt<W: Write>(book: &ContactBook, output: &mut W) -> Result<()> {
    write!(output, "[{}] > ", book.mode())?;
    output.flush()?;
    Ok(())
}

async fn execute<W: Write>(
    book: &mut ContactBook,
    command: CommandResult,
    output: &mut W,
) -> Result<ControlFlow<()>> {
    match command {
        CommandResult::Help(text) => write!(output, "{}", text)?,
        CommandResult::List => write!(output, "{}", format_contacts(&book.visible()))?,
        CommandResult::Mode(mode) => {
            // the switch sticks even when the first fetch fails
            if let Err(e) = book.set_mode(mode).await {
                if book.mode() != mode {
                    return Err(e.into());
                }
                error!("Initial load in {} mode failed: {}", mode, e);
                writeln!(output, "Switched to {} mode, but loading failed: {}", mode, e)?;
            } else {
                writeln!(output, "Switched to {} mode ({} contacts)", mode, book.contacts().len())?;
            }
        }
        CommandResult::Search(text) => {
            book.set_search(text).await?;
            write!(output, "{}", format_contacts(&book.visible()))?;
        }
        CommandResult::Sort(field) => {
            book.sort_by(field);
            write!(output, "{}", format_contacts(&book.visible()))?;
        }
        CommandResult::Add(draft) => {
            book.submit(&draft, None).await?;
            writeln!(output, "Saved ({} contacts)", book.contacts().len())?;
        }
        CommandResult::Edit(id, draft) => {
            book.submit(&draft, Some(&id)).await?;
            writeln!(output, "Updated {}", id)?;
        }
        CommandResult::Delete(id) => {
            book.delete(&id).await?;
            writeln!(output, "Deleted {}", id)?;
        }
        CommandResult::Clear => {
            let report = book.clear_all().await?;
            writeln!(output, "Deleted {} contacts", report.deleted)?;
            for (id, reason) in &report.failed {
                writeln!(output, "  failed {}: {}", id, reason)?;
            }
        }
        CommandResult::Import(path) => {
            let data = tokio::fs::read_to_string(&path).await?;
            let report = book.import(&data).await?;
            writeln!(
                output,
                "Imported {} contacts, skipped {}",
                report.imported, report.skipped
            )?;
        }
        CommandResult::Export(path) => {
            let data = book.export()?;
            match path {
                Some(path) => {
                    tokio::fs::write(&path, data).await?;
                    writeln!(output, "Exported {} contacts to {}", book.contacts().len(), path.display())?;
                }
                None => writeln!(output, "{}", data)?,
            }
        }
        CommandResult::Health => {
            if !book.has_remote() {
                writeln!(output, "Remote API not configured")?;
            } else if book.health().await {
                writeln!(output, "Remote API is up")?;
            } else {
                writeln!(output, "Remote API is unreachable")?;
            }
        }
        CommandResult::Quit => return Ok(ControlFlow::Break(())),
        CommandResult::Error(message) => writeln!(output, "{}", message)?,
    }
    Ok(ControlFlow::Continue(()))
}
