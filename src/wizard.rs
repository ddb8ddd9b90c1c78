//! Wizard module.
//! Interactive menu over the editor: view, add, edit, remove, reorder, save, render.
//! Uses `dialoguer` prompts on the terminal.
//! Every change is saved as soon as it is made; a failed save stays in memory
//! and can be retried from the menu.

use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::config::{DEFAULT_ICON, LinkEntry};
use crate::editor::{LinkPatch, NewLink, Session, format_list};
use crate::error::LinkError;
use crate::render;

/// Typed in an edit prompt to clear an optional field.
const CLEAR: &str = "-";

const MENU: [&str; 8] = [
    "View current links",
    "Add new link",
    "Edit existing link",
    "Remove link",
    "Move link within its category",
    "Save configuration",
    "Render dashboard page",
    "Exit",
];

/// Runs the menu loop until the operator exits.
pub fn run(session: &mut Session) -> Result<()> {
    let theme = ColorfulTheme::default();
    println!("Link configuration wizard ({})", session.store().path().display());

    loop {
        println!();
        println!("Currently managing {} links", session.config().links.len());
        if session.is_dirty() {
            println!("There are unsaved changes.");
        }

        let choice = Select::with_theme(&theme)
            .with_prompt("Select an option")
            .items(&MENU)
            .default(0)
            .interact()
            .context("Failed to read menu selection")?;

        let outcome = match choice {
            0 => {
                print!("{}", format_list(session.config()));
                Ok(())
            }
            1 => add_link(session, &theme),
            2 => edit_link(session, &theme),
            3 => remove_link(session, &theme),
            4 => move_link(session, &theme),
            5 => session.save().map_err(Into::into),
            6 => render_page(session, &theme),
            _ => {
                if session.is_dirty()
                    && !Confirm::with_theme(&theme)
                        .with_prompt("Unsaved changes will be lost. Exit anyway?")
                        .default(false)
                        .interact()?
                {
                    continue;
                }
                println!("Goodbye!");
                return Ok(());
            }
        };

        if let Err(e) = outcome {
            report(e)?;
        }
    }
}

/// Prints recoverable editor errors and keeps the loop going. Anything else ends the wizard.
fn report(err: anyhow::Error) -> Result<()> {
    match err.downcast_ref::<LinkError>() {
        Some(LinkError::Io { .. }) => {
            println!("Change was not saved: {err}");
            println!("Choose \"Save configuration\" to retry.");
            return Ok(());
        }
        Some(LinkError::Validation(_) | LinkError::NotFound(_)) => {
            println!("{err}");
            return Ok(());
        }
        _ => {}
    }
    Err(err)
}

fn add_link(session: &mut Session, theme: &ColorfulTheme) -> Result<()> {
    let label: String = Input::with_theme(theme)
        .with_prompt("Link label")
        .interact_text()?;
    let target: String = Input::with_theme(theme)
        .with_prompt("Target (http:// or https:// for web, file path for local)")
        .interact_text()?;
    let category = optional(theme, "Category (blank for Uncategorized)", None)?;
    let description = optional(theme, "Description", None)?;

    println!("Common Font Awesome icons: fas fa-globe, fas fa-file-pdf, fab fa-github, fas fa-link");
    let icon = optional(theme, "Icon class", Some(DEFAULT_ICON))?;

    let id = session.add(NewLink {
        label,
        target,
        category,
        description,
        icon,
    })?;
    println!("Added link {id}.");
    Ok(())
}

fn edit_link(session: &mut Session, theme: &ColorfulTheme) -> Result<()> {
    let Some(link) = pick(session, theme, "Link to edit")? else {
        return Ok(());
    };

    // Blank answers keep the current value; "-" clears description and icon.
    let patch = LinkPatch {
        label: optional(theme, &format!("New label [{}]", link.label), None)?,
        target: optional(theme, &format!("New target [{}]", link.target), None)?,
        category: optional(theme, &format!("New category [{}]", link.category_name()), None)?,
        description: clearable(optional(
            theme,
            &format!(
                "New description [{}] ('{CLEAR}' clears)",
                link.description.as_deref().unwrap_or("")
            ),
            None,
        )?),
        icon: clearable(optional(
            theme,
            &format!("New icon [{}] ('{CLEAR}' clears)", link.icon.as_deref().unwrap_or("")),
            None,
        )?),
    };
    if patch.is_empty() {
        println!("Nothing changed.");
        return Ok(());
    }

    session.edit(&link.id, patch)?;
    println!("Updated '{}'.", link.label);
    Ok(())
}

fn remove_link(session: &mut Session, theme: &ColorfulTheme) -> Result<()> {
    let Some(link) = pick(session, theme, "Link to remove")? else {
        return Ok(());
    };
    let confirmed = Confirm::with_theme(theme)
        .with_prompt(format!("Remove '{}'?", link.label))
        .default(false)
        .interact()?;
    if confirmed {
        let removed = session.delete(&link.id)?;
        println!("Removed '{}'.", removed.label);
    }
    Ok(())
}

fn move_link(session: &mut Session, theme: &ColorfulTheme) -> Result<()> {
    let Some(link) = pick(session, theme, "Link to move")? else {
        return Ok(());
    };
    let order: u32 = Input::with_theme(theme)
        .with_prompt(format!("New position in '{}'", link.category_name()))
        .default(link.order)
        .interact_text()?;
    session.reorder(&link.id, order)?;
    println!("Moved '{}' to position {order}.", link.label);
    Ok(())
}

fn render_page(session: &Session, theme: &ColorfulTheme) -> Result<()> {
    let out: String = Input::with_theme(theme)
        .with_prompt("Write page to")
        .default(render::DEFAULT_PAGE_FILE.to_string())
        .interact_text()?;
    let count = render::write_page(session.store().path(), Path::new(&out))?;
    println!("Wrote {out} with {count} links.");
    Ok(())
}

/// Lets the operator choose a link from the grouped listing. `None` when there is nothing to pick.
fn pick(session: &Session, theme: &ColorfulTheme, prompt: &str) -> Result<Option<LinkEntry>> {
    let links: Vec<&LinkEntry> = session
        .list()
        .into_iter()
        .flat_map(|group| group.links)
        .collect();
    if links.is_empty() {
        println!("No links currently configured.");
        return Ok(None);
    }

    let items: Vec<String> = links
        .iter()
        .map(|link| format!("[{}] {} -> {}", link.category_name(), link.label, link.target))
        .collect();
    let index = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact()?;
    Ok(Some(links[index].clone()))
}

/// Free-text prompt that maps a blank answer to `None`.
fn optional(theme: &ColorfulTheme, prompt: &str, default: Option<&str>) -> Result<Option<String>> {
    let mut input = Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    let answer = input.interact_text()?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Turns the clear marker into the empty value `LinkPatch` uses to drop a field.
fn clearable(answer: Option<String>) -> Option<String> {
    if answer.as_deref() == Some(CLEAR) {
        Some(String::new())
    } else {
        answer
    }
}
