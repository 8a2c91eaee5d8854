//! Console implementation of the interaction contract.
//!
//! Plain stdin prompts. Selection accepts comma/space separated numbers,
//! `all`, or an empty line for none; confirmations default to No.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::collab::Interaction;

pub struct ConsoleInteraction;

impl ConsoleInteraction {
    fn read_line(&self) -> Result<String> {
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim().to_string())
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        print!("{} [y/N] ", question);
        let answer = self.read_line()?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}

impl Interaction for ConsoleInteraction {
    fn select_keys_for_deletion(&self, compound_keys: &[String]) -> Result<Vec<String>> {
        println!("{}", "Unused keys:".bold());
        for (idx, key) in compound_keys.iter().enumerate() {
            println!("  {:>3}. {}", idx + 1, key);
        }
        print!(
            "Select keys to delete ({}, {}, or empty for none): ",
            "numbers".cyan(),
            "all".cyan()
        );

        let answer = self.read_line()?;
        if answer.is_empty() {
            return Ok(Vec::new());
        }
        if answer.eq_ignore_ascii_case("all") {
            return Ok(compound_keys.to_vec());
        }

        let mut selected = Vec::new();
        for token in answer.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            match token.parse::<usize>() {
                Ok(n) if (1..=compound_keys.len()).contains(&n) => {
                    let key = &compound_keys[n - 1];
                    if !selected.contains(key) {
                        selected.push(key.clone());
                    }
                }
                _ => println!("{} ignoring '{}'", "warning:".bold().yellow(), token),
            }
        }
        Ok(selected)
    }

    fn confirm_deletion(&self, compound_keys: &[String], preview_path: &Path) -> Result<bool> {
        println!(
            "About to delete {} key(s). Preview written to {}",
            compound_keys.len().to_string().bold(),
            preview_path.display()
        );
        self.confirm("Proceed with deletion?")
    }

    fn confirm_remote_sync(&self) -> Result<bool> {
        self.confirm("Push local changes to the remote sheet?")
    }
}
