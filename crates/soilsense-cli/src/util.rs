//! Utility functions for CLI operations.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use soilsense_core::{Candidate, DeviceChooser};

/// Interactive device picker backed by a terminal menu.
///
/// Escape or `q` dismisses the menu, which the acquisition reports as no
/// device selected.
#[derive(Debug, Default)]
pub struct PromptChooser;

impl DeviceChooser for PromptChooser {
    fn choose(&self, candidates: &[Candidate]) -> Option<usize> {
        let items: Vec<String> = candidates.iter().map(ToString::to_string).collect();
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a sensor")
            .items(&items)
            .default(0)
            .interact_opt()
            .unwrap_or_else(|e| {
                tracing::warn!("Device prompt failed: {}", e);
                None
            })
    }
}

/// Fail early when an interactive prompt cannot be shown.
pub fn require_terminal() -> Result<()> {
    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!(
            "--pick needs an interactive terminal.\n\
             Omit --pick to connect to the strongest matching sensor."
        );
    }
    Ok(())
}

/// Parse a hex string such as `2a11`, `0x2a 0x11` or `2A:11` into bytes.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|part| {
            part.strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part)
        })
        .collect();

    if digits.is_empty() {
        bail!("No hex digits in '{}'", input);
    }
    if digits.len() % 2 != 0 {
        bail!("Odd number of hex digits in '{}'", input);
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            let pair = digits
                .get(i..i + 2)
                .with_context(|| format!("Invalid hex in '{}'", input))?;
            u8::from_str_radix(pair, 16).with_context(|| format!("Invalid hex byte '{}'", pair))
        })
        .collect()
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_plain() {
        assert_eq!(parse_hex("2a11").unwrap(), vec![0x2a, 0x11]);
        assert_eq!(parse_hex("2A11").unwrap(), vec![0x2a, 0x11]);
    }

    #[test]
    fn test_parse_hex_separated() {
        assert_eq!(parse_hex("0x2a 0x11").unwrap(), vec![0x2a, 0x11]);
        assert_eq!(parse_hex("2a:11:00").unwrap(), vec![0x2a, 0x11, 0x00]);
        assert_eq!(parse_hex("37,3C").unwrap(), vec![0x37, 0x3c]);
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("").is_err());
        assert!(parse_hex("2a1").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("é1").is_err());
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
