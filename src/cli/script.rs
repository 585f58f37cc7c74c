//! Replay scripts - one table operation per line
//!
//! ```text
//! register 8
//! install auto log.txt regular
//! install 3 sock nowait
//! range 4 4
//! update 0 skip clear data.bin
//! remove 3
//! get 0
//! resize 16
//! stats
//! unregister
//! ```
//!
//! Blank lines and text after `#` are ignored.

use ringfiles::{FixedFile, SlotSelect};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoFile {
    pub name: String,
    pub regular: bool,
    pub nowait: bool,
}

impl FixedFile for DemoFile {
    fn supports_nowait(&self) -> bool {
        self.nowait
    }

    fn is_regular(&self) -> bool {
        self.regular
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEntry {
    Skip,
    Clear,
    Set(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register(usize),
    Install { slot: SlotSelect, file: DemoFile },
    Remove(usize),
    Get(usize),
    Range { offset: u32, len: u32 },
    Resize(usize),
    Update { offset: usize, entries: Vec<UpdateEntry> },
    Stats,
    Unregister,
}

/// Parse a whole script, reporting the first bad line
pub fn parse_script(source: &str) -> Result<Vec<(usize, Command)>, String> {
    let mut commands = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let command = parse_line(line).map_err(|e| format!("line {}: {}", number + 1, e))?;
        commands.push((number + 1, command));
    }
    Ok(commands)
}

pub fn parse_line(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (op, args) = words.split_first().ok_or("empty command")?;

    match (*op, args) {
        ("register", [n]) => Ok(Command::Register(number(n)?)),
        ("install", [slot, name, opts @ ..]) => {
            let slot = match *slot {
                "auto" => SlotSelect::Auto,
                raw => SlotSelect::Fixed(number(raw)?),
            };
            let mut file = DemoFile { name: name.to_string(), regular: false, nowait: false };
            for opt in opts {
                match *opt {
                    "regular" => file.regular = true,
                    "nowait" => file.nowait = true,
                    other => return Err(format!("unknown file option '{}'", other)),
                }
            }
            Ok(Command::Install { slot, file })
        }
        ("remove", [n]) => Ok(Command::Remove(number(n)?)),
        ("get", [n]) => Ok(Command::Get(number(n)?)),
        ("range", [off, len]) => Ok(Command::Range {
            offset: number(off)?,
            len: number(len)?,
        }),
        ("resize", [n]) => Ok(Command::Resize(number(n)?)),
        ("update", [off, entries @ ..]) if !entries.is_empty() => Ok(Command::Update {
            offset: number(off)?,
            entries: entries
                .iter()
                .map(|entry| match *entry {
                    "skip" => UpdateEntry::Skip,
                    "clear" => UpdateEntry::Clear,
                    name => UpdateEntry::Set(name.to_string()),
                })
                .collect(),
        }),
        ("stats", []) => Ok(Command::Stats),
        ("unregister", []) => Ok(Command::Unregister),
        (op, _) => Err(format!("cannot parse '{}' command: {}", op, line)),
    }
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T, String> {
    word.parse().map_err(|_| format!("expected a number, got '{}'", word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_install_with_options() {
        let cmd = parse_line("install auto data.bin regular nowait").expect("parse");
        assert_eq!(
            cmd,
            Command::Install {
                slot: SlotSelect::Auto,
                file: DemoFile { name: "data.bin".into(), regular: true, nowait: true },
            }
        );

        let cmd = parse_line("install 3 sock").expect("parse");
        assert!(matches!(cmd, Command::Install { slot: SlotSelect::Fixed(3), .. }));
    }

    #[test]
    fn parses_update_entries() {
        let cmd = parse_line("update 2 skip clear f").expect("parse");
        assert_eq!(
            cmd,
            Command::Update {
                offset: 2,
                entries: vec![UpdateEntry::Skip, UpdateEntry::Clear, UpdateEntry::Set("f".into())],
            }
        );
    }

    #[test]
    fn script_skips_comments_and_blanks() {
        let script = "# setup\nregister 4\n\nstats # show\n";
        let commands = parse_script(script).expect("parse");
        assert_eq!(commands, vec![(2, Command::Register(4)), (4, Command::Stats)]);
    }

    #[test]
    fn bad_line_reports_number() {
        let err = parse_script("register 4\nremove x\n").unwrap_err();
        assert!(err.starts_with("line 2:"), "{}", err);
    }

    #[test]
    fn unknown_command_rejected() {
        assert!(parse_line("explode 3").is_err());
        assert!(parse_line("update 3").is_err());
        assert!(parse_line("install auto f shiny").is_err());
    }
}
