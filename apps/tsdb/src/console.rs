//! # Console
//!
//! Interactive command shell over one open database, run by `tsdb <name>`.
//!
//! Every command goes through [`Console::execute`], which returns the text
//! to print; the readline loop in [`Console::run`] only handles input,
//! history and printing. Command errors are printed and the shell keeps
//! running.

use crate::cli::{CliError, CliResult};
use crate::ingest;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tsdb_core::{Database, FileKind, Frequency, InstanceFilter, InstanceKey};

/// Command overview printed by `help`.
pub const HELP: &str = "\
commands:
  measurands                                   list measurands
  sources                                      list sources
  list [measurand=M] [source=S] [freq=F]       list timeseries identifiers
  instances <id>                               list instances of a timeseries
  add-timeseries <id>
  add-measurand <short> <long> <description...>
  add-source <short> <description...>
  add-instance <id> <freq> <measurand> <source> [metadata...]
  read <id> <freq> <measurand> <source> [as_at]
  write <id> <freq> <measurand> <source> <file>  .json points or csv
  export <id> <freq> <measurand> <source> <csv-file>
  path <id> <freq> <measurand> <source> [data|log]
  stats                                        read-cache counters
  help
  exit | quit";

/// Result of one console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print the text and prompt again.
    Continue(String),
    Quit,
}

/// Command shell bound to one database.
#[derive(Debug)]
pub struct Console {
    db: Database,
}

impl Console {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn banner(&self) -> String {
        format!(
            "Running timeseries database: {}\nType 'help' for a list of available commands.",
            self.db
        )
    }

    // =========================================================================
    // READLINE LOOP
    // =========================================================================

    /// Run the interactive loop until `quit`, Ctrl-C or Ctrl-D.
    pub fn run(&self) -> CliResult<()> {
        let mut rl = DefaultEditor::new()?;
        println!("{}", self.banner());

        loop {
            let line = match rl.readline("tsdb> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let _ = rl.add_history_entry(trimmed);

            match self.execute(trimmed) {
                Ok(Outcome::Continue(text)) => {
                    if !text.is_empty() {
                        println!("{text}");
                    }
                }
                Ok(Outcome::Quit) => break,
                Err(e) => println!("error: {e}"),
            }
        }
        Ok(())
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Execute one command line.
    pub fn execute(&self, line: &str) -> CliResult<Outcome> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(Outcome::Continue(String::new()));
        };

        let text = match command {
            "help" => HELP.to_string(),
            "quit" | "exit" => return Ok(Outcome::Quit),
            "measurands" => self.measurands()?,
            "sources" => self.sources()?,
            "list" => self.list(args)?,
            "instances" => self.instances(args)?,
            "add-timeseries" => {
                let [identifier] = args else {
                    return Err(usage("add-timeseries <id>"));
                };
                self.db.add_timeseries(identifier)?;
                format!("added timeseries {identifier}")
            }
            "add-measurand" => {
                let [short_id, long_id, description @ ..] = args else {
                    return Err(usage("add-measurand <short> <long> <description...>"));
                };
                self.db
                    .add_measurand(short_id, long_id, &description.join(" "))?;
                format!("added measurand {short_id}")
            }
            "add-source" => {
                let [short_id, description @ ..] = args else {
                    return Err(usage("add-source <short> <description...>"));
                };
                self.db.add_source(short_id, &description.join(" "))?;
                format!("added source {short_id}")
            }
            "add-instance" => {
                let (key, rest) = instance_key(args, "add-instance")?;
                let instance = self.db.add_timeseries_instance(&key, &rest.join(" "))?;
                format!("added instance {key} ({})", instance.uuid)
            }
            "read" => self.read(args)?,
            "write" => self.write(args)?,
            "export" => self.export(args)?,
            "path" => self.path(args)?,
            "stats" => {
                let stats = self.db.cache_stats();
                format!(
                    "cache: {}/{} series, {} hits, {} misses ({}% hit rate)",
                    stats.size, stats.max_size, stats.hits, stats.misses, stats.hit_rate_percent
                )
            }
            other => return Err(usage(&format!("unknown command '{other}', try 'help'"))),
        };
        Ok(Outcome::Continue(text))
    }

    fn measurands(&self) -> CliResult<String> {
        let mut out = String::new();
        for m in self.db.list_measurands()? {
            let _ = writeln!(out, "{}\t{}\t{}", m.short_id, m.long_id, m.description);
        }
        Ok(out.trim_end().to_string())
    }

    fn sources(&self) -> CliResult<String> {
        let mut out = String::new();
        for s in self.db.list_sources()? {
            let _ = writeln!(out, "{}\t{}", s.short_id, s.description);
        }
        Ok(out.trim_end().to_string())
    }

    fn list(&self, args: &[&str]) -> CliResult<String> {
        let mut filter = InstanceFilter::default();
        for arg in args {
            filter = match arg.split_once('=') {
                Some(("measurand", m)) => filter.measurand(m),
                Some(("source", s)) => filter.source(s),
                Some(("freq", f)) => filter.freq(f.parse::<Frequency>()?),
                _ => return Err(usage("list [measurand=M] [source=S] [freq=F]")),
            };
        }
        Ok(self.db.ts_list(&filter)?.join("\n"))
    }

    fn instances(&self, args: &[&str]) -> CliResult<String> {
        let [identifier] = args else {
            return Err(usage("instances <id>"));
        };
        let mut out = String::new();
        for instance in self.db.list_instances(identifier)? {
            let _ = writeln!(out, "{}\t{}", instance.key(), instance.uuid);
        }
        Ok(out.trim_end().to_string())
    }

    fn read(&self, args: &[&str]) -> CliResult<String> {
        let (key, rest) = instance_key(args, "read")?;
        let series = match rest {
            [] => self.db.read(&key)?,
            [as_at] => {
                let as_at = ingest::parse_time(as_at)
                    .ok_or_else(|| usage(&format!("bad as_at time '{as_at}'")))?;
                self.db.read_log(&key, as_at)?
            }
            _ => return Err(usage("read <id> <freq> <measurand> <source> [as_at]")),
        };
        Ok(ingest::to_csv(&series).trim_end().to_string())
    }

    fn write(&self, args: &[&str]) -> CliResult<String> {
        let (key, rest) = instance_key(args, "write")?;
        let [file] = rest else {
            return Err(usage("write <id> <freq> <measurand> <source> <file>"));
        };
        let text = fs::read_to_string(file)?;
        let is_json = Path::new(file)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let series = if is_json {
            ingest::parse_json(&text)?
        } else {
            ingest::parse_csv(&text)?
        };
        let report = self.db.write(&key, &series)?;
        Ok(format!(
            "created {} records, updated {} records",
            report.created.len(),
            report.updated.len()
        ))
    }

    fn export(&self, args: &[&str]) -> CliResult<String> {
        let (key, rest) = instance_key(args, "export")?;
        let [file] = rest else {
            return Err(usage("export <id> <freq> <measurand> <source> <csv-file>"));
        };
        let series = self.db.read(&key)?;
        fs::write(Path::new(file), ingest::to_csv(&series))?;
        Ok(format!("exported {} records to {file}", series.len()))
    }

    fn path(&self, args: &[&str]) -> CliResult<String> {
        let (key, rest) = instance_key(args, "path")?;
        let kind = match rest {
            [] | ["data"] => FileKind::Data,
            ["log"] => FileKind::Log,
            _ => return Err(usage("path <id> <freq> <measurand> <source> [data|log]")),
        };
        Ok(self.db.get_file_path(&key, kind)?.display().to_string())
    }
}

// =============================================================================
// ARGUMENT HELPERS
// =============================================================================

fn usage(text: &str) -> CliError {
    CliError::Usage(text.to_string())
}

/// Split `<id> <freq> <measurand> <source>` off the front of `args`.
fn instance_key<'a>(args: &'a [&'a str], command: &str) -> CliResult<(InstanceKey, &'a [&'a str])> {
    let [identifier, freq, measurand, source, rest @ ..] = args else {
        return Err(usage(&format!(
            "{command} <id> <freq> <measurand> <source> ..."
        )));
    };
    let freq: Frequency = freq.parse()?;
    Ok((InstanceKey::new(*identifier, freq, *measurand, *source), rest))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_key_parses_frequency() {
        let args = ["410730", "1D", "Q", "DATA_SOURCE", "extra"];
        let (key, rest) = instance_key(&args, "read").expect("key");
        assert_eq!(key.to_string(), "410730/Q/DATA_SOURCE/D");
        assert_eq!(rest, ["extra"]);
    }

    #[test]
    fn instance_key_needs_four_words() {
        let err = instance_key(&["410730", "D"], "read").expect_err("too short");
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn help_lists_every_command() {
        for command in ["measurands", "add-instance", "read", "write", "export", "path", "stats"] {
            assert!(HELP.contains(command), "{command}");
        }
    }
}
