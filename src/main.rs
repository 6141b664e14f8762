//! Main entry point for the zipnav CLI.
//!
//! Stands in for the host application: it lists directories of the
//! archive, opens entries through configured viewers, or runs a small
//! interactive shell over the navigator.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use zipnav::{
    Activation, BackOutcome, Cli, CommandLauncher, DryRunLauncher, Launcher, NavError, Navigator,
    NoProgress, OpenOutcome, ProgressIndicator,
};

/// Prints busy lines while an extraction runs.
///
/// Dismissal does not claim success; the caller reports how the open went.
struct TextProgress<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> TextProgress<W> {
    fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn line(&self, message: std::fmt::Arguments<'_>) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", message);
        }
    }
}

impl<W: Write + Send> ProgressIndicator for TextProgress<W> {
    fn show(&self, archive: &Path) {
        self.line(format_args!("Extracting {} ...", archive.display()));
    }

    fn dismiss(&self) {
        self.line(format_args!("Extraction ended."));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let progress: Arc<dyn ProgressIndicator> = if cli.is_quiet() {
        Arc::new(NoProgress)
    } else {
        Arc::new(TextProgress::new(std::io::stderr()))
    };
    let mut nav = Navigator::open_with_progress(Path::new(&cli.file), progress).await?;

    if let Some(ref path) = cli.path {
        change_dir(&mut nav, path)?;
    }

    let launcher: Box<dyn Launcher> = if cli.dry_run {
        Box::new(DryRunLauncher::new(cli.launcher_config()))
    } else {
        Box::new(CommandLauncher::new(cli.launcher_config()))
    };

    if cli.is_interactive() {
        return run_shell(&mut nav, launcher.as_ref()).await;
    }

    if cli.list || cli.verbose {
        list_dir(&nav, cli.verbose);
    }

    if let Some(ref name) = cli.open {
        open_by_name(&nav, name, launcher.as_ref()).await?;
    }

    if let Some(ref name) = cli.pipe {
        pipe_by_name(&nav, name).await?;
    }

    Ok(())
}

/// Walk down `path` one directory at a time from the current directory.
fn change_dir(nav: &mut Navigator, path: &str) -> Result<()> {
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." {
            if nav.back() == BackOutcome::Exited {
                bail!("Already at the top of the archive");
            }
            continue;
        }

        let position = nav
            .position_of(segment)
            .with_context(|| format!("No such directory: {}", segment))?;
        match nav.enter(position)? {
            Activation::Entered => {}
            Activation::File(entry) => bail!("Not a directory: {}", entry.path()),
        }
    }
    Ok(())
}

/// Resolve `name` as a listed name or a `#n` position.
fn resolve(nav: &Navigator, name: &str) -> Result<usize> {
    if let Some(number) = name.strip_prefix('#') {
        let position: usize = number
            .parse()
            .with_context(|| format!("Invalid position: {}", name))?;
        if position >= nav.visible().len() {
            bail!("No entry at position {}", position);
        }
        return Ok(position);
    }
    nav.position_of(name)
        .with_context(|| format!("No such entry: {}", name))
}

/// List the current directory.
///
/// The verbose table mirrors `unzip -v`: sizes, compression ratio and the
/// stored timestamp. Directories implied by deeper entries have no record
/// and print without sizes.
fn list_dir(nav: &Navigator, verbose: bool) {
    if !verbose {
        for (i, entry) in nav.visible().iter().enumerate() {
            println!("{:>4}  {}", format!("#{}", i), entry.name());
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in nav.visible() {
        let Some(record) = nav.index().record(entry) else {
            println!("{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {}", "", "", "", "", "", entry.name());
            continue;
        };

        let (year, month, day) = record.mod_date();
        let (hour, minute, _second) = record.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            record.uncompressed_size,
            record.compressed_size,
            ratio(record.compressed_size, record.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.name()
        );

        if !entry.is_directory() {
            total_uncompressed += record.uncompressed_size;
            total_compressed += record.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files ({})",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count,
        format_size(total_uncompressed)
    );
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "   0%".to_string()
    }
}

async fn open_by_name(nav: &Navigator, name: &str, launcher: &dyn Launcher) -> Result<()> {
    let position = resolve(nav, name)?;
    match nav.open_entry(position, launcher).await {
        Ok((path, outcome)) => {
            report_outcome(&path, &outcome);
            Ok(())
        }
        Err(err @ NavError::ExtractionFailed { .. }) => {
            eprintln!("Could not open file.");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

fn report_outcome(path: &Path, outcome: &OpenOutcome) {
    match outcome {
        OpenOutcome::Viewer(kind) => println!("Opened {} in {}", path.display(), kind.label()),
        OpenOutcome::Generic => println!("Opened {}", path.display()),
        OpenOutcome::Notice(message) => println!("{}", message),
    }
}

async fn pipe_by_name(nav: &Navigator, name: &str) -> Result<()> {
    let position = resolve(nav, name)?;
    let data = nav.read_entry(position).await?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&data).await?;
    stdout.flush().await?;
    Ok(())
}

/// One line of shell input
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    List { verbose: bool },
    Enter(&'a str),
    Back,
    Open(&'a str),
    Cat(&'a str),
    Pwd,
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> ShellCommand<'_> {
    let line = line.trim();
    let (word, arg) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match (word, arg) {
        ("", _) => ShellCommand::Empty,
        ("ls", "") => ShellCommand::List { verbose: false },
        ("ll", "") | ("ls", "-l") => ShellCommand::List { verbose: true },
        ("cd", "..") | ("..", "") | ("back", "") => ShellCommand::Back,
        ("cd", name) if !name.is_empty() => ShellCommand::Enter(name),
        ("open", name) if !name.is_empty() => ShellCommand::Open(name),
        ("cat", name) if !name.is_empty() => ShellCommand::Cat(name),
        ("pwd", "") => ShellCommand::Pwd,
        ("help", _) | ("?", _) => ShellCommand::Help,
        ("quit", _) | ("exit", _) | ("q", _) => ShellCommand::Quit,
        _ => ShellCommand::Unknown(line),
    }
}

const SHELL_HELP: &str = "\
ls | ll          list the current directory (ll: verbose)
cd <dir|#n>      enter a directory
cd .. | back     go up; at the top, leave the archive
open <file|#n>   extract if needed and open with a viewer
cat <file|#n>    print a file without extracting
pwd              show the current directory
quit             leave";

async fn run_shell(nav: &mut Navigator, launcher: &dyn Launcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    list_dir(nav, false);

    loop {
        eprint!("{}> ", prompt(nav));
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let result = match parse_command(&line) {
            ShellCommand::Empty => Ok(()),
            ShellCommand::List { verbose } => {
                list_dir(nav, verbose);
                Ok(())
            }
            ShellCommand::Enter(name) => enter_dir(nav, name),
            ShellCommand::Back => {
                if nav.back() == BackOutcome::Exited {
                    break;
                }
                list_dir(nav, false);
                Ok(())
            }
            ShellCommand::Open(name) => open_by_name(nav, name, launcher).await,
            ShellCommand::Cat(name) => pipe_by_name(nav, name).await,
            ShellCommand::Pwd => {
                println!("/{}", nav.state().current());
                Ok(())
            }
            ShellCommand::Help => {
                println!("{}", SHELL_HELP);
                Ok(())
            }
            ShellCommand::Quit => break,
            ShellCommand::Unknown(input) => {
                eprintln!("Unknown command: {} (try help)", input);
                Ok(())
            }
        };

        // Errors in the shell are reported and the session continues
        if let Err(err) = result {
            eprintln!("error: {:#}", err);
        }
    }

    Ok(())
}

fn enter_dir(nav: &mut Navigator, name: &str) -> Result<()> {
    let position = resolve(nav, name)?;
    match nav.enter(position)? {
        Activation::Entered => list_dir(nav, false),
        Activation::File(entry) => bail!("Not a directory: {} (use open)", entry.path()),
    }
    Ok(())
}

fn prompt(nav: &Navigator) -> String {
    let name = nav
        .index()
        .path()
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let current = nav.state().current();
    if current.is_root() {
        name
    } else {
        format!("{}:{}", name, current)
    }
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
