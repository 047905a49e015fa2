use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use serde::Serialize;

use acr::{DecodeOptions, Guid, SessionRecord, TabRecord, decode_session, decode_tab};

#[derive(Copy, Clone, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

fn command() -> Command {
    Command::new("acr_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extracts browsing sessions from Internet Explorer Automatic Crash Recovery files")
        .arg(Arg::new("INPUT").required(true).help(
            "A RecoveryStore file, a tab data file (with --tab), \
             or a directory to scan for `RecoveryStore*.dat`",
        ))
        .arg(
            Arg::new("tab")
                .long("tab")
                .short('t')
                .action(ArgAction::SetTrue)
                .help("Treat INPUT as a single tab data file"),
        )
        .arg(
            Arg::new("strings")
                .long("strings")
                .short('s')
                .action(ArgAction::SetTrue)
                .help(
                    "Report every recovered string per page. \
                     May expose referrers, form values and credentials.",
                ),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Output format."),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_name("FILE")
                .help("Write output to FILE instead of stdout."),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("Overwrite an existing output file without complaining."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v info, -vv debug, -vvv trace"),
        )
}

#[derive(Serialize)]
struct TabReport {
    id: Guid,
    closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tab: Option<TabRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct SessionReport {
    source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    tabs: Vec<TabReport>,
}

struct AcrDump {
    input: PathBuf,
    tab_mode: bool,
    options: DecodeOptions,
    format: OutputFormat,
    output: Box<dyn Write>,
    verbosity_level: Option<LevelFilter>,
}

impl AcrDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .expect("This is a required argument"),
        );

        let format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
        {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        let output: Box<dyn Write> = match matches.get_one::<String>("output-target") {
            Some(path) => Box::new(Self::create_output_file(
                path,
                matches.get_flag("no-confirm-overwrite"),
            )?),
            None => Box::new(io::stdout()),
        };

        Ok(AcrDump {
            input,
            tab_mode: matches.get_flag("tab"),
            options: DecodeOptions {
                collect_strings: matches.get_flag("strings"),
            },
            format,
            output,
            verbosity_level,
        })
    }

    fn create_output_file(path: impl AsRef<Path>, overwrite: bool) -> Result<File> {
        let path = path.as_ref();
        if path.exists() && !overwrite {
            bail!(
                "`{}` already exists, pass `--no-confirm-overwrite` to overwrite it",
                path.display()
            );
        }
        File::create(path).with_context(|| format!("failed to create `{}`", path.display()))
    }

    fn maybe_init_logging(&self) {
        if let Some(level) = self.verbosity_level {
            match simplelog::WriteLogger::init(level, simplelog::Config::default(), io::stderr()) {
                Ok(_) => {}
                Err(e) => eprintln!("Failed to initialize logging: {e:?}"),
            };
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.maybe_init_logging();

        if !self.input.exists() {
            bail!("`{}` does not exist", self.input.display());
        }

        if self.tab_mode {
            let report = dump_tab(&self.input, false, &self.options);
            return self.render_tabs(std::slice::from_ref(&report));
        }

        let stores = self.discover_stores()?;
        let reports: Vec<SessionReport> = stores
            .iter()
            .map(|store| dump_session(store, &self.options))
            .collect();

        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.output, &reports)?;
                writeln!(self.output)?;
            }
            OutputFormat::Text => {
                for report in &reports {
                    self.render_session(report)?;
                }
            }
        }

        Ok(())
    }

    fn discover_stores(&self) -> Result<Vec<PathBuf>> {
        if !self.input.is_dir() {
            return Ok(vec![self.input.clone()]);
        }

        let pattern = self.input.join("RecoveryStore*.dat");
        let mut stores: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .context("invalid discovery pattern")?
            .filter_map(|entry| entry.ok())
            .collect();
        stores.sort();

        if stores.is_empty() {
            bail!(
                "no RecoveryStore files found in `{}`",
                self.input.display()
            );
        }

        Ok(stores)
    }

    fn render_tabs(&mut self, reports: &[TabReport]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.output, reports)?;
                writeln!(self.output)?;
            }
            OutputFormat::Text => {
                for report in reports {
                    render_tab_text(&mut self.output, report)?;
                }
            }
        }
        Ok(())
    }

    fn render_session(&mut self, report: &SessionReport) -> Result<()> {
        let out = &mut self.output;
        writeln!(out, "\n[+] Parsing '{}'", report.source.display())?;

        let session = match (&report.session, &report.error) {
            (Some(session), _) => session,
            (None, error) => {
                writeln!(
                    out,
                    "\n  [-] Unable to parse file: {}",
                    error.as_deref().unwrap_or("unknown error")
                )?;
                return Ok(());
            }
        };

        writeln!(out)?;
        if session.private_browsing {
            writeln!(out, "  InPrivate Browsing Detected")?;
        }
        writeln!(out, "  Opened: {} UTC", format_time(session.opened_at))?;
        if session.closed_at != session.opened_at {
            writeln!(out, "  Closed: {} UTC", format_time(session.closed_at))?;
        }

        writeln!(out, "\n   Open Tabs:")?;
        for tab in report.tabs.iter().filter(|tab| !tab.closed) {
            render_tab_text(out, tab)?;
        }

        writeln!(out, "\n   Closed Tabs:")?;
        for tab in report.tabs.iter().filter(|tab| tab.closed) {
            render_tab_text(out, tab)?;
        }

        Ok(())
    }
}

/// Decodes one recovery store and every tab it points at. Failures land in
/// the report; sibling stores and tabs are never affected.
fn dump_session(store: &Path, options: &DecodeOptions) -> SessionReport {
    let session = match decode_session(store) {
        Ok(session) => session,
        Err(error) => {
            return SessionReport {
                source: store.to_path_buf(),
                session: None,
                error: Some(error.to_string()),
                tabs: Vec::new(),
            };
        }
    };

    let directory = store.parent().unwrap_or_else(|| Path::new("."));
    let mut tabs = Vec::new();
    for (ids, closed) in [(&session.open_tabs, false), (&session.closed_tabs, true)] {
        for &id in ids {
            let path = directory.join(format!("{{{id}}}.dat"));
            tabs.push(dump_tab(&path, closed, options));
        }
    }

    SessionReport {
        source: store.to_path_buf(),
        session: Some(session),
        error: None,
        tabs,
    }
}

fn dump_tab(path: &Path, closed: bool, options: &DecodeOptions) -> TabReport {
    match decode_tab(path, options) {
        Ok(tab) => TabReport {
            id: tab.id,
            closed,
            tab: Some(tab),
            error: None,
        },
        Err(error) => TabReport {
            id: Guid::nil(),
            closed,
            tab: None,
            error: Some(error.to_string()),
        },
    }
}

fn render_tab_text(out: &mut dyn Write, report: &TabReport) -> Result<()> {
    let tab = match (&report.tab, &report.error) {
        (Some(tab), _) => tab,
        (None, error) => {
            writeln!(
                out,
                "\n     [-] Unable to parse tab: {}",
                error.as_deref().unwrap_or("unknown error")
            )?;
            return Ok(());
        }
    };

    writeln!(
        out,
        "\n     [+] Parsing '{}'\n",
        tab.source
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default()
    )?;
    writeln!(out, "       Created: {} UTC", format_time(tab.created_at))?;
    if let Some(current) = tab.current_page {
        writeln!(out, "       Current Page: {current}")?;
    }

    for page in &tab.pages {
        if let Some(url) = &page.url {
            writeln!(out, "       Page {}: {url}", page.index)?;
        }
        if let Some(title) = &page.title {
            writeln!(out, "         Title: {title}")?;
        }
        for string in &page.all_strings {
            writeln!(out, "         String: {string}")?;
        }
    }

    for error in &tab.page_errors {
        writeln!(
            out,
            "       [-] Page stream `{}` unreadable: {}",
            error.stream, error.message
        )?;
    }

    if !tab.navigation_order.is_empty() {
        let order: Vec<String> = tab
            .navigation_order
            .iter()
            .map(|step| step.to_string())
            .collect();
        writeln!(out, "\n       Page Order: {}", order.join(", "))?;
    }

    Ok(())
}

fn format_time(time: Option<jiff::Timestamp>) -> String {
    match time {
        Some(time) => time.strftime("%m/%d/%Y %H:%M:%S").to_string(),
        None => "Unknown".to_owned(),
    }
}

fn main() {
    let matches = command().get_matches();

    let mut app = match AcrDump::from_cli_matches(&matches) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{e:#}");
            exit(1);
        }
    };

    if let Err(e) = app.run() {
        eprintln!("{e:#}");
        exit(1);
    }
}
