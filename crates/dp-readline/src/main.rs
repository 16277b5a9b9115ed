use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use dp_application::{
    ProjectDirectory, ProjectLoad, REPLY_FALLBACK, SendOutcome, WorkspaceCoordinator,
    WorkspaceSettings, WorkspaceView,
};
use dp_core::Gateways;
use dp_infrastructure::{ClientConfig, DpPaths, HttpGateway};

mod commands;
mod logging;
mod render;

use commands::{Command, HELP, SLASH_COMMANDS};

#[derive(Parser)]
#[command(name = "dp-agent")]
#[command(about = "Interactive client for the data processing agent", long_about = None)]
struct Cli {
    /// API base URL including the version prefix
    #[arg(long)]
    api_url: Option<String>,

    /// Project to open on start
    #[arg(long)]
    project: Option<String>,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        let mut commands: Vec<String> = SLASH_COMMANDS.iter().map(|c| c.to_string()).collect();
        commands.extend(["projects", "new-project", "open", "quit"].map(String::from));
        Self { commands }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line) && (line.starts_with('/') || !cmd.starts_with('/')))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

type LineEditor = Editor<CliHelper, DefaultHistory>;

fn pick<'a, T>(items: &'a [T], n: usize, what: &str) -> Result<&'a T> {
    items
        .get(n.saturating_sub(1))
        .ok_or_else(|| anyhow!("no {} numbered {} (there are {})", what, n, items.len()))
}

struct Repl {
    workspace: Arc<WorkspaceCoordinator>,
    directory: ProjectDirectory,
}

impl Repl {
    async fn view(&self) -> WorkspaceView {
        self.workspace.snapshot().await
    }

    async fn prompt(&self) -> String {
        let view = self.view().await;
        match (&view.project, &view.project_id) {
            (Some(project), _) => format!("{}> ", project.name),
            (None, Some(id)) => format!("{}> ", id),
            _ => "dp> ".to_string(),
        }
    }

    async fn open(&self, project_id: &str) -> Result<()> {
        match self.workspace.open_project(project_id).await? {
            ProjectLoad::NotFound => {
                self.workspace.close_project().await;
                bail!("project {} not found; use 'projects' to list projects", project_id);
            }
            ProjectLoad::Failed(reason) => {
                self.workspace.close_project().await;
                bail!("could not open project {}: {}", project_id, reason);
            }
            _ => {
                let view = self.view().await;
                render::status(&view);
                render::sessions(&view);
            }
        }
        Ok(())
    }

    async fn chat(&self, text: &str) -> Result<()> {
        println!("{}", format!("> {}", text).green());
        match self.workspace.send_message(text).await? {
            SendOutcome::Replied {
                message,
                version_id,
            } => {
                for line in message.content.lines() {
                    println!("{}", line.bright_blue());
                }
                if let Some(version_id) = version_id {
                    render::notice(format!("Created version {}", version_id));
                }
            }
            SendOutcome::Degraded(e) => {
                println!("{}", REPLY_FALLBACK.bright_blue());
                render::notice(format!("({})", e.user_message()));
            }
            SendOutcome::Discarded => render::notice("Reply arrived for an inactive session."),
        }
        Ok(())
    }

    async fn rollback(&self, n: usize, rl: &mut LineEditor) -> Result<()> {
        let view = self.view().await;
        let version = pick(&view.versions, n, "version")?;
        let target = self.workspace.request_rollback(&version.id).await?;

        println!(
            "{}",
            format!(
                "Roll back to {} ({})? A new version will be created. (yes/no)",
                target.label(),
                target.display_message()
            )
            .bright_yellow()
        );
        let confirmed = matches!(
            rl.readline("confirm> ").map(|a| a.trim().to_ascii_lowercase()).as_deref(),
            Ok("yes" | "y")
        );
        if !confirmed {
            self.workspace.cancel_rollback().await?;
            render::notice("Rollback cancelled.");
            return Ok(());
        }

        self.workspace.confirm_rollback().await?;
        let view = self.view().await;
        if let Some(head) = view.versions.first() {
            println!("{}", format!("Current version: {}", render::version_line(head)).green());
        }
        Ok(())
    }

    async fn run(&self, command: Command, rl: &mut LineEditor) -> Result<()> {
        if command.needs_project() && !self.view().await.is_open() {
            bail!("no project is open; use 'open <id>'");
        }

        match command {
            Command::Projects => render::projects(&self.directory.list().await?),
            Command::NewProject(name) => {
                let project = self.directory.create(&name, None).await?;
                println!("{}", format!("Created project {} ({})", project.name, project.id).green());
                self.open(&project.id).await?;
            }
            Command::Open(id) => self.open(&id).await?,
            Command::Close => {
                self.workspace.close_project().await;
                render::notice("Project closed.");
            }
            Command::Sessions => render::sessions(&self.view().await),
            Command::NewSession(title) => {
                let session = self.workspace.create_session(title, None).await?;
                println!("{}", format!("Started '{}'", session.display_title()).green());
            }
            Command::SelectSession(n) => {
                let view = self.view().await;
                let session = pick(&view.sessions, n, "session")?;
                self.workspace.select_session(&session.id).await?;
                render::messages(&self.view().await);
            }
            Command::Files => render::files(&self.view().await),
            Command::Upload(path) => {
                let item = self.workspace.upload_path(&path).await?;
                println!("{}", format!("Uploaded {}", render::file_line(&item)).green());
                render::profile(&self.view().await.profile);
            }
            Command::SelectFile(n) => {
                let view = self.view().await;
                let file = pick(&view.files, n, "file")?;
                render::profile(&self.workspace.select_file(&file.path).await?);
            }
            Command::Profile => render::profile(&self.view().await.profile),
            Command::RefreshProfile => render::profile(&self.workspace.refresh_profile().await?),
            Command::Versions => render::versions(&self.view().await),
            Command::Rollback(n) => self.rollback(n, rl).await?,
            Command::Compare(left, right) => {
                let view = self.view().await;
                let left = pick(&view.versions, left, "version")?;
                let right = pick(&view.versions, right, "version")?;
                let diff = self.workspace.compare_versions(&left.id, &right.id).await?;
                println!("{}", serde_json::to_string_pretty(&diff)?);
            }
            Command::Status => render::status(&self.view().await),
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
            Command::Chat(text) => self.chat(&text).await?,
        }
        Ok(())
    }
}

/// The main entry point for the dp-agent REPL.
///
/// Loads the client configuration, connects the HTTP gateway and drives one
/// workspace coordinator from a rustyline prompt. Commands run to completion
/// before the next prompt is shown.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = match logging::init() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{}", format!("Logging disabled: {}", e).yellow());
            None
        }
    };

    // ===== Backend Initialization =====
    let mut config = ClientConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
        config.validate()?;
    }
    let gateways = Gateways::from_shared(Arc::new(HttpGateway::new(&config)?));
    let repl = Repl {
        directory: ProjectDirectory::new(Arc::clone(&gateways.projects)),
        workspace: Arc::new(WorkspaceCoordinator::new(
            gateways,
            WorkspaceSettings {
                preview_limit: config.preview_limit,
                default_session_title: config.default_session_title.clone(),
            },
        )),
    };
    tracing::info!("[Repl] Using API at {}", config.api_base_url);

    // ===== REPL Setup =====
    let mut rl: LineEditor = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));
    let history_file = DpPaths::history_file().ok();
    if let Some(path) = &history_file {
        let _ = rl.load_history(path);
    }

    println!("{}", "=== dp-agent ===".bright_magenta().bold());
    println!("{}", format!("Connected to {}", config.api_base_url).bright_black());
    println!(
        "{}",
        "Type 'projects' to list projects, 'open <id>' to start, '/help' for commands, or 'quit' to exit."
            .bright_black()
    );
    println!();

    if let Some(project_id) = cli.project {
        if let Err(e) = repl.open(&project_id).await {
            render::error(e);
        }
    }

    // ===== Main REPL Loop =====
    loop {
        let prompt = repl.prompt().await;
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match Command::parse(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        render::error(e);
                        continue;
                    }
                };
                if command == Command::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if let Err(e) = repl.run(command, &mut rl).await {
                    render::error(e);
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                render::error(format!("{:?}", err));
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        if let Some(dir) = path.parent() {
            DpPaths::ensure_dir(dir)?;
        }
        let _ = rl.save_history(path);
    }

    Ok(())
}
