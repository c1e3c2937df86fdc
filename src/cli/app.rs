//! CLI module for the draftpress application
//!
//! This module handles the command-line interface for composing drafts and
//! publishing them through a [`Session`].
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
};

use log::info;
use shell_words::split;
use tempfile::Builder;
use tokio::io::BufReader;

use crate::{
    content_preview, Commands, Config, Draft, DraftError, Notice, NoticeLevel, RemoteCommands,
    RemoteFile, Result, Session, Shell,
};

/// CLI Application handler - processes CLI commands and drives a Session
pub struct App {
    /// Drafts, remote listing and publish workflow
    session: Session,

    /// Application configuration
    config: Config,

    /// Where `config` was loaded from
    config_path: PathBuf,

    /// Whether to display verbose output
    verbose: bool,
}

/// Prints a notice in its level's colour
pub fn print_notice(notice: &Notice) {
    let styled = match notice.level {
        NoticeLevel::Success => console::style(&notice.message).green(),
        NoticeLevel::Info => console::style(&notice.message).cyan(),
        NoticeLevel::Error => console::style(&notice.message).red(),
    };
    println!("{}", styled);
}

/// Prints successes and information; turns an error notice into an `Err`
fn report(notice: Notice) -> Result<()> {
    if notice.is_error() {
        return Err(DraftError::ApplicationError {
            message: notice.message,
        });
    }
    print_notice(&notice);
    Ok(())
}

/// Splits editor output into a `# ` title line and the remaining body,
/// dropping HTML comments
pub fn parse_editor_document(content: &str) -> (Option<String>, String) {
    let mut title = None;
    let mut body_lines: Vec<&str> = Vec::new();
    let mut in_comment = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if in_comment {
            in_comment = !trimmed.ends_with("-->");
            continue;
        }
        if trimmed.starts_with("<!--") {
            in_comment = !trimmed.ends_with("-->");
            continue;
        }
        if title.is_none() && body_lines.iter().all(|l| l.trim().is_empty()) {
            if let Some(heading) = trimmed.strip_prefix("# ") {
                title = Some(heading.trim().to_string());
                body_lines.clear();
                continue;
            }
        }
        body_lines.push(line);
    }

    (title, body_lines.join("\n").trim().to_string())
}

impl App {
    /// Create a new CLI application from a loaded configuration
    pub fn new(config: Config, config_path: PathBuf, verbose: bool) -> Result<Self> {
        let session = Session::from_config(&config)?;
        Ok(Self {
            session,
            config,
            config_path,
            verbose,
        })
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Add { title, body, file } => self.handle_add(title, body, file)?,

            Commands::Edit {
                id,
                title,
                body,
                file,
            } => self.handle_edit(id, title, body, file)?,

            Commands::Delete { id, force } => self.handle_delete(id, force).await?,

            Commands::List { json, detailed } => self.list_drafts(json, detailed)?,

            Commands::Preview { id, html } => self.handle_preview(&id, html)?,

            Commands::Publish { id, force } => {
                self.config.remote.require_repository()?;
                report(self.session.request_publish(&id))?;
                self.confirm_pending(force).await?;
            }

            Commands::PublishAll { force } => {
                self.config.remote.require_repository()?;
                report(self.session.request_publish_all())?;
                self.confirm_pending(force).await?;
            }

            Commands::Remote(remote) => {
                self.config.remote.require_repository()?;
                self.handle_remote(remote).await?;
            }

            Commands::Shell => {
                let input = BufReader::new(tokio::io::stdin());
                let mut output = stdout();
                Shell::new(&mut self.session).run(input, &mut output).await?;
            }

            Commands::Config { show, set, reset } => self.handle_config(show, set, reset)?,
        }

        Ok(())
    }

    fn handle_add(
        &mut self,
        title: Option<String>,
        body: Option<String>,
        file: Option<PathBuf>,
    ) -> Result<()> {
        let body = match (body, file) {
            (Some(b), _) => Some(b),
            (None, Some(path)) => Some(self.read_content_from_file(&path)?),
            (None, None) => None,
        };

        let (title, body) = match (title, body) {
            (Some(t), Some(b)) => (t, b),
            (title, body) => {
                let seed_title = title.clone().unwrap_or_default();
                let edited = self.open_editor_with_content(&seed_title, body.as_deref().unwrap_or(""))?;
                let (edited_title, edited_body) = parse_editor_document(&edited);
                (edited_title.or(title).unwrap_or_default(), edited_body)
            }
        };

        report(self.session.add_draft(&title, &body))
    }

    fn handle_edit(
        &mut self,
        id: String,
        title: Option<String>,
        body: Option<String>,
        file: Option<PathBuf>,
    ) -> Result<()> {
        if body.is_some() && file.is_some() {
            return Err(DraftError::ApplicationError {
                message: "Cannot specify both --body and --file options".to_string(),
            });
        }

        report(self.session.start_edit(&id))?;
        let Some(draft) = self.session.store().get(&id) else {
            self.session.cancel_edit();
            return Err(DraftError::DraftNotFound { id });
        };

        let edited = match (title, body, file) {
            (title, Some(b), _) => Ok((title.unwrap_or(draft.title.clone()), b)),
            (title, None, Some(path)) => self
                .read_content_from_file(&path)
                .map(|b| (title.unwrap_or(draft.title.clone()), b)),
            (Some(t), None, None) => Ok((t, draft.body.clone())),
            (None, None, None) => self
                .open_editor_with_content(&draft.title, &draft.body)
                .map(|content| {
                    let (t, b) = parse_editor_document(&content);
                    (t.unwrap_or(draft.title.clone()), b)
                }),
        };

        match edited {
            Ok((title, body)) => report(self.session.finish_edit(&title, &body)),
            Err(e) => {
                self.session.cancel_edit();
                Err(e)
            }
        }
    }

    async fn handle_delete(&mut self, id: Option<String>, force: bool) -> Result<()> {
        let notice = match id {
            Some(id) => self.session.request_delete(&id),
            None => self
                .session
                .request_delete_latest()
                .unwrap_or_else(|| Notice::error("No drafts to delete")),
        };
        report(notice)?;
        self.confirm_pending(force).await
    }

    /// Asks the user about the pending confirmation, unless forced
    async fn confirm_pending(&mut self, force: bool) -> Result<()> {
        let Some(pending) = self.session.pending_confirmation() else {
            return Ok(());
        };

        if !force {
            if let Some(draft) = &pending.target {
                self.print_draft_summary(draft);
            }

            print!("Are you sure? [y/N]: ");
            stdout().flush().map_err(DraftError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(DraftError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                print_notice(&self.session.cancel_confirmation());
                return Ok(());
            }
        }

        let notices = self.session.confirm().await;
        let failed = notices.iter().filter(|n| n.is_error()).count();
        for notice in &notices {
            print_notice(notice);
        }

        if failed > 0 {
            return Err(DraftError::ApplicationError {
                message: format!("{} action(s) failed", failed),
            });
        }
        Ok(())
    }

    fn print_draft_summary(&self, draft: &Draft) {
        println!("ID:      {}", draft.id);
        println!("Title:   {}", draft.title);
        println!("File:    {}", draft.remote_filename());
        println!("Created: {}", draft.created_at.format("%Y-%m-%d %H:%M:%S"));
        let preview = content_preview(&draft.body, 100);
        if !preview.is_empty() {
            println!("\n{}\n", preview);
        }
    }

    /// Display drafts in the requested format
    fn list_drafts(&self, json: bool, detailed: bool) -> Result<()> {
        let drafts = self.session.store().list();
        if drafts.is_empty() {
            println!("No local drafts.");
            return Ok(());
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&drafts)?);
            return Ok(());
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, draft) in drafts.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            println!(
                "ID: {} | Created: {}",
                draft.id,
                draft.created_at.format("%Y-%m-%d %H:%M")
            );
            println!("Title: {}", console::style(&draft.title).bold());
            println!("File:  {}", console::style(draft.remote_filename()).cyan());

            if detailed || self.verbose {
                println!("\n{}", draft.body);
            } else {
                let preview = content_preview(&draft.body, 100);
                if !preview.is_empty() {
                    println!("\n{}", preview);
                }
            }
        }

        println!(
            "\n{} draft{}",
            drafts.len(),
            if drafts.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    fn handle_preview(&self, id: &str, html: bool) -> Result<()> {
        let draft = self
            .session
            .store()
            .get(id)
            .ok_or_else(|| DraftError::DraftNotFound { id: id.to_string() })?;

        print_document(&draft.render_document(), html);
        Ok(())
    }

    async fn handle_remote(&mut self, command: RemoteCommands) -> Result<()> {
        report(self.session.refresh().await)?;

        match command {
            RemoteCommands::List { json } => {
                let files = self.session.listing().files();
                if json {
                    println!("{}", serde_json::to_string_pretty(&files)?);
                } else {
                    print_remote_files(&files);
                }
            }
            RemoteCommands::Show { name, html } => {
                let file = self.session.listing().find(&name).ok_or_else(|| {
                    DraftError::ApplicationError {
                        message: format!("No published file named {}", name),
                    }
                })?;
                print_document(&file.content, html);
            }
        }
        Ok(())
    }

    fn handle_config(&mut self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        // `self.config` carries environment overrides; writes go through the
        // file-backed config only
        if reset {
            Config::default().save(&self.config_path)?;
            println!("Configuration reset to defaults.");
        }

        let changed = reset || set.is_some();
        if let Some(assignment) = set {
            Config::set_in_file(&self.config_path, &assignment)?;
            println!("Updated {}", assignment.split('=').next().unwrap_or_default());
        }
        if changed {
            self.config = Config::load(&self.config_path)?;
        }

        if show || !changed {
            let mut shown = self.config.clone();
            if shown.remote.token.is_some() {
                shown.remote.token = Some("********".to_string());
            }
            println!("# {}", self.config_path.display());
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }

        Ok(())
    }

    fn read_content_from_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(DraftError::ApplicationError {
                message: format!("Not a file: {}", path.display()),
            });
        }
        read_to_string(path).map_err(DraftError::Io)
    }

    /// Opens the editor on a Markdown template and returns what was saved
    fn open_editor_with_content(&self, title: &str, body: &str) -> Result<String> {
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        {
            let mut file = OpenOptions::new().write(true).open(&temp_path)?;
            writeln!(file, "# {}", title)?;
            writeln!(file)?;
            writeln!(file, "<!-- ")?;
            writeln!(file, "The first '# ' line is the draft title; everything below is the body.")?;
            writeln!(file, "Lines that start with <!-- and end with --> are ignored.")?;
            writeln!(file, "-->")?;
            writeln!(file)?;
            write!(file, "{}", body)?;
        }

        let editor_cmd = self.config.get_editor_command();
        info!("Opening editor to write the draft. Save and exit when done...");
        launch_editor(&editor_cmd, &temp_path)?;

        Ok(read_to_string(&temp_path)?)
    }
}

fn launch_editor(editor_cmd: &str, file_path: &Path) -> Result<()> {
    let args = split(editor_cmd).map_err(|e| DraftError::EditorError {
        message: format!("Failed to parse editor command: {}", e),
    })?;

    let Some((program, rest)) = args.split_first() else {
        return Err(DraftError::EditorError {
            message: "Empty editor command".to_string(),
        });
    };

    let status = Command::new(program)
        .args(rest)
        .arg(file_path.as_os_str())
        .status()?;

    if !status.success() {
        return Err(DraftError::EditorError {
            message: "Editor exited with non-zero status".to_string(),
        });
    }

    Ok(())
}

/// Prints Markdown as-is, or rendered to HTML
pub fn print_document(markdown: &str, html: bool) {
    if html {
        let parser = pulldown_cmark::Parser::new(markdown);
        let mut rendered = String::new();
        pulldown_cmark::html::push_html(&mut rendered, parser);
        println!("{}", rendered);
    } else {
        println!("{}", markdown);
    }
}

pub fn print_remote_files(files: &[RemoteFile]) {
    if files.is_empty() {
        println!("No published drafts.");
        return;
    }
    for file in files {
        println!(
            "{}  {}",
            console::style(&file.name).bold(),
            content_preview(&file.content, 60)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_document_splits_title_and_body() {
        let content = "# My Title\n\n<!-- \nhelp text\n-->\n\nFirst line\n<!-- note -->\nSecond line\n";
        let (title, body) = parse_editor_document(content);
        assert_eq!(title.as_deref(), Some("My Title"));
        assert_eq!(body, "First line\nSecond line");
    }

    #[test]
    fn later_headings_stay_in_body() {
        let (title, body) = parse_editor_document("# Title\n\nIntro\n# Section\ntext");
        assert_eq!(title.as_deref(), Some("Title"));
        assert_eq!(body, "Intro\n# Section\ntext");
    }

    #[test]
    fn missing_heading_gives_no_title() {
        let (title, body) = parse_editor_document("just a body");
        assert_eq!(title, None);
        assert_eq!(body, "just a body");
    }
}
