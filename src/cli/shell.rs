//! Interactive line-based shell over a single [`Session`].
//!
//! Unlike one-shot commands, the shell keeps the edit lock, the pending
//! confirmation and the remote listing alive between inputs.
use std::io::Write;

use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::{content_preview, Notice, NoticeLevel, Result, Session};

const HELP: &str = "\
Commands:
  list                 show local drafts
  add                  compose a new draft
  edit <id>            start editing a draft
  save                 enter the new title and body for the draft being edited
  cancel               stop editing without saving
  delete <id>          delete a draft
  del                  delete the most recent draft
  publish <id>         publish one draft
  publish-all          publish every draft
  refresh              reload published files
  remote               list published files
  show <name>          print a published file
  help                 show this help
  quit                 leave the shell";

pub struct Shell<'a> {
    session: &'a mut Session,
}

fn write_notice<W: Write>(out: &mut W, notice: &Notice) -> Result<()> {
    let marker = match notice.level {
        NoticeLevel::Success => "+",
        NoticeLevel::Info => "*",
        NoticeLevel::Error => "!",
    };
    writeln!(out, "{} {}", marker, notice)?;
    Ok(())
}

async fn prompt<R, W>(lines: &mut Lines<R>, out: &mut W, label: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{}", label)?;
    out.flush()?;
    Ok(lines.next_line().await?)
}

/// Reads body lines up to a line holding a single `.`
async fn read_body<R, W>(lines: &mut Lines<R>, out: &mut W) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Body (end with a line containing only '.'):")?;
    let mut body = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "." {
            break;
        }
        body.push(line);
    }
    Ok(body.join("\n"))
}

impl<'a> Shell<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Reads commands until `quit` or end of input
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        writeln!(out, "draftpress shell. Type 'help' for commands.")?;

        loop {
            let Some(line) = prompt(&mut lines, out, "> ").await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (command, arg) = match line.split_once(char::is_whitespace) {
                Some((command, arg)) => (command, arg.trim()),
                None => (line, ""),
            };
            debug!("Shell command: {}", command);

            match command {
                "quit" | "exit" => break,
                "help" => writeln!(out, "{}", HELP)?,
                "list" => self.list(out)?,
                "add" => {
                    let Some(title) = prompt(&mut lines, out, "Title: ").await? else {
                        break;
                    };
                    let body = read_body(&mut lines, out).await?;
                    write_notice(out, &self.session.add_draft(title.trim(), &body))?;
                }
                "edit" => write_notice(out, &self.session.start_edit(arg))?,
                "save" => {
                    let Some(title) = prompt(&mut lines, out, "Title: ").await? else {
                        break;
                    };
                    let body = read_body(&mut lines, out).await?;
                    write_notice(out, &self.session.finish_edit(title.trim(), &body))?;
                }
                "cancel" => write_notice(out, &self.session.cancel_edit())?,
                "delete" => write_notice(out, &self.session.request_delete(arg))?,
                "del" => {
                    if let Some(notice) = self.session.request_delete_latest() {
                        write_notice(out, &notice)?;
                    }
                }
                "publish" => write_notice(out, &self.session.request_publish(arg))?,
                "publish-all" => write_notice(out, &self.session.request_publish_all())?,
                "refresh" => write_notice(out, &self.session.refresh().await)?,
                "remote" => self.remote(out)?,
                "show" => match self.session.listing().find(arg) {
                    Some(file) => writeln!(out, "{}", file.content)?,
                    None => write_notice(
                        out,
                        &Notice::error(format!("No published file named {}", arg)),
                    )?,
                },
                other => write_notice(
                    out,
                    &Notice::error(format!("Unknown command: {}", other)),
                )?,
            }

            if self.session.pending_confirmation().is_some() {
                let Some(answer) = prompt(&mut lines, out, "Confirm? [y/N]: ").await? else {
                    self.session.cancel_confirmation();
                    break;
                };
                let answer = answer.trim().to_lowercase();
                if answer == "y" || answer == "yes" {
                    for notice in self.session.confirm().await {
                        write_notice(out, &notice)?;
                    }
                } else {
                    write_notice(out, &self.session.cancel_confirmation())?;
                }
            }
        }

        Ok(())
    }

    fn list<W: Write>(&self, out: &mut W) -> Result<()> {
        let drafts = self.session.store().list();
        if drafts.is_empty() {
            writeln!(out, "No local drafts.")?;
        }
        let editing = self.session.gate().editing();
        for draft in drafts {
            let marker = if editing == Some(draft.id.as_str()) { "*" } else { " " };
            writeln!(
                out,
                "{} {}  {}  {}",
                marker,
                draft.id,
                draft.title,
                content_preview(&draft.body, 40)
            )?;
        }
        Ok(())
    }

    fn remote<W: Write>(&self, out: &mut W) -> Result<()> {
        let listing = self.session.listing();
        if listing.is_loading() {
            writeln!(out, "Loading...")?;
        }
        if let Some(error) = listing.error() {
            write_notice(out, &Notice::error(error))?;
        }
        let files = listing.files();
        if files.is_empty() {
            writeln!(out, "No published drafts. Try 'refresh'.")?;
        }
        for file in files {
            writeln!(out, "  {}  {}", file.name, content_preview(&file.content, 40))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::remote::memory::MemoryRemote;
    use crate::remote::RemoteStore;
    use crate::{Committer, DraftStore, MemoryPersistence, PublishSettings};

    fn session() -> (Session, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let store = Arc::new(DraftStore::open(Box::new(MemoryPersistence::new())));
        let settings = PublishSettings {
            folder: "drafts".to_string(),
            branch: "main".to_string(),
            committer: Committer::default(),
        };
        let dyn_remote: Arc<dyn RemoteStore> = remote.clone();
        (Session::new(store, dyn_remote, settings), remote)
    }

    async fn run_script(session: &mut Session, script: &str) -> String {
        let mut out = Vec::new();
        Shell::new(session)
            .run(script.as_bytes(), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn add_then_delete_key_with_confirmation() {
        let (mut session, _) = session();
        run_script(&mut session, "add\nFirst\nline one\nline two\n.\nadd\nSecond\nmore\n.\n").await;
        assert_eq!(session.store().len(), 2);
        assert_eq!(session.store().list()[1].body, "line one\nline two");

        let out = run_script(&mut session, "del\nn\ndel\ny\nquit\n").await;
        assert!(out.contains("Delete \"Second\"?"));
        assert!(out.contains("\"Second\" deleted successfully!"));

        let titles: Vec<_> = session.store().list().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["First"]);
    }

    #[tokio::test]
    async fn editing_blocks_publish_until_saved() {
        let (mut session, remote) = session();
        run_script(&mut session, "add\nPost\nbody\n.\n").await;
        let id = session.store().first().unwrap().id;

        let script = format!("edit {id}\npublish {id}\nsave\nPost v2\nnew body\n.\npublish {id}\ny\n");
        let out = run_script(&mut session, &script).await;

        assert!(out.contains("! Finish editing \"Post\" first"));
        assert!(out.contains("\"Post v2\" published successfully!"));
        assert!(session.store().is_empty());
        assert!(remote.file("drafts/Post_v2.md").is_some());
    }

    #[tokio::test]
    async fn refresh_and_show_published_file() {
        let (mut session, remote) = session();
        remote.insert_file("drafts/Note.md", "# Note\n\nhello");

        let out = run_script(&mut session, "refresh\nremote\nshow Note.md\nbogus\n").await;
        assert!(out.contains("1 published file(s)"));
        assert!(out.contains("# Note\n\nhello"));
        assert!(out.contains("Unknown command: bogus"));
    }
}
