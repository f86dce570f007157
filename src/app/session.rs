//! Session coordinator: one loaded content item, its tree, its queue.

use std::io::{self, BufRead, Write};

use tracing::{info, warn};

use crate::config::Config;
use crate::constants::QUEUE_PREVIEW_CHARS;
use crate::filing;
use crate::llms::{Answerer, DocumentSource, get_answerer};
use crate::navigator::{self, NavOutcome};
use crate::queue::{DrainOutcome, ItemFailure, QueueEngine, QueueError, QueueTarget};
use crate::state::{NodeId, Tree, TreeStore, slugify};

use super::commands::{Command, HELP_TEXT, parse_command};

pub struct Session {
    config: Config,
    store: TreeStore,
    answerer: Box<dyn Answerer>,
    queue: QueueEngine,
    /// Tree of the loaded content item; `None` until `open` succeeds.
    tree: Option<Tree>,
    /// Pending document attachment; consumed by the first successful call.
    source: Option<DocumentSource>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let store = TreeStore::new(config.data_dir.0.clone());
        let answerer = get_answerer(&config);
        Self { config, store, answerer, queue: QueueEngine::new(), tree: None, source: None }
    }

    /// The command loop. Reads lines from `input` until `exit` or EOF.
    pub fn run(&mut self, initial_source: Option<String>) -> io::Result<()> {
        println!("reader: paper Q&A assistant. Type `help` for commands.");
        if let Some(input) = initial_source {
            self.open_source(&input);
        }

        let stdin = io::stdin();
        loop {
            print!("\n❯ ");
            io::stdout().flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break; // EOF
            }
            if line.trim().is_empty() {
                continue;
            }
            if !self.dispatch(parse_command(&line))? {
                break;
            }
        }
        Ok(())
    }

    /// Handle one command. Returns `false` when the session should end.
    fn dispatch(&mut self, command: Command) -> io::Result<bool> {
        match command {
            Command::AddQuestion(question) => {
                let position = self.queue.enqueue(question, QueueTarget::NewRoot);
                println!("✓ question added (queue: {})", position);
            }
            Command::List => self.show_queue(),
            Command::Run => self.run_queue(),
            Command::Clear => match self.queue.clear() {
                Ok(dropped) => println!("✓ queue cleared ({} dropped)", dropped),
                Err(e) => println!("✗ {}", e),
            },
            Command::Tree => self.browse_tree()?,
            Command::Stats => self.show_stats(),
            Command::Save => self.save_tree(),
            Command::Open(arg) => {
                let input = match arg {
                    Some(input) => input,
                    None => prompt_line("path or URL")?,
                };
                self.open_source(&input);
            }
            Command::Help => println!("{}", HELP_TEXT),
            Command::Exit => {
                self.save_tree();
                println!("› bye");
                return Ok(false);
            }
            Command::Unknown(line) => {
                println!("! unknown command: {}", line);
                println!("› type `help` or `?` for the command list");
            }
        }
        Ok(true)
    }

    /// Load (or switch to) a content item. The active tree is saved and
    /// the queue emptied first; its items would target the wrong tree.
    fn open_source(&mut self, input: &str) {
        if input.trim().is_empty() {
            let keys = self.store.list_keys();
            if keys.is_empty() {
                println!("✗ no source given");
            } else {
                println!("✗ no source given; saved documents:");
                for key in keys {
                    println!("    {}", key);
                }
            }
            return;
        }
        self.save_tree();
        if !self.queue.is_empty() {
            match self.queue.clear() {
                Ok(dropped) => println!("! dropped {} queued question(s) from the previous document", dropped),
                Err(e) => {
                    println!("✗ {}", e);
                    return;
                }
            }
        }

        let source = DocumentSource::parse(input);
        let key = slugify(&source.title());
        match self.store.load(&key) {
            Ok(tree) => {
                info!(%key, "content item loaded");
                println!("✓ loaded \"{}\" from {} ({} nodes)", key, source.display(), tree.stats().total);
                let fresh = tree.is_empty();
                self.tree = Some(tree);
                self.source = Some(source);
                if fresh {
                    self.queue.enqueue(
                        "What is this document about?".to_string(),
                        QueueTarget::NewRoot,
                    );
                    println!("› overview question queued; type `run` to ask it");
                }
            }
            Err(e) => {
                println!("✗ {}", e);
            }
        }
    }

    fn show_queue(&self) {
        let items = self.queue.list();
        if items.is_empty() {
            println!("› queue is empty");
            return;
        }
        for (i, item) in items.iter().enumerate() {
            let preview: String = item.question.chars().take(QUEUE_PREVIEW_CHARS).collect();
            let ellipsis = if item.question.chars().count() > QUEUE_PREVIEW_CHARS { "..." } else { "" };
            let target = match item.target {
                QueueTarget::NewRoot => String::new(),
                QueueTarget::FollowUp(id) => format!("  (follow-up to {})", id),
            };
            println!("  {:>2}. {}{}{}", i + 1, preview, ellipsis, target);
        }
    }

    fn run_queue(&mut self) {
        let Some(tree) = self.tree.as_mut() else {
            println!("! no document loaded; use `open <path|url>` first");
            return;
        };
        if self.queue.is_empty() {
            println!("! queue is empty; add questions with `q: <question>`");
            return;
        }
        let total = self.queue.len();
        println!("⟳ answering {} question(s)...", total);
        match self.queue.drain(tree, &self.store, self.answerer.as_ref(), &mut self.source) {
            Ok(outcomes) => {
                for (i, outcome) in outcomes.iter().enumerate() {
                    match outcome {
                        DrainOutcome::Answered { id, question } => {
                            println!("\n[{}/{}] {}", i + 1, total, question);
                            println!("{}", "─".repeat(60));
                            if let Some(node) = tree.get(*id) {
                                println!("{}", node.answer);
                            }
                        }
                        DrainOutcome::Failed { question, failure } => {
                            println!("\n[{}/{}] {}", i + 1, total, question);
                            match failure {
                                ItemFailure::DanglingTarget(id) => {
                                    println!("✗ skipped: target node {} no longer exists", id)
                                }
                                ItemFailure::Answerer(e) => println!("✗ {}", e),
                            }
                        }
                    }
                }
                println!("\n✓ queue drained");
            }
            Err(QueueError::AlreadyRunning) => println!("✗ a drain is already in progress"),
            Err(QueueError::Store(e)) => {
                warn!(error = %e, "save during drain failed");
                println!("✗ {}", e);
            }
        }
    }

    fn browse_tree(&mut self) -> io::Result<()> {
        let Some(tree) = self.tree.as_ref() else {
            println!("! no document loaded; use `open <path|url>` first");
            return Ok(());
        };
        if tree.is_empty() {
            println!("! the tree is empty; ask something first");
            return Ok(());
        }
        let outcome = navigator::run::run(tree, &mut self.queue)?;
        match outcome {
            NavOutcome::Quit => {
                if !self.queue.is_empty() {
                    println!("› {} follow-up(s) queued; type `run` to ask them", self.queue.len());
                }
            }
            NavOutcome::FileNode(id) => self.file_node(id)?,
        }
        Ok(())
    }

    /// Filing flow: suggest a vault location, confirm, write the note.
    fn file_node(&mut self, id: NodeId) -> io::Result<()> {
        let Some(tree) = self.tree.as_ref() else { return Ok(()) };
        let Some(vault_path) = self.config.vault.path.clone() else {
            println!("! vault path not configured; set `vault.path` in config.yaml");
            return Ok(());
        };
        let structure =
            match filing::scan_vault_structure(&vault_path, &self.config.vault.assets_folder) {
                Ok(s) => s,
                Err(e) => {
                    println!("✗ vault scan failed: {}", e);
                    return Ok(());
                }
            };

        println!("⟳ analyzing placement...");
        let suggestion = filing::analyze_placement(self.answerer.as_ref(), tree, id, &structure);
        println!("  target: {}", suggestion.target_path);
        if !suggestion.reasoning.is_empty() {
            println!("  reason: {}", suggestion.reasoning);
        }
        if !suggestion.tags.is_empty() {
            println!("  tags:   {}", suggestion.tags.join(", "));
        }
        if suggestion.is_new_folder {
            println!("  ! a new folder will be created");
        }

        let answer = prompt_line("save note? [Y/n]")?;
        if answer.trim().eq_ignore_ascii_case("n") {
            println!("› cancelled");
            return Ok(());
        }
        let chain = tree.chain(id);
        match filing::write_note(&self.config.vault, &vault_path, &chain, &tree.key, &suggestion) {
            Ok(path) => println!("✓ note saved: {}", path.display()),
            Err(e) => println!("✗ {}", e),
        }
        Ok(())
    }

    fn show_stats(&self) {
        let Some(tree) = self.tree.as_ref() else {
            println!("! no document loaded");
            return;
        };
        let stats = tree.stats();
        println!("  document:   {}", tree.key);
        println!("  questions:  {}", stats.total);
        println!("  roots:      {}", stats.roots);
        println!("  follow-ups: {}", stats.follow_ups);
        println!("  max depth:  {}", stats.max_depth);
    }

    fn save_tree(&self) {
        let Some(tree) = self.tree.as_ref() else { return };
        match self.store.save(tree) {
            Ok(()) => println!("✓ tree saved"),
            Err(e) => println!("✗ {}", e),
        }
    }
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("❯ {}: ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
