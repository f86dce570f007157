//! Line command parsing for the session prompt.

/// One parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `q: <text>`: enqueue a new-root question.
    AddQuestion(String),
    /// `list`: show pending queue items.
    List,
    /// `run`: drain the queue.
    Run,
    /// `clear`: discard pending queue items.
    Clear,
    /// `tree`: open the interactive tree view.
    Tree,
    /// `stats`: tree statistics.
    Stats,
    /// `save`: persist the active tree now.
    Save,
    /// `open <path|url>`: switch to a new content item.
    Open(Option<String>),
    Help,
    Exit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("q:") {
        let question = rest.trim();
        if question.is_empty() {
            return Command::Unknown(line.to_string());
        }
        return Command::AddQuestion(question.to_string());
    }
    if let Some(rest) = line.strip_prefix("open ").or_else(|| line.strip_prefix("upload ")) {
        return Command::Open(Some(rest.trim().to_string()));
    }
    match line {
        "open" | "upload" => Command::Open(None),
        "list" => Command::List,
        "run" => Command::Run,
        "clear" => Command::Clear,
        "tree" => Command::Tree,
        "stats" => Command::Stats,
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => Command::Unknown(other.to_string()),
    }
}

pub const HELP_TEXT: &str = "\
Available commands:

  q: <question>    add a question to the queue
  list             show the question queue
  run              answer queued questions in order
  tree             browse the conversation tree
  stats            tree statistics
  save             save the tree now
  open <path|url>  load a different document
  clear            empty the question queue
  exit             quit
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_prefix_trims_text() {
        assert_eq!(
            parse_command("q:   What is attention?  "),
            Command::AddQuestion("What is attention?".into())
        );
        assert_eq!(parse_command("q:"), Command::Unknown("q:".into()));
    }

    #[test]
    fn bare_words_map_to_commands() {
        assert_eq!(parse_command("list"), Command::List);
        assert_eq!(parse_command("run"), Command::Run);
        assert_eq!(parse_command("clear"), Command::Clear);
        assert_eq!(parse_command(" tree "), Command::Tree);
        assert_eq!(parse_command("stats"), Command::Stats);
        assert_eq!(parse_command("save"), Command::Save);
        assert_eq!(parse_command("help"), Command::Help);
        assert_eq!(parse_command("?"), Command::Help);
        assert_eq!(parse_command("exit"), Command::Exit);
        assert_eq!(parse_command("quit"), Command::Exit);
    }

    #[test]
    fn open_takes_optional_argument() {
        assert_eq!(parse_command("open paper.pdf"), Command::Open(Some("paper.pdf".into())));
        assert_eq!(
            parse_command("upload https://a.b/c"),
            Command::Open(Some("https://a.b/c".into()))
        );
        assert_eq!(parse_command("open"), Command::Open(None));
    }

    #[test]
    fn anything_else_is_unknown() {
        assert_eq!(parse_command("frobnicate"), Command::Unknown("frobnicate".into()));
        assert_eq!(parse_command("runs"), Command::Unknown("runs".into()));
    }
}
