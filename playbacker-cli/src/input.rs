use playbacker_core::store::StoreCommand;

#[derive(Debug, PartialEq)]
pub enum Command {
    Store(StoreCommand),
    /// Select the song at a 0-based position of the loaded setlist.
    SelectPosition(usize),
    ListSetlists,
    Refresh,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  space, p     toggle playing
  g            toggle guide
  r            reset
  n, >         next song
  b, <         previous song
  <number>     select song
  l            list setlists
  o <name>     open setlist
  c            close setlist
  refresh      reload setlists
  q            quit";

/// Parse one input line.  Returns `None` for blank or unknown input.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.is_empty() && line.trim().is_empty() {
        return Some(Command::Store(StoreCommand::TogglePlaying));
    }
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word {
        "space" | "p" => Command::Store(StoreCommand::TogglePlaying),
        "g" => Command::Store(StoreCommand::ToggleGuideEnabled),
        "r" => Command::Store(StoreCommand::Reset),
        "n" | ">" => Command::Store(StoreCommand::NextSong),
        "b" | "<" => Command::Store(StoreCommand::PreviousSong),
        "c" => Command::Store(StoreCommand::SelectSetlist(None)),
        "o" if !rest.is_empty() => {
            Command::Store(StoreCommand::SelectSetlist(Some(rest.to_owned())))
        }
        "l" => Command::ListSetlists,
        "refresh" => Command::Refresh,
        "h" | "?" | "help" => Command::Help,
        "q" | "quit" => Command::Quit,
        number => match number.parse::<usize>() {
            Ok(position) if position > 0 => Command::SelectPosition(position - 1),
            _ => return None,
        },
    };
    Some(command)
}

/// Parse a yes/no answer.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
