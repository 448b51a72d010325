mod config;
mod dialog;
mod input;
mod view;

use std::{
    io::{self, BufRead},
    process,
    sync::Arc,
    thread,
};

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use env_logger::{Builder, Env};

use playbacker_core::{
    api::{RemoteHandle, WebApi},
    error::Error,
    persist::{FileStorage, MemoryStorage},
    sse::SseWatch,
    store::{Dispatch, PoolDispatch, Store, StoreCommand, StoreEvent},
};

use crate::{
    config::Config,
    dialog::TerminalDialog,
    input::{parse_command, Command, HELP},
};

const ENV_LOG: &str = "PLAYBACKER_LOG";
const ENV_LOG_STYLE: &str = "PLAYBACKER_LOG_STYLE";

fn main() {
    // Setup logging from the env variables, with defaults.
    Builder::from_env(
        Env::new()
            .filter_or(ENV_LOG, "info")
            .write_style(ENV_LOG_STYLE),
    )
    .init();

    let config = Config::load().unwrap_or_default();

    if let Err(err) = start(config) {
        log::error!("{}", err);
        process::exit(1);
    }
}

fn start(config: Config) -> Result<(), Error> {
    log::info!("using server {}", config.server_url);
    let proxy = Config::proxy();
    let remote: RemoteHandle = Arc::new(WebApi::new(&config.server_url, proxy.as_deref())?);
    let watch = SseWatch::new(&config.server_url, proxy.as_deref())?;
    let storage = match Config::selection_path() {
        Some(path) => FileStorage::open(path),
        None => {
            log::warn!("no config directory, selection will not be kept");
            MemoryStorage::new()
        }
    };

    let lines = read_lines();
    let workers = config.workers;
    let mut store = Store::new(
        storage,
        Box::new(TerminalDialog::new(lines.clone())),
        Box::new(watch),
        move |events: Sender<StoreEvent>| -> Box<dyn Dispatch> {
            Box::new(PoolDispatch::new(workers, remote, events))
        },
    );
    store.start();
    println!("{}", view::render(&store));

    let events = store.receiver();
    loop {
        select! {
            recv(lines) -> line => {
                let Ok(line) = line else {
                    break;
                };
                match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(command) => run_command(&mut store, command),
                    None if line.trim().is_empty() => {}
                    None => log::warn!("unknown command {:?}, try \"help\"", line),
                }
            }
            recv(events) -> event => {
                let Ok(event) = event else {
                    break;
                };
                store.handle(event);
            }
        }
        println!("{}", view::render(&store));
    }

    Ok(())
}

fn run_command(store: &mut Store, command: Command) {
    match command {
        Command::Store(cmd) => {
            store.handle(StoreEvent::Command(cmd));
        }
        Command::SelectPosition(position) => match store.songs().get(position).cloned() {
            Some(song) => {
                store.handle(StoreEvent::Command(StoreCommand::SelectSong(Some(song))));
            }
            None => {
                log::warn!("no song at position {}", position + 1);
            }
        },
        Command::ListSetlists => {
            println!("{}", view::render_setlists(store));
        }
        Command::Refresh => {
            store.handle(StoreEvent::Command(StoreCommand::RefetchSetlists));
            store.handle(StoreEvent::Command(StoreCommand::RefetchSetlist));
        }
        Command::Help => {
            println!("{}", HELP);
        }
        Command::Quit => {}
    }
}

/// Stdin lines, read on a separate thread.  The channel disconnects at the end
/// of input.
fn read_lines() -> Receiver<String> {
    let (sender, receiver) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::error!("failed to read input: {}", err);
                    break;
                }
            }
        }
    });
    receiver
}
