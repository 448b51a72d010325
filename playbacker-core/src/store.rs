use crossbeam_channel::{unbounded, Receiver, Sender};
use threadpool::ThreadPool;

use playbacker_protocol::{Category, PlayerState, Setlist, Song};

use crate::{
    api::{Remote, RemoteHandle},
    error::Error,
    gate::{allow_setlist_change, Dialog},
    navigation,
    persist::{Codec, Persisted, StorageHandle},
    reconcile::{PlayerAction, Reconciler},
    resource::{Resource, Ticket},
    watch::{Subscriber, Watch},
};

pub const SETLIST_NAME_KEY: &str = "setlistName";
pub const SONG_KEY: &str = "song";

#[derive(Debug, PartialEq)]
pub enum StoreCommand {
    SelectSetlist(Option<String>),
    SelectSong(Option<Song>),
    NextSong,
    PreviousSong,
    TogglePlaying,
    ToggleGuideEnabled,
    Reset,
    RefetchSetlists,
    RefetchSetlist,
}

#[derive(Debug)]
pub enum StoreEvent {
    Command(StoreCommand),
    /// Result of a setlist catalog fetch.
    SetlistsFetched {
        ticket: Ticket<()>,
        result: Result<Vec<String>, Error>,
    },
    /// Result of a fetch of a single setlist.
    SetlistFetched {
        ticket: Ticket<String>,
        result: Result<Setlist, Error>,
    },
    /// Server answer to a playback mutation.
    PlayerStateReceived {
        action: PlayerAction,
        result: Result<PlayerState, Error>,
    },
    /// The server announced a change on watch `subscription`.
    Changed {
        subscription: u64,
        category: Category,
    },
    /// Watch `subscription` ended.  Nothing more arrives from it.
    WatchClosed { subscription: u64 },
}

/// A network call issued by the store.  Running it yields the event that
/// carries its result back.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Setlists(Ticket<()>),
    Setlist(Ticket<String>),
    Player(PlayerAction),
}

impl Request {
    pub fn run(self, remote: &dyn Remote) -> StoreEvent {
        match self {
            Self::Setlists(ticket) => StoreEvent::SetlistsFetched {
                result: remote.get_setlists(),
                ticket,
            },
            Self::Setlist(ticket) => StoreEvent::SetlistFetched {
                result: remote.get_setlist(&ticket.key),
                ticket,
            },
            Self::Player(action) => StoreEvent::PlayerStateReceived {
                result: action.run(remote),
                action,
            },
        }
    }
}

/// Executes requests off the store's thread.  The resulting events must be
/// posted back to the store.
pub trait Dispatch {
    fn dispatch(&self, request: Request);
}

/// Runs requests on a worker pool against a `Remote`.
pub struct PoolDispatch {
    pool: ThreadPool,
    remote: RemoteHandle,
    events: Sender<StoreEvent>,
}

impl PoolDispatch {
    pub fn new(workers: usize, remote: RemoteHandle, events: Sender<StoreEvent>) -> Self {
        Self {
            pool: ThreadPool::with_name("request".into(), workers.max(1)),
            remote,
            events,
        }
    }
}

impl Dispatch for PoolDispatch {
    fn dispatch(&self, request: Request) {
        let remote = self.remote.clone();
        let events = self.events.clone();
        self.pool.execute(move || {
            let event = request.run(remote.as_ref());
            if events.send(event).is_err() {
                log::debug!("store is gone, dropping response");
            }
        });
    }
}

/// Client-side view of the playback server: the setlist catalog, the active
/// setlist and song, and the authoritative player flags.
///
/// The store is driven by `handle`, called on a single thread with events
/// from `receiver`.  Everything that reaches the network or the user goes
/// through `Dispatch`, `Watch` and `Dialog`.
pub struct Store {
    setlists: Resource<(), Vec<String>>,
    setlist: Resource<String, Setlist>,
    setlist_name: Persisted<String>,
    song: Persisted<Song>,
    reconciler: Reconciler,
    subscriber: Subscriber,
    dispatch: Box<dyn Dispatch>,
    dialog: Box<dyn Dialog>,
    sender: Sender<StoreEvent>,
    receiver: Receiver<StoreEvent>,
}

impl Store {
    pub fn new(
        storage: StorageHandle,
        dialog: Box<dyn Dialog>,
        watch: Box<dyn Watch>,
        dispatch: impl FnOnce(Sender<StoreEvent>) -> Box<dyn Dispatch>,
    ) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            setlists: Resource::new(),
            setlist: Resource::new(),
            setlist_name: Persisted::new(SETLIST_NAME_KEY, storage.clone(), Codec::json()),
            song: Persisted::new(SONG_KEY, storage, Codec::json()),
            reconciler: Reconciler::new(),
            subscriber: Subscriber::new(watch, sender.clone()),
            dispatch: dispatch(sender.clone()),
            dialog,
            sender,
            receiver,
        }
    }

    pub fn sender(&self) -> Sender<StoreEvent> {
        self.sender.clone()
    }

    pub fn receiver(&self) -> Receiver<StoreEvent> {
        self.receiver.clone()
    }

    /// Issue the initial fetches for the persisted selection, open the watch
    /// and establish the baseline player state.
    pub fn start(&mut self) {
        if let Some(ticket) = self.setlists.set_key(Some(())) {
            self.dispatch.dispatch(Request::Setlists(ticket));
        }
        let name = self.setlist_name.get().cloned();
        log::info!("starting with setlist {:?}", name);
        if let Some(ticket) = self.setlist.set_key(name.clone()) {
            self.dispatch.dispatch(Request::Setlist(ticket));
        }
        self.subscriber.subscribe(name);
        self.prepare_for_switch();
    }

    pub fn handle(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Command(cmd) => {
                self.handle_command(cmd);
            }
            StoreEvent::SetlistsFetched { ticket, result } => {
                if !self.setlists.update((ticket, result)) {
                    log::info!("stale setlists result received, ignoring");
                }
            }
            StoreEvent::SetlistFetched { ticket, result } => {
                self.handle_setlist_fetched(ticket, result);
            }
            StoreEvent::PlayerStateReceived { action, result } => {
                if let Err(err) = self.reconciler.receive(&action, result) {
                    self.dialog.alert(&format!("Failed to {}: {}", action, err));
                }
            }
            StoreEvent::Changed {
                subscription,
                category,
            } => {
                self.handle_changed(subscription, category);
            }
            StoreEvent::WatchClosed { subscription } => {
                self.subscriber.closed(subscription);
            }
        }
    }

    fn handle_command(&mut self, cmd: StoreCommand) {
        match cmd {
            StoreCommand::SelectSetlist(name) => {
                self.select_setlist(name);
            }
            StoreCommand::SelectSong(song) => {
                self.select_song(song);
            }
            StoreCommand::NextSong => {
                self.next_song();
            }
            StoreCommand::PreviousSong => {
                self.previous_song();
            }
            StoreCommand::TogglePlaying => {
                self.toggle_playing();
            }
            StoreCommand::ToggleGuideEnabled => {
                self.toggle_guide_enabled();
            }
            StoreCommand::Reset => {
                self.reset();
            }
            StoreCommand::RefetchSetlists => {
                self.refetch_setlists();
            }
            StoreCommand::RefetchSetlist => {
                self.refetch_setlist();
            }
        }
    }

    fn handle_setlist_fetched(&mut self, ticket: Ticket<String>, result: Result<Setlist, Error>) {
        let resolved = result.is_ok();
        if !self.setlist.update((ticket, result)) {
            log::info!("stale setlist result received, ignoring");
            return;
        }
        if resolved {
            self.reconcile_song();
        }
    }

    fn handle_changed(&mut self, subscription: u64, category: Category) {
        if !self.subscriber.is_current(subscription) {
            log::info!("stale change notification received, ignoring");
            return;
        }
        log::info!("server changed {}", category);
        match category {
            Category::Setlists => self.refetch_setlists(),
            Category::CurrentSetlist => self.refetch_setlist(),
        }
    }

    /// Keep the selected song inside the loaded setlist, falling back to its
    /// first song.
    fn reconcile_song(&mut self) {
        let Some(setlist) = self.setlist.value() else {
            return;
        };
        let current = self.song.get().map(|song| song.name.as_str());
        if current.map_or(false, |name| setlist.contains(name)) {
            return;
        }
        let first = setlist.songs.first().cloned();
        log::info!(
            "song {:?} not in setlist {:?}, selecting {:?}",
            current,
            setlist.name,
            first.as_ref().map(|song| &song.name)
        );
        self.select_song(first);
    }

    /// Make `name` the active setlist.  Leaving a playing setlist asks the
    /// user first.  Returns `true` if the selection changed.
    pub fn select_setlist(&mut self, name: Option<String>) -> bool {
        let playing = self.reconciler.playing();
        let dialog = self.dialog.as_ref();
        let changed = self.setlist_name.set_with(name, |prev, next| {
            prev == next
                || !allow_setlist_change(
                    playing,
                    prev.map(String::as_str),
                    next.map(String::as_str),
                    dialog,
                )
        });
        if !changed {
            return false;
        }

        let name = self.setlist_name.get().cloned();
        log::info!("selected setlist {:?}", name);
        if let Some(ticket) = self.setlist.set_key(name.clone()) {
            self.dispatch.dispatch(Request::Setlist(ticket));
        }
        self.subscriber.subscribe(name);
        self.select_song(None);
        true
    }

    /// Make `song` the active song.  Every change prepares the player for the
    /// switch.  Returns `true` if the selection changed.
    pub fn select_song(&mut self, song: Option<Song>) -> bool {
        if !self.song.set(song) {
            return false;
        }
        log::info!("selected song {:?}", self.song.get().map(|song| &song.name));
        self.prepare_for_switch();
        true
    }

    pub fn next_song(&mut self) -> bool {
        let next = navigation::next_song(self.songs(), self.song.get()).cloned();
        match next {
            Some(song) => self.select_song(Some(song)),
            None => false,
        }
    }

    pub fn previous_song(&mut self) -> bool {
        let previous = navigation::previous_song(self.songs(), self.song.get()).cloned();
        match previous {
            Some(song) => self.select_song(Some(song)),
            None => false,
        }
    }

    pub fn toggle_playing(&mut self) {
        match self.reconciler.toggle_playing(self.song.get()) {
            Some(action) => self.dispatch.dispatch(Request::Player(action)),
            None => log::info!("no song selected, not toggling playback"),
        }
    }

    pub fn toggle_guide_enabled(&mut self) {
        let action = self.reconciler.toggle_guide_enabled();
        self.dispatch.dispatch(Request::Player(action));
    }

    pub fn reset(&mut self) {
        let action = self.reconciler.reset();
        self.dispatch.dispatch(Request::Player(action));
    }

    fn prepare_for_switch(&mut self) {
        let action = self.reconciler.prepare_for_switch();
        self.dispatch.dispatch(Request::Player(action));
    }

    pub fn refetch_setlists(&mut self) {
        if let Some(ticket) = self.setlists.refetch() {
            self.dispatch.dispatch(Request::Setlists(ticket));
        }
    }

    pub fn refetch_setlist(&mut self) {
        if let Some(ticket) = self.setlist.refetch() {
            self.dispatch.dispatch(Request::Setlist(ticket));
        }
    }

    pub fn setlists(&self) -> &Resource<(), Vec<String>> {
        &self.setlists
    }

    pub fn setlist(&self) -> &Resource<String, Setlist> {
        &self.setlist
    }

    pub fn setlist_name(&self) -> Option<&str> {
        self.setlist_name.get().map(String::as_str)
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.get()
    }

    /// Songs of the loaded setlist, empty while it isn't loaded.
    pub fn songs(&self) -> &[Song] {
        self.setlist
            .value()
            .map(|setlist| setlist.songs.as_slice())
            .unwrap_or_default()
    }

    pub fn player_state(&self) -> PlayerState {
        self.reconciler.state()
    }

    pub fn playing(&self) -> bool {
        self.reconciler.playing()
    }

    pub fn guide_enabled(&self) -> bool {
        self.reconciler.guide_enabled()
    }

    pub fn pending_actions(&self) -> usize {
        self.reconciler.in_flight()
    }

    pub fn is_watching(&self) -> bool {
        self.subscriber.is_connected()
    }
}
