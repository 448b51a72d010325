//! Paths of the playback server, relative to its base URL.

pub const GET_SETLISTS: &str = "getSetlists";
pub const GET_SETLIST: &str = "getSetlist";
pub const TOGGLE_PLAYING: &str = "togglePlaying";
pub const TOGGLE_GUIDE_ENABLED: &str = "toggleGuideEnabled";
pub const PREPARE_FOR_SWITCH: &str = "prepareForSwitch";
pub const RESET: &str = "reset";

/// Server-sent events, one connection per scope.
pub const WATCH: &str = "watch";

pub const SETLIST_NAME_QUERY: &str = "name";
pub const WATCH_SCOPE_QUERY: &str = "setlist";
