use playbacker_core::{
    protocol::Song,
    resource::{Resource, ResourceState},
    store::Store,
};

/// Text view of the whole store.
pub fn render(store: &Store) -> String {
    let mut lines = Vec::new();

    let active = store.setlist_name();
    let names = match store.setlists().value() {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| {
                if Some(name.as_str()) == active {
                    format!("[{}]", name)
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(_) => "(none)".to_owned(),
        None => String::new(),
    };
    lines.push(with_status("Setlists:", &names, store.setlists()));

    match active {
        Some(name) => {
            lines.push(with_status(&format!("Setlist {}:", name), "", store.setlist()));
            let current = store.song().map(|song| song.name.as_str());
            for (i, song) in store.songs().iter().enumerate() {
                let marker = if Some(song.name.as_str()) == current {
                    '>'
                } else {
                    ' '
                };
                lines.push(format!(" {} {:>2}. {}", marker, i + 1, describe_song(song)));
            }
        }
        None => lines.push("No setlist open".to_owned()),
    }

    match store.song() {
        Some(song) => lines.push(format!("Song: {}", describe_song(song))),
        None => lines.push("Song: -".to_owned()),
    }
    lines.push(format!(
        "Playing: {}  Guide: {}{}",
        if store.playing() { "yes" } else { "no" },
        if store.guide_enabled() { "on" } else { "off" },
        if store.is_watching() {
            ""
        } else {
            "  (live updates off)"
        },
    ));

    lines.join("\n")
}

/// Numbered list of the setlist catalog.
pub fn render_setlists(store: &Store) -> String {
    match store.setlists().value() {
        Some(names) if !names.is_empty() => names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{:>3}. {}", i + 1, name))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(_) => "No setlists".to_owned(),
        None => with_status("Setlists:", "", store.setlists()),
    }
}

fn describe_song(song: &Song) -> String {
    if song.artist.is_empty() {
        format!("{} ({})", song.name, song.tempo)
    } else {
        format!("{} - {} ({})", song.name, song.artist, song.tempo)
    }
}

fn with_status<K: Clone + PartialEq, V>(
    label: &str,
    body: &str,
    resource: &Resource<K, V>,
) -> String {
    let status = match resource.state() {
        ResourceState::Loading => Some("loading...".to_owned()),
        ResourceState::Rejected => resource.error().map(|err| format!("error: {}", err)),
        ResourceState::Empty | ResourceState::Resolved => None,
    };
    [label, body, status.as_deref().unwrap_or_default()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
