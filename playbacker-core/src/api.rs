use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use playbacker_protocol::{endpoint, PlayerState, Setlist, Tempo};

use crate::{error::Error, util::default_ureq_agent_builder};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/";

/// Request surface of the playback server.  Every mutating call answers with
/// the resulting authoritative `PlayerState`.
pub trait Remote: Send + Sync {
    fn get_setlists(&self) -> Result<Vec<String>, Error>;
    fn get_setlist(&self, name: &str) -> Result<Setlist, Error>;
    fn toggle_playing(&self, tempo: &Tempo) -> Result<PlayerState, Error>;
    fn toggle_guide_enabled(&self) -> Result<PlayerState, Error>;
    fn prepare_for_switch(&self) -> Result<PlayerState, Error>;
    fn reset(&self) -> Result<PlayerState, Error>;
}

pub type RemoteHandle = Arc<dyn Remote>;

/// `Remote` over HTTP, JSON in and out, `POST` for every call.
pub struct WebApi {
    agent: ureq::Agent,
    base: Url,
}

impl WebApi {
    pub fn new(base_url: &str, proxy_url: Option<&str>) -> Result<Self, Error> {
        Ok(Self {
            agent: default_ureq_agent_builder(proxy_url).build().into(),
            base: parse_base_url(base_url)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&impl Serialize>,
    ) -> Result<T, Error> {
        let url = self.base.join(path)?;
        log::debug!("POST {}", url);
        let mut request = self.agent.post(url.as_str());
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let mut response = match body {
            Some(body) => request.send_json(body)?,
            None => request.send_empty()?,
        };
        let value = response.body_mut().read_json()?;
        Ok(value)
    }

    fn call<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.post(path, &[], None::<&()>)
    }
}

impl Remote for WebApi {
    fn get_setlists(&self) -> Result<Vec<String>, Error> {
        self.call(endpoint::GET_SETLISTS)
    }

    fn get_setlist(&self, name: &str) -> Result<Setlist, Error> {
        self.post(
            endpoint::GET_SETLIST,
            &[(endpoint::SETLIST_NAME_QUERY, name)],
            None::<&()>,
        )
    }

    fn toggle_playing(&self, tempo: &Tempo) -> Result<PlayerState, Error> {
        self.post(endpoint::TOGGLE_PLAYING, &[], Some(tempo))
    }

    fn toggle_guide_enabled(&self) -> Result<PlayerState, Error> {
        self.call(endpoint::TOGGLE_GUIDE_ENABLED)
    }

    fn prepare_for_switch(&self) -> Result<PlayerState, Error> {
        self.call(endpoint::PREPARE_FOR_SWITCH)
    }

    fn reset(&self) -> Result<PlayerState, Error> {
        self.call(endpoint::RESET)
    }
}

/// Parse a server base URL so that relative endpoint paths join below it.
pub fn parse_base_url(base_url: &str) -> Result<Url, Error> {
    let mut base = Url::parse(base_url)?;
    if base.cannot_be_a_base() {
        return Err(Error::InvalidUrl(base_url.to_owned()));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

/// URL of the watch channel for `scope`.  No scope watches the catalog only.
pub fn watch_url(base: &Url, scope: Option<&str>) -> Result<Url, Error> {
    let mut url = base.join(endpoint::WATCH)?;
    if let Some(name) = scope {
        url.query_pairs_mut()
            .append_pair(endpoint::WATCH_SCOPE_QUERY, name);
    }
    Ok(url)
}
