//! Watch channel over server-sent events.
//!
//! Requests go through a ureq agent whose TCP connector keeps a clone of each
//! socket, so that the store's thread can shut a connection down while the
//! reader thread is blocked on it.

use std::{
    fmt,
    io::{self, BufRead, BufReader, Read, Write},
    net::{Shutdown, TcpStream},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use ureq::{
    unversioned::{
        resolver::DefaultResolver,
        transport::{
            Buffers, ConnectProxyConnector, ConnectionDetails, Connector, Either, LazyBuffers,
            NextTimeout, RustlsConnector, Transport,
        },
    },
    Agent,
};
use url::Url;

use playbacker_protocol::Category;

use crate::{
    api::{parse_base_url, watch_url},
    error::Error,
    store::StoreEvent,
    util::{default_ureq_agent_builder, NET_CONNECT_TIMEOUT},
    watch::{Channel, Watch},
};

pub struct SseWatch {
    base: Url,
    agent: Agent,
    socket: Arc<Mutex<Option<TcpStream>>>,
    opening: Mutex<()>,
}

impl SseWatch {
    pub fn new(base_url: &str, proxy_url: Option<&str>) -> Result<Self, Error> {
        let socket = Arc::new(Mutex::new(None));
        // Every watch gets a fresh connection, never one from the pool.
        let config = default_ureq_agent_builder(proxy_url)
            .max_idle_connections(0)
            .build();
        let connector = ()
            .chain(ConnectProxyConnector::default())
            .chain(WatchConnector {
                socket: socket.clone(),
            })
            .chain(RustlsConnector::default());
        Ok(Self {
            base: parse_base_url(base_url)?,
            agent: Agent::with_parts(config, connector, DefaultResolver::default()),
            socket,
            opening: Mutex::new(()),
        })
    }
}

impl Watch for SseWatch {
    fn open(
        &self,
        subscription: u64,
        scope: Option<&str>,
        events: Sender<StoreEvent>,
    ) -> Result<Box<dyn Channel>, Error> {
        let url = watch_url(&self.base, scope)?;
        let _opening = self.opening.lock();
        self.socket.lock().take();

        log::debug!("GET {}", url);
        let response = self
            .agent
            .get(url.as_str())
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .call()?;
        let stream = self.socket.lock().take().ok_or(Error::ConnectionClosed)?;

        let body = BufReader::new(response.into_body().into_reader());
        let thread = thread::spawn(move || read_events(body, subscription, events));
        Ok(Box::new(SseChannel { stream, thread }))
    }
}

struct SseChannel {
    stream: TcpStream,
    thread: JoinHandle<()>,
}

impl Channel for SseChannel {
    fn close(self: Box<Self>) {
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("watch connection already down: {}", err);
        }
        if let Err(err) = self.thread.join() {
            log::error!("watch thread panicked: {:?}", err);
        }
    }
}

/// Opens plain TCP connections and hands a clone of each socket to the watch.
#[derive(Debug)]
struct WatchConnector {
    socket: Arc<Mutex<Option<TcpStream>>>,
}

impl<In: Transport> Connector<In> for WatchConnector {
    type Out = Either<In, WatchTransport>;

    fn connect(
        &self,
        details: &ConnectionDetails,
        chained: Option<In>,
    ) -> Result<Option<Self::Out>, ureq::Error> {
        if chained.is_some() {
            return Ok(chained.map(Either::A));
        }

        let timeout = details
            .timeout
            .not_zero()
            .map(|timeout| *timeout)
            .unwrap_or(NET_CONNECT_TIMEOUT);
        let mut last_err = None;
        let mut connected = None;
        for addr in details.addrs.iter() {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(err) => {
                    log::debug!("failed to connect to {}: {}", addr, err);
                    last_err = Some(err);
                }
            }
        }
        let stream = match (connected, last_err) {
            (Some(stream), _) => stream,
            (None, Some(err)) if is_timeout(&err) => {
                return Err(ureq::Error::Timeout(details.timeout.reason))
            }
            (None, Some(err)) => return Err(err.into()),
            (None, None) => return Err(ureq::Error::HostNotFound),
        };
        if details.config.no_delay() {
            stream.set_nodelay(true)?;
        }
        *self.socket.lock() = Some(stream.try_clone()?);

        let config = details.config;
        Ok(Some(Either::B(WatchTransport {
            stream,
            buffers: LazyBuffers::new(config.input_buffer_size(), config.output_buffer_size()),
            timeout_read: None,
            timeout_write: None,
        })))
    }
}

struct WatchTransport {
    stream: TcpStream,
    buffers: LazyBuffers,
    timeout_read: Option<Duration>,
    timeout_write: Option<Duration>,
}

impl fmt::Debug for WatchTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTransport")
            .field("addr", &self.stream.peer_addr().ok())
            .finish()
    }
}

impl Transport for WatchTransport {
    fn buffers(&mut self) -> &mut dyn Buffers {
        &mut self.buffers
    }

    fn transmit_output(&mut self, amount: usize, timeout: NextTimeout) -> Result<(), ureq::Error> {
        let next = timeout.not_zero().map(|timeout| *timeout);
        if next != self.timeout_write {
            self.stream.set_write_timeout(next)?;
            self.timeout_write = next;
        }
        let output = &self.buffers.output()[..amount];
        match self.stream.write_all(output) {
            Ok(()) => Ok(()),
            Err(err) if is_timeout(&err) => Err(ureq::Error::Timeout(timeout.reason)),
            Err(err) => Err(err.into()),
        }
    }

    fn await_input(&mut self, timeout: NextTimeout) -> Result<bool, ureq::Error> {
        // No timeout while streaming the body, the watch is open indefinitely.
        let next = timeout.not_zero().map(|timeout| *timeout);
        if next != self.timeout_read {
            self.stream.set_read_timeout(next)?;
            self.timeout_read = next;
        }
        let input = self.buffers.input_append_buf();
        let amount = match self.stream.read(input) {
            Ok(amount) => amount,
            Err(err) if is_timeout(&err) => return Err(ureq::Error::Timeout(timeout.reason)),
            Err(err) => return Err(err.into()),
        };
        self.buffers.input_appended(amount);
        Ok(amount > 0)
    }

    fn is_open(&mut self) -> bool {
        // Never pooled.
        false
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    pub event: Option<String>,
    pub data: String,
}

impl Message {
    /// Category named by the event, or by the payload of an unnamed event.
    pub fn category(&self) -> Option<Category> {
        match self.event.as_deref() {
            Some(event) if event != "message" => event.parse().ok(),
            _ => self.data.parse().ok(),
        }
    }
}

/// Line-by-line server-sent events parser.
#[derive(Debug, Default)]
pub struct EventParser {
    event: Option<String>,
    data: Vec<String>,
}

impl EventParser {
    /// Feed one line without its terminator.  Returns a message once a blank
    /// line completes it.
    pub fn feed(&mut self, line: &str) -> Option<Message> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if self.event.is_none() && self.data.is_empty() {
                return None;
            }
            return Some(Message {
                event: self.event.take(),
                data: self.data.drain(..).collect::<Vec<_>>().join("\n"),
            });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {
                // `id`, `retry` and unknown fields are of no use here.
            }
        }
        None
    }
}

fn read_events(body: impl BufRead, subscription: u64, events: Sender<StoreEvent>) {
    let mut parser = EventParser::default();
    for line in body.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::debug!("watch connection error: {}", err);
                break;
            }
        };
        let Some(message) = parser.feed(&line) else {
            continue;
        };
        match message.category() {
            Some(category) => {
                log::debug!("watch message: {}", category);
                let changed = StoreEvent::Changed {
                    subscription,
                    category,
                };
                if events.send(changed).is_err() {
                    return;
                }
            }
            None => {
                log::debug!("ignored watch message: {:?}", message);
            }
        }
    }
    let _ = events.send(StoreEvent::WatchClosed { subscription });
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, net::TcpListener};

    use crossbeam_channel::unbounded;

    use super::*;

    #[test]
    fn parses_named_and_unnamed_events() {
        let mut parser = EventParser::default();
        assert_eq!(parser.feed(": keep-alive"), None);
        assert_eq!(parser.feed("event: setlists"), None);
        assert_eq!(parser.feed("data: true"), None);
        let message = parser.feed("").unwrap();
        assert_eq!(message.category(), Some(Category::Setlists));

        assert_eq!(parser.feed("id: 7"), None);
        assert_eq!(parser.feed("data: \"current_setlist\"\r"), None);
        let message = parser.feed("\r").unwrap();
        assert_eq!(message.event, None);
        assert_eq!(message.category(), Some(Category::CurrentSetlist));

        assert_eq!(parser.feed(""), None);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut parser = EventParser::default();
        parser.feed("data:a");
        parser.feed("data: b");
        let message = parser.feed("").unwrap();
        assert_eq!(message.data, "a\nb");
        assert_eq!(message.category(), None);
    }

    #[test]
    fn delivers_changes_then_close() {
        let body = Cursor::new("event: setlists\ndata: 1\n\nevent: bogus\n\nevent: current_setlist\n\n");
        let (sender, receiver) = unbounded();
        read_events(body, 3, sender);
        let events: Vec<_> = receiver.try_iter().collect();
        assert!(matches!(
            events.as_slice(),
            [
                StoreEvent::Changed {
                    subscription: 3,
                    category: Category::Setlists
                },
                StoreEvent::Changed {
                    subscription: 3,
                    category: Category::CurrentSetlist
                },
                StoreEvent::WatchClosed { subscription: 3 },
            ]
        ));
    }

    #[test]
    fn close_shuts_down_live_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = String::new();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" {
                    break;
                }
                request.push_str(&line);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\r\n")
                .unwrap();
            stream.write_all(b"event: current_setlist\n\n").unwrap();
            stream.flush().unwrap();
            // Hold the connection until the client goes away.
            let mut rest = Vec::new();
            let _ = reader.read_to_end(&mut rest);
            request
        });

        let watch = SseWatch::new(&format!("http://127.0.0.1:{}/", port), None).unwrap();
        let (sender, receiver) = unbounded();
        let channel = watch.open(9, Some("Show"), sender).unwrap();
        assert!(matches!(
            receiver.recv().unwrap(),
            StoreEvent::Changed {
                subscription: 9,
                category: Category::CurrentSetlist
            }
        ));
        channel.close();
        assert!(matches!(
            receiver.try_recv(),
            Ok(StoreEvent::WatchClosed { subscription: 9 })
        ));

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /watch?setlist=Show HTTP/1.1\r\n"));
    }

    #[test]
    fn https_watch_speaks_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut first = [0u8; 1];
            stream.read_exact(&mut first).unwrap();
            first[0]
        });

        let watch = SseWatch::new(&format!("https://127.0.0.1:{}/", port), None).unwrap();
        let (sender, _receiver) = unbounded();
        let err = watch.open(1, None, sender).err().unwrap();
        assert!(!matches!(err, Error::InvalidUrl(_)));

        // A TLS handshake record, not a plain text request line.
        assert_eq!(server.join().unwrap(), 0x16);
    }
}
