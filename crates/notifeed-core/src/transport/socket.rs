use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{PushChannel, PushEvent, WireFrame};

/// Capacity of the event fan-out. Slow subscribers lag rather than block the reader.
const EVENT_BUFFER: usize = 256;

/// Push channel reading newline-delimited JSON frames from a TCP socket.
/// Reconnects automatically while connected.
pub struct SocketPushChannel {
    address: String,
    reconnect_delay: Duration,
    events: broadcast::Sender<PushEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SocketPushChannel {
    pub fn new(address: impl Into<String>, reconnect_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            address: address.into(),
            reconnect_delay,
            events,
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Connect, read until the link drops, wait, repeat.
    async fn run(address: String, reconnect_delay: Duration, events: broadcast::Sender<PushEvent>) {
        let mut linked_before = false;
        loop {
            match TcpStream::connect(&address).await {
                Ok(stream) => {
                    let event = if linked_before {
                        PushEvent::Reconnected
                    } else {
                        PushEvent::Connected
                    };
                    linked_before = true;
                    info!(%address, event = event.name(), "push channel linked");
                    let _ = events.send(event);

                    if let Err(e) = Self::read_stream(stream, &events).await {
                        warn!(%address, "push stream read error: {}", e);
                    }

                    debug!(%address, "push channel link dropped");
                    let _ = events.send(PushEvent::Reconnecting);
                }
                Err(e) => {
                    debug!(%address, "push connect failed: {}", e);
                }
            }

            tokio::time::sleep(reconnect_delay).await;
        }
    }

    async fn read_stream(
        stream: TcpStream,
        events: &broadcast::Sender<PushEvent>,
    ) -> Result<(), std::io::Error> {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let frame = match serde_json::from_str::<WireFrame>(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("Failed to parse frame: {} - line: {}", e, line);
                    continue;
                }
            };

            match frame.into_push_event() {
                Ok(Some(event)) => {
                    // No subscribers is not an error: nobody is listening yet
                    let _ = events.send(event);
                }
                Ok(None) => {}
                Err(e) => debug!("Dropping undecodable arrival: {}", e),
            }
        }

        Ok(())
    }
}

impl PushChannel for SocketPushChannel {
    fn connect(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("push channel needs a tokio runtime to connect: {}", e);
                return;
            }
        };

        *task = Some(runtime.spawn(Self::run(
            self.address.clone(),
            self.reconnect_delay,
            self.events.clone(),
        )));
    }

    fn disconnect(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!(address = %self.address, "push channel disconnected");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }
}

impl Drop for SocketPushChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
