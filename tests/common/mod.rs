//! Loopback MQTT 3.1.1 broker for connected-path tests
//!
//! Accepts one client connection at a time, acknowledges CONNECT and
//! SUBSCRIBE, reports what the client sends and publishes QoS 0 messages on
//! request.

#![allow(dead_code)]

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const CONNECT: u8 = 1;
const PUBLISH: u8 = 3;
const SUBSCRIBE: u8 = 8;
const PINGREQ: u8 = 12;
const DISCONNECT: u8 = 14;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the broker saw from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
	Connected,
	Subscribed(Vec<String>),
	Published(String),
	Disconnected,
}

enum Command {
	Publish { topic: String, payload: Vec<u8> },
	DropConnection,
}

pub struct FakeBroker {
	port: u16,
	events: mpsc::UnboundedReceiver<BrokerEvent>,
	commands: mpsc::UnboundedSender<Command>,
}

impl FakeBroker {
	pub async fn start() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let (event_tx, events) = mpsc::unbounded_channel();
		let (commands, mut command_rx) = mpsc::unbounded_channel();

		tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				if !serve(stream, &event_tx, &mut command_rx).await {
					break;
				}
			}
		});

		Self {
			port,
			events,
			commands,
		}
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	/// Sends a QoS 0 PUBLISH to the connected client.
	pub fn publish(&self, topic: &str, payload: &[u8]) {
		let _ = self.commands.send(Command::Publish {
			topic: topic.to_string(),
			payload: payload.to_vec(),
		});
	}

	/// Closes the current connection without a DISCONNECT.
	pub fn drop_connection(&self) {
		let _ = self.commands.send(Command::DropConnection);
	}

	pub async fn next_event(&mut self) -> BrokerEvent {
		tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
			.await
			.expect("no broker event in time")
			.expect("broker stopped")
	}

	/// Skips events until `expected` arrives.
	pub async fn wait_for(&mut self, expected: BrokerEvent) {
		while self.next_event().await != expected {}
	}

	/// Collects filters from SUBSCRIBE packets until `count` were seen,
	/// skipping other events.
	pub async fn subscribed(&mut self, count: usize) -> Vec<String> {
		let mut filters = Vec::new();
		while filters.len() < count {
			if let BrokerEvent::Subscribed(batch) = self.next_event().await {
				filters.extend(batch);
			}
		}
		filters
	}

	/// Events already received, without waiting.
	pub fn pending_events(&mut self) -> Vec<BrokerEvent> {
		let mut events = Vec::new();
		while let Ok(event) = self.events.try_recv() {
			events.push(event);
		}
		events
	}
}

/// Serves one connection. Returns false once the broker handle is gone.
async fn serve(
	stream: TcpStream,
	events: &mpsc::UnboundedSender<BrokerEvent>,
	commands: &mut mpsc::UnboundedReceiver<Command>,
) -> bool {
	let (reader, mut writer) = stream.into_split();
	let (packet_tx, mut packets) = mpsc::unbounded_channel();
	tokio::spawn(read_packets(reader, packet_tx));

	loop {
		tokio::select! {
			packet = packets.recv() => {
				let Some((kind, body)) = packet else {
					return true;
				};
				let reply = match kind {
					| CONNECT => {
						let _ = events.send(BrokerEvent::Connected);
						Some(vec![0x20, 0x02, 0x00, 0x00])
					}
					| SUBSCRIBE => {
						let filters = subscribe_filters(&body);
						let mut suback = vec![0x90, 2 + filters.len() as u8, body[0], body[1]];
						suback.extend(std::iter::repeat_n(0x00, filters.len()));
						let _ = events.send(BrokerEvent::Subscribed(filters));
						Some(suback)
					}
					| PUBLISH => {
						let _ = events.send(BrokerEvent::Published(publish_topic(&body)));
						None
					}
					| PINGREQ => Some(vec![0xD0, 0x00]),
					| DISCONNECT => {
						let _ = events.send(BrokerEvent::Disconnected);
						return true;
					}
					| _ => None,
				};
				if let Some(reply) = reply {
					if writer.write_all(&reply).await.is_err() {
						return true;
					}
				}
			}
			command = commands.recv() => match command {
				| Some(Command::Publish { topic, payload }) => {
					if writer.write_all(&publish_packet(&topic, &payload)).await.is_err() {
						return true;
					}
				}
				| Some(Command::DropConnection) => return true,
				| None => return false,
			}
		}
	}
}

async fn read_packets(
	mut reader: OwnedReadHalf,
	packets: mpsc::UnboundedSender<(u8, Vec<u8>)>,
) {
	loop {
		let Ok(header) = reader.read_u8().await else {
			return;
		};
		let mut remaining = 0_usize;
		let mut shift = 0;
		loop {
			let Ok(byte) = reader.read_u8().await else {
				return;
			};
			remaining |= usize::from(byte & 0x7F) << shift;
			if byte & 0x80 == 0 {
				break;
			}
			shift += 7;
		}
		let mut body = vec![0; remaining];
		if reader.read_exact(&mut body).await.is_err() {
			return;
		}
		if packets.send((header >> 4, body)).is_err() {
			return;
		}
	}
}

fn subscribe_filters(body: &[u8]) -> Vec<String> {
	// Packet id, then (length, filter, qos) triples
	let mut filters = Vec::new();
	let mut i = 2;
	while i + 2 <= body.len() {
		let len = usize::from(u16::from_be_bytes([body[i], body[i + 1]]));
		let start = i + 2;
		filters.push(String::from_utf8_lossy(&body[start .. start + len]).into_owned());
		i = start + len + 1;
	}
	filters
}

fn publish_topic(body: &[u8]) -> String {
	let len = usize::from(u16::from_be_bytes([body[0], body[1]]));
	String::from_utf8_lossy(&body[2 .. 2 + len]).into_owned()
}

fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
	let mut remaining = 2 + topic.len() + payload.len();
	let mut packet = vec![0x30];
	loop {
		let mut byte = (remaining % 128) as u8;
		remaining /= 128;
		if remaining > 0 {
			byte |= 0x80;
		}
		packet.push(byte);
		if remaining == 0 {
			break;
		}
	}
	packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
	packet.extend_from_slice(topic.as_bytes());
	packet.extend_from_slice(payload);
	packet
}
