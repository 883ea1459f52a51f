//! Art-Net DMX output sink.
//!
//! Emits ArtDMX datagrams over UDP, throttled to the configured refresh
//! rate. Packet framing follows the Art-Net 4 specification: 18-byte header
//! followed by a full 512-channel DMX frame.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Frame, OutputSink};

const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
const OPCODE_DMX: u16 = 0x5000;
const PROTOCOL_VERSION: u16 = 14;
const DMX_CHANNELS: usize = 512;
const HEADER_LEN: usize = 18;
const PACKET_LEN: usize = HEADER_LEN + DMX_CHANNELS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtNetConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Art-Net net, 0..=127.
    pub net: u8,
    /// Art-Net sub-net, 0..=15.
    pub subnet: u8,
    /// Universe within the sub-net, 0..=15.
    pub universe: u8,
    /// First DMX channel written, 1..=512.
    pub start_channel: u16,
    /// Channels per panel; 5 for RGBCCT fixtures.
    pub channels_per_panel: u16,
    /// Maximum packets per second.
    pub refresh_rate: u32,
}

impl Default for ArtNetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: Ipv4Addr::BROADCAST.to_string(),
            port: 6454,
            net: 0,
            subnet: 0,
            universe: 0,
            start_channel: 1,
            channels_per_panel: 5,
            refresh_rate: 44,
        }
    }
}

impl ArtNetConfig {
    /// 15-bit port address packed as (net << 8) | (subnet << 4) | universe.
    pub fn port_address(&self) -> u16 {
        (u16::from(self.net & 0x7f) << 8)
            | (u16::from(self.subnet & 0x0f) << 4)
            | u16::from(self.universe & 0x0f)
    }

    fn min_send_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.refresh_rate.max(1)))
    }
}

pub struct ArtNetSink {
    config: ArtNetConfig,
    socket: UdpSocket,
    target: SocketAddr,
    sequence: u8,
    last_send: Option<Instant>,
    dmx: [u8; DMX_CHANNELS],
}

impl ArtNetSink {
    pub fn new(config: ArtNetConfig) -> std::io::Result<Self> {
        let target: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|err| std::io::Error::new(ErrorKind::InvalidInput, format!("{err}")))?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_nonblocking(true)?;
        let is_broadcast = config
            .host
            .parse::<Ipv4Addr>()
            .is_ok_and(|ip| ip.is_broadcast());
        if is_broadcast {
            socket.set_broadcast(true)?;
        }

        info!(
            host = %config.host,
            port = config.port,
            port_address = config.port_address(),
            refresh = config.refresh_rate,
            "art-net sink ready"
        );

        Ok(Self {
            config,
            socket,
            target,
            sequence: 0,
            last_send: None,
            dmx: [0; DMX_CHANNELS],
        })
    }

    fn throttled(&self, now: Instant) -> bool {
        self.last_send
            .is_some_and(|last| now.duration_since(last) < self.config.min_send_interval())
    }

    /// Write panel channel values into the reusable DMX buffer.
    fn fill_dmx(&mut self, frame: &Frame) {
        self.dmx.fill(0);
        let channels = usize::from(self.config.channels_per_panel);
        let start = usize::from(self.config.start_channel.clamp(1, 512)) - 1;

        for (i, state) in frame.states.iter().enumerate() {
            let base = start + i * channels;
            if base + channels > DMX_CHANNELS {
                // Panels past the end of the universe are silently skipped.
                continue;
            }
            let color = state.color.scaled(state.brightness);
            let values = [color.r, color.g, color.b, color.cool, color.warm];
            self.dmx[base..base + channels.min(values.len())]
                .copy_from_slice(&values[..channels.min(values.len())]);
        }
    }

    fn send_packet(&mut self) {
        self.sequence = self.sequence.wrapping_add(1);
        let packet = build_packet(self.sequence, self.config.port_address(), &self.dmx);

        match self.socket.send_to(&packet, self.target) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                debug!("art-net send dropped: socket not ready");
            }
            Err(err) => {
                warn!(error = %err, target = %self.target, "art-net send failed");
            }
        }
    }
}

impl OutputSink for ArtNetSink {
    fn name(&self) -> &'static str {
        "artnet"
    }

    fn render(&mut self, frame: &Frame) {
        if !self.config.enabled {
            return;
        }
        let now = Instant::now();
        if self.throttled(now) {
            return;
        }

        self.fill_dmx(frame);
        self.send_packet();
        self.last_send = Some(now);
    }

    fn shutdown(&mut self) {
        // One final blackout frame before the socket goes away.
        self.dmx.fill(0);
        self.send_packet();
        info!("art-net sink closed with blackout frame");
    }
}

/// Assemble a complete ArtDMX packet.
fn build_packet(sequence: u8, port_address: u16, dmx: &[u8; DMX_CHANNELS]) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0..8].copy_from_slice(ARTNET_ID);
    packet[8..10].copy_from_slice(&OPCODE_DMX.to_le_bytes());
    packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet[12] = sequence;
    packet[13] = 0; // physical port
    packet[14..16].copy_from_slice(&port_address.to_le_bytes());
    packet[16..18].copy_from_slice(&(DMX_CHANNELS as u16).to_be_bytes());
    packet[HEADER_LEN..].copy_from_slice(dmx);
    packet
}
