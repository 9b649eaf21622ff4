use crate::signaling::SignalSink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::TrackLocal;

/// One registered participant: its peer connection and the serialized
/// signaling channel offers go out on.
pub(crate) struct PeerHandle {
    pub(crate) peer_connection: Arc<RTCPeerConnection>,
    pub(crate) signal: Arc<dyn SignalSink>,
    /// Room generation this peer last received an offer for. A stale value
    /// means the next sync pass must re-offer.
    pub(crate) offered_generation: u64,
}

#[derive(Default)]
pub(crate) struct RoomState {
    pub(crate) peers: Vec<PeerHandle>,
    pub(crate) tracks: HashMap<String, Arc<TrackLocalStaticRTP>>,
    /// Bumped by every membership or track mutation.
    pub(crate) generation: u64,
}

/// Consistent view of one room, taken under the registry lock.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub peer_count: usize,
    pub track_ids: Vec<String>,
}

/// Process-wide registry of rooms: every peer list and forwarded-track map
/// lives behind one async mutex. The renegotiation algorithm depends on
/// reading peers and tracks as one atomic snapshot, so there is a single
/// serial point rather than per-room locks.
///
/// The lock may be held across suspension points: the peer-connection stack
/// invokes its callbacks from separate tasks, which simply queue behind it.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    pub(crate) rooms: Arc<Mutex<HashMap<String, RoomState>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live peer with its room, creating the room on demand.
    /// The caller runs a renegotiation pass afterwards so the newcomer gets
    /// an offer.
    pub async fn attach(
        &self,
        room_id: &str,
        peer_connection: Arc<RTCPeerConnection>,
        signal: Arc<dyn SignalSink>,
    ) {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id.to_owned()).or_default();
        room.peers.push(PeerHandle {
            peer_connection,
            signal,
            offered_generation: 0,
        });
        room.generation += 1;
        info!("peer attached to room {room_id} ({} now present)", room.peers.len());
    }

    /// Drops a peer's registry entry and re-syncs the remaining peers.
    /// Safe to call for peers already pruned by a sync pass.
    pub async fn detach(&self, room_id: &str, peer_connection: &Arc<RTCPeerConnection>) {
        {
            let mut rooms = self.rooms.lock().await;
            let Some(room) = rooms.get_mut(room_id) else {
                return;
            };
            let before = room.peers.len();
            room.peers
                .retain(|peer| !Arc::ptr_eq(&peer.peer_connection, peer_connection));
            if room.peers.len() == before {
                return;
            }
            room.generation += 1;
            info!("peer detached from room {room_id} ({} remain)", room.peers.len());
        }
        self.renegotiate(room_id).await;
    }

    /// Registers a forwarded track mirroring a remote one and re-syncs the
    /// room so every other peer picks it up.
    pub async fn add_track(
        &self,
        room_id: &str,
        codec: RTCRtpCodecCapability,
        id: String,
        stream_id: String,
    ) -> Arc<TrackLocalStaticRTP> {
        let local = Arc::new(TrackLocalStaticRTP::new(codec, id.clone(), stream_id));
        {
            let mut rooms = self.rooms.lock().await;
            let room = rooms.entry(room_id.to_owned()).or_default();
            room.tracks.insert(id.clone(), Arc::clone(&local));
            room.generation += 1;
            debug!("forwarded track {id} registered in room {room_id}");
        }
        self.renegotiate(room_id).await;
        local
    }

    /// Removes a forwarded track after its source RTP loop ended and
    /// re-syncs the room so stale senders get dropped.
    pub async fn remove_track(&self, room_id: &str, track: &Arc<TrackLocalStaticRTP>) {
        {
            let mut rooms = self.rooms.lock().await;
            let Some(room) = rooms.get_mut(room_id) else {
                return;
            };
            room.tracks.remove(track.id());
            room.generation += 1;
            debug!("forwarded track {} removed from room {room_id}", track.id());
        }
        self.renegotiate(room_id).await;
    }

    pub async fn snapshot(&self, room_id: &str) -> RoomSnapshot {
        let rooms = self.rooms.lock().await;
        match rooms.get(room_id) {
            Some(room) => RoomSnapshot {
                peer_count: room.peers.len(),
                track_ids: room.tracks.keys().cloned().collect(),
            },
            None => RoomSnapshot {
                peer_count: 0,
                track_ids: vec![],
            },
        }
    }
}
