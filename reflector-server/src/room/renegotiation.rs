use crate::room::registry::{RoomRegistry, RoomState};
use reflector_core::{SignalEvent, SignalMessage};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::track::track_local::TrackLocal;

/// The peer-connection stack rejects add/remove/offer calls while an
/// internal negotiation is in flight; rather than reason about those
/// transient states, a failed pass is simply rerun.
const MAX_SYNC_ATTEMPTS: usize = 25;

/// After exhausting the attempts, concede the lock for this long so blocked
/// `add_track`/`remove_track` callers can make progress.
const RESYNC_DELAY: Duration = Duration::from_secs(3);

impl RoomRegistry {
    /// Converges every peer in the room to the current forwarded-track set
    /// and offers the result. Runs entirely under the registry lock; on
    /// success the lock is released and a keyframe round is dispatched.
    pub async fn renegotiate(&self, room_id: &str) {
        {
            let mut rooms = self.rooms.lock().await;
            let mut attempts = 0;
            loop {
                let Some(room) = rooms.get_mut(room_id) else {
                    return;
                };
                if !attempt_sync(room).await {
                    break;
                }
                attempts += 1;
                if attempts == MAX_SYNC_ATTEMPTS {
                    warn!("room {room_id} did not converge in {attempts} attempts, backing off");
                    drop(rooms);
                    self.schedule_resync(room_id);
                    return;
                }
            }
        }
        self.dispatch_keyframe(room_id).await;
    }

    fn schedule_resync(&self, room_id: &str) {
        let registry = self.clone();
        let room_id = room_id.to_owned();
        tokio::spawn(async move {
            time::sleep(RESYNC_DELAY).await;
            registry.renegotiate(&room_id).await;
        });
    }
}

/// One synchronization pass over the room, in peer index order. Returns
/// `true` if the pass must be rerun: either the peer list was structurally
/// mutated (a closed peer was spliced out) or the peer-connection stack
/// rejected a call mid-negotiation.
async fn attempt_sync(room: &mut RoomState) -> bool {
    let mut index = 0;
    while index < room.peers.len() {
        let peer_connection = Arc::clone(&room.peers[index].peer_connection);
        let signal = Arc::clone(&room.peers[index].signal);

        if peer_connection.connection_state() == RTCPeerConnectionState::Closed {
            room.peers.remove(index);
            room.generation += 1;
            return true;
        }

        // Track ids this peer already handles. Receivers participate so a
        // peer never gets its own upload offered back (loopback prevention).
        let mut existing = HashSet::new();
        let mut mutated = false;

        for sender in peer_connection.get_senders().await {
            let Some(track) = sender.track().await else {
                continue;
            };
            let id = track.id().to_string();
            existing.insert(id.clone());
            if !room.tracks.contains_key(&id) {
                if peer_connection.remove_track(&sender).await.is_err() {
                    return true;
                }
                mutated = true;
            }
        }

        for receiver in peer_connection.get_receivers().await {
            let Some(track) = receiver.tracks().await.into_iter().next() else {
                continue;
            };
            existing.insert(track.id().to_string());
        }

        for (id, local) in &room.tracks {
            if existing.contains(id) {
                continue;
            }
            let track = Arc::clone(local) as Arc<dyn TrackLocal + Send + Sync>;
            if peer_connection.add_track(track).await.is_err() {
                return true;
            }
            mutated = true;
        }

        // A converged pass stays silent; anything that touched this peer, or
        // a registry mutation it has not yet seen, warrants a fresh offer.
        if mutated || room.peers[index].offered_generation < room.generation {
            let offer = match peer_connection.create_offer(None).await {
                Ok(offer) => offer,
                Err(_) => return true,
            };
            if peer_connection
                .set_local_description(offer.clone())
                .await
                .is_err()
            {
                return true;
            }
            let Ok(data) = serde_json::to_string(&offer) else {
                return true;
            };
            if signal
                .send(&SignalMessage::new(SignalEvent::Offer, data))
                .await
                .is_err()
            {
                return true;
            }
            debug!("offer sent to peer {index}");
            room.peers[index].offered_generation = room.generation;
        }

        index += 1;
    }

    false
}
