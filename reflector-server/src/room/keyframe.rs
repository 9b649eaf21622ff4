use crate::room::registry::RoomRegistry;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;

const KEYFRAME_INTERVAL: Duration = Duration::from_secs(3);

impl RoomRegistry {
    /// Asks every sender feeding the room for a fresh keyframe, so
    /// late-joiners and freshly renegotiated decoders recover quickly.
    pub async fn dispatch_keyframe(&self, room_id: &str) {
        let rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(room_id) else {
            return;
        };
        for peer in &room.peers {
            for receiver in peer.peer_connection.get_receivers().await {
                let Some(track) = receiver.tracks().await.into_iter().next() else {
                    continue;
                };
                let pli = PictureLossIndication {
                    sender_ssrc: 0,
                    media_ssrc: track.ssrc(),
                };
                let _ = peer.peer_connection.write_rtcp(&[Box::new(pli)]).await;
            }
        }
    }

    /// Periodic PLI broadcast for the room. The returned handle is owned by
    /// the peer session and aborted on teardown, so the ticker never
    /// outlives its session.
    pub fn spawn_keyframe_pinger(&self, room_id: &str) -> JoinHandle<()> {
        let registry = self.clone();
        let room_id = room_id.to_owned();
        tokio::spawn(async move {
            // An immediate first tick would double the round the joining
            // session's initial sync just dispatched; wait a full interval.
            let mut ticker =
                time::interval_at(time::Instant::now() + KEYFRAME_INTERVAL, KEYFRAME_INTERVAL);
            loop {
                ticker.tick().await;
                registry.dispatch_keyframe(&room_id).await;
            }
        })
    }
}
