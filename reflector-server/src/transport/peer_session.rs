use crate::room::RoomRegistry;
use crate::signaling::SignalSink;
use crate::transport::TransportConfig;
use anyhow::{Context, Result};
use reflector_core::{SignalEvent, SignalMessage};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_local::TrackLocalWriter;

const RTP_MTU: usize = 1500;

/// One participant's media leg: the peer connection plus the wiring that
/// keeps it synchronized with its room.
///
/// The owning WebSocket read loop drives inbound signaling through
/// [`PeerSession::apply_answer`] and [`PeerSession::add_remote_candidate`];
/// everything outbound happens from the callbacks installed here.
pub struct PeerSession {
    pub room_id: String,
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl PeerSession {
    /// Builds the peer connection, fixes the inbound media shape at one
    /// audio and one video track, registers with the room and installs the
    /// ICE, state-change and track callbacks.
    pub async fn connect(
        room_id: String,
        config: TransportConfig,
        registry: RoomRegistry,
        signal: Arc<dyn SignalSink>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let interceptors = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptors)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers,
                ..Default::default()
            }]
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(RTCConfiguration {
                ice_servers,
                ..Default::default()
            })
            .await?,
        );

        for kind in [RTPCodecType::Video, RTPCodecType::Audio] {
            peer_connection
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .context("failed to add recvonly transceiver")?;
        }

        registry
            .attach(&room_id, Arc::clone(&peer_connection), Arc::clone(&signal))
            .await;

        // Trickle ICE: every local candidate goes straight to the client.
        {
            let signal = Arc::clone(&signal);
            peer_connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let signal = Arc::clone(&signal);
                Box::pin(async move {
                    let Some(candidate) = candidate else { return };
                    let init = match candidate.to_json() {
                        Ok(init) => init,
                        Err(e) => {
                            warn!("failed to encode local ICE candidate: {e}");
                            return;
                        }
                    };
                    let data = match serde_json::to_string(&init) {
                        Ok(data) => data,
                        Err(e) => {
                            warn!("failed to serialize local ICE candidate: {e}");
                            return;
                        }
                    };
                    if let Err(e) = signal
                        .send(&SignalMessage::new(SignalEvent::Candidate, data))
                        .await
                    {
                        warn!("failed to send local ICE candidate: {e}");
                    }
                })
            }));
        }

        // Failed connections are closed here; Closed ones are pruned by the
        // renegotiation pass this triggers.
        {
            let registry = registry.clone();
            let room_id = room_id.clone();
            let weak_connection = Arc::downgrade(&peer_connection);
            peer_connection.on_peer_connection_state_change(Box::new(
                move |state: RTCPeerConnectionState| {
                    let registry = registry.clone();
                    let room_id = room_id.clone();
                    let weak_connection = weak_connection.clone();
                    Box::pin(async move {
                        info!("peer connection state changed to {state} in room {room_id}");
                        match state {
                            RTCPeerConnectionState::Failed => {
                                if let Some(connection) = weak_connection.upgrade() {
                                    if let Err(e) = connection.close().await {
                                        error!("failed to close failed peer connection: {e}");
                                    }
                                }
                            }
                            RTCPeerConnectionState::Closed => {
                                registry.renegotiate(&room_id).await;
                            }
                            _ => {}
                        }
                    })
                },
            ));
        }

        // Incoming RTP fans out through a room-registered local track.
        {
            let registry = registry.clone();
            let room_id = room_id.clone();
            peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
                let registry = registry.clone();
                let room_id = room_id.clone();
                Box::pin(async move {
                    // The handler must return promptly; the pump owns the loop.
                    tokio::spawn(async move {
                        let id = track.id().to_string();
                        debug!("remote track {id} ({}) arrived in room {room_id}", track.kind());

                        let local = registry
                            .add_track(
                                &room_id,
                                track.codec().capability,
                                id,
                                track.stream_id().to_string(),
                            )
                            .await;

                        let mut buf = vec![0u8; RTP_MTU];
                        loop {
                            let (packet, _) = match track.read(&mut buf).await {
                                Ok(read) => read,
                                Err(_) => break,
                            };
                            if local.write_rtp(&packet).await.is_err() {
                                break;
                            }
                        }

                        registry.remove_track(&room_id, &local).await;
                    });
                })
            }));
        }

        Ok(Self {
            room_id,
            peer_connection,
        })
    }

    /// Applies the client's SDP answer to the last offer we sent.
    pub async fn apply_answer(&self, data: &str) -> Result<()> {
        let answer: RTCSessionDescription =
            serde_json::from_str(data).context("malformed SDP answer")?;
        self.peer_connection.set_remote_description(answer).await?;
        Ok(())
    }

    /// Adds a remote ICE candidate in its browser JSON form.
    pub async fn add_remote_candidate(&self, data: &str) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(data).context("malformed ICE candidate")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
