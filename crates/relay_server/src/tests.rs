
// Include tests
#[cfg(test)]
mod tests {
    use crate::protocol::{encode, Framer, Packet, PacketKind};
    use crate::server::origin_fingerprint;
    use crate::stats::{NoStats, StatsSink};
    use crate::{RelayConfig, RelayServer, Relay, SessionId};
    use serde_json::{json, Value};
    use std::collections::{HashSet, VecDeque};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::{sleep, timeout, Instant};

    fn packet(value: Value) -> Packet {
        serde_json::from_value(value).expect("test packet must be a JSON object")
    }

    // === Framing ===

    #[test]
    fn test_framing_round_trip() {
        let original = packet(json!({
            "type": "UPDATE_CLIENT_DATA",
            "quiet": true,
            "data": { "name": "link", "health": 3, "tags": ["a", "b"] }
        }));

        let bytes = encode(&original).expect("encode");
        assert_eq!(*bytes.last().unwrap(), 0, "frame must end with the NUL terminator");

        let mut framer = Framer::new();
        let decoded = framer.feed(&bytes);
        assert_eq!(decoded, vec![original]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_framing_multi_message_coalescing() {
        let a = packet(json!({ "type": "A" }));
        let b = packet(json!({ "type": "B" }));

        let mut bytes = encode(&a).unwrap();
        bytes.extend(encode(&b).unwrap());

        let mut framer = Framer::new();
        assert_eq!(framer.feed(&bytes), vec![a, b]);
    }

    #[test]
    fn test_framing_fragmentation_invariance() {
        let a = packet(json!({ "type": "A", "data": { "x": 1 } }));
        let b = packet(json!({ "type": "B" }));
        let mut bytes = encode(&a).unwrap();
        bytes.extend(encode(&b).unwrap());

        // One byte at a time must yield the same sequence as one call.
        let mut framer = Framer::new();
        let mut decoded = Vec::new();
        for byte in &bytes {
            decoded.extend(framer.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(decoded, vec![a, b]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_framing_carries_partial_frame() {
        let a = packet(json!({ "type": "A" }));
        let bytes = encode(&a).unwrap();
        let (head, tail) = bytes.split_at(3);

        let mut framer = Framer::new();
        assert!(framer.feed(head).is_empty());
        assert_eq!(framer.pending(), head);
        assert_eq!(framer.feed(tail), vec![a]);
    }

    #[test]
    fn test_framing_skips_malformed_segment() {
        let good = packet(json!({ "type": "GOOD" }));

        let mut bytes = b"{not json".to_vec();
        bytes.push(0);
        bytes.extend(encode(&good).unwrap());

        let mut framer = Framer::new();
        assert_eq!(framer.feed(&bytes), vec![good]);
    }

    // === Packets ===

    #[test]
    fn test_packet_kind_parsing() {
        assert_eq!(packet(json!({ "type": "Heartbeat" })).kind(), PacketKind::Heartbeat);
        assert_eq!(
            packet(json!({ "type": "REQUEST_SAVE_STATE" })).kind(),
            PacketKind::RequestSaveState
        );
        assert_eq!(
            packet(json!({ "type": "CHAT" })).kind(),
            PacketKind::Other("CHAT".to_string())
        );
        assert_eq!(packet(json!({ "x": 1 })).kind(), PacketKind::Untyped);
    }

    #[test]
    fn test_packet_target_normalization() {
        let mut float_target = packet(json!({ "type": "X", "targetClientId": 42.0 }));
        assert_eq!(float_target.normalize_target(), Some(42));
        assert_eq!(float_target.get("targetClientId"), Some(&json!(42)));

        let mut no_target = packet(json!({ "type": "X" }));
        assert_eq!(no_target.normalize_target(), None);

        let mut bad_target = packet(json!({ "type": "X", "targetClientId": "nope" }));
        assert_eq!(bad_target.normalize_target(), None);
    }

    #[test]
    fn test_packet_quiet_defaults() {
        let silent = packet(json!({ "type": "X", "quiet": true }));
        let plain = packet(json!({ "type": "X" }));
        assert!(silent.quiet_or(false));
        assert!(!plain.quiet_or(false));
        assert!(plain.quiet_or(true));
    }

    #[test]
    fn test_origin_fingerprint_is_stable_and_opaque() {
        let a: SocketAddr = "10.1.2.3:1111".parse().unwrap();
        let b: SocketAddr = "10.1.2.3:2222".parse().unwrap();
        let c: SocketAddr = "10.9.9.9:1111".parse().unwrap();

        // Same host, different port: same fingerprint. Different host: different.
        assert_eq!(origin_fingerprint(&a), origin_fingerprint(&b));
        assert_ne!(origin_fingerprint(&a), origin_fingerprint(&c));
        assert_eq!(origin_fingerprint(&a).len(), 64);
        assert!(!origin_fingerprint(&a).contains("10.1.2.3"));
    }

    // === End-to-end harness ===

    #[derive(Default)]
    struct CountingStats {
        connects: AtomicUsize,
        disconnects: AtomicUsize,
        games_completed: AtomicUsize,
        origins: Mutex<Vec<String>>,
    }

    impl StatsSink for CountingStats {
        fn record_connect(&self) {
            self.connects.fetch_add(1, Ordering::SeqCst);
        }
        fn record_disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
        fn record_game_complete(&self) {
            self.games_completed.fetch_add(1, Ordering::SeqCst);
        }
        fn record_origin(&self, fingerprint: &str) {
            self.origins.lock().unwrap().push(fingerprint.to_string());
        }
    }

    fn test_config() -> RelayConfig {
        RelayConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            heartbeat_interval: Duration::from_secs(60),
            read_poll_interval: Duration::from_millis(50),
            quiet_mode: true,
        }
    }

    async fn start_server(
        config: RelayConfig,
        stats: Arc<dyn StatsSink>,
    ) -> (Arc<Relay>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = RelayServer::new(config, stats);
        let relay = server.relay().clone();
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });
        (relay, addr)
    }

    async fn wait_until<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if condition().await {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within deadline");
    }

    struct TestClient {
        stream: TcpStream,
        framer: Framer,
        inbox: VecDeque<Packet>,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            Self {
                stream: TcpStream::connect(addr).await.expect("connect"),
                framer: Framer::new(),
                inbox: VecDeque::new(),
            }
        }

        async fn send(&mut self, value: Value) {
            let bytes = encode(&packet(value)).unwrap();
            self.stream.write_all(&bytes).await.expect("send");
        }

        async fn recv_within(&mut self, dur: Duration) -> Option<Packet> {
            let deadline = Instant::now() + dur;
            loop {
                if let Some(p) = self.inbox.pop_front() {
                    return Some(p);
                }
                let remaining = deadline.checked_duration_since(Instant::now())?;
                let mut chunk = [0u8; 1024];
                match timeout(remaining, self.stream.read(&mut chunk)).await {
                    Ok(Ok(0)) | Ok(Err(_)) | Err(_) => return None,
                    Ok(Ok(n)) => self.inbox.extend(self.framer.feed(&chunk[..n])),
                }
            }
        }

        /// Waits for a packet of the given type, skipping any others.
        async fn expect_type(&mut self, type_name: &str) -> Packet {
            let deadline = Instant::now() + Duration::from_secs(2);
            loop {
                let remaining = deadline
                    .checked_duration_since(Instant::now())
                    .unwrap_or_else(|| panic!("no {type_name} packet within deadline"));
                match self.recv_within(remaining).await {
                    Some(p) if p.type_name() == type_name => return p,
                    Some(_) => continue,
                    None => panic!("connection ended while waiting for {type_name}"),
                }
            }
        }

        /// Asserts that no packet of the given type arrives within `dur`.
        async fn assert_silent(&mut self, type_name: &str, dur: Duration) {
            let deadline = Instant::now() + dur;
            while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
                match self.recv_within(remaining).await {
                    Some(p) => assert_ne!(
                        p.type_name(),
                        type_name,
                        "unexpected {type_name} packet"
                    ),
                    None => return,
                }
            }
        }

        /// Discards everything already in flight.
        async fn drain(&mut self) {
            while self.recv_within(Duration::from_millis(200)).await.is_some() {}
        }

        async fn join_room(&mut self, room: &str, name: &str) {
            self.send(json!({
                "type": "UPDATE_CLIENT_DATA",
                "roomId": room,
                "data": { "name": name }
            }))
            .await;
            self.expect_type("ALL_CLIENT_DATA").await;
        }
    }

    fn roster_ids(roster: &Packet) -> HashSet<u64> {
        roster
            .get("clients")
            .and_then(Value::as_array)
            .expect("clients array")
            .iter()
            .map(|entry| entry.get("clientId").and_then(Value::as_u64).expect("clientId"))
            .collect()
    }

    // === End-to-end behavior ===

    #[tokio::test(flavor = "multi_thread")]
    async fn test_join_triggers_roster_broadcast() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        a.join_room("woods", "a").await;
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.session_count().await == 1 }
        })
        .await;
        let a_id = relay.sessions_snapshot().await[0].id() as u64;

        let mut b = TestClient::connect(addr).await;
        b.send(json!({
            "type": "UPDATE_CLIENT_DATA",
            "roomId": "woods",
            "data": { "name": "b" }
        }))
        .await;

        // B's roster lists A (with A's data blob), and A receives an
        // updated roster listing B.
        let b_roster = b.expect_type("ALL_CLIENT_DATA").await;
        assert_eq!(b_roster.get("roomId"), Some(&json!("woods")));
        assert_eq!(roster_ids(&b_roster), HashSet::from([a_id]));
        let entry = &b_roster.get("clients").unwrap().as_array().unwrap()[0];
        assert_eq!(entry.get("name"), Some(&json!("a")));

        let a_roster = a.expect_type("ALL_CLIENT_DATA").await;
        assert_eq!(a_roster.get("roomId"), Some(&json!("woods")));
        assert!(!roster_ids(&a_roster).contains(&a_id));
        assert_eq!(roster_ids(&a_roster).len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_is_broadcast_to_peers() {
        let (_relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        let mut b = TestClient::connect(addr).await;
        a.join_room("field", "a").await;
        b.join_room("field", "b").await;
        a.drain().await;

        b.send(json!({ "type": "UPDATE_CLIENT_DATA", "data": { "name": "b2" } }))
            .await;
        let update = a.expect_type("UPDATE_CLIENT_DATA").await;
        assert_eq!(
            update.get("data").and_then(|d| d.get("name")),
            Some(&json!("b2"))
        );
        assert!(update.get("clientId").is_some(), "forwarded packets carry the sender id");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_packet_without_room_is_dropped() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        a.send(json!({ "type": "CHAT", "message": "anyone?" })).await;
        sleep(Duration::from_millis(200)).await;

        // The session survives the dropped packet and can join afterwards.
        assert_eq!(relay.session_count().await, 1);
        assert_eq!(relay.room_count().await, 0);
        a.join_room("late", "a").await;
        assert_eq!(relay.room_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unicast_reaches_only_the_target() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        let mut b = TestClient::connect(addr).await;
        let mut c = TestClient::connect(addr).await;
        a.join_room("duel", "a").await;
        b.join_room("duel", "b").await;
        c.join_room("duel", "c").await;

        let rooms = relay.rooms_snapshot().await;
        let members = rooms[0].members_snapshot().await;
        let b_id = members[1].id();
        b.drain().await;
        c.drain().await;

        a.send(json!({ "type": "CHAT", "targetClientId": b_id, "message": "hi" }))
            .await;
        let delivered = b.expect_type("CHAT").await;
        assert_eq!(delivered.get("message"), Some(&json!("hi")));
        c.assert_silent("CHAT", Duration::from_millis(300)).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unicast_miss_is_not_fatal() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        let mut b = TestClient::connect(addr).await;
        a.join_room("attic", "a").await;
        b.join_room("attic", "b").await;
        b.drain().await;

        a.send(json!({ "type": "CHAT", "targetClientId": 1, "message": "ghost" }))
            .await;
        b.assert_silent("CHAT", Duration::from_millis(300)).await;

        // The sender's connection is unaffected.
        assert_eq!(relay.session_count().await, 2);
        a.send(json!({ "type": "CHAT", "message": "still here" })).await;
        b.expect_type("CHAT").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_state_queue() {
        let (_relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        let mut b = TestClient::connect(addr).await;
        let mut c = TestClient::connect(addr).await;
        a.join_room("vault", "a").await;
        b.join_room("vault", "b").await;
        c.join_room("vault", "c").await;
        a.drain().await;
        b.drain().await;
        c.drain().await;

        // A requests a state: the other members see the request.
        a.send(json!({ "type": "REQUEST_SAVE_STATE" })).await;
        b.expect_type("REQUEST_SAVE_STATE").await;
        c.expect_type("REQUEST_SAVE_STATE").await;
        a.assert_silent("REQUEST_SAVE_STATE", Duration::from_millis(300)).await;

        // A push goes only to the pending requester.
        b.send(json!({ "type": "PUSH_SAVE_STATE", "data": { "state": "blob" } }))
            .await;
        a.expect_type("PUSH_SAVE_STATE").await;
        c.assert_silent("PUSH_SAVE_STATE", Duration::from_millis(300)).await;

        // The queue was cleared: a second push delivers to nobody.
        b.send(json!({ "type": "PUSH_SAVE_STATE", "data": { "state": "blob2" } }))
            .await;
        a.assert_silent("PUSH_SAVE_STATE", Duration::from_millis(300)).await;
        c.assert_silent("PUSH_SAVE_STATE", Duration::from_millis(300)).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_request_save_state_alone_is_not_queued() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        a.join_room("solo", "a").await;
        a.send(json!({ "type": "REQUEST_SAVE_STATE" })).await;
        sleep(Duration::from_millis(200)).await;

        let rooms = relay.rooms_snapshot().await;
        assert!(rooms[0].state_requests_snapshot().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_room_depopulation_removes_room() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        a.join_room("ruins", "a").await;
        let old_room = relay.rooms_snapshot().await.remove(0);

        drop(a);
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.room_count().await == 0 && relay.session_count().await == 0 }
        })
        .await;

        // The key resolves to a brand-new empty room, not the old one.
        let new_room = relay.get_or_create_room("ruins").await;
        assert!(!Arc::ptr_eq(&old_room, &new_room));
        assert_eq!(new_room.member_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_departure_updates_remaining_rosters() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        let mut b = TestClient::connect(addr).await;
        a.join_room("bridge", "a").await;
        b.join_room("bridge", "b").await;
        a.drain().await;

        drop(b);
        let roster = a.expect_type("ALL_CLIENT_DATA").await;
        assert!(roster_ids(&roster).is_empty(), "departed peer must leave the roster");
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.session_count().await == 1 }
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_idempotent_disconnect() {
        let stats = Arc::new(CountingStats::default());
        let (relay, addr) = start_server(test_config(), stats.clone()).await;

        let mut a = TestClient::connect(addr).await;
        a.join_room("cliff", "a").await;
        let session = relay.sessions_snapshot().await.remove(0);

        tokio::join!(session.disconnect(), session.disconnect());
        session.disconnect().await;

        assert_eq!(relay.session_count().await, 0);
        assert_eq!(relay.room_count().await, 0);
        assert_eq!(stats.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_coalesced_join_requests_join_once() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        // Two join requests arriving in a single read dispatch as parallel
        // tasks; only one of them may add the session to the room.
        let mut a = TestClient::connect(addr).await;
        let join = json!({
            "type": "UPDATE_CLIENT_DATA",
            "roomId": "dunes",
            "data": { "name": "a" }
        });
        let mut bytes = encode(&packet(join.clone())).unwrap();
        bytes.extend(encode(&packet(join)).unwrap());
        a.stream.write_all(&bytes).await.expect("send");
        a.expect_type("ALL_CLIENT_DATA").await;

        wait_until(|| {
            let relay = relay.clone();
            async move { relay.room_count().await == 1 }
        })
        .await;
        sleep(Duration::from_millis(200)).await;
        let rooms = relay.rooms_snapshot().await;
        assert_eq!(rooms[0].member_count().await, 1);

        // A single departure empties the room completely.
        drop(a);
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.room_count().await == 0 && relay.session_count().await == 0 }
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_join_racing_disconnect_leaves_no_membership() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        for _ in 0..25 {
            let _client = TestClient::connect(addr).await;
            wait_until(|| {
                let relay = relay.clone();
                async move { relay.session_count().await == 1 }
            })
            .await;
            let session = relay.sessions_snapshot().await.remove(0);
            let room = relay.get_or_create_room("arena").await;

            let join = tokio::spawn({
                let room = room.clone();
                let session = session.clone();
                async move { room.join(session).await }
            });
            let teardown = tokio::spawn({
                let session = session.clone();
                async move { session.disconnect().await }
            });
            let (join, teardown) = tokio::join!(join, teardown);
            join.unwrap();
            teardown.unwrap();

            // Whichever order the two tasks ran in, the session must end up
            // in no room and no room may still list it.
            assert!(session.room().await.is_none());
            for room in relay.rooms_snapshot().await {
                assert!(room.find_member(session.id()).await.is_none());
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_failure_tears_down_session() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        let mut b = TestClient::connect(addr).await;
        a.join_room("pier", "a").await;
        b.join_room("pier", "b").await;
        let b_session = relay.rooms_snapshot().await[0].members_snapshot().await[1].clone();
        a.drain().await;

        // Push packets at the departed peer until a send observes the dead
        // socket; the resulting teardown detaches the session and rebroadcasts
        // the roster to the survivor.
        drop(b);
        wait_until(|| {
            let session = b_session.clone();
            async move {
                session.send_packet(Packet::heartbeat()).await;
                session.is_closed()
            }
        })
        .await;

        let roster = a.expect_type("ALL_CLIENT_DATA").await;
        assert!(roster_ids(&roster).is_empty());
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.session_count().await == 1 }
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_ids_are_unique() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut clients = Vec::new();
        for _ in 0..20 {
            clients.push(TestClient::connect(addr).await);
        }
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.session_count().await == 20 }
        })
        .await;

        let ids: HashSet<SessionId> = relay
            .sessions_snapshot()
            .await
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_game_complete_counts_without_broadcast() {
        let stats = Arc::new(CountingStats::default());
        let (_relay, addr) = start_server(test_config(), stats.clone()).await;

        let mut a = TestClient::connect(addr).await;
        let mut b = TestClient::connect(addr).await;
        a.join_room("credits", "a").await;
        b.join_room("credits", "b").await;
        b.drain().await;

        a.send(json!({ "type": "GAME_COMPLETE" })).await;
        b.assert_silent("GAME_COMPLETE", Duration::from_millis(300)).await;
        wait_until(|| {
            let stats = stats.clone();
            async move { stats.games_completed.load(Ordering::SeqCst) == 1 }
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connect_records_stats_and_origin() {
        let stats = Arc::new(CountingStats::default());
        let (relay, addr) = start_server(test_config(), stats.clone()).await;

        let a = TestClient::connect(addr).await;
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.session_count().await == 1 }
        })
        .await;

        assert_eq!(stats.connects.load(Ordering::SeqCst), 1);
        let origins = stats.origins.lock().unwrap().clone();
        assert_eq!(origins.len(), 1);
        assert_eq!(origins[0].len(), 64);

        drop(a);
        wait_until(|| {
            let stats = stats.clone();
            async move { stats.disconnects.load(Ordering::SeqCst) == 1 }
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_heartbeat_is_sent_on_interval() {
        let config = RelayConfig {
            heartbeat_interval: Duration::from_millis(100),
            ..test_config()
        };
        let (_relay, addr) = start_server(config, Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        a.expect_type("Heartbeat").await;
        a.expect_type("Heartbeat").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_operator_disable_notifies_then_disconnects() {
        let (relay, addr) = start_server(test_config(), Arc::new(NoStats)).await;

        let mut a = TestClient::connect(addr).await;
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.session_count().await == 1 }
        })
        .await;
        let id = relay.sessions_snapshot().await[0].id();

        assert!(relay.disable_session(id, "").await);
        let notice = a.expect_type("SERVER_MESSAGE").await;
        assert_eq!(
            notice.get("message"),
            Some(&json!(
                "You have been disconnected by the server.\nTry to connect again in a bit!"
            ))
        );
        a.expect_type("DISABLE_ANCHOR").await;
        wait_until(|| {
            let relay = relay.clone();
            async move { relay.session_count().await == 0 }
        })
        .await;

        // Unknown targets report a miss instead of failing.
        assert!(!relay.disable_session(id, "").await);
        assert!(!relay.message_session(id, "hello").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_quiet_mode_toggle() {
        let relay = Relay::new(true, Arc::new(NoStats));
        assert!(relay.quiet_mode());
        assert!(!relay.toggle_quiet_mode());
        assert!(relay.toggle_quiet_mode());
        relay.set_quiet_mode(false);
        assert!(!relay.quiet_mode());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_or_create_room_is_keyed() {
        let relay = Relay::new(true, Arc::new(NoStats));
        let first = relay.get_or_create_room("lake").await;
        let again = relay.get_or_create_room("lake").await;
        let other = relay.get_or_create_room("desert").await;

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(relay.room_count().await, 2);
    }
}
