//! Integration tests for the serial command Processor

mod common;
use common::*;

use ledbell_core::{
    DisconnectReason, LinkState, Millis, NetworkEvent, NetworkStatus, SessionState, SlotId,
    SlotState, Srgb, WifiState,
};
use proptest::prelude::*;

// ============================================================================
// Framing
// ============================================================================

#[test]
fn empty_line_identifies_device() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    let lines = send(&mut processor, "\n");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("RES 00 OK, Yonabe Factory / ledbell / "));
}

#[test]
fn unknown_command_is_reported() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(send(&mut processor, "foo\n"), ["RES 11 Unknown command"]);
    assert_eq!(send(&mut processor, "stop now\n"), ["RES 12 Bad command format"]);
}

#[test]
fn invalid_utf8_is_a_format_error() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    processor.receive(b"play \"\xff\"\n");
    assert_eq!(processor.transport_mut().take(), ["RES 12 Bad command format"]);
}

#[test]
fn overlong_line_resyncs_silently() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    let garbage = "a".repeat(300);
    assert!(send(&mut processor, &garbage).is_empty());
    assert_eq!(processor.session_state(), SessionState::Resyncing);

    assert!(send(&mut processor, "still garbage").is_empty());
    assert_eq!(send(&mut processor, "tail\nstop\n"), ["RES 00 OK"]);
    assert_eq!(processor.session_state(), SessionState::Listening);
}

#[test]
fn carriage_return_does_not_end_resync() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    let input = format!("{}\rfoo\n", "a".repeat(300));
    assert!(send(&mut processor, &input).is_empty());
    assert_eq!(processor.session_state(), SessionState::Listening);
    assert_eq!(send(&mut processor, "stop\n"), ["RES 00 OK"]);
}

#[test]
fn line_at_capacity_is_accepted() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    let line = format!("stop{}\n", " ".repeat(252));
    assert_eq!(send(&mut processor, &line), ["RES 00 OK"]);
}

#[test]
fn crlf_split_across_chunks_is_one_terminator() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(send(&mut processor, "stop\r"), ["RES 00 OK"]);
    assert_eq!(send(&mut processor, "\nstop\r\n"), ["RES 00 OK"]);

    // Two bare carriage returns are two empty lines
    assert_eq!(send(&mut processor, "\r\r").len(), 2);
}

#[test]
fn responses_are_dropped_while_detached() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    processor.on_transport_detached();
    assert!(send(&mut processor, "foo\n").is_empty());

    processor.on_transport_attached();
    assert_eq!(send(&mut processor, "foo\n"), ["RES 11 Unknown command"]);
}

// ============================================================================
// LEDs
// ============================================================================

#[test]
fn led_on_maps_slot_zero_to_last_pixel() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(
        send(&mut processor, "led-on 0 FF0000:500>00FF00:500>\n"),
        ["RES 00 OK"]
    );

    let expected = [
        (0, RED),
        (499, Srgb::new(0, 254, 0)),
        (500, GREEN),
        (999, Srgb::new(254, 0, 0)),
    ];
    for (t, color) in expected {
        processor.process(Millis(t));
        assert_eq!(processor.sequencer().strip().pixels[STRIP_LEN - 1], color);
    }
    assert_eq!(processor.sequencer().strip().pixels[0], OFF);
}

#[test]
fn led_on_errors() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(send(&mut processor, "led-on 6 FF0000\n"), ["RES 20 Slot error"]);
    assert_eq!(send(&mut processor, "led-on -1 FF0000\n"), ["RES 20 Slot error"]);
    assert_eq!(send(&mut processor, "led-on x FF0000\n"), ["RES 13 Integer parse error"]);
    assert_eq!(send(&mut processor, "led-on 1 FF00\n"), ["RES 21 Bad LED pattern"]);
    assert_eq!(send(&mut processor, "led-on 1 zz\n"), ["RES 21 Bad LED pattern"]);
}

#[test]
fn led_off_clears_one_or_all() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    send(&mut processor, "led-on 0 0000FF\nled-on 5 0000FF\n");
    processor.process(Millis(0));
    assert_eq!(processor.sequencer().strip().pixels[5], BLUE);
    assert_eq!(processor.sequencer().strip().pixels[0], BLUE);

    assert_eq!(send(&mut processor, "led-off 0\n"), ["RES 00 OK"]);
    assert_eq!(processor.sequencer().strip().pixels[5], OFF);
    assert_eq!(processor.sequencer().strip().pixels[0], BLUE);

    assert_eq!(send(&mut processor, "led-off 9\n"), ["RES 20 Slot error"]);
    assert_eq!(send(&mut processor, "led-off\n"), ["RES 00 OK"]);
    assert!(processor.sequencer().is_idle());
}

#[test]
fn first_contact_stops_idle_animation() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    processor.start_idle_animation().unwrap();
    processor.process(Millis(0));
    assert_eq!(
        processor.sequencer().state(SlotId(0)),
        Ok(SlotState::Running)
    );

    send(&mut processor, "\n");
    assert!(processor.sequencer().is_idle());
    assert!(processor.sequencer().strip().pixels.iter().all(|p| *p == OFF));

    // Later deliveries leave loaded patterns alone
    send(&mut processor, "led-on 2 FF0000\n");
    send(&mut processor, "\n");
    assert_eq!(
        processor.sequencer().state(SlotId(3)),
        Ok(SlotState::Loaded)
    );
}

// ============================================================================
// Audio
// ============================================================================

#[test]
fn play_local_file() {
    let link = LinkState::new();
    let storage = MockStore::new(STORAGE_TOTAL);
    storage.insert("/bell.mp3", b"ID3");
    let mut processor = processor_with_store(&link, storage);

    assert_eq!(send(&mut processor, "play \"nope.mp3\"\n"), ["RES 22 File not found"]);
    assert_eq!(send(&mut processor, "play \"bell.mp3\"\n"), ["RES 00 OK"]);
    assert_eq!(processor.audio().source.as_deref(), Some("/bell.mp3"));
    assert!(processor.audio().boosted);
    assert_eq!(processor.now_playing(), Some("/bell.mp3"));

    assert_eq!(send(&mut processor, "stop\n"), ["RES 00 OK"]);
    assert_eq!(processor.audio().source, None);
    assert_eq!(processor.now_playing(), None);

    processor.process(Millis(0));
    assert!(!processor.audio().boosted);
}

#[test]
fn stream_requires_connected_link() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(
        send(&mut processor, "play \"http://radio.example/stream\"\n"),
        ["RES 32 No Wi-Fi connection"]
    );
    assert_eq!(processor.audio().source, None);

    processor.on_network_event(NetworkEvent::Connected);
    processor.transport_mut().take();

    assert_eq!(
        send(&mut processor, "play \"https://radio.example/stream\"\n"),
        ["RES 00 OK"]
    );
    assert!(processor.audio().streaming);
}

#[test]
fn play_with_empty_path_only_stops() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(send(&mut processor, "play \"\"\n"), ["RES 00 OK"]);
    assert_eq!(processor.audio().stops, 1);
    assert!(!processor.audio().boosted);
}

#[test]
fn failed_start_is_a_file_error() {
    let link = LinkState::new();
    let storage = MockStore::new(STORAGE_TOTAL);
    storage.insert("/bell.mp3", b"ID3");
    let mut processor = processor_with_store(&link, storage);
    processor.audio_mut().fail_start = true;

    assert_eq!(send(&mut processor, "play \"bell.mp3\"\n"), ["RES 31 File IO error"]);
    assert_eq!(processor.now_playing(), None);
}

#[test]
fn volume_is_scaled_to_native_range() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    for (percent, level) in [(0, 0), (1, 1), (4, 1), (5, 1), (50, 10), (100, 21)] {
        assert_eq!(send(&mut processor, &format!("volume {percent}\n")), ["RES 00 OK"]);
        assert_eq!(processor.audio().volume, level, "volume {percent}");
    }
    assert_eq!(send(&mut processor, "volume 101\n"), ["RES 10 Command error"]);
    assert_eq!(processor.audio().volume, 21);
}

// ============================================================================
// Storage
// ============================================================================

#[test]
fn upload_receives_declared_bytes() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert!(send(&mut processor, "upload \"x.bin\" 10\n").is_empty());
    assert_eq!(processor.session_state(), SessionState::UploadingFile);

    // Command text inside the payload is data; the 11th byte starts a command
    let lines = send(&mut processor, "stop\nabcdestop\n");
    assert_eq!(
        lines,
        ["RES 00 OK, Upload Complete. size=10", "RES 00 OK"]
    );
    assert_eq!(processor.session_state(), SessionState::Listening);
    assert_eq!(
        processor.storage().contents("/x.bin").as_deref(),
        Some(&b"stop\nabcde"[..])
    );
}

#[test]
fn crlf_before_upload_payload_is_one_terminator() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    processor.receive(b"upload \"a.txt\" 3\r\n\nab");
    assert_eq!(
        processor.transport_mut().take(),
        ["RES 00 OK, Upload Complete. size=3"]
    );
    assert_eq!(processor.storage().contents("/a.txt").as_deref(), Some(&b"\nab"[..]));
}

#[test]
fn large_upload_spans_several_chunks() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    let payload: Vec<u8> = (0..1300u32).map(|i| (i % 251) as u8).collect();
    processor.receive(b"upload \"/big.bin\" 1300\n");
    for piece in payload.chunks(97) {
        processor.receive(piece);
    }

    assert_eq!(
        processor.transport_mut().take(),
        ["RES 00 OK, Upload Complete. size=1300"]
    );
    assert_eq!(processor.storage().contents("/big.bin"), Some(payload));
}

#[test]
fn upload_into_full_storage_consumes_payload() {
    let link = LinkState::new();
    let mut processor = processor_with_store(&link, MockStore::new(4));

    processor.receive(b"upload \"x.bin\" 10\n0123456789stop\n");
    assert_eq!(
        processor.transport_mut().take(),
        ["RES 30 Storage full", "RES 00 OK"]
    );
}

#[test]
fn upload_validation_errors() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(send(&mut processor, "upload \"x.bin\" 0\n"), ["RES 10 Command error"]);
    assert_eq!(send(&mut processor, "upload \"\" 5\n"), ["RES 10 Command error"]);
    assert_eq!(send(&mut processor, "upload x.bin\n"), ["RES 12 Bad command format"]);
    let long = format!("upload \"{}\" 5\n", "n".repeat(100));
    assert_eq!(send(&mut processor, &long), ["RES 14 String parse error"]);
    assert_eq!(processor.session_state(), SessionState::Listening);
}

#[test]
fn upload_stops_playback_of_same_file() {
    let link = LinkState::new();
    let storage = MockStore::new(STORAGE_TOTAL);
    storage.insert("/bell.mp3", b"old");
    storage.insert("/other.mp3", b"x");
    let mut processor = processor_with_store(&link, storage);

    send(&mut processor, "play \"bell.mp3\"\n");
    send(&mut processor, "upload \"other.mp3\" 1\nx");
    assert_eq!(processor.now_playing(), Some("/bell.mp3"));

    send(&mut processor, "upload \"bell.mp3\" 3\nnew");
    assert_eq!(processor.now_playing(), None);
    assert_eq!(processor.storage().contents("/bell.mp3").as_deref(), Some(&b"new"[..]));
}

#[test]
fn remove_deletes_existing_file() {
    let link = LinkState::new();
    let storage = MockStore::new(STORAGE_TOTAL);
    storage.insert("/bell.mp3", b"ID3");
    let mut processor = processor_with_store(&link, storage);

    send(&mut processor, "play \"/bell.mp3\"\n");
    assert_eq!(send(&mut processor, "remove \"bell.mp3\"\n"), ["RES 00 OK"]);
    assert!(processor.storage().contents("/bell.mp3").is_none());
    assert_eq!(processor.now_playing(), None);
    assert_eq!(send(&mut processor, "remove \"bell.mp3\"\n"), ["RES 22 File not found"]);
}

#[test]
fn list_reports_usage_and_files() {
    let link = LinkState::new();
    let storage = MockStore::new(STORAGE_TOTAL);
    storage.insert("/a.mp3", &[0; 12]);
    storage.insert("/b.wav", &[0; 30]);
    let mut processor = processor_with_store(&link, storage);

    assert_eq!(
        send(&mut processor, "list\n"),
        [
            "RES 00 OK+",
            "Storage Usage: 42/1000000",
            "Files:",
            "a.mp3 12",
            "b.wav 30",
            "",
        ]
    );
}

#[test]
fn list_cuts_long_names_instead_of_dropping_them() {
    let link = LinkState::new();
    let storage = MockStore::new(STORAGE_TOTAL);
    let name = "n".repeat(200);
    storage.insert(&format!("/{name}"), &[0; 7]);
    let mut processor = processor_with_store(&link, storage);

    let lines = send(&mut processor, "list\n");
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[3], name[..128]);
    assert_eq!(lines[4], "");
}

// ============================================================================
// Wi-Fi
// ============================================================================

#[test]
fn wifi_join_and_status() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    assert_eq!(send(&mut processor, "wifi\n"), ["RES 00 OK, Idle"]);
    assert_eq!(send(&mut processor, "wifi home secret\n"), ["RES 00 OK"]);
    assert_eq!(processor.credentials(), Some(("home", "secret")));
    assert_eq!(link.wifi_state(), WifiState::Connecting);
    assert_eq!(processor.network().joins, [("home".to_string(), "secret".to_string())]);
    assert!(processor.network().events.is_some());

    assert_eq!(send(&mut processor, "wifi home\n"), ["RES 12 Bad command format"]);
}

#[test]
fn refused_join_is_reported() {
    let link = LinkState::new();
    let mut processor = processor(&link);
    processor.network_mut().refuse = true;

    assert_eq!(
        send(&mut processor, "wifi home secret\n"),
        ["RES 33 Wi-Fi connect failed"]
    );
    assert!(processor.network().joins.is_empty());
}

#[test]
fn wifi_status_comes_from_network() {
    let link = LinkState::new();
    let mut processor = processor(&link);
    processor.network_mut().status = NetworkStatus::NoSsid;

    assert_eq!(send(&mut processor, "wifi\n"), ["RES 00 OK, NoSSID"]);
}

#[test]
fn network_events_on_own_context_notify_immediately() {
    let link = LinkState::new();
    let mut processor = processor(&link);

    processor.on_network_event(NetworkEvent::Connected);
    assert_eq!(processor.transport_mut().take(), ["NTF 50 Wi-Fi connected"]);

    processor.on_network_event(NetworkEvent::Connected);
    assert!(processor.transport_mut().take().is_empty());

    processor.on_network_event(NetworkEvent::Disconnected(DisconnectReason::from_code(201)));
    assert_eq!(processor.transport_mut().take(), ["NTF 51 Wi-Fi ssid not found"]);
}

#[test]
fn foreign_events_are_flushed_by_process() {
    let link = LinkState::new();
    let mut processor = processor(&link);
    send(&mut processor, "wifi home secret\n");

    let handle = processor.network().events.unwrap();
    handle.disconnected(DisconnectReason::from_code(15));
    assert!(processor.transport().lines.is_empty());

    processor.process(Millis(0));
    assert_eq!(
        processor.transport_mut().take(),
        ["NTF 52 Wi-Fi authentication failed"]
    );
}

#[test]
fn notifications_coalesce_while_detached() {
    let link = LinkState::new();
    let mut processor = processor(&link);
    processor.on_transport_detached();

    let handle = link.handle();
    handle.connected();
    handle.disconnected(DisconnectReason::from_code(201));
    handle.connected();
    handle.disconnected(DisconnectReason::from_code(8));
    processor.process(Millis(0));
    assert!(processor.transport().lines.is_empty());

    processor.on_transport_attached();
    assert_eq!(processor.transport_mut().take(), ["NTF 53 Wi-Fi disconnected"]);

    processor.process(Millis(1));
    assert!(processor.transport().lines.is_empty());
}

// ============================================================================
// Chunking
// ============================================================================

const SCRIPT: &[u8] = b"\nled-on 1 FF0000:100>00FF00\r\nupload \"s.bin\" 6\r\n\r\nab\ncdlist\nfoo\r\nvolume 40\nstop";

fn run(chunks: &[&[u8]]) -> (Vec<String>, Option<Vec<u8>>) {
    let link = LinkState::new();
    let mut processor = processor(&link);
    for chunk in chunks {
        processor.receive(chunk);
    }
    processor.receive(b"\n");
    let lines = processor.transport_mut().take();
    (lines, processor.storage().contents("/s.bin"))
}

proptest! {
    #[test]
    fn chunking_does_not_change_outcome(cuts in prop::collection::vec(0..SCRIPT.len(), 0..12)) {
        let mut cuts = cuts;
        cuts.sort_unstable();
        cuts.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for cut in cuts {
            chunks.push(&SCRIPT[start..cut]);
            start = cut;
        }
        chunks.push(&SCRIPT[start..]);

        prop_assert_eq!(run(&chunks), run(&[SCRIPT]));
    }
}
