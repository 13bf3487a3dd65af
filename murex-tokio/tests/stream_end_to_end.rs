//! End-to-end tests running two peers over in-memory duplex pipes,
//! including a raw peer driven directly on the sans-IO machine so the
//! exact bytes on the wire can be inspected and corrupted.

use murex_handshake::crypto::aead;
use murex_handshake::{Handshake, HandshakeAction, MESSAGE_LEN, SessionKeys};
use murex_tokio::{
    ChannelError, CryptoError, Error, MessageError, PacketReader, PacketWriter, PreSharedKey, Role,
    SecureStream, StreamOptions,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Peer = SecureStream<DuplexStream>;

/// Establish both ends of an in-memory connection concurrently.
async fn establish_pair(options_a: StreamOptions, options_b: StreamOptions) -> (Peer, Peer) {
    let (end_a, end_b) = duplex(64 * 1024);
    let (a, b) = tokio::join!(
        SecureStream::new(end_a, options_a),
        SecureStream::new(end_b, options_b),
    );
    (a.unwrap(), b.unwrap())
}

/// Drive the sans-IO handshake directly over a raw duplex end, so the test
/// can read and write raw frames afterwards.
async fn raw_handshake(stream: &mut DuplexStream, psk: Option<PreSharedKey>) -> SessionKeys {
    let mut handshake = Handshake::new(psk).unwrap();
    loop {
        match handshake.next_action() {
            HandshakeAction::WriteMessage => {
                let message = handshake.write_message().unwrap();
                stream.write_all(&message).await.unwrap();
            }
            HandshakeAction::ReadMessage => {
                let mut message = [0u8; MESSAGE_LEN];
                stream.read_exact(&mut message).await.unwrap();
                handshake.read_message(&message).unwrap();
            }
            HandshakeAction::Complete => return handshake.into_session().unwrap(),
        }
    }
}

/// Read one raw frame: `(len, nonce, ciphertext)`.
async fn read_raw_frame(stream: &mut DuplexStream) -> (u32, [u8; 24], Vec<u8>) {
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).await.unwrap();
    let len = u32::from_le_bytes(len_bytes);

    let mut nonce = [0u8; 24];
    stream.read_exact(&mut nonce).await.unwrap();

    let mut ciphertext = vec![0u8; len as usize];
    stream.read_exact(&mut ciphertext).await.unwrap();
    (len, nonce, ciphertext)
}

/// Write one raw frame.
async fn write_raw_frame(stream: &mut DuplexStream, nonce: &[u8; 24], ciphertext: &[u8]) {
    let len = u32::try_from(ciphertext.len()).unwrap();
    stream.write_all(&len.to_le_bytes()).await.unwrap();
    stream.write_all(nonce).await.unwrap();
    stream.write_all(ciphertext).await.unwrap();
}

// ---------------------------------------------------------------------------
// Basic round trips
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_pong_without_psk() {
    let (mut a, mut b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;

    a.write_packet(b"ping").await.unwrap();
    assert_eq!(b.read_packet().await.unwrap(), b"ping");

    b.write_packet(b"pong").await.unwrap();
    assert_eq!(a.read_packet().await.unwrap(), b"pong");
}

#[tokio::test]
async fn roles_are_complementary() {
    let (a, b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;
    assert_ne!(a.role(), b.role());
    assert!(matches!(a.role(), Role::Initiator | Role::Responder));
    assert_eq!(a.transcript_hash(), b.transcript_hash());
}

#[tokio::test]
async fn zero_length_packet_round_trips() {
    let (mut a, mut b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;
    a.write_packet(b"").await.unwrap();
    assert_eq!(b.read_packet().await.unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn packets_arrive_in_write_order() {
    let (mut a, mut b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;

    a.write_packet(b"first").await.unwrap();
    a.write_packet(b"second").await.unwrap();
    assert_eq!(b.read_packet().await.unwrap(), b"first");
    assert_eq!(b.read_packet().await.unwrap(), b"second");
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[tokio::test]
async fn frame_layout_is_len_nonce_ciphertext() {
    let (end_a, mut end_b) = duplex(64 * 1024);

    let (stream, keys) = tokio::join!(
        SecureStream::new(end_a, StreamOptions::default()),
        raw_handshake(&mut end_b, None),
    );
    let mut stream = stream.unwrap();

    stream.write_packet(b"ping").await.unwrap();

    let (len, nonce, ciphertext) = read_raw_frame(&mut end_b).await;
    assert_eq!(len, 4 + 16, "4 plaintext bytes plus the AEAD tag");
    let packet = aead::open(keys.decryption_key(), &nonce, &ciphertext).unwrap();
    assert_eq!(packet, b"ping");
}

#[tokio::test]
async fn nonces_are_fresh_per_record() {
    let (end_a, mut end_b) = duplex(64 * 1024);

    let (stream, _keys) = tokio::join!(
        SecureStream::new(end_a, StreamOptions::default()),
        raw_handshake(&mut end_b, None),
    );
    let mut stream = stream.unwrap();

    stream.write_packet(b"one").await.unwrap();
    stream.write_packet(b"one").await.unwrap();

    let (_, nonce1, ciphertext1) = read_raw_frame(&mut end_b).await;
    let (_, nonce2, ciphertext2) = read_raw_frame(&mut end_b).await;
    assert_ne!(nonce1, nonce2);
    assert_ne!(ciphertext1, ciphertext2);
}

// ---------------------------------------------------------------------------
// Pre-shared keys
// ---------------------------------------------------------------------------

#[tokio::test]
async fn matching_psks_carry_large_payloads() {
    let psk = PreSharedKey::new(vec![0x41; 32]);
    let (mut a, mut b) = establish_pair(
        StreamOptions::with_psk(psk.clone()),
        StreamOptions::with_psk(psk),
    )
    .await;

    let payload: Vec<u8> = (0..1024).map(|_| rand::random::<u8>()).collect();
    a.write_packet(&payload).await.unwrap();
    assert_eq!(b.read_packet().await.unwrap(), payload);
}

#[tokio::test]
async fn mismatched_psks_fail_authentication_on_both_sides() {
    let (end_a, end_b) = duplex(64 * 1024);
    let (a, b) = tokio::join!(
        SecureStream::new(end_a, StreamOptions::with_psk(PreSharedKey::new(vec![0x41; 32]))),
        SecureStream::new(end_b, StreamOptions::with_psk(PreSharedKey::new(vec![0x42; 32]))),
    );

    assert!(matches!(
        a.err().unwrap(),
        Error::Crypto(CryptoError::Authentication)
    ));
    assert!(matches!(
        b.err().unwrap(),
        Error::Crypto(CryptoError::Authentication)
    ));
}

#[tokio::test]
async fn short_psk_rejected_before_any_io() {
    // No peer at the other end: the error must surface without any wire
    // traffic.
    let (end_a, _end_b) = duplex(64);
    let result = SecureStream::new(
        end_a,
        StreamOptions::with_psk(PreSharedKey::new(vec![0x41; 8])),
    )
    .await;
    assert!(matches!(
        result.err().unwrap(),
        Error::Crypto(CryptoError::InvalidKeyMaterial)
    ));
}

#[tokio::test]
async fn one_sided_psk_fails_closed() {
    let (end_a, end_b) = duplex(64 * 1024);

    let with_psk = SecureStream::new(
        end_a,
        StreamOptions::with_psk(PreSharedKey::new(vec![0x41; 32])),
    );
    let without_psk = async {
        let mut stream = SecureStream::new(end_b, StreamOptions::default()).await?;
        stream.write_packet(b"hello").await?;
        stream.read_packet().await.map(|_| ())
    };

    let (a, b) = tokio::join!(with_psk, without_psk);

    // The authenticated side reads frame bytes where it expects a MAC and
    // must fail authentication; the other side observes a dead channel or
    // garbage framing. Neither side hangs or silently carries on.
    assert!(matches!(
        a.err().unwrap(),
        Error::Crypto(CryptoError::Authentication)
    ));
    assert!(b.is_err());
}

// ---------------------------------------------------------------------------
// Size limits
// ---------------------------------------------------------------------------

fn small_limit() -> StreamOptions {
    StreamOptions {
        max_packet_size: 1024,
        ..StreamOptions::default()
    }
}

#[tokio::test]
async fn oversize_write_is_rejected_but_not_fatal() {
    let (mut a, mut b) = establish_pair(small_limit(), small_limit()).await;

    let result = a.write_packet(&vec![0u8; 1025]).await;
    assert!(matches!(
        result.err().unwrap(),
        Error::Message(MessageError::TooLarge { size: 1025, .. })
    ));

    // The writer is still usable and the limit itself is writable.
    a.write_packet(&vec![0u8; 1024]).await.unwrap();
    assert_eq!(b.read_packet().await.unwrap(), vec![0u8; 1024]);
}

#[tokio::test]
async fn oversize_frame_length_is_fatal_on_read() {
    let (end_a, mut end_b) = duplex(64 * 1024);

    let (stream, keys) = tokio::join!(
        SecureStream::new(end_a, small_limit()),
        raw_handshake(&mut end_b, None),
    );
    let mut stream = stream.unwrap();

    // Claim a frame one byte past the receiver's bound (1024 + 16 + 1).
    let oversized = 1024 + 16 + 1;
    end_b
        .write_all(&u32::to_le_bytes(oversized))
        .await
        .unwrap();

    let result = stream.read_packet().await;
    assert!(matches!(
        result.err().unwrap(),
        Error::Message(MessageError::TooLarge { .. })
    ));

    // The reader latches closed: the framing can no longer be trusted.
    assert!(matches!(
        stream.read_packet().await.err().unwrap(),
        Error::Channel(ChannelError::Closed)
    ));
    let _ = keys;
}

#[tokio::test]
async fn zero_frame_length_is_rejected() {
    let (end_a, mut end_b) = duplex(64 * 1024);

    let (stream, _keys) = tokio::join!(
        SecureStream::new(end_a, StreamOptions::default()),
        raw_handshake(&mut end_b, None),
    );
    let mut stream = stream.unwrap();

    end_b.write_all(&0u32.to_le_bytes()).await.unwrap();
    assert!(matches!(
        stream.read_packet().await.err().unwrap(),
        Error::Message(MessageError::TooLarge { size: 0, .. })
    ));
}

// ---------------------------------------------------------------------------
// Tampering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_ciphertext_is_fatal() {
    let (end_a, mut end_b) = duplex(64 * 1024);

    let (stream, keys) = tokio::join!(
        SecureStream::new(end_a, StreamOptions::default()),
        raw_handshake(&mut end_b, None),
    );
    let mut stream = stream.unwrap();

    let nonce: [u8; 24] = murex_handshake::crypto::rng::random_array();
    let mut ciphertext = aead::seal(keys.encryption_key(), &nonce, b"ping").unwrap();
    ciphertext[0] ^= 0x01;
    write_raw_frame(&mut end_b, &nonce, &ciphertext).await;

    assert!(matches!(
        stream.read_packet().await.err().unwrap(),
        Error::Crypto(CryptoError::Decryption)
    ));

    // Later reads fail closed even though the channel still has bytes.
    write_raw_frame(&mut end_b, &nonce, &[0u8; 20]).await;
    assert!(matches!(
        stream.read_packet().await.err().unwrap(),
        Error::Channel(ChannelError::Closed)
    ));
}

#[tokio::test]
async fn tampered_nonce_is_fatal() {
    let (end_a, mut end_b) = duplex(64 * 1024);

    let (stream, keys) = tokio::join!(
        SecureStream::new(end_a, StreamOptions::default()),
        raw_handshake(&mut end_b, None),
    );
    let mut stream = stream.unwrap();

    let mut nonce: [u8; 24] = murex_handshake::crypto::rng::random_array();
    let ciphertext = aead::seal(keys.encryption_key(), &nonce, b"ping").unwrap();
    nonce[7] ^= 0x80;
    write_raw_frame(&mut end_b, &nonce, &ciphertext).await;

    assert!(matches!(
        stream.read_packet().await.err().unwrap(),
        Error::Crypto(CryptoError::Decryption)
    ));
}

// ---------------------------------------------------------------------------
// Split halves
// ---------------------------------------------------------------------------

#[tokio::test]
async fn split_halves_run_concurrently() {
    let (a, b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;
    let (mut a_reader, mut a_writer) = a.split();
    let (mut b_reader, mut b_writer) = b.split();

    const COUNT: u32 = 100;

    async fn pump_out<W>(writer: &mut PacketWriter<W>, label: &str)
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        for i in 0..COUNT {
            let packet = format!("{label}-{i}");
            writer.write_packet(packet.as_bytes()).await.unwrap();
        }
    }

    async fn pump_in<R>(reader: &mut PacketReader<R>, label: &str)
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        for i in 0..COUNT {
            let expected = format!("{label}-{i}");
            assert_eq!(reader.read_packet().await.unwrap(), expected.as_bytes());
        }
    }

    tokio::join!(
        pump_out(&mut a_writer, "a"),
        pump_in(&mut b_reader, "a"),
        pump_out(&mut b_writer, "b"),
        pump_in(&mut a_reader, "b"),
    );
}

#[tokio::test]
async fn dropping_one_half_leaves_the_other_usable() {
    let (a, b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;
    let (a_reader, mut a_writer) = a.split();
    let (mut b_reader, _b_writer) = b.split();

    drop(a_reader);

    a_writer.write_packet(b"still alive").await.unwrap();
    assert_eq!(b_reader.read_packet().await.unwrap(), b"still alive");
}

#[tokio::test]
async fn closing_the_channel_invalidates_both_halves() {
    let (a, b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;
    drop(a);

    let (mut b_reader, mut b_writer) = b.split();
    assert!(matches!(
        b_reader.read_packet().await.err().unwrap(),
        Error::Channel(ChannelError::Closed)
    ));
    assert!(b_writer.write_packet(b"into the void").await.is_err());
}

type RawPeerHalves = (
    PacketReader<ReadHalf<DuplexStream>>,
    PacketWriter<WriteHalf<DuplexStream>>,
);

#[tokio::test]
async fn split_then_interleaved_echo() {
    let (a, b) = establish_pair(StreamOptions::default(), StreamOptions::default()).await;
    let (mut a_reader, mut a_writer): RawPeerHalves = a.split();
    let (mut b_reader, mut b_writer): RawPeerHalves = b.split();

    let echo = tokio::spawn(async move {
        for _ in 0..10 {
            let packet = b_reader.read_packet().await.unwrap();
            b_writer.write_packet(&packet).await.unwrap();
        }
    });

    for i in 0..10u8 {
        a_writer.write_packet(&[i; 33]).await.unwrap();
        assert_eq!(a_reader.read_packet().await.unwrap(), [i; 33]);
    }
    echo.await.unwrap();
}
