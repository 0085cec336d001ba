//! Handshake Tests
//!
//! Tests for the key exchange and the secure channel built on it, over the
//! in-memory transport.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agora::channel::SecureChannel;
use agora::crypto::RsaKeyPair;
use agora::handshake::{HandshakeState, Initiator, Responder};
use agora::protocol::{self, KeyExchange, KeyExchangeOk, NoParams, Request, SignUp};
use agora::transport::{MemoryTransport, Transport};
use agora::AgoraError;

const TEST_BITS: usize = 1024;

fn server_keys() -> Arc<RsaKeyPair> {
    Arc::new(RsaKeyPair::generate(TEST_BITS).unwrap())
}

/// Client and server channels over one in-memory pipe
fn establish() -> (SecureChannel<MemoryTransport>, SecureChannel<MemoryTransport>) {
    let (client_end, server_end) = MemoryTransport::pair();
    let keys = server_keys();

    let server = thread::spawn(move || {
        let mut responder = Responder::new(keys);
        let channel = SecureChannel::accept(server_end, &mut responder).unwrap();
        assert_eq!(responder.state(), HandshakeState::SessionEstablished);
        channel
    });

    let mut initiator = Initiator::generate(TEST_BITS).unwrap();
    let client = SecureChannel::connect(client_end, &mut initiator).unwrap();
    assert_eq!(initiator.state(), HandshakeState::SessionEstablished);

    (client, server.join().unwrap())
}

// =============================================================================
// Engine
// =============================================================================

#[test]
fn test_engine_agrees_on_session_key() {
    let mut initiator = Initiator::generate(TEST_BITS).unwrap();
    let mut responder = Responder::new(server_keys());

    let hello = initiator.hello().unwrap();
    assert_eq!(initiator.state(), HandshakeState::KeySent);

    let (answer, server_cipher) = responder.respond(hello).unwrap();
    let client_cipher = initiator.finish(answer).unwrap();
    assert_eq!(initiator.state(), HandshakeState::SessionEstablished);
    assert_eq!(responder.state(), HandshakeState::SessionEstablished);

    let ciphertext = client_cipher.encrypt(b"hello over the wire").unwrap();
    assert_ne!(&ciphertext[..], b"hello over the wire");
    assert_eq!(server_cipher.decrypt(&ciphertext).unwrap(), b"hello over the wire");
}

#[test]
fn test_hello_sent_once() {
    let mut initiator = Initiator::generate(TEST_BITS).unwrap();
    initiator.hello().unwrap();
    assert!(matches!(initiator.hello(), Err(AgoraError::Handshake(_))));
}

#[test]
fn test_refusal_fails_initiator() {
    let mut initiator = Initiator::generate(TEST_BITS).unwrap();
    initiator.hello().unwrap();

    let result = initiator.finish(Responder::refusal());
    assert!(matches!(result, Err(AgoraError::Handshake(_))));
    assert_eq!(initiator.state(), HandshakeState::Failed);
}

#[test]
fn test_responder_rejects_other_commands() {
    let mut responder = Responder::new(server_keys());
    let result = responder.respond(Request::SignOut(NoParams {}));
    assert!(matches!(result, Err(AgoraError::Handshake(_))));
    assert_eq!(responder.state(), HandshakeState::Failed);
}

// =============================================================================
// Channel Establishment
// =============================================================================

#[test]
fn test_honest_peers_establish_session() {
    let (mut client, mut server) = establish();
    assert_eq!(client.state(), HandshakeState::SessionEstablished);
    assert_eq!(server.state(), HandshakeState::SessionEstablished);

    let request = Request::SignUp(SignUp {
        mail: "alice@agora.test".to_string(),
        name: "Alice".to_string(),
        pwd: "s3cret".to_string(),
    });
    client.send(&request).unwrap();
    assert_eq!(server.recv().unwrap(), request);

    server.send(&Request::SignUpOk(NoParams {})).unwrap();
    assert_eq!(client.recv().unwrap(), Request::SignUpOk(NoParams {}));
}

#[test]
fn test_corrupted_session_key_fails_initiator() {
    let (client_end, mut server_end) = MemoryTransport::pair();
    let keys = server_keys();

    let server = thread::spawn(move || {
        let hello = protocol::decode(&server_end.recv().unwrap()).unwrap();
        assert_eq!(hello.command(), agora::ProtocolCommand::KeyExchange);

        let answer = Request::KeyExchangeOk(KeyExchangeOk {
            public_key: keys.public_key_der().unwrap(),
            session_key: vec![0x5A; 128],
        });
        server_end.send(&protocol::encode(&answer).unwrap()).unwrap();
        server_end
    });

    let mut initiator = Initiator::generate(TEST_BITS).unwrap();
    let result = SecureChannel::connect(client_end.with_timeout(Duration::from_secs(5)), &mut initiator);
    assert!(result.is_err());
    assert_eq!(initiator.state(), HandshakeState::Failed);

    server.join().unwrap();
}

#[test]
fn test_silent_responder_times_out() {
    let (client_end, _server_end) = MemoryTransport::pair();
    let mut initiator = Initiator::generate(TEST_BITS).unwrap();

    let result = SecureChannel::connect(
        client_end.with_timeout(Duration::from_millis(200)),
        &mut initiator,
    );
    assert!(matches!(result, Err(AgoraError::Timeout)));
    assert_eq!(initiator.state(), HandshakeState::Failed);
}

#[test]
fn test_vanished_responder_closes() {
    let (client_end, server_end) = MemoryTransport::pair();
    drop(server_end);

    let mut initiator = Initiator::generate(TEST_BITS).unwrap();
    let result = SecureChannel::connect(client_end, &mut initiator);
    assert!(matches!(result, Err(AgoraError::ConnectionClosed)));
    assert_eq!(initiator.state(), HandshakeState::Failed);
}

#[test]
fn test_garbage_public_key_is_refused() {
    let (mut client_end, server_end) = MemoryTransport::pair();
    let keys = server_keys();

    let server = thread::spawn(move || {
        let mut responder = Responder::new(keys);
        let result = SecureChannel::accept(server_end, &mut responder);
        (result.is_err(), responder.state())
    });

    let hello = Request::KeyExchange(KeyExchange {
        public_key: b"not a key".to_vec(),
        iv: vec![0u8; 16],
    });
    client_end.send(&protocol::encode(&hello).unwrap()).unwrap();

    let answer = protocol::decode(&client_end.recv().unwrap()).unwrap();
    assert_eq!(answer, Responder::refusal());

    let (failed, state) = server.join().unwrap();
    assert!(failed);
    assert_eq!(state, HandshakeState::Failed);
}

// =============================================================================
// Established Session
// =============================================================================

#[test]
fn test_tampered_frame_fails_session() {
    let (mut client, mut server) = establish();

    // Not a whole number of AES blocks
    client.transport_mut().send(&[0xEE; 13]).unwrap();

    assert!(matches!(server.recv(), Err(AgoraError::Crypto(_))));
    assert_eq!(server.state(), HandshakeState::Failed);

    // No resumption once integrity is lost
    assert!(server.send(&Request::SignOutOk(NoParams {})).is_err());
}

#[test]
fn test_peer_drop_closes_session() {
    let (client, mut server) = establish();
    drop(client);

    assert!(matches!(server.recv(), Err(AgoraError::ConnectionClosed)));
    assert_eq!(server.state(), HandshakeState::Closed);
}

#[test]
fn test_closed_channel_refuses_traffic() {
    let (mut client, _server) = establish();
    client.close();
    assert_eq!(client.state(), HandshakeState::Closed);
    assert!(matches!(
        client.send(&Request::SignOut(NoParams {})),
        Err(AgoraError::ConnectionClosed)
    ));
}
