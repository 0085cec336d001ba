//! Client Tests
//!
//! Tests for the client session against a scripted peer over the in-memory
//! transport: late answers and answers that fail to decode.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use agora::channel::SecureChannel;
use agora::crypto::{RsaKeyPair, SessionCipher};
use agora::handshake::{HandshakeState, Initiator, Responder};
use agora::network::Client;
use agora::protocol::{self, ErrorLogMessage, Failure, NoParams, ProtocolCommand, Request, SignUp};
use agora::session::ClientHandler;
use agora::transport::{MemoryTransport, Transport};
use agora::AgoraError;

const TEST_BITS: usize = 1024;

#[derive(Default)]
struct Answers {
    oks: usize,
    kos: Vec<ErrorLogMessage>,
}

impl ClientHandler for Answers {
    fn sign_up_ok(&mut self) {
        self.oks += 1;
    }

    fn sign_up_ko(&mut self, error: ErrorLogMessage) {
        self.kos.push(error);
    }
}

fn sign_up(mail: &str) -> Request {
    Request::SignUp(SignUp {
        mail: mail.to_string(),
        name: "Ann".to_string(),
        pwd: "pw".to_string(),
    })
}

fn server_keys() -> Arc<RsaKeyPair> {
    Arc::new(RsaKeyPair::generate(TEST_BITS).unwrap())
}

/// Client with a bounded read wait, and a server thread running `server`
fn client_with_timeout<F, R>(timeout: Duration, server: F) -> (Client<MemoryTransport>, JoinHandle<R>)
where
    F: FnOnce(MemoryTransport, Responder) -> R + Send + 'static,
    R: Send + 'static,
{
    let (client_end, server_end) = MemoryTransport::pair();
    let responder = Responder::new(server_keys());
    let server = thread::spawn(move || server(server_end, responder));

    let mut initiator = Initiator::generate(TEST_BITS).unwrap();
    let client = Client::handshake(client_end.with_timeout(timeout), &mut initiator).unwrap();
    (client, server)
}

/// Responder side of the key exchange without the channel wrapper
fn raw_accept(transport: &mut MemoryTransport, mut responder: Responder) -> SessionCipher {
    let hello = protocol::decode(&transport.recv().unwrap()).unwrap();
    let (answer, cipher) = responder.respond(hello).unwrap();
    transport.send(&protocol::encode(&answer).unwrap()).unwrap();
    cipher
}

fn raw_recv(transport: &mut MemoryTransport, cipher: &SessionCipher) -> Request {
    let plaintext = cipher.decrypt(&transport.recv().unwrap()).unwrap();
    protocol::decode(&plaintext).unwrap()
}

// =============================================================================
// Late Answers
// =============================================================================

#[test]
fn test_timeout_with_request_outstanding_closes_session() {
    let (mut client, server) = client_with_timeout(Duration::from_millis(200), |end, mut responder| {
        let mut channel = SecureChannel::accept(end, &mut responder).unwrap();
        assert!(matches!(channel.recv().unwrap(), Request::SignUp(_)));

        // Answer after the client stopped waiting; it may already be gone
        thread::sleep(Duration::from_millis(400));
        let late = Request::SignUpKo(Failure::from(ErrorLogMessage::MailAlreadyTaken));
        if channel.send(&late).is_ok() {
            // Nothing else arrives once the client has given up
            assert!(matches!(channel.recv(), Err(AgoraError::ConnectionClosed)));
        }
    });
    let mut answers = Answers::default();

    let first = client.call(sign_up("ann@agora.test"), &mut answers);
    assert!(matches!(first, Err(AgoraError::Timeout)));
    assert_eq!(client.state(), HandshakeState::Closed);
    assert!(!client.is_pending(ProtocolCommand::SignUp));

    // The late KO must never be taken as the answer to a new request
    let second = client.call(sign_up("bob@agora.test"), &mut answers);
    assert!(matches!(second, Err(AgoraError::ConnectionClosed)));
    assert!(!client.is_pending(ProtocolCommand::SignUp));
    assert_eq!(answers.oks, 0);
    assert!(answers.kos.is_empty());

    drop(client);
    server.join().unwrap();
}

#[test]
fn test_timeout_with_nothing_outstanding_keeps_session() {
    let (mut client, server) = client_with_timeout(Duration::from_millis(100), |end, mut responder| {
        let mut channel = SecureChannel::accept(end, &mut responder).unwrap();
        assert!(matches!(channel.recv().unwrap(), Request::SignUp(_)));
        channel.send(&Request::SignUpOk(NoParams {})).unwrap();
        let _ = channel.recv();
    });
    let mut answers = Answers::default();

    assert!(matches!(client.poll(&mut answers), Err(AgoraError::Timeout)));
    assert_eq!(client.state(), HandshakeState::SessionEstablished);

    client.call(sign_up("ann@agora.test"), &mut answers).unwrap();
    assert_eq!(answers.oks, 1);

    drop(client);
    server.join().unwrap();
}

// =============================================================================
// Undecodable Answers
// =============================================================================

#[test]
fn test_malformed_answer_settles_outstanding_request() {
    let (mut client, server) = client_with_timeout(Duration::from_secs(5), |mut end, responder| {
        let cipher = raw_accept(&mut end, responder);

        assert!(matches!(raw_recv(&mut end, &cipher), Request::SignUp(_)));
        let bad = br#"{"command":"SIGN_UP_KO","param":{"Error":"Something went wrong"}}"#;
        end.send(&cipher.encrypt(bad).unwrap()).unwrap();

        assert!(matches!(raw_recv(&mut end, &cipher), Request::SignUp(_)));
        let ok = protocol::encode(&Request::SignUpOk(NoParams {})).unwrap();
        end.send(&cipher.encrypt(&ok).unwrap()).unwrap();
    });
    let mut answers = Answers::default();

    let first = client.call(sign_up("ann@agora.test"), &mut answers);
    assert!(matches!(
        first,
        Err(AgoraError::MalformedPayload {
            command: Some(ProtocolCommand::SignUpKo),
            ..
        })
    ));
    assert!(!client.is_pending(ProtocolCommand::SignUp));
    assert_eq!(client.state(), HandshakeState::SessionEstablished);

    // The session stays usable and the same request can be sent again
    client.call(sign_up("ann@agora.test"), &mut answers).unwrap();
    assert_eq!(answers.oks, 1);
    assert!(answers.kos.is_empty());

    server.join().unwrap();
}

#[test]
fn test_malformed_unrelated_answer_keeps_waiting() {
    let (mut client, server) = client_with_timeout(Duration::from_secs(5), |mut end, responder| {
        let cipher = raw_accept(&mut end, responder);

        assert!(matches!(raw_recv(&mut end, &cipher), Request::SignUp(_)));
        let stray = br#"{"command":"CREATE_ANNONCE_KO","param":{"Error":"Something went wrong"}}"#;
        end.send(&cipher.encrypt(stray).unwrap()).unwrap();
        let ok = protocol::encode(&Request::SignUpOk(NoParams {})).unwrap();
        end.send(&cipher.encrypt(&ok).unwrap()).unwrap();
    });
    let mut answers = Answers::default();

    client.call(sign_up("ann@agora.test"), &mut answers).unwrap();
    assert_eq!(answers.oks, 1);

    server.join().unwrap();
}
