//! Client
//!
//! Client end of a secure session: arms an expectation for every request
//! it sends and routes responses through a [`ClientDispatcher`].

use std::net::TcpStream;

use crate::channel::SecureChannel;
use crate::config::Config;
use crate::error::{AgoraError, Result};
use crate::handshake::{HandshakeState, Initiator};
use crate::protocol::{ProtocolCommand, Request};
use crate::session::{ClientDispatcher, ClientHandler, Delivery};
use crate::transport::{TcpTransport, Transport};

/// A connected, encrypted client session
pub struct Client<T: Transport> {
    channel: SecureChannel<T>,
    dispatcher: ClientDispatcher,
}

impl Client<TcpTransport> {
    /// Connect to `addr` and run the key exchange
    pub fn connect(addr: &str, config: &Config) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let mut transport = TcpTransport::new(stream, config.max_frame_size)?;
        transport.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
        tracing::debug!("Connected to {}", transport.peer_addr());

        let mut initiator = Initiator::generate(config.rsa_key_bits)?;
        Self::handshake(transport, &mut initiator)
    }
}

impl<T: Transport> Client<T> {
    /// Run the key exchange as initiator over `transport`
    pub fn handshake(transport: T, initiator: &mut Initiator) -> Result<Self> {
        let channel = SecureChannel::connect(transport, initiator)?;
        Ok(Self {
            channel,
            dispatcher: ClientDispatcher::new(),
        })
    }

    pub fn state(&self) -> HandshakeState {
        self.channel.state()
    }

    pub fn is_pending(&self, command: ProtocolCommand) -> bool {
        self.dispatcher.is_pending(command)
    }

    /// Send `request` and expect its OK/KO
    pub fn send(&mut self, request: Request) -> Result<()> {
        self.dispatcher.arm(&request)?;
        if let Err(e) = self.channel.send(&request) {
            if self.channel.state().is_terminal() {
                self.dispatcher.abort();
            } else {
                self.dispatcher.disarm(request.command());
            }
            return Err(e);
        }
        Ok(())
    }

    /// Receive one response and deliver it to `handler`
    ///
    /// A timeout while requests are outstanding closes the session.
    pub fn poll<H: ClientHandler + ?Sized>(&mut self, handler: &mut H) -> Result<Delivery> {
        match self.channel.recv() {
            Ok(response) => self.dispatcher.on_received(response, handler),
            Err(e) => {
                self.settle(&e);
                Err(e)
            }
        }
    }

    /// Send `request` and deliver responses until nothing is outstanding
    ///
    /// Follow-ups armed along the way (the domain list after `SIGN_IN`) are
    /// waited for too. Returns `ConnectionClosed` if the session ends first,
    /// and the decode error if an outstanding answer arrives malformed.
    pub fn call<H: ClientHandler + ?Sized>(&mut self, request: Request, handler: &mut H) -> Result<()> {
        self.send(request)?;
        while self.dispatcher.has_pending() {
            let response = match self.channel.recv() {
                Ok(response) => response,
                Err(e) => {
                    if self.settle(&e).is_some() || e.is_fatal() {
                        return Err(e);
                    }
                    tracing::warn!("Ignoring bad response: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.dispatcher.on_received(response, handler) {
                tracing::warn!("Ignoring bad response: {}", e);
            }
        }
        Ok(())
    }

    /// Drop outstanding expectations and close the session
    pub fn close(&mut self) {
        self.dispatcher.abort();
        self.channel.close();
    }

    /// Update expectations after a failed receive
    ///
    /// Returns the request whose answer failed to decode, now disarmed.
    fn settle(&mut self, error: &AgoraError) -> Option<ProtocolCommand> {
        if matches!(error, AgoraError::Timeout) && self.dispatcher.has_pending() {
            tracing::warn!("No response in time, closing session");
            self.channel.close();
        }
        if self.channel.state().is_terminal() {
            let aborted = self.dispatcher.abort();
            if !aborted.is_empty() {
                tracing::debug!("Session ended with {:?} outstanding", aborted);
            }
            return None;
        }

        match error {
            AgoraError::MalformedPayload {
                command: Some(command),
                ..
            } => {
                let request = command.request_for()?;
                self.dispatcher.disarm(request)?;
                tracing::warn!("Answer to {} could not be decoded", request);
                Some(request)
            }
            _ => None,
        }
    }
}
