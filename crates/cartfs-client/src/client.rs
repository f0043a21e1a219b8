use cartfs_proto::Opcode;
use tracing::{debug, info, warn};

use crate::bus::{CartBus, Request, Response};
use crate::config::ClientConfig;
use crate::connector::{connect, Connection};
use crate::error::{ClientError, Result};

/// Socket-backed controller client.
///
/// The connection is opened on the first request and closed after a
/// power-off exchange. A failed exchange also drops the connection, since
/// a late or partial answer may still be in flight on it. Either way the
/// next request connects again.
#[derive(Debug)]
pub struct BusClient {
    config: ClientConfig,
    conn: Option<Connection>,
    requests: u64,
}

impl BusClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            conn: None,
            requests: 0,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Requests sent over the lifetime of this client.
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    /// Close the connection, if any. The next request reconnects.
    pub fn disconnect(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => connect(&self.config)?,
        };
        Ok(self.conn.insert(conn))
    }

    /// Close the connection without reporting shutdown failures.
    fn drop_connection(&mut self, reason: &str) {
        if let Some(conn) = self.conn.take() {
            if let Err(err) = conn.close() {
                warn!(endpoint = %self.config.endpoint, error = %err, reason, "connection shutdown failed");
            }
        }
    }
}

fn exchange(conn: &mut Connection, op: Option<Opcode>, request: &Request) -> Result<Response> {
    let reg = request.register;
    match (op, &request.payload) {
        (Some(Opcode::ReadFrame), _) => {
            conn.writer.send_register(&reg)?;
            let register = conn.reader.read_register()?;
            let payload = conn.reader.read_frame()?;
            Ok(Response {
                register,
                payload: Some(payload),
            })
        }
        (Some(Opcode::WriteFrame), Some(payload)) => {
            conn.writer.send_register_with_frame(&reg, payload)?;
            Ok(Response {
                register: conn.reader.read_register()?,
                payload: None,
            })
        }
        _ => {
            conn.writer.send_register(&reg)?;
            Ok(Response {
                register: conn.reader.read_register()?,
                payload: None,
            })
        }
    }
}

impl CartBus for BusClient {
    fn request(&mut self, request: Request) -> Result<Response> {
        let reg = request.register;
        let op = reg.opcode().ok();
        if op == Some(Opcode::WriteFrame) && request.payload.is_none() {
            return Err(ClientError::MissingPayload(reg.frame));
        }

        self.requests += 1;
        debug!(
            op = op.map(Opcode::name).unwrap_or("UNKNOWN"),
            cartridge = reg.cartridge,
            frame = reg.frame,
            "controller request"
        );

        let conn = self.connection()?;
        let response = match exchange(conn, op, &request) {
            Ok(response) => response,
            Err(err) => {
                warn!(endpoint = %self.config.endpoint, error = %err, "exchange failed, dropping connection");
                self.drop_connection("failed exchange");
                return Err(err);
            }
        };

        if op == Some(Opcode::PowerOff) {
            self.drop_connection("power off");
            info!(endpoint = %self.config.endpoint, "controller powered off, connection closed");
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use cartfs_proto::{ProtoError, Register, FRAME_SIZE, REGISTER_SIZE};
    use cartfs_transport::{Endpoint, TransportError};

    use super::*;

    fn read_reg(stream: &mut TcpStream) -> Register {
        let mut buf = [0u8; REGISTER_SIZE];
        stream.read_exact(&mut buf).unwrap();
        Register::from(u64::from_be_bytes(buf))
    }

    fn write_reg(stream: &mut TcpStream, reg: Register) {
        stream.write_all(&reg.to_u64().to_be_bytes()).unwrap();
    }

    fn client_for(listener: &TcpListener) -> BusClient {
        BusClient::new(ClientConfig::with_endpoint(Endpoint::Tcp(
            listener.local_addr().unwrap(),
        )))
    }

    #[test]
    fn connects_lazily_and_exchanges_registers() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);
        assert!(!client.is_connected());

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let reg = read_reg(&mut stream);
            write_reg(&mut stream, reg.respond(true));
            reg
        });

        let response = client.request(Request::load_cartridge(9)).unwrap();
        assert!(client.is_connected());
        assert!(response.register.is_ok());
        assert_eq!(response.register.cartridge, 9);
        assert!(response.payload.is_none());

        let seen = server.join().unwrap();
        assert_eq!(seen.opcode().unwrap(), Opcode::LoadCartridge);
        assert_eq!(client.request_count(), 1);
    }

    #[test]
    fn read_frame_receives_payload_after_register() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let reg = read_reg(&mut stream);
            write_reg(&mut stream, reg.respond(true));
            stream.write_all(&vec![0x42; FRAME_SIZE]).unwrap();
        });

        let response = client.request(Request::read_frame(17)).unwrap();
        let payload = response.payload.unwrap();
        assert_eq!(payload.len(), FRAME_SIZE);
        assert!(payload.iter().all(|&b| b == 0x42));
        assert_eq!(response.register.frame, 17);

        server.join().unwrap();
    }

    #[test]
    fn write_frame_sends_payload_before_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let reg = read_reg(&mut stream);
            let mut frame = vec![0u8; FRAME_SIZE];
            stream.read_exact(&mut frame).unwrap();
            write_reg(&mut stream, reg.respond(false));
            frame
        });

        let response = client
            .request(Request::write_frame(3, vec![7u8; FRAME_SIZE]))
            .unwrap();
        assert!(!response.register.is_ok());

        let frame = server.join().unwrap();
        assert!(frame.iter().all(|&b| b == 7));
    }

    #[test]
    fn write_frame_without_payload_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let mut request = Request::write_frame(3, vec![0u8; FRAME_SIZE]);
        request.payload = None;
        let err = client.request(request).unwrap_err();
        assert!(matches!(err, ClientError::MissingPayload(3)));
        assert!(!client.is_connected());
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn timed_out_exchange_drops_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = BusClient::new(ClientConfig {
            endpoint: Endpoint::Tcp(listener.local_addr().unwrap()),
            read_timeout_ms: Some(100),
            write_timeout_ms: None,
        });

        let server = thread::spawn(move || {
            let (mut slow, _) = listener.accept().unwrap();
            let reg = read_reg(&mut slow);
            thread::sleep(Duration::from_millis(300));
            // The client has hung up by now; the late answer goes nowhere.
            let _ = slow.write_all(&reg.respond(true).to_u64().to_be_bytes());

            let (mut fresh, _) = listener.accept().unwrap();
            let reg = read_reg(&mut fresh);
            write_reg(&mut fresh, reg.respond(true));
        });

        let err = client.request(Request::load_cartridge(1)).unwrap_err();
        assert!(matches!(err, ClientError::Proto(ProtoError::Io(_))));
        assert!(!client.is_connected());

        let response = client.request(Request::load_cartridge(2)).unwrap();
        assert_eq!(response.register.cartridge, 2);
        assert!(client.is_connected());

        server.join().unwrap();
    }

    #[test]
    fn power_off_succeeds_when_controller_hangs_up() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let reg = read_reg(&mut stream);
            write_reg(&mut stream, reg.respond(true));
        });

        let response = client.request(Request::power_off()).unwrap();
        assert!(response.register.is_ok());
        assert!(!client.is_connected());
        server.join().unwrap();
    }

    #[test]
    fn power_off_closes_and_next_request_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let server = thread::spawn(move || {
            let mut accepted = 0;
            for _ in 0..2 {
                let (mut stream, _) = listener.accept().unwrap();
                accepted += 1;
                let reg = read_reg(&mut stream);
                write_reg(&mut stream, reg.respond(true));
                if reg.opcode().unwrap() == Opcode::PowerOff {
                    let mut rest = Vec::new();
                    stream.read_to_end(&mut rest).unwrap();
                    assert!(rest.is_empty());
                }
            }
            accepted
        });

        client.request(Request::power_off()).unwrap();
        assert!(!client.is_connected());
        client.request(Request::init()).unwrap();
        assert!(client.is_connected());

        assert_eq!(server.join().unwrap(), 2);
    }

    #[test]
    fn connect_failure_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);
        drop(listener);

        let err = client.request(Request::init()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Connect { .. })
        ));
        assert!(!client.is_connected());
    }

    #[test]
    fn short_response_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let _ = read_reg(&mut stream);
            stream.write_all(&[0u8; 3]).unwrap();
        });

        let err = client.request(Request::init()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Proto(ProtoError::ConnectionClosed)
        ));
        assert!(!client.is_connected());
        server.join().unwrap();
    }
}
