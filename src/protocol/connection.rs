use anyhow::Context;
use bytes::{Buf, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::access_log;
use crate::error::ProtocolError;
use crate::protocol::dispatch::Dispatcher;
use crate::protocol::framing::Reassembler;
use crate::protocol::response::{Reply, Response, StatusCode};
use crate::protocol::writer::ReplyWriter;

/// One accepted client connection.
///
/// Owns the socket and the inbound buffer exclusively; commands are
/// framed, dispatched, and answered strictly in order. The buffer is
/// drained by exactly the consumed frame length after each dispatch, so
/// pipelined bytes carry over to the next command.
pub struct Connection {
    stream: TcpStream,
    peer: IpAddr,
    buffer: BytesMut,
    reassembler: Reassembler,
    dispatcher: Arc<Dispatcher>,
    idle_timeout: Duration,
}

/// Collapses IPv4-mapped IPv6 addresses to IPv4 and the IPv6 loopback
/// to 127.0.0.1, so rate-limit entries key the same client consistently.
pub fn normalize_peer(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                IpAddr::V4(v4)
            } else if v6 == Ipv6Addr::LOCALHOST {
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            } else {
                IpAddr::V6(v6)
            }
        }
        v4 => v4,
    }
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        dispatcher: Arc<Dispatcher>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            stream,
            peer: normalize_peer(peer.ip()),
            buffer: BytesMut::with_capacity(4096),
            reassembler: Reassembler::new(),
            dispatcher,
            idle_timeout,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            // Frame from what is already buffered before reading more
            match self.reassembler.advance(&self.buffer) {
                Ok(Some(frame)) => {
                    let consumed = frame.consumed;
                    let reply = self.dispatcher.dispatch(frame.command, self.peer).await;
                    self.buffer.advance(consumed);

                    let close = reply.close;
                    self.write_reply(&reply).await?;
                    if close {
                        return Ok(());
                    }
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    // Resync after a framing error is unreliable, so
                    // answer and close.
                    let err = ProtocolError::from(e);
                    let status = err.status();
                    access_log::record(self.peer, "UNKNOWN", status.as_u16(), &err.to_string());
                    let reply = Reply::http(Response::status_line(status, &err.to_string()));
                    self.write_reply(&reply).await?;
                    return Ok(());
                }
            }

            match timeout(self.idle_timeout, self.stream.read_buf(&mut self.buffer)).await {
                Err(_) => {
                    access_log::record(self.peer, "UNKNOWN", 408, "idle timeout");
                    let reply = Reply::http(Response::status_line(
                        StatusCode::RequestTimeout,
                        "Request timeout",
                    ));
                    self.write_reply(&reply).await?;
                    return Ok(());
                }

                Ok(Ok(0)) => {
                    // Peer finished sending. Leftover non-blank bytes
                    // mean a truncated request, never dispatched partial.
                    if self.buffer.iter().any(|b| !b" \t\r\n".contains(b)) {
                        let msg = if self.reassembler.awaiting_body() {
                            "Incomplete request body"
                        } else {
                            "Incomplete request"
                        };
                        access_log::record(self.peer, "UNKNOWN", 400, msg);
                        let reply =
                            Reply::http(Response::status_line(StatusCode::BadRequest, msg));
                        self.write_reply(&reply).await?;
                    }
                    return Ok(());
                }

                Ok(Ok(_)) => {}

                Ok(Err(e)) => {
                    // Transport error: no response attempt on a broken
                    // socket, the listener logs it.
                    return Err(e).context("read from client failed");
                }
            }
        }
    }

    async fn write_reply(&mut self, reply: &Reply) -> anyhow::Result<()> {
        let mut writer = ReplyWriter::new(reply);
        writer.write_to_stream(&mut self.stream).await
    }
}
