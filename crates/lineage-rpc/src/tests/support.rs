//! In-memory language server peer for transport tests.

use std::io::{PipeReader, PipeWriter, Read, Write};

use serde_json::{Value, json};

use crate::{Endpoint, FrameDecoder, encode_frame};

/// The far end of an endpoint's stream, driven by the test thread.
pub(super) struct FakeServer {
    reader: PipeReader,
    writer: Option<PipeWriter>,
    decoder: FrameDecoder,
}

impl FakeServer {
    /// Blocks until the client has written one complete message.
    pub(super) fn read_message(&mut self) -> Value {
        let mut chunk = [0_u8; 4096];
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                let payload = frame.expect("client wrote a valid frame");
                return serde_json::from_slice(&payload).expect("client wrote JSON");
            }
            let read = self.reader.read(&mut chunk).expect("read from client");
            assert!(read > 0, "client closed its stream");
            self.decoder
                .push(chunk.get(..read).expect("read within chunk bounds"));
        }
    }

    /// Reads `count` requests and returns their ids and methods.
    pub(super) fn read_requests(&mut self, count: usize) -> Vec<(i64, String)> {
        (0..count)
            .map(|_| {
                let message = self.read_message();
                let id = message["id"].as_i64().expect("numeric request id");
                let method = message["method"]
                    .as_str()
                    .expect("request method")
                    .to_owned();
                (id, method)
            })
            .collect()
    }

    pub(super) fn send(&mut self, message: &Value) {
        let payload = serde_json::to_vec(message).expect("serialise message");
        self.send_raw(&encode_frame(&payload));
    }

    pub(super) fn send_raw(&mut self, bytes: &[u8]) {
        let writer = self.writer.as_mut().expect("server stream still open");
        writer.write_all(bytes).expect("write to client");
        writer.flush().expect("flush to client");
    }

    pub(super) fn reply(&mut self, id: i64, result: Value) {
        self.send(&json!({"jsonrpc": "2.0", "id": id, "result": result}));
    }

    pub(super) fn reply_error(&mut self, id: i64, code: i64, message: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }));
    }

    /// Closes the server-to-client direction, which the client sees as EOF.
    pub(super) fn hang_up(&mut self) {
        self.writer = None;
    }
}

/// Connects a fresh endpoint to a fake server over two OS pipes.
pub(super) fn connect() -> (Endpoint, FakeServer) {
    let (client_reader, server_writer) = std::io::pipe().expect("create pipe");
    let (server_reader, client_writer) = std::io::pipe().expect("create pipe");
    let endpoint = Endpoint::new(client_reader, client_writer).expect("start endpoint");
    let server = FakeServer {
        reader: server_reader,
        writer: Some(server_writer),
        decoder: FrameDecoder::new(),
    };
    (endpoint, server)
}
