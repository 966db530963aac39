use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpStream},
    sync::{mpsc, Arc, Mutex},
    thread,
    time::Duration,
};

use uplift_select::{
    Address, CodecError, Handle, Message, MessageCodec, MessageHandler, OpCode, Reactor,
    ReactorConfig,
};

/// Splits the inbound stream on newlines.
struct LineCodec;

impl MessageCodec for LineCodec {
    fn decode(&mut self, peer: Handle, inbound: &mut Vec<u8>) -> Result<Vec<Message>, CodecError> {
        let mut messages = Vec::new();
        while let Some(pos) = inbound.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = inbound.drain(..=pos).collect();
            messages.push(Message {
                opcode: OpCode(0),
                source: Address(peer.as_usize() as u64),
                destination: Address(0),
                payload: line[..line.len() - 1].to_vec(),
            });
        }
        Ok(messages)
    }
}

#[derive(Clone, Default)]
struct SharedLog {
    lines: Arc<Mutex<Vec<String>>>,
    disconnects: Arc<Mutex<usize>>,
}

impl MessageHandler for SharedLog {
    fn on_message(&mut self, _peer: Handle, message: Message) {
        let line = String::from_utf8_lossy(&message.payload).into_owned();
        self.lines.lock().unwrap().push(line);
    }

    fn on_disconnect(&mut self, _peer: Handle) {
        *self.disconnects.lock().unwrap() += 1;
    }
}

fn wait_for(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached in time");
}

#[test]
fn test_greet_decode_and_shutdown() {
    let log = SharedLog::default();
    let (tx, rx) = mpsc::channel();

    let handler = log.clone();
    let server = thread::spawn(move || {
        let mut reactor = Reactor::new(ReactorConfig::default(), LineCodec, handler).unwrap();
        let listener = reactor.listen("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = reactor.local_addr(listener).unwrap();
        tx.send((addr, reactor.shutdown_handle())).unwrap();
        reactor.run().unwrap();
    });

    let (addr, shutdown): (SocketAddr, _) = rx.recv().unwrap();

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut greeting = [0u8; 15];
    client.read_exact(&mut greeting).unwrap();
    assert_eq!(&greeting, b"Welcome client!");

    // Longer than one read buffer, split across two lines.
    client
        .write_all(b"opcode=7 src=1 dst=2\nsecond line\n")
        .unwrap();
    wait_for(|| log.lines.lock().unwrap().len() == 2);
    assert_eq!(
        *log.lines.lock().unwrap(),
        vec!["opcode=7 src=1 dst=2".to_string(), "second line".to_string()]
    );

    drop(client);
    wait_for(|| *log.disconnects.lock().unwrap() == 1);

    shutdown.shutdown().unwrap();
    server.join().unwrap();
}
