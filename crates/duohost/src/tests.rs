use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use duonet::ChannelTransport;
use duonet::Endpoints;
use duonet::Listener;
use duonet::Transport;
use duopack::Direction;
use duopack::Message;
use duopack::MsgId;
use duopack::StaticPayload;
use duopack::VarData;
use duopack::VarRef;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::*;
use crate::dispatch::EXIT_CALLBACK_ACCEPT_FAILED;
use crate::dispatch::EXIT_CLEAN;
use crate::dispatch::EXIT_REQUEST_ACCEPT_FAILED;
use crate::fixture::FixtureOptions;

fn fast_fixture() -> FixtureOptions {
    FixtureOptions { callbacks: 5, interval: Duration::from_millis(1) }
}

fn concat_request(s1: &[u8], s2: &[u8]) -> Message {
    let mut var = VarData::new();
    let s1 = var.push(s1).unwrap();
    let s2 = var.push(s2).unwrap();
    Message::with_var(StaticPayload::ConcatRequest { s1, s2 }, var)
}

/// Initiator ends of both channels, plus the task serving the other ends.
struct Served {
    requests: ChannelTransport,
    callbacks: ChannelTransport,
    task: JoinHandle<(i32, DispatchState)>,
}

fn serve(registry: Registry) -> Served {
    let (requests, request_peer) = ChannelTransport::pair();
    let (callbacks, callback_peer) = ChannelTransport::pair();
    let task = tokio::spawn(async move {
        let mut dispatcher = Dispatcher::new(registry);
        dispatcher.emitter().attach(Arc::new(callback_peer)).await;
        let code = dispatcher.serve(Arc::new(request_peer)).await;
        (code, dispatcher.state())
    });
    Served { requests, callbacks, task }
}

async fn roundtrip(transport: &ChannelTransport, request: &Message) -> Message {
    transport.send(&duopack::encode(request).unwrap()).await.unwrap();
    duopack::decode(Direction::Response, &transport.recv().await.unwrap()).unwrap()
}

// ============================================================================
//  Registry
// ============================================================================

#[test]
fn test_registry_rejects_unsolicited_id() {
    let mut registry = Registry::new();
    let err = registry.register(MsgId::Callback, fixture::invert).unwrap_err();
    assert_eq!(err, Error::UnsolicitedId(MsgId::Callback));
    assert!(registry.is_empty());
}

#[test]
fn test_registry_rejects_duplicates() {
    let mut registry = Registry::new();
    registry.register(MsgId::Invert, fixture::invert).unwrap();
    let err = registry.register(MsgId::Invert, fixture::invert).unwrap_err();
    assert_eq!(err, Error::DuplicateHandler(MsgId::Invert));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_fixture_registry_covers_requests() {
    let registry = fixture::registry(FixtureOptions::default()).unwrap();
    for id in MsgId::ALL {
        assert_eq!(registry.contains(id), !id.is_unsolicited(), "{}", id);
    }
}

// ============================================================================
//  Fixture
// ============================================================================

#[tokio::test]
async fn test_fixture_invert() {
    let emitter = CallbackEmitter::new(Handle::current());
    for input in [true, false] {
        let response = fixture::invert(Message::new(StaticPayload::InvertRequest { input }), &emitter).unwrap();
        assert_eq!(response.payload, StaticPayload::InvertResponse { output: !input });
    }
}

#[tokio::test]
async fn test_fixture_concat_c_strings() {
    let emitter = CallbackEmitter::new(Handle::current());
    let response = fixture::concat(concat_request(b"First String\0", b"Second String\0"), &emitter).unwrap();

    assert_eq!(response.payload, StaticPayload::ConcatResponse { out: VarRef::new(0, 27) });
    assert_eq!(response.var.as_bytes(), b"First String\nSecond String\0");
}

#[tokio::test]
async fn test_fixture_concat_without_terminators() {
    let emitter = CallbackEmitter::new(Handle::current());
    let response = fixture::concat(concat_request(b"left", b""), &emitter).unwrap();
    assert_eq!(response.var.as_bytes(), b"left\n\0");
}

#[tokio::test]
async fn test_fixture_concat_rejects_bad_region() {
    let emitter = CallbackEmitter::new(Handle::current());
    let request = Message::with_var(
        StaticPayload::ConcatRequest { s1: VarRef::new(0, 2), s2: VarRef::new(2, 9) },
        b"abcd".to_vec(),
    );
    let err = fixture::concat(request, &emitter).unwrap_err();
    assert_eq!(err, Error::Codec(duopack::Error::RegionOutOfBounds { offset: 2, length: 9, filled: 4 }));
}

// ============================================================================
//  Emitter
// ============================================================================

#[tokio::test]
async fn test_emitter_detached() {
    let emitter = CallbackEmitter::new(Handle::current());
    assert!(!emitter.is_attached().await);
    assert_eq!(emitter.emit(1).await.unwrap_err(), Error::Detached);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_emitters_never_interleave() {
    let listener = Listener::bind(duonet::loopback(0)).await.unwrap();
    let addr = listener.local_addr();
    let accept = tokio::spawn(listener.accept_one());
    let initiator = duonet::connect(addr).await.unwrap();
    let companion = accept.await.unwrap().unwrap();

    let emitter = CallbackEmitter::new(Handle::current());
    emitter.attach(Arc::new(companion)).await;

    const THREADS: i32 = 8;
    const PER_THREAD: i32 = 50;
    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let emitter = emitter.clone();
            std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    emitter.emit_blocking(t * PER_THREAD + i).unwrap();
                }
            })
        })
        .collect();

    let mut values = Vec::new();
    for _ in 0..THREADS * PER_THREAD {
        let frame = initiator.recv().await.unwrap();
        match duopack::decode(Direction::Response, &frame).unwrap().payload {
            StaticPayload::CallbackResponse { value } => values.push(value),
            other => panic!("unexpected {:?}", other),
        }
    }
    for worker in workers {
        worker.join().unwrap();
    }

    values.sort();
    assert_eq!(values, (0..THREADS * PER_THREAD).collect::<Vec<_>>());
}

// ============================================================================
//  Dispatcher
// ============================================================================

#[tokio::test]
async fn test_serve_answers_until_closed() {
    let served = serve(fixture::registry(fast_fixture()).unwrap());

    let response = roundtrip(&served.requests, &Message::new(StaticPayload::InvertRequest { input: true })).await;
    assert_eq!(response.payload, StaticPayload::InvertResponse { output: false });

    let response = roundtrip(&served.requests, &concat_request(b"a\0", b"b\0")).await;
    assert_eq!(response.var.as_bytes(), b"a\nb\0");

    served.requests.close().await.unwrap();
    assert_eq!(served.task.await.unwrap(), (EXIT_CLEAN, DispatchState::Terminated(EXIT_CLEAN)));
    assert_eq!(served.callbacks.recv().await.unwrap_err(), duonet::Error::ConnectionClosed);
}

#[tokio::test]
async fn test_serve_skips_malformed_frames() {
    let served = serve(fixture::registry(fast_fixture()).unwrap());

    served.requests.send(&[]).await.unwrap();
    served.requests.send(&[0x7F, 0x00, 0x01]).await.unwrap();
    served.requests.send(&[duopack::PROTOCOL_VERSION, 0x42]).await.unwrap();
    served.requests.send(&[duopack::PROTOCOL_VERSION, 0x01, 0x00]).await.unwrap();
    served.requests.send(&[duopack::PROTOCOL_VERSION, 0x00, 0x07]).await.unwrap();

    // only the valid request gets an answer
    let response = roundtrip(&served.requests, &Message::new(StaticPayload::InvertRequest { input: false })).await;
    assert_eq!(response.payload, StaticPayload::InvertResponse { output: true });

    served.requests.close().await.unwrap();
    assert_eq!(served.task.await.unwrap().0, EXIT_CLEAN);
}

#[tokio::test]
async fn test_serve_rejects_unsolicited_request() {
    let served = serve(fixture::registry(fast_fixture()).unwrap());

    let callback = duopack::encode(&Message::new(StaticPayload::CallbackRequest)).unwrap();
    served.requests.send(&callback).await.unwrap();

    let response = roundtrip(&served.requests, &Message::new(StaticPayload::InvertRequest { input: true })).await;
    assert_eq!(response.id(), MsgId::Invert);

    served.requests.close().await.unwrap();
    served.task.await.unwrap();
}

#[tokio::test]
async fn test_failing_handlers_answer_zeroed() {
    let registry = Registry::new()
        .with(MsgId::Invert, |_: Message, _: &CallbackEmitter| -> Result<Message> {
            Err(Error::Handler("library refused".to_string()))
        })
        .unwrap()
        .with(MsgId::Concat, |_: Message, _: &CallbackEmitter| -> Result<Message> {
            panic!("library crashed")
        })
        .unwrap()
        .with(MsgId::SetCallback, |_: Message, _: &CallbackEmitter| -> Result<Message> {
            Ok(Message::new(StaticPayload::InvertResponse { output: true }))
        })
        .unwrap();
    let served = serve(registry);

    let response = roundtrip(&served.requests, &Message::new(StaticPayload::InvertRequest { input: true })).await;
    assert_eq!(response, Message::zeroed(MsgId::Invert, Direction::Response));

    let response = roundtrip(&served.requests, &concat_request(b"x", b"y")).await;
    assert_eq!(response, Message::zeroed(MsgId::Concat, Direction::Response));

    let response = roundtrip(&served.requests, &Message::new(StaticPayload::SetCallbackRequest)).await;
    assert_eq!(response, Message::zeroed(MsgId::SetCallback, Direction::Response));

    served.requests.close().await.unwrap();
    assert_eq!(served.task.await.unwrap().0, EXIT_CLEAN);
}

#[tokio::test]
async fn test_unregistered_id_answers_zeroed() {
    let served = serve(Registry::new().with(MsgId::Invert, fixture::invert).unwrap());

    let response = roundtrip(&served.requests, &concat_request(b"x", b"y")).await;
    assert_eq!(response, Message::zeroed(MsgId::Concat, Direction::Response));

    served.requests.close().await.unwrap();
    served.task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_set_callback_emits_before_answering() {
    let served = serve(fixture::registry(fast_fixture()).unwrap());

    let response = roundtrip(&served.requests, &Message::new(StaticPayload::SetCallbackRequest)).await;
    assert_eq!(response.payload, StaticPayload::SetCallbackResponse);

    for expected in 0..5 {
        let frame = served.callbacks.recv().await.unwrap();
        let message = duopack::decode(Direction::Response, &frame).unwrap();
        assert_eq!(message.payload, StaticPayload::CallbackResponse { value: expected });
    }

    served.requests.close().await.unwrap();
    served.task.await.unwrap();
}

#[tokio::test]
async fn test_run_accepts_both_channels() {
    let (ready_tx, ready_rx) = oneshot::channel();
    let server = tokio::spawn(async move {
        let mut dispatcher = Dispatcher::new(fixture::registry(fast_fixture()).unwrap());
        dispatcher
            .run(Endpoints::new(0, 0), move |bound| {
                let _ = ready_tx.send(bound);
            })
            .await
    });

    let bound = ready_rx.await.unwrap();
    assert_ne!(bound.request_port, 0);
    assert_ne!(bound.callback_port, 0);

    let requests = duonet::connect(bound.request_addr()).await.unwrap();
    let callbacks = duonet::connect(bound.callback_addr()).await.unwrap();

    let frame = duopack::encode(&Message::new(StaticPayload::InvertRequest { input: true })).unwrap();
    requests.send(&frame).await.unwrap();
    let response = duopack::decode(Direction::Response, &requests.recv().await.unwrap()).unwrap();
    assert_eq!(response.payload, StaticPayload::InvertResponse { output: false });

    requests.close().await.unwrap();
    assert_eq!(server.await.unwrap(), EXIT_CLEAN);
    assert_eq!(callbacks.recv().await.unwrap_err(), duonet::Error::ConnectionClosed);
}

#[tokio::test]
async fn test_run_fails_on_taken_ports() {
    let taken = Listener::bind(duonet::loopback(0)).await.unwrap();
    let port = taken.local_addr().port();

    let announced = Arc::new(AtomicBool::new(false));

    let flag = announced.clone();
    let mut dispatcher = Dispatcher::new(Registry::new());
    let code = dispatcher
        .run(Endpoints::new(port, 0), move |_| flag.store(true, Ordering::SeqCst))
        .await;
    assert_eq!(code, EXIT_REQUEST_ACCEPT_FAILED);
    assert_eq!(dispatcher.state(), DispatchState::Terminated(EXIT_REQUEST_ACCEPT_FAILED));

    let flag = announced.clone();
    let mut dispatcher = Dispatcher::new(Registry::new());
    let code = dispatcher
        .run(Endpoints::new(0, port), move |_| flag.store(true, Ordering::SeqCst))
        .await;
    assert_eq!(code, EXIT_CALLBACK_ACCEPT_FAILED);

    assert!(!announced.load(Ordering::SeqCst));
}
