//! Bootstrap, ack, setup, path-notify and teardown as they travel between two
//! nodes, with signatures produced and checked the way a store would.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{keypair, sign, RecordingStore, StoreCall};
use ed25519_dalek::SigningKey;
use num_bigint::BigUint;
use ygg_proto::codec::MAX_PATH_LEN;
use ygg_proto::{
    encode_packet, encode_varint_u64, BootstrapAck, BootstrapMessage, DhtSetupToken,
    Dispatched, Dispatcher, Ed25519Verifier, PacketType, PathNotifyMessage, PublicKey,
    SetupMessage, Signature, TeardownMessage, TreeLabel, WireError,
};

/// A label for `key` under `root`, signed by `key`.
fn signed_label(sk: &SigningKey, key: PublicKey, root: PublicKey, seq: u64) -> TreeLabel {
    let mut label =
        TreeLabel::new(Signature([0; 64]), key, root, seq, vec![0x02, 0x05, 0x00]).unwrap();
    label.sig = sign(sk, &label.signed_bytes());
    label
}

fn dispatcher(
    remote: PublicKey,
    store: &Arc<RecordingStore>,
) -> Dispatcher<Ed25519Verifier, RecordingStore> {
    Dispatcher::new(remote, Arc::new(Ed25519Verifier), store.clone())
}

#[tokio::test]
async fn bootstrap_ack_setup_exchange() {
    let (_, root) = keypair(1);
    let (a_sk, a) = keypair(2);
    let (b_sk, b) = keypair(3);

    // a -> b: bootstrap with a's label.
    let a_label = signed_label(&a_sk, a, root, 11);
    assert_eq!(
        a_label.path(),
        vec![BigUint::from(2u8), BigUint::from(640u32), BigUint::from(0u8)]
    );
    let bootstrap = BootstrapMessage { label: a_label.clone() };

    let b_store = Arc::new(RecordingStore::new());
    let at_b = dispatcher(a, &b_store);
    let packet = encode_packet(PacketType::DhtBootstrap, &bootstrap.to_bytes());
    assert_eq!(
        at_b.dispatch(&packet).await.unwrap(),
        Dispatched::Handled(PacketType::DhtBootstrap)
    );
    let calls = b_store.calls();
    let [StoreCall::Bootstrap(received)] = calls.as_slice() else {
        panic!("expected one bootstrap call");
    };
    assert!(Ed25519Verifier::verify_sync(
        &received.label.sig,
        &received.label.signed_bytes(),
        &received.label.key
    ));

    // b -> a: ack echoing a's label plus a token permitting a to set up a path to b.
    let b_label = signed_label(&b_sk, b, root, 11);
    let mut token = DhtSetupToken {
        sig: Signature([0; 64]),
        source: a,
        dest: b_label,
    };
    token.sig = sign(&b_sk, &token.signed_bytes());
    let ack = BootstrapAck {
        bootstrap: received.label.clone(),
        response: token.clone(),
    };

    let a_store = Arc::new(RecordingStore::new());
    let at_a = dispatcher(b, &a_store);
    let packet = encode_packet(PacketType::DhtBootstrapAck, &ack.to_bytes());
    at_a.dispatch(&packet).await.unwrap();
    let calls = a_store.calls();
    let [StoreCall::BootstrapAck(got)] = calls.as_slice() else {
        panic!("expected one ack call");
    };
    assert_eq!(got, &ack);
    assert!(Ed25519Verifier::verify_sync(
        &got.response.sig,
        &got.response.signed_bytes(),
        &got.response.dest.key
    ));

    // a -> b: setup using the token.
    let mut setup = SetupMessage {
        sig: Signature([0; 64]),
        seq: 1,
        token,
    };
    setup.sig = sign(&a_sk, &setup.signed_bytes());
    let packet = encode_packet(PacketType::DhtSetup, &setup.to_bytes());
    at_b.dispatch(&packet).await.unwrap();
    let calls = b_store.calls();
    let Some(StoreCall::Setup(got)) = calls.last() else {
        panic!("expected a setup call");
    };
    assert!(Ed25519Verifier::verify_sync(&got.sig, &got.signed_bytes(), &got.token.source));
}

#[tokio::test]
async fn bootstrap_ack_with_wrong_length_prefix_is_rejected() {
    let (_, root) = keypair(1);
    let (a_sk, a) = keypair(2);
    let (b_sk, b) = keypair(3);
    let label = signed_label(&a_sk, a, root, 1);
    let mut token = DhtSetupToken {
        sig: Signature([0; 64]),
        source: a,
        dest: signed_label(&b_sk, b, root, 1),
    };
    token.sig = sign(&b_sk, &token.signed_bytes());

    let label_bytes = label.to_bytes();
    let store = Arc::new(RecordingStore::new());
    let at_a = dispatcher(b, &store);

    for declared in [label_bytes.len() - 1, label_bytes.len() + 1] {
        let mut body = encode_varint_u64(declared as u64);
        body.extend_from_slice(&label_bytes);
        body.extend_from_slice(&token.to_bytes());
        let err = at_a
            .dispatch(&encode_packet(PacketType::DhtBootstrapAck, &body))
            .await
            .unwrap_err();
        assert!(
            matches!(err, WireError::MalformedPacket { .. }),
            "declared {declared}: {err:?}"
        );
    }
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn path_notify_and_teardown_reach_store() {
    let (_, root) = keypair(1);
    let (a_sk, a) = keypair(2);
    let (_, b) = keypair(3);

    let notify = PathNotifyMessage {
        sig: Signature([0x33; 64]),
        dest: b,
        label: signed_label(&a_sk, a, root, 4),
    };
    let teardown = TeardownMessage {
        sig: 0x0102_0304_0506_0708,
        key: a,
        root,
        root_seq: 4,
    };

    let store = Arc::new(RecordingStore::new());
    let at_b = dispatcher(a, &store);
    at_b.dispatch(&encode_packet(PacketType::PathNotify, &notify.to_bytes()))
        .await
        .unwrap();
    at_b.dispatch(&encode_packet(PacketType::DhtTeardown, &teardown.to_bytes()))
        .await
        .unwrap();

    assert_eq!(
        store.calls(),
        vec![StoreCall::PathNotify(notify), StoreCall::Teardown(teardown)]
    );
}

#[tokio::test]
async fn truncated_handshake_bodies_are_rejected() {
    let store = Arc::new(RecordingStore::new());
    let (_, peer) = keypair(2);
    let d = dispatcher(peer, &store);

    for kind in [
        PacketType::DhtBootstrap,
        PacketType::DhtBootstrapAck,
        PacketType::DhtSetup,
        PacketType::DhtTeardown,
        PacketType::PathNotify,
    ] {
        let result = d.dispatch(&encode_packet(kind, &[0x01; 20])).await;
        assert!(result.is_err(), "{kind:?} accepted a 20 byte body");
    }
    assert!(store.calls().is_empty());
}

/// Raw bootstrap body: label header followed by `path`.
fn bootstrap_body(key: PublicKey, root: PublicKey, path: &[u8]) -> Vec<u8> {
    let mut body = vec![0x11; 64];
    body.extend_from_slice(key.as_bytes());
    body.extend_from_slice(root.as_bytes());
    body.extend_from_slice(&9u64.to_be_bytes());
    body.extend_from_slice(path);
    body
}

#[tokio::test]
async fn bootstrap_path_length_limit() {
    let (_, root) = keypair(1);
    let (_, a) = keypair(2);
    let store = Arc::new(RecordingStore::new());
    let at_b = dispatcher(a, &store);

    let at_limit = bootstrap_body(a, root, &vec![0x01; MAX_PATH_LEN]);
    at_b.dispatch(&encode_packet(PacketType::DhtBootstrap, &at_limit))
        .await
        .unwrap();
    let calls = store.calls();
    let [StoreCall::Bootstrap(msg)] = calls.as_slice() else {
        panic!("expected one bootstrap call");
    };
    assert_eq!(msg.label.path().len(), MAX_PATH_LEN + 1);

    let over = bootstrap_body(a, root, &vec![0x01; MAX_PATH_LEN + 1]);
    let err = at_b
        .dispatch(&encode_packet(PacketType::DhtBootstrap, &over))
        .await
        .unwrap_err();
    assert!(matches!(err, WireError::MalformedPacket { .. }), "{err:?}");
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn oversized_path_in_path_notify_is_rejected() {
    let (_, root) = keypair(1);
    let (_, a) = keypair(2);
    let store = Arc::new(RecordingStore::new());
    let at_b = dispatcher(a, &store);

    let mut body = vec![0x22; 64];
    body.extend_from_slice(a.as_bytes());
    body.extend_from_slice(&bootstrap_body(a, root, &vec![0x01; 16 * 1024]));
    let err = at_b
        .dispatch(&encode_packet(PacketType::PathNotify, &body))
        .await
        .unwrap_err();
    assert!(matches!(err, WireError::MalformedPacket { .. }));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn unterminated_ack_length_is_rejected_quickly() {
    let (_, peer) = keypair(2);
    let store = Arc::new(RecordingStore::new());
    let d = dispatcher(peer, &store);

    let body = vec![0xff; 60 * 1024];
    let started = Instant::now();
    let err = d
        .dispatch(&encode_packet(PacketType::DhtBootstrapAck, &body))
        .await
        .unwrap_err();
    assert!(matches!(err, WireError::MalformedPacket { .. }), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(store.calls().is_empty());
}
