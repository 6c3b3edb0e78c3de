//! HTTP adapters against in-process servers.
//!
//! Each test binds an `axum` app to an ephemeral port on 127.0.0.1 and
//! points the real `HttpUploader` / `JsonRpcWallet` at it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use rwtp_offer::chain::{abi, ChainError, ContractCall, JsonRpcWallet, TransactionSender};
use rwtp_offer::crypto::{encrypt, EncryptionKeypair, SellerPublicKey};
use rwtp_offer::storage::{ContentUploader, HttpUploader, UploadError};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn sample_payload() -> rwtp_offer::crypto::EncryptedPayload {
    let buyer = EncryptionKeypair::generate();
    let seller = EncryptionKeypair::generate();
    encrypt(
        br#"{"email":"a@b.com"}"#,
        &SellerPublicKey::from_bytes(seller.public_key_bytes()),
        &buyer,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Upload Endpoint
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Captured {
    auth: Option<String>,
    body: Option<Value>,
}

#[tokio::test]
async fn upload_posts_payload_and_reads_cid() {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let app = Router::new()
        .route(
            "/api/upload",
            post(
                |State(captured): State<Arc<Mutex<Captured>>>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    let mut c = captured.lock();
                    c.auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    c.body = Some(body);
                    Json(json!({ "cid": "QmUploaded" }))
                },
            ),
        )
        .with_state(captured.clone());
    let base = serve(app).await;

    let uploader = HttpUploader::with_options(
        format!("{base}/api/upload"),
        Some("secret"),
        Duration::from_secs(5),
    )
    .unwrap();
    let payload = sample_payload();
    let cid = uploader.upload(&payload).await.unwrap();

    assert_eq!(cid.as_str(), "QmUploaded");
    assert_eq!(cid.to_uri("ipfs"), "ipfs://QmUploaded");

    let c = captured.lock();
    assert_eq!(c.auth.as_deref(), Some("Bearer secret"));
    let body = c.body.as_ref().unwrap();
    assert_eq!(body["publicKey"], payload.public_key);
    assert_eq!(body["nonce"], payload.nonce);
    assert_eq!(body["message"], payload.message);
}

#[tokio::test]
async fn upload_understands_pinning_service_shape() {
    let app = Router::new().route(
        "/pinning/pinJSONToIPFS",
        post(|| async { Json(json!({ "IpfsHash": "QmPinned", "PinSize": 321 })) }),
    );
    let base = serve(app).await;

    let uploader = HttpUploader::new(format!("{base}/pinning/pinJSONToIPFS")).unwrap();
    let cid = uploader.upload(&sample_payload()).await.unwrap();
    assert_eq!(cid.as_str(), "QmPinned");
}

#[tokio::test]
async fn upload_surfaces_error_status() {
    let app = Router::new().route(
        "/upload",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "pin quota exceeded") }),
    );
    let base = serve(app).await;

    let uploader = HttpUploader::new(format!("{base}/upload")).unwrap();
    match uploader.upload(&sample_payload()).await {
        Err(UploadError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "pin quota exceeded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_rejects_body_without_identifier() {
    let app = Router::new().route("/upload", post(|| async { Json(json!({ "ok": true })) }));
    let base = serve(app).await;

    let uploader = HttpUploader::new(format!("{base}/upload")).unwrap();
    let err = uploader.upload(&sample_payload()).await.unwrap_err();
    assert!(matches!(err, UploadError::MalformedResponse(_)));
}

#[tokio::test]
async fn upload_rejects_blank_identifier() {
    let app = Router::new().route("/upload", post(|| async { Json(json!({ "cid": "  " })) }));
    let base = serve(app).await;

    let uploader = HttpUploader::new(format!("{base}/upload")).unwrap();
    let err = uploader.upload(&sample_payload()).await.unwrap_err();
    assert!(matches!(err, UploadError::MalformedResponse(_)));
}

#[tokio::test]
async fn upload_reports_unreachable_endpoint() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let uploader = HttpUploader::new(format!("http://{addr}/upload")).unwrap();
    let err = uploader.upload(&sample_payload()).await.unwrap_err();
    assert!(matches!(err, UploadError::Network(_)));
}

// ---------------------------------------------------------------------------
// JSON-RPC Wallet
// ---------------------------------------------------------------------------

/// Scripted node: answers `eth_sendTransaction` and serves receipts after a
/// configurable number of empty polls.
struct FakeNode {
    sent: Mutex<Vec<Value>>,
    receipt_polls: AtomicUsize,
    empty_polls: usize,
    send_error: Option<(i64, &'static str)>,
    receipt_status: &'static str,
}

impl FakeNode {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            receipt_polls: AtomicUsize::new(0),
            empty_polls: 2,
            send_error: None,
            receipt_status: "0x1",
        }
    }
}

const SENT_HASH: &str = "0xabababababababababababababababababababababababababababababababab";

async fn rpc(State(node): State<Arc<FakeNode>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let result = match req["method"].as_str() {
        Some("eth_sendTransaction") => {
            if let Some((code, message)) = node.send_error {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": code, "message": message }
                }));
            }
            node.sent.lock().push(req["params"][0].clone());
            json!(SENT_HASH)
        }
        Some("eth_getTransactionReceipt") => {
            let polls = node.receipt_polls.fetch_add(1, Ordering::SeqCst);
            if polls < node.empty_polls {
                Value::Null
            } else {
                json!({
                    "transactionHash": req["params"][0],
                    "status": node.receipt_status,
                    "blockNumber": "0x1b4",
                })
            }
        }
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "method not found" }
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn wallet_for(node: Arc<FakeNode>) -> JsonRpcWallet {
    let app = Router::new().route("/", post(rpc)).with_state(node);
    let base = serve(app).await;
    JsonRpcWallet::new(base, Address::repeat_byte(0xbb))
        .with_poll_interval(Duration::from_millis(10))
}

fn approve_call(gas_limit: Option<u64>) -> ContractCall {
    ContractCall {
        to: Address::repeat_byte(0x11),
        data: abi::encode_approve(Address::repeat_byte(0x22), U256::from(15)),
        gas_limit,
    }
}

#[tokio::test]
async fn wallet_sends_transaction_fields() {
    let node = Arc::new(FakeNode::new());
    let wallet = wallet_for(node.clone()).await;

    let handle = wallet.send(approve_call(Some(1_000_000))).await.unwrap();
    assert_eq!(handle.hash, SENT_HASH.parse::<TxHash>().unwrap());

    let sent = node.sent.lock()[0].clone();
    assert_eq!(
        sent["from"].as_str().unwrap().parse::<Address>().unwrap(),
        wallet.from_address()
    );
    assert_eq!(wallet.from_address(), Address::repeat_byte(0xbb));
    assert_eq!(
        sent["to"].as_str().unwrap().parse::<Address>().unwrap(),
        Address::repeat_byte(0x11)
    );
    let data: Bytes = sent["data"].as_str().unwrap().parse().unwrap();
    assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
    assert_eq!(sent["gas"], "0xf4240");
}

#[tokio::test]
async fn wallet_omits_gas_when_unbounded() {
    let node = Arc::new(FakeNode::new());
    let wallet = wallet_for(node.clone()).await;

    wallet.send(approve_call(None)).await.unwrap();
    assert!(node.sent.lock()[0].get("gas").is_none());
}

#[tokio::test]
async fn wallet_polls_until_receipt_appears() {
    let node = Arc::new(FakeNode::new());
    let wallet = wallet_for(node.clone()).await;

    let handle = wallet.send(approve_call(None)).await.unwrap();
    let confirmation = wallet.await_confirmation(&handle).await.unwrap();

    assert_eq!(confirmation.hash, handle.hash);
    assert_eq!(confirmation.block_number, Some(436));
    assert_eq!(node.receipt_polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn wallet_reports_failed_receipt_as_revert() {
    let node = Arc::new(FakeNode {
        receipt_status: "0x0",
        empty_polls: 0,
        ..FakeNode::new()
    });
    let wallet = wallet_for(node).await;

    let handle = wallet.send(approve_call(None)).await.unwrap();
    let err = wallet.await_confirmation(&handle).await.unwrap_err();
    assert!(matches!(err, ChainError::Reverted { hash } if hash == handle.hash));
}

#[tokio::test]
async fn wallet_maps_user_denial_to_rejection() {
    let node = Arc::new(FakeNode {
        send_error: Some((4001, "User denied transaction signature")),
        ..FakeNode::new()
    });
    let wallet = wallet_for(node).await;

    let err = wallet.send(approve_call(None)).await.unwrap_err();
    assert!(matches!(err, ChainError::Rejected(msg) if msg.contains("denied")));
}

#[tokio::test]
async fn wallet_maps_other_node_errors_to_rpc() {
    let node = Arc::new(FakeNode {
        send_error: Some((-32000, "insufficient funds for gas")),
        ..FakeNode::new()
    });
    let wallet = wallet_for(node).await;

    let err = wallet.send(approve_call(None)).await.unwrap_err();
    match err {
        ChainError::Rpc(msg) => {
            assert!(msg.contains("insufficient funds"));
            assert!(msg.contains("-32000"));
        }
        other => panic!("expected rpc error, got {other:?}"),
    }
}
