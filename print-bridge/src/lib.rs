//! Print Bridge
//!
//! Client-side bridge between a point-of-sale host and a local print agent.
//!
//! ```text
//! host ── enqueue(role, receipt) ──▶ DispatchOrchestrator
//!                                        │ (one FIFO lane per role)
//!                                        ▼
//!                                    Normalizer ──▶ ReceiptPayload
//!                                        │
//!                                        ▼
//!                                  PrinterAdapter ──▶ AgentTransport ──▶ agent
//! ```
//!
//! - [`normalize`]: receipt text / markup / bytes → typed base64 payload
//! - [`transport`]: stateless HTTP and persistent WebSocket agent channels
//! - [`adapter`]: `print` / `open_cashbox` over a transport, never raising
//! - [`dispatch`]: per-role queues with at most one job in flight
//! - [`PrintBridge`]: wires all of the above from a [`BridgeConfig`]

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod normalize;
pub mod transport;

pub use adapter::{
    FailureKind, HttpProxyAdapter, LocalAgentAdapter, OutcomeMessage, PrintOutcome, PrinterAdapter,
};
pub use bridge::{PrintBridge, PrintBridgeBuilder};
pub use config::{BridgeConfig, RetryPolicy, RoleConfig, UnreachablePolicy};
pub use dispatch::{
    DispatchOrchestrator, DispatchOrchestratorBuilder, LaneState, LaneStatus, PrintJob, PrintTicket,
};
pub use error::{BridgeError, BridgeResult, TransportError};
pub use normalize::{
    Normalizer, RawReceipt, ReceiptRenderer, RenderError, VisualElement, strip_data_url,
};
pub use transport::{
    AgentResponse, AgentTransport, ConnectionState, ConnectionStatus, HttpAgentTransport,
    SocketAgentTransport,
};

// Re-export shared types used in the public API
pub use shared::message::PrinterInfo;
pub use shared::{PayloadKind, PrinterIdentity, PrinterProtocol, PrinterRole, ReceiptPayload};
