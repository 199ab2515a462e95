//! Matter server controller commands.
//!
//! Thin typed layer over [`ws::Client`](crate::ws::Client) for the commissioning commands
//! of a Matter server (the `python-matter-server` WebSocket API).
//!
//! | Command | Args | Correlated by |
//! |---------|------|---------------|
//! | `commission_with_code` | `code` | generated id |
//! | `commission_on_network` | `setup_pin_code` | generated id |
//! | `remove_node` | `node_id` | fixed id `remove_node` |
//!
//! Commissioning can take minutes on real hardware, so every command waits up to
//! [`COMMAND_TIMEOUT`](types::COMMAND_TIMEOUT) for its reply.
//!
//! # Example
//!
//! ```rust, no_run
//! use matter_ws_client::matter::Client;
//! use matter_ws_client::ws::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new("ws://homeassistant.local:5580/ws", Config::default())?;
//!
//!     match client.commission_with_code("MT:Y.K9042C00KA0648G00").await? {
//!         Some(response) if response.success => println!("node {:?}", response.node_id),
//!         Some(response) => println!("failed: {:?}", response.details),
//!         None => println!("no answer from the server"),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod types;

pub use client::Client;
pub use types::{Command, CommissionResponse};
