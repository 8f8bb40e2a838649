//! # SpaceSync SDK: WebAssembly bindings
//!
//! Runs the SDK in the browser over a native `WebSocket` and exposes the
//! connection to JavaScript through `wasm-bindgen`. Build with
//! `wasm-pack build sdk/wasm --target web`.
//!
//! ## Usage (TypeScript / ESM)
//! ```ts
//! import init, { WasmConnection } from "./pkg/spacesync_sdk_wasm.js";
//!
//! await init();
//! const conn = new WasmConnection("ws://localhost:3000", "chat", schemaJson, undefined);
//! const handle = conn.subscribe(["SELECT * FROM message"]);
//! for (const ev of conn.poll_events()) {
//!   if (ev.type === "insert") console.log(ev.table, ev.row);
//! }
//! ```

use wasm_bindgen::prelude::*;

pub mod client;
pub mod event;
pub mod json;
pub mod schema;

pub use client::WasmConnection;

/// Called by the wasm-bindgen start shim.
#[wasm_bindgen(start)]
pub fn start() {}

/// Returns the SDK version string.
#[wasm_bindgen]
pub fn version() -> String {
  env!("CARGO_PKG_VERSION").to_owned()
}
