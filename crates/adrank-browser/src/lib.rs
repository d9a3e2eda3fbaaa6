//! Browser automation layer for listing scrapes.
//!
//! Defines the narrow rendering capability the scanner drives
//! ([`Renderer`], [`BrowsingContext`], [`RenderPage`], [`PageElement`]),
//! proxy URL parsing, anti-fingerprinting material, and a Chromium-backed
//! implementation of the capability.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod proxy;

pub use actions::{
    BrowsingContext, NavigationOptions, PageElement, RenderPage, Renderer, WaitUntil,
};
pub use engine::{BrowserEngine, LaunchOptions};
pub use error::{BrowserError, Result};
pub use fingerprint::{FingerprintConfig, ACCEPT_LANGUAGE, STEALTH_INIT_SCRIPT, USER_AGENTS};
pub use proxy::ProxyConfig;
